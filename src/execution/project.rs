//! Projection: select, rename, and reorder columns without computing new
//! values (use Transform for that).

use std::sync::Arc;

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::Expr;
use crate::expression::compiler::compile;
use crate::expression::kernel::ValueKernel;
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::schema::{ColumnDescriptor, Schema};

/// One output column: a compiled expression (usually a bare `Column` ref,
/// but any value expression is allowed) and its output name.
pub struct ProjectItem {
    pub kernel: ValueKernel,
    pub descriptor: ColumnDescriptor,
}

pub struct ProjectOperator {
    input: Box<dyn ChunkSource>,
    items: Vec<ProjectItem>,
    output_schema: Arc<Schema>,
    ctx: ExecutionContext,
}

impl ProjectOperator {
    pub fn new(
        input: Box<dyn ChunkSource>,
        exprs: &[(Arc<Expr>, String)],
        input_schema: &Schema,
        ctx: ExecutionContext,
    ) -> EngineResult<Self> {
        let mut items = Vec::with_capacity(exprs.len());
        let mut descriptors = Vec::with_capacity(exprs.len());
        for (expr, name) in exprs {
            let (dtype, kernel) = compile(expr, input_schema)?;
            let descriptor = ColumnDescriptor::new(name.clone(), dtype);
            descriptors.push(descriptor.clone());
            items.push(ProjectItem { kernel, descriptor });
        }
        let output_schema = Arc::new(Schema::new(descriptors)?);
        Ok(Self { input, items, output_schema, ctx })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}

impl ChunkSource for ProjectOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        let Some(input_chunk) = self.input.next()? else {
            return Ok(None);
        };
        let row_count = input_chunk.row_count();
        let mut dictionary = input_chunk.dictionary().clone();
        let mut columns = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let mut col = ColumnBuffer::with_capacity(item.descriptor.dtype.kind, item.descriptor.dtype.nullable, row_count);
            for row in 0..row_count {
                let value = (item.kernel)(&input_chunk, row)?;
                if item.descriptor.dtype.kind == crate::types::physical_type::Kind::String {
                    let id = match &value {
                        crate::types::value::Value::String(s) => Some(dictionary.intern(s)),
                        _ => None,
                    };
                    col.push_dict_id(id)?;
                } else {
                    col.push(&value)?;
                }
            }
            columns.push(col);
        }
        Ok(Some(Chunk::new(self.output_schema.clone(), columns, dictionary)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operator::VecChunkSource;
    use crate::types::column_buffer::ColumnBuffer;
    use crate::types::dictionary::Dictionary;
    use crate::types::dtype::DType;
    use crate::types::physical_type::Kind;
    use crate::types::schema::ColumnDescriptor;
    use crate::types::value::Value;

    fn chunk() -> Chunk {
        let schema = Arc::new(
            Schema::new(vec![
                ColumnDescriptor::new("a", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("b", DType::not_null(Kind::Int32)),
            ])
            .unwrap(),
        );
        let mut a = ColumnBuffer::with_capacity(Kind::Int32, false, 2);
        a.push(&Value::Int32(1)).unwrap();
        a.push(&Value::Int32(2)).unwrap();
        let mut b = ColumnBuffer::with_capacity(Kind::Int32, false, 2);
        b.push(&Value::Int32(10)).unwrap();
        b.push(&Value::Int32(20)).unwrap();
        Chunk::new(schema, vec![a, b], Dictionary::new()).unwrap()
    }

    #[test]
    fn reorders_and_renames_columns() {
        let input_schema = Schema::new(vec![
            ColumnDescriptor::new("a", DType::not_null(Kind::Int32)),
            ColumnDescriptor::new("b", DType::not_null(Kind::Int32)),
        ])
        .unwrap();
        let exprs = vec![(Expr::column("b"), "renamed".to_string())];
        let source = VecChunkSource::new(vec![chunk()]);
        let mut op = ProjectOperator::new(Box::new(source), &exprs, &input_schema, ExecutionContext::unbounded()).unwrap();
        let out = op.next().unwrap().unwrap();
        assert_eq!(out.schema().columns()[0].name.as_ref(), "renamed");
        assert_eq!(out.columns()[0].get_raw::<i32>(0), Some(10));
    }
}
