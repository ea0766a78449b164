//! Transform: append computed columns to a chunk, keeping the existing
//! ones untouched (unlike Project, which selects/renames/reorders).

use std::sync::Arc;

use crate::common::error::EngineResult;
use crate::execution::context::ExecutionContext;
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::Expr;
use crate::expression::compiler::compile;
use crate::expression::kernel::ValueKernel;
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::physical_type::Kind;
use crate::types::schema::{ColumnDescriptor, Schema};
use crate::types::value::Value;

struct ComputedColumn {
    kernel: ValueKernel,
    descriptor: ColumnDescriptor,
    /// Index of the output column this replaces, if its name collided with
    /// an existing (input or earlier-computed) column; `None` appends.
    replace_idx: Option<usize>,
}

pub struct TransformOperator {
    input: Box<dyn ChunkSource>,
    computed: Vec<ComputedColumn>,
    output_schema: Arc<Schema>,
    ctx: ExecutionContext,
}

impl TransformOperator {
    pub fn new(
        input: Box<dyn ChunkSource>,
        new_columns: &[(Arc<Expr>, String)],
        input_schema: &Schema,
        ctx: ExecutionContext,
    ) -> EngineResult<Self> {
        let mut computed = Vec::with_capacity(new_columns.len());
        let mut descriptors: Vec<ColumnDescriptor> = input_schema.columns().to_vec();
        for (expr, name) in new_columns {
            let (dtype, kernel) = compile(expr, input_schema)?;
            let descriptor = ColumnDescriptor::new(name.clone(), dtype);
            // a target name already present (from the input schema or an
            // earlier new column) is replaced in place, not duplicated.
            let replace_idx = descriptors.iter().position(|d| d.name.as_ref() == name.as_str());
            match replace_idx {
                Some(idx) => descriptors[idx] = descriptor.clone(),
                None => descriptors.push(descriptor.clone()),
            }
            computed.push(ComputedColumn { kernel, descriptor, replace_idx });
        }
        let output_schema = Arc::new(Schema::new(descriptors)?);
        Ok(Self { input, computed, output_schema, ctx })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }
}

impl ChunkSource for TransformOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        let Some(input_chunk) = self.input.next()? else {
            return Ok(None);
        };
        let row_count = input_chunk.row_count();
        let mut dictionary = input_chunk.dictionary().clone();
        let mut columns: Vec<ColumnBuffer> = input_chunk
            .columns()
            .iter()
            .map(|c| c.copy_selected(&(0..input_chunk.row_count()).map(|r| input_chunk.physical_row(r)).collect::<Vec<_>>()))
            .collect();

        for computed in &self.computed {
            let mut col = ColumnBuffer::with_capacity(
                computed.descriptor.dtype.kind,
                computed.descriptor.dtype.nullable,
                row_count,
            );
            for row in 0..row_count {
                let value = (computed.kernel)(&input_chunk, row)?;
                if computed.descriptor.dtype.kind == Kind::String {
                    let id = match &value {
                        Value::String(s) => Some(dictionary.intern(s)),
                        _ => None,
                    };
                    col.push_dict_id(id)?;
                } else {
                    col.push(&value)?;
                }
            }
            match computed.replace_idx {
                Some(idx) => columns[idx] = col, // old buffer dropped here
                None => columns.push(col),
            }
        }
        Ok(Some(Chunk::new(self.output_schema.clone(), columns, dictionary)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operator::VecChunkSource;
    use crate::expression::builder::add;
    use crate::types::dictionary::Dictionary;
    use crate::types::dtype::DType;
    use crate::types::schema::ColumnDescriptor;

    #[test]
    fn appends_a_computed_column() {
        let input_schema = Schema::new(vec![ColumnDescriptor::new("a", DType::not_null(Kind::Int32))]).unwrap();
        let schema_arc = Arc::new(input_schema.clone());
        let mut col = ColumnBuffer::with_capacity(Kind::Int32, false, 2);
        col.push(&Value::Int32(1)).unwrap();
        col.push(&Value::Int32(2)).unwrap();
        let chunk = Chunk::new(schema_arc, vec![col], Dictionary::new()).unwrap();

        let new_columns = vec![(add(Expr::column("a"), Expr::lit(Value::Int32(10))), "a_plus_10".to_string())];
        let source = VecChunkSource::new(vec![chunk]);
        let mut op = TransformOperator::new(Box::new(source), &new_columns, &input_schema, ExecutionContext::unbounded()).unwrap();
        let out = op.next().unwrap().unwrap();
        assert_eq!(out.schema().len(), 2);
        assert_eq!(out.columns()[1].get_raw::<f64>(0), Some(11.0));
    }
}
