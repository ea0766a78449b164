//! Hash-based GroupBy. Pipeline-breaking: consumes the entire input,
//! accumulating one [`AggregateState`] per distinct group key, then emits
//! a single chunk of group keys plus finalized aggregate values.

use std::sync::Arc;

use ahash::AHashMap;

use crate::common::error::{EngineError, EngineResult};
use crate::execution::context::ExecutionContext;
use crate::execution::hash_table::{row_key, RowKey};
use crate::execution::operator::{check_cancelled, ChunkSource};
use crate::expression::ast::{AggKind, Expr};
use crate::expression::compiler::compile;
use crate::expression::kernel::ValueKernel;
use crate::types::chunk::Chunk;
use crate::types::column_buffer::ColumnBuffer;
use crate::types::dictionary::Dictionary;
use crate::types::dtype::DType;
use crate::types::physical_type::Kind;
use crate::types::schema::{ColumnDescriptor, Schema};
use crate::types::value::Value;

/// Running aggregate state updated one row at a time and finalized once
/// the group is fully seen. `update` is fallible so integer-accumulating
/// sums can surface `Overflow` instead of wrapping.
pub trait AggregateState: std::fmt::Debug {
    fn update(&mut self, value: &Value) -> EngineResult<()>;
    fn finalize(&self) -> Value;
    fn clone_box(&self) -> Box<dyn AggregateState>;
}

impl Clone for Box<dyn AggregateState> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[derive(Debug, Clone, Default)]
struct CountState {
    count: i64,
}
impl AggregateState for CountState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        if !value.is_null() {
            self.count += 1;
        }
        Ok(())
    }
    fn finalize(&self) -> Value {
        Value::Int64(self.count)
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
struct CountStarState {
    count: i64,
}
impl AggregateState for CountStarState {
    fn update(&mut self, _value: &Value) -> EngineResult<()> {
        self.count += 1;
        Ok(())
    }
    fn finalize(&self) -> Value {
        Value::Int64(self.count)
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

/// Float-accumulating sum, used when the input isn't integral.
#[derive(Debug, Clone, Default)]
struct SumState {
    sum: f64,
    any: bool,
}
impl AggregateState for SumState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        if let Some(f) = value.as_f64() {
            self.sum += f;
            self.any = true;
        }
        Ok(())
    }
    fn finalize(&self) -> Value {
        if self.any {
            Value::Float64(self.sum)
        } else {
            Value::Null
        }
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

/// Int64-accumulating sum, used when the input is an integral kind (even if
/// narrower than Int64). Overflow beyond Int64 is an error, not wraparound.
#[derive(Debug, Clone, Default)]
struct IntSumState {
    sum: i64,
    any: bool,
}
impl AggregateState for IntSumState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        if let Some(i) = value.as_i64() {
            self.sum = self
                .sum
                .checked_add(i)
                .ok_or_else(|| EngineError::Overflow { column: String::new(), row: 0 })?;
            self.any = true;
        }
        Ok(())
    }
    fn finalize(&self) -> Value {
        if self.any {
            Value::Int64(self.sum)
        } else {
            Value::Null
        }
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
struct AvgState {
    sum: f64,
    count: i64,
}
impl AggregateState for AvgState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        if let Some(f) = value.as_f64() {
            self.sum += f;
            self.count += 1;
        }
        Ok(())
    }
    fn finalize(&self) -> Value {
        if self.count == 0 {
            Value::Null
        } else {
            Value::Float64(self.sum / self.count as f64)
        }
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

#[derive(Debug, Clone, Default)]
struct MinMaxState {
    best: Option<Value>,
    is_max: bool,
}
impl AggregateState for MinMaxState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        if value.is_null() {
            return Ok(());
        }
        self.best = Some(match self.best.take() {
            None => value.clone(),
            Some(current) => {
                let keep_new = if self.is_max {
                    matches!(value.partial_cmp(&current), Some(std::cmp::Ordering::Greater))
                } else {
                    matches!(value.partial_cmp(&current), Some(std::cmp::Ordering::Less))
                };
                if keep_new { value.clone() } else { current }
            }
        });
        Ok(())
    }
    fn finalize(&self) -> Value {
        self.best.clone().unwrap_or(Value::Null)
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

/// Value from the first row seen for the group, in input order.
#[derive(Debug, Clone, Default)]
struct FirstState {
    value: Option<Value>,
}
impl AggregateState for FirstState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        if self.value.is_none() {
            self.value = Some(value.clone());
        }
        Ok(())
    }
    fn finalize(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

/// Value from the last row seen for the group, in input order.
#[derive(Debug, Clone, Default)]
struct LastState {
    value: Option<Value>,
}
impl AggregateState for LastState {
    fn update(&mut self, value: &Value) -> EngineResult<()> {
        self.value = Some(value.clone());
        Ok(())
    }
    fn finalize(&self) -> Value {
        self.value.clone().unwrap_or(Value::Null)
    }
    fn clone_box(&self) -> Box<dyn AggregateState> {
        Box::new(self.clone())
    }
}

fn new_state(kind: AggKind, has_arg: bool, arg_kind: Option<Kind>) -> Box<dyn AggregateState> {
    match kind {
        AggKind::Count if !has_arg => Box::new(CountStarState::default()),
        AggKind::Count => Box::new(CountState::default()),
        AggKind::Sum if arg_kind.map(Kind::is_integral).unwrap_or(false) => Box::new(IntSumState::default()),
        AggKind::Sum => Box::new(SumState::default()),
        AggKind::Avg => Box::new(AvgState::default()),
        AggKind::Min => Box::new(MinMaxState { best: None, is_max: false }),
        AggKind::Max => Box::new(MinMaxState { best: None, is_max: true }),
        AggKind::First => Box::new(FirstState::default()),
        AggKind::Last => Box::new(LastState::default()),
    }
}

pub struct AggregateSpec {
    pub kind: AggKind,
    /// `None` for `COUNT(*)`.
    pub arg: Option<Arc<Expr>>,
    pub output_name: String,
}

pub struct GroupByOperator {
    input: Option<Box<dyn ChunkSource>>,
    group_keys: Vec<Arc<Expr>>,
    group_key_names: Vec<String>,
    aggregates: Vec<AggregateSpec>,
    input_schema: Arc<Schema>,
    output_schema: Arc<Schema>,
    ctx: ExecutionContext,
    output: Option<std::vec::IntoIter<Chunk>>,
}

impl GroupByOperator {
    pub fn new(
        input: Box<dyn ChunkSource>,
        group_keys: Vec<Arc<Expr>>,
        group_key_names: Vec<String>,
        aggregates: Vec<AggregateSpec>,
        input_schema: Arc<Schema>,
        ctx: ExecutionContext,
    ) -> EngineResult<Self> {
        let mut descriptors = Vec::new();
        for (expr, name) in group_keys.iter().zip(&group_key_names) {
            let dtype = crate::expression::compiler::infer_type(expr, &input_schema)?;
            descriptors.push(ColumnDescriptor::new(name.clone(), dtype));
        }
        for agg in &aggregates {
            let arg_kind = match &agg.arg {
                Some(e) => Some(crate::expression::compiler::infer_type(e, &input_schema)?.kind),
                None => None,
            };
            let dtype = match agg.kind {
                AggKind::Count => DType::not_null(Kind::Int64),
                AggKind::Avg => DType::nullable(Kind::Float64),
                AggKind::Sum => match arg_kind {
                    Some(k) if k.is_integral() => DType::nullable(Kind::Int64),
                    _ => DType::nullable(Kind::Float64),
                },
                AggKind::Min | AggKind::Max | AggKind::First | AggKind::Last => match arg_kind {
                    Some(k) => DType::new(k, true),
                    None => DType::nullable(Kind::Float64),
                },
            };
            descriptors.push(ColumnDescriptor::new(agg.output_name.clone(), dtype));
        }
        let output_schema = Arc::new(Schema::new(descriptors)?);
        Ok(Self {
            input: Some(input),
            group_keys,
            group_key_names,
            aggregates,
            input_schema,
            output_schema,
            ctx,
            output: None,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.output_schema
    }

    fn run(&mut self) -> EngineResult<()> {
        let mut input = self.input.take().expect("run called twice");
        let key_kernels: Vec<ValueKernel> = self
            .group_keys
            .iter()
            .map(|e| compile(e, &self.input_schema).map(|(_, k)| k))
            .collect::<EngineResult<_>>()?;
        let agg_kernels: Vec<Option<ValueKernel>> = self
            .aggregates
            .iter()
            .map(|a| match &a.arg {
                Some(e) => compile(e, &self.input_schema).map(|(_, k)| Some(k)),
                None => Ok(None),
            })
            .collect::<EngineResult<_>>()?;
        let arg_kinds: Vec<Option<Kind>> = self
            .aggregates
            .iter()
            .map(|a| match &a.arg {
                Some(e) => crate::expression::compiler::infer_type(e, &self.input_schema).map(|d| Some(d.kind)),
                None => Ok(None),
            })
            .collect::<EngineResult<_>>()?;

        let mut groups: AHashMap<RowKey, (Vec<Value>, Vec<Box<dyn AggregateState>>)> = AHashMap::new();
        let mut group_order: Vec<RowKey> = Vec::new();

        while let Some(chunk) = input.next()? {
            check_cancelled(&self.ctx)?;
            for row in 0..chunk.row_count() {
                let key_values: Vec<Value> = key_kernels.iter().map(|k| k(&chunk, row)).collect::<EngineResult<_>>()?;
                let key = row_key(&key_values);
                let entry = groups.entry(key.clone()).or_insert_with(|| {
                    group_order.push(key.clone());
                    let states = self
                        .aggregates
                        .iter()
                        .zip(&arg_kinds)
                        .map(|(a, arg_kind)| new_state(a.kind, a.arg.is_some(), *arg_kind))
                        .collect();
                    (key_values.clone(), states)
                });
                for (i, kernel) in agg_kernels.iter().enumerate() {
                    match kernel {
                        Some(k) => entry.1[i].update(&k(&chunk, row)?)?,
                        None => entry.1[i].update(&Value::Null)?,
                    }
                }
            }
        }

        let mut columns: Vec<ColumnBuffer> = self
            .output_schema
            .columns()
            .iter()
            .map(|d| ColumnBuffer::with_capacity(d.dtype.kind, d.dtype.nullable, group_order.len()))
            .collect();
        let mut dictionary = Dictionary::new();

        for key in &group_order {
            let (key_values, states) = groups.get(key).unwrap();
            for (i, v) in key_values.iter().enumerate() {
                push_value(&mut columns[i], v, &mut dictionary)?;
            }
            for (i, state) in states.iter().enumerate() {
                push_value(&mut columns[key_values.len() + i], &state.finalize(), &mut dictionary)?;
            }
        }

        let chunk = Chunk::new(self.output_schema.clone(), columns, dictionary)?;
        self.output = Some(vec![chunk].into_iter());
        Ok(())
    }
}

/// Pushes `value` into `col`, interning through `dictionary` first when
/// `col` is `String`-kind (its buffer stores dictionary ids, not text).
fn push_value(col: &mut ColumnBuffer, value: &Value, dictionary: &mut Dictionary) -> EngineResult<()> {
    if col.kind() == Kind::String {
        let id = match value {
            Value::String(s) => Some(dictionary.intern(s)),
            _ => None,
        };
        col.push_dict_id(id)
    } else {
        col.push(value)
    }
}

impl ChunkSource for GroupByOperator {
    fn next(&mut self) -> EngineResult<Option<Chunk>> {
        check_cancelled(&self.ctx)?;
        if self.output.is_none() {
            self.run()?;
        }
        Ok(self.output.as_mut().unwrap().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::operator::VecChunkSource;
    use crate::expression::builder::{count_star, sum};
    use crate::types::dictionary::Dictionary;
    use std::sync::Arc as StdArc;

    fn input_chunk() -> Chunk {
        let schema = StdArc::new(
            Schema::new(vec![
                ColumnDescriptor::new("g", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("v", DType::not_null(Kind::Int32)),
            ])
            .unwrap(),
        );
        let mut g = ColumnBuffer::with_capacity(Kind::Int32, false, 4);
        let mut v = ColumnBuffer::with_capacity(Kind::Int32, false, 4);
        for (gv, vv) in [(1, 10), (1, 20), (2, 5), (2, 7)] {
            g.push(&Value::Int32(gv)).unwrap();
            v.push(&Value::Int32(vv)).unwrap();
        }
        Chunk::new(schema, vec![g, v], Dictionary::new()).unwrap()
    }

    #[test]
    fn groups_and_sums_and_counts() {
        let input_schema = StdArc::new(
            Schema::new(vec![
                ColumnDescriptor::new("g", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("v", DType::not_null(Kind::Int32)),
            ])
            .unwrap(),
        );
        let source = VecChunkSource::new(vec![input_chunk()]);
        let aggs = vec![
            AggregateSpec { kind: AggKind::Sum, arg: Some(Expr::column("v")), output_name: "sum_v".into() },
            AggregateSpec { kind: AggKind::Count, arg: None, output_name: "cnt".into() },
        ];
        let _ = count_star();
        let _ = sum(Expr::column("v"));
        let mut op = GroupByOperator::new(
            Box::new(source),
            vec![Expr::column("g")],
            vec!["g".into()],
            aggs,
            input_schema,
            ExecutionContext::unbounded(),
        )
        .unwrap();
        let out = op.next().unwrap().unwrap();
        assert_eq!(out.row_count(), 2);
        let mut by_group = std::collections::HashMap::new();
        for row in 0..out.row_count() {
            let g = out.columns()[0].get_raw::<i32>(row).unwrap();
            let s = out.columns()[1].get_raw::<i64>(row).unwrap();
            by_group.insert(g, s);
        }
        assert_eq!(by_group[&1], 30);
        assert_eq!(by_group[&2], 12);
    }

    #[test]
    fn first_and_last_track_input_order_per_group() {
        let input_schema = StdArc::new(
            Schema::new(vec![
                ColumnDescriptor::new("g", DType::not_null(Kind::Int32)),
                ColumnDescriptor::new("v", DType::not_null(Kind::Int32)),
            ])
            .unwrap(),
        );
        let source = VecChunkSource::new(vec![input_chunk()]);
        let aggs = vec![
            AggregateSpec { kind: AggKind::First, arg: Some(Expr::column("v")), output_name: "first_v".into() },
            AggregateSpec { kind: AggKind::Last, arg: Some(Expr::column("v")), output_name: "last_v".into() },
        ];
        let mut op = GroupByOperator::new(
            Box::new(source),
            vec![Expr::column("g")],
            vec!["g".into()],
            aggs,
            input_schema,
            ExecutionContext::unbounded(),
        )
        .unwrap();
        let out = op.next().unwrap().unwrap();
        let mut by_group = std::collections::HashMap::new();
        for row in 0..out.row_count() {
            let g = out.columns()[0].get_raw::<i32>(row).unwrap();
            let first = out.columns()[1].get_raw::<i32>(row).unwrap();
            let last = out.columns()[2].get_raw::<i32>(row).unwrap();
            by_group.insert(g, (first, last));
        }
        assert_eq!(by_group[&1], (10, 20));
        assert_eq!(by_group[&2], (5, 7));
    }

    #[test]
    fn int_sum_overflow_is_an_error() {
        let schema = StdArc::new(Schema::new(vec![ColumnDescriptor::new("v", DType::not_null(Kind::Int64))]).unwrap());
        let mut v = ColumnBuffer::with_capacity(Kind::Int64, false, 2);
        v.push(&Value::Int64(i64::MAX)).unwrap();
        v.push(&Value::Int64(1)).unwrap();
        let chunk = Chunk::new(schema.clone(), vec![v], Dictionary::new()).unwrap();
        let source = VecChunkSource::new(vec![chunk]);
        let aggs = vec![AggregateSpec { kind: AggKind::Sum, arg: Some(Expr::column("v")), output_name: "sum_v".into() }];
        let mut op = GroupByOperator::new(Box::new(source), vec![], vec![], aggs, schema, ExecutionContext::unbounded()).unwrap();
        let err = op.next().unwrap_err();
        assert!(matches!(err, EngineError::Overflow { .. }));
    }
}
