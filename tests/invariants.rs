//! Invariant-style checks that hold for any input, not just hand-picked
//! fixtures: a permutation/closure property per operator rather than a
//! fixed expected output.

use std::sync::Arc;

use colex::execution::aggregate::{AggregateSpec, GroupByOperator};
use colex::execution::context::ExecutionContext;
use colex::execution::filter::FilterOperator;
use colex::execution::join::{JoinKind, JoinOperator};
use colex::execution::operator::{ChunkSource, VecChunkSource};
use colex::execution::project::ProjectOperator;
use colex::execution::sort::{SortKey, SortOperator};
use colex::expression::ast::AggKind;
use colex::expression::builder::gt;
use colex::types::column_buffer::ColumnBuffer;
use colex::types::dictionary::Dictionary;
use colex::types::schema::ColumnDescriptor;
use colex::{Chunk, DType, Expr, Kind, Schema, Value};

fn int_chunk(name: &str, values: &[i32]) -> (Arc<Schema>, Chunk) {
    let schema = Arc::new(Schema::new(vec![ColumnDescriptor::new(name, DType::not_null(Kind::Int32))]).unwrap());
    let mut col = ColumnBuffer::with_capacity(Kind::Int32, false, values.len());
    for v in values {
        col.push(&Value::Int32(*v)).unwrap();
    }
    (schema.clone(), Chunk::new(schema, vec![col], Dictionary::new()).unwrap())
}

#[test]
fn filter_only_removes_rows_never_alters_survivors() {
    let (schema, chunk) = int_chunk("a", &[5, -2, 9, 0, 17, -4]);
    let expr = gt(Expr::column("a"), Expr::lit(Value::Int32(0)));
    let mut op = FilterOperator::new(Box::new(VecChunkSource::new(vec![chunk])), &expr, &schema, ExecutionContext::unbounded()).unwrap();
    let out = op.next().unwrap().unwrap();
    let survivors: Vec<i32> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(out.physical_row(r)).unwrap()).collect();
    assert_eq!(survivors, vec![5, 9, 17]);
    assert!(survivors.iter().all(|&v| v > 0));
}

#[test]
fn project_preserves_row_count_and_values_under_rename() {
    let (schema, chunk) = int_chunk("a", &[1, 2, 3]);
    let exprs = vec![(Expr::column("a"), "renamed".to_string())];
    let mut op = ProjectOperator::new(Box::new(VecChunkSource::new(vec![chunk])), &exprs, &schema, ExecutionContext::unbounded()).unwrap();
    let out = op.next().unwrap().unwrap();
    assert_eq!(out.row_count(), 3);
    let values: Vec<i32> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(r).unwrap()).collect();
    assert_eq!(values, vec![1, 2, 3]);
}

#[test]
fn sort_output_is_a_permutation_of_the_input() {
    let (schema, chunk) = int_chunk("a", &[40, 10, 30, 20, 10]);
    let keys = vec![SortKey { expr: Expr::column("a"), ascending: true }];
    let mut op = SortOperator::new(Box::new(VecChunkSource::new(vec![chunk])), keys, schema, 1024, ExecutionContext::unbounded());
    let out = op.next().unwrap().unwrap();
    let mut sorted: Vec<i32> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(r).unwrap()).collect();
    let mut original = vec![40, 10, 30, 20, 10];
    sorted.sort();
    original.sort();
    assert_eq!(sorted, original); // same multiset
    let ascending: Vec<i32> = (0..out.row_count()).map(|r| out.columns()[0].get_raw::<i32>(r).unwrap()).collect();
    assert!(ascending.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn groupby_aggregate_counts_sum_to_total_row_count() {
    let schema = Arc::new(
        Schema::new(vec![
            ColumnDescriptor::new("g", DType::not_null(Kind::Int32)),
            ColumnDescriptor::new("v", DType::not_null(Kind::Int32)),
        ])
        .unwrap(),
    );
    let mut g = ColumnBuffer::with_capacity(Kind::Int32, false, 6);
    let mut v = ColumnBuffer::with_capacity(Kind::Int32, false, 6);
    for (gv, vv) in [(1, 1), (2, 2), (1, 3), (3, 4), (2, 5), (1, 6)] {
        g.push(&Value::Int32(gv)).unwrap();
        v.push(&Value::Int32(vv)).unwrap();
    }
    let chunk = Chunk::new(schema.clone(), vec![g, v], Dictionary::new()).unwrap();

    let aggs = vec![AggregateSpec { kind: AggKind::Count, arg: Some(Expr::column("v")), output_name: "cnt".into() }];
    let mut op = GroupByOperator::new(
        Box::new(VecChunkSource::new(vec![chunk])),
        vec![Expr::column("g")],
        vec!["g".into()],
        aggs,
        schema,
        ExecutionContext::unbounded(),
    )
    .unwrap();
    let out = op.next().unwrap().unwrap();
    let total: i64 = (0..out.row_count()).map(|r| out.columns()[1].get_raw::<i64>(r).unwrap()).sum();
    assert_eq!(total, 6);
    assert_eq!(out.row_count(), 3); // three distinct groups
}

#[test]
fn inner_join_row_count_equals_sum_of_per_key_match_counts() {
    let left_schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("k", DType::not_null(Kind::Int32))]).unwrap());
    let right_schema = Arc::new(Schema::new(vec![ColumnDescriptor::new("k", DType::not_null(Kind::Int32))]).unwrap());

    let mut lk = ColumnBuffer::with_capacity(Kind::Int32, false, 3);
    for v in [1, 2, 3] {
        lk.push(&Value::Int32(v)).unwrap();
    }
    let left_chunk = Chunk::new(left_schema.clone(), vec![lk], Dictionary::new()).unwrap();

    // right side: key 1 appears twice, key 2 once, key 3 has no match
    let mut rk = ColumnBuffer::with_capacity(Kind::Int32, false, 3);
    for v in [1, 1, 2] {
        rk.push(&Value::Int32(v)).unwrap();
    }
    let right_chunk = Chunk::new(right_schema.clone(), vec![rk], Dictionary::new()).unwrap();

    let mut op = JoinOperator::new(
        Box::new(VecChunkSource::new(vec![left_chunk])),
        Box::new(VecChunkSource::new(vec![right_chunk])),
        vec![Expr::column("k")],
        vec![Expr::column("k")],
        JoinKind::Inner,
        left_schema,
        right_schema,
        ExecutionContext::unbounded(),
    )
    .unwrap();
    let out = op.next().unwrap().unwrap();
    // key 1: 2 matches, key 2: 1 match, key 3: 0 matches -> 3 total rows
    assert_eq!(out.row_count(), 3);
}

#[test]
fn chunk_selection_narrows_but_never_reorders_underlying_storage() {
    let (_, chunk) = int_chunk("a", &[10, 20, 30, 40]);
    let mut narrowed = chunk.clone();
    narrowed.set_selection(Some(colex::types::chunk::SelectionVector::new(vec![3, 1])));
    assert_eq!(narrowed.row_count(), 2);
    assert_eq!(narrowed.columns()[0].get_raw::<i32>(narrowed.physical_row(0)), Some(40));
    assert_eq!(narrowed.columns()[0].get_raw::<i32>(narrowed.physical_row(1)), Some(20));
    let materialized = narrowed.materialize();
    assert!(materialized.selection().is_none());
    assert_eq!(materialized.columns()[0].get_raw::<i32>(0), Some(40));
    assert_eq!(materialized.columns()[0].get_raw::<i32>(1), Some(20));
}

#[test]
fn dictionary_merge_is_idempotent_for_already_shared_strings() {
    let mut target = Dictionary::new();
    target.intern("alpha");
    target.intern("beta");

    let mut source = Dictionary::new();
    source.intern("beta");
    source.intern("gamma");

    let remap = target.merge(&source);
    let len_after_first_merge = target.len();
    // merging the same source again must not grow the dictionary or change ids
    let remap_again = target.merge(&source);
    assert_eq!(target.len(), len_after_first_merge);
    assert_eq!(remap, remap_again);
}
