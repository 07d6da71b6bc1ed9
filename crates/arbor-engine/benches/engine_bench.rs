//! Benchmarks for the engine hot paths: flatten, query, and cascade.
//!
//! Run with: cargo bench -p arbor-engine

use arbor_engine::prelude::*;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use std::hint::black_box;

// A balanced forest: `width` roots, each with `width` children, each of
// those with `width` leaves.
fn forest(width: usize) -> Value {
    let roots: Vec<Value> = (0..width)
        .map(|r| {
            let children: Vec<Value> = (0..width)
                .map(|c| {
                    let leaves: Vec<Value> =
                        (0..width).map(|l| json!(format!("leaf {r}-{c}-{l}"))).collect();
                    json!({
                        "text": format!("branch {r}-{c}"),
                        "expanded": true,
                        "child": leaves
                    })
                })
                .collect();
            json!({
                "text": format!("root {r}"),
                "id": format!("root-{r}"),
                "expanded": true,
                "child": children
            })
        })
        .collect();
    Value::Array(roots)
}

fn bench_flatten(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/flatten");
    for width in [4usize, 8, 12] {
        let tree = Tree::from_value(&forest(width));
        group.bench_with_input(
            BenchmarkId::from_parameter(tree.node_count()),
            &(),
            |b, _| {
                b.iter(|| {
                    let flat = tree.flatten(true);
                    black_box(flat.ids.len());
                })
            },
        );
    }
    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/query");
    for width in [4usize, 8, 12] {
        let tree = Tree::from_value(&forest(width));
        group.bench_with_input(
            BenchmarkId::new("find_all_leaves", tree.node_count()),
            &(),
            |b, _| {
                b.iter(|| {
                    let leaves = tree.find_all(Criteria::from(json!({ "isLeaf": true })));
                    black_box(leaves.len());
                })
            },
        );
        group.bench_with_input(
            BenchmarkId::new("find_by_id", tree.node_count()),
            &(),
            |b, _| {
                b.iter(|| {
                    black_box(tree.find(format!("root-{}", width - 1)));
                })
            },
        );
    }
    group.finish();
}

fn bench_cascade(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine/cascade");
    for width in [4usize, 8, 12] {
        group.bench_with_input(
            BenchmarkId::from_parameter(width * width * width + width * width + width),
            &(),
            |b, _| {
                b.iter_batched(
                    || Tree::from_value(&forest(width)),
                    |mut tree| {
                        tree.check("root-0");
                        tree.uncheck("root-0");
                        black_box(tree.checked(CheckModel::All).len());
                    },
                    criterion::BatchSize::SmallInput,
                )
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_flatten, bench_query, bench_cascade);
criterion_main!(benches);
