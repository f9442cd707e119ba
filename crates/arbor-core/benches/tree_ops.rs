use std::hint::black_box;

use arbor_core::{parse, to_json_string, JsonTree, TreeBuilder, TreeReader};
use criterion::{criterion_group, criterion_main, Criterion};

fn sample_json() -> String {
    let mut out = String::from(r#"{"users":["#);
    for i in 0..100 {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&format!(
            r#"{{"id":{i},"name":"user{i}","active":{},"score":{}.5}}"#,
            i % 2 == 0,
            i * 3
        ));
    }
    out.push_str(r#"],"total":100}"#);
    out
}

fn bench_append(c: &mut Criterion) {
    c.bench_function("array_append_1000", |b| {
        b.iter(|| {
            let mut tree = JsonTree::new();
            let arr = tree.new_array();
            for i in 0..1000i64 {
                let node = tree.new_value(i);
                tree.add(arr, node).unwrap();
            }
            black_box(tree.last_child(arr))
        })
    });
}

fn bench_parse(c: &mut Criterion) {
    let json = sample_json();
    c.bench_function("parse_100_users", |b| {
        b.iter(|| black_box(parse(&json).unwrap()))
    });
}

fn bench_serialize(c: &mut Criterion) {
    let (tree, root) = parse(&sample_json()).unwrap();
    c.bench_function("to_json_string_100_users", |b| {
        b.iter(|| black_box(to_json_string(&tree, root).unwrap()))
    });
}

fn bench_token_replay(c: &mut Criterion) {
    let (tree, root) = parse(&sample_json()).unwrap();
    c.bench_function("reader_builder_replay", |b| {
        b.iter(|| {
            let mut reader = TreeReader::new(&tree, root);
            black_box(TreeBuilder::build(&mut reader).unwrap())
        })
    });
}

fn bench_deep_eq(c: &mut Criterion) {
    let (ta, ra) = parse(&sample_json()).unwrap();
    let (tb, rb) = parse(&sample_json()).unwrap();
    c.bench_function("deep_eq_100_users", |b| {
        b.iter(|| black_box(arbor_core::deep_eq_across(&ta, ra, &tb, rb)))
    });
}

criterion_group!(
    benches,
    bench_append,
    bench_parse,
    bench_serialize,
    bench_token_replay,
    bench_deep_eq
);
criterion_main!(benches);
