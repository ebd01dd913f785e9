//! Benchmarks for markdown parsing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mindmark::document::parse;

fn bench_parse_simple(c: &mut Criterion) {
    let md = "# Hello\n- World";
    c.bench_function("parse_simple", |b| b.iter(|| parse(black_box(md))));
}

fn bench_parse_medium(c: &mut Criterion) {
    let md = include_str!("../tests/fixtures/sample.md");
    c.bench_function("parse_medium", |b| b.iter(|| parse(black_box(md))));
}

fn bench_parse_large(c: &mut Criterion) {
    let mut md = String::from("# Large\n");
    for section in 0..50 {
        md.push_str(&format!("## Section {section}\n"));
        for item in 0..20 {
            md.push_str(&format!("- Item {item} with *some* inline `code`\n"));
            md.push_str("  - Nested detail\n");
        }
    }
    c.bench_function("parse_large", |b| b.iter(|| parse(black_box(&md))));
}

criterion_group!(benches, bench_parse_simple, bench_parse_medium, bench_parse_large);
criterion_main!(benches);
