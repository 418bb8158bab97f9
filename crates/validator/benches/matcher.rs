//! Benchmarks for rule matching and record validation
//!
//! Tests performance of:
//! - DSL parsing
//! - Matching DSL strings against pre-parsed constraint groups
//! - LIKE translation
//! - Selector-driven record validation

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::json;
use tessera_validator::matcher::like;
use tessera_validator::prelude::*;

// ============================================================================
// PARSING
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("dsl_three_rules", |b| {
        b.iter(|| ConstraintGroup::parse(black_box("required|min:3|max:9")))
    });

    group.bench_function("dsl_list_parameter", |b| {
        b.iter(|| ConstraintGroup::parse(black_box("required|in:red,green,blue,cyan,magenta")))
    });

    group.finish();
}

// ============================================================================
// MATCHING
// ============================================================================

fn bench_matches(c: &mut Criterion) {
    let mut group = c.benchmark_group("matches");
    let matcher = Matcher::new();
    let value = Value::from(3);

    group.bench_function("dsl_success", |b| {
        b.iter(|| matcher.matches(black_box(&value), "required|min:2|max:4", None))
    });

    group.bench_function("dsl_fail_first", |b| {
        b.iter(|| matcher.matches(black_box(&Value::Null), "required|min:2|max:4", None))
    });

    // Pre-parsed: no DSL parsing on the hot path
    let rules = ConstraintGroup::parse("required|min:2|max:4").unwrap();
    group.bench_function("constraint_group", |b| {
        b.iter(|| matcher.matches(black_box(&value), &rules, None))
    });

    let email = Value::from("someone@example.com");
    group.bench_function("email", |b| {
        b.iter(|| matcher.predicate("email", black_box(&email), &[], None))
    });

    group.finish();
}

// ============================================================================
// LIKE
// ============================================================================

fn bench_like(c: &mut Criterion) {
    let mut group = c.benchmark_group("like");

    for pattern in ["hello", "%dear%", "h_llo%wor_d", r"%100\%%"] {
        group.bench_with_input(BenchmarkId::new("compile", pattern), pattern, |b, pattern| {
            b.iter(|| like::compile(black_box(pattern), like::DEFAULT_ESCAPE))
        });
    }

    group.finish();
}

// ============================================================================
// VALIDATION
// ============================================================================

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate");
    let validator = MatcherBaseValidator::new();
    let rules = FieldRules::new()
        .rule("customer.email", "required|email")
        .unwrap()
        .rule("items.*.qty", "required|int|min:1")
        .unwrap()
        .rule("items.*.price", "required|numeric|min:0")
        .unwrap();

    for size in [1usize, 10, 100] {
        let items: Vec<serde_json::Value> = (0..size)
            .map(|i| json!({"qty": i + 1, "price": i as f64 * 1.5}))
            .collect();
        let input = Value::from(json!({
            "customer": {"email": "ann@example.com"},
            "items": items,
        }));

        group.bench_with_input(BenchmarkId::new("order_items", size), &input, |b, input| {
            b.iter(|| {
                let mut report = ValidationReport::new();
                validator.validate(&mut report, black_box(input), &rules, None, None)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_matches, bench_like, bench_validate);
criterion_main!(benches);
