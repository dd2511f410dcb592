//! Benchmarks the reference backend's naive fixpoint evaluator on a small
//! selection view and a Kleene-star transitive closure, the two workloads
//! most sensitive to its lack of indexing and semi-naive delta tracking.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use graphview::ast::builders::PatternBuilder;
use graphview::ast::{RuleBlock, ViewDef, ViewKind};
use graphview::assembler;
use graphview::backend::reference::ReferenceBackend;
use graphview::backend::Backend;
use graphview::compiler;
use graphview::execution::Deadline;
use graphview::graph::Graph;
use graphview::ir::RuleTag;
use graphview::schema::SchemaRegistry;
use graphview::typecheck::TypePolicy;

fn chain_graph(schema: &SchemaRegistry, n: usize) -> Graph {
    let mut graph = Graph::new();
    graph.schema = schema.clone();
    for id in 0..n {
        graph.insert_node(id.to_string(), "Person").unwrap();
    }
    for id in 0..n - 1 {
        graph.insert_edge(format!("e{id}"), id.to_string(), (id + 1).to_string(), "Knows").unwrap();
    }
    graph
}

fn schema() -> SchemaRegistry {
    let mut schema = SchemaRegistry::new();
    schema.add_node_label("Person");
    schema.add_edge_label("Knows", "Person", "Person").unwrap();
    schema
}

fn bench_selection(c: &mut Criterion) {
    let schema = schema();
    let graph = chain_graph(&schema, 200);
    let pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), false)
        .build();
    let view = ViewDef {
        name: "__bench".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
    };
    let rules = compiler::compile_view(&view, &schema, TypePolicy::default(), RuleTag::Virtual).unwrap();
    let program = assembler::assemble(rules).unwrap();

    c.bench_function("selection_view_200_nodes", |b| {
        b.iter(|| {
            let mut backend = ReferenceBackend::new();
            backend.insert_facts("g", graph.base_facts("g")).unwrap();
            black_box(backend.evaluate(&program, "E___bench", &Deadline::none()).unwrap());
        });
    });
}

fn bench_transitive_closure(c: &mut Criterion) {
    let schema = schema();
    let graph = chain_graph(&schema, 60);
    let pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), true)
        .build();
    let view = ViewDef {
        name: "__bench_tc".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
    };
    let mut rules = compiler::compile_view(&view, &schema, TypePolicy::default(), RuleTag::Virtual).unwrap();
    rules.extend(compiler::transitive_closure_rules(&view, RuleTag::Virtual));
    let program = assembler::assemble(rules).unwrap();

    c.bench_function("transitive_closure_60_node_chain", |b| {
        b.iter(|| {
            let mut backend = ReferenceBackend::new();
            backend.insert_facts("g", graph.base_facts("g")).unwrap();
            black_box(backend.evaluate(&program, "TC_g_Knows_x", &Deadline::none()).unwrap());
        });
    });
}

criterion_group!(benches, bench_selection, bench_transitive_closure);
criterion_main!(benches);
