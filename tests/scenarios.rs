//! End-to-end coverage of the engine's documented scenarios: schema-typed
//! base facts flowing through a compiled view, a Skolemized transformation,
//! Kleene-star transitive closure, type pruning, view-on-view composition,
//! and cyclic-dependency rejection. Exercises the public pipeline
//! (`compiler` -> `rewriter` -> `assembler` -> `backend::reference`)
//! directly against hand-built `ViewDef`s rather than through the surface
//! parser, so a failure here points at the IR/evaluation layer rather than
//! at grammar details covered by `parser`'s and `statement`'s own tests.

use graphview::ast::builders::PatternBuilder;
use graphview::ast::{ConstructElement, CompareOp, Expr, Literal, PropertyPredicate, RuleBlock, SkolemBinding, ViewDef, ViewKind};
use graphview::assembler;
use graphview::backend::reference::ReferenceBackend;
use graphview::backend::Backend;
use graphview::catalog::ViewCatalog;
use graphview::compiler;
use graphview::error::GraphViewError;
use graphview::execution::Deadline;
use graphview::graph::Graph;
use graphview::ir::{IrTerm, Rule, RuleTag};
use graphview::rewriter;
use graphview::schema::SchemaRegistry;
use graphview::skolem::SkolemRegistry;
use graphview::typecheck::TypePolicy;

fn person_knows_schema() -> SchemaRegistry {
    let mut schema = SchemaRegistry::new();
    schema.add_node_label("Person");
    schema.add_node_label("Company");
    schema.add_edge_label("Knows", "Person", "Person").unwrap();
    schema
}

fn assembled(rules: Vec<Rule>) -> graphview::ir::RuleProgram {
    assembler::assemble(rules).unwrap()
}

fn evaluate(backend: &mut ReferenceBackend, program: &graphview::ir::RuleProgram, target: &str) -> Vec<Vec<String>> {
    backend
        .evaluate(program, target, &Deadline::none())
        .unwrap()
        .into_iter()
        .map(|atom| {
            atom.args
                .into_iter()
                .map(|t| match t {
                    IrTerm::Const(c) => c,
                    IrTerm::Var(v) => v,
                })
                .collect()
        })
        .collect()
}

#[test]
fn scenario_basic_selection() {
    let schema = person_knows_schema();
    let mut graph = Graph::new();
    graph.schema = schema.clone();
    graph.insert_node("1", "Person").unwrap();
    graph.insert_node("2", "Person").unwrap();
    graph.insert_edge("10", "1", "2", "Knows").unwrap();

    let pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), false)
        .build();
    let view_f = ViewDef {
        name: "F".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
    };

    let mut catalog = ViewCatalog::new();
    catalog.register(view_f, &schema, TypePolicy::default()).unwrap();

    let rules = rewriter::unfold_view(&catalog, "F").unwrap();
    let program = assembled(rules);

    let mut backend = ReferenceBackend::new();
    backend.insert_facts("g", graph.base_facts("g")).unwrap();

    let nodes = evaluate(&mut backend, &program, "N_F");
    let edges = evaluate(&mut backend, &program, "E_F");

    assert_eq!(nodes.len(), 2);
    assert!(nodes.contains(&vec!["1".to_string(), "Person".to_string()]));
    assert!(nodes.contains(&vec!["2".to_string(), "Person".to_string()]));
    assert_eq!(edges, vec![vec!["10".to_string(), "1".to_string(), "2".to_string(), "Knows".to_string()]]);
}

#[test]
fn scenario_transformation_and_skolem_determinism() {
    let schema = person_knows_schema();
    let mut graph = Graph::new();
    graph.schema = schema.clone();
    graph.insert_node("1", "Person").unwrap();
    graph.insert_node("2", "Person").unwrap();
    graph.insert_edge("10", "1", "2", "Knows").unwrap();

    let pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), false)
        .build();
    let view_d = ViewDef {
        name: "D".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock {
            pattern,
            construct: vec![ConstructElement::Edge {
                var: "y".into(),
                src: "a".into(),
                dst: "b".into(),
                label: "Derived".into(),
            }],
            skolems: vec![SkolemBinding { var: "y".into(), fn_name: "d".into(), args: vec!["x".into()] }],
            ..RuleBlock::default()
        }],
    };

    let mut catalog = ViewCatalog::new();
    catalog.register(view_d, &schema, TypePolicy::default()).unwrap();
    let rules = rewriter::unfold_view(&catalog, "D").unwrap();
    let program = assembled(rules);

    let mut backend = ReferenceBackend::new();
    backend.insert_facts("g", graph.base_facts("g")).unwrap();

    let first = evaluate(&mut backend, &program, "E_D");
    let second = evaluate(&mut backend, &program, "E_D");
    assert_eq!(first, second, "re-evaluating without mutation must yield the same Skolem id");
    assert_eq!(first.len(), 1);

    let expected_id = SkolemRegistry::new().intern("d", &["10".to_string()]).unwrap();
    assert_eq!(first[0], vec![expected_id.to_string(), "1".to_string(), "2".to_string(), "Derived".to_string()]);
}

#[test]
fn scenario_transitive_closure() {
    let schema = person_knows_schema();
    let mut graph = Graph::new();
    graph.schema = schema.clone();
    for id in 1..=5 {
        graph.insert_node(id.to_string(), "Person").unwrap();
    }
    for (edge_id, (src, dst)) in [(10, (1, 2)), (11, (2, 3)), (12, (3, 4)), (13, (4, 5))] {
        graph.insert_edge(edge_id.to_string(), src.to_string(), dst.to_string(), "Knows").unwrap();
    }

    let pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), true)
        .build();
    let view = ViewDef {
        name: "__query".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
    };

    let mut rules = compiler::compile_view(&view, &schema, TypePolicy::default(), RuleTag::Virtual).unwrap();
    rules.extend(compiler::transitive_closure_rules(&view, RuleTag::Virtual));
    let program = assembled(rules);

    let mut backend = ReferenceBackend::new();
    backend.insert_facts("g", graph.base_facts("g")).unwrap();

    let pairs = evaluate(&mut backend, &program, "TC_g_Knows_x");
    assert_eq!(pairs.len(), 10);
    for i in 1..=5 {
        for j in (i + 1)..=5 {
            assert!(pairs.contains(&vec![i.to_string(), j.to_string()]), "missing pair ({i},{j})");
        }
    }
}

#[test]
fn scenario_type_pruning() {
    let schema = person_knows_schema();
    let pattern = PatternBuilder::new()
        .node("a", Some("Company"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), false)
        .build();
    let view = ViewDef {
        name: "__query".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
    };

    let typecheck_on = TypePolicy { typecheck: true, prunequery: false };
    let err = compiler::compile_view(&view, &schema, typecheck_on, RuleTag::Virtual).unwrap_err();
    assert!(matches!(err, GraphViewError::TypeError(_)));

    let prune_on = TypePolicy { typecheck: false, prunequery: true };
    let rules = compiler::compile_view(&view, &schema, prune_on, RuleTag::Virtual).unwrap();
    assert!(rules.is_empty());
}

#[test]
fn scenario_view_on_view_composition() {
    let schema = person_knows_schema();
    let mut graph = Graph::new();
    graph.schema = schema.clone();
    graph.insert_node("1", "Person").unwrap();
    graph.insert_node("2", "Person").unwrap();
    graph.insert_edge("10", "1", "2", "Knows").unwrap();
    graph.insert_edge("11", "2", "1", "Knows").unwrap();
    graph.insert_node_prop("1", "age", "30").unwrap();
    graph.insert_node_prop("2", "age", "20").unwrap();

    let l1_pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), false)
        .build();
    let l1 = ViewDef {
        name: "L1".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern: l1_pattern, ..RuleBlock::default() }],
    };

    let l2_pattern = PatternBuilder::new()
        .node("a", Some("Person"))
        .node("b", Some("Person"))
        .edge("x", "a", "b", Some("Knows"), false)
        .build();
    let l2 = ViewDef {
        name: "L2".into(),
        source: "L1".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock {
            pattern: l2_pattern,
            where_expr: Some(Expr::BinOp(
                CompareOp::Gt,
                Box::new(Expr::Ref("a".into(), "age".into())),
                Box::new(Expr::Lit(Literal::String("25".into()))),
            )),
            ..RuleBlock::default()
        }],
    };

    let mut catalog = ViewCatalog::new();
    catalog.register(l1, &schema, TypePolicy::default()).unwrap();
    catalog.register(l2, &schema, TypePolicy::default()).unwrap();

    let rules = rewriter::unfold_view(&catalog, "L2").unwrap();
    let program = assembled(rules);

    let mut backend = ReferenceBackend::new();
    backend.insert_facts("g", graph.base_facts("g")).unwrap();

    let edges = evaluate(&mut backend, &program, "E_L2");
    assert_eq!(edges, vec![vec!["10".to_string(), "1".to_string(), "2".to_string(), "Knows".to_string()]]);
}

#[test]
fn scenario_cycle_detection_rejects_and_leaves_catalog_unchanged() {
    let schema = SchemaRegistry::new();
    let pattern = PatternBuilder::new().node("a", None).build();

    let mut catalog = ViewCatalog::new();
    catalog
        .register(
            ViewDef {
                name: "A".into(),
                source: "B".into(),
                kind: ViewKind::Virtual,
                with_default_map: true,
                blocks: vec![RuleBlock { pattern: pattern.clone(), ..RuleBlock::default() }],
            },
            &schema,
            TypePolicy::default(),
        )
        .unwrap();
    assert!(catalog.contains("A"));
    assert!(!catalog.contains("B"));

    let err = catalog
        .register(
            ViewDef {
                name: "B".into(),
                source: "A".into(),
                kind: ViewKind::Virtual,
                with_default_map: true,
                blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
            },
            &schema,
            TypePolicy::default(),
        )
        .unwrap_err();

    assert!(matches!(err, GraphViewError::CyclicViewDependency(_)));
    assert!(!catalog.contains("B"), "catalog must not retain the rejected view");
    assert!(catalog.contains("A"), "the prior registration must be untouched");
}

#[test]
fn property_predicate_filters_inline_on_construct() {
    // Exercises a node-level inline property predicate rather than a WHERE
    // clause, covering the other branch through `ground_set_body`.
    let mut schema = SchemaRegistry::new();
    schema.add_node_label("Person");
    let mut graph = Graph::new();
    graph.schema = schema.clone();
    graph.insert_node("1", "Person").unwrap();
    graph.insert_node("2", "Person").unwrap();
    graph.insert_node_prop("1", "vip", "true").unwrap();
    graph.insert_node_prop("2", "vip", "false").unwrap();

    let pattern = PatternBuilder::new()
        .node_with_props(
            "a",
            Some("Person"),
            vec![PropertyPredicate { key: "vip".into(), op: CompareOp::Eq, rhs: Expr::Lit(Literal::String("true".into())) }],
        )
        .build();
    let view = ViewDef {
        name: "__query".into(),
        source: "g".into(),
        kind: ViewKind::Virtual,
        with_default_map: true,
        blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
    };

    let rules = compiler::compile_view(&view, &schema, TypePolicy::default(), RuleTag::Virtual).unwrap();
    let program = assembled(rules);
    let mut backend = ReferenceBackend::new();
    backend.insert_facts("g", graph.base_facts("g")).unwrap();
    let nodes = evaluate(&mut backend, &program, "N___query");
    assert_eq!(nodes, vec![vec!["1".to_string(), "Person".to_string()]]);
}
