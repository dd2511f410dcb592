//! # View Compiler (C6)
//!
//! Lowers a [`ViewDef`] into a flat list of [`ir::Rule`]s over the
//! predicate families described in [`crate::ir`]. One rule block compiles
//! to one rule per output fact (each default-map carry-through variable,
//! each `CONSTRUCT`/`ADD` element) sharing a common body: the pattern's
//! ground-set atoms, its inline and `WHERE` property predicates, and - for
//! Skolemized elements - the atom that binds the synthesized id.
//!
//! `UNION` blocks compile independently and contribute their rules to the
//! same head predicates, matching Datalog's usual "more rules, same head
//! means more ways to derive it" semantics. A `WHERE` clause with `OR` is
//! expanded to disjunctive normal form first, for the same reason: each
//! disjunct becomes its own rule.

use crate::ast::{
    CompareOp, ConstructElement, Expr, Literal, Pattern, RuleBlock, SkolemBinding, ViewDef,
};
use crate::error::{GraphViewError, Result};
use crate::ir::{Atom, BodyElement, IrTerm, Predicate, Rule, RuleTag};
use crate::schema::SchemaRegistry;
use crate::typecheck::{self, TypePolicy};
use std::collections::{HashMap, HashSet};

/// Compile a single view definition into its contributed rules.
///
/// `tag` marks whether the resulting rules are virtual (recomputed at
/// query time) or materialized (already-computed extensional facts); the
/// caller (the rewriter) chooses based on the view's declared kind.
pub fn compile_view(
    view: &ViewDef,
    schema: &SchemaRegistry,
    policy: TypePolicy,
    tag: RuleTag,
) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    for (block_idx, block) in view.blocks.iter().enumerate() {
        let check = typecheck::check_pattern(&block.pattern, schema);
        if !typecheck::apply_policy(&check, policy)? {
            continue;
        }
        rules.extend(compile_block(view, block, block_idx, tag)?);
    }
    Ok(rules)
}

fn node_and_edge_vars(pattern: &Pattern) -> (HashSet<String>, HashSet<String>) {
    (
        pattern.nodes.iter().map(|n| n.var.clone()).collect(),
        pattern.edges.iter().map(|e| e.var.clone()).collect(),
    )
}

/// Output name for `var`, honoring an explicit `MAP from -> to`.
fn output_name<'a>(block: &'a RuleBlock, var: &'a str) -> &'a str {
    block
        .mappings
        .iter()
        .find(|m| m.from == var)
        .map_or(var, |m| m.to.as_str())
}

fn compile_block(
    view: &ViewDef,
    block: &RuleBlock,
    block_idx: usize,
    tag: RuleTag,
) -> Result<Vec<Rule>> {
    let (node_vars, edge_vars) = node_and_edge_vars(&block.pattern);
    let clauses = match &block.where_expr {
        Some(e) => expr_to_dnf(e),
        None => vec![Vec::new()],
    };

    let mut rules = Vec::new();
    for clause in clauses {
        let base_body = ground_set_body(view, block, &node_vars, &edge_vars, &clause)?;

        // Default MAP: identity carry-through for every matched variable not
        // covered by an explicit CONSTRUCT element and not DELETE'd. Starred
        // edge variables have no single identity to carry and are skipped.
        let constructed: HashSet<&str> = block.construct.iter().map(ConstructElement::var).collect();
        let deleted: HashSet<&str> =
            block.deletes.iter().map(|d| d.target_var.as_str()).collect();
        let starred: HashSet<&str> =
            block.pattern.edges.iter().filter(|e| e.star).map(|e| e.var.as_str()).collect();

        for node in &block.pattern.nodes {
            let v = node.var.as_str();
            if constructed.contains(v) || deleted.contains(v) {
                continue;
            }
            let label_term = node_label_term(node);
            rules.push(Rule {
                head: Atom::new(
                    Predicate::Node { source: view.name.clone() },
                    vec![IrTerm::Var(output_name(block, v).to_string()), label_term],
                ),
                body: base_body.clone(),
                provenance: view.name.clone(),
                tag,
            });
        }
        for edge in &block.pattern.edges {
            let v = edge.var.as_str();
            if constructed.contains(v) || deleted.contains(v) || starred.contains(v) {
                continue;
            }
            let label_term = edge_label_term(edge);
            rules.push(Rule {
                head: Atom::new(
                    Predicate::Edge { source: view.name.clone() },
                    vec![
                        IrTerm::Var(output_name(block, v).to_string()),
                        IrTerm::Var(output_name(block, &edge.src).to_string()),
                        IrTerm::Var(output_name(block, &edge.dst).to_string()),
                        label_term,
                    ],
                ),
                body: base_body.clone(),
                provenance: view.name.clone(),
                tag,
            });
        }

        // CONSTRUCT: bound variables carry their matched identity through;
        // unbound variables are always Skolemized.
        for el in &block.construct {
            rules.push(compile_construct_element(
                view, block, el, &node_vars, &edge_vars, &base_body, block_idx, tag, false,
            )?);
        }
        // ADD: always Skolemized, regardless of whether the variable name
        // happens to coincide with something matched.
        for el in &block.adds {
            rules.push(compile_construct_element(
                view, block, el, &node_vars, &edge_vars, &base_body, block_idx, tag, true,
            )?);
        }
    }

    Ok(rules)
}

fn node_label_term(node: &crate::ast::PatternNode) -> IrTerm {
    match &node.label {
        Some(l) => IrTerm::Const(l.clone()),
        None => IrTerm::Var(format!("{}__label", node.var)),
    }
}

fn edge_label_term(edge: &crate::ast::PatternEdge) -> IrTerm {
    match &edge.label {
        Some(l) => IrTerm::Const(l.clone()),
        None => IrTerm::Var(format!("{}__label", edge.var)),
    }
}

/// The pattern's ground-set atoms (`N`/`E` over the view's source, one per
/// matched node/edge) plus property-predicate atoms and the comparisons
/// from one DNF clause of the `WHERE` expression.
fn ground_set_body(
    view: &ViewDef,
    block: &RuleBlock,
    node_vars: &HashSet<String>,
    edge_vars: &HashSet<String>,
    clause: &[Expr],
) -> Result<Vec<BodyElement>> {
    let mut body = Vec::new();

    for node in &block.pattern.nodes {
        body.push(BodyElement::Atom(Atom::new(
            Predicate::Node { source: view.source.clone() },
            vec![IrTerm::Var(node.var.clone()), node_label_term(node)],
        )));
        for prop in &node.props {
            let (prop_var, atom) = prop_atom(&view.source, &node.var, &prop.key, true);
            body.push(BodyElement::Atom(atom));
            let rhs = expr_to_term(&prop.rhs)?;
            body.push(BodyElement::Compare(prop.op, prop_var, rhs));
        }
    }
    for edge in &block.pattern.edges {
        if edge.star {
            body.push(BodyElement::Atom(Atom::new(
                Predicate::TransitiveClosure {
                    source: view.source.clone(),
                    label: edge.label.clone().unwrap_or_default(),
                    view_var: edge.var.clone(),
                },
                vec![IrTerm::Var(edge.src.clone()), IrTerm::Var(edge.dst.clone())],
            )));
        } else {
            body.push(BodyElement::Atom(Atom::new(
                Predicate::Edge { source: view.source.clone() },
                vec![
                    IrTerm::Var(edge.var.clone()),
                    IrTerm::Var(edge.src.clone()),
                    IrTerm::Var(edge.dst.clone()),
                    edge_label_term(edge),
                ],
            )));
        }
        for prop in &edge.props {
            let (prop_var, atom) = prop_atom(&view.source, &edge.var, &prop.key, false);
            body.push(BodyElement::Atom(atom));
            let rhs = expr_to_term(&prop.rhs)?;
            body.push(BodyElement::Compare(prop.op, prop_var, rhs));
        }
    }

    for comparison in clause {
        if let Expr::BinOp(op, lhs, rhs) = comparison {
            body.extend(lower_comparison(*op, lhs, rhs, &view.source, node_vars, edge_vars)?);
        }
    }

    Ok(body)
}

fn prop_atom(source: &str, var: &str, key: &str, is_node: bool) -> (IrTerm, Atom) {
    let fresh = IrTerm::Var(format!("{var}__{key}"));
    let predicate = if is_node {
        Predicate::NodeProp { source: source.to_string() }
    } else {
        Predicate::EdgeProp { source: source.to_string() }
    };
    (fresh.clone(), Atom::new(predicate, vec![IrTerm::Var(var.to_string()), IrTerm::Const(key.to_string()), fresh]))
}

fn lower_comparison(
    op: CompareOp,
    lhs: &Expr,
    rhs: &Expr,
    source: &str,
    node_vars: &HashSet<String>,
    edge_vars: &HashSet<String>,
) -> Result<Vec<BodyElement>> {
    let mut body = Vec::new();
    let lhs_term = lower_side(lhs, source, node_vars, edge_vars, &mut body);
    let rhs_term = lower_side(rhs, source, node_vars, edge_vars, &mut body);
    body.push(BodyElement::Compare(op, lhs_term, rhs_term));
    Ok(body)
}

fn lower_side(
    expr: &Expr,
    source: &str,
    node_vars: &HashSet<String>,
    edge_vars: &HashSet<String>,
    body: &mut Vec<BodyElement>,
) -> IrTerm {
    match expr {
        Expr::Lit(Literal::String(s)) => IrTerm::Const(s.clone()),
        Expr::Lit(Literal::Number(n)) => IrTerm::Const(n.to_string()),
        Expr::Ref(var, key) => {
            let is_node = node_vars.contains(var);
            let is_edge = edge_vars.contains(var);
            let (prop_var, atom) = prop_atom(source, var, key, is_node || !is_edge);
            body.push(BodyElement::Atom(atom));
            prop_var
        }
        Expr::BinOp(..) => IrTerm::Const(String::new()),
    }
}

fn expr_to_term(expr: &Expr) -> Result<IrTerm> {
    match expr {
        Expr::Lit(Literal::String(s)) => Ok(IrTerm::Const(s.clone())),
        Expr::Lit(Literal::Number(n)) => Ok(IrTerm::Const(n.to_string())),
        Expr::Ref(var, key) => Ok(IrTerm::Var(format!("{var}__{key}"))),
        Expr::BinOp(..) => Err(GraphViewError::TypeError(
            "nested boolean expression is not valid as a comparison operand".to_string(),
        )),
    }
}

/// Flatten a `WHERE` expression into disjunctive normal form: a list of
/// conjunctive clauses, each a list of atomic (non-boolean) comparisons.
fn expr_to_dnf(expr: &Expr) -> Vec<Vec<Expr>> {
    match expr {
        Expr::BinOp(CompareOp::And, lhs, rhs) => {
            let left = expr_to_dnf(lhs);
            let right = expr_to_dnf(rhs);
            let mut out = Vec::new();
            for l in &left {
                for r in &right {
                    let mut combined = l.clone();
                    combined.extend(r.clone());
                    out.push(combined);
                }
            }
            out
        }
        Expr::BinOp(CompareOp::Or, lhs, rhs) => {
            let mut out = expr_to_dnf(lhs);
            out.extend(expr_to_dnf(rhs));
            out
        }
        other => vec![vec![other.clone()]],
    }
}

#[allow(clippy::too_many_arguments)]
fn compile_construct_element(
    view: &ViewDef,
    block: &RuleBlock,
    el: &ConstructElement,
    node_vars: &HashSet<String>,
    edge_vars: &HashSet<String>,
    base_body: &[BodyElement],
    block_idx: usize,
    tag: RuleTag,
    always_skolem: bool,
) -> Result<Rule> {
    let var = el.var();
    let is_bound = match el {
        ConstructElement::Node { .. } => node_vars.contains(var),
        ConstructElement::Edge { .. } => edge_vars.contains(var),
    };

    let mut body = base_body.to_vec();
    let id_term = if !always_skolem && is_bound {
        IrTerm::Var(var.to_string())
    } else {
        let binding = block.skolems.iter().find(|s| s.var == var);
        let (fn_name, args) = match binding {
            Some(SkolemBinding { fn_name, args, .. }) => (fn_name.clone(), args.clone()),
            None => {
                let mut args: Vec<String> = block.pattern.bound_variables().into_iter().collect();
                args.sort();
                (format!("__auto_{block_idx}_{var}"), args)
            }
        };
        body.push(BodyElement::Atom(Atom::new(
            Predicate::Skolem { fn_name },
            std::iter::once(IrTerm::Var(var.to_string()))
                .chain(args.into_iter().map(IrTerm::Var))
                .collect(),
        )));
        IrTerm::Var(var.to_string())
    };

    let head = match el {
        ConstructElement::Node { label, .. } => Atom::new(
            Predicate::Node { source: view.name.clone() },
            vec![id_term, IrTerm::Const(label.clone())],
        ),
        ConstructElement::Edge { src, dst, label, .. } => Atom::new(
            Predicate::Edge { source: view.name.clone() },
            vec![
                id_term,
                IrTerm::Var(output_name(block, src).to_string()),
                IrTerm::Var(output_name(block, dst).to_string()),
                IrTerm::Const(label.clone()),
            ],
        ),
    };

    Ok(Rule { head, body, provenance: view.name.clone(), tag })
}

/// Auxiliary transitive-closure rules for every starred edge in a view's
/// patterns: a base case over the direct edge, and a recursive step.
/// Registered once per distinct `(source, label)` pair actually used.
#[must_use]
pub fn transitive_closure_rules(view: &ViewDef, tag: RuleTag) -> Vec<Rule> {
    let mut seen: HashMap<(String, String), ()> = HashMap::new();
    let mut rules = Vec::new();
    for block in &view.blocks {
        for edge in &block.pattern.edges {
            if !edge.star {
                continue;
            }
            let Some(label) = &edge.label else { continue };
            let key = (view.source.clone(), label.clone());
            if seen.contains_key(&key) {
                continue;
            }
            seen.insert(key, ());

            let predicate = Predicate::TransitiveClosure {
                source: view.source.clone(),
                label: label.clone(),
                view_var: edge.var.clone(),
            };

            rules.push(Rule {
                head: Atom::new(
                    predicate.clone(),
                    vec![IrTerm::Var("__tc_s".into()), IrTerm::Var("__tc_d".into())],
                ),
                body: vec![BodyElement::Atom(Atom::new(
                    Predicate::Edge { source: view.source.clone() },
                    vec![
                        IrTerm::Var("__tc_e".into()),
                        IrTerm::Var("__tc_s".into()),
                        IrTerm::Var("__tc_d".into()),
                        IrTerm::Const(label.clone()),
                    ],
                ))],
                provenance: view.name.clone(),
                tag,
            });
            rules.push(Rule {
                head: Atom::new(
                    predicate,
                    vec![IrTerm::Var("__tc_s".into()), IrTerm::Var("__tc_d".into())],
                ),
                body: vec![
                    BodyElement::Atom(Atom::new(
                        Predicate::Edge { source: view.source.clone() },
                        vec![
                            IrTerm::Var("__tc_e2".into()),
                            IrTerm::Var("__tc_s".into()),
                            IrTerm::Var("__tc_m".into()),
                            IrTerm::Const(label.clone()),
                        ],
                    )),
                    BodyElement::Atom(Atom::new(
                        Predicate::TransitiveClosure {
                            source: view.source.clone(),
                            label: label.clone(),
                            view_var: edge.var.clone(),
                        },
                        vec![IrTerm::Var("__tc_m".into()), IrTerm::Var("__tc_d".into())],
                    )),
                ],
                provenance: view.name.clone(),
                tag,
            });
        }
    }
    rules
}
