//! # Type Checker & Pruner (C5)
//!
//! Propagates edge-label endpoint constraints onto the node variables a
//! pattern binds them to, to a fixed point, and reports patterns that are
//! statically unsatisfiable - no concrete label assignment to every
//! variable can agree with the schema's edge endpoint typing.
//!
//! Two independent policies consume the result: `typecheck` turns an
//! unsatisfiable pattern into a hard [`GraphViewError::TypeError`], and
//! `prunequery` silently drops the offending rule block instead. When both
//! are enabled, `typecheck` wins - per the documented tie-break, a caller
//! that wants both errors and pruning gets the error.

use crate::ast::Pattern;
use crate::error::{GraphViewError, Result};
use crate::schema::SchemaRegistry;
use std::collections::{HashMap, HashSet};

/// The set of labels still possible for each pattern variable after
/// constraint propagation. Node variables map to node labels, edge
/// variables map to edge labels.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv {
    pub node_candidates: HashMap<String, HashSet<String>>,
    pub edge_candidates: HashMap<String, HashSet<String>>,
}

/// The outcome of checking one pattern against a schema.
#[derive(Debug, Clone)]
pub enum PatternTypeResult {
    Satisfiable(TypeEnv),
    /// `var` has no schema label consistent with every edge touching it.
    Unsatisfiable { var: String, reason: String },
}

impl PatternTypeResult {
    #[must_use]
    pub fn is_satisfiable(&self) -> bool {
        matches!(self, PatternTypeResult::Satisfiable(_))
    }
}

/// Run fixed-point label propagation over `pattern`.
///
/// Each node variable starts with its explicit label (if any) or every
/// label the schema declares. Each edge variable starts the same way over
/// edge labels. Then, until no candidate set shrinks any further: for
/// every edge variable, restrict its own candidates to those whose
/// declared endpoints intersect the current candidates of its `src`/`dst`
/// node variables, and restrict `src`/`dst`'s candidates to the endpoint
/// labels reachable from the edge's current candidates. An empty
/// candidate set at any point makes the pattern unsatisfiable.
#[must_use]
pub fn check_pattern(pattern: &Pattern, schema: &SchemaRegistry) -> PatternTypeResult {
    let all_node_labels: HashSet<String> = schema.node_labels().map(str::to_string).collect();
    let all_edge_labels: HashSet<String> = schema.edge_labels().map(str::to_string).collect();

    let mut env = TypeEnv::default();
    for node in &pattern.nodes {
        let candidates = match &node.label {
            Some(l) => {
                let mut s = HashSet::new();
                s.insert(l.clone());
                s
            }
            None => all_node_labels.clone(),
        };
        env.node_candidates.insert(node.var.clone(), candidates);
    }
    for edge in &pattern.edges {
        let candidates = match &edge.label {
            Some(l) => {
                let mut s = HashSet::new();
                s.insert(l.clone());
                s
            }
            None => all_edge_labels.clone(),
        };
        env.edge_candidates.insert(edge.var.clone(), candidates);
    }

    let max_iterations = pattern.nodes.len() + pattern.edges.len() + 1;
    for _ in 0..=max_iterations {
        let mut changed = false;

        for edge in &pattern.edges {
            let edge_candidates = env.edge_candidates.get(&edge.var).cloned().unwrap_or_default();

            let mut reachable_src = HashSet::new();
            let mut reachable_dst = HashSet::new();
            let mut still_possible_edges = HashSet::new();
            for label in &edge_candidates {
                let Ok((src_label, dst_label)) = schema.endpoints(label).map(|e| e.clone()) else {
                    continue;
                };
                let src_ok = env
                    .node_candidates
                    .get(&edge.src)
                    .map_or(true, |c| c.contains(&src_label));
                let dst_ok = env
                    .node_candidates
                    .get(&edge.dst)
                    .map_or(true, |c| c.contains(&dst_label));
                if src_ok && dst_ok {
                    reachable_src.insert(src_label);
                    reachable_dst.insert(dst_label);
                    still_possible_edges.insert(label.clone());
                }
            }

            if still_possible_edges.len() != edge_candidates.len() {
                env.edge_candidates.insert(edge.var.clone(), still_possible_edges);
                changed = true;
            }

            if let Some(src_candidates) = env.node_candidates.get_mut(&edge.src) {
                let before = src_candidates.len();
                src_candidates.retain(|l| reachable_src.contains(l));
                if src_candidates.len() != before {
                    changed = true;
                }
            }
            if let Some(dst_candidates) = env.node_candidates.get_mut(&edge.dst) {
                let before = dst_candidates.len();
                dst_candidates.retain(|l| reachable_dst.contains(l));
                if dst_candidates.len() != before {
                    changed = true;
                }
            }
        }

        if let Some((var, _)) = env.node_candidates.iter().find(|(_, c)| c.is_empty()) {
            return PatternTypeResult::Unsatisfiable {
                var: var.clone(),
                reason: format!(
                    "node variable '{var}' has no schema label consistent with the edges it participates in"
                ),
            };
        }
        if let Some((var, _)) = env.edge_candidates.iter().find(|(_, c)| c.is_empty()) {
            return PatternTypeResult::Unsatisfiable {
                var: var.clone(),
                reason: format!(
                    "edge variable '{var}' has no schema label whose endpoints are consistent with its adjacent node variables"
                ),
            };
        }

        if !changed {
            break;
        }
    }

    PatternTypeResult::Satisfiable(env)
}

/// The two independent type policies a session can toggle (spec `option`
/// command: `option typecheck on|off`, `option prunequery on|off`).
#[derive(Debug, Clone, Copy, Default)]
pub struct TypePolicy {
    pub typecheck: bool,
    pub prunequery: bool,
}

/// Apply the configured policy to a checked pattern.
///
/// Returns `Ok(true)` if the rule block/branch should be kept, `Ok(false)`
/// if it should be silently dropped (pruned), and `Err` if `typecheck` is
/// enabled and the pattern is unsatisfiable. When both policies are
/// enabled, `typecheck` takes precedence: an unsatisfiable pattern is
/// reported as an error rather than silently pruned.
pub fn apply_policy(
    result: &PatternTypeResult,
    policy: TypePolicy,
) -> Result<bool> {
    match result {
        PatternTypeResult::Satisfiable(_) => Ok(true),
        PatternTypeResult::Unsatisfiable { reason, .. } => {
            if policy.typecheck {
                Err(GraphViewError::TypeError(reason.clone()))
            } else if policy.prunequery {
                Ok(false)
            } else {
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::PatternBuilder;

    fn schema() -> SchemaRegistry {
        let mut s = SchemaRegistry::new();
        s.add_node_label("Person");
        s.add_node_label("Company");
        s.add_edge_label("Knows", "Person", "Person").unwrap();
        s.add_edge_label("Employs", "Company", "Person").unwrap();
        s
    }

    #[test]
    fn satisfiable_pattern_yields_singleton_candidates() {
        let schema = schema();
        let pattern = PatternBuilder::new()
            .node("a", Some("Person"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", Some("Knows"), false)
            .build();
        let result = check_pattern(&pattern, &schema);
        assert!(result.is_satisfiable());
    }

    #[test]
    fn mismatched_endpoint_label_is_unsatisfiable() {
        let schema = schema();
        // Employs requires (Company, Person), but both ends are pinned to Person.
        let pattern = PatternBuilder::new()
            .node("a", Some("Person"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", Some("Employs"), false)
            .build();
        let result = check_pattern(&pattern, &schema);
        assert!(!result.is_satisfiable());
    }

    #[test]
    fn unlabeled_edge_infers_label_from_endpoints() {
        let schema = schema();
        let pattern = PatternBuilder::new()
            .node("a", Some("Company"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", None, false)
            .build();
        let result = check_pattern(&pattern, &schema);
        match result {
            PatternTypeResult::Satisfiable(env) => {
                let candidates = &env.edge_candidates["x"];
                assert_eq!(candidates.len(), 1);
                assert!(candidates.contains("Employs"));
            }
            PatternTypeResult::Unsatisfiable { .. } => panic!("expected satisfiable"),
        }
    }

    #[test]
    fn typecheck_policy_takes_precedence_over_prunequery() {
        let schema = schema();
        let pattern = PatternBuilder::new()
            .node("a", Some("Person"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", Some("Employs"), false)
            .build();
        let result = check_pattern(&pattern, &schema);
        let policy = TypePolicy { typecheck: true, prunequery: true };
        let outcome = apply_policy(&result, policy);
        assert!(matches!(outcome, Err(GraphViewError::TypeError(_))));
    }

    #[test]
    fn prunequery_alone_drops_silently() {
        let schema = schema();
        let pattern = PatternBuilder::new()
            .node("a", Some("Person"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", Some("Employs"), false)
            .build();
        let result = check_pattern(&pattern, &schema);
        let policy = TypePolicy { typecheck: false, prunequery: true };
        assert_eq!(apply_policy(&result, policy).unwrap(), false);
    }

    #[test]
    fn neither_policy_keeps_pattern_as_is() {
        let schema = schema();
        let pattern = PatternBuilder::new()
            .node("a", Some("Person"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", Some("Employs"), false)
            .build();
        let result = check_pattern(&pattern, &schema);
        let policy = TypePolicy { typecheck: false, prunequery: false };
        assert_eq!(apply_policy(&result, policy).unwrap(), true);
    }
}
