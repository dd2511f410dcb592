//! # Program Assembler (C8)
//!
//! Takes the flat rule set the rewriter unfolded and assembles it into a
//! [`RuleProgram`] safe to hand to a backend: builds the predicate
//! dependency graph, finds its strongly connected components with
//! Tarjan's algorithm, rejects negation that isn't stratified, rejects
//! view self-reference that isn't legal Kleene-star recursion, and orders
//! rules so that a predicate's dependencies are evaluated before it.

use crate::error::{GraphViewError, Result};
use crate::ir::{BodyElement, Predicate, Rule, RuleProgram};
use std::collections::{HashMap, HashSet};

/// Assemble `rules` into a stratified, dependency-ordered program.
///
/// # Errors
/// - [`GraphViewError::UnstratifiedNegation`] if a negated atom's predicate
///   is reachable from itself (i.e. shares a strongly connected component
///   with the rule that negates it).
/// - [`GraphViewError::CyclicViewDependency`] if a strongly connected
///   component contains any non-`TC_*` predicate together with more than
///   one predicate, or a non-`TC_*` predicate that depends on itself -
///   legal recursion only ever arises from the compiler's own
///   transitive-closure lowering.
pub fn assemble(rules: Vec<Rule>) -> Result<RuleProgram> {
    let graph = DependencyGraph::build(&rules);
    let sccs = graph.tarjan_sccs();

    let mut component_of: HashMap<String, usize> = HashMap::new();
    for (idx, scc) in sccs.iter().enumerate() {
        for node in scc {
            component_of.insert(node.clone(), idx);
        }
    }

    for rule in &rules {
        let head_name = rule.head.predicate.name();
        let Some(&head_component) = component_of.get(&head_name) else { continue };
        for el in &rule.body {
            if let BodyElement::Neg(atom) = el {
                let dep_name = atom.predicate.name();
                if component_of.get(&dep_name) == Some(&head_component) {
                    return Err(GraphViewError::UnstratifiedNegation(head_name));
                }
            }
        }
    }

    for scc in &sccs {
        let recursive = scc.len() > 1 || graph.has_self_loop(&scc[0]);
        if !recursive {
            continue;
        }
        if scc.iter().any(|p| !is_transitive_closure_predicate(p)) {
            return Err(GraphViewError::CyclicViewDependency(scc.join(", ")));
        }
    }

    // Tarjan emits SCCs in reverse topological order of the dependency
    // edges (dependency -> dependent), i.e. sinks first - exactly the
    // bottom-up evaluation order a naive fixpoint evaluator needs.
    let mut rank: HashMap<String, usize> = HashMap::new();
    for (idx, scc) in sccs.iter().enumerate() {
        for node in scc {
            rank.insert(node.clone(), idx);
        }
    }

    let mut ordered = rules;
    ordered.sort_by_key(|r| rank.get(&r.head.predicate.name()).copied().unwrap_or(usize::MAX));
    let strata = ordered
        .iter()
        .map(|r| rank.get(&r.head.predicate.name()).copied().unwrap_or(usize::MAX))
        .collect();

    Ok(RuleProgram { rules: ordered, strata })
}

fn is_transitive_closure_predicate(name: &str) -> bool {
    name.starts_with("TC_")
}

/// The predicate dependency graph: an edge `head -> body_pred` for every
/// `(head, body_pred)` pair appearing in some rule, positive or negated.
struct DependencyGraph {
    nodes: Vec<String>,
    edges: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    fn build(rules: &[Rule]) -> Self {
        let mut nodes: HashSet<String> = HashSet::new();
        let mut edges: HashMap<String, Vec<String>> = HashMap::new();

        for rule in rules {
            let head_name = rule.head.predicate.name();
            nodes.insert(head_name.clone());
            for (dep_name, _negated) in rule.body_predicate_names() {
                nodes.insert(dep_name.clone());
                edges.entry(head_name.clone()).or_default().push(dep_name);
            }
            edges.entry(head_name).or_default();
        }

        DependencyGraph { nodes: nodes.into_iter().collect(), edges }
    }

    fn has_self_loop(&self, node: &str) -> bool {
        self.edges.get(node).is_some_and(|deps| deps.iter().any(|d| d == node))
    }

    /// Tarjan's strongly connected components algorithm.
    fn tarjan_sccs(&self) -> Vec<Vec<String>> {
        struct State {
            index: HashMap<String, usize>,
            lowlink: HashMap<String, usize>,
            on_stack: HashSet<String>,
            stack: Vec<String>,
            next_index: usize,
            sccs: Vec<Vec<String>>,
        }

        fn strongconnect(graph: &DependencyGraph, v: &str, st: &mut State) {
            st.index.insert(v.to_string(), st.next_index);
            st.lowlink.insert(v.to_string(), st.next_index);
            st.next_index += 1;
            st.stack.push(v.to_string());
            st.on_stack.insert(v.to_string());

            if let Some(deps) = graph.edges.get(v) {
                for w in deps {
                    if !st.index.contains_key(w) {
                        strongconnect(graph, w, st);
                        let w_low = st.lowlink[w];
                        let v_low = st.lowlink[v];
                        st.lowlink.insert(v.to_string(), v_low.min(w_low));
                    } else if st.on_stack.contains(w) {
                        let w_idx = st.index[w];
                        let v_low = st.lowlink[v];
                        st.lowlink.insert(v.to_string(), v_low.min(w_idx));
                    }
                }
            }

            if st.lowlink[v] == st.index[v] {
                let mut component = Vec::new();
                loop {
                    let w = st.stack.pop().unwrap();
                    st.on_stack.remove(&w);
                    let is_v = w == v;
                    component.push(w);
                    if is_v {
                        break;
                    }
                }
                st.sccs.push(component);
            }
        }

        let mut st = State {
            index: HashMap::new(),
            lowlink: HashMap::new(),
            on_stack: HashSet::new(),
            stack: Vec::new(),
            next_index: 0,
            sccs: Vec::new(),
        };

        let mut nodes = self.nodes.clone();
        nodes.sort();
        for v in &nodes {
            if !st.index.contains_key(v) {
                strongconnect(self, v, &mut st);
            }
        }
        st.sccs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Atom, IrTerm, RuleTag};

    // Tests only care about predicate names, so every atom uses the
    // `Answer` variant (its `name()` is the name verbatim) regardless of
    // what family of predicate it's standing in for.
    fn atom(name: &str) -> Atom {
        Atom::new(Predicate::Answer { name: name.to_string() }, vec![IrTerm::Var("x".into())])
    }

    fn rule(head: &str, body: Vec<(&str, bool)>) -> Rule {
        Rule {
            head: atom(head),
            body: body
                .into_iter()
                .map(|(name, negated)| {
                    let a = atom(name);
                    if negated {
                        BodyElement::Neg(a)
                    } else {
                        BodyElement::Atom(a)
                    }
                })
                .collect(),
            provenance: "v".into(),
            tag: RuleTag::Virtual,
        }
    }

    #[test]
    fn acyclic_program_assembles_with_dependencies_first() {
        let rules = vec![rule("B", vec![("A", false)]), rule("A", vec![])];
        let program = assemble(rules).unwrap();
        let positions: Vec<String> = program.rules.iter().map(|r| r.head.predicate.name()).collect();
        let a_pos = positions.iter().position(|n| n == "A").unwrap();
        let b_pos = positions.iter().position(|n| n == "B").unwrap();
        assert!(a_pos < b_pos);
    }

    #[test]
    fn self_negation_is_unstratified() {
        let rules = vec![rule("A", vec![("A", true)])];
        let err = assemble(rules).unwrap_err();
        assert!(matches!(err, GraphViewError::UnstratifiedNegation(_)));
    }

    #[test]
    fn mutual_negation_across_two_relations_is_unstratified() {
        let rules = vec![rule("A", vec![("B", true)]), rule("B", vec![("A", false)])];
        let err = assemble(rules).unwrap_err();
        assert!(matches!(err, GraphViewError::UnstratifiedNegation(_)));
    }

    #[test]
    fn transitive_closure_self_recursion_is_allowed() {
        let rules = vec![rule("TC_g_Knows_x", vec![("TC_g_Knows_x", false), ("E_g", false)])];
        assert!(assemble(rules).is_ok());
    }

    #[test]
    fn non_tc_self_recursion_is_a_cyclic_view_dependency() {
        let rules = vec![rule("N_v", vec![("N_v", false)])];
        let err = assemble(rules).unwrap_err();
        assert!(matches!(err, GraphViewError::CyclicViewDependency(_)));
    }
}
