//! # Rule IR (C2, part 2)
//!
//! The normalized, backend-independent Datalog program representation that
//! every view compiles down to. Predicates partition into base (`N, E, NP,
//! EP` over a named source), per-view (`N_v, E_v, NP_v, EP_v`), and
//! auxiliary (transitive-closure helpers synthesized for Kleene-star edges).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A term inside an IR atom: either a pattern variable or a bound constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrTerm {
    Var(String),
    Const(String),
}

impl fmt::Display for IrTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrTerm::Var(v) => write!(f, "{v}"),
            IrTerm::Const(c) => write!(f, "{c:?}"),
        }
    }
}

/// The predicate family an atom belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Predicate {
    /// `N(id, label)` over a named source (base graph or another view).
    Node { source: String },
    /// `E(id, src, dst, label)` over a named source.
    Edge { source: String },
    /// `NP(node_id, key, value)` over a named source.
    NodeProp { source: String },
    /// `EP(edge_id, key, value)` over a named source.
    EdgeProp { source: String },
    /// Auxiliary transitive-closure predicate for a starred edge label.
    TransitiveClosure { source: String, label: String, view_var: String },
    /// Binds its first argument to `skolem(fn_name, remaining_args...)`.
    /// Never filters; always succeeds exactly once per distinct input tuple.
    Skolem { fn_name: String },
    /// A fresh goal predicate produced by the query rewriter.
    Answer { name: String },
}

impl Predicate {
    /// The name this predicate is emitted/referenced as in the program
    /// (e.g. `N_v`, `E_g`, `TC_Knows_x`).
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Predicate::Node { source } => format!("N_{source}"),
            Predicate::Edge { source } => format!("E_{source}"),
            Predicate::NodeProp { source } => format!("NP_{source}"),
            Predicate::EdgeProp { source } => format!("EP_{source}"),
            Predicate::TransitiveClosure { source, label, view_var } => {
                format!("TC_{source}_{label}_{view_var}")
            }
            Predicate::Skolem { fn_name } => format!("__skolem_{fn_name}"),
            Predicate::Answer { name } => name.clone(),
        }
    }
}

/// A positive, negated, or comparison body element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyElement {
    Atom(Atom),
    Neg(Atom),
    Compare(crate::ast::CompareOp, IrTerm, IrTerm),
}

/// `Pred(args...)`: a predicate applied to a term list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Atom {
    pub predicate: Predicate,
    pub args: Vec<IrTerm>,
}

impl Atom {
    #[must_use]
    pub fn new(predicate: Predicate, args: Vec<IrTerm>) -> Self {
        Atom { predicate, args }
    }

    /// Variables referenced positionally by this atom.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        self.args
            .iter()
            .filter_map(|t| match t {
                IrTerm::Var(v) => Some(v.as_str()),
                IrTerm::Const(_) => None,
            })
            .collect()
    }
}

/// `Rule := (head, body, provenance)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub head: Atom,
    pub body: Vec<BodyElement>,
    /// Name of the view this rule was compiled from (or `"g"` for queries
    /// issued directly against the base graph).
    pub provenance: String,
    /// Whether this rule's facts are extensional (already materialized) or
    /// must be derived by the evaluator - used by hybrid view assembly.
    pub tag: RuleTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleTag {
    Materialized,
    Virtual,
}

impl Rule {
    /// A rule is safe when every variable in the head also appears
    /// positively somewhere in the body.
    #[must_use]
    pub fn is_safe(&self) -> bool {
        let head_vars = self.head.variables();
        let body_vars = self.positive_body_variables();
        head_vars.iter().all(|v| body_vars.contains(*v))
    }

    #[must_use]
    pub fn positive_body_variables(&self) -> std::collections::HashSet<&str> {
        let mut out = std::collections::HashSet::new();
        for el in &self.body {
            if let BodyElement::Atom(a) = el {
                out.extend(a.variables());
            }
        }
        out
    }

    /// Predicate names this rule's body depends on (for the assembler's
    /// dependency graph). Negated atoms are included too; the assembler
    /// tags the edge type separately.
    #[must_use]
    pub fn body_predicate_names(&self) -> Vec<(String, bool)> {
        self.body
            .iter()
            .filter_map(|el| match el {
                BodyElement::Atom(a) => Some((a.predicate.name(), false)),
                BodyElement::Neg(a) => Some((a.predicate.name(), true)),
                BodyElement::Compare(..) => None,
            })
            .collect()
    }
}

/// A fully assembled, backend-independent Datalog program.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleProgram {
    /// Rules in SCC-topological order, ready for evaluation.
    pub rules: Vec<Rule>,
    /// Stratum index for each rule in `rules`, same length and order,
    /// monotonically nondecreasing - rules in stratum `k` may only
    /// negate predicates whose own rules all live in strata `< k`. A
    /// backend should bring one stratum to its own fixpoint before
    /// moving on to the next.
    pub strata: Vec<usize>,
}

impl RuleProgram {
    #[must_use]
    pub fn new() -> Self {
        RuleProgram::default()
    }

    #[must_use]
    pub fn rules_for(&self, predicate_name: &str) -> Vec<&Rule> {
        self.rules
            .iter()
            .filter(|r| r.head.predicate.name() == predicate_name)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::CompareOp;

    #[test]
    fn safe_rule_has_head_vars_in_body() {
        let rule = Rule {
            head: Atom::new(
                Predicate::Node { source: "v".into() },
                vec![IrTerm::Var("x".into()), IrTerm::Const("Person".into())],
            ),
            body: vec![BodyElement::Atom(Atom::new(
                Predicate::Node { source: "g".into() },
                vec![IrTerm::Var("x".into()), IrTerm::Const("Person".into())],
            ))],
            provenance: "v".into(),
            tag: RuleTag::Virtual,
        };
        assert!(rule.is_safe());
    }

    #[test]
    fn unsafe_rule_detected() {
        let rule = Rule {
            head: Atom::new(
                Predicate::Node { source: "v".into() },
                vec![IrTerm::Var("y".into())],
            ),
            body: vec![BodyElement::Atom(Atom::new(
                Predicate::Node { source: "g".into() },
                vec![IrTerm::Var("x".into())],
            ))],
            provenance: "v".into(),
            tag: RuleTag::Virtual,
        };
        assert!(!rule.is_safe());
    }

    #[test]
    fn compare_elements_do_not_count_as_positive_bindings() {
        let rule = Rule {
            head: Atom::new(Predicate::Node { source: "v".into() }, vec![IrTerm::Var("x".into())]),
            body: vec![BodyElement::Compare(
                CompareOp::Gt,
                IrTerm::Var("x".into()),
                IrTerm::Const("1".into()),
            )],
            provenance: "v".into(),
            tag: RuleTag::Virtual,
        };
        assert!(!rule.is_safe());
    }
}
