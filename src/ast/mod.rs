//! # AST (C2, part 1)
//!
//! Abstract syntax tree types for patterns, views, and queries. These are
//! the surface-level structures the parser produces; [`crate::ir`] holds
//! the normalized Datalog-style rule representation the view compiler
//! lowers them to.

pub mod builders;

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A term appearing in a property predicate: a reference to a bound
/// variable's property, a literal, or a binary expression over those.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// `var.key`
    Ref(String, String),
    /// A literal string or number (numbers are stored as their string form;
    /// see [`crate::value::PropertyValue`] for comparison semantics).
    Lit(Literal),
    /// A binary comparison or boolean combination.
    BinOp(CompareOp, Box<Expr>, Box<Expr>),
}

/// A literal value in an expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    String(String),
    Number(f64),
}

/// Comparison and boolean operators usable in a WHERE clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl Expr {
    /// All variables referenced anywhere in this expression.
    #[must_use]
    pub fn variables(&self) -> HashSet<String> {
        let mut out = HashSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut HashSet<String>) {
        match self {
            Expr::Ref(v, _) => {
                out.insert(v.clone());
            }
            Expr::Lit(_) => {}
            Expr::BinOp(_, lhs, rhs) => {
                lhs.collect_variables(out);
                rhs.collect_variables(out);
            }
        }
    }
}

/// A property predicate attached to a pattern node or edge variable, e.g.
/// `a.age > "25"` parsed into `(key, op, rhs)` anchored at that variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyPredicate {
    pub key: String,
    pub op: CompareOp,
    pub rhs: Expr,
}

/// A pattern node: `(var:Label {predicates})`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternNode {
    pub var: String,
    pub label: Option<String>,
    pub props: Vec<PropertyPredicate>,
}

/// A pattern edge: `(src)-[var:Label*?]->(dst)`.
///
/// `star` marks a Kleene-star (transitive closure) edge; reflexive closure
/// is not implied and must be requested explicitly at the query level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternEdge {
    pub var: String,
    pub src: String,
    pub dst: String,
    pub label: Option<String>,
    pub star: bool,
    pub props: Vec<PropertyPredicate>,
}

/// A connected multigraph pattern: the MATCH clause of a rule or query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pattern {
    pub nodes: Vec<PatternNode>,
    pub edges: Vec<PatternEdge>,
}

impl Pattern {
    #[must_use]
    pub fn new() -> Self {
        Pattern::default()
    }

    /// All variables bound by this pattern (nodes and edges).
    #[must_use]
    pub fn bound_variables(&self) -> HashSet<String> {
        let mut out: HashSet<String> = self.nodes.iter().map(|n| n.var.clone()).collect();
        out.extend(self.edges.iter().map(|e| e.var.clone()));
        out
    }
}

/// An element of a CONSTRUCT clause: a node or edge to emit in the view's
/// output. If the element's variable is bound in MATCH its identity is
/// carried through; otherwise it must be Skolemized (explicitly via `SET`
/// or implicitly with an auto-generated function name).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConstructElement {
    Node { var: String, label: String },
    Edge { var: String, src: String, dst: String, label: String },
}

impl ConstructElement {
    #[must_use]
    pub fn var(&self) -> &str {
        match self {
            ConstructElement::Node { var, .. } | ConstructElement::Edge { var, .. } => var,
        }
    }
}

/// A Skolem binding: `SET var = SK("fnName", arg1, arg2, ...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkolemBinding {
    pub var: String,
    pub fn_name: String,
    pub args: Vec<String>,
}

/// A MAP mapping: `MAP a -> b` (rename variable `a`'s output as `b`,
/// overriding the implicit identity carry-through for `a`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mapping {
    pub from: String,
    pub to: String,
}

/// `DELETE(var)`: suppress the default MAP atom for `var`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteSpec {
    pub target_var: String,
}

/// `ADD`: a node or edge construct with no matching antecedent in MATCH,
/// necessarily Skolemized.
pub type AddSpec = ConstructElement;

/// One rule block within a view: `MATCH ... [WHERE ...] [MAP ...]*
/// [CONSTRUCT ...] [ADD ...]* [DELETE ...]* [SET ...]*`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RuleBlock {
    pub pattern: Pattern,
    pub where_expr: Option<Expr>,
    pub mappings: Vec<Mapping>,
    pub construct: Vec<ConstructElement>,
    pub adds: Vec<AddSpec>,
    pub deletes: Vec<DeleteSpec>,
    pub skolems: Vec<SkolemBinding>,
}

/// Whether a view is recomputed at query time, precomputed once, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewKind {
    Virtual,
    Materialized,
    Hybrid,
}

/// `CREATE (virtual|materialized|hybrid) VIEW name ON source (...)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDef {
    pub name: String,
    pub source: String,
    pub kind: ViewKind,
    pub with_default_map: bool,
    pub blocks: Vec<RuleBlock>,
}

/// `MATCH pattern FROM src [WHERE expr] RETURN var, var, ...`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub pattern: Pattern,
    pub source: String,
    pub where_expr: Option<Expr>,
    pub returns: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pattern_bound_variables_include_nodes_and_edges() {
        let mut p = Pattern::new();
        p.nodes.push(PatternNode { var: "a".into(), label: None, props: vec![] });
        p.nodes.push(PatternNode { var: "b".into(), label: None, props: vec![] });
        p.edges.push(PatternEdge {
            var: "x".into(),
            src: "a".into(),
            dst: "b".into(),
            label: None,
            star: false,
            props: vec![],
        });
        let vars = p.bound_variables();
        assert_eq!(vars.len(), 3);
        assert!(vars.contains("a") && vars.contains("b") && vars.contains("x"));
    }

    #[test]
    fn expr_variables_walks_binops() {
        let e = Expr::BinOp(
            CompareOp::Gt,
            Box::new(Expr::Ref("a".into(), "age".into())),
            Box::new(Expr::Lit(Literal::String("25".into()))),
        );
        let vars = e.variables();
        assert_eq!(vars.len(), 1);
        assert!(vars.contains("a"));
    }
}
