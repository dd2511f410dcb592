//! Fluent builders for programmatic AST construction.
//!
//! Useful for tests and for any embedder constructing views without going
//! through the surface parser.

use super::{
    ConstructElement, DeleteSpec, Expr, Mapping, Pattern, PatternEdge, PatternNode,
    PropertyPredicate, RuleBlock, SkolemBinding,
};

/// Builder for a [`Pattern`].
#[derive(Debug, Default)]
pub struct PatternBuilder {
    pattern: Pattern,
}

impl PatternBuilder {
    #[must_use]
    pub fn new() -> Self {
        PatternBuilder::default()
    }

    #[must_use]
    pub fn node(mut self, var: impl Into<String>, label: Option<&str>) -> Self {
        self.pattern.nodes.push(PatternNode {
            var: var.into(),
            label: label.map(str::to_string),
            props: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn node_with_props(
        mut self,
        var: impl Into<String>,
        label: Option<&str>,
        props: Vec<PropertyPredicate>,
    ) -> Self {
        self.pattern.nodes.push(PatternNode {
            var: var.into(),
            label: label.map(str::to_string),
            props,
        });
        self
    }

    #[must_use]
    pub fn edge(
        mut self,
        var: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
        label: Option<&str>,
        star: bool,
    ) -> Self {
        self.pattern.edges.push(PatternEdge {
            var: var.into(),
            src: src.into(),
            dst: dst.into(),
            label: label.map(str::to_string),
            star,
            props: Vec::new(),
        });
        self
    }

    #[must_use]
    pub fn build(self) -> Pattern {
        self.pattern
    }
}

/// Builder for a [`RuleBlock`].
#[derive(Debug, Default)]
pub struct RuleBlockBuilder {
    block: RuleBlock,
}

impl RuleBlockBuilder {
    #[must_use]
    pub fn new(pattern: Pattern) -> Self {
        RuleBlockBuilder {
            block: RuleBlock {
                pattern,
                ..RuleBlock::default()
            },
        }
    }

    #[must_use]
    pub fn where_expr(mut self, expr: Expr) -> Self {
        self.block.where_expr = Some(expr);
        self
    }

    #[must_use]
    pub fn map(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.block.mappings.push(Mapping { from: from.into(), to: to.into() });
        self
    }

    #[must_use]
    pub fn construct(mut self, element: ConstructElement) -> Self {
        self.block.construct.push(element);
        self
    }

    #[must_use]
    pub fn add(mut self, element: ConstructElement) -> Self {
        self.block.adds.push(element);
        self
    }

    #[must_use]
    pub fn delete(mut self, target_var: impl Into<String>) -> Self {
        self.block.deletes.push(DeleteSpec { target_var: target_var.into() });
        self
    }

    #[must_use]
    pub fn set_skolem(
        mut self,
        var: impl Into<String>,
        fn_name: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        self.block.skolems.push(SkolemBinding {
            var: var.into(),
            fn_name: fn_name.into(),
            args,
        });
        self
    }

    #[must_use]
    pub fn build(self) -> RuleBlock {
        self.block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_selection_pattern() {
        let p = PatternBuilder::new()
            .node("a", Some("Person"))
            .node("b", Some("Person"))
            .edge("x", "a", "b", Some("Knows"), false)
            .build();
        assert_eq!(p.nodes.len(), 2);
        assert_eq!(p.edges.len(), 1);
    }
}
