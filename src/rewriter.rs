//! # Query Rewriter (C7)
//!
//! Expands a query or view body's reference to another view into the
//! underlying rules needed to evaluate it, without textual substitution:
//! a virtual source contributes its compiled rules by reference (the same
//! `Rule` values are shared, not re-parsed), a materialized source
//! contributes only the fact that its relation is already extensional,
//! and a hybrid source contributes both, tagged so the assembler and
//! backend can tell which rules are already-computed facts and which
//! still need derivation.

use crate::ast::ViewKind;
use crate::catalog::ViewCatalog;
use crate::error::{GraphViewError, Result};
use crate::ir::{Rule, RuleTag};
use std::collections::HashSet;

/// Recursively unfold `view_name`'s dependency on other views into a flat
/// rule set, tagging materialized sources as already-computed.
///
/// Cycles through virtual views are legal only when mediated by Kleene-star
/// recursion inside the view compiler (those show up as
/// `Predicate::TransitiveClosure` self-references, not as one view
/// depending on itself through `ON`); a view whose `ON` source chain
/// revisits itself is reported as [`GraphViewError::CyclicViewDependency`].
pub fn unfold_view(catalog: &ViewCatalog, view_name: &str) -> Result<Vec<Rule>> {
    let mut seen = HashSet::new();
    let mut rules = Vec::new();
    unfold_inner(catalog, view_name, &mut seen, &mut rules)?;
    Ok(rules)
}

fn unfold_inner(
    catalog: &ViewCatalog,
    view_name: &str,
    seen: &mut HashSet<String>,
    out: &mut Vec<Rule>,
) -> Result<()> {
    if !seen.insert(view_name.to_string()) {
        return Err(GraphViewError::CyclicViewDependency(format!(
            "view '{view_name}' is defined, directly or indirectly, in terms of itself"
        )));
    }

    let entry = catalog.get(view_name)?;

    // Pull in whatever the view's own source needs first, referentially:
    // if the source is itself a view, its rules (or extensional marker)
    // are included by reference, not re-parsed from its definition text.
    if catalog.contains(&entry.def.source) {
        unfold_inner(catalog, &entry.def.source, seen, out)?;
    }

    match entry.def.kind {
        ViewKind::Virtual => {
            out.extend(entry.virtual_rules.iter().cloned());
        }
        ViewKind::Materialized => {
            out.extend(entry.materialized_marker_rules());
        }
        ViewKind::Hybrid => {
            out.extend(entry.virtual_rules.iter().cloned());
            out.extend(entry.materialized_marker_rules());
        }
    }

    seen.remove(view_name);
    Ok(())
}

/// Whether `rule` should be treated as already-computed (extensional) by
/// the backend rather than requiring derivation.
#[must_use]
pub fn is_extensional(rule: &Rule) -> bool {
    rule.tag == RuleTag::Materialized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::PatternBuilder;
    use crate::ast::{RuleBlock, ViewDef};
    use crate::schema::SchemaRegistry;
    use crate::typecheck::TypePolicy;

    fn simple_view(name: &str, source: &str, kind: ViewKind) -> ViewDef {
        let pattern = PatternBuilder::new().node("a", Some("Person")).build();
        ViewDef {
            name: name.into(),
            source: source.into(),
            kind,
            with_default_map: true,
            blocks: vec![RuleBlock { pattern, ..RuleBlock::default() }],
        }
    }

    #[test]
    fn virtual_view_unfolds_its_compiled_rules() {
        let mut catalog = ViewCatalog::new();
        let schema = SchemaRegistry::new();
        catalog
            .register(simple_view("V", "g", ViewKind::Virtual), &schema, TypePolicy::default())
            .unwrap();
        let rules = unfold_view(&catalog, "V").unwrap();
        assert!(!rules.is_empty());
        assert!(rules.iter().all(|r| r.tag == RuleTag::Virtual));
    }

    #[test]
    fn self_referential_source_is_rejected() {
        let mut catalog = ViewCatalog::new();
        let schema = SchemaRegistry::new();
        catalog
            .register(simple_view("V", "V", ViewKind::Virtual), &schema, TypePolicy::default())
            .unwrap();
        let err = unfold_view(&catalog, "V").unwrap_err();
        assert!(matches!(err, GraphViewError::CyclicViewDependency(_)));
    }

    #[test]
    fn view_on_view_unfolds_both_layers() {
        let mut catalog = ViewCatalog::new();
        let schema = SchemaRegistry::new();
        catalog
            .register(simple_view("Base", "g", ViewKind::Virtual), &schema, TypePolicy::default())
            .unwrap();
        catalog
            .register(simple_view("Derived", "Base", ViewKind::Virtual), &schema, TypePolicy::default())
            .unwrap();
        let rules = unfold_view(&catalog, "Derived").unwrap();
        let provenances: HashSet<_> = rules.iter().map(|r| r.provenance.clone()).collect();
        assert!(provenances.contains("Base"));
        assert!(provenances.contains("Derived"));
    }
}
