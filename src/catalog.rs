//! # View Catalog
//!
//! Owns every view definition registered against one graph, the rules the
//! compiler produced for it, and - for materialized/hybrid views - the
//! extensional facts computed the last time it was materialized. Kept
//! separately from [`crate::graph::Graph`] so a session can hold many
//! graphs, each with its own catalog, without entangling their views.

use crate::ast::{ViewDef, ViewKind};
use crate::compiler;
use crate::error::{GraphViewError, Result};
use crate::ir::{Atom, Rule, RuleTag};
use crate::rewriter;
use crate::schema::SchemaRegistry;
use crate::typecheck::TypePolicy;
use std::collections::HashMap;

/// One catalog entry: the view's surface definition, its compiled virtual
/// rules, and the materialized facts from its last `materialize` call (if
/// any - a materialized/hybrid view with no prior materialization has
/// simply never been evaluated yet, which is distinct from having no
/// matches).
#[derive(Debug, Clone)]
pub struct ViewEntry {
    pub def: ViewDef,
    pub virtual_rules: Vec<Rule>,
    pub materialized_facts: Option<Vec<Atom>>,
}

impl ViewEntry {
    /// Synthetic facts-as-rules for a materialized/hybrid view: one
    /// fact-rule (empty body) per stored atom, so the assembler and
    /// backend can treat "already computed" uniformly with derived rules.
    #[must_use]
    pub fn materialized_marker_rules(&self) -> Vec<Rule> {
        match &self.materialized_facts {
            Some(facts) => facts
                .iter()
                .cloned()
                .map(|head| Rule {
                    head,
                    body: Vec::new(),
                    provenance: self.def.name.clone(),
                    tag: RuleTag::Materialized,
                })
                .collect(),
            None => Vec::new(),
        }
    }
}

/// All views registered against one graph.
#[derive(Debug, Clone, Default)]
pub struct ViewCatalog {
    views: HashMap<String, ViewEntry>,
}

impl ViewCatalog {
    #[must_use]
    pub fn new() -> Self {
        ViewCatalog::default()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.views.contains_key(name)
    }

    /// Compile and register a new view definition.
    ///
    /// # Errors
    /// Propagates [`GraphViewError::TypeError`] from the type checker (when
    /// the `typecheck` policy is active) and any safety/Skolem errors the
    /// compiler itself detects.
    pub fn register(
        &mut self,
        def: ViewDef,
        schema: &SchemaRegistry,
        policy: TypePolicy,
    ) -> Result<()> {
        let mut rules = compiler::compile_view(&def, schema, policy, RuleTag::Virtual)?;
        rules.extend(compiler::transitive_closure_rules(&def, RuleTag::Virtual));
        for rule in &rules {
            if !rule.is_safe() {
                return Err(GraphViewError::UnsafeRule {
                    relation: rule.head.predicate.name(),
                    vars: rule.head.variables().into_iter().map(str::to_string).collect(),
                });
            }
        }
        let name = def.name.clone();
        self.views.insert(
            name.clone(),
            ViewEntry { def, virtual_rules: rules, materialized_facts: None },
        );

        // A view's `ON` source may already be a registered view; unfold it
        // once here so a cycle through that chain is rejected at definition
        // time rather than surfacing later at query time, and the catalog
        // is left exactly as it was before this call.
        if let Err(e) = rewriter::unfold_view(self, &name) {
            self.views.remove(&name);
            return Err(e);
        }
        Ok(())
    }

    pub fn drop_view(&mut self, name: &str) -> Result<()> {
        self.views
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| GraphViewError::UnknownView(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Result<&ViewEntry> {
        self.views.get(name).ok_or_else(|| GraphViewError::UnknownView(name.to_string()))
    }

    /// Record a materialization result for a materialized/hybrid view.
    pub fn set_materialized_facts(&mut self, name: &str, facts: Vec<Atom>) -> Result<()> {
        let entry = self
            .views
            .get_mut(name)
            .ok_or_else(|| GraphViewError::UnknownView(name.to_string()))?;
        if entry.def.kind == ViewKind::Virtual {
            return Err(GraphViewError::BackendError(format!(
                "view '{name}' is virtual and cannot be materialized"
            )));
        }
        entry.materialized_facts = Some(facts);
        Ok(())
    }

    /// Invalidate every materialized/hybrid view - called whenever the
    /// underlying base graph's facts change via `insert`/`import`.
    pub fn invalidate_all_materialized(&mut self) {
        for entry in self.views.values_mut() {
            if entry.def.kind != ViewKind::Virtual {
                entry.materialized_facts = None;
            }
        }
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.views.keys().map(String::as_str).collect()
    }

    /// Names of views with no extant materialization, so `materialize` can
    /// be driven without the caller re-deriving this from `names()`.
    #[must_use]
    pub fn unmaterialized_names(&self) -> Vec<&str> {
        self.views
            .iter()
            .filter(|(_, e)| e.def.kind != ViewKind::Virtual && e.materialized_facts.is_none())
            .map(|(n, _)| n.as_str())
            .collect()
    }
}
