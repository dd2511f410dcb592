//! # Base Graph Storage
//!
//! One graph's extensional state: its schema, its `N/E/NP/EP` facts, and
//! the view catalog defined against it. A mutation to the facts
//! (`insert`/`import`) invalidates every materialized/hybrid view, since
//! their extensional content may now be stale.

use crate::catalog::ViewCatalog;
use crate::error::{GraphViewError, Result};
use crate::ir::{Atom, IrTerm, Predicate};
use crate::schema::SchemaRegistry;
use std::collections::HashMap;

/// One node: its id and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFact {
    pub id: String,
    pub label: String,
}

/// One edge: its id, endpoints, and label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeFact {
    pub id: String,
    pub src: String,
    pub dst: String,
    pub label: String,
}

/// A single graph's base facts, schema, and views.
#[derive(Debug, Default)]
pub struct Graph {
    pub schema: SchemaRegistry,
    pub catalog: ViewCatalog,
    nodes: HashMap<String, NodeFact>,
    edges: HashMap<String, EdgeFact>,
    node_props: HashMap<(String, String), String>,
    edge_props: HashMap<(String, String), String>,
}

impl Graph {
    #[must_use]
    pub fn new() -> Self {
        Graph::default()
    }

    /// Insert a node fact. Rejects an id already bound to a different
    /// label (a node's label is not mutable once inserted), and validates
    /// the label against the schema.
    pub fn insert_node(&mut self, id: impl Into<String>, label: impl Into<String>) -> Result<()> {
        let id = id.into();
        let label = label.into();
        self.schema.require_node_label(&label)?;
        if let Some(existing) = self.nodes.get(&id) {
            if existing.label != label {
                return Err(GraphViewError::SchemaConflict {
                    label: label.clone(),
                    existing_src: existing.label.clone(),
                    existing_dst: String::new(),
                    new_src: label,
                    new_dst: String::new(),
                });
            }
            return Ok(());
        }
        self.nodes.insert(id.clone(), NodeFact { id, label });
        self.catalog.invalidate_all_materialized();
        Ok(())
    }

    /// Insert an edge fact. Validates the label against the schema and
    /// that both endpoints already exist as nodes of the declared type.
    pub fn insert_edge(
        &mut self,
        id: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<()> {
        let id = id.into();
        let src = src.into();
        let dst = dst.into();
        let label = label.into();
        let (src_label, dst_label) = self.schema.endpoints(&label)?.clone();

        let src_node = self.nodes.get(&src).ok_or_else(|| GraphViewError::UnknownLabel(src.clone()))?;
        if src_node.label != src_label {
            return Err(GraphViewError::SchemaConflict {
                label: label.clone(),
                existing_src: src_label,
                existing_dst: dst_label.clone(),
                new_src: src_node.label.clone(),
                new_dst: dst_label,
            });
        }
        let dst_node = self.nodes.get(&dst).ok_or_else(|| GraphViewError::UnknownLabel(dst.clone()))?;
        if dst_node.label != dst_label {
            return Err(GraphViewError::SchemaConflict {
                label: label.clone(),
                existing_src: src_label,
                existing_dst: dst_label.clone(),
                new_src: dst_node.label.clone(),
                new_dst: dst_label,
            });
        }

        self.edges.insert(id.clone(), EdgeFact { id, src, dst, label });
        self.catalog.invalidate_all_materialized();
        Ok(())
    }

    pub fn insert_node_prop(
        &mut self,
        node_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let node_id = node_id.into();
        if !self.nodes.contains_key(&node_id) {
            return Err(GraphViewError::UnknownLabel(node_id));
        }
        self.node_props.insert((node_id, key.into()), value.into());
        self.catalog.invalidate_all_materialized();
        Ok(())
    }

    pub fn insert_edge_prop(
        &mut self,
        edge_id: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<()> {
        let edge_id = edge_id.into();
        if !self.edges.contains_key(&edge_id) {
            return Err(GraphViewError::UnknownLabel(edge_id));
        }
        self.edge_props.insert((edge_id, key.into()), value.into());
        self.catalog.invalidate_all_materialized();
        Ok(())
    }

    #[must_use]
    pub fn node(&self, id: &str) -> Option<&NodeFact> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn edge(&self, id: &str) -> Option<&EdgeFact> {
        self.edges.get(id)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Every base fact as ground IR atoms, ready for `Backend::insert_facts`.
    #[must_use]
    pub fn base_facts(&self, source: &str) -> Vec<Atom> {
        let mut out = Vec::new();
        for node in self.nodes.values() {
            out.push(Atom::new(
                Predicate::Node { source: source.to_string() },
                vec![IrTerm::Const(node.id.clone()), IrTerm::Const(node.label.clone())],
            ));
        }
        for edge in self.edges.values() {
            out.push(Atom::new(
                Predicate::Edge { source: source.to_string() },
                vec![
                    IrTerm::Const(edge.id.clone()),
                    IrTerm::Const(edge.src.clone()),
                    IrTerm::Const(edge.dst.clone()),
                    IrTerm::Const(edge.label.clone()),
                ],
            ));
        }
        for ((node_id, key), value) in &self.node_props {
            out.push(Atom::new(
                Predicate::NodeProp { source: source.to_string() },
                vec![
                    IrTerm::Const(node_id.clone()),
                    IrTerm::Const(key.clone()),
                    IrTerm::Const(value.clone()),
                ],
            ));
        }
        for ((edge_id, key), value) in &self.edge_props {
            out.push(Atom::new(
                Predicate::EdgeProp { source: source.to_string() },
                vec![
                    IrTerm::Const(edge_id.clone()),
                    IrTerm::Const(key.clone()),
                    IrTerm::Const(value.clone()),
                ],
            ));
        }
        out
    }
}
