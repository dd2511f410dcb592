//! # Schema Registry (C1)
//!
//! Tracks node labels, edge labels, and edge endpoint typing for one graph.
//! Each graph owns exactly one registry; there is no cross-graph sharing.

use crate::error::{GraphViewError, Result};
use std::collections::HashMap;

/// Endpoint typing for an edge label: `(source_label, destination_label)`.
pub type Endpoints = (String, String);

/// Node/edge labels, edge endpoint typing, and the lookups the rest of the
/// core needs to validate patterns and inserts against them.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    node_labels: HashMap<String, ()>,
    edge_labels: HashMap<String, Endpoints>,
}

impl SchemaRegistry {
    #[must_use]
    pub fn new() -> Self {
        SchemaRegistry {
            node_labels: HashMap::new(),
            edge_labels: HashMap::new(),
        }
    }

    /// Declare a node label. Idempotent - declaring the same label twice is
    /// not an error (there is nothing about a node label that could conflict).
    pub fn add_node_label(&mut self, label: impl Into<String>) {
        self.node_labels.insert(label.into(), ());
    }

    /// Declare an edge label with its endpoint typing.
    ///
    /// # Errors
    /// Returns `SchemaConflict` if the label is already declared with
    /// different endpoints.
    pub fn add_edge_label(
        &mut self,
        label: impl Into<String>,
        src: impl Into<String>,
        dst: impl Into<String>,
    ) -> Result<()> {
        let label = label.into();
        let src = src.into();
        let dst = dst.into();
        if let Some((existing_src, existing_dst)) = self.edge_labels.get(&label) {
            if *existing_src != src || *existing_dst != dst {
                return Err(GraphViewError::SchemaConflict {
                    label,
                    existing_src: existing_src.clone(),
                    existing_dst: existing_dst.clone(),
                    new_src: src,
                    new_dst: dst,
                });
            }
            return Ok(());
        }
        self.edge_labels.insert(label, (src, dst));
        Ok(())
    }

    /// Look up the endpoint typing for an edge label.
    ///
    /// # Errors
    /// Returns `UnknownLabel` if the label was never declared.
    pub fn endpoints(&self, label: &str) -> Result<&Endpoints> {
        self.edge_labels
            .get(label)
            .ok_or_else(|| GraphViewError::UnknownLabel(label.to_string()))
    }

    #[must_use]
    pub fn has_node_label(&self, label: &str) -> bool {
        self.node_labels.contains_key(label)
    }

    #[must_use]
    pub fn has_edge_label(&self, label: &str) -> bool {
        self.edge_labels.contains_key(label)
    }

    #[must_use]
    pub fn node_labels(&self) -> impl Iterator<Item = &str> {
        self.node_labels.keys().map(String::as_str)
    }

    #[must_use]
    pub fn edge_labels(&self) -> impl Iterator<Item = &str> {
        self.edge_labels.keys().map(String::as_str)
    }

    /// Validate that a label used in an insert is known. Node labels and
    /// edge labels are rejected the same way: an insert whose label is not
    /// in the schema is rejected outright.
    pub fn require_node_label(&self, label: &str) -> Result<()> {
        if self.has_node_label(label) {
            Ok(())
        } else {
            Err(GraphViewError::UnknownLabel(label.to_string()))
        }
    }

    pub fn require_edge_label(&self, label: &str) -> Result<()> {
        if self.has_edge_label(label) {
            Ok(())
        } else {
            Err(GraphViewError::UnknownLabel(label.to_string()))
        }
    }
}
