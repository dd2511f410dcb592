//! # Session
//!
//! A session owns every graph the connected client has created, each
//! behind its own `parking_lot::RwLock`: mutating commands (`insert`,
//! `import`, `CREATE VIEW`, `drop`) take the write lock, queries and
//! `materialize` reads take the read lock, so concurrent queries never
//! block each other but a mutation has exclusive access while it runs.

use crate::error::{GraphViewError, Result};
use crate::graph::Graph;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// A named, lock-guarded graph handle.
pub type GraphHandle = Arc<RwLock<Graph>>;

/// Owns the set of graphs a connected client has visibility into, plus
/// which one is currently selected by `use`.
#[derive(Default)]
pub struct Session {
    graphs: HashMap<String, GraphHandle>,
    current: Option<String>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Session::default()
    }

    /// `create graph <name>`.
    ///
    /// # Errors
    /// Returns [`GraphViewError::BackendError`] if the name is already in use -
    /// chosen over a dedicated variant since this is a catalog-level
    /// naming conflict, not a schema-typing one.
    pub fn create_graph(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        if self.graphs.contains_key(&name) {
            return Err(GraphViewError::BackendError(format!("graph '{name}' already exists")));
        }
        self.graphs.insert(name.clone(), Arc::new(RwLock::new(Graph::new())));
        if self.current.is_none() {
            self.current = Some(name);
        }
        Ok(())
    }

    /// `drop graph <name>`.
    pub fn drop_graph(&mut self, name: &str) -> Result<()> {
        self.graphs
            .remove(name)
            .ok_or_else(|| GraphViewError::UnknownGraph(name.to_string()))?;
        if self.current.as_deref() == Some(name) {
            self.current = None;
        }
        Ok(())
    }

    /// `use <name>`.
    pub fn use_graph(&mut self, name: &str) -> Result<()> {
        if !self.graphs.contains_key(name) {
            return Err(GraphViewError::UnknownGraph(name.to_string()));
        }
        self.current = Some(name.to_string());
        Ok(())
    }

    #[must_use]
    pub fn current_name(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn handle(&self, name: &str) -> Result<GraphHandle> {
        self.graphs
            .get(name)
            .cloned()
            .ok_or_else(|| GraphViewError::UnknownGraph(name.to_string()))
    }

    pub fn current_handle(&self) -> Result<GraphHandle> {
        let name = self.current.clone().ok_or_else(|| {
            GraphViewError::UnknownGraph("no graph selected (use 'use <name>' first)".to_string())
        })?;
        self.handle(&name)
    }

    #[must_use]
    pub fn list_graphs(&self) -> Vec<&str> {
        self.graphs.keys().map(String::as_str).collect()
    }
}
