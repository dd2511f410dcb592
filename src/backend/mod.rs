//! # Backend Adapter
//!
//! The engine compiles views and queries down to a backend-independent
//! [`RuleProgram`]; what actually evaluates it is pluggable behind this
//! trait. Concrete, production backends (a column store, a differential
//! dataflow worker pool, a vendor's own engine) are out of scope here -
//! this module defines the seam and ships one reference implementation
//! used by the test suite and by `graphview` when no backend is
//! configured.

pub mod reference;

use crate::error::Result;
use crate::execution::Deadline;
use crate::ir::{Atom, RuleProgram};
use crate::schema::SchemaRegistry;

/// A binding of the base graph's extensional facts, handed to `insertFacts`
/// and returned (filtered) by `evaluate`.
pub type FactSet = Vec<Atom>;

/// The seam between the engine core and a concrete evaluation backend.
///
/// Implementors own their own connection/session state; `open`/`close`
/// bracket its lifetime. All other methods assume an open connection.
pub trait Backend: Send + Sync {
    /// Establish whatever connection or in-process state this backend needs.
    ///
    /// # Errors
    /// Returns [`crate::error::GraphViewError::BackendError`] on failure.
    fn open(&mut self) -> Result<()>;

    /// Release the backend's connection/state. Idempotent.
    fn close(&mut self) -> Result<()>;

    /// Push a schema declaration down to the backend, if it tracks one of
    /// its own (e.g. to create column families or validate constraints).
    fn apply_schema(&mut self, graph: &str, schema: &SchemaRegistry) -> Result<()>;

    /// Load extensional facts for `graph` into the backend.
    fn insert_facts(&mut self, graph: &str, facts: FactSet) -> Result<()>;

    /// Evaluate `program` to a fixpoint and materialize the facts for
    /// `target_predicate` into the catalog (used by the `materialize`
    /// surface command). `deadline` is checked between fixpoint rounds.
    fn materialize(
        &mut self,
        program: &RuleProgram,
        target_predicate: &str,
        deadline: &Deadline,
    ) -> Result<FactSet>;

    /// Evaluate `program` to a fixpoint and return the facts for
    /// `target_predicate`, without persisting them (used by `MATCH ...
    /// RETURN`). `deadline` is checked between fixpoint rounds.
    fn evaluate(
        &mut self,
        program: &RuleProgram,
        target_predicate: &str,
        deadline: &Deadline,
    ) -> Result<FactSet>;
}
