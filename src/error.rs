//! Error types for the graph view engine.
//!
//! The error kinds mirror the propagation policy of the surface protocol:
//! user-input errors carry position information when available and never
//! leave the catalog mutated; program-structure errors are detected while
//! assembling a program from view definitions; backend errors are surfaced
//! unchanged.

use thiserror::Error;

/// Exhaustive error kinds produced by the core.
#[derive(Error, Debug, Clone)]
pub enum GraphViewError {
    /// Surface syntax could not be parsed.
    #[error("parse error at {pos}: {msg}")]
    ParseError { pos: usize, msg: String },

    /// Referenced a graph that has not been created (or has been dropped).
    #[error("unknown graph: {0}")]
    UnknownGraph(String),

    /// Referenced a view that has not been created (or has been dropped).
    #[error("unknown view: {0}")]
    UnknownView(String),

    /// Referenced a node or edge label that is not registered in the schema.
    #[error("unknown label: {0}")]
    UnknownLabel(String),

    /// An edge label was declared twice with different endpoint types.
    #[error("schema conflict: label '{label}' already declared with endpoints ({existing_src} -> {existing_dst}), cannot redeclare as ({new_src} -> {new_dst})")]
    SchemaConflict {
        label: String,
        existing_src: String,
        existing_dst: String,
        new_src: String,
        new_dst: String,
    },

    /// A pattern is statically unsatisfiable under the schema's edge typing.
    #[error("type error: {0}")]
    TypeError(String),

    /// A rule's head references a variable not bound positively in its body.
    #[error("unsafe rule: variables {vars:?} in head of '{relation}' do not appear in any positive body atom")]
    UnsafeRule { relation: String, vars: Vec<String> },

    /// A negated atom participates in a recursive cycle with its own stratum.
    #[error("unstratified negation: relation '{0}' negates a relation reachable from itself")]
    UnstratifiedNegation(String),

    /// A view is ultimately defined in terms of itself, other than through
    /// legal Kleene-star recursion.
    #[error("cyclic view dependency: {0}")]
    CyclicViewDependency(String),

    /// The same Skolem function name was used with two different arities.
    #[error("skolem arity mismatch: function '{name}' used with arity {first_arity} and {second_arity}")]
    SkolemArityMismatch {
        name: String,
        first_arity: usize,
        second_arity: usize,
    },

    /// The backend adapter reported an error. The session's handle may now
    /// be invalid and require reconnection.
    #[error("backend error: {0}")]
    BackendError(String),

    /// The operation was cancelled via a cooperative cancel token or timeout.
    #[error("cancelled")]
    Cancelled,
}

impl GraphViewError {
    /// CLI exit code for this error, per the documented exit-code convention.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            GraphViewError::ParseError { .. } => 1,
            GraphViewError::UnknownGraph(_)
            | GraphViewError::UnknownView(_)
            | GraphViewError::UnknownLabel(_)
            | GraphViewError::SchemaConflict { .. }
            | GraphViewError::TypeError(_)
            | GraphViewError::UnsafeRule { .. }
            | GraphViewError::UnstratifiedNegation(_)
            | GraphViewError::CyclicViewDependency(_)
            | GraphViewError::SkolemArityMismatch { .. } => 2,
            GraphViewError::BackendError(_) => 3,
            GraphViewError::Cancelled => 4,
        }
    }
}

/// Convenience alias used throughout the core.
pub type Result<T> = std::result::Result<T, GraphViewError>;
