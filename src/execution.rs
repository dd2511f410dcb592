//! # Cooperative cancellation
//!
//! A single `Arc<AtomicBool>` flag shared between whoever is running a
//! command and whoever wants to interrupt it (a `quit` while a query is
//! mid-flight, a configured timeout). Checked between rewriter stages and
//! before/after each backend call rather than relying on the backend to
//! support true preemption.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{GraphViewError, Result};

/// A cheaply cloneable cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Check the flag, turning a cancellation into an error at the call
    /// site. Intended to be called between rewriter stages and before each
    /// backend invocation.
    ///
    /// # Errors
    /// Returns [`GraphViewError::Cancelled`] if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GraphViewError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Combines a [`CancelToken`] with an optional wall-clock deadline, so a
/// single value can be threaded through a command's execution and checked
/// uniformly regardless of whether it was cancelled explicitly or timed out.
#[derive(Debug, Clone)]
pub struct Deadline {
    token: CancelToken,
    expires_at: Option<Instant>,
}

impl Deadline {
    #[must_use]
    pub fn none() -> Self {
        Deadline { token: CancelToken::new(), expires_at: None }
    }

    #[must_use]
    pub fn with_timeout(token: CancelToken, timeout: Duration) -> Self {
        Deadline { token, expires_at: Some(Instant::now() + timeout) }
    }

    #[must_use]
    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Check both the explicit cancel flag and the wall-clock deadline.
    ///
    /// # Errors
    /// Returns [`GraphViewError::Cancelled`] if either has elapsed/fired.
    pub fn check(&self) -> Result<()> {
        self.token.check()?;
        if let Some(expires_at) = self.expires_at {
            if Instant::now() >= expires_at {
                return Err(GraphViewError::Cancelled);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        let t = CancelToken::new();
        assert!(t.check().is_ok());
    }

    #[test]
    fn cancel_is_visible_to_clones() {
        let t = CancelToken::new();
        let clone = t.clone();
        t.cancel();
        assert!(clone.check().is_err());
    }

    #[test]
    fn deadline_with_zero_timeout_fires_immediately() {
        let d = Deadline::with_timeout(CancelToken::new(), Duration::from_secs(0));
        std::thread::sleep(Duration::from_millis(1));
        assert!(matches!(d.check(), Err(GraphViewError::Cancelled)));
    }

    #[test]
    fn deadline_with_no_timeout_never_fires_on_its_own() {
        let d = Deadline::none();
        assert!(d.check().is_ok());
    }
}
