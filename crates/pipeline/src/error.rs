//! # Error Types
//!
//! Failures in a pipeline are first-class values. Most composition mistakes
//! (wiring a bundle into a stage that cannot take it, unzipping three
//! functions over a pair) never get this far: they have no `Node`
//! implementation and are rejected by the compiler. What remains are the
//! failures only observable at run time: user code failing, branches
//! panicking, and arity checks on dynamically sized combinators.

use thiserror::Error;
use tokio::task::JoinError;

/// Boxed error produced by user-supplied callables.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced at the invocation site of a pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A dynamically sized distribution was handed a value list whose
    /// length matches neither the stage count nor the broadcast case.
    #[error("Arity mismatch: {stages} stages cannot be applied to {values} values")]
    ArityMismatch { stages: usize, values: usize },

    /// The wrapped callable failed. The original error is kept untouched.
    #[error(transparent)]
    Stage(BoxError),

    /// A concurrently scheduled branch panicked.
    #[error("Branch panicked: {message}")]
    BranchPanicked { message: String },

    /// The runtime dropped a branch before it produced a value.
    #[error("Branch cancelled before completion")]
    BranchCancelled,

    /// Concurrent work was requested outside of any Tokio runtime.
    #[error("No async runtime available to schedule concurrent work")]
    NoRuntime,

    /// `Handle::wait` would block the only worker of a current-thread runtime.
    #[error("Blocking wait is not supported on a current-thread runtime")]
    BlockingWaitUnsupported,

    /// Structural validation of a combinator tree failed.
    #[error("Topology validation failed: {reason}")]
    Topology { reason: String },

    /// An engine configuration value could not be used.
    #[error("Invalid configuration {key}={value}: {reason}")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The worker runtime could not be started.
    #[error("Failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl PipelineError {
    /// Wrap an error raised by user code.
    ///
    /// A `PipelineError` coming back out of a stage (for example one
    /// propagated from `Handle::join` inside an async stage) is returned
    /// as-is rather than nested.
    pub fn stage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let boxed: BoxError = Box::new(err);
        match boxed.downcast::<PipelineError>() {
            Ok(inner) => *inner,
            Err(other) => PipelineError::Stage(other),
        }
    }

    /// Borrow the original stage error as a concrete type, if it is one.
    pub fn stage_error<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        match self {
            PipelineError::Stage(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// True when the failure came from user code rather than the engine.
    pub fn is_stage(&self) -> bool {
        matches!(self, PipelineError::Stage(_))
    }

    pub(crate) fn from_join(err: JoinError) -> Self {
        if err.is_panic() {
            let payload = err.into_panic();
            let message = if let Some(msg) = payload.downcast_ref::<&'static str>() {
                (*msg).to_string()
            } else if let Some(msg) = payload.downcast_ref::<String>() {
                msg.clone()
            } else {
                "non-string panic payload".to_string()
            };
            PipelineError::BranchPanicked { message }
        } else {
            PipelineError::BranchCancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt;

    #[derive(Debug, PartialEq)]
    struct Overdrawn(u32);

    impl fmt::Display for Overdrawn {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "overdrawn by {}", self.0)
        }
    }

    impl std::error::Error for Overdrawn {}

    #[test]
    fn test_stage_error_is_transparent() {
        let err = PipelineError::stage(Overdrawn(12));
        assert!(err.is_stage());
        assert_eq!(err.to_string(), "overdrawn by 12");
        assert_eq!(err.stage_error::<Overdrawn>(), Some(&Overdrawn(12)));
    }

    #[test]
    fn test_stage_does_not_nest_pipeline_errors() {
        let err = PipelineError::stage(PipelineError::ArityMismatch {
            stages: 3,
            values: 2,
        });
        assert!(matches!(
            err,
            PipelineError::ArityMismatch {
                stages: 3,
                values: 2
            }
        ));
    }

    #[test]
    fn test_arity_mismatch_display() {
        let err = PipelineError::ArityMismatch {
            stages: 3,
            values: 2,
        };
        assert_eq!(
            err.to_string(),
            "Arity mismatch: 3 stages cannot be applied to 2 values"
        );
        assert!(err.stage_error::<Overdrawn>().is_none());
    }
}
