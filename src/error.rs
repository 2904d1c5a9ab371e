//! Stable, observable error kinds at the search-core boundary.
//!
//! See `spec.md` §7. `EmptyNeighborhood` is recovered locally by runners
//! (it ends the current run); every other variant propagates to the
//! solver, which terminates the run and returns the best-so-far.

use std::fmt;

/// Errors raised at the boundary between the search core and a
/// user-supplied problem module, or between a runner and its caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// A user hook (e.g. `greedy_state`, `state_distance`) was not
    /// overridden and has no default implementation.
    #[error("{hook} is not implemented for this problem")]
    NotImplemented {
        /// Name of the unoverridden hook.
        hook: &'static str,
    },

    /// No admissible move exists in the current neighborhood scan.
    ///
    /// Recovered locally: a runner that receives this ends its run
    /// cleanly and returns the best state seen so far.
    #[error("neighborhood exploration found no admissible move")]
    EmptyNeighborhood,

    /// A required parameter was read before being set.
    #[error("parameter `{flag}` was not set")]
    ParameterNotSet {
        /// Flag name of the missing parameter.
        flag: &'static str,
    },

    /// A parameter was set to a value that fails its validity predicate.
    #[error("parameter `{flag}` has an incorrect value: {reason}")]
    IncorrectParameterValue {
        /// Flag name of the offending parameter.
        flag: &'static str,
        /// Human-readable reason the value was rejected.
        reason: String,
    },

    /// A delta-cost / full-cost inconsistency was detected.
    ///
    /// Only ever raised by the debug-assertion helpers in
    /// [`crate::core::neighborhood`]; never raised in release checks.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

impl Error {
    /// Shorthand for [`Error::IncorrectParameterValue`].
    pub fn incorrect(flag: &'static str, reason: impl Into<String>) -> Self {
        Error::IncorrectParameterValue {
            flag,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::ParameterNotSet`].
    pub fn not_set(flag: &'static str) -> Self {
        Error::ParameterNotSet { flag }
    }

    /// Shorthand for [`Error::NotImplemented`].
    pub fn not_implemented(hook: &'static str) -> Self {
        Error::NotImplemented { hook }
    }
}

/// A result whose error type is the search core's [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// `true` for the one error kind runners are expected to recover from.
    pub fn is_empty_neighborhood(&self) -> bool {
        matches!(self, Error::EmptyNeighborhood)
    }
}

#[allow(dead_code)]
fn _assert_send_sync()
where
    Error: Send + Sync + fmt::Debug,
{
}
