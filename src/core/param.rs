//! Named, validated configuration values.
//!
//! `spec.md` §6 lists runner/kicker/solver parameters as named flags with
//! an optional default and a validation rule (e.g. `max_idle_rounds`,
//! `alpha`). Config structs in `runner`/`kicker`/`solver` are plain,
//! teacher-style `with_*` builders; `Parameter` is only for the smaller
//! set of values that are genuinely optional (no sane crate-wide
//! default) or derived from another field, where a bare `Option<T>`
//! would lose the flag's name in error messages.

use crate::error::{Error, Result};

/// An optional or derived configuration value, named for diagnostics.
#[derive(Debug, Clone)]
pub struct Parameter<T> {
    flag: &'static str,
    value: Option<T>,
}

impl<T> Parameter<T> {
    /// An unset parameter.
    pub fn unset(flag: &'static str) -> Self {
        Parameter { flag, value: None }
    }

    /// A parameter set to `value`.
    pub fn of(flag: &'static str, value: T) -> Self {
        Parameter {
            flag,
            value: Some(value),
        }
    }

    /// The flag name, for error messages.
    pub fn flag(&self) -> &'static str {
        self.flag
    }

    /// `true` iff a value has been set.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Sets the value, replacing any previous one.
    pub fn set(&mut self, value: T) {
        self.value = Some(value);
    }

    /// Clears the value.
    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Borrows the value, if set.
    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// The value, or [`Error::ParameterNotSet`] naming this flag.
    pub fn require(&self) -> Result<&T> {
        self.value.as_ref().ok_or_else(|| Error::not_set(self.flag))
    }

    /// The value, or `default` if unset.
    pub fn unwrap_or(&self, default: T) -> T
    where
        T: Clone,
    {
        self.value.clone().unwrap_or(default)
    }

    /// Validates a set value with `check`, leaving an unset parameter
    /// untouched (absence is not itself an error; callers that require
    /// presence should call [`require`](Self::require) first).
    pub fn validate(&self, check: impl FnOnce(&T) -> std::result::Result<(), String>) -> Result<()> {
        if let Some(value) = &self.value {
            check(value).map_err(|reason| Error::incorrect(self.flag, reason))?;
        }
        Ok(())
    }
}
