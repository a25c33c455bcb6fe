//! Field-scoped error accumulator used by every validation step.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Collects at most one error message per field.
///
/// The first message recorded for a field wins; later ones are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Validator {
    errors: BTreeMap<String, String>,
}

impl Validator {
    /// Create an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no errors have been recorded.
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` for `field` unless the field already has one.
    pub fn add_error(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    /// Record `message` for `field` when `ok` is false.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.add_error(field, message);
        }
    }

    /// Message recorded for `field`, if any.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.errors.get(field).map(String::as_str)
    }

    /// Number of fields with errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when no errors have been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Field errors in field-name order.
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Turn the accumulated errors into a `Result`.
    pub fn finish(self) -> crate::Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(crate::UsergateError::Validation(self))
        }
    }
}

/// True when the byte length of `s` lies within `min..=max`.
pub fn length_between(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len())
}

impl fmt::Display for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.errors {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field} {message}")?;
            first = false;
        }
        Ok(())
    }
}
