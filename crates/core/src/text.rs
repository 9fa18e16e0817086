//! Validated text primitives.

use crate::error::{ClinicError, ClinicResult};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A string that holds at least one non-whitespace character.
///
/// The input is trimmed during construction, so two values that differ only by surrounding
/// whitespace compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, failing with [`ClinicError::InvalidInput`] when the
    /// trimmed input is empty.
    pub fn new(input: impl AsRef<str>) -> ClinicResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(ClinicError::InvalidInput("text cannot be empty".into()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Like [`NonEmptyText::new`] but names the offending field in the error.
    pub fn field(field: &str, input: impl AsRef<str>) -> ClinicResult<Self> {
        Self::new(input).map_err(|_| ClinicError::InvalidInput(format!("{field} is required")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        let text = NonEmptyText::new("  Acme  ").expect("non-empty");
        assert_eq!(text.as_str(), "Acme");
    }

    #[test]
    fn field_error_names_the_field() {
        let err = NonEmptyText::field("lastName", " ").expect_err("blank");
        assert_eq!(err.to_string(), "invalid input: lastName is required");
    }
}
