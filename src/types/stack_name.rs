// ABOUTME: Validated stack name newtype.
// ABOUTME: Enforces the provisioning API's naming rules before any call is made.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StackNameError {
    #[error("stack name cannot be empty")]
    Empty,

    #[error("stack name exceeds maximum length of 128 characters")]
    TooLong,

    #[error("stack name must start with a letter")]
    BadFirstChar,

    #[error("invalid character in stack name: '{0}'")]
    InvalidChar(char),
}

/// A stack name accepted by the provisioning API: starts with a letter,
/// continues with letters, digits, and hyphens, at most 128 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StackName(String);

impl StackName {
    pub fn new(value: &str) -> Result<Self, StackNameError> {
        let mut chars = value.chars();
        match chars.next() {
            None => return Err(StackNameError::Empty),
            Some(c) if !c.is_ascii_alphabetic() => return Err(StackNameError::BadFirstChar),
            Some(_) => {}
        }

        if value.len() > 128 {
            return Err(StackNameError::TooLong);
        }

        for c in chars {
            if !c.is_ascii_alphanumeric() && c != '-' {
                return Err(StackNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StackName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
