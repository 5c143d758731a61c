#![forbid(unsafe_code)]

//! Validity status of a node.

use std::fmt;

/// String form of [`Status::Valid`].
pub const VALID: &str = "VALID";
/// String form of [`Status::Invalid`].
pub const INVALID: &str = "INVALID";

/// Validity of a node. A node is [`Status::Invalid`] exactly when its
/// validator reported errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "UPPERCASE")
)]
pub enum Status {
    #[default]
    Valid,
    Invalid,
}

impl Status {
    /// Derive the status from an error map.
    #[inline]
    #[must_use]
    pub const fn from_errors<T>(errors: Option<&T>) -> Self {
        if errors.is_some() {
            Self::Invalid
        } else {
            Self::Valid
        }
    }

    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Valid => VALID,
            Self::Invalid => INVALID,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
