#![forbid(unsafe_code)]

//! Structural errors.
//!
//! Invalid *values* are never errors: they are reported through a node's
//! status and error map. [`FormError`] covers misuse of the tree shape.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Index out of range | `at` / `remove_at` past the end, `insert` past `len` | `Err(IndexOutOfRange)`, tree untouched |
//! | Cycle | attaching a container (or one of its ancestors) under itself | `Err(Cycle)`, tree untouched |
//! | Already attached | attaching a node that still has a parent, or building a container with the same node twice | `Err(AlreadyAttached)`, tree untouched |
//! | Missing path segment | `find` on an unknown name or through a non-group | `None` (not an error) |

/// Errors from structural tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    /// An index did not address an existing child (or insertion slot).
    IndexOutOfRange { index: usize, len: usize },
    /// The child to attach is the container itself or one of its ancestors.
    Cycle,
    /// The child to attach already belongs to a container. Remove it first.
    AlreadyAttached,
}

impl std::fmt::Display for FormError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for length {len}")
            }
            Self::Cycle => f.write_str("attaching this node would create a cycle"),
            Self::AlreadyAttached => f.write_str("node is already attached to a container"),
        }
    }
}

impl std::error::Error for FormError {}
