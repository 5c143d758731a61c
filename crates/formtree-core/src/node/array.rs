#![forbid(unsafe_code)]

//! Indexed container.
//!
//! Children are addressed by position; every child is always included.
//! Indices past the end are rejected with [`FormError::IndexOutOfRange`]
//! and leave the tree untouched. `insert` additionally accepts `len` as an
//! append slot. A node may sit in at most one slot of one container:
//! construction, `push`, and `insert` reject a node that already has a parent.

use super::{Children, Node};
use crate::error::FormError;
use crate::validator::Validator;
use crate::value::Value;

/// Indexed container node.
#[derive(Clone)]
pub struct Array(pub(super) Node);

impl Array {
    /// An array over `children` with the default validity policy.
    pub fn new<N: Into<Node>>(children: impl IntoIterator<Item = N>) -> Result<Self, FormError> {
        Self::with_validator(children, Validator::all_children_valid())
    }

    /// Fails with [`FormError::AlreadyAttached`] if a child already has a
    /// parent or appears twice.
    pub fn with_validator<N: Into<Node>>(
        children: impl IntoIterator<Item = N>,
        validator: Validator,
    ) -> Result<Self, FormError> {
        let items = children.into_iter().map(Into::into).collect();
        Node::create(Value::Null, Children::Array(items), validator).map(Self)
    }

    fn with_items<R>(&self, f: impl FnOnce(&Vec<Node>) -> R) -> R {
        match &self.0.state().children {
            Children::Array(items) => f(items),
            _ => unreachable!("Array handle over a non-array node"),
        }
    }

    fn with_items_mut<R>(&self, f: impl FnOnce(&mut Vec<Node>) -> R) -> R {
        match &mut self.0.state_mut().children {
            Children::Array(items) => f(items),
            _ => unreachable!("Array handle over a non-array node"),
        }
    }

    /// Child at `index`.
    pub fn at(&self, index: usize) -> Result<Node, FormError> {
        self.with_items(|items| {
            items.get(index).cloned().ok_or(FormError::IndexOutOfRange {
                index,
                len: items.len(),
            })
        })
    }

    /// All children, in order.
    #[must_use]
    pub fn children(&self) -> Vec<Node> {
        self.with_items(Clone::clone)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.with_items(Vec::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a child and recompute.
    pub fn push(&self, child: impl Into<Node>) -> Result<(), FormError> {
        let index = self.len();
        self.insert(index, child)
    }

    /// Insert a child before `index` (`index == len` appends) and recompute.
    pub fn insert(&self, index: usize, child: impl Into<Node>) -> Result<(), FormError> {
        let child = child.into();
        let _span = tracing::debug_span!("array_insert", index).entered();
        let len = self.len();
        if index > len {
            tracing::debug!(len, "insert rejected: index out of range");
            return Err(FormError::IndexOutOfRange { index, len });
        }
        self.0.attach(&child)?;
        self.with_items_mut(|items| items.insert(index, child));
        self.0.recompute_value();
        Ok(())
    }

    /// Remove and detach the child at `index`, then recompute.
    pub fn remove_at(&self, index: usize) -> Result<Node, FormError> {
        let _span = tracing::debug_span!("array_remove", index).entered();
        let removed = self.with_items_mut(|items| {
            if index < items.len() {
                Ok(items.remove(index))
            } else {
                Err(FormError::IndexOutOfRange {
                    index,
                    len: items.len(),
                })
            }
        })?;
        self.0.detach(&removed);
        self.0.recompute_value();
        Ok(removed)
    }
}
