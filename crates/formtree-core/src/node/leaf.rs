#![forbid(unsafe_code)]

use super::Node;
use crate::validator::Validator;
use crate::value::Value;

/// Terminal node holding a scalar value.
#[derive(Clone)]
pub struct Leaf(pub(super) Node);

impl Leaf {
    /// A leaf that is always valid.
    pub fn new(value: impl Into<Value>) -> Self {
        Self::with_validator(value, Validator::always_valid())
    }

    pub fn with_validator(value: impl Into<Value>, validator: Validator) -> Self {
        Self(Node::create_leaf(value.into(), validator))
    }

    /// Accept a new value and propagate it to the root.
    ///
    /// Never rejects: an unacceptable value shows up as an invalid status,
    /// not as an error.
    pub fn update_value(&self, value: impl Into<Value>) {
        let value = value.into();
        let _span = tracing::debug_span!("leaf_update", value_type = value.type_name()).entered();
        self.0.state_mut().value = value;
        self.0.finish_change();
    }
}
