#![forbid(unsafe_code)]

//! Validators: pure functions from a node to an optional error map.
//!
//! A [`Validator`] is stored on every node and re-run on every recomputation
//! that reaches the node. It must not mutate the tree. Returning `None` (or
//! an empty map, which is normalized to `None`) means the node is valid.
//!
//! Building blocks for common policies are provided; anything else is a
//! closure passed to [`Validator::new`].
//!
//! ```
//! use formtree_core::{Leaf, Validator, Value};
//!
//! let age = Leaf::with_validator(
//!     Value::Null,
//!     Validator::compose([
//!         Validator::required(),
//!         Validator::check("adult", |v| v.as_i64().is_none_or(|n| n >= 18)),
//!     ]),
//! );
//! assert!(age.has_error("required"));
//!
//! age.update_value(12);
//! assert!(age.has_error("adult"));
//! ```

use std::rc::Rc;

use crate::node::{ChildKey, Node};
use crate::value::{ErrorMap, Value};

/// Error code set by [`Validator::required`].
pub const ERROR_CODE_REQUIRED: &str = "required";
/// Error code set by [`Validator::all_children_valid`].
pub const ERROR_CODE_INVALID_CHILDREN: &str = "invalid_children";

type ValidateFn = dyn Fn(&Node) -> Option<ErrorMap>;

/// A shareable validator function.
///
/// Cloning is cheap (reference counted).
#[derive(Clone)]
pub struct Validator {
    name: &'static str,
    func: Rc<ValidateFn>,
}

impl Validator {
    /// Wrap an arbitrary validation function.
    pub fn new(func: impl Fn(&Node) -> Option<ErrorMap> + 'static) -> Self {
        Self::named("custom", func)
    }

    /// Wrap a function under a name shown in `Debug` output and logs.
    pub fn named(name: &'static str, func: impl Fn(&Node) -> Option<ErrorMap> + 'static) -> Self {
        Self {
            name,
            func: Rc::new(func),
        }
    }

    /// Never reports errors. Default for leaves.
    #[must_use]
    pub fn always_valid() -> Self {
        Self::named("always_valid", |_| None)
    }

    /// Rejects [`Value::Null`] with `{"required": true}`.
    #[must_use]
    pub fn required() -> Self {
        Self::named("required", |node| {
            node.value()
                .is_null()
                .then(|| single(ERROR_CODE_REQUIRED, Value::Bool(true)))
        })
    }

    /// Reports `{code: true}` when `predicate` returns false for the value.
    pub fn check(code: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        let code = code.into();
        Self::named("check", move |node| {
            (!predicate(&node.value())).then(|| single(code.clone(), Value::Bool(true)))
        })
    }

    /// Container policy: invalid iff at least one *included* child is
    /// invalid. The error detail lists the offending child keys in order.
    /// Default for groups and arrays.
    #[must_use]
    pub fn all_children_valid() -> Self {
        Self::named("all_children_valid", |node| {
            let invalid: Vec<Value> = node
                .included_children()
                .into_iter()
                .filter(|(_, child)| !child.valid())
                .map(|(key, _)| match key {
                    ChildKey::Name(name) => Value::Text(name),
                    ChildKey::Index(index) => Value::from(index),
                })
                .collect();
            (!invalid.is_empty()).then(|| single(ERROR_CODE_INVALID_CHILDREN, Value::List(invalid)))
        })
    }

    /// Run every validator and merge their error maps. Later validators
    /// overwrite earlier ones on a shared error code.
    pub fn compose(validators: impl IntoIterator<Item = Validator>) -> Self {
        let parts: Vec<Validator> = validators.into_iter().collect();
        Self::named("compose", move |node| {
            let mut merged = ErrorMap::new();
            for part in &parts {
                if let Some(errors) = part.validate(node) {
                    merged.extend(errors);
                }
            }
            (!merged.is_empty()).then_some(merged)
        })
    }

    /// Run the validator. An empty map is normalized to `None`.
    #[must_use]
    pub fn validate(&self, node: &Node) -> Option<ErrorMap> {
        (self.func)(node).filter(|errors| !errors.is_empty())
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for Validator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Validator").field(&self.name).finish()
    }
}

fn single(code: impl Into<String>, detail: Value) -> ErrorMap {
    let mut map = ErrorMap::new();
    map.insert(code.into(), detail);
    map
}
