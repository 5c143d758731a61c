#![forbid(unsafe_code)]

//! Reactive form-state tree.
//!
//! A form is a tree of [`Leaf`] values under keyed [`Group`]s and indexed
//! [`Array`]s. Every mutation propagates synchronously from the changed node
//! to the root: each ancestor re-aggregates its value, re-runs its
//! [`Validator`], is marked dirty, and emits on its change channel.
//!
//! ```
//! use formtree_core::{Group, Leaf, Status, Validator, Value};
//!
//! let email = Leaf::with_validator(Value::Null, Validator::required());
//! let form = Group::new([("email", &email)])?;
//! assert_eq!(form.status(), Status::Invalid);
//!
//! email.update_value("ada@example.com");
//! assert!(form.valid());
//! assert!(form.dirty());
//! assert_eq!(form.value().to_string(), r#"{email:"ada@example.com"}"#);
//! # Ok::<(), formtree_core::FormError>(())
//! ```
//!
//! The tree is single-threaded (`Rc`/`RefCell`); handles are neither `Send`
//! nor `Sync`.

pub mod channel;
pub mod error;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod node;
pub mod path;
pub mod status;
pub mod validator;
pub mod value;

pub use channel::{ChangeChannel, Subscription, SubscriptionScope};
pub use error::FormError;
pub use node::{Array, ChildKey, Group, GroupBuilder, Leaf, Node, NodeFlags, NodeKind, is_node};
pub use path::NodePath;
pub use status::{INVALID, Status, VALID};
pub use validator::{ERROR_CODE_INVALID_CHILDREN, ERROR_CODE_REQUIRED, Validator};
pub use value::{ErrorMap, Value};
