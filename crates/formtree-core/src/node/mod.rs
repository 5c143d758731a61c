#![forbid(unsafe_code)]

//! The form tree: a shared node contract and three node kinds.
//!
//! - [`Leaf`]: terminal node holding a scalar [`Value`].
//! - [`Group`]: keyed container; children by name, with per-child inclusion.
//! - [`Array`]: indexed container; children by position.
//!
//! All three are thin handles over a [`Node`], which owns the shared state
//! (value, status, errors, flags, validator, change channel) and implements
//! propagation.
//!
//! # Architecture
//!
//! Nodes are `Rc<RefCell<..>>` handles. Containers own their children through
//! strong handles; a child points back at its container through a `Weak`
//! link that is only ever used to walk upward.
//!
//! # Propagation
//!
//! Every mutation runs one synchronous pass:
//!
//! ```text
//! own value → own validity (walks to root) → mark dirty → emit
//!           → parent value → parent validity → mark dirty → emit → ...
//! ```
//!
//! # Invariants
//!
//! 1. `status == Invalid` iff `errors.is_some()`.
//! 2. A container's value matches its children's values as soon as any
//!    mutation returns.
//! 3. `pristine` and `touched` are monotonic: once cleared / set they never
//!    revert.
//! 4. Emissions for one mutation arrive leaf first, root last.
//! 5. No `RefCell` borrow is held while a validator or subscriber runs.

mod array;
mod group;
mod leaf;

pub use array::Array;
pub use group::{Group, GroupBuilder};
pub use leaf::Leaf;

use std::any::Any;
use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use bitflags::bitflags;

use crate::channel::{ChangeChannel, Subscription};
use crate::error::FormError;
use crate::path::NodePath;
use crate::status::Status;
use crate::validator::Validator;
use crate::value::{ErrorMap, Value};

bitflags! {
    /// Interaction flags carried by every node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// Never mutated, directly or through a descendant.
        const PRISTINE = 1 << 0;
        /// Marked touched, directly or through a descendant.
        const TOUCHED = 1 << 1;
    }
}

/// Which of the three node kinds a [`Node`] is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Leaf,
    Group,
    Array,
}

/// Address of a child within its container.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChildKey {
    Name(String),
    Index(usize),
}

impl fmt::Display for ChildKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

pub(crate) struct GroupChildren {
    /// Insertion-ordered; replacing a name keeps its position.
    pub(crate) entries: Vec<(String, Node)>,
    /// Absent name = not optional (always included).
    pub(crate) optional: AHashMap<String, bool>,
}

impl GroupChildren {
    pub(crate) fn is_included(&self, name: &str) -> bool {
        self.optional.get(name).copied().unwrap_or(true)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find_map(|(n, child)| (n == name).then_some(child))
    }
}

pub(crate) enum Children {
    Leaf,
    Group(GroupChildren),
    Array(Vec<Node>),
}

impl Children {
    /// Every child, excluded group members included, in order.
    fn nodes(&self) -> Vec<Node> {
        match self {
            Self::Leaf => Vec::new(),
            Self::Group(group) => group.entries.iter().map(|(_, c)| c.clone()).collect(),
            Self::Array(items) => items.clone(),
        }
    }
}

pub(crate) struct NodeState {
    pub(crate) value: Value,
    status: Status,
    errors: Option<ErrorMap>,
    flags: NodeFlags,
    validator: Validator,
    parent: Weak<RefCell<NodeState>>,
    channel: ChangeChannel<Value>,
    pub(crate) children: Children,
}

/// Handle to a node of any kind.
///
/// Cloning yields another handle to the same node. Use [`Node::ptr_eq`] for
/// identity comparisons.
#[derive(Clone)]
pub struct Node {
    inner: Rc<RefCell<NodeState>>,
}

impl Node {
    /// A leaf node with its initial validity computed.
    pub(crate) fn create_leaf(value: Value, validator: Validator) -> Self {
        let node = Self::alloc(value, Children::Leaf, validator);
        node.initialize();
        node
    }

    /// Build a container, attach `children`, and compute its initial value
    /// and validity. Nothing is emitted and the node starts pristine.
    ///
    /// A child that already has a parent, or that appears twice, is rejected
    /// with [`FormError::AlreadyAttached`] before anything is attached.
    pub(crate) fn create(
        value: Value,
        children: Children,
        validator: Validator,
    ) -> Result<Self, FormError> {
        let nodes = children.nodes();
        for (i, child) in nodes.iter().enumerate() {
            if child.parent().is_some() || nodes[..i].iter().any(|seen| seen.ptr_eq(child)) {
                tracing::debug!(position = i, "construction rejected: child already attached");
                return Err(FormError::AlreadyAttached);
            }
        }
        let node = Self::alloc(value, children, validator);
        for child in &nodes {
            child.set_parent(Some(&node));
        }
        node.initialize();
        Ok(node)
    }

    fn alloc(value: Value, children: Children, validator: Validator) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NodeState {
                value,
                status: Status::Valid,
                errors: None,
                flags: NodeFlags::PRISTINE,
                validator,
                parent: Weak::new(),
                channel: ChangeChannel::new(),
                children,
            })),
        }
    }

    fn initialize(&self) {
        let value = self.aggregate();
        self.inner.borrow_mut().value = value;
        self.refresh_own_validity();
    }

    pub(crate) fn state(&self) -> Ref<'_, NodeState> {
        self.inner.borrow()
    }

    pub(crate) fn state_mut(&self) -> std::cell::RefMut<'_, NodeState> {
        self.inner.borrow_mut()
    }

    // --- Accessors ---

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self.state().children {
            Children::Leaf => NodeKind::Leaf,
            Children::Group(_) => NodeKind::Group,
            Children::Array(_) => NodeKind::Array,
        }
    }

    /// Current value (cloned).
    #[must_use]
    pub fn value(&self) -> Value {
        self.state().value.clone()
    }

    #[must_use]
    pub fn status(&self) -> Status {
        self.state().status
    }

    /// Current error map, `None` when valid.
    #[must_use]
    pub fn errors(&self) -> Option<ErrorMap> {
        self.state().errors.clone()
    }

    /// Detail recorded under one error code.
    #[must_use]
    pub fn error(&self, code: &str) -> Option<Value> {
        self.state()
            .errors
            .as_ref()
            .and_then(|errors| errors.get(code).cloned())
    }

    #[must_use]
    pub fn has_error(&self, code: &str) -> bool {
        self.state()
            .errors
            .as_ref()
            .is_some_and(|errors| errors.contains_key(code))
    }

    #[inline]
    #[must_use]
    pub fn valid(&self) -> bool {
        self.status().is_valid()
    }

    #[inline]
    #[must_use]
    pub fn invalid(&self) -> bool {
        !self.valid()
    }

    #[must_use]
    pub fn flags(&self) -> NodeFlags {
        self.state().flags
    }

    #[must_use]
    pub fn pristine(&self) -> bool {
        self.flags().contains(NodeFlags::PRISTINE)
    }

    #[must_use]
    pub fn dirty(&self) -> bool {
        !self.pristine()
    }

    #[must_use]
    pub fn touched(&self) -> bool {
        self.flags().contains(NodeFlags::TOUCHED)
    }

    #[must_use]
    pub fn untouched(&self) -> bool {
        !self.touched()
    }

    #[must_use]
    pub fn validator(&self) -> Validator {
        self.state().validator.clone()
    }

    /// Enclosing container, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<Node> {
        self.state().parent.upgrade().map(|inner| Node { inner })
    }

    /// Topmost ancestor (the node itself when detached).
    #[must_use]
    pub fn root(&self) -> Node {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Number of ancestors.
    #[must_use]
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self.parent();
        while let Some(node) = current {
            depth += 1;
            current = node.parent();
        }
        depth
    }

    /// The node's change stream. Emits the full value once per completed
    /// mutation reaching this node.
    #[must_use]
    pub fn changes(&self) -> ChangeChannel<Value> {
        self.state().channel.clone()
    }

    /// Shorthand for `changes().subscribe(callback)`.
    #[must_use = "dropping the subscription immediately unsubscribes"]
    pub fn subscribe(&self, callback: impl Fn(&Value) + 'static) -> Subscription {
        self.changes().subscribe(callback)
    }

    /// Whether both handles refer to the same node.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Children that take part in aggregation, in order. Excluded group
    /// members are skipped; leaves have none.
    #[must_use]
    pub fn included_children(&self) -> Vec<(ChildKey, Node)> {
        match &self.state().children {
            Children::Leaf => Vec::new(),
            Children::Group(group) => group
                .entries
                .iter()
                .filter(|(name, _)| group.is_included(name))
                .map(|(name, child)| (ChildKey::Name(name.clone()), child.clone()))
                .collect(),
            Children::Array(items) => items
                .iter()
                .enumerate()
                .map(|(index, child)| (ChildKey::Index(index), child.clone()))
                .collect(),
        }
    }

    /// Locate a descendant through nested groups.
    ///
    /// Each segment must name a child (included or not) of the group reached
    /// so far. A missing name or a non-group along the way yields `None`.
    /// An empty path yields the node itself.
    #[must_use]
    pub fn find(&self, path: impl Into<NodePath>) -> Option<Node> {
        let path = path.into();
        let mut current = self.clone();
        for segment in path.segments() {
            let next = current.as_group()?.control(segment)?;
            current = next;
        }
        Some(current)
    }

    // --- Downcasts ---

    #[must_use]
    pub fn as_leaf(&self) -> Option<Leaf> {
        (self.kind() == NodeKind::Leaf).then(|| Leaf::from_node(self.clone()))
    }

    #[must_use]
    pub fn as_group(&self) -> Option<Group> {
        (self.kind() == NodeKind::Group).then(|| Group::from_node(self.clone()))
    }

    #[must_use]
    pub fn as_array(&self) -> Option<Array> {
        (self.kind() == NodeKind::Array).then(|| Array::from_node(self.clone()))
    }

    // --- Propagation ---

    /// Replace (or clear) the back-reference to the enclosing container.
    /// Containers call this on attach and detach; it has no other effect.
    pub fn set_parent(&self, parent: Option<&Node>) {
        self.state_mut().parent = parent.map_or_else(Weak::new, |p| Rc::downgrade(&p.inner));
    }

    /// Re-run the validator, update status, then do the same for every
    /// ancestor up to the root. No short-circuit when nothing changed.
    pub fn update_validity(&self) {
        let parent = self.refresh_own_validity();
        if let Some(parent) = parent {
            parent.update_validity();
        }
    }

    /// Mark this node and all its ancestors touched. Emits nothing.
    pub fn mark_touched(&self) {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            node.state_mut().flags.insert(NodeFlags::TOUCHED);
            current = node.parent();
        }
    }

    /// Re-run only this node's validator. Returns the parent for callers
    /// that continue upward.
    fn refresh_own_validity(&self) -> Option<Node> {
        let validator = self.validator();
        let errors = validator.validate(self);
        let mut state = self.state_mut();
        state.status = Status::from_errors(errors.as_ref());
        state.errors = errors;
        state.parent.upgrade().map(|inner| Node { inner })
    }

    /// Re-aggregate this container's value from its children and finish the
    /// pass. Called on a parent when one of its children changed, and on a
    /// container after a structural mutation.
    pub(crate) fn recompute_value(&self) {
        let value = self.aggregate();
        self.state_mut().value = value;
        self.finish_change();
    }

    /// Common tail of every mutation once the own value is in place.
    pub(crate) fn finish_change(&self) {
        self.update_validity();
        self.state_mut().flags.remove(NodeFlags::PRISTINE);
        tracing::trace!(
            kind = ?self.kind(),
            status = %self.status(),
            depth = self.depth(),
            "node recomputed"
        );
        self.emit();
        self.update_parent();
    }

    fn emit(&self) {
        let (channel, value) = {
            let state = self.state();
            (state.channel.clone(), state.value.clone())
        };
        channel.emit(&value);
    }

    fn update_parent(&self) {
        if let Some(parent) = self.parent() {
            parent.recompute_value();
        }
    }

    /// Kind-specific aggregation. A leaf's value is its own.
    fn aggregate(&self) -> Value {
        let state = self.state();
        match &state.children {
            Children::Leaf => state.value.clone(),
            Children::Group(group) => Value::Map(
                group
                    .entries
                    .iter()
                    .filter(|(name, _)| group.is_included(name))
                    .map(|(name, child)| (name.clone(), child.value()))
                    .collect(),
            ),
            Children::Array(items) => Value::List(items.iter().map(Node::value).collect()),
        }
    }

    // --- Structural helpers for containers ---

    /// Validate that `child` may be attached under `self`, then attach it.
    pub(crate) fn attach(&self, child: &Node) -> Result<(), FormError> {
        let mut current = Some(self.clone());
        while let Some(node) = current {
            if node.ptr_eq(child) {
                tracing::debug!("attach rejected: cycle");
                return Err(FormError::Cycle);
            }
            current = node.parent();
        }
        if child.parent().is_some() {
            tracing::debug!("attach rejected: child already attached");
            return Err(FormError::AlreadyAttached);
        }
        child.set_parent(Some(self));
        Ok(())
    }

    /// Clear `child`'s back-reference if it still points at `self`.
    pub(crate) fn detach(&self, child: &Node) {
        if child.parent().is_some_and(|p| p.ptr_eq(self)) {
            child.set_parent(None);
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(state) => {
                let kind = match state.children {
                    Children::Leaf => NodeKind::Leaf,
                    Children::Group(_) => NodeKind::Group,
                    Children::Array(_) => NodeKind::Array,
                };
                f.debug_struct("Node")
                    .field("kind", &kind)
                    .field("value", &state.value)
                    .field("status", &state.status)
                    .field("errors", &state.errors)
                    .field("flags", &state.flags)
                    .field("validator", &state.validator)
                    .finish()
            }
            Err(_) => f.debug_struct("Node").finish_non_exhaustive(),
        }
    }
}

/// Whether `candidate` is a form-tree handle of any kind.
#[must_use]
pub fn is_node(candidate: &dyn Any) -> bool {
    candidate.is::<Node>()
        || candidate.is::<Leaf>()
        || candidate.is::<Group>()
        || candidate.is::<Array>()
}

macro_rules! node_handle {
    ($ty:ident) => {
        impl $ty {
            pub(crate) fn from_node(node: Node) -> Self {
                Self(node)
            }

            /// The underlying untyped handle.
            #[must_use]
            pub fn node(&self) -> &Node {
                &self.0
            }
        }

        impl std::ops::Deref for $ty {
            type Target = Node;

            fn deref(&self) -> &Node {
                &self.0
            }
        }

        impl From<$ty> for Node {
            fn from(handle: $ty) -> Node {
                handle.0
            }
        }

        impl From<&$ty> for Node {
            fn from(handle: &$ty) -> Node {
                handle.0.clone()
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(&self.0, f)
            }
        }
    };
}

node_handle!(Leaf);
node_handle!(Group);
node_handle!(Array);

impl From<&Node> for Node {
    fn from(node: &Node) -> Node {
        node.clone()
    }
}
