#![forbid(unsafe_code)]

//! Keyed container.
//!
//! Children are addressed by name and kept in insertion order. Any name may
//! carry an optional flag: `false` excludes the child from the group's value
//! and from [`Node::included_children`] (and so from the default validity
//! policy) while the child stays in place.
//!
//! # Failure Modes
//!
//! - Construction with a child that already has a parent, or with the same
//!   node under two names: `AlreadyAttached`.
//! - `add_control` with a node that already has a parent: `AlreadyAttached`.
//! - `add_control` with the group itself or an ancestor: `Cycle`.
//! - `remove_control` of an unknown name: `None`, nothing recomputed.
//! - `include` / `exclude` of an unknown name: the flag is recorded and
//!   applies once a child with that name is added.

use ahash::AHashMap;

use super::{Children, GroupChildren, Node};
use crate::error::FormError;
use crate::validator::Validator;
use crate::value::Value;

/// Keyed container node.
#[derive(Clone)]
pub struct Group(pub(super) Node);

/// Builder for a [`Group`] with heterogeneous children and optional flags.
///
/// ```
/// use formtree_core::{Group, Leaf, Validator, Value};
///
/// let profile = Group::builder()
///     .control("name", Leaf::with_validator("Ada", Validator::required()))
///     .control("nickname", Leaf::new(Value::Null))
///     .optional("nickname", false)
///     .build()?;
///
/// assert!(profile.valid());
/// assert!(!profile.contains("nickname"));
/// assert_eq!(profile.value().get("name"), Some(&Value::from("Ada")));
/// # Ok::<(), formtree_core::FormError>(())
/// ```
#[derive(Default)]
pub struct GroupBuilder {
    entries: Vec<(String, Node)>,
    optional: AHashMap<String, bool>,
    validator: Option<Validator>,
}

impl GroupBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a child. A repeated name replaces the earlier child in place.
    #[must_use]
    pub fn control(mut self, name: impl Into<String>, child: impl Into<Node>) -> Self {
        let name = name.into();
        let child = child.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = child,
            None => self.entries.push((name, child)),
        }
        self
    }

    /// Mark `name` optional, initially included (`true`) or excluded (`false`).
    #[must_use]
    pub fn optional(mut self, name: impl Into<String>, included: bool) -> Self {
        self.optional.insert(name.into(), included);
        self
    }

    /// Replace the default [`Validator::all_children_valid`] policy.
    #[must_use]
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Attach the collected children and compute the initial state.
    ///
    /// Fails with [`FormError::AlreadyAttached`] if a child already has a
    /// parent or was added under two names.
    pub fn build(self) -> Result<Group, FormError> {
        let children = Children::Group(GroupChildren {
            entries: self.entries,
            optional: self.optional,
        });
        let validator = self
            .validator
            .unwrap_or_else(Validator::all_children_valid);
        Node::create(Value::Null, children, validator).map(Group)
    }
}

impl Group {
    /// A group over `controls` with the default validity policy.
    ///
    /// Same failure modes as [`GroupBuilder::build`].
    pub fn new<K, N, I>(controls: I) -> Result<Self, FormError>
    where
        I: IntoIterator<Item = (K, N)>,
        K: Into<String>,
        N: Into<Node>,
    {
        controls
            .into_iter()
            .fold(GroupBuilder::new(), |b, (name, child)| b.control(name, child))
            .build()
    }

    #[must_use]
    pub fn builder() -> GroupBuilder {
        GroupBuilder::new()
    }

    fn with_children<R>(&self, f: impl FnOnce(&GroupChildren) -> R) -> R {
        match &self.0.state().children {
            Children::Group(group) => f(group),
            _ => unreachable!("Group handle over a non-group node"),
        }
    }

    fn with_children_mut<R>(&self, f: impl FnOnce(&mut GroupChildren) -> R) -> R {
        match &mut self.0.state_mut().children {
            Children::Group(group) => f(group),
            _ => unreachable!("Group handle over a non-group node"),
        }
    }

    // --- Queries ---

    /// Child under `name`, whether included or not.
    #[must_use]
    pub fn control(&self, name: &str) -> Option<Node> {
        self.with_children(|g| g.get(name).cloned())
    }

    /// True when `name` is a child and is not excluded.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.with_children(|g| g.get(name).is_some() && g.is_included(name))
    }

    /// Whether `name` carries an optional flag at all.
    #[must_use]
    pub fn is_optional(&self, name: &str) -> bool {
        self.with_children(|g| g.optional.contains_key(name))
    }

    /// Whether `name` would take part in aggregation (ignores presence).
    #[must_use]
    pub fn is_included(&self, name: &str) -> bool {
        self.with_children(|g| g.is_included(name))
    }

    /// Child names in insertion order, excluded ones included.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.with_children(|g| g.entries.iter().map(|(n, _)| n.clone()).collect())
    }

    /// Number of children, excluded ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.with_children(|g| g.entries.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Mutations ---

    /// Insert or replace the child under `name`, then recompute.
    ///
    /// Returns the replaced child, which is detached.
    pub fn add_control(
        &self,
        name: impl Into<String>,
        child: impl Into<Node>,
    ) -> Result<Option<Node>, FormError> {
        let name = name.into();
        let child = child.into();
        let _span = tracing::debug_span!("group_add_control", name = %name).entered();
        self.0.attach(&child)?;

        let replaced = self.with_children_mut(|g| {
            match g.entries.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => Some(std::mem::replace(&mut slot.1, child)),
                None => {
                    g.entries.push((name, child));
                    None
                }
            }
        });
        if let Some(old) = &replaced {
            self.0.detach(old);
        }
        self.0.recompute_value();
        Ok(replaced)
    }

    /// Remove and detach the child under `name`, then recompute.
    pub fn remove_control(&self, name: &str) -> Option<Node> {
        let _span = tracing::debug_span!("group_remove_control", name).entered();
        let removed = self.with_children_mut(|g| {
            let index = g.entries.iter().position(|(n, _)| n == name)?;
            Some(g.entries.remove(index).1)
        })?;
        self.0.detach(&removed);
        self.0.recompute_value();
        Some(removed)
    }

    /// Re-include `name` in aggregation and recompute.
    pub fn include(&self, name: impl Into<String>) {
        self.set_included(name.into(), true);
    }

    /// Exclude `name` from aggregation and recompute. The child stays.
    pub fn exclude(&self, name: impl Into<String>) {
        self.set_included(name.into(), false);
    }

    fn set_included(&self, name: String, included: bool) {
        let _span = tracing::debug_span!("group_set_included", name = %name, included).entered();
        self.with_children_mut(|g| g.optional.insert(name, included));
        self.0.recompute_value();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Leaf;
    use crate::validator::ERROR_CODE_INVALID_CHILDREN;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn map(pairs: &[(&str, Value)]) -> Value {
        pairs.iter().map(|(k, v)| (*k, v.clone())).collect()
    }

    fn scenario_b() -> (Group, Leaf, Leaf) {
        let a = Leaf::new(1);
        let b = Leaf::with_validator(Value::Null, Validator::required());
        let group = Group::new([("a", &a), ("b", &b)]).unwrap();
        (group, a, b)
    }

    #[test]
    fn aggregates_children_and_validity() {
        let (group, _, _) = scenario_b();
        assert!(group.invalid());
        assert_eq!(group.value(), map(&[("a", 1.into()), ("b", Value::Null)]));
    }

    #[test]
    fn exclude_drops_value_and_validity() {
        let (group, _, b) = scenario_b();
        group.exclude("b");

        assert!(group.valid());
        assert_eq!(group.value(), map(&[("a", 1.into())]));
        assert!(group.control("b").is_some());
        assert!(!group.contains("b"));
        assert!(b.invalid(), "excluded child keeps its own status");
    }

    #[test]
    fn include_restores() {
        let (group, _, _) = scenario_b();
        group.exclude("b");
        group.include("b");

        assert!(group.invalid());
        assert!(group.contains("b"));
        assert_eq!(group.value(), map(&[("a", 1.into()), ("b", Value::Null)]));
        assert_eq!(
            group.error(ERROR_CODE_INVALID_CHILDREN),
            Some(Value::List(vec!["b".into()]))
        );
    }

    #[test]
    fn excluded_child_updates_do_not_leak() {
        let (group, _, b) = scenario_b();
        group.exclude("b");
        b.update_value(5);
        assert_eq!(group.value(), map(&[("a", 1.into())]));
    }

    #[test]
    fn toggle_emits_and_dirties() {
        let (group, _, _) = scenario_b();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let s = Rc::clone(&seen);
        let _sub = group.subscribe(move |v| s.borrow_mut().push(v.clone()));

        group.exclude("b");
        assert!(group.dirty());
        assert_eq!(*seen.borrow(), vec![map(&[("a", 1.into())])]);
    }

    #[test]
    fn contains_requires_presence() {
        let (group, _, _) = scenario_b();
        assert!(group.contains("a"));
        assert!(!group.contains("zzz"));
        group.include("zzz");
        assert!(!group.contains("zzz"));
        assert!(group.is_optional("zzz"));
    }

    #[test]
    fn flag_applies_to_later_child() {
        let group = Group::new([("a", Leaf::new(1))]).unwrap();
        group.exclude("late");
        group.add_control("late", Leaf::new(2)).unwrap();
        assert_eq!(group.value(), map(&[("a", 1.into())]));
        assert_eq!(group.names(), vec!["a".to_string(), "late".to_string()]);
    }

    #[test]
    fn add_control_attaches_and_recomputes() {
        let group = Group::new([("a", Leaf::new(1))]).unwrap();
        let extra = Leaf::with_validator(Value::Null, Validator::required());

        let replaced = group.add_control("extra", &extra).unwrap();
        assert!(replaced.is_none());
        assert!(extra.parent().unwrap().ptr_eq(&group));
        assert!(group.invalid());
        assert!(group.dirty());

        extra.update_value("x");
        assert!(group.valid());
        assert_eq!(group.value().get("extra"), Some(&Value::from("x")));
    }

    #[test]
    fn add_control_replaces_in_place() {
        let first = Leaf::new(1);
        let group = Group::new([("a", &first), ("b", &Leaf::new(2))]).unwrap();
        let second = Leaf::new(10);

        let replaced = group.add_control("a", &second).unwrap().unwrap();
        assert!(replaced.ptr_eq(&first));
        assert!(first.parent().is_none());
        assert_eq!(group.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(group.value().get("a"), Some(&Value::Int(10)));

        // the detached child no longer reaches the group
        first.update_value(99);
        assert_eq!(group.value().get("a"), Some(&Value::Int(10)));
    }

    #[test]
    fn add_control_rejects_attached_child() {
        let shared = Leaf::new(1);
        let _owner = Group::new([("a", &shared)]).unwrap();
        let other = Group::new::<&str, Node, _>([]).unwrap();

        assert_eq!(
            other.add_control("a", &shared).unwrap_err(),
            FormError::AlreadyAttached
        );
        assert!(other.is_empty());
        assert!(other.pristine());
    }

    #[test]
    fn add_control_rejects_cycle() {
        let inner = Group::new::<&str, Node, _>([]).unwrap();
        let outer = Group::new([("inner", &inner)]).unwrap();

        assert_eq!(inner.add_control("loop", &outer).unwrap_err(), FormError::Cycle);
        assert_eq!(inner.add_control("self", &inner).unwrap_err(), FormError::Cycle);
        assert!(inner.is_empty());
    }

    #[test]
    fn construction_rejects_attached_child() {
        let shared = Leaf::new(1);
        let first = Group::new([("a", &shared)]).unwrap();

        assert_eq!(
            Group::new([("a", &shared)]).unwrap_err(),
            FormError::AlreadyAttached
        );
        assert!(shared.parent().unwrap().ptr_eq(&first));

        shared.update_value(2);
        assert_eq!(first.value(), map(&[("a", 2.into())]));
    }

    #[test]
    fn construction_rejects_same_node_under_two_names() {
        let leaf = Leaf::new(1);
        let err = Group::builder()
            .control("a", &leaf)
            .control("b", &leaf)
            .build()
            .unwrap_err();

        assert_eq!(err, FormError::AlreadyAttached);
        assert!(leaf.parent().is_none());
    }

    #[test]
    fn remove_control_detaches() {
        let (group, _, b) = scenario_b();
        let removed = group.remove_control("b").unwrap();

        assert!(removed.ptr_eq(&b));
        assert!(b.parent().is_none());
        assert!(group.valid());
        assert_eq!(group.value(), map(&[("a", 1.into())]));

        // re-attachable elsewhere
        let other = Group::new::<&str, Node, _>([]).unwrap();
        other.add_control("b", &b).unwrap();
        assert!(other.invalid());
    }

    #[test]
    fn remove_unknown_is_noop() {
        let (group, _, _) = scenario_b();
        assert!(group.remove_control("nope").is_none());
        assert!(group.pristine());
        assert_eq!(group.changes().emission_count(), 0);
    }

    #[test]
    fn builder_duplicate_name_replaces() {
        let group = Group::builder()
            .control("a", Leaf::new(1))
            .control("b", Leaf::new(2))
            .control("a", Leaf::new(3))
            .build()
            .unwrap();
        assert_eq!(group.names(), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(group.value().get("a"), Some(&Value::Int(3)));
    }

    #[test]
    fn custom_validator_sees_group() {
        let group = Group::builder()
            .control("password", Leaf::new("x"))
            .control("confirm", Leaf::new("y"))
            .validator(Validator::new(|node| {
                let value = node.value();
                (value.get("password") != value.get("confirm"))
                    .then(|| [("mismatch".to_string(), Value::Bool(true))].into())
            }))
            .build()
            .unwrap();
        assert!(group.has_error("mismatch"));

        let confirm = group.control("confirm").and_then(|n| n.as_leaf()).unwrap();
        confirm.update_value("x");
        assert!(group.valid());
    }

    #[test]
    fn empty_group_is_valid_empty_map() {
        let group = Group::new::<&str, Node, _>([]).unwrap();
        assert!(group.valid());
        assert_eq!(group.value(), Value::Map(Default::default()));
    }
}
