#![forbid(unsafe_code)]

//! Test harness for formtree.
//!
//! - [`EmissionLog`]: records emissions from several nodes into one ordered
//!   log, so tests can assert propagation order.
//! - [`check_tree`]: walks a tree and reports every node whose cached state
//!   disagrees with a fresh computation.
//! - [`fixtures`]: small reference trees used across the integration tests.
//! - [`strategies`]: `proptest` generators for values and mutation scripts.
//! - [`to_json`]: render a [`Value`] as `serde_json::Value`.

pub mod fixtures;
pub mod strategies;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use formtree_core::{Node, NodeKind, NodePath, Status, SubscriptionScope, Value};

// ============================================================================
// EmissionLog
// ============================================================================

/// One recorded emission.
#[derive(Debug, Clone, PartialEq)]
pub struct Emission {
    pub label: String,
    pub value: Value,
}

/// Shared, ordered record of emissions from any number of nodes.
///
/// Subscriptions live as long as the log.
#[derive(Default)]
pub struct EmissionLog {
    entries: Rc<RefCell<Vec<Emission>>>,
    scope: SubscriptionScope,
}

impl EmissionLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every emission of `node` under `label`.
    pub fn watch(&mut self, label: impl Into<String>, node: &Node) -> &mut Self {
        let label = label.into();
        let entries = Rc::clone(&self.entries);
        self.scope.subscribe(&node.changes(), move |value: &Value| {
            entries.borrow_mut().push(Emission {
                label: label.clone(),
                value: value.clone(),
            });
        });
        self
    }

    #[must_use]
    pub fn entries(&self) -> Vec<Emission> {
        self.entries.borrow().clone()
    }

    /// Labels in emission order.
    #[must_use]
    pub fn labels(&self) -> Vec<String> {
        self.entries.borrow().iter().map(|e| e.label.clone()).collect()
    }

    /// Values emitted under one label, in order.
    #[must_use]
    pub fn values_for(&self, label: &str) -> Vec<Value> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.label == label)
            .map(|e| e.value.clone())
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget recorded entries; keep watching.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    /// Stop watching everything.
    pub fn unwatch_all(&mut self) {
        self.scope.clear();
    }
}

impl fmt::Debug for EmissionLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmissionLog")
            .field("entries", &self.len())
            .field("watching", &self.scope.len())
            .finish()
    }
}

// ============================================================================
// Tree invariant checker
// ============================================================================

/// What went wrong at one node.
#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    /// `status` and `errors` disagree.
    StatusErrorsMismatch { status: Status, has_errors: bool },
    /// Cached value differs from aggregating the children now.
    StaleValue { cached: Value, fresh: Value },
    /// Cached errors differ from running the validator now.
    StaleErrors,
    /// A child's parent link does not point back at its container.
    BrokenParentLink,
}

/// A failed invariant at the node addressed by `path`.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub path: NodePath,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() {
            "<root>".to_string()
        } else {
            self.path.to_string()
        };
        match &self.kind {
            ViolationKind::StatusErrorsMismatch { status, has_errors } => {
                write!(f, "{at}: status {status} with has_errors={has_errors}")
            }
            ViolationKind::StaleValue { cached, fresh } => {
                write!(f, "{at}: cached value {cached} != fresh {fresh}")
            }
            ViolationKind::StaleErrors => {
                write!(f, "{at}: errors differ from a fresh validator run")
            }
            ViolationKind::BrokenParentLink => {
                write!(f, "{at}: child does not point at its container")
            }
        }
    }
}

/// Check every node under `root`.
///
/// Verified per node: status agrees with errors, the cached value equals a
/// fresh aggregation of the children, the cached errors equal a fresh
/// validator run, and every child (excluded ones too) links back to it.
pub fn check_tree(root: &Node) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    check_node(root, &NodePath::default(), &mut violations);
    if violations.is_empty() {
        Ok(())
    } else {
        tracing::debug!(count = violations.len(), "tree invariants violated");
        Err(violations)
    }
}

fn check_node(node: &Node, path: &NodePath, out: &mut Vec<Violation>) {
    let mut report = |kind| {
        out.push(Violation {
            path: path.clone(),
            kind,
        })
    };

    let status = node.status();
    let errors = node.errors();
    if (status == Status::Invalid) != errors.is_some() {
        report(ViolationKind::StatusErrorsMismatch {
            status,
            has_errors: errors.is_some(),
        });
    }

    if node.validator().validate(node) != errors {
        report(ViolationKind::StaleErrors);
    }

    if let Some(fresh) = fresh_aggregate(node) {
        let cached = node.value();
        if cached != fresh {
            report(ViolationKind::StaleValue { cached, fresh });
        }
    }

    for (key, child) in all_children(node) {
        let child_path = path.join(&key);
        if !child.parent().is_some_and(|p| p.ptr_eq(node)) {
            out.push(Violation {
                path: child_path.clone(),
                kind: ViolationKind::BrokenParentLink,
            });
        }
        check_node(&child, &child_path, out);
    }
}

fn fresh_aggregate(node: &Node) -> Option<Value> {
    let included = node.included_children();
    match node.kind() {
        NodeKind::Leaf => None,
        NodeKind::Group => Some(
            included
                .into_iter()
                .map(|(key, child)| (key.to_string(), child.value()))
                .collect(),
        ),
        NodeKind::Array => Some(Value::List(
            included.into_iter().map(|(_, child)| child.value()).collect(),
        )),
    }
}

fn all_children(node: &Node) -> Vec<(String, Node)> {
    if let Some(group) = node.as_group() {
        group
            .names()
            .into_iter()
            .filter_map(|name| group.control(&name).map(|child| (name, child)))
            .collect()
    } else if let Some(array) = node.as_array() {
        array
            .children()
            .into_iter()
            .enumerate()
            .map(|(i, child)| (i.to_string(), child))
            .collect()
    } else {
        Vec::new()
    }
}

/// Panic with a readable report if [`check_tree`] fails.
#[track_caller]
pub fn assert_tree_consistent(root: &Node) {
    if let Err(violations) = check_tree(root) {
        let report: Vec<String> = violations.iter().map(ToString::to_string).collect();
        panic!("tree invariants violated:\n  {}", report.join("\n  "));
    }
}

/// Every node in the subtree, parents before children.
#[must_use]
pub fn collect_nodes(root: &Node) -> Vec<Node> {
    let mut out = vec![root.clone()];
    for (_, child) in all_children(root) {
        out.extend(collect_nodes(&child));
    }
    out
}

// ============================================================================
// JSON
// ============================================================================

/// Render a value as JSON (untagged: maps become objects, lists arrays).
pub fn to_json(value: &Value) -> serde_json::Result<serde_json::Value> {
    serde_json::to_value(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formtree_core::{Group, Leaf, Validator};
    use std::sync::{Arc, Mutex};
    use tracing::field::{Field, Visit};
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[test]
    fn emission_log_orders_across_nodes() {
        let leaf = Leaf::new(1);
        let group = Group::new([("a", &leaf)]).unwrap();
        let mut log = EmissionLog::new();
        log.watch("group", &group).watch("leaf", &leaf);

        leaf.update_value(2);
        assert_eq!(log.labels(), vec!["leaf", "group"]);
        assert_eq!(log.values_for("leaf"), vec![Value::Int(2)]);

        log.unwatch_all();
        leaf.update_value(3);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn check_tree_accepts_fresh_tree() {
        let tree = fixtures::profile().unwrap();
        assert!(check_tree(&tree.root).is_ok());
        tree.name.update_value("Grace");
        tree.tags.push(Leaf::new("new")).unwrap();
        assert_tree_consistent(&tree.root);
    }

    /// A group whose only leaf starts failing its validator after
    /// construction, without anything recomputing it.
    fn group_with_stale_leaf() -> Group {
        use std::cell::Cell;
        let flag = Rc::new(Cell::new(false));
        let f = Rc::clone(&flag);
        let leaf = Leaf::with_validator(
            1,
            Validator::new(move |_| {
                f.get()
                    .then(|| [("flag".to_string(), Value::Bool(true))].into())
            }),
        );
        let group = Group::new([("a", &leaf)]).unwrap();
        flag.set(true);
        group
    }

    #[test]
    fn check_tree_reports_stale_validity() {
        let group = group_with_stale_leaf();
        let violations = check_tree(&group).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path.to_string(), "a");
        assert_eq!(violations[0].kind, ViolationKind::StaleErrors);
        assert!(violations[0].to_string().starts_with("a: "));
    }

    /// Records the `message` field of every event.
    #[derive(Clone, Default)]
    struct Capture(Arc<Mutex<Vec<String>>>);

    struct MessageVisitor<'a>(&'a mut String);

    impl Visit for MessageVisitor<'_> {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                *self.0 = format!("{value:?}");
            }
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut message = String::new();
            event.record(&mut MessageVisitor(&mut message));
            self.0.lock().unwrap().push(message);
        }
    }

    #[test]
    fn check_tree_logs_violations() {
        let group = group_with_stale_leaf();
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let result = tracing::subscriber::with_default(subscriber, || check_tree(&group));
        assert!(result.is_err());
        let messages = capture.0.lock().unwrap();
        assert!(
            messages.iter().any(|m| m == "tree invariants violated"),
            "{messages:?}"
        );
    }

    #[test]
    fn check_tree_is_silent_on_consistent_tree() {
        let tree = fixtures::profile().unwrap();
        let capture = Capture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());

        let result = tracing::subscriber::with_default(subscriber, || check_tree(&tree.root));
        assert!(result.is_ok());
        let messages = capture.0.lock().unwrap();
        assert!(!messages.iter().any(|m| m == "tree invariants violated"));
    }

    #[test]
    fn collect_nodes_includes_excluded() {
        let tree = fixtures::profile().unwrap();
        tree.root.exclude("nickname");
        // root, name, nickname, tags, 2 tags, address, street, zip
        assert_eq!(collect_nodes(&tree.root).len(), 9);
    }

    #[test]
    fn json_rendering() {
        let group = Group::new([("a", Leaf::new(1)), ("b", Leaf::new(Value::Null))]).unwrap();
        let json = to_json(&group.value()).unwrap();
        assert_eq!(json, serde_json::json!({"a": 1, "b": null}));
    }
}
