#![forbid(unsafe_code)]

//! Integration tests: end-to-end form scenarios.

use formtree_core::{
    Array, ERROR_CODE_INVALID_CHILDREN, FormError, Group, Leaf, Node, Status, Validator, Value,
};
use formtree_harness::{EmissionLog, assert_tree_consistent, fixtures, to_json};
use serde_json::json;

fn ints(items: &[i64]) -> Value {
    Value::List(items.iter().map(|&n| Value::Int(n)).collect())
}

// ============================================================================
// Leaf
// ============================================================================

#[test]
fn leaf_with_required_value_is_valid() {
    let leaf = Leaf::with_validator(5, Validator::required());
    assert_eq!(leaf.status(), Status::Valid);
    assert_eq!(leaf.errors(), None);
    assert!(leaf.pristine());
}

// ============================================================================
// Group
// ============================================================================

#[test]
fn group_with_missing_required_child_is_invalid() {
    let (group, _, _) = fixtures::pair_with_missing_b().unwrap();
    assert_eq!(group.status(), Status::Invalid);
    assert_eq!(to_json(&group.value()).unwrap(), json!({"a": 1, "b": null}));
    assert_eq!(
        group.error(ERROR_CODE_INVALID_CHILDREN),
        Some(Value::List(vec!["b".into()]))
    );
}

#[test]
fn excluding_invalid_child_makes_group_valid() {
    let (group, _, _) = fixtures::pair_with_missing_b().unwrap();
    let mut log = EmissionLog::new();
    log.watch("group", &group);

    group.exclude("b");

    assert_eq!(group.status(), Status::Valid);
    assert_eq!(to_json(&group.value()).unwrap(), json!({"a": 1}));
    assert!(group.dirty());
    assert_eq!(log.values_for("group"), vec![group.value()]);
    assert_tree_consistent(&group);
}

#[test]
fn filling_required_child_clears_group_errors() {
    let (group, _, b) = fixtures::pair_with_missing_b().unwrap();
    b.update_value("here");
    assert!(group.valid());
    assert_eq!(group.errors(), None);
}

// ============================================================================
// Array
// ============================================================================

#[test]
fn array_push_appends() {
    let array = Array::new([Leaf::new(1), Leaf::new(2)]).unwrap();
    array.push(Leaf::new(3)).unwrap();
    assert_eq!(array.value(), ints(&[1, 2, 3]));
    assert_eq!(array.len(), 3);
    assert_tree_consistent(&array);
}

#[test]
fn array_remove_first() {
    let array = Array::new([Leaf::new(1), Leaf::new(2)]).unwrap();
    let removed = array.remove_at(0).unwrap();
    assert_eq!(array.value(), ints(&[2]));
    assert_eq!(removed.value(), Value::Int(1));
    assert!(removed.parent().is_none());
}

#[test]
fn array_bad_index_is_error() {
    let array = Array::new([Leaf::new(1)]).unwrap();
    assert_eq!(
        array.remove_at(3).unwrap_err(),
        FormError::IndexOutOfRange { index: 3, len: 1 }
    );
    assert_eq!(array.value(), ints(&[1]));
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn find_by_path() {
    let b = Leaf::new("deep");
    let root = Group::new([("a", Group::new([("b", &b)]).unwrap())]).unwrap();

    assert!(root.find("a/b").is_some_and(|n| n.ptr_eq(&b)));
    assert!(root.find("a/x").is_none());
}

#[test]
fn find_in_profile() {
    let tree = fixtures::profile().unwrap();
    let zip = tree.root.find("address/zip").unwrap();
    assert!(zip.ptr_eq(&tree.zip));
    assert!(tree.root.find("tags/0").is_none());
}

// ============================================================================
// Whole form
// ============================================================================

#[test]
fn profile_edit_session() {
    let tree = fixtures::profile().unwrap();
    let mut log = EmissionLog::new();
    log.watch("root", &tree.root).watch("address", &tree.address);
    assert!(tree.root.valid());

    tree.zip.update_value("123");
    assert!(tree.zip.has_error("zip"));
    assert!(tree.address.invalid());
    assert!(tree.root.invalid());
    assert_eq!(
        tree.root.error(ERROR_CODE_INVALID_CHILDREN),
        Some(Value::List(vec!["address".into()]))
    );

    tree.zip.update_value("12345");
    assert!(tree.root.valid());
    assert_eq!(log.labels(), vec!["address", "root", "address", "root"]);

    tree.root.exclude("nickname");
    assert_eq!(
        to_json(&tree.root.value()).unwrap(),
        json!({
            "name": "Ada",
            "tags": ["math", "engines"],
            "address": {"street": "12 Analytical Row", "zip": "12345"}
        })
    );
    assert_tree_consistent(&tree.root);
}

#[test]
fn moving_a_control_between_groups() {
    let tree = fixtures::profile().unwrap();
    let target = Group::new::<&str, Node, _>([]).unwrap();

    assert_eq!(
        target.add_control("street", &tree.street).unwrap_err(),
        FormError::AlreadyAttached
    );

    let street = tree.address.remove_control("street").unwrap();
    target.add_control("street", &street).unwrap();

    assert!(tree.address.control("street").is_none());
    assert!(tree.street.parent().unwrap().ptr_eq(&target));
    assert!(tree.root.find("address/street").is_none());

    tree.street.update_value(Value::Null);
    assert!(target.invalid());
    assert!(tree.root.valid());
    assert_tree_consistent(&tree.root);
    assert_tree_consistent(&target);
}

#[test]
fn touched_is_tracked_separately_from_dirty() {
    let tree = fixtures::profile().unwrap();
    tree.street.mark_touched();
    assert!(tree.address.touched());
    assert!(tree.root.touched());
    assert!(tree.name.untouched());
    assert!(tree.root.pristine());
}
