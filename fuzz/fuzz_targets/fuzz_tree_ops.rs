#![no_main]

//! Random structural and value mutations against a small tree.
//!
//! Nodes are created into a pool and then attached, detached, and updated
//! in arbitrary order, including attempts to build cycles and to attach a
//! node twice. `Wrap` builds a new container straight from pool nodes and
//! must fail exactly when one of them already has a parent or is picked
//! twice, leaving every parent link as it was. After every step the tree
//! rooted at each detached pool node must pass `check_tree`.

use arbitrary::Arbitrary;
use formtree_core::{Array, Group, Leaf, Node, Validator, Value};
use formtree_harness::check_tree;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        match s {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Int(i) => Value::Int(i),
            Scalar::Text(t) => Value::Text(t),
        }
    }
}

#[derive(Debug, Arbitrary)]
enum Step {
    NewLeaf { value: Scalar, required: bool },
    NewGroup,
    NewArray,
    Wrap { array: bool, children: Vec<u8> },
    Set { target: u8, value: Scalar },
    AddControl { group: u8, name: u8, child: u8 },
    RemoveControl { group: u8, name: u8 },
    Exclude { group: u8, name: u8 },
    Include { group: u8, name: u8 },
    Push { array: u8, child: u8 },
    Insert { array: u8, index: u8, child: u8 },
    RemoveAt { array: u8, index: u8 },
    Touch { target: u8 },
}

const MAX_POOL: usize = 32;

fn pick(pool: &[Node], i: u8) -> Option<&Node> {
    (!pool.is_empty()).then(|| &pool[usize::from(i) % pool.len()])
}

fn name(i: u8) -> String {
    format!("n{}", i % 8)
}

fuzz_target!(|steps: Vec<Step>| {
    let mut pool: Vec<Node> = Vec::new();

    for step in steps {
        match step {
            Step::NewLeaf { value, required } if pool.len() < MAX_POOL => {
                let validator = if required {
                    Validator::required()
                } else {
                    Validator::always_valid()
                };
                pool.push(Leaf::with_validator(Value::from(value), validator).into());
            }
            Step::NewGroup if pool.len() < MAX_POOL => {
                if let Ok(group) = Group::new::<&str, Node, _>([]) {
                    pool.push(group.into());
                }
            }
            Step::NewArray if pool.len() < MAX_POOL => {
                if let Ok(array) = Array::new::<Node>([]) {
                    pool.push(array.into());
                }
            }
            Step::Wrap { array, children } if pool.len() < MAX_POOL => {
                let picked: Vec<Node> = children
                    .iter()
                    .take(4)
                    .filter_map(|&i| pick(&pool, i).cloned())
                    .collect();
                let parents: Vec<Option<Node>> = picked.iter().map(Node::parent).collect();
                let conflict = picked.iter().enumerate().any(|(i, c)| {
                    c.parent().is_some() || picked[..i].iter().any(|seen| seen.ptr_eq(c))
                });
                let built: Option<Node> = if array {
                    Array::new(picked.iter().cloned()).ok().map(Into::into)
                } else {
                    let named = picked
                        .iter()
                        .enumerate()
                        .map(|(i, c)| (format!("w{i}"), c.clone()));
                    Group::new(named).ok().map(Into::into)
                };
                assert_eq!(built.is_none(), conflict, "construction outcome");
                match built {
                    Some(container) => {
                        for child in &picked {
                            assert!(child.parent().is_some_and(|p| p.ptr_eq(&container)));
                        }
                        pool.push(container);
                    }
                    None => {
                        for (child, before) in picked.iter().zip(&parents) {
                            let now = child.parent();
                            match (before, &now) {
                                (None, None) => {}
                                (Some(b), Some(n)) => assert!(b.ptr_eq(n)),
                                _ => panic!("rejected construction moved a child"),
                            }
                        }
                    }
                }
            }
            Step::Set { target, value } => {
                if let Some(leaf) = pick(&pool, target).and_then(Node::as_leaf) {
                    leaf.update_value(Value::from(value));
                }
            }
            Step::AddControl { group, name: n, child } => {
                let target = pick(&pool, group).and_then(Node::as_group);
                if let (Some(g), Some(c)) = (target, pick(&pool, child)) {
                    let _ = g.add_control(name(n), c);
                }
            }
            Step::RemoveControl { group, name: n } => {
                if let Some(g) = pick(&pool, group).and_then(Node::as_group) {
                    let _ = g.remove_control(&name(n));
                }
            }
            Step::Exclude { group, name: n } => {
                if let Some(g) = pick(&pool, group).and_then(Node::as_group) {
                    g.exclude(name(n));
                }
            }
            Step::Include { group, name: n } => {
                if let Some(g) = pick(&pool, group).and_then(Node::as_group) {
                    g.include(name(n));
                }
            }
            Step::Push { array, child } => {
                let target = pick(&pool, array).and_then(Node::as_array);
                if let (Some(a), Some(c)) = (target, pick(&pool, child)) {
                    let _ = a.push(c);
                }
            }
            Step::Insert { array, index, child } => {
                let target = pick(&pool, array).and_then(Node::as_array);
                if let (Some(a), Some(c)) = (target, pick(&pool, child)) {
                    let _ = a.insert(usize::from(index), c);
                }
            }
            Step::RemoveAt { array, index } => {
                if let Some(a) = pick(&pool, array).and_then(Node::as_array) {
                    let _ = a.remove_at(usize::from(index));
                }
            }
            Step::Touch { target } => {
                if let Some(node) = pick(&pool, target) {
                    node.mark_touched();
                }
            }
            _ => {}
        }

        for node in pool.iter().filter(|n| n.parent().is_none()) {
            if let Err(violations) = check_tree(node) {
                panic!("invariants violated: {violations:?}");
            }
        }
    }
});
