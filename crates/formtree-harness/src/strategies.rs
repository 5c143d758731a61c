#![forbid(unsafe_code)]

//! `proptest` generators.
//!
//! Mutation scripts are expressed as [`Op`]s against a fixed-shape tree
//! (see [`Playground`]) so that every generated step is meaningful.

use formtree_core::{Array, FormError, Group, Leaf, Validator, Value};
use proptest::prelude::*;

/// Scalar values, `Null` included.
pub fn scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        2 => Just(Value::Null),
        1 => any::<bool>().prop_map(Value::Bool),
        1 => (-1000i64..1000).prop_map(Value::Int),
        1 => "[a-z]{0,6}".prop_map(Value::Text),
    ]
}

/// One step of a mutation script.
#[derive(Debug, Clone)]
pub enum Op {
    /// Set one of the playground leaves.
    Set { leaf: usize, value: Value },
    Exclude(usize),
    Include(usize),
    Push(Value),
    /// Remove at `index % (len + 1)`, so some removals are out of range.
    RemoveAt(usize),
    /// Insert at `index % (len + 2)`, so some inserts are out of range.
    Insert { index: usize, value: Value },
    Touch(usize),
}

pub fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..Playground::FIELDS, scalar()).prop_map(|(leaf, value)| Op::Set { leaf, value }),
        1 => (0..Playground::FIELDS).prop_map(Op::Exclude),
        1 => (0..Playground::FIELDS).prop_map(Op::Include),
        2 => scalar().prop_map(Op::Push),
        1 => any::<usize>().prop_map(Op::RemoveAt),
        1 => (any::<usize>(), scalar()).prop_map(|(index, value)| Op::Insert { index, value }),
        1 => (0..Playground::FIELDS).prop_map(Op::Touch),
    ]
}

pub fn script(max_len: usize) -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(op(), 0..max_len)
}

/// A root group with required fields in a nested group plus a list.
///
/// ```text
/// root
/// ├── fields (group)  f0..f{FIELDS-1}, every name optional
/// └── list (array)    required leaves
/// ```
pub struct Playground {
    pub root: Group,
    pub fields: Group,
    pub leaves: Vec<Leaf>,
    pub list: Array,
}

impl Playground {
    pub const FIELDS: usize = 4;

    pub fn new() -> Result<Self, FormError> {
        let leaves: Vec<Leaf> = (0..Self::FIELDS)
            .map(|i| Leaf::with_validator(i as i64, Validator::required()))
            .collect();
        let fields = (0..Self::FIELDS)
            .fold(Group::builder(), |b, i| {
                b.control(Self::field_name(i), &leaves[i])
                    .optional(Self::field_name(i), true)
            })
            .build()?;
        let list = Array::new::<Leaf>([])?;
        let root = Group::new([("fields", fields.node()), ("list", list.node())])?;
        Ok(Self {
            root,
            fields,
            leaves,
            list,
        })
    }

    #[must_use]
    pub fn field_name(i: usize) -> String {
        format!("f{i}")
    }

    /// Apply one step. Out-of-range array operations are expected to fail
    /// without touching the tree; the result reports whether the step
    /// mutated anything.
    pub fn apply(&self, op: &Op) -> bool {
        match op {
            Op::Set { leaf, value } => {
                self.leaves[*leaf].update_value(value.clone());
                true
            }
            Op::Exclude(i) => {
                self.fields.exclude(Self::field_name(*i));
                true
            }
            Op::Include(i) => {
                self.fields.include(Self::field_name(*i));
                true
            }
            Op::Push(value) => self
                .list
                .push(Leaf::with_validator(value.clone(), Validator::required()))
                .is_ok(),
            Op::RemoveAt(index) => self.list.remove_at(index % (self.list.len() + 1)).is_ok(),
            Op::Insert { index, value } => self
                .list
                .insert(
                    index % (self.list.len() + 2),
                    Leaf::with_validator(value.clone(), Validator::required()),
                )
                .is_ok(),
            Op::Touch(i) => {
                self.leaves[*i].mark_touched();
                false
            }
        }
    }
}
