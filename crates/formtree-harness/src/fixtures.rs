#![forbid(unsafe_code)]

//! Reference trees.

use formtree_core::{Array, FormError, Group, Leaf, Validator, Value};

/// A small profile form with typed handles to every part.
///
/// ```text
/// root (group)
/// ├── name       required
/// ├── nickname   optional, included
/// ├── tags       array of two leaves
/// └── address    group
///     ├── street required
///     └── zip    must be 5 characters
/// ```
pub struct Profile {
    pub root: Group,
    pub name: Leaf,
    pub nickname: Leaf,
    pub tags: Array,
    pub address: Group,
    pub street: Leaf,
    pub zip: Leaf,
}

pub fn profile() -> Result<Profile, FormError> {
    let name = Leaf::with_validator("Ada", Validator::required());
    let nickname = Leaf::new(Value::Null);
    let tags = Array::new([Leaf::new("math"), Leaf::new("engines")])?;
    let street = Leaf::with_validator("12 Analytical Row", Validator::required());
    let zip = Leaf::with_validator("10001", zip_code());
    let address = Group::new([("street", &street), ("zip", &zip)])?;
    let root = Group::builder()
        .control("name", &name)
        .control("nickname", &nickname)
        .optional("nickname", true)
        .control("tags", &tags)
        .control("address", &address)
        .build()?;
    Ok(Profile {
        root,
        name,
        nickname,
        tags,
        address,
        street,
        zip,
    })
}

/// `{"zip": true}` unless the value is a 5-character string.
#[must_use]
pub fn zip_code() -> Validator {
    Validator::check("zip", |v| v.as_str().is_some_and(|s| s.chars().count() == 5))
}

/// `leaf → middle → root`, all with default validators.
pub struct Chain {
    pub root: Group,
    pub middle: Group,
    pub leaf: Leaf,
}

pub fn chain(initial: impl Into<Value>) -> Result<Chain, FormError> {
    let leaf = Leaf::new(initial);
    let middle = Group::new([("leaf", &leaf)])?;
    let root = Group::new([("middle", &middle)])?;
    Ok(Chain { root, middle, leaf })
}

/// `{a: 1, b: null}` where `b` is required.
pub fn pair_with_missing_b() -> Result<(Group, Leaf, Leaf), FormError> {
    let a = Leaf::new(1);
    let b = Leaf::with_validator(Value::Null, Validator::required());
    let group = Group::new([("a", &a), ("b", &b)])?;
    Ok((group, a, b))
}
