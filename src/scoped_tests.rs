// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn root_returns_its_own_value() {
    let root = ScopedTreeValue::new(1);
    assert_eq!(root.get_value(), Some(1));
}

#[test]
fn child_inherits_ancestor_value() {
    // A -> B -> C, only C has a value; N (child of A) should see it.
    let c = ScopedTreeValue::new("v");
    let b = c.create_child();
    let a = b.create_child();
    assert_eq!(a.get_value(), Some("v"));
    assert_eq!(b.get_value(), Some("v"));
}

#[test]
fn set_value_shadows_for_subtree_only() {
    let root = ScopedTreeValue::new(1);
    let child = root.create_child();
    let sibling = root.create_child();

    child.set_value(2);

    assert_eq!(child.get_value(), Some(2));
    assert_eq!(sibling.get_value(), Some(1));
    assert_eq!(root.get_value(), Some(1));
}

#[test]
fn ancestor_mutation_after_child_created_is_visible() {
    let root = ScopedTreeValue::new(1);
    let child = root.create_child();
    assert_eq!(child.get_value(), Some(1));

    root.set_value(99);
    assert_eq!(child.get_value(), Some(99));
}

#[test]
fn override_on_child_blocks_later_ancestor_mutation() {
    let root = ScopedTreeValue::new(1);
    let child = root.create_child();
    child.set_value(2);

    root.set_value(99);
    assert_eq!(child.get_value(), Some(2));
}

#[test]
fn empty_root_with_no_override_returns_none() {
    let root = ScopedTreeValue::<i32>::empty();
    let child = root.create_child();
    assert_eq!(child.get_value(), None);
}

#[test]
fn clone_shares_the_same_node() {
    let root = ScopedTreeValue::new(1);
    let handle = root.clone();
    handle.set_value(5);
    assert_eq!(root.get_value(), Some(5));
}
