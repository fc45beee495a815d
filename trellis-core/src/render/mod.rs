//! Render Runtime
//!
//! The node type produced by render procedures ([`VNode`]) and the helpers
//! generated code calls to build it. Diffing and patching are out of scope:
//! a render simply produces a fresh tree, reusing cached static subtrees.

mod helpers;
mod vnode;

pub use helpers::{call_helper, is_helper, loose_equal, loose_index_of, normalize_children};
pub use vnode::{mark_static, stringify_class, VNode};
