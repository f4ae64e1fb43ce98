//! Persistent ancestor set for cycle detection.
//!
//! Every descent step derives a child set from the parent's set without
//! mutating it, so sibling branches can never observe each other's path.
//! The representation is a shared cons list: deriving is O(1), membership is
//! O(depth), and depth equals the structural depth of the value being hashed.

use std::rc::Rc;

use crate::value::ValueId;

struct Node {
    id: ValueId,
    rest: Option<Rc<Node>>,
}

/// Immutable set of the value identities on the descent path from the root
/// to the current node.
#[derive(Clone)]
pub struct Ancestry {
    head: Option<Rc<Node>>,
}

impl Ancestry {
    /// The set containing only the traversal root.
    pub fn root(id: ValueId) -> Self {
        Self {
            head: Some(Rc::new(Node { id, rest: None })),
        }
    }

    /// Derive the set for a child: this set plus the child's identity.
    /// The receiver is left untouched.
    pub fn with(&self, id: ValueId) -> Self {
        Self {
            head: Some(Rc::new(Node {
                id,
                rest: self.head.clone(),
            })),
        }
    }

    /// Whether `id` is currently being descended through.
    pub fn contains(&self, id: ValueId) -> bool {
        let mut cursor = self.head.as_deref();
        while let Some(node) = cursor {
            if node.id == id {
                return true;
            }
            cursor = node.rest.as_deref();
        }
        false
    }
}
