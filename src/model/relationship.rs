//! Child relationships: how a container reaches one specific child.
//!
//! A relationship is immutable once created; the edge between a parent and
//! its child is a fact about the value graph, not something a traversal may
//! rewrite. Path fragments rendered here compose into the path-string
//! micro-format: `root['key'][3].field`.

use serde::{Deserialize, Serialize};

use super::{LevelId, PathMode};
use crate::digest::Digest;
use crate::value::{Scalar, Value, ValueGraph, ValueId};

/// Marker substituted for unrepresentable fragments outside strict mode.
pub const UNREPRESENTABLE: &str = "(unrepresentable)";

/// How a parent reaches this child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelParam {
    /// Mapping key; a full value in its own right.
    Key(ValueId),
    /// Index into a subscriptable sequence.
    Index(usize),
    /// Position in a non-subscriptable sequence: known, but unusable for
    /// re-fetching the element.
    Position(usize),
    /// Attribute / field name of a record.
    Attr(String),
    /// Set membership; there is no addressable param at all.
    Member,
}

/// The independently computed hash of a relationship's param.
///
/// Mapping keys get a full nested hash tree of their own; synthesized scalar
/// params (indices, attribute names) are digested directly; set members have
/// nothing to digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamHash {
    /// No param, no hash (set members).
    None,
    /// Digest of a synthesized scalar param.
    Inline(Digest),
    /// Root of a nested hash tree over a mapping key.
    Tree(LevelId),
}

/// Describes one parent-to-child edge in the value graph.
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRelationship {
    parent: ValueId,
    child: ValueId,
    param: RelParam,
    param_hash: ParamHash,
}

impl ChildRelationship {
    /// Create a relationship. The param hash starts empty and is attached by
    /// the engine once computed.
    pub fn new(parent: ValueId, child: ValueId, param: RelParam) -> Self {
        Self {
            parent,
            child,
            param,
            param_hash: ParamHash::None,
        }
    }

    /// The container side of the edge.
    pub fn parent(&self) -> ValueId {
        self.parent
    }

    /// The contained side of the edge.
    pub fn child(&self) -> ValueId {
        self.child
    }

    /// How the parent reaches the child.
    pub fn param(&self) -> &RelParam {
        &self.param
    }

    /// The param's independently computed hash.
    pub fn param_hash(&self) -> &ParamHash {
        &self.param_hash
    }

    pub(crate) fn set_param_hash(&mut self, param_hash: ParamHash) {
        self.param_hash = param_hash;
    }

    /// Render this edge as a path fragment, or `None` if the param has no
    /// representation in the requested mode.
    pub fn fragment(&self, graph: &ValueGraph, mode: PathMode) -> Option<String> {
        match &self.param {
            RelParam::Key(key) => match graph.get(*key) {
                Value::Scalar(Scalar::Str(s)) => Some(format!("['{}']", escape_quotes(s))),
                Value::Scalar(Scalar::Int(i)) => Some(format!("[{i}]")),
                // Finite floats round-trip through their shortest display
                // form; NaN and infinities have no literal.
                Value::Scalar(Scalar::Float(f)) if f.is_finite() => Some(format!("[{f}]")),
                _ => match mode {
                    PathMode::Strict => None,
                    PathMode::Readable | PathMode::Relaxed => {
                        Some(format!("[{UNREPRESENTABLE}]"))
                    }
                },
            },
            RelParam::Index(i) => Some(format!("[{i}]")),
            RelParam::Position(i) => match mode {
                PathMode::Strict => None,
                PathMode::Readable => Some(format!("[{UNREPRESENTABLE}]")),
                PathMode::Relaxed => Some(format!("[{i}]")),
            },
            RelParam::Attr(name) => Some(format!(".{name}")),
            RelParam::Member => match mode {
                PathMode::Strict => None,
                PathMode::Readable | PathMode::Relaxed => Some(format!("[{UNREPRESENTABLE}]")),
            },
        }
    }

    /// Re-project this edge onto another value: fetch the child reached by
    /// the same param from `other`. Used to apply one tree's path to a
    /// different object. `None` when the param is not addressable or
    /// `other` has the wrong shape.
    pub fn fetch(&self, graph: &ValueGraph, other: ValueId) -> Option<ValueId> {
        match (&self.param, graph.get(other)) {
            (RelParam::Key(key), Value::Map(entries)) => entries
                .iter()
                .find(|(k, _)| graph.canonical_cmp(*k, *key) == std::cmp::Ordering::Equal)
                .map(|(_, v)| *v),
            (RelParam::Index(i), Value::List(items)) => items.get(*i).copied(),
            (RelParam::Attr(name), Value::Record { fields, .. }) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| *v),
            _ => None,
        }
    }
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('\'', "\\'")
}
