//! Value graph: the boundary type for everything this crate can fingerprint.
//!
//! Rust has no runtime reflection, so "an arbitrary nested value" is modeled
//! as a closed tagged-variant graph. Values live in an append-only arena
//! ([`ValueGraph`]) and reference each other by [`ValueId`], which makes
//! cyclic and shared structures expressible without ownership gymnastics:
//! a container may reference any node, including one of its own ancestors.
//!
//! ## Determinism Guarantees
//!
//! - `ValueId`s are assigned in insertion order and never move.
//! - [`ValueGraph::canonical_cmp`] is a total, content-based ordering that is
//!   stable across processes and terminates on cyclic values. It is what the
//!   traversal uses to canonicalize unordered containers.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Error type for graph construction.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    /// A mutator was applied to a value of the wrong kind.
    #[error("value {id} is a {found}, expected a {expected}")]
    KindMismatch {
        /// The value the mutator was applied to.
        id: ValueId,
        /// The container kind the mutator requires.
        expected: &'static str,
        /// The actual kind of the value.
        found: &'static str,
    },
}

/// Identity of a value inside a [`ValueGraph`].
///
/// Object identity for cycle detection and for the flat view is exactly this
/// index; two structurally equal values at different ids are different
/// objects.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ValueId(u32);

impl ValueId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    /// Position of this value in its arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ValueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A leaf value: the only things that carry a hash of their own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// Text.
    Str(String),
    /// Integer. Hashed by its literal decimal text, never rounded.
    Int(i64),
    /// Floating point. Subject to `significant_digits` normalization.
    Float(f64),
}

impl Scalar {
    /// Stable type tag, used as the aggregate-hash prefix and for
    /// `exclude_types` matching.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Scalar::Str(_) => "str",
            Scalar::Int(_) => "int",
            Scalar::Float(_) => "float",
        }
    }
}

/// One node of a value graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// A leaf.
    Scalar(Scalar),
    /// Associative mapping. Keys are values themselves, so non-scalar keys
    /// participate in hashing like any other value.
    Map(Vec<(ValueId, ValueId)>),
    /// Subscriptable ordered sequence.
    List(Vec<ValueId>),
    /// Ordered sequence whose positions are known but cannot be used to
    /// re-fetch an element (a consumed stream, a generator).
    Iterable(Vec<ValueId>),
    /// Unordered collection without addressable members.
    Set(Vec<ValueId>),
    /// Attribute-bearing record: a named tuple, a struct, an attribute bag.
    Record {
        /// The record's runtime type name; doubles as its type tag.
        type_name: String,
        /// Named fields in declaration order.
        fields: Vec<(String, ValueId)>,
    },
    /// A value no classification applies to. Always reported `Unprocessed`.
    Opaque {
        /// The unclassifiable value's runtime type name.
        type_name: String,
    },
}

impl Value {
    /// Stable type tag for this value.
    pub fn type_tag(&self) -> &str {
        match self {
            Value::Scalar(s) => s.type_tag(),
            Value::Map(_) => "dict",
            Value::List(_) => "list",
            Value::Iterable(_) => "iterable",
            Value::Set(_) => "set",
            Value::Record { type_name, .. } => type_name,
            Value::Opaque { type_name } => type_name,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Scalar(Scalar::Str(_)) => 0,
            Value::Scalar(Scalar::Int(_)) | Value::Scalar(Scalar::Float(_)) => 1,
            Value::Map(_) => 2,
            Value::List(_) => 3,
            Value::Iterable(_) => 4,
            Value::Set(_) => 5,
            Value::Record { .. } => 6,
            Value::Opaque { .. } => 7,
        }
    }
}

/// Append-only arena of values.
///
/// The graph is owned by the caller; the hashing engine only ever borrows it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValueGraph {
    nodes: Vec<Value>,
}

impl ValueGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of values in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph holds no values.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a value by id.
    pub fn get(&self, id: ValueId) -> &Value {
        &self.nodes[id.index()]
    }

    fn push(&mut self, value: Value) -> ValueId {
        let id = ValueId::new(self.nodes.len());
        self.nodes.push(value);
        id
    }

    /// Add a string scalar.
    pub fn str_value(&mut self, s: impl Into<String>) -> ValueId {
        self.push(Value::Scalar(Scalar::Str(s.into())))
    }

    /// Add an integer scalar.
    pub fn int_value(&mut self, i: i64) -> ValueId {
        self.push(Value::Scalar(Scalar::Int(i)))
    }

    /// Add a float scalar.
    pub fn float_value(&mut self, f: f64) -> ValueId {
        self.push(Value::Scalar(Scalar::Float(f)))
    }

    /// Add a subscriptable sequence.
    pub fn list(&mut self, items: Vec<ValueId>) -> ValueId {
        self.push(Value::List(items))
    }

    /// Add a non-subscriptable sequence.
    pub fn iterable(&mut self, items: Vec<ValueId>) -> ValueId {
        self.push(Value::Iterable(items))
    }

    /// Add a mapping from key/value id pairs (insertion order is irrelevant
    /// to the fingerprint; entries are canonicalized at traversal time).
    pub fn map(&mut self, entries: Vec<(ValueId, ValueId)>) -> ValueId {
        self.push(Value::Map(entries))
    }

    /// Add a set.
    pub fn set(&mut self, members: Vec<ValueId>) -> ValueId {
        self.push(Value::Set(members))
    }

    /// Add an attribute-bearing record.
    pub fn record(
        &mut self,
        type_name: impl Into<String>,
        fields: Vec<(String, ValueId)>,
    ) -> ValueId {
        self.push(Value::Record {
            type_name: type_name.into(),
            fields,
        })
    }

    /// Add an unclassifiable value.
    pub fn opaque(&mut self, type_name: impl Into<String>) -> ValueId {
        self.push(Value::Opaque {
            type_name: type_name.into(),
        })
    }

    /// Append an item to an existing sequence. This is how cycles are wired:
    /// create the container first, then push a reference back to it.
    pub fn push_item(&mut self, seq: ValueId, item: ValueId) -> Result<(), GraphError> {
        match &mut self.nodes[seq.index()] {
            Value::List(items) | Value::Iterable(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(GraphError::KindMismatch {
                id: seq,
                expected: "sequence",
                found: kind_name(other),
            }),
        }
    }

    /// Append an entry to an existing mapping.
    pub fn insert_entry(
        &mut self,
        map: ValueId,
        key: ValueId,
        value: ValueId,
    ) -> Result<(), GraphError> {
        match &mut self.nodes[map.index()] {
            Value::Map(entries) => {
                entries.push((key, value));
                Ok(())
            }
            other => Err(GraphError::KindMismatch {
                id: map,
                expected: "dict",
                found: kind_name(other),
            }),
        }
    }

    /// Append a member to an existing set.
    pub fn add_member(&mut self, set: ValueId, member: ValueId) -> Result<(), GraphError> {
        match &mut self.nodes[set.index()] {
            Value::Set(members) => {
                members.push(member);
                Ok(())
            }
            other => Err(GraphError::KindMismatch {
                id: set,
                expected: "set",
                found: kind_name(other),
            }),
        }
    }

    /// Append a named field to an existing record.
    pub fn set_field(
        &mut self,
        record: ValueId,
        name: impl Into<String>,
        value: ValueId,
    ) -> Result<(), GraphError> {
        match &mut self.nodes[record.index()] {
            Value::Record { fields, .. } => {
                fields.push((name.into(), value));
                Ok(())
            }
            other => Err(GraphError::KindMismatch {
                id: record,
                expected: "record",
                found: kind_name(other),
            }),
        }
    }

    /// Total, content-based ordering over values.
    ///
    /// Used to canonicalize unordered containers (map entries by key, set
    /// members) so that insertion order never leaks into the fingerprint.
    /// Terminates on cyclic values: a pair already on the comparison stack
    /// compares equal.
    pub fn canonical_cmp(&self, a: ValueId, b: ValueId) -> Ordering {
        let mut in_progress = BTreeSet::new();
        self.cmp_inner(a, b, &mut in_progress)
    }

    fn cmp_inner(
        &self,
        a: ValueId,
        b: ValueId,
        in_progress: &mut BTreeSet<(ValueId, ValueId)>,
    ) -> Ordering {
        if a == b {
            return Ordering::Equal;
        }
        // Only pairs on the current stack count: a completed comparison must
        // not shadow a later one between the same ids.
        if !in_progress.insert((a, b)) {
            return Ordering::Equal;
        }
        let result = self.cmp_values(a, b, in_progress);
        in_progress.remove(&(a, b));
        result
    }

    fn cmp_values(
        &self,
        a: ValueId,
        b: ValueId,
        seen: &mut BTreeSet<(ValueId, ValueId)>,
    ) -> Ordering {
        let (va, vb) = (self.get(a), self.get(b));
        match va.kind_rank().cmp(&vb.kind_rank()) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
        match (va, vb) {
            (Value::Scalar(Scalar::Str(x)), Value::Scalar(Scalar::Str(y))) => x.cmp(y),
            (Value::Scalar(x), Value::Scalar(y)) => {
                // Numbers compare numerically across int/float, like runtime
                // equality does; total_cmp keeps NaN ordered.
                let xf = scalar_as_f64(x);
                let yf = scalar_as_f64(y);
                xf.total_cmp(&yf)
            }
            (Value::Map(xs), Value::Map(ys)) => {
                let len = xs.len().cmp(&ys.len());
                if len != Ordering::Equal {
                    return len;
                }
                for ((kx, vx), (ky, vy)) in xs.iter().zip(ys.iter()) {
                    match self.cmp_inner(*kx, *ky, seen) {
                        Ordering::Equal => {}
                        unequal => return unequal,
                    }
                    match self.cmp_inner(*vx, *vy, seen) {
                        Ordering::Equal => {}
                        unequal => return unequal,
                    }
                }
                Ordering::Equal
            }
            (Value::List(xs), Value::List(ys))
            | (Value::Iterable(xs), Value::Iterable(ys))
            | (Value::Set(xs), Value::Set(ys)) => self.cmp_slices(xs, ys, seen),
            (
                Value::Record {
                    type_name: nx,
                    fields: fx,
                },
                Value::Record {
                    type_name: ny,
                    fields: fy,
                },
            ) => {
                match nx.cmp(ny) {
                    Ordering::Equal => {}
                    unequal => return unequal,
                }
                let len = fx.len().cmp(&fy.len());
                if len != Ordering::Equal {
                    return len;
                }
                for ((ax, vx), (ay, vy)) in fx.iter().zip(fy.iter()) {
                    match ax.cmp(ay) {
                        Ordering::Equal => {}
                        unequal => return unequal,
                    }
                    match self.cmp_inner(*vx, *vy, seen) {
                        Ordering::Equal => {}
                        unequal => return unequal,
                    }
                }
                Ordering::Equal
            }
            (Value::Opaque { type_name: x }, Value::Opaque { type_name: y }) => x.cmp(y),
            // Ranks were equal, so the variants match; unreachable otherwise.
            _ => Ordering::Equal,
        }
    }

    fn cmp_slices(
        &self,
        xs: &[ValueId],
        ys: &[ValueId],
        seen: &mut BTreeSet<(ValueId, ValueId)>,
    ) -> Ordering {
        let len = xs.len().cmp(&ys.len());
        if len != Ordering::Equal {
            return len;
        }
        for (x, y) in xs.iter().zip(ys.iter()) {
            match self.cmp_inner(*x, *y, seen) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        Ordering::Equal
    }
}

fn scalar_as_f64(scalar: &Scalar) -> f64 {
    match scalar {
        Scalar::Int(i) => *i as f64,
        Scalar::Float(f) => *f,
        // Strings never reach numeric comparison; ranks differ.
        Scalar::Str(_) => 0.0,
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Scalar(_) => "scalar",
        Value::Map(_) => "dict",
        Value::List(_) => "list",
        Value::Iterable(_) => "iterable",
        Value::Set(_) => "set",
        Value::Record { .. } => "record",
        Value::Opaque { .. } => "opaque",
    }
}
