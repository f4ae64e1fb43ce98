//! Value classification: the single place that decides what kind of thing a
//! value is and how to enumerate its children.
//!
//! Classification precedence is an invariant: scalars are checked first so a
//! leaf can never be mistaken for an iterable, then mapping, then
//! subscriptable sequences, then sets, then generic iterables, then the
//! record fallback. The match below is written in exactly that order;
//! reordering its arms changes leaf/container precedence and is a bug.

use crate::model::relationship::RelParam;
use crate::value::{Scalar, Value, ValueGraph, ValueId};

/// Container kind reported by classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// Associative mapping.
    Mapping,
    /// Ordered sequence; `subscriptable` tells whether positions can be used
    /// to re-fetch elements.
    Sequence {
        /// Whether indexing is available.
        subscriptable: bool,
    },
    /// Unordered collection without addressable members.
    Set,
    /// Attribute-bearing record.
    Record,
}

/// The outcome of classifying a value.
#[derive(Debug)]
pub enum Class<'g> {
    /// A leaf.
    Scalar(&'g Scalar),
    /// A container together with its enumerated `(param, child)` edges.
    Container {
        /// What kind of container this is.
        kind: ContainerKind,
        /// Parent-to-child edges, canonically ordered where the container
        /// itself is unordered.
        children: Vec<(RelParam, ValueId)>,
    },
    /// No known variant applies; the node must be reported `Unprocessed`,
    /// never raised as an error.
    Opaque,
}

/// Classify a value and, for containers, enumerate its children.
///
/// Unordered containers come back canonicalized: map entries are sorted by
/// key and set members by member (via [`ValueGraph::canonical_cmp`]), record
/// fields by field name. Sequences keep their stored order.
pub fn classify(graph: &ValueGraph, id: ValueId) -> Class<'_> {
    match graph.get(id) {
        // 1. Scalars short-circuit before any container protocol.
        Value::Scalar(s) => Class::Scalar(s),

        // 2. Mapping.
        Value::Map(entries) => {
            let mut entries: Vec<_> = entries.clone();
            entries.sort_by(|(ka, _), (kb, _)| graph.canonical_cmp(*ka, *kb));
            Class::Container {
                kind: ContainerKind::Mapping,
                children: entries
                    .into_iter()
                    .map(|(k, v)| (RelParam::Key(k), v))
                    .collect(),
            }
        }

        // 3. Subscriptable sequence.
        Value::List(items) => Class::Container {
            kind: ContainerKind::Sequence {
                subscriptable: true,
            },
            children: items
                .iter()
                .enumerate()
                .map(|(i, item)| (RelParam::Index(i), *item))
                .collect(),
        },

        // 4. Set.
        Value::Set(members) => {
            let mut members: Vec<_> = members.clone();
            members.sort_by(|a, b| graph.canonical_cmp(*a, *b));
            Class::Container {
                kind: ContainerKind::Set,
                children: members
                    .into_iter()
                    .map(|m| (RelParam::Member, m))
                    .collect(),
            }
        }

        // 5. Generic (non-subscriptable) iterable.
        Value::Iterable(items) => Class::Container {
            kind: ContainerKind::Sequence {
                subscriptable: false,
            },
            children: items
                .iter()
                .enumerate()
                .map(|(i, item)| (RelParam::Position(i), *item))
                .collect(),
        },

        // 6. Record fallback: named fields enumerated as attributes.
        Value::Record { fields, .. } => {
            let mut fields: Vec<_> = fields.clone();
            fields.sort_by(|(a, _), (b, _)| a.cmp(b));
            Class::Container {
                kind: ContainerKind::Record,
                children: fields
                    .into_iter()
                    .map(|(name, v)| (RelParam::Attr(name), v))
                    .collect(),
            }
        }

        // 7. Out of ideas.
        Value::Opaque { .. } => Class::Opaque,
    }
}
