//! The generic tree node shared by all consumers of the comparison model.
//!
//! A [`Level`] binds one point of a traversal to the payload value(s) it is
//! looking at. Hashing uses a single payload slot; a future two-tree diff
//! walks two trees in lockstep and uses two. The node itself knows nothing
//! about hashing; that lives in [`super::hash_level`].

use std::collections::BTreeMap;

use super::relationship::ChildRelationship;
use super::LevelId;
use crate::value::ValueId;

/// One node of a comparison chain.
///
/// `up`/`down` links are arena indices, maintained exclusively through
/// [`super::hash_level::HashTree::link`] so the bidirectional invariant
/// (`down.up == self` whenever both are set) can never be broken piecewise.
#[derive(Debug, Clone)]
pub struct Level {
    /// Payload slots; one per object tree this node tracks.
    payloads: Vec<ValueId>,
    /// Incoming relationship per payload slot: how the parent's payload
    /// reaches this node's payload. Empty on roots.
    rels: Vec<Option<ChildRelationship>>,
    up: Option<LevelId>,
    down: Option<LevelId>,
    /// Open-ended metadata attached to this node.
    additional: BTreeMap<String, String>,
    /// Display name override for roots of nested param trees.
    root_label: Option<String>,
}

impl Level {
    /// Create an unlinked node over the given payloads.
    pub fn new(payloads: Vec<ValueId>) -> Self {
        let slots = payloads.len();
        Self {
            payloads,
            rels: vec![None; slots],
            up: None,
            down: None,
            additional: BTreeMap::new(),
            root_label: None,
        }
    }

    /// The payload in slot 0. Hash trees always have exactly one payload,
    /// so this is the node's value.
    pub fn obj(&self) -> ValueId {
        self.payloads[0]
    }

    /// Payload in an arbitrary slot.
    pub fn payload(&self, slot: usize) -> Option<ValueId> {
        self.payloads.get(slot).copied()
    }

    /// Number of payload slots.
    pub fn slots(&self) -> usize {
        self.payloads.len()
    }

    /// The incoming relationship of slot 0, if this node is not a root.
    pub fn rel(&self) -> Option<&ChildRelationship> {
        self.rels.first().and_then(|r| r.as_ref())
    }

    pub(crate) fn rel_mut(&mut self) -> Option<&mut ChildRelationship> {
        self.rels.first_mut().and_then(|r| r.as_mut())
    }

    pub(crate) fn set_rel(&mut self, slot: usize, rel: ChildRelationship) {
        self.rels[slot] = Some(rel);
    }

    /// Link to the node one level up, if any.
    pub fn up(&self) -> Option<LevelId> {
        self.up
    }

    /// Link to the next node of the primary chain, if any.
    pub fn down(&self) -> Option<LevelId> {
        self.down
    }

    pub(crate) fn set_up(&mut self, up: Option<LevelId>) {
        self.up = up;
    }

    pub(crate) fn set_down(&mut self, down: Option<LevelId>) {
        self.down = down;
    }

    /// Metadata bag.
    pub fn additional(&self) -> &BTreeMap<String, String> {
        &self.additional
    }

    pub(crate) fn additional_mut(&mut self) -> &mut BTreeMap<String, String> {
        &mut self.additional
    }

    /// Root display name override (set on nested param-tree roots).
    pub fn root_label(&self) -> Option<&str> {
        self.root_label.as_deref()
    }

    pub(crate) fn set_root_label(&mut self, label: String) {
        self.root_label = Some(label);
    }

    /// A copy of this single node with all links severed: payloads and
    /// relationships are shared facts and travel along, chain wiring does
    /// not.
    pub(crate) fn copy_shell(&self) -> Self {
        Self {
            payloads: self.payloads.clone(),
            rels: self.rels.clone(),
            up: None,
            down: None,
            additional: self.additional.clone(),
            root_label: self.root_label.clone(),
        }
    }
}
