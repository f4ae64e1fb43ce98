//! Hash-specialized tree nodes and the arena that owns them.
//!
//! A hash tree is a set of chains: the primary chain runs from the root
//! through each container's first child down to a leaf; every further child
//! of a container hangs off it as a *branch*: an independent chain headed
//! by a shallow copy of the container node with its own `down`. The arena
//! owns every node; `up`/`down`/branch references are plain indices.
//!
//! ## Determinism Guarantees
//!
//! - Node ids are assigned in traversal order and never move.
//! - Memoized digests and paths are write-once per mode; recomputation
//!   cannot observe a different value.

use super::level::Level;
use super::relationship::ChildRelationship;
use super::{LevelId, PathMode, Status};
use crate::digest::Digest;
use crate::value::{ValueGraph, ValueId};

/// A node of a hash tree.
///
/// Extends the generic [`Level`] with leaf/aggregate hash state, a
/// processing status, and sibling branches.
#[derive(Debug, Clone)]
pub struct HashLevel {
    base: Level,
    /// For branch heads: the primary node this branch forked from. The head
    /// represents the same container at the same path.
    origin: Option<LevelId>,
    /// Additional child chains of this container, in child order.
    branches: Vec<LevelId>,
    /// Digest of a scalar payload. Set only on leaves.
    leaf_hash: Option<String>,
    status: Status,
    hash_with_params: Option<Digest>,
    hash_without_params: Option<Digest>,
    repetitions_marked: bool,
    /// Cached rendering per path mode; the outer `Option` is "computed yet",
    /// the inner is "representable".
    paths: [Option<Option<String>>; 3],
}

impl HashLevel {
    fn new(payload: ValueId) -> Self {
        Self {
            base: Level::new(vec![payload]),
            origin: None,
            branches: Vec::new(),
            leaf_hash: None,
            status: Status::Ok,
            hash_with_params: None,
            hash_without_params: None,
            repetitions_marked: false,
            paths: [None, None, None],
        }
    }

    /// The value this node is bound to.
    pub fn obj(&self) -> ValueId {
        self.base.obj()
    }

    /// The generic node underneath.
    pub fn base(&self) -> &Level {
        &self.base
    }

    pub(crate) fn base_mut(&mut self) -> &mut Level {
        &mut self.base
    }

    /// Incoming relationship (how the parent reaches this node's value).
    pub fn rel(&self) -> Option<&ChildRelationship> {
        self.base.rel()
    }

    /// Link to the node one level up, if any. Branch heads have no `up`;
    /// use [`HashTree::go_up`] to escape through their origin.
    pub fn up(&self) -> Option<LevelId> {
        self.base.up()
    }

    /// First child chain of this node, if any.
    pub fn down(&self) -> Option<LevelId> {
        self.base.down()
    }

    /// The primary node a branch head forked from.
    pub fn origin(&self) -> Option<LevelId> {
        self.origin
    }

    /// Sibling branch heads hanging off this node.
    pub fn branches(&self) -> &[LevelId] {
        &self.branches
    }

    /// Processing outcome for this node.
    pub fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    /// Digest of the payload when this node is a scalar leaf.
    pub fn leaf_hash(&self) -> Option<&str> {
        self.leaf_hash.as_deref()
    }

    pub(crate) fn set_leaf_hash(&mut self, leaf: String) {
        self.leaf_hash = Some(leaf);
    }

    pub(crate) fn cached_hash(&self, include_params: bool) -> Option<&Digest> {
        if include_params {
            self.hash_with_params.as_ref()
        } else {
            self.hash_without_params.as_ref()
        }
    }

    pub(crate) fn store_hash(&mut self, include_params: bool, digest: Digest) {
        let slot = if include_params {
            &mut self.hash_with_params
        } else {
            &mut self.hash_without_params
        };
        // Write-once: the first computed value wins.
        if slot.is_none() {
            *slot = Some(digest);
        }
    }

    pub(crate) fn repetitions_marked(&self) -> bool {
        self.repetitions_marked
    }

    pub(crate) fn set_repetitions_marked(&mut self) {
        self.repetitions_marked = true;
    }
}

/// Arena owning every node of one fingerprint computation, including the
/// roots of nested param trees.
#[derive(Debug, Clone, Default)]
pub struct HashTree {
    nodes: Vec<HashLevel>,
}

impl HashTree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the arena is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    pub fn get(&self, id: LevelId) -> &HashLevel {
        &self.nodes[id.index()]
    }

    pub(crate) fn get_mut(&mut self, id: LevelId) -> &mut HashLevel {
        &mut self.nodes[id.index()]
    }

    /// Add an unlinked node over `payload`.
    pub(crate) fn add(&mut self, payload: ValueId) -> LevelId {
        let id = LevelId::new(self.nodes.len());
        self.nodes.push(HashLevel::new(payload));
        id
    }

    /// Link two nodes as one chain step. Both index fields are assigned
    /// here and nowhere else, so `down.up == self` holds by construction.
    pub(crate) fn link(&mut self, up: LevelId, down: LevelId) {
        self.nodes[up.index()].base_mut().set_down(Some(down));
        self.nodes[down.index()].base_mut().set_up(Some(up));
    }

    /// Append a new node after the deepest node of `chain` and record its
    /// incoming relationship.
    pub fn extend_down(
        &mut self,
        chain: LevelId,
        payload: ValueId,
        rel: ChildRelationship,
    ) -> LevelId {
        let deepest = self.all_down(chain);
        let node = self.add(payload);
        self.nodes[node.index()].base_mut().set_rel(0, rel);
        self.link(deepest, node);
        node
    }

    /// Shallow-copy a single node: payload, relationship, metadata, leaf
    /// hash and status travel along; links, branches and memo caches do not.
    pub(crate) fn copy_single_level(&mut self, id: LevelId) -> LevelId {
        let source = &self.nodes[id.index()];
        let copy = HashLevel {
            base: source.base.copy_shell(),
            origin: None,
            branches: Vec::new(),
            leaf_hash: source.leaf_hash.clone(),
            status: source.status,
            hash_with_params: None,
            hash_without_params: None,
            repetitions_marked: false,
            paths: [None, None, None],
        };
        let new_id = LevelId::new(self.nodes.len());
        self.nodes.push(copy);
        new_id
    }

    /// Copy a chain without touching the original: new nodes, shared payload
    /// references. With `include_ancestors` the copy starts at the chain's
    /// root, otherwise at `from`. Returns the copy of `from`.
    pub fn copy_chain(&mut self, from: LevelId, include_ancestors: bool) -> LevelId {
        let start = if include_ancestors {
            self.all_up(from)
        } else {
            from
        };

        let mut cursor = Some(start);
        let mut previous: Option<LevelId> = None;
        let mut copy_of_from = None;
        while let Some(orig) = cursor {
            let copy = self.copy_single_level(orig);
            if let Some(prev) = previous {
                self.link(prev, copy);
            }
            if orig == from {
                copy_of_from = Some(copy);
            }
            previous = Some(copy);
            cursor = self.nodes[orig.index()].down();
        }
        // `from` is on the chain between `start` and the leaf by definition.
        copy_of_from.unwrap_or(start)
    }

    pub(crate) fn fork_branch(&mut self, container: LevelId) -> LevelId {
        let head = self.copy_single_level(container);
        self.nodes[head.index()].set_status(Status::Ok);
        self.nodes[head.index()].origin = Some(container);
        self.nodes[container.index()].branches.push(head);
        head
    }

    /// Every chain head representing a child of `node`: the node itself for
    /// its primary chain, then each branch head in child order.
    pub fn all_branches(&self, node: LevelId) -> Vec<LevelId> {
        let mut heads = Vec::new();
        if self.get(node).down().is_some() {
            heads.push(node);
        }
        heads.extend_from_slice(self.get(node).branches());
        heads
    }

    /// One step towards the root, escaping branch heads through their
    /// origin chain.
    pub fn go_up(&self, id: LevelId) -> Option<LevelId> {
        let node = self.get(id);
        match node.up() {
            Some(up) => Some(up),
            None => node.origin().and_then(|origin| self.go_up(origin)),
        }
    }

    /// The root of the chain `id` belongs to.
    pub fn all_up(&self, id: LevelId) -> LevelId {
        let mut cursor = id;
        while let Some(up) = self.go_up(cursor) {
            cursor = up;
        }
        cursor
    }

    /// The deepest node of the primary chain below `id`.
    pub fn all_down(&self, id: LevelId) -> LevelId {
        let mut cursor = id;
        while let Some(down) = self.get(cursor).down() {
            cursor = down;
        }
        cursor
    }

    /// Render the path from the chain root down to `id`, cached per mode.
    ///
    /// Returns `None` when any fragment along the way has no representation
    /// in the requested mode. Branch heads render at their origin's path:
    /// they stand for the same container.
    pub fn path(
        &mut self,
        graph: &ValueGraph,
        id: LevelId,
        root_name: &str,
        mode: PathMode,
    ) -> Option<String> {
        if let Some(cached) = &self.nodes[id.index()].paths[mode.slot()] {
            return cached.clone();
        }

        let node = &self.nodes[id.index()];
        let result = if let Some(up) = node.up() {
            let fragment = node.rel().and_then(|rel| rel.fragment(graph, mode));
            match (self.path(graph, up, root_name, mode), fragment) {
                (Some(parent), Some(fragment)) => Some(parent + &fragment),
                _ => None,
            }
        } else if let Some(origin) = node.origin() {
            self.path(graph, origin, root_name, mode)
        } else {
            Some(
                node.base()
                    .root_label()
                    .unwrap_or(root_name)
                    .to_string(),
            )
        };

        self.nodes[id.index()].paths[mode.slot()] = Some(result.clone());
        result
    }

    /// Human-oriented rendering of one node for debugging: its payload and
    /// where its chains lead.
    pub fn describe(&self, graph: &ValueGraph, id: LevelId) -> String {
        let node = self.get(id);
        let mut out = format!(
            "<{} {}",
            node.obj(),
            graph.get(node.obj()).type_tag()
        );
        if let Some(down) = node.down() {
            out.push_str(&format!(", down: {}", self.get(down).obj()));
        }
        if !node.branches().is_empty() {
            let targets: Vec<String> = node
                .branches()
                .iter()
                .filter_map(|head| self.get(*head).down())
                .map(|child| self.get(child).obj().to_string())
                .collect();
            out.push_str(&format!("; branching to: {}", targets.join(", ")));
        }
        out.push('>');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::relationship::RelParam;

    fn tree_over(n: usize) -> (ValueGraph, Vec<ValueId>) {
        let mut graph = ValueGraph::new();
        let ids = (0..n as i64).map(|i| graph.int_value(i)).collect();
        (graph, ids)
    }

    #[test]
    fn test_link_sets_both_sides() {
        let (_, vids) = tree_over(2);
        let mut tree = HashTree::new();
        let a = tree.add(vids[0]);
        let b = tree.add(vids[1]);
        tree.link(a, b);
        assert_eq!(tree.get(a).down(), Some(b));
        assert_eq!(tree.get(b).up(), Some(a));
    }

    #[test]
    fn test_extend_down_appends_at_leaf() {
        let (_, vids) = tree_over(3);
        let mut tree = HashTree::new();
        let root = tree.add(vids[0]);
        let mid = tree.extend_down(
            root,
            vids[1],
            ChildRelationship::new(vids[0], vids[1], RelParam::Index(0)),
        );
        // extending from the root again still appends after `mid`
        let leaf = tree.extend_down(
            root,
            vids[2],
            ChildRelationship::new(vids[1], vids[2], RelParam::Index(0)),
        );
        assert_eq!(tree.get(mid).down(), Some(leaf));
        assert_eq!(tree.all_down(root), leaf);
        assert_eq!(tree.all_up(leaf), root);
    }

    #[test]
    fn test_fork_branch_bookkeeping() {
        let (_, vids) = tree_over(3);
        let mut tree = HashTree::new();
        let root = tree.add(vids[0]);
        let _first = tree.extend_down(
            root,
            vids[1],
            ChildRelationship::new(vids[0], vids[1], RelParam::Index(0)),
        );
        let head = tree.fork_branch(root);
        let second = tree.extend_down(
            head,
            vids[2],
            ChildRelationship::new(vids[0], vids[2], RelParam::Index(1)),
        );

        assert_eq!(tree.get(root).branches(), &[head]);
        assert_eq!(tree.get(head).origin(), Some(root));
        assert_eq!(tree.get(head).down(), Some(second));
        // the branch head escapes to the primary chain's parentage
        assert_eq!(tree.go_up(head), None);
        assert_eq!(tree.all_up(second), head);
        assert_eq!(tree.all_branches(root).len(), 2);
    }

    #[test]
    fn test_copy_chain_is_independent() {
        let (_, vids) = tree_over(2);
        let mut tree = HashTree::new();
        let root = tree.add(vids[0]);
        let leaf = tree.extend_down(
            root,
            vids[1],
            ChildRelationship::new(vids[0], vids[1], RelParam::Index(0)),
        );

        let copied_leaf = tree.copy_chain(leaf, true);
        assert_ne!(copied_leaf, leaf);
        assert_eq!(tree.get(copied_leaf).obj(), vids[1]);
        let copied_root = tree.all_up(copied_leaf);
        assert_ne!(copied_root, root);
        // the original chain is untouched
        assert_eq!(tree.get(root).down(), Some(leaf));
    }

    #[test]
    fn test_path_cache_hits_are_stable() {
        let mut graph = ValueGraph::new();
        let item = graph.int_value(5);
        let list = graph.list(vec![item]);

        let mut tree = HashTree::new();
        let root = tree.add(list);
        let leaf = tree.extend_down(
            root,
            item,
            ChildRelationship::new(list, item, RelParam::Index(0)),
        );

        let first = tree.path(&graph, leaf, "root", PathMode::Strict);
        let second = tree.path(&graph, leaf, "root", PathMode::Strict);
        assert_eq!(first.as_deref(), Some("root[0]"));
        assert_eq!(first, second);
    }
}
