//! The fingerprint engine: builds a hash tree over a value and computes
//! canonical digests bottom-up.
//!
//! ## Core Contract
//!
//! 1. Walk the value graph once, producing one [`HashLevel`] per reachable
//!    structural position (cycles are cut, they never recurse)
//! 2. Hash leaves directly; hash containers by concatenating the type tag
//!    with each child's (param hash +) subtree hash and digesting the result
//! 3. Memoize every digest write-once per mode, so any node's sub-hash can
//!    be read at any time at no extra cost
//!
//! ## Determinism Guarantees
//!
//! - Same graph content + same config → identical digests, across processes
//! - Unordered containers are canonicalized before descent, so insertion
//!   order never reaches the hash
//! - Exclusion, cycle and classification outcomes are recorded as node
//!   statuses, never raised; only config construction can fail, and it fails
//!   before any traversal begins

use tracing::{debug, trace};

use crate::ancestry::Ancestry;
use crate::classify::{classify, Class};
use crate::config::HashConfig;
use crate::digest::Digest;
use crate::model::hash_level::{HashLevel, HashTree};
use crate::model::relationship::{ChildRelationship, ParamHash, RelParam};
use crate::model::{LevelId, PathMode, Status};
use crate::value::{Scalar, ValueGraph, ValueId};

/// A computed structural fingerprint: the hash tree plus everything needed
/// to interrogate it.
///
/// Construction builds the whole tree eagerly; digests and path strings are
/// lazy and memoized. The borrowed value graph is never copied.
pub struct DeepHash<'g> {
    graph: &'g ValueGraph,
    config: HashConfig,
    tree: HashTree,
    root: LevelId,
}

impl<'g> DeepHash<'g> {
    /// Fingerprint `root_value` with the given config.
    pub fn new(graph: &'g ValueGraph, root_value: ValueId, config: HashConfig) -> Self {
        let mut tree = HashTree::new();
        let root = tree.add(root_value);
        let mut engine = Self {
            graph,
            config,
            tree,
            root,
        };
        engine.process(root, &Ancestry::root(root_value));
        debug!(nodes = engine.tree.len(), "hash tree built");
        engine
    }

    /// Fingerprint with the default config.
    pub fn with_defaults(graph: &'g ValueGraph, root_value: ValueId) -> Self {
        Self::new(graph, root_value, HashConfig::default())
    }

    /// The tree's root level.
    pub fn root(&self) -> LevelId {
        self.root
    }

    /// The value graph this fingerprint was computed over.
    pub fn graph(&self) -> &'g ValueGraph {
        self.graph
    }

    /// The config in effect.
    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// The raw tree view: every node, navigable via `up`/`down`/branches.
    pub fn tree(&self) -> &HashTree {
        &self.tree
    }

    /// Look up one node of the tree view.
    pub fn level(&self, id: LevelId) -> &HashLevel {
        self.tree.get(id)
    }

    /// The aggregate digest of the whole value.
    pub fn hash(&mut self) -> Digest {
        self.hash_at(self.root, None)
    }

    /// The aggregate digest of the subtree rooted at `id`.
    ///
    /// `include_params` controls whether each child's relationship param
    /// participates; `None` picks the config default (params are excluded
    /// whenever repetition is ignored, since duplicate detection must not
    /// depend on the position a duplicate was reached through).
    pub fn hash_at(&mut self, id: LevelId, include_params: Option<bool>) -> Digest {
        let include = include_params.unwrap_or(!self.config.ignore_repetition());
        if let Some(cached) = self.tree.get(id).cached_hash(include) {
            return cached.clone();
        }
        if self.tree.get(id).status() != Status::Ok {
            self.tree.get_mut(id).store_hash(include, Digest::new());
            return Digest::new();
        }

        let graph = self.graph;
        let mut concat = graph.get(self.tree.get(id).obj()).type_tag().to_string();
        let leaf = self.tree.get(id).leaf_hash().map(str::to_owned);
        if let Some(leaf) = leaf {
            concat.push_str(&leaf);
        } else {
            // Duplicate siblings must be flagged before aggregation so the
            // collapsed hash is the first one ever observed.
            self.mark_repetitions(id);
            for head in self.tree.all_branches(id) {
                if self.config.ignore_repetition()
                    && self.tree.get(head).status() == Status::Repetition
                {
                    continue;
                }
                let Some(child) = self.tree.get(head).down() else {
                    continue;
                };
                if self.tree.get(child).status() == Status::Skipped {
                    continue;
                }
                if include {
                    let param = self.param_digest(child, include);
                    concat.push_str(&param);
                }
                let child_hash = self.hash_at(child, None);
                concat.push_str(&child_hash);
            }
        }

        let hasher = self.config.hasher.clone();
        let digest = hasher(concat.as_bytes());
        self.tree.get_mut(id).store_hash(include, digest.clone());
        digest
    }

    /// Render the path of a node, cached per mode.
    pub fn path(&mut self, id: LevelId, mode: PathMode) -> Option<String> {
        let graph = self.graph;
        let root_name = self.config.root_name().to_string();
        self.tree.path(graph, id, &root_name, mode)
    }

    /// Human-oriented rendering of one node for debugging.
    pub fn describe(&self, id: LevelId) -> String {
        self.tree.describe(self.graph, id)
    }

    /// Whether two fingerprints agree on their root digest.
    pub fn same_fingerprint(&mut self, other: &mut DeepHash<'_>) -> bool {
        self.hash() == other.hash()
    }

    /// Flag duplicate sibling branches of `id`. Only active when repetition
    /// is ignored; idempotent per node.
    ///
    /// Branch heads represent the same container as the node itself, so the
    /// comparison must look at their *children*: two heads are duplicates
    /// exactly when their children hash equal with params excluded. The
    /// later of two equal siblings is the one flagged.
    pub(crate) fn mark_repetitions(&mut self, id: LevelId) {
        if !self.config.ignore_repetition() {
            return;
        }
        if self.tree.get(id).repetitions_marked() {
            return;
        }
        self.tree.get_mut(id).set_repetitions_marked();

        let heads = self.tree.all_branches(id);
        let mut child_digests: Vec<Option<Digest>> = Vec::with_capacity(heads.len());
        for head in &heads {
            let digest = self
                .tree
                .get(*head)
                .down()
                .map(|child| self.hash_at(child, Some(false)));
            child_digests.push(digest);
        }

        for i in 0..heads.len() {
            for j in (i + 1)..heads.len() {
                if self.tree.get(heads[i]).status() == Status::Repetition
                    || self.tree.get(heads[j]).status() == Status::Repetition
                {
                    continue;
                }
                if let (Some(a), Some(b)) = (&child_digests[i], &child_digests[j]) {
                    if a == b {
                        trace!(head = %heads[j], "flagging repeated sibling");
                        self.tree.get_mut(heads[j]).set_status(Status::Repetition);
                    }
                }
            }
        }
    }

    fn process(&mut self, level: LevelId, ancestors: &Ancestry) {
        if self.is_excluded(level) {
            trace!(level = %level, "excluded, skipping");
            self.tree.get_mut(level).set_status(Status::Skipped);
            return;
        }

        let graph = self.graph;
        let vid = self.tree.get(level).obj();
        match classify(graph, vid) {
            Class::Scalar(scalar) => self.hash_scalar(level, scalar),
            Class::Container { children, .. } => {
                for (param, child) in children {
                    self.handle_child(level, child, param, ancestors);
                }
            }
            Class::Opaque => {
                trace!(value = %vid, "unclassifiable value");
                self.tree.get_mut(level).set_status(Status::Unprocessed);
            }
        }
    }

    fn handle_child(
        &mut self,
        container: LevelId,
        child: ValueId,
        param: RelParam,
        ancestors: &Ancestry,
    ) {
        if ancestors.contains(child) {
            // Cycle back-edge: terminate the branch without creating a
            // child node; the back-edge contributes nothing further.
            trace!(value = %child, "cycle back-edge, stopping descent");
            return;
        }
        let child_ancestors = ancestors.with(child);

        let parent = self.tree.get(container).obj();
        let head = if self.tree.get(container).down().is_none() {
            container
        } else {
            self.tree.fork_branch(container)
        };

        let rel = ChildRelationship::new(parent, child, param.clone());
        let child_level = self.tree.extend_down(head, child, rel);

        let param_hash = self.param_hash_for(head, &param);
        if let Some(rel) = self.tree.get_mut(child_level).base_mut().rel_mut() {
            rel.set_param_hash(param_hash);
        }

        self.process(child_level, &child_ancestors);
    }

    /// Hash a relationship param independently of the tree it annotates.
    ///
    /// Mapping keys are arbitrary values and get a full nested computation
    /// (same algorithm, own root, own ancestor set). Synthesized scalar
    /// params are digested directly with the singleton-tree formula, which
    /// yields the exact digest a one-node tree over the same scalar would.
    fn param_hash_for(&mut self, head: LevelId, param: &RelParam) -> ParamHash {
        let hasher = self.config.hasher.clone();
        match param {
            RelParam::Member => ParamHash::None,
            RelParam::Index(i) | RelParam::Position(i) => {
                let concat = format!("int{i}");
                ParamHash::Inline(hasher(concat.as_bytes()))
            }
            RelParam::Attr(name) => {
                let leaf = hasher(name.as_bytes());
                let concat = format!("str{leaf}");
                ParamHash::Inline(hasher(concat.as_bytes()))
            }
            RelParam::Key(key) => {
                let graph = self.graph;
                let root_name = self.config.root_name().to_string();
                let label = self
                    .tree
                    .path(graph, head, &root_name, PathMode::Readable)
                    .unwrap_or(root_name);
                let param_root = self.tree.add(*key);
                self.tree
                    .get_mut(param_root)
                    .base_mut()
                    .set_root_label(label);
                self.process(param_root, &Ancestry::root(*key));
                ParamHash::Tree(param_root)
            }
        }
    }

    pub(crate) fn param_digest(&mut self, child: LevelId, include: bool) -> Digest {
        let param_hash = self
            .tree
            .get(child)
            .rel()
            .map(|rel| rel.param_hash().clone());
        match param_hash {
            Some(ParamHash::Tree(root)) => self.hash_at(root, Some(include)),
            Some(ParamHash::Inline(digest)) => digest,
            _ => Digest::new(),
        }
    }

    fn hash_scalar(&mut self, level: LevelId, scalar: &Scalar) {
        let hasher = self.config.hasher.clone();
        match scalar {
            Scalar::Str(s) => {
                let leaf = hasher(s.as_bytes());
                self.tree.get_mut(level).set_leaf_hash(leaf);
            }
            Scalar::Int(i) => {
                self.tree.get_mut(level).set_leaf_hash(i.to_string());
            }
            Scalar::Float(f) => {
                if let Some(digits) = self.config.significant_digits() {
                    let mut formatted = format!("{:.*}", digits as usize, f);
                    // "-0.00" and friends must compare equal to "0.00".
                    if formatted.chars().all(|c| matches!(c, '-' | '0' | '.')) {
                        formatted = "0.00".to_string();
                    }
                    let node = self.tree.get_mut(level);
                    node.set_leaf_hash(formatted);
                    node.base_mut()
                        .additional_mut()
                        .insert("objtype".to_string(), "number".to_string());
                } else {
                    self.tree.get_mut(level).set_leaf_hash(f.to_string());
                }
            }
        }
    }

    fn is_excluded(&mut self, level: LevelId) -> bool {
        let graph = self.graph;
        let root_name = self.config.root_name().to_string();
        if let Some(path) = self.tree.path(graph, level, &root_name, PathMode::Strict) {
            if self.config.is_path_excluded(&path) {
                return true;
            }
        }
        let tag = graph.get(self.tree.get(level).obj()).type_tag();
        self.config.is_type_excluded(tag)
    }
}
