//! Result views over a finished hash tree.
//!
//! The tree view is the [`crate::DeepHash`] itself: every node is navigable
//! and every sub-hash readable. The flat view defined here is a one-time
//! post-order flattening that records, per distinct value, a human-readable
//! framed text encoding (`dict:{...}`, `list:[...]`), plus the list of
//! values that failed classification.
//!
//! Rendered children are sorted inside every frame. For mappings, records
//! and sets that is what makes the text order-insensitive; for ordered
//! sequences it is a preserved backward-compatibility quirk: the text form
//! of `[2, 1]` equals that of `[1, 2]` even though their tree hashes differ.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::DeepHash;
use crate::model::relationship::{ParamHash, RelParam};
use crate::model::{LevelId, Status};
use crate::value::{Scalar, Value, ValueId};

/// Flat view of a fingerprint: one framed text encoding per distinct value.
///
/// Numeric leaves and excluded values are omitted; unclassifiable values are
/// listed in `unprocessed` instead of `entries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatView {
    /// Value identity → framed text encoding.
    pub entries: BTreeMap<ValueId, String>,
    /// Values that could not be classified, in first-visit order.
    pub unprocessed: Vec<ValueId>,
}

impl FlatView {
    /// The text encoding recorded for a value, if any.
    pub fn get(&self, id: ValueId) -> Option<&str> {
        self.entries.get(&id).map(String::as_str)
    }

    /// Number of recorded entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entries were recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'g> DeepHash<'g> {
    /// Flatten the tree into its text view.
    ///
    /// Visits every node exactly once, including nested param trees, so the
    /// keys of mappings get entries of their own.
    pub fn flat(&mut self) -> FlatView {
        let mut view = FlatView::default();
        self.flatten(self.root(), &mut view);
        view
    }

    fn flatten(&mut self, id: LevelId, view: &mut FlatView) {
        for head in self.tree().all_branches(id) {
            let Some(child) = self.level(head).down() else {
                continue;
            };
            self.flatten(child, view);
            let param_hash = self
                .level(child)
                .rel()
                .map(|rel| rel.param_hash().clone());
            if let Some(ParamHash::Tree(param_root)) = param_hash {
                self.flatten(param_root, view);
            }
        }

        let vid = self.level(id).obj();
        match self.level(id).status() {
            Status::Unprocessed => {
                if !view.unprocessed.contains(&vid) {
                    view.unprocessed.push(vid);
                }
            }
            Status::Skipped => {}
            Status::Ok | Status::Repetition => {
                // Numbers never get flat entries of their own.
                if matches!(
                    self.graph().get(vid),
                    Value::Scalar(Scalar::Int(_)) | Value::Scalar(Scalar::Float(_))
                ) {
                    return;
                }
                let text = self.text_view_hash(id);
                if !text.is_empty() {
                    view.entries.insert(vid, text);
                }
            }
        }
    }

    /// The framed text encoding of the subtree at `id`.
    ///
    /// Scalars render as `tag:leaf`; containers frame their rendered
    /// children, sorted, with mapping-like kinds pairing each child with its
    /// key's text.
    pub fn text_view_hash(&mut self, id: LevelId) -> String {
        match self.level(id).status() {
            Status::Repetition => return String::new(),
            Status::Skipped => return Status::Skipped.to_string(),
            Status::Unprocessed => return Status::Unprocessed.to_string(),
            Status::Ok => {}
        }

        let vid = self.level(id).obj();
        let leaf = self.level(id).leaf_hash().map(str::to_owned);
        match self.graph().get(vid) {
            Value::Scalar(Scalar::Str(_)) => {
                return format!("str:{}", leaf.unwrap_or_default());
            }
            Value::Scalar(Scalar::Int(_)) => {
                return format!("int:{}", leaf.unwrap_or_default());
            }
            Value::Scalar(Scalar::Float(_)) => {
                let tag = if self
                    .level(id)
                    .base()
                    .additional()
                    .get("objtype")
                    .is_some_and(|t| t == "number")
                {
                    "number"
                } else {
                    "float"
                };
                return format!("{tag}:{}", leaf.unwrap_or_default());
            }
            Value::Opaque { .. } => return Status::Unprocessed.to_string(),
            _ => {}
        }

        let (prefix, open, close, want_param, sep) = match self.graph().get(vid) {
            Value::Map(_) => ("dict", "{", "}", true, ";"),
            Value::Record { .. } => ("record", "{", "}", true, ";"),
            Value::List(_) => ("list", "[", "]", false, ","),
            Value::Iterable(_) => ("iterable", "[", "]", false, ","),
            Value::Set(_) => ("set", "{", "}", false, ","),
            // Scalars and opaques returned above.
            _ => return String::new(),
        };

        self.mark_repetitions(id);

        let mut contents = Vec::new();
        for head in self.tree().all_branches(id) {
            if self.config().ignore_repetition()
                && self.level(head).status() == Status::Repetition
            {
                continue;
            }
            let Some(child) = self.level(head).down() else {
                continue;
            };
            if self.level(child).status() == Status::Skipped {
                continue;
            }
            let mut rendered = self.text_view_hash(child);
            if want_param {
                let param = self.param_text(child);
                rendered = format!("{param}:{rendered}");
            }
            contents.push(rendered);
        }
        contents.sort();

        format!("{prefix}:{open}{}{close}", contents.join(sep))
    }

    /// Text encoding of a child's relationship param, for mapping-like
    /// frames.
    fn param_text(&mut self, child: LevelId) -> String {
        let Some(rel) = self.level(child).rel() else {
            return String::new();
        };
        let param = rel.param().clone();
        let param_hash = rel.param_hash().clone();
        match (param, param_hash) {
            (_, ParamHash::Tree(root)) => self.text_view_hash(root),
            (RelParam::Attr(name), _) => {
                let hasher = self.config().hasher.clone();
                format!("str:{}", hasher(name.as_bytes()))
            }
            (RelParam::Index(i) | RelParam::Position(i), _) => format!("int:{i}"),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HashConfig;
    use crate::digest::xxh64_hex;
    use crate::value::ValueGraph;

    #[test]
    fn test_string_entry() {
        let mut g = ValueGraph::new();
        let a = g.str_value("a");
        let mut dh = DeepHash::with_defaults(&g, a);
        let view = dh.flat();
        assert_eq!(view.get(a), Some(format!("str:{}", xxh64_hex(b"a")).as_str()));
    }

    #[test]
    fn test_numbers_have_no_entries() {
        let mut g = ValueGraph::new();
        let ten = g.int_value(10);
        let list = g.list(vec![ten]);
        let mut dh = DeepHash::with_defaults(&g, list);
        let view = dh.flat();
        assert!(view.get(ten).is_none());
        // but the framed list text still contains the number
        assert_eq!(view.get(list), Some("list:[int:10]"));
    }

    #[test]
    fn test_list_text_is_sorted() {
        let mut g = ValueGraph::new();
        let two = g.int_value(2);
        let one = g.int_value(1);
        let list = g.list(vec![two, one]);
        let mut dh = DeepHash::with_defaults(&g, list);
        let view = dh.flat();
        assert_eq!(view.get(list), Some("list:[int:1,int:2]"));
    }

    #[test]
    fn test_dict_pairs_key_text() {
        let mut g = ValueGraph::new();
        let k = g.str_value("a");
        let v = g.int_value(1);
        let map = g.map(vec![(k, v)]);
        let mut dh = DeepHash::with_defaults(&g, map);
        let view = dh.flat();
        let key_text = format!("str:{}", xxh64_hex(b"a"));
        assert_eq!(view.get(map), Some(format!("dict:{{{key_text}:int:1}}").as_str()));
        // the key's own entry comes from its param tree
        assert_eq!(view.get(k), Some(key_text.as_str()));
    }

    #[test]
    fn test_unprocessed_listed() {
        let mut g = ValueGraph::new();
        let mystery = g.opaque("Thread");
        let list = g.list(vec![mystery]);
        let mut dh = DeepHash::with_defaults(&g, list);
        let view = dh.flat();
        assert_eq!(view.unprocessed, vec![mystery]);
        assert!(view.get(mystery).is_none());
    }

    #[test]
    fn test_skipped_omitted() {
        let mut g = ValueGraph::new();
        let ka = g.str_value("a");
        let kb = g.str_value("b");
        let va = g.int_value(1);
        let vb = g.str_value("secret");
        let map = g.map(vec![(ka, va), (kb, vb)]);
        let config = HashConfig::builder()
            .exclude_path("root['b']")
            .build()
            .unwrap();
        let mut dh = DeepHash::new(&g, map, config);
        let view = dh.flat();
        assert!(view.get(vb).is_none());
        // the frame omits the skipped entry too
        let key_text = format!("str:{}", xxh64_hex(b"a"));
        assert_eq!(view.get(map), Some(format!("dict:{{{key_text}:int:1}}").as_str()));
    }

    #[test]
    fn test_repetition_collapsed_in_text() {
        let mut g = ValueGraph::new();
        let one_a = g.int_value(1);
        let one_b = g.int_value(1);
        let two = g.int_value(2);
        let list = g.list(vec![one_a, one_b, two]);
        let mut dh = DeepHash::with_defaults(&g, list);
        let view = dh.flat();
        assert_eq!(view.get(list), Some("list:[int:1,int:2]"));
    }

    #[test]
    fn test_flat_view_serializes() {
        let mut g = ValueGraph::new();
        let a = g.str_value("a");
        let list = g.list(vec![a]);
        let mut dh = DeepHash::with_defaults(&g, list);
        let json = serde_json::to_value(dh.flat()).unwrap();
        assert!(json.get("entries").is_some());
        assert!(json.get("unprocessed").is_some());
    }
}
