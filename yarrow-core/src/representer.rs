//! Turns document values back into nodes for serialization.
//!
//! The walk is the constructor's mirror: scalar subtypes re-render their
//! source text from the captured formatting, container comment tables are
//! threaded back onto the key and value nodes, and merge records become
//! `<<` pairs again at their recorded positions. A `ValueId` visited twice
//! maps to one shared node, which the serializer turns into an alias.

use std::collections::HashMap;

use crate::node::{Node, NodeArena, NodeId, NodeKind};
use crate::resolver::{DEFAULT_MAPPING_TAG, DEFAULT_SCALAR_TAG, DEFAULT_SEQUENCE_TAG};
use yarrow_common::{
    BoolScalar, CommentSlots, EntryComments, ItemComments, Marker, NodeAttrs, ScalarStyle,
    StrScalar, Value, ValueId, YamlData, YamlError, YamlResult, YamlVersion,
};

const NULL_TAG: &str = "tag:yaml.org,2002:null";
const BOOL_TAG: &str = "tag:yaml.org,2002:bool";
const INT_TAG: &str = "tag:yaml.org,2002:int";
const FLOAT_TAG: &str = "tag:yaml.org,2002:float";
const TIMESTAMP_TAG: &str = "tag:yaml.org,2002:timestamp";
const MERGE_TAG: &str = "tag:yaml.org,2002:merge";

pub struct Representer<'a> {
    data: &'a YamlData,
    version: YamlVersion,
    /// Layout for containers that never recorded one.
    default_flow: bool,
    arena: NodeArena,
    represented: HashMap<ValueId, NodeId>,
    /// Anchor names that only come out when something references the node.
    suggested: HashMap<NodeId, String>,
}

impl<'a> Representer<'a> {
    #[must_use]
    pub fn new(data: &'a YamlData, version: YamlVersion, default_flow: bool) -> Representer<'a> {
        Representer {
            data,
            version,
            default_flow,
            arena: NodeArena::new(),
            represented: HashMap::new(),
            suggested: HashMap::new(),
        }
    }

    /// Represents the whole document, returning the node arena and root.
    pub fn represent(mut self) -> YamlResult<(NodeArena, NodeId)> {
        let Some(root) = self.data.root() else {
            return Err(YamlError::Serializer(
                "document has no root value".to_string(),
            ));
        };
        let root = self.represent_value(root)?;
        Ok((self.arena, root))
    }

    pub fn represent_value(&mut self, id: ValueId) -> YamlResult<NodeId> {
        if let Some(node) = self.represented.get(&id).copied() {
            if self.arena.get(node).anchor.is_none() {
                if let Some(name) = self.suggested.get(&node) {
                    let name = name.clone();
                    self.arena.get_mut(node).anchor = Some(name);
                }
            }
            return Ok(node);
        }
        let node = match self.data.value(id) {
            Value::Null(s) => self.scalar_node(id, s.text.clone(), ScalarStyle::Plain, NULL_TAG),
            Value::Bool(s) => self.scalar_node(id, bool_text(s), ScalarStyle::Plain, BOOL_TAG),
            Value::Int(s) => {
                self.scalar_node(id, s.render(self.version), ScalarStyle::Plain, INT_TAG)
            }
            Value::Float(s) => self.scalar_node(id, s.render(), ScalarStyle::Plain, FLOAT_TAG),
            Value::Str(s) => self.string_node(id, s),
            Value::Timestamp(s) => {
                self.scalar_node(id, s.text.clone(), ScalarStyle::Plain, TIMESTAMP_TAG)
            }
            Value::Seq(_) => self.represent_seq(id)?,
            Value::Map(_) => self.represent_map(id)?,
        };
        Ok(node)
    }

    fn scalar_node(
        &mut self,
        id: ValueId,
        value: String,
        style: ScalarStyle,
        default_tag: &str,
    ) -> NodeId {
        let attrs = self.data.attrs(id);
        let node = self.arena.push(Node {
            tag: tag_for(attrs, default_tag),
            kind: NodeKind::Scalar { value, style },
            start: Marker::default(),
            end: Marker::default(),
            anchor: None,
            comments: CommentSlots::default(),
        });
        self.file_anchor(node, attrs);
        self.represented.insert(id, node);
        node
    }

    /// Strings carry their style through; folded values get their fold
    /// marks back and block scalars their header comment.
    fn string_node(&mut self, id: ValueId, scalar: &StrScalar) -> NodeId {
        let value = if scalar.style == ScalarStyle::Folded && !scalar.fold_pos.is_empty() {
            fold_marked(&scalar.value, &scalar.fold_pos)
        } else {
            scalar.value.clone()
        };
        let node = self.scalar_node(id, value, scalar.style, DEFAULT_SCALAR_TAG);
        if matches!(scalar.style, ScalarStyle::Literal | ScalarStyle::Folded) {
            self.arena.get_mut(node).comments.eol = scalar.header_comment.clone();
        }
        node
    }

    fn represent_seq(&mut self, id: ValueId) -> YamlResult<NodeId> {
        let attrs = self.data.attrs(id);
        let flow = attrs.flow.unwrap_or(self.default_flow);
        let node = self.arena.push(Node {
            tag: tag_for(attrs, DEFAULT_SEQUENCE_TAG),
            kind: NodeKind::Sequence {
                items: Vec::new(),
                flow,
            },
            start: Marker::default(),
            end: Marker::default(),
            anchor: None,
            comments: CommentSlots::default(),
        });
        self.file_anchor(node, attrs);
        self.represented.insert(id, node);
        self.thread_container(node, attrs);
        let items: &[ValueId] = match self.data.value(id) {
            Value::Seq(seq) => &seq.items,
            _ => &[],
        };
        let mut built = Vec::with_capacity(items.len());
        for (index, item) in items.iter().copied().enumerate() {
            let child = self.represent_value(item)?;
            built.push(child);
            if let Some(comments) = node_table(attrs, index) {
                self.thread_item(child, &comments.value);
            }
        }
        if let NodeKind::Sequence { items, .. } = &mut self.arena.get_mut(node).kind {
            *items = built;
        }
        Ok(node)
    }

    fn represent_map(&mut self, id: ValueId) -> YamlResult<NodeId> {
        let attrs = self.data.attrs(id);
        let flow = attrs.flow.unwrap_or(self.default_flow);
        let node = self.arena.push(Node {
            tag: tag_for(attrs, DEFAULT_MAPPING_TAG),
            kind: NodeKind::Mapping {
                pairs: Vec::new(),
                flow,
            },
            start: Marker::default(),
            end: Marker::default(),
            anchor: None,
            comments: CommentSlots::default(),
        });
        self.file_anchor(node, attrs);
        self.represented.insert(id, node);
        self.thread_container(node, attrs);
        let map = match self.data.value(id) {
            Value::Map(map) => map,
            _ => return Ok(node),
        };
        // merges recorded at the same position were one `<<: [...]` pair
        let mut groups: Vec<(usize, Vec<ValueId>)> = Vec::new();
        for (index, merged) in &map.merges {
            match groups.last_mut() {
                Some((last, list)) if last == index => list.push(*merged),
                _ => groups.push((*index, vec![*merged])),
            }
        }
        let mut groups = groups.into_iter().peekable();
        let mut pairs = Vec::new();
        let mut own_pos = 0usize;
        for (index, entry) in map.entries.iter().enumerate() {
            if !entry.own {
                continue;
            }
            while groups.peek().is_some_and(|(at, _)| *at <= own_pos) {
                let (_, sources) = groups.next().unwrap_or_default();
                pairs.push(self.merge_pair(&sources)?);
            }
            let key_node = self.represent_value(entry.key)?;
            let value_node = self.represent_value(entry.value)?;
            if let Some(comments) = node_table(attrs, index) {
                self.thread_item(key_node, &comments.key);
                self.thread_item(value_node, &comments.value);
            }
            pairs.push((key_node, value_node));
            own_pos += 1;
        }
        for (_, sources) in groups {
            pairs.push(self.merge_pair(&sources)?);
        }
        if let NodeKind::Mapping { pairs: slot, .. } = &mut self.arena.get_mut(node).kind {
            *slot = pairs;
        }
        Ok(node)
    }

    /// A reconstructed `<<` pair: one alias for a single source, a flow
    /// sequence of aliases for a list merge.
    fn merge_pair(&mut self, sources: &[ValueId]) -> YamlResult<(NodeId, NodeId)> {
        let key = self.arena.push(Node {
            tag: MERGE_TAG.to_string(),
            kind: NodeKind::Scalar {
                value: "<<".to_string(),
                style: ScalarStyle::Plain,
            },
            start: Marker::default(),
            end: Marker::default(),
            anchor: None,
            comments: CommentSlots::default(),
        });
        let value = if let [single] = sources {
            self.represent_value(*single)?
        } else {
            let mut items = Vec::with_capacity(sources.len());
            for source in sources {
                items.push(self.represent_value(*source)?);
            }
            self.arena.push(Node {
                tag: DEFAULT_SEQUENCE_TAG.to_string(),
                kind: NodeKind::Sequence { items, flow: true },
                start: Marker::default(),
                end: Marker::default(),
                anchor: None,
                comments: CommentSlots::default(),
            })
        };
        Ok((key, value))
    }

    // ------------------------------------------------------------------
    // comment and anchor threading

    fn file_anchor(&mut self, node: NodeId, attrs: &NodeAttrs) {
        if let Some(anchor) = &attrs.anchor {
            if anchor.always_dump {
                self.arena.get_mut(node).anchor = Some(anchor.name.clone());
            } else {
                self.suggested.insert(node, anchor.name.clone());
            }
        }
    }

    /// The container's own slots and end run go back onto its node, where
    /// the composer found them.
    fn thread_container(&mut self, node: NodeId, attrs: &NodeAttrs) {
        let Some(table) = attrs.comments() else {
            return;
        };
        let slots = &mut self.arena.get_mut(node).comments;
        slots.pre.extend(table.own.pre.iter().cloned());
        if slots.eol.is_none() {
            slots.eol = table.own.eol.clone();
        }
        slots.post.extend(table.end.iter().cloned());
    }

    /// Files one entry slot onto its node. A trailing chunk sits after a
    /// block scalar's content, so it rides the post slot there; everywhere
    /// else it is the end-of-line slot.
    fn thread_item(&mut self, node: NodeId, item: &ItemComments) {
        if item.is_empty() {
            return;
        }
        let block_scalar = matches!(
            self.arena.get(node).kind,
            NodeKind::Scalar {
                style: ScalarStyle::Literal | ScalarStyle::Folded,
                ..
            }
        );
        let slots = &mut self.arena.get_mut(node).comments;
        slots.pre.extend(item.pre.iter().cloned());
        if let Some(eol) = &item.eol {
            if block_scalar || slots.eol.is_some() {
                slots.post.push(eol.clone());
            } else {
                slots.eol = Some(eol.clone());
            }
        }
    }
}

fn node_table(attrs: &NodeAttrs, index: usize) -> Option<&EntryComments> {
    attrs.comments()?.entries.get(&index)
}

fn tag_for(attrs: &NodeAttrs, default_tag: &str) -> String {
    match &attrs.tag {
        Some(tag) => tag.text.clone(),
        None => default_tag.to_string(),
    }
}

/// A mutated bool keeps its style of spelling only while the spelling
/// still reads as the stored value.
fn bool_text(scalar: &BoolScalar) -> String {
    let spelled_true = matches!(
        scalar.text.to_lowercase().as_str(),
        "yes" | "y" | "true" | "on"
    );
    if scalar.text.is_empty() || spelled_true != scalar.value {
        if scalar.value { "true" } else { "false" }.to_string()
    } else {
        scalar.text.clone()
    }
}

/// Re-inserts fold marks so the emitter can restore the original line
/// breaks of a folded scalar.
fn fold_marked(value: &str, fold_pos: &[usize]) -> String {
    let mut out = String::with_capacity(value.len() + fold_pos.len());
    let mut marks = fold_pos.iter().copied().peekable();
    for (index, ch) in value.chars().enumerate() {
        while marks.peek() == Some(&index) {
            out.push('\u{7}');
            marks.next();
        }
        out.push(ch);
    }
    for _ in marks {
        out.push('\u{7}');
    }
    out
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::composer::Composer;
    use crate::constructor::Constructor;
    use crate::parser::Parser;
    use crate::reader::Reader;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;
    use yarrow_common::{IntRadix, IntScalar, DEFAULT_YAML_VERSION};

    fn load(input: &str) -> YamlData {
        let reader = Reader::from_str(input).unwrap();
        let parser = Parser::new(Scanner::new(reader, DEFAULT_YAML_VERSION));
        let mut composer = Composer::new(parser, Resolver::new(DEFAULT_YAML_VERSION));
        let document = composer.get_single_node().unwrap().unwrap();
        let version = document.version.unwrap_or(DEFAULT_YAML_VERSION);
        let mut constructor = Constructor::new(composer.arena_mut(), version, true, false);
        constructor.construct_document(&document).unwrap()
    }

    fn nodes_for(data: &YamlData) -> (NodeArena, NodeId) {
        Representer::new(data, data.version.unwrap_or(DEFAULT_YAML_VERSION), false)
            .represent()
            .unwrap()
    }

    fn scalar_value(arena: &NodeArena, node: NodeId) -> &str {
        match &arena.get(node).kind {
            NodeKind::Scalar { value, .. } => value,
            kind => panic!("expected a scalar node, got {}", kind.name()),
        }
    }

    #[test]
    fn int_formats_re_render() {
        let mut data = YamlData::new();
        let id = data.alloc(Value::Int(IntScalar {
            value: 255,
            radix: IntRadix::Hex { caps: true },
            width: None,
            underscore: None,
        }));
        data.set_root(id);
        let (arena, root) = nodes_for(&data);
        assert_eq!(scalar_value(&arena, root), "0xFF");
        assert_eq!(arena.get(root).tag, "tag:yaml.org,2002:int");
    }

    #[test]
    fn shared_values_share_one_node() {
        let data = load("x: &k {v: 1}\ny: *k\n");
        let (arena, root) = nodes_for(&data);
        let pairs = match &arena.get(root).kind {
            NodeKind::Mapping { pairs, .. } => pairs.clone(),
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        assert_eq!(pairs[0].1, pairs[1].1);
        assert_eq!(arena.get(pairs[0].1).anchor.as_deref(), Some("k"));
    }

    #[test]
    fn merge_pairs_are_reinserted() {
        let data = load("base: &b\n  x: 1\nchild:\n  <<: *b\n  y: 3\n");
        let (arena, root) = nodes_for(&data);
        let (base_node, child_node) = match &arena.get(root).kind {
            NodeKind::Mapping { pairs, .. } => (pairs[0].1, pairs[1].1),
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        let child_pairs = match &arena.get(child_node).kind {
            NodeKind::Mapping { pairs, .. } => pairs.clone(),
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        assert_eq!(child_pairs.len(), 2);
        assert_eq!(scalar_value(&arena, child_pairs[0].0), "<<");
        assert_eq!(arena.get(child_pairs[0].0).tag, "tag:yaml.org,2002:merge");
        assert_eq!(child_pairs[0].1, base_node, "the merge value is the shared node");
        assert_eq!(scalar_value(&arena, child_pairs[1].0), "y");
    }

    #[test]
    fn list_merges_rebuild_a_flow_sequence() {
        let data = load("a: &a {x: 1}\nb: &b {z: 9}\nc:\n  <<: [*a, *b]\n");
        let (arena, root) = nodes_for(&data);
        let c_node = match &arena.get(root).kind {
            NodeKind::Mapping { pairs, .. } => pairs[2].1,
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        let merge_value = match &arena.get(c_node).kind {
            NodeKind::Mapping { pairs, .. } => pairs[0].1,
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        match &arena.get(merge_value).kind {
            NodeKind::Sequence { items, flow } => {
                assert!(*flow);
                assert_eq!(items.len(), 2);
            }
            kind => panic!("expected a sequence merge value, got {}", kind.name()),
        }
    }

    #[test]
    fn entry_comments_return_to_their_nodes() {
        let data = load("a: 1 # x\nb: 2\n");
        let (arena, root) = nodes_for(&data);
        let value_node = match &arena.get(root).kind {
            NodeKind::Mapping { pairs, .. } => pairs[0].1,
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        let eol = arena.get(value_node).comments.eol.as_ref().unwrap();
        assert_eq!(eol.value, "# x\n");
    }

    #[test]
    fn container_end_runs_ride_the_post_slot() {
        let data = load("m:\n  x: 1\n  # tail\nnext: 2\n");
        let (arena, root) = nodes_for(&data);
        let m_node = match &arena.get(root).kind {
            NodeKind::Mapping { pairs, .. } => pairs[0].1,
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        let post = &arena.get(m_node).comments.post;
        assert_eq!(post.len(), 1);
        assert_eq!(post[0].value, "# tail\n");
    }

    #[test]
    fn fold_marks_are_reinserted() {
        let data = load("v: >\n  a b\n  c\n");
        let (arena, root) = nodes_for(&data);
        let value_node = match &arena.get(root).kind {
            NodeKind::Mapping { pairs, .. } => pairs[0].1,
            kind => panic!("expected a mapping, got {}", kind.name()),
        };
        assert_eq!(scalar_value(&arena, value_node), "a b\u{7} c\n");
    }

    #[test]
    fn suggested_anchors_come_out_only_when_referenced() {
        let mut data = YamlData::new();
        let shared = data.new_int(1);
        data.attrs_mut(shared).anchor = Some(yarrow_common::Anchor::new("one"));
        let root = data.new_seq();
        data.seq_push(root, shared);
        data.set_root(root);
        let (arena, nroot) = nodes_for(&data);
        let items = match &arena.get(nroot).kind {
            NodeKind::Sequence { items, .. } => items.clone(),
            kind => panic!("expected a sequence, got {}", kind.name()),
        };
        assert!(arena.get(items[0]).anchor.is_none());

        data.seq_push(root, shared);
        let (arena, nroot) = nodes_for(&data);
        let items = match &arena.get(nroot).kind {
            NodeKind::Sequence { items, .. } => items.clone(),
            kind => panic!("expected a sequence, got {}", kind.name()),
        };
        assert_eq!(items[0], items[1]);
        assert_eq!(arena.get(items[0]).anchor.as_deref(), Some("one"));
    }

    #[test]
    fn stale_bool_text_is_replaced() {
        let mut data = YamlData::new();
        let id = data.alloc(Value::Bool(BoolScalar::new(false, "yes")));
        data.set_root(id);
        let (arena, root) = nodes_for(&data);
        assert_eq!(scalar_value(&arena, root), "false");
    }
}
