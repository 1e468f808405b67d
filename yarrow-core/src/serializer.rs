//! Turns a composed node tree back into an event stream.
//!
//! A counting pass first walks the tree and decides which nodes need an
//! anchor: nodes that kept a name always get theirs, unnamed nodes that
//! are referenced more than once are numbered from a template. The walk
//! proper then emits one event per node, an alias for every repeat
//! visit, and asks the resolver whether each scalar's tag could be
//! re-detected from its text alone.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::emitter::Emitter;
use crate::event::{Event, EventKind};
use crate::node::{NodeArena, NodeId, NodeKind};
use crate::resolver::{Resolver, DEFAULT_MAPPING_TAG, DEFAULT_SEQUENCE_TAG};
use yarrow_common::{Comment, Marker, YamlError, YamlResult, YamlVersion};

/// Everything that precedes a document's root node in the stream.
#[derive(Clone, Debug, Default)]
pub struct DocumentHead {
    pub version: Option<YamlVersion>,
    pub tags: Vec<(String, String)>,
    pub explicit_start: bool,
    pub explicit_end: bool,
    pub leading: Vec<Comment>,
}

/// True for anchor names the serializer itself hands out. Loaded anchors
/// matching the template are dropped at construction time so a re-dump
/// renumbers them instead of colliding with them.
#[must_use]
pub fn templated_id(name: &str) -> bool {
    match name.strip_prefix("id") {
        Some(digits) => {
            digits.len() >= 3
                && digits.chars().all(|c| c.is_ascii_digit())
                && !digits.starts_with("000")
        }
        None => false,
    }
}

fn err(problem: impl Into<String>) -> YamlError {
    YamlError::Serializer(problem.into())
}

pub struct Serializer<'a, W> {
    emitter: &'a mut Emitter<W>,
    resolver: Resolver,
    anchors: HashMap<NodeId, Option<String>>,
    serialized: HashSet<NodeId>,
    last_anchor_id: usize,
    opened: bool,
    closed: bool,
}

impl<'a, W: fmt::Write> Serializer<'a, W> {
    pub fn new(emitter: &'a mut Emitter<W>, resolver: Resolver) -> Serializer<'a, W> {
        Serializer {
            emitter,
            resolver,
            anchors: HashMap::new(),
            serialized: HashSet::new(),
            last_anchor_id: 0,
            opened: false,
            closed: false,
        }
    }

    /// Switches implicit-tag detection to the given dialect; documents in
    /// one stream may carry different `%YAML` directives.
    pub fn set_version(&mut self, version: YamlVersion) {
        self.resolver.set_version(version);
    }

    pub fn open(&mut self) -> YamlResult<()> {
        if self.closed {
            return Err(err("serializer is closed"));
        }
        if self.opened {
            return Err(err("serializer is already opened"));
        }
        self.opened = true;
        self.emitter.emit(Event::new(
            EventKind::StreamStart,
            Marker::default(),
            Marker::default(),
        ))
    }

    pub fn close(&mut self) -> YamlResult<()> {
        if !self.opened {
            return Err(err("serializer is not opened"));
        }
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.emitter.emit(Event::new(
            EventKind::StreamEnd,
            Marker::default(),
            Marker::default(),
        ))
    }

    /// Emits one document: its head (directives, markers, the comments
    /// that sat before them) and the node tree under `root`.
    pub fn serialize(
        &mut self,
        arena: &NodeArena,
        root: NodeId,
        head: &DocumentHead,
    ) -> YamlResult<()> {
        if !self.opened {
            return Err(err("serializer is not opened"));
        }
        if self.closed {
            return Err(err("serializer is closed"));
        }
        let tags = if head.tags.is_empty() {
            None
        } else {
            Some(head.tags.clone())
        };
        let mut start = Event::new(
            EventKind::DocumentStart {
                explicit: head.explicit_start,
                version: head.version,
                tags,
            },
            Marker::default(),
            Marker::default(),
        );
        start.comments.pre = head.leading.clone();
        self.emitter.emit(start)?;
        self.anchor_node(arena, root);
        self.serialize_node(arena, root)?;
        self.emitter.emit(Event::new(
            EventKind::DocumentEnd {
                explicit: head.explicit_end,
            },
            Marker::default(),
            Marker::default(),
        ))?;
        self.serialized.clear();
        self.anchors.clear();
        self.last_anchor_id = 0;
        Ok(())
    }

    fn anchor_node(&mut self, arena: &NodeArena, id: NodeId) {
        if let Some(entry) = self.anchors.get_mut(&id) {
            if entry.is_none() {
                self.last_anchor_id += 1;
                *entry = Some(format!("id{:03}", self.last_anchor_id));
            }
            return;
        }
        let node = arena.get(id);
        self.anchors.insert(id, node.anchor.clone());
        match &node.kind {
            NodeKind::Scalar { .. } => {}
            NodeKind::Sequence { items, .. } => {
                for item in items {
                    self.anchor_node(arena, *item);
                }
            }
            NodeKind::Mapping { pairs, .. } => {
                for (key, value) in pairs {
                    self.anchor_node(arena, *key);
                    self.anchor_node(arena, *value);
                }
            }
        }
    }

    fn serialize_node(&mut self, arena: &NodeArena, id: NodeId) -> YamlResult<()> {
        let anchor = self.anchors.get(&id).cloned().flatten();
        if self.serialized.contains(&id) {
            let name =
                anchor.ok_or_else(|| err("node is referenced twice but carries no anchor"))?;
            return self.emitter.emit(Event::new(
                EventKind::Alias { name },
                Marker::default(),
                Marker::default(),
            ));
        }
        self.serialized.insert(id);
        let node = arena.get(id);
        match &node.kind {
            NodeKind::Scalar { value, style } => {
                let detected = self.resolver.resolve(value, (true, false));
                let default = self.resolver.resolve(value, (false, true));
                let implicit = (node.tag == detected, node.tag == default);
                let mut event = Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag: Some(node.tag.clone()),
                        implicit,
                        value: value.clone(),
                        style: *style,
                    },
                    node.start,
                    node.end,
                );
                event.comments = node.comments.clone();
                self.emitter.emit(event)
            }
            NodeKind::Sequence { items, flow } => {
                let flow = *flow;
                let mut event = Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag: Some(node.tag.clone()),
                        implicit: node.tag == DEFAULT_SEQUENCE_TAG,
                        flow,
                    },
                    node.start,
                    node.end,
                );
                event.comments.pre = node.comments.pre.clone();
                if !flow {
                    event.comments.eol = node.comments.eol.clone();
                }
                self.emitter.emit(event)?;
                for item in items {
                    self.serialize_node(arena, *item)?;
                }
                let node = arena.get(id);
                let mut end =
                    Event::new(EventKind::SequenceEnd, Marker::default(), Marker::default());
                if flow {
                    end.comments.eol = node.comments.eol.clone();
                }
                end.comments.pre = node.comments.post.clone();
                self.emitter.emit(end)
            }
            NodeKind::Mapping { pairs, flow } => {
                let flow = *flow;
                let mut event = Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag: Some(node.tag.clone()),
                        implicit: node.tag == DEFAULT_MAPPING_TAG,
                        flow,
                    },
                    node.start,
                    node.end,
                );
                event.comments.pre = node.comments.pre.clone();
                if !flow {
                    event.comments.eol = node.comments.eol.clone();
                }
                self.emitter.emit(event)?;
                for (key, value) in pairs {
                    self.serialize_node(arena, *key)?;
                    self.serialize_node(arena, *value)?;
                }
                let node = arena.get(id);
                let mut end =
                    Event::new(EventKind::MappingEnd, Marker::default(), Marker::default());
                if flow {
                    end.comments.eol = node.comments.eol.clone();
                }
                end.comments.pre = node.comments.post.clone();
                self.emitter.emit(end)
            }
        }
    }
}
