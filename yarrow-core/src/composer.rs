//! Builds the node tree from the event stream.
//!
//! Anchors are registered before their node's children compose, so a
//! self-referential alias resolves to the node under construction. An
//! alias is just the anchored node's id appearing again; cycles come out
//! of the arena for free.

use std::collections::HashMap;

use crate::event::{Event, EventKind};
use crate::node::{Node, NodeArena, NodeId, NodeKind};
use crate::parser::Parser;
use crate::resolver::{Resolver, DEFAULT_MAPPING_TAG, DEFAULT_SEQUENCE_TAG};
use yarrow_common::{Comment, Marked, Marker, Warning, YamlError, YamlResult, YamlVersion};

fn err(problem: impl Into<String>, mark: Marker) -> YamlError {
    YamlError::Composer(Marked::problem(problem, mark))
}

/// One document's worth of composition: the root node plus the stream
/// framing that has to survive a round trip.
#[derive(Debug)]
pub struct ComposedDocument {
    pub root: NodeId,
    pub version: Option<YamlVersion>,
    pub tags: Vec<(String, String)>,
    pub explicit_start: bool,
    pub explicit_end: bool,
    /// Comment lines that sat before the directives and `---`.
    pub leading: Vec<Comment>,
}

pub struct Composer {
    parser: Parser,
    resolver: Resolver,
    arena: NodeArena,
    anchors: HashMap<String, NodeId>,
    warnings: Vec<Warning>,
}

impl Composer {
    #[must_use]
    pub fn new(parser: Parser, resolver: Resolver) -> Composer {
        Composer {
            parser,
            resolver,
            arena: NodeArena::new(),
            anchors: HashMap::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut NodeArena {
        &mut self.arena
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        std::mem::take(&mut self.warnings)
    }

    /// Drops the stream start if still pending and reports whether another
    /// document is available.
    pub fn check_node(&mut self) -> YamlResult<bool> {
        if self.parser.check_event(|k| *k == EventKind::StreamStart)? {
            let _ = self.parser.get_event()?;
        }
        Ok(!self.parser.check_event(|k| *k == EventKind::StreamEnd)?)
    }

    /// Composes the next document, or `None` at the end of the stream.
    pub fn get_node(&mut self) -> YamlResult<Option<ComposedDocument>> {
        if self.parser.check_event(|k| *k == EventKind::StreamEnd)? {
            return Ok(None);
        }
        Ok(Some(self.compose_document()?))
    }

    /// Composes the only document of the stream; a second one is an error.
    pub fn get_single_node(&mut self) -> YamlResult<Option<ComposedDocument>> {
        if self.parser.check_event(|k| *k == EventKind::StreamStart)? {
            let _ = self.parser.get_event()?;
        }
        let mut document = None;
        if !self.parser.check_event(|k| *k == EventKind::StreamEnd)? {
            document = Some(self.compose_document()?);
        }
        if !self.parser.check_event(|k| *k == EventKind::StreamEnd)? {
            let second = match self.parser.peek_event()? {
                Some(event) => event.start,
                None => Marker::default(),
            };
            let first = document
                .as_ref()
                .map(|d| self.arena.get(d.root).start)
                .unwrap_or_default();
            return Err(YamlError::Composer(Marked::contextual(
                "expected a single document in the stream",
                first,
                "but found another document",
                second,
            )));
        }
        let _ = self.parser.get_event()?;
        Ok(document)
    }

    fn take_event(&mut self) -> YamlResult<Event> {
        match self.parser.get_event()? {
            Some(event) => Ok(event),
            None => Err(err("no more events", Marker::default())),
        }
    }

    fn compose_document(&mut self) -> YamlResult<ComposedDocument> {
        let start = self.take_event()?;
        let (explicit_start, version, tags) = match start.kind {
            EventKind::DocumentStart {
                explicit,
                version,
                tags,
            } => (explicit, version, tags),
            _ => (false, None, None),
        };
        self.resolver.set_version(self.parser.processing_version());
        let root = self.compose_node()?;
        let mut end = self.take_event()?;
        let explicit_end = matches!(end.kind, EventKind::DocumentEnd { explicit: true });
        if !end.comments.is_empty() {
            // comment runs between the root and the end of the document
            // become the root's trailing run
            let node = self.arena.get_mut(root);
            node.comments.post.append(&mut end.comments.pre);
            if let Some(c) = end.comments.eol.take() {
                node.comments.post.push(c);
            }
            node.comments.post.append(&mut end.comments.post);
        }
        self.anchors.clear();
        Ok(ComposedDocument {
            root,
            version,
            tags: tags.unwrap_or_default(),
            explicit_start,
            explicit_end,
            leading: start.comments.pre,
        })
    }

    fn compose_node(&mut self) -> YamlResult<NodeId> {
        if self.parser.check_event(|k| matches!(k, EventKind::Alias { .. }))? {
            let event = self.take_event()?;
            if let EventKind::Alias { name } = event.kind {
                return match self.anchors.get(&name) {
                    Some(id) => Ok(*id),
                    None => Err(err(
                        format!("found undefined alias {name:?}"),
                        event.start,
                    )),
                };
            }
        }
        let (anchor, start) = match self.parser.peek_event()? {
            Some(event) => (event.kind.anchor().map(String::from), event.start),
            None => (None, Marker::default()),
        };
        if let Some(name) = &anchor {
            if let Some(existing) = self.anchors.get(name) {
                let warning = Warning::ReusedAnchor {
                    anchor: name.clone(),
                    first: self.arena.get(*existing).start,
                    second: start,
                };
                tracing::warn!("{warning}");
                self.warnings.push(warning);
            }
        }
        if self.parser.check_event(|k| matches!(k, EventKind::Scalar { .. }))? {
            self.compose_scalar_node(anchor)
        } else if self
            .parser
            .check_event(|k| matches!(k, EventKind::SequenceStart { .. }))?
        {
            self.compose_sequence_node(anchor)
        } else if self
            .parser
            .check_event(|k| matches!(k, EventKind::MappingStart { .. }))?
        {
            self.compose_mapping_node(anchor)
        } else {
            Err(err("expected a scalar, sequence or mapping node", start))
        }
    }

    fn compose_scalar_node(&mut self, anchor: Option<String>) -> YamlResult<NodeId> {
        let event = self.take_event()?;
        let (tag, implicit, value, style) = match event.kind {
            EventKind::Scalar {
                tag,
                implicit,
                value,
                style,
                ..
            } => (tag, implicit, value, style),
            _ => return Err(err("expected a scalar event", event.start)),
        };
        let tag = match tag {
            Some(tag) if tag != "!" => tag,
            _ => self.resolver.resolve(&value, implicit),
        };
        let id = self.arena.push(Node {
            tag,
            kind: NodeKind::Scalar { value, style },
            start: event.start,
            end: event.end,
            anchor: anchor.clone(),
            comments: event.comments,
        });
        if let Some(name) = anchor {
            self.anchors.insert(name, id);
        }
        Ok(id)
    }

    fn compose_sequence_node(&mut self, anchor: Option<String>) -> YamlResult<NodeId> {
        let start = self.take_event()?;
        let (tag, flow) = match start.kind {
            EventKind::SequenceStart { tag, flow, .. } => (tag, flow),
            _ => return Err(err("expected a sequence start event", start.start)),
        };
        let tag = match tag {
            Some(tag) if tag != "!" => tag,
            _ => DEFAULT_SEQUENCE_TAG.to_string(),
        };
        let id = self.arena.push(Node {
            tag,
            kind: NodeKind::Sequence {
                items: Vec::new(),
                flow,
            },
            start: start.start,
            end: start.end,
            anchor: anchor.clone(),
            comments: start.comments,
        });
        if let Some(name) = anchor {
            self.anchors.insert(name, id);
        }
        while !self.parser.check_event(|k| *k == EventKind::SequenceEnd)? {
            let item = self.compose_node()?;
            if let NodeKind::Sequence { items, .. } = &mut self.arena.get_mut(id).kind {
                items.push(item);
            }
        }
        let end = self.take_event()?;
        self.absorb_end(id, end);
        Ok(id)
    }

    fn compose_mapping_node(&mut self, anchor: Option<String>) -> YamlResult<NodeId> {
        let start = self.take_event()?;
        let (tag, flow) = match start.kind {
            EventKind::MappingStart { tag, flow, .. } => (tag, flow),
            _ => return Err(err("expected a mapping start event", start.start)),
        };
        let tag = match tag {
            Some(tag) if tag != "!" => tag,
            _ => DEFAULT_MAPPING_TAG.to_string(),
        };
        let id = self.arena.push(Node {
            tag,
            kind: NodeKind::Mapping {
                pairs: Vec::new(),
                flow,
            },
            start: start.start,
            end: start.end,
            anchor: anchor.clone(),
            comments: start.comments,
        });
        if let Some(name) = anchor {
            self.anchors.insert(name, id);
        }
        while !self.parser.check_event(|k| *k == EventKind::MappingEnd)? {
            let item_key = self.compose_node()?;
            let item_value = self.compose_node()?;
            if let NodeKind::Mapping { pairs, .. } = &mut self.arena.get_mut(id).kind {
                pairs.push((item_key, item_value));
            }
        }
        let end = self.take_event()?;
        self.absorb_end(id, end);
        Ok(id)
    }

    /// Folds an end event's span and comments into the finished node. A
    /// run sitting before the closing token has nothing after it to ride,
    /// so it becomes the node's end run.
    fn absorb_end(&mut self, id: NodeId, end: Event) {
        let node = self.arena.get_mut(id);
        node.end = end.end;
        let mut comments = end.comments;
        if let Some(eol) = comments.eol.take() {
            match &node.comments.eol {
                None => node.comments.eol = Some(eol),
                Some(_) => node.comments.post.push(eol),
            }
        }
        node.comments.post.append(&mut comments.pre);
        node.comments.post.extend(comments.post);
    }
}
