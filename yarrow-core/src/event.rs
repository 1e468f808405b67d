//! Parsing events, the interface between the parser and the composer on
//! the way in and between the serializer and the emitter on the way out.

use yarrow_common::{CommentSlots, Marker, ScalarStyle, YamlVersion};

#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    StreamStart,
    StreamEnd,
    DocumentStart {
        explicit: bool,
        version: Option<YamlVersion>,
        /// `%TAG` directives in source order.
        tags: Option<Vec<(String, String)>>,
    },
    DocumentEnd {
        explicit: bool,
    },
    Alias {
        name: String,
    },
    Scalar {
        anchor: Option<String>,
        tag: Option<String>,
        /// Whether the value may be emitted without a tag as plain, and
        /// whether it may be emitted without a tag when quoted.
        implicit: (bool, bool),
        value: String,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow: bool,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow: bool,
    },
    MappingEnd,
}

impl EventKind {
    /// The anchor carried by a node-start event.
    #[must_use]
    pub fn anchor(&self) -> Option<&str> {
        match self {
            EventKind::Scalar { anchor, .. }
            | EventKind::SequenceStart { anchor, .. }
            | EventKind::MappingStart { anchor, .. } => anchor.as_deref(),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub start: Marker,
    pub end: Marker,
    pub comments: CommentSlots,
}

impl Event {
    #[must_use]
    pub fn new(kind: EventKind, start: Marker, end: Marker) -> Event {
        Event {
            kind,
            start,
            end,
            comments: CommentSlots::default(),
        }
    }

    #[must_use]
    pub fn with_comments(mut self, comments: CommentSlots) -> Event {
        self.comments = comments;
        self
    }
}
