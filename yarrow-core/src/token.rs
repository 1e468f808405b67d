//! Tokens produced by the scanner. Every token carries its source span
//! and the comment slots the gathering pass fills in.

use std::fmt;
use yarrow_common::{Comment, CommentSlots, Marker, ScalarStyle};

#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveValue {
    Yaml(u32, u32),
    Tag { handle: String, prefix: String },
    /// Unknown directives are skipped but remembered by name.
    Reserved,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    StreamStart,
    StreamEnd,
    Directive {
        name: String,
        value: DirectiveValue,
    },
    DocumentStart,
    DocumentEnd,
    BlockSequenceStart,
    BlockMappingStart,
    BlockEnd,
    FlowSequenceStart,
    FlowSequenceEnd,
    FlowMappingStart,
    FlowMappingEnd,
    BlockEntry,
    FlowEntry,
    Key,
    Value,
    Alias(String),
    Anchor(String),
    Tag {
        handle: Option<String>,
        suffix: String,
    },
    Scalar {
        value: String,
        style: ScalarStyle,
    },
    /// A standalone comment or blank line, kept in the stream until the
    /// gathering pass attaches it to a neighbouring token.
    Comment(Comment),
}

impl TokenKind {
    #[must_use]
    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::Comment(_))
    }
}

impl fmt::Display for TokenKind {
    /// The short id used in error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            TokenKind::StreamStart => "<stream start>",
            TokenKind::StreamEnd => "<stream end>",
            TokenKind::Directive { .. } => "<directive>",
            TokenKind::DocumentStart => "<document start>",
            TokenKind::DocumentEnd => "<document end>",
            TokenKind::BlockSequenceStart => "<block sequence start>",
            TokenKind::BlockMappingStart => "<block mapping start>",
            TokenKind::BlockEnd => "<block end>",
            TokenKind::FlowSequenceStart => "[",
            TokenKind::FlowSequenceEnd => "]",
            TokenKind::FlowMappingStart => "{",
            TokenKind::FlowMappingEnd => "}",
            TokenKind::BlockEntry => "-",
            TokenKind::FlowEntry => ",",
            TokenKind::Key => "?",
            TokenKind::Value => ":",
            TokenKind::Alias(_) => "<alias>",
            TokenKind::Anchor(_) => "<anchor>",
            TokenKind::Tag { .. } => "<tag>",
            TokenKind::Scalar { .. } => "<scalar>",
            TokenKind::Comment(_) => "<comment>",
        };
        write!(f, "{id}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Marker,
    pub end: Marker,
    pub comments: CommentSlots,
}

impl Token {
    #[must_use]
    pub fn new(kind: TokenKind, start: Marker, end: Marker) -> Token {
        Token {
            kind,
            start,
            end,
            comments: CommentSlots::default(),
        }
    }

    /// The standalone comment payload, when this is a comment token.
    #[must_use]
    pub fn into_comment(self) -> Option<Comment> {
        match self.kind {
            TokenKind::Comment(c) => Some(c),
            _ => None,
        }
    }
}
