pub mod comment;
pub mod document;
pub mod error;
pub mod scalar;

pub use comment::{Comment, CommentKind, CommentSlots};
pub use document::{
    Anchor, CommentTable, EntryComments, EntryPosition, ItemComments, Map, MapEntry, NodeAttrs,
    Seq, Tag, Value, ValueId, YamlData,
};
pub use error::{Marked, Warning, YamlError, YamlResult};
pub use scalar::{
    BoolScalar, FloatExponent, FloatScalar, IntRadix, IntScalar, NullScalar, StrScalar,
    TimestampScalar, Underscore,
};

use std::fmt::{Display, Formatter};

/// Position inside the decoded character stream.
///
/// `line` and `col` are zero based; error rendering adds one.
#[derive(Default, Debug, Clone, Copy, Eq, PartialEq)]
pub struct Marker {
    /// Index in characters from the start of the stream.
    pub index: usize,
    pub line: u32,
    pub col: u32,
}

impl Marker {
    #[must_use]
    pub fn new(index: usize, line: u32, col: u32) -> Marker {
        Marker { index, line, col }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line + 1, self.col + 1)
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default)]
pub enum ScalarStyle {
    /// Unquoted, e.g. `key: some text`.
    #[default]
    Plain,
    /// Folded block scalar:
    /// ```yaml
    ///   >
    ///     folded
    ///     string
    /// ```
    Folded,
    /// Literal block scalar:
    /// ```yaml
    ///   |
    ///     literal
    ///     string
    /// ```
    Literal,
    /// Single quoted, doubling embedded quotes: `'it''s'`.
    SingleQuote,
    /// Double quoted with backslash escapes: `"a\tb"`.
    DoubleQuote,
}

impl Display for ScalarStyle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ScalarStyle::Plain => write!(f, ":"),
            ScalarStyle::Folded => write!(f, ">"),
            ScalarStyle::Literal => write!(f, "|"),
            ScalarStyle::SingleQuote => write!(f, "'"),
            ScalarStyle::DoubleQuote => write!(f, "\""),
        }
    }
}

/// A `%YAML` directive version, `(major, minor)`.
pub type YamlVersion = (u32, u32);

/// Version assumed when neither directives nor options say otherwise.
pub const DEFAULT_YAML_VERSION: YamlVersion = (1, 2);
