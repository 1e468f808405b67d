//! Round-trip YAML: load documents with their layout attached, mutate
//! them, dump them back byte for byte.
//!
//! [`Yaml`] is the configured entry point. The pipeline stages are
//! public for code that wants tokens, events or composed nodes
//! directly.

pub use composer::{ComposedDocument, Composer};
pub use constructor::{ConstructFn, Constructor};
pub use emitter::{EmitOpts, Emitter};
pub use event::{Event, EventKind};
pub use parser::Parser;
pub use reader::Reader;
pub use representer::Representer;
pub use resolver::Resolver;
pub use scanner::Scanner;
pub use serializer::{DocumentHead, Serializer};
pub use yaml::{AnyConstructFn, Yaml};
pub use yarrow_common::{
    BoolScalar, Comment, CommentKind, FloatScalar, IntScalar, Map, Marker, NullScalar, ScalarStyle,
    Seq, StrScalar, Value, ValueId, Warning, YamlData, YamlError, YamlResult, YamlVersion,
};

mod char_util;
pub mod composer;
pub mod constructor;
pub mod emitter;
pub mod event;
pub mod node;
pub mod parser;
pub mod reader;
pub mod representer;
pub mod resolver;
pub mod scanner;
pub mod serializer;
pub mod token;
pub mod yaml;
