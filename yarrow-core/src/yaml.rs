//! The front door: one configured [`Yaml`] value loads documents and
//! dumps them back.
//!
//! Loading runs reader, scanner, parser, composer and constructor in
//! sequence; dumping runs representer, serializer and emitter. The
//! options on [`Yaml`] feed whichever side of the pipeline they
//! concern, so a single value describes a whole round trip.

use std::fmt;
use std::io;
use std::mem;
use std::slice;

use regex::Regex;

use yarrow_common::{ValueId, Warning, YamlData, YamlResult, YamlVersion, DEFAULT_YAML_VERSION};

use crate::composer::{ComposedDocument, Composer};
use crate::constructor::Constructor;
use crate::emitter::{EmitOpts, Emitter};
use crate::node::NodeId;
use crate::parser::Parser;
use crate::reader::Reader;
use crate::representer::Representer;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::serializer::{DocumentHead, Serializer};

/// A constructor callback independent of any one document's lifetime.
///
/// Plain functions of this shape coerce to [`ConstructFn`] for every
/// document a [`Yaml`] value loads.
///
/// [`ConstructFn`]: crate::constructor::ConstructFn
pub type AnyConstructFn = for<'a> fn(&mut Constructor<'a>, NodeId) -> YamlResult<ValueId>;

/// Round-trip YAML processor.
///
/// The defaults keep everything a load captured: comments, blank lines,
/// key order, quoting, number spellings, anchors. Dumping an unchanged
/// document reproduces its bytes; a mutation disturbs only the entries
/// it touched.
///
/// ```
/// use yarrow_core::Yaml;
///
/// let mut yaml = Yaml::new();
/// let data = yaml.load("a: 1 # one\nb: [2, 3]\n")?;
/// assert_eq!(yaml.dump(&data)?, "a: 1 # one\nb: [2, 3]\n");
/// # Ok::<(), yarrow_core::YamlError>(())
/// ```
pub struct Yaml {
    /// Dialect used when a document carries no `%YAML` directive.
    pub version: YamlVersion,
    /// Keep the quote style of loaded strings instead of re-deciding it.
    pub preserve_quotes: bool,
    /// Keep the first value of a duplicated key and warn, instead of
    /// failing the load.
    pub allow_duplicate_keys: bool,
    /// Column where the emitter prefers to break long lines.
    pub width: usize,
    /// Indent step for block mapping values.
    pub map_indent: usize,
    /// Indent step for block sequence entries.
    pub seq_indent: usize,
    /// Offset of the `-` inside a block sequence entry's indent.
    pub dash_offset: usize,
    /// Write non-ASCII characters as themselves rather than as escapes.
    pub allow_unicode: bool,
    /// Layout for containers built by hand, which carry no loaded layout
    /// of their own.
    pub default_flow_style: bool,
    /// Extra `(handle, prefix)` pairs written as `%TAG` directives on
    /// every dumped document, ahead of the document's own.
    pub tags: Vec<(String, String)>,
    /// `Some` forces the `---` marker on or off; `None` keeps what the
    /// document loaded with.
    pub explicit_start: Option<bool>,
    /// `Some` forces the `...` marker on or off; `None` keeps what the
    /// document loaded with.
    pub explicit_end: Option<bool>,
    resolvers: Vec<(String, Regex, Option<String>)>,
    constructors: Vec<(String, AnyConstructFn)>,
    multi_constructors: Vec<(String, AnyConstructFn)>,
    warnings: Vec<Warning>,
}

impl Default for Yaml {
    fn default() -> Yaml {
        Yaml {
            version: DEFAULT_YAML_VERSION,
            preserve_quotes: true,
            allow_duplicate_keys: false,
            width: 80,
            map_indent: 2,
            seq_indent: 2,
            dash_offset: 0,
            allow_unicode: true,
            default_flow_style: false,
            tags: Vec::new(),
            explicit_start: None,
            explicit_end: None,
            resolvers: Vec::new(),
            constructors: Vec::new(),
            multi_constructors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl Yaml {
    #[must_use]
    pub fn new() -> Yaml {
        Yaml::default()
    }

    /// Loads a single document. An empty stream gives a document with
    /// no root; more than one document is an error.
    pub fn load(&mut self, input: &str) -> YamlResult<YamlData> {
        let reader = Reader::from_str(input)?;
        self.load_single(reader)
    }

    /// Loads a single document from raw bytes, sniffing the encoding
    /// from a BOM or the UTF pattern of the first bytes.
    pub fn load_bytes(&mut self, input: &[u8]) -> YamlResult<YamlData> {
        let reader = Reader::new(input)?;
        self.load_single(reader)
    }

    /// Reads `input` to the end, then loads a single document from it.
    pub fn load_reader(&mut self, mut input: impl io::Read) -> YamlResult<YamlData> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.load_bytes(&bytes)
    }

    /// Loads every document in the stream, in order.
    pub fn load_all(&mut self, input: &str) -> YamlResult<Vec<YamlData>> {
        let reader = Reader::from_str(input)?;
        self.load_stream(reader)
    }

    /// Loads every document in the stream from raw bytes.
    pub fn load_all_bytes(&mut self, input: &[u8]) -> YamlResult<Vec<YamlData>> {
        let reader = Reader::new(input)?;
        self.load_stream(reader)
    }

    /// Reads `input` to the end, then loads every document from it.
    pub fn load_all_reader(&mut self, mut input: impl io::Read) -> YamlResult<Vec<YamlData>> {
        let mut bytes = Vec::new();
        input.read_to_end(&mut bytes)?;
        self.load_all_bytes(&bytes)
    }

    /// Warnings gathered by loads since the last call.
    pub fn take_warnings(&mut self) -> Vec<Warning> {
        mem::take(&mut self.warnings)
    }

    /// Dumps one document to a string.
    pub fn dump(&mut self, data: &YamlData) -> YamlResult<String> {
        let mut out = String::new();
        self.dump_to(data, &mut out)?;
        Ok(out)
    }

    /// Dumps a stream of documents to a string, separated by `---`.
    pub fn dump_all(&mut self, documents: &[YamlData]) -> YamlResult<String> {
        let mut out = String::new();
        self.dump_all_to(documents, &mut out)?;
        Ok(out)
    }

    /// Dumps one document into a formatter-style writer.
    pub fn dump_to(&mut self, data: &YamlData, writer: impl fmt::Write) -> YamlResult<()> {
        self.dump_all_to(slice::from_ref(data), writer)
    }

    /// Dumps a stream of documents into a formatter-style writer.
    pub fn dump_all_to(
        &mut self,
        documents: &[YamlData],
        writer: impl fmt::Write,
    ) -> YamlResult<()> {
        let opts = EmitOpts {
            width: self.width,
            map_indent: self.map_indent,
            seq_indent: self.seq_indent,
            dash_offset: self.dash_offset,
            allow_unicode: self.allow_unicode,
        };
        let mut emitter = Emitter::new(writer, opts);
        let mut serializer = Serializer::new(&mut emitter, self.resolver());
        serializer.open()?;
        for data in documents {
            let version = data.version.unwrap_or(self.version);
            tracing::debug!("dumping a YAML {}.{} document", version.0, version.1);
            let representer = Representer::new(data, version, self.default_flow_style);
            let (arena, root) = representer.represent()?;
            serializer.set_version(version);
            let mut tags = self.tags.clone();
            for pair in &data.tag_directives {
                if !tags.iter().any(|(handle, _)| *handle == pair.0) {
                    tags.push(pair.clone());
                }
            }
            let head = DocumentHead {
                version: data.version,
                tags,
                explicit_start: self.explicit_start.unwrap_or(data.explicit_start),
                explicit_end: self.explicit_end.unwrap_or(data.explicit_end),
                leading: data.leading.clone(),
            };
            serializer.serialize(&arena, root, &head)?;
        }
        serializer.close()?;
        Ok(())
    }

    /// Dumps one document into an `io::Write` sink.
    pub fn dump_writer(&mut self, data: &YamlData, writer: impl io::Write) -> YamlResult<()> {
        let mut adapter = IoAdapter {
            inner: writer,
            error: None,
        };
        let result = self.dump_to(data, &mut adapter);
        io_outcome(adapter, result)
    }

    /// Dumps a stream of documents into an `io::Write` sink.
    pub fn dump_all_writer(
        &mut self,
        documents: &[YamlData],
        writer: impl io::Write,
    ) -> YamlResult<()> {
        let mut adapter = IoAdapter {
            inner: writer,
            error: None,
        };
        let result = self.dump_all_to(documents, &mut adapter);
        io_outcome(adapter, result)
    }

    /// Registers an implicit resolver on both directions: plain scalars
    /// matching `pattern` resolve to `tag` when loading, and values
    /// tagged `tag` whose text matches stay plain and untagged when
    /// dumping. `first` narrows the probe to values starting with one
    /// of its characters.
    pub fn add_implicit_resolver(
        &mut self,
        tag: impl Into<String>,
        pattern: Regex,
        first: Option<&str>,
    ) {
        self.resolvers
            .push((tag.into(), pattern, first.map(str::to_owned)));
    }

    /// Registers a constructor for an exact tag on every future load.
    pub fn add_constructor(&mut self, tag: impl Into<String>, construct: AnyConstructFn) {
        self.constructors.push((tag.into(), construct));
    }

    /// Registers a constructor for every tag starting with `prefix`.
    pub fn add_multi_constructor(&mut self, prefix: impl Into<String>, construct: AnyConstructFn) {
        self.multi_constructors.push((prefix.into(), construct));
    }

    fn resolver(&self) -> Resolver {
        let mut resolver = Resolver::new(self.version);
        for (tag, pattern, first) in &self.resolvers {
            resolver.add_implicit_resolver(tag.clone(), pattern.clone(), first.as_deref());
        }
        resolver
    }

    fn pipeline(&self, reader: Reader) -> Composer {
        let parser = Parser::new(Scanner::new(reader, self.version));
        Composer::new(parser, self.resolver())
    }

    fn load_single(&mut self, reader: Reader) -> YamlResult<YamlData> {
        let mut composer = self.pipeline(reader);
        let document = composer.get_single_node()?;
        self.warnings.extend(composer.take_warnings());
        match document {
            Some(document) => self.construct(&mut composer, &document),
            None => Ok(YamlData::new()),
        }
    }

    fn load_stream(&mut self, reader: Reader) -> YamlResult<Vec<YamlData>> {
        let mut composer = self.pipeline(reader);
        let mut documents = Vec::new();
        while composer.check_node()? {
            let Some(document) = composer.get_node()? else {
                break;
            };
            self.warnings.extend(composer.take_warnings());
            documents.push(self.construct(&mut composer, &document)?);
        }
        Ok(documents)
    }

    fn construct(
        &mut self,
        composer: &mut Composer,
        document: &ComposedDocument,
    ) -> YamlResult<YamlData> {
        let version = document.version.unwrap_or(self.version);
        let mut constructor = Constructor::new(
            composer.arena_mut(),
            version,
            self.preserve_quotes,
            self.allow_duplicate_keys,
        );
        for (tag, construct) in &self.constructors {
            constructor.add_constructor(tag.clone(), *construct);
        }
        for (prefix, construct) in &self.multi_constructors {
            constructor.add_multi_constructor(prefix.clone(), *construct);
        }
        let data = constructor.construct_document(document)?;
        self.warnings.extend(constructor.take_warnings());
        tracing::debug!("constructed a YAML {}.{} document", version.0, version.1);
        Ok(data)
    }
}

/// Carries YAML text into an `io::Write`, holding the io error aside so
/// it survives the trip through `fmt::Error`.
struct IoAdapter<W> {
    inner: W,
    error: Option<io::Error>,
}

impl<W: io::Write> fmt::Write for IoAdapter<W> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.inner.write_all(s.as_bytes()).map_err(|error| {
            self.error = Some(error);
            fmt::Error
        })
    }
}

fn io_outcome<W: io::Write>(mut adapter: IoAdapter<W>, result: YamlResult<()>) -> YamlResult<()> {
    let flushed = adapter.inner.flush();
    match adapter.error {
        Some(error) => Err(error.into()),
        None => {
            result?;
            flushed.map_err(Into::into)
        }
    }
}
