//! Turns composed nodes into document values.
//!
//! Construction is memoized per node id: an alias constructs to the same
//! value cell as its anchor, and a container registers its id before its
//! children build, so cycles terminate. Scalar constructors keep the
//! spelling of the source text alongside the parsed value; the comment
//! slots each node carried are filed into the owning container's table.

use std::collections::HashMap;
use std::mem;

use regex::Regex;

use crate::composer::ComposedDocument;
use crate::node::{NodeArena, NodeId, NodeKind};
use crate::resolver::DEFAULT_SCALAR_TAG;
use crate::serializer::templated_id;
use yarrow_common::{
    Anchor, BoolScalar, EntryPosition, FloatExponent, FloatScalar, IntRadix, IntScalar,
    ItemComments, Map, MapEntry, Marked, Marker, NullScalar, ScalarStyle, Seq, StrScalar, Tag,
    TimestampScalar, Underscore, Value, ValueId, Warning, YamlData, YamlError, YamlResult,
    YamlVersion,
};

const MERGE_TAG: &str = "tag:yaml.org,2002:merge";
const VALUE_TAG: &str = "tag:yaml.org,2002:value";

const TIMESTAMP_PATTERN: &str = r"^[0-9][0-9][0-9][0-9]-[0-9][0-9]?-[0-9][0-9]?(?:(?:[Tt]|[ \t]+)[0-9][0-9]?:[0-9][0-9]:[0-9][0-9](?:\.[0-9]*)?(?:[ \t]*(?:Z|[-+][0-9][0-9]?(?::[0-9][0-9])?))?)?$";

fn err(problem: impl Into<String>, mark: Marker) -> YamlError {
    YamlError::Constructor(Marked::problem(problem, mark))
}

fn err_ctx(
    context: &str,
    context_mark: Marker,
    problem: impl Into<String>,
    mark: Marker,
) -> YamlError {
    YamlError::Constructor(Marked::contextual(context, context_mark, problem, mark))
}

fn duplicate(context: &str, first: Marker, key: &str, second: Marker) -> YamlError {
    YamlError::DuplicateKey(Marked::contextual(
        context,
        first,
        format!("found duplicate key {key:?}"),
        second,
    ))
}

/// A constructor function registered for a tag or tag prefix.
pub type ConstructFn<'a> = fn(&mut Constructor<'a>, NodeId) -> YamlResult<ValueId>;

pub struct Constructor<'a> {
    arena: &'a mut NodeArena,
    version: YamlVersion,
    preserve_quotes: bool,
    allow_duplicate_keys: bool,
    constructors: HashMap<String, ConstructFn<'a>>,
    multi_constructors: Vec<(String, ConstructFn<'a>)>,
    /// Nodes fully constructed, so aliases share one cell.
    constructed: HashMap<NodeId, ValueId>,
    /// Containers whose children are still being built; an alias back into
    /// one of these resolves to the cell under construction.
    in_progress: HashMap<NodeId, ValueId>,
    timestamp_re: Regex,
    data: YamlData,
    warnings: Vec<Warning>,
}

impl<'a> Constructor<'a> {
    #[must_use]
    pub fn new(
        arena: &'a mut NodeArena,
        version: YamlVersion,
        preserve_quotes: bool,
        allow_duplicate_keys: bool,
    ) -> Constructor<'a> {
        let defaults: [(&str, ConstructFn<'a>); 12] = [
            ("tag:yaml.org,2002:null", Self::construct_yaml_null),
            ("tag:yaml.org,2002:bool", Self::construct_yaml_bool),
            ("tag:yaml.org,2002:int", Self::construct_yaml_int),
            ("tag:yaml.org,2002:float", Self::construct_yaml_float),
            ("tag:yaml.org,2002:str", Self::construct_yaml_str),
            ("tag:yaml.org,2002:seq", Self::construct_yaml_seq),
            ("tag:yaml.org,2002:map", Self::construct_yaml_map),
            ("tag:yaml.org,2002:binary", Self::construct_yaml_binary),
            ("tag:yaml.org,2002:timestamp", Self::construct_yaml_timestamp),
            ("tag:yaml.org,2002:omap", Self::construct_yaml_omap),
            ("tag:yaml.org,2002:pairs", Self::construct_yaml_pairs),
            ("tag:yaml.org,2002:set", Self::construct_yaml_set),
        ];
        let mut constructors = HashMap::new();
        for (tag, construct) in defaults {
            constructors.insert(tag.to_string(), construct);
        }
        Constructor {
            arena,
            version,
            preserve_quotes,
            allow_duplicate_keys,
            constructors,
            multi_constructors: Vec::new(),
            constructed: HashMap::new(),
            in_progress: HashMap::new(),
            timestamp_re: Regex::new(TIMESTAMP_PATTERN).unwrap(),
            data: YamlData::new(),
            warnings: Vec::new(),
        }
    }

    /// Registers a constructor for an exact tag, replacing any default.
    pub fn add_constructor(&mut self, tag: impl Into<String>, construct: ConstructFn<'a>) {
        self.constructors.insert(tag.into(), construct);
    }

    /// Registers a constructor for every tag starting with `prefix`.
    pub fn add_multi_constructor(&mut self, prefix: impl Into<String>, construct: ConstructFn<'a>) {
        self.multi_constructors.push((prefix.into(), construct));
    }

    pub fn take_warnings(&mut self) -> Vec<Warning> {
        mem::take(&mut self.warnings)
    }

    /// Allocates a value in the document under construction. Custom
    /// constructors use this to return values of their own making.
    pub fn alloc(&mut self, value: Value) -> ValueId {
        self.data.alloc(value)
    }

    /// Builds the document value tree for one composed document.
    pub fn construct_document(&mut self, document: &ComposedDocument) -> YamlResult<YamlData> {
        self.data = YamlData::new();
        self.data.version = document.version;
        self.data.tag_directives = document.tags.clone();
        self.data.explicit_start = document.explicit_start;
        self.data.explicit_end = document.explicit_end;
        self.data.leading = document.leading.clone();
        let root = self.construct_object(document.root)?;
        self.data.set_root(root);
        // a scalar root has no parent entry to hold its comments
        let slots = mem::take(&mut self.arena.get_mut(document.root).comments);
        if !slots.is_empty() {
            let table = self.data.attrs_mut(root).comments_mut();
            table.own.pre.extend(slots.pre);
            if let Some(c) = slots.eol {
                if table.own.eol.is_none() {
                    table.own.eol = Some(c);
                } else {
                    table.end.push(c);
                }
            }
            table.end.extend(slots.post);
        }
        self.constructed.clear();
        self.in_progress.clear();
        Ok(mem::take(&mut self.data))
    }

    pub fn construct_object(&mut self, node: NodeId) -> YamlResult<ValueId> {
        if let Some(id) = self.constructed.get(&node) {
            return Ok(*id);
        }
        if let Some(id) = self.in_progress.get(&node) {
            return Ok(*id);
        }
        let construct = self.dispatch(&self.arena.get(node).tag);
        let id = construct(self, node)?;
        self.in_progress.remove(&node);
        self.constructed.insert(node, id);
        let start = self.arena.get(node).start;
        let anchor = self.arena.get(node).anchor.clone();
        let attrs = self.data.attrs_mut(id);
        attrs.line_col = Some((start.line, start.col));
        if let Some(name) = anchor {
            // anchors matching the dump template are dropped; they come
            // back renumbered when the aliases demand them
            if !templated_id(&name) {
                attrs.anchor = Some(Anchor {
                    name,
                    always_dump: true,
                });
            }
        }
        Ok(id)
    }

    fn dispatch(&self, tag: &str) -> ConstructFn<'a> {
        if let Some(construct) = self.constructors.get(tag) {
            return *construct;
        }
        for (prefix, construct) in &self.multi_constructors {
            if tag.starts_with(prefix.as_str()) {
                return *construct;
            }
        }
        Self::construct_undefined
    }

    // ------------------------------------------------------------------
    // scalars

    /// The scalar text of a node, with fold marks removed.
    pub fn scalar_text(&self, node: NodeId) -> YamlResult<(String, Marker)> {
        let current = self.arena.get(node);
        match &current.kind {
            NodeKind::Scalar { value, style } => {
                let text = if *style == ScalarStyle::Folded {
                    strip_fold_marks(value).0
                } else {
                    value.clone()
                };
                Ok((text, current.start))
            }
            kind => Err(err(
                format!("expected a scalar node, but found {}", kind.name()),
                current.start,
            )),
        }
    }

    /// A string scalar keeping style, fold positions and the block header
    /// comment. Quoting styles drop to plain unless kept by options or by
    /// `keep_style` (tagged scalars always keep theirs).
    fn string_scalar(&mut self, node: NodeId, keep_style: bool) -> YamlResult<StrScalar> {
        let (text, style) = match &self.arena.get(node).kind {
            NodeKind::Scalar { value, style } => (value.clone(), *style),
            kind => {
                return Err(err(
                    format!("expected a scalar node, but found {}", kind.name()),
                    self.arena.get(node).start,
                ))
            }
        };
        let mut scalar = match style {
            ScalarStyle::Folded => {
                let (value, fold_pos) = strip_fold_marks(&text);
                StrScalar {
                    value,
                    style,
                    fold_pos,
                    header_comment: None,
                }
            }
            ScalarStyle::SingleQuote | ScalarStyle::DoubleQuote
                if !keep_style && !self.preserve_quotes =>
            {
                StrScalar::new(text)
            }
            _ => StrScalar::styled(text, style),
        };
        if matches!(scalar.style, ScalarStyle::Literal | ScalarStyle::Folded) {
            scalar.header_comment = self.arena.get_mut(node).comments.eol.take();
        }
        Ok(scalar)
    }

    pub fn construct_yaml_null(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let (text, _) = self.scalar_text(node)?;
        Ok(self.data.alloc(Value::Null(NullScalar::new(text))))
    }

    pub fn construct_yaml_bool(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let (text, mark) = self.scalar_text(node)?;
        let value = match text.to_lowercase().as_str() {
            "yes" | "y" | "true" | "on" => true,
            "no" | "n" | "false" | "off" => false,
            _ => {
                return Err(err(
                    format!("failed to construct a boolean from {text:?}"),
                    mark,
                ))
            }
        };
        Ok(self.data.alloc(Value::Bool(BoolScalar::new(value, text))))
    }

    pub fn construct_yaml_int(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let (text, mark) = self.scalar_text(node)?;
        let scalar = self.int_scalar(&text, mark)?;
        Ok(self.data.alloc(Value::Int(scalar)))
    }

    fn int_scalar(&self, text: &str, mark: Marker) -> YamlResult<IntScalar> {
        let neg = text.starts_with('-');
        let unsigned = match text.strip_prefix('-') {
            Some(rest) => rest,
            None => text.strip_prefix('+').unwrap_or(text),
        };
        let digits: String = unsigned.chars().filter(|c| *c != '_').collect();
        if digits.is_empty() {
            return Err(err(
                format!("failed to construct an integer from {text:?}"),
                mark,
            ));
        }
        if digits == "0" {
            return Ok(IntScalar::plain(0));
        }
        if let Some(body) = digits.strip_prefix("0b") {
            return Ok(IntScalar {
                value: parse_radix(body, 2, neg, text, mark)?,
                radix: IntRadix::Binary,
                width: prefixed_width(body, neg, self.version),
                underscore: prefixed_underscore(text, unsigned),
            });
        }
        if let Some(body) = digits.strip_prefix("0x") {
            let caps = body
                .chars()
                .find(char::is_ascii_alphabetic)
                .map(|c| c.is_ascii_uppercase())
                .unwrap_or(false);
            return Ok(IntScalar {
                value: parse_radix(body, 16, neg, text, mark)?,
                radix: IntRadix::Hex { caps },
                width: prefixed_width(body, neg, self.version),
                underscore: prefixed_underscore(text, unsigned),
            });
        }
        if let Some(body) = digits.strip_prefix("0o") {
            return Ok(IntScalar {
                value: parse_radix(body, 8, neg, text, mark)?,
                radix: IntRadix::Octal,
                width: prefixed_width(body, neg, self.version),
                underscore: prefixed_underscore(text, unsigned),
            });
        }
        if self.version == (1, 1) && digits.starts_with('0') {
            return Ok(IntScalar {
                value: parse_radix(&digits, 8, neg, text, mark)?,
                radix: IntRadix::Octal,
                width: None,
                underscore: underscore_shape(text),
            });
        }
        if self.version == (1, 1) && digits.contains(':') {
            return Ok(IntScalar::plain(self.sexagesimal_int(&digits, neg, text, mark)?));
        }
        if digits.starts_with('0') {
            // not octal under 1.2, an integer with leading zeros
            let mut underscore = underscore_shape(text);
            if let Some(u) = underscore.as_mut() {
                u.trailing = text.len() > 1 && text.ends_with('_');
            }
            return Ok(IntScalar {
                value: parse_radix(&digits, 10, neg, text, mark)?,
                radix: IntRadix::Decimal,
                width: Some(digits.len() + usize::from(neg)),
                underscore,
            });
        }
        if let Some(mut u) = underscore_shape(text) {
            u.trailing = text.len() > 1 && text.ends_with('_');
            return Ok(IntScalar {
                value: parse_radix(&digits, 10, neg, text, mark)?,
                radix: IntRadix::Decimal,
                width: None,
                underscore: Some(u),
            });
        }
        Ok(IntScalar::plain(parse_radix(&digits, 10, neg, text, mark)?))
    }

    fn sexagesimal_int(
        &self,
        digits: &str,
        neg: bool,
        text: &str,
        mark: Marker,
    ) -> YamlResult<i64> {
        let mut value = 0i64;
        for part in digits.split(':') {
            let digit: i64 = part
                .parse()
                .map_err(|_| err(format!("failed to construct an integer from {text:?}"), mark))?;
            value = value
                .checked_mul(60)
                .and_then(|v| v.checked_add(digit))
                .ok_or_else(|| {
                    err(format!("failed to construct an integer from {text:?}"), mark)
                })?;
        }
        Ok(if neg { -value } else { value })
    }

    pub fn construct_yaml_float(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let (text, mark) = self.scalar_text(node)?;
        let scalar = self.float_scalar(&text, mark)?;
        Ok(self.data.alloc(Value::Float(scalar)))
    }

    fn float_scalar(&mut self, text: &str, mark: Marker) -> YamlResult<FloatScalar> {
        let lowered: String = text.to_lowercase().chars().filter(|c| *c != '_').collect();
        let neg = lowered.starts_with('-');
        let m_sign = lowered.chars().next().filter(|c| matches!(c, '+' | '-'));
        let body = match m_sign {
            Some(_) => &lowered[1..],
            None => lowered.as_str(),
        };
        if body == ".inf" {
            let value = if neg { f64::NEG_INFINITY } else { f64::INFINITY };
            return Ok(FloatScalar::plain(value));
        }
        if body == ".nan" {
            return Ok(FloatScalar::plain(f64::NAN));
        }
        if self.version == (1, 1) && body.contains(':') {
            let mut value = 0.0f64;
            for part in body.split(':') {
                let digit: f64 = part.parse().map_err(|_| {
                    err(format!("failed to construct a float from {text:?}"), mark)
                })?;
                value = value * 60.0 + digit;
            }
            return Ok(FloatScalar::plain(if neg { -value } else { value }));
        }
        let value: f64 = lowered
            .parse()
            .map_err(|_| err(format!("failed to construct a float from {text:?}"), mark))?;
        if let Some((mantissa, exponent, letter)) = split_exponent(text) {
            if self.version == (1, 1) && !mantissa.contains('.') {
                let warning = Warning::MantissaNoDot {
                    value: text.to_string(),
                    mark,
                };
                tracing::warn!("{warning}");
                self.warnings.push(warning);
            }
            let mantissa_digits: String = mantissa
                .to_lowercase()
                .chars()
                .filter(|c| *c != '_')
                .collect();
            let trimmed = mantissa_digits
                .strip_prefix('-')
                .or_else(|| mantissa_digits.strip_prefix('+'))
                .unwrap_or(&mantissa_digits);
            return Ok(FloatScalar {
                value,
                width: trimmed.chars().count(),
                prec: mantissa.find('.').map(|i| i as i32).unwrap_or(-1),
                m_sign,
                m_lead0: leading_zeros(trimmed),
                exponent: Some(FloatExponent {
                    letter,
                    width: exponent.chars().count(),
                    sign: exponent.starts_with('+') || exponent.starts_with('-'),
                }),
            });
        }
        let Some(dot) = text.find('.') else {
            // an explicit float tag on a bare integer spelling
            return Ok(FloatScalar::plain(value));
        };
        Ok(FloatScalar {
            value,
            width: text.chars().count(),
            prec: dot as i32,
            m_sign,
            m_lead0: leading_zeros(text),
            exponent: None,
        })
    }

    pub fn construct_yaml_str(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let scalar = self.string_scalar(node, false)?;
        Ok(self.data.alloc(Value::Str(scalar)))
    }

    pub fn construct_yaml_binary(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let mark = self.arena.get(node).start;
        let scalar = self.string_scalar(node, true)?;
        if let Some(bad) = scalar.value.chars().find(|c| !is_base64(*c)) {
            return Err(err(
                format!("failed to decode base64 data: invalid character {bad:?}"),
                mark,
            ));
        }
        let id = self.data.alloc(Value::Str(scalar));
        self.data.attrs_mut(id).tag = Some(Tag::new("tag:yaml.org,2002:binary"));
        Ok(id)
    }

    pub fn construct_yaml_timestamp(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let (text, mark) = self.scalar_text(node)?;
        if !self.timestamp_re.is_match(&text) {
            return Err(err(
                format!("failed to construct timestamp from {text:?}"),
                mark,
            ));
        }
        Ok(self
            .data
            .alloc(Value::Timestamp(TimestampScalar::new(text))))
    }

    // ------------------------------------------------------------------
    // collections

    pub fn construct_yaml_seq(&mut self, node: NodeId) -> YamlResult<ValueId> {
        self.construct_sequence(node)
    }

    fn construct_sequence(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let (items, flow) = match &self.arena.get(node).kind {
            NodeKind::Sequence { items, flow } => (items.clone(), *flow),
            kind => {
                return Err(err(
                    format!("expected a sequence node, but found {}", kind.name()),
                    self.arena.get(node).start,
                ))
            }
        };
        let id = self.data.alloc(Value::Seq(Seq::default()));
        self.in_progress.insert(node, id);
        self.file_container_comments(node, id);
        if !items.is_empty() {
            self.data.attrs_mut(id).flow = Some(flow);
        }
        for (index, child) in items.iter().copied().enumerate() {
            let start = self.arena.get(child).start;
            let item = self.construct_object(child)?;
            self.data.seq_push(id, item);
            self.data.attrs_mut(id).positions_mut().insert(
                index,
                EntryPosition {
                    key: (start.line, start.col),
                    value: None,
                },
            );
            self.file_entry_comments(child, id, index, false);
        }
        Ok(id)
    }

    pub fn construct_yaml_map(&mut self, node: NodeId) -> YamlResult<ValueId> {
        self.construct_mapping(node, "while constructing a mapping", true)
    }

    pub fn construct_yaml_set(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let id = self.construct_mapping(node, "while constructing a set", false)?;
        self.data.attrs_mut(id).tag = Some(Tag::new("tag:yaml.org,2002:set"));
        Ok(id)
    }

    fn construct_mapping(
        &mut self,
        node: NodeId,
        context: &'static str,
        flatten: bool,
    ) -> YamlResult<ValueId> {
        let start = self.arena.get(node).start;
        match &self.arena.get(node).kind {
            NodeKind::Mapping { .. } => {}
            kind => {
                return Err(err(
                    format!("expected a mapping node, but found {}", kind.name()),
                    start,
                ))
            }
        }
        let merges = if flatten {
            self.flatten_mapping(node)?
        } else {
            Vec::new()
        };
        let (pairs, flow) = match &self.arena.get(node).kind {
            NodeKind::Mapping { pairs, flow } => (pairs.clone(), *flow),
            _ => (Vec::new(), false),
        };
        let id = self.data.alloc(Value::Map(Map::default()));
        self.in_progress.insert(node, id);
        self.file_container_comments(node, id);
        if !(pairs.is_empty() && merges.is_empty()) {
            self.data.attrs_mut(id).flow = Some(flow);
        }
        let mut key_marks: Vec<Marker> = Vec::new();
        for (key_node, value_node) in pairs {
            let key_mark = self.arena.get(key_node).start;
            let value_mark = self.arena.get(value_node).start;
            let key = self.construct_object(key_node)?;
            let value = self.construct_object(value_node)?;
            if let Some(existing) = self.data.map_find(id, key) {
                let key_text = self.key_text(key_node);
                let first = key_marks.get(existing).copied().unwrap_or(start);
                if !self.allow_duplicate_keys {
                    return Err(duplicate(context, first, &key_text, key_mark));
                }
                let warning = Warning::DuplicateKeyAllowed {
                    key: key_text,
                    first,
                    second: key_mark,
                };
                tracing::warn!("{warning}");
                self.warnings.push(warning);
                continue;
            }
            let index = match self.data.value_mut(id) {
                Value::Map(map) => {
                    map.entries.push(MapEntry {
                        key,
                        value,
                        own: true,
                    });
                    map.entries.len() - 1
                }
                _ => 0,
            };
            key_marks.push(key_mark);
            self.data.attrs_mut(id).positions_mut().insert(
                index,
                EntryPosition {
                    key: (key_mark.line, key_mark.col),
                    value: Some((value_mark.line, value_mark.col)),
                },
            );
            self.file_entry_comments(key_node, id, index, true);
            self.file_entry_comments(value_node, id, index, false);
        }
        // keys made visible by the merges, earliest source first; written
        // keys shadow them all
        for (_, merged) in &merges {
            let entries = match self.data.value(*merged) {
                Value::Map(map) => map.entries.clone(),
                _ => Vec::new(),
            };
            for entry in entries {
                if self.data.map_find(id, entry.key).is_none() {
                    if let Value::Map(map) = self.data.value_mut(id) {
                        map.entries.push(MapEntry {
                            key: entry.key,
                            value: entry.value,
                            own: false,
                        });
                    }
                }
            }
        }
        if let Value::Map(map) = self.data.value_mut(id) {
            map.merges = merges;
        }
        Ok(id)
    }

    /// Removes `<<` pairs from the node, constructing each merged mapping,
    /// and retags `=` keys to plain strings.
    fn flatten_mapping(&mut self, node: NodeId) -> YamlResult<Vec<(usize, ValueId)>> {
        let start = self.arena.get(node).start;
        let mut merges: Vec<(usize, ValueId)> = Vec::new();
        let mut first_merge = Marker::default();
        let mut index = 0usize;
        loop {
            let (key_node, value_node) = match &self.arena.get(node).kind {
                NodeKind::Mapping { pairs, .. } if index < pairs.len() => pairs[index],
                _ => break,
            };
            let key_tag = self.arena.get(key_node).tag.clone();
            if key_tag == MERGE_TAG {
                let mark = self.arena.get(key_node).start;
                if let NodeKind::Mapping { pairs, .. } = &mut self.arena.get_mut(node).kind {
                    pairs.remove(index);
                }
                if !merges.is_empty() {
                    if !self.allow_duplicate_keys {
                        return Err(duplicate(
                            "while constructing a mapping",
                            first_merge,
                            "<<",
                            mark,
                        ));
                    }
                    let warning = Warning::DuplicateKeyAllowed {
                        key: "<<".to_string(),
                        first: first_merge,
                        second: mark,
                    };
                    tracing::warn!("{warning}");
                    self.warnings.push(warning);
                    continue;
                }
                first_merge = mark;
                let sub_items = match &self.arena.get(value_node).kind {
                    NodeKind::Mapping { .. } => None,
                    NodeKind::Sequence { items, .. } => Some(items.clone()),
                    kind => {
                        return Err(err_ctx(
                            "while constructing a mapping",
                            start,
                            format!(
                                "expected a mapping or list of mappings for merging, but found {}",
                                kind.name()
                            ),
                            self.arena.get(value_node).start,
                        ));
                    }
                };
                match sub_items {
                    None => {
                        let merged = self.construct_object(value_node)?;
                        merges.push((index, merged));
                    }
                    Some(items) => {
                        for sub in items {
                            if !matches!(self.arena.get(sub).kind, NodeKind::Mapping { .. }) {
                                return Err(err_ctx(
                                    "while constructing a mapping",
                                    start,
                                    format!(
                                        "expected a mapping for merging, but found {}",
                                        self.arena.get(sub).kind.name()
                                    ),
                                    self.arena.get(sub).start,
                                ));
                            }
                            let merged = self.construct_object(sub)?;
                            merges.push((index, merged));
                        }
                    }
                }
            } else if key_tag == VALUE_TAG {
                self.arena.get_mut(key_node).tag = DEFAULT_SCALAR_TAG.to_string();
                index += 1;
            } else {
                index += 1;
            }
        }
        Ok(merges)
    }

    pub fn construct_yaml_omap(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let id = self.construct_ordered_pairs(node, "while constructing an ordered map", true)?;
        self.data.attrs_mut(id).tag = Some(Tag::new("tag:yaml.org,2002:omap"));
        Ok(id)
    }

    pub fn construct_yaml_pairs(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let id = self.construct_ordered_pairs(node, "while constructing pairs", false)?;
        self.data.attrs_mut(id).tag = Some(Tag::new("tag:yaml.org,2002:pairs"));
        Ok(id)
    }

    /// A sequence of single-entry mappings; `check_keys` additionally
    /// rejects repeated keys across the items.
    fn construct_ordered_pairs(
        &mut self,
        node: NodeId,
        context: &'static str,
        check_keys: bool,
    ) -> YamlResult<ValueId> {
        let start = self.arena.get(node).start;
        let (items, flow) = match &self.arena.get(node).kind {
            NodeKind::Sequence { items, flow } => (items.clone(), *flow),
            kind => {
                return Err(err_ctx(
                    context,
                    start,
                    format!("expected a sequence, but found {}", kind.name()),
                    start,
                ))
            }
        };
        let id = self.data.alloc(Value::Seq(Seq::default()));
        self.in_progress.insert(node, id);
        self.file_container_comments(node, id);
        if !items.is_empty() {
            self.data.attrs_mut(id).flow = Some(flow);
        }
        let mut seen: Vec<(ValueId, Marker)> = Vec::new();
        for (index, sub) in items.iter().copied().enumerate() {
            let sub_mark = self.arena.get(sub).start;
            let pair_count = match &self.arena.get(sub).kind {
                NodeKind::Mapping { pairs, .. } => pairs.len(),
                kind => {
                    return Err(err_ctx(
                        context,
                        start,
                        format!("expected a mapping of length 1, but found {}", kind.name()),
                        sub_mark,
                    ))
                }
            };
            if pair_count != 1 {
                return Err(err_ctx(
                    context,
                    start,
                    format!("expected a single mapping item, but found {pair_count} items"),
                    sub_mark,
                ));
            }
            let item = self.construct_object(sub)?;
            if check_keys {
                let key = match self.data.value(item) {
                    Value::Map(map) => map.entries.first().map(|e| e.key),
                    _ => None,
                };
                if let Some(key) = key {
                    if let Some((_, first)) = seen
                        .iter()
                        .find(|(other, _)| self.data.value_eq(*other, key))
                    {
                        let text = match &self.arena.get(sub).kind {
                            NodeKind::Mapping { pairs, .. } => pairs
                                .first()
                                .map(|(k, _)| self.key_text(*k))
                                .unwrap_or_default(),
                            _ => String::new(),
                        };
                        return Err(duplicate(context, *first, &text, sub_mark));
                    }
                    seen.push((key, sub_mark));
                }
            }
            self.data.seq_push(id, item);
            self.data.attrs_mut(id).positions_mut().insert(
                index,
                EntryPosition {
                    key: (sub_mark.line, sub_mark.col),
                    value: None,
                },
            );
            self.file_entry_comments(sub, id, index, false);
        }
        Ok(id)
    }

    /// The fallback for tags without a registered constructor: build by
    /// node kind and keep the tag on the value.
    fn construct_undefined(&mut self, node: NodeId) -> YamlResult<ValueId> {
        let tag = self.arena.get(node).tag.clone();
        let id = if matches!(self.arena.get(node).kind, NodeKind::Scalar { .. }) {
            let scalar = self.string_scalar(node, true)?;
            self.data.alloc(Value::Str(scalar))
        } else if matches!(self.arena.get(node).kind, NodeKind::Sequence { .. }) {
            self.construct_sequence(node)?
        } else {
            self.construct_mapping(node, "while constructing a mapping", true)?
        };
        self.data.attrs_mut(id).tag = Some(Tag::new(tag));
        Ok(id)
    }

    // ------------------------------------------------------------------
    // comments and positions

    /// Files a container node's own comment slots into its value's table.
    fn file_container_comments(&mut self, node: NodeId, id: ValueId) {
        let slots = mem::take(&mut self.arena.get_mut(node).comments);
        if slots.is_empty() {
            return;
        }
        let table = self.data.attrs_mut(id).comments_mut();
        table.own.pre = slots.pre;
        table.own.eol = slots.eol;
        table.end = slots.post;
    }

    /// Files whatever comments remain on a child node into the parent's
    /// entry slot. Trailing runs fold onto the end-of-line chunk; their
    /// text starts with the newline that closes the value's own line, so
    /// emitting the chunk verbatim reproduces the source.
    fn file_entry_comments(&mut self, child: NodeId, id: ValueId, index: usize, key_side: bool) {
        let slots = mem::take(&mut self.arena.get_mut(child).comments);
        if slots.is_empty() {
            return;
        }
        let mut item = ItemComments {
            eol: slots.eol,
            pre: slots.pre,
        };
        for c in slots.post {
            match item.eol.as_mut() {
                None => item.eol = Some(c),
                Some(eol) => eol.value.push_str(&c.value),
            }
        }
        let entry = self.data.attrs_mut(id).comments_mut().entry_mut(index);
        if key_side {
            entry.key = item;
        } else {
            entry.value = item;
        }
    }

    fn key_text(&self, key_node: NodeId) -> String {
        match &self.arena.get(key_node).kind {
            NodeKind::Scalar { value, .. } => value.clone(),
            kind => format!("<{}>", kind.name()),
        }
    }
}

fn parse_radix(digits: &str, radix: u32, neg: bool, text: &str, mark: Marker) -> YamlResult<i64> {
    let mut signed = String::new();
    if neg {
        signed.push('-');
    }
    signed.push_str(digits);
    i64::from_str_radix(&signed, radix)
        .map_err(|_| err(format!("failed to construct an integer from {text:?}"), mark))
}

/// Leading zeros make a radix-prefixed integer width-padded, but only the
/// 1.2 dialect keeps the padding.
fn prefixed_width(body: &str, neg: bool, version: YamlVersion) -> Option<usize> {
    if version > (1, 1) && body.starts_with('0') {
        Some(body.len() + usize::from(neg))
    } else {
        None
    }
}

/// Underscore shape for `0b`/`0x`/`0o` spellings; `unsigned` is the text
/// behind the sign, so the prefix sits at a fixed offset.
fn prefixed_underscore(text: &str, unsigned: &str) -> Option<Underscore> {
    let mut underscore = underscore_shape(text)?;
    underscore.leading = unsigned.as_bytes().get(2) == Some(&b'_');
    underscore.trailing = unsigned.len() > 3 && unsigned.ends_with('_');
    Some(underscore)
}

/// The grouping interval is the digit count behind the last interior
/// underscore. Text with none (or only trailing ones) has no shape.
fn underscore_shape(text: &str) -> Option<Underscore> {
    let interior = text.trim_end_matches('_');
    let last = interior.rfind('_')?;
    Some(Underscore {
        every: interior.len() - last - 1,
        leading: false,
        trailing: false,
    })
}

fn split_exponent(text: &str) -> Option<(&str, &str, char)> {
    if let Some((mantissa, exponent)) = text.split_once('e') {
        return Some((mantissa, exponent, 'e'));
    }
    if let Some((mantissa, exponent)) = text.split_once('E') {
        return Some((mantissa, exponent, 'E'));
    }
    None
}

fn leading_zeros(mantissa: &str) -> usize {
    let mut count = 0;
    for ch in mantissa.chars() {
        if ch == '0' {
            count += 1;
        } else if ch != '.' {
            break;
        }
    }
    count
}

/// Splits folded-scalar text from its fold marks; each mark records where
/// a source line break became the following space.
fn strip_fold_marks(value: &str) -> (String, Vec<usize>) {
    let mut out = String::with_capacity(value.len());
    let mut fold_pos = Vec::new();
    let mut kept = 0usize;
    for ch in value.chars() {
        if ch == '\u{7}' {
            fold_pos.push(kept);
        } else {
            out.push(ch);
            kept += 1;
        }
    }
    (out, fold_pos)
}

fn is_base64(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=' | ' ' | '\n' | '\t' | '\r')
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::composer::Composer;
    use crate::parser::Parser;
    use crate::reader::Reader;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;
    use rstest::rstest;
    use yarrow_common::DEFAULT_YAML_VERSION;

    fn construct_with(
        input: &str,
        preserve_quotes: bool,
        allow_duplicate_keys: bool,
    ) -> (YamlData, Vec<Warning>) {
        let reader = Reader::from_str(input).unwrap();
        let parser = Parser::new(Scanner::new(reader, DEFAULT_YAML_VERSION));
        let mut composer = Composer::new(parser, Resolver::new(DEFAULT_YAML_VERSION));
        let document = composer.get_single_node().unwrap().unwrap();
        let mut warnings = composer.take_warnings();
        let version = document.version.unwrap_or(DEFAULT_YAML_VERSION);
        let mut constructor = Constructor::new(
            composer.arena_mut(),
            version,
            preserve_quotes,
            allow_duplicate_keys,
        );
        let data = constructor.construct_document(&document).unwrap();
        warnings.append(&mut constructor.take_warnings());
        (data, warnings)
    }

    fn load(input: &str) -> YamlData {
        construct_with(input, false, false).0
    }

    fn load_err(input: &str) -> YamlError {
        let reader = Reader::from_str(input).unwrap();
        let parser = Parser::new(Scanner::new(reader, DEFAULT_YAML_VERSION));
        let mut composer = Composer::new(parser, Resolver::new(DEFAULT_YAML_VERSION));
        let document = composer.get_single_node().unwrap().unwrap();
        let version = document.version.unwrap_or(DEFAULT_YAML_VERSION);
        let mut constructor = Constructor::new(composer.arena_mut(), version, false, false);
        match constructor.construct_document(&document) {
            Err(error) => error,
            Ok(_) => panic!("expected an error for {input:?}"),
        }
    }

    fn get(data: &YamlData, key: &str) -> ValueId {
        data.map_get(data.root().unwrap(), key).unwrap()
    }

    #[test]
    fn scalars_construct_into_typed_values() {
        let data = load("n: ~\nb: true\ni: 42\nf: 2.5\ns: text\n");
        assert!(data.is_null(get(&data, "n")));
        assert_eq!(data.as_bool(get(&data, "b")), Some(true));
        assert_eq!(data.as_i64(get(&data, "i")), Some(42));
        assert_eq!(data.as_f64(get(&data, "f")), Some(2.5));
        assert_eq!(data.as_str(get(&data, "s")), Some("text"));
    }

    #[rstest]
    #[case("42")]
    #[case("-7")]
    #[case("007")]
    #[case("-0099")]
    #[case("0x1F")]
    #[case("0xdead")]
    #[case("0x00FF")]
    #[case("0o755")]
    #[case("0b1010")]
    #[case("1_000_000")]
    #[case("0x_FF")]
    #[case("12_34_56")]
    fn integer_spelling_survives(#[case] text: &str) {
        let data = load(&format!("v: {text}\n"));
        match data.value(get(&data, "v")) {
            Value::Int(scalar) => assert_eq!(scalar.render(DEFAULT_YAML_VERSION), text),
            other => panic!("expected an int for {text:?}, got {other:?}"),
        }
    }

    #[rstest]
    #[case("2.5")]
    #[case("-0.5")]
    #[case(".5")]
    #[case("5.")]
    #[case("00.25")]
    #[case("1.5e10")]
    #[case("2.47e-2")]
    #[case("-1.5E+3")]
    #[case("0.5e1")]
    #[case("1e5")]
    fn float_spelling_survives(#[case] text: &str) {
        let data = load(&format!("v: {text}\n"));
        match data.value(get(&data, "v")) {
            Value::Float(scalar) => assert_eq!(scalar.render(), text),
            other => panic!("expected a float for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn bool_and_null_keep_their_spelling() {
        let data = load("a: True\nb: Null\n");
        match data.value(get(&data, "a")) {
            Value::Bool(scalar) => {
                assert!(scalar.value);
                assert_eq!(scalar.text, "True");
            }
            other => panic!("expected a bool, got {other:?}"),
        }
        match data.value(get(&data, "b")) {
            Value::Null(scalar) => assert_eq!(scalar.text, "Null"),
            other => panic!("expected a null, got {other:?}"),
        }
    }

    #[test]
    fn quoted_strings_drop_style_unless_preserved() {
        let (data, _) = construct_with("q: 'hi'\n", false, false);
        match data.value(get(&data, "q")) {
            Value::Str(scalar) => assert_eq!(scalar.style, ScalarStyle::Plain),
            other => panic!("expected a string, got {other:?}"),
        }
        let (data, _) = construct_with("q: 'hi'\n", true, false);
        match data.value(get(&data, "q")) {
            Value::Str(scalar) => assert_eq!(scalar.style, ScalarStyle::SingleQuote),
            other => panic!("expected a string, got {other:?}"),
        }
    }

    #[test]
    fn folded_scalars_record_fold_positions() {
        let data = load("v: >\n  a b\n  c\n");
        match data.value(get(&data, "v")) {
            Value::Str(scalar) => {
                assert_eq!(scalar.value, "a b c\n");
                assert_eq!(scalar.style, ScalarStyle::Folded);
                assert_eq!(scalar.fold_pos, vec![3]);
            }
            other => panic!("expected a string, got {other:?}"),
        }
    }

    #[test]
    fn block_scalar_header_comment_is_kept() {
        let data = load("v: | # note\n  text\n");
        match data.value(get(&data, "v")) {
            Value::Str(scalar) => {
                assert_eq!(scalar.value, "text\n");
                let header = scalar.header_comment.as_ref().unwrap();
                assert_eq!(header.value, " # note");
            }
            other => panic!("expected a string, got {other:?}"),
        }
    }

    #[test]
    fn merge_keys_become_shared_entries() {
        let data = load("base: &b\n  x: 1\n  y: 2\nchild:\n  <<: *b\n  y: 3\n");
        let base = get(&data, "base");
        let child = get(&data, "child");
        assert_eq!(data.as_i64(data.map_get(child, "y").unwrap()), Some(3));
        assert_eq!(
            data.map_get(child, "x"),
            data.map_get(base, "x"),
            "merged entries share the base cells"
        );
        assert!(data.map_key_is_own(child, "y"));
        assert!(!data.map_key_is_own(child, "x"));
        match data.value(child) {
            Value::Map(map) => assert_eq!(map.merges.len(), 1),
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn earlier_merge_sources_win() {
        let data = load("a: &a {x: 1}\nb: &b {x: 2, z: 9}\nc:\n  <<: [*a, *b]\n");
        let c = get(&data, "c");
        assert_eq!(data.as_i64(data.map_get(c, "x").unwrap()), Some(1));
        assert_eq!(data.as_i64(data.map_get(c, "z").unwrap()), Some(9));
        match data.value(c) {
            Value::Map(map) => {
                assert_eq!(map.merges.len(), 2);
                assert_eq!(map.merges[0].0, 0);
                assert_eq!(map.merges[1].0, 0);
            }
            other => panic!("expected a map, got {other:?}"),
        }
    }

    #[test]
    fn second_merge_key_is_a_duplicate() {
        let error = load_err("m:\n  <<: {x: 1}\n  <<: {y: 2}\n");
        match error {
            YamlError::DuplicateKey(marked) => {
                assert!(marked.problem.contains("found duplicate key \"<<\""));
            }
            other => panic!("expected a duplicate key error, got {other:?}"),
        }
    }

    #[test]
    fn merging_a_scalar_is_an_error() {
        let error = load_err("m:\n  <<: 5\n");
        match error {
            YamlError::Constructor(marked) => {
                assert!(marked
                    .problem
                    .contains("expected a mapping or list of mappings for merging, but found scalar"));
            }
            other => panic!("expected a constructor error, got {other:?}"),
        }
        let error = load_err("m:\n  <<: [1]\n");
        match error {
            YamlError::Constructor(marked) => {
                assert!(marked
                    .problem
                    .contains("expected a mapping for merging, but found scalar"));
            }
            other => panic!("expected a constructor error, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_keys_are_an_error_by_default() {
        let error = load_err("a: 1\na: 2\n");
        match error {
            YamlError::DuplicateKey(marked) => {
                assert!(marked.problem.contains("found duplicate key \"a\""));
                assert_eq!(marked.context.as_deref(), Some("while constructing a mapping"));
            }
            other => panic!("expected a duplicate key error, got {other:?}"),
        }
    }

    #[test]
    fn allowed_duplicates_keep_the_first_value() {
        let (data, warnings) = construct_with("a: 1\na: 2\n", false, true);
        assert_eq!(data.as_i64(get(&data, "a")), Some(1));
        assert!(matches!(
            warnings.as_slice(),
            [Warning::DuplicateKeyAllowed { key, .. }] if key == "a"
        ));
    }

    #[test]
    fn aliases_share_one_value_cell() {
        let data = load("x: &k {v: 1}\ny: *k\n");
        assert_eq!(get(&data, "x"), get(&data, "y"));
        let anchored = data.attrs(get(&data, "x"));
        assert_eq!(anchored.anchor.as_ref().map(|a| a.name.as_str()), Some("k"));
    }

    #[test]
    fn a_cycle_constructs_to_its_own_cell() {
        let data = load("&a\nself: *a\n");
        let root = data.root().unwrap();
        assert_eq!(data.map_get(root, "self"), Some(root));
    }

    #[test]
    fn template_anchor_names_are_dropped() {
        let data = load("x: &id001 1\ny: *id001\n");
        assert!(data.attrs(get(&data, "x")).anchor.is_none());
        assert_eq!(get(&data, "x"), get(&data, "y"));
    }

    #[test]
    fn comments_file_into_the_parent_table() {
        let data = load("a: [1]\n# pre\nb: 2\n");
        let root = data.root().unwrap();
        let table = data.attrs(root).comments().unwrap();
        let entry = table.entries.get(&1).unwrap();
        assert_eq!(entry.key.pre.len(), 1);
        assert_eq!(entry.key.pre[0].value, "# pre\n");
        let seq = get(&data, "a");
        assert!(data.attrs(seq).comments().is_none());
    }

    #[test]
    fn a_line_comment_rides_the_value_it_follows() {
        let data = load("a: [1, 2] # note\nb: 2\n");
        let seq = get(&data, "a");
        let own = data.attrs(seq).comments().unwrap();
        assert_eq!(own.own.eol.as_ref().unwrap().value, "# note\n");
    }

    #[test]
    fn a_comment_run_merges_onto_the_line_it_starts() {
        let data = load("a: 1 # x\n\n# pre\nb: 2\n");
        let root = data.root().unwrap();
        let table = data.attrs(root).comments().unwrap();
        let entry = table.entries.get(&0).unwrap();
        assert_eq!(entry.value.eol.as_ref().unwrap().value, "# x\n\n# pre\n");
        assert!(table.entries.get(&1).is_none());
    }

    #[test]
    fn scalar_trailing_run_folds_onto_the_entry() {
        let data = load("a: 1\n# tail\nb: 2\n");
        let root = data.root().unwrap();
        let table = data.attrs(root).comments().unwrap();
        let entry = table.entries.get(&0).unwrap();
        assert_eq!(entry.value.eol.as_ref().unwrap().value, "\n# tail\n");
    }

    #[test]
    fn container_end_run_lands_in_its_table() {
        let data = load("m:\n  x: [1]\n  # tail\n\nnext: 2\n");
        let m = get(&data, "m");
        let table = data.attrs(m).comments().unwrap();
        assert_eq!(table.end.len(), 1);
        assert_eq!(table.end[0].value, "# tail\n\n");
        assert_eq!(table.end[0].start.col, 2);
    }

    #[test]
    fn positions_record_key_and_value_marks() {
        let data = load("a: 1\nb: 2\n");
        let root = data.root().unwrap();
        let positions = data.attrs(root).positions().unwrap();
        assert_eq!(
            positions.get(&0),
            Some(&EntryPosition {
                key: (0, 0),
                value: Some((0, 3)),
            })
        );
        assert_eq!(
            positions.get(&1),
            Some(&EntryPosition {
                key: (1, 0),
                value: Some((1, 3)),
            })
        );
    }

    #[test]
    fn unknown_tags_keep_their_tag_and_shape() {
        let data = load("v: !thing {a: 1}\n");
        let v = get(&data, "v");
        assert_eq!(data.attrs(v).tag.as_ref().map(|t| t.text.as_str()), Some("!thing"));
        assert_eq!(data.as_i64(data.map_get(v, "a").unwrap()), Some(1));
    }

    #[test]
    fn value_key_is_retagged_to_a_string() {
        let data = load("m:\n  =: 1\n  b: 2\n");
        let m = get(&data, "m");
        assert_eq!(data.as_i64(data.map_get(m, "=").unwrap()), Some(1));
    }

    #[test]
    fn omap_checks_shape_and_duplicates() {
        let data = load("v: !!omap\n- a: 1\n- b: 2\n");
        let v = get(&data, "v");
        assert_eq!(
            data.attrs(v).tag.as_ref().map(|t| t.text.as_str()),
            Some("tag:yaml.org,2002:omap")
        );
        assert!(data.as_seq(v).is_some());

        match load_err("v: !!omap\n- a: 1\n- a: 2\n") {
            YamlError::DuplicateKey(marked) => {
                assert_eq!(
                    marked.context.as_deref(),
                    Some("while constructing an ordered map")
                );
            }
            other => panic!("expected a duplicate key error, got {other:?}"),
        }
        match load_err("v: !!omap {a: 1}\n") {
            YamlError::Constructor(marked) => {
                assert!(marked.problem.contains("expected a sequence, but found mapping"));
            }
            other => panic!("expected a constructor error, got {other:?}"),
        }
        match load_err("v: !!omap\n- a: 1\n  b: 2\n") {
            YamlError::Constructor(marked) => {
                assert!(marked
                    .problem
                    .contains("expected a single mapping item, but found 2 items"));
            }
            other => panic!("expected a constructor error, got {other:?}"),
        }
    }

    #[test]
    fn sets_check_duplicate_keys() {
        let data = load("v: !!set\n? a\n? b\n");
        let v = get(&data, "v");
        assert_eq!(
            data.attrs(v).tag.as_ref().map(|t| t.text.as_str()),
            Some("tag:yaml.org,2002:set")
        );
        assert!(data.is_null(data.map_get(v, "a").unwrap()));

        match load_err("v: !!set {a, a}\n") {
            YamlError::DuplicateKey(marked) => {
                assert_eq!(marked.context.as_deref(), Some("while constructing a set"));
            }
            other => panic!("expected a duplicate key error, got {other:?}"),
        }
    }

    #[test]
    fn timestamps_keep_their_text() {
        let data = load("t: 2001-12-15 02:59:43.10Z\n");
        match data.value(get(&data, "t")) {
            Value::Timestamp(scalar) => assert_eq!(scalar.text, "2001-12-15 02:59:43.10Z"),
            other => panic!("expected a timestamp, got {other:?}"),
        }
        match load_err("t: !!timestamp nope\n") {
            YamlError::Constructor(marked) => {
                assert!(marked.problem.contains("failed to construct timestamp"));
            }
            other => panic!("expected a constructor error, got {other:?}"),
        }
    }

    #[test]
    fn binary_keeps_text_and_tag() {
        let data = load("b: !!binary aGVsbG8=\n");
        let b = get(&data, "b");
        assert_eq!(
            data.attrs(b).tag.as_ref().map(|t| t.text.as_str()),
            Some("tag:yaml.org,2002:binary")
        );
        assert_eq!(data.as_str(b), Some("aGVsbG8="));
        match load_err("b: !!binary a(b\n") {
            YamlError::Constructor(marked) => {
                assert!(marked.problem.contains("failed to decode base64 data"));
            }
            other => panic!("expected a constructor error, got {other:?}"),
        }
    }

    #[test]
    fn the_dialect_changes_integer_readings() {
        let (data, _) = construct_with("%YAML 1.1\n---\no: 0755\ns: 1:30\nb: on\n", false, false);
        let o = get(&data, "o");
        assert_eq!(data.as_i64(o), Some(493));
        match data.value(o) {
            Value::Int(scalar) => assert_eq!(scalar.render((1, 1)), "0755"),
            other => panic!("expected an int, got {other:?}"),
        }
        assert_eq!(data.as_i64(get(&data, "s")), Some(90));
        assert_eq!(data.as_bool(get(&data, "b")), Some(true));
    }

    #[test]
    fn a_dotless_mantissa_warns_under_1_1() {
        let (data, warnings) = construct_with("%YAML 1.1\n---\nf: 1e6\n", false, false);
        assert_eq!(data.as_f64(get(&data, "f")), Some(1_000_000.0));
        assert!(matches!(
            warnings.as_slice(),
            [Warning::MantissaNoDot { value, .. }] if value == "1e6"
        ));
    }

    #[test]
    fn custom_constructors_extend_the_registry() {
        let reader = Reader::from_str("v: !card 7\n").unwrap();
        let parser = Parser::new(Scanner::new(reader, DEFAULT_YAML_VERSION));
        let mut composer = Composer::new(parser, Resolver::new(DEFAULT_YAML_VERSION));
        let document = composer.get_single_node().unwrap().unwrap();
        let mut constructor =
            Constructor::new(composer.arena_mut(), DEFAULT_YAML_VERSION, false, false);
        constructor.add_constructor("!card", |ctor, node| ctor.construct_yaml_int(node));
        let data = constructor.construct_document(&document).unwrap();
        assert_eq!(data.as_i64(get(&data, "v")), Some(7));
    }

    #[test]
    fn trailing_document_comments_reach_the_root_table() {
        let data = load("a: {x: 1}\n# after\n");
        let root = data.root().unwrap();
        let table = data.attrs(root).comments().unwrap();
        assert_eq!(table.end.len(), 1);
        assert_eq!(table.end[0].value, "# after\n");
    }
}
