//! Writes events out as YAML text.
//!
//! A mirror of the parser: an explicit state machine over a state stack,
//! driven by one event at a time. Events are buffered just far enough
//! ahead to decide how a construct opens (one event for a document, two
//! for a sequence, three for a mapping), which is what lets empty
//! collections collapse to `[]`/`{}` and single-pair flow mappings stay
//! on one line. Comment chunks carried on events are written back at
//! their recorded columns.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use crate::event::{Event, EventKind};
use yarrow_common::{Comment, Marker, ScalarStyle, YamlError, YamlResult, YamlVersion};

/// Keys longer than this are never written as simple keys.
const MAX_SIMPLE_KEY_LENGTH: usize = 128;

/// Marks a point in a folded scalar where the source broke the line.
const FOLD_MARK: char = '\u{7}';

fn err(problem: impl Into<String>) -> YamlError {
    YamlError::Emitter(problem.into())
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum State {
    StreamStart,
    FirstDocumentStart,
    DocumentStart,
    DocumentRoot,
    DocumentEnd,
    Nothing,
    FirstFlowSequenceItem,
    FlowSequenceItem,
    FirstFlowMappingKey,
    FlowMappingKey,
    FlowMappingSimpleValue,
    FlowMappingValue,
    FirstBlockSequenceItem,
    BlockSequenceItem,
    FirstBlockMappingKey,
    BlockMappingKey,
    BlockMappingSimpleValue,
    BlockMappingValue,
}

/// Output layout knobs. The defaults match the common two-space style.
#[derive(Clone, Copy, Debug)]
pub struct EmitOpts {
    pub width: usize,
    pub map_indent: usize,
    pub seq_indent: usize,
    /// Offset of the `-` inside a block sequence's indent.
    pub dash_offset: usize,
    pub allow_unicode: bool,
}

impl Default for EmitOpts {
    fn default() -> EmitOpts {
        EmitOpts {
            width: 80,
            map_indent: 2,
            seq_indent: 2,
            dash_offset: 0,
            allow_unicode: true,
        }
    }
}

struct ScalarAnalysis {
    value: String,
    empty: bool,
    multiline: bool,
    allow_flow_plain: bool,
    allow_block_plain: bool,
    allow_single_quoted: bool,
    allow_block: bool,
}

pub struct Emitter<W> {
    writer: W,
    opts: EmitOpts,
    state: State,
    states: Vec<State>,
    events: VecDeque<Event>,
    event: Option<Event>,
    indents: Vec<Option<usize>>,
    indent: Option<usize>,
    flow_level: usize,
    root_context: bool,
    mapping_context: bool,
    simple_key_context: bool,
    line: usize,
    column: usize,
    whitespace: bool,
    indention: bool,
    /// A plain root scalar or kept-chomp block scalar has been written,
    /// so a following document needs an explicit `...` first.
    open_ended: bool,
    tag_prefixes: HashMap<String, String>,
    prepared_anchor: Option<String>,
    prepared_tag: Option<String>,
    analysis: Option<ScalarAnalysis>,
    style: Option<ScalarStyle>,
}

impl<W: fmt::Write> Emitter<W> {
    pub fn new(writer: W, opts: EmitOpts) -> Emitter<W> {
        Emitter {
            writer,
            opts,
            state: State::StreamStart,
            states: Vec::new(),
            events: VecDeque::new(),
            event: None,
            indents: Vec::new(),
            indent: None,
            flow_level: 0,
            root_context: false,
            mapping_context: false,
            simple_key_context: false,
            line: 0,
            column: 0,
            whitespace: true,
            indention: true,
            open_ended: false,
            tag_prefixes: default_tag_prefixes(),
            prepared_anchor: None,
            prepared_tag: None,
            analysis: None,
            style: None,
        }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    pub fn emit(&mut self, event: Event) -> YamlResult<()> {
        self.events.push_back(event);
        while !self.need_more_events() {
            if let Some(event) = self.events.pop_front() {
                self.event = Some(event);
                self.run_state()?;
                self.event = None;
            }
        }
        Ok(())
    }

    fn need_more_events(&self) -> bool {
        let Some(first) = self.events.front() else {
            return true;
        };
        let count = match first.kind {
            EventKind::DocumentStart { .. } => 1,
            EventKind::SequenceStart { .. } => 2,
            EventKind::MappingStart { .. } => 3,
            _ => return false,
        };
        if self.events.len() > count {
            return false;
        }
        // an unfinished construct in the buffer means more is coming
        let mut level = 0i32;
        for event in self.events.iter().skip(1) {
            match event.kind {
                EventKind::DocumentStart { .. }
                | EventKind::SequenceStart { .. }
                | EventKind::MappingStart { .. } => level += 1,
                EventKind::DocumentEnd { .. }
                | EventKind::SequenceEnd
                | EventKind::MappingEnd => level -= 1,
                EventKind::StreamEnd => level = -1,
                _ => {}
            }
            if level < 0 {
                return false;
            }
        }
        true
    }

    fn run_state(&mut self) -> YamlResult<()> {
        match self.state {
            State::StreamStart => self.expect_stream_start(),
            State::FirstDocumentStart => self.expect_document_start(true),
            State::DocumentStart => self.expect_document_start(false),
            State::DocumentRoot => self.expect_document_root(),
            State::DocumentEnd => self.expect_document_end(),
            State::Nothing => Err(err(format!(
                "expected nothing, but got {:?}",
                self.event().kind
            ))),
            State::FirstFlowSequenceItem => self.expect_flow_sequence_item(true),
            State::FlowSequenceItem => self.expect_flow_sequence_item(false),
            State::FirstFlowMappingKey => self.expect_flow_mapping_key(true),
            State::FlowMappingKey => self.expect_flow_mapping_key(false),
            State::FlowMappingSimpleValue => self.expect_flow_mapping_simple_value(),
            State::FlowMappingValue => self.expect_flow_mapping_value(),
            State::FirstBlockSequenceItem => self.expect_block_sequence_item(true),
            State::BlockSequenceItem => self.expect_block_sequence_item(false),
            State::FirstBlockMappingKey => self.expect_block_mapping_key(true),
            State::BlockMappingKey => self.expect_block_mapping_key(false),
            State::BlockMappingSimpleValue => self.expect_block_mapping_value(true),
            State::BlockMappingValue => self.expect_block_mapping_value(false),
        }
    }

    fn event(&self) -> &Event {
        // run_state is only entered with a current event in place
        self.event.as_ref().unwrap_or_else(|| unreachable!())
    }

    fn take_state(&mut self) -> YamlResult<State> {
        self.states
            .pop()
            .ok_or_else(|| err("state stack underflow"))
    }

    // ------------------------------------------------------------------
    // stream and document states

    fn expect_stream_start(&mut self) -> YamlResult<()> {
        match self.event().kind {
            EventKind::StreamStart => {
                self.state = State::FirstDocumentStart;
                Ok(())
            }
            _ => Err(err(format!(
                "expected StreamStart, but got {:?}",
                self.event().kind
            ))),
        }
    }

    fn expect_document_start(&mut self, first: bool) -> YamlResult<()> {
        match &self.event().kind {
            EventKind::DocumentStart {
                explicit,
                version,
                tags,
            } => {
                let explicit = *explicit;
                let version = *version;
                let tags = tags.clone();
                let leading = self.event().comments.pre.clone();
                if (version.is_some() || tags.is_some()) && self.open_ended {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                for comment in &leading {
                    self.write_full_line_comment(comment)?;
                }
                if let Some(version) = version {
                    self.write_version_directive(version)?;
                }
                self.tag_prefixes = default_tag_prefixes();
                let mut had_tags = false;
                if let Some(tags) = &tags {
                    for (handle, prefix) in tags {
                        self.tag_prefixes.insert(prefix.clone(), handle.clone());
                        let handle = prepare_tag_handle(handle)?;
                        let prefix = prepare_tag_prefix(prefix)?;
                        self.write_indicator("%TAG", true, false, false)?;
                        self.write_indicator(&handle, true, false, false)?;
                        self.write_indicator(&prefix, true, false, false)?;
                        self.write_line_break()?;
                        had_tags = true;
                    }
                }
                let implicit = first
                    && !explicit
                    && version.is_none()
                    && !had_tags
                    && !self.check_empty_document();
                if !implicit {
                    self.write_indent()?;
                    self.write_indicator("---", true, false, false)?;
                }
                self.state = State::DocumentRoot;
                Ok(())
            }
            EventKind::StreamEnd => {
                if self.open_ended {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                }
                self.state = State::Nothing;
                Ok(())
            }
            kind => Err(err(format!("expected DocumentStart, but got {kind:?}"))),
        }
    }

    fn check_empty_document(&self) -> bool {
        match self.events.front() {
            Some(Event {
                kind:
                    EventKind::Scalar {
                        anchor: None,
                        tag: _,
                        implicit: (true, _),
                        value,
                        ..
                    },
                ..
            }) => value.is_empty(),
            _ => false,
        }
    }

    fn expect_document_root(&mut self) -> YamlResult<()> {
        let pre = self.event().comments.pre.clone();
        for comment in &pre {
            self.write_full_line_comment(comment)?;
        }
        self.states.push(State::DocumentEnd);
        self.expect_node(true, false, false, false)
    }

    fn expect_document_end(&mut self) -> YamlResult<()> {
        match self.event().kind {
            EventKind::DocumentEnd { explicit } => {
                self.write_indent()?;
                if explicit {
                    self.write_indicator("...", true, false, false)?;
                    self.write_indent()?;
                    self.open_ended = false;
                }
                self.state = State::DocumentStart;
                Ok(())
            }
            _ => Err(err(format!(
                "expected DocumentEnd, but got {:?}",
                self.event().kind
            ))),
        }
    }

    // ------------------------------------------------------------------
    // node dispatch

    fn expect_node(
        &mut self,
        root: bool,
        sequence: bool,
        mapping: bool,
        simple_key: bool,
    ) -> YamlResult<()> {
        self.root_context = root;
        self.mapping_context = mapping;
        self.simple_key_context = simple_key;
        let _ = sequence;
        match &self.event().kind {
            EventKind::Alias { .. } => self.expect_alias(),
            EventKind::Scalar { .. } => {
                self.process_anchor("&")?;
                self.process_tag()?;
                self.expect_scalar()
            }
            EventKind::SequenceStart { flow, .. } => {
                let flow = *flow;
                self.process_anchor("&")?;
                self.process_tag()?;
                if flow || self.flow_level > 0 || self.check_empty_sequence() {
                    self.expect_flow_sequence()
                } else {
                    self.expect_block_sequence()
                }
            }
            EventKind::MappingStart { flow, .. } => {
                let flow = *flow;
                self.process_anchor("&")?;
                self.process_tag()?;
                if flow || self.flow_level > 0 || self.check_empty_mapping() {
                    self.expect_flow_mapping()
                } else {
                    self.expect_block_mapping()
                }
            }
            kind => Err(err(format!("expected a node event, but got {kind:?}"))),
        }
    }

    fn expect_alias(&mut self) -> YamlResult<()> {
        match &self.event().kind {
            EventKind::Alias { name } if !name.is_empty() => {
                let name = name.clone();
                let anchor = prepare_anchor(&name)?;
                self.write_indicator(&format!("*{anchor}"), true, false, false)?;
                self.state = self.take_state()?;
                Ok(())
            }
            _ => Err(err("anchor is not specified for alias")),
        }
    }

    fn expect_scalar(&mut self) -> YamlResult<()> {
        self.increase_indent(true, false, self.opts.map_indent);
        self.process_scalar()?;
        self.indent = self.indents.pop().unwrap_or(None);
        self.state = self.take_state()?;
        Ok(())
    }

    fn check_empty_sequence(&self) -> bool {
        matches!(self.event().kind, EventKind::SequenceStart { .. })
            && matches!(
                self.events.front().map(|e| &e.kind),
                Some(EventKind::SequenceEnd)
            )
    }

    fn check_empty_mapping(&self) -> bool {
        matches!(self.event().kind, EventKind::MappingStart { .. })
            && matches!(
                self.events.front().map(|e| &e.kind),
                Some(EventKind::MappingEnd)
            )
    }

    // ------------------------------------------------------------------
    // flow collections

    fn expect_flow_sequence(&mut self) -> YamlResult<()> {
        self.write_indicator("[", true, true, false)?;
        self.flow_level += 1;
        self.increase_indent(true, false, self.opts.map_indent);
        self.state = State::FirstFlowSequenceItem;
        Ok(())
    }

    fn expect_flow_sequence_item(&mut self, first: bool) -> YamlResult<()> {
        if matches!(self.event().kind, EventKind::SequenceEnd) {
            let end = self.event().comments.pre.clone();
            for comment in &end {
                self.write_full_line_comment(comment)?;
            }
            self.indent = self.indents.pop().unwrap_or(None);
            self.flow_level -= 1;
            self.write_indicator("]", false, false, false)?;
            let eol = self.event().comments.eol.clone();
            if let Some(comment) = &eol {
                self.write_eol_comment(comment)?;
            }
            self.state = self.take_state()?;
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        let pre = self.event().comments.pre.clone();
        for comment in &pre {
            self.write_full_line_comment(comment)?;
        }
        if self.column > self.opts.width {
            self.write_indent()?;
        }
        self.states.push(State::FlowSequenceItem);
        self.expect_node(false, true, false, false)
    }

    fn expect_flow_mapping(&mut self) -> YamlResult<()> {
        self.write_indicator("{", true, true, false)?;
        self.flow_level += 1;
        self.increase_indent(true, false, self.opts.map_indent);
        self.state = State::FirstFlowMappingKey;
        Ok(())
    }

    fn expect_flow_mapping_key(&mut self, first: bool) -> YamlResult<()> {
        if matches!(self.event().kind, EventKind::MappingEnd) {
            let end = self.event().comments.pre.clone();
            for comment in &end {
                self.write_full_line_comment(comment)?;
            }
            self.indent = self.indents.pop().unwrap_or(None);
            self.flow_level -= 1;
            self.write_indicator("}", false, false, false)?;
            let eol = self.event().comments.eol.clone();
            if let Some(comment) = &eol {
                self.write_eol_comment(comment)?;
            }
            self.state = self.take_state()?;
            return Ok(());
        }
        if !first {
            self.write_indicator(",", false, false, false)?;
        }
        let pre = self.event().comments.pre.clone();
        for comment in &pre {
            self.write_full_line_comment(comment)?;
        }
        if self.column > self.opts.width {
            self.write_indent()?;
        }
        if self.check_simple_key() {
            self.states.push(State::FlowMappingSimpleValue);
            self.expect_node(false, false, true, true)
        } else {
            self.write_indicator("?", true, false, false)?;
            self.states.push(State::FlowMappingValue);
            self.expect_node(false, false, true, false)
        }
    }

    fn expect_flow_mapping_simple_value(&mut self) -> YamlResult<()> {
        self.write_indicator(":", false, false, false)?;
        self.states.push(State::FlowMappingKey);
        self.expect_node(false, false, true, false)
    }

    fn expect_flow_mapping_value(&mut self) -> YamlResult<()> {
        if self.column > self.opts.width {
            self.write_indent()?;
        }
        self.write_indicator(":", true, false, false)?;
        self.states.push(State::FlowMappingKey);
        self.expect_node(false, false, true, false)
    }

    // ------------------------------------------------------------------
    // block collections

    fn expect_block_sequence(&mut self) -> YamlResult<()> {
        let indentless = self.mapping_context && !self.indention;
        self.increase_indent(false, indentless, self.opts.seq_indent);
        let eol = self.event().comments.eol.clone();
        if let Some(comment) = &eol {
            self.write_eol_comment(comment)?;
        }
        self.state = State::FirstBlockSequenceItem;
        Ok(())
    }

    fn expect_block_sequence_item(&mut self, first: bool) -> YamlResult<()> {
        if !first && matches!(self.event().kind, EventKind::SequenceEnd) {
            let end = self.event().comments.pre.clone();
            for comment in &end {
                self.write_full_line_comment(comment)?;
            }
            self.indent = self.indents.pop().unwrap_or(None);
            self.state = self.take_state()?;
            return Ok(());
        }
        let pre = self.event().comments.pre.clone();
        for comment in &pre {
            self.write_full_line_comment(comment)?;
        }
        self.write_indent()?;
        if self.opts.dash_offset > 0 {
            let pad = " ".repeat(self.opts.dash_offset);
            self.write_indicator(&pad, false, true, true)?;
        }
        self.write_indicator("-", true, false, true)?;
        self.states.push(State::BlockSequenceItem);
        self.expect_node(false, true, false, false)
    }

    fn expect_block_mapping(&mut self) -> YamlResult<()> {
        self.increase_indent(false, false, self.opts.map_indent);
        let eol = self.event().comments.eol.clone();
        if let Some(comment) = &eol {
            self.write_eol_comment(comment)?;
        }
        self.state = State::FirstBlockMappingKey;
        Ok(())
    }

    fn expect_block_mapping_key(&mut self, first: bool) -> YamlResult<()> {
        if !first && matches!(self.event().kind, EventKind::MappingEnd) {
            let end = self.event().comments.pre.clone();
            for comment in &end {
                self.write_full_line_comment(comment)?;
            }
            self.indent = self.indents.pop().unwrap_or(None);
            self.state = self.take_state()?;
            return Ok(());
        }
        let pre = self.event().comments.pre.clone();
        for comment in &pre {
            self.write_full_line_comment(comment)?;
        }
        self.write_indent()?;
        if self.check_simple_key() {
            self.states.push(State::BlockMappingSimpleValue);
            self.expect_node(false, false, true, true)
        } else {
            self.write_indicator("?", true, false, true)?;
            self.states.push(State::BlockMappingValue);
            self.expect_node(false, false, true, false)
        }
    }

    fn expect_block_mapping_value(&mut self, simple: bool) -> YamlResult<()> {
        if simple {
            self.write_indicator(":", false, false, false)?;
        } else {
            self.write_indent()?;
            self.write_indicator(":", true, false, true)?;
        }
        let pre = self.event().comments.pre.clone();
        for comment in &pre {
            self.write_full_line_comment(comment)?;
        }
        if !pre.is_empty() && self.column == 0 {
            // the comment run closed the line; put the value where a
            // nested node would sit
            let target = self.indent.unwrap_or(0) + self.opts.map_indent;
            if target > 0 {
                let pad = " ".repeat(target);
                self.write_indicator(&pad, false, true, true)?;
            }
        }
        self.states.push(State::BlockMappingKey);
        self.expect_node(false, false, true, false)
    }

    // ------------------------------------------------------------------
    // anchors, tags, scalars

    fn process_anchor(&mut self, indicator: &str) -> YamlResult<()> {
        let anchor = self.event().kind.anchor().map(str::to_string);
        match anchor {
            None => {
                self.prepared_anchor = None;
                Ok(())
            }
            Some(name) => {
                let prepared = match self.prepared_anchor.take() {
                    Some(prepared) => prepared,
                    None => prepare_anchor(&name)?,
                };
                self.write_indicator(&format!("{indicator}{prepared}"), true, false, false)
            }
        }
    }

    fn process_tag(&mut self) -> YamlResult<()> {
        let (tag, scalar_implicit) = match &self.event().kind {
            EventKind::Scalar { tag, implicit, .. } => (tag.clone(), Some(*implicit)),
            EventKind::SequenceStart { tag, implicit, .. }
            | EventKind::MappingStart { tag, implicit, .. } => (tag.clone(), None),
            _ => (None, None),
        };
        if let Some(implicit) = scalar_implicit {
            if self.style.is_none() {
                self.style = Some(self.choose_scalar_style()?);
            }
            let plain = self.style == Some(ScalarStyle::Plain);
            if (plain && implicit.0) || (!plain && implicit.1) {
                self.prepared_tag = None;
                return Ok(());
            }
        } else {
            let implicit = match &self.event().kind {
                EventKind::SequenceStart { implicit, .. }
                | EventKind::MappingStart { implicit, .. } => *implicit,
                _ => false,
            };
            if implicit {
                self.prepared_tag = None;
                return Ok(());
            }
        }
        let tag = tag.ok_or_else(|| err("tag is not specified"))?;
        let prepared = match self.prepared_tag.take() {
            Some(prepared) => prepared,
            None => self.prepare_tag(&tag)?,
        };
        self.write_indicator(&prepared, true, false, false)
    }

    fn check_simple_key(&mut self) -> bool {
        let mut length = 0;
        if let Some(name) = self.event().kind.anchor() {
            let name = name.to_string();
            if self.prepared_anchor.is_none() {
                self.prepared_anchor = prepare_anchor(&name).ok();
            }
            length += self
                .prepared_anchor
                .as_ref()
                .map(|a| a.len())
                .unwrap_or(0);
        }
        match &self.event().kind {
            EventKind::Alias { .. } => return length < MAX_SIMPLE_KEY_LENGTH,
            EventKind::Scalar { value, .. } => {
                let value = value.clone();
                if self.analysis.is_none() {
                    self.analysis = Some(self.analyze_scalar(&value));
                }
                let analysis = self.analysis.as_ref().unwrap_or_else(|| unreachable!());
                length += analysis.value.chars().count();
                length < MAX_SIMPLE_KEY_LENGTH && !analysis.empty && !analysis.multiline
            }
            EventKind::SequenceStart { .. } => self.check_empty_sequence(),
            EventKind::MappingStart { .. } => self.check_empty_mapping(),
            _ => false,
        }
    }

    fn choose_scalar_style(&mut self) -> YamlResult<ScalarStyle> {
        let (value, style, implicit) = match &self.event().kind {
            EventKind::Scalar {
                value,
                style,
                implicit,
                ..
            } => (value.clone(), *style, *implicit),
            kind => return Err(err(format!("expected a scalar event, but got {kind:?}"))),
        };
        if self.analysis.is_none() {
            self.analysis = Some(self.analyze_scalar(&value));
        }
        let analysis = self.analysis.as_ref().unwrap_or_else(|| unreachable!());
        if style == ScalarStyle::DoubleQuote {
            return Ok(ScalarStyle::DoubleQuote);
        }
        if style == ScalarStyle::Plain {
            // a tag that gets written anyway makes plain unambiguous
            let resolvable = implicit.0 || !implicit.1;
            let legal = if self.flow_level > 0 {
                analysis.allow_flow_plain
            } else {
                analysis.allow_block_plain
            };
            if resolvable
                && legal
                && !(self.simple_key_context && (analysis.empty || analysis.multiline))
                && !analysis.empty
            {
                return Ok(ScalarStyle::Plain);
            }
            if analysis.empty && !(self.simple_key_context && analysis.multiline) {
                return Ok(ScalarStyle::Plain);
            }
        }
        if matches!(style, ScalarStyle::Literal | ScalarStyle::Folded)
            && self.flow_level == 0
            && !self.simple_key_context
            && analysis.allow_block
        {
            return Ok(style);
        }
        if analysis.allow_single_quoted && !(self.simple_key_context && analysis.multiline) {
            return Ok(ScalarStyle::SingleQuote);
        }
        Ok(ScalarStyle::DoubleQuote)
    }

    fn process_scalar(&mut self) -> YamlResult<()> {
        if self.style.is_none() {
            self.style = Some(self.choose_scalar_style()?);
        }
        let style = self.style.take().unwrap_or(ScalarStyle::Plain);
        let analysis = match self.analysis.take() {
            Some(analysis) => analysis,
            None => {
                let value = match &self.event().kind {
                    EventKind::Scalar { value, .. } => value.clone(),
                    _ => String::new(),
                };
                self.analyze_scalar(&value)
            }
        };
        let marked = match &self.event().kind {
            EventKind::Scalar { value, .. } => value.clone(),
            _ => String::new(),
        };
        let split = !self.simple_key_context;
        let header = self.event().comments.eol.clone();
        match style {
            ScalarStyle::DoubleQuote => self.write_double_quoted(&analysis.value, split)?,
            ScalarStyle::SingleQuote => self.write_single_quoted(&analysis.value, split)?,
            ScalarStyle::Literal => self.write_literal(&analysis.value, header.as_ref())?,
            ScalarStyle::Folded => self.write_folded(&marked, header.as_ref())?,
            ScalarStyle::Plain => self.write_plain(&analysis.value, split)?,
        }
        if !matches!(style, ScalarStyle::Literal | ScalarStyle::Folded) {
            if let Some(comment) = &header {
                self.write_eol_comment(comment)?;
            }
        }
        let post = self.event().comments.post.clone();
        for comment in &post {
            self.write_trailing_comment(comment)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // indentation and low-level writing

    fn increase_indent(&mut self, flow: bool, indentless: bool, unit: usize) {
        self.indents.push(self.indent);
        match self.indent {
            None => {
                self.indent = Some(if flow { unit } else { 0 });
            }
            Some(current) => {
                if !indentless {
                    self.indent = Some(current + unit);
                }
            }
        }
    }

    fn write_indicator(
        &mut self,
        indicator: &str,
        need_whitespace: bool,
        whitespace: bool,
        indention: bool,
    ) -> YamlResult<()> {
        let prefix = if self.whitespace || !need_whitespace {
            ""
        } else {
            " "
        };
        self.whitespace = whitespace;
        self.indention = self.indention && indention;
        self.open_ended = false;
        self.column += prefix.len() + indicator.chars().count();
        self.writer
            .write_str(prefix)
            .and_then(|()| self.writer.write_str(indicator))
            .map_err(|_| err("failed to write to the output stream"))
    }

    fn write_indent(&mut self) -> YamlResult<()> {
        let indent = self.indent.unwrap_or(0);
        if !self.indention
            || self.column > indent
            || (self.column == indent && !self.whitespace)
        {
            self.write_line_break()?;
        }
        if self.column < indent {
            self.whitespace = true;
            let pad = " ".repeat(indent - self.column);
            self.column = indent;
            self.writer
                .write_str(&pad)
                .map_err(|_| err("failed to write to the output stream"))?;
        }
        Ok(())
    }

    fn write_line_break(&mut self) -> YamlResult<()> {
        self.whitespace = true;
        self.indention = true;
        self.line += 1;
        self.column = 0;
        self.writer
            .write_char('\n')
            .map_err(|_| err("failed to write to the output stream"))
    }

    fn write_version_directive(&mut self, version: YamlVersion) -> YamlResult<()> {
        let text = format!("%YAML {}.{}", version.0, version.1);
        self.writer
            .write_str(&text)
            .map_err(|_| err("failed to write to the output stream"))?;
        self.write_line_break()
    }

    // ------------------------------------------------------------------
    // comments

    /// Writes a comment chunk verbatim and brings the position bookkeeping
    /// back in line with what was written.
    fn write_comment_text(&mut self, text: &str) -> YamlResult<()> {
        self.writer
            .write_str(text)
            .map_err(|_| err("failed to write to the output stream"))?;
        let mut column = self.column;
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        self.column = column;
        let at_line_start = text.ends_with('\n');
        self.whitespace = at_line_start;
        self.indention = at_line_start;
        self.open_ended = false;
        Ok(())
    }

    /// A whole-line comment run; lands at its recorded column.
    fn write_full_line_comment(&mut self, comment: &Comment) -> YamlResult<()> {
        if self.column > 0 {
            self.write_line_break()?;
        }
        if comment.value.starts_with('#') {
            let col = comment.start.col as usize;
            if col > 0 {
                let pad = " ".repeat(col);
                self.writer
                    .write_str(&pad)
                    .map_err(|_| err("failed to write to the output stream"))?;
                self.column = col;
            }
        }
        self.write_comment_text(&comment.value)
    }

    /// A chunk trailing a value on its line. The chunk's own newlines close
    /// the line, so the next `write_indent` pads without breaking again.
    fn write_eol_comment(&mut self, comment: &Comment) -> YamlResult<()> {
        if comment.value.starts_with('#') {
            let col = comment.start.col as usize;
            if self.column < col {
                let pad = " ".repeat(col - self.column);
                self.writer
                    .write_str(&pad)
                    .map_err(|_| err("failed to write to the output stream"))?;
                self.column = col;
            } else if !self.whitespace {
                self.writer
                    .write_char(' ')
                    .map_err(|_| err("failed to write to the output stream"))?;
                self.column += 1;
            }
        }
        self.write_comment_text(&comment.value)
    }

    /// The run following a scalar; its padding is part of the text, and a
    /// chunk starting with a break closes the value's line itself.
    fn write_trailing_comment(&mut self, comment: &Comment) -> YamlResult<()> {
        if self.column > 0 && !comment.value.starts_with('\n') {
            self.write_line_break()?;
        }
        self.write_comment_text(&comment.value)
    }

    // ------------------------------------------------------------------
    // tag preparation

    fn prepare_tag(&self, tag: &str) -> YamlResult<String> {
        if tag.is_empty() {
            return Err(err("tag must not be empty"));
        }
        if tag == "!" {
            return Ok(tag.to_string());
        }
        let mut handle = None;
        let mut suffix = tag;
        for (prefix, h) in &self.tag_prefixes {
            if tag.starts_with(prefix.as_str()) && (prefix == "!" || prefix.len() < tag.len()) {
                handle = Some(h.clone());
                suffix = &tag[prefix.len()..];
            }
        }
        let escaped = escape_tag_text(suffix);
        match handle {
            Some(handle) => Ok(format!("{handle}{escaped}")),
            None => Ok(format!("!<{escaped}>")),
        }
    }

    // ------------------------------------------------------------------
    // scalar analysis

    fn analyze_scalar(&self, value: &str) -> ScalarAnalysis {
        let scalar: String = if value.contains(FOLD_MARK) {
            value.chars().filter(|c| *c != FOLD_MARK).collect()
        } else {
            value.to_string()
        };
        if scalar.is_empty() {
            return ScalarAnalysis {
                value: scalar,
                empty: true,
                multiline: false,
                allow_flow_plain: false,
                allow_block_plain: true,
                allow_single_quoted: true,
                allow_block: false,
            };
        }
        let chars: Vec<char> = scalar.chars().collect();
        let mut block_indicators = false;
        let mut flow_indicators = false;
        let mut line_breaks = false;
        let mut special_characters = false;
        let mut leading_space = false;
        let mut leading_break = false;
        let mut trailing_space = false;
        let mut trailing_break = false;
        let mut break_space = false;
        let mut space_break = false;
        if scalar.starts_with("---") || scalar.starts_with("...") {
            block_indicators = true;
            flow_indicators = true;
        }
        let mut preceded_by_whitespace = true;
        let mut followed_by_whitespace = chars.len() == 1 || is_blank_or_break(chars[1]);
        let mut previous_space = false;
        let mut previous_break = false;
        for (index, ch) in chars.iter().copied().enumerate() {
            if index == 0 {
                if "#,[]{}&*!|>'\"%@`".contains(ch) {
                    flow_indicators = true;
                    block_indicators = true;
                }
                if ch == '?' || ch == ':' {
                    flow_indicators = true;
                    if followed_by_whitespace {
                        block_indicators = true;
                    }
                }
                if ch == '-' && followed_by_whitespace {
                    flow_indicators = true;
                    block_indicators = true;
                }
            } else {
                if ",?[]{}".contains(ch) {
                    flow_indicators = true;
                }
                if ch == ':' {
                    flow_indicators = true;
                    if followed_by_whitespace {
                        block_indicators = true;
                    }
                }
                if ch == '#' && preceded_by_whitespace {
                    flow_indicators = true;
                    block_indicators = true;
                }
            }
            if ch == '\n' {
                line_breaks = true;
            }
            if ch != '\n' && !(' '..='\u{7E}').contains(&ch) {
                let printable_unicode = ch == '\u{85}'
                    || ('\u{A0}'..='\u{D7FF}').contains(&ch)
                    || ('\u{E000}'..='\u{FFFD}').contains(&ch)
                    || ('\u{10000}'..='\u{10FFFF}').contains(&ch);
                if !printable_unicode || ch == '\u{FEFF}' || !self.opts.allow_unicode {
                    special_characters = true;
                }
            }
            if ch == ' ' {
                if index == 0 {
                    leading_space = true;
                }
                if index == chars.len() - 1 {
                    trailing_space = true;
                }
                if previous_break {
                    break_space = true;
                }
                previous_space = true;
                previous_break = false;
            } else if ch == '\n' {
                if index == 0 {
                    leading_break = true;
                }
                if index == chars.len() - 1 {
                    trailing_break = true;
                }
                if previous_space {
                    space_break = true;
                }
                previous_break = true;
                previous_space = false;
            } else {
                previous_space = false;
                previous_break = false;
            }
            preceded_by_whitespace = is_blank_or_break(ch);
            followed_by_whitespace =
                index + 2 >= chars.len() || is_blank_or_break(chars[index + 2]);
        }
        let mut allow_flow_plain = true;
        let mut allow_block_plain = true;
        let mut allow_single_quoted = true;
        let mut allow_block = true;
        if leading_space || leading_break || trailing_space || trailing_break {
            allow_flow_plain = false;
            allow_block_plain = false;
        }
        if trailing_space {
            allow_block = false;
        }
        if break_space {
            allow_flow_plain = false;
            allow_block_plain = false;
            allow_single_quoted = false;
        }
        if space_break || special_characters {
            allow_flow_plain = false;
            allow_block_plain = false;
            allow_single_quoted = false;
            allow_block = false;
        }
        if line_breaks {
            allow_flow_plain = false;
            allow_block_plain = false;
        }
        if flow_indicators {
            allow_flow_plain = false;
        }
        if block_indicators {
            allow_block_plain = false;
        }
        ScalarAnalysis {
            value: scalar,
            empty: false,
            multiline: line_breaks,
            allow_flow_plain,
            allow_block_plain,
            allow_single_quoted,
            allow_block,
        }
    }

    // ------------------------------------------------------------------
    // scalar writers

    fn write_single_quoted(&mut self, text: &str, split: bool) -> YamlResult<()> {
        self.write_indicator("'", true, false, false)?;
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end
                        && self.column > self.opts.width
                        && split
                        && start != 0
                        && end != chars.len()
                    {
                        self.write_indent()?;
                    } else {
                        self.write_chunk(&chars[start..end])?;
                    }
                    start = end;
                }
            } else if breaks {
                if ch != Some('\n') {
                    if chars[start] == '\n' {
                        self.write_line_break()?;
                    }
                    for _ in &chars[start..end] {
                        self.write_line_break()?;
                    }
                    self.write_indent()?;
                    start = end;
                }
            } else if (ch.is_none() || matches!(ch, Some(' ') | Some('\n') | Some('\'')))
                && start < end
            {
                self.write_chunk(&chars[start..end])?;
                start = end;
            }
            if ch == Some('\'') {
                self.column += 2;
                self.writer
                    .write_str("''")
                    .map_err(|_| err("failed to write to the output stream"))?;
                start = end + 1;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = ch == '\n';
            }
            end += 1;
        }
        self.write_indicator("'", false, false, false)
    }

    fn write_double_quoted(&mut self, text: &str, split: bool) -> YamlResult<()> {
        self.write_indicator("\"", true, false, false)?;
        let chars: Vec<char> = text.chars().collect();
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            let needs_escape = match ch {
                None => true,
                Some(c) => {
                    !(' '..='\u{7E}').contains(&c)
                        || c == '"'
                        || c == '\\'
                        || (!self.opts.allow_unicode && !c.is_ascii())
                }
            };
            if needs_escape {
                if start < end {
                    self.write_chunk(&chars[start..end])?;
                    start = end;
                }
                if let Some(c) = ch {
                    let data = escape_double(c);
                    self.column += data.chars().count();
                    self.writer
                        .write_str(&data)
                        .map_err(|_| err("failed to write to the output stream"))?;
                    start = end + 1;
                }
            }
            if end > 0
                && end < chars.len().saturating_sub(1)
                && (ch == Some(' ') || start >= end)
                && self.column + (end - start) > self.opts.width
                && split
            {
                self.write_chunk(&chars[start..end])?;
                self.writer
                    .write_char('\\')
                    .map_err(|_| err("failed to write to the output stream"))?;
                self.column += 1;
                start = end;
                self.write_indent()?;
                self.whitespace = false;
                self.indention = false;
                if chars.get(start) == Some(&' ') {
                    self.writer
                        .write_char('\\')
                        .map_err(|_| err("failed to write to the output stream"))?;
                    self.column += 1;
                }
            }
            end += 1;
        }
        self.write_indicator("\"", false, false, false)
    }

    fn write_plain(&mut self, text: &str, split: bool) -> YamlResult<()> {
        if self.root_context {
            self.open_ended = true;
        }
        if text.is_empty() {
            return Ok(());
        }
        if !self.whitespace {
            self.column += 1;
            self.writer
                .write_char(' ')
                .map_err(|_| err("failed to write to the output stream"))?;
        }
        self.whitespace = false;
        self.indention = false;
        let chars: Vec<char> = text.chars().collect();
        let mut spaces = false;
        let mut breaks = false;
        let mut start = 0;
        let mut end = 0;
        while end <= chars.len() {
            let ch = chars.get(end).copied();
            if spaces {
                if ch != Some(' ') {
                    if start + 1 == end && self.column > self.opts.width && split {
                        self.write_indent()?;
                        self.whitespace = false;
                        self.indention = false;
                    } else {
                        self.write_chunk(&chars[start..end])?;
                    }
                    start = end;
                }
            } else if breaks {
                if ch != Some('\n') {
                    if chars[start] == '\n' {
                        self.write_line_break()?;
                    }
                    for _ in &chars[start..end] {
                        self.write_line_break()?;
                    }
                    self.write_indent()?;
                    self.whitespace = false;
                    self.indention = false;
                    start = end;
                }
            } else if (ch.is_none() || matches!(ch, Some(' ') | Some('\n'))) && start < end {
                self.write_chunk(&chars[start..end])?;
                start = end;
            }
            if let Some(ch) = ch {
                spaces = ch == ' ';
                breaks = ch == '\n';
            }
            end += 1;
        }
        Ok(())
    }

    fn write_literal(&mut self, text: &str, header: Option<&Comment>) -> YamlResult<()> {
        let (digit, chomp) = self.determine_block_hints(text);
        self.write_block_header('|', digit, chomp)?;
        if let Some(comment) = header {
            self.write_comment_text(&comment.value)?;
        }
        if chomp == Some('+') {
            self.open_ended = true;
        }
        self.write_line_break()?;
        let mut breaks = true;
        for ch in text.chars() {
            if ch == '\n' {
                self.write_line_break()?;
                breaks = true;
            } else {
                if breaks {
                    self.write_indent()?;
                    breaks = false;
                }
                self.column += 1;
                self.writer
                    .write_char(ch)
                    .map_err(|_| err("failed to write to the output stream"))?;
                self.whitespace = false;
                self.indention = false;
            }
        }
        Ok(())
    }

    /// Folded text arrives with fold marks at the points where the source
    /// broke its lines; each mark turns the following space back into a
    /// line break. A real newline becomes a blank line, since a single
    /// break next to ordinary content folds back into a space on reload.
    fn write_folded(&mut self, marked: &str, header: Option<&Comment>) -> YamlResult<()> {
        let plain: String = marked.chars().filter(|c| *c != FOLD_MARK).collect();
        let (digit, chomp) = self.determine_block_hints(&plain);
        self.write_block_header('>', digit, chomp)?;
        if let Some(comment) = header {
            self.write_comment_text(&comment.value)?;
        }
        if chomp == Some('+') {
            self.open_ended = true;
        }
        self.write_line_break()?;
        let chars: Vec<char> = marked.chars().collect();
        let mut leading_space = chars.first() == Some(&' ');
        let mut pending_indent = true;
        let mut index = 0;
        while index < chars.len() {
            let ch = chars[index];
            if ch == FOLD_MARK {
                self.write_line_break()?;
                pending_indent = true;
                index += 1;
                if chars.get(index) == Some(&' ') {
                    index += 1;
                }
                leading_space = chars.get(index) == Some(&' ');
                continue;
            }
            if ch == '\n' {
                let mut run = 0;
                while chars.get(index) == Some(&'\n') {
                    run += 1;
                    index += 1;
                }
                let next = chars.get(index).copied();
                if !leading_space && next.is_some() && next != Some(' ') {
                    self.write_line_break()?;
                }
                for _ in 0..run {
                    self.write_line_break()?;
                }
                pending_indent = true;
                leading_space = next == Some(' ');
                continue;
            }
            if pending_indent {
                self.write_indent()?;
                pending_indent = false;
            }
            self.column += 1;
            self.writer
                .write_char(ch)
                .map_err(|_| err("failed to write to the output stream"))?;
            self.whitespace = false;
            self.indention = false;
            index += 1;
        }
        Ok(())
    }

    fn write_block_header(
        &mut self,
        indicator: char,
        digit: Option<usize>,
        chomp: Option<char>,
    ) -> YamlResult<()> {
        let mut header = String::new();
        header.push(indicator);
        if let Some(digit) = digit {
            header.push_str(&digit.to_string());
        }
        if let Some(chomp) = chomp {
            header.push(chomp);
        }
        self.write_indicator(&header, true, false, false)
    }

    fn determine_block_hints(&self, text: &str) -> (Option<usize>, Option<char>) {
        let chars: Vec<char> = text.chars().collect();
        let mut digit = None;
        let mut chomp = None;
        if let Some(first) = chars.first() {
            if *first == ' ' || *first == '\n' {
                digit = Some(self.opts.map_indent);
            }
        }
        match chars.last() {
            None => {}
            Some('\n') => {
                if chars.len() == 1 || chars[chars.len() - 2] == '\n' {
                    chomp = Some('+');
                }
            }
            Some(_) => chomp = Some('-'),
        }
        (digit, chomp)
    }

    fn write_chunk(&mut self, chunk: &[char]) -> YamlResult<()> {
        let data: String = chunk.iter().collect();
        self.column += chunk.len();
        self.whitespace = false;
        self.indention = false;
        self.writer
            .write_str(&data)
            .map_err(|_| err("failed to write to the output stream"))
    }
}

fn default_tag_prefixes() -> HashMap<String, String> {
    let mut prefixes = HashMap::new();
    prefixes.insert("!".to_string(), "!".to_string());
    prefixes.insert("tag:yaml.org,2002:".to_string(), "!!".to_string());
    prefixes
}

fn is_blank_or_break(ch: char) -> bool {
    matches!(ch, '\0' | ' ' | '\t' | '\r' | '\n')
}

fn prepare_anchor(name: &str) -> YamlResult<String> {
    if name.is_empty() {
        return Err(err("anchor must not be empty"));
    }
    if let Some(bad) = name
        .chars()
        .find(|c| !c.is_ascii_alphanumeric() && *c != '-' && *c != '_')
    {
        return Err(err(format!(
            "invalid character {bad:?} in the anchor {name:?}"
        )));
    }
    Ok(name.to_string())
}

fn prepare_tag_handle(handle: &str) -> YamlResult<String> {
    if !handle.starts_with('!') || !handle.ends_with('!') {
        return Err(err(format!(
            "tag handle must start and end with '!': {handle:?}"
        )));
    }
    for ch in handle[1..handle.len().saturating_sub(1)].chars() {
        if !ch.is_ascii_alphanumeric() && ch != '-' && ch != '_' {
            return Err(err(format!(
                "invalid character {ch:?} in the tag handle {handle:?}"
            )));
        }
    }
    Ok(handle.to_string())
}

fn prepare_tag_prefix(prefix: &str) -> YamlResult<String> {
    if prefix.is_empty() {
        return Err(err("tag prefix must not be empty"));
    }
    Ok(escape_tag_text(prefix))
}

/// URI-escapes the characters a tag cannot carry verbatim.
fn escape_tag_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() || "-;/?:@&=+$,_.!~*'()[]%".contains(ch) {
            out.push(ch);
        } else {
            let mut buf = [0u8; 4];
            for byte in ch.encode_utf8(&mut buf).as_bytes() {
                out.push_str(&format!("%{byte:02X}"));
            }
        }
    }
    out
}

fn escape_double(ch: char) -> String {
    let short = match ch {
        '\0' => Some('0'),
        '\u{7}' => Some('a'),
        '\u{8}' => Some('b'),
        '\t' => Some('t'),
        '\n' => Some('n'),
        '\u{B}' => Some('v'),
        '\u{C}' => Some('f'),
        '\r' => Some('r'),
        '\u{1B}' => Some('e'),
        '"' => Some('"'),
        '\\' => Some('\\'),
        '\u{85}' => Some('N'),
        '\u{A0}' => Some('_'),
        '\u{2028}' => Some('L'),
        '\u{2029}' => Some('P'),
        _ => None,
    };
    match short {
        Some(c) => format!("\\{c}"),
        None => {
            let code = ch as u32;
            if code <= 0xFF {
                format!("\\x{code:02X}")
            } else if code <= 0xFFFF {
                format!("\\u{code:04X}")
            } else {
                format!("\\U{code:08X}")
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use yarrow_common::CommentKind;

    fn scalar(value: &str, style: ScalarStyle) -> Event {
        Event::new(
            EventKind::Scalar {
                anchor: None,
                tag: Some("tag:yaml.org,2002:str".to_string()),
                implicit: (true, true),
                value: value.to_string(),
                style,
            },
            Marker::default(),
            Marker::default(),
        )
    }

    fn plain(value: &str) -> Event {
        scalar(value, ScalarStyle::Plain)
    }

    fn ev(kind: EventKind) -> Event {
        Event::new(kind, Marker::default(), Marker::default())
    }

    fn doc_start() -> Event {
        ev(EventKind::DocumentStart {
            explicit: false,
            version: None,
            tags: None,
        })
    }

    fn doc_end() -> Event {
        ev(EventKind::DocumentEnd { explicit: false })
    }

    fn map_start(flow: bool) -> Event {
        ev(EventKind::MappingStart {
            anchor: None,
            tag: Some("tag:yaml.org,2002:map".to_string()),
            implicit: true,
            flow,
        })
    }

    fn seq_start(flow: bool) -> Event {
        ev(EventKind::SequenceStart {
            anchor: None,
            tag: Some("tag:yaml.org,2002:seq".to_string()),
            implicit: true,
            flow,
        })
    }

    fn emit_all(events: Vec<Event>) -> String {
        let mut out = String::new();
        let mut emitter = Emitter::new(&mut out, EmitOpts::default());
        for event in events {
            emitter.emit(event).unwrap();
        }
        out
    }

    #[test]
    fn block_mapping_renders_keys_and_values() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("a"),
            plain("1"),
            plain("b"),
            plain("2"),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "a: 1\nb: 2\n");
    }

    #[test]
    fn nested_block_collections_indent() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("m"),
            map_start(false),
            plain("x"),
            plain("1"),
            ev(EventKind::MappingEnd),
            plain("s"),
            seq_start(false),
            plain("1"),
            plain("2"),
            ev(EventKind::SequenceEnd),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "m:\n  x: 1\ns:\n- 1\n- 2\n");
    }

    #[test]
    fn flow_collections_render_inline() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("a"),
            seq_start(true),
            plain("1"),
            plain("2"),
            ev(EventKind::SequenceEnd),
            plain("b"),
            map_start(true),
            plain("x"),
            plain("1"),
            ev(EventKind::MappingEnd),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "a: [1, 2]\nb: {x: 1}\n");
    }

    #[test]
    fn empty_block_collections_collapse_to_flow() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("s"),
            seq_start(false),
            ev(EventKind::SequenceEnd),
            plain("m"),
            map_start(false),
            ev(EventKind::MappingEnd),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "s: []\nm: {}\n");
    }

    #[test]
    fn quoted_styles_escape_what_they_must() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("a"),
            scalar("it's", ScalarStyle::SingleQuote),
            plain("b"),
            scalar("tab\there", ScalarStyle::DoubleQuote),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "a: 'it''s'\nb: \"tab\\there\"\n");
    }

    #[test]
    fn literal_blocks_carry_chomp_hints() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("k"),
            scalar("text", ScalarStyle::Literal),
            plain("l"),
            scalar("keep\n\n", ScalarStyle::Literal),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "k: |-\n  text\nl: |+\n  keep\n\n...\n");
    }

    #[test]
    fn fold_marks_restore_the_original_breaks() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("k"),
            scalar("a b\u{7} c\n", ScalarStyle::Folded),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "k: >\n  a b\n  c\n");
    }

    #[test]
    fn anchors_and_aliases_render() {
        let mut anchored = map_start(true);
        if let EventKind::MappingStart { anchor, .. } = &mut anchored.kind {
            *anchor = Some("k".to_string());
        }
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("x"),
            anchored,
            plain("v"),
            plain("1"),
            ev(EventKind::MappingEnd),
            plain("y"),
            ev(EventKind::Alias {
                name: "k".to_string(),
            }),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "x: &k {v: 1}\ny: *k\n");
    }

    #[test]
    fn eol_comments_come_back_at_their_column() {
        let mut value = plain("1");
        value.comments.eol = Some(Comment::new(
            CommentKind::Eol,
            "# x\n".to_string(),
            Marker::new(5, 0, 5),
        ));
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("a"),
            value,
            plain("b"),
            plain("2"),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "a: 1 # x\nb: 2\n");
    }

    #[test]
    fn pre_comments_come_back_as_full_lines() {
        let mut key = plain("b");
        key.comments.pre.push(Comment::new(
            CommentKind::Line,
            "# pre\n".to_string(),
            Marker::new(0, 1, 0),
        ));
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("a"),
            plain("1"),
            key,
            plain("2"),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "a: 1\n# pre\nb: 2\n");
    }

    #[test]
    fn explicit_documents_write_their_markers() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            ev(EventKind::DocumentStart {
                explicit: true,
                version: Some((1, 1)),
                tags: None,
            }),
            plain("x"),
            ev(EventKind::DocumentEnd { explicit: true }),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "%YAML 1.1\n--- x\n...\n");
    }

    #[test]
    fn plain_root_scalars_guard_the_next_document() {
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            plain("one"),
            doc_end(),
            doc_start(),
            plain("two"),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert_eq!(out, "one\n--- two\n...\n");
    }

    #[test]
    fn long_plain_scalars_wrap_at_the_width() {
        let words = vec!["word"; 30].join(" ");
        let out = emit_all(vec![
            ev(EventKind::StreamStart),
            doc_start(),
            map_start(false),
            plain("k"),
            plain(&words),
            ev(EventKind::MappingEnd),
            doc_end(),
            ev(EventKind::StreamEnd),
        ]);
        assert!(out.lines().count() > 1);
        let reflowed = out
            .trim_end()
            .strip_prefix("k:")
            .unwrap()
            .replace('\n', " ");
        assert_eq!(reflowed.split_whitespace().count(), 30);
    }
}
