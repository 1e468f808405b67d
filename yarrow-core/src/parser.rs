//! Event parser.
//!
//! The grammar is LL(1) and parsed by an explicit pushdown state machine:
//!
//! ```text
//! stream            ::= STREAM-START implicit_document? explicit_document* STREAM-END
//! implicit_document ::= block_node DOCUMENT-END*
//! explicit_document ::= DIRECTIVE* DOCUMENT-START block_node? DOCUMENT-END*
//! block_node        ::= ALIAS | properties block_content? | block_content
//! flow_node         ::= ALIAS | properties flow_content? | flow_content
//! properties        ::= TAG ANCHOR? | ANCHOR TAG?
//! block_content     ::= block_collection | flow_collection | SCALAR
//! flow_content      ::= flow_collection | SCALAR
//! block_collection  ::= block_sequence | block_mapping
//! flow_collection   ::= flow_sequence | flow_mapping
//! block_sequence    ::= BLOCK-SEQUENCE-START (BLOCK-ENTRY block_node?)* BLOCK-END
//! indentless_sequence ::= (BLOCK-ENTRY block_node?)+
//! block_mapping     ::= BLOCK-MAPPING-START
//!                       ((KEY block_node_or_indentless_sequence?)?
//!                       (VALUE block_node_or_indentless_sequence?)?)*
//!                       BLOCK-END
//! flow_sequence     ::= FLOW-SEQUENCE-START
//!                       (flow_sequence_entry FLOW-ENTRY)*
//!                       flow_sequence_entry? FLOW-SEQUENCE-END
//! flow_mapping      ::= FLOW-MAPPING-START
//!                       (flow_mapping_entry FLOW-ENTRY)*
//!                       flow_mapping_entry? FLOW-MAPPING-END
//! flow_sequence_entry ::= flow_node | KEY flow_node? (VALUE flow_node?)?
//! flow_mapping_entry  ::= flow_node | KEY flow_node? (VALUE flow_node?)?
//! ```
//!
//! Tags written with a `!!` handle are expanded to their full form only
//! for the core schema; anything else keeps its source spelling so that
//! dumping reproduces it.

use std::mem;

use crate::event::{Event, EventKind};
use crate::scanner::Scanner;
use crate::token::{DirectiveValue, Token, TokenKind};
use yarrow_common::{
    Comment, CommentSlots, Marked, Marker, ScalarStyle, YamlError, YamlResult, YamlVersion,
};

const MINIMUM_YAML_VERSION: YamlVersion = (1, 1);

const DEFAULT_TAGS: [(&str, &str); 2] = [("!", "!"), ("!!", "tag:yaml.org,2002:")];

/// Suffixes that resolve through the `!!` handle to the core schema.
const CORE_TAGS: [&str; 12] = [
    "null",
    "bool",
    "int",
    "float",
    "binary",
    "timestamp",
    "omap",
    "pairs",
    "set",
    "str",
    "seq",
    "map",
];

fn err(problem: impl Into<String>, mark: Marker) -> YamlError {
    YamlError::Parser(Marked::problem(problem, mark))
}

fn err_ctx(
    context: impl Into<String>,
    context_mark: Marker,
    problem: impl Into<String>,
    problem_mark: Marker,
) -> YamlError {
    YamlError::Parser(Marked::contextual(context, context_mark, problem, problem_mark))
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
}

pub struct Parser {
    scanner: Scanner,
    current_event: Option<Event>,
    /// Version declared by the current document's `%YAML` directive.
    version: Option<YamlVersion>,
    /// Comments gathered on directive tokens, carried to the document
    /// start event so they survive in front of `---`.
    directive_comments: Vec<Comment>,
    tag_handles: Vec<(String, String)>,
    states: Vec<State>,
    marks: Vec<Marker>,
    state: Option<State>,
}

impl Parser {
    #[must_use]
    pub fn new(scanner: Scanner) -> Parser {
        Parser {
            scanner,
            current_event: None,
            version: None,
            directive_comments: Vec::new(),
            tag_handles: Vec::new(),
            states: Vec::new(),
            marks: Vec::new(),
            state: Some(State::StreamStart),
        }
    }

    /// The version in effect for the document being parsed.
    #[must_use]
    pub fn processing_version(&self) -> YamlVersion {
        match self.version {
            Some(version) => version,
            None => self.scanner.yaml_version(),
        }
    }

    pub fn check_event(&mut self, pred: impl Fn(&EventKind) -> bool) -> YamlResult<bool> {
        self.produce()?;
        Ok(match &self.current_event {
            Some(event) => pred(&event.kind),
            None => false,
        })
    }

    pub fn peek_event(&mut self) -> YamlResult<Option<&Event>> {
        self.produce()?;
        Ok(self.current_event.as_ref())
    }

    pub fn get_event(&mut self) -> YamlResult<Option<Event>> {
        self.produce()?;
        Ok(self.current_event.take())
    }

    fn produce(&mut self) -> YamlResult<()> {
        if self.current_event.is_none() {
            if let Some(state) = self.state {
                self.current_event = Some(self.state_machine(state)?);
            }
        }
        Ok(())
    }

    fn state_machine(&mut self, state: State) -> YamlResult<Event> {
        match state {
            State::StreamStart => self.parse_stream_start(),
            State::ImplicitDocumentStart => self.parse_implicit_document_start(),
            State::DocumentStart => self.parse_document_start(),
            State::DocumentContent => self.parse_document_content(),
            State::DocumentEnd => self.parse_document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockSequenceFirstEntry => self.parse_block_sequence_first_entry(),
            State::BlockSequenceEntry => self.parse_block_sequence_entry(),
            State::IndentlessSequenceEntry => self.parse_indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.parse_block_mapping_first_key(),
            State::BlockMappingKey => self.parse_block_mapping_key(),
            State::BlockMappingValue => self.parse_block_mapping_value(),
            State::FlowSequenceFirstEntry => self.parse_flow_sequence_first_entry(),
            State::FlowSequenceEntry => self.parse_flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.parse_flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.parse_flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.parse_flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.parse_flow_mapping_first_key(),
            State::FlowMappingKey => self.parse_flow_mapping_key(false),
            State::FlowMappingValue => self.parse_flow_mapping_value(),
            State::FlowMappingEmptyValue => self.parse_flow_mapping_empty_value(),
        }
    }

    // ------------------------------------------------------------------
    // token access

    fn take_token(&mut self) -> YamlResult<Token> {
        match self.scanner.get_token()? {
            Some(token) => Ok(token),
            None => Err(err("no more tokens", Marker::default())),
        }
    }

    fn peek_token_start(&mut self) -> YamlResult<Marker> {
        Ok(self.scanner.peek_token()?.map(|t| t.start).unwrap_or_default())
    }

    fn peek_token_end(&mut self) -> YamlResult<Marker> {
        Ok(self.scanner.peek_token()?.map(|t| t.end).unwrap_or_default())
    }

    fn peek_token_marks(&mut self) -> YamlResult<(Marker, Marker)> {
        Ok(self
            .scanner
            .peek_token()?
            .map(|t| (t.start, t.end))
            .unwrap_or_default())
    }

    fn peek_token_id(&mut self) -> YamlResult<(String, Marker)> {
        Ok(match self.scanner.peek_token()? {
            Some(token) => (token.kind.to_string(), token.start),
            None => ("<end of stream>".to_string(), Marker::default()),
        })
    }

    fn last_mark(&self) -> Marker {
        self.marks.last().copied().unwrap_or_default()
    }

    /// Moves comments off a consumed structural token onto the upcoming
    /// token, so they reach the node they visually belong to. Nothing is
    /// pushed past the end of the document. A run behind a block end splits
    /// at its first blank line: the lines above the blank stay with the
    /// collection that just closed.
    fn move_token_comment(&mut self, token: &mut Token) -> YamlResult<()> {
        if token.comments.is_empty() {
            return Ok(());
        }
        if let Some(target) = self.scanner.peek_token_mut()? {
            if matches!(target.kind, TokenKind::StreamEnd | TokenKind::DocumentStart) {
                return Ok(());
            }
            let mut c = mem::take(&mut token.comments);
            if token.kind == TokenKind::BlockEnd {
                if let Some(kept) = c.split_pre_on_first_blank() {
                    token.comments.pre = kept;
                }
            }
            // moved comments sit physically before the target's own run
            c.pre.append(&mut target.comments.pre);
            target.comments.pre = c.pre;
            if let Some(eol) = c.eol {
                match target.comments.eol {
                    None => target.comments.eol = Some(eol),
                    Some(_) => target.comments.post.push(eol),
                }
            }
            target.comments.post.extend(c.post);
        }
        Ok(())
    }

    fn process_empty_scalar(&self, mark: Marker, comments: CommentSlots) -> Event {
        Event::new(
            EventKind::Scalar {
                anchor: None,
                tag: None,
                implicit: (true, false),
                value: String::new(),
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        )
        .with_comments(comments)
    }

    // ------------------------------------------------------------------
    // documents

    fn parse_stream_start(&mut self) -> YamlResult<Event> {
        let mut token = self.take_token()?;
        self.move_token_comment(&mut token)?;
        self.state = Some(State::ImplicitDocumentStart);
        Ok(Event::new(EventKind::StreamStart, token.start, token.end))
    }

    fn parse_implicit_document_start(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| {
            matches!(
                k,
                TokenKind::Directive { .. } | TokenKind::DocumentStart | TokenKind::StreamEnd
            )
        })? {
            return self.parse_document_start();
        }
        self.tag_handles = DEFAULT_TAGS
            .iter()
            .map(|(h, p)| ((*h).to_string(), (*p).to_string()))
            .collect();
        self.version = None;
        let mark = self.peek_token_start()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::BlockNode);
        Ok(Event::new(
            EventKind::DocumentStart {
                explicit: false,
                version: None,
                tags: None,
            },
            mark,
            mark,
        ))
    }

    fn parse_document_start(&mut self) -> YamlResult<Event> {
        // Skip any extra document end indicators.
        while self.scanner.check_token(|k| *k == TokenKind::DocumentEnd)? {
            let _ = self.scanner.get_token()?;
        }
        if self.scanner.check_token(|k| *k == TokenKind::StreamEnd)? {
            let token = self.take_token()?;
            if !self.states.is_empty() || !self.marks.is_empty() {
                return Err(err("state stack not empty at the end of the stream", token.start));
            }
            self.state = None;
            return Ok(Event::new(EventKind::StreamEnd, token.start, token.end)
                .with_comments(token.comments));
        }
        let (version, tags) = self.process_directives()?;
        if !self.scanner.check_token(|k| *k == TokenKind::DocumentStart)? {
            let (id, mark) = self.peek_token_id()?;
            return Err(err(
                format!("expected '<document start>', but found {id:?}"),
                mark,
            ));
        }
        let token = self.take_token()?;
        self.states.push(State::DocumentEnd);
        self.state = Some(State::DocumentContent);
        let mut comments = token.comments;
        if !self.directive_comments.is_empty() {
            let mut pre = mem::take(&mut self.directive_comments);
            pre.append(&mut comments.pre);
            comments.pre = pre;
        }
        Ok(Event::new(
            EventKind::DocumentStart {
                explicit: true,
                version,
                tags,
            },
            token.start,
            token.end,
        )
        .with_comments(comments))
    }

    fn parse_document_end(&mut self) -> YamlResult<Event> {
        let start = self.peek_token_start()?;
        let mut end = start;
        let mut explicit = false;
        let mut comments = CommentSlots::default();
        if self.scanner.check_token(|k| *k == TokenKind::DocumentEnd)? {
            let token = self.take_token()?;
            end = token.end;
            explicit = true;
            comments = token.comments;
        }
        // A trailing comment run gathers on the stream end token; claim it
        // here so it stays with the document it follows. After an explicit
        // `...` the run sits past the marker and is left alone.
        if !explicit {
            if let Some(token) = self.scanner.peek_token_mut()? {
                if token.kind == TokenKind::StreamEnd && !token.comments.pre.is_empty() {
                    comments.post.append(&mut token.comments.pre);
                }
            }
        }
        self.state = Some(if self.processing_version() == (1, 1) {
            State::DocumentStart
        } else {
            State::ImplicitDocumentStart
        });
        Ok(Event::new(EventKind::DocumentEnd { explicit }, start, end).with_comments(comments))
    }

    fn parse_document_content(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| {
            matches!(
                k,
                TokenKind::Directive { .. }
                    | TokenKind::DocumentStart
                    | TokenKind::DocumentEnd
                    | TokenKind::StreamEnd
            )
        })? {
            let mark = self.peek_token_start()?;
            let event = self.process_empty_scalar(mark, CommentSlots::default());
            self.state = self.states.pop();
            Ok(event)
        } else {
            self.parse_node(true, false)
        }
    }

    #[allow(clippy::type_complexity)]
    fn process_directives(
        &mut self,
    ) -> YamlResult<(Option<YamlVersion>, Option<Vec<(String, String)>>)> {
        let mut yaml_version = None;
        self.tag_handles.clear();
        while self
            .scanner
            .check_token(|k| matches!(k, TokenKind::Directive { .. }))?
        {
            let mut token = self.take_token()?;
            self.directive_comments.append(&mut token.comments.pre);
            if let TokenKind::Directive { value, .. } = token.kind {
                match value {
                    DirectiveValue::Yaml(major, minor) => {
                        if yaml_version.is_some() {
                            return Err(err("found duplicate YAML directive", token.start));
                        }
                        if major != 1 {
                            return Err(err(
                                "found incompatible YAML document (version 1.* is required)",
                                token.start,
                            ));
                        }
                        yaml_version = Some((major, minor));
                    }
                    DirectiveValue::Tag { handle, prefix } => {
                        if self.tag_handles.iter().any(|(h, _)| *h == handle) {
                            return Err(err(
                                format!("duplicate tag handle {handle:?}"),
                                token.start,
                            ));
                        }
                        self.tag_handles.push((handle, prefix));
                    }
                    DirectiveValue::Reserved => {}
                }
            }
        }
        let tags = if self.tag_handles.is_empty() {
            None
        } else {
            Some(self.tag_handles.clone())
        };
        for (key, value) in DEFAULT_TAGS {
            if !self.tag_handles.iter().any(|(h, _)| h == key) {
                self.tag_handles.push((key.to_string(), value.to_string()));
            }
        }
        self.version = yaml_version;
        Ok((yaml_version, tags))
    }

    // ------------------------------------------------------------------
    // nodes

    fn transform_tag(&self, handle: &str, suffix: &str) -> String {
        if handle == "!!" && CORE_TAGS.contains(&suffix) {
            let prefix = self
                .tag_handles
                .iter()
                .find(|(h, _)| h == handle)
                .map(|(_, p)| p.as_str())
                .unwrap_or("tag:yaml.org,2002:");
            return format!("{prefix}{suffix}");
        }
        format!("{handle}{suffix}")
    }

    #[allow(clippy::too_many_lines)]
    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> YamlResult<Event> {
        if self
            .scanner
            .check_token(|k| matches!(k, TokenKind::Alias(_)))?
        {
            let token = self.take_token()?;
            if let TokenKind::Alias(name) = token.kind {
                let event = Event::new(EventKind::Alias { name }, token.start, token.end)
                    .with_comments(token.comments);
                self.state = self.states.pop();
                return Ok(event);
            }
        }
        let mut anchor: Option<String> = None;
        let mut tag_parts: Option<(Option<String>, String)> = None;
        let mut start_mark: Option<Marker> = None;
        let mut end_mark = Marker::default();
        let mut tag_mark = Marker::default();
        if self
            .scanner
            .check_token(|k| matches!(k, TokenKind::Anchor(_)))?
        {
            let mut token = self.take_token()?;
            self.move_token_comment(&mut token)?;
            start_mark = Some(token.start);
            end_mark = token.end;
            if let TokenKind::Anchor(name) = token.kind {
                anchor = Some(name);
            }
            if self
                .scanner
                .check_token(|k| matches!(k, TokenKind::Tag { .. }))?
            {
                let token = self.take_token()?;
                tag_mark = token.start;
                end_mark = token.end;
                if let TokenKind::Tag { handle, suffix } = token.kind {
                    tag_parts = Some((handle, suffix));
                }
            }
        } else if self
            .scanner
            .check_token(|k| matches!(k, TokenKind::Tag { .. }))?
        {
            let token = self.take_token()?;
            start_mark = Some(token.start);
            tag_mark = token.start;
            end_mark = token.end;
            if let TokenKind::Tag { handle, suffix } = token.kind {
                tag_parts = Some((handle, suffix));
            }
            if self
                .scanner
                .check_token(|k| matches!(k, TokenKind::Anchor(_)))?
            {
                let token = self.take_token()?;
                end_mark = token.end;
                if let TokenKind::Anchor(name) = token.kind {
                    anchor = Some(name);
                }
            }
        }
        let mut tag: Option<String> = None;
        if let Some((handle, suffix)) = tag_parts {
            match handle {
                Some(handle) => {
                    if !self.tag_handles.iter().any(|(h, _)| *h == handle) {
                        return Err(err_ctx(
                            "while parsing a node",
                            start_mark.unwrap_or(tag_mark),
                            format!("found undefined tag handle {handle:?}"),
                            tag_mark,
                        ));
                    }
                    tag = Some(self.transform_tag(&handle, &suffix));
                }
                None => tag = Some(suffix),
            }
        }
        let start_mark = match start_mark {
            Some(mark) => mark,
            None => {
                let mark = self.peek_token_start()?;
                end_mark = mark;
                mark
            }
        };
        let implicit = tag.is_none() || tag.as_deref() == Some("!");

        if indentless_sequence && self.scanner.check_token(|k| *k == TokenKind::BlockEntry)? {
            let mut comments = CommentSlots::default();
            if let Some(pt) = self.scanner.peek_token_mut()? {
                // a comment after the key's ':' describes the sequence
                comments.eol = pt.comments.eol.take();
                end_mark = pt.end;
            }
            let event = Event::new(
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow: false,
                },
                start_mark,
                end_mark,
            )
            .with_comments(comments);
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(event);
        }

        if self
            .scanner
            .check_token(|k| matches!(k, TokenKind::Scalar { .. }))?
        {
            let token = self.take_token()?;
            end_mark = token.end;
            let comments = token.comments;
            if let TokenKind::Scalar { value, style } = token.kind {
                let implicit_pair = if (style == ScalarStyle::Plain && tag.is_none())
                    || tag.as_deref() == Some("!")
                {
                    (true, false)
                } else if tag.is_none() {
                    (false, true)
                } else {
                    (false, false)
                };
                let event = Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        implicit: implicit_pair,
                        value,
                        style,
                    },
                    start_mark,
                    end_mark,
                )
                .with_comments(comments);
                self.state = self.states.pop();
                return Ok(event);
            }
        } else if self
            .scanner
            .check_token(|k| *k == TokenKind::FlowSequenceStart)?
        {
            let mut comments = CommentSlots::default();
            if let Some(pt) = self.scanner.peek_token_mut()? {
                end_mark = pt.end;
                comments = mem::take(&mut pt.comments);
            }
            let event = Event::new(
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow: true,
                },
                start_mark,
                end_mark,
            )
            .with_comments(comments);
            self.state = Some(State::FlowSequenceFirstEntry);
            return Ok(event);
        } else if self
            .scanner
            .check_token(|k| *k == TokenKind::FlowMappingStart)?
        {
            let mut comments = CommentSlots::default();
            if let Some(pt) = self.scanner.peek_token_mut()? {
                end_mark = pt.end;
                comments = mem::take(&mut pt.comments);
            }
            let event = Event::new(
                EventKind::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow: true,
                },
                start_mark,
                end_mark,
            )
            .with_comments(comments);
            self.state = Some(State::FlowMappingFirstKey);
            return Ok(event);
        } else if block
            && self
                .scanner
                .check_token(|k| *k == TokenKind::BlockSequenceStart)?
        {
            let mut comments = CommentSlots::default();
            if let Some(pt) = self.scanner.peek_token_mut()? {
                end_mark = pt.start;
                comments = mem::take(&mut pt.comments);
            }
            let event = Event::new(
                EventKind::SequenceStart {
                    anchor,
                    tag,
                    implicit,
                    flow: false,
                },
                start_mark,
                end_mark,
            )
            .with_comments(comments);
            self.state = Some(State::BlockSequenceFirstEntry);
            return Ok(event);
        } else if block
            && self
                .scanner
                .check_token(|k| *k == TokenKind::BlockMappingStart)?
        {
            let mut comments = CommentSlots::default();
            if let Some(pt) = self.scanner.peek_token_mut()? {
                end_mark = pt.start;
                comments = mem::take(&mut pt.comments);
            }
            let event = Event::new(
                EventKind::MappingStart {
                    anchor,
                    tag,
                    implicit,
                    flow: false,
                },
                start_mark,
                end_mark,
            )
            .with_comments(comments);
            self.state = Some(State::BlockMappingFirstKey);
            return Ok(event);
        } else if anchor.is_some() || tag.is_some() {
            // Empty scalars are allowed even if a tag or an anchor is
            // specified.
            let event = Event::new(
                EventKind::Scalar {
                    anchor,
                    tag,
                    implicit: (implicit, false),
                    value: String::new(),
                    style: ScalarStyle::Plain,
                },
                start_mark,
                end_mark,
            );
            self.state = self.states.pop();
            return Ok(event);
        }
        let node = if block { "block" } else { "flow" };
        let (id, mark) = self.peek_token_id()?;
        Err(err_ctx(
            format!("while parsing a {node} node"),
            start_mark,
            format!("expected the node content, but found {id:?}"),
            mark,
        ))
    }

    // ------------------------------------------------------------------
    // block collections

    fn parse_block_sequence_first_entry(&mut self) -> YamlResult<Event> {
        let token = self.take_token()?;
        self.marks.push(token.start);
        self.parse_block_sequence_entry()
    }

    fn parse_block_sequence_entry(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| *k == TokenKind::BlockEntry)? {
            let mut token = self.take_token()?;
            self.move_token_comment(&mut token)?;
            if !self
                .scanner
                .check_token(|k| matches!(k, TokenKind::BlockEntry | TokenKind::BlockEnd))?
            {
                self.states.push(State::BlockSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::BlockSequenceEntry);
            return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
        }
        if !self.scanner.check_token(|k| *k == TokenKind::BlockEnd)? {
            let (id, mark) = self.peek_token_id()?;
            return Err(err_ctx(
                "while parsing a block collection",
                self.last_mark(),
                format!("expected <block end>, but found {id:?}"),
                mark,
            ));
        }
        let token = self.take_token()?;
        let event = Event::new(EventKind::SequenceEnd, token.start, token.end)
            .with_comments(token.comments);
        self.state = self.states.pop();
        self.marks.pop();
        Ok(event)
    }

    fn parse_indentless_sequence_entry(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| *k == TokenKind::BlockEntry)? {
            let mut token = self.take_token()?;
            self.move_token_comment(&mut token)?;
            if !self.scanner.check_token(|k| {
                matches!(
                    k,
                    TokenKind::BlockEntry
                        | TokenKind::Key
                        | TokenKind::Value
                        | TokenKind::BlockEnd
                )
            })? {
                self.states.push(State::IndentlessSequenceEntry);
                return self.parse_node(true, false);
            }
            self.state = Some(State::IndentlessSequenceEntry);
            return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
        }
        // An indentless sequence has no closing token; comments stay on
        // the following token and attach to whatever comes next.
        let mark = self.peek_token_start()?;
        self.state = self.states.pop();
        Ok(Event::new(EventKind::SequenceEnd, mark, mark))
    }

    fn parse_block_mapping_first_key(&mut self) -> YamlResult<Event> {
        let token = self.take_token()?;
        self.marks.push(token.start);
        self.parse_block_mapping_key()
    }

    fn parse_block_mapping_key(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| *k == TokenKind::Key)? {
            let mut token = self.take_token()?;
            self.move_token_comment(&mut token)?;
            if !self.scanner.check_token(|k| {
                matches!(
                    k,
                    TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
                )
            })? {
                self.states.push(State::BlockMappingValue);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingValue);
            return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
        }
        if self.processing_version() > MINIMUM_YAML_VERSION
            && self.scanner.check_token(|k| *k == TokenKind::Value)?
        {
            let mark = self.peek_token_start()?;
            self.state = Some(State::BlockMappingValue);
            return Ok(self.process_empty_scalar(mark, CommentSlots::default()));
        }
        if !self.scanner.check_token(|k| *k == TokenKind::BlockEnd)? {
            let (id, mark) = self.peek_token_id()?;
            return Err(err_ctx(
                "while parsing a block mapping",
                self.last_mark(),
                format!("expected <block end>, but found {id:?}"),
                mark,
            ));
        }
        let mut token = self.take_token()?;
        self.move_token_comment(&mut token)?;
        let event =
            Event::new(EventKind::MappingEnd, token.start, token.end).with_comments(token.comments);
        self.state = self.states.pop();
        self.marks.pop();
        Ok(event)
    }

    fn parse_block_mapping_value(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| *k == TokenKind::Value)? {
            let mut token = self.take_token()?;
            if self.scanner.check_token(|k| *k == TokenKind::Value)? {
                self.move_token_comment(&mut token)?;
            } else if !self.scanner.check_token(|k| *k == TokenKind::Key)? {
                // an empty value for this key keeps the comment on the
                // value token
                self.move_token_comment(&mut token)?;
            }
            if !self.scanner.check_token(|k| {
                matches!(
                    k,
                    TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
                )
            })? {
                self.states.push(State::BlockMappingKey);
                return self.parse_node(true, true);
            }
            self.state = Some(State::BlockMappingKey);
            let mut end_mark = token.end;
            let mut comments = mem::take(&mut token.comments);
            if comments.is_empty() {
                if let Some(pt) = self.scanner.peek_token_mut()? {
                    end_mark = pt.end;
                    comments.eol = pt.comments.eol.take();
                    comments.post = mem::take(&mut pt.comments.post);
                }
            }
            return Ok(self.process_empty_scalar(end_mark, comments));
        }
        self.state = Some(State::BlockMappingKey);
        let mark = self.peek_token_start()?;
        Ok(self.process_empty_scalar(mark, CommentSlots::default()))
    }

    // ------------------------------------------------------------------
    // flow collections

    fn parse_flow_sequence_first_entry(&mut self) -> YamlResult<Event> {
        let token = self.take_token()?;
        self.marks.push(token.start);
        self.parse_flow_sequence_entry(true)
    }

    fn parse_flow_sequence_entry(&mut self, first: bool) -> YamlResult<Event> {
        if !self
            .scanner
            .check_token(|k| *k == TokenKind::FlowSequenceEnd)?
            && !first
        {
            if self.scanner.check_token(|k| *k == TokenKind::FlowEntry)? {
                let _ = self.scanner.get_token()?;
            } else {
                let (id, mark) = self.peek_token_id()?;
                return Err(err_ctx(
                    "while parsing a flow sequence",
                    self.last_mark(),
                    format!("expected ',' or ']', but got {id:?}"),
                    mark,
                ));
            }
        }
        if self.scanner.check_token(|k| *k == TokenKind::Key)? {
            let (start, end) = self.peek_token_marks()?;
            let event = Event::new(
                EventKind::MappingStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    flow: true,
                },
                start,
                end,
            );
            self.state = Some(State::FlowSequenceEntryMappingKey);
            return Ok(event);
        }
        if !self
            .scanner
            .check_token(|k| *k == TokenKind::FlowSequenceEnd)?
        {
            self.states.push(State::FlowSequenceEntry);
            return self.parse_node(false, false);
        }
        let token = self.take_token()?;
        let event = Event::new(EventKind::SequenceEnd, token.start, token.end)
            .with_comments(token.comments);
        self.state = self.states.pop();
        self.marks.pop();
        Ok(event)
    }

    fn parse_flow_sequence_entry_mapping_key(&mut self) -> YamlResult<Event> {
        let token = self.take_token()?;
        if self.scanner.check_token(|k| {
            matches!(
                k,
                TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
            )
        })? {
            self.state = Some(State::FlowSequenceEntryMappingValue);
            return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
        }
        self.states.push(State::FlowSequenceEntryMappingValue);
        self.parse_node(false, false)
    }

    fn parse_flow_sequence_entry_mapping_value(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| *k == TokenKind::Value)? {
            let token = self.take_token()?;
            if self.scanner.check_token(|k| {
                matches!(k, TokenKind::FlowEntry | TokenKind::FlowSequenceEnd)
            })? {
                self.state = Some(State::FlowSequenceEntryMappingEnd);
                return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
            }
            self.states.push(State::FlowSequenceEntryMappingEnd);
            return self.parse_node(false, false);
        }
        self.state = Some(State::FlowSequenceEntryMappingEnd);
        let mark = self.peek_token_start()?;
        Ok(self.process_empty_scalar(mark, CommentSlots::default()))
    }

    fn parse_flow_sequence_entry_mapping_end(&mut self) -> YamlResult<Event> {
        self.state = Some(State::FlowSequenceEntry);
        let mark = self.peek_token_start()?;
        Ok(Event::new(EventKind::MappingEnd, mark, mark))
    }

    fn parse_flow_mapping_first_key(&mut self) -> YamlResult<Event> {
        let token = self.take_token()?;
        self.marks.push(token.start);
        self.parse_flow_mapping_key(true)
    }

    fn parse_flow_mapping_key(&mut self, first: bool) -> YamlResult<Event> {
        if !self
            .scanner
            .check_token(|k| *k == TokenKind::FlowMappingEnd)?
        {
            if !first {
                if self.scanner.check_token(|k| *k == TokenKind::FlowEntry)? {
                    let _ = self.scanner.get_token()?;
                } else {
                    let (id, mark) = self.peek_token_id()?;
                    return Err(err_ctx(
                        "while parsing a flow mapping",
                        self.last_mark(),
                        format!("expected ',' or '}}', but got {id:?}"),
                        mark,
                    ));
                }
            }
            if self.scanner.check_token(|k| *k == TokenKind::Key)? {
                let token = self.take_token()?;
                if self.scanner.check_token(|k| {
                    matches!(
                        k,
                        TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd
                    )
                })? {
                    self.state = Some(State::FlowMappingValue);
                    return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
                }
                self.states.push(State::FlowMappingValue);
                return self.parse_node(false, false);
            }
            if self.processing_version() > MINIMUM_YAML_VERSION
                && self.scanner.check_token(|k| *k == TokenKind::Value)?
            {
                let mark = self.peek_token_end()?;
                self.state = Some(State::FlowMappingValue);
                return Ok(self.process_empty_scalar(mark, CommentSlots::default()));
            }
            if !self
                .scanner
                .check_token(|k| *k == TokenKind::FlowMappingEnd)?
            {
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let token = self.take_token()?;
        let event =
            Event::new(EventKind::MappingEnd, token.start, token.end).with_comments(token.comments);
        self.state = self.states.pop();
        self.marks.pop();
        Ok(event)
    }

    fn parse_flow_mapping_value(&mut self) -> YamlResult<Event> {
        if self.scanner.check_token(|k| *k == TokenKind::Value)? {
            let token = self.take_token()?;
            if self.scanner.check_token(|k| {
                matches!(k, TokenKind::FlowEntry | TokenKind::FlowMappingEnd)
            })? {
                self.state = Some(State::FlowMappingKey);
                return Ok(self.process_empty_scalar(token.end, CommentSlots::default()));
            }
            self.states.push(State::FlowMappingKey);
            return self.parse_node(false, false);
        }
        self.state = Some(State::FlowMappingKey);
        let mark = self.peek_token_start()?;
        Ok(self.process_empty_scalar(mark, CommentSlots::default()))
    }

    fn parse_flow_mapping_empty_value(&mut self) -> YamlResult<Event> {
        self.state = Some(State::FlowMappingKey);
        let mark = self.peek_token_start()?;
        Ok(self.process_empty_scalar(mark, CommentSlots::default()))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reader::Reader;
    use yarrow_common::DEFAULT_YAML_VERSION;

    fn parser_for(input: &str) -> Parser {
        let reader = Reader::from_str(input).unwrap();
        Parser::new(Scanner::new(reader, DEFAULT_YAML_VERSION))
    }

    fn events_of(input: &str) -> Vec<EventKind> {
        let mut parser = parser_for(input);
        let mut out = Vec::new();
        while let Some(event) = parser.get_event().unwrap() {
            out.push(event.kind);
        }
        out
    }

    fn plain(value: &str) -> EventKind {
        EventKind::Scalar {
            anchor: None,
            tag: None,
            implicit: (true, false),
            value: value.to_string(),
            style: ScalarStyle::Plain,
        }
    }

    #[test]
    fn block_mapping_events() {
        let kinds = events_of("a: 1\nb: 2\n");
        assert_eq!(
            kinds,
            vec![
                EventKind::StreamStart,
                EventKind::DocumentStart {
                    explicit: false,
                    version: None,
                    tags: None
                },
                EventKind::MappingStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    flow: false
                },
                plain("a"),
                plain("1"),
                plain("b"),
                plain("2"),
                EventKind::MappingEnd,
                EventKind::DocumentEnd { explicit: false },
                EventKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn nested_flow_events() {
        let kinds = events_of("[a, {b: c}]");
        assert_eq!(
            kinds,
            vec![
                EventKind::StreamStart,
                EventKind::DocumentStart {
                    explicit: false,
                    version: None,
                    tags: None
                },
                EventKind::SequenceStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    flow: true
                },
                plain("a"),
                EventKind::MappingStart {
                    anchor: None,
                    tag: None,
                    implicit: true,
                    flow: true
                },
                plain("b"),
                plain("c"),
                EventKind::MappingEnd,
                EventKind::SequenceEnd,
                EventKind::DocumentEnd { explicit: false },
                EventKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn explicit_document_carries_version() {
        let kinds = events_of("%YAML 1.2\n---\n- x\n");
        assert_eq!(
            kinds[1],
            EventKind::DocumentStart {
                explicit: true,
                version: Some((1, 2)),
                tags: None
            }
        );
        assert!(kinds.contains(&plain("x")));
    }

    #[test]
    fn anchors_and_aliases() {
        let kinds = events_of("x: &a 1\ny: *a\n");
        assert!(kinds.contains(&EventKind::Scalar {
            anchor: Some("a".to_string()),
            tag: None,
            implicit: (true, false),
            value: "1".to_string(),
            style: ScalarStyle::Plain,
        }));
        assert!(kinds.contains(&EventKind::Alias {
            name: "a".to_string()
        }));
    }

    #[test]
    fn missing_key_gets_empty_scalar() {
        let kinds = events_of("a:\nb: 1\n");
        assert_eq!(kinds[3], plain("a"));
        assert_eq!(kinds[4], plain(""));
        assert_eq!(kinds[5], plain("b"));
    }

    #[test]
    fn core_shorthand_expands_others_stay() {
        let kinds = events_of("a: !!str x\nb: !custom y\n");
        assert!(kinds.contains(&EventKind::Scalar {
            anchor: None,
            tag: Some("tag:yaml.org,2002:str".to_string()),
            implicit: (false, false),
            value: "x".to_string(),
            style: ScalarStyle::Plain,
        }));
        assert!(kinds.contains(&EventKind::Scalar {
            anchor: None,
            tag: Some("!custom".to_string()),
            implicit: (false, false),
            value: "y".to_string(),
            style: ScalarStyle::Plain,
        }));
    }

    #[test]
    fn undefined_tag_handle_is_an_error() {
        let mut parser = parser_for("!e!x 1\n");
        let mut result = Ok(());
        loop {
            match parser.get_event() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        match result {
            Err(YamlError::Parser(marked)) => {
                assert!(marked.problem.contains("found undefined tag handle"));
            }
            other => panic!("expected parser error, got {other:?}"),
        }
    }

    #[test]
    fn unseparated_flow_entries_are_an_error() {
        let mut parser = parser_for("[a b]\n");
        let mut failed = false;
        loop {
            match parser.get_event() {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(YamlError::Parser(marked)) => {
                    assert!(marked.problem.contains("expected ',' or ']'"));
                    failed = true;
                    break;
                }
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        assert!(failed);
    }

    #[test]
    fn eol_comment_rides_the_scalar_event() {
        let mut parser = parser_for("- a # x\n- b\n");
        let mut seen = None;
        while let Some(event) = parser.get_event().unwrap() {
            if let EventKind::Scalar { value, .. } = &event.kind {
                if value == "a" {
                    seen = event.comments.eol.clone();
                }
            }
        }
        assert_eq!(seen.unwrap().value, "# x\n");
    }
}
