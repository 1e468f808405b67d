//! Token scanner.
//!
//! Follows the classic two-queue design: tokens are produced into a deque
//! ahead of the consumer, with simple-key bookkeeping deciding how far
//! ahead scanning must run. Comments and blank lines are scanned as
//! standalone comment tokens; `get_token`/`peek_token` fold them into the
//! comment slots of their neighbouring real tokens, so the parser only
//! ever sees real tokens, already annotated.

use std::collections::{HashMap, VecDeque};

use crate::char_util::{
    as_hex, is_anchor_char, is_any_break, is_blank, is_end_space_tab, is_the_end,
};
use crate::reader::Reader;
use crate::token::{DirectiveValue, Token, TokenKind};
use yarrow_common::{
    Comment, CommentKind, Marked, Marker, ScalarStyle, YamlError, YamlResult, YamlVersion,
};

/// Simple keys are limited to a single line and this many characters.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

fn err(problem: impl Into<String>, mark: Marker) -> YamlError {
    YamlError::Scanner(Marked::problem(problem, mark))
}

fn err_ctx(
    context: impl Into<String>,
    context_mark: Marker,
    problem: impl Into<String>,
    problem_mark: Marker,
) -> YamlError {
    YamlError::Scanner(Marked::contextual(context, context_mark, problem, problem_mark))
}

fn escape_replacement(c: char) -> Option<char> {
    Some(match c {
        '0' => '\0',
        'a' => '\x07',
        'b' => '\x08',
        't' | '\t' => '\t',
        'n' => '\n',
        'v' => '\x0b',
        'f' => '\x0c',
        'r' => '\r',
        'e' => '\x1b',
        ' ' => ' ',
        '"' => '"',
        '/' => '/',
        '\\' => '\\',
        'N' => '\u{85}',
        '_' => '\u{a0}',
        'L' => '\u{2028}',
        'P' => '\u{2029}',
        _ => return None,
    })
}

fn escape_code_length(c: char) -> Option<usize> {
    match c {
        'x' => Some(2),
        'u' => Some(4),
        'U' => Some(8),
        _ => None,
    }
}

/// Tokens an end-of-line comment may attach to.
fn post_comment_eligible(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Scalar { .. }
            | TokenKind::Value
            | TokenKind::FlowSequenceEnd
            | TokenKind::FlowMappingEnd
    )
}

fn comment_kind(value: &str) -> CommentKind {
    if value.starts_with('#') {
        CommentKind::Line
    } else {
        CommentKind::Blank
    }
}

/// A potential simple key: a key without a leading `?`, recognised
/// retroactively when its `:` arrives.
#[derive(Clone, Copy, Debug)]
struct SimpleKey {
    token_number: usize,
    required: bool,
    index: usize,
    line: u32,
    col: u32,
    mark: Marker,
}

pub struct Scanner {
    reader: Reader,
    done: bool,
    /// Open flow collections, `'['` or `'{'` each.
    flow_context: Vec<char>,
    tokens: VecDeque<Token>,
    tokens_taken: usize,
    indent: i64,
    indents: Vec<i64>,
    allow_simple_key: bool,
    possible_simple_keys: HashMap<usize, SimpleKey>,
    version: YamlVersion,
    default_version: YamlVersion,
}

impl Scanner {
    #[must_use]
    pub fn new(reader: Reader, version: YamlVersion) -> Scanner {
        let mut scanner = Scanner {
            reader,
            done: false,
            flow_context: Vec::new(),
            tokens: VecDeque::new(),
            tokens_taken: 0,
            indent: -1,
            indents: Vec::new(),
            allow_simple_key: true,
            possible_simple_keys: HashMap::new(),
            version,
            default_version: version,
        };
        scanner.reader.set_version(version);
        let mark = scanner.reader.get_mark();
        scanner
            .tokens
            .push_back(Token::new(TokenKind::StreamStart, mark, mark));
        scanner
    }

    /// The version currently governing scanning, set by a `%YAML`
    /// directive or the configured default.
    #[must_use]
    pub fn yaml_version(&self) -> YamlVersion {
        self.version
    }

    pub fn check_token(&mut self, pred: impl Fn(&TokenKind) -> bool) -> YamlResult<bool> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        self.gather_comments()?;
        Ok(match self.tokens.front() {
            Some(token) => pred(&token.kind),
            None => false,
        })
    }

    pub fn peek_token(&mut self) -> YamlResult<Option<&Token>> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        self.gather_comments()?;
        Ok(self.tokens.front())
    }

    /// Like [`peek_token`](Scanner::peek_token), but allows the caller to
    /// reattach comments before the token is consumed.
    pub fn peek_token_mut(&mut self) -> YamlResult<Option<&mut Token>> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        self.gather_comments()?;
        Ok(self.tokens.front_mut())
    }

    pub fn get_token(&mut self) -> YamlResult<Option<Token>> {
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
        }
        self.gather_comments()?;
        if self.tokens.is_empty() {
            return Ok(None);
        }
        let next_comment_line = match (self.tokens.front(), self.tokens.get(1)) {
            (Some(front), Some(next)) if next.kind.is_comment() => {
                Some((front.end.line, next.start.line))
            }
            _ => None,
        };
        let front_kind_eligible = self
            .tokens
            .front()
            .map(|t| post_comment_eligible(&t.kind))
            .unwrap_or(false);
        let front_is_scalar = self
            .tokens
            .front()
            .map(|t| matches!(t.kind, TokenKind::Scalar { .. }))
            .unwrap_or(false);
        match next_comment_line {
            // Only single line tokens take an end-of-line comment; anything
            // else would leave it stranded on a structural token.
            Some((end_line, start_line)) if end_line == start_line && front_kind_eligible => {
                self.tokens_taken += 1;
                if let Some(taken) = self.tokens.remove(1) {
                    if let Some(mut c) = taken.into_comment() {
                        c.kind = CommentKind::Eol;
                        self.fetch_more_tokens()?;
                        self.merge_following_comments(&mut c)?;
                        if let Some(front) = self.tokens.front_mut() {
                            match front.comments.eol {
                                None => front.comments.eol = Some(c),
                                Some(_) => front.comments.post.push(c),
                            }
                        }
                    }
                }
            }
            Some((end_line, start_line)) if front_is_scalar => {
                self.tokens_taken += 1;
                if let Some(taken) = self.tokens.remove(1) {
                    if let Some(mut c) = taken.into_comment() {
                        let gap = start_line.saturating_sub(end_line) as usize;
                        let mut value = "\n".repeat(gap);
                        value.push_str(&" ".repeat(c.start.col as usize));
                        value.push_str(&c.value);
                        c.value = value;
                        self.fetch_more_tokens()?;
                        self.merge_following_comments(&mut c)?;
                        if let Some(front) = self.tokens.front_mut() {
                            front.comments.post.push(c);
                        }
                    }
                }
            }
            _ => {}
        }
        self.tokens_taken += 1;
        Ok(self.tokens.pop_front())
    }

    /// Folds consecutive comment tokens behind the front token into `c`,
    /// keeping each line's own indentation.
    fn merge_following_comments(&mut self, c: &mut Comment) -> YamlResult<()> {
        loop {
            let next_is_comment = self
                .tokens
                .get(1)
                .map(|t| t.kind.is_comment())
                .unwrap_or(false);
            if self.tokens.len() < 2 || !next_is_comment {
                return Ok(());
            }
            self.tokens_taken += 1;
            if let Some(taken) = self.tokens.remove(1) {
                if let Some(c1) = taken.into_comment() {
                    c.value.push_str(&" ".repeat(c1.start.col as usize));
                    c.value.push_str(&c1.value);
                }
            }
            self.fetch_more_tokens()?;
        }
    }

    /// Pops leading comment tokens and attaches them as the pre-comment
    /// run of the next real token.
    fn gather_comments(&mut self) -> YamlResult<()> {
        let mut comments: Vec<Comment> = Vec::new();
        if self.tokens.is_empty() {
            return Ok(());
        }
        if self.tokens.front().map(|t| t.kind.is_comment()).unwrap_or(false) {
            if let Some(taken) = self.tokens.pop_front() {
                self.tokens_taken += 1;
                if let Some(c) = taken.into_comment() {
                    comments.push(c);
                }
            }
        }
        while self.need_more_tokens()? {
            self.fetch_more_tokens()?;
            if self.tokens.is_empty() {
                return Ok(());
            }
            if self.tokens.front().map(|t| t.kind.is_comment()).unwrap_or(false) {
                if let Some(taken) = self.tokens.pop_front() {
                    self.tokens_taken += 1;
                    if let Some(c) = taken.into_comment() {
                        comments.push(c);
                    }
                }
            }
        }
        if !comments.is_empty() {
            if let Some(front) = self.tokens.front_mut() {
                front.comments.pre.extend(comments);
            }
        }
        // keep a second token around so eol comments can be claimed
        if !self.done && self.tokens.len() < 2 {
            self.fetch_more_tokens()?;
        }
        Ok(())
    }

    fn flow_level(&self) -> usize {
        self.flow_context.len()
    }

    fn need_more_tokens(&mut self) -> YamlResult<bool> {
        if self.done {
            return Ok(false);
        }
        if self.tokens.is_empty() {
            return Ok(true);
        }
        // The current token may be a potential simple key, so we need to
        // look further.
        self.stale_possible_simple_keys()?;
        Ok(self.next_possible_simple_key() == Some(self.tokens_taken))
    }

    fn fetch_more_tokens(&mut self) -> YamlResult<()> {
        if let Some(comment) = self.scan_to_next_token()? {
            self.fetch_comment(comment);
            return Ok(());
        }
        self.stale_possible_simple_keys()?;
        self.unwind_indent(i64::from(self.reader.col()));

        let ch = self.reader.peek();
        match ch {
            '\0' => self.fetch_stream_end(),
            '%' if self.check_directive() => self.fetch_directive(),
            '-' if self.check_document_start() => self.fetch_document_indicator(true),
            '.' if self.check_document_end() => self.fetch_document_indicator(false),
            '[' => self.fetch_flow_collection_start(TokenKind::FlowSequenceStart, '['),
            '{' => self.fetch_flow_collection_start(TokenKind::FlowMappingStart, '{'),
            ']' => self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            '}' => self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            ',' => self.fetch_flow_entry(),
            '-' if self.check_block_entry() => self.fetch_block_entry(),
            '?' if self.check_key() => self.fetch_key(),
            ':' if self.check_value() => self.fetch_value(),
            '*' => self.fetch_anchor_or_alias(true),
            '&' => self.fetch_anchor_or_alias(false),
            '!' => self.fetch_tag(),
            '|' if self.flow_level() == 0 => self.fetch_block_scalar(ScalarStyle::Literal),
            '>' if self.flow_level() == 0 => self.fetch_block_scalar(ScalarStyle::Folded),
            '\'' => self.fetch_flow_scalar(ScalarStyle::SingleQuote),
            '"' => self.fetch_flow_scalar(ScalarStyle::DoubleQuote),
            _ if self.check_plain() => self.fetch_plain(),
            _ => Err(YamlError::Scanner(Marked {
                context: Some("while scanning for the next token".to_string()),
                problem: format!("found character {ch:?} that cannot start any token"),
                problem_mark: Some(self.reader.get_mark()),
                ..Marked::default()
            })),
        }
    }

    // ------------------------------------------------------------------
    // simple keys

    fn next_possible_simple_key(&self) -> Option<usize> {
        self.possible_simple_keys
            .values()
            .map(|key| key.token_number)
            .min()
    }

    fn stale_possible_simple_keys(&mut self) -> YamlResult<()> {
        let line = self.reader.line();
        let index = self.reader.index();
        let mut stale: Vec<usize> = Vec::new();
        for (level, key) in &self.possible_simple_keys {
            if key.line != line || index - key.index > MAX_SIMPLE_KEY_LENGTH {
                if key.required {
                    return Err(err_ctx(
                        "while scanning a simple key",
                        key.mark,
                        "could not find expected ':'",
                        self.reader.get_mark(),
                    ));
                }
                stale.push(*level);
            }
        }
        for level in stale {
            self.possible_simple_keys.remove(&level);
        }
        Ok(())
    }

    fn save_possible_simple_key(&mut self) -> YamlResult<()> {
        // A simple key is required at the exact indent of a block key line.
        let required = self.flow_level() == 0 && self.indent == i64::from(self.reader.col());
        if self.allow_simple_key {
            self.remove_possible_simple_key()?;
            let token_number = self.tokens_taken + self.tokens.len();
            let key = SimpleKey {
                token_number,
                required,
                index: self.reader.index(),
                line: self.reader.line(),
                col: self.reader.col(),
                mark: self.reader.get_mark(),
            };
            self.possible_simple_keys.insert(self.flow_level(), key);
        }
        Ok(())
    }

    fn remove_possible_simple_key(&mut self) -> YamlResult<()> {
        if let Some(key) = self.possible_simple_keys.remove(&self.flow_level()) {
            if key.required {
                return Err(err_ctx(
                    "while scanning a simple key",
                    key.mark,
                    "could not find expected ':'",
                    self.reader.get_mark(),
                ));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // indentation

    fn unwind_indent(&mut self, column: i64) {
        // In the flow context indentation is ignored; we are less
        // restrictive than the specification requires.
        if self.flow_level() > 0 {
            return;
        }
        while self.indent > column {
            let mark = self.reader.get_mark();
            self.indent = self.indents.pop().unwrap_or(-1);
            self.tokens
                .push_back(Token::new(TokenKind::BlockEnd, mark, mark));
        }
    }

    fn add_indent(&mut self, column: i64) -> bool {
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            return true;
        }
        false
    }

    // ------------------------------------------------------------------
    // fetchers

    fn fetch_stream_end(&mut self) -> YamlResult<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        self.possible_simple_keys.clear();
        let mark = self.reader.get_mark();
        self.tokens
            .push_back(Token::new(TokenKind::StreamEnd, mark, mark));
        self.done = true;
        Ok(())
    }

    fn fetch_directive(&mut self) -> YamlResult<()> {
        self.unwind_indent(-1);
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, start: bool) -> YamlResult<()> {
        self.unwind_indent(-1);
        // There can not be a block collection after '---'.
        self.remove_possible_simple_key()?;
        self.allow_simple_key = false;
        if !start {
            // an explicit document end closes the scope of any %YAML
            // directive seen so far
            self.version = self.default_version;
            self.reader.set_version(self.version);
        }
        let start_mark = self.reader.get_mark();
        self.reader.forward(3);
        let end_mark = self.reader.get_mark();
        let kind = if start {
            TokenKind::DocumentStart
        } else {
            TokenKind::DocumentEnd
        };
        self.tokens.push_back(Token::new(kind, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind, context: char) -> YamlResult<()> {
        self.save_possible_simple_key()?;
        self.flow_context.push(context);
        self.allow_simple_key = true;
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.tokens.push_back(Token::new(kind, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> YamlResult<()> {
        self.remove_possible_simple_key()?;
        // Unbalanced closers are left for the parser to report.
        self.flow_context.pop();
        self.allow_simple_key = false;
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.tokens.push_back(Token::new(kind, start_mark, end_mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> YamlResult<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.tokens
            .push_back(Token::new(TokenKind::FlowEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> YamlResult<()> {
        if self.flow_level() == 0 {
            if !self.allow_simple_key {
                return Err(err(
                    "sequence entries are not allowed here",
                    self.reader.get_mark(),
                ));
            }
            if self.add_indent(i64::from(self.reader.col())) {
                let mark = self.reader.get_mark();
                self.tokens
                    .push_back(Token::new(TokenKind::BlockSequenceStart, mark, mark));
            }
        }
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.tokens
            .push_back(Token::new(TokenKind::BlockEntry, start_mark, end_mark));
        Ok(())
    }

    fn fetch_key(&mut self) -> YamlResult<()> {
        if self.flow_level() == 0 {
            if !self.allow_simple_key {
                return Err(err(
                    "mapping keys are not allowed here",
                    self.reader.get_mark(),
                ));
            }
            if self.add_indent(i64::from(self.reader.col())) {
                let mark = self.reader.get_mark();
                self.tokens
                    .push_back(Token::new(TokenKind::BlockMappingStart, mark, mark));
            }
        }
        self.allow_simple_key = self.flow_level() == 0;
        self.remove_possible_simple_key()?;
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.tokens
            .push_back(Token::new(TokenKind::Key, start_mark, end_mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> YamlResult<()> {
        let flow_level = self.flow_level();
        if let Some(key) = self.possible_simple_keys.remove(&flow_level) {
            let at = key
                .token_number
                .saturating_sub(self.tokens_taken)
                .min(self.tokens.len());
            self.tokens
                .insert(at, Token::new(TokenKind::Key, key.mark, key.mark));
            if flow_level == 0 && self.add_indent(i64::from(key.col)) {
                self.tokens.insert(
                    at,
                    Token::new(TokenKind::BlockMappingStart, key.mark, key.mark),
                );
            }
            // There cannot be two simple keys one after another.
            self.allow_simple_key = false;
        } else {
            if flow_level == 0 {
                if !self.allow_simple_key {
                    return Err(err(
                        "mapping values are not allowed here",
                        self.reader.get_mark(),
                    ));
                }
                if self.add_indent(i64::from(self.reader.col())) {
                    let mark = self.reader.get_mark();
                    self.tokens
                        .push_back(Token::new(TokenKind::BlockMappingStart, mark, mark));
                }
            }
            self.allow_simple_key = flow_level == 0;
            self.remove_possible_simple_key()?;
        }
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        self.tokens
            .push_back(Token::new(TokenKind::Value, start_mark, end_mark));
        Ok(())
    }

    fn fetch_anchor_or_alias(&mut self, alias: bool) -> YamlResult<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> YamlResult<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, style: ScalarStyle) -> YamlResult<()> {
        self.allow_simple_key = true;
        self.remove_possible_simple_key()?;
        self.scan_block_scalar(style)
    }

    fn fetch_flow_scalar(&mut self, style: ScalarStyle) -> YamlResult<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        let token = self.scan_flow_scalar(style)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain(&mut self) -> YamlResult<()> {
        self.save_possible_simple_key()?;
        self.allow_simple_key = false;
        self.scan_plain()
    }

    // ------------------------------------------------------------------
    // checkers

    fn check_directive(&self) -> bool {
        self.reader.col() == 0
    }

    fn check_document_start(&self) -> bool {
        self.reader.col() == 0
            && self.reader.prefix(3) == "---"
            && is_end_space_tab(self.reader.peek_nth(3))
    }

    fn check_document_end(&self) -> bool {
        self.reader.col() == 0
            && self.reader.prefix(3) == "..."
            && is_end_space_tab(self.reader.peek_nth(3))
    }

    fn check_block_entry(&self) -> bool {
        is_end_space_tab(self.reader.peek_nth(1))
    }

    fn check_key(&self) -> bool {
        if self.flow_level() > 0 {
            return true;
        }
        is_end_space_tab(self.reader.peek_nth(1))
    }

    fn check_value(&self) -> bool {
        if self.version == (1, 1) {
            return self.flow_level() > 0 || is_end_space_tab(self.reader.peek_nth(1));
        }
        let next_ends = is_end_space_tab(self.reader.peek_nth(1));
        if self.flow_level() > 0 {
            if self.flow_context.last() == Some(&'[') {
                if !next_ends {
                    return false;
                }
            } else if self
                .tokens
                .back()
                .map(|t| t.kind == TokenKind::Value)
                .unwrap_or(false)
            {
                // scanning the value side of a flow mapping entry
                if !next_ends {
                    return false;
                }
            }
            return true;
        }
        next_ends
    }

    fn check_plain(&self) -> bool {
        let ch = self.reader.peek();
        let forbidden_start =
            "\0 \t\r\n\u{85}\u{2028}\u{2029}-?:,[]{}#&*!|>'\"%@`".contains(ch);
        if self.version == (1, 1) {
            return !forbidden_start
                || (!is_end_space_tab(self.reader.peek_nth(1))
                    && (ch == '-' || (self.flow_level() == 0 && "?:".contains(ch))));
        }
        if !forbidden_start {
            return true;
        }
        let ch1 = self.reader.peek_nth(1);
        if ch == '-' && !is_end_space_tab(ch1) {
            return true;
        }
        if ch == ':' && self.flow_level() > 0 && !is_blank(ch1) {
            return true;
        }
        !is_end_space_tab(ch1) && (ch == '-' || (self.flow_level() == 0 && "?:".contains(ch)))
    }

    // ------------------------------------------------------------------
    // whitespace, comments

    /// Skips spaces and breaks up to the next token. A comment or a run of
    /// blank lines is returned instead, becoming a comment token.
    fn scan_to_next_token(&mut self) -> YamlResult<Option<(String, Marker, Marker)>> {
        if self.reader.index() == 0 && self.reader.peek() == '\u{feff}' {
            self.reader.forward(1);
        }
        loop {
            while self.reader.peek() == ' ' {
                self.reader.forward(1);
            }
            if self.reader.peek() == '#' {
                let start_mark = self.reader.get_mark();
                let mut comment = String::from('#');
                self.reader.forward(1);
                let mut ch = '#';
                while !is_the_end(ch) {
                    ch = self.reader.peek();
                    if ch == '\0' {
                        // the stream ends without the explicit break the
                        // specification asks for
                        comment.push('\n');
                        break;
                    }
                    comment.push(ch);
                    self.reader.forward(1);
                }
                // gather any blank lines following the comment too
                let mut br = self.scan_line_break(false);
                while !br.is_empty() {
                    comment.push_str(&br);
                    br = self.scan_line_break(false);
                }
                let end_mark = self.reader.get_mark();
                if self.flow_level() == 0 {
                    self.allow_simple_key = true;
                }
                return Ok(Some((comment, start_mark, end_mark)));
            }
            if self.scan_line_break(false).is_empty() {
                return Ok(None);
            }
            if self.flow_level() == 0 {
                self.allow_simple_key = true;
            }
            if self.reader.peek() == '\n' {
                // empty toplevel lines
                let start_mark = self.reader.get_mark();
                let mut comment = String::new();
                loop {
                    let br = self.scan_line_break(true);
                    if br.is_empty() {
                        break;
                    }
                    comment.push_str(&br);
                }
                if self.reader.peek() == '#' {
                    // empty line followed by an indented real comment
                    if let Some(pos) = comment.rfind('\n') {
                        comment.truncate(pos);
                        comment.push('\n');
                    }
                }
                let end_mark = self.reader.get_mark();
                return Ok(Some((comment, start_mark, end_mark)));
            }
        }
    }

    fn fetch_comment(&mut self, comment: (String, Marker, Marker)) {
        let (mut value, start_mark, end_mark) = comment;
        // empty line within an indented key context
        while value.ends_with(' ') {
            value.pop();
        }
        let kind = comment_kind(&value);
        self.tokens.push_back(Token::new(
            TokenKind::Comment(Comment::new(kind, value, start_mark)),
            start_mark,
            end_mark,
        ));
    }

    /// Normalises `\r\n`, `\r`, `\n` and NEL to `'\n'`; keeps the Unicode
    /// line separators as themselves. With `empty_line`, blanks inside an
    /// empty line are returned too.
    fn scan_line_break(&mut self, empty_line: bool) -> String {
        let ch = self.reader.peek();
        if ch == '\r' || ch == '\n' || ch == '\u{85}' {
            if self.reader.prefix(2) == "\r\n" {
                self.reader.forward(2);
            } else {
                self.reader.forward(1);
            }
            return "\n".to_string();
        } else if ch == '\u{2028}' || ch == '\u{2029}' {
            self.reader.forward(1);
            return ch.to_string();
        } else if empty_line && (ch == '\t' || ch == ' ') {
            self.reader.forward(1);
            return ch.to_string();
        }
        String::new()
    }

    // ------------------------------------------------------------------
    // directives

    fn scan_directive(&mut self) -> YamlResult<Token> {
        let start_mark = self.reader.get_mark();
        self.reader.forward(1);
        let name = self.scan_directive_name(start_mark)?;
        let value;
        let end_mark;
        match name.as_str() {
            "YAML" => {
                let (major, minor) = self.scan_yaml_directive_value(start_mark)?;
                end_mark = self.reader.get_mark();
                self.version = (major, minor);
                self.reader.set_version(self.version);
                value = DirectiveValue::Yaml(major, minor);
            }
            "TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(start_mark)?;
                end_mark = self.reader.get_mark();
                value = DirectiveValue::Tag { handle, prefix };
            }
            _ => {
                end_mark = self.reader.get_mark();
                while !is_the_end(self.reader.peek()) {
                    self.reader.forward(1);
                }
                value = DirectiveValue::Reserved;
            }
        }
        self.scan_directive_ignored_line(start_mark)?;
        Ok(Token::new(
            TokenKind::Directive { name, value },
            start_mark,
            end_mark,
        ))
    }

    fn scan_directive_name(&mut self, start_mark: Marker) -> YamlResult<String> {
        let mut length = 0;
        let mut ch = self.reader.peek_nth(length);
        while ch.is_ascii_alphanumeric() || "-_:.".contains(ch) {
            length += 1;
            ch = self.reader.peek_nth(length);
        }
        if length == 0 {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek();
        if !(ch == '\0' || ch == ' ' || is_any_break(ch)) {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        Ok(value)
    }

    fn scan_yaml_directive_value(&mut self, start_mark: Marker) -> YamlResult<(u32, u32)> {
        while self.reader.peek() == ' ' {
            self.reader.forward(1);
        }
        let major = self.scan_yaml_directive_number(start_mark)?;
        if self.reader.peek() != '.' {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected a digit or '.', but found {:?}", self.reader.peek()),
                self.reader.get_mark(),
            ));
        }
        self.reader.forward(1);
        let minor = self.scan_yaml_directive_number(start_mark)?;
        let ch = self.reader.peek();
        if !(ch == '\0' || ch == ' ' || is_any_break(ch)) {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected a digit or '.', but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        Ok((major, minor))
    }

    fn scan_yaml_directive_number(&mut self, start_mark: Marker) -> YamlResult<u32> {
        let ch = self.reader.peek();
        if !ch.is_ascii_digit() {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected a digit, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        let mut length = 0;
        while self.reader.peek_nth(length).is_ascii_digit() {
            length += 1;
        }
        let digits = self.reader.prefix(length);
        self.reader.forward(length);
        match digits.parse::<u32>() {
            Ok(value) => Ok(value),
            Err(_) => Err(err_ctx(
                "while scanning a directive",
                start_mark,
                "found an excessively long version number",
                self.reader.get_mark(),
            )),
        }
    }

    fn scan_tag_directive_value(&mut self, start_mark: Marker) -> YamlResult<(String, String)> {
        while self.reader.peek() == ' ' {
            self.reader.forward(1);
        }
        let handle = self.scan_tag_directive_handle(start_mark)?;
        while self.reader.peek() == ' ' {
            self.reader.forward(1);
        }
        let prefix = self.scan_tag_directive_prefix(start_mark)?;
        Ok((handle, prefix))
    }

    fn scan_tag_directive_handle(&mut self, start_mark: Marker) -> YamlResult<String> {
        let value = self.scan_tag_handle("directive", start_mark)?;
        let ch = self.reader.peek();
        if ch != ' ' {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected ' ', but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        Ok(value)
    }

    fn scan_tag_directive_prefix(&mut self, start_mark: Marker) -> YamlResult<String> {
        let value = self.scan_tag_uri("directive", start_mark)?;
        let ch = self.reader.peek();
        if !(ch == '\0' || ch == ' ' || is_any_break(ch)) {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected ' ', but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        Ok(value)
    }

    fn scan_directive_ignored_line(&mut self, start_mark: Marker) -> YamlResult<()> {
        while self.reader.peek() == ' ' {
            self.reader.forward(1);
        }
        if self.reader.peek() == '#' {
            while !is_the_end(self.reader.peek()) {
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek();
        if !is_the_end(ch) {
            return Err(err_ctx(
                "while scanning a directive",
                start_mark,
                format!("expected a comment or a line break, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        self.scan_line_break(false);
        Ok(())
    }

    // ------------------------------------------------------------------
    // anchors, tags

    fn scan_anchor(&mut self, alias: bool) -> YamlResult<Token> {
        let start_mark = self.reader.get_mark();
        let name = if alias { "alias" } else { "anchor" };
        self.reader.forward(1);
        let mut length = 0;
        let mut ch = self.reader.peek_nth(length);
        while is_anchor_char(ch) {
            length += 1;
            ch = self.reader.peek_nth(length);
        }
        if length == 0 {
            return Err(err_ctx(
                format!("while scanning an {name}"),
                start_mark,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        if !"\0 \t\r\n\u{85}\u{2028}\u{2029}?:,[]{}%@`".contains(ch) {
            return Err(err_ctx(
                format!("while scanning an {name}"),
                start_mark,
                format!("expected alphabetic or numeric character, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        let end_mark = self.reader.get_mark();
        let kind = if alias {
            TokenKind::Alias(value)
        } else {
            TokenKind::Anchor(value)
        };
        Ok(Token::new(kind, start_mark, end_mark))
    }

    fn scan_tag(&mut self) -> YamlResult<Token> {
        let start_mark = self.reader.get_mark();
        let mut ch = self.reader.peek_nth(1);
        let handle;
        let suffix;
        if ch == '<' {
            handle = None;
            self.reader.forward(2);
            suffix = self.scan_tag_uri("tag", start_mark)?;
            if self.reader.peek() != '>' {
                return Err(err_ctx(
                    "while parsing a tag",
                    start_mark,
                    format!("expected '>', but found {:?}", self.reader.peek()),
                    self.reader.get_mark(),
                ));
            }
            self.reader.forward(1);
        } else if is_end_space_tab(ch) {
            handle = None;
            suffix = "!".to_string();
            self.reader.forward(1);
        } else {
            let mut length = 1;
            let mut use_handle = false;
            while !(ch == '\0' || ch == ' ' || is_any_break(ch)) {
                if ch == '!' {
                    use_handle = true;
                    break;
                }
                length += 1;
                ch = self.reader.peek_nth(length);
            }
            if use_handle {
                handle = Some(self.scan_tag_handle("tag", start_mark)?);
            } else {
                handle = Some("!".to_string());
                self.reader.forward(1);
            }
            suffix = self.scan_tag_uri("tag", start_mark)?;
        }
        let ch = self.reader.peek();
        if !(ch == '\0' || ch == ' ' || is_any_break(ch)) {
            return Err(err_ctx(
                "while scanning a tag",
                start_mark,
                format!("expected ' ', but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        let end_mark = self.reader.get_mark();
        Ok(Token::new(
            TokenKind::Tag { handle, suffix },
            start_mark,
            end_mark,
        ))
    }

    fn scan_tag_handle(&mut self, name: &'static str, start_mark: Marker) -> YamlResult<String> {
        let ch = self.reader.peek();
        if ch != '!' {
            return Err(err_ctx(
                format!("while scanning an {name}"),
                start_mark,
                format!("expected '!', but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        let mut length = 1;
        let mut ch = self.reader.peek_nth(length);
        if ch != ' ' {
            while ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
                length += 1;
                ch = self.reader.peek_nth(length);
            }
            if ch != '!' {
                self.reader.forward(length);
                return Err(err_ctx(
                    format!("while scanning an {name}"),
                    start_mark,
                    format!("expected '!', but found {ch:?}"),
                    self.reader.get_mark(),
                ));
            }
            length += 1;
        }
        let value = self.reader.prefix(length);
        self.reader.forward(length);
        Ok(value)
    }

    fn scan_tag_uri(&mut self, name: &'static str, start_mark: Marker) -> YamlResult<String> {
        // we do not check that the URI is well-formed
        let mut chunks = String::new();
        let mut length = 0;
        let mut ch = self.reader.peek_nth(length);
        while ch.is_alphanumeric()
            || "-;/?:@&=+$,_.!~*'()[]%".contains(ch)
            || (self.version > (1, 1) && ch == '#')
        {
            if ch == '%' {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
                length = 0;
                chunks.push_str(&self.scan_uri_escapes(name, start_mark)?);
            } else {
                length += 1;
            }
            ch = self.reader.peek_nth(length);
        }
        if length != 0 {
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
        }
        if chunks.is_empty() {
            return Err(err_ctx(
                format!("while parsing an {name}"),
                start_mark,
                format!("expected URI, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        Ok(chunks)
    }

    fn scan_uri_escapes(&mut self, name: &'static str, start_mark: Marker) -> YamlResult<String> {
        let mark = self.reader.get_mark();
        let mut run = String::new();
        while self.reader.peek() == '%' {
            for k in 1..3 {
                let c = self.reader.peek_nth(k);
                if as_hex(c).is_none() {
                    return Err(err_ctx(
                        format!("while scanning an {name}"),
                        start_mark,
                        format!(
                            "expected URI escape sequence of 2 hexadecimal numbers, but found {c:?}"
                        ),
                        self.reader.get_mark(),
                    ));
                }
            }
            run.push_str(&self.reader.prefix(3));
            self.reader.forward(3);
        }
        let bytes = urlencoding::decode_binary(run.as_bytes()).into_owned();
        match String::from_utf8(bytes) {
            Ok(value) => Ok(value),
            Err(exc) => Err(err_ctx(
                format!("while scanning an {name}"),
                start_mark,
                exc.to_string(),
                mark,
            )),
        }
    }

    // ------------------------------------------------------------------
    // block scalars

    fn scan_block_scalar(&mut self, style: ScalarStyle) -> YamlResult<()> {
        let folded = style == ScalarStyle::Folded;
        let mut chunks = String::new();
        let start_mark = self.reader.get_mark();

        self.reader.forward(1);
        let (chomping, increment) = self.scan_block_scalar_indicators(start_mark)?;
        let header_comment = self.scan_block_scalar_ignored_line(start_mark)?;

        let mut min_indent = self.indent + 1;
        let indent;
        let mut breaks;
        let mut end_mark;
        if let Some(inc) = increment {
            if min_indent < 1 {
                min_indent = 1;
            }
            indent = min_indent + i64::from(inc) - 1;
            let scanned = self.scan_block_scalar_breaks(indent);
            breaks = scanned.0;
            end_mark = scanned.1;
        } else {
            // no increment and top level, min_indent could be 0
            let (scanned, max_indent, mark) = self.scan_block_scalar_indentation();
            indent = min_indent.max(max_indent);
            breaks = scanned;
            end_mark = mark;
        }
        let mut line_break = String::new();

        while i64::from(self.reader.col()) == indent && self.reader.peek() != '\0' {
            chunks.push_str(&breaks);
            let leading_non_space = !is_blank(self.reader.peek());
            let mut length = 0;
            while !is_the_end(self.reader.peek_nth(length)) {
                length += 1;
            }
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            line_break = self.scan_line_break(false);
            let scanned = self.scan_block_scalar_breaks(indent);
            breaks = scanned.0;
            end_mark = scanned.1;
            if min_indent == 0 && (self.check_document_start() || self.check_document_end()) {
                break;
            }
            if i64::from(self.reader.col()) == indent && self.reader.peek() != '\0' {
                // Folding rules are ambiguous; this is the folding
                // according to the specification. Fold points are marked
                // so the original line structure can be restored.
                if folded && line_break == "\n" {
                    chunks.push('\u{7}');
                }
                if folded
                    && line_break == "\n"
                    && leading_non_space
                    && !is_blank(self.reader.peek())
                {
                    if breaks.is_empty() {
                        chunks.push(' ');
                    }
                } else {
                    chunks.push_str(&line_break);
                }
            } else {
                break;
            }
        }

        // The chomping setting decides which trailing breaks belong to
        // the value.
        let mut trailing = String::new();
        if chomping != Some(false) {
            chunks.push_str(&line_break);
        }
        if chomping == Some(true) {
            chunks.push_str(&breaks);
        } else {
            trailing.push_str(&breaks);
        }

        let mut token = Token::new(
            TokenKind::Scalar {
                value: chunks,
                style,
            },
            start_mark,
            end_mark,
        );
        if let Some((comment, mark)) = header_comment {
            token.comments.eol = Some(Comment::new(CommentKind::Eol, comment, mark));
        }
        // whitespace and comments following the scalar are kept as one
        // comment, since they are not part of the value
        while let Some((comment, cmark, _)) = self.scan_to_next_token()? {
            trailing.push_str(&" ".repeat(cmark.col as usize));
            trailing.push_str(&comment);
        }
        if !trailing.is_empty() {
            let kind = if trailing.contains('#') {
                CommentKind::Line
            } else {
                CommentKind::Blank
            };
            token
                .comments
                .post
                .push(Comment::new(kind, trailing, end_mark));
        }
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_block_scalar_indicators(
        &mut self,
        start_mark: Marker,
    ) -> YamlResult<(Option<bool>, Option<u32>)> {
        let mut chomping = None;
        let mut increment = None;
        let mut ch = self.reader.peek();
        if ch == '+' || ch == '-' {
            chomping = Some(ch == '+');
            self.reader.forward(1);
            ch = self.reader.peek();
            if let Some(digit) = ch.to_digit(10) {
                if digit == 0 {
                    return Err(err_ctx(
                        "while scanning a block scalar",
                        start_mark,
                        "expected indentation indicator in the range 1-9, but found 0",
                        self.reader.get_mark(),
                    ));
                }
                increment = Some(digit);
                self.reader.forward(1);
            }
        } else if let Some(digit) = ch.to_digit(10) {
            if digit == 0 {
                return Err(err_ctx(
                    "while scanning a block scalar",
                    start_mark,
                    "expected indentation indicator in the range 1-9, but found 0",
                    self.reader.get_mark(),
                ));
            }
            increment = Some(digit);
            self.reader.forward(1);
            ch = self.reader.peek();
            if ch == '+' || ch == '-' {
                chomping = Some(ch == '+');
                self.reader.forward(1);
            }
        }
        let ch = self.reader.peek();
        if !(ch == '\0' || ch == ' ' || is_any_break(ch)) {
            return Err(err_ctx(
                "while scanning a block scalar",
                start_mark,
                format!("expected chomping or indentation indicators, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        Ok((chomping, increment))
    }

    /// The rest of the header line: spaces and possibly a comment, which
    /// is returned with the spaces kept in front of it.
    fn scan_block_scalar_ignored_line(
        &mut self,
        start_mark: Marker,
    ) -> YamlResult<Option<(String, Marker)>> {
        let mark = self.reader.get_mark();
        let mut prefix = String::new();
        let mut comment = None;
        while self.reader.peek() == ' ' {
            prefix.push(' ');
            self.reader.forward(1);
        }
        if self.reader.peek() == '#' {
            let mut text = prefix;
            while !is_the_end(self.reader.peek()) {
                text.push(self.reader.peek());
                self.reader.forward(1);
            }
            comment = Some((text, mark));
        }
        let ch = self.reader.peek();
        if !is_the_end(ch) {
            return Err(err_ctx(
                "while scanning a block scalar",
                start_mark,
                format!("expected a comment or a line break, but found {ch:?}"),
                self.reader.get_mark(),
            ));
        }
        self.scan_line_break(false);
        Ok(comment)
    }

    fn scan_block_scalar_indentation(&mut self) -> (String, i64, Marker) {
        let mut chunks = String::new();
        let mut max_indent = 0i64;
        let mut end_mark = self.reader.get_mark();
        loop {
            let ch = self.reader.peek();
            if ch == ' ' {
                self.reader.forward(1);
                if i64::from(self.reader.col()) > max_indent {
                    max_indent = i64::from(self.reader.col());
                }
            } else if is_any_break(ch) {
                chunks.push_str(&self.scan_line_break(false));
                end_mark = self.reader.get_mark();
            } else {
                break;
            }
        }
        (chunks, max_indent, end_mark)
    }

    fn scan_block_scalar_breaks(&mut self, indent: i64) -> (String, Marker) {
        let mut chunks = String::new();
        let mut end_mark = self.reader.get_mark();
        while i64::from(self.reader.col()) < indent && self.reader.peek() == ' ' {
            self.reader.forward(1);
        }
        while is_any_break(self.reader.peek()) {
            chunks.push_str(&self.scan_line_break(false));
            end_mark = self.reader.get_mark();
            while i64::from(self.reader.col()) < indent && self.reader.peek() == ' ' {
                self.reader.forward(1);
            }
        }
        (chunks, end_mark)
    }

    // ------------------------------------------------------------------
    // flow scalars

    fn scan_flow_scalar(&mut self, style: ScalarStyle) -> YamlResult<Token> {
        // Quoted scalars do not need to adhere to indentation, since the
        // quotes clearly mark their extent; only document separators are
        // checked for.
        let double = style == ScalarStyle::DoubleQuote;
        let mut chunks = String::new();
        let start_mark = self.reader.get_mark();
        let quote = self.reader.peek();
        self.reader.forward(1);
        self.scan_flow_scalar_non_spaces(&mut chunks, double, start_mark)?;
        while self.reader.peek() != quote {
            self.scan_flow_scalar_spaces(&mut chunks, start_mark)?;
            self.scan_flow_scalar_non_spaces(&mut chunks, double, start_mark)?;
        }
        self.reader.forward(1);
        let end_mark = self.reader.get_mark();
        Ok(Token::new(
            TokenKind::Scalar { value: chunks, style },
            start_mark,
            end_mark,
        ))
    }

    fn scan_flow_scalar_non_spaces(
        &mut self,
        chunks: &mut String,
        double: bool,
        start_mark: Marker,
    ) -> YamlResult<()> {
        loop {
            let mut length = 0;
            while !" \n\"'\\\0\t\r\u{85}\u{2028}\u{2029}".contains(self.reader.peek_nth(length)) {
                length += 1;
            }
            if length != 0 {
                chunks.push_str(&self.reader.prefix(length));
                self.reader.forward(length);
            }
            let ch = self.reader.peek();
            if !double && ch == '\'' && self.reader.peek_nth(1) == '\'' {
                chunks.push('\'');
                self.reader.forward(2);
            } else if (double && ch == '\'') || (!double && (ch == '"' || ch == '\\')) {
                chunks.push(ch);
                self.reader.forward(1);
            } else if double && ch == '\\' {
                self.reader.forward(1);
                let ch = self.reader.peek();
                if let Some(replacement) = escape_replacement(ch) {
                    chunks.push(replacement);
                    self.reader.forward(1);
                } else if let Some(length) = escape_code_length(ch) {
                    self.reader.forward(1);
                    for k in 0..length {
                        let c = self.reader.peek_nth(k);
                        if as_hex(c).is_none() {
                            return Err(err_ctx(
                                "while scanning a double-quoted scalar",
                                start_mark,
                                format!(
                                    "expected escape sequence of {length} hexadecimal numbers, but found {c:?}"
                                ),
                                self.reader.get_mark(),
                            ));
                        }
                    }
                    let code = u32::from_str_radix(&self.reader.prefix(length), 16).unwrap_or(0);
                    match char::from_u32(code) {
                        Some(decoded) => chunks.push(decoded),
                        None => {
                            return Err(err_ctx(
                                "while scanning a double-quoted scalar",
                                start_mark,
                                format!("found an escape for the invalid code point {code:#x}"),
                                self.reader.get_mark(),
                            ))
                        }
                    }
                    self.reader.forward(length);
                } else if is_any_break(ch) {
                    self.scan_line_break(false);
                    self.scan_flow_scalar_breaks(chunks, start_mark)?;
                } else {
                    return Err(err_ctx(
                        "while scanning a double-quoted scalar",
                        start_mark,
                        format!("found unknown escape character {ch:?}"),
                        self.reader.get_mark(),
                    ));
                }
            } else {
                return Ok(());
            }
        }
    }

    fn scan_flow_scalar_spaces(
        &mut self,
        chunks: &mut String,
        start_mark: Marker,
    ) -> YamlResult<()> {
        let mut length = 0;
        while is_blank(self.reader.peek_nth(length)) {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek();
        if ch == '\0' {
            return Err(err_ctx(
                "while scanning a quoted scalar",
                start_mark,
                "found unexpected end of stream",
                self.reader.get_mark(),
            ));
        }
        if is_any_break(ch) {
            let line_break = self.scan_line_break(false);
            let mut breaks = String::new();
            self.scan_flow_scalar_breaks(&mut breaks, start_mark)?;
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else {
            chunks.push_str(&whitespaces);
        }
        Ok(())
    }

    fn scan_flow_scalar_breaks(
        &mut self,
        chunks: &mut String,
        start_mark: Marker,
    ) -> YamlResult<()> {
        loop {
            // document separators end a quoted scalar with an error
            if self.next_is_document_indicator() {
                return Err(err_ctx(
                    "while scanning a quoted scalar",
                    start_mark,
                    "found unexpected document separator",
                    self.reader.get_mark(),
                ));
            }
            while is_blank(self.reader.peek()) {
                self.reader.forward(1);
            }
            if is_any_break(self.reader.peek()) {
                chunks.push_str(&self.scan_line_break(false));
            } else {
                return Ok(());
            }
        }
    }

    fn next_is_document_indicator(&self) -> bool {
        let prefix = self.reader.prefix(3);
        (prefix == "---" || prefix == "...") && is_end_space_tab(self.reader.peek_nth(3))
    }

    // ------------------------------------------------------------------
    // plain scalars

    fn scan_plain(&mut self) -> YamlResult<()> {
        // Plain scalars in the flow context cannot contain ',', ': ' and
        // '?'; indentation rules are loosened for flow.
        let mut chunks = String::new();
        let start_mark = self.reader.get_mark();
        let mut end_mark = start_mark;
        let indent = self.indent + 1;
        let mut spaces = String::new();
        loop {
            if self.reader.peek() == '#' {
                break;
            }
            let mut length = 0;
            let mut ch;
            loop {
                ch = self.reader.peek_nth(length);
                let next = self.reader.peek_nth(length + 1);
                if ch == ':' && !is_end_space_tab(next) {
                    // part of the scalar
                } else if ch == '?' && self.version != (1, 1) {
                    // part of the scalar
                } else if is_end_space_tab(ch)
                    || (self.flow_level() == 0 && ch == ':' && is_end_space_tab(next))
                    || (self.flow_level() > 0 && ",:?[]{}".contains(ch))
                {
                    break;
                }
                length += 1;
            }
            if self.flow_level() > 0
                && ch == ':'
                && !"\0 \t\r\n\u{85}\u{2028}\u{2029},[]{}".contains(self.reader.peek_nth(length + 1))
            {
                self.reader.forward(length);
                return Err(YamlError::Scanner(
                    Marked::contextual(
                        "while scanning a plain scalar",
                        start_mark,
                        "found unexpected ':'",
                        self.reader.get_mark(),
                    )
                    .with_note(
                        "a colon in flow context must be followed by a space or flow indicator",
                    ),
                ));
            }
            if length == 0 {
                break;
            }
            self.allow_simple_key = false;
            chunks.push_str(&spaces);
            chunks.push_str(&self.reader.prefix(length));
            self.reader.forward(length);
            end_mark = self.reader.get_mark();
            match self.scan_plain_spaces()? {
                None => {
                    spaces.clear();
                    break;
                }
                Some(s) => spaces = s,
            }
            if spaces.is_empty()
                || self.reader.peek() == '#'
                || (self.flow_level() == 0 && i64::from(self.reader.col()) < indent)
            {
                break;
            }
        }
        let mut token = Token::new(
            TokenKind::Scalar {
                value: chunks,
                style: ScalarStyle::Plain,
            },
            start_mark,
            end_mark,
        );
        if spaces.starts_with('\n') {
            // trailing line breaks survive as a comment
            let mut value = spaces;
            value.push('\n');
            token
                .comments
                .post
                .push(Comment::new(CommentKind::Blank, value, start_mark));
        }
        self.tokens.push_back(token);
        Ok(())
    }

    /// Returns `None` when a document separator cuts the scalar short.
    fn scan_plain_spaces(&mut self) -> YamlResult<Option<String>> {
        let mut chunks = String::new();
        let mut length = 0;
        while self.reader.peek_nth(length) == ' ' {
            length += 1;
        }
        let whitespaces = self.reader.prefix(length);
        self.reader.forward(length);
        let ch = self.reader.peek();
        if is_any_break(ch) {
            let line_break = self.scan_line_break(false);
            self.allow_simple_key = true;
            if self.next_is_document_indicator() {
                return Ok(None);
            }
            let mut breaks = String::new();
            loop {
                let ch = self.reader.peek();
                if ch == ' ' {
                    self.reader.forward(1);
                } else if is_any_break(ch) {
                    breaks.push_str(&self.scan_line_break(false));
                    if self.next_is_document_indicator() {
                        return Ok(None);
                    }
                } else {
                    break;
                }
            }
            if line_break != "\n" {
                chunks.push_str(&line_break);
            } else if breaks.is_empty() {
                chunks.push(' ');
            }
            chunks.push_str(&breaks);
        } else if !whitespaces.is_empty() {
            chunks.push_str(&whitespaces);
        }
        Ok(Some(chunks))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use yarrow_common::DEFAULT_YAML_VERSION;

    fn tokens_of(input: &str) -> Vec<TokenKind> {
        let reader = Reader::from_str(input).unwrap();
        let mut scanner = Scanner::new(reader, DEFAULT_YAML_VERSION);
        let mut out = Vec::new();
        while let Some(token) = scanner.get_token().unwrap() {
            let is_end = token.kind == TokenKind::StreamEnd;
            out.push(token.kind);
            if is_end {
                break;
            }
        }
        out
    }

    fn scalar(value: &str, style: ScalarStyle) -> TokenKind {
        TokenKind::Scalar {
            value: value.to_string(),
            style,
        }
    }

    #[test]
    fn block_mapping_tokens() {
        let kinds = tokens_of("a: 1\nb: 2\n");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart,
                TokenKind::BlockMappingStart,
                TokenKind::Key,
                scalar("a", ScalarStyle::Plain),
                TokenKind::Value,
                scalar("1", ScalarStyle::Plain),
                TokenKind::Key,
                scalar("b", ScalarStyle::Plain),
                TokenKind::Value,
                scalar("2", ScalarStyle::Plain),
                TokenKind::BlockEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_sequence_tokens() {
        let kinds = tokens_of("[a, b]");
        assert_eq!(
            kinds,
            vec![
                TokenKind::StreamStart,
                TokenKind::FlowSequenceStart,
                scalar("a", ScalarStyle::Plain),
                TokenKind::FlowEntry,
                scalar("b", ScalarStyle::Plain),
                TokenKind::FlowSequenceEnd,
                TokenKind::StreamEnd,
            ]
        );
    }

    #[test]
    fn eol_comment_attaches_to_value_scalar() {
        let reader = Reader::from_str("a: 1  # one\n").unwrap();
        let mut scanner = Scanner::new(reader, DEFAULT_YAML_VERSION);
        let mut annotated = None;
        while let Some(token) = scanner.get_token().unwrap() {
            if token.kind == scalar("1", ScalarStyle::Plain) {
                annotated = token.comments.eol.clone();
            }
            if token.kind == TokenKind::StreamEnd {
                break;
            }
        }
        let comment = annotated.unwrap();
        assert_eq!(comment.kind, CommentKind::Eol);
        assert_eq!(comment.value, "# one\n");
    }

    #[test]
    fn leading_comments_gather_on_next_real_token() {
        let reader = Reader::from_str("# first\n\n# second\nkey: 1\n").unwrap();
        let mut scanner = Scanner::new(reader, DEFAULT_YAML_VERSION);
        let mut pre = Vec::new();
        while let Some(token) = scanner.get_token().unwrap() {
            if token.kind == TokenKind::BlockMappingStart {
                pre = token.comments.pre.clone();
            }
            if token.kind == TokenKind::StreamEnd {
                break;
            }
        }
        let values: Vec<&str> = pre.iter().map(|c| c.value.as_str()).collect();
        assert_eq!(values, vec!["# first\n\n", "# second\n"]);
    }

    #[test]
    fn comment_between_entries_rides_the_value() {
        let reader = Reader::from_str("a: 1\n# note\nb: 2\n").unwrap();
        let mut scanner = Scanner::new(reader, DEFAULT_YAML_VERSION);
        let mut post = Vec::new();
        while let Some(token) = scanner.get_token().unwrap() {
            if token.kind == scalar("1", ScalarStyle::Plain) {
                post = token.comments.post.clone();
            }
            if token.kind == TokenKind::StreamEnd {
                break;
            }
        }
        assert_eq!(post.len(), 1);
        assert_eq!(post[0].value, "\n# note\n");
    }

    #[test]
    fn literal_block_scalar_value() {
        let kinds = tokens_of("a: |\n  line1\n  line2\n");
        assert!(kinds.contains(&scalar("line1\nline2\n", ScalarStyle::Literal)));
    }

    #[test]
    fn folded_scalar_marks_fold_points() {
        let kinds = tokens_of("a: >\n  one\n  two\n");
        assert!(kinds.contains(&scalar("one\u{7} two\n", ScalarStyle::Folded)));
    }

    #[test]
    fn required_simple_key_without_colon_errors() {
        let reader = Reader::from_str("x:\n  y: 1\n  a\n  : 2\n").unwrap();
        let mut scanner = Scanner::new(reader, DEFAULT_YAML_VERSION);
        let mut result = Ok(());
        loop {
            match scanner.get_token() {
                Ok(Some(token)) => {
                    if token.kind == TokenKind::StreamEnd {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }
        match result {
            Err(YamlError::Scanner(marked)) => {
                assert_eq!(marked.problem, "could not find expected ':'");
            }
            other => panic!("expected scanner error, got {other:?}"),
        }
    }

    #[test]
    fn double_quote_escapes_decode() {
        let kinds = tokens_of("\"a\\tb\\u00e9\"");
        assert!(kinds.contains(&scalar("a\tb\u{e9}", ScalarStyle::DoubleQuote)));
    }

    #[test]
    fn directive_updates_version() {
        let reader = Reader::from_str("%YAML 1.1\n--- a\n").unwrap();
        let mut scanner = Scanner::new(reader, DEFAULT_YAML_VERSION);
        while let Some(token) = scanner.peek_token().unwrap() {
            if matches!(token.kind, TokenKind::Directive { .. }) {
                break;
            }
            if scanner.get_token().unwrap().is_none() {
                break;
            }
        }
        let _ = scanner.get_token().unwrap();
        assert_eq!(scanner.yaml_version(), (1, 1));
    }
}
