//! Turns a stream of HTML tokenizer events into a [`TextDocument`].
//!
//! The builder keeps no DOM. It maintains a handful of nesting counters and
//! stacks, accumulates character data into a pending block, and emits a
//! finished [`TextBlock`] with precomputed statistics whenever a block-level
//! boundary forces a flush.

use std::rc::Rc;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::document::{TextBlock, TextDocument};
use crate::tag_actions::{default_tag_action_map, LabelAction, TagActionMap};

/// Anchor boundary tokens, spliced into the token buffer around `<a>` scopes.
/// They start with a private-use codepoint so they can never collide with
/// text from the page, while still matching the word token pattern.
pub(crate) const ANCHOR_TEXT_START: &str = "\u{e00a}start";
pub(crate) const ANCHOR_TEXT_END: &str = "\u{e00a}end";

/// Nominal line width for the wrapped-line simulation behind text density.
const MAX_LINE_LENGTH: i32 = 80;

lazy_static! {
    // Any word character except the underscore.
    static ref PAT_VALID_WORD_CHARACTER: Regex = Regex::new(r"[^\W_]").unwrap();
    // A token: an optional anchor boundary marker followed by word characters
    // and a small set of in-word punctuation.
    static ref PAT_WORD: Regex =
        Regex::new("\u{e00a}?[\\w\"'.,!@:;$?()/-]+").unwrap();
}

fn is_word(token: &str) -> bool {
    PAT_VALID_WORD_CHARACTER.is_match(token)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Event {
    StartTag,
    EndTag,
    Characters,
    Whitespace,
}

/// Streaming consumer of start-tag / end-tag / character events.
///
/// Drive it through the push methods ([`BlockBuilder::start_element`],
/// [`BlockBuilder::characters`], ...) or hand it to an html5ever tokenizer;
/// it implements [`TokenSink`]. Either way, [`BlockBuilder::to_text_document`]
/// yields the accumulated document.
pub struct BlockBuilder {
    tag_actions: Rc<TagActionMap>,

    pub(crate) in_body: u32,
    pub(crate) in_anchor: u32,
    pub(crate) in_ignorable_element: u32,

    /// Structural nesting depth. Only tags whose action reports
    /// `changes_tag_level` move it, and unmatched closers may push it
    /// negative; block statistics record it as observed.
    tag_level: i32,
    /// Tag level at which the pending block's text began. `None` while no
    /// text has accumulated.
    block_tag_level: Option<i32>,

    text_buffer: String,
    token_buffer: String,

    text_element_idx: usize,
    current_contained_text_elements: FxHashSet<usize>,

    flush_pending: bool,
    in_anchor_text: bool,
    last_start_tag: Option<String>,
    #[allow(dead_code)]
    last_end_tag: Option<String>,
    #[allow(dead_code)]
    last_event: Option<Event>,

    title: Option<String>,
    offset_blocks: usize,
    text_blocks: Vec<TextBlock>,

    label_stacks: Vec<Vec<LabelAction>>,
    font_size_stack: Vec<Option<i32>>,
    markup_label_stack: Vec<Vec<String>>,
}

impl Default for BlockBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::with_tag_actions(default_tag_action_map())
    }

    pub fn with_tag_actions(tag_actions: TagActionMap) -> Self {
        Self {
            tag_actions: Rc::new(tag_actions),
            in_body: 0,
            in_anchor: 0,
            in_ignorable_element: 0,
            tag_level: 0,
            block_tag_level: None,
            text_buffer: String::new(),
            token_buffer: String::new(),
            text_element_idx: 0,
            current_contained_text_elements: FxHashSet::default(),
            flush_pending: false,
            in_anchor_text: false,
            last_start_tag: None,
            last_end_tag: None,
            last_event: None,
            title: None,
            offset_blocks: 0,
            text_blocks: Vec::new(),
            label_stacks: Vec::new(),
            font_size_stack: Vec::new(),
            markup_label_stack: Vec::new(),
        }
    }

    /// Resets the builder to its initial state, keeping the tag action
    /// table. Allows an embedding parser to restart after a failed attempt.
    pub fn recycle(&mut self) {
        self.in_body = 0;
        self.in_anchor = 0;
        self.in_ignorable_element = 0;
        self.tag_level = 0;
        self.block_tag_level = None;
        self.text_buffer.clear();
        self.token_buffer.clear();
        self.text_element_idx = 0;
        self.current_contained_text_elements.clear();
        self.flush_pending = false;
        self.in_anchor_text = false;
        self.last_start_tag = None;
        self.last_end_tag = None;
        self.last_event = None;
        self.title = None;
        self.offset_blocks = 0;
        self.text_blocks.clear();
        self.label_stacks.clear();
        self.font_size_stack.clear();
        self.markup_label_stack.clear();
    }

    pub fn start_element(&mut self, name: &str, attrs: &[(String, String)]) {
        self.label_stacks.push(Vec::new());

        let key = name.trim().to_ascii_uppercase();
        let actions = Rc::clone(&self.tag_actions);
        match actions.get(&key) {
            Some(action) => {
                let flush = action.start(self, name, attrs);
                self.flush_pending |= flush;
                if action.changes_tag_level() {
                    self.tag_level += 1;
                }
            }
            None => {
                self.tag_level += 1;
                self.flush_pending = true;
            }
        }
        self.last_event = Some(Event::StartTag);
        self.last_start_tag = Some(name.to_string());
    }

    pub fn end_element(&mut self, name: &str) {
        let key = name.trim().to_ascii_uppercase();
        let actions = Rc::clone(&self.tag_actions);
        match actions.get(&key) {
            Some(action) => {
                let flush = action.end(self, name);
                self.flush_pending |= flush;
                if action.changes_tag_level() {
                    self.tag_level -= 1;
                }
            }
            None => {
                self.flush_pending = true;
                self.tag_level -= 1;
            }
        }
        if self.flush_pending {
            self.flush_block();
        }
        self.last_event = Some(Event::EndTag);
        self.last_end_tag = Some(name.to_string());
        self.label_stacks.pop();
    }

    pub fn characters(&mut self, content: &str) {
        self.text_element_idx += 1;

        if self.flush_pending {
            self.flush_block();
            self.flush_pending = false;
        }
        if self.in_ignorable_element != 0 {
            return;
        }
        if content.is_empty() {
            return;
        }

        let stripped = content.trim();
        if stripped.is_empty() {
            self.ensure_whitespace();
            self.last_event = Some(Event::Whitespace);
            return;
        }

        if self.block_tag_level.is_none() {
            self.block_tag_level = Some(self.tag_level);
        }
        if content.starts_with(char::is_whitespace) {
            self.ensure_whitespace();
        }
        self.text_buffer.push_str(stripped);
        self.token_buffer.push_str(stripped);
        if content.ends_with(char::is_whitespace) {
            self.ensure_whitespace();
        }

        self.last_event = Some(Event::Characters);
        self.current_contained_text_elements
            .insert(self.text_element_idx);
    }

    pub fn ignorable_whitespace(&mut self) {
        self.ensure_whitespace();
    }

    /// Appends a single space to both buffers unless they already end in
    /// whitespace.
    pub(crate) fn ensure_whitespace(&mut self) {
        if !self.text_buffer.ends_with(char::is_whitespace) {
            self.text_buffer.push(' ');
        }
        if !self.token_buffer.ends_with(char::is_whitespace) {
            self.token_buffer.push(' ');
        }
    }

    /// Splices a marker token into the token buffer, isolated by whitespace.
    pub(crate) fn add_token(&mut self, token: &str) {
        self.ensure_whitespace();
        self.token_buffer.push_str(token);
        self.ensure_whitespace();
    }

    pub(crate) fn add_label_action(&mut self, action: LabelAction) {
        if self.label_stacks.is_empty() {
            self.label_stacks.push(Vec::new());
        }
        if let Some(frame) = self.label_stacks.last_mut() {
            frame.push(action);
        }
    }

    pub(crate) fn font_size_stack(&self) -> &[Option<i32>] {
        &self.font_size_stack
    }

    pub(crate) fn push_font_size(&mut self, size: Option<i32>) {
        self.font_size_stack.push(size);
    }

    pub(crate) fn pop_font_size(&mut self) {
        self.font_size_stack.pop();
    }

    pub(crate) fn push_markup_labels(&mut self, labels: Vec<String>) {
        self.markup_label_stack.push(labels);
    }

    pub(crate) fn pop_markup_labels(&mut self) {
        self.markup_label_stack.pop();
    }

    /// Union of the labels of every open markup scope.
    pub(crate) fn markup_ancestor_labels(&self) -> FxHashSet<String> {
        let mut set = FxHashSet::default();
        for labels in &self.markup_label_stack {
            set.extend(labels.iter().cloned());
        }
        set
    }

    /// Emits the pending block, if any.
    ///
    /// Outside of `<body>` nothing is emitted, but a pending `<title>` text
    /// is captured as the document title. Inside the body the token buffer
    /// is tokenized, word and wrapped-line counters are derived, and the
    /// block is appended with the labels of every open label scope.
    pub fn flush_block(&mut self) {
        if self.in_body == 0 {
            if self
                .last_start_tag
                .as_deref()
                .is_some_and(|tag| tag.eq_ignore_ascii_case("title"))
            {
                let title = self.text_buffer.trim().to_string();
                self.set_title(title);
            }
            self.clear_buffers();
            return;
        }
        if self.token_buffer.trim().is_empty() {
            self.clear_buffers();
            return;
        }

        let token_buffer = std::mem::take(&mut self.token_buffer);

        let mut num_words = 0usize;
        let mut num_linked_words = 0usize;
        let mut num_wrapped_lines = 0usize;
        let mut num_tokens = 0usize;
        let mut num_words_current_line = 0usize;
        // Starting at -1 gives the first token's separator a free pass.
        let mut current_line_length: i32 = -1;

        for token in PAT_WORD.find_iter(&token_buffer) {
            let token = token.as_str();
            match token {
                ANCHOR_TEXT_START => self.in_anchor_text = true,
                ANCHOR_TEXT_END => self.in_anchor_text = false,
                _ if is_word(token) => {
                    num_tokens += 1;
                    num_words += 1;
                    num_words_current_line += 1;
                    if self.in_anchor_text {
                        num_linked_words += 1;
                    }
                    let token_length = token.chars().count() as i32;
                    current_line_length += token_length + 1;
                    if current_line_length > MAX_LINE_LENGTH {
                        num_wrapped_lines += 1;
                        current_line_length = token_length;
                        num_words_current_line = 1;
                    }
                }
                _ => num_tokens += 1,
            }
        }

        // Nothing but anchor boundary markers; their side effects above
        // still count.
        if num_tokens == 0 {
            self.clear_buffers();
            return;
        }

        let num_words_in_wrapped_lines;
        if num_wrapped_lines == 0 {
            num_words_in_wrapped_lines = num_words;
            num_wrapped_lines = 1;
        } else {
            num_words_in_wrapped_lines = num_words - num_words_current_line;
        }

        let text = std::mem::take(&mut self.text_buffer);
        let mut block = TextBlock::new(
            text.trim().to_string(),
            std::mem::take(&mut self.current_contained_text_elements),
            num_words,
            num_linked_words,
            num_words_in_wrapped_lines,
            num_wrapped_lines,
            self.offset_blocks,
        );
        block.set_tag_level(self.block_tag_level.take().unwrap_or(-1));
        self.offset_blocks += 1;
        self.add_text_block(block);
        self.clear_buffers();
    }

    fn add_text_block(&mut self, mut block: TextBlock) {
        if let Some(font_size) = self.font_size_stack.iter().rev().find_map(|size| *size) {
            block.add_label(format!("font-{font_size}"));
        }
        for frame in &self.label_stacks {
            for action in frame {
                action.add_to(&mut block);
            }
        }
        self.text_blocks.push(block);
    }

    fn set_title(&mut self, title: String) {
        // The first non-empty capture wins.
        if title.is_empty() || self.title.is_some() {
            return;
        }
        self.title = Some(title);
    }

    fn clear_buffers(&mut self) {
        self.text_buffer.clear();
        self.token_buffer.clear();
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Performs the final flush and hands out the accumulated document.
    pub fn to_text_document(&mut self) -> TextDocument {
        self.flush_block();
        TextDocument::new(std::mem::take(&mut self.text_blocks), self.title.clone())
    }
}

impl TokenSink for BlockBuilder {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        match token {
            Token::TagToken(tag) => {
                let name: &str = &tag.name;
                match tag.kind {
                    TagKind::StartTag => {
                        let attrs: Vec<(String, String)> = tag
                            .attrs
                            .iter()
                            .map(|attr| (attr.name.local.to_string(), attr.value.to_string()))
                            .collect();
                        self.start_element(name, &attrs);
                        if tag.self_closing {
                            // Parity with SAX parsers, which report an empty
                            // element as start followed by end.
                            self.end_element(name);
                        } else {
                            // Keep the tokenizer's rawtext handling in step
                            // with the tree construction rules.
                            match name {
                                "script" => {
                                    return TokenSinkResult::RawData(RawKind::ScriptData);
                                }
                                "style" | "xmp" | "iframe" | "noembed" | "noframes" => {
                                    return TokenSinkResult::RawData(RawKind::Rawtext);
                                }
                                "title" | "textarea" => {
                                    return TokenSinkResult::RawData(RawKind::Rcdata);
                                }
                                _ => {}
                            }
                        }
                    }
                    TagKind::EndTag => self.end_element(name),
                }
            }
            Token::CharacterTokens(text) => self.characters(&text),
            Token::ParseError(error) => {
                debug!("tokenizer recovered from malformed input: {error}");
            }
            Token::NullCharacterToken
            | Token::CommentToken(_)
            | Token::DoctypeToken(_)
            | Token::EOFToken => {}
        }
        TokenSinkResult::Continue
    }
}

/// Tokenizes the given HTML with the default tag actions and returns the
/// unfiltered block document.
pub fn parse_doc(html: &str) -> TextDocument {
    parse_doc_with(BlockBuilder::new(), html)
}

/// Like [`parse_doc`], with a caller-configured builder.
pub fn parse_doc_with(builder: BlockBuilder, html: &str) -> TextDocument {
    let mut input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(html));
    let mut tokenizer = Tokenizer::new(builder, TokenizerOpts::default());
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();
    tokenizer.sink.to_text_document()
}
