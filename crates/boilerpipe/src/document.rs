use std::fmt;

use lazy_static::lazy_static;
use rustc_hash::FxHashSet;

/// Pre-defined labels which can be attached to a [`TextBlock`] with
/// [`TextBlock::add_label`] and queried with [`TextBlock::has_label`].
pub struct DefaultLabels;

impl DefaultLabels {
    pub const TITLE: &'static str = "TITLE";
    pub const ARTICLE_METADATA: &'static str = "ARTICLE_METADATA";
    pub const INDICATES_END_OF_TEXT: &'static str = "INDICATES_END_OF_TEXT";
    pub const MIGHT_BE_CONTENT: &'static str = "MIGHT_BE_CONTENT";
    pub const STRICTLY_NOT_CONTENT: &'static str = "STRICTLY_NOT_CONTENT";
    pub const HR: &'static str = "HR";

    /// Reserved prefix for labels derived from structural markup, e.g.
    /// `MARKUP:div`, `MARKUP:.sidebar`, `MARKUP:#main`.
    pub const MARKUP_PREFIX: &'static str = "MARKUP:";
}

/// Describes a block of text.
///
/// A block can be an "atomic" text element, a sequence of text that is not
/// interrupted by any HTML markup, or a compound of such atomic elements
/// produced by one of the fusion filters.
#[derive(Debug, Clone)]
pub struct TextBlock {
    text: String,
    contained_text_elements: FxHashSet<usize>,
    num_words: usize,
    num_words_in_anchor_text: usize,
    num_words_in_wrapped_lines: usize,
    num_wrapped_lines: usize,
    offset_blocks_start: usize,
    offset_blocks_end: usize,
    text_density: f64,
    link_density: f64,
    is_content: bool,
    labels: FxHashSet<String>,
    num_full_text_words: usize,
    tag_level: i32,
}

lazy_static! {
    static ref EMPTY_START: TextBlock = TextBlock::empty();
    static ref EMPTY_END: TextBlock = TextBlock::empty();
}

impl TextBlock {
    pub fn new(
        text: String,
        contained_text_elements: FxHashSet<usize>,
        num_words: usize,
        num_words_in_anchor_text: usize,
        num_words_in_wrapped_lines: usize,
        num_wrapped_lines: usize,
        offset_blocks: usize,
    ) -> Self {
        let mut block = Self {
            text,
            contained_text_elements,
            num_words,
            num_words_in_anchor_text,
            num_words_in_wrapped_lines,
            num_wrapped_lines,
            offset_blocks_start: offset_blocks,
            offset_blocks_end: offset_blocks,
            text_density: 0.0,
            link_density: 0.0,
            is_content: false,
            labels: FxHashSet::default(),
            num_full_text_words: 0,
            tag_level: 0,
        };
        block.init_densities();
        block
    }

    /// A block holding just text, without any precomputed statistics. Used
    /// when a filter splits an existing block and cannot recompute counters.
    pub fn of_text(text: String) -> Self {
        Self::new(text, FxHashSet::default(), 0, 0, 0, 0, 0)
    }

    fn empty() -> Self {
        Self::of_text(String::new())
    }

    /// Synthetic left neighbour for the boundary case of neighbourhood
    /// classifiers. Carries zero words and zero densities.
    pub fn empty_start() -> &'static TextBlock {
        &EMPTY_START
    }

    /// Synthetic right neighbour, statistically identical to
    /// [`TextBlock::empty_start`].
    pub fn empty_end() -> &'static TextBlock {
        &EMPTY_END
    }

    fn init_densities(&mut self) {
        if self.num_words_in_wrapped_lines == 0 {
            self.num_words_in_wrapped_lines = self.num_words;
            self.num_wrapped_lines = 1;
        }
        self.text_density =
            self.num_words_in_wrapped_lines as f64 / self.num_wrapped_lines as f64;
        self.link_density = if self.num_words == 0 {
            0.0
        } else {
            self.num_words_in_anchor_text as f64 / self.num_words as f64
        };
    }

    pub fn is_content(&self) -> bool {
        self.is_content
    }

    /// Returns whether the flag actually changed.
    pub fn set_is_content(&mut self, is_content: bool) -> bool {
        if is_content != self.is_content {
            self.is_content = is_content;
            true
        } else {
            false
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn num_words(&self) -> usize {
        self.num_words
    }

    pub fn num_words_in_anchor_text(&self) -> usize {
        self.num_words_in_anchor_text
    }

    pub fn num_words_in_wrapped_lines(&self) -> usize {
        self.num_words_in_wrapped_lines
    }

    pub fn num_wrapped_lines(&self) -> usize {
        self.num_wrapped_lines
    }

    pub fn text_density(&self) -> f64 {
        self.text_density
    }

    pub fn link_density(&self) -> f64 {
        self.link_density
    }

    pub fn num_full_text_words(&self) -> usize {
        self.num_full_text_words
    }

    pub fn offset_blocks_start(&self) -> usize {
        self.offset_blocks_start
    }

    pub fn offset_blocks_end(&self) -> usize {
        self.offset_blocks_end
    }

    pub fn tag_level(&self) -> i32 {
        self.tag_level
    }

    pub fn set_tag_level(&mut self, tag_level: i32) {
        self.tag_level = tag_level;
    }

    /// Merges the given successor block into this one. Texts are joined with
    /// a newline, word counters are summed, offsets span both blocks, the
    /// content flag is ORed and all densities are recomputed.
    pub fn merge_next(&mut self, next: TextBlock) {
        self.text.push('\n');
        self.text.push_str(&next.text);
        self.num_words += next.num_words;
        self.num_words_in_anchor_text += next.num_words_in_anchor_text;
        self.num_words_in_wrapped_lines += next.num_words_in_wrapped_lines;
        self.num_wrapped_lines += next.num_wrapped_lines;
        self.offset_blocks_start = self.offset_blocks_start.min(next.offset_blocks_start);
        self.offset_blocks_end = self.offset_blocks_end.max(next.offset_blocks_end);
        self.init_densities();
        self.is_content |= next.is_content;
        self.contained_text_elements
            .extend(next.contained_text_elements);
        self.num_full_text_words += next.num_full_text_words;
        self.labels.extend(next.labels);
        self.tag_level = self.tag_level.min(next.tag_level);
    }

    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.insert(label.into());
    }

    pub fn add_labels<I>(&mut self, labels: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.labels.extend(labels.into_iter().map(Into::into));
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Returns whether the label was present.
    pub fn remove_label(&mut self, label: &str) -> bool {
        self.labels.remove(label)
    }

    pub fn labels(&self) -> &FxHashSet<String> {
        &self.labels
    }

    /// Indices of the tokenizer character events that contributed to this
    /// block, for downstream highlighting.
    pub fn contained_text_elements(&self) -> &FxHashSet<usize> {
        &self.contained_text_elements
    }
}

impl fmt::Display for TextBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut labels: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        labels.sort_unstable();
        write!(
            f,
            "[{}-{};tl={};nw={};nwl={};ld={}]\t{},{:?}\n{}",
            self.offset_blocks_start,
            self.offset_blocks_end,
            self.tag_level,
            self.num_words,
            self.num_wrapped_lines,
            self.link_density,
            if self.is_content { "CONTENT" } else { "boilerplate" },
            labels,
            self.text,
        )
    }
}

/// A text document, consisting of one or more [`TextBlock`]s and an optional
/// title taken from the HTML `<title>` element.
#[derive(Debug, Clone, Default)]
pub struct TextDocument {
    title: Option<String>,
    text_blocks: Vec<TextBlock>,
}

impl TextDocument {
    pub fn new(text_blocks: Vec<TextBlock>, title: Option<String>) -> Self {
        Self { title, text_blocks }
    }

    /// The blocks of this document, in sequential order of appearance.
    pub fn text_blocks(&self) -> &[TextBlock] {
        &self.text_blocks
    }

    pub fn text_blocks_mut(&mut self) -> &mut Vec<TextBlock> {
        &mut self.text_blocks
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    /// The text of all blocks currently classified as content, one block per
    /// line.
    pub fn content(&self) -> String {
        self.text(true, false)
    }

    /// The document's text, selected by classification.
    pub fn text(&self, include_content: bool, include_non_content: bool) -> String {
        let mut out = String::new();
        for block in &self.text_blocks {
            if block.is_content() {
                if !include_content {
                    continue;
                }
            } else if !include_non_content {
                continue;
            }
            out.push_str(block.text());
            out.push('\n');
        }
        out
    }

    /// Detailed debugging information about the contained blocks.
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for block in &self.text_blocks {
            out.push_str(&block.to_string());
            out.push('\n');
        }
        out
    }
}

/// Shallow statistics over a [`TextDocument`].
pub struct TextDocumentStatistics {
    num_words: usize,
    num_blocks: usize,
}

impl TextDocumentStatistics {
    pub fn new(doc: &TextDocument, content_only: bool) -> Self {
        let mut num_words = 0;
        let mut num_blocks = 0;
        for block in doc.text_blocks() {
            if content_only && !block.is_content() {
                continue;
            }
            num_words += block.num_words();
            num_blocks += 1;
        }
        Self {
            num_words,
            num_blocks,
        }
    }

    /// Average number of words at block level, or 0.0 for an empty
    /// selection.
    pub fn avg_num_words(&self) -> f64 {
        if self.num_blocks == 0 {
            0.0
        } else {
            self.num_words as f64 / self.num_blocks as f64
        }
    }

    pub fn num_words(&self) -> usize {
        self.num_words
    }

    pub fn num_blocks(&self) -> usize {
        self.num_blocks
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use quickcheck_macros::quickcheck;

    fn labels_of(block: &TextBlock) -> Vec<String> {
        let mut labels: Vec<String> = block.labels().iter().cloned().collect();
        labels.sort();
        labels
    }

    #[test]
    fn merge_combines_text_and_statistics() {
        let mut first = TextBlock::new(
            "AA BB CC ".to_string(),
            [0].into_iter().collect(),
            3,
            3,
            3,
            1,
            0,
        );
        let mut second = TextBlock::new(
            "DD EE FF GG HH II JJ .".to_string(),
            [1].into_iter().collect(),
            6,
            0,
            6,
            2,
            1,
        );
        first.add_label(DefaultLabels::MIGHT_BE_CONTENT);
        second.add_label(DefaultLabels::ARTICLE_METADATA);

        first.merge_next(second);

        assert_eq!(first.text(), "AA BB CC \nDD EE FF GG HH II JJ .");
        assert_eq!(first.num_words(), 9);
        assert_eq!(first.num_words_in_anchor_text(), 3);
        assert!((first.link_density() - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(first.text_density(), 3.0);
        assert_eq!(first.offset_blocks_start(), 0);
        assert_eq!(first.offset_blocks_end(), 1);
        assert_eq!(
            labels_of(&first),
            vec![
                DefaultLabels::ARTICLE_METADATA.to_string(),
                DefaultLabels::MIGHT_BE_CONTENT.to_string(),
            ]
        );
        let mut elements: Vec<usize> =
            first.contained_text_elements().iter().copied().collect();
        elements.sort_unstable();
        assert_eq!(elements, vec![0, 1]);
    }

    #[test]
    fn sentinels_carry_zero_statistics() {
        for sentinel in [TextBlock::empty_start(), TextBlock::empty_end()] {
            assert_eq!(sentinel.num_words(), 0);
            assert_eq!(sentinel.link_density(), 0.0);
            assert_eq!(sentinel.text_density(), 0.0);
            assert!(sentinel.labels().is_empty());
        }
    }

    #[test]
    fn set_is_content_reports_changes() {
        let mut block = TextBlock::of_text("x".to_string());
        assert!(!block.is_content());
        assert!(block.set_is_content(true));
        assert!(!block.set_is_content(true));
        assert!(block.set_is_content(false));
    }

    #[test]
    fn content_selects_blocks_by_classification() {
        let mut one = TextBlock::of_text("one".to_string());
        one.set_is_content(true);
        let two = TextBlock::of_text("two".to_string());
        let mut three = TextBlock::of_text("three".to_string());
        three.set_is_content(true);
        let doc = TextDocument::new(vec![one, two, three], None);

        assert_eq!(doc.content(), "one\nthree\n");
        assert_eq!(doc.text(false, true), "two\n");
        assert_eq!(doc.text(true, true), "one\ntwo\nthree\n");
    }

    #[test]
    fn statistics_average_words_per_block() {
        let mut a = TextBlock::new("a".to_string(), FxHashSet::default(), 10, 0, 0, 0, 0);
        a.set_is_content(true);
        let b = TextBlock::new("b".to_string(), FxHashSet::default(), 30, 0, 0, 0, 1);
        let doc = TextDocument::new(vec![a, b], None);

        let all = TextDocumentStatistics::new(&doc, false);
        assert_eq!(all.num_words(), 40);
        assert_eq!(all.num_blocks(), 2);
        assert_eq!(all.avg_num_words(), 20.0);

        let content_only = TextDocumentStatistics::new(&doc, true);
        assert_eq!(content_only.num_words(), 10);

        let empty = TextDocumentStatistics::new(&TextDocument::default(), true);
        assert_eq!(empty.avg_num_words(), 0.0);
    }

    #[quickcheck]
    fn densities_stay_in_range(
        num_words: u8,
        anchor_words: u8,
        wrapped_words: u8,
        wrapped_lines: u8,
    ) -> bool {
        let num_words = num_words as usize;
        let anchor_words = (anchor_words as usize).min(num_words);
        let wrapped_words = wrapped_words as usize;
        let wrapped_lines = if wrapped_words == 0 {
            0
        } else {
            (wrapped_lines as usize).max(1)
        };
        let block = TextBlock::new(
            "w".to_string(),
            FxHashSet::default(),
            num_words,
            anchor_words,
            wrapped_words,
            wrapped_lines,
            0,
        );
        block.num_wrapped_lines() >= 1
            && (0.0..=1.0).contains(&block.link_density())
            && block.text_density()
                == block.num_words_in_wrapped_lines() as f64 / block.num_wrapped_lines() as f64
    }

    #[quickcheck]
    fn merge_spans_both_offset_ranges(first_offset: u8, second_offset: u8) -> bool {
        let mut first = TextBlock::new(
            "a".to_string(),
            FxHashSet::default(),
            1,
            0,
            1,
            1,
            first_offset as usize,
        );
        let second = TextBlock::new(
            "b".to_string(),
            FxHashSet::default(),
            1,
            0,
            1,
            1,
            second_offset as usize,
        );
        first.merge_next(second);
        first.offset_blocks_start() == (first_offset.min(second_offset)) as usize
            && first.offset_blocks_end() == (first_offset.max(second_offset)) as usize
            && first.offset_blocks_start() <= first.offset_blocks_end()
    }
}
