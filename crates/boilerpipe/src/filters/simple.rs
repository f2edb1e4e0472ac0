//! Plain classification filters with no heuristics attached.

use lazy_static::lazy_static;
use regex::Regex;

use crate::document::{TextBlock, TextDocument};
use crate::filters::BlockFilter;

lazy_static! {
    static ref PAT_CLAUSE_DELIMITER: Regex = Regex::new(r"\b[,.:;!?]+(?:\s+|\z)").unwrap();
    static ref PAT_WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    static ref PAT_PARAGRAPH: Regex = Regex::new(r"[\n\r]+").unwrap();
}

/// Marks all blocks as content.
pub struct MarkEverythingContentFilter;

impl BlockFilter for MarkEverythingContentFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if !block.is_content() {
                block.set_is_content(true);
                changes = true;
            }
        }
        changes
    }
}

/// Flips the content flag on every block.
pub struct InvertedFilter;

impl BlockFilter for InvertedFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let blocks = doc.text_blocks_mut();
        if blocks.is_empty() {
            return false;
        }
        for block in blocks {
            let inverted = !block.is_content();
            block.set_is_content(inverted);
        }
        true
    }
}

/// Removes every block that is not marked as content.
pub struct BoilerplateBlockFilter;

impl BlockFilter for BoilerplateBlockFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let blocks = doc.text_blocks_mut();
        let before = blocks.len();
        blocks.retain(|block| block.is_content());
        blocks.len() < before
    }
}

/// Keeps only content blocks with at least `min_words` words.
pub struct MinWordsFilter {
    min_words: usize,
}

impl MinWordsFilter {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }
}

impl BlockFilter for MinWordsFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if !block.is_content() {
                continue;
            }
            if block.num_words() < self.min_words {
                block.set_is_content(false);
                changes = true;
            }
        }
        changes
    }
}

/// Keeps only blocks with at least one clause of `min_words` words.
///
/// Clauses are delimited by `,.:;!?` followed by whitespace or the end of
/// the text. A trailing fragment without a delimiter only counts when
/// `accept_clauses_without_delimiter` is set.
pub struct MinClauseWordsFilter {
    min_words: usize,
    accept_clauses_without_delimiter: bool,
}

impl MinClauseWordsFilter {
    pub fn new(min_words: usize, accept_clauses_without_delimiter: bool) -> Self {
        Self {
            min_words,
            accept_clauses_without_delimiter,
        }
    }

    fn is_clause_accepted(&self, text: &str) -> bool {
        let num_words = 1 + PAT_WHITESPACE.find_iter(text).count();
        num_words >= self.min_words
    }
}

impl BlockFilter for MinClauseWordsFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if !block.is_content() {
                continue;
            }
            let clauses: Vec<&str> = PAT_CLAUSE_DELIMITER.split(block.text()).collect();
            let mut has_clause = clauses[..clauses.len() - 1]
                .iter()
                .any(|clause| self.is_clause_accepted(clause));
            // Clauses normally end with a delimiter, so text without one is
            // only considered on request.
            if self.accept_clauses_without_delimiter {
                if let Some(last) = clauses.last() {
                    has_clause |= self.is_clause_accepted(last);
                }
            }
            if !has_clause {
                block.set_is_content(false);
                changes = true;
            }
        }
        changes
    }
}

/// Splits blocks at paragraph boundaries (runs of CR/LF).
///
/// The split parts inherit the content flag and labels, but their word
/// statistics are not recomputed; downstream filters see the counters of
/// the original block only on unsplit blocks. Highlighting support through
/// the contained text elements is lost for split blocks.
pub struct SplitParagraphBlocksFilter;

impl BlockFilter for SplitParagraphBlocksFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        let blocks = std::mem::take(doc.text_blocks_mut());
        let mut out = Vec::with_capacity(blocks.len());
        for block in blocks {
            let paragraphs: Vec<&str> = PAT_PARAGRAPH.split(block.text()).collect();
            if paragraphs.len() < 2 {
                out.push(block);
                continue;
            }
            for paragraph in paragraphs {
                let mut part = TextBlock::of_text(paragraph.to_string());
                part.set_is_content(block.is_content());
                part.add_labels(block.labels().iter().cloned());
                out.push(part);
            }
            changes = true;
        }
        *doc.text_blocks_mut() = out;
        changes
    }
}

/// Promotes a non-content block when both neighbours are content and the
/// block passes the given condition.
pub struct SurroundingToContentFilter {
    condition: fn(&TextBlock) -> bool,
}

fn default_surrounding_condition(block: &TextBlock) -> bool {
    block.link_density() == 0.0 && block.num_words() > 6
}

impl SurroundingToContentFilter {
    pub fn new(condition: fn(&TextBlock) -> bool) -> Self {
        Self { condition }
    }
}

impl Default for SurroundingToContentFilter {
    fn default() -> Self {
        Self::new(default_surrounding_condition)
    }
}

impl BlockFilter for SurroundingToContentFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let n = doc.text_blocks().len();
        let mut changes = false;
        let mut i = 1;
        while i + 1 < n {
            let promote = {
                let blocks = doc.text_blocks();
                let current = &blocks[i];
                !current.is_content()
                    && blocks[i - 1].is_content()
                    && blocks[i + 1].is_content()
                    && (self.condition)(current)
            };
            if promote {
                doc.text_blocks_mut()[i].set_is_content(true);
                changes = true;
                // The promoted block must not serve as the "previous"
                // neighbour of the very next decision.
                i += 2;
            } else {
                i += 1;
            }
        }
        changes
    }
}

/// Marks every content block bearing one of the given labels as boilerplate.
pub struct LabelToBoilerplateFilter {
    labels: Vec<String>,
}

impl LabelToBoilerplateFilter {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }
}

impl BlockFilter for LabelToBoilerplateFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if block.is_content() && self.labels.iter().any(|label| block.has_label(label)) {
                block.set_is_content(false);
                changes = true;
            }
        }
        changes
    }
}

/// Marks every non-content block bearing one of the given labels as content.
pub struct LabelToContentFilter {
    labels: Vec<String>,
}

impl LabelToContentFilter {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }
}

impl BlockFilter for LabelToContentFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if !block.is_content() && self.labels.iter().any(|label| block.has_label(label)) {
                block.set_is_content(true);
                changes = true;
            }
        }
        changes
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::DefaultLabels;
    use crate::filters::test_support::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mark_everything_content() {
        let mut doc = doc_of(vec![
            block_with_words(5, 0, 0),
            block_with_words(100, 0, 1),
            block_with_words(80, 0, 2),
        ]);
        set_content(&mut doc, &[false, true, false]);

        assert!(MarkEverythingContentFilter.process(&mut doc));
        assert_eq!(content_flags(&doc), vec![true, true, true]);
        // Idempotent: the second run changes nothing.
        assert!(!MarkEverythingContentFilter.process(&mut doc));
    }

    #[test]
    fn inverted_flips_every_flag() {
        let mut doc = doc_of(vec![
            block_with_words(5, 0, 0),
            block_with_words(100, 0, 1),
            block_with_words(80, 0, 2),
        ]);
        set_content(&mut doc, &[false, true, false]);

        assert!(InvertedFilter.process(&mut doc));
        assert_eq!(content_flags(&doc), vec![true, false, true]);
        // Applying it twice is the identity.
        assert!(InvertedFilter.process(&mut doc));
        assert_eq!(content_flags(&doc), vec![false, true, false]);

        let mut empty = doc_of(Vec::new());
        assert!(!InvertedFilter.process(&mut empty));
    }

    #[test]
    fn boilerplate_block_drops_non_content() {
        let mut doc = doc_of(vec![
            block_with_words(5, 0, 0),
            block_with_words(100, 0, 1),
            block_with_words(10, 0, 2),
            block_with_words(50, 0, 3),
            block_with_words(80, 0, 4),
        ]);
        set_content(&mut doc, &[false, true, false, true, false]);

        assert!(BoilerplateBlockFilter.process(&mut doc));
        assert_eq!(offsets(&doc), vec![(1, 1), (3, 3)]);
        assert_eq!(content_flags(&doc), vec![true, true]);
        // A second run finds only content blocks and changes nothing.
        assert!(!BoilerplateBlockFilter.process(&mut doc));
    }

    #[test]
    fn min_words_rejects_short_content() {
        let mut doc = doc_of(vec![block_with_words(10, 0, 0), block_with_words(50, 0, 1)]);
        set_content(&mut doc, &[true, true]);

        assert!(MinWordsFilter::new(20).process(&mut doc));
        assert_eq!(content_flags(&doc), vec![false, true]);
    }

    #[test]
    fn min_clause_words_needs_one_long_clause() {
        let mut doc = doc_of(vec![
            block_with_text("This is a clause, because it is separated by a comma.", 0),
            block_with_text("Real short", 1),
            block_with_text("Lots of, very, very, very, small, clauses.", 2),
            block_with_text(
                "If acceptClausesWithoutDelimiter is false then clauses that dont end in punctuation dont count",
                3,
            ),
        ]);
        set_content(&mut doc, &[true, true, true, true]);

        assert!(MinClauseWordsFilter::new(5, false).process(&mut doc));
        assert_eq!(content_flags(&doc), vec![true, false, false, false]);
    }

    #[test]
    fn split_paragraphs_copies_flags_to_each_part() {
        let mut doc = doc_of(vec![
            block_with_text("A single paragraph.", 0),
            block_with_text("Multiple paragraphs.\n\nParagraph 2 is here.", 1),
        ]);
        set_content(&mut doc, &[true, false]);

        assert!(SplitParagraphBlocksFilter.process(&mut doc));
        let texts: Vec<&str> = doc.text_blocks().iter().map(|b| b.text()).collect();
        assert_eq!(
            texts,
            vec![
                "A single paragraph.",
                "Multiple paragraphs.",
                "Paragraph 2 is here.",
            ]
        );
        assert_eq!(content_flags(&doc), vec![true, false, false]);
    }

    #[test]
    fn surrounding_blocks_pull_in_the_middle() {
        let mut doc = doc_of(vec![
            block_with_words(10, 0, 0),
            block_with_words(20, 0, 1),
            block_with_words(10, 0, 2),
            block_with_words(5, 5, 3),
            block_with_words(10, 0, 4),
            block_with_words(20, 0, 5),
            block_with_words(20, 0, 6),
            block_with_words(10, 0, 7),
        ]);
        set_content(
            &mut doc,
            &[true, false, true, false, true, false, false, true],
        );

        assert!(SurroundingToContentFilter::default().process(&mut doc));
        assert_eq!(
            content_flags(&doc),
            vec![true, true, true, false, true, false, false, true]
        );
    }

    #[test]
    fn label_to_boilerplate() {
        let not = DefaultLabels::STRICTLY_NOT_CONTENT;
        let maybe = DefaultLabels::MIGHT_BE_CONTENT;
        let mut doc = doc_of(vec![
            block_with_words(10, 0, 0),
            block_with_words(10, 0, 1),
            block_with_words(10, 0, 2),
            block_with_words(10, 0, 3),
        ]);
        set_content(&mut doc, &[true, true, true, true]);
        doc.text_blocks_mut()[0].add_label(not);
        doc.text_blocks_mut()[1].add_label(maybe);
        doc.text_blocks_mut()[2].add_labels([not, maybe]);

        let filter = LabelToBoilerplateFilter::new(vec![not.to_string()]);
        assert!(filter.process(&mut doc));
        assert_eq!(content_flags(&doc), vec![false, true, false, true]);
    }

    #[test]
    fn label_to_content() {
        let not = DefaultLabels::STRICTLY_NOT_CONTENT;
        let maybe = DefaultLabels::MIGHT_BE_CONTENT;
        let mut doc = doc_of(vec![
            block_with_words(10, 0, 0),
            block_with_words(10, 0, 1),
            block_with_words(10, 0, 2),
            block_with_words(10, 0, 3),
        ]);
        doc.text_blocks_mut()[0].add_label(not);
        doc.text_blocks_mut()[1].add_label(maybe);
        doc.text_blocks_mut()[2].add_labels([not, maybe]);

        let filter = LabelToContentFilter::new(vec![maybe.to_string()]);
        assert!(filter.process(&mut doc));
        assert_eq!(content_flags(&doc), vec![false, true, true, false]);
    }
}
