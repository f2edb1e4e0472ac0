//! Heuristic filters trained on English-language text, including the
//! decision-tree classifiers from the WSDM 2010 paper "Boilerplate Detection
//! using Shallow Text Features".

use crate::document::{DefaultLabels, TextBlock, TextDocument};
use crate::filters::BlockFilter;

/// Words of a block that is dense enough to be believed full text.
fn num_full_text_words(block: &TextBlock) -> usize {
    if block.text_density() >= 9.0 {
        block.num_words()
    } else {
        0
    }
}

/// Keeps only content blocks with at least `min_words` full-text words.
pub struct MinFulltextWordsFilter {
    min_words: usize,
}

impl MinFulltextWordsFilter {
    pub fn new(min_words: usize) -> Self {
        Self { min_words }
    }
}

impl Default for MinFulltextWordsFilter {
    fn default() -> Self {
        Self::new(30)
    }
}

impl BlockFilter for MinFulltextWordsFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if block.is_content() && num_full_text_words(block) < self.min_words {
                block.set_is_content(false);
                changes = true;
            }
        }
        changes
    }
}

/// Like [`KeepLargestBlockFilter`](crate::filters::KeepLargestBlockFilter),
/// but ranks blocks by full-text words, discounting short low-density
/// fragments entirely.
pub struct KeepLargestFulltextBlockFilter;

impl BlockFilter for KeepLargestFulltextBlockFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        if doc.text_blocks().len() < 2 {
            return false;
        }

        let mut largest: Option<(usize, usize)> = None;
        for (idx, block) in doc.text_blocks().iter().enumerate() {
            if !block.is_content() {
                continue;
            }
            let words = num_full_text_words(block);
            if largest.map_or(true, |(_, best)| words > best) {
                largest = Some((idx, words));
            }
        }
        let Some((largest_idx, _)) = largest else {
            return false;
        };

        for (idx, block) in doc.text_blocks_mut().iter_mut().enumerate() {
            if idx == largest_idx {
                block.set_is_content(true);
            } else {
                block.set_is_content(false);
                block.add_label(DefaultLabels::MIGHT_BE_CONTENT);
            }
        }
        true
    }
}

/// Marks everything after an end-of-text marker as non-content, once enough
/// full-text words have been seen. Meant to run after
/// [`TerminatingBlocksFinder`].
pub struct IgnoreBlocksAfterContentFilter {
    min_num_words: usize,
}

impl IgnoreBlocksAfterContentFilter {
    pub fn new(min_num_words: usize) -> Self {
        Self { min_num_words }
    }
}

impl Default for IgnoreBlocksAfterContentFilter {
    fn default() -> Self {
        Self::new(60)
    }
}

impl BlockFilter for IgnoreBlocksAfterContentFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        let mut num_words = 0;
        let mut found_end_of_text = false;
        for block in doc.text_blocks_mut() {
            if block.is_content() {
                num_words += num_full_text_words(block);
            }
            if block.has_label(DefaultLabels::INDICATES_END_OF_TEXT)
                && num_words >= self.min_num_words
            {
                found_end_of_text = true;
            }
            if found_end_of_text {
                changes = true;
                block.set_is_content(false);
            }
        }
        changes
    }
}

/// Strikes end-of-text markers from the tail of the document, stopping once
/// 200 content words have been seen from the end.
pub struct IgnoreBlocksAfterContentFromEndFilter;

impl BlockFilter for IgnoreBlocksAfterContentFromEndFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        let mut words = 0;
        for block in doc.text_blocks_mut().iter_mut().rev() {
            if block.has_label(DefaultLabels::INDICATES_END_OF_TEXT) {
                block.add_label(DefaultLabels::STRICTLY_NOT_CONTENT);
                block.remove_label(DefaultLabels::MIGHT_BE_CONTENT);
                block.set_is_content(false);
                changes = true;
            } else if block.is_content() {
                words += block.num_words();
                if words > 200 {
                    break;
                }
            }
        }
        changes
    }
}

/// Finds short blocks that look like the start of a comment section or
/// similar article trailer and labels them with
/// [`DefaultLabels::INDICATES_END_OF_TEXT`].
pub struct TerminatingBlocksFinder;

const START_MATCHES: [&str; 3] = [" reuters", "please rate this", "post a comment"];
const IN_MATCHES: [&str; 7] = [
    "what you think...",
    "add your comment",
    "add comment",
    "reader views",
    "have your say",
    "reader comments",
    "rtta artikeln",
];
const EQ_MATCH: &str = "thanks for your comments - this feedback is now closed";

/// Whether the text starts with a digit run followed by one of the given
/// suffixes.
fn starts_with_number(text: &str, suffixes: &[&str]) -> bool {
    let pos = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    pos > 0 && suffixes.iter().any(|suffix| text[pos..].starts_with(suffix))
}

impl BlockFilter for TerminatingBlocksFinder {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if block.num_words() >= 15 {
                continue;
            }
            let text = block.text().trim();
            if text.chars().count() < 8 {
                continue;
            }
            let text = text.to_lowercase();

            if text.starts_with("comments")
                || starts_with_number(&text, &[" comments", " users responded in"])
                || START_MATCHES.iter().any(|prefix| text.starts_with(prefix))
                || IN_MATCHES.iter().any(|needle| text.contains(needle))
                || text == EQ_MATCH
            {
                block.add_label(DefaultLabels::INDICATES_END_OF_TEXT);
                changes = true;
            }
        }
        changes
    }
}

/// Runs a three-block-window classifier over the document. The first and
/// last blocks see a zero-statistics sentinel as their missing neighbour.
fn classify_neighbourhoods(
    doc: &mut TextDocument,
    classify: fn(&TextBlock, &TextBlock, &TextBlock) -> bool,
) -> bool {
    let n = doc.text_blocks().len();
    let mut changes = false;
    for i in 0..n {
        let is_content = {
            let blocks = doc.text_blocks();
            let prev = if i > 0 {
                &blocks[i - 1]
            } else {
                TextBlock::empty_start()
            };
            let next = if i + 1 < n {
                &blocks[i + 1]
            } else {
                TextBlock::empty_end()
            };
            classify(prev, &blocks[i], next)
        };
        changes |= doc.text_blocks_mut()[i].set_is_content(is_content);
    }
    changes
}

/// Decision-tree classifier over the word counts and link densities of a
/// block and its neighbours (C4.8-derived rules).
pub struct NumWordsRulesClassifier;

fn classify_by_num_words(prev: &TextBlock, curr: &TextBlock, next: &TextBlock) -> bool {
    if curr.link_density() > 0.333333 {
        return false;
    }
    if prev.link_density() <= 0.555556 {
        curr.num_words() > 16 || next.num_words() > 15 || prev.num_words() > 4
    } else {
        curr.num_words() > 40 || next.num_words() > 17
    }
}

impl BlockFilter for NumWordsRulesClassifier {
    fn process(&self, doc: &mut TextDocument) -> bool {
        classify_neighbourhoods(doc, classify_by_num_words)
    }
}

/// Decision-tree classifier over text densities and link densities
/// (C4.8-derived rules).
pub struct DensityRulesClassifier;

fn classify_by_density(prev: &TextBlock, curr: &TextBlock, next: &TextBlock) -> bool {
    if curr.link_density() > 0.333333 {
        return false;
    }
    if prev.link_density() <= 0.555556 {
        if curr.text_density() > 9.0 {
            next.text_density() != 0.0
        } else {
            next.text_density() > 10.0 || prev.text_density() > 4.0
        }
    } else {
        next.text_density() > 11.0
    }
}

impl BlockFilter for DensityRulesClassifier {
    fn process(&self, doc: &mut TextDocument) -> bool {
        classify_neighbourhoods(doc, classify_by_density)
    }
}

/// Full-text classifier trained on the krdwrd Canola corpus.
pub struct CanolaFilter;

fn classify_canola(prev: &TextBlock, curr: &TextBlock, next: &TextBlock) -> bool {
    (curr.link_density() > 0.0 && next.num_words() > 11)
        || curr.num_words() > 19
        || (next.num_words() > 6
            && next.link_density() == 0.0
            && prev.link_density() == 0.0
            && (curr.num_words() > 6 || prev.num_words() > 7 || next.num_words() > 19))
}

impl BlockFilter for CanolaFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        classify_neighbourhoods(doc, classify_canola)
    }
}
