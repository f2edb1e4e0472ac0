//! The filter pipeline: composable passes over a [`TextDocument`]'s block
//! sequence that classify blocks as content or boilerplate, fuse adjacent
//! blocks, or drop blocks outright.
//!
//! Every pass reports whether it changed the document, so chains and callers
//! can detect fixpoints. No filter ever fails; malformed or empty documents
//! simply pass through.

use crate::document::TextDocument;

mod english;
mod heuristics;
mod simple;

pub use english::{
    CanolaFilter, DensityRulesClassifier, IgnoreBlocksAfterContentFilter,
    IgnoreBlocksAfterContentFromEndFilter, KeepLargestFulltextBlockFilter, MinFulltextWordsFilter,
    NumWordsRulesClassifier, TerminatingBlocksFinder,
};
pub use heuristics::{
    AddPrecedingLabelsFilter, ArticleMetadataFilter, BlockProximityFusion, ContentFusion,
    DocumentTitleMatchClassifier, ExpandTitleToContentFilter, KeepLargestBlockFilter, LabelFusion,
    SimpleBlockFusionProcessor,
};
pub use simple::{
    BoilerplateBlockFilter, InvertedFilter, LabelToBoilerplateFilter, LabelToContentFilter,
    MarkEverythingContentFilter, MinClauseWordsFilter, MinWordsFilter, SplitParagraphBlocksFilter,
    SurroundingToContentFilter,
};

/// A single pass over a document.
pub trait BlockFilter {
    /// Processes the document in place. Returns whether anything changed.
    fn process(&self, doc: &mut TextDocument) -> bool;
}

/// Runs a fixed sequence of filters, each exactly once.
pub struct FilterChain {
    filters: Vec<Box<dyn BlockFilter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Box<dyn BlockFilter>>) -> Self {
        Self { filters }
    }
}

impl BlockFilter for FilterChain {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut updated = false;
        for filter in &self.filters {
            updated |= filter.process(doc);
        }
        updated
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use rustc_hash::FxHashSet;

    use crate::document::{TextBlock, TextDocument};

    pub(crate) const DEFAULT_WORDS: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit. Donec fermentum tincidunt magna, eu pulvinar mauris dapibus pharetra. In varius, nisl a rutrum porta, sem sem semper lacus, et varius urna tellus vel lorem. Nullam urna eros, luctus eget blandit ac, imperdiet feugiat ipsum. Donec laoreet tristique mi a bibendum. Sed pretium bibendum scelerisque. Mauris id pellentesque turpis. Mauris porta adipiscing massa, quis tempus dui pharetra ac. Morbi lacus mauris, feugiat ac tempor ut, congue tincidunt risus. Pellentesque tincidunt adipiscing elit, in fringilla enim scelerisque vel. Nulla facilisi.";

    /// Block of the first `num_words` default words, mirroring how the
    /// builder would have counted them.
    pub(crate) fn block_with_words(
        num_words: usize,
        anchor_words: usize,
        offset: usize,
    ) -> TextBlock {
        let text = DEFAULT_WORDS
            .split(' ')
            .take(num_words)
            .collect::<Vec<_>>()
            .join(" ");
        TextBlock::new(
            text,
            FxHashSet::default(),
            num_words,
            anchor_words,
            0,
            0,
            offset,
        )
    }

    /// Block over literal text; the word count follows the space count, the
    /// way the original test corpus sets these up.
    pub(crate) fn block_with_text(text: &str, offset: usize) -> TextBlock {
        TextBlock::new(
            text.to_string(),
            FxHashSet::default(),
            text.matches(' ').count(),
            0,
            0,
            0,
            offset,
        )
    }

    pub(crate) fn doc_of(blocks: Vec<TextBlock>) -> TextDocument {
        TextDocument::new(blocks, None)
    }

    pub(crate) fn content_flags(doc: &TextDocument) -> Vec<bool> {
        doc.text_blocks().iter().map(|b| b.is_content()).collect()
    }

    pub(crate) fn offsets(doc: &TextDocument) -> Vec<(usize, usize)> {
        doc.text_blocks()
            .iter()
            .map(|b| (b.offset_blocks_start(), b.offset_blocks_end()))
            .collect()
    }

    pub(crate) fn set_content(doc: &mut TextDocument, flags: &[bool]) {
        for (block, flag) in doc.text_blocks_mut().iter_mut().zip(flags) {
            block.set_is_content(*flag);
        }
    }
}
