//! Preconfigured extractors: named filter chains with a convenience API for
//! going straight from HTML to the extracted text.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::block_builder;
use crate::document::TextDocument;
use crate::filters::{
    BlockFilter, BlockProximityFusion, BoilerplateBlockFilter, CanolaFilter,
    DensityRulesClassifier, DocumentTitleMatchClassifier, ExpandTitleToContentFilter, FilterChain,
    IgnoreBlocksAfterContentFilter, KeepLargestBlockFilter, MarkEverythingContentFilter,
    MinClauseWordsFilter, MinWordsFilter, NumWordsRulesClassifier, SimpleBlockFusionProcessor,
    SplitParagraphBlocksFilter, TerminatingBlocksFinder,
};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read input document: {0}")]
    Io(#[from] std::io::Error),
}

/// A filter chain with the plumbing to run it over raw HTML.
pub struct Extractor {
    chain: FilterChain,
}

impl Extractor {
    pub fn new(chain: FilterChain) -> Self {
        Self { chain }
    }

    /// Parses the HTML and runs the filter chain, returning the classified
    /// document for callers that want block-level access.
    pub fn get_doc(&self, html: &str) -> TextDocument {
        let mut doc = block_builder::parse_doc(html);
        self.chain.process(&mut doc);
        doc
    }

    /// Extracts the main text content. Never fails; an empty or bodyless
    /// document yields an empty string.
    pub fn get_content(&self, html: &str) -> String {
        self.get_doc(html).content()
    }

    pub fn get_content_from_file(&self, path: impl AsRef<Path>) -> Result<String, ExtractionError> {
        Ok(self.get_content(&fs::read_to_string(path)?))
    }
}

/// The filter chain behind [`article`], reusable as a building block.
pub fn article_filter_chain() -> FilterChain {
    FilterChain::new(vec![
        Box::new(TerminatingBlocksFinder),
        Box::new(DocumentTitleMatchClassifier::with_doc_title()),
        Box::new(NumWordsRulesClassifier),
        Box::new(IgnoreBlocksAfterContentFilter::default()),
        Box::new(BlockProximityFusion::new(1, false, false)),
        Box::new(BoilerplateBlockFilter),
        Box::new(BlockProximityFusion::new(1, true, false)),
        Box::new(KeepLargestBlockFilter::new(false)),
        Box::new(ExpandTitleToContentFilter),
    ])
}

/// Full-text extractor tuned towards news articles. Usually the most
/// accurate choice for article-like pages.
pub fn article() -> Extractor {
    Extractor::new(article_filter_chain())
}

/// A quite generic full-text extractor, simpler than [`article`] and
/// usually somewhat worse on articles.
pub fn default() -> Extractor {
    Extractor::new(FilterChain::new(vec![
        Box::new(SimpleBlockFusionProcessor),
        Box::new(BlockProximityFusion::new(1, false, false)),
        Box::new(DensityRulesClassifier),
    ]))
}

/// Extracts the largest text component of the page.
pub fn largest_content() -> Extractor {
    Extractor::new(FilterChain::new(vec![
        Box::new(NumWordsRulesClassifier),
        Box::new(BlockProximityFusion::new(1, false, false)),
        Box::new(KeepLargestBlockFilter::new(false)),
    ]))
}

/// Trained on the krdwrd Canola corpus, which uses a different notion of
/// boilerplate.
pub fn canola() -> Extractor {
    Extractor::new(FilterChain::new(vec![Box::new(CanolaFilter)]))
}

/// Marks everything as content. Useful to check whether a problem lies in a
/// particular extractor or elsewhere.
pub fn keep_everything() -> Extractor {
    Extractor::new(FilterChain::new(vec![Box::new(MarkEverythingContentFilter)]))
}

/// Classifies solely on the word counts of each block and its neighbours.
pub fn num_words_rules() -> Extractor {
    Extractor::new(FilterChain::new(vec![Box::new(NumWordsRulesClassifier)]))
}

/// Tuned towards extracting complete sentences from news articles.
pub fn article_sentences() -> Extractor {
    Extractor::new(FilterChain::new(vec![
        Box::new(article_filter_chain()),
        Box::new(SplitParagraphBlocksFilter),
        Box::new(MinClauseWordsFilter::new(5, false)),
    ]))
}

/// Keeps every block with at least `k_min` words.
pub fn keep_everything_with_min_k_words(k_min: usize) -> Extractor {
    Extractor::new(FilterChain::new(vec![
        Box::new(SimpleBlockFusionProcessor),
        Box::new(MarkEverythingContentFilter),
        Box::new(MinWordsFilter::new(k_min)),
    ]))
}
