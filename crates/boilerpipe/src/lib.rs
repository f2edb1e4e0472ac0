//! Removes boilerplate (navigation, advertisements, comment footers) from
//! HTML pages and extracts the main textual content.
//!
//! The pipeline is shallow by design: no DOM is built and no language
//! parsing happens. An html5ever tokenizer feeds a [`BlockBuilder`], which
//! folds the event stream into a flat sequence of [`TextBlock`]s carrying
//! structural and statistical features (words per block, link density, text
//! density over simulated 80-column lines, tag nesting depth). A chain of
//! [`filters`] then classifies each block as content or boilerplate.
//!
//! Most callers want one of the preconfigured [`extractors`]:
//!
//! ```
//! let content = boilerpipe::extractors::article()
//!     .get_content("<html><head><title>t</title></head><body>\
//!                   <p>Some long enough paragraph of article text that the \
//!                   classifier will happily keep around for the reader.</p>\
//!                   </body></html>");
//! assert!(content.contains("article text"));
//! ```

pub mod block_builder;
pub mod document;
pub mod extractors;
pub mod filters;
pub mod tag_actions;

pub use block_builder::{parse_doc, parse_doc_with, BlockBuilder};
pub use document::{DefaultLabels, TextBlock, TextDocument, TextDocumentStatistics};
pub use extractors::{ExtractionError, Extractor};
