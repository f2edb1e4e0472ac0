//! Generic heuristic filters: block fusion, largest-block selection, title
//! matching and metadata detection.

use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::document::{DefaultLabels, TextBlock, TextDocument};
use crate::filters::BlockFilter;

lazy_static! {
    static ref PAT_DATE: Regex = Regex::new(
        r"^[0-9 ,./]*\b(?i:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec|January|February|March|April|June|July|August|September|October|November|December)?\b[0-9 ,:apm./]*(?:[CPSDMGET]{2,3})?$"
    )
    .unwrap();
    static ref PAT_BYLINE: Regex = Regex::new(r"^[Bb]y ").unwrap();
    static ref PAT_WORD_COUNT: Regex = Regex::new(r"\w+").unwrap();
    static ref TITLE_DELIMITERS: [Regex; 4] = [
        Regex::new(r"[ ]*[|:][ ]*").unwrap(),
        Regex::new(r"[ ]*[|:()][ ]*").unwrap(),
        Regex::new(r"[ ]*[|:()\-][ ]*").unwrap(),
        Regex::new(r"[ ]*[|,:()\-][ ]*").unwrap(),
    ];
}

/// Merges two subsequent blocks if their text densities are equal.
pub struct SimpleBlockFusionProcessor;

impl BlockFilter for SimpleBlockFusionProcessor {
    fn process(&self, doc: &mut TextDocument) -> bool {
        if doc.text_blocks().len() < 2 {
            return false;
        }
        let mut changes = false;
        let blocks = std::mem::take(doc.text_blocks_mut());
        let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            match merged.last_mut() {
                Some(prev) if prev.text_density() == block.text_density() => {
                    prev.merge_next(block);
                    changes = true;
                }
                _ => merged.push(block),
            }
        }
        *doc.text_blocks_mut() = merged;
        changes
    }
}

/// Merges a successor into a content predecessor while the successor's link
/// density stays low and it is not strictly marked non-content. Each pass
/// rescans the updated sequence from the start; the filter iterates to a
/// fixpoint.
pub struct ContentFusion;

impl BlockFilter for ContentFusion {
    fn process(&self, doc: &mut TextDocument) -> bool {
        if doc.text_blocks().len() < 2 {
            return false;
        }
        let mut changes = false;
        let mut blocks = std::mem::take(doc.text_blocks_mut());
        loop {
            let mut changed_on_pass = false;
            let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
            for block in blocks {
                match merged.last_mut() {
                    Some(prev)
                        if prev.is_content()
                            && block.link_density() < 0.56
                            && !block.has_label(DefaultLabels::STRICTLY_NOT_CONTENT) =>
                    {
                        prev.merge_next(block);
                        changed_on_pass = true;
                    }
                    _ => merged.push(block),
                }
            }
            blocks = merged;
            changes |= changed_on_pass;
            if !changed_on_pass {
                break;
            }
        }
        *doc.text_blocks_mut() = blocks;
        changes
    }
}

/// Fuses adjacent blocks whose `MARKUP:` label subsets are equal. Two
/// blocks without any markup labels count as equal and are merged.
pub struct LabelFusion;

fn markup_labels(block: &TextBlock) -> FxHashSet<&str> {
    block
        .labels()
        .iter()
        .filter(|label| label.starts_with(DefaultLabels::MARKUP_PREFIX))
        .map(String::as_str)
        .collect()
}

impl BlockFilter for LabelFusion {
    fn process(&self, doc: &mut TextDocument) -> bool {
        if doc.text_blocks().len() < 2 {
            return false;
        }
        let mut changes = false;
        let blocks = std::mem::take(doc.text_blocks_mut());
        let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
        for block in blocks {
            match merged.last_mut() {
                Some(prev) if markup_labels(prev) == markup_labels(&block) => {
                    prev.merge_next(block);
                    changes = true;
                }
                _ => merged.push(block),
            }
        }
        *doc.text_blocks_mut() = merged;
        changes
    }
}

/// Fuses blocks whose distance in the original block numbering does not
/// exceed a limit. Useful after a pass that already removed blocks in
/// between.
pub struct BlockProximityFusion {
    max_blocks_distance: usize,
    content_only: bool,
    same_tag_level_only: bool,
}

impl BlockProximityFusion {
    pub fn new(max_blocks_distance: usize, content_only: bool, same_tag_level_only: bool) -> Self {
        Self {
            max_blocks_distance,
            content_only,
            same_tag_level_only,
        }
    }
}

impl BlockFilter for BlockProximityFusion {
    fn process(&self, doc: &mut TextDocument) -> bool {
        if doc.text_blocks().len() < 2 {
            return false;
        }
        let start_idx = if self.content_only {
            match doc.text_blocks().iter().position(|b| b.is_content()) {
                Some(idx) => idx,
                None => return false,
            }
        } else {
            0
        };

        let mut changes = false;
        let blocks = std::mem::take(doc.text_blocks_mut());
        let mut merged: Vec<TextBlock> = Vec::with_capacity(blocks.len());
        for (idx, block) in blocks.into_iter().enumerate() {
            if idx <= start_idx || !block.is_content() {
                merged.push(block);
                continue;
            }
            match merged.last_mut() {
                Some(prev)
                    if {
                        let gap = block.offset_blocks_start() as i64
                            - prev.offset_blocks_end() as i64
                            - 1;
                        gap <= self.max_blocks_distance as i64
                            && (!self.content_only
                                || (prev.is_content() && block.is_content()))
                            && (!self.same_tag_level_only
                                || prev.tag_level() == block.tag_level())
                    } =>
                {
                    prev.merge_next(block);
                    changes = true;
                }
                _ => merged.push(block),
            }
        }
        *doc.text_blocks_mut() = merged;
        changes
    }
}

/// Keeps the largest content block (by number of words). Every other block
/// is marked non-content and labelled as possible content. Optionally every
/// sibling block at the winner's tag level is promoted along with it.
pub struct KeepLargestBlockFilter {
    expand_to_same_level_text: bool,
}

impl KeepLargestBlockFilter {
    pub fn new(expand_to_same_level_text: bool) -> Self {
        Self {
            expand_to_same_level_text,
        }
    }
}

impl BlockFilter for KeepLargestBlockFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let n = doc.text_blocks().len();
        if n < 2 {
            return false;
        }

        // Ties go to the first block.
        let mut largest: Option<(usize, usize)> = None;
        for (idx, block) in doc.text_blocks().iter().enumerate() {
            if !block.is_content() {
                continue;
            }
            if largest.map_or(true, |(_, best)| block.num_words() > best) {
                largest = Some((idx, block.num_words()));
            }
        }

        for (idx, block) in doc.text_blocks_mut().iter_mut().enumerate() {
            if Some(idx) == largest.map(|(i, _)| i) {
                block.set_is_content(true);
            } else {
                block.set_is_content(false);
                block.add_label(DefaultLabels::MIGHT_BE_CONTENT);
            }
        }

        if self.expand_to_same_level_text {
            if let Some((largest_idx, _)) = largest {
                let level = doc.text_blocks()[largest_idx].tag_level();
                for idx in (0..=largest_idx).rev() {
                    let tag_level = doc.text_blocks()[idx].tag_level();
                    if tag_level < level {
                        break;
                    }
                    if tag_level == level {
                        doc.text_blocks_mut()[idx].set_is_content(true);
                    }
                }
                for idx in largest_idx..n {
                    let tag_level = doc.text_blocks()[idx].tag_level();
                    if tag_level < level {
                        break;
                    }
                    if tag_level == level {
                        doc.text_blocks_mut()[idx].set_is_content(true);
                    }
                }
            }
        }
        true
    }
}

/// Promotes the blocks between the headline and the first content block,
/// provided they were flagged as possible content by an earlier pass.
pub struct ExpandTitleToContentFilter;

impl BlockFilter for ExpandTitleToContentFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut title_idx = None;
        let mut content_start = None;
        for (idx, block) in doc.text_blocks().iter().enumerate() {
            if content_start.is_none()
                && title_idx.is_none()
                && block.has_label(DefaultLabels::TITLE)
            {
                title_idx = Some(idx);
            }
            if content_start.is_none() && block.is_content() {
                content_start = Some(idx);
            }
        }

        let (Some(title_idx), Some(content_start)) = (title_idx, content_start) else {
            return false;
        };
        if content_start <= title_idx {
            return false;
        }

        let mut changes = false;
        for block in &mut doc.text_blocks_mut()[title_idx..content_start] {
            if block.has_label(DefaultLabels::MIGHT_BE_CONTENT) {
                changes |= block.set_is_content(true);
            }
        }
        changes
    }
}

/// Detects date/time and byline blocks and marks them as article metadata.
pub struct ArticleMetadataFilter;

impl BlockFilter for ArticleMetadataFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let mut changes = false;
        for block in doc.text_blocks_mut() {
            if block.num_words() > 10 {
                continue;
            }
            if PAT_DATE.is_match(block.text()) || PAT_BYLINE.is_match(block.text()) {
                changes = true;
                block.set_is_content(true);
                block.add_label(DefaultLabels::ARTICLE_METADATA);
            }
        }
        changes
    }
}

/// Copies each block's labels onto its successor, with a prefix.
pub struct AddPrecedingLabelsFilter {
    label_prefix: String,
}

impl AddPrecedingLabelsFilter {
    pub fn new(label_prefix: impl Into<String>) -> Self {
        Self {
            label_prefix: label_prefix.into(),
        }
    }
}

impl BlockFilter for AddPrecedingLabelsFilter {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let n = doc.text_blocks().len();
        if n < 2 {
            return false;
        }
        let mut changes = false;
        // Walk backward so a block hands on only the labels it had before
        // this pass touched it.
        for idx in (0..n - 1).rev() {
            let labels: Vec<String> = doc.text_blocks()[idx].labels().iter().cloned().collect();
            if labels.is_empty() {
                continue;
            }
            let below = &mut doc.text_blocks_mut()[idx + 1];
            for label in labels {
                below.add_label(format!("{}{}", self.label_prefix, label));
            }
            changes = true;
        }
        changes
    }
}

/// Labels blocks whose text matches the HTML `<title>`, or a plausible part
/// of it, with [`DefaultLabels::TITLE`]. The heuristics are tuned for news
/// sites, which usually decorate the title with the site name.
pub struct DocumentTitleMatchClassifier {
    potential_titles: Option<FxHashSet<String>>,
    use_doc_title: bool,
}

impl DocumentTitleMatchClassifier {
    /// Matches against the given title string, fixed at construction time.
    pub fn new(title: Option<&str>) -> Self {
        Self {
            potential_titles: title.and_then(find_potential_titles),
            use_doc_title: false,
        }
    }

    /// Matches against the document's own title at processing time.
    pub fn with_doc_title() -> Self {
        Self {
            potential_titles: None,
            use_doc_title: true,
        }
    }
}

fn find_potential_titles(title: &str) -> Option<FxHashSet<String>> {
    let title = title.trim();
    if title.is_empty() {
        return None;
    }
    let mut potential_titles = FxHashSet::default();
    potential_titles.insert(title.to_string());
    for pattern in TITLE_DELIMITERS.iter() {
        if let Some(part) = longest_part(title, pattern) {
            potential_titles.insert(part);
        }
    }
    Some(potential_titles)
}

/// The part with the most words; ties go to the longer part. Parts that look
/// like a domain name are skipped.
fn longest_part(title: &str, pattern: &Regex) -> Option<String> {
    let parts: Vec<&str> = pattern.split(title).collect();
    if parts.len() == 1 {
        return None;
    }
    let mut longest_num_words = 0;
    let mut longest_part = "";
    for part in parts {
        if part.contains(".com") {
            continue;
        }
        let num_words = PAT_WORD_COUNT.find_iter(part).count();
        if num_words > longest_num_words
            || (num_words == longest_num_words && part.len() > longest_part.len())
        {
            longest_num_words = num_words;
            longest_part = part;
        }
    }
    if longest_part.is_empty() {
        None
    } else {
        Some(longest_part.trim().to_string())
    }
}

impl BlockFilter for DocumentTitleMatchClassifier {
    fn process(&self, doc: &mut TextDocument) -> bool {
        let computed;
        let potential_titles = if self.use_doc_title {
            computed = doc.title().and_then(find_potential_titles);
            computed.as_ref()
        } else {
            self.potential_titles.as_ref()
        };
        let Some(potential_titles) = potential_titles else {
            return false;
        };

        let mut changes = false;
        for block in doc.text_blocks_mut() {
            let text = block.text().trim().to_lowercase();
            if potential_titles
                .iter()
                .any(|candidate| candidate.to_lowercase() == text)
            {
                block.add_label(DefaultLabels::TITLE);
                changes = true;
            }
        }
        changes
    }
}
