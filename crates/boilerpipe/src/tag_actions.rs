//! The vocabulary of per-tag behaviours driving the [`BlockBuilder`].
//!
//! Every start or end tag is looked up in a [`TagActionMap`]; the resulting
//! [`TagAction`] mutates the builder's nesting counters, stacks and buffers.
//! Unknown tags default to block-level behaviour.

use std::rc::Rc;

use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::FxHashMap;

use crate::block_builder::{BlockBuilder, ANCHOR_TEXT_END, ANCHOR_TEXT_START};
use crate::document::{DefaultLabels, TextBlock};

lazy_static! {
    static ref PAT_FONT_SIZE: Regex = Regex::new(r"^([+-]?)([0-9]+)").unwrap();
    static ref PAT_NUM: Regex = Regex::new(r"[0-9]+").unwrap();
}

/// Attaches labels to the [`TextBlock`] being flushed, optionally guarded by
/// a predicate over the finished block.
#[derive(Clone)]
pub struct LabelAction {
    labels: Vec<String>,
    condition: Option<fn(&TextBlock) -> bool>,
}

impl LabelAction {
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            condition: None,
        }
    }

    pub fn conditional(condition: fn(&TextBlock) -> bool, labels: Vec<String>) -> Self {
        Self {
            labels,
            condition: Some(condition),
        }
    }

    pub fn add_to(&self, block: &mut TextBlock) {
        if self.condition.map_or(true, |condition| condition(block)) {
            block.add_labels(self.labels.iter().cloned());
        }
    }
}

/// User-supplied tag behaviour, for tags the built-in vocabulary does not
/// cover.
pub trait CustomTagAction {
    fn start(&self, builder: &mut BlockBuilder, name: &str, attrs: &[(String, String)]) -> bool;
    fn end(&self, builder: &mut BlockBuilder, name: &str) -> bool;
    fn changes_tag_level(&self) -> bool;
}

/// What a start or end tag does to the block builder's state.
///
/// The `start` and `end` methods return whether the pending block must be
/// flushed before the next character data.
#[derive(Clone)]
pub enum TagAction {
    /// All inner content is silently skipped (style, script, option and the
    /// like).
    IgnorableElement,
    /// Anchor scope. Emits the anchor boundary tokens into the token buffer.
    /// Anchors may not be nested; a nested open is treated as if it closed
    /// the outer anchor first.
    AnchorText,
    /// The `BODY` element. Text outside of it never forms blocks.
    Body,
    /// Inline element that guarantees a whitespace boundary but does not
    /// break the block.
    InlineWhitespace,
    /// Inline element with no effect at all.
    InlineNoWhitespace,
    /// Block-level element: forces a flush on entry and exit.
    BlockLevel,
    /// The `FONT` element. Tracks absolute and relative font sizes on the
    /// builder's font size stack.
    Font,
    /// Inline behaviour plus a [`LabelAction`] for the enclosing block.
    InlineTagLabel(LabelAction),
    /// Block-level behaviour plus a [`LabelAction`] for the enclosing block.
    BlockTagLabel(LabelAction),
    /// Derives `MARKUP:` labels from the tag name, its CSS classes and its
    /// id, expanded with the labels of enclosing markup scopes.
    Markup { is_block_level: bool },
    /// Runs two actions in sequence, ORing their effects.
    Chained(Box<TagAction>, Box<TagAction>),
    /// An open extension point for user-written behaviour.
    Custom(Rc<dyn CustomTagAction>),
}

impl TagAction {
    pub fn start(&self, builder: &mut BlockBuilder, name: &str, attrs: &[(String, String)]) -> bool {
        match self {
            TagAction::IgnorableElement => {
                builder.in_ignorable_element += 1;
                true
            }
            TagAction::AnchorText => {
                builder.in_anchor += 1;
                if builder.in_anchor > 1 {
                    // Nested A elements are not allowed by the specification,
                    // so the tokenizer upstream has mis-nested the input.
                    tracing::warn!(
                        "input contains nested A elements; closing the outer anchor to recover"
                    );
                    self.end(builder, name);
                }
                if builder.in_ignorable_element == 0 {
                    builder.add_token(ANCHOR_TEXT_START);
                }
                false
            }
            TagAction::Body => {
                builder.flush_block();
                builder.in_body += 1;
                false
            }
            TagAction::InlineWhitespace => {
                builder.ensure_whitespace();
                false
            }
            TagAction::InlineNoWhitespace => false,
            TagAction::BlockLevel => true,
            TagAction::Font => {
                let size = attr(attrs, "size")
                    .and_then(|value| parse_font_size(value, builder.font_size_stack()));
                builder.push_font_size(size);
                false
            }
            TagAction::InlineTagLabel(action) => {
                builder.ensure_whitespace();
                builder.add_label_action(action.clone());
                false
            }
            TagAction::BlockTagLabel(action) => {
                builder.add_label_action(action.clone());
                true
            }
            TagAction::Markup { is_block_level } => {
                let mut labels = vec![format!("{}{}", DefaultLabels::MARKUP_PREFIX, name)];
                if let Some(class) = attr(attrs, "class").filter(|class| !class.is_empty()) {
                    let class = PAT_NUM.replace_all(class, "#");
                    let class = class.trim();
                    labels.push(format!(
                        "{}.{}",
                        DefaultLabels::MARKUP_PREFIX,
                        class.replace(' ', ".")
                    ));
                    let parts: Vec<&str> = class.split_whitespace().collect();
                    if parts.len() > 1 {
                        for part in parts {
                            labels.push(format!("{}.{}", DefaultLabels::MARKUP_PREFIX, part));
                        }
                    }
                }
                if let Some(id) = attr(attrs, "id").filter(|id| !id.is_empty()) {
                    let id = PAT_NUM.replace_all(id, "#");
                    labels.push(format!("{}#{}", DefaultLabels::MARKUP_PREFIX, id));
                }

                let ancestors = builder.markup_ancestor_labels();
                let mut with_ancestors =
                    Vec::with_capacity(labels.len() * (2 * ancestors.len() + 1));
                for label in &labels {
                    for ancestor in &ancestors {
                        with_ancestors.push(ancestor.clone());
                        with_ancestors.push(format!("{ancestor} {label}"));
                    }
                    with_ancestors.push(label.clone());
                }
                builder.add_label_action(LabelAction::new(with_ancestors));
                builder.push_markup_labels(labels);
                *is_block_level
            }
            TagAction::Chained(first, second) => {
                let flush_first = first.start(builder, name, attrs);
                let flush_second = second.start(builder, name, attrs);
                flush_first || flush_second
            }
            TagAction::Custom(action) => action.start(builder, name, attrs),
        }
    }

    pub fn end(&self, builder: &mut BlockBuilder, name: &str) -> bool {
        match self {
            TagAction::IgnorableElement => {
                builder.in_ignorable_element = builder.in_ignorable_element.saturating_sub(1);
                true
            }
            TagAction::AnchorText => {
                builder.in_anchor = builder.in_anchor.saturating_sub(1);
                if builder.in_anchor == 0 && builder.in_ignorable_element == 0 {
                    builder.add_token(ANCHOR_TEXT_END);
                }
                false
            }
            TagAction::Body => {
                builder.flush_block();
                builder.in_body = builder.in_body.saturating_sub(1);
                false
            }
            TagAction::InlineWhitespace => {
                builder.ensure_whitespace();
                false
            }
            TagAction::InlineNoWhitespace => false,
            TagAction::BlockLevel => true,
            TagAction::Font => {
                builder.pop_font_size();
                false
            }
            TagAction::InlineTagLabel(_) => {
                builder.ensure_whitespace();
                false
            }
            TagAction::BlockTagLabel(_) => true,
            TagAction::Markup { is_block_level } => {
                builder.pop_markup_labels();
                *is_block_level
            }
            TagAction::Chained(first, second) => {
                let flush_first = first.end(builder, name);
                let flush_second = second.end(builder, name);
                flush_first || flush_second
            }
            TagAction::Custom(action) => action.end(builder, name),
        }
    }

    pub fn changes_tag_level(&self) -> bool {
        match self {
            TagAction::IgnorableElement
            | TagAction::AnchorText
            | TagAction::Body
            | TagAction::BlockLevel
            | TagAction::BlockTagLabel(_) => true,
            TagAction::InlineWhitespace
            | TagAction::InlineNoWhitespace
            | TagAction::Font
            | TagAction::InlineTagLabel(_) => false,
            TagAction::Markup { is_block_level } => *is_block_level,
            TagAction::Chained(first, second) => {
                first.changes_tag_level() || second.changes_tag_level()
            }
            TagAction::Custom(action) => action.changes_tag_level(),
        }
    }
}

fn attr<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(attr_name, _)| attr_name.eq_ignore_ascii_case(name))
        .map(|(_, value)| value.as_str())
}

/// Parses a `size` attribute. Plain digits are an absolute size; a leading
/// `+` or `-` is relative to the nearest enclosing size, base 3 when there
/// is none.
fn parse_font_size(value: &str, stack: &[Option<i32>]) -> Option<i32> {
    let caps = PAT_FONT_SIZE.captures(value)?;
    let digits: i32 = caps[2].parse().ok()?;
    match &caps[1] {
        "" => Some(digits),
        sign => {
            let prev = stack.iter().rev().find_map(|size| *size).unwrap_or(3);
            if sign == "+" {
                Some(prev + digits)
            } else {
                Some(prev - digits)
            }
        }
    }
}

/// Case-insensitive lookup table from tag name to [`TagAction`]. Keys are
/// stored upper-cased.
pub type TagActionMap = FxHashMap<String, TagAction>;

/// The stock tag table: ignorable containers, the anchor and body elements,
/// the usual inline elements, and font-size tracking.
pub fn default_tag_action_map() -> TagActionMap {
    let mut map = TagActionMap::default();
    for tag in ["STYLE", "SCRIPT", "OPTION", "OBJECT", "EMBED", "APPLET", "NOSCRIPT"] {
        map.insert(tag.to_string(), TagAction::IgnorableElement);
    }
    map.insert("A".to_string(), TagAction::AnchorText);
    map.insert("BODY".to_string(), TagAction::Body);
    for tag in [
        "STRIKE", "U", "B", "I", "EM", "STRONG", "SPAN", "SUP", "CODE", "TT", "SUB", "VAR",
    ] {
        map.insert(tag.to_string(), TagAction::InlineNoWhitespace);
    }
    for tag in ["ABBR", "ACRONYM"] {
        map.insert(tag.to_string(), TagAction::InlineWhitespace);
    }
    map.insert("FONT".to_string(), TagAction::Font);
    map
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn font_size_absolute() {
        assert_eq!(parse_font_size("4", &[]), Some(4));
        assert_eq!(parse_font_size("12pt", &[]), Some(12));
        assert_eq!(parse_font_size("x-large", &[]), None);
    }

    #[test]
    fn font_size_relative_uses_nearest_enclosing_size() {
        assert_eq!(parse_font_size("+1", &[]), Some(4));
        assert_eq!(parse_font_size("-2", &[]), Some(1));
        assert_eq!(parse_font_size("+2", &[Some(5)]), Some(7));
        assert_eq!(parse_font_size("+1", &[Some(5), None]), Some(6));
    }

    #[test]
    fn conditional_label_action_checks_its_predicate() {
        let mut block = TextBlock::of_text("short".to_string());
        let action =
            LabelAction::conditional(|block| block.num_words() > 3, vec!["long".to_string()]);
        action.add_to(&mut block);
        assert!(!block.has_label("long"));

        let unconditional = LabelAction::new(vec!["always".to_string()]);
        unconditional.add_to(&mut block);
        assert!(block.has_label("always"));
    }

    #[test]
    fn default_map_covers_the_ignorable_containers() {
        let map = default_tag_action_map();
        for tag in ["STYLE", "SCRIPT", "OPTION", "NOSCRIPT"] {
            assert!(matches!(map.get(tag), Some(TagAction::IgnorableElement)));
        }
        assert!(matches!(map.get("A"), Some(TagAction::AnchorText)));
        assert!(map.get("DIV").is_none());
    }

    #[test]
    fn chained_actions_or_their_tag_level_effect() {
        let chained = TagAction::Chained(
            Box::new(TagAction::InlineNoWhitespace),
            Box::new(TagAction::BlockLevel),
        );
        assert!(chained.changes_tag_level());
    }
}
