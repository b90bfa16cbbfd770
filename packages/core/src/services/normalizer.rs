//! LLM response normalization
//!
//! Turns the raw text of a chat completion into an ordered list of [`Idea`]s.
//! Normalization never fails; it degrades through three strategies and the
//! first one that succeeds wins:
//!
//! 1. [`ParseStrategy::JsonArray`]: the whole text is a JSON array
//! 2. [`ParseStrategy::EmbeddedArray`]: the text between the first `[` and the
//!    last `]` (inclusive) is a JSON array
//! 3. [`ParseStrategy::Lines`]: every non-blank line is one idea
//!
//! An array is accepted only when every element is an object or a string.
//! Object elements go through an ordered list of field extractors (`idea`,
//! `content`, `text`, `description`); string elements are the idea content.
//! An object with none of those fields produces no idea, so the result can
//! be shorter than the array. Older handlers emitted a placeholder idea
//! (`"<nil>"`) for such objects; that placeholder is not reproduced.
//! Every idea gets [`DEFAULT_IDEA_CONFIDENCE`].
//!
//! # Examples
//!
//! ```rust
//! use ideagraph_core::services::{ParseStrategy, ResponseNormalizer};
//!
//! let normalizer = ResponseNormalizer::default();
//! let result = normalizer.normalize_detailed(r#"Sure! [{"idea": "Solar"}, {"text": "Wind"}]"#, 5);
//! assert_eq!(result.strategy, ParseStrategy::EmbeddedArray);
//! assert_eq!(result.ideas.len(), 2);
//! ```

use crate::models::{Idea, DEFAULT_IDEA_CONFIDENCE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Fields probed on object elements, in priority order
pub const DEFAULT_IDEA_FIELDS: [&str; 4] = ["idea", "content", "text", "description"];

/// Which strategy produced the ideas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStrategy {
    JsonArray,
    EmbeddedArray,
    Lines,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub ideas: Vec<Idea>,
    pub strategy: ParseStrategy,
}

/// Reads idea content from one named field of a JSON object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldExtractor {
    field: String,
}

impl FieldExtractor {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Strings are taken as-is, numbers and booleans are stringified,
    /// anything else (absent, null, nested) yields nothing.
    pub fn extract(&self, object: &Map<String, Value>) -> Option<String> {
        match object.get(&self.field)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// Three-tier fallback parser for LLM output
#[derive(Debug, Clone)]
pub struct ResponseNormalizer {
    extractors: Vec<FieldExtractor>,
}

impl Default for ResponseNormalizer {
    fn default() -> Self {
        Self::with_fields(DEFAULT_IDEA_FIELDS)
    }
}

impl ResponseNormalizer {
    /// Use a custom ordered field list for object elements
    pub fn with_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extractors: fields.into_iter().map(FieldExtractor::new).collect(),
        }
    }

    /// Normalize `raw` into ideas
    ///
    /// `requested_count` is a sizing hint only; no strategy truncates or pads.
    pub fn normalize(&self, raw: &str, requested_count: usize) -> Vec<Idea> {
        self.normalize_detailed(raw, requested_count).ideas
    }

    /// Same as [`normalize`](Self::normalize), also reporting the strategy used
    pub fn normalize_detailed(&self, raw: &str, requested_count: usize) -> Normalization {
        let (ideas, strategy) = if let Some(ideas) = self.parse_array(raw) {
            (ideas, ParseStrategy::JsonArray)
        } else if let Some(ideas) = embedded_array(raw).and_then(|slice| self.parse_array(slice)) {
            (ideas, ParseStrategy::EmbeddedArray)
        } else {
            (split_lines(raw, requested_count), ParseStrategy::Lines)
        };

        debug!(
            strategy = ?strategy,
            ideas = ideas.len(),
            requested = requested_count,
            "normalized LLM response"
        );

        Normalization { ideas, strategy }
    }

    /// Parse `text` as an array of objects and/or strings
    ///
    /// `None` when the text is not such an array. Objects without any
    /// recognized field are skipped.
    fn parse_array(&self, text: &str) -> Option<Vec<Idea>> {
        let elements: Vec<Value> = serde_json::from_str(text.trim()).ok()?;

        if !elements
            .iter()
            .all(|v| matches!(v, Value::Object(_) | Value::String(_)))
        {
            return None;
        }

        let ideas = elements
            .iter()
            .filter_map(|element| match element {
                Value::String(s) => Some(s.clone()),
                Value::Object(object) => self.extract_content(object),
                _ => None,
            })
            .map(Idea::new)
            .collect();

        Some(ideas)
    }

    fn extract_content(&self, object: &Map<String, Value>) -> Option<String> {
        self.extractors.iter().find_map(|e| e.extract(object))
    }
}

/// Slice from the first `[` through the last `]`, if both exist in order
fn embedded_array(raw: &str) -> Option<&str> {
    let start = raw.find('[')?;
    let end = raw.rfind(']')?;
    (end > start).then(|| &raw[start..=end])
}

fn split_lines(raw: &str, requested_count: usize) -> Vec<Idea> {
    let mut ideas = Vec::with_capacity(requested_count);
    ideas.extend(
        raw.lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| Idea {
                content: line.to_string(),
                confidence: DEFAULT_IDEA_CONFIDENCE,
            }),
    );
    ideas
}
