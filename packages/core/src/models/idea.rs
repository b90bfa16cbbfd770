use serde::{Deserialize, Serialize};

/// Confidence assigned to every normalized idea.
///
/// Not derived from model output.
pub const DEFAULT_IDEA_CONFIDENCE: f64 = 0.7;

/// Transient LLM-generated idea; becomes a `Node` once materialized
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub content: String,
    pub confidence: f64,
}

impl Idea {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            confidence: DEFAULT_IDEA_CONFIDENCE,
        }
    }
}
