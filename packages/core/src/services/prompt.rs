//! Prompt templates for idea generation

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationType {
    #[default]
    New,
    Expand,
    Improve,
    Branch,
}

impl GenerationType {
    /// Parse a type name; anything unrecognized is `New`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "expand" => Self::Expand,
            "improve" => Self::Improve,
            "branch" => Self::Branch,
            _ => Self::New,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Expand => "expand",
            Self::Improve => "improve",
            Self::Branch => "branch",
        }
    }

    /// Render the user prompt for this generation type
    pub fn render_prompt(&self, topic: &str, context: &str, count: usize) -> String {
        match self {
            Self::New => format!(
                "Generate {} creative ideas about: {}. Context: {}",
                count, topic, context
            ),
            Self::Expand => format!(
                "Generate {} detailed sub-ideas that expand on this concept: {}. Context: {}",
                count, topic, context
            ),
            Self::Improve => format!(
                "Improve and refine this idea in {} different ways: {}. Context: {}",
                count, topic, context
            ),
            Self::Branch => format!(
                "Generate {} alternative approaches or directions for this concept: {}. Context: {}",
                count, topic, context
            ),
        }
    }
}

impl From<&str> for GenerationType {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for GenerationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
