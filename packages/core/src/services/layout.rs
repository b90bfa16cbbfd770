//! Geometric placement of newly generated nodes around an anchor point.
//!
//! Offsets use integer division (`count / 2`, `columns / 2`,
//! `count / (2 * columns)`), so odd and even counts center slightly
//! differently. Radial layout with a single point puts it on the circle at
//! angle 0, not on the anchor.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

pub const RADIAL_RADIUS: f64 = 200.0;
pub const HORIZONTAL_SPACING: f64 = 250.0;
pub const VERTICAL_SPACING: f64 = 150.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutStrategy {
    Radial,
    Horizontal,
    Vertical,
    #[default]
    Grid,
}

impl LayoutStrategy {
    /// Parse a strategy name; anything unrecognized is `Grid`
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "radial" => Self::Radial,
            "horizontal" => Self::Horizontal,
            "vertical" => Self::Vertical,
            _ => Self::Grid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Radial => "radial",
            Self::Horizontal => "horizontal",
            Self::Vertical => "vertical",
            Self::Grid => "grid",
        }
    }
}

impl From<&str> for LayoutStrategy {
    fn from(name: &str) -> Self {
        Self::parse(name)
    }
}

impl fmt::Display for LayoutStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// Computes node coordinates for a batch of new nodes
#[derive(Debug, Clone, Copy, Default)]
pub struct LayoutEngine;

impl LayoutEngine {
    /// Returns exactly `count` positions (empty for `count == 0`)
    pub fn compute_positions(
        &self,
        anchor_x: f64,
        anchor_y: f64,
        count: usize,
        strategy: LayoutStrategy,
    ) -> Vec<Position> {
        if count == 0 {
            return Vec::new();
        }

        let n = count as i64;

        match strategy {
            LayoutStrategy::Radial => {
                let step = 2.0 * PI / count as f64;
                (0..count)
                    .map(|i| {
                        let angle = i as f64 * step;
                        Position {
                            x: anchor_x + RADIAL_RADIUS * angle.cos(),
                            y: anchor_y + RADIAL_RADIUS * angle.sin(),
                        }
                    })
                    .collect()
            }
            LayoutStrategy::Horizontal => (0..n)
                .map(|i| Position {
                    x: anchor_x + (i - n / 2) as f64 * HORIZONTAL_SPACING,
                    y: anchor_y,
                })
                .collect(),
            LayoutStrategy::Vertical => (0..n)
                .map(|i| Position {
                    x: anchor_x,
                    y: anchor_y + (i - n / 2) as f64 * VERTICAL_SPACING,
                })
                .collect(),
            LayoutStrategy::Grid => {
                let columns = (count as f64).sqrt().ceil() as i64;
                (0..n)
                    .map(|i| {
                        let row = i / columns;
                        let col = i % columns;
                        Position {
                            x: anchor_x + (col - columns / 2) as f64 * HORIZONTAL_SPACING,
                            y: anchor_y + (row - n / (2 * columns)) as f64 * VERTICAL_SPACING,
                        }
                    })
                    .collect()
            }
        }
    }
}
