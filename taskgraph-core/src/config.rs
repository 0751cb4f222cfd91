//! Configuration
//!
//! All tunables of the graph view live in [`GraphConfig`]. Every field has a
//! default, so hosts only need to supply what they want to change:
//!
//! ```rust,ignore
//! let config = GraphConfig::from_json(r#"{ "virtualization_threshold": 250 }"#)?;
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GraphError, Result};

/// Largest batch the position store accepts in one write.
pub const MAX_STORE_BATCH: usize = 500;

/// Direction in which ranks advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    /// Top to bottom: ranks map to y, order within a rank maps to x.
    #[default]
    #[serde(rename = "TB")]
    TopBottom,

    /// Left to right: ranks map to x, order within a rank maps to y.
    #[serde(rename = "LR")]
    LeftRight,
}

/// Options for the layered layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    pub direction: Direction,
    pub node_width: f64,
    pub node_height: f64,
    /// Gap between consecutive ranks.
    pub rank_separation: f64,
    /// Gap between neighbours within one rank.
    pub node_separation: f64,
    /// Agent cards are taller than task cards by this much.
    pub agent_extra_height: f64,
    /// Upper bound on barycenter sweeps during crossing reduction.
    pub max_crossing_passes: usize,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            direction: Direction::TopBottom,
            node_width: 220.0,
            node_height: 140.0,
            rank_separation: 80.0,
            node_separation: 40.0,
            agent_extra_height: 20.0,
            max_crossing_passes: 8,
        }
    }
}

/// Fixed rows used by the timeline view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineOptions {
    pub agent_row_y: f64,
    pub task_row_y: f64,
    pub column_width: f64,
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self {
            agent_row_y: 0.0,
            task_row_y: 300.0,
            column_width: 260.0,
        }
    }
}

/// Top-level configuration of one graph view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub layout: LayoutOptions,
    pub timeline: TimelineOptions,
    /// Horizontal distance between group buckets.
    pub group_spacing: f64,
    /// Node count above which rendering is virtualized.
    pub virtualization_threshold: usize,
    /// Quiet period after the last drag-stop before positions are flushed.
    pub debounce_ms: u64,
    /// Records per position write.
    pub max_batch_size: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            layout: LayoutOptions::default(),
            timeline: TimelineOptions::default(),
            group_spacing: 800.0,
            virtualization_threshold: 100,
            debounce_ms: 300,
            max_batch_size: MAX_STORE_BATCH,
        }
    }
}

impl GraphConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<()> {
        let layout = &self.layout;
        let sizes = [
            ("layout.node_width", layout.node_width),
            ("layout.node_height", layout.node_height),
            ("timeline.column_width", self.timeline.column_width),
        ];
        for (name, value) in sizes {
            if !(value.is_finite() && value > 0.0) {
                return Err(GraphError::Config(format!("{name} must be positive, got {value}")));
            }
        }

        let gaps = [
            ("layout.rank_separation", layout.rank_separation),
            ("layout.node_separation", layout.node_separation),
            ("layout.agent_extra_height", layout.agent_extra_height),
            ("group_spacing", self.group_spacing),
        ];
        for (name, value) in gaps {
            if !(value.is_finite() && value >= 0.0) {
                return Err(GraphError::Config(format!("{name} must be non-negative, got {value}")));
            }
        }

        if self.virtualization_threshold == 0 {
            return Err(GraphError::Config("virtualization_threshold must be at least 1".into()));
        }
        if !(1..=MAX_STORE_BATCH).contains(&self.max_batch_size) {
            return Err(GraphError::Config(format!(
                "max_batch_size must be within 1..={MAX_STORE_BATCH}, got {}",
                self.max_batch_size
            )));
        }
        Ok(())
    }
}
