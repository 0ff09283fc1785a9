use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{GraphError, Result};
use crate::layout::{ForceAtlas2Settings, GenericForceSettings};
use crate::model::{DEFAULT_EDGE_COLOR, DEFAULT_EDGE_SIZE, DEFAULT_NODE_COLOR, DEFAULT_NODE_SIZE};
use crate::radial::RadialAnalysisSetting;
use crate::selection::SearchMode;

/// Everything the surrounding application can tune. Every field has a
/// default, so a config file only needs the keys it overrides.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub style: StyleConfig,
    pub worker: WorkerConfig,
    pub force: GenericForceSettings,
    pub force_atlas2: ForceAtlas2Settings,
    pub radial: RadialAnalysisSetting,
    pub search_mode: SearchMode,
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&raw)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleKind {
    #[default]
    Linear,
    Log,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub default_node_color: String,
    pub default_node_size: f32,
    pub default_edge_color: String,
    pub default_edge_size: f32,
    /// Labels are drawn only for nodes at least this large on screen.
    pub label_size_threshold: f32,
    pub node_size_property: Option<String>,
    pub node_size_range: [f32; 2],
    pub node_size_scale: ScaleKind,
    pub node_color_property: Option<String>,
    pub node_color_ramp: [String; 2],
    /// Nodes whose attribute is truthy are painted `disease_color`, overriding the ramp.
    pub disease_property: Option<String>,
    pub disease_color: String,
    pub edge_size_range: [f32; 2],
    pub edge_color_ramp: [String; 2],
    /// Fixed score domain; derived from the loaded edges when unset.
    pub score_range: Option<[f32; 2]>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            default_node_color: DEFAULT_NODE_COLOR.to_owned(),
            default_node_size: DEFAULT_NODE_SIZE,
            default_edge_color: DEFAULT_EDGE_COLOR.to_owned(),
            default_edge_size: DEFAULT_EDGE_SIZE,
            label_size_threshold: 8.0,
            node_size_property: None,
            node_size_range: [3.0, 15.0],
            node_size_scale: ScaleKind::Linear,
            node_color_property: None,
            node_color_ramp: ["#3c96d7".to_owned(), "#f5503c".to_owned()],
            disease_property: None,
            disease_color: "#d6336c".to_owned(),
            edge_size_range: [0.5, 4.0],
            edge_color_ramp: ["#d9dde1".to_owned(), "#37474f".to_owned()],
            score_range: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub tick_interval_ms: u64,
    /// Wall-clock budget after which a running layout is paused; `0` disables it.
    pub auto_stop_after_secs: f32,
    /// Starting one layout kind kills the others.
    pub exclusive: bool,
    /// Frames buffered between a worker and the owner thread.
    pub frame_buffer: usize,
}

impl WorkerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// `None` for a disabled budget, and for one too large to represent.
    pub fn auto_stop_after(&self) -> Option<Duration> {
        if self.auto_stop_after_secs > 0.0 {
            Duration::try_from_secs_f32(self.auto_stop_after_secs).ok()
        } else {
            None
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            auto_stop_after_secs: 20.0,
            exclusive: false,
            frame_buffer: 2,
        }
    }
}
