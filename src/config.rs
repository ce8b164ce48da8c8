//! Pipeline configuration
//!
//! Loaded from an optional YAML file, then overridden from the environment.
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```yaml
//! ai:
//!   model: gemini-2.5-flash
//!   timeout_seconds: 60
//! retry:
//!   max_retries: 2
//!   base_delay_ms: 800
//! layout:
//!   node_width: 180
//! viewport:
//!   zoom_factor: 1.1
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;
use viewport::{SurfaceSize, ViewportConfig};

use crate::ai::retry::RetryPolicy;
use crate::ai::AiConfig;
use crate::error::{MindMapError, MindMapResult};
use crate::graph::LayoutConfig;

/// Viewport settings not derived from the layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSettings {
    /// Margin around fitted content; one vertical gap unless overridden
    pub spacing: Option<f64>,
    pub zoom_factor: f64,
    pub surface_width: f64,
    pub surface_height: f64,
}

impl Default for ViewportSettings {
    fn default() -> Self {
        Self {
            spacing: None,
            zoom_factor: 1.1,
            surface_width: 1000.0,
            surface_height: 800.0,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MindMapConfig {
    pub ai: AiConfig,
    pub retry: RetryPolicy,
    pub layout: LayoutConfig,
    pub viewport: ViewportSettings,
}

impl MindMapConfig {
    /// Parse YAML configuration text
    pub fn from_yaml_str(yaml: &str) -> MindMapResult<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(|e| MindMapError::Config(e.to_string()))
    }

    /// Load from a YAML file
    pub fn from_yaml_file(path: &Path) -> MindMapResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| MindMapError::ReadFailure {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        debug!("Loaded configuration from {}", path.display());
        Self::from_yaml_str(&text)
    }

    /// File (when given) plus environment overrides
    pub fn load(path: Option<&Path>) -> MindMapResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_yaml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `GEMINI_API_KEY`, `MINDMAP_MODEL` and `MINDMAP_TIMEOUT_SECONDS`
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> MindMapResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.ai.api_key = key;
        }
        if let Some(model) = lookup("MINDMAP_MODEL") {
            self.ai.model = model;
        }
        if let Some(timeout) = lookup("MINDMAP_TIMEOUT_SECONDS") {
            self.ai.timeout_seconds = timeout.trim().parse().map_err(|_| {
                MindMapError::Config(format!("MINDMAP_TIMEOUT_SECONDS is not a number: {timeout}"))
            })?;
        }
        Ok(())
    }

    /// Viewport configuration consistent with the layout's node box size
    pub fn viewport_config(&self) -> ViewportConfig {
        ViewportConfig {
            node_width: self.layout.node_width,
            node_height: self.layout.node_height,
            spacing: self.viewport.spacing.unwrap_or(self.layout.vertical_gap),
            zoom_factor: self.viewport.zoom_factor,
        }
    }

    pub fn surface_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.viewport.surface_width, self.viewport.surface_height)
    }
}
