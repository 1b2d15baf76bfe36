//! Viewer configuration.
//!
//! A [`ViewerConfig`] bundles the layout geometry, the initial track stack
//! and the timing knobs. It can be read from a JSON file; any field left
//! out takes the value of the preset it is merged into.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::layout::LayoutSettings;
use crate::tracks::{TrackError, TrackRegistry, TrackSpec};
use crate::viewport::ViewportOptions;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Invalid track configuration: {0}")]
    Track(#[from] TrackError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub layout: LayoutSettings,
    pub tracks: Vec<TrackSpec>,
    pub persistence_interval_ms: u64,
    pub safety_redraw_ms: u64,
    /// Event poll timeout of the terminal host.
    pub tick_ms: u64,
    pub caret_track: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::canvas()
    }
}

impl ViewerConfig {
    /// Pixel geometry.
    pub fn canvas() -> Self {
        Self {
            layout: LayoutSettings::default(),
            tracks: TrackSpec::canvas_defaults(),
            persistence_interval_ms: 250,
            safety_redraw_ms: 10,
            tick_ms: 50,
            caret_track: "dna".to_string(),
        }
    }

    /// Character-cell geometry.
    pub fn terminal() -> Self {
        Self {
            layout: LayoutSettings::terminal(),
            tracks: TrackSpec::terminal_defaults(),
            ..Self::canvas()
        }
    }

    /// Reads a JSON config. Top-level fields missing from the file keep the
    /// terminal preset values.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> ConfigResult<Self> {
        let mut value: serde_json::Value = serde_json::from_str(text)?;
        let preset = serde_json::to_value(Self::terminal())?;
        if let (Some(fields), serde_json::Value::Object(defaults)) = (value.as_object_mut(), preset) {
            for (key, default) in defaults {
                fields.entry(key).or_insert(default);
            }
        }
        let config: Self = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.tracks.is_empty() {
            return Err(ConfigError::Invalid("at least one track is required".to_string()));
        }
        if !self.tracks.iter().any(|t| t.name == self.caret_track) {
            return Err(ConfigError::Invalid(format!(
                "caret track '{}' is not configured",
                self.caret_track
            )));
        }
        if self.tick_ms == 0 {
            return Err(ConfigError::Invalid("tick_ms must be positive".to_string()));
        }
        Ok(())
    }

    /// Instantiates the configured tracks in order.
    pub fn registry(&self) -> ConfigResult<TrackRegistry> {
        Ok(TrackRegistry::from_specs(&self.tracks)?)
    }

    pub fn viewport_options(&self) -> ViewportOptions {
        ViewportOptions {
            layout: self.layout.clone(),
            caret_track: self.caret_track.clone(),
            persistence_interval: Duration::from_millis(self.persistence_interval_ms),
            safety_redraw: Duration::from_millis(self.safety_redraw_ms),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::tracks::TrackKind;

    #[test]
    fn test_presets() {
        let canvas = ViewerConfig::canvas();
        assert_eq!(canvas.layout.canvas_width, 1138.0);
        assert_eq!(canvas.layout.gutter_width, 30.0);
        assert_eq!(canvas.tracks.len(), 10);
        assert!(canvas.validate().is_ok());

        let terminal = ViewerConfig::terminal();
        assert_eq!(terminal.layout.base_width, 1.0);
        assert_eq!(terminal.tick(), Duration::from_millis(50));
        assert_eq!(terminal.viewport_options().persistence_interval, Duration::from_millis(250));
        assert_eq!(terminal.registry().unwrap().len(), 10);
    }

    #[test]
    fn test_partial_json_keeps_preset() {
        let config = ViewerConfig::from_json(r#"{"tick_ms": 20, "layout": {"bases_per_block": 5}}"#).unwrap();
        assert_eq!(config.tick_ms, 20);
        assert_eq!(config.layout.bases_per_block, 5);
        // Nested objects fall back to serde defaults
        assert_eq!(config.layout.base_width, 10.0);
        assert_eq!(config.tracks, TrackSpec::terminal_defaults());
        assert_eq!(config.caret_track, "dna");
    }

    #[test]
    fn test_custom_tracks() {
        let json = r#"{
            "caret_track": "seq",
            "tracks": [
                {"name": "ruler", "kind": "position", "options": {"height": 1}},
                {"name": "seq", "kind": "bases", "options": {"height": 1, "show_selection": true}}
            ]
        }"#;
        let config = ViewerConfig::from_json(json).unwrap();
        assert_eq!(config.tracks[1].kind, TrackKind::Bases);
        let registry = config.registry().unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["ruler", "seq"]);
    }

    #[test]
    fn test_invalid_configs() {
        assert!(matches!(
            ViewerConfig::from_json(r#"{"caret_track": "nope"}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json(r#"{"tracks": []}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(ViewerConfig::from_json("{"), Err(ConfigError::Parse(_))));

        let json = r#"{"caret_track": "a", "tracks": [
            {"name": "a", "kind": "bases"}, {"name": "a", "kind": "blank"}
        ]}"#;
        let config = ViewerConfig::from_json(json).unwrap();
        assert!(matches!(config.registry(), Err(ConfigError::Track(TrackError::Duplicate(_)))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"safety_redraw_ms": 5}}"#).unwrap();
        let config = ViewerConfig::load(file.path()).unwrap();
        assert_eq!(config.viewport_options().safety_redraw, Duration::from_millis(5));

        assert!(matches!(
            ViewerConfig::load(Path::new("/nonexistent/seqcanvas.json")),
            Err(ConfigError::Io { .. })
        ));
    }
}
