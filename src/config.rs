//! Application configuration.
//!
//! [`AppConfig`] is built in code with its builder methods or read from a
//! RON file. Every field has a default, so a file only needs the values it
//! changes:
//!
//! ```ron
//! (
//!     title: "Terrasphere",
//!     rebirth_texture: "/srv/textures/earth-burning.jpg",
//!     timings: (fade_delay: 3.0),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Name of the config file looked up in the working directory.
pub const CONFIG_FILE: &str = "terrasphere.ron";

/// Errors that can occur when loading or saving configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read config: {0}")]
    Read(#[source] std::io::Error),

    /// Failed to parse RON content.
    #[error("failed to parse config: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),
}

/// Durations, in seconds, of every scripted animation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timings {
    /// Entry animation: the globe growing in at startup.
    pub intro: f32,
    /// Color tween started by each pointer move while dragging.
    pub drag: f32,
    /// Outgoing globe shrinking away.
    pub shrink: f32,
    /// Explore globe growing back in.
    pub grow: f32,
    /// One cycle of the create globe's spin.
    pub spin_period: f32,
    /// Full turns per spin cycle.
    pub spin_turns: f32,
    /// Create globe turning red.
    pub redden: f32,
    /// Wait before the create globe starts fading out.
    pub fade_delay: f32,
    /// Create globe fading out.
    pub fade: f32,
    /// Rebirth globe fading in.
    pub rebirth_fade: f32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            intro: 1.0,
            drag: 0.5,
            shrink: 1.0,
            grow: 1.0,
            spin_period: 7.0,
            spin_turns: 25.0,
            redden: 5.0,
            fade_delay: 5.0,
            fade: 2.0,
            rebirth_fade: 1.0,
        }
    }
}

/// Configuration for the app window and the globe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Image wrapped around the globe by both transitions. URL or path.
    pub surface_texture: String,
    /// Image of the globe that fades in at the end of the create transition.
    pub rebirth_texture: String,
    /// Camera distance from the globe, restored by every transition.
    pub camera_distance: f32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Orbit auto-rotation; `1.0` is one orbit per minute, `0.0` stops it.
    pub auto_rotate_speed: f32,
    /// Orbit damping factor, `0.0` disables damping.
    pub damping: f32,
    /// Ignore transition triggers while one is already playing.
    pub serialize_transitions: bool,
    pub timings: Timings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: "Terrasphere".to_string(),
            width: 1280,
            height: 720,
            surface_texture: "https://threejs.org/examples/textures/land_ocean_ice_cloud_2048.jpg"
                .to_string(),
            rebirth_texture: "./assets/earth-burning.jpg".to_string(),
            camera_distance: 20.0,
            fov: 45.0,
            auto_rotate_speed: 5.0,
            damping: 0.05,
            serialize_transitions: true,
            timings: Timings::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn surface_texture(mut self, source: impl Into<String>) -> Self {
        self.surface_texture = source.into();
        self
    }

    pub fn rebirth_texture(mut self, source: impl Into<String>) -> Self {
        self.rebirth_texture = source.into();
        self
    }

    pub fn camera_distance(mut self, distance: f32) -> Self {
        self.camera_distance = distance;
        self
    }

    pub fn serialize_transitions(mut self, serialize: bool) -> Self {
        self.serialize_transitions = serialize;
        self
    }

    pub fn timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// Parse a RON document. Missing fields take their defaults.
    pub fn from_ron_str(ron_str: &str) -> Result<Self, ConfigError> {
        ron::from_str(ron_str).map_err(ConfigError::Parse)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        let pretty = ron::ser::PrettyConfig::new().depth_limit(2);
        ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)
    }

    /// Read a RON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Read)?;
        let config = Self::from_ron_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let config = AppConfig::default();
        assert_eq!(config.camera_distance, 20.0);
        assert_eq!(config.fov, 45.0);
        assert_eq!(config.auto_rotate_speed, 5.0);
        assert!(config.serialize_transitions);
        assert_eq!(config.rebirth_texture, "./assets/earth-burning.jpg");
        assert_eq!(config.timings.shrink, 1.0);
        assert_eq!(config.timings.fade_delay, 5.0);
    }

    #[test]
    fn ron_round_trip() {
        let config = AppConfig::new()
            .title("Test")
            .size(640, 480)
            .serialize_transitions(false);
        let ron_str = config.to_ron_string().unwrap();
        assert_eq!(AppConfig::from_ron_str(&ron_str).unwrap(), config);
    }

    #[test]
    fn partial_document_uses_defaults() {
        let config =
            AppConfig::from_ron_str("(title: \"Partial\", timings: (fade: 4.5))").unwrap();
        assert_eq!(config.title, "Partial");
        assert_eq!(config.width, 1280);
        assert_eq!(config.timings.fade, 4.5);
        assert_eq!(config.timings.redden, 5.0);
    }

    #[test]
    fn invalid_ron_is_a_parse_error() {
        let result = AppConfig::from_ron_str("{{not valid}}");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let result = AppConfig::load(Path::new("no/such/terrasphere.ron"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }
}
