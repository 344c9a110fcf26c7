//! Viewer configuration
//!
//! Configuration can be built programmatically, read from `PAGEFLOW_*`
//! environment variables, or loaded from a JSON file. Missing keys fall back
//! to the defaults.

use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::{ScrollMode, SpreadMode};
use crate::scale::ScaleValue;

/// Minimum number of page views kept realized
pub const DEFAULT_CACHE_SIZE: usize = 10;

/// Largest surface a page may allocate, in device pixels (8192 x 4096)
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 33_554_432;

pub const DEFAULT_THUMBNAIL_WIDTH: u32 = 98;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Lower bound for the view buffer capacity
    pub cache_size: usize,
    /// Idle time before an `Idle` event, in milliseconds
    pub cleanup_timeout_ms: u64,
    /// Surface pixel cap; 0 disables the cap
    pub max_surface_pixels: u64,
    /// Device pixels per CSS pixel
    pub output_scale: f64,
    /// Space between pages in CSS pixels
    pub page_gap: f64,
    pub scroll_mode: ScrollMode,
    pub spread_mode: SpreadMode,
    /// Right-to-left page order
    pub rtl: bool,
    pub thumbnails_enabled: bool,
    pub thumbnail_width: u32,
    /// Settle delay after a zoom gesture before pages are redrawn
    pub zoom_drawing_delay_ms: u64,
    /// Scale applied when a document is opened
    pub default_scale: ScaleValue,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            cache_size: DEFAULT_CACHE_SIZE,
            cleanup_timeout_ms: 30_000,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
            output_scale: 1.0,
            page_gap: 10.0,
            scroll_mode: ScrollMode::Vertical,
            spread_mode: SpreadMode::None,
            rtl: false,
            thumbnails_enabled: false,
            thumbnail_width: DEFAULT_THUMBNAIL_WIDTH,
            zoom_drawing_delay_ms: 400,
            default_scale: ScaleValue::default(),
        }
    }
}

impl ViewerConfig {
    pub fn with_cache_size(mut self, cache_size: usize) -> Self {
        self.cache_size = cache_size;
        self
    }

    pub fn with_cleanup_timeout(mut self, timeout: Duration) -> Self {
        self.cleanup_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_surface_pixels(mut self, pixels: u64) -> Self {
        self.max_surface_pixels = pixels;
        self
    }

    pub fn with_output_scale(mut self, output_scale: f64) -> Self {
        self.output_scale = output_scale;
        self
    }

    pub fn with_page_gap(mut self, gap: f64) -> Self {
        self.page_gap = gap;
        self
    }

    pub fn with_scroll_mode(mut self, mode: ScrollMode) -> Self {
        self.scroll_mode = mode;
        self
    }

    pub fn with_spread_mode(mut self, mode: SpreadMode) -> Self {
        self.spread_mode = mode;
        self
    }

    pub fn with_rtl(mut self, rtl: bool) -> Self {
        self.rtl = rtl;
        self
    }

    pub fn with_thumbnails(mut self, enabled: bool) -> Self {
        self.thumbnails_enabled = enabled;
        self
    }

    pub fn with_zoom_drawing_delay(mut self, delay: Duration) -> Self {
        self.zoom_drawing_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_default_scale(mut self, scale: ScaleValue) -> Self {
        self.default_scale = scale;
        self
    }

    pub fn cleanup_timeout(&self) -> Duration {
        Duration::from_millis(self.cleanup_timeout_ms)
    }

    pub fn zoom_drawing_delay(&self) -> Duration {
        Duration::from_millis(self.zoom_drawing_delay_ms)
    }

    /// Loads configuration from environment variables on top of the defaults.
    ///
    /// Environment variables:
    /// - `PAGEFLOW_CACHE_SIZE`: minimum view buffer capacity (default: 10)
    /// - `PAGEFLOW_CLEANUP_TIMEOUT_MS`: idle timeout (default: 30000)
    /// - `PAGEFLOW_MAX_SURFACE_PIXELS`: surface pixel cap (default: 33554432)
    /// - `PAGEFLOW_OUTPUT_SCALE`: device pixel ratio (default: 1.0)
    /// - `PAGEFLOW_SCROLL_MODE`: vertical, horizontal, wrapped or page
    /// - `PAGEFLOW_SPREAD_MODE`: none, odd or even
    /// - `PAGEFLOW_THUMBNAILS`: true or false
    /// - `PAGEFLOW_ZOOM_DELAY_MS`: zoom settle delay (default: 400)
    /// - `PAGEFLOW_DEFAULT_SCALE`: a preset name or a number
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(value) = env_value("PAGEFLOW_CACHE_SIZE")? {
            config.cache_size = value;
        }
        if let Some(value) = env_value("PAGEFLOW_CLEANUP_TIMEOUT_MS")? {
            config.cleanup_timeout_ms = value;
        }
        if let Some(value) = env_value("PAGEFLOW_MAX_SURFACE_PIXELS")? {
            config.max_surface_pixels = value;
        }
        if let Some(value) = env_value("PAGEFLOW_OUTPUT_SCALE")? {
            config.output_scale = value;
        }
        if let Some(value) = env_value("PAGEFLOW_SCROLL_MODE")? {
            config.scroll_mode = value;
        }
        if let Some(value) = env_value("PAGEFLOW_SPREAD_MODE")? {
            config.spread_mode = value;
        }
        if let Some(value) = env_value("PAGEFLOW_THUMBNAILS")? {
            config.thumbnails_enabled = value;
        }
        if let Some(value) = env_value("PAGEFLOW_ZOOM_DELAY_MS")? {
            config.zoom_drawing_delay_ms = value;
        }
        if let Some(value) = env_value("PAGEFLOW_DEFAULT_SCALE")? {
            config.default_scale = value;
        }

        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_json(&contents)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to a JSON file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_size == 0 {
            return Err(ConfigError::InvalidValue("cache_size".to_string()));
        }
        if !self.output_scale.is_finite() || self.output_scale <= 0.0 {
            return Err(ConfigError::InvalidValue("output_scale".to_string()));
        }
        if !self.page_gap.is_finite() || self.page_gap < 0.0 {
            return Err(ConfigError::InvalidValue("page_gap".to_string()));
        }
        if self.thumbnail_width == 0 {
            return Err(ConfigError::InvalidValue("thumbnail_width".to_string()));
        }
        Ok(())
    }
}

fn env_value<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScalePreset;
    use serial_test::serial;
    use std::env;

    const ENV_KEYS: &[&str] = &[
        "PAGEFLOW_CACHE_SIZE",
        "PAGEFLOW_CLEANUP_TIMEOUT_MS",
        "PAGEFLOW_MAX_SURFACE_PIXELS",
        "PAGEFLOW_OUTPUT_SCALE",
        "PAGEFLOW_SCROLL_MODE",
        "PAGEFLOW_SPREAD_MODE",
        "PAGEFLOW_THUMBNAILS",
        "PAGEFLOW_ZOOM_DELAY_MS",
        "PAGEFLOW_DEFAULT_SCALE",
    ];

    #[test]
    fn test_default_config() {
        let config = ViewerConfig::default();
        assert_eq!(config.cache_size, 10);
        assert_eq!(config.cleanup_timeout(), Duration::from_secs(30));
        assert_eq!(config.max_surface_pixels, 33_554_432);
        assert_eq!(config.zoom_drawing_delay(), Duration::from_millis(400));
        assert_eq!(config.default_scale, ScaleValue::Preset(ScalePreset::Auto));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = ViewerConfig::default()
            .with_cache_size(4)
            .with_output_scale(2.0)
            .with_scroll_mode(ScrollMode::Wrapped)
            .with_spread_mode(SpreadMode::Odd)
            .with_thumbnails(true)
            .with_default_scale(ScaleValue::Value(1.5));

        assert_eq!(config.cache_size, 4);
        assert_eq!(config.output_scale, 2.0);
        assert_eq!(config.scroll_mode, ScrollMode::Wrapped);
        assert_eq!(config.spread_mode, SpreadMode::Odd);
        assert!(config.thumbnails_enabled);
        assert_eq!(config.default_scale, ScaleValue::Value(1.5));
    }

    #[test]
    fn test_huge_durations_saturate() {
        let config = ViewerConfig::default()
            .with_cleanup_timeout(Duration::MAX)
            .with_zoom_drawing_delay(Duration::from_secs(u64::MAX));
        assert_eq!(config.cleanup_timeout_ms, u64::MAX);
        assert_eq!(config.zoom_drawing_delay_ms, u64::MAX);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(ViewerConfig::default().with_cache_size(0).validate().is_err());
        assert!(ViewerConfig::default().with_output_scale(0.0).validate().is_err());
        assert!(ViewerConfig::default().with_page_gap(-1.0).validate().is_err());
    }

    #[test]
    fn test_json_partial_uses_defaults() {
        let config =
            ViewerConfig::from_json(r#"{ "cache_size": 6, "scroll_mode": "horizontal" }"#).unwrap();
        assert_eq!(config.cache_size, 6);
        assert_eq!(config.scroll_mode, ScrollMode::Horizontal);
        assert_eq!(config.thumbnail_width, DEFAULT_THUMBNAIL_WIDTH);
    }

    #[test]
    fn test_json_errors() {
        assert!(matches!(
            ViewerConfig::from_json("{ not json"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            ViewerConfig::from_json(r#"{ "cache_size": 0 }"#),
            Err(ConfigError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");

        let config = ViewerConfig::default()
            .with_spread_mode(SpreadMode::Even)
            .with_default_scale(ScaleValue::Preset(ScalePreset::PageWidth));
        config.save_to_file(&path).unwrap();

        let loaded = ViewerConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ViewerConfig::from_file(dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    #[serial]
    fn test_from_env() {
        let _guard = EnvGuard::new(ENV_KEYS);
        for key in ENV_KEYS {
            env::remove_var(key);
        }

        env::set_var("PAGEFLOW_CACHE_SIZE", "16");
        env::set_var("PAGEFLOW_SCROLL_MODE", "wrapped");
        env::set_var("PAGEFLOW_THUMBNAILS", "true");
        env::set_var("PAGEFLOW_DEFAULT_SCALE", "page-fit");

        let config = ViewerConfig::from_env().unwrap();
        assert_eq!(config.cache_size, 16);
        assert_eq!(config.scroll_mode, ScrollMode::Wrapped);
        assert!(config.thumbnails_enabled);
        assert_eq!(config.default_scale, ScaleValue::Preset(ScalePreset::PageFit));
        assert_eq!(config.spread_mode, SpreadMode::None);
    }

    #[test]
    #[serial]
    fn test_from_env_invalid() {
        let _guard = EnvGuard::new(ENV_KEYS);
        for key in ENV_KEYS {
            env::remove_var(key);
        }

        env::set_var("PAGEFLOW_OUTPUT_SCALE", "sharp");
        let result = ViewerConfig::from_env();
        assert!(matches!(result, Err(ConfigError::InvalidValue(key)) if key == "PAGEFLOW_OUTPUT_SCALE"));
    }

    // Restores environment variables when dropped
    struct EnvGuard {
        vars: Vec<(String, Option<String>)>,
    }

    impl EnvGuard {
        fn new(names: &[&str]) -> Self {
            let vars = names
                .iter()
                .map(|name| (name.to_string(), env::var(name).ok()))
                .collect();
            Self { vars }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.vars {
                match value {
                    Some(v) => env::set_var(name, v),
                    None => env::remove_var(name),
                }
            }
        }
    }
}
