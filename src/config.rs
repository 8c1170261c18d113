use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use anyhow::Result;

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub detector: DetectorConfig,
    pub ui: UiConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: String,
    pub score_threshold: f32,
    pub max_results: usize,
    pub intra_threads: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub window_title: String,
    pub box_color_hex: String,
    pub label_color_hex: String,
    pub label_scale: usize,
    pub font_family: String,
    pub font_size_pt: u32,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Frame rate used for the output file when the source cannot report one.
    pub fallback_fps: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: "models/efficientdet_lite0.onnx".to_string(),
            score_threshold: 0.3,
            max_results: 5,
            intra_threads: 4,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_title: "Spotter".to_string(),
            box_color_hex: "#00FF00".to_string(),
            label_color_hex: "#00FF00".to_string(),
            label_scale: 2,
            font_family: "Monospace".to_string(),
            font_size_pt: 12,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { fallback_fps: 30.0 }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            detector: DetectorConfig::default(),
            ui: UiConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl AppConfig {
    const PATH: &'static str = "config.json";

    pub fn load() -> Result<Self> {
        let config = if Path::new(Self::PATH).exists() {
            let content = fs::read_to_string(Self::PATH)?;
            match serde_json::from_str::<AppConfig>(&content) {
                Ok(c) => {
                    log::info!("Loaded configuration from {}", Self::PATH);
                    c
                }
                Err(err) => {
                    log::warn!("Error parsing {}: {}. Loading defaults.", Self::PATH, err);
                    Self::default()
                }
            }
        } else {
            log::info!("No {} found. Creating defaults.", Self::PATH);
            Self::default()
        };

        // Save back so new fields show up in the file
        config.save()?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(Self::PATH, content)?;
        Ok(())
    }
}

/// Parse a `#RRGGBB` color string.
pub fn parse_hex(hex: &str) -> Option<(u8, u8, u8)> {
    if hex.len() == 7 && hex.starts_with('#') {
        let r = u8::from_str_radix(&hex[1..3], 16).ok()?;
        let g = u8::from_str_radix(&hex[3..5], 16).ok()?;
        let b = u8::from_str_radix(&hex[5..7], 16).ok()?;
        Some((r, g, b))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex("#FF0000"), Some((255, 0, 0)));
        assert_eq!(parse_hex("#00FF00"), Some((0, 255, 0)));
        assert_eq!(parse_hex("#0000FF"), Some((0, 0, 255)));
        assert_eq!(parse_hex("#FFFFFF"), Some((255, 255, 255)));
        assert_eq!(parse_hex("invalid"), None);
        assert_eq!(parse_hex("#GG0000"), None);
    }

    #[test]
    fn defaults_are_sane() {
        let config = AppConfig::default();
        assert_eq!(config.detector.max_results, 5);
        assert!(config.detector.score_threshold > 0.0);
        assert_eq!(config.ui.box_color_hex, "#00FF00");
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"detector": {"score_threshold": 0.7}}"#).unwrap();
        assert_eq!(config.detector.score_threshold, 0.7);
        assert_eq!(config.detector.max_results, 5);
        assert_eq!(config.output.fallback_fps, 30.0);
    }
}
