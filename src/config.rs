//! Run settings for the headless driver.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// How a page is run. Fields missing from a config file keep their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Directory models and textures are loaded from.
    pub asset_root: PathBuf,
    /// Frames to run before the snapshot is taken.
    pub frames: u64,
    /// Seconds per frame.
    pub dt: f32,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("public"),
            frames: 120,
            dt: 1.0 / 60.0,
        }
    }
}

impl GalleryConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid gallery config")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = GalleryConfig::from_json(r#"{ "frames": 10 }"#).unwrap();
        assert_eq!(config.frames, 10);
        assert_eq!(config.asset_root, PathBuf::from("public"));
        assert!((config.dt - 1.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_malformed_file() {
        assert!(GalleryConfig::from_json("{ frames: ").is_err());
        assert!(GalleryConfig::load(Path::new("/nonexistent/gallery.json")).is_err());
    }
}
