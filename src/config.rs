use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use tracing::{info, warn};

use crate::data::{COUNTRIES_API_URL, DEFAULT_ZOOM_LEVEL, LOCATION_ICON_URL, OSM_LICENSE, OSM_TILE_URL};

pub const DATASET_URL_ENV: &str = "WORLDVIEW_DATASET_URL";

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub dataset_url: String,
    pub tile_url: String,
    pub tile_license: String,
    pub marker_icon_url: String,
    pub zoom_level: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dataset_url: COUNTRIES_API_URL.to_string(),
            tile_url: OSM_TILE_URL.to_string(),
            tile_license: OSM_LICENSE.to_string(),
            marker_icon_url: LOCATION_ICON_URL.to_string(),
            zoom_level: DEFAULT_ZOOM_LEVEL,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("worldview").join("config.toml"))
    }

    /// Reads the user config if there is one, then applies environment
    /// overrides. Any problem with the file falls back to the defaults.
    pub fn load() -> Self {
        Self::load_from(Self::config_path().as_deref(), env::var(DATASET_URL_ENV).ok())
    }

    pub fn load_from(path: Option<&Path>, env_url: Option<String>) -> Self {
        let mut settings = match path {
            Some(path) if path.exists() => Self::from_file(path).unwrap_or_else(|e| {
                warn!(error = %format!("{:#}", e), "ignoring config file");
                Self::default()
            }),
            _ => Self::default(),
        };

        if let Some(url) = env_url.filter(|url| !url.trim().is_empty()) {
            info!(%url, "dataset url overridden from environment");
            settings.dataset_url = url;
        }

        settings
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let settings = Self::from_toml_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        info!(path = %path.display(), "loaded config");
        Ok(settings)
    }

    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(text)?;
        anyhow::ensure!(
            settings.zoom_level.is_finite() && settings.zoom_level >= 0.0,
            "zoom_level must be a non-negative number"
        );
        Ok(settings)
    }
}
