use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::{engine_info, engine_warn};
use hardcopy_engine::EngineSettings;
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILENAME: &str = "hardcopy.ron";

/// Contents of `hardcopy.ron`. Every field is optional; anything left out
/// keeps the engine default.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_root: Option<PathBuf>,
    pub settings: SettingsOverrides,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SettingsOverrides {
    pub connect_timeout_secs: Option<u64>,
    pub request_timeout_secs: Option<u64>,
    pub redirect_limit: Option<usize>,
    pub max_asset_bytes: Option<u64>,
    pub max_page_bytes: Option<u64>,
    pub max_concurrent_fetches: Option<usize>,
    pub min_image_bytes: Option<u64>,
    pub content_negotiating_hosts: Option<Vec<String>>,
    pub converter_program: Option<String>,
    pub disparity_hosts: Option<Vec<String>>,
    pub disparity_min_words: Option<u32>,
    pub disparity_ratio: Option<f64>,
    pub long_article_words: Option<u32>,
}

impl AppConfig {
    pub fn engine_settings(&self) -> EngineSettings {
        let mut settings = EngineSettings::default();
        self.settings.apply(&mut settings);
        settings
    }
}

impl SettingsOverrides {
    pub fn apply(&self, settings: &mut EngineSettings) {
        if let Some(secs) = self.connect_timeout_secs {
            settings.connect_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = self.request_timeout_secs {
            settings.request_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = self.redirect_limit {
            settings.redirect_limit = limit;
        }
        if let Some(bytes) = self.max_asset_bytes {
            settings.max_asset_bytes = bytes;
        }
        if let Some(bytes) = self.max_page_bytes {
            settings.max_page_bytes = bytes;
        }
        if let Some(limit) = self.max_concurrent_fetches {
            settings.max_concurrent_fetches = limit;
        }
        if let Some(bytes) = self.min_image_bytes {
            settings.min_image_bytes = bytes;
        }
        if let Some(hosts) = &self.content_negotiating_hosts {
            settings.content_negotiating_hosts = hosts.clone();
        }
        if let Some(program) = &self.converter_program {
            settings.converter_program = program.clone();
        }
        if let Some(hosts) = &self.disparity_hosts {
            settings.disparity_hosts = hosts.clone();
        }
        if let Some(words) = self.disparity_min_words {
            settings.disparity_min_words = words;
        }
        if let Some(ratio) = self.disparity_ratio {
            settings.disparity_ratio = ratio;
        }
        if let Some(words) = self.long_article_words {
            settings.long_article_words = words;
        }
    }
}

/// Load the RON config at `path`. A missing file gives the defaults; a file
/// that cannot be read or parsed is reported and also gives the defaults.
pub fn load_config(path: &Path) -> AppConfig {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return AppConfig::default();
        }
        Err(err) => {
            engine_warn!("Failed to read config from {:?}: {}", path, err);
            return AppConfig::default();
        }
    };

    match ron::from_str(&content) {
        Ok(config) => {
            engine_info!("Loaded config from {:?}", path);
            config
        }
        Err(err) => {
            engine_warn!("Failed to parse config from {:?}: {}", path, err);
            AppConfig::default()
        }
    }
}
