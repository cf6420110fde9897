use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::export::DEFAULT_JPEG_QUALITY;
use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::previews::THUMB_SIZE;

pub const OUTPUT_DIR_ENV: &str = "PHOTOEDIT_OUTPUT_DIR";

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
/// Persisted settings for photoedit. Every key is optional.
pub struct AppConfig {
    pub output_dir: Option<PathBuf>,
    pub jpeg_quality: Option<u8>,
    pub history_limit: Option<usize>,
    pub thumbnail_size: Option<u32>,
}

impl AppConfig {
    /// Returns the user config file path, if a config directory is available.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("photoedit").join("config.toml"))
    }

    /// Loads config from disk, falling back to defaults on any error.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config");
                Self::default()
            }
        }
    }

    /// Writes config to disk, ignoring filesystem/serialization errors.
    pub fn save(&self) {
        let Some(path) = Self::config_path() else {
            return;
        };
        self.save_to(&path);
    }

    pub fn save_to(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Ok(s) = toml::to_string_pretty(self) {
            let _ = std::fs::write(path, s);
        }
    }

    /// Output directory: CLI override, then `PHOTOEDIT_OUTPUT_DIR`, then
    /// the config file, then `~/Pictures/Edited`.
    pub fn resolve_output_dir(&self, cli_override: Option<&Path>) -> PathBuf {
        let env = std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from);
        self.output_dir_from(cli_override, env)
    }

    fn output_dir_from(&self, cli_override: Option<&Path>, env: Option<PathBuf>) -> PathBuf {
        if let Some(dir) = cli_override {
            return dir.to_path_buf();
        }
        if let Some(dir) = env.filter(|d| !d.as_os_str().is_empty()) {
            return dir;
        }
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        dirs::picture_dir()
            .or_else(dirs::home_dir)
            .map(|d| d.join("Edited"))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.jpeg_quality
            .unwrap_or(DEFAULT_JPEG_QUALITY)
            .clamp(1, 100)
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit.unwrap_or(DEFAULT_HISTORY_LIMIT).max(1)
    }

    pub fn thumbnail_size(&self) -> u32 {
        self.thumbnail_size.unwrap_or(THUMB_SIZE).max(1)
    }
}
