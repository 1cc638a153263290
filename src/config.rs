//! Persisted settings and download progress.
//!
//! The whole state lives in one JSON file. Every mutating operation on
//! [`ConfigStore`] rewrites that file before returning.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default settings filename, relative to the working directory.
pub const CONFIG_FILENAME: &str = "settings.json";

/// Downloads folder used until one is set.
const DEFAULT_DOWNLOADS_FOLDER: &str = "downloads";

/// Root of the settings file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where series folders are created.
    pub downloads_folder: PathBuf,

    /// Tracked series by name.
    #[serde(default)]
    pub series: BTreeMap<String, SeriesRecord>,

    /// Keys written by other versions, kept as-is.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            downloads_folder: PathBuf::from(DEFAULT_DOWNLOADS_FOLDER),
            series: BTreeMap::new(),
            extra: BTreeMap::new(),
        }
    }
}

/// A tracked series.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesRecord {
    /// Index page listing the chapters.
    pub url: String,

    /// Identifiers of chapters already packaged, in completion order.
    #[serde(default)]
    pub downloaded_chapters: Vec<String>,
}

impl SeriesRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            downloaded_chapters: Vec::new(),
        }
    }

    /// Checks if a chapter identifier is in the completed set.
    pub fn is_downloaded(&self, chapter_id: &str) -> bool {
        self.downloaded_chapters.iter().any(|c| c == chapter_id)
    }
}

impl Config {
    /// Loads configuration from a specific path.
    ///
    /// A missing file yields the defaults; nothing is written until the
    /// first change.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(path)?;
        let mut config: Config = serde_json::from_str(&content)?;
        for record in config.series.values_mut() {
            dedup_in_order(&mut record.downloaded_chapters);
        }

        Ok(config)
    }

    /// Saves configuration to a specific path.
    ///
    /// Writes a sibling temp file and renames it over `path`, so readers
    /// only ever see a complete file.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::WriteError {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let mut content = serde_json::to_string_pretty(self)?;
        content.push('\n');

        let mut temp_name = path.as_os_str().to_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        fs::write(&temp_path, content).map_err(write_err)?;
        fs::rename(&temp_path, path).map_err(write_err)?;
        Ok(())
    }
}

fn dedup_in_order(ids: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    ids.retain(|id| seen.insert(id.clone()));
}

/// In-memory settings bound to the file they persist to.
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    config: Config,
}

impl ConfigStore {
    /// Loads the store from `path`, falling back to defaults if absent.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let config = Config::load_from(&path)?;
        Ok(Self { path, config })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn downloads_folder(&self) -> &Path {
        &self.config.downloads_folder
    }

    pub fn series(&self, name: &str) -> Option<&SeriesRecord> {
        self.config.series.get(name)
    }

    /// Returns true if no series is tracked.
    pub fn is_empty(&self) -> bool {
        self.config.series.is_empty()
    }

    /// Rewrites the backing file with the current state.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.config.save_to(&self.path)
    }

    /// Sets the downloads folder, creating it if needed.
    pub fn set_downloads_folder(&mut self, folder: &Path) -> Result<(), ConfigError> {
        if !folder.is_dir() {
            fs::create_dir_all(folder).map_err(|source| ConfigError::WriteError {
                path: folder.to_path_buf(),
                source,
            })?;
            info!("Created directory {}", folder.display());
        }

        self.config.downloads_folder = folder.to_path_buf();
        self.save()?;
        info!("Downloads folder set to {}", folder.display());
        Ok(())
    }

    /// Starts tracking a series, replacing any record with the same name.
    pub fn add_series(&mut self, name: &str, url: &str) -> Result<(), ConfigError> {
        self.config
            .series
            .insert(name.to_string(), SeriesRecord::new(url));
        self.save()?;
        info!(
            "Added {} to the downloads list. New chapters will be looked up at: {}",
            name, url
        );
        Ok(())
    }

    /// Stops tracking a series. Unknown names are not an error.
    pub fn delete_series(&mut self, name: &str) -> Result<(), ConfigError> {
        let removed = self.config.series.remove(name).is_some();
        self.save()?;
        if removed {
            info!("Deleted {} from the downloads list.", name);
        } else {
            info!("{} was not in the downloads list.", name);
        }
        Ok(())
    }

    /// Records a chapter as downloaded and persists immediately.
    ///
    /// Returns false if the series is unknown or the chapter was already
    /// recorded; nothing is written in that case.
    pub fn mark_chapter_downloaded(
        &mut self,
        series: &str,
        chapter_id: &str,
    ) -> Result<bool, ConfigError> {
        let Some(record) = self.config.series.get_mut(series) else {
            return Ok(false);
        };
        if record.is_downloaded(chapter_id) {
            return Ok(false);
        }

        record.downloaded_chapters.push(chapter_id.to_string());
        self.save()?;
        Ok(true)
    }

    /// Snapshot of tracked series as `(name, url)` pairs, in key order.
    pub fn tracked_series(&self) -> Vec<(String, String)> {
        self.config
            .series
            .iter()
            .map(|(name, record)| (name.clone(), record.url.clone()))
            .collect()
    }
}
