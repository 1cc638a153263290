//! Error types for Mangoose.
//!
//! Uses `thiserror` for structured error definitions. Each concern gets its
//! own enum; [`SyncError`] composes them for the synchronizer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while talking to a source site or parsing its pages.
#[derive(Error, Debug)]
pub enum ScraperError {
    /// HTTP request failed (connection, timeout, body read)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Failed to parse HTML content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// The required element isn't found in HTML
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// URL parsing or validation failed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No scraper supports this URL
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),
}

impl ScraperError {
    /// Returns true for failures of the transport rather than of the content.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::HttpError(_) | Self::Status { .. })
    }

    /// Returns true if the server reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }
}

/// Error type for the persisted progress file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the settings file
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse or serialize the settings
    #[error("Failed to parse settings: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Failed to write the settings file
    #[error("Failed to save settings to {path}: {source}")]
    WriteError {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Error type for chapter packaging.
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// Reading pages or writing the archive failed
    #[error("Archive I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The zip writer rejected an entry
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The directory to pack contains no files
    #[error("Nothing to pack in {0}")]
    EmptyDirectory(PathBuf),
}

/// Error type for a synchronization pass.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Fetching or parsing remote content failed
    #[error(transparent)]
    Scraper(#[from] ScraperError),

    /// A directory or file could not be created, written or removed
    #[error("Filesystem error at {path}: {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Packaging the chapter failed
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// Progress could not be persisted
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SyncError {
    /// Wraps an I/O error with the path it happened at.
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Network failure other than the expected end of a chapter.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Scraper(e) if e.is_network())
    }

    /// Expected structure missing from a fetched page.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Scraper(e) if !e.is_network())
    }

    /// Local filesystem or packaging failure.
    pub fn is_filesystem(&self) -> bool {
        matches!(self, Self::FileSystem { .. } | Self::Archive(_))
    }
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;
