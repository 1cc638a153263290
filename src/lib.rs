//! Mangoose - incremental manga chapter downloader.
//!
//! This library provides functionality for:
//! - Tracking series and the chapters already downloaded for each
//! - Scraping chapter listings and reader pages from manga sites
//! - Downloading new chapters page by page and packing them as CBZ archives

pub mod archive;
pub mod config;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod scrapers;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use config::{Config, ConfigStore, SeriesRecord};
pub use downloader::{ChapterDownloader, DownloadedChapter};
pub use error::{ArchiveError, ConfigError, ScraperError, SyncError};
pub use fetcher::{FetchedPage, Fetcher, HttpFetcher};
pub use scrapers::{ChapterEntry, PageLookup, Scraper, ScraperRegistry};
pub use sync::{SeriesReport, SyncReport, Synchronizer};
