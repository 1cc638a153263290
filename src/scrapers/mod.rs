//! Scraper trait and common types for manga source sites.
//!
//! A scraper only interprets HTML; all network access goes through
//! [`crate::fetcher::Fetcher`]. Adding a site means adding one more
//! implementation and registering it in [`ScraperRegistry::new`].

mod readms;

pub use readms::ReadmsScraper;

use crate::error::ScraperError;
use crate::utils::chapter_id_from_label;

/// One row of a series index page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterEntry {
    /// Display label, e.g. `"901 - The Storm"`.
    pub label: String,

    /// Chapter URL without the trailing page number.
    pub base_url: String,
}

impl ChapterEntry {
    pub fn new(label: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            base_url: base_url.into(),
        }
    }

    /// Stable identifier recorded in the completed set.
    pub fn id(&self) -> String {
        chapter_id_from_label(&self.label)
    }
}

/// What a single reader page contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageLookup {
    /// Absolute URL of the page image.
    Image(String),

    /// The page has no image: the chapter has no more pages.
    EndOfChapter,
}

/// Site adapter for a manga source.
pub trait Scraper: Send + Sync {
    /// Returns the human-readable name of this scraper.
    fn name(&self) -> &'static str;

    /// Returns the identifier used in folder names (lowercase, no spaces).
    fn id(&self) -> &'static str;

    /// Checks if this scraper can handle the given series URL.
    fn can_handle(&self, url: &str) -> bool;

    /// Extracts the chapter listing from a series index page, in the
    /// order the site lists them (newest first).
    fn parse_listing(&self, page: &[u8]) -> Result<Vec<ChapterEntry>, ScraperError>;

    /// URL of page `index` (1-based) of a chapter.
    fn page_url(&self, base_url: &str, index: u32) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), index)
    }

    /// Locates the image on a reader page fetched from `page_url`.
    fn parse_page(&self, page_url: &str, page: &[u8]) -> Result<PageLookup, ScraperError>;
}

/// Registry of available scrapers.
pub struct ScraperRegistry {
    scrapers: Vec<Box<dyn Scraper>>,
}

impl Default for ScraperRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperRegistry {
    /// Creates a new registry with all available scrapers.
    pub fn new() -> Self {
        let scrapers: Vec<Box<dyn Scraper>> = vec![Box::new(ReadmsScraper::new())];

        Self { scrapers }
    }

    /// Finds a scraper that can handle the given URL.
    pub fn find_for_url(&self, url: &str) -> Option<&dyn Scraper> {
        self.scrapers
            .iter()
            .find(|s| s.can_handle(url))
            .map(|s| s.as_ref())
    }

    /// Returns all registered scrapers.
    pub fn all(&self) -> &[Box<dyn Scraper>] {
        &self.scrapers
    }
}
