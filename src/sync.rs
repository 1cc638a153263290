//! Incremental synchronization of every tracked series.
//!
//! Chapters are processed oldest first. Progress is persisted after each
//! packed chapter, so an interrupted run repeats at most the chapter that
//! was in flight.

use crate::config::ConfigStore;
use crate::downloader::{ChapterDownloader, chapter_folder_name};
use crate::error::{ScraperError, SyncError};
use crate::fetcher::Fetcher;
use crate::scrapers::{ChapterEntry, Scraper, ScraperRegistry};
use crate::utils::sanitize_path_component;
use std::path::Path;
use tracing::{error, info, warn};

/// Outcome of one series' pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesReport {
    pub name: String,

    /// Chapter identifiers downloaded in this pass, in order.
    pub downloaded: Vec<String>,

    /// Chapters skipped because they were already downloaded.
    pub skipped: usize,

    /// Chapters that failed, with the reason.
    pub failed: Vec<(String, String)>,

    /// Set when the whole series pass was aborted.
    pub error: Option<String>,
}

impl SeriesReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

/// Outcome of a full synchronization run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub series: Vec<SeriesReport>,
}

impl SyncReport {
    /// Total chapters downloaded across all series.
    pub fn downloaded_count(&self) -> usize {
        self.series.iter().map(|s| s.downloaded.len()).sum()
    }

    /// Number of chapters or series passes that failed.
    pub fn failure_count(&self) -> usize {
        self.series
            .iter()
            .map(|s| s.failed.len() + usize::from(s.error.is_some()))
            .sum()
    }
}

/// Drives listing, filtering and downloading for every tracked series.
pub struct Synchronizer<'a> {
    store: &'a mut ConfigStore,
    fetcher: &'a dyn Fetcher,
    registry: &'a ScraperRegistry,
}

impl<'a> Synchronizer<'a> {
    pub fn new(
        store: &'a mut ConfigStore,
        fetcher: &'a dyn Fetcher,
        registry: &'a ScraperRegistry,
    ) -> Self {
        Self {
            store,
            fetcher,
            registry,
        }
    }

    /// Synchronizes every tracked series in turn.
    ///
    /// A failing series is reported and skipped. Only a failure to persist
    /// progress stops the run, since nothing further could be recorded.
    pub async fn sync_all(&mut self) -> Result<SyncReport, SyncError> {
        let mut report = SyncReport::default();
        if self.store.is_empty() {
            error!("There are no series to download. Add them with -n NAME URL.");
            return Ok(report);
        }

        let tracked = self.store.tracked_series();
        info!("Synchronization started for {} series.", tracked.len());

        for (name, url) in tracked {
            let mut series_report = SeriesReport::new(&name);
            match self.sync_series(&name, &url, &mut series_report).await {
                Ok(()) => {}
                Err(SyncError::Config(e)) => return Err(e.into()),
                Err(e) => {
                    error!("Skipping series {}: {}", name, e);
                    series_report.error = Some(e.to_string());
                }
            }
            report.series.push(series_report);
        }

        info!(
            "Synchronization finished: {} chapters downloaded, {} failures.",
            report.downloaded_count(),
            report.failure_count()
        );
        Ok(report)
    }

    /// Downloads every chapter of one series that is not yet recorded.
    pub async fn sync_series(
        &mut self,
        name: &str,
        url: &str,
        report: &mut SeriesReport,
    ) -> Result<(), SyncError> {
        let registry = self.registry;
        let scraper = registry
            .find_for_url(url)
            .ok_or_else(|| ScraperError::UnsupportedUrl(url.to_string()))?;

        info!("Checking {} on {} for new chapters...", name, scraper.name());
        let index = self.fetcher.fetch(url).await?;
        let chapters = oldest_first(scraper.parse_listing(&index.body)?);

        let series_dir = self.store.downloads_folder().join(sanitize_path_component(name));
        for entry in &chapters {
            let chapter_id = entry.id();
            let done = self
                .store
                .series(name)
                .is_some_and(|record| record.is_downloaded(&chapter_id));
            if done {
                report.skipped += 1;
                continue;
            }

            match self.sync_chapter(scraper, entry, &series_dir).await {
                Ok(()) => {
                    self.store.mark_chapter_downloaded(name, &chapter_id)?;
                    report.downloaded.push(chapter_id);
                }
                Err(e) => {
                    warn!("Chapter {} of {} failed: {}", entry.label, name, e);
                    report.failed.push((chapter_id, e.to_string()));
                }
            }
        }

        Ok(())
    }

    async fn sync_chapter(
        &self,
        scraper: &dyn Scraper,
        entry: &ChapterEntry,
        series_dir: &Path,
    ) -> Result<(), SyncError> {
        let chapter_dir = series_dir.join(chapter_folder_name(&entry.label, scraper.id()));
        ChapterDownloader::new(self.fetcher, scraper)
            .download_chapter(entry, &chapter_dir)
            .await?;
        Ok(())
    }
}

/// Puts a newest-first listing into download order.
///
/// The listing is reversed. When every identifier is a number the result is
/// also sorted by that number, so rows the site lists out of place still
/// come out ascending.
fn oldest_first(mut chapters: Vec<ChapterEntry>) -> Vec<ChapterEntry> {
    chapters.reverse();

    let numbers: Option<Vec<f64>> = chapters
        .iter()
        .map(|c| chapter_number(&c.id()))
        .collect();
    let Some(numbers) = numbers else {
        return chapters;
    };

    let mut keyed: Vec<(f64, ChapterEntry)> = numbers.into_iter().zip(chapters).collect();
    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, chapter)| chapter).collect()
}

/// Parses identifiers written as plain decimals (`12`, `12.5`).
fn chapter_number(id: &str) -> Option<f64> {
    let mut parts = id.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    let fraction = parts.next().unwrap_or("0");
    let is_digits = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !is_digits(whole) || !is_digits(fraction) {
        return None;
    }
    id.parse().ok()
}
