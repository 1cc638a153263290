//! Chapter download: page loop, packaging and cleanup.

use crate::archive::{self, ARCHIVE_EXTENSION};
use crate::error::{ScraperError, SyncError};
use crate::fetcher::Fetcher;
use crate::scrapers::{ChapterEntry, PageLookup, Scraper};
use crate::utils::{extension_from_content_type, page_file_name, sanitize_path_component};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Sub-directory of a chapter folder holding loose pages until packed.
const STAGING_DIR: &str = "pages";

/// Name of the folder a chapter is stored in, e.g. `901 - Storm [readms]`.
pub fn chapter_folder_name(label: &str, source_id: &str) -> String {
    format!("{} [{}]", sanitize_path_component(label), source_id)
}

/// Result of a fully materialized chapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedChapter {
    /// Number of pages saved.
    pub pages: u32,

    /// Path of the packed archive.
    pub archive: PathBuf,
}

/// Downloads the pages of one chapter through a site adapter.
pub struct ChapterDownloader<'a> {
    fetcher: &'a dyn Fetcher,
    scraper: &'a dyn Scraper,
}

impl<'a> ChapterDownloader<'a> {
    pub fn new(fetcher: &'a dyn Fetcher, scraper: &'a dyn Scraper) -> Self {
        Self { fetcher, scraper }
    }

    /// Downloads the chapter into `chapter_dir` and packs it.
    ///
    /// Pages go to a staging directory first. The archive is committed
    /// before the staging directory is removed, so an interruption at any
    /// point leaves at least one complete copy or nothing worth keeping.
    /// Running this again for the same chapter starts from a clean staging
    /// directory and replaces the archive.
    pub async fn download_chapter(
        &self,
        entry: &ChapterEntry,
        chapter_dir: &Path,
    ) -> Result<DownloadedChapter, SyncError> {
        let staging = chapter_dir.join(STAGING_DIR);
        if staging.exists() {
            debug!("clearing leftover pages in {}", staging.display());
            tokio::fs::remove_dir_all(&staging)
                .await
                .map_err(|e| SyncError::fs(&staging, e))?;
        }

        let pages = self
            .download_pages(&entry.label, &entry.base_url, &staging)
            .await?;
        if pages == 0 {
            if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
                warn!("could not remove {}: {}", staging.display(), e);
            }
            return Err(ScraperError::ElementNotFound(format!(
                "first page of '{}' at {}",
                entry.label, entry.base_url
            ))
            .into());
        }

        let archive_path = chapter_dir.join(format!(
            "{}.{}",
            sanitize_path_component(&entry.label),
            ARCHIVE_EXTENSION
        ));
        archive::pack_directory(&staging, &archive_path)?;

        if let Err(e) = tokio::fs::remove_dir_all(&staging).await {
            warn!("could not remove {}: {}", staging.display(), e);
        }
        info!(
            "Packed {} ({} pages) into {}",
            entry.label,
            pages,
            archive_path.display()
        );

        Ok(DownloadedChapter {
            pages,
            archive: archive_path,
        })
    }

    /// Saves pages 1, 2, ... of a chapter into `dest_dir` until the source
    /// has no more pages. Returns the number of pages saved.
    ///
    /// A network failure aborts the loop with an error; only a page without
    /// an image (or a 404 for the page) ends the chapter.
    pub async fn download_pages(
        &self,
        label: &str,
        base_url: &str,
        dest_dir: &Path,
    ) -> Result<u32, SyncError> {
        if !dest_dir.is_dir() {
            tokio::fs::create_dir_all(dest_dir)
                .await
                .map_err(|e| SyncError::fs(dest_dir, e))?;
            info!("Created directory {}", dest_dir.display());
        }

        let mut index = 1;
        loop {
            let page_url = self.scraper.page_url(base_url, index);
            let image_url = match self.lookup_page(&page_url).await? {
                PageLookup::Image(url) => url,
                PageLookup::EndOfChapter => break,
            };

            info!("Downloading {}; p{:03}...", label, index);
            let image = self.fetcher.fetch(&image_url).await?;
            let extension = extension_from_content_type(image.content_type.as_deref());
            let path = dest_dir.join(page_file_name(index, &extension));
            tokio::fs::write(&path, &image.body)
                .await
                .map_err(|e| SyncError::fs(&path, e))?;

            index += 1;
        }

        Ok(index - 1)
    }

    async fn lookup_page(&self, page_url: &str) -> Result<PageLookup, SyncError> {
        match self.fetcher.fetch(page_url).await {
            Ok(page) => Ok(self.scraper.parse_page(page_url, &page.body)?),
            Err(e) if e.is_not_found() => {
                debug!("{} not found, treating as end of chapter", page_url);
                Ok(PageLookup::EndOfChapter)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::fetcher::FetchedPage;
    use crate::fetcher::testing::FakeFetcher;

    /// Serves a chapter of `pages` images at `base_url`, followed by a page
    /// without an image.
    pub fn serve_chapter(fake: &FakeFetcher, base_url: &str, pages: u32) {
        let tag = base_url.rsplit('/').next().unwrap_or_default();
        for i in 1..=pages {
            fake.serve_html(
                &format!("{}/{}", base_url, i),
                &format!(
                    r#"<html><body><img id="manga-page" src="//img.readms.net/cdn/{}/{:02}.png"></body></html>"#,
                    tag, i
                ),
            );
            fake.serve(
                &format!("https://img.readms.net/cdn/{}/{:02}.png", tag, i),
                FetchedPage::new(format!("image {} of {}", i, tag)).with_content_type("image/png"),
            );
        }
        fake.serve_html(
            &format!("{}/{}", base_url, pages + 1),
            "<html><body><p>That's the end of the chapter</p></body></html>",
        );
    }
}
