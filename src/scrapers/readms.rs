//! MangaStream (readms.net) scraper implementation.

use super::{ChapterEntry, PageLookup, Scraper};
use crate::error::ScraperError;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::warn;
use url::Url;

/// Site root that relative chapter links are resolved against.
const SITE_ROOT: &str = "https://readms.net";

/// Series index URLs, e.g. `https://readms.net/manga/one_piece`.
static URL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(?:www\.)?readms\.net/manga/[\w-]+/?$").unwrap());

/// CSS selectors used for parsing.
struct Selectors {
    /// The chapter table on a series index page.
    chapter_table: Selector,
    /// Chapter links inside the table.
    chapter_link: Selector,
    /// The page image on a reader page.
    page_image: Selector,
}

impl Selectors {
    fn new() -> Self {
        Self {
            chapter_table: Selector::parse("table.table.table-striped").unwrap(),
            chapter_link: Selector::parse("a").unwrap(),
            page_image: Selector::parse("img#manga-page").unwrap(),
        }
    }
}

/// Scraper for readms.net series.
pub struct ReadmsScraper {
    selectors: Selectors,
}

impl Default for ReadmsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadmsScraper {
    pub fn new() -> Self {
        Self {
            selectors: Selectors::new(),
        }
    }

    /// Turns a reader link like `/r/one_piece/901/5048/1` into the absolute
    /// chapter URL without its page number.
    fn chapter_base_url(href: &str) -> Result<String, ScraperError> {
        let (head, _page) = href
            .trim_end_matches('/')
            .rsplit_once('/')
            .ok_or_else(|| ScraperError::InvalidUrl(format!("chapter link '{}'", href)))?;

        let root = Url::parse(SITE_ROOT).map_err(|e| ScraperError::InvalidUrl(e.to_string()))?;
        root.join(head)
            .map(|u| u.to_string())
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", href, e)))
    }
}

impl Scraper for ReadmsScraper {
    fn name(&self) -> &'static str {
        "MangaStream"
    }

    fn id(&self) -> &'static str {
        "readms"
    }

    fn can_handle(&self, url: &str) -> bool {
        URL_PATTERN.is_match(url)
    }

    fn parse_listing(&self, page: &[u8]) -> Result<Vec<ChapterEntry>, ScraperError> {
        let doc = Html::parse_document(&String::from_utf8_lossy(page));
        let table = doc
            .select(&self.selectors.chapter_table)
            .next()
            .ok_or_else(|| ScraperError::ElementNotFound("chapter table".to_string()))?;

        let chapters: Vec<ChapterEntry> = table
            .select(&self.selectors.chapter_link)
            .filter_map(|link| {
                let href = link.value().attr("href")?;
                // The label is the link's leading text; badges may follow it
                let label = link
                    .text()
                    .map(str::trim)
                    .find(|t| !t.is_empty())?
                    .to_string();
                Some((label, href))
            })
            .filter_map(|(label, href)| match Self::chapter_base_url(href) {
                Ok(base_url) => Some(ChapterEntry::new(label, base_url)),
                Err(e) => {
                    warn!("Ignoring row '{}' of the chapter table: {}", label, e);
                    None
                }
            })
            .collect();

        Ok(chapters)
    }

    fn parse_page(&self, page_url: &str, page: &[u8]) -> Result<PageLookup, ScraperError> {
        let doc = Html::parse_document(&String::from_utf8_lossy(page));
        let Some(image) = doc.select(&self.selectors.page_image).next() else {
            return Ok(PageLookup::EndOfChapter);
        };

        let src = image
            .value()
            .attr("src")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ScraperError::ElementNotFound(format!("image source on {}", page_url)))?;

        // Sources are usually protocol-relative (//img.readms.net/...)
        let resolved = Url::parse(page_url)
            .and_then(|base| base.join(src))
            .map_err(|e| ScraperError::InvalidUrl(format!("{}: {}", src, e)))?;

        Ok(PageLookup::Image(resolved.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_PAGE: &str = r#"
        <html><body>
          <table class="table table-striped">
            <tr><th>Chapter</th><th>Released</th></tr>
            <tr><td><a href="/r/one_piece/903/5100/1">903 - The Fifth Emperor</a></td><td>1 day ago</td></tr>
            <tr><td><a href="/r/one_piece/902/5080/1">902 - End Roll</a></td><td>1 week ago</td></tr>
            <tr><td><a href="/r/one_piece/901/5048/1">901 - Even If That Means Dying</a></td><td>2 weeks ago</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_url_patterns() {
        let scraper = ReadmsScraper::new();

        assert!(scraper.can_handle("https://readms.net/manga/one_piece"));
        assert!(scraper.can_handle("https://readms.net/manga/my_hero_academia/"));
        assert!(scraper.can_handle("http://www.readms.net/manga/one-punch-man"));

        assert!(!scraper.can_handle("https://readms.net/r/one_piece/901/5048/1"));
        assert!(!scraper.can_handle("https://example.com/manga/one_piece"));
    }

    #[test]
    fn test_parse_listing() {
        let scraper = ReadmsScraper::new();
        let chapters = scraper.parse_listing(INDEX_PAGE.as_bytes()).unwrap();

        assert_eq!(chapters.len(), 3);
        assert_eq!(chapters[0].label, "903 - The Fifth Emperor");
        assert_eq!(chapters[0].base_url, "https://readms.net/r/one_piece/903/5100");
        assert_eq!(chapters[2].id(), "901");
        assert_eq!(chapters[2].base_url, "https://readms.net/r/one_piece/901/5048");
    }

    #[test]
    fn test_parse_listing_skips_malformed_link() {
        let scraper = ReadmsScraper::new();
        let html = r##"
            <table class="table table-striped">
              <tr><td><a href="/r/one_piece/903/5100/1">903 - The Fifth Emperor</a></td></tr>
              <tr><td><a href="#">Subscribe</a></td></tr>
              <tr><td><a href="/r/one_piece/902/5080/1">902 - End Roll</a></td></tr>
            </table>
        "##;

        let chapters = scraper.parse_listing(html.as_bytes()).unwrap();
        let ids: Vec<String> = chapters.iter().map(ChapterEntry::id).collect();
        assert_eq!(ids, vec!["903", "902"]);
        assert_eq!(chapters[1].base_url, "https://readms.net/r/one_piece/902/5080");
    }

    #[test]
    fn test_parse_listing_without_table() {
        let scraper = ReadmsScraper::new();
        let err = scraper
            .parse_listing(b"<html><body><p>Maintenance</p></body></html>")
            .unwrap_err();
        assert!(matches!(err, ScraperError::ElementNotFound(_)));
    }

    #[test]
    fn test_parse_listing_empty_table() {
        let scraper = ReadmsScraper::new();
        let chapters = scraper
            .parse_listing(br#"<table class="table table-striped"><tr><td>none</td></tr></table>"#)
            .unwrap();
        assert!(chapters.is_empty());
    }

    #[test]
    fn test_chapter_base_url() {
        assert_eq!(
            ReadmsScraper::chapter_base_url("/r/one_piece/901/5048/1").unwrap(),
            "https://readms.net/r/one_piece/901/5048"
        );
        assert_eq!(
            ReadmsScraper::chapter_base_url("https://readms.net/r/bnha/200/4900/3").unwrap(),
            "https://readms.net/r/bnha/200/4900"
        );
        assert!(ReadmsScraper::chapter_base_url("nopath").is_err());
    }

    #[test]
    fn test_parse_page_image() {
        let scraper = ReadmsScraper::new();
        let html = r#"<div><img id="manga-page" src="//img.readms.net/cdn/manga/1/5048/01.png"></div>"#;

        let lookup = scraper
            .parse_page("https://readms.net/r/one_piece/901/5048/1", html.as_bytes())
            .unwrap();
        assert_eq!(
            lookup,
            PageLookup::Image("https://img.readms.net/cdn/manga/1/5048/01.png".to_string())
        );
    }

    #[test]
    fn test_parse_page_end_of_chapter() {
        let scraper = ReadmsScraper::new();
        let lookup = scraper
            .parse_page(
                "https://readms.net/r/one_piece/901/5048/20",
                b"<html><body><h1>Page not found</h1></body></html>",
            )
            .unwrap();
        assert_eq!(lookup, PageLookup::EndOfChapter);
    }

    #[test]
    fn test_parse_page_image_without_source() {
        let scraper = ReadmsScraper::new();
        let err = scraper
            .parse_page(
                "https://readms.net/r/one_piece/901/5048/2",
                br#"<img id="manga-page">"#,
            )
            .unwrap_err();
        assert!(matches!(err, ScraperError::ElementNotFound(_)));
    }
}
