//! Project Gutenberg fetcher: cache lookup, primary download, one alternate-URL fallback.

mod client;
mod decode;
mod error;
pub mod urls;

pub use client::{HttpClient, HttpClientBuilder, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT};
pub use decode::{decode_lossy, decode_preferred};
pub use error::FetchError;
pub use urls::{alternate_txt_url, book_url, metadata_url, BookFormat, GUTENBERG_BASE};

use crate::cache::{BookCache, CacheError};
use crate::model::{BookId, BookMetadata};
use scraper::{Html, Selector};

/// Where a fetched text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSource {
    Cache,
    Primary,
    Alternate,
}

/// Result of fetching one book. Transport problems are values, not errors.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { text: String, source: TextSource },
    /// Both the primary and the alternate URL answered 404.
    NotFound,
    /// The alternate attempt failed for some other reason; carries that failure.
    Failed(FetchError),
}

impl FetchOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            FetchOutcome::Fetched { text, .. } => Some(text),
            _ => None,
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            FetchOutcome::Fetched { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// Fetches book texts through the on-disk cache.
#[derive(Debug, Clone)]
pub struct GutenbergClient {
    http: HttpClient,
    cache: BookCache,
    base_url: String,
}

impl GutenbergClient {
    pub fn new(http: HttpClient, cache: BookCache) -> Self {
        Self {
            http,
            cache,
            base_url: GUTENBERG_BASE.to_string(),
        }
    }

    /// Point at a mirror (or a test server). Trailing `/` is ignored.
    pub fn with_base_url(mut self, base: &str) -> Self {
        self.base_url = urls::normalize_base(base);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> &BookCache {
        &self.cache
    }

    pub fn book_url(&self, id: BookId, format: BookFormat) -> String {
        book_url(&self.base_url, id, format)
    }

    /// Fetch the raw text of a book.
    ///
    /// Unless `force_refresh` is set, a cached copy is returned without touching the
    /// network. Otherwise the `-0.txt` URL is tried and, on any failure, the plain
    /// `.txt` URL once. Successful downloads are written to the cache. Only cache I/O
    /// errors are returned as `Err`.
    pub fn fetch(&self, id: BookId, force_refresh: bool) -> Result<FetchOutcome, CacheError> {
        if !force_refresh && self.cache.contains(id) {
            tracing::info!(book_id = %id, "Loading book from cache");
            let text = self.cache.read(id)?;
            return Ok(FetchOutcome::Fetched {
                text,
                source: TextSource::Cache,
            });
        }

        let url = self.book_url(id, BookFormat::Txt);
        tracing::info!(book_id = %id, url = %url, "Downloading book");
        let primary_err = match self.http.get_bytes(&url) {
            Ok(bytes) => {
                let text = decode_preferred(&bytes);
                self.cache.write(id, &text)?;
                tracing::info!(book_id = %id, chars = text.len(), "Downloaded book");
                return Ok(FetchOutcome::Fetched {
                    text,
                    source: TextSource::Primary,
                });
            }
            Err(e) => e,
        };
        tracing::warn!(book_id = %id, error = %primary_err, "Primary download failed, trying alternate URL");

        let alt_url = alternate_txt_url(&self.base_url, id);
        match self.http.get_bytes(&alt_url) {
            Ok(bytes) => {
                let text = decode_lossy(&bytes);
                self.cache.write(id, &text)?;
                tracing::info!(book_id = %id, url = %alt_url, "Downloaded book from alternate URL");
                Ok(FetchOutcome::Fetched {
                    text,
                    source: TextSource::Alternate,
                })
            }
            Err(alt_err) => {
                tracing::warn!(book_id = %id, error = %alt_err, "Alternate download failed as well");
                if primary_err.is_not_found() && alt_err.is_not_found() {
                    Ok(FetchOutcome::NotFound)
                } else {
                    Ok(FetchOutcome::Failed(alt_err))
                }
            }
        }
    }

    /// Look up the book's landing page and pull the `<title>` text, if any.
    pub fn metadata(&self, id: BookId) -> Result<BookMetadata, FetchError> {
        let url = metadata_url(&self.base_url, id);
        let html = self.http.get_text(&url)?;
        let title = extract_title(&html);
        tracing::debug!(book_id = %id, title = ?title, "Fetched book metadata");
        Ok(BookMetadata {
            book_id: id,
            url,
            title,
        })
    }
}

/// Trimmed text of the first `<title>` element. None if missing or blank.
pub fn extract_title(html: &str) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let doc = Html::parse_document(html);
    doc.select(&selector)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}
