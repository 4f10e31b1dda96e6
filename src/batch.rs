//! Sequential multi-book download with a fixed pause between attempts.

use crate::cache::CacheError;
use crate::gutenberg::{FetchError, FetchOutcome, GutenbergClient};
use crate::model::{BookId, Library};
use std::time::Duration;

/// Default pause between downloads, in seconds.
pub const DEFAULT_DELAY_SECS: f64 = 2.0;

/// Batch settings. The default never bypasses the cache and does not pause.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Pause between consecutive attempts.
    pub delay: Duration,
    /// Re-download every book even if cached.
    pub force_refresh: bool,
}

impl BatchOptions {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }
}

/// What happened to each requested ID.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Number of IDs requested (including duplicates).
    pub requested: usize,
    /// Texts that were fetched or loaded from cache, in request order.
    pub books: Library,
    /// IDs whose primary and alternate URLs both returned 404.
    pub not_found: Vec<BookId>,
    /// IDs that could not be downloaded for any other reason.
    pub failed: Vec<(BookId, FetchError)>,
}

/// Fetch each ID in order, sleeping `options.delay` between attempts (not after the last).
///
/// Books that cannot be downloaded are left out of `books` and recorded in
/// `not_found` / `failed`. `on_progress(done, total, id)` runs after each attempt.
/// A cache I/O error stops the batch.
pub fn fetch_many(
    client: &GutenbergClient,
    ids: &[BookId],
    options: BatchOptions,
    on_progress: Option<&dyn Fn(usize, usize, BookId)>,
) -> Result<BatchReport, CacheError> {
    let total = ids.len();
    let mut report = BatchReport {
        requested: total,
        ..BatchReport::default()
    };

    for (i, &id) in ids.iter().enumerate() {
        tracing::info!(book_id = %id, n = i + 1, total, "Fetching book");
        match client.fetch(id, options.force_refresh)? {
            FetchOutcome::Fetched { text, .. } => report.books.insert(id, text),
            FetchOutcome::NotFound => report.not_found.push(id),
            FetchOutcome::Failed(e) => report.failed.push((id, e)),
        }
        if let Some(cb) = on_progress {
            cb(i + 1, total, id);
        }
        if i + 1 < total && !options.delay.is_zero() {
            std::thread::sleep(options.delay);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::BookCache;
    use crate::gutenberg::HttpClient;
    use std::cell::RefCell;
    use std::error::Error;
    use std::time::Instant;
    use tempfile::TempDir;

    fn id(n: u32) -> BookId {
        BookId::new(n).unwrap()
    }

    fn client_for(
        server: &mockito::Server,
        tmp: &TempDir,
    ) -> Result<GutenbergClient, Box<dyn Error>> {
        let http = HttpClient::builder().timeout_secs(5).build()?;
        let cache = BookCache::new(tmp.path())?;
        Ok(GutenbergClient::new(http, cache).with_base_url(&server.url()))
    }

    #[test]
    fn keeps_order_and_omits_failures() -> Result<(), Box<dyn Error>> {
        let mut server = mockito::Server::new();
        let tmp = TempDir::new()?;
        let _a = server
            .mock("GET", "/files/2/2-0.txt")
            .with_status(200)
            .with_body("two")
            .create();
        let _b = server
            .mock("GET", "/files/1/1-0.txt")
            .with_status(200)
            .with_body("one")
            .create();
        let _missing_primary = server
            .mock("GET", "/files/3/3-0.txt")
            .with_status(404)
            .create();
        let _missing_alt = server.mock("GET", "/files/3/3.txt").with_status(404).create();
        let _broken_primary = server
            .mock("GET", "/files/4/4-0.txt")
            .with_status(500)
            .create();
        let _broken_alt = server.mock("GET", "/files/4/4.txt").with_status(500).create();
        let client = client_for(&server, &tmp)?;

        let ids = [id(2), id(3), id(1), id(4)];
        let report = fetch_many(&client, &ids, BatchOptions::default(), None)?;
        assert_eq!(report.requested, 4);
        assert_eq!(report.books.ids().collect::<Vec<_>>(), vec![id(2), id(1)]);
        assert_eq!(report.books.get(id(1)), Some("one"));
        assert_eq!(report.not_found, vec![id(3)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, id(4));
        Ok(())
    }

    #[test]
    fn uses_cache_without_network() -> Result<(), Box<dyn Error>> {
        let mut server = mockito::Server::new();
        let tmp = TempDir::new()?;
        let any = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create();
        let client = client_for(&server, &tmp)?;
        client.cache().write(id(10), "cached")?;
        let report = fetch_many(&client, &[id(10)], BatchOptions::default(), None)?;
        assert_eq!(report.books.get(id(10)), Some("cached"));
        any.assert();
        Ok(())
    }

    #[test]
    fn delays_between_attempts_but_not_after_last() -> Result<(), Box<dyn Error>> {
        let server = mockito::Server::new();
        let tmp = TempDir::new()?;
        let client = client_for(&server, &tmp)?;
        client.cache().write(id(1), "a")?;
        client.cache().write(id(2), "b")?;
        client.cache().write(id(3), "c")?;

        let delay = Duration::from_millis(150);
        let stamps: RefCell<Vec<Instant>> = RefCell::new(Vec::new());
        let on_progress = |_: usize, _: usize, _: BookId| stamps.borrow_mut().push(Instant::now());
        let started = Instant::now();
        fetch_many(
            &client,
            &[id(1), id(2), id(3)],
            BatchOptions::with_delay(delay),
            Some(&on_progress),
        )?;
        let elapsed = started.elapsed();

        let stamps = stamps.into_inner();
        assert_eq!(stamps.len(), 3);
        assert!(stamps[1] - stamps[0] >= delay);
        assert!(stamps[2] - stamps[1] >= delay);
        // Two pauses, not three.
        assert!(elapsed >= delay * 2);
        assert!(elapsed < delay * 3);
        Ok(())
    }

    #[test]
    fn progress_reports_each_attempt() -> Result<(), Box<dyn Error>> {
        let server = mockito::Server::new();
        let tmp = TempDir::new()?;
        let client = client_for(&server, &tmp)?;
        client.cache().write(id(5), "five")?;
        client.cache().write(id(6), "six")?;

        let seen: RefCell<Vec<(usize, usize, BookId)>> = RefCell::new(Vec::new());
        let on_progress =
            |n: usize, total: usize, b: BookId| seen.borrow_mut().push((n, total, b));
        fetch_many(
            &client,
            &[id(5), id(6)],
            BatchOptions::default(),
            Some(&on_progress),
        )?;
        assert_eq!(seen.into_inner(), vec![(1, 2, id(5)), (2, 2, id(6))]);
        Ok(())
    }

    #[test]
    fn force_refresh_bypasses_cache() -> Result<(), Box<dyn Error>> {
        let mut server = mockito::Server::new();
        let tmp = TempDir::new()?;
        let primary = server
            .mock("GET", "/files/10/10-0.txt")
            .with_status(200)
            .with_body("fresh")
            .expect(1)
            .create();
        let client = client_for(&server, &tmp)?;
        client.cache().write(id(10), "stale")?;
        let options = BatchOptions {
            force_refresh: true,
            ..BatchOptions::default()
        };
        let report = fetch_many(&client, &[id(10)], options, None)?;
        assert_eq!(report.books.get(id(10)), Some("fresh"));
        primary.assert();
        Ok(())
    }

    #[test]
    fn empty_id_list_is_an_empty_report() -> Result<(), Box<dyn Error>> {
        let server = mockito::Server::new();
        let tmp = TempDir::new()?;
        let client = client_for(&server, &tmp)?;
        let options = BatchOptions::with_delay(Duration::from_secs(5));
        let report = fetch_many(&client, &[], options, None)?;
        assert_eq!(report.requested, 0);
        assert!(report.books.is_empty());
        Ok(())
    }
}
