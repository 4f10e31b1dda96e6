//! CLI parsing and orchestration. Parses args, downloads books through the cache,
//! writes JSON, JSON Lines, or text. Maps fatal errors to exit codes.

use crate::batch::{fetch_many, BatchOptions, DEFAULT_DELAY_SECS};
use crate::cache::{BookCache, CacheError};
use crate::config;
use crate::formats::{save, FormatError, OutputFormat, SaveOptions};
use crate::gutenberg::{GutenbergClient, HttpClient, DEFAULT_TIMEOUT_SECS, GUTENBERG_BASE};
use crate::model::BookId;
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OUTPUT: &str = "gutenberg_books.json";
pub const DEFAULT_CACHE_DIR: &str = "gutenberg_cache";

/// Fatal CLI error carrying an exit code. Per-book download failures are not errors.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Format(#[from] FormatError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Cache(_) => 2,
            CliRunError::Format(_) => 3,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Filter directive, keeping HTML-parsing crates quiet at debug/trace.
    pub fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug,selectors=warn,html5ever=warn",
            LogLevel::Trace => "trace,selectors=warn,html5ever=warn",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gutscrape")]
#[command(about = "Download Project Gutenberg books and write a cleaned text corpus")]
#[command(
    after_help = "Config file keys (cache_dir, base_url, user_agent, timeout_secs, request_delay_secs) are read from ./gutscrape.toml or the user config dir. CLI flags override config."
)]
pub struct Args {
    /// Project Gutenberg book IDs to download.
    #[arg(required = true, num_args = 1.., value_parser = parse_book_id)]
    pub book_ids: Vec<BookId>,

    /// Output file path.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    pub output: PathBuf,

    /// Output format: json, jsonl, or txt.
    #[arg(short, long, default_value = "json", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Skip text cleaning and preprocessing.
    #[arg(long)]
    pub no_clean: bool,

    /// Also blank out chapter heading lines (CHAPTER IV, Chapter 12) while cleaning.
    #[arg(long)]
    pub remove_chapter_headers: bool,

    /// Directory for caching downloaded books (overrides config; default gutenberg_cache).
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Delay between downloads in seconds (overrides config; default 2.0).
    #[arg(long, value_parser = parse_delay)]
    pub delay: Option<f64>,

    /// Re-download books even if they are cached.
    #[arg(long)]
    pub force_refresh: bool,

    /// After downloading, look up and print each book's title.
    #[arg(long)]
    pub titles: bool,

    /// Gutenberg site or mirror root (overrides config).
    #[arg(long)]
    pub base_url: Option<String>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30). Must be positive.
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<u64>,

    /// Suppress progress output (errors and final summary only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print verbose error chain.
    #[arg(long)]
    pub verbose: bool,

    /// Log level: error, warn, info, debug, trace. RUST_LOG takes precedence.
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,
}

impl Args {
    /// Effective log level: explicit flag, else `error` when quiet, else `warn`.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or(if self.quiet {
            LogLevel::Error
        } else {
            LogLevel::Warn
        })
    }
}

fn parse_book_id(s: &str) -> Result<BookId, String> {
    s.parse()
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse()
}

fn parse_delay(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid --delay: '{}' is not a number of seconds", s))?;
    delay_duration(secs)?;
    Ok(secs)
}

/// Validate a delay in seconds. Rejects negative, NaN, and infinite values.
fn delay_duration(secs: f64) -> Result<Duration, String> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| format!("Invalid delay: {} (expected a non-negative number of seconds)", secs))
}

fn parse_timeout(s: &str) -> Result<u64, String> {
    let secs: u64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid --timeout: '{}' is not a whole number of seconds", s))?;
    check_timeout(secs)
}

/// A zero timeout makes every request fail immediately.
fn check_timeout(secs: u64) -> Result<u64, String> {
    if secs == 0 {
        return Err("Invalid timeout: 0 (expected a positive number of seconds)".to_string());
    }
    Ok(secs)
}

/// Settings after merging CLI flags, config file, and defaults.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    cache_dir: PathBuf,
    base_url: String,
    user_agent: Option<String>,
    timeout_secs: u64,
    delay: Duration,
}

fn resolve_settings(args: &Args, config: Option<&config::Config>) -> Result<Settings, CliRunError> {
    let cache_dir = args
        .cache_dir
        .clone()
        .or_else(|| config.and_then(|c| c.cache_dir.clone()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CACHE_DIR));
    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.and_then(|c| c.base_url.clone()))
        .unwrap_or_else(|| GUTENBERG_BASE.to_string());
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.and_then(|c| c.user_agent.clone()));
    let timeout_secs = args
        .timeout
        .or_else(|| config.and_then(|c| c.timeout_secs))
        .unwrap_or(DEFAULT_TIMEOUT_SECS);
    let timeout_secs = check_timeout(timeout_secs).map_err(CliRunError::InvalidInput)?;
    let delay_secs = args
        .delay
        .or_else(|| config.and_then(|c| c.request_delay_secs))
        .unwrap_or(DEFAULT_DELAY_SECS);
    let delay = delay_duration(delay_secs).map_err(CliRunError::InvalidInput)?;
    Ok(Settings {
        cache_dir,
        base_url,
        user_agent,
        timeout_secs,
        delay,
    })
}

/// Entry point for the CLI. Returns Ok(()) on success, including partial success.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref())?;

    let mut builder = HttpClient::builder().timeout_secs(settings.timeout_secs);
    if let Some(ref ua) = settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    let http = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;
    let cache = BookCache::new(&settings.cache_dir)?;
    let client = GutenbergClient::new(http, cache).with_base_url(&settings.base_url);

    let total = args.book_ids.len();
    if !args.quiet {
        eprintln!("Starting download of {} books...", total);
    }

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let progress_cb = |n: usize, total: usize, id: BookId| {
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| new_progress_bar(total as u64));
        pb.set_position(n as u64);
        pb.set_message(format!("Book {} ({}/{})", id, n, total));
    };
    let progress: Option<&dyn Fn(usize, usize, BookId)> =
        if args.quiet { None } else { Some(&progress_cb) };

    let options = BatchOptions {
        delay: settings.delay,
        force_refresh: args.force_refresh,
    };
    let report = fetch_many(&client, &args.book_ids, options, progress)?;

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.finish_and_clear();
    }

    for id in &report.not_found {
        eprintln!("Book {} not found at {}", id, client.base_url());
    }
    for (id, e) in &report.failed {
        eprintln!("Failed to download book {}: {}", id, e);
    }

    if report.books.is_empty() {
        eprintln!("No books were successfully downloaded");
        return Ok(());
    }

    let save_opts = SaveOptions {
        clean: !args.no_clean,
        remove_chapter_headers: args.remove_chapter_headers,
    };
    let written = save(&report.books, &args.output, args.format, save_opts)?;
    if !args.quiet {
        eprintln!(
            "Saved {} books to {} ({} format)",
            written,
            args.output.display(),
            args.format.label()
        );
    }

    if args.titles {
        print_titles(&client, &report.books.ids().collect::<Vec<_>>(), settings.delay);
    }

    eprintln!(
        "Successfully processed {} out of {} books",
        report.books.len(),
        report.requested
    );
    Ok(())
}

fn new_progress_bar(total: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(total);
    if let Ok(style) = indicatif::ProgressStyle::default_bar()
        .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
    {
        bar.set_style(
            style
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
    }
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Print `<id>: <title>` for each book. Lookup failures are reported and skipped.
fn print_titles(client: &GutenbergClient, ids: &[BookId], delay: Duration) {
    for (i, &id) in ids.iter().enumerate() {
        match client.metadata(id) {
            Ok(meta) => println!(
                "{}: {}",
                id,
                meta.title.as_deref().unwrap_or("(untitled)")
            ),
            Err(e) => {
                tracing::warn!(book_id = %id, error = %e, "Title lookup failed");
                eprintln!("Could not fetch title for book {}: {}", id, e);
            }
        }
        if i + 1 < ids.len() && !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("gutscrape").chain(argv.iter().copied()))
    }

    #[test]
    fn defaults() -> Result<(), Box<dyn Error>> {
        let args = parse(&["1342"])?;
        assert_eq!(args.book_ids, vec![BookId::new(1342).ok_or("zero")?]);
        assert_eq!(args.output, PathBuf::from(DEFAULT_OUTPUT));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(!args.no_clean);
        assert!(!args.force_refresh);
        assert!(args.cache_dir.is_none());
        assert!(args.delay.is_none());
        assert_eq!(args.effective_log_level(), LogLevel::Warn);
        Ok(())
    }

    #[test]
    fn all_flags() -> Result<(), Box<dyn Error>> {
        let args = parse(&[
            "1342",
            "11",
            "84",
            "-o",
            "out.jsonl",
            "-f",
            "jsonl",
            "--no-clean",
            "--cache-dir",
            "c",
            "--delay",
            "0.25",
            "--force-refresh",
            "--remove-chapter-headers",
            "--titles",
            "-q",
            "--log-level",
            "debug",
        ])?;
        assert_eq!(args.book_ids.len(), 3);
        assert_eq!(args.output, PathBuf::from("out.jsonl"));
        assert_eq!(args.format, OutputFormat::Jsonl);
        assert!(args.no_clean);
        assert_eq!(args.cache_dir, Some(PathBuf::from("c")));
        assert_eq!(args.delay, Some(0.25));
        assert!(args.force_refresh && args.remove_chapter_headers && args.titles);
        assert_eq!(args.effective_log_level(), LogLevel::Debug);
        Ok(())
    }

    #[test]
    fn quiet_lowers_default_log_level() -> Result<(), Box<dyn Error>> {
        assert_eq!(parse(&["1", "-q"])?.effective_log_level(), LogLevel::Error);
        Ok(())
    }

    #[test]
    fn requires_at_least_one_id() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn rejects_bad_ids_formats_and_delays() {
        assert!(parse(&["0"]).is_err());
        assert!(parse(&["abc"]).is_err());
        assert!(parse(&["1", "-f", "epub"]).is_err());
        assert!(parse(&["1", "--delay", "-1"]).is_err());
        assert!(parse(&["1", "--delay", "soon"]).is_err());
        assert!(parse(&["1", "--delay", "NaN"]).is_err());
    }

    #[test]
    fn parse_delay_accepts_fractions() {
        assert_eq!(parse_delay("0").unwrap(), 0.0);
        assert_eq!(parse_delay("1.5").unwrap(), 1.5);
    }

    #[test]
    fn settings_precedence_cli_then_config_then_default() -> Result<(), Box<dyn Error>> {
        let config = config::Config {
            cache_dir: Some(PathBuf::from("from_config")),
            base_url: Some("https://mirror.example".to_string()),
            user_agent: None,
            timeout_secs: Some(45),
            request_delay_secs: Some(0.5),
        };

        let args = parse(&["1"])?;
        let s = resolve_settings(&args, None)?;
        assert_eq!(s.cache_dir, PathBuf::from(DEFAULT_CACHE_DIR));
        assert_eq!(s.base_url, GUTENBERG_BASE);
        assert_eq!(s.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(s.delay, Duration::from_secs(2));
        assert!(s.user_agent.is_none());

        let s = resolve_settings(&args, Some(&config))?;
        assert_eq!(s.cache_dir, PathBuf::from("from_config"));
        assert_eq!(s.base_url, "https://mirror.example");
        assert_eq!(s.timeout_secs, 45);
        assert_eq!(s.delay, Duration::from_millis(500));

        let args = parse(&[
            "1",
            "--cache-dir",
            "from_cli",
            "--delay",
            "0",
            "--timeout",
            "5",
            "--user-agent",
            "ua/1",
        ])?;
        let s = resolve_settings(&args, Some(&config))?;
        assert_eq!(s.cache_dir, PathBuf::from("from_cli"));
        assert_eq!(s.delay, Duration::ZERO);
        assert_eq!(s.timeout_secs, 5);
        assert_eq!(s.user_agent.as_deref(), Some("ua/1"));
        Ok(())
    }

    #[test]
    fn negative_delay_in_config_is_invalid_input() -> Result<(), Box<dyn Error>> {
        let config = config::Config {
            request_delay_secs: Some(-3.0),
            ..config::Config::default()
        };
        let err = resolve_settings(&parse(&["1"])?, Some(&config))
            .err()
            .ok_or("expected error")?;
        assert_eq!(err.exit_code(), 1);
        Ok(())
    }

    #[test]
    fn zero_timeout_is_invalid_input() -> Result<(), Box<dyn Error>> {
        assert!(parse(&["1", "--timeout", "0"]).is_err());
        assert!(parse(&["1", "--timeout", "-5"]).is_err());
        assert_eq!(parse(&["1", "--timeout", "1"])?.timeout, Some(1));

        let config = config::Config {
            timeout_secs: Some(0),
            ..config::Config::default()
        };
        let err = resolve_settings(&parse(&["1"])?, Some(&config))
            .err()
            .ok_or("expected error")?;
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("timeout"));

        // A valid CLI value overrides the bad config value.
        let s = resolve_settings(&parse(&["1", "--timeout", "10"])?, Some(&config))?;
        assert_eq!(s.timeout_secs, 10);
        Ok(())
    }

    #[test]
    fn cli_run_error_exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        let cache_err = CacheError::Write {
            path: PathBuf::from("c/book_1.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(CliRunError::Cache(cache_err).exit_code(), 2);
        let format_err = FormatError::Io {
            path: PathBuf::from("out.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(CliRunError::Format(format_err).exit_code(), 3);
    }

    #[test]
    fn log_level_directives() {
        assert_eq!(LogLevel::Warn.directive(), "warn");
        assert!(LogLevel::Debug.directive().starts_with("debug"));
    }
}
