//! gutscrape: download Project Gutenberg books, strip license boilerplate, and write text corpora.

pub mod batch;
pub mod cache;
pub mod cli;
pub mod config;
pub mod formats;
pub mod gutenberg;
pub mod model;
pub mod normalize;

// Re-exports for CLI and consumers.
pub use batch::{fetch_many, BatchOptions, BatchReport};
pub use cache::{BookCache, CacheError};
pub use formats::{save, FormatError, OutputFormat, SaveOptions};
pub use gutenberg::{
    book_url, BookFormat, FetchError, FetchOutcome, GutenbergClient, HttpClient,
    HttpClientBuilder, TextSource,
};
pub use model::{BookId, BookMetadata, Library, OutputRecord};
pub use normalize::{clean, preprocess, strip_boilerplate};
