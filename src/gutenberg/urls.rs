//! URL layout of gutenberg.org downloads.

use crate::model::BookId;

pub const GUTENBERG_BASE: &str = "https://www.gutenberg.org";

/// Which rendition of a book to address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookFormat {
    Txt,
    Html,
    /// Anything else resolves to the book's landing page.
    Epub,
}

/// Normalize a configured base URL: trims whitespace and any trailing `/`.
pub fn normalize_base(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// Primary download URL for a book in the given format.
pub fn book_url(base: &str, id: BookId, format: BookFormat) -> String {
    match format {
        BookFormat::Txt => format!("{base}/files/{id}/{id}-0.txt"),
        BookFormat::Html => format!("{base}/files/{id}/{id}-h/{id}-h.htm"),
        BookFormat::Epub => metadata_url(base, id),
    }
}

/// Older plain-text layout, tried when the primary `-0.txt` file is unavailable.
pub fn alternate_txt_url(base: &str, id: BookId) -> String {
    format!("{base}/files/{id}/{id}.txt")
}

/// Landing page carrying the book's `<title>`.
pub fn metadata_url(base: &str, id: BookId) -> String {
    format!("{base}/ebooks/{id}")
}
