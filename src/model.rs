//! Data model shared by the fetcher, batch runner, and output writers.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Project Gutenberg book identifier. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(u32);

impl BookId {
    /// Wrap a raw identifier. Returns None for 0.
    pub fn new(id: u32) -> Option<Self> {
        if id == 0 {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BookId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let id: u32 = s
            .parse()
            .map_err(|_| format!("'{}' is not a valid book ID (expected a positive integer)", s))?;
        BookId::new(id).ok_or_else(|| "Book ID must be a positive integer, got 0".to_string())
    }
}

/// Book texts keyed by ID, in insertion order.
///
/// Inserting an ID that is already present replaces its text but keeps its position,
/// so keys are unique and the first-seen order is what the writers emit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Library {
    entries: Vec<(BookId, String)>,
}

impl Library {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: BookId, text: String) {
        match self.entries.iter_mut().find(|(existing, _)| *existing == id) {
            Some(entry) => entry.1 = text,
            None => self.entries.push((id, text)),
        }
    }

    pub fn get(&self, id: BookId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| *existing == id)
            .map(|(_, text)| text.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = BookId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BookId, &str)> + '_ {
        self.entries.iter().map(|(id, text)| (*id, text.as_str()))
    }

    /// Apply `f` to every text, keeping IDs and order.
    pub fn map_texts(&self, f: impl Fn(&str) -> String) -> Library {
        Library {
            entries: self
                .entries
                .iter()
                .map(|(id, text)| (*id, f(text)))
                .collect(),
        }
    }
}

impl FromIterator<(BookId, String)> for Library {
    fn from_iter<I: IntoIterator<Item = (BookId, String)>>(iter: I) -> Self {
        let mut library = Library::new();
        for (id, text) in iter {
            library.insert(id, text);
        }
        library
    }
}

/// Serializes as a JSON object `{"<id>": "<text>", ...}` in insertion order.
impl Serialize for Library {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, text) in &self.entries {
            map.serialize_entry(id, text)?;
        }
        map.end()
    }
}

/// One JSON Lines row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputRecord<'a> {
    pub book_id: BookId,
    #[serde(borrow)]
    pub text: std::borrow::Cow<'a, str>,
}

/// Best-effort metadata scraped from a book's landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub book_id: BookId,
    pub url: String,
    pub title: Option<String>,
}
