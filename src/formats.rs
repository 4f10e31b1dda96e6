//! Corpus output formats: one JSON object, JSON Lines, or banner-delimited plain text.

use crate::model::{Library, OutputRecord};
use crate::normalize;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

const BANNER_WIDTH: usize = 80;

/// Output format selector for the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Jsonl,
    Txt,
}

impl OutputFormat {
    pub fn label(self) -> &'static str {
        match self {
            OutputFormat::Json => "JSON",
            OutputFormat::Jsonl => "JSONL",
            OutputFormat::Txt => "TXT",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" => Ok(OutputFormat::Jsonl),
            "txt" => Ok(OutputFormat::Txt),
            _ => Err(format!(
                "Invalid --format value: '{}'. Use json, jsonl, or txt.",
                s
            )),
        }
    }
}

/// Errors from the output writers.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Failed to write output: {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode JSON for {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Options controlling how texts are prepared before writing.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveOptions {
    /// Strip boilerplate and normalize whitespace first.
    pub clean: bool,
    /// When cleaning, also blank out chapter heading lines.
    pub remove_chapter_headers: bool,
}

/// Write `books` to `path` in `format`. Returns the number of records written.
pub fn save(
    books: &Library,
    path: &Path,
    format: OutputFormat,
    options: SaveOptions,
) -> Result<usize, FormatError> {
    let cleaned;
    let books = if options.clean {
        cleaned = books.map_texts(|text| normalize::clean(text, options.remove_chapter_headers));
        &cleaned
    } else {
        books
    };

    let file = File::create(path).map_err(|e| io_err(path, e))?;
    let mut w = BufWriter::new(file);
    match format {
        OutputFormat::Json => write_json(books, &mut w, path)?,
        OutputFormat::Jsonl => write_jsonl(books, &mut w, path)?,
        OutputFormat::Txt => write_txt(books, &mut w).map_err(|e| io_err(path, e))?,
    }
    w.flush().map_err(|e| io_err(path, e))?;

    tracing::info!(
        path = %path.display(),
        books = books.len(),
        format = format.label(),
        "Saved books"
    );
    Ok(books.len())
}

fn io_err(path: &Path, source: std::io::Error) -> FormatError {
    FormatError::Io {
        path: path.to_path_buf(),
        source,
    }
}

fn json_err(path: &Path, source: serde_json::Error) -> FormatError {
    if source.is_io() {
        io_err(path, source.into())
    } else {
        FormatError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Pretty JSON object keyed by book ID, two-space indent, non-ASCII left as-is.
fn write_json<W: Write>(books: &Library, w: &mut W, path: &Path) -> Result<(), FormatError> {
    let mut ser = serde_json::Serializer::with_formatter(
        &mut *w,
        serde_json::ser::PrettyFormatter::with_indent(b"  "),
    );
    books.serialize(&mut ser).map_err(|e| json_err(path, e))?;
    Ok(())
}

/// Single-line JSON with `", "` and `": "` separators.
struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> std::io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> std::io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(b": ")
    }
}

fn write_jsonl<W: Write>(books: &Library, w: &mut W, path: &Path) -> Result<(), FormatError> {
    for (book_id, text) in books.iter() {
        let record = OutputRecord {
            book_id,
            text: text.into(),
        };
        let mut ser = serde_json::Serializer::with_formatter(&mut *w, SpacedFormatter);
        record.serialize(&mut ser).map_err(|e| json_err(path, e))?;
        w.write_all(b"\n").map_err(|e| io_err(path, e))?;
    }
    Ok(())
}

fn write_txt<W: Write>(books: &Library, w: &mut W) -> std::io::Result<()> {
    let rule = "=".repeat(BANNER_WIDTH);
    for (book_id, text) in books.iter() {
        writeln!(w)?;
        writeln!(w, "{}", rule)?;
        writeln!(w, "BOOK ID: {}", book_id)?;
        writeln!(w, "{}", rule)?;
        writeln!(w)?;
        w.write_all(text.as_bytes())?;
        writeln!(w)?;
        writeln!(w)?;
    }
    Ok(())
}
