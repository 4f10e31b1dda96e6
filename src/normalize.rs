//! Text cleanup for corpus use: strip the Project Gutenberg license header/footer,
//! then normalize whitespace and optionally drop chapter headings.

use regex::Regex;
use std::sync::LazyLock;

/// Phrases that open the book body, in priority order. The rest of the matching line is dropped too.
pub const START_MARKERS: [&str; 3] = [
    "*** START OF THIS PROJECT GUTENBERG EBOOK",
    "*** START OF THE PROJECT GUTENBERG EBOOK",
    "*END*THE SMALL PRINT",
];

/// Phrases that open the trailing license text, in priority order.
pub const END_MARKERS: [&str; 4] = [
    "*** END OF THIS PROJECT GUTENBERG EBOOK",
    "*** END OF THE PROJECT GUTENBERG EBOOK",
    "End of the Project Gutenberg EBook",
    "End of Project Gutenberg's",
];

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        static $name: LazyLock<Regex> =
            LazyLock::new(|| Regex::new($regex).expect("valid regex"));
    };
}

regex!(EXCESS_BLANK_LINES, r"\n\s*\n\s*\n+");
regex!(CHAPTER_HEADING, r"(?m)^(CHAPTER|Chapter)\s+[IVXLCDM\d]+.*$");
regex!(HORIZONTAL_WS, r"[ \t]+");
regex!(BLANK_LINE_RUN, r"\n\s*\n");
regex!(PAGE_MARKER, r"\[Page \d+\]");

/// Remove the license header and footer, collapse runs of blank lines, and trim.
///
/// Only the first start marker (by priority) present in the text is honored, and only
/// its first occurrence; likewise for the end marker. A missing marker leaves that end
/// of the text alone.
pub fn strip_boilerplate(text: &str) -> String {
    let mut body = text;

    if let Some((marker, at)) = find_first_marker(body, &START_MARKERS) {
        let after = &body[at + marker.len()..];
        body = match after.find('\n') {
            Some(nl) => &after[nl + 1..],
            None => after,
        };
    }

    if let Some((_, at)) = find_first_marker(body, &END_MARKERS) {
        body = &body[..at];
    }

    EXCESS_BLANK_LINES
        .replace_all(body, "\n\n")
        .trim()
        .to_string()
}

fn find_first_marker<'m>(text: &str, markers: &[&'m str]) -> Option<(&'m str, usize)> {
    markers
        .iter()
        .find_map(|marker| text.find(marker).map(|at| (*marker, at)))
}

/// Normalize already-stripped text for downstream training data.
///
/// Chapter headings (`CHAPTER IV`, `Chapter 12 ...`) are blanked first when requested,
/// and `[Page N]` markers are removed before whitespace is collapsed, so neither can
/// leave behind a run of spaces or blank lines.
pub fn preprocess(text: &str, remove_chapter_headers: bool) -> String {
    let text = if remove_chapter_headers {
        CHAPTER_HEADING.replace_all(text, "")
    } else {
        text.into()
    };
    let text = PAGE_MARKER.replace_all(&text, "");
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = BLANK_LINE_RUN.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Full cleaning pipeline used by the output writers.
pub fn clean(text: &str, remove_chapter_headers: bool) -> String {
    preprocess(&strip_boilerplate(text), remove_chapter_headers)
}
