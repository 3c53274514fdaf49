use std::sync::LazyLock;

use regex::Regex;

pub(crate) static QUESTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Question\s*(\d+)").unwrap());
pub(crate) static OPTION_DOT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Z]\.").unwrap());
pub(crate) static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Correct [Aa]nswer").unwrap());
/// Applied right after an answer marker: `: B`, ` C` on the same line, not followed by a dot.
pub(crate) static DESIGNATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*:?[ \t]*([A-Z])(?:$|[^A-Za-z0-9.])").unwrap());
pub(crate) static EXPLANATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Overall [Ee]xplanation:?|Explanation:").unwrap());
pub(crate) static SECTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Correct [Aa]nswer|Overall [Ee]xplanation|Explanation:").unwrap());
pub(crate) static PAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"PAGE\d+").unwrap());
pub(crate) static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// Looser forms, for markers left inside option text.
pub(crate) static LOOSE_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)correct\s*answer").unwrap());
pub(crate) static LOOSE_EXPLANATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)overall\s*explanation:?|explanation:").unwrap());

/// A letter counts as an option marker only when it is not glued to the
/// end of a word ("VPC. Then" is prose). Digits do not glue: extraction
/// often drops the break in "Amazon EC2C. AWS Lambda".
pub(crate) fn standalone_letter(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map_or(true, |c| !c.is_alphabetic())
}

/// Letter index for an `X.` match, if it falls inside the option range.
pub(crate) fn option_index(marker: &str, option_count: usize) -> Option<usize> {
    let index = (marker.as_bytes().first()? - b'A') as usize;
    (index < option_count).then_some(index)
}

/// Field text as stored: page markers removed, whitespace collapsed, trimmed.
pub(crate) fn tidy(text: &str) -> String {
    let text = PAGE_RE.replace_all(text, " ");
    WHITESPACE_RE.replace_all(text.trim(), " ").trim().to_string()
}
