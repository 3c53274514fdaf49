//! Single pass over a question chunk that locates every structural marker.
//!
//! The decoder never searches the text again after this: it slices between
//! the positions recorded here.

use crate::model::OptionLetter;
use crate::parser::markers::{
    option_index, standalone_letter, ANSWER_RE, DESIGNATION_RE, EXPLANATION_RE, OPTION_DOT_RE,
    QUESTION_RE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Number,
    /// `line_start` markers are trusted; the others are embedded in running
    /// text and only used to recover options that are otherwise missing.
    Option { letter: OptionLetter, line_start: bool },
    Answer { designated: Option<OptionLetter> },
    Explanation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub kind: MarkerKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone)]
pub struct MarkerScan {
    number: Option<String>,
    markers: Vec<Marker>,
}

impl MarkerScan {
    /// Question number captured from the first number marker.
    pub fn number(&self) -> Option<&str> {
        self.number.as_deref()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn number_marker(&self) -> Option<&Marker> {
        self.markers.iter().find(|m| m.kind == MarkerKind::Number)
    }

    pub fn options(&self) -> impl Iterator<Item = (OptionLetter, bool, &Marker)> {
        self.markers.iter().filter_map(|m| match m.kind {
            MarkerKind::Option { letter, line_start } => Some((letter, line_start, m)),
            _ => None,
        })
    }

    pub fn answers(&self) -> impl Iterator<Item = (Option<OptionLetter>, &Marker)> {
        self.markers.iter().filter_map(|m| match m.kind {
            MarkerKind::Answer { designated } => Some((designated, m)),
            _ => None,
        })
    }

    pub fn first_explanation(&self) -> Option<&Marker> {
        self.markers.iter().find(|m| m.kind == MarkerKind::Explanation)
    }
}

/// Locates all markers in `text`, sorted by position.
pub fn scan(text: &str, option_count: usize) -> MarkerScan {
    let mut markers = Vec::new();
    let mut number = None;

    if let Some(caps) = QUESTION_RE.captures(text) {
        if let (Some(whole), Some(digits)) = (caps.get(0), caps.get(1)) {
            number = Some(digits.as_str().to_string());
            markers.push(Marker {
                kind: MarkerKind::Number,
                start: whole.start(),
                end: whole.end(),
            });
        }
    }

    for m in OPTION_DOT_RE.find_iter(text) {
        let Some(index) = option_index(m.as_str(), option_count) else {
            continue;
        };
        let followed_by_space = text[m.end()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace);
        if !followed_by_space || !standalone_letter(text, m.start()) {
            continue;
        }
        let Some(letter) = OptionLetter::from_index(index) else {
            continue;
        };
        markers.push(Marker {
            kind: MarkerKind::Option {
                letter,
                line_start: at_line_start(text, m.start()),
            },
            start: m.start(),
            end: m.end(),
        });
    }

    for m in ANSWER_RE.find_iter(text) {
        let rest = &text[m.end()..];
        let designation = DESIGNATION_RE.captures(rest).and_then(|caps| {
            let letter = caps.get(1)?;
            let c = letter.as_str().chars().next()?;
            Some((OptionLetter::from_char(c)?, m.end() + letter.end()))
        });
        markers.push(Marker {
            kind: MarkerKind::Answer {
                designated: designation.map(|(letter, _)| letter),
            },
            start: m.start(),
            end: designation.map_or(m.end(), |(_, end)| end),
        });
    }

    for m in EXPLANATION_RE.find_iter(text) {
        markers.push(Marker {
            kind: MarkerKind::Explanation,
            start: m.start(),
            end: m.end(),
        });
    }

    markers.sort_by_key(|m| m.start);
    MarkerScan { number, markers }
}

fn at_line_start(text: &str, pos: usize) -> bool {
    text[..pos]
        .rsplit('\n')
        .next()
        .map_or(true, |line| line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(scan: &MarkerScan) -> Vec<String> {
        scan.markers()
            .iter()
            .map(|m| match m.kind {
                MarkerKind::Number => "N".to_string(),
                MarkerKind::Option { letter, line_start } => {
                    format!("{}{}", letter, if line_start { "" } else { "~" })
                }
                MarkerKind::Answer { designated: Some(l) } => format!("ans:{l}"),
                MarkerKind::Answer { designated: None } => "ans".to_string(),
                MarkerKind::Explanation => "exp".to_string(),
            })
            .collect()
    }

    #[test]
    fn finds_markers_in_document_order() {
        let chunk = "Question 4 Pick one?\nA. alpha\nCorrect answer\nB. beta C. gamma\nD. delta\nOverall explanation because";
        let scan = scan(chunk, 4);
        assert_eq!(scan.number(), Some("4"));
        assert_eq!(kinds(&scan), ["N", "A", "ans", "B", "C~", "D", "exp"]);
    }

    #[test]
    fn explicit_designation_is_captured() {
        let chunk = "Question 9 Stem\nA. x\nB. y\nCorrect answer: B\nExplanation: z";
        let scan = scan(chunk, 4);
        let (designated, marker) = scan.answers().next().unwrap();
        assert_eq!(designated.map(|l| l.as_char()), Some('B'));
        assert_eq!(&chunk[marker.start..marker.end], "Correct answer: B");
    }

    #[test]
    fn letters_beyond_option_count_are_ignored() {
        let scan = scan("Question 1 Stem\nA. x\nE. y", 4);
        assert_eq!(kinds(&scan), ["N", "A"]);
    }

    #[test]
    fn no_number_marker() {
        let scan = scan("A. orphan option", 4);
        assert!(scan.number().is_none());
        assert!(scan.number_marker().is_none());
    }
}
