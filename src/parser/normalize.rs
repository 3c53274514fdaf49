use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::Settings;
use crate::error::Result;
use crate::parser::markers::{
    option_index, standalone_letter, OPTION_DOT_RE, QUESTION_RE, SECTION_RE, WHITESPACE_RE,
};

static BLANK_LINES_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n\s*\n+").unwrap());
static CASE_BOUNDARY_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"([a-z])([A-Z])").unwrap());
static SPACED_PUNCT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" ([.,])").unwrap());

/// Marker phrases that PDF extraction commonly emits without their space.
const MERGED_MARKERS: &[(&str, &str)] = &[
    ("Correctanswer", "Correct answer"),
    ("Overallexplanation", "Overall explanation"),
];

/// Text repair applied to raw extracted text before segmentation, and to
/// single fields when records are re-cleaned.
#[derive(Debug, Clone)]
pub struct Normalizer {
    brand_re: Option<Regex>,
    option_count: usize,
}

impl Normalizer {
    pub fn new(brand_prefixes: &[String], option_count: usize) -> Result<Self> {
        let brand_re = if brand_prefixes.is_empty() {
            None
        } else {
            let alternatives = brand_prefixes
                .iter()
                .map(|p| regex::escape(p))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"\b({alternatives})([A-Z])"))?)
        };
        Ok(Normalizer {
            brand_re,
            option_count,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Normalizer::new(&settings.brand_prefixes, settings.expected_options)
    }

    /// Rules run in a fixed order. The result is single-line text except for
    /// the line breaks forced in front of question, option, answer and
    /// explanation markers.
    pub fn normalize(&self, raw: &str) -> String {
        let text = BLANK_LINES_RE.replace_all(raw, "\n");
        let text = WHITESPACE_RE.replace_all(text.trim(), " ");
        let mut text = self.repair_words(&text);
        for (merged, spaced) in MERGED_MARKERS {
            text = text.replace(merged, spaced);
        }
        let text = break_before_questions(&text);
        let text = self.space_option_markers(&text);
        let text = self.break_before_options(&text);
        break_before_sections(&text)
    }

    /// Splits words glued by extraction: lower→upper transitions and the
    /// configured brand prefixes ("AWSLambda" → "AWS Lambda").
    pub fn repair_words(&self, text: &str) -> String {
        let text = CASE_BOUNDARY_RE.replace_all(text, "$1 $2");
        match &self.brand_re {
            Some(re) => re.replace_all(&text, "$1 $2").into_owned(),
            None => text.into_owned(),
        }
    }

    /// Cleans one stored field: single-line, no space before `.`/`,`, merged
    /// words repaired.
    pub fn clean_field(&self, text: &str) -> String {
        let text = WHITESPACE_RE.replace_all(text.trim(), " ");
        let text = SPACED_PUNCT_RE.replace_all(&text, "$1");
        self.repair_words(&text).trim().to_string()
    }

    /// `A.Storage` → `A. Storage`, for standalone option letters only.
    fn space_option_markers(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 16);
        let mut last = 0;
        for m in OPTION_DOT_RE.find_iter(text) {
            if option_index(m.as_str(), self.option_count).is_none()
                || !standalone_letter(text, m.start())
            {
                continue;
            }
            let glued = text[m.end()..]
                .chars()
                .next()
                .is_some_and(|c| !c.is_whitespace() && c != '.');
            if glued {
                out.push_str(&text[last..m.end()]);
                out.push(' ');
                last = m.end();
            }
        }
        out.push_str(&text[last..]);
        out
    }

    fn break_before_options(&self, text: &str) -> String {
        let spans = OPTION_DOT_RE.find_iter(text).filter_map(|m| {
            let spaced = text[m.end()..].chars().next().map_or(true, char::is_whitespace);
            let is_marker = option_index(m.as_str(), self.option_count).is_some()
                && standalone_letter(text, m.start())
                && spaced;
            is_marker.then(|| (m.range(), Cow::Borrowed(m.as_str())))
        });
        break_before(text, spans)
    }
}

fn break_before_questions(text: &str) -> String {
    let spans = QUESTION_RE.captures_iter(text).filter_map(|caps| {
        let whole = caps.get(0)?;
        let number = caps.get(1)?;
        Some((whole.range(), Cow::Owned(format!("Question {}", number.as_str()))))
    });
    break_before(text, spans)
}

fn break_before_sections(text: &str) -> String {
    let spans = SECTION_RE
        .find_iter(text)
        .map(|m| (m.range(), Cow::Borrowed(m.as_str())));
    break_before(text, spans)
}

/// Rebuilds `text` with each span replaced by its rendering and moved to the
/// start of a line. Spaces left dangling before an inserted break are dropped,
/// so running the rules twice gives the same text.
fn break_before<'t>(text: &'t str, spans: impl IntoIterator<Item = (Range<usize>, Cow<'t, str>)>) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 32);
    let mut last = 0;
    for (range, rendered) in spans {
        out.push_str(&text[last..range.start]);
        let kept = out.trim_end_matches([' ', '\t']).len();
        out.truncate(kept);
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&rendered);
        last = range.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::from_settings(&Settings::default()).unwrap()
    }

    #[test]
    fn end_to_end_sample() {
        let raw = "Question 1 What is S3?A.Storage Correctanswer B.Compute Overallexplanation S3 is storage.";
        assert_eq!(
            normalizer().normalize(raw),
            "Question 1 What is S3?\nA. Storage\nCorrect answer\nB. Compute\nOverall explanation S3 is storage."
        );
    }

    #[test]
    fn collapses_whitespace_and_blank_lines() {
        let raw = "  \n\nQuestion   7\n\n\n  Which   one?\n\nA.  x \t\n B. y  \n\n";
        assert_eq!(normalizer().normalize(raw), "Question 7 Which one?\nA. x\nB. y");
    }

    #[test]
    fn splits_merged_words_and_brand_prefixes() {
        let n = normalizer();
        assert_eq!(n.repair_words("UseAWSLambda withAmazonS3"), "Use AWS Lambda with Amazon S3");
        assert_eq!(n.repair_words("AWSWAF blocksRequests"), "AWS WAF blocks Requests");
    }

    #[test]
    fn canonicalizes_question_markers() {
        let out = normalizer().normalize("intro textQuestion12 stem A. a");
        assert_eq!(out, "intro text\nQuestion 12 stem\nA. a");
    }

    #[test]
    fn glued_letters_stay_in_prose() {
        let out = normalizer().normalize("Question 2 Put it in a VPC. Then what? A. x B. y");
        assert_eq!(out, "Question 2 Put it in a VPC. Then what?\nA. x\nB. y");
    }

    #[test]
    fn letters_past_the_option_range_are_not_markers() {
        let out = normalizer().normalize("Question 3 Stem E. not an option A. x");
        assert_eq!(out, "Question 3 Stem E. not an option\nA. x");
    }

    #[test]
    fn explanation_forms_get_their_own_line() {
        let out = normalizer().normalize("Question 1 s A. a Explanation: because Overall Explanation: more");
        assert_eq!(out, "Question 1 s\nA. a\nExplanation: because\nOverall Explanation: more");
    }

    #[test]
    fn normalizing_twice_changes_nothing() {
        let n = normalizer();
        let raw = "PAGE1\nPRACTICE QUESTIONS\nQuestion 1 What is S3?A.Storage Correctanswer B.Compute\n\nC.Queue D.  Cache Overallexplanation S3 is storage.\nPAGE2\nQuestion2 Which AWSservice runs code? A. Lambda B. S3 Correct answer: A";
        let once = n.normalize(raw);
        assert_eq!(n.normalize(&once), once);
        assert_eq!(once.matches("Question ").count(), 2);
        assert_eq!(once.matches("Correct answer").count(), 2);
    }

    #[test]
    fn empty_input() {
        assert_eq!(normalizer().normalize(""), "");
        assert_eq!(normalizer().normalize(" \n\n \t"), "");
    }

    #[test]
    fn clean_field_tightens_punctuation() {
        assert_eq!(
            normalizer().clean_field("  S3 is\nstorage ,  mostly . "),
            "S3 is storage, mostly."
        );
    }
}
