use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::parser::markers::QUESTION_RE;

static LINE_OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*[A-Z]\.(?:\s|$)").unwrap());
static LEADING_OPTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[A-Z]\.(?:\s|$)").unwrap());

/// Text of one question, from its `Question <n>` marker up to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionChunk<'a> {
    pub number: &'a str,
    pub text: &'a str,
}

#[derive(Debug, Clone)]
pub struct Segmenter {
    intro_re: Option<Regex>,
}

impl Segmenter {
    /// `intro_marker` is the heading before the question section, matched
    /// case-insensitively. Empty disables intro detection.
    pub fn new(intro_marker: &str) -> Result<Self> {
        let intro_re = if intro_marker.trim().is_empty() {
            None
        } else {
            Some(Regex::new(&format!(
                r"(?i)\b{}\s*(?:\n|Question)",
                regex::escape(intro_marker.trim())
            ))?)
        };
        Ok(Segmenter { intro_re })
    }

    /// The part of `text` that chunks are cut from: everything from the first
    /// question marker after the intro heading (if any).
    pub fn searched_region<'a>(&self, text: &'a str) -> &'a str {
        let text = match self.intro_start(text) {
            Some(start) => &text[start..],
            None => text,
        };
        match QUESTION_RE.find(text) {
            Some(m) => &text[m.start()..],
            None => "",
        }
    }

    /// First heading match that is not part of a question. The word also
    /// shows up in stems ("Answer both questions"), where it is followed by
    /// options or sits after a question marker whose options already began.
    fn intro_start(&self, text: &str) -> Option<usize> {
        let re = self.intro_re.as_ref()?;
        re.find_iter(text)
            .find(|m| !inside_question(text, m.start(), m.end()))
            .map(|m| m.start())
    }

    /// Splits at every question marker. The marker stays at the start of its
    /// chunk and the last chunk runs to the end of the text.
    pub fn split<'a>(&self, text: &'a str) -> Vec<QuestionChunk<'a>> {
        let region = self.searched_region(text);
        let starts: Vec<(usize, &'a str)> = QUESTION_RE
            .captures_iter(region)
            .filter_map(|caps| Some((caps.get(0)?.start(), caps.get(1)?.as_str())))
            .collect();

        starts
            .iter()
            .enumerate()
            .map(|(i, &(start, number))| {
                let end = starts.get(i + 1).map_or(region.len(), |&(next, _)| next);
                QuestionChunk {
                    number,
                    text: &region[start..end],
                }
            })
            .collect()
    }
}

fn inside_question(text: &str, start: usize, end: usize) -> bool {
    if LEADING_OPTION_RE.is_match(&text[end..]) {
        return true;
    }
    let before = &text[..start];
    QUESTION_RE
        .find_iter(before)
        .last()
        .is_some_and(|q| LINE_OPTION_RE.is_match(&before[q.end()..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segmenter() -> Segmenter {
        Segmenter::new("QUESTIONS").unwrap()
    }

    #[test]
    fn one_chunk_per_marker_and_nothing_lost() {
        let text = "Cover page\nQuestion 1 a\nA. x\nQuestion 2 b\nA. y\nQuestion 5 c\nA. z";
        let s = segmenter();
        let chunks = s.split(text);

        let numbers: Vec<&str> = chunks.iter().map(|c| c.number).collect();
        assert_eq!(numbers, ["1", "2", "5"]);
        for chunk in &chunks {
            assert!(chunk.text.starts_with(&format!("Question {}", chunk.number)));
        }
        let joined: String = chunks.iter().map(|c| c.text).collect();
        assert_eq!(joined, s.searched_region(text));
        assert_eq!(joined, &text[text.find("Question 1").unwrap()..]);
    }

    #[test]
    fn last_chunk_is_kept() {
        let chunks = segmenter().split("Question 9 only one\nA. x");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Question 9 only one\nA. x");
    }

    #[test]
    fn no_markers_no_chunks() {
        assert!(segmenter().split("just some text").is_empty());
        assert!(segmenter().split("").is_empty());
    }

    #[test]
    fn intro_heading_cuts_table_of_contents() {
        let text = "Contents Question 1 ....... 3 Question 2 ....... 4\nPractice Questions\nQuestion 1 real\nA. x\nQuestion 2 real\nA. y";
        let chunks = segmenter().split(text);
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.text.contains("real")));
    }

    #[test]
    fn heading_word_inside_a_stem_keeps_earlier_questions() {
        let text = "Question 1 Which is storage?\nA. S3\nCorrect answer\nB. EC2\nQuestion 2 Answer both questions\nA. x\nCorrect answer\nB. y\nQuestion 3 Last\nA. p\nCorrect answer\nB. q";
        let numbers: Vec<&str> = segmenter().split(text).iter().map(|c| c.number).collect();
        assert_eq!(numbers, ["1", "2", "3"]);
    }

    #[test]
    fn heading_word_in_the_last_question_is_not_an_intro() {
        let text = "Question 1 a\nA. x\nQuestion 2 Pick two questions\nA. y";
        assert_eq!(segmenter().split(text).len(), 2);
    }

    #[test]
    fn heading_word_after_options_is_not_an_intro() {
        let text = "Question 1 a\nA. x\nB. y\nExplanation: covers both questions\nQuestion 2 b\nA. z";
        assert_eq!(segmenter().split(text).len(), 2);
    }

    #[test]
    fn intro_detection_can_be_disabled() {
        let text = "Contents Question 1 toc\nQUESTIONS\nQuestion 1 real";
        let chunks = Segmenter::new("").unwrap().split(text);
        assert_eq!(chunks.len(), 2);
    }
}
