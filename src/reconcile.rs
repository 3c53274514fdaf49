//! Second-chance repairs over decoded or loaded records.
//!
//! Each step takes the option set by value and hands back a new one, so the
//! order in [`Reconciler::reconcile`] is the whole contract: clean, then
//! redistribute, then pull out answers, then pull out the explanation.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::Settings;
use crate::error::Result;
use crate::model::{CorrectAnswer, Issue, OptionLetter, OptionSet, QuestionRecord};
use crate::parser::markers::{tidy, LOOSE_ANSWER_RE, LOOSE_EXPLANATION_RE};
use crate::parser::normalize::Normalizer;

/// ` C. ` inside running text, or `EC2C. ` where the break after a digit was lost.
static BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\d]([A-Z])\. ").unwrap());

pub struct Reconciler {
    cleaner: Normalizer,
    option_count: usize,
}

impl Reconciler {
    pub fn new(cleaner: Normalizer, option_count: usize) -> Self {
        Reconciler {
            cleaner,
            option_count,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Reconciler::new(
            Normalizer::from_settings(settings)?,
            settings.expected_options,
        ))
    }

    pub fn reconcile(&self, record: QuestionRecord) -> QuestionRecord {
        let QuestionRecord {
            number,
            text,
            options,
            correct_answer,
            explanation,
            mut issues,
        } = record;

        let options = options.map_texts(|t| self.cleaner.clean_field(&t));
        let (options, short) = options.padded(self.option_count);
        if short {
            issues.insert(Issue::OptionCountShort);
        }

        let (options, moved) = redistribute_empty_options(options);
        let (options, correct_answer, found) = extract_answer_from_options(options, correct_answer);
        if moved && found {
            debug!("Question {}: answer read after option text moved", number);
            issues.insert(Issue::AnswerPositionUnverified);
        }
        let (options, explanation) = extract_explanation(options, explanation);

        QuestionRecord {
            text: self.cleaner.clean_field(&text),
            options,
            correct_answer,
            explanation: self.cleaner.clean_field(&explanation),
            issues,
            number,
        }
        .assess()
    }

    pub fn reconcile_batch(&self, records: Vec<QuestionRecord>) -> Vec<QuestionRecord> {
        records.into_iter().map(|r| self.reconcile(r)).collect()
    }
}

/// Fills empty slots from ` X. ` boundaries left inside the longest option.
/// Returns whether any text moved.
pub fn redistribute_empty_options(options: OptionSet) -> (OptionSet, bool) {
    if !options.has_empty() {
        return (options, false);
    }
    let empty: BTreeSet<usize> = options
        .iter()
        .filter(|(_, text)| text.trim().is_empty())
        .map(|(letter, _)| letter.index())
        .collect();
    let Some((source, longest)) = options
        .iter()
        .max_by_key(|(_, text)| text.len())
        .filter(|(_, text)| !text.is_empty())
        .map(|(letter, text)| (letter.index(), text.to_string()))
    else {
        return (options, false);
    };

    let mut boundaries: Vec<(usize, usize, usize)> = Vec::new();
    for caps in BOUNDARY_RE.captures_iter(&longest) {
        let (Some(whole), Some(letter)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let Some(index) = letter
            .as_str()
            .chars()
            .next()
            .and_then(OptionLetter::from_char)
            .map(OptionLetter::index)
        else {
            continue;
        };
        let advances = boundaries.last().map_or(true, |&(last, _, _)| index > last);
        if empty.contains(&index) && advances {
            boundaries.push((index, letter.start(), whole.end()));
        }
    }
    let Some(&(_, first_start, _)) = boundaries.first() else {
        return (options, false);
    };

    let mut texts = options.into_vec();
    for (i, &(index, _, end)) in boundaries.iter().enumerate() {
        let until = boundaries
            .get(i + 1)
            .map_or(longest.len(), |&(_, next_start, _)| next_start);
        texts[index] = longest[end..until].trim().to_string();
    }
    texts[source] = longest[..first_start].trim().to_string();
    (OptionSet::new(texts), true)
}

/// Strips answer markers left in option text. The letters found become the
/// answer when none is known, or extend a multi-answer. Returns whether any
/// marker was found.
pub fn extract_answer_from_options(
    options: OptionSet,
    answer: Option<CorrectAnswer>,
) -> (OptionSet, Option<CorrectAnswer>, bool) {
    let mut found: Vec<OptionLetter> = Vec::new();
    let options: OptionSet = options
        .iter()
        .map(|(letter, text)| {
            if LOOSE_ANSWER_RE.is_match(text) {
                found.push(letter);
                tidy(&LOOSE_ANSWER_RE.replace_all(text, " "))
            } else {
                text.to_string()
            }
        })
        .collect();
    if found.is_empty() {
        return (options, answer, false);
    }

    let answer = match answer {
        None => CorrectAnswer::from_letters(found),
        Some(CorrectAnswer::Multiple(letters)) => {
            CorrectAnswer::from_letters(letters.into_iter().chain(found))
        }
        single @ Some(CorrectAnswer::Single(_)) => single,
    };
    (options, answer, true)
}

/// Moves explanation text out of the last filled option.
pub fn extract_explanation(options: OptionSet, explanation: String) -> (OptionSet, String) {
    let Some(last) = options
        .iter()
        .filter(|(_, text)| !text.is_empty())
        .last()
        .map(|(letter, _)| letter.index())
    else {
        return (options, explanation);
    };
    let mut texts = options.into_vec();
    let Some(marker) = LOOSE_EXPLANATION_RE.find(&texts[last]).map(|m| m.range()) else {
        return (OptionSet::new(texts), explanation);
    };

    let leaked = texts[last][marker.end..].trim().to_string();
    let kept = texts[last][..marker.start].trim().to_string();
    texts[last] = kept;
    let explanation = if leaked.is_empty() { explanation } else { leaked };
    (OptionSet::new(texts), explanation)
}
