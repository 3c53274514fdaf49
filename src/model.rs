use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

/// Text of one PDF page as handed over by the reader. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    pub index: usize,
    pub text: String,
}

/// Option letter, derived from position: A is slot 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OptionLetter(u8);

impl OptionLetter {
    pub const COUNT: usize = 26;

    pub fn from_index(index: usize) -> Option<Self> {
        (index < Self::COUNT).then(|| OptionLetter(index as u8))
    }

    pub fn from_char(c: char) -> Option<Self> {
        let upper = c.to_ascii_uppercase();
        upper
            .is_ascii_uppercase()
            .then(|| OptionLetter(upper as u8 - b'A'))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_char(self) -> char {
        (b'A' + self.0) as char
    }
}

impl fmt::Display for OptionLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl Serialize for OptionLetter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for OptionLetter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_letter(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid option letter `{raw}`")))
    }
}

/// Accepts "B", "b", " B " and "B." as the same letter.
fn parse_letter(raw: &str) -> Option<OptionLetter> {
    let trimmed = raw.trim().trim_end_matches('.');
    let mut chars = trimmed.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => OptionLetter::from_char(c),
        _ => None,
    }
}

/// Serialized as `"A"` for a single answer and `["A", "C"]` for multi-answer questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CorrectAnswer {
    Single(OptionLetter),
    Multiple(Vec<OptionLetter>),
}

impl CorrectAnswer {
    /// Keeps document order and drops repeats. No letters means no answer.
    pub fn from_letters(letters: impl IntoIterator<Item = OptionLetter>) -> Option<Self> {
        let letters: Vec<OptionLetter> = letters.into_iter().unique().collect();
        match letters.as_slice() {
            [] => None,
            [single] => Some(CorrectAnswer::Single(*single)),
            _ => Some(CorrectAnswer::Multiple(letters)),
        }
    }

    pub fn letters(&self) -> &[OptionLetter] {
        match self {
            CorrectAnswer::Single(letter) => std::slice::from_ref(letter),
            CorrectAnswer::Multiple(letters) => letters,
        }
    }
}

impl fmt::Display for CorrectAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letters().iter().join(","))
    }
}

/// Ordered option texts. Placeholders for options that could not be
/// recovered are empty strings; the owning record flags them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSet(Vec<String>);

impl OptionSet {
    pub fn new(options: Vec<String>) -> Self {
        OptionSet(options)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, letter: OptionLetter) -> Option<&str> {
        self.0.get(letter.index()).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = (OptionLetter, &str)> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(i, text)| OptionLetter::from_index(i).map(|l| (l, text.as_str())))
    }

    pub fn has_empty(&self) -> bool {
        self.0.iter().any(|text| text.trim().is_empty())
    }

    /// Pads with empty placeholders up to `expected`. Returns whether padding was needed.
    pub fn padded(mut self, expected: usize) -> (Self, bool) {
        let short = self.0.len() < expected;
        if short {
            self.0.resize(expected, String::new());
        }
        (self, short)
    }

    pub fn map_texts<F>(self, f: F) -> Self
    where
        F: FnMut(String) -> String,
    {
        OptionSet(self.0.into_iter().map(f).collect())
    }
}

impl From<Vec<String>> for OptionSet {
    fn from(options: Vec<String>) -> Self {
        OptionSet(options)
    }
}

impl FromIterator<String> for OptionSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        OptionSet(iter.into_iter().collect())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OptionsRepr {
    List(Vec<Option<String>>),
    Map(BTreeMap<String, Option<String>>),
}

impl<'de> Deserialize<'de> for OptionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match OptionsRepr::deserialize(deserializer)? {
            OptionsRepr::List(items) => Ok(items.into_iter().map(Option::unwrap_or_default).collect()),
            OptionsRepr::Map(entries) => {
                let mut options: Vec<String> = Vec::with_capacity(entries.len());
                for (key, text) in entries {
                    let letter = parse_letter(&key)
                        .ok_or_else(|| de::Error::custom(format!("invalid option key `{key}`")))?;
                    if options.len() <= letter.index() {
                        options.resize(letter.index() + 1, String::new());
                    }
                    options[letter.index()] = text.unwrap_or_default();
                }
                Ok(OptionSet(options))
            }
        }
    }
}

/// Completeness flags. They separate "the source had nothing here" from
/// "extraction could not recover it".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Issue {
    /// Fewer option markers than expected; placeholders were inserted.
    OptionCountShort,
    /// At least one option is still empty.
    EmptyOption,
    /// No correct-answer marker anywhere in the question.
    NoAnswerMarker,
    /// A designated letter has no option slot.
    AnswerOutOfRange,
    /// The answer letter was read from option text after option text was
    /// moved between slots, so it may point at the wrong option.
    AnswerPositionUnverified,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QuestionRecord {
    #[serde(alias = "question_number", deserialize_with = "number_from_any")]
    pub number: String,
    #[serde(alias = "question_text", default, deserialize_with = "string_or_null")]
    pub text: String,
    #[serde(default)]
    pub options: OptionSet,
    #[serde(default)]
    pub correct_answer: Option<CorrectAnswer>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub explanation: String,
    #[serde(default)]
    pub issues: BTreeSet<Issue>,
}

impl QuestionRecord {
    /// Recomputes the state-derived flags. Flags that describe history
    /// (`OptionCountShort`, `AnswerPositionUnverified`) are kept.
    pub fn assess(mut self) -> Self {
        self.issues
            .retain(|issue| matches!(issue, Issue::OptionCountShort | Issue::AnswerPositionUnverified));
        if self.options.has_empty() {
            self.issues.insert(Issue::EmptyOption);
        }
        match &self.correct_answer {
            None => {
                self.issues.insert(Issue::NoAnswerMarker);
            }
            Some(answer) => {
                if answer
                    .letters()
                    .iter()
                    .any(|letter| letter.index() >= self.options.len())
                {
                    self.issues.insert(Issue::AnswerOutOfRange);
                }
            }
        }
        self
    }

    pub fn is_complete(&self) -> bool {
        self.issues.is_empty()
    }
}

fn number_from_any<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Text(String),
        Int(u64),
    }
    Ok(match Number::deserialize(deserializer)? {
        Number::Text(text) => text.trim().to_string(),
        Number::Int(n) => n.to_string(),
    })
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
