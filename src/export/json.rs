use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::{ExtractError, Result};
use crate::export::{Envelope, OptionLayout};
use crate::model::{CorrectAnswer, Issue, QuestionRecord};

#[derive(Debug, Clone, Copy)]
pub struct JsonEmitter {
    envelope: Envelope,
    layout: OptionLayout,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OptionsOut<'a> {
    List(&'a [String]),
    Map(BTreeMap<char, &'a str>),
}

#[derive(Serialize)]
struct RecordOut<'a> {
    number: &'a str,
    text: &'a str,
    options: OptionsOut<'a>,
    correct_answer: &'a Option<CorrectAnswer>,
    explanation: &'a str,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    issues: &'a BTreeSet<Issue>,
}

#[derive(Serialize)]
struct Wrapped<'a> {
    total_questions: usize,
    questions: Vec<RecordOut<'a>>,
}

impl JsonEmitter {
    pub fn new(envelope: Envelope, layout: OptionLayout) -> Self {
        JsonEmitter { envelope, layout }
    }

    pub fn render(&self, records: &[QuestionRecord]) -> Result<String> {
        let rows: Vec<RecordOut> = records.iter().map(|r| self.row(r)).collect();
        let data = match self.envelope {
            Envelope::Bare => serde_json::to_string_pretty(&rows)?,
            Envelope::Wrapped => serde_json::to_string_pretty(&Wrapped {
                total_questions: rows.len(),
                questions: rows,
            })?,
        };
        Ok(data)
    }

    /// Writes the batch to `path`, creating parent directories. An empty
    /// batch is refused rather than written as an empty document.
    pub fn write(&self, records: &[QuestionRecord], path: &Path) -> Result<()> {
        if records.is_empty() {
            return Err(ExtractError::NoRecords);
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| ExtractError::io(parent, e))?;
        }
        let data = self.render(records)?;
        fs::write(path, data).map_err(|e| ExtractError::io(path, e))?;
        info!("Saved {} questions to {}", records.len(), path.display());
        Ok(())
    }

    fn row<'a>(&self, record: &'a QuestionRecord) -> RecordOut<'a> {
        let options = match self.layout {
            OptionLayout::List => OptionsOut::List(record.options.as_slice()),
            OptionLayout::Map => OptionsOut::Map(
                record
                    .options
                    .iter()
                    .map(|(letter, text)| (letter.as_char(), text))
                    .collect(),
            ),
        };
        RecordOut {
            number: &record.number,
            text: &record.text,
            options,
            correct_answer: &record.correct_answer,
            explanation: &record.explanation,
            issues: &record.issues,
        }
    }
}
