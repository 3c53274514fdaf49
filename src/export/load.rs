use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::{ExtractError, Result};
use crate::model::QuestionRecord;

#[derive(Deserialize)]
#[serde(untagged)]
enum Document {
    Wrapped { questions: Vec<Value> },
    Bare(Vec<Value>),
}

/// Reads a question file written by this tool or by the older extractor
/// scripts. Records that do not decode are logged and dropped.
pub fn load_records(path: &Path) -> Result<Vec<QuestionRecord>> {
    info!("Loading JSON from {}", path.display());
    let data = fs::read_to_string(path).map_err(|e| ExtractError::io(path, e))?;
    let records = parse_records(&data).map_err(|source| ExtractError::InvalidInput {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Loaded {} questions", records.len());
    Ok(records)
}

pub fn parse_records(data: &str) -> std::result::Result<Vec<QuestionRecord>, serde_json::Error> {
    let items = match serde_json::from_str::<Document>(data)? {
        Document::Wrapped { questions } => questions,
        Document::Bare(items) => items,
    };
    let records = items
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match serde_json::from_value::<QuestionRecord>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Dropping question entry {}: {}", i + 1, e);
                None
            }
        })
        .collect();
    Ok(records)
}
