pub mod json;
pub mod load;

use clap::ValueEnum;
use serde::Deserialize;

pub use json::JsonEmitter;
pub use load::{load_records, parse_records};

/// Top-level shape of the output document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    /// `[ {...}, {...} ]`
    Bare,
    /// `{ "total_questions": n, "questions": [...] }`
    Wrapped,
}

/// How `options` is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OptionLayout {
    /// `["text", "text"]`
    List,
    /// `{"A": "text", "B": "text"}`
    Map,
}
