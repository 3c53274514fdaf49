pub mod config;
pub mod error;
pub mod export;
pub mod metrics;
pub mod model;
pub mod parser;
pub mod reconcile;
pub mod source;

pub use error::{ExtractError, Result};
pub use model::{CorrectAnswer, Issue, OptionLetter, OptionSet, QuestionRecord};
