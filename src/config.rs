use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::{ExtractError, Result};
use crate::export::{Envelope, OptionLayout};
use crate::model::OptionLetter;

/// Run settings: built-in defaults, then an optional settings file, then
/// `EXAM_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Options per question; fewer found are padded with placeholders.
    pub expected_options: usize,
    /// A chunk whose first `skip_window` characters contain "Skipped" is dropped.
    pub skip_window: usize,
    /// Heading that introduces the question section.
    pub intro_marker: String,
    /// Prefixes that get a space inserted before a glued capitalized word.
    pub brand_prefixes: Vec<String>,
    pub envelope: Envelope,
    pub option_layout: OptionLayout,
}

impl Settings {
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("expected_options", 4_i64)?
            .set_default("skip_window", 200_i64)?
            .set_default("intro_marker", "QUESTIONS")?
            .set_default("brand_prefixes", vec!["Amazon", "AWS"])?
            .set_default("envelope", "bare")?
            .set_default("option_layout", "list")?;
        if let Some(path) = file {
            builder = builder.add_source(File::from(path));
        }
        let settings: Settings = builder
            .add_source(
                Environment::with_prefix("EXAM")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("brand_prefixes"),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.expected_options == 0 || self.expected_options > OptionLetter::COUNT {
            return Err(ExtractError::Settings(format!(
                "expected_options must be between 1 and {}, got {}",
                OptionLetter::COUNT,
                self.expected_options
            )));
        }
        Ok(self)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            expected_options: 4,
            skip_window: 200,
            intro_marker: "QUESTIONS".to_string(),
            brand_prefixes: vec!["Amazon".to_string(), "AWS".to_string()],
            envelope: Envelope::Bare,
            option_layout: OptionLayout::List,
        }
    }
}
