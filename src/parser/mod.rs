pub mod decode;
pub mod markers;
pub mod normalize;
pub mod scanner;
pub mod segment;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::config::Settings;
use crate::error::{ExtractError, Result};
use crate::metrics::{DecodeTally, StageTracker};
use crate::model::QuestionRecord;

pub use decode::Decoder;
pub use normalize::Normalizer;
pub use segment::{QuestionChunk, Segmenter};

const BLOCK_SIZE: usize = 500;
const SAMPLE_CHARS: usize = 200;

type Outcome = Result<Option<QuestionRecord>>;

/// Normalize → segment → decode over the joined page text.
#[derive(Debug, Clone)]
pub struct Pipeline {
    normalizer: Normalizer,
    segmenter: Segmenter,
    decoder: Decoder,
}

impl Pipeline {
    pub fn new(normalizer: Normalizer, segmenter: Segmenter, decoder: Decoder) -> Self {
        Pipeline {
            normalizer,
            segmenter,
            decoder,
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Ok(Pipeline::new(
            Normalizer::from_settings(settings)?,
            Segmenter::new(&settings.intro_marker)?,
            Decoder::from_settings(settings),
        ))
    }

    pub fn normalize(&self, raw: &str) -> String {
        self.normalizer.normalize(raw)
    }

    /// Decoded records in source order. Fails only when nothing could be
    /// segmented or nothing survived decoding.
    pub fn run(
        &self,
        raw: &str,
        tracker: &mut StageTracker,
        show_progress: bool,
    ) -> Result<Vec<QuestionRecord>> {
        let text = self.normalize(raw);
        tracker.record("normalize", raw.chars().count(), text.chars().count());

        let chunks = self.segmenter.split(&text);
        tracker.record("segment", text.chars().count(), chunks.len());
        if chunks.is_empty() {
            return Err(ExtractError::NoChunks);
        }
        info!("Found {} question chunks", chunks.len());

        let pb = if show_progress {
            let pb = ProgressBar::new(chunks.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut tally = DecodeTally::default();
        let mut records = Vec::with_capacity(chunks.len());
        for block in chunks.chunks(BLOCK_SIZE) {
            let outcomes = self.decode_block(block);
            for (chunk, outcome) in block.iter().zip(outcomes) {
                match outcome {
                    Ok(Some(record)) => {
                        tally.parsed += 1;
                        if tally.parsed <= 2 || tally.parsed % 20 == 0 {
                            info!(
                                "Parsed question {}: {} options, answer {}",
                                record.number,
                                record.options.len(),
                                record
                                    .correct_answer
                                    .as_ref()
                                    .map_or_else(|| "-".to_string(), ToString::to_string)
                            );
                        }
                        records.push(record);
                    }
                    Ok(None) => {
                        tally.skipped += 1;
                        info!("Skipping question {} (marked as skipped)", chunk.number);
                    }
                    Err(e) => {
                        tally.malformed += 1;
                        warn!("Question {}: {}", chunk.number, e);
                        debug!("Chunk sample: {}", sample(chunk.text, SAMPLE_CHARS));
                    }
                }
            }
            pb.inc(block.len() as u64);
        }
        pb.finish_and_clear();

        info!(
            "Decoded {} chunks: {} parsed, {} skipped, {} malformed",
            tally.total(),
            tally.parsed,
            tally.skipped,
            tally.malformed
        );
        tracker.record("decode", chunks.len(), records.len());
        if records.is_empty() {
            return Err(ExtractError::NoRecords);
        }
        Ok(records)
    }

    #[cfg(feature = "rayon")]
    fn decode_block(&self, block: &[QuestionChunk<'_>]) -> Vec<Outcome> {
        block.par_iter().map(|c| self.decoder.decode(c.text)).collect()
    }

    #[cfg(not(feature = "rayon"))]
    fn decode_block(&self, block: &[QuestionChunk<'_>]) -> Vec<Outcome> {
        block.iter().map(|c| self.decoder.decode(c.text)).collect()
    }
}

/// First `max` characters of `text`, on one line.
pub fn sample(text: &str, max: usize) -> String {
    text.chars()
        .take(max)
        .map(|c| if c == '\n' { ' ' } else { c })
        .collect()
}
