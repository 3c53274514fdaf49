use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{debug, info};

use exam_extract::config::Settings;
use exam_extract::export::{load_records, Envelope, JsonEmitter, OptionLayout};
use exam_extract::metrics::{new_run_id, StageTracker};
use exam_extract::parser::{sample, Pipeline};
use exam_extract::reconcile::Reconciler;
use exam_extract::{source, QuestionRecord};

#[derive(Parser)]
#[command(name = "exam_extract", about = "Extract multiple-choice exam questions from PDFs")]
struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    debug: bool,
    /// Settings file (toml, yaml or json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read a PDF (or pre-extracted .txt) and write its questions as JSON
    Extract {
        input: PathBuf,
        #[arg(short, long, default_value = "extracted_questions.json")]
        output: PathBuf,
        /// Write decoded records without the reconcile pass
        #[arg(long)]
        raw: bool,
        #[command(flatten)]
        format: FormatArgs,
    },
    /// Re-clean a question JSON file from an earlier run
    Clean {
        input: PathBuf,
        #[arg(short, long, default_value = "cleaned_questions.json")]
        output: PathBuf,
        #[command(flatten)]
        format: FormatArgs,
    },
}

#[derive(Args)]
struct FormatArgs {
    /// Top-level shape of the output
    #[arg(long, value_enum)]
    envelope: Option<Envelope>,
    /// Options as a list or a letter-keyed map
    #[arg(long, value_enum)]
    layout: Option<OptionLayout>,
}

impl FormatArgs {
    fn apply(&self, settings: &mut Settings) {
        if let Some(envelope) = self.envelope {
            settings.envelope = envelope;
        }
        if let Some(layout) = self.layout {
            settings.option_layout = layout;
        }
    }
}

fn init_tracing(debug: bool) {
    let level = if debug { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| level.into()),
        )
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let t0 = Instant::now();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    debug!(settings = ?settings, "Settings loaded");

    let mut tracker = StageTracker::new(new_run_id());
    match cli.command {
        Commands::Extract {
            input,
            output,
            raw,
            format,
        } => {
            format.apply(&mut settings);
            extract(&settings, &input, &output, raw, &mut tracker)?;
        }
        Commands::Clean {
            input,
            output,
            format,
        } => {
            format.apply(&mut settings);
            clean(&settings, &input, &output, &mut tracker)?;
        }
    }

    info!("Run {}: {}", tracker.run_id(), tracker.summary());
    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_elapsed(elapsed));
    }
    Ok(())
}

fn extract(
    settings: &Settings,
    input: &Path,
    output: &Path,
    raw: bool,
    tracker: &mut StageTracker,
) -> Result<()> {
    let pages = source::read_pages(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let text = source::join_pages(&pages);
    let char_count = text.chars().count();
    info!("Extracted {} characters from {} pages", char_count, pages.len());
    debug!("First 1000 characters:\n{}", sample(&text, 1000));
    tracker.record("read", pages.len(), char_count);

    let pipeline = Pipeline::from_settings(settings)?;
    let records = pipeline
        .run(&text, tracker, true)
        .with_context(|| format!("extracting questions from {}", input.display()))?;

    let records = if raw {
        records
    } else {
        reconcile(settings, records, tracker)?
    };
    emit(settings, &records, output)
}

fn clean(
    settings: &Settings,
    input: &Path,
    output: &Path,
    tracker: &mut StageTracker,
) -> Result<()> {
    let records = load_records(input)?;
    tracker.record("load", records.len(), records.len());
    let records = reconcile(settings, records, tracker)?;
    emit(settings, &records, output)
}

fn reconcile(
    settings: &Settings,
    records: Vec<QuestionRecord>,
    tracker: &mut StageTracker,
) -> Result<Vec<QuestionRecord>> {
    let reconciler = Reconciler::from_settings(settings)?;
    let before = records.len();
    let records = reconciler.reconcile_batch(records);
    let flagged = records.iter().filter(|r| !r.is_complete()).count();
    tracker.record("reconcile", before, records.len());
    info!("{} of {} questions carry completeness flags", flagged, records.len());
    Ok(records)
}

fn emit(settings: &Settings, records: &[QuestionRecord], output: &Path) -> Result<()> {
    JsonEmitter::new(settings.envelope, settings.option_layout)
        .write(records, output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Saved {} questions to {}", records.len(), output.display());
    Ok(())
}

/// Wall-clock time for the closing summary line.
fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    match (total / 3600, total % 3600 / 60, total % 60) {
        (0, 0, _) => format!("{:.1}s", elapsed.as_secs_f64()),
        (0, minutes, seconds) => format!("{minutes}m {seconds}s"),
        (hours, minutes, seconds) => format!("{hours}h {minutes}m {seconds}s"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_time_units() {
        assert_eq!(format_elapsed(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
