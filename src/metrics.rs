use itertools::Itertools;
use tracing::info;

/// Item counts in and out of each pipeline stage for one run.
pub struct StageTracker {
    run_id: String,
    stages: Vec<StageMetric>,
}

struct StageMetric {
    stage: &'static str,
    input: usize,
    output: usize,
}

impl StageTracker {
    pub fn new(run_id: String) -> Self {
        StageTracker {
            run_id,
            stages: Vec::new(),
        }
    }

    pub fn record(&mut self, stage: &'static str, input: usize, output: usize) {
        info!(run = %self.run_id, "  {}: {} in, {} out", stage, input, output);
        self.stages.push(StageMetric {
            stage,
            input,
            output,
        });
    }

    /// One `stage in→out` entry per recorded stage.
    pub fn summary(&self) -> String {
        self.stages
            .iter()
            .map(|m| format!("{} {}→{}", m.stage, m.input, m.output))
            .join(" | ")
    }

    pub fn output_of(&self, stage: &str) -> Option<usize> {
        self.stages
            .iter()
            .rev()
            .find(|m| m.stage == stage)
            .map(|m| m.output)
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

pub fn new_run_id() -> String {
    format!("run-{}", chrono::Utc::now().format("%Y%m%dT%H%M%S"))
}

/// Decode outcomes over a batch of chunks.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeTally {
    pub parsed: usize,
    pub skipped: usize,
    pub malformed: usize,
}

impl DecodeTally {
    pub fn total(&self) -> usize {
        self.parsed + self.skipped + self.malformed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_stages_in_order() {
        let mut tracker = StageTracker::new("run-test".into());
        tracker.record("segment", 1200, 3);
        tracker.record("decode", 3, 2);
        assert_eq!(tracker.summary(), "segment 1200→3 | decode 3→2");
        assert_eq!(tracker.output_of("decode"), Some(2));
        assert_eq!(tracker.output_of("reconcile"), None);
        assert_eq!(tracker.run_id(), "run-test");
    }

    #[test]
    fn run_ids_are_prefixed() {
        assert!(new_run_id().starts_with("run-"));
    }

    #[test]
    fn tally_total() {
        let tally = DecodeTally {
            parsed: 4,
            skipped: 1,
            malformed: 2,
        };
        assert_eq!(tally.total(), 7);
    }
}
