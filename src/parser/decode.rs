use std::collections::BTreeSet;

use crate::config::Settings;
use crate::error::{ExtractError, Result};
use crate::model::{CorrectAnswer, Issue, OptionLetter, OptionSet, QuestionRecord};
use crate::parser::markers::{tidy, LOOSE_ANSWER_RE};
use crate::parser::scanner::{scan, Marker, MarkerScan};

/// Turns one question chunk into a record.
#[derive(Debug, Clone)]
pub struct Decoder {
    option_count: usize,
    skip_window: usize,
}

impl Decoder {
    pub fn new(option_count: usize, skip_window: usize) -> Self {
        Decoder {
            option_count,
            skip_window,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Decoder::new(settings.expected_options, settings.skip_window)
    }

    /// `Ok(None)` means the question was marked as skipped in the source.
    pub fn decode(&self, chunk: &str) -> Result<Option<QuestionRecord>> {
        let scan = scan(chunk, self.option_count);
        let (Some(number), Some(number_marker)) = (scan.number(), scan.number_marker()) else {
            return Err(ExtractError::MalformedChunk("no question number".into()));
        };
        if self.is_skipped(chunk) {
            return Ok(None);
        }

        let options_end = scan.first_explanation().map_or(chunk.len(), |m| m.start);
        let slots = self.select_options(&scan, number_marker.end, options_end);
        if slots.iter().all(Option::is_none) {
            return Err(ExtractError::MalformedChunk(format!(
                "question {number}: no option markers"
            )));
        }

        let stops = stop_positions(&scan, &slots, options_end, chunk.len());
        let text = tidy(&chunk[number_marker.end..next_stop(&stops, number_marker.end)]);

        let mut embedded = Vec::new();
        let options: OptionSet = slots
            .iter()
            .enumerate()
            .map(|(index, slot)| {
                let Some(marker) = slot else {
                    return String::new();
                };
                let raw = tidy(&chunk[marker.end..next_stop(&stops, marker.start + 1)]);
                if !LOOSE_ANSWER_RE.is_match(&raw) {
                    return raw;
                }
                embedded.extend(OptionLetter::from_index(index));
                tidy(&LOOSE_ANSWER_RE.replace_all(&raw, " "))
            })
            .collect();

        let mut issues = BTreeSet::new();
        if slots.iter().any(Option::is_none) {
            issues.insert(Issue::OptionCountShort);
        }

        let marked = answer_letters(&scan, &slots, options_end);
        let correct_answer = CorrectAnswer::from_letters(marked)
            .or_else(|| CorrectAnswer::from_letters(embedded));

        let explanation = scan
            .first_explanation()
            .map(|m| tidy(&chunk[m.end..]))
            .unwrap_or_default();

        let record = QuestionRecord {
            number: number.to_string(),
            text,
            options,
            correct_answer,
            explanation,
            issues,
        };
        Ok(Some(record.assess()))
    }

    fn is_skipped(&self, chunk: &str) -> bool {
        let head = match chunk.char_indices().nth(self.skip_window) {
            Some((end, _)) => &chunk[..end],
            None => chunk,
        };
        head.contains("Skipped")
    }

    /// One slot per expected option. Line-start markers are trusted first;
    /// embedded markers only fill gaps between options already found.
    fn select_options(
        &self,
        scan: &MarkerScan,
        from: usize,
        options_end: usize,
    ) -> Vec<Option<Marker>> {
        let mut slots = vec![None; self.option_count];
        let in_region = |m: &Marker| m.start >= from && m.start < options_end;

        let trusted = scan
            .options()
            .filter(|(_, line_start, m)| *line_start && in_region(*m));
        accept_advancing(&mut slots, trusted);
        if slots.iter().all(Option::is_none) {
            let any = scan.options().filter(|(_, _, m)| in_region(*m));
            accept_advancing(&mut slots, any);
        }

        for index in 0..slots.len() {
            if slots[index].is_some() {
                continue;
            }
            let Some(prev_end) = slots[..index].iter().rev().flatten().next().map(|m| m.end) else {
                continue;
            };
            let next_start = slots[index + 1..]
                .iter()
                .flatten()
                .next()
                .map_or(options_end, |m| m.start);
            slots[index] = scan
                .options()
                .find(|(letter, _, m)| {
                    letter.index() == index && m.start >= prev_end && m.start < next_start
                })
                .map(|(_, _, m)| *m);
        }
        slots
    }
}

/// First-match-wins: a marker is taken only when its letter comes after
/// every letter taken so far.
fn accept_advancing<'s>(
    slots: &mut [Option<Marker>],
    candidates: impl Iterator<Item = (OptionLetter, bool, &'s Marker)>,
) {
    let mut last: Option<usize> = None;
    for (letter, _, marker) in candidates {
        let index = letter.index();
        if index < slots.len() && last.map_or(true, |l| index > l) {
            slots[index] = Some(*marker);
            last = Some(index);
        }
    }
}

/// Positions where a field ends: the start of every accepted option and
/// answer marker, the explanation start and the chunk end.
fn stop_positions(
    scan: &MarkerScan,
    slots: &[Option<Marker>],
    options_end: usize,
    len: usize,
) -> Vec<usize> {
    let mut stops: Vec<usize> = slots
        .iter()
        .flatten()
        .map(|m| m.start)
        .chain(scan.answers().map(|(_, m)| m.start))
        .chain([options_end, len])
        .collect();
    stops.sort_unstable();
    stops.dedup();
    stops
}

fn next_stop(stops: &[usize], from: usize) -> usize {
    stops
        .iter()
        .copied()
        .find(|&stop| stop >= from)
        .unwrap_or_else(|| stops.last().copied().unwrap_or(from))
}

/// Letters named by answer markers, in document order. A marker without a
/// letter of its own belongs to the option printed just before it.
fn answer_letters(
    scan: &MarkerScan,
    slots: &[Option<Marker>],
    options_end: usize,
) -> Vec<OptionLetter> {
    scan.answers()
        .filter_map(|(designated, marker)| {
            designated.or_else(|| {
                if marker.start >= options_end {
                    return None;
                }
                slots
                    .iter()
                    .enumerate()
                    .filter_map(|(index, slot)| slot.map(|m| (index, m)))
                    .filter(|(_, m)| m.start < marker.start)
                    .last()
                    .and_then(|(index, _)| OptionLetter::from_index(index))
            })
        })
        .collect()
}
