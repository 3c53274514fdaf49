use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use exam_extract::config::Settings;
use exam_extract::export::{load_records, Envelope, JsonEmitter, OptionLayout};
use exam_extract::metrics::{new_run_id, StageTracker};
use exam_extract::parser::Pipeline;
use exam_extract::reconcile::Reconciler;
use exam_extract::{source, CorrectAnswer, ExtractError, Issue, OptionLetter, QuestionRecord};

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn letter(c: char) -> OptionLetter {
    OptionLetter::from_char(c).unwrap()
}

fn extract_text(raw: &str) -> Result<Vec<QuestionRecord>, ExtractError> {
    let settings = Settings::default();
    let mut tracker = StageTracker::new(new_run_id());
    let records = Pipeline::from_settings(&settings)?.run(raw, &mut tracker, false)?;
    Ok(Reconciler::from_settings(&settings)?.reconcile_batch(records))
}

#[test]
fn single_line_sample_end_to_end() {
    let records = extract_text(
        "Question 1 What is S3?A.Storage Correctanswer B.Compute Overallexplanation S3 is storage.",
    )
    .unwrap();

    let json: Value = serde_json::from_str(
        &JsonEmitter::new(Envelope::Bare, OptionLayout::List)
            .render(&records)
            .unwrap(),
    )
    .unwrap();
    assert_eq!(
        json,
        json!([{
            "number": "1",
            "text": "What is S3?",
            "options": ["Storage", "Compute", "", ""],
            "correct_answer": "A",
            "explanation": "S3 is storage.",
            "issues": ["option_count_short", "empty_option"]
        }])
    );
}

#[test]
fn text_fixture_end_to_end() {
    let pages = source::read_pages(&fixture("sample_exam.txt")).unwrap();
    let records = extract_text(&source::join_pages(&pages)).unwrap();

    let numbers: Vec<&str> = records.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers, ["1", "3", "4"]);
    assert!(records.iter().all(QuestionRecord::is_complete));

    let first = &records[0];
    assert_eq!(first.text, "Which service stores objects?");
    assert_eq!(
        first.options.as_slice(),
        ["Amazon S3", "Amazon EC2", "AWS Lambda", "Amazon SQS"]
    );
    assert_eq!(first.correct_answer, Some(CorrectAnswer::Single(letter('A'))));
    assert_eq!(first.explanation, "Amazon S3 is object storage.");

    let multi = &records[1];
    assert_eq!(
        multi.correct_answer,
        Some(CorrectAnswer::Multiple(vec![letter('A'), letter('C')]))
    );
    assert_eq!(multi.options.get(letter('D')), Some("Amazon EBS"));

    let designated = &records[2];
    assert_eq!(designated.correct_answer, Some(CorrectAnswer::Single(letter('B'))));
    assert_eq!(designated.options.get(letter('D')), Some("Amazon Redshift"));
    assert_eq!(designated.explanation, "Neptune is a graph database.");
}

#[test]
fn heading_word_in_a_stem_loses_no_questions() {
    let records = extract_text(
        "Question 1 Which is storage?\nA. S3\nCorrect answer\nB. EC2\nQuestion 2 Answer both questions\nA. x\nCorrect answer\nB. y\nQuestion 3 Last\nA. p\nCorrect answer\nB. q",
    )
    .unwrap();
    let numbers: Vec<&str> = records.iter().map(|r| r.number.as_str()).collect();
    assert_eq!(numbers, ["1", "2", "3"]);
    assert_eq!(records[1].text, "Answer both questions");
}

#[test]
fn option_letter_glued_to_a_model_number() {
    let records = extract_text(
        "Question 1 Which runs VMs? A. Amazon S3 B. Amazon EC2C. AWS Lambda D. Amazon SQS Correct answer: B",
    )
    .unwrap();
    assert_eq!(
        records[0].options.as_slice(),
        ["Amazon S3", "Amazon EC2", "AWS Lambda", "Amazon SQS"]
    );
    assert_eq!(records[0].correct_answer, Some(CorrectAnswer::Single(letter('B'))));
}

#[test]
fn legacy_json_is_cleaned() {
    let records = load_records(&fixture("legacy_questions.json")).unwrap();
    assert_eq!(records.len(), 2);

    let reconciler = Reconciler::from_settings(&Settings::default()).unwrap();
    let records = reconciler.reconcile_batch(records);

    let queue = &records[0];
    assert_eq!(queue.text, "Which service queues messages?");
    assert_eq!(
        queue.options.as_slice(),
        [
            "Amazon SQS",
            "Amazon SNS for fan-out notifications",
            "Amazon MQ for brokers",
            "Amazon Kinesis"
        ]
    );
    assert_eq!(queue.explanation, "SQS is a queue.");
    assert!(queue.is_complete());

    let pick_two = &records[1];
    assert_eq!(pick_two.number, "8");
    assert_eq!(pick_two.options.as_slice(), ["one", "two", "three", "four"]);
    assert_eq!(
        pick_two.correct_answer,
        Some(CorrectAnswer::Multiple(vec![letter('A'), letter('C')]))
    );
}

#[test]
fn cleaned_output_round_trips_in_wrapped_map_form() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("nested/out/cleaned_questions.json");

    let records = Reconciler::from_settings(&Settings::default())
        .unwrap()
        .reconcile_batch(load_records(&fixture("legacy_questions.json")).unwrap());
    JsonEmitter::new(Envelope::Wrapped, OptionLayout::Map)
        .write(&records, &out)
        .unwrap();

    let json: Value = serde_json::from_str(&std::fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["total_questions"], 2);
    assert_eq!(json["questions"][0]["options"]["C"], "Amazon MQ for brokers");
    assert!(json["questions"][0].get("issues").is_none());

    assert_eq!(load_records(&out).unwrap(), records);
}

#[test]
fn short_options_stay_flagged_after_reload() {
    let records = extract_text("Question 5 Stem\nA. only one").unwrap();
    assert!(records[0].issues.contains(&Issue::OptionCountShort));
    assert!(records[0].issues.contains(&Issue::NoAnswerMarker));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("q.json");
    JsonEmitter::new(Envelope::Bare, OptionLayout::List)
        .write(&records, &out)
        .unwrap();
    assert_eq!(load_records(&out).unwrap(), records);
}

#[test]
fn zero_records_is_fatal_and_writes_nothing() {
    let err = extract_text("QUESTIONS\nQuestion 1 Skipped\nA. x").unwrap_err();
    assert!(matches!(err, ExtractError::NoRecords));

    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("empty.json");
    let err = JsonEmitter::new(Envelope::Bare, OptionLayout::List)
        .write(&[], &out)
        .unwrap_err();
    assert!(matches!(err, ExtractError::NoRecords));
    assert!(!out.exists());
}
