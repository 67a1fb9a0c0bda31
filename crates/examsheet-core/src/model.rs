//! Core data model types for examsheet.
//!
//! These are the fundamental types the entire examsheet system uses to
//! represent exams, answer sheets, scores, and submitted records. The
//! Response Store serializes most of them loosely (spreadsheet-backed),
//! so the deserializers here are deliberately lenient: a malformed field
//! degrades to its empty value instead of failing the whole payload.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::Deserializer;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One of the five printed options on the answer sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Choice {
    A,
    B,
    C,
    D,
    E,
}

impl Choice {
    /// All choices in sheet order.
    pub const ALL: [Choice; 5] = [Choice::A, Choice::B, Choice::C, Choice::D, Choice::E];

    pub fn as_str(&self) -> &'static str {
        match self {
            Choice::A => "A",
            Choice::B => "B",
            Choice::C => "C",
            Choice::D => "D",
            Choice::E => "E",
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(Choice::A),
            "B" => Ok(Choice::B),
            "C" => Ok(Choice::C),
            "D" => Ok(Choice::D),
            "E" => Ok(Choice::E),
            other => Err(format!("unknown choice: {other}")),
        }
    }
}

/// One slot on an answer sheet: a marked choice, or blank.
///
/// Parsing collapses anything that is not a single A-E letter (including
/// stray tokens like `"X"`) to blank. Grading treats blank and invalid
/// identically (incorrect), and item analysis buckets them together, so
/// no information the core acts on is lost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Answer(pub Option<Choice>);

impl Answer {
    pub const BLANK: Answer = Answer(None);

    /// Parse a raw token, case-insensitively. Invalid tokens become blank.
    pub fn parse(s: &str) -> Answer {
        Answer(s.parse::<Choice>().ok())
    }

    pub fn is_blank(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_str(&self) -> &'static str {
        match self.0 {
            Some(c) => c.as_str(),
            None => "",
        }
    }
}

impl From<Choice> for Answer {
    fn from(c: Choice) -> Self {
        Answer(Some(c))
    }
}

impl fmt::Display for Answer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Answer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Answer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Records come back from the store as strings, but tolerate
        // nulls and other scalars the sheet may produce.
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) => Answer::parse(&s),
            _ => Answer::BLANK,
        })
    }
}

/// Parse the store's comma-separated answer serialization (`"A,B,,D"`).
pub fn parse_answer_list(s: &str) -> Vec<Answer> {
    if s.trim().is_empty() {
        return Vec::new();
    }
    s.split(',').map(Answer::parse).collect()
}

/// Join answers back into the store's comma-separated serialization.
pub fn join_answer_list(answers: &[Answer]) -> String {
    answers
        .iter()
        .map(Answer::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// An exam set as defined in the instructor-managed store.
///
/// Read-only to this crate; created and edited externally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamDefinition {
    pub exam_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "de_lenient_count")]
    pub question_count: u32,
    /// May be absent (students never see it) or partially filled.
    #[serde(default, deserialize_with = "de_answer_key")]
    pub answer_key: Vec<Answer>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub window_start_utc: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub window_end_utc: Option<DateTime<Utc>>,
}

impl ExamDefinition {
    /// The enforced submission window.
    ///
    /// Invariant: a window exists only when BOTH endpoints are set; a
    /// single endpoint alone means unrestricted submission.
    pub fn window(&self) -> Option<SubmissionWindow> {
        match (self.window_start_utc, self.window_end_utc) {
            (Some(start), Some(end)) => Some(SubmissionWindow { start, end }),
            _ => None,
        }
    }

    /// The declared key, usable for grading or analysis over the first
    /// `question_count` slots: present, long enough, and fully marked.
    pub fn declared_key(&self, question_count: usize) -> Option<Vec<Answer>> {
        if question_count == 0 || self.answer_key.len() < question_count {
            return None;
        }
        let key = &self.answer_key[..question_count];
        if key.iter().any(Answer::is_blank) {
            return None;
        }
        Some(key.to_vec())
    }
}

/// The UTC interval during which the store accepts submissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowStatus {
    NotYetOpen,
    Open,
    Closed,
}

impl SubmissionWindow {
    /// Both bounds are inclusive.
    pub fn status(&self, now: DateTime<Utc>) -> WindowStatus {
        if now < self.start {
            WindowStatus::NotYetOpen
        } else if now > self.end {
            WindowStatus::Closed
        } else {
            WindowStatus::Open
        }
    }

    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.status(now) == WindowStatus::Open
    }
}

/// Per-question grading outcome, in the store's embedded detail format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerDetail {
    /// 1-based question number.
    #[serde(rename = "q")]
    pub question: u32,
    #[serde(rename = "ans", default)]
    pub submitted: Answer,
    #[serde(rename = "correct", default)]
    pub expected: Answer,
    #[serde(default)]
    pub is_correct: bool,
}

/// A graded submission. Immutable once computed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    /// Number of correct answers.
    #[serde(rename = "score", default, deserialize_with = "de_lenient_count")]
    pub raw: u32,
    #[serde(default, deserialize_with = "de_lenient_count")]
    pub percent: u32,
    #[serde(default)]
    pub detail: Vec<AnswerDetail>,
}

/// One historical submission as returned by `get_dashboard`.
///
/// Every field besides the student name is allowed to be missing or
/// malformed; aggregation degrades per record instead of failing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardRecord {
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub student_name: String,
    #[serde(default, deserialize_with = "de_lenient_opt_count")]
    pub score: Option<u32>,
    #[serde(default, deserialize_with = "de_lenient_opt_count")]
    pub percent: Option<u32>,
    /// Raw comma-separated answers as stored.
    #[serde(default)]
    pub answers: String,
    #[serde(default, deserialize_with = "de_lenient_detail")]
    pub detail: Option<Vec<AnswerDetail>>,
}

impl DashboardRecord {
    /// The record's answer vector. Missing answers parse to zero length.
    pub fn answer_slots(&self) -> Vec<Answer> {
        parse_answer_list(&self.answers)
    }
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

fn lenient_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().map(|f| f.round().max(0.0) as u64))
            .and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    }
}

fn de_lenient_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_count(&value).unwrap_or(0))
}

fn de_lenient_opt_count<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<u32>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_count(&value))
}

/// Accepts RFC 3339 (with `Z` or an explicit offset) and the sheet's
/// naive `YYYY-MM-DD HH:MM:SS` form, which is taken as UTC. Anything
/// else degrades to `None`.
pub fn parse_utc_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => parse_utc_timestamp(&s),
        _ => None,
    })
}

fn de_answer_key<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Answer>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => parse_answer_list(&s),
        Value::Array(items) => items
            .into_iter()
            .map(|v| match v {
                Value::String(s) => Answer::parse(&s),
                _ => Answer::BLANK,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// A detail array is used all-or-nothing: if any row fails to decode the
/// whole array is treated as malformed and ignored.
fn de_lenient_detail<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<Vec<AnswerDetail>>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(None);
    };
    let mut rows = Vec::with_capacity(items.len());
    for item in items {
        match serde_json::from_value::<AnswerDetail>(item) {
            Ok(row) => rows.push(row),
            Err(_) => return Ok(None),
        }
    }
    if rows.is_empty() {
        Ok(None)
    } else {
        Ok(Some(rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn choice_display_and_parse() {
        assert_eq!(Choice::A.to_string(), "A");
        assert_eq!("b".parse::<Choice>().unwrap(), Choice::B);
        assert_eq!(" e ".parse::<Choice>().unwrap(), Choice::E);
        assert!("F".parse::<Choice>().is_err());
        assert!("AB".parse::<Choice>().is_err());
    }

    #[test]
    fn invalid_answers_collapse_to_blank() {
        assert_eq!(Answer::parse("C"), Answer::from(Choice::C));
        assert_eq!(Answer::parse("x"), Answer::BLANK);
        assert_eq!(Answer::parse(""), Answer::BLANK);
        assert_eq!(Answer::parse(" d "), Answer::from(Choice::D));
    }

    #[test]
    fn answer_list_round_trip() {
        let answers = parse_answer_list("A,b,,X,E");
        assert_eq!(answers.len(), 5);
        assert_eq!(answers[1], Answer::from(Choice::B));
        assert!(answers[2].is_blank());
        assert!(answers[3].is_blank());
        assert_eq!(join_answer_list(&answers), "A,B,,,E");
        assert!(parse_answer_list("").is_empty());
        assert!(parse_answer_list("  ").is_empty());
    }

    #[test]
    fn window_requires_both_endpoints() {
        let mut exam: ExamDefinition = serde_json::from_value(serde_json::json!({
            "exam_id": "midterm-1",
            "title": "Midterm",
            "question_count": 10,
            "window_start_utc": "2025-10-28T13:00:00Z"
        }))
        .unwrap();
        assert!(exam.window().is_none());

        exam.window_end_utc = Some(Utc.with_ymd_and_hms(2025, 10, 28, 15, 0, 0).unwrap());
        let window = exam.window().unwrap();
        assert_eq!(
            window.status(Utc.with_ymd_and_hms(2025, 10, 28, 12, 0, 0).unwrap()),
            WindowStatus::NotYetOpen
        );
        assert_eq!(
            window.status(Utc.with_ymd_and_hms(2025, 10, 28, 14, 0, 0).unwrap()),
            WindowStatus::Open
        );
        // Bounds are inclusive.
        assert_eq!(
            window.status(Utc.with_ymd_and_hms(2025, 10, 28, 15, 0, 0).unwrap()),
            WindowStatus::Open
        );
        assert_eq!(
            window.status(Utc.with_ymd_and_hms(2025, 10, 28, 15, 0, 1).unwrap()),
            WindowStatus::Closed
        );
    }

    #[test]
    fn answer_key_accepts_string_and_array() {
        let from_string: ExamDefinition = serde_json::from_value(serde_json::json!({
            "exam_id": "e1",
            "question_count": 3,
            "answer_key": "A,B,C"
        }))
        .unwrap();
        let from_array: ExamDefinition = serde_json::from_value(serde_json::json!({
            "exam_id": "e1",
            "question_count": 3,
            "answer_key": ["a", "b", "c"]
        }))
        .unwrap();
        assert_eq!(from_string.answer_key, from_array.answer_key);
        assert_eq!(from_string.declared_key(3).unwrap().len(), 3);
    }

    #[test]
    fn declared_key_rejects_partial_keys() {
        let exam: ExamDefinition = serde_json::from_value(serde_json::json!({
            "exam_id": "e1",
            "question_count": 3,
            "answer_key": "A,,C"
        }))
        .unwrap();
        assert!(exam.declared_key(3).is_none());
        // A longer key is usable truncated.
        let exam: ExamDefinition = serde_json::from_value(serde_json::json!({
            "exam_id": "e1",
            "question_count": 2,
            "answer_key": "A,B,C"
        }))
        .unwrap();
        assert_eq!(exam.declared_key(2).unwrap().len(), 2);
        assert!(exam.declared_key(4).is_none());
    }

    #[test]
    fn dashboard_record_survives_dirty_fields() {
        let record: DashboardRecord = serde_json::from_value(serde_json::json!({
            "timestamp": "not a date",
            "student_name": "Ploy",
            "score": "4",
            "percent": 80.0,
            "answers": "A,B,C,D,",
            "detail": "oops"
        }))
        .unwrap();
        assert!(record.timestamp.is_none());
        assert_eq!(record.score, Some(4));
        assert_eq!(record.percent, Some(80));
        assert_eq!(record.answer_slots().len(), 5);
        assert!(record.detail.is_none());

        let empty: DashboardRecord = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(empty.student_name.is_empty());
        assert!(empty.answer_slots().is_empty());
    }

    #[test]
    fn detail_array_is_all_or_nothing() {
        let good: DashboardRecord = serde_json::from_value(serde_json::json!({
            "detail": [
                {"q": 1, "ans": "A", "correct": "A", "is_correct": true},
                {"q": 2, "ans": "", "correct": "B", "is_correct": false}
            ]
        }))
        .unwrap();
        let detail = good.detail.unwrap();
        assert_eq!(detail.len(), 2);
        assert_eq!(detail[1].expected, Answer::from(Choice::B));
        assert!(detail[1].submitted.is_blank());

        let bad: DashboardRecord = serde_json::from_value(serde_json::json!({
            "detail": [
                {"q": 1, "ans": "A", "correct": "A", "is_correct": true},
                ["not", "a", "row"]
            ]
        }))
        .unwrap();
        assert!(bad.detail.is_none());
    }

    #[test]
    fn timestamp_parsing_accepts_sheet_formats() {
        assert!(parse_utc_timestamp("2025-10-28T13:00:00Z").is_some());
        assert!(parse_utc_timestamp("2025-10-28T13:00:00+00:00").is_some());
        assert!(parse_utc_timestamp("2025-10-28 13:00:00").is_some());
        assert!(parse_utc_timestamp("").is_none());
        assert!(parse_utc_timestamp("28/10/2025").is_none());
    }

    #[test]
    fn score_serde_round_trip() {
        let score = Score {
            raw: 3,
            percent: 60,
            detail: vec![AnswerDetail {
                question: 1,
                submitted: Answer::from(Choice::A),
                expected: Answer::from(Choice::A),
                is_correct: true,
            }],
        };
        let json = serde_json::to_string(&score).unwrap();
        assert!(json.contains("\"score\":3"));
        assert!(json.contains("\"q\":1"));
        assert!(json.contains("\"ans\":\"A\""));
        let back: Score = serde_json::from_str(&json).unwrap();
        assert_eq!(back, score);
    }
}
