//! Per-question ("item") statistics over all submitted records.
//!
//! Everything here is a pure computation over already-fetched data,
//! recomputed on every dashboard view and never persisted. Records come
//! from a spreadsheet-backed store and are treated as dirty input: a
//! single corrupt record degrades to "all incorrect" or gets skipped,
//! never aborting the aggregation.

use std::collections::HashMap;

use serde::Serialize;

use crate::grading::percent_of;
use crate::model::{Answer, Choice, DashboardRecord, ExamDefinition};

/// Item statistics for one exam's submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemAnalysis {
    /// The reconciled effective question count.
    pub question_count: usize,
    pub total_records: usize,
    pub items: Vec<ItemStat>,
    /// 1-based number of the question with the lowest percent correct
    /// (ties to the lowest index). Only present in keyed mode.
    pub hardest_question: Option<u32>,
}

/// Statistics for a single question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemStat {
    /// An answer key was resolvable: correctness counts.
    Keyed {
        question: u32,
        correct: u32,
        incorrect: u32,
        percent_correct: u32,
    },
    /// No key: how the class distributed over the options.
    Distribution { question: u32, counts: OptionCounts },
}

/// Choice histogram for one question. Blank and invalid entries share
/// the sixth bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OptionCounts {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub e: u32,
    pub blank: u32,
}

impl OptionCounts {
    fn record(&mut self, answer: Answer) {
        match answer.0 {
            Some(Choice::A) => self.a += 1,
            Some(Choice::B) => self.b += 1,
            Some(Choice::C) => self.c += 1,
            Some(Choice::D) => self.d += 1,
            Some(Choice::E) => self.e += 1,
            None => self.blank += 1,
        }
    }

    pub fn count(&self, choice: Choice) -> u32 {
        match choice {
            Choice::A => self.a,
            Choice::B => self.b,
            Choice::C => self.c,
            Choice::D => self.d,
            Choice::E => self.e,
        }
    }
}

/// Aggregate percent statistics across all records that carry one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub mean_percent: f64,
    pub best_percent: u32,
    pub worst_percent: u32,
}

/// Compute per-question statistics for one exam's records.
///
/// Pure and idempotent: the same records yield the same stats.
pub fn analyze(records: &[DashboardRecord], exam: &ExamDefinition) -> ItemAnalysis {
    let question_count = effective_question_count(records, exam);
    let total_records = records.len();
    if question_count == 0 {
        return ItemAnalysis {
            question_count,
            total_records,
            items: Vec::new(),
            hardest_question: None,
        };
    }

    match resolve_key(records, exam, question_count) {
        Some(key) => keyed_analysis(records, &key, question_count),
        None => distribution_analysis(records, question_count),
    }
}

/// Reconcile the effective question count from the candidate sources:
/// the majority observed answer-vector length, the first embedded detail
/// length, and the declared key length. The minimum of the positive
/// candidates wins, so disagreeing sources can never push an index past
/// the shortest one.
fn effective_question_count(records: &[DashboardRecord], exam: &ExamDefinition) -> usize {
    let mut candidates = Vec::with_capacity(3);
    if let Some(len) = majority_answer_len(records) {
        candidates.push(len);
    }
    if let Some(detail) = records.iter().find_map(|r| r.detail.as_ref()) {
        if !detail.is_empty() {
            candidates.push(detail.len());
        }
    }
    if !exam.answer_key.is_empty() {
        candidates.push(exam.answer_key.len());
    }
    candidates.into_iter().min().unwrap_or(0)
}

/// Most common nonzero answer-vector length. Frequency ties break toward
/// the smaller length, the same defensive direction as the overall
/// minimum policy.
fn majority_answer_len(records: &[DashboardRecord]) -> Option<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for record in records {
        let len = record.answer_slots().len();
        if len > 0 {
            *counts.entry(len).or_default() += 1;
        }
    }
    counts
        .into_iter()
        .min_by(|(len_a, n_a), (len_b, n_b)| n_b.cmp(n_a).then(len_a.cmp(len_b)))
        .map(|(len, _)| len)
}

/// A usable key over the first `question_count` slots: the exam's
/// declared key when fully populated, else reconstructed from the first
/// record whose embedded detail covers every slot.
fn resolve_key(
    records: &[DashboardRecord],
    exam: &ExamDefinition,
    question_count: usize,
) -> Option<Vec<Answer>> {
    if let Some(key) = exam.declared_key(question_count) {
        return Some(key);
    }
    records
        .iter()
        .find_map(|record| key_from_detail(record, question_count))
}

fn key_from_detail(record: &DashboardRecord, question_count: usize) -> Option<Vec<Answer>> {
    let detail = record.detail.as_ref()?;
    if detail.len() < question_count {
        return None;
    }
    let key: Vec<Answer> = detail[..question_count]
        .iter()
        .map(|row| row.expected)
        .collect();
    if key.iter().any(Answer::is_blank) {
        return None;
    }
    Some(key)
}

fn keyed_analysis(
    records: &[DashboardRecord],
    key: &[Answer],
    question_count: usize,
) -> ItemAnalysis {
    let total = records.len() as u32;
    let mut items = Vec::with_capacity(question_count);
    let mut hardest: Option<(u32, u32)> = None;

    let slots: Vec<Vec<Answer>> = records.iter().map(DashboardRecord::answer_slots).collect();
    for (i, &expected) in key.iter().enumerate().take(question_count) {
        let correct = slots
            .iter()
            .filter(|answers| answers.get(i).copied().unwrap_or_default() == expected)
            .count() as u32;
        let percent_correct = percent_of(correct as usize, total as usize);
        let question = (i + 1) as u32;
        // Strict less-than keeps the lowest index on ties.
        if hardest.map(|(_, p)| percent_correct < p).unwrap_or(true) {
            hardest = Some((question, percent_correct));
        }
        items.push(ItemStat::Keyed {
            question,
            correct,
            incorrect: total - correct,
            percent_correct,
        });
    }

    ItemAnalysis {
        question_count,
        total_records: records.len(),
        items,
        hardest_question: hardest.map(|(q, _)| q),
    }
}

fn distribution_analysis(records: &[DashboardRecord], question_count: usize) -> ItemAnalysis {
    let mut counts = vec![OptionCounts::default(); question_count];
    for record in records {
        let answers = record.answer_slots();
        for (i, bucket) in counts.iter_mut().enumerate() {
            bucket.record(answers.get(i).copied().unwrap_or_default());
        }
    }

    ItemAnalysis {
        question_count,
        total_records: records.len(),
        items: counts
            .into_iter()
            .enumerate()
            .map(|(i, counts)| ItemStat::Distribution {
                question: (i + 1) as u32,
                counts,
            })
            .collect(),
        hardest_question: None,
    }
}

/// Aggregate percent statistics over the records that carry a percent.
pub fn summarize(records: &[DashboardRecord]) -> Option<ScoreSummary> {
    let percents: Vec<u32> = records.iter().filter_map(|r| r.percent).collect();
    if percents.is_empty() {
        return None;
    }
    let sum: u64 = percents.iter().map(|&p| p as u64).sum();
    Some(ScoreSummary {
        mean_percent: sum as f64 / percents.len() as f64,
        best_percent: *percents.iter().max().unwrap(),
        worst_percent: *percents.iter().min().unwrap(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> DashboardRecord {
        serde_json::from_value(value).unwrap()
    }

    fn exam_with_key(qn: u32, key: &str) -> ExamDefinition {
        serde_json::from_value(json!({
            "exam_id": "quiz-1",
            "question_count": qn,
            "answer_key": key
        }))
        .unwrap()
    }

    fn exam_without_key(qn: u32) -> ExamDefinition {
        serde_json::from_value(json!({
            "exam_id": "quiz-1",
            "question_count": qn
        }))
        .unwrap()
    }

    #[test]
    fn keyed_counts_per_question() {
        let exam = exam_with_key(3, "A,B,C");
        let records = vec![
            record(json!({"student_name": "p1", "answers": "A,B,C"})),
            record(json!({"student_name": "p2", "answers": "A,E,C"})),
            record(json!({"student_name": "p3", "answers": "a,b,"})),
        ];
        let analysis = analyze(&records, &exam);
        assert_eq!(analysis.question_count, 3);
        assert_eq!(
            analysis.items[0],
            ItemStat::Keyed {
                question: 1,
                correct: 3,
                incorrect: 0,
                percent_correct: 100
            }
        );
        assert_eq!(
            analysis.items[1],
            ItemStat::Keyed {
                question: 2,
                correct: 2,
                incorrect: 1,
                percent_correct: 67
            }
        );
        assert_eq!(
            analysis.items[2],
            ItemStat::Keyed {
                question: 3,
                correct: 2,
                incorrect: 1,
                percent_correct: 67
            }
        );
        assert_eq!(analysis.hardest_question, Some(2));
    }

    #[test]
    fn distribution_when_no_key_resolvable() {
        let exam = exam_without_key(2);
        let records = vec![
            record(json!({"student_name": "p1", "answers": "A,A"})),
            record(json!({"student_name": "p2", "answers": "B,A"})),
        ];
        let analysis = analyze(&records, &exam);
        assert_eq!(analysis.hardest_question, None);
        let ItemStat::Distribution { counts: q1, .. } = analysis.items[0] else {
            panic!("expected distribution");
        };
        assert_eq!((q1.a, q1.b), (1, 1));
        let ItemStat::Distribution { counts: q2, .. } = analysis.items[1] else {
            panic!("expected distribution");
        };
        assert_eq!(q2.a, 2);
        assert_eq!(q2.blank, 0);
    }

    #[test]
    fn blank_and_invalid_share_a_bucket() {
        let exam = exam_without_key(1);
        let records = vec![
            record(json!({"answers": "X"})),
            record(json!({"answers": ""})),
            record(json!({"answers": "E"})),
        ];
        let analysis = analyze(&records, &exam);
        let ItemStat::Distribution { counts, .. } = analysis.items[0] else {
            panic!("expected distribution");
        };
        // The zero-length record also lands in the blank bucket.
        assert_eq!(counts.blank, 2);
        assert_eq!(counts.count(Choice::E), 1);
    }

    #[test]
    fn question_count_takes_minimum_of_positive_candidates() {
        // Majority answer length 10, detail length 8, key length 10.
        let detail_rows: Vec<serde_json::Value> = (1..=8)
            .map(|q| json!({"q": q, "ans": "A", "correct": "A", "is_correct": true}))
            .collect();
        let records = vec![
            record(json!({"answers": "A,A,A,A,A,A,A,A,A,A", "detail": detail_rows})),
            record(json!({"answers": "B,B,B,B,B,B,B,B,B,B"})),
            record(json!({"answers": "C,C,C,C,C,C,C,C,C,C"})),
        ];
        let exam = exam_with_key(10, "A,A,A,A,A,A,A,A,A,A");
        let analysis = analyze(&records, &exam);
        assert_eq!(analysis.question_count, 8);
        assert_eq!(analysis.items.len(), 8);
    }

    #[test]
    fn majority_length_tie_breaks_to_smaller() {
        let records = vec![
            record(json!({"answers": "A,B"})),
            record(json!({"answers": "A,B,C"})),
        ];
        let exam = exam_without_key(0);
        assert_eq!(analyze(&records, &exam).question_count, 2);
    }

    #[test]
    fn key_reconstructed_from_embedded_detail() {
        // No declared key; the first record's detail carries the key.
        let exam = exam_without_key(2);
        let records = vec![
            record(json!({
                "answers": "A,C",
                "detail": [
                    {"q": 1, "ans": "A", "correct": "A", "is_correct": true},
                    {"q": 2, "ans": "C", "correct": "B", "is_correct": false}
                ]
            })),
            record(json!({"answers": "A,B"})),
        ];
        let analysis = analyze(&records, &exam);
        assert_eq!(
            analysis.items[1],
            ItemStat::Keyed {
                question: 2,
                correct: 1,
                incorrect: 1,
                percent_correct: 50
            }
        );
    }

    #[test]
    fn corrupt_records_degrade_instead_of_aborting() {
        let exam = exam_with_key(2, "A,B");
        let records = vec![
            record(json!({"student_name": "ok", "answers": "A,B"})),
            // Missing answers: zero-length vector, incorrect everywhere.
            record(json!({"student_name": "empty"})),
            // Malformed detail was dropped at decode time.
            record(json!({"student_name": "dirty", "answers": "A,B", "detail": 42})),
        ];
        let analysis = analyze(&records, &exam);
        assert_eq!(analysis.total_records, 3);
        assert_eq!(
            analysis.items[0],
            ItemStat::Keyed {
                question: 1,
                correct: 2,
                incorrect: 1,
                percent_correct: 67
            }
        );
    }

    #[test]
    fn hardest_question_ties_to_lowest_index() {
        let exam = exam_with_key(3, "A,B,C");
        let records = vec![
            record(json!({"answers": "A,E,E"})),
            record(json!({"answers": "A,E,E"})),
        ];
        let analysis = analyze(&records, &exam);
        // Questions 2 and 3 are both at 0%; the tie goes to question 2.
        assert_eq!(analysis.hardest_question, Some(2));
    }

    #[test]
    fn analyze_is_idempotent() {
        let exam = exam_with_key(3, "A,B,C");
        let records = vec![
            record(json!({"answers": "A,B,C"})),
            record(json!({"answers": "C,B,A"})),
        ];
        assert_eq!(analyze(&records, &exam), analyze(&records, &exam));
    }

    #[test]
    fn empty_inputs_yield_an_empty_analysis() {
        let analysis = analyze(&[], &exam_without_key(0));
        assert_eq!(analysis.question_count, 0);
        assert!(analysis.items.is_empty());

        // Records with no answers and no key resolve to zero questions.
        let records = vec![record(json!({"student_name": "p1"}))];
        let analysis = analyze(&records, &exam_without_key(5));
        assert_eq!(analysis.question_count, 0);
    }

    #[test]
    fn summary_over_recorded_percents() {
        let records = vec![
            record(json!({"percent": 40})),
            record(json!({"percent": 95})),
            record(json!({"percent": "60"})),
            record(json!({"student_name": "no-percent"})),
        ];
        let summary = summarize(&records).unwrap();
        assert!((summary.mean_percent - 65.0).abs() < 1e-9);
        assert_eq!(summary.best_percent, 95);
        assert_eq!(summary.worst_percent, 40);
        assert!(summarize(&[]).is_none());
    }
}
