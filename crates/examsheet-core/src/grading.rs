//! The grading engine: a pure function from an answer key and a
//! submitted answer vector to a [`Score`].

use crate::error::GradeError;
use crate::model::{Answer, AnswerDetail, Score};

/// Grade a submitted answer vector against the authoritative key.
///
/// The key must cover exactly `question_count` slots; that is a server
/// trust precondition and violating it is an error. The submitted vector
/// is client input and gets no such trust: it is truncated or padded
/// defensively, and any slot beyond its length counts as incorrect.
pub fn grade(
    question_count: usize,
    answer_key: &[Answer],
    submitted: &[Answer],
) -> Result<Score, GradeError> {
    if question_count == 0 {
        return Err(GradeError::InvalidExam(
            "question count must be positive".into(),
        ));
    }
    if answer_key.len() != question_count {
        return Err(GradeError::InvalidExam(format!(
            "answer key covers {} of {} questions",
            answer_key.len(),
            question_count
        )));
    }

    let mut raw = 0u32;
    let mut detail = Vec::with_capacity(question_count);
    for (i, &expected) in answer_key.iter().enumerate() {
        let given = submitted.get(i).copied().unwrap_or_default();
        let is_correct = !expected.is_blank() && given == expected;
        if is_correct {
            raw += 1;
        }
        detail.push(AnswerDetail {
            question: (i + 1) as u32,
            submitted: given,
            expected,
            is_correct,
        });
    }

    Ok(Score {
        raw,
        percent: percent_of(raw as usize, question_count),
        detail,
    })
}

/// Integer percentage with ties rounded up, matching the store's
/// `Math.round` behavior. A zero denominator yields 0.
pub fn percent_of(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part * 200 + total) / (total * 2)) as u32
}
