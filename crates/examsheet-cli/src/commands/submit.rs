//! The `examsheet submit` command: the student flow.

use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use examsheet_core::error::SessionError;
use examsheet_core::model::parse_answer_list;
use examsheet_core::session::{ExamSession, SessionState};
use examsheet_core::traits::ResponseStore;

pub async fn execute(name: String, answers: String, config: Option<PathBuf>) -> Result<()> {
    let (_, store) = super::connect(config.as_deref())?;

    let exam = store
        .get_active_exam()
        .await
        .map_err(|e| anyhow::anyhow!("no active exam available: {e}"))?;

    println!(
        "Exam: {} - {} ({} questions, options A-E)",
        exam.exam_id, exam.title, exam.question_count
    );
    if let Some(window) = exam.window() {
        println!("Window (UTC): {} -> {}", window.start, window.end);
    }

    let parsed = parse_answer_list(&answers);
    let question_count = exam.question_count as usize;
    anyhow::ensure!(
        parsed.len() <= question_count,
        "got {} answers for a {}-question exam",
        parsed.len(),
        question_count
    );

    let mut session = ExamSession::new(exam);
    for (i, answer) in parsed.into_iter().enumerate() {
        session.set_answer(i + 1, answer)?;
    }

    match session.arm(&name, Utc::now()) {
        Ok(()) => {}
        Err(SessionError::EmptyName) => anyhow::bail!("please enter a student name"),
        Err(SessionError::OutsideWindow(code)) => {
            anyhow::bail!("submission rejected without sending: {code}")
        }
        Err(e) => return Err(e.into()),
    }

    let state = session.transmit(&store, Utc::now()).await?;
    match (state, session.result(), session.last_error()) {
        (SessionState::LockedSuccess, Some(score), _) => {
            println!(
                "\nSubmitted. Score: {}/{} ({}%)",
                score.raw,
                session.exam().question_count,
                score.percent
            );
            if !score.detail.is_empty() {
                println!("\n{}", detail_table(score));
            }
            Ok(())
        }
        (SessionState::LockedFailed, _, Some(err)) => {
            match err.reject_code().map(|c| c.as_code()) {
                Some("DUPLICATE_SUBMISSION") => anyhow::bail!(
                    "this name already has a recorded submission for this exam \
                     (DUPLICATE_SUBMISSION)"
                ),
                Some(code) => anyhow::bail!("submission rejected: {code}"),
                None => anyhow::bail!("submission rejected: {err}"),
            }
        }
        (_, _, Some(err)) => {
            anyhow::bail!("submission failed ({err}) - you can run the command again")
        }
        _ => anyhow::bail!("submission did not complete"),
    }
}

fn detail_table(score: &examsheet_core::model::Score) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Yours", "Key", "Result"]);
    for row in &score.detail {
        table.add_row(vec![
            Cell::new(row.question),
            Cell::new(row.submitted.as_str()),
            Cell::new(row.expected.as_str()),
            Cell::new(if row.is_correct { "correct" } else { "wrong" }),
        ]);
    }
    table
}
