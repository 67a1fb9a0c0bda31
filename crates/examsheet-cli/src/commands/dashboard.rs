//! The `examsheet dashboard` command: per-student results, aggregate
//! statistics, and item analysis for one exam.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examsheet_core::analysis::{analyze, summarize, ItemAnalysis, ItemStat};
use examsheet_core::model::{DashboardRecord, ExamDefinition};
use examsheet_core::traits::ResponseStore;

pub async fn execute(exam_id: Option<String>, json: bool, config: Option<PathBuf>) -> Result<()> {
    let (_, store) = super::connect(config.as_deref())?;

    let catalog = store.get_config().await?;
    let exam_id = match exam_id.or_else(|| catalog.active().map(str::to_string)) {
        Some(id) => id,
        None => anyhow::bail!("no exam id given and no active exam set"),
    };

    // Summaries in the catalog may carry the key; an unknown id still
    // gets a dashboard, just without a declared key.
    let exam = catalog.find(&exam_id).cloned().unwrap_or(ExamDefinition {
        exam_id: exam_id.clone(),
        title: String::new(),
        question_count: 0,
        answer_key: Vec::new(),
        window_start_utc: None,
        window_end_utc: None,
    });

    let mut records = store.get_dashboard(&exam_id).await?;
    if records.is_empty() {
        println!("No submissions for {exam_id} yet.");
        return Ok(());
    }
    records.sort_by_key(|r| r.timestamp);

    let analysis = analyze(&records, &exam);
    if json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    println!("Results for {exam_id} ({} submissions)\n", records.len());
    println!("{}", records_table(&records));

    if let Some(summary) = summarize(&records) {
        println!(
            "\nAverage: {:.1}% | best: {}% | worst: {}%",
            summary.mean_percent, summary.best_percent, summary.worst_percent
        );
    }

    if !analysis.items.is_empty() {
        println!("\nItem analysis ({} questions)\n", analysis.question_count);
        println!("{}", analysis_table(&analysis));
        if let Some(q) = analysis.hardest_question {
            println!("\nHardest question: {q}");
        }
    }
    Ok(())
}

fn records_table(records: &[DashboardRecord]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Time (UTC)", "Student", "Score", "Percent", "Answers"]);
    for record in records {
        let timestamp = record
            .timestamp
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(timestamp),
            Cell::new(&record.student_name),
            Cell::new(record.score.map(|s| s.to_string()).unwrap_or_default()),
            Cell::new(
                record
                    .percent
                    .map(|p| format!("{p}%"))
                    .unwrap_or_default(),
            ),
            Cell::new(&record.answers),
        ]);
    }
    table
}

fn analysis_table(analysis: &ItemAnalysis) -> Table {
    let mut table = Table::new();
    match analysis.items.first() {
        Some(ItemStat::Keyed { .. }) => {
            table.set_header(vec!["Question", "Correct", "Incorrect", "% Correct"]);
            for item in &analysis.items {
                if let ItemStat::Keyed {
                    question,
                    correct,
                    incorrect,
                    percent_correct,
                } = item
                {
                    table.add_row(vec![
                        Cell::new(question),
                        Cell::new(correct),
                        Cell::new(incorrect),
                        Cell::new(format!("{percent_correct}%")),
                    ]);
                }
            }
        }
        Some(ItemStat::Distribution { .. }) => {
            table.set_header(vec!["Question", "A", "B", "C", "D", "E", "blank"]);
            for item in &analysis.items {
                if let ItemStat::Distribution { question, counts } = item {
                    table.add_row(vec![
                        Cell::new(question),
                        Cell::new(counts.a),
                        Cell::new(counts.b),
                        Cell::new(counts.c),
                        Cell::new(counts.d),
                        Cell::new(counts.e),
                        Cell::new(counts.blank),
                    ]);
                }
            }
        }
        None => {}
    }
    table
}
