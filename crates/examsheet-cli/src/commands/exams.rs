//! The `examsheet exams` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use examsheet_core::traits::ResponseStore;

pub async fn execute(config: Option<PathBuf>) -> Result<()> {
    let (_, store) = super::connect(config.as_deref())?;
    let catalog = store.get_config().await?;

    if catalog.exams.is_empty() {
        println!("No exams defined in the store yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Exam ID", "Title", "Questions", "Active"]);
    for exam in &catalog.exams {
        let active = catalog.active() == Some(exam.exam_id.as_str());
        table.add_row(vec![
            Cell::new(&exam.exam_id),
            Cell::new(&exam.title),
            Cell::new(exam.question_count),
            Cell::new(if active { "*" } else { "" }),
        ]);
    }
    println!("{table}");

    match catalog.active() {
        Some(id) => println!("Active exam: {id}"),
        None => println!("No active exam set."),
    }
    Ok(())
}
