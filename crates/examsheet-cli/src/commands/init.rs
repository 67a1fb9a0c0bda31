//! The `examsheet init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("examsheet.toml").exists() {
        println!("examsheet.toml already exists, skipping.");
    } else {
        std::fs::write("examsheet.toml", SAMPLE_CONFIG)?;
        println!("Created examsheet.toml");
    }

    println!("\nNext steps:");
    println!("  1. Edit examsheet.toml with your store web app URL");
    println!("  2. Run: examsheet exams");
    println!("  3. Run: examsheet submit --name \"Your Name\" --answers \"A,B,C\"");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examsheet configuration

# Base URL of the Response Store web app (the deployed spreadsheet script).
webapp_url = "${EXAMSHEET_WEBAPP_URL}"

# Shared instructor secret for `examsheet set-active`. Students don't need it.
teacher_key = "${EXAMSHEET_TEACHER_KEY}"

# Request deadlines in seconds.
timeout_secs = 25
submit_timeout_secs = 30
"#;
