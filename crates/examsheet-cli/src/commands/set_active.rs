//! The `examsheet set-active` command.

use std::path::PathBuf;

use anyhow::Result;

use examsheet_core::error::{RejectCode, StoreError};
use examsheet_core::traits::ResponseStore;

pub async fn execute(exam_id: String, key: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let (config, store) = super::connect(config.as_deref())?;

    let teacher_key = key.unwrap_or(config.teacher_key);
    anyhow::ensure!(
        !teacher_key.is_empty(),
        "no teacher key configured: set teacher_key in examsheet.toml or pass --key"
    );

    match store.set_active_exam(&exam_id, &teacher_key).await {
        Ok(()) => {
            println!("Active exam set to {exam_id}");
            Ok(())
        }
        Err(StoreError::Rejected(RejectCode::Unauthorized)) => {
            anyhow::bail!("teacher key rejected by the store (UNAUTHORIZED)")
        }
        Err(e) => Err(e.into()),
    }
}
