//! Transaction Journal - Append-only JSONL operation records
//!
//! Terminal operation outcomes go to daily files
//! `transactions/YYYY-MM-DD.jsonl`, one JSON object per line.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use crate::ports::repository::TxRecord;

/// Append-only JSONL journal with daily file rotation.
pub struct TxJournal {
    dir: PathBuf,
}

impl TxJournal {
    /// Create the journal under `data_dir/transactions`.
    pub async fn new(data_dir: &Path) -> Result<Self> {
        let dir = data_dir.join("transactions");
        fs::create_dir_all(&dir)
            .await
            .context("Failed to create transactions directory")?;
        Ok(Self { dir })
    }

    /// Append a record to today's file.
    #[instrument(skip(self, record), fields(op_id = %record.op_id))]
    pub async fn append(&self, record: &TxRecord) -> Result<()> {
        let date = Utc::now().format("%Y-%m-%d").to_string();
        let path = self.dir.join(format!("{date}.jsonl"));

        let mut json = serde_json::to_string(record).context("Failed to serialize transaction record")?;
        json.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .context("Failed to open transaction journal")?;

        file.write_all(json.as_bytes())
            .await
            .context("Failed to write transaction record")?;
        file.flush().await.context("Failed to flush transaction journal")?;

        debug!(path = %path.display(), "Transaction record appended");
        Ok(())
    }

    /// The newest `limit` records across all daily files, oldest first.
    pub async fn recent(&self, limit: usize) -> Result<Vec<TxRecord>> {
        let mut files = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "jsonl") {
                files.push(path);
            }
        }
        // File names are ISO dates, so lexical order is chronological.
        files.sort();

        let mut records = Vec::new();
        for path in files.iter().rev() {
            let content = fs::read_to_string(path).await?;
            let mut day: Vec<TxRecord> = content
                .lines()
                .filter(|line| !line.trim().is_empty())
                .filter_map(|line| match serde_json::from_str::<TxRecord>(line) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(file = %path.display(), error = %e, "Skipping malformed transaction record");
                        None
                    }
                })
                .collect();
            day.append(&mut records);
            records = day;
            if records.len() >= limit {
                break;
            }
        }

        let skip = records.len().saturating_sub(limit);
        Ok(records.split_off(skip))
    }
}
