// src/storage/review_log.rs
// Append-only audit log of scheduling results, one JSON object per line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::card::CardKey;
use crate::error::StoreError;
use crate::scheduler::SchedulingResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewLogEntry {
    pub logged_at: DateTime<Utc>,
    #[serde(flatten)]
    pub key: CardKey,
    pub result: SchedulingResult,
}

pub struct ReviewLog {
    log_path: PathBuf,
}

impl ReviewLog {
    /// Creates a logger writing to `path`, creating its parent directories if needed.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let log_path = path.into();
        if let Some(parent) = log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(ReviewLog { log_path })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Appends a single review to the log.
    pub fn log_review(&self, key: &CardKey, result: &SchedulingResult) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        let entry = ReviewLogEntry {
            logged_at: Utc::now(),
            key: key.clone(),
            result: result.clone(),
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Reads every entry back in the order it was written. A missing file is an empty log.
    pub fn read_all(&self) -> Result<Vec<ReviewLogEntry>, StoreError> {
        let file = match File::open(&self.log_path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }
        Ok(entries)
    }
}
