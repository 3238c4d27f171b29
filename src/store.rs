//! Activity record store: an append-only JSONL file shared by every
//! connection handler.
//!
//! One record per line. `append` holds a mutex for the whole
//! write-and-flush, so concurrent handlers can never interleave partial
//! lines, and the record is on disk before `append` returns.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// One unit of captured traffic: a single read from one connection.
///
/// Records carry no connection identifier; the analyzer groups them by
/// source IP.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub timestamp: DateTime<Local>,
    pub remote_ip: String,
    pub port: u16,
    pub data: String,
}

impl ActivityRecord {
    /// Build a record for raw bytes received now from `remote_ip` on `port`.
    pub fn capture(remote_ip: String, port: u16, raw: &[u8]) -> Self {
        Self {
            timestamp: Local::now(),
            remote_ip,
            port,
            data: lossy_text(raw),
        }
    }
}

/// Decode arbitrary peer bytes as text. Invalid UTF-8 sequences become
/// U+FFFD replacement characters; decoding never fails.
pub fn lossy_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// File name for the capture log of a given day. The store does not roll
/// over at midnight; the day the process started names the whole run's file.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("honeypot_{}.json", date.format("%Y%m%d"))
}

/// Shared handle to the append-only record file.
#[derive(Clone)]
pub struct RecordStore {
    path: Arc<PathBuf>,
    file: Arc<Mutex<File>>,
}

impl RecordStore {
    /// Open (creating as needed) the day-named store inside `log_dir`.
    pub async fn open(log_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(log_dir)
            .await
            .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
        let path = log_dir.join(log_file_name(Local::now().date_naive()));
        Self::open_path(&path).await
    }

    /// Open a store at an explicit path, appending to any existing records.
    pub async fn open_path(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("failed to open record store {}", path.display()))?;

        Ok(Self {
            path: Arc::new(path.to_path_buf()),
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a complete JSON line, durably.
    pub async fn append(&self, record: &ActivityRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self.file.lock().await;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn temp_store_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "portsnare_store_{}_{}_{}.json",
            tag,
            std::process::id(),
            Local::now().nanosecond()
        ))
    }

    #[test]
    fn lossy_text_replaces_invalid_bytes() {
        let decoded = lossy_text(b"ls -la\xff\xfe\n");
        assert_eq!(decoded, "ls -la\u{fffd}\u{fffd}\n");
        assert_eq!(lossy_text(b"GET / HTTP/1.1"), "GET / HTTP/1.1");
    }

    #[test]
    fn log_file_name_is_day_stamped() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(log_file_name(date), "honeypot_20240307.json");
    }

    #[tokio::test]
    async fn append_round_trips_through_json() {
        let path = temp_store_path("roundtrip");
        let store = RecordStore::open_path(&path).await.unwrap();

        let record = ActivityRecord::capture("203.0.113.9".to_string(), 22, b"root:toor\r\n");
        store.append(&record).await.unwrap();

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let parsed: ActivityRecord = serde_json::from_str(contents.trim_end()).unwrap();
        assert_eq!(parsed.remote_ip, record.remote_ip);
        assert_eq!(parsed.port, 22);
        assert_eq!(parsed.data.trim(), "root:toor");

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn concurrent_appends_never_interleave() {
        let path = temp_store_path("concurrent");
        let store = RecordStore::open_path(&path).await.unwrap();

        let mut tasks = Vec::new();
        for writer in 0..8u16 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..25 {
                    let record = ActivityRecord::capture(
                        format!("10.0.0.{}", writer),
                        1000 + writer,
                        format!("payload {} from writer {}", i, writer).as_bytes(),
                    );
                    store.append(&record).await.unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            let parsed: ActivityRecord = serde_json::from_str(line).unwrap();
            assert!(parsed.remote_ip.starts_with("10.0.0."));
        }

        let _ = std::fs::remove_file(&path);
    }
}
