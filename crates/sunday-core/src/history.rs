//! Persisted conversation history: one JSON array on disk, rewritten wholesale on every change.
//!
//! Every read goes to disk; there is no in-memory cache. Mutations are serialized behind a
//! mutex and re-read the file while holding it, so overlapping chats append instead of
//! overwriting each other.

use crate::error::HistoryError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One recorded message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    /// Older history files carry turns without one; those read as empty.
    #[serde(default)]
    pub timestamp: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: timestamp.into(),
        }
    }
}

/// Local wall-clock time, ISO-8601 without offset, microsecond precision.
pub fn now_timestamp() -> String {
    chrono::Local::now()
        .naive_local()
        .format("%Y-%m-%dT%H:%M:%S%.6f")
        .to_string()
}

/// File-backed history store.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Full history, oldest first. A missing or malformed file reads as empty.
    pub async fn load(&self) -> Vec<Turn> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(target: "sunday::history", path = %self.path.display(), "History read failed, using empty history: {}", e);
                return Vec::new();
            }
        };
        match serde_json::from_slice::<Vec<Turn>>(&bytes) {
            Ok(turns) => turns,
            Err(e) => {
                tracing::warn!(target: "sunday::history", path = %self.path.display(), "History file is not a valid turn list, using empty history: {}", e);
                Vec::new()
            }
        }
    }

    /// Rewrite the file as an empty array.
    pub async fn clear(&self) -> Result<(), HistoryError> {
        let _guard = self.write_lock.lock().await;
        self.write(&[]).await?;
        tracing::info!(target: "sunday::history", "History cleared");
        Ok(())
    }

    /// Append a user turn and an assistant turn sharing `timestamp`. Returns the new length.
    pub async fn append_exchange(
        &self,
        user_message: &str,
        assistant_reply: &str,
        timestamp: &str,
    ) -> Result<usize, HistoryError> {
        let _guard = self.write_lock.lock().await;
        let mut turns = self.load().await;
        turns.push(Turn::new(Role::User, user_message, timestamp));
        turns.push(Turn::new(Role::Assistant, assistant_reply, timestamp));
        self.write(&turns).await?;
        Ok(turns.len())
    }

    /// Write a sibling temp file and rename it over the history file, so unlocked readers
    /// see either the old array or the new one.
    async fn write(&self, turns: &[Turn]) -> Result<(), HistoryError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(turns)?;
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "history.json".into());
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("none.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(&path, b"{not json").unwrap();
        let store = HistoryStore::new(&path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn append_exchange_keeps_order_and_shared_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));
        store.append_exchange("hi", "hello", "2025-01-01T10:00:00.000000").await.unwrap();
        let len = store
            .append_exchange("again", "still here", "2025-01-01T10:01:00.000000")
            .await
            .unwrap();
        assert_eq!(len, 4);

        let turns = store.load().await;
        let roles: Vec<Role> = turns.iter().map(|t| t.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
        assert_eq!(turns[0].timestamp, turns[1].timestamp);
        assert_eq!(turns[2].content, "again");
    }

    #[tokio::test]
    async fn file_is_pretty_json_with_lowercase_roles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.json");
        let store = HistoryStore::new(&path);
        store.append_exchange("q", "a", "t").await.unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\n  {"));
        assert!(raw.contains("\"role\": \"user\""));
        assert!(raw.contains("\"role\": \"assistant\""));
    }

    #[tokio::test]
    async fn clear_writes_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::new(&path);
        store.append_exchange("q", "a", "t").await.unwrap();
        store.clear().await.unwrap();
        assert!(store.load().await.is_empty());
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "[]");
    }

    #[test]
    fn timestamp_has_microseconds_and_no_offset() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), "2025-01-01T00:00:00.000000".len());
        assert_eq!(&ts[10..11], "T");
        assert!(!ts.ends_with('Z'));
    }

    #[tokio::test]
    async fn turns_without_timestamp_are_kept_on_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[{"role":"user","content":"old 1"},{"role":"assistant","content":"old 2"}]"#,
        )
        .unwrap();
        let store = HistoryStore::new(&path);

        let loaded = store.load().await;
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "old 1");
        assert_eq!(loaded[0].timestamp, "");

        assert_eq!(store.append_exchange("new", "reply", "t").await.unwrap(), 4);
        let turns = store.load().await;
        let contents: Vec<&str> = turns.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["old 1", "old 2", "new", "reply"]);
    }

    #[tokio::test]
    async fn write_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let store = HistoryStore::new(&path);
        store.append_exchange("q", "a", "t").await.unwrap();
        assert!(path.exists());
        assert!(!dir.path().join("history.json.tmp").exists());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn readers_never_see_a_partial_file_during_writes() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(HistoryStore::new(dir.path().join("history.json")));
        let long = "x".repeat(64 * 1024);

        let writer = {
            let store = store.clone();
            let long = long.clone();
            tokio::spawn(async move {
                for i in 0..20 {
                    store.append_exchange(&format!("{} {}", i, long), &long, "t").await.unwrap();
                }
            })
        };

        let mut last = 0;
        while !writer.is_finished() {
            let len = store.load().await.len();
            assert!(len >= last, "history shrank from {} to {}", last, len);
            assert_eq!(len % 2, 0);
            last = len;
            tokio::task::yield_now().await;
        }
        writer.await.unwrap();
        assert_eq!(store.load().await.len(), 40);
    }
}
