use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::Local;
use relay_common::{RelayError, Result};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// `last_updated` is written in local time with this layout.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One successfully published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRecord {
    /// Older history files predate this field; see [`HistoryStore::load`].
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    pub original: String,
    pub translated: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub tweet_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub last_updated: String,
    #[serde(default)]
    pub data: Vec<PublishRecord>,
}

/// In-memory history plus the file it snapshots to.
///
/// Membership answers from memory, so an [`append`](Self::append) is visible
/// to [`contains`](Self::contains) immediately, long before any flush.
#[derive(Debug)]
pub struct HistoryStore {
    path: PathBuf,
    state: PersistedState,
    seen: HashSet<String>,
}

impl HistoryStore {
    /// Empty history that will flush to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            state: PersistedState::default(),
            seen: HashSet::new(),
        }
    }

    /// Load history from `path`. Never fails: a missing file starts empty, and
    /// an unreadable one is moved aside to `<path>.corrupt` before starting
    /// empty.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let state = match read_state(&path).await {
            Ok(Some(state)) => state,
            Ok(None) => {
                info!(event = "store.load.missing", path = %path.display());
                PersistedState::default()
            }
            Err(e) => {
                warn!(event = "store.load.corrupt", path = %path.display(), error = %e);
                set_aside(&path).await;
                PersistedState::default()
            }
        };

        let mut store = Self::empty(path);
        for mut record in state.data {
            if record.id.is_empty() {
                record.id = id_from_status_url(&record.tweet_url).unwrap_or_default();
            }
            if !record.id.is_empty() {
                store.seen.insert(record.id.clone());
            }
            store.state.data.push(record);
        }
        store.state.last_updated = state.last_updated;
        info!(
            event = "store.load.ok",
            path = %store.path.display(),
            records = store.len()
        );
        store
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    pub fn records(&self) -> &[PublishRecord] {
        &self.state.data
    }

    pub fn len(&self) -> usize {
        self.state.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.data.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Add a record to memory. Returns `false` and leaves the history
    /// untouched when the id is already present.
    pub fn append(&mut self, record: PublishRecord) -> bool {
        if !self.seen.insert(record.id.clone()) {
            warn!(event = "store.append.duplicate", id = %record.id);
            return false;
        }
        self.state.data.push(record);
        true
    }

    /// Write the whole state with a fresh timestamp. The file is replaced by
    /// rename, so readers see either the old snapshot or the new one.
    pub async fn flush(&mut self) -> Result<()> {
        self.state.last_updated = Local::now().format(TIMESTAMP_FORMAT).to_string();
        let bytes = serde_json::to_vec_pretty(&self.state)
            .map_err(|e| RelayError::StoreCorrupt(format!("serialize history: {e}")))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = tmp_path(&self.path);
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        tokio::fs::rename(&tmp, &self.path).await?;

        info!(
            event = "store.flush.ok",
            path = %self.path.display(),
            records = self.len()
        );
        Ok(())
    }
}

async fn read_state(path: &Path) -> Result<Option<PersistedState>> {
    let bytes = match tokio::fs::read(path).await {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(RelayError::StoreCorrupt(format!("read: {e}"))),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|e| RelayError::StoreCorrupt(e.to_string()))
}

async fn set_aside(path: &Path) {
    let mut aside = path.as_os_str().to_owned();
    aside.push(".corrupt");
    if let Err(e) = tokio::fs::rename(path, &aside).await {
        warn!(event = "store.load.set_aside_failed", path = %path.display(), error = %e);
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Trailing numeric segment of a `/status/<id>` link.
fn id_from_status_url(url: &str) -> Option<String> {
    let (_, tail) = url.split_once("/status/")?;
    let id: String = tail.chars().take_while(char::is_ascii_digit).collect();
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(id: &str) -> PublishRecord {
        PublishRecord {
            id: id.to_string(),
            username: Some("codeglitch".into()),
            date: None,
            original: format!("original {id}"),
            translated: format!("terjemahan {id}"),
            images: vec![],
            tweet_url: format!("https://x.com/codeglitch/status/{id}"),
        }
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = HistoryStore::load(tmp.path().join("results.json")).await;
        assert!(store.is_empty());
        assert!(!store.contains("1"));
    }

    #[tokio::test]
    async fn corrupt_file_loads_empty_and_is_set_aside() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("results.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();

        let store = HistoryStore::load(&path).await;
        assert!(store.is_empty());
        assert!(!path.exists());
        assert!(tmp.path().join("results.json.corrupt").exists());
    }

    #[tokio::test]
    async fn appends_are_visible_before_flush() {
        let tmp = TempDir::new().unwrap();
        let mut store = HistoryStore::load(tmp.path().join("results.json")).await;
        assert!(store.append(record("123")));
        assert!(store.contains("123"));
        assert!(!store.append(record("123")));
        assert_eq!(store.len(), 1);
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn flush_then_reload_round_trips() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/results.json");
        let mut store = HistoryStore::load(&path).await;
        store.append(record("1"));
        store.append(record("2"));
        store.flush().await.unwrap();
        assert!(!tmp_path(&path).exists());

        let reloaded = HistoryStore::load(&path).await;
        assert_eq!(reloaded.records(), store.records());
        assert!(reloaded.contains("2"));
        assert!(
            chrono::NaiveDateTime::parse_from_str(&reloaded.state().last_updated, TIMESTAMP_FORMAT)
                .is_ok()
        );
    }

    #[tokio::test]
    async fn flushed_json_has_expected_layout() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("results.json");
        let mut store = HistoryStore::empty(&path);
        let mut r = record("123");
        r.username = None;
        r.images = vec!["https://pbs.twimg.com/media/a.jpg".into()];
        store.append(r);
        store.flush().await.unwrap();

        let v: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        let rec = &v["data"][0];
        assert!(v["last_updated"].is_string());
        assert_eq!(rec["id"], "123");
        assert_eq!(rec["images"][0], "https://pbs.twimg.com/media/a.jpg");
        assert_eq!(rec["tweet_url"], "https://x.com/codeglitch/status/123");
        assert!(rec.get("username").is_none());
        assert!(rec.get("date").is_none());
    }

    #[tokio::test]
    async fn legacy_records_without_id_recover_it_from_the_link() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("results.json");
        tokio::fs::write(
            &path,
            br#"{"last_updated": "2024-10-10 20:00:00", "data": [
                {"username": "codeglitch", "date": "Oct 10, 2024", "original": "a",
                 "translated": "b", "tweet_url": "https://nitter.net/codeglitch/status/555#m"}
            ]}"#,
        )
        .await
        .unwrap();

        let store = HistoryStore::load(&path).await;
        assert_eq!(store.len(), 1);
        assert!(store.contains("555"));
        assert_eq!(store.records()[0].date.as_deref(), Some("Oct 10, 2024"));
    }
}
