use crate::meta::{default_thumbnail, VideoMeta, VideoMetaFetcher};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// Reserved key holding the global display preference (defaults to on).
pub const DISPLAY_KEY: &str = "__memoDisplayEnabled";
/// Reserved key holding the recent-save history list.
pub const HISTORY_KEY: &str = "__recentMemoHistory";
/// Maximum number of recent-save history entries kept, newest first.
pub const HISTORY_LIMIT: usize = 50;

/// A single annotation. `time == 0` marks the persistent base memo; any
/// other value is a playback-second keyed time memo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub time: u64,
    pub text: String,
    #[serde(default, rename = "createdAt")]
    pub created_at: i64,
}

/// Canonical per-video record as persisted in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoRecord {
    pub title: String,
    pub channel: String,
    pub thumbnail: String,
    pub memos: Vec<Memo>,
}

impl MemoRecord {
    pub fn empty(meta: VideoMeta) -> Self {
        Self {
            title: meta.title,
            channel: meta.channel,
            thumbnail: meta.thumbnail,
            memos: Vec::new(),
        }
    }

    /// First base memo, if any. Duplicate base memos are a write-boundary
    /// violation; the read path takes the first one.
    pub fn base_memo(&self) -> Option<&Memo> {
        self.memos.iter().find(|m| m.time == 0)
    }
}

/// One line of the bounded recent-save history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub video_id: String,
    pub title: String,
    pub thumbnail: String,
    pub time: u64,
    pub text: String,
    #[serde(default)]
    pub created_at: i64,
}

/// Raw key-value boundary to the external store. Values are untyped JSON;
/// normalization happens above this seam.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;
    fn keys(&self) -> Vec<String>;
}

/// In-memory store, for tests and embedders that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    map: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }
}

/// Store backed by a single JSON object file. The whole map lives in memory
/// and is flushed after every mutation.
pub struct JsonFileStore {
    path: PathBuf,
    map: Map<String, Value>,
}

impl JsonFileStore {
    /// Open (or create on first write) the store file at `path`. An
    /// unreadable or malformed file is treated as empty.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        let map = if content.trim().is_empty() {
            Map::new()
        } else {
            match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    tracing::error!("store file {} is not a JSON object, starting empty", path.display());
                    Map::new()
                }
                Err(e) => {
                    tracing::error!("failed to parse store file {}: {e}", path.display());
                    Map::new()
                }
            }
        };
        Self { path, map }
    }

    /// Default store location under the platform data directory.
    pub fn default_path() -> PathBuf {
        dirs_next::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tube_memo")
            .join("store.json")
    }

    fn flush(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&Value::Object(self.map.clone()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.map.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) -> anyhow::Result<()> {
        self.map.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.map.remove(key);
        self.flush()
    }

    fn keys(&self) -> Vec<String> {
        self.map.keys().cloned().collect()
    }
}

fn coerce_seconds(value: Option<&Value>) -> u64 {
    let n = value.and_then(Value::as_f64).unwrap_or(0.0);
    if !n.is_finite() || n < 0.0 {
        0
    } else {
        n.floor() as u64
    }
}

fn coerce_created_at(value: Option<&Value>) -> i64 {
    let n = value.and_then(Value::as_f64).unwrap_or(0.0);
    if !n.is_finite() {
        0
    } else {
        n as i64
    }
}

fn string_or<'a>(value: Option<&'a Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Normalize a raw stored value into the canonical record shape.
///
/// Accepts the canonical object (entries without a string `text` are
/// filtered out, never fatal) and the legacy bare-string shape (a single
/// base memo with `created_at` unset). Everything else is `None`.
pub fn normalize_record(video_id: &str, raw: &Value) -> Option<MemoRecord> {
    if let Some(obj) = raw.as_object() {
        let memos = obj.get("memos")?.as_array()?;
        let memos = memos
            .iter()
            .filter_map(|m| {
                let entry = m.as_object()?;
                let text = entry.get("text")?.as_str()?;
                Some(Memo {
                    time: coerce_seconds(entry.get("time")),
                    text: text.to_string(),
                    created_at: coerce_created_at(entry.get("createdAt")),
                })
            })
            .collect();
        return Some(MemoRecord {
            title: string_or(obj.get("title"), video_id),
            channel: string_or(obj.get("channel"), "Unknown Channel"),
            thumbnail: string_or(obj.get("thumbnail"), &default_thumbnail(video_id)),
            memos,
        });
    }

    if let Some(s) = raw.as_str() {
        let trimmed = s.trim();
        if !trimmed.is_empty() {
            return Some(MemoRecord {
                title: video_id.to_string(),
                channel: "Unknown Channel".to_string(),
                thumbnail: default_thumbnail(video_id),
                memos: vec![Memo {
                    time: 0,
                    text: trimmed.to_string(),
                    created_at: 0,
                }],
            });
        }
    }

    None
}

/// Fetch and normalize the record for a video. Absent or unusable data is
/// `None`, never an error.
pub fn fetch(store: &dyn KeyValueStore, video_id: &str) -> Option<MemoRecord> {
    normalize_record(video_id, &store.get(video_id)?)
}

pub fn save(store: &mut dyn KeyValueStore, video_id: &str, record: &MemoRecord) -> anyhow::Result<()> {
    store.set(video_id, serde_json::to_value(record)?)
}

pub fn remove(store: &mut dyn KeyValueStore, video_id: &str) -> anyhow::Result<()> {
    store.remove(video_id)
}

/// Video ids with stored records, skipping reserved keys.
pub fn record_ids(store: &dyn KeyValueStore) -> Vec<String> {
    store
        .keys()
        .into_iter()
        .filter(|k| !k.starts_with("__"))
        .collect()
}

/// Global display preference. Anything but an explicit `false` reads as on.
pub fn display_enabled(store: &dyn KeyValueStore) -> bool {
    !matches!(store.get(DISPLAY_KEY), Some(Value::Bool(false)))
}

pub fn set_display_enabled(store: &mut dyn KeyValueStore, enabled: bool) -> anyhow::Result<()> {
    store.set(DISPLAY_KEY, Value::Bool(enabled))
}

pub fn recent_history(store: &dyn KeyValueStore) -> Vec<HistoryEntry> {
    let Some(Value::Array(raw)) = store.get(HISTORY_KEY) else {
        return Vec::new();
    };
    raw.into_iter()
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// Prepend an entry to the recent-save history, keeping the newest
/// [`HISTORY_LIMIT`] entries.
pub fn push_history(store: &mut dyn KeyValueStore, entry: HistoryEntry) -> anyhow::Result<()> {
    let mut list = recent_history(store);
    list.insert(0, entry);
    list.truncate(HISTORY_LIMIT);
    store.set(HISTORY_KEY, serde_json::to_value(list)?)
}

pub fn clear_history(store: &mut dyn KeyValueStore) -> anyhow::Result<()> {
    store.remove(HISTORY_KEY)
}

fn clamp_time(time: f64) -> u64 {
    if !time.is_finite() || time < 0.0 {
        0
    } else {
        time.floor() as u64
    }
}

/// Result of a [`save_memo`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Appended as a new memo.
    Saved,
    /// Replaced the existing base memo after confirmation.
    ReplacedBase,
    /// A base memo already existed and the replacement was declined.
    Cancelled,
}

/// Write a memo for a video, creating the record (with fetched metadata) on
/// first save.
///
/// This is the write boundary that enforces the one-base-memo invariant:
/// saving at time 0 over an existing base memo asks `confirm_replace` and
/// drops the save when it declines. Successful saves append a recent-history
/// entry.
pub fn save_memo(
    store: &mut dyn KeyValueStore,
    meta: &dyn VideoMetaFetcher,
    video_id: &str,
    text: &str,
    time: f64,
    confirm_replace: &mut dyn FnMut(&str) -> bool,
) -> anyhow::Result<SaveOutcome> {
    let mut record = fetch(store, video_id)
        .unwrap_or_else(|| MemoRecord::empty(meta.fetch(video_id)));

    let safe_time = clamp_time(time);
    let memo = Memo {
        time: safe_time,
        text: text.to_string(),
        created_at: chrono::Utc::now().timestamp_millis(),
    };

    let mut outcome = SaveOutcome::Saved;
    if safe_time == 0 {
        if let Some(idx) = record.memos.iter().position(|m| m.time == 0) {
            if !confirm_replace(text) {
                return Ok(SaveOutcome::Cancelled);
            }
            record.memos[idx] = memo;
            outcome = SaveOutcome::ReplacedBase;
        } else {
            record.memos.push(memo);
        }
    } else {
        record.memos.push(memo);
    }

    save(store, video_id, &record)?;
    push_history(
        store,
        HistoryEntry {
            video_id: video_id.to_string(),
            title: record.title.clone(),
            thumbnail: record.thumbnail.clone(),
            time: safe_time,
            text: text.to_string(),
            created_at: chrono::Utc::now().timestamp_millis(),
        },
    )?;
    Ok(outcome)
}

/// Replace the text of the memo at `index`. Missing records or indices are
/// ignored.
pub fn update_memo_text(
    store: &mut dyn KeyValueStore,
    video_id: &str,
    index: usize,
    text: &str,
) -> anyhow::Result<bool> {
    let Some(mut record) = fetch(store, video_id) else {
        return Ok(false);
    };
    let Some(memo) = record.memos.get_mut(index) else {
        return Ok(false);
    };
    memo.text = text.to_string();
    save(store, video_id, &record)?;
    Ok(true)
}

/// Delete the memo at `index`. The whole record is removed once its memo
/// list empties.
pub fn delete_memo(
    store: &mut dyn KeyValueStore,
    video_id: &str,
    index: usize,
) -> anyhow::Result<bool> {
    let Some(mut record) = fetch(store, video_id) else {
        return Ok(false);
    };
    if index >= record.memos.len() {
        return Ok(false);
    }
    record.memos.remove(index);
    if record.memos.is_empty() {
        remove(store, video_id)?;
    } else {
        save(store, video_id, &record)?;
    }
    Ok(true)
}
