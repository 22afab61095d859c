use crate::store::{self, KeyValueStore};
use anyhow::Context;
use serde_json::{Map, Value};

/// Serialize the entire store, reserved keys included, as pretty JSON.
pub fn export_all(store: &dyn KeyValueStore) -> anyhow::Result<String> {
    let mut map = Map::new();
    for key in store.keys() {
        if let Some(value) = store.get(&key) {
            map.insert(key, value);
        }
    }
    Ok(serde_json::to_string_pretty(&Value::Object(map))?)
}

/// Suggested name for an export file.
pub fn export_file_name(date: chrono::NaiveDate) -> String {
    format!("youtube-memo-backup-{date}.json")
}

/// Restore records from a backup export.
///
/// Every entry is re-normalized before writing; entries that do not
/// normalize (reserved keys, malformed records) are skipped, and surviving
/// records are merged over the existing store. A file that is not a JSON
/// object at the top level is the one failure surfaced to the user.
pub fn restore(store: &mut dyn KeyValueStore, json: &str) -> anyhow::Result<usize> {
    let parsed: Value = serde_json::from_str(json).context("backup file is not valid JSON")?;
    let Some(entries) = parsed.as_object() else {
        anyhow::bail!("backup file must contain a JSON object");
    };

    let mut written = 0;
    for (key, value) in entries {
        let Some(record) = store::normalize_record(key, value) else {
            continue;
        };
        store::save(store, key, &record)?;
        written += 1;
    }
    tracing::debug!(restored = written, "backup restore complete");
    Ok(written)
}
