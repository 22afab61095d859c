use serde_json::json;
use tube_memo::backup::{export_all, restore};
use tube_memo::store::{self, KeyValueStore, MemoryStore};

#[test]
fn export_then_restore_normalizes_every_record() {
    let mut source = MemoryStore::new();
    source.set("legacy", json!("just a note")).unwrap();
    source
        .set(
            "canonical",
            json!({
                "title": "T",
                "channel": "C",
                "thumbnail": "th",
                "memos": [
                    {"time": 10.9, "text": "a"},
                    {"time": 20, "text": "b", "createdAt": 5},
                    {"bogus": true},
                ],
            }),
        )
        .unwrap();
    source.set("malformed", json!({"memos": "nope"})).unwrap();
    store::set_display_enabled(&mut source, false).unwrap();

    let exported = export_all(&source).unwrap();

    let mut target = MemoryStore::new();
    let written = restore(&mut target, &exported).unwrap();
    assert_eq!(written, 2);

    // legacy string became a canonical record
    let legacy = store::fetch(&target, "legacy").unwrap();
    assert_eq!(legacy.memos.len(), 1);
    assert_eq!(legacy.memos[0].text, "just a note");
    assert_eq!(legacy.memos[0].time, 0);

    // canonical record kept, per-entry garbage filtered, times floored
    let canonical = store::fetch(&target, "canonical").unwrap();
    assert_eq!(canonical.title, "T");
    assert_eq!(canonical.memos.len(), 2);
    assert_eq!(canonical.memos[0].time, 10);

    // malformed records and reserved keys do not survive a restore
    assert!(target.get("malformed").is_none());
    assert!(store::display_enabled(&target));
}

#[test]
fn restore_merges_over_existing_records() {
    let mut store = MemoryStore::new();
    store.set("keep", json!("kept note")).unwrap();
    store.set("shared", json!("old")).unwrap();

    let incoming = json!({
        "shared": {"memos": [{"time": 0, "text": "new"}]},
        "added": "fresh note",
    })
    .to_string();
    assert_eq!(restore(&mut store, &incoming).unwrap(), 2);

    assert!(store.get("keep").is_some());
    assert_eq!(store::fetch(&store, "shared").unwrap().memos[0].text, "new");
    assert!(store.get("added").is_some());
}

#[test]
fn malformed_backup_file_is_a_visible_error() {
    let mut store = MemoryStore::new();
    assert!(restore(&mut store, "definitely not json").is_err());
    assert!(restore(&mut store, "[1,2,3]").is_err());
    assert!(store.keys().is_empty());
}

#[test]
fn export_is_a_full_dump_reserved_keys_included() {
    let mut store = MemoryStore::new();
    store.set("vid", json!("note")).unwrap();
    store::set_display_enabled(&mut store, false).unwrap();

    let exported = export_all(&store).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&exported).unwrap();
    let obj = parsed.as_object().unwrap();
    assert!(obj.contains_key("vid"));
    assert!(obj.contains_key(store::DISPLAY_KEY));
}
