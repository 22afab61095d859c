use serde_json::json;
use std::time::{Duration, Instant};
use tube_memo::engine::OverlayEngine;
use tube_memo::store::{KeyValueStore, MemoryStore};

use mock_host::MockHost;

fn store_with(video_id: &str, record: serde_json::Value) -> MemoryStore {
    let mut store = MemoryStore::new();
    store.set(video_id, record).unwrap();
    store
}

#[test]
fn no_stored_collection_never_creates_a_popup() {
    let host = MockHost::watch("abc123");
    let store = MemoryStore::new();
    let mut engine = OverlayEngine::new();

    engine.poll(&host, &store, Instant::now());
    assert!(engine.popup().is_none());
}

#[test]
fn base_memo_surfaces_once_for_unchanged_text() {
    let host = MockHost::watch("abc123");
    let store = store_with("abc123", json!({"memos": [{"time": 0, "text": "intro"}]}));
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    let popup = engine.popup().expect("popup after first poll");
    assert_eq!(popup.base_text(), Some("intro"));
    assert!(engine.shown_base());

    // second poll with identical text: still exactly one surfaced element
    engine.poll(&host, &store, t0 + Duration::from_secs(1));
    assert_eq!(engine.popup().unwrap().base_text(), Some("intro"));
}

#[test]
fn base_text_change_is_reflected_within_one_poll() {
    let host = MockHost::watch("abc123");
    let mut store = store_with("abc123", json!({"memos": [{"time": 0, "text": "v1"}]}));
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    assert_eq!(engine.popup().unwrap().base_text(), Some("v1"));

    store
        .set("abc123", json!({"memos": [{"time": 0, "text": "v2"}]}))
        .unwrap();
    engine.poll(&host, &store, t0 + Duration::from_secs(1));
    assert_eq!(engine.popup().unwrap().base_text(), Some("v2"));
}

#[test]
fn auto_hide_dismisses_until_the_text_changes() {
    let host = MockHost::watch("abc123");
    let mut store = store_with("abc123", json!({"memos": [{"time": 0, "text": "intro"}]}));
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    assert!(engine.popup().unwrap().has_base());

    // auto-hide fires on the tick after three seconds
    let t_hide = t0 + Duration::from_millis(3_100);
    engine.advance(&host, &store, t_hide);
    assert!(engine.base_memo_dismissed());
    assert!(engine.popup().unwrap().base_text().is_none());

    // fade completes, popup tears down, dismissal keeps it down
    let t_faded = t_hide + Duration::from_millis(300);
    engine.advance(&host, &store, t_faded);
    assert!(engine.popup().is_none());
    engine.poll(&host, &store, t_faded);
    assert!(engine.popup().is_none());

    // a text change re-triggers the surfacing rule
    store
        .set("abc123", json!({"memos": [{"time": 0, "text": "updated"}]}))
        .unwrap();
    engine.poll(&host, &store, t_faded + Duration::from_secs(1));
    assert_eq!(engine.popup().unwrap().base_text(), Some("updated"));
}

#[test]
fn removing_the_base_memo_clears_tracking_without_dismissal() {
    let host = MockHost::watch("abc123").at(100.0);
    let mut store = store_with(
        "abc123",
        json!({"memos": [{"time": 0, "text": "intro"}, {"time": 400, "text": "later"}]}),
    );
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    assert!(engine.popup().unwrap().has_base());

    store
        .set("abc123", json!({"memos": [{"time": 400, "text": "later"}]}))
        .unwrap();
    engine.poll(&host, &store, t0 + Duration::from_secs(1));
    assert!(!engine.shown_base());
    assert!(!engine.base_memo_dismissed());
    assert!(engine.popup().unwrap().base_text().is_none());
}

#[test]
fn empty_collection_resets_and_removes_the_popup() {
    let host = MockHost::watch("abc123");
    let mut store = store_with("abc123", json!({"memos": [{"time": 0, "text": "intro"}]}));
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    assert!(engine.popup().is_some());

    store.remove("abc123").unwrap();
    engine.poll(&host, &store, t0 + Duration::from_secs(1));
    assert!(engine.popup().is_none());
    assert!(!engine.shown_base());
}

#[test]
fn losing_the_playback_surface_removes_the_popup() {
    let mut host = MockHost::watch("abc123");
    let store = store_with("abc123", json!({"memos": [{"time": 0, "text": "intro"}]}));
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    assert!(engine.popup().is_some());

    host.time = None;
    engine.poll(&host, &store, t0 + Duration::from_secs(1));
    assert!(engine.popup().is_none());
}

#[test]
fn full_scenario_base_plus_matched_time_memo() {
    // store: {memos:[{time:0,"intro"},{time:45,"key point"}]}, playback 44
    let mut host = MockHost::watch("abc123").at(44.0);
    let store = store_with(
        "abc123",
        json!({"memos": [
            {"time": 0, "text": "intro"},
            {"time": 45, "text": "key point"},
        ]}),
    );
    let mut engine = OverlayEngine::new();
    let t0 = Instant::now();

    engine.poll(&host, &store, t0);
    let popup = engine.popup().expect("popup exists");
    assert_eq!(popup.base_text(), Some("intro"));
    let toasts = popup.toast_texts();
    assert_eq!(toasts.len(), 1);
    assert!(toasts[0].contains("key point"));
    assert!(engine.is_time_memo_active((45, 1)));

    // at position 50 the toast has cleared and the memo is out of its window
    host.time = Some(50.0);
    let t_later = t0 + Duration::from_secs(6);
    engine.advance(&host, &store, t_later);
    let t_done = t_later + Duration::from_millis(300);
    engine.advance(&host, &store, t_done);
    engine.poll(&host, &store, t_done);
    assert!(!engine.is_time_memo_active((45, 1)));
    assert!(engine
        .popup()
        .map(|p| p.toast_texts().is_empty())
        .unwrap_or(true));
}
