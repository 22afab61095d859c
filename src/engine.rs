use crate::channel::{Request, Response};
use crate::host::PlayerHost;
use crate::overlay::{OverlayPopup, PopupFate, BASE_AUTO_HIDE};
use crate::store::{self, KeyValueStore, Memo};
use crate::video_id;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Delay between a navigation reset and the follow-up poll, giving the new
/// page's player time to mount.
pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
/// Pointer distance from a viewport edge below which the popup is hidden.
pub const EDGE_MARGIN: f32 = 4.0;
/// Half-width of the time-memo matching window, in seconds.
pub const MATCH_WINDOW: u64 = 1;

/// Key identifying a time memo across poll cycles: `(time, index)`.
pub type TimeMemoKey = (u64, usize);

fn in_window(memo_time: u64, current_second: u64) -> bool {
    memo_time.abs_diff(current_second) <= MATCH_WINDOW
}

/// The overlay state machine.
///
/// Owns the popup and every per-video visibility flag; the popup itself
/// never makes decisions. All entry points take `now` explicitly, so the
/// machine has no clock of its own and tests drive time directly.
pub struct OverlayEngine {
    popup: Option<OverlayPopup>,
    shown_base: bool,
    base_memo_dismissed: bool,
    last_base_memo_text: Option<String>,
    closed_by_user: bool,
    display_enabled: bool,
    active_time_memos: HashMap<TimeMemoKey, bool>,
    pointer: (f32, f32),
    settle_at: Option<Instant>,
}

impl Default for OverlayEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl OverlayEngine {
    pub fn new() -> Self {
        Self {
            popup: None,
            shown_base: false,
            base_memo_dismissed: false,
            last_base_memo_text: None,
            closed_by_user: false,
            display_enabled: true,
            active_time_memos: HashMap::new(),
            pointer: (20.0, 20.0),
            settle_at: None,
        }
    }

    pub fn popup(&self) -> Option<&OverlayPopup> {
        self.popup.as_ref()
    }

    pub fn shown_base(&self) -> bool {
        self.shown_base
    }

    pub fn base_memo_dismissed(&self) -> bool {
        self.base_memo_dismissed
    }

    pub fn display_enabled(&self) -> bool {
        self.display_enabled
    }

    pub fn closed_by_user(&self) -> bool {
        self.closed_by_user
    }

    /// Whether a time memo is currently inside its matching window, as seen
    /// by the edge-trigger bookkeeping.
    pub fn is_time_memo_active(&self, key: TimeMemoKey) -> bool {
        self.active_time_memos.get(&key).copied().unwrap_or(false)
    }

    /// Process due deadlines: base auto-hide, element fades, popup teardown
    /// and the post-navigation settle. Called at the top of every trigger.
    pub fn advance(&mut self, host: &dyn PlayerHost, store: &dyn KeyValueStore, now: Instant) {
        if let Some(popup) = self.popup.as_mut() {
            if popup.take_due_base_hide(now) && popup.has_base() {
                tracing::debug!("base memo auto-hidden");
                popup.hide_base(now);
                self.base_memo_dismissed = true;
            }
            if popup.advance(now) == PopupFate::Destroy {
                self.popup = None;
            }
        }

        if self.settle_at.is_some_and(|at| at <= now) {
            self.settle_at = None;
            self.poll(host, store, now);
            if self.display_enabled {
                if let Some(id) = video_id::resolve(&host.page_url()) {
                    self.force_show(host, store, &id, true, now);
                }
            }
        }
    }

    /// Trigger 1: the periodic (1 Hz) evaluation of what should be visible.
    pub fn poll(&mut self, host: &dyn PlayerHost, store: &dyn KeyValueStore, now: Instant) {
        let Some(playback) = host.playback_time() else {
            self.reset_base_tracking();
            self.popup = None;
            return;
        };
        let Some(video_id) = video_id::resolve(&host.page_url()) else {
            self.reset_base_tracking();
            self.popup = None;
            return;
        };

        self.display_enabled = store::display_enabled(store);
        let memos: Vec<Memo> = store::fetch(store, &video_id)
            .map(|r| r.memos)
            .unwrap_or_default();
        if memos.is_empty() {
            self.reset_base_tracking();
            self.active_time_memos.clear();
            self.popup = None;
            return;
        }

        let base = memos.iter().find(|m| m.time == 0).cloned();
        let base_changed = base
            .as_ref()
            .is_some_and(|b| self.last_base_memo_text.as_deref() != Some(b.text.as_str()));

        if let Some(base) = &base {
            if !self.closed_by_user {
                if (!self.shown_base || base_changed)
                    && (!self.base_memo_dismissed || base_changed)
                {
                    tracing::debug!(changed = base_changed, "surfacing base memo");
                    self.surface_base(&base.text, true, now);
                    self.shown_base = true;
                }
                self.last_base_memo_text = Some(base.text.clone());
            }
        } else {
            self.last_base_memo_text = None;
            self.base_memo_dismissed = false;
            if let Some(popup) = self.popup.as_mut() {
                if popup.has_base() {
                    popup.hide_base(now);
                }
            }
            self.shown_base = false;
        }

        let current_second = playback.max(0.0).floor() as u64;

        // A matched time memo needs a popup to host its toast even when the
        // base-surfacing rule did not fire this cycle.
        let matched_any = memos
            .iter()
            .any(|m| m.time > 0 && in_window(m.time, current_second));
        if self.popup.is_none() && !self.closed_by_user && matched_any {
            let carry_base = base
                .as_ref()
                .filter(|_| !self.shown_base || base_changed)
                .cloned();
            let mut popup = OverlayPopup::new(self.pointer);
            if let Some(base) = &carry_base {
                popup.upsert_base(&base.text);
                popup.schedule_base_hide(now + BASE_AUTO_HIDE);
            }
            self.popup = Some(popup);
            if let Some(base) = carry_base {
                self.shown_base = true;
                self.last_base_memo_text = Some(base.text);
            }
        }

        for (index, memo) in memos.iter().enumerate() {
            if memo.time == 0 {
                continue;
            }
            let key: TimeMemoKey = (memo.time, index);
            if in_window(memo.time, current_second) {
                if !self.is_time_memo_active(key) {
                    self.active_time_memos.insert(key, true);
                    if let Some(popup) = self.popup.as_mut() {
                        popup.append_toast(&format!("⏱ {}", memo.text), now);
                    }
                }
            } else {
                self.active_time_memos.insert(key, false);
            }
        }

        self.sync_visibility(host);
    }

    /// Trigger 2: the page navigated without a reload. Everything per-video
    /// resets; one poll plus a forced base surface follow after the settle
    /// delay.
    pub fn on_navigation(&mut self, now: Instant) {
        tracing::debug!("navigation reset");
        self.reset_base_tracking();
        self.active_time_memos.clear();
        self.closed_by_user = false;
        self.popup = None;
        self.settle_at = Some(now + SETTLE_DELAY);
    }

    /// Triggers 3 and 5 plus the query commands, dispatched from the
    /// message channel.
    pub fn handle_request(
        &mut self,
        host: &mut dyn PlayerHost,
        store: &dyn KeyValueStore,
        req: &Request,
        now: Instant,
    ) -> Option<Response> {
        match req {
            Request::GetTime => Some(Response::Time {
                time: host.playback_time().unwrap_or(0.0),
            }),
            Request::ShowMemoPopup { video_id } => {
                let current = video_id::resolve(&host.page_url());
                if let Some(current) = current {
                    let target = video_id.clone().unwrap_or_else(|| current.clone());
                    if current == target {
                        self.force_show(&*host, store, &target, true, now);
                    } else {
                        tracing::debug!(requested = %target, live = %current, "ignoring stale show command");
                    }
                }
                None
            }
            Request::SeekTo { time } => {
                if host.playback_time().is_none() {
                    return Some(Response::SeekAck { ok: false });
                }
                let next = if time.is_finite() { time.max(0.0) } else { 0.0 };
                host.seek(next);
                host.play();
                Some(Response::SeekAck { ok: true })
            }
            Request::MemoVisibilityChanged { enabled } => {
                self.display_enabled = *enabled;
                if *enabled {
                    if let Some(popup) = self.popup.as_mut() {
                        if popup.has_base() {
                            popup.schedule_base_hide(now + BASE_AUTO_HIDE);
                        }
                    }
                    if let Some(id) = video_id::resolve(&host.page_url()) {
                        self.force_show(&*host, store, &id, false, now);
                    }
                } else if let Some(popup) = self.popup.as_mut() {
                    popup.cancel_base_hide();
                }
                self.sync_visibility(host);
                None
            }
        }
    }

    /// Force-surface the stored base memo for `video_id`, clearing session
    /// suppression. With `auto_hide` the dismissal flag resets and the hide
    /// timer restarts regardless of prior state.
    pub fn force_show(
        &mut self,
        host: &dyn PlayerHost,
        store: &dyn KeyValueStore,
        video_id: &str,
        auto_hide: bool,
        now: Instant,
    ) {
        let Some(record) = store::fetch(store, video_id) else {
            return;
        };
        if record.memos.is_empty() {
            return;
        }

        self.closed_by_user = false;
        if auto_hide {
            self.base_memo_dismissed = false;
        }
        let Some(base) = record.base_memo() else {
            return;
        };

        self.surface_base(&base.text, auto_hide, now);
        self.shown_base = true;
        self.last_base_memo_text = Some(base.text.clone());
        self.sync_visibility(host);
    }

    /// Trigger 4 feed: pointer moved. Updates the cached position, tracks
    /// the popup to the pointer, re-applies the gate.
    pub fn on_pointer_move(&mut self, host: &dyn PlayerHost, x: f32, y: f32) {
        self.pointer = (x, y);
        if let Some(popup) = self.popup.as_mut() {
            popup.reposition(self.pointer);
        }
        self.sync_visibility(host);
    }

    /// Trigger 4 feed: fullscreen flipped. Presentation only.
    pub fn on_fullscreen_change(&mut self, host: &dyn PlayerHost) {
        self.sync_visibility(host);
    }

    /// Session suppression: hide the overlay until the next navigation or
    /// forced re-show.
    pub fn dismiss(&mut self, host: &dyn PlayerHost) {
        self.closed_by_user = true;
        self.sync_visibility(host);
    }

    /// Trigger 4: the global visibility gate. Opacity only; never touches
    /// `shown_base` or `base_memo_dismissed`.
    pub fn sync_visibility(&mut self, host: &dyn PlayerHost) {
        let Some(popup) = self.popup.as_mut() else {
            return;
        };
        let hidden = host.fullscreen()
            || !self.display_enabled
            || near_viewport_edge(self.pointer, host.viewport())
            || self.closed_by_user;
        popup.set_hidden(hidden);
    }

    fn surface_base(&mut self, text: &str, auto_hide: bool, now: Instant) {
        let pointer = self.pointer;
        let popup = self.popup.get_or_insert_with(|| OverlayPopup::new(pointer));
        popup.upsert_base(text);
        if auto_hide {
            popup.schedule_base_hide(now + BASE_AUTO_HIDE);
        }
    }

    fn reset_base_tracking(&mut self) {
        self.shown_base = false;
        self.last_base_memo_text = None;
        self.base_memo_dismissed = false;
    }
}

fn near_viewport_edge(pointer: (f32, f32), viewport: (f32, f32)) -> bool {
    pointer.0 <= EDGE_MARGIN
        || pointer.1 <= EDGE_MARGIN
        || pointer.0 >= viewport.0 - EDGE_MARGIN
        || pointer.1 >= viewport.1 - EDGE_MARGIN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_window_is_three_seconds_wide() {
        assert!(in_window(30, 29));
        assert!(in_window(30, 30));
        assert!(in_window(30, 31));
        assert!(!in_window(30, 28));
        assert!(!in_window(30, 32));
    }

    #[test]
    fn edge_proximity_uses_four_pixels() {
        let vp = (1920.0, 1080.0);
        assert!(near_viewport_edge((4.0, 500.0), vp));
        assert!(near_viewport_edge((500.0, 2.0), vp));
        assert!(near_viewport_edge((1916.0, 500.0), vp));
        assert!(near_viewport_edge((500.0, 1078.0), vp));
        assert!(!near_viewport_edge((5.0, 5.0), vp));
    }
}
