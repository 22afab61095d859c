use crate::engine::OverlayEngine;
use crate::host::PlayerHost;
use crate::meta::VideoMetaFetcher;
use crate::store::{self, KeyValueStore, SaveOutcome};
use crate::video_id::{self, PageKind};
use std::time::Instant;

/// Gap between the anchor button and the form, in pixels.
pub const ANCHOR_GAP: f32 = 6.0;

/// Failures of the authoring save path. `NoPlaybackTime` is the one the
/// host surfaces as a blocking notice; the rest close silently or stay in
/// the form.
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("the form is not open")]
    NotOpen,
    #[error("memo text is empty")]
    EmptyText,
    #[error("not on a video page")]
    NoVideo,
    #[error("no playback time available")]
    NoPlaybackTime,
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone)]
enum CoachState {
    Closed,
    Open { anchor: (f32, f32), draft: String },
}

/// The small floating form anchored to a player control button, used to
/// capture a new time memo at the current playback position.
///
/// An independent micro state machine: open/closed plus the draft text,
/// gated by the same fullscreen and click-outside rules as the overlay.
pub struct CoachMark {
    state: CoachState,
}

impl Default for CoachMark {
    fn default() -> Self {
        Self::new()
    }
}

impl CoachMark {
    pub fn new() -> Self {
        Self {
            state: CoachState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, CoachState::Open { .. })
    }

    /// Form position, just below its anchor.
    pub fn position(&self) -> Option<(f32, f32)> {
        match &self.state {
            CoachState::Open { anchor, .. } => Some((anchor.0, anchor.1 + ANCHOR_GAP)),
            CoachState::Closed => None,
        }
    }

    pub fn draft(&self) -> Option<&str> {
        match &self.state {
            CoachState::Open { draft, .. } => Some(draft.as_str()),
            CoachState::Closed => None,
        }
    }

    /// Open the form anchored to the triggering button. Re-opening moves the
    /// anchor but keeps an existing draft.
    pub fn open(&mut self, anchor: (f32, f32)) {
        match &mut self.state {
            CoachState::Open { anchor: a, .. } => *a = anchor,
            CoachState::Closed => {
                self.state = CoachState::Open {
                    anchor,
                    draft: String::new(),
                };
            }
        }
    }

    /// Track the anchor on window resize.
    pub fn reposition(&mut self, anchor: (f32, f32)) {
        if let CoachState::Open { anchor: a, .. } = &mut self.state {
            *a = anchor;
        }
    }

    pub fn set_draft(&mut self, text: &str) {
        if let CoachState::Open { draft, .. } = &mut self.state {
            *draft = text.to_string();
        }
    }

    /// Cancel path: discard the draft, no store mutation.
    pub fn close(&mut self) {
        self.state = CoachState::Closed;
    }

    /// A click landed somewhere on the page. Closes the form unless the
    /// click hit the form itself or its anchor button.
    pub fn handle_click(&mut self, on_form: bool, on_anchor: bool) {
        if self.is_open() && !on_form && !on_anchor {
            self.close();
        }
    }

    /// Fullscreen transitions close the form on entry.
    pub fn on_fullscreen_change(&mut self, fullscreen: bool) {
        if fullscreen && self.is_open() {
            self.close();
        }
    }

    /// Save path: append the drafted text as a time memo at the current
    /// playback second, record it in the bounded history, close the form and
    /// re-run the poll so the matching window surfaces the feedback toast.
    ///
    /// `confirm_replace` is consulted only when playback sits at second 0,
    /// where the capture becomes a base-memo write.
    pub fn save(
        &mut self,
        host: &dyn PlayerHost,
        store: &mut dyn KeyValueStore,
        meta: &dyn VideoMetaFetcher,
        engine: &mut OverlayEngine,
        confirm_replace: &mut dyn FnMut(&str) -> bool,
        now: Instant,
    ) -> Result<SaveOutcome, SaveError> {
        let CoachState::Open { draft, .. } = &self.state else {
            return Err(SaveError::NotOpen);
        };
        let text = draft.trim().to_string();
        if text.is_empty() {
            return Err(SaveError::EmptyText);
        }

        let url = host.page_url();
        let video_id = match video_id::page_kind(&url) {
            PageKind::Watch => video_id::resolve(&url).ok_or(SaveError::NoVideo)?,
            _ => return Err(SaveError::NoVideo),
        };
        let time = host.playback_time().ok_or(SaveError::NoPlaybackTime)?;

        let outcome = store::save_memo(
            store,
            meta,
            &video_id,
            &text,
            time.max(0.0).floor(),
            confirm_replace,
        )?;
        if outcome == SaveOutcome::Cancelled {
            return Ok(outcome);
        }

        tracing::debug!(%video_id, "time memo captured");
        self.close();
        engine.poll(host, store, now);
        Ok(outcome)
    }
}

/// Render a playback second as `mm:ss` for the anchor button label.
pub fn format_time(seconds: f64) -> String {
    let safe = if seconds.is_finite() {
        seconds.max(0.0).floor() as u64
    } else {
        0
    };
    format!("{:02}:{:02}", safe / 60, safe % 60)
}
