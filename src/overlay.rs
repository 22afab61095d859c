use std::time::{Duration, Instant};

/// How long the base memo stays up before auto-hiding.
pub const BASE_AUTO_HIDE: Duration = Duration::from_secs(3);
/// Fade-out applied to the base element before it is removed.
pub const BASE_FADE: Duration = Duration::from_millis(220);
/// How long a time-memo toast stays fully visible.
pub const TOAST_DISPLAY: Duration = Duration::from_secs(3);
/// Fade-out applied to a toast before it is removed.
pub const TOAST_FADE: Duration = Duration::from_millis(200);
/// Offset of the popup from the pointer, both axes.
pub const POINTER_OFFSET: f32 = 4.0;

/// The persistent base-memo element inside the popup.
#[derive(Debug, Clone)]
struct BaseElement {
    text: String,
    /// Set once the element has been hidden; it is removed when this passes.
    fading_until: Option<Instant>,
}

/// An ephemeral time-memo toast.
#[derive(Debug, Clone)]
struct Toast {
    text: String,
    fade_at: Instant,
    remove_at: Option<Instant>,
}

/// Whether a popup should stay after an [`OverlayPopup::advance`] pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupFate {
    Keep,
    Destroy,
}

/// The floating overlay box: one optional base element, a toast area, a
/// screen position and a gate-controlled opacity.
///
/// Pure presentation state, no decision logic. The base auto-hide deadline
/// lives here so that dropping the popup cancels it; a timer can never fire
/// against an element that no longer exists.
#[derive(Debug, Clone)]
pub struct OverlayPopup {
    pos: (f32, f32),
    hidden: bool,
    base: Option<BaseElement>,
    toasts: Vec<Toast>,
    base_hide_at: Option<Instant>,
}

impl OverlayPopup {
    /// Create an empty popup next to the pointer. It starts hidden; the
    /// engine applies the visibility gate right after creation.
    pub fn new(pointer: (f32, f32)) -> Self {
        Self {
            pos: (pointer.0 + POINTER_OFFSET, pointer.1 + POINTER_OFFSET),
            hidden: true,
            base: None,
            toasts: Vec::new(),
            base_hide_at: None,
        }
    }

    /// Create or update the base element. A fading leftover is replaced.
    pub fn upsert_base(&mut self, text: &str) {
        match &mut self.base {
            Some(base) if base.fading_until.is_none() => {
                base.text = text.to_string();
            }
            _ => {
                self.base = Some(BaseElement {
                    text: text.to_string(),
                    fading_until: None,
                });
            }
        }
    }

    /// Start fading the base element out. It is gone for content purposes
    /// immediately; the node lingers only for the fade.
    pub fn hide_base(&mut self, now: Instant) {
        if let Some(base) = &mut self.base {
            if base.fading_until.is_none() {
                base.fading_until = Some(now + BASE_FADE);
            }
        }
    }

    /// Whether a live (non-fading) base element is present.
    pub fn has_base(&self) -> bool {
        self.base
            .as_ref()
            .is_some_and(|b| b.fading_until.is_none())
    }

    /// Text of the live base element.
    pub fn base_text(&self) -> Option<&str> {
        self.base
            .as_ref()
            .filter(|b| b.fading_until.is_none())
            .map(|b| b.text.as_str())
    }

    /// Append a self-removing toast to the toast area.
    pub fn append_toast(&mut self, text: &str, now: Instant) {
        self.toasts.push(Toast {
            text: text.to_string(),
            fade_at: now + TOAST_DISPLAY,
            remove_at: None,
        });
    }

    /// Texts of toasts still in the toast area, oldest first.
    pub fn toast_texts(&self) -> Vec<&str> {
        self.toasts.iter().map(|t| t.text.as_str()).collect()
    }

    pub fn reposition(&mut self, pointer: (f32, f32)) {
        self.pos = (pointer.0 + POINTER_OFFSET, pointer.1 + POINTER_OFFSET);
    }

    pub fn position(&self) -> (f32, f32) {
        self.pos
    }

    /// Apply the visibility gate. Opacity only; content is untouched.
    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn schedule_base_hide(&mut self, at: Instant) {
        self.base_hide_at = Some(at);
    }

    pub fn cancel_base_hide(&mut self) {
        self.base_hide_at = None;
    }

    /// Take the auto-hide deadline if it has passed.
    pub fn take_due_base_hide(&mut self, now: Instant) -> bool {
        if self.base_hide_at.is_some_and(|at| at <= now) {
            self.base_hide_at = None;
            true
        } else {
            false
        }
    }

    /// Process fades and expirations up to `now`. Reports `Destroy` when the
    /// base element finished fading and the toast area is empty, which is
    /// the only point at which the popup tears itself down.
    pub fn advance(&mut self, now: Instant) -> PopupFate {
        for toast in &mut self.toasts {
            if toast.remove_at.is_none() && toast.fade_at <= now {
                toast.remove_at = Some(now + TOAST_FADE);
            }
        }
        self.toasts
            .retain(|t| !t.remove_at.is_some_and(|at| at <= now));

        let base_gone = self
            .base
            .as_ref()
            .is_some_and(|b| b.fading_until.is_some_and(|at| at <= now));
        if base_gone {
            self.base = None;
            if self.toasts.is_empty() {
                return PopupFate::Destroy;
            }
        }
        PopupFate::Keep
    }
}
