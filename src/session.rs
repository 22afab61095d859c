use crate::channel::{Request, Response};
use crate::coach_mark::{CoachMark, SaveError};
use crate::engine::OverlayEngine;
use crate::host::PlayerHost;
use crate::meta::VideoMetaFetcher;
use crate::navigation::NavigationWatcher;
use crate::store::{KeyValueStore, SaveOutcome};
use std::time::Instant;

/// Top-level wiring of the in-page side: the overlay engine, the navigation
/// watcher and the authoring form, with one entry point per host signal.
///
/// The host is expected to deliver events serially (single-threaded,
/// run-to-completion); each entry point first lets the engine process any
/// deadlines that came due since the last call.
pub struct ContentSession {
    engine: OverlayEngine,
    watcher: NavigationWatcher,
    coach_mark: CoachMark,
}

impl ContentSession {
    pub fn new(initial_url: &str) -> Self {
        Self {
            engine: OverlayEngine::new(),
            watcher: NavigationWatcher::new(initial_url),
            coach_mark: CoachMark::new(),
        }
    }

    pub fn engine(&self) -> &OverlayEngine {
        &self.engine
    }

    pub fn coach_mark(&self) -> &CoachMark {
        &self.coach_mark
    }

    /// The 1 Hz tick: process deadlines, then run the poll.
    pub fn tick(&mut self, host: &dyn PlayerHost, store: &dyn KeyValueStore, now: Instant) {
        self.engine.advance(host, store, now);
        self.engine.poll(host, store, now);
    }

    /// A DOM mutation was observed. Debounced to actual URL changes, which
    /// reset the overlay and close the authoring form.
    pub fn on_mutation(&mut self, host: &dyn PlayerHost, store: &dyn KeyValueStore, now: Instant) {
        self.engine.advance(host, store, now);
        if self.watcher.observe(&host.page_url()) {
            self.coach_mark.close();
            self.engine.on_navigation(now);
        }
    }

    pub fn on_pointer_move(&mut self, host: &dyn PlayerHost, x: f32, y: f32) {
        self.engine.on_pointer_move(host, x, y);
    }

    pub fn on_fullscreen_change(&mut self, host: &dyn PlayerHost) {
        self.coach_mark.on_fullscreen_change(host.fullscreen());
        self.engine.on_fullscreen_change(host);
    }

    /// A click landed on the page. Applies the authoring form's
    /// outside-click rule.
    pub fn on_click(&mut self, on_form: bool, on_anchor: bool) {
        self.coach_mark.handle_click(on_form, on_anchor);
    }

    pub fn on_window_resize(&mut self, anchor: (f32, f32)) {
        self.coach_mark.reposition(anchor);
    }

    /// User closed the overlay; it stays hidden until navigation or a
    /// forced re-show.
    pub fn dismiss_overlay(&mut self, host: &dyn PlayerHost) {
        self.engine.dismiss(host);
    }

    /// An inter-process command arrived from the companion UI.
    pub fn handle_request(
        &mut self,
        host: &mut dyn PlayerHost,
        store: &dyn KeyValueStore,
        req: &Request,
        now: Instant,
    ) -> Option<Response> {
        self.engine.advance(&*host, store, now);
        self.engine.handle_request(host, store, req, now)
    }

    pub fn open_coach_mark(&mut self, anchor: (f32, f32)) {
        self.coach_mark.open(anchor);
    }

    pub fn set_coach_mark_draft(&mut self, text: &str) {
        self.coach_mark.set_draft(text);
    }

    pub fn cancel_coach_mark(&mut self) {
        self.coach_mark.close();
    }

    pub fn save_coach_mark(
        &mut self,
        host: &dyn PlayerHost,
        store: &mut dyn KeyValueStore,
        meta: &dyn VideoMetaFetcher,
        confirm_replace: &mut dyn FnMut(&str) -> bool,
        now: Instant,
    ) -> Result<SaveOutcome, SaveError> {
        self.coach_mark
            .save(host, store, meta, &mut self.engine, confirm_replace, now)
    }
}
