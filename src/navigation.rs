/// Detects single-page-application navigation by comparing the observable
/// URL against the last one seen.
///
/// Mutation notifications arrive at-least-once with no ordering guarantee
/// relative to the poll timer, so every notification is debounced here; only
/// an actual URL change reports `true`.
pub struct NavigationWatcher {
    last_url: String,
}

impl NavigationWatcher {
    pub fn new(initial_url: &str) -> Self {
        Self {
            last_url: initial_url.to_string(),
        }
    }

    /// Feed one mutation notification. Returns `true` when the URL changed
    /// since the last call.
    pub fn observe(&mut self, url: &str) -> bool {
        if url == self.last_url {
            return false;
        }
        tracing::debug!(from = %self.last_url, to = %url, "page navigation");
        self.last_url = url.to_string();
        true
    }

    pub fn last_url(&self) -> &str {
        &self.last_url
    }
}
