/// Boundary to the page hosting the player.
///
/// The engine never touches the page directly; everything it needs to
/// observe or drive goes through this trait, which keeps the whole state
/// machine runnable under tests with a mock host.
pub trait PlayerHost {
    /// Current page URL, as the navigation watcher and id resolver see it.
    fn page_url(&self) -> String;

    /// Playback position in seconds, `None` when no playback surface is
    /// present on the page.
    fn playback_time(&self) -> Option<f64>;

    /// Jump playback to `seconds`. No-op when no playback surface exists.
    fn seek(&mut self, seconds: f64);

    /// Resume playback. No-op when no playback surface exists.
    fn play(&mut self);

    /// Viewport size in pixels.
    fn viewport(&self) -> (f32, f32);

    /// Whether the page is currently fullscreen.
    fn fullscreen(&self) -> bool;
}
