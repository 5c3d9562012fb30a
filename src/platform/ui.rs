//! UI and sound collaborators
//!
//! Every method has a no-op default so a partial UI only implements what
//! it actually displays.

/// Displays driven by the game core
pub trait UiSink {
    fn set_score(&mut self, _score: u64) {}
    fn set_highscore(&mut self, _highscore: u64) {}
    /// End-of-run overlay; `title` is "Game Over!" or "New Highscore!"
    fn show_end_screen(&mut self, _visible: bool, _title: &str) {}
    /// Art key of the fruit queued after the current one
    fn set_next_fruit(&mut self, _image: &str) {}
}

/// Named sound playback; failures must be swallowed by the implementation
pub trait SoundSink {
    fn play(&mut self, _name: &str) {}
}

/// Headless UI
#[derive(Debug, Default, Clone, Copy)]
pub struct NullUi;

impl UiSink for NullUi {}

/// Silent audio
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSound;

impl SoundSink for NullSound {}
