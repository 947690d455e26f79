use crate::services::actions::ActionKind;
use crate::services::storyboard::Panel;

/// Per-session flags and scratch state. Never serialized; a new session
/// starts from `Default`.
#[derive(Debug, Default)]
pub struct SessionState {
    pub generating: bool,
    pub pending_action: Option<ActionKind>,
    pub direction: String,
    pub speaking: bool,
    pub recording: bool,
    pub panels: Vec<Panel>,
}

#[derive(Debug)]
pub enum SessionEvent {
    GenerationStarted(Option<ActionKind>),
    GenerationFinished,
    DirectionSet(String),
    DirectionCleared,
    NarrationStarted,
    NarrationStopped,
    DictationStarted,
    DictationStopped,
    StoryboardReady(Vec<Panel>),
}

impl SessionState {
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::GenerationStarted(action) => {
                self.generating = true;
                self.pending_action = action;
            }
            SessionEvent::GenerationFinished => {
                self.generating = false;
                self.pending_action = None;
            }
            SessionEvent::DirectionSet(text) => self.direction = text,
            SessionEvent::DirectionCleared => self.direction.clear(),
            SessionEvent::NarrationStarted => self.speaking = true,
            SessionEvent::NarrationStopped => self.speaking = false,
            SessionEvent::DictationStarted => self.recording = true,
            SessionEvent::DictationStopped => self.recording = false,
            SessionEvent::StoryboardReady(panels) => self.panels = panels,
        }
    }
}
