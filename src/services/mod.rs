pub mod actions;
pub mod dictation;
pub mod llm;
pub mod narration;
pub mod playback;
pub mod recognition;
pub mod speech;
pub mod storyboard;
pub mod studio;
