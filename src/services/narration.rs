use crate::services::playback::{AudioOutput, PlaybackHandle};
use crate::services::speech::SpeechClient;
use crate::utils::text::tail_chars;
use anyhow::Result;
use std::sync::Arc;

pub const NARRATION_CONTEXT_CHARS: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationPhase {
    Idle,
    Requesting,
    Playing,
}

/// Reads the tail of the active document aloud. One narration at a time;
/// toggling while audio is playing stops it instead of starting another.
pub struct NarrationController {
    speech: Arc<dyn SpeechClient>,
    output: Box<dyn AudioOutput>,
    phase: NarrationPhase,
    playback: Option<Box<dyn PlaybackHandle>>,
}

impl NarrationController {
    pub fn new(speech: Arc<dyn SpeechClient>, output: Box<dyn AudioOutput>) -> Self {
        Self {
            speech,
            output,
            phase: NarrationPhase::Idle,
            playback: None,
        }
    }

    pub fn phase(&self) -> NarrationPhase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase != NarrationPhase::Idle
    }

    /// Folds a playback that ran to its end back into the idle phase. Called
    /// before every phase decision so a finished clip never blocks the next
    /// narration.
    pub fn refresh(&mut self) {
        if self.phase != NarrationPhase::Playing {
            return;
        }
        let finished = self
            .playback
            .as_ref()
            .map(|p| p.is_finished())
            .unwrap_or(true);
        if finished {
            self.playback = None;
            self.phase = NarrationPhase::Idle;
        }
    }

    /// Starts narrating `content`, or stops the narration already underway.
    /// Blank content is a quiet no-op.
    pub async fn toggle(&mut self, content: &str) -> Result<()> {
        self.refresh();
        if self.is_active() {
            self.stop();
            return Ok(());
        }

        let excerpt = tail_chars(content, NARRATION_CONTEXT_CHARS);
        if excerpt.trim().is_empty() {
            return Ok(());
        }

        self.phase = NarrationPhase::Requesting;
        let clip = match self.speech.synthesize(excerpt).await {
            Ok(clip) => clip,
            Err(e) => {
                self.phase = NarrationPhase::Idle;
                return Err(e);
            }
        };
        match self.output.play(clip).await {
            Ok(handle) => {
                self.playback = Some(handle);
                self.phase = NarrationPhase::Playing;
                Ok(())
            }
            Err(e) => {
                self.phase = NarrationPhase::Idle;
                Err(e)
            }
        }
    }

    pub fn stop(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.stop();
        }
        self.phase = NarrationPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::speech::{AudioClip, SYNTH_CHANNELS, SYNTH_SAMPLE_RATE};
    use anyhow::bail;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Debug)]
    struct MockSpeech {
        texts: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl MockSpeech {
        fn new(fail: bool) -> (Arc<Self>, Arc<Mutex<Vec<String>>>) {
            let texts = Arc::new(Mutex::new(Vec::new()));
            let client = Arc::new(Self {
                texts: texts.clone(),
                fail,
            });
            (client, texts)
        }
    }

    #[async_trait]
    impl SpeechClient for MockSpeech {
        async fn synthesize(&self, text: &str) -> Result<AudioClip> {
            if self.fail {
                bail!("synthesis refused");
            }
            self.texts.lock().unwrap().push(text.to_string());
            Ok(AudioClip {
                sample_rate: SYNTH_SAMPLE_RATE,
                channels: SYNTH_CHANNELS,
                samples: vec![0.0; 64],
            })
        }
    }

    struct MockHandle {
        stopped: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
    }

    impl PlaybackHandle for MockHandle {
        fn stop(&self) {
            self.stopped.store(true, Ordering::SeqCst);
            self.finished.store(true, Ordering::SeqCst);
        }
        fn is_finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    struct MockOutput {
        plays: Arc<Mutex<usize>>,
        stopped: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
        fail: bool,
    }

    impl MockOutput {
        fn new(fail: bool) -> Self {
            Self {
                plays: Arc::new(Mutex::new(0)),
                stopped: Arc::new(AtomicBool::new(false)),
                finished: Arc::new(AtomicBool::new(false)),
                fail,
            }
        }
    }

    #[async_trait]
    impl AudioOutput for MockOutput {
        async fn play(&self, _clip: AudioClip) -> Result<Box<dyn PlaybackHandle>> {
            if self.fail {
                bail!("device busy");
            }
            *self.plays.lock().unwrap() += 1;
            Ok(Box::new(MockHandle {
                stopped: self.stopped.clone(),
                finished: self.finished.clone(),
            }))
        }
    }

    #[tokio::test]
    async fn test_blank_content_never_reaches_synthesis() -> Result<()> {
        let (speech, texts) = MockSpeech::new(false);
        let mut controller = NarrationController::new(speech, Box::new(MockOutput::new(false)));

        controller.toggle("").await?;
        controller.toggle("   \n\t ").await?;
        assert_eq!(controller.phase(), NarrationPhase::Idle);
        assert!(texts.lock().unwrap().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_toggle_narrates_trailing_window() -> Result<()> {
        let (speech, texts) = MockSpeech::new(false);
        let mut controller = NarrationController::new(speech, Box::new(MockOutput::new(false)));

        let content = "x".repeat(NARRATION_CONTEXT_CHARS + 400);
        controller.toggle(&content).await?;
        assert_eq!(controller.phase(), NarrationPhase::Playing);

        let texts = texts.lock().unwrap();
        assert_eq!(texts.len(), 1);
        assert_eq!(texts[0].chars().count(), NARRATION_CONTEXT_CHARS);
        Ok(())
    }

    #[tokio::test]
    async fn test_second_toggle_stops_playback() -> Result<()> {
        let (speech, texts) = MockSpeech::new(false);
        let output = MockOutput::new(false);
        let stopped = output.stopped.clone();
        let mut controller = NarrationController::new(speech, Box::new(output));

        controller.toggle("a quiet evening").await?;
        controller.toggle("a quiet evening").await?;

        assert_eq!(controller.phase(), NarrationPhase::Idle);
        assert!(stopped.load(Ordering::SeqCst));
        assert_eq!(texts.lock().unwrap().len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_synthesis_failure_returns_to_idle() {
        let (speech, _) = MockSpeech::new(true);
        let mut controller = NarrationController::new(speech, Box::new(MockOutput::new(false)));

        let result = controller.toggle("some prose").await;
        assert!(result.is_err());
        assert_eq!(controller.phase(), NarrationPhase::Idle);
    }

    #[tokio::test]
    async fn test_playback_failure_returns_to_idle() {
        let (speech, _) = MockSpeech::new(false);
        let mut controller = NarrationController::new(speech, Box::new(MockOutput::new(true)));

        let result = controller.toggle("some prose").await;
        assert!(result.is_err());
        assert_eq!(controller.phase(), NarrationPhase::Idle);
    }

    #[tokio::test]
    async fn test_finished_clip_folds_back_to_idle() -> Result<()> {
        let (speech, texts) = MockSpeech::new(false);
        let output = MockOutput::new(false);
        let finished = output.finished.clone();
        let mut controller = NarrationController::new(speech, Box::new(output));

        controller.toggle("first passage").await?;
        finished.store(true, Ordering::SeqCst);
        controller.refresh();
        assert_eq!(controller.phase(), NarrationPhase::Idle);

        finished.store(false, Ordering::SeqCst);
        controller.toggle("second passage").await?;
        assert_eq!(controller.phase(), NarrationPhase::Playing);
        assert_eq!(texts.lock().unwrap().len(), 2);
        Ok(())
    }
}
