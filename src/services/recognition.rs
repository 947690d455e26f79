use crate::core::config::Config;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

#[derive(Debug, Clone)]
pub struct TranscriptSegment {
    pub text: String,
    pub is_final: bool,
}

/// One delivery from the recognizer. Interim segments are provisional and
/// will be re-delivered finalized later; only final segments may be
/// committed.
#[derive(Debug, Clone, Default)]
pub struct TranscriptBatch {
    pub segments: Vec<TranscriptSegment>,
}

impl TranscriptBatch {
    /// Concatenation of this batch's finalized segments, in order.
    pub fn final_text(&self) -> String {
        self.segments
            .iter()
            .filter(|s| s.is_final)
            .map(|s| s.text.as_str())
            .collect()
    }
}

/// Tells the backend to wind the stream down. Safe to signal once; later
/// calls are no-ops.
pub struct StopSignal(Option<oneshot::Sender<()>>);

impl StopSignal {
    pub fn new(tx: oneshot::Sender<()>) -> Self {
        Self(Some(tx))
    }

    pub fn signal(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

pub type ActiveBatches = BoxStream<'static, TranscriptBatch>;

/// A live recognition stream. The stream ends when the backend stops on its
/// own (silence timeout) or after `stop` is signalled.
pub struct RecognitionSession {
    pub batches: ActiveBatches,
    pub stop: StopSignal,
}

#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    async fn start(&self, locale: &str) -> Result<RecognitionSession>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DictationConfig {
    #[serde(default = "default_recognition_provider")]
    pub provider: String,
    #[serde(default = "default_locale")]
    pub locale: String,
}

fn default_recognition_provider() -> String {
    "none".to_string()
}
fn default_locale() -> String {
    "en-US".to_string()
}

impl Default for DictationConfig {
    fn default() -> Self {
        Self {
            provider: default_recognition_provider(),
            locale: default_locale(),
        }
    }
}

/// `Ok(None)` means the platform offers no recognizer; callers surface that
/// before attempting any stream.
pub fn create_recognizer(config: &Config) -> Result<Option<Box<dyn SpeechRecognizer>>> {
    match config.dictation.provider.as_str() {
        "none" | "" => Ok(None),
        other => Err(anyhow!("Unknown speech recognition provider: {}", other)),
    }
}
