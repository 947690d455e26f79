use crate::services::recognition::{SpeechRecognizer, StopSignal};
use anyhow::{anyhow, Result};
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::task::JoinHandle;

struct ActiveDictation {
    rx: mpsc::UnboundedReceiver<String>,
    stop: StopSignal,
    forward: JoinHandle<()>,
}

/// Drives a continuous recognition stream and buffers the finalized text
/// until the owner drains it. Interim results never reach the buffer.
pub struct DictationController {
    recognizer: Option<Box<dyn SpeechRecognizer>>,
    locale: String,
    active: Option<ActiveDictation>,
}

impl DictationController {
    pub fn new(recognizer: Option<Box<dyn SpeechRecognizer>>, locale: &str) -> Self {
        Self {
            recognizer,
            locale: locale.to_string(),
            active: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.recognizer.is_some()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Fails immediately when no recognizer exists, before any stream is
    /// opened.
    pub async fn start(&mut self) -> Result<()> {
        if self.active.is_some() {
            return Ok(());
        }
        let recognizer = self
            .recognizer
            .as_ref()
            .ok_or_else(|| anyhow!("Speech recognition is not available on this system"))?;
        let session = recognizer.start(&self.locale).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        let mut batches = session.batches;
        let forward = tokio::spawn(async move {
            while let Some(batch) = batches.next().await {
                let text = batch.final_text();
                if text.is_empty() {
                    continue;
                }
                if tx.send(text).is_err() {
                    break;
                }
            }
        });
        self.active = Some(ActiveDictation {
            rx,
            stop: session.stop,
            forward,
        });
        Ok(())
    }

    /// Finalized batches that arrived since the last drain, in arrival
    /// order. When the backend has ended the stream on its own, the
    /// controller winds down and later calls return nothing.
    pub fn drain(&mut self) -> Vec<String> {
        let (out, ended) = match self.active.as_mut() {
            Some(active) => Self::collect(active),
            None => return Vec::new(),
        };
        if ended {
            self.teardown();
        }
        out
    }

    /// Stops the stream and hands back whatever finalized text was still
    /// buffered.
    pub fn stop(&mut self) -> Vec<String> {
        let out = match self.active.as_mut() {
            Some(active) => Self::collect(active).0,
            None => return Vec::new(),
        };
        self.teardown();
        out
    }

    fn collect(active: &mut ActiveDictation) -> (Vec<String>, bool) {
        let mut out = Vec::new();
        loop {
            match active.rx.try_recv() {
                Ok(text) => out.push(text),
                Err(TryRecvError::Empty) => return (out, false),
                Err(TryRecvError::Disconnected) => return (out, true),
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.stop.signal();
            active.forward.abort();
        }
    }
}
