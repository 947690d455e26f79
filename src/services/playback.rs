use crate::services::speech::AudioClip;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

/// One live playback.
pub trait PlaybackHandle: Send {
    fn stop(&self);
    fn is_finished(&self) -> bool;
}

#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<Box<dyn PlaybackHandle>>;
}

/// Probes the platform for an output device. An `Err` here means narration is
/// simply unavailable this session, not a fatal condition.
pub fn create_audio_output() -> Result<Box<dyn AudioOutput>> {
    Ok(Box::new(RodioOutput::new()?))
}

// --- Rodio backend ---

enum OutputCommand {
    Play {
        clip: AudioClip,
        reply: oneshot::Sender<Result<rodio::Sink>>,
    },
}

/// The rodio output stream is not `Send`, so a dedicated thread owns it for
/// the life of the process and hands sinks back over a channel.
struct RodioOutput {
    tx: std::sync::mpsc::Sender<OutputCommand>,
}

impl RodioOutput {
    fn new() -> Result<Self> {
        let (tx, rx) = std::sync::mpsc::channel::<OutputCommand>();
        let (init_tx, init_rx) = std::sync::mpsc::channel::<Result<()>>();

        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let (stream, handle) = match rodio::OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = init_tx.send(Err(anyhow!("No audio output device: {}", e)));
                        return;
                    }
                };
                let _ = init_tx.send(Ok(()));
                // The stream must outlive every sink created from it.
                let _stream = stream;

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        OutputCommand::Play { clip, reply } => {
                            let result = rodio::Sink::try_new(&handle)
                                .map(|sink| {
                                    let source = rodio::buffer::SamplesBuffer::new(
                                        clip.channels,
                                        clip.sample_rate,
                                        clip.samples,
                                    );
                                    sink.append(source);
                                    sink
                                })
                                .map_err(|e| anyhow!("Failed to open playback sink: {}", e));
                            let _ = reply.send(result);
                        }
                    }
                }
            })
            .context("Failed to spawn audio output thread")?;

        init_rx
            .recv()
            .map_err(|_| anyhow!("Audio output thread died during startup"))??;

        Ok(Self { tx })
    }
}

#[async_trait]
impl AudioOutput for RodioOutput {
    async fn play(&self, clip: AudioClip) -> Result<Box<dyn PlaybackHandle>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(OutputCommand::Play {
                clip,
                reply: reply_tx,
            })
            .map_err(|_| anyhow!("Audio output thread is gone"))?;

        let sink = reply_rx
            .await
            .map_err(|_| anyhow!("Audio output thread dropped the request"))??;

        Ok(Box::new(RodioPlayback { sink }))
    }
}

struct RodioPlayback {
    sink: rodio::Sink,
}

impl PlaybackHandle for RodioPlayback {
    fn stop(&self) {
        self.sink.stop();
    }

    fn is_finished(&self) -> bool {
        self.sink.empty()
    }
}
