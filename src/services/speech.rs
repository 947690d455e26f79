use crate::core::config::Config;
use crate::services::llm::resolve_gemini_key;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Wire format of the synthesis collaborator: raw PCM, 16-bit little-endian,
/// mono, 24 kHz.
pub const SYNTH_SAMPLE_RATE: u32 = 24000;
pub const SYNTH_CHANNELS: u16 = 1;

#[derive(Debug, Clone)]
pub struct AudioClip {
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioClip {
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / (self.sample_rate as f32 * self.channels as f32)
    }
}

#[async_trait]
pub trait SpeechClient: Send + Sync + Debug {
    async fn synthesize(&self, text: &str) -> Result<AudioClip>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_provider")]
    pub provider: String,
    #[serde(default = "default_speech_model")]
    pub model: String,
    #[serde(default = "default_voice")]
    pub voice: String,
}

fn default_speech_provider() -> String {
    "gemini".to_string()
}
fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}
fn default_voice() -> String {
    "Zephyr".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: default_speech_provider(),
            model: default_speech_model(),
            voice: default_voice(),
        }
    }
}

pub fn create_speech_client(config: &Config) -> Result<Box<dyn SpeechClient>> {
    match config.speech.provider.as_str() {
        "gemini" => {
            let gemini = config.llm.gemini.as_ref().context("Gemini config missing")?;
            let api_key = resolve_gemini_key(&gemini.api_key)?;
            Ok(Box::new(GeminiSpeechClient::new(
                &api_key,
                &config.speech.model,
                &config.speech.voice,
            )))
        }
        _ => Err(anyhow!(
            "Unknown speech provider: {}",
            config.speech.provider
        )),
    }
}

/// Interprets little-endian 16-bit PCM as normalized f32 samples. A trailing
/// odd byte is ignored.
pub fn decode_pcm16(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]) as f32 / 32768.0)
        .collect()
}

// --- Gemini ---

#[derive(Debug)]
struct GeminiSpeechClient {
    api_key: String,
    model: String,
    voice: String,
    client: reqwest::Client,
}

impl GeminiSpeechClient {
    fn new(api_key: &str, model: &str, voice: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            voice: voice.to_string(),
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Serialize)]
struct SpeechRequest {
    contents: Vec<SpeechContent>,
    #[serde(rename = "generationConfig")]
    generation_config: SpeechGenerationConfig,
}

#[derive(Serialize)]
struct SpeechContent {
    parts: Vec<SpeechPart>,
}

#[derive(Serialize)]
struct SpeechPart {
    text: String,
}

#[derive(Serialize)]
struct SpeechGenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<String>,
    #[serde(rename = "speechConfig")]
    speech_config: SpeechVoiceSettings,
}

#[derive(Serialize)]
struct SpeechVoiceSettings {
    #[serde(rename = "voiceConfig")]
    voice_config: VoiceConfig,
}

#[derive(Serialize)]
struct VoiceConfig {
    #[serde(rename = "prebuiltVoiceConfig")]
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Serialize)]
struct PrebuiltVoiceConfig {
    #[serde(rename = "voiceName")]
    voice_name: String,
}

#[derive(Deserialize)]
struct SpeechResponse {
    candidates: Option<Vec<SpeechCandidate>>,
    error: Option<SpeechError>,
}

#[derive(Deserialize)]
struct SpeechCandidate {
    content: Option<SpeechContentResponse>,
}

#[derive(Deserialize)]
struct SpeechContentResponse {
    #[serde(default)]
    parts: Vec<SpeechPartResponse>,
}

#[derive(Deserialize)]
struct SpeechPartResponse {
    #[serde(rename = "inlineData")]
    inline_data: Option<InlineData>,
}

#[derive(Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType", default)]
    mime_type: String,
    data: String,
}

#[derive(Deserialize, Debug)]
struct SpeechError {
    message: String,
}

fn clip_from_response(response: &SpeechResponse) -> Result<AudioClip> {
    if let Some(err) = &response.error {
        return Err(anyhow!("Speech API returned error: {}", err.message));
    }

    let inline = response
        .candidates
        .as_deref()
        .and_then(|c| c.first())
        .and_then(|c| c.content.as_ref())
        .and_then(|c| c.parts.iter().find_map(|p| p.inline_data.as_ref()))
        .context("Speech response carried no audio data")?;

    if !inline.mime_type.is_empty() && !inline.mime_type.starts_with("audio/") {
        return Err(anyhow!(
            "Speech response mime type is not audio: {}",
            inline.mime_type
        ));
    }

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&inline.data)
        .context("Speech audio payload was not valid base64")?;

    Ok(AudioClip {
        sample_rate: SYNTH_SAMPLE_RATE,
        channels: SYNTH_CHANNELS,
        samples: decode_pcm16(&bytes),
    })
}

#[async_trait]
impl SpeechClient for GeminiSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let request_body = SpeechRequest {
            contents: vec![SpeechContent {
                parts: vec![SpeechPart {
                    text: text.to_string(),
                }],
            }],
            generation_config: SpeechGenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechVoiceSettings {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: self.voice.clone(),
                        },
                    },
                },
            },
        };

        let resp = self.client.post(&url).json(&request_body).send().await?;

        if !resp.status().is_success() {
            let error_text = resp.text().await?;
            return Err(anyhow!("Speech API error: {}", error_text));
        }

        let response: SpeechResponse = resp
            .json()
            .await
            .context("Failed to parse speech response")?;

        let clip = clip_from_response(&response)?;
        log::debug!(
            "Synthesized {:.1}s of narration audio",
            clip.duration_secs()
        );
        Ok(clip)
    }
}
