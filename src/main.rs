use anyhow::Result;
use std::sync::Arc;

use storyloom::core::config::Config;
use storyloom::core::io::NativeStorage;
use storyloom::services::dictation::DictationController;
use storyloom::services::llm::create_llm;
use storyloom::services::narration::NarrationController;
use storyloom::services::playback::create_audio_output;
use storyloom::services::recognition::create_recognizer;
use storyloom::services::speech::create_speech_client;
use storyloom::services::studio::Studio;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // 1. Load Config (defaults on first run)
    let config = Config::load_or_default()?;
    config.ensure_directories()?;

    // 2. Initialize LLM
    let llm = Arc::from(create_llm(&config)?);

    // 3. Narration is optional: no speech credentials or no audio device
    //    just disables it.
    let narration = match create_speech_client(&config) {
        Ok(speech) => match create_audio_output() {
            Ok(output) => Some(NarrationController::new(Arc::from(speech), output)),
            Err(e) => {
                eprintln!("Narration disabled: {}", e);
                None
            }
        },
        Err(e) => {
            eprintln!("Narration disabled: {}", e);
            None
        }
    };

    // 4. Dictation backend, when the platform has one
    let recognizer = create_recognizer(&config)?;
    let dictation = DictationController::new(recognizer, &config.dictation.locale);

    // 5. Storage and the studio itself
    let storage = Arc::new(NativeStorage::new());
    let mut studio = Studio::new(config, llm, narration, dictation, storage).await;
    studio.run().await?;

    Ok(())
}
