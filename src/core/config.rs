use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::services::llm::LlmConfig;
use crate::services::recognition::DictationConfig;
use crate::services::speech::SpeechConfig;

pub const CONFIG_FILE: &str = "config.yml";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_data")]
    pub data_folder: String,

    #[serde(default = "default_export")]
    pub export_folder: String,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub speech: SpeechConfig,

    #[serde(default)]
    pub dictation: DictationConfig,
}

fn default_data() -> String {
    ".storyloom".to_string()
}
fn default_export() -> String {
    "exports".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_folder: default_data(),
            export_folder: default_export(),
            llm: LlmConfig::default(),
            speech: SpeechConfig::default(),
            dictation: DictationConfig::default(),
        }
    }
}

impl Config {
    /// A missing file means a first run; defaults apply until the user writes
    /// a config.yml of their own.
    pub fn load_or_default() -> Result<Self> {
        let path = Path::new(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).context("Failed to read config.yml")?;
        let config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config.yml")?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let content = serde_yaml::to_string(self)?;
        fs::write(CONFIG_FILE, content).context("Failed to write config.yml")?;
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<()> {
        fs::create_dir_all(&self.data_folder)?;
        fs::create_dir_all(&self.export_folder)?;
        Ok(())
    }
}
