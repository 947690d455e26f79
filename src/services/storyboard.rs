use crate::services::llm::{strip_code_blocks, LlmClient};
use crate::utils::text::tail_chars;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const STORYBOARD_CONTEXT_CHARS: usize = 1500;
pub const STORYBOARD_PANEL_COUNT: usize = 4;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Panel {
    pub description: String,
    #[serde(default)]
    pub dialogue: String,
}

#[derive(Debug, Deserialize)]
struct StoryboardResponse {
    #[serde(default)]
    panels: Vec<Panel>,
}

/// Turns the tail of the manuscript into a short run of comic panels.
pub struct StoryboardGenerator {
    llm: Arc<dyn LlmClient>,
}

impl StoryboardGenerator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// A malformed model reply degrades to an empty board; only transport
    /// failures surface as errors.
    pub async fn generate(&self, content: &str) -> Result<Vec<Panel>> {
        let excerpt = tail_chars(content, STORYBOARD_CONTEXT_CHARS);
        let system = format!(
            "You are a storyboard artist. Read the scene and break it into up to {} comic panels. \
             Respond with JSON only, shaped as {{\"panels\": [{{\"description\": \"...\", \"dialogue\": \"...\"}}]}}. \
             Keep each description to one or two visual sentences and leave dialogue empty when nobody speaks.",
            STORYBOARD_PANEL_COUNT
        );
        let prompt = format!("Scene:\n{}", excerpt);

        let raw = self.llm.generate_json(&system, &prompt).await?;
        let cleaned = strip_code_blocks(&raw);
        match serde_json::from_str::<StoryboardResponse>(&cleaned) {
            Ok(parsed) => Ok(parsed.panels),
            Err(e) => {
                log::warn!(
                    "Storyboard reply was not valid JSON ({}), showing an empty board",
                    e
                );
                Ok(Vec::new())
            }
        }
    }
}
