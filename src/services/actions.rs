use crate::services::llm::LlmClient;
use crate::utils::text::tail_chars;
use anyhow::Result;
use std::fmt;
use std::sync::Arc;

/// How much trailing context rides along with an action request.
pub const ACTION_CONTEXT_CHARS: usize = 3000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Continue,
    Rewrite,
    Regenerate,
    Refine,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Continue,
        ActionKind::Rewrite,
        ActionKind::Regenerate,
        ActionKind::Refine,
    ];

    /// Uppercase tag used in the merge separator.
    pub fn label(&self) -> &'static str {
        match self {
            ActionKind::Continue => "CONTINUE",
            ActionKind::Rewrite => "REWRITE",
            ActionKind::Regenerate => "REGENERATE",
            ActionKind::Refine => "REFINE",
        }
    }

    fn system_prompt(&self) -> &'static str {
        match self {
            ActionKind::Continue => {
                "You are a novelist's writing partner. Continue the story naturally from \
                 where the excerpt leaves off, keeping its voice, tense and pacing. \
                 Return only the continuation."
            }
            ActionKind::Rewrite => {
                "You are a novelist's writing partner. Rewrite the excerpt with stronger \
                 flow and imagery while preserving its events and narrative voice. \
                 Return only the rewritten passage."
            }
            ActionKind::Regenerate => {
                "You are a novelist's writing partner. Write a fresh alternative take on \
                 the excerpt, exploring a different angle on the same moment. \
                 Return only the new passage."
            }
            ActionKind::Refine => {
                "You are a novelist's writing partner. Polish the excerpt, tightening \
                 the prose without changing what happens. Return only the refined passage."
            }
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Continue => "Continue",
            ActionKind::Rewrite => "Rewrite",
            ActionKind::Regenerate => "Regenerate",
            ActionKind::Refine => "Refine",
        };
        write!(f, "{}", name)
    }
}

/// Folds a generation result into the existing content. Nothing is ever
/// replaced in place; every kind appends.
pub fn merge_result(content: &str, kind: ActionKind, result: &str) -> String {
    match kind {
        ActionKind::Continue => {
            if content.is_empty() {
                result.to_string()
            } else {
                format!("{}\n\n{}", content, result)
            }
        }
        _ => format!("{}\n\n--- {} VERSION ---\n{}", content, kind.label(), result),
    }
}

pub struct ActionDispatcher {
    llm: Arc<dyn LlmClient>,
}

impl ActionDispatcher {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    /// Sends the trailing window of `content` to the generator with the
    /// per-kind instruction and the optional free-form direction. Returns the
    /// raw generated text; merging is the caller's move.
    pub async fn run(&self, content: &str, kind: ActionKind, direction: &str) -> Result<String> {
        let context = tail_chars(content, ACTION_CONTEXT_CHARS);

        let mut prompt = String::new();
        if !direction.trim().is_empty() {
            prompt.push_str(&format!("Author's direction: {}\n\n", direction.trim()));
        }
        prompt.push_str(&format!("Excerpt:\n{}", context));

        self.llm.generate(kind.system_prompt(), &prompt).await
    }
}
