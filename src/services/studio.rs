use crate::core::config::Config;
use crate::core::document::Library;
use crate::core::io::Storage;
use crate::core::persist::{PersistenceGateway, SaveStatus};
use crate::core::session::{SessionEvent, SessionState};
use crate::services::actions::{merge_result, ActionDispatcher, ActionKind};
use crate::services::dictation::DictationController;
use crate::services::llm::LlmClient;
use crate::services::narration::NarrationController;
use crate::services::storyboard::{Panel, StoryboardGenerator};
use crate::utils::export::export_word;
use anyhow::{anyhow, bail, Result};
use indicatif::ProgressBar;
use inquire::{Confirm, Select, Text};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Owns the library, the session scratch state and every collaborator, and
/// serializes all mutations. Anything that edits a document goes through a
/// `&mut self` method here, so an in-flight AI merge can never race a
/// dictation append.
pub struct Studio {
    config: Config,
    library: Library,
    gateway: PersistenceGateway,
    session: SessionState,
    dispatcher: ActionDispatcher,
    storyboard: StoryboardGenerator,
    narration: Option<NarrationController>,
    dictation: DictationController,
}

impl Studio {
    pub async fn new(
        config: Config,
        llm: Arc<dyn LlmClient>,
        narration: Option<NarrationController>,
        dictation: DictationController,
        storage: Arc<dyn Storage>,
    ) -> Self {
        let gateway = PersistenceGateway::new(storage, &config.data_folder);
        let library = gateway.load().await;
        Self {
            dispatcher: ActionDispatcher::new(llm.clone()),
            storyboard: StoryboardGenerator::new(llm),
            config,
            library,
            gateway,
            session: SessionState::default(),
            narration,
            dictation,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn save_status(&self) -> SaveStatus {
        self.gateway.status()
    }

    // --- Document operations ---

    pub fn create_document(&mut self) -> String {
        let id = self.library.create_document();
        self.gateway.schedule(&self.library);
        id
    }

    pub fn open_document(&mut self, id: &str) {
        self.library.set_active(id);
        self.gateway.schedule(&self.library);
    }

    pub fn delete_document(&mut self, id: &str) -> bool {
        let removed = self.library.delete_document(id);
        if removed {
            self.gateway.schedule(&self.library);
        }
        removed
    }

    pub fn rename_document(&mut self, title: &str) -> bool {
        let changed = self.library.update_title(title);
        if changed {
            self.gateway.schedule(&self.library);
        }
        changed
    }

    pub fn update_content(&mut self, content: &str) -> bool {
        let changed = self.library.update_content(content);
        if changed {
            self.gateway.schedule(&self.library);
        }
        changed
    }

    /// Appends one typed paragraph, separated by a blank line from whatever
    /// is already there.
    pub fn append_paragraph(&mut self, text: &str) -> bool {
        let chunk = match self.library.active_document() {
            Some(doc) if doc.content.is_empty() => text.to_string(),
            Some(_) => format!("\n\n{}", text),
            None => return false,
        };
        let changed = self.library.append_content(&chunk);
        if changed {
            self.gateway.schedule(&self.library);
        }
        changed
    }

    pub fn reverse_content(&mut self) -> bool {
        let changed = self.library.reverse_content();
        if changed {
            self.gateway.schedule(&self.library);
        }
        changed
    }

    // --- AI actions ---

    /// Free-form steering text for the next generation. Blank input clears
    /// it.
    pub fn set_direction(&mut self, direction: &str) {
        let trimmed = direction.trim();
        if trimmed.is_empty() {
            self.session.apply(SessionEvent::DirectionCleared);
        } else {
            self.session.apply(SessionEvent::DirectionSet(trimmed.to_string()));
        }
    }

    /// Runs one generation against the active document and folds the result
    /// in. Rejected while another request is in flight. The direction is
    /// consumed on success and kept for a retry on failure.
    pub async fn run_action(&mut self, kind: ActionKind) -> Result<()> {
        if self.session.generating {
            bail!("An AI request is already running");
        }
        let doc = self
            .library
            .active_document()
            .ok_or_else(|| anyhow!("No story is open"))?;
        let content = doc.content.clone();
        let direction = self.session.direction.clone();

        self.session
            .apply(SessionEvent::GenerationStarted(Some(kind)));
        let outcome = self.dispatcher.run(&content, kind, &direction).await;
        self.session.apply(SessionEvent::GenerationFinished);
        let generated = outcome?;

        let current = self
            .library
            .active_document()
            .map(|d| d.content.clone())
            .unwrap_or_default();
        let merged = merge_result(&current, kind, &generated);
        self.library.update_content(&merged);
        self.session.apply(SessionEvent::DirectionCleared);
        self.gateway.schedule(&self.library);
        Ok(())
    }

    /// Breaks the trailing scene into comic panels and parks them in the
    /// session for display.
    pub async fn generate_storyboard(&mut self) -> Result<&[Panel]> {
        if self.session.generating {
            bail!("An AI request is already running");
        }
        let doc = self
            .library
            .active_document()
            .ok_or_else(|| anyhow!("No story is open"))?;
        let content = doc.content.clone();

        self.session.apply(SessionEvent::GenerationStarted(None));
        let outcome = self.storyboard.generate(&content).await;
        self.session.apply(SessionEvent::GenerationFinished);
        let panels = outcome?;

        self.session.apply(SessionEvent::StoryboardReady(panels));
        Ok(&self.session.panels)
    }

    // --- Narration ---

    pub async fn toggle_narration(&mut self) -> Result<()> {
        let narration = self
            .narration
            .as_mut()
            .ok_or_else(|| anyhow!("Narration is not available on this system"))?;
        let content = self
            .library
            .active_document()
            .map(|d| d.content.clone())
            .ok_or_else(|| anyhow!("No story is open"))?;

        narration.toggle(&content).await?;
        if narration.is_active() {
            self.session.apply(SessionEvent::NarrationStarted);
        } else {
            self.session.apply(SessionEvent::NarrationStopped);
        }
        Ok(())
    }

    /// Reconciles the session with playback that finished on its own.
    pub fn refresh_narration(&mut self) {
        if let Some(narration) = self.narration.as_mut() {
            narration.refresh();
            if !narration.is_active() && self.session.speaking {
                self.session.apply(SessionEvent::NarrationStopped);
            }
        }
    }

    // --- Dictation ---

    pub async fn toggle_dictation(&mut self) -> Result<()> {
        if self.dictation.is_recording() {
            let tail = self.dictation.stop();
            self.commit_dictation(tail);
            self.session.apply(SessionEvent::DictationStopped);
            return Ok(());
        }
        if self.library.active_document().is_none() {
            bail!("No story is open");
        }
        self.dictation.start().await?;
        self.session.apply(SessionEvent::DictationStarted);
        Ok(())
    }

    /// Moves any finalized dictation text into the active document. Returns
    /// true when the content changed.
    pub fn pump_dictation(&mut self) -> bool {
        let batches = self.dictation.drain();
        let changed = self.commit_dictation(batches);
        if self.session.recording && !self.dictation.is_recording() {
            self.session.apply(SessionEvent::DictationStopped);
        }
        changed
    }

    fn commit_dictation(&mut self, batches: Vec<String>) -> bool {
        let mut changed = false;
        for batch in batches {
            let chunk = match self.library.active_document() {
                Some(doc) if doc.content.is_empty() => batch,
                Some(_) => format!(" {}", batch),
                None => break,
            };
            if self.library.append_content(&chunk) {
                changed = true;
            }
        }
        if changed {
            self.gateway.schedule(&self.library);
        }
        changed
    }

    // --- Output paths ---

    pub async fn export_active(&self) -> Result<PathBuf> {
        let doc = self
            .library
            .active_document()
            .ok_or_else(|| anyhow!("No story is open"))?;
        export_word(Path::new(&self.config.export_folder), &doc.title, &doc.content).await
    }

    /// The manuscript bytes, untouched, for printing.
    pub fn printable_text(&self) -> Result<&str> {
        let doc = self
            .library
            .active_document()
            .ok_or_else(|| anyhow!("No story is open"))?;
        Ok(&doc.content)
    }

    /// The manuscript bytes, untouched, for the clipboard.
    pub fn clipboard_text(&self) -> Result<String> {
        self.printable_text().map(|s| s.to_string())
    }

    /// Writes the library out immediately, cancelling any pending debounce.
    pub async fn flush(&mut self) -> Result<()> {
        self.gateway.flush(&self.library).await
    }

    // --- Interactive shell ---

    pub async fn run(&mut self) -> Result<()> {
        println!("Storyloom - a writing room for long stories");
        loop {
            self.refresh_narration();
            if self.pump_dictation() {
                println!("(dictated text added)");
            }
            self.print_header();

            let options = self.menu_options();
            let choice = match Select::new("What next?", options).prompt() {
                Ok(choice) => choice,
                Err(_) => {
                    println!("Input closed, saving and leaving.");
                    break;
                }
            };

            if let Err(e) = self.handle_choice(choice).await {
                eprintln!("{:#}", e);
            }
            if choice == "Quit" {
                break;
            }
        }

        if let Err(e) = self.flush().await {
            eprintln!("Could not save the library on the way out: {:#}", e);
        }
        Ok(())
    }

    fn print_header(&self) {
        match self.library.active_document() {
            Some(doc) => {
                let status = self.gateway.status().label();
                println!(
                    "\n[{}] {} chars {}",
                    doc.title,
                    doc.content.chars().count(),
                    status
                );
                if self.session.recording {
                    println!("(dictating)");
                }
                if self.session.speaking {
                    println!("(reading aloud)");
                }
            }
            None => println!("\nNo story open ({} in the library)", self.library.documents.len()),
        }
    }

    fn menu_options(&self) -> Vec<&'static str> {
        let mut options = Vec::new();
        if self.library.active_document().is_some() {
            options.push("Write a paragraph");
            options.push("Ask the AI");
            options.push("Set direction for the AI");
            options.push("Storyboard this scene");
            if self.narration.is_some() {
                if self.session.speaking {
                    options.push("Stop reading aloud");
                } else {
                    options.push("Read aloud");
                }
            }
            if self.session.recording {
                options.push("Stop dictating");
            } else {
                options.push("Dictate");
            }
            options.push("Show the story");
            options.push("Copy the story");
            options.push("Export to Word");
            options.push("Reverse the text");
            options.push("Rename this story");
            options.push("Delete this story");
        }
        options.push("New story");
        if !self.library.documents.is_empty() {
            options.push("Switch story");
        }
        options.push("Quit");
        options
    }

    async fn handle_choice(&mut self, choice: &str) -> Result<()> {
        match choice {
            "Write a paragraph" => {
                let text = Text::new("Paragraph:").prompt()?;
                if !text.trim().is_empty() {
                    self.append_paragraph(&text);
                }
            }
            "Ask the AI" => {
                let kind = Select::new("What should it do?", ActionKind::ALL.to_vec()).prompt()?;
                let spinner = start_spinner("Thinking...");
                let outcome = self.run_action(kind).await;
                spinner.finish_and_clear();
                outcome?;
                println!("Done. The new text is at the end of the story.");
            }
            "Set direction for the AI" => {
                let direction = Text::new("Direction (blank to clear):")
                    .with_initial_value(&self.session.direction)
                    .prompt()?;
                self.set_direction(&direction);
            }
            "Storyboard this scene" => {
                let spinner = start_spinner("Sketching panels...");
                let outcome = self.generate_storyboard().await;
                spinner.finish_and_clear();
                let panels = outcome?;
                if panels.is_empty() {
                    println!("No panels this time.");
                }
                for (i, panel) in panels.iter().enumerate() {
                    println!("Panel {}: {}", i + 1, panel.description);
                    if !panel.dialogue.is_empty() {
                        println!("         \"{}\"", panel.dialogue);
                    }
                }
            }
            "Read aloud" | "Stop reading aloud" => {
                self.toggle_narration().await?;
            }
            "Dictate" | "Stop dictating" => {
                self.toggle_dictation().await?;
                if self.session.recording {
                    println!("Listening. Pick any menu item to fold new text in.");
                }
            }
            "Show the story" => {
                println!("{}", self.printable_text()?);
            }
            "Copy the story" => {
                eprintln!("(select and copy the text below)");
                println!("{}", self.clipboard_text()?);
            }
            "Export to Word" => {
                let path = self.export_active().await?;
                println!("Exported to {:?}", path);
            }
            "Reverse the text" => {
                self.reverse_content();
            }
            "Rename this story" => {
                let title = Text::new("New title:").prompt()?;
                if !title.trim().is_empty() {
                    self.rename_document(title.trim());
                }
            }
            "Delete this story" => {
                if let Some(doc) = self.library.active_document() {
                    let id = doc.id.clone();
                    let confirmed = Confirm::new(&format!("Delete \"{}\"?", doc.title))
                        .with_default(false)
                        .prompt()?;
                    if confirmed {
                        self.delete_document(&id);
                    }
                }
            }
            "New story" => {
                self.create_document();
            }
            "Switch story" => {
                if let Some(id) = self.pick_document()? {
                    self.open_document(&id);
                }
            }
            "Quit" => {}
            other => bail!("Unhandled menu entry: {}", other),
        }
        Ok(())
    }

    fn pick_document(&self) -> Result<Option<String>> {
        let labels: Vec<String> = self
            .library
            .documents
            .iter()
            .enumerate()
            .map(|(i, doc)| format!("{}. {} ({} chars)", i + 1, doc.title, doc.content.chars().count()))
            .collect();
        if labels.is_empty() {
            return Ok(None);
        }
        let selection = Select::new("Which story?", labels.clone()).prompt()?;
        let index = labels
            .iter()
            .position(|l| l == &selection)
            .ok_or_else(|| anyhow!("Selection did not match a story"))?;
        Ok(self.library.documents.get(index).map(|d| d.id.clone()))
    }
}

fn start_spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
