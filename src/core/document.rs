use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

pub const UNTITLED: &str = "Untitled Story";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub portrait: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Scene {
    pub title: String,
    pub summary: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Act {
    pub title: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlotOutline {
    #[serde(default)]
    pub acts: Vec<Act>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub content: String,
    // Characters and plot ride along in the snapshot; no operation here
    // mutates them.
    #[serde(default)]
    pub characters: Vec<Character>,
    #[serde(default)]
    pub plot: Option<PlotOutline>,
    pub last_modified: u64,
}

/// The durable unit: the whole document collection plus the active id.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Library {
    pub documents: Vec<Document>,
    #[serde(default)]
    pub active_doc_id: Option<String>,
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

impl Library {
    /// The active document, validated against the collection on every read.
    /// A stale id behaves exactly like no active document.
    pub fn active_document(&self) -> Option<&Document> {
        let id = self.active_doc_id.as_deref()?;
        self.documents.iter().find(|d| d.id == id)
    }

    fn active_document_mut(&mut self) -> Option<&mut Document> {
        let id = self.active_doc_id.clone()?;
        self.documents.iter_mut().find(|d| d.id == id)
    }

    /// Inserts an empty document at the front of the collection and makes it
    /// active. Returns the new id.
    pub fn create_document(&mut self) -> String {
        let id = self.allocate_id();
        self.documents.insert(
            0,
            Document {
                id: id.clone(),
                title: UNTITLED.to_string(),
                content: String::new(),
                characters: Vec::new(),
                plot: None,
                last_modified: now_millis(),
            },
        );
        self.active_doc_id = Some(id.clone());
        id
    }

    /// Makes `id` active if it exists; clears the active id otherwise.
    pub fn set_active(&mut self, id: &str) {
        if self.documents.iter().any(|d| d.id == id) {
            self.active_doc_id = Some(id.to_string());
        } else {
            log::warn!("set_active: unknown document id {}, clearing", id);
            self.active_doc_id = None;
        }
    }

    /// Replaces the active document's content. Returns false (and changes
    /// nothing) when no document is active.
    pub fn update_content(&mut self, content: &str) -> bool {
        match self.active_document_mut() {
            Some(doc) => {
                doc.content = content.to_string();
                doc.last_modified = now_millis();
                true
            }
            None => false,
        }
    }

    /// Appends `chunk` to the active document's content as-is.
    pub fn append_content(&mut self, chunk: &str) -> bool {
        match self.active_document_mut() {
            Some(doc) => {
                doc.content.push_str(chunk);
                doc.last_modified = now_millis();
                true
            }
            None => false,
        }
    }

    pub fn update_title(&mut self, title: &str) -> bool {
        match self.active_document_mut() {
            Some(doc) => {
                doc.title = title.to_string();
                doc.last_modified = now_millis();
                true
            }
            None => false,
        }
    }

    /// Removes a document. A dangling active id is cleared, never left
    /// pointing at a missing document.
    pub fn delete_document(&mut self, id: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        let removed = self.documents.len() != before;
        if removed && self.active_doc_id.as_deref() == Some(id) {
            self.active_doc_id = None;
        }
        removed
    }

    /// Mirror-writing filter: reverses the active content character by
    /// character.
    pub fn reverse_content(&mut self) -> bool {
        match self.active_document_mut() {
            Some(doc) => {
                doc.content = doc.content.chars().rev().collect();
                doc.last_modified = now_millis();
                true
            }
            None => false,
        }
    }

    // Timestamp ids collide when two documents are created in the same
    // millisecond; suffix until unique.
    fn allocate_id(&self) -> String {
        let base = now_millis().to_string();
        if !self.documents.iter().any(|d| d.id == base) {
            return base;
        }
        let mut n = 1usize;
        loop {
            let candidate = format!("{}-{}", base, n);
            if !self.documents.iter().any(|d| d.id == candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_document_is_present_and_active() {
        let mut library = Library::default();
        let id = library.create_document();

        assert_eq!(library.documents.len(), 1);
        assert_eq!(library.documents[0].id, id);
        assert_eq!(library.active_doc_id.as_deref(), Some(id.as_str()));
        assert_eq!(library.active_document().unwrap().title, UNTITLED);
    }

    #[test]
    fn test_create_document_inserts_at_front() {
        let mut library = Library::default();
        let first = library.create_document();
        let second = library.create_document();

        assert_ne!(first, second);
        assert_eq!(library.documents[0].id, second);
        assert_eq!(library.documents[1].id, first);
    }

    #[test]
    fn test_set_active_unknown_id_clears() {
        let mut library = Library::default();
        let id = library.create_document();

        library.set_active("nope");
        assert_eq!(library.active_doc_id, None);
        assert!(library.active_document().is_none());

        library.set_active(&id);
        assert_eq!(library.active_doc_id.as_deref(), Some(id.as_str()));
    }

    #[test]
    fn test_update_content_requires_active() {
        let mut library = Library::default();
        assert!(!library.update_content("text"));

        library.create_document();
        let before = library.active_document().unwrap().last_modified;
        assert!(library.update_content("text"));

        let doc = library.active_document().unwrap();
        assert_eq!(doc.content, "text");
        assert!(doc.last_modified >= before);
    }

    #[test]
    fn test_append_content() {
        let mut library = Library::default();
        library.create_document();
        library.update_content("hello");
        library.append_content(" world");
        assert_eq!(library.active_document().unwrap().content, "hello world");
    }

    #[test]
    fn test_delete_active_clears_active_id() {
        let mut library = Library::default();
        let keep = library.create_document();
        let doomed = library.create_document();

        assert!(library.delete_document(&doomed));
        assert_eq!(library.active_doc_id, None);
        assert!(library.active_document().is_none());
        assert_eq!(library.documents.len(), 1);
        assert_eq!(library.documents[0].id, keep);
    }

    #[test]
    fn test_delete_inactive_keeps_active_id() {
        let mut library = Library::default();
        let first = library.create_document();
        let second = library.create_document();

        assert!(library.delete_document(&first));
        assert_eq!(library.active_doc_id.as_deref(), Some(second.as_str()));
        assert!(!library.delete_document("missing"));
    }

    #[test]
    fn test_reverse_content() {
        let mut library = Library::default();
        library.create_document();
        library.update_content("abc");
        assert!(library.reverse_content());
        assert_eq!(library.active_document().unwrap().content, "cba");
    }

    #[test]
    fn test_stale_active_id_reads_as_none() {
        let mut library = Library::default();
        library.create_document();
        library.active_doc_id = Some("stale".to_string());
        assert!(library.active_document().is_none());
    }

    #[test]
    fn test_snapshot_reads_without_optional_fields() {
        // Older snapshots carry neither characters nor plot.
        let json = r#"{
            "documents": [
                { "id": "1", "title": "T", "content": "c", "last_modified": 5 }
            ],
            "active_doc_id": "1"
        }"#;
        let library: Library = serde_json::from_str(json).unwrap();
        let doc = library.active_document().unwrap();
        assert!(doc.characters.is_empty());
        assert!(doc.plot.is_none());
    }
}
