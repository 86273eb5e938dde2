//! Knowledge base: every `*.txt` document in one directory, concatenated into a single blob.

use crate::error::KnowledgeError;
use std::path::Path;

/// Concatenated knowledge documents. Read-only while requests are served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    text: String,
    documents: usize,
}

impl KnowledgeBase {
    /// Build from in-memory text (one pseudo-document).
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let documents = usize::from(!text.is_empty());
        Self { text, documents }
    }

    /// Read `dir/*.txt` in file-name order; each document is followed by a blank line.
    /// A missing directory yields an empty knowledge base.
    pub fn load_dir(dir: &Path) -> Result<Self, KnowledgeError> {
        if !dir.is_dir() {
            tracing::warn!(target: "sunday::knowledge", dir = %dir.display(), "Knowledge directory not found; knowledge base is empty");
            return Ok(Self::default());
        }

        let entries = std::fs::read_dir(dir).map_err(|source| KnowledgeError::List {
            path: dir.display().to_string(),
            source,
        })?;

        let mut paths: Vec<_> = entries
            .filter_map(|e| e.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().map(|ext| ext == "txt").unwrap_or(false))
            .collect();
        paths.sort();

        let mut text = String::new();
        for path in &paths {
            let doc = std::fs::read_to_string(path).map_err(|source| KnowledgeError::Read {
                path: path.display().to_string(),
                source,
            })?;
            text.push_str(&doc);
            text.push_str("\n\n");
        }

        tracing::info!(
            target: "sunday::knowledge",
            documents = paths.len(),
            chars = text.len(),
            "Knowledge base loaded from {}",
            dir.display()
        );
        Ok(Self {
            text,
            documents: paths.len(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn documents(&self) -> usize {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}
