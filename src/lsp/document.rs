//! Document management for the LSP server

use crate::booster::{Position as BoostPosition, TextRange};
use dashmap::DashMap;
use tower_lsp::lsp_types::*;

/// Manages open documents
pub struct DocumentStore {
    documents: DashMap<Url, Document>,
}

/// A tracked document
#[derive(Debug, Clone)]
pub struct Document {
    pub uri: Url,
    pub language_id: String,
    pub version: i32,
    pub content: String,
}

impl Document {
    pub fn new(uri: Url, content: impl Into<String>) -> Self {
        Self {
            uri,
            language_id: "markdown".to_string(),
            version: 0,
            content: content.into(),
        }
    }

    /// Get content in a range
    ///
    /// Characters are UTF-16 code units. An end past the last line clamps to
    /// the end of the document.
    pub fn get_range(&self, range: &Range) -> Option<String> {
        from_lsp_range(*range)
            .slice(&self.content)
            .map(str::to_string)
    }

    /// Range spanning the whole document
    pub fn full_range(&self) -> Range {
        to_lsp_range(TextRange::whole(&self.content))
    }
}

pub fn to_lsp_range(range: TextRange) -> Range {
    Range {
        start: Position::new(range.start.line, range.start.character),
        end: Position::new(range.end.line, range.end.character),
    }
}

pub fn from_lsp_range(range: Range) -> TextRange {
    TextRange::new(
        BoostPosition::new(range.start.line, range.start.character),
        BoostPosition::new(range.end.line, range.end.character),
    )
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    pub fn open(&self, params: DidOpenTextDocumentParams) {
        let doc = Document {
            uri: params.text_document.uri.clone(),
            language_id: params.text_document.language_id,
            version: params.text_document.version,
            content: params.text_document.text,
        };
        self.documents.insert(params.text_document.uri, doc);
    }

    pub fn change(&self, params: DidChangeTextDocumentParams) {
        if let Some(mut doc) = self.documents.get_mut(&params.text_document.uri) {
            doc.version = params.text_document.version;
            // Full sync: the last change carries the whole text
            if let Some(change) = params.content_changes.into_iter().last() {
                doc.content = change.text;
            }
        }
    }

    pub fn close(&self, params: DidCloseTextDocumentParams) {
        self.documents.remove(&params.text_document.uri);
    }

    pub fn get(&self, uri: &Url) -> Option<Document> {
        self.documents.get(uri).map(|d| d.clone())
    }

    /// Tracked document, or the file on disk when the client has not opened it
    pub async fn get_or_load(&self, uri: &Url) -> Option<Document> {
        if let Some(doc) = self.get(uri) {
            return Some(doc);
        }
        let path = uri.to_file_path().ok()?;
        let content = tokio::fs::read_to_string(&path).await.ok()?;
        Some(Document::new(uri.clone(), content))
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}
