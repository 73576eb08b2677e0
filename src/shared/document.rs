//! Document Data Structures
//!
//! Types exchanged with the remote document service and persisted by the
//! offline stores. Field names on the wire and on disk are camelCase, with
//! `documentID` spelled out explicitly.

use serde::{Deserialize, Serialize};

/// A single block of remote content
///
/// `page_number` is 1-based; `0` or negative means the backend did not assign
/// a page. `position` orders blocks within one page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ContentBlock {
    /// Block type, e.g. `"heading"` or `"paragraph"`
    #[serde(rename = "type")]
    pub kind: String,
    /// Raw block text
    pub text: String,
    /// 1-based page number, `<= 0` when unknown
    pub page_number: i32,
    /// Order within the page
    pub position: i32,
}

impl ContentBlock {
    /// Create a new content block
    pub fn new(
        kind: impl Into<String>,
        text: impl Into<String>,
        page_number: i32,
        position: i32,
    ) -> Self {
        Self {
            kind: kind.into(),
            text: text.into(),
            page_number,
            position,
        }
    }

    /// Whether this block is a heading
    pub fn is_heading(&self) -> bool {
        self.kind.eq_ignore_ascii_case("heading")
    }

    /// Text as it appears on a rendered page
    pub fn rendered_text(&self) -> String {
        if self.is_heading() {
            self.text.to_uppercase()
        } else {
            self.text.clone()
        }
    }
}

/// Server-side processing state of an optimized document
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Pages are still being computed
    Processing,
    /// All pages are available
    Ready,
    /// Processing stopped with an error
    Failed,
}

/// Polled view of the server's optimized-document job
///
/// Never persisted as-is; translated into a cache manifest and page payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizedDocumentJob {
    /// Document the job belongs to
    #[serde(rename = "documentID")]
    pub document_id: String,
    /// Current job state
    pub processing_status: ProcessingStatus,
    /// Version of the optimized representation
    pub optimized_version: u32,
    /// Checksum of the complete page payload
    #[serde(default)]
    pub checksum: Option<String>,
    /// Size of the complete document in bytes
    #[serde(default)]
    pub size_bytes: Option<i64>,
    /// Expected number of pages once processing finishes
    #[serde(default)]
    pub total_pages: Option<u32>,
    /// Pages computed so far
    #[serde(default)]
    pub pages: Option<Vec<String>>,
    /// Server-provided failure reason
    #[serde(default)]
    pub error_message: Option<String>,
}

impl OptimizedDocumentJob {
    /// Pages delivered so far, empty when none
    pub fn ready_pages(&self) -> &[String] {
        self.pages.as_deref().unwrap_or(&[])
    }

    /// Whether the job delivered at least one page
    pub fn has_pages(&self) -> bool {
        !self.ready_pages().is_empty()
    }
}

/// Reading position as stored by the remote service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingPosition {
    /// Document being read
    #[serde(rename = "documentID")]
    pub document_id: String,
    /// 1-based page number
    pub page_number: i32,
    /// Fraction of the document read, `0.0..=1.0`
    pub progress: f64,
}

/// File queued for upload
#[derive(Debug, Clone)]
pub struct UploadRequest {
    /// File contents
    pub bytes: Vec<u8>,
    /// Original file name
    pub file_name: String,
    /// MIME type derived from the file name
    pub mime_type: String,
}

/// Metadata returned after a successful upload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    /// Identifier assigned by the service
    pub id: String,
    /// Display title
    pub title: String,
    /// Processing state of the new document
    pub processing_status: ProcessingStatus,
}

/// Denormalized listing row kept in `documents_index.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    /// Document identifier
    pub id: String,
    /// Display title
    pub title: String,
    /// Author, when known
    #[serde(default)]
    pub author: Option<String>,
    /// Pages in the original document
    #[serde(default)]
    pub page_count: Option<u32>,
    /// Pages in the optimized representation
    #[serde(default)]
    pub optimized_page_count: Option<u32>,
    /// User favorite flag
    #[serde(default)]
    pub is_favorite: bool,
    /// Server-side processing state
    pub processing_status: ProcessingStatus,
}

/// Infer a MIME type from a file name extension
pub fn mime_type_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "epub" => "application/epub+zip",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        _ => "application/octet-stream",
    }
}
