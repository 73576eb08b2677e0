//! In-memory document service for integration tests
//!
//! Job responses are scripted per document. Each poll takes the next scripted
//! step; the last step repeats forever. A step may be gated so a test can hold
//! a poll in flight and release it later.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use offline_reader::client::DocumentService;
use offline_reader::shared::{
    ContentBlock, DocumentSummary, OfflineError, OptimizedDocumentJob, ProcessingStatus,
    ReadingPosition, Result, UploadRequest, UploadedDocument,
};

/// One scripted answer to a job poll
#[derive(Clone)]
pub enum JobStep {
    Respond(Result<OptimizedDocumentJob>),
    /// Wait for the gate before answering
    Gated(Arc<Notify>, Result<OptimizedDocumentJob>),
}

#[derive(Default)]
pub struct MockDocumentService {
    jobs: Mutex<HashMap<String, VecDeque<JobStep>>>,
    blocks: Mutex<HashMap<String, Vec<ContentBlock>>>,
    listing: Mutex<Vec<DocumentSummary>>,
    remote_positions: Mutex<HashMap<String, ReadingPosition>>,
    uploads: Mutex<Vec<UploadRequest>>,
    /// Uploads fail once this many have succeeded
    upload_limit: Mutex<Option<usize>>,
    fail_positions: AtomicBool,
    polls: AtomicUsize,
    answered: AtomicUsize,
}

impl MockDocumentService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script_jobs(&self, document_id: &str, steps: Vec<JobStep>) {
        self.jobs
            .lock()
            .unwrap()
            .insert(document_id.to_string(), steps.into());
    }

    pub fn set_blocks(&self, document_id: &str, blocks: Vec<ContentBlock>) {
        self.blocks
            .lock()
            .unwrap()
            .insert(document_id.to_string(), blocks);
    }

    pub fn set_listing(&self, documents: Vec<DocumentSummary>) {
        *self.listing.lock().unwrap() = documents;
    }

    pub fn set_remote_position(&self, position: ReadingPosition) {
        self.remote_positions
            .lock()
            .unwrap()
            .insert(position.document_id.clone(), position);
    }

    pub fn fail_uploads_after(&self, successes: usize) {
        *self.upload_limit.lock().unwrap() = Some(successes);
    }

    pub fn fail_positions(&self, fail: bool) {
        self.fail_positions.store(fail, Ordering::SeqCst);
    }

    /// Job polls received so far
    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Job polls answered so far
    pub fn answered(&self) -> usize {
        self.answered.load(Ordering::SeqCst)
    }

    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.file_name.clone())
            .collect()
    }

    pub fn remote_position(&self, document_id: &str) -> Option<ReadingPosition> {
        self.remote_positions.lock().unwrap().get(document_id).cloned()
    }

    fn next_step(&self, document_id: &str) -> JobStep {
        let mut jobs = self.jobs.lock().unwrap();
        match jobs.get_mut(document_id) {
            Some(steps) if steps.len() > 1 => steps.pop_front().unwrap(),
            Some(steps) if !steps.is_empty() => steps[0].clone(),
            _ => JobStep::Respond(Err(OfflineError::remote(404, "no such job"))),
        }
    }
}

#[async_trait]
impl DocumentService for MockDocumentService {
    async fn fetch_optimized_job(&self, document_id: &str) -> Result<OptimizedDocumentJob> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let response = match self.next_step(document_id) {
            JobStep::Respond(response) => response,
            JobStep::Gated(gate, response) => {
                gate.notified().await;
                response
            }
        };
        self.answered.fetch_add(1, Ordering::SeqCst);
        response
    }

    async fn fetch_content_blocks(&self, document_id: &str) -> Result<Vec<ContentBlock>> {
        self.blocks
            .lock()
            .unwrap()
            .get(document_id)
            .cloned()
            .ok_or_else(|| OfflineError::remote(404, "no such document"))
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        Ok(self.listing.lock().unwrap().clone())
    }

    async fn get_reading_position(&self, document_id: &str) -> Result<Option<ReadingPosition>> {
        Ok(self.remote_position(document_id))
    }

    async fn put_reading_position(&self, position: &ReadingPosition) -> Result<()> {
        if self.fail_positions.load(Ordering::SeqCst) {
            return Err(OfflineError::network("connection reset"));
        }
        self.set_remote_position(position.clone());
        Ok(())
    }

    async fn upload_document(&self, request: UploadRequest) -> Result<UploadedDocument> {
        let mut uploads = self.uploads.lock().unwrap();
        if let Some(limit) = *self.upload_limit.lock().unwrap() {
            if uploads.len() >= limit {
                return Err(OfflineError::remote(503, "upload service unavailable"));
            }
        }
        let uploaded = UploadedDocument {
            id: format!("remote-{}", uploads.len() + 1),
            title: request.file_name.clone(),
            processing_status: ProcessingStatus::Processing,
        };
        uploads.push(request);
        Ok(uploaded)
    }

    async fn set_favorite(&self, document_id: &str, is_favorite: bool) -> Result<()> {
        let mut listing = self.listing.lock().unwrap();
        match listing.iter_mut().find(|d| d.id == document_id) {
            Some(document) => {
                document.is_favorite = is_favorite;
                Ok(())
            }
            None => Err(OfflineError::remote(404, "no such document")),
        }
    }
}
