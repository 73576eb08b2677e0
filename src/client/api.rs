//! Document Service Client
//!
//! The offline engine talks to the remote document service only through the
//! [`DocumentService`] trait so the coordinator, reconciler and library can be
//! driven by an in-memory service in tests. [`HttpDocumentService`] is the
//! production implementation on top of `reqwest`.
//!
//! Authentication is owned elsewhere: a [`TokenProvider`] hands out the current
//! bearer token and the client never refreshes it.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, IntoUrl, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::client::config::Config;
use crate::shared::{
    ContentBlock, DocumentSummary, OfflineError, OptimizedDocumentJob, ReadingPosition, Result,
    UploadRequest, UploadedDocument,
};

/// Remote operations the offline engine depends on
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Poll the optimized-document job
    async fn fetch_optimized_job(&self, document_id: &str) -> Result<OptimizedDocumentJob>;

    /// Raw content blocks for live reading
    async fn fetch_content_blocks(&self, document_id: &str) -> Result<Vec<ContentBlock>>;

    /// Full document listing
    async fn list_documents(&self) -> Result<Vec<DocumentSummary>>;

    /// Last position stored remotely, `None` if never set
    async fn get_reading_position(&self, document_id: &str) -> Result<Option<ReadingPosition>>;

    /// Store a reading position
    async fn put_reading_position(&self, position: &ReadingPosition) -> Result<()>;

    /// Upload a new document
    async fn upload_document(&self, request: UploadRequest) -> Result<UploadedDocument>;

    /// Set the favorite flag
    async fn set_favorite(&self, document_id: &str, is_favorite: bool) -> Result<()>;
}

/// Source of the current bearer token
pub trait TokenProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// Token held in memory, replaced on login and cleared on logout
#[derive(Debug, Default)]
pub struct StaticToken(RwLock<Option<String>>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(RwLock::new(token))
    }

    pub fn set(&self, token: Option<String>) {
        if let Ok(mut slot) = self.0.write() {
            *slot = token;
        }
    }
}

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.read().ok().and_then(|slot| slot.clone())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteRequest {
    is_favorite: bool,
}

/// `DocumentService` over HTTP
pub struct HttpDocumentService {
    config: Config,
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl HttpDocumentService {
    pub fn new(config: Config, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            config,
            client: Client::new(),
            tokens,
        }
    }

    /// Client whose token comes from `config`
    pub fn from_config(config: Config) -> Self {
        let tokens = Arc::new(StaticToken::new(config.get_token().cloned()));
        Self::new(config, tokens)
    }

    /// `/api/documents/{id}/{resource}` with the id percent-encoded as one
    /// path segment
    fn document_url(&self, document_id: &str, resource: &str) -> Result<Url> {
        let mut url = Url::parse(&self.config.api_url("/api/documents"))
            .map_err(|e| OfflineError::validation("server_url", e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| OfflineError::validation("server_url", "cannot be a base URL"))?
            .push(document_id)
            .push(resource);
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .bearer_token()
            .ok_or(OfflineError::Unauthenticated)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self
            .authorize(request)?
            .send()
            .await
            .map_err(|e| OfflineError::network(e.to_string()))?;
        check_status(response).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: impl IntoUrl) -> Result<T> {
        let response = self.send(self.client.get(url)).await?;
        parse_json(response).await
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(OfflineError::Unauthenticated);
    }
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| status.to_string());
    Err(OfflineError::remote(status.as_u16(), error_text))
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let bytes = response
        .bytes()
        .await
        .map_err(|e| OfflineError::network(e.to_string()))?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn fetch_optimized_job(&self, document_id: &str) -> Result<OptimizedDocumentJob> {
        self.get_json(self.document_url(document_id, "optimized")?)
            .await
    }

    async fn fetch_content_blocks(&self, document_id: &str) -> Result<Vec<ContentBlock>> {
        self.get_json(self.document_url(document_id, "content")?)
            .await
    }

    async fn list_documents(&self) -> Result<Vec<DocumentSummary>> {
        self.get_json(self.config.api_url("/api/documents")).await
    }

    async fn get_reading_position(&self, document_id: &str) -> Result<Option<ReadingPosition>> {
        let url = self.document_url(document_id, "position")?;
        match self.send(self.client.get(url)).await {
            Ok(response) => parse_json(response).await.map(Some),
            Err(OfflineError::Remote { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn put_reading_position(&self, position: &ReadingPosition) -> Result<()> {
        let url = self.document_url(&position.document_id, "position")?;
        self.send(self.client.put(url).json(position)).await?;
        Ok(())
    }

    async fn upload_document(&self, request: UploadRequest) -> Result<UploadedDocument> {
        let url = self.config.api_url("/api/documents/upload");
        let part = Part::bytes(request.bytes)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| OfflineError::validation("mime_type", e.to_string()))?;
        let form = Form::new()
            .text("fileName", request.file_name)
            .part("file", part);

        let response = self.send(self.client.post(&url).multipart(form)).await?;
        parse_json(response).await
    }

    async fn set_favorite(&self, document_id: &str, is_favorite: bool) -> Result<()> {
        let url = self.document_url(document_id, "favorite")?;
        self.send(self.client.put(url).json(&FavoriteRequest { is_favorite }))
            .await?;
        Ok(())
    }
}
