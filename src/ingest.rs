//! Document ingestion collaborator interface.
//!
//! Ingestion itself (text extraction, chunking, vectorization) happens in
//! an upstream service; this core only receives an opaque handle back and
//! threads it through every chat request.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque reference to previously ingested document content. Produced by
/// the ingestion collaborator and treated as immutable input here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentHandle(String);

impl DocumentHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read document {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("ingestion service rejected the upload (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to reach the ingestion service: {0}")]
    Unavailable(String),
}

/// Uploads files and returns the handle the chat backend retrieves
/// against.
#[async_trait]
pub trait DocumentIngestor: Send + Sync {
    async fn ingest(&self, files: &[&Path]) -> Result<DocumentHandle, IngestError>;
}
