use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use async_stream::try_stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::config::BackendSettings;
use crate::error::TransportError;
use crate::exchange::ResponseChunk;
use crate::ingest::{DocumentHandle, DocumentIngestor, IngestError};
use crate::request::ChatRequest;
use crate::transport::{ChatTransport, ChunkStream};

/// HTTP client for the document chat backend. One instance serves both
/// the streaming chat endpoint and the document ingestion endpoint.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: String,
    api_key: String,
    user_agent: String,
}

impl BackendClient {
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        Self::with_base_url(settings, settings.base_url.clone())
    }

    pub fn with_base_url(settings: &BackendSettings, base_url: impl Into<String>) -> Result<Self> {
        // Connect timeout only: a whole-request timeout would cap how long
        // a response stream is allowed to run.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            user_agent: settings.user_agent.clone(),
        })
    }

    fn reject(status: StatusCode, error_text: String) -> TransportError {
        let message = match status {
            StatusCode::TOO_MANY_REQUESTS => {
                "Too many requests. Please wait before trying again.".to_string()
            }
            StatusCode::UNAUTHORIZED => {
                "Invalid API key. Please check your API key configuration.".to_string()
            }
            StatusCode::BAD_REQUEST => format!("Invalid request: {error_text}"),
            StatusCode::INTERNAL_SERVER_ERROR | StatusCode::SERVICE_UNAVAILABLE => {
                "Chat backend is temporarily unavailable. Please try again later.".to_string()
            }
            _ => error_text,
        };

        TransportError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl ChatTransport for BackendClient {
    async fn open(&self, request: &ChatRequest) -> Result<ChunkStream, TransportError> {
        let url = format!("{}/chat/stream", self.base_url);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", &self.user_agent)
            .json(request)
            .send()
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Self::reject(status, error_text));
        }

        Ok(chunk_stream(response))
    }
}

/// Decode the response body as newline-delimited JSON chunk messages.
fn chunk_stream(response: Response) -> ChunkStream {
    Box::pin(try_stream! {
        let mut body = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();

        while let Some(piece) = body.next().await {
            let piece = piece.map_err(|err| TransportError::Read(err.to_string()))?;
            buffer.extend_from_slice(&piece);

            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                if let Some(chunk) = decode_line(&line)? {
                    yield chunk;
                }
            }
        }

        // A final line is valid without a trailing newline.
        if let Some(chunk) = decode_line(&buffer)? {
            yield chunk;
        }
    })
}

fn decode_line(line: &[u8]) -> Result<Option<ResponseChunk>, TransportError> {
    let text = std::str::from_utf8(line)
        .map_err(|err| TransportError::Malformed(err.to_string()))?
        .trim();

    if text.is_empty() {
        return Ok(None);
    }

    serde_json::from_str(text)
        .map(Some)
        .map_err(|err| TransportError::Malformed(format!("{err}: {text}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IngestResponse {
    document_handle: String,
}

#[async_trait]
impl DocumentIngestor for BackendClient {
    async fn ingest(&self, files: &[&Path]) -> Result<DocumentHandle, IngestError> {
        let url = format!("{}/documents", self.base_url);

        let mut form = Form::new();
        for path in files {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| IngestError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or("document")
                .to_string();
            form = form.part("files", Part::bytes(bytes).file_name(name));
        }

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("User-Agent", &self.user_agent)
            .multipart(form)
            .send()
            .await
            .map_err(|err| IngestError::Unavailable(err.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            let message = response.text().await.unwrap_or_default();
            return Err(IngestError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: IngestResponse = response
            .json()
            .await
            .map_err(|err| IngestError::Unavailable(format!("invalid ingest response: {err}")))?;

        Ok(DocumentHandle::new(parsed.document_handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    use crate::request;
    use crate::settings::ChatSettings;

    fn sample_settings() -> BackendSettings {
        BackendSettings {
            base_url: "http://unused.invalid".to_string(),
            api_key: "test-key".to_string(),
            timeout_secs: 30,
            user_agent: "docchat/test".to_string(),
        }
    }

    fn sample_request() -> ChatRequest {
        request::build(
            &[],
            &DocumentHandle::new("doc-1"),
            "How long is the fence?",
            &ChatSettings {
                model_id: "gpt4omini".to_string(),
                temperature: 0.5,
                reasoning_effort: "medium".to_string(),
                token_limit: 2048,
            },
        )
    }

    #[tokio::test]
    async fn open_decodes_newline_delimited_chunks() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/stream")
                    .header("Authorization", "Bearer test-key")
                    .json_body(json!({
                        "chatHistory": [
                            {"role": "user", "content": "How long is the fence?"}
                        ],
                        "documentHandle": "doc-1",
                        "modelId": "gpt4omini",
                        "temperature": 0.5,
                        "reasoningEffort": "medium",
                        "tokenLimit": 2048
                    }));

                then.status(200).body(concat!(
                    "{\"content\":\"The fence \"}\n",
                    "{\"content\":\"is 42 meters.\"}\n",
                    "\n",
                    "{\"finishReason\":\"stop\",\"tokensConsumed\":57}\n",
                ));
            })
            .await;

        let client = BackendClient::with_base_url(&sample_settings(), server.base_url()).unwrap();
        let mut stream = client.open(&sample_request()).await.unwrap();

        let mut chunks = Vec::new();
        while let Some(item) = stream.next().await {
            chunks.push(item.unwrap());
        }

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content.as_deref(), Some("The fence "));
        assert_eq!(chunks[1].content.as_deref(), Some("is 42 meters."));
        assert!(chunks[2].is_terminal());
        assert_eq!(chunks[2].finish_reason.as_deref(), Some("stop"));
        assert_eq!(chunks[2].tokens_consumed, Some(57));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn open_maps_unauthorized_to_rejected() {
        let server = MockServer::start_async().await;

        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/stream");
                then.status(401).body(r#"{"error":"invalid_api_key"}"#);
            })
            .await;

        let client = BackendClient::with_base_url(&sample_settings(), server.base_url()).unwrap();
        let err = client.open(&sample_request()).await.err().unwrap();

        match err {
            TransportError::Rejected { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("Invalid API key"));
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_chunk_surfaces_as_stream_error() {
        let server = MockServer::start_async().await;

        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/stream");
                then.status(200)
                    .body("{\"content\":\"ok\"}\nnot json at all\n");
            })
            .await;

        let client = BackendClient::with_base_url(&sample_settings(), server.base_url()).unwrap();
        let mut stream = client.open(&sample_request()).await.unwrap();

        assert!(stream.next().await.unwrap().is_ok());
        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, TransportError::Malformed(_)));
    }

    #[tokio::test]
    async fn ingest_uploads_and_returns_handle() {
        let server = MockServer::start_async().await;

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/documents")
                    .header("Authorization", "Bearer test-key");
                then.status(200).json_body(json!({"documentHandle": "doc-77"}));
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.pdf");
        std::fs::write(&file, b"%PDF-1.4 test").unwrap();

        let client = BackendClient::with_base_url(&sample_settings(), server.base_url()).unwrap();
        let handle = client.ingest(&[file.as_path()]).await.unwrap();

        assert_eq!(handle, DocumentHandle::new("doc-77"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn ingest_maps_rejection_status() {
        let server = MockServer::start_async().await;

        let _mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/documents");
                then.status(422).body("unsupported file type");
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("notes.txt");
        std::fs::write(&file, b"plain text").unwrap();

        let client = BackendClient::with_base_url(&sample_settings(), server.base_url()).unwrap();
        let err = client.ingest(&[file.as_path()]).await.unwrap_err();

        match err {
            IngestError::Rejected { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "unsupported file type");
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }
}
