//! Transport seam between the session controller and the chat backend.

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use crate::error::TransportError;
use crate::exchange::ResponseChunk;
use crate::request::ChatRequest;

/// In-order stream of chunks for one exchange. The stream ending without
/// a terminal chunk is a transport failure, not a normal completion.
pub type ChunkStream = BoxStream<'static, Result<ResponseChunk, TransportError>>;

/// Duplex exchange transport: one outbound request, then a stream of
/// inbound chunks. Implementations own reconnection policy decisions;
/// the controller never retries on its own.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, request: &ChatRequest) -> Result<ChunkStream, TransportError>;
}

pub type DynChatTransport = dyn ChatTransport;
