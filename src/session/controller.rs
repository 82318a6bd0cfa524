//! Async orchestration of a session against a chat transport.

use std::sync::Arc;

use futures_util::StreamExt;
use log::{debug, warn};

use crate::budget::TokenBudget;
use crate::error::{SendError, SessionError, TransportError};
use crate::exchange::{Applied, FinishReason};
use crate::ingest::DocumentHandle;
use crate::request;
use crate::session::{Session, SessionSummary, Turn};
use crate::settings::SettingsSource;
use crate::transport::DynChatTransport;

/// Live view of an exchange handed to the observer after every chunk.
#[derive(Debug, Clone, Copy)]
pub struct ExchangeUpdate<'a> {
    pub request_id: u64,
    /// The fragment this chunk contributed (may be empty on the terminal
    /// chunk).
    pub delta: &'a str,
    /// Everything assembled so far, in arrival order.
    pub content: &'a str,
}

/// Terminal result of one `send_message` call.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The finalized assistant turn (error-marked when the stream died).
    pub turn: Turn,
    pub budget: TokenBudget,
    pub finish: FinishReason,
}

/// Owns the session and coordinates request building, the streaming
/// exchange, and budget accounting. Everything a frontend binds to goes
/// through here; the frontend itself holds no session state.
pub struct SessionController {
    session: Session,
    transport: Arc<DynChatTransport>,
    settings: Arc<dyn SettingsSource>,
}

impl SessionController {
    pub fn new(transport: Arc<DynChatTransport>, settings: Arc<dyn SettingsSource>) -> Self {
        let model_id = settings.snapshot().model_id;
        Self {
            session: Session::new(&model_id),
            transport,
            settings,
        }
    }

    /// Read view of the owned session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Bind a new document; legal from any state.
    pub fn load_document(&mut self, handle: DocumentHandle) {
        let model_id = self.settings.snapshot().model_id;
        self.session.load_document(handle, &model_id);
    }

    /// Clear history and usage, keeping the document.
    pub fn reset_chat(&mut self) {
        self.session.reset();
    }

    /// Freeze the session and produce its closing summary.
    pub fn end_chat(&mut self) -> Result<SessionSummary, SessionError> {
        self.session.end()
    }

    /// Run one full exchange: build the request from the current history
    /// and settings snapshot, stream the response, and return the
    /// finalized turn together with the updated budget.
    ///
    /// The observer fires synchronously after every applied chunk, before
    /// the next chunk is awaited, so a frontend can render incrementally.
    /// A transport failure mid-stream is folded into an error-marked turn
    /// and returned as `Ok`; only a failure to open the stream (and caller
    /// misuse) is returned as `Err`, leaving the session untouched.
    pub async fn send_message<F>(&mut self, text: &str, mut observer: F) -> Result<SendOutcome, SendError>
    where
        F: FnMut(ExchangeUpdate<'_>),
    {
        let document = self.session.ensure_can_send()?.clone();

        let settings = self.settings.snapshot();
        self.session.rebind_model(&settings.model_id);

        let request = request::build(self.session.history(), &document, text, &settings);
        let mut stream = self.transport.open(&request).await?;
        let request_id = self.session.begin_exchange()?;
        debug!("exchange {request_id} opened against model {}", settings.model_id);

        let finish = loop {
            match stream.next().await {
                Some(Ok(chunk)) => {
                    let delta_len = chunk.content.as_deref().map_or(0, str::len);
                    let applied = self.session.apply_chunk(chunk)?;

                    if let Some(exchange) = self.session.exchange() {
                        let content = exchange.content();
                        observer(ExchangeUpdate {
                            request_id,
                            delta: &content[content.len() - delta_len..],
                            content,
                        });
                    }

                    if let Applied::Terminal(reason) = applied {
                        break reason;
                    }
                }
                Some(Err(err)) => {
                    warn!("exchange {request_id} failed mid-stream: {err}");
                    return self.recover_failed_exchange(text);
                }
                None => {
                    warn!("exchange {request_id}: {}", TransportError::ClosedEarly);
                    return self.recover_failed_exchange(text);
                }
            }
        };
        drop(stream);

        let (turn, budget) = self.session.finish_exchange(text)?;
        debug!(
            "exchange {request_id} finished ({finish}); {} of {} tokens used",
            budget.used(),
            budget.total()
        );

        Ok(SendOutcome {
            turn,
            budget,
            finish,
        })
    }

    fn recover_failed_exchange(&mut self, text: &str) -> Result<SendOutcome, SendError> {
        let turn = self.session.fail_exchange(text)?;
        Ok(SendOutcome {
            turn,
            budget: self.session.budget().clone(),
            finish: FinishReason::Error,
        })
    }
}
