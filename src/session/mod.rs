//! Session state and lifecycle.
//!
//! `Session` is a single owned value with explicit transition methods;
//! every lifecycle invariant lives here rather than being scattered over
//! frontend event handlers. The async orchestration around it (transport,
//! settings, chunk loop) is in [`controller`].

mod controller;


pub use controller::{ExchangeUpdate, SendOutcome, SessionController};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::budget::TokenBudget;
use crate::error::SessionError;
use crate::exchange::{Applied, Exchange, FinishReason, ResponseChunk, normalize_for_display};
use crate::ingest::DocumentHandle;

/// Lifecycle states of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionState {
    NoDocument,
    Ready,
    Active,
    Ended,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::NoDocument => "no-document",
            SessionState::Ready => "ready",
            SessionState::Active => "active",
            SessionState::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One finalized message in the conversation history. Immutable once
/// appended; `content` holds the raw assembled value, and the display
/// transform is applied at read time only.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    pub sent_at: DateTime<Utc>,
    /// Set when the exchange behind an assistant turn failed; the turn is
    /// rendered as a failure, not as a normal answer.
    pub failed: bool,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            sent_at: Utc::now(),
            failed: false,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            sent_at: Utc::now(),
            failed: false,
        }
    }

    pub fn failed_assistant(content: impl Into<String>) -> Self {
        Self {
            failed: true,
            ..Self::assistant(content)
        }
    }

    /// Content as shown to the user. Assistant turns pass through the
    /// display normalization; failed turns are marked so they cannot be
    /// mistaken for a normal answer.
    pub fn display_content(&self) -> String {
        match (self.role, self.failed) {
            (Role::User, _) => self.content.clone(),
            (Role::Assistant, false) => normalize_for_display(&self.content),
            (Role::Assistant, true) => {
                let partial = normalize_for_display(&self.content);
                if partial.is_empty() {
                    "[response interrupted]".to_string()
                } else {
                    format!("[response interrupted] {partial}")
                }
            }
        }
    }
}

/// Closing report produced by `end`.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: DateTime<Utc>,
    pub duration_secs: i64,
    pub user_turns: usize,
    pub assistant_turns: usize,
    pub tokens_used: u32,
}

/// The aggregate root: document binding, history, budget, and at most one
/// open exchange. All mutation goes through the methods below; external
/// consumers only ever get `&`-views.
#[derive(Debug)]
pub struct Session {
    state: SessionState,
    document: Option<DocumentHandle>,
    history: Vec<Turn>,
    budget: TokenBudget,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    // Monotonic across the whole session, surviving resets, so request
    // ids in logs are never ambiguous.
    next_request_id: u64,
    exchange: Option<Exchange>,
}

impl Session {
    pub fn new(model_id: &str) -> Self {
        Self {
            state: SessionState::NoDocument,
            document: None,
            history: Vec::new(),
            budget: TokenBudget::for_model(model_id),
            started_at: None,
            ended_at: None,
            next_request_id: 1,
            exchange: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn document(&self) -> Option<&DocumentHandle> {
        self.document.as_ref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// The in-flight exchange, if one is open.
    pub fn exchange(&self) -> Option<&Exchange> {
        self.exchange.as_ref()
    }

    /// Bind a freshly ingested document. Legal from any state: history is
    /// discarded, the budget is fully rebound, and the session is ready
    /// for its first message against the new document.
    pub fn load_document(&mut self, handle: DocumentHandle, model_id: &str) {
        self.document = Some(handle);
        self.history.clear();
        self.budget = TokenBudget::for_model(model_id);
        self.started_at = None;
        self.ended_at = None;
        self.exchange = None;
        self.state = SessionState::Ready;
    }

    /// Guard for `send_message`: checks the lifecycle state and that no
    /// exchange is open, and hands back the bound document.
    pub fn ensure_can_send(&self) -> Result<&DocumentHandle, SessionError> {
        match self.state {
            SessionState::Ended => return Err(SessionError::SessionEnded),
            SessionState::NoDocument => {
                return Err(SessionError::InvalidTransition {
                    operation: "send a message",
                    state: self.state,
                });
            }
            SessionState::Ready | SessionState::Active => {}
        }

        if self.exchange.is_some() {
            return Err(SessionError::ConcurrentExchange);
        }

        self.document.as_ref().ok_or(SessionError::InvalidTransition {
            operation: "send a message",
            state: self.state,
        })
    }

    /// Rebind the budget when the configured model changed since the last
    /// message. Tokens already consumed stay consumed.
    pub fn rebind_model(&mut self, model_id: &str) {
        if self.budget.model_id() != model_id {
            self.budget = self.budget.rebind(model_id);
        }
    }

    /// Open the one allowed exchange and hand out its request id. The
    /// first message of a session moves it to `Active`.
    pub fn begin_exchange(&mut self) -> Result<u64, SessionError> {
        self.ensure_can_send()?;

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.exchange = Some(Exchange::begin(request_id));

        if self.state == SessionState::Ready {
            self.state = SessionState::Active;
            self.started_at = Some(Utc::now());
        }

        Ok(request_id)
    }

    /// Feed the next inbound chunk to the open exchange.
    pub fn apply_chunk(&mut self, chunk: ResponseChunk) -> Result<Applied, SessionError> {
        match self.exchange.as_mut() {
            Some(exchange) => exchange.apply(chunk),
            None => Err(SessionError::InvalidTransition {
                operation: "apply a chunk",
                state: self.state,
            }),
        }
    }

    /// Close the open exchange after its terminal chunk arrived: the user
    /// and assistant turns become durable history and the reported token
    /// consumption is charged against the budget.
    pub fn finish_exchange(&mut self, user_text: &str) -> Result<(Turn, TokenBudget), SessionError> {
        let exchange = match self.exchange.take() {
            Some(exchange) if exchange.is_terminal() => exchange,
            Some(exchange) => {
                self.exchange = Some(exchange);
                return Err(SessionError::InvalidTransition {
                    operation: "finish a streaming exchange",
                    state: self.state,
                });
            }
            None => {
                return Err(SessionError::InvalidTransition {
                    operation: "finish an exchange",
                    state: self.state,
                });
            }
        };

        self.history.push(Turn::user(user_text));

        let failed = matches!(exchange.finish_reason(), Some(FinishReason::Error));
        let turn = if failed {
            Turn::failed_assistant(exchange.content())
        } else {
            Turn::assistant(exchange.content())
        };
        self.history.push(turn.clone());

        if let Some(tokens) = exchange.tokens_consumed() {
            self.budget = self.budget.apply(tokens);
        }

        Ok((turn, self.budget.clone()))
    }

    /// Close the open exchange after the transport dropped without a
    /// terminal chunk. The partial content becomes an error-marked turn;
    /// no token delta is charged, because unknown consumption is neither
    /// asserted as zero nor guessed.
    pub fn fail_exchange(&mut self, user_text: &str) -> Result<Turn, SessionError> {
        let mut exchange = self.exchange.take().ok_or(SessionError::InvalidTransition {
            operation: "fail an exchange",
            state: self.state,
        })?;
        exchange.abort();

        self.history.push(Turn::user(user_text));
        let turn = Turn::failed_assistant(exchange.content());
        self.history.push(turn.clone());

        Ok(turn)
    }

    /// Return to `Ready` with the same document: history cleared, usage
    /// zeroed. A no-op when there is nothing to clear.
    pub fn reset(&mut self) {
        match self.state {
            SessionState::NoDocument | SessionState::Ready => {}
            SessionState::Active | SessionState::Ended => {
                self.history.clear();
                self.budget = self.budget.reset();
                self.started_at = None;
                self.ended_at = None;
                self.exchange = None;
                self.state = SessionState::Ready;
            }
        }
    }

    /// Freeze an active session and report on it.
    pub fn end(&mut self) -> Result<SessionSummary, SessionError> {
        if self.state != SessionState::Active {
            return Err(SessionError::InvalidTransition {
                operation: "end the chat",
                state: self.state,
            });
        }

        let ended_at = Utc::now();
        self.ended_at = Some(ended_at);
        self.exchange = None;
        self.state = SessionState::Ended;

        let duration_secs = self
            .started_at
            .map(|started| (ended_at - started).num_seconds())
            .unwrap_or(0);

        Ok(SessionSummary {
            started_at: self.started_at,
            ended_at,
            duration_secs,
            user_turns: self.count_turns(Role::User),
            assistant_turns: self.count_turns(Role::Assistant),
            tokens_used: self.budget.used(),
        })
    }

    fn count_turns(&self, role: Role) -> usize {
        self.history.iter().filter(|turn| turn.role == role).count()
    }
}
