//! One in-flight request/response cycle of the streaming protocol.
//!
//! The assembler consumes chunks strictly in arrival order (the transport
//! guarantees in-order delivery per exchange) and grows a single content
//! buffer until the terminal chunk arrives. The assembled buffer is the
//! value of record; [`normalize_for_display`] is a read-time view applied
//! when the content is shown, never when it is stored.

use serde::Deserialize;

use crate::error::SessionError;

/// Inbound chunk message. Zero or more per exchange, then exactly one
/// terminal chunk: a chunk is terminal iff `finish_reason` is non-null.
/// `tokens_consumed` is only meaningful on the terminal chunk.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseChunk {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub finish_reason: Option<String>,
    #[serde(default)]
    pub tokens_consumed: Option<u32>,
}

impl ResponseChunk {
    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }
}

/// Why an exchange ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    Error,
    Other(String),
}

impl FinishReason {
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "error" => FinishReason::Error,
            other => FinishReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::Error => "error",
            FinishReason::Other(reason) => reason,
        }
    }
}

impl std::fmt::Display for FinishReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of applying one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    Streaming,
    Terminal(FinishReason),
}

/// Accumulator for one exchange. At most one may be open per session;
/// request ids are monotonic and never reused.
#[derive(Debug, Clone)]
pub struct Exchange {
    request_id: u64,
    accumulated: String,
    finish_reason: Option<FinishReason>,
    tokens_consumed: Option<u32>,
}

impl Exchange {
    pub fn begin(request_id: u64) -> Self {
        Self {
            request_id,
            accumulated: String::new(),
            finish_reason: None,
            tokens_consumed: None,
        }
    }

    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    /// Content assembled so far, in arrival order.
    pub fn content(&self) -> &str {
        &self.accumulated
    }

    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    /// Token count reported by the terminal chunk, if one carried it.
    pub fn tokens_consumed(&self) -> Option<u32> {
        self.tokens_consumed
    }

    pub fn is_terminal(&self) -> bool {
        self.finish_reason.is_some()
    }

    /// Apply the next chunk. Content (if any) is appended before the
    /// terminal marker takes effect, so a terminal chunk may still carry
    /// a final fragment. Applying anything to an already-terminal
    /// exchange is a protocol violation and fails loudly.
    pub fn apply(&mut self, chunk: ResponseChunk) -> Result<Applied, SessionError> {
        if self.is_terminal() {
            return Err(SessionError::ChunkAfterTerminal {
                request_id: self.request_id,
            });
        }

        if let Some(content) = chunk.content {
            self.accumulated.push_str(&content);
        }

        match chunk.finish_reason {
            Some(reason) => {
                let reason = FinishReason::from_wire(&reason);
                self.finish_reason = Some(reason.clone());
                self.tokens_consumed = chunk.tokens_consumed;
                Ok(Applied::Terminal(reason))
            }
            None => Ok(Applied::Streaming),
        }
    }

    /// Force-terminate after a transport failure. No token count is
    /// recorded: unknown consumption is not asserted as zero.
    pub fn abort(&mut self) {
        self.finish_reason = Some(FinishReason::Error);
    }
}

/// Presentation transform applied when assembled content is displayed:
/// strip literal code-fence markers, strip one leading `html` token
/// (case-insensitive), and relabel `Source_page:` as `Source Page:`.
/// The stored turn content stays untransformed.
pub fn normalize_for_display(content: &str) -> String {
    let without_fences = content.replace("```", "");
    let trimmed = without_fences.trim_start();

    let without_html = match trimmed.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("html") => {
            let rest = &trimmed[4..];
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                rest.trim_start()
            } else {
                trimmed
            }
        }
        _ => trimmed,
    };

    without_html.replace("Source_page:", "Source Page:")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content_chunk(text: &str) -> ResponseChunk {
        ResponseChunk {
            content: Some(text.to_string()),
            ..ResponseChunk::default()
        }
    }

    fn terminal_chunk(reason: &str, tokens: u32) -> ResponseChunk {
        ResponseChunk {
            content: None,
            finish_reason: Some(reason.to_string()),
            tokens_consumed: Some(tokens),
        }
    }

    #[test]
    fn accumulates_content_in_arrival_order() {
        let mut exchange = Exchange::begin(1);
        for piece in ["The ", "fence is ", "42 meters long."] {
            let applied = exchange.apply(content_chunk(piece)).unwrap();
            assert_eq!(applied, Applied::Streaming);
        }

        assert_eq!(exchange.content(), "The fence is 42 meters long.");
        assert!(!exchange.is_terminal());
        assert_eq!(exchange.tokens_consumed(), None);
    }

    #[test]
    fn terminal_chunk_records_reason_and_tokens() {
        let mut exchange = Exchange::begin(7);
        exchange.apply(content_chunk("done")).unwrap();
        let applied = exchange.apply(terminal_chunk("stop", 321)).unwrap();

        assert_eq!(applied, Applied::Terminal(FinishReason::Stop));
        assert!(exchange.is_terminal());
        assert_eq!(exchange.tokens_consumed(), Some(321));
        assert_eq!(exchange.content(), "done");
    }

    #[test]
    fn terminal_chunk_may_carry_final_content() {
        let mut exchange = Exchange::begin(2);
        exchange.apply(content_chunk("almost")).unwrap();

        let mut last = terminal_chunk("length", 10);
        last.content = Some(" there".to_string());
        exchange.apply(last).unwrap();

        assert_eq!(exchange.content(), "almost there");
        assert_eq!(exchange.finish_reason(), Some(&FinishReason::Length));
    }

    #[test]
    fn chunk_after_terminal_is_rejected() {
        let mut exchange = Exchange::begin(3);
        exchange.apply(terminal_chunk("stop", 5)).unwrap();

        let err = exchange.apply(content_chunk("late")).unwrap_err();
        assert_eq!(err, SessionError::ChunkAfterTerminal { request_id: 3 });
        // The buffer is untouched by the rejected chunk.
        assert_eq!(exchange.content(), "");
    }

    #[test]
    fn duplicate_terminal_is_rejected() {
        let mut exchange = Exchange::begin(4);
        exchange.apply(terminal_chunk("stop", 5)).unwrap();

        let err = exchange.apply(terminal_chunk("stop", 5)).unwrap_err();
        assert_eq!(err, SessionError::ChunkAfterTerminal { request_id: 4 });
    }

    #[test]
    fn unknown_finish_reason_is_preserved() {
        let mut exchange = Exchange::begin(5);
        exchange.apply(terminal_chunk("content_filter", 1)).unwrap();
        assert_eq!(
            exchange.finish_reason(),
            Some(&FinishReason::Other("content_filter".to_string()))
        );
    }

    #[test]
    fn normalize_strips_fences_and_html_token() {
        let raw = "```html\n<p>The scale reads 4.2 kg</p>\n```";
        assert_eq!(
            normalize_for_display(raw),
            "<p>The scale reads 4.2 kg</p>\n"
        );
    }

    #[test]
    fn normalize_html_token_is_case_insensitive() {
        assert_eq!(normalize_for_display("HTML\nanswer"), "answer");
    }

    #[test]
    fn normalize_leaves_embedded_html_word_alone() {
        assert_eq!(
            normalize_for_display("htmlparser is a crate"),
            "htmlparser is a crate"
        );
    }

    #[test]
    fn normalize_relabels_source_page() {
        assert_eq!(
            normalize_for_display("See Source_page: 12 for details"),
            "See Source Page: 12 for details"
        );
    }

    #[test]
    fn normalize_passes_plain_content_through() {
        assert_eq!(normalize_for_display("plain answer"), "plain answer");
    }
}
