//! Outbound request construction.

use serde::Serialize;

use crate::ingest::DocumentHandle;
use crate::session::{Role, Turn};
use crate::settings::ChatSettings;

/// The single outbound message sent when an exchange opens.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub chat_history: Vec<HistoryEntry>,
    pub document_handle: DocumentHandle,
    pub model_id: String,
    pub temperature: f32,
    pub reasoning_effort: String,
    pub token_limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl From<&Turn> for HistoryEntry {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role,
            content: turn.content.clone(),
        }
    }
}

/// Build the request for one exchange. The user utterance is appended to
/// a copy of the history: the session's own history is only extended once
/// the exchange completes, so a failed open leaves no trace.
pub fn build(
    history: &[Turn],
    document: &DocumentHandle,
    utterance: &str,
    settings: &ChatSettings,
) -> ChatRequest {
    let mut chat_history: Vec<HistoryEntry> = history.iter().map(HistoryEntry::from).collect();
    chat_history.push(HistoryEntry {
        role: Role::User,
        content: utterance.to_string(),
    });

    ChatRequest {
        chat_history,
        document_handle: document.clone(),
        model_id: settings.model_id.clone(),
        temperature: settings.temperature,
        reasoning_effort: settings.reasoning_effort.clone(),
        token_limit: settings.token_limit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_settings() -> ChatSettings {
        ChatSettings {
            model_id: "gpt4omini".to_string(),
            temperature: 0.5,
            reasoning_effort: "medium".to_string(),
            token_limit: 2048,
        }
    }

    #[test]
    fn empty_history_yields_single_entry() {
        let document = DocumentHandle::new("doc-1");
        let request = build(&[], &document, "What is on page 3?", &sample_settings());

        assert_eq!(request.chat_history.len(), 1);
        assert_eq!(request.chat_history[0].role, Role::User);
        assert_eq!(request.chat_history[0].content, "What is on page 3?");
    }

    #[test]
    fn prior_turns_precede_the_new_utterance() {
        let history = vec![
            Turn::user("First question"),
            Turn::assistant("First answer"),
        ];
        let document = DocumentHandle::new("doc-1");
        let request = build(&history, &document, "Follow-up", &sample_settings());

        assert_eq!(request.chat_history.len(), 3);
        assert_eq!(request.chat_history[0].content, "First question");
        assert_eq!(request.chat_history[1].role, Role::Assistant);
        assert_eq!(request.chat_history[2].content, "Follow-up");
        // The caller's history is untouched.
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn serializes_to_the_wire_shape() {
        let document = DocumentHandle::new("doc-9");
        let request = build(&[], &document, "hi", &sample_settings());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "chatHistory": [{"role": "user", "content": "hi"}],
                "documentHandle": "doc-9",
                "modelId": "gpt4omini",
                "temperature": 0.5,
                "reasoningEffort": "medium",
                "tokenLimit": 2048
            })
        );
    }
}
