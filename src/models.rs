//! Core data types flowing through ingestion, retrieval, and playback.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a conversation turn. `Source` marks synthetic attribution
/// messages appended after grounded answers; they are never sent back to
/// the generation model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Source,
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A conversation and its namespace binding. All ingestion and retrieval
/// for a conversation go through the same namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: "New conversation".to_string(),
            messages: Vec::new(),
            system_prompt: None,
            namespace: namespace.into(),
            created_at: Utc::now(),
        }
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message::new(role, content));
    }
}

/// A bounded, overlapping slice of one source document's extracted text.
///
/// Chunks from one source, read in index order and de-overlapped,
/// reconstruct the extracted text exactly (see [`crate::chunk`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChunk {
    pub source_filename: String,
    pub text: String,
    pub chunk_index: usize,
}

/// An embedded chunk as stored in the vector index. Immutable once stored;
/// the `id` is deterministic so re-ingesting a source replaces its records
/// instead of duplicating them.
#[derive(Debug, Clone)]
pub struct EmbeddingRecord {
    pub id: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub source_filename: String,
    pub chunk_index: usize,
    pub namespace: String,
}

/// A similarity search hit: the matched chunk and its cosine score.
#[derive(Debug, Clone)]
pub struct ScoredMatch {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Per-request tuning knobs. Each field must fall inside the configured
/// bounds ([`crate::config::LimitsConfig`]) before any pipeline work runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub chunk_size: usize,
    pub max_token_length: u32,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            max_token_length: 1000,
            temperature: 1.0,
            top_p: 1.0,
        }
    }
}

impl Settings {
    /// The sampling slice of the settings, handed to the generation model.
    pub fn sampling(&self) -> SamplingParams {
        SamplingParams {
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_token_length,
        }
    }
}

/// Sampling parameters for one generation-model call.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
}

/// Per-request API credential for model and embedding collaborators.
///
/// Threaded explicitly through every pipeline call; there is no ambient
/// "current key". `None` lets a collaborator fall back to its configured
/// default (typically an environment variable).
#[derive(Debug, Clone, Default)]
pub struct Credential(Option<String>);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    /// Build from an optional request field, treating blank values as absent.
    pub fn from_request(token: Option<String>) -> Self {
        Self(token.filter(|t| !t.trim().is_empty()))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Source).unwrap(), "\"source\"");
        let role: Role = serde_json::from_str("\"assistant\"").unwrap();
        assert_eq!(role, Role::Assistant);
    }

    #[test]
    fn conversation_roundtrips_through_json() {
        let mut conv = Conversation::new("ns-1");
        conv.push(Role::User, "hello");
        conv.push(Role::Assistant, "hi there");
        let json = serde_json::to_string(&conv).unwrap();
        let back: Conversation = serde_json::from_str(&json).unwrap();
        assert_eq!(back.messages, conv.messages);
        assert_eq!(back.namespace, "ns-1");
    }

    #[test]
    fn blank_credential_is_absent() {
        assert!(Credential::from_request(Some("  ".to_string()))
            .token()
            .is_none());
        assert_eq!(
            Credential::from_request(Some("sk-abc".to_string())).token(),
            Some("sk-abc")
        );
    }
}
