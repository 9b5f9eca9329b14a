//! Answer generation.
//!
//! One [`AnswerGenerator`] contract, two implementations selected by the
//! retrieval route:
//!
//! - [`DocumentQaGenerator`] answers strictly from retrieved chunks and
//!   returns them for attribution; conversation history is never
//!   consulted.
//! - [`ConversationalGenerator`] answers from a [`BufferMemory`] seeded
//!   with the windowed history plus a system instruction; no document
//!   context is attached.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::llm::GenerationModel;
use crate::models::{Credential, DocumentChunk, Message, Role, SamplingParams};

/// System instruction used when the request does not supply one.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. \
Answer the user's questions conversationally and truthfully. If you do not \
know the answer, say so instead of guessing.";

const QA_TEMPLATE: &str = "Use the following pieces of context to answer \
the question at the end. If you don't know the answer, just say that you \
don't know, don't try to make up an answer.\n\n{context}\n\nQuestion: \
{question}\nHelpful Answer:";

const CONVERSATION_TEMPLATE: &str =
    "{system}\n\nCurrent conversation:\n{history}\nHuman: {question}\nAI:";

/// A generated answer plus the chunks that grounded it (empty on the open
/// path).
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<DocumentChunk>,
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn answer(
        &self,
        question: &str,
        params: &SamplingParams,
        credential: &Credential,
    ) -> Result<Answer, PipelineError>;
}

/// Rolling transcript of prior turns, rendered as role-tagged lines for
/// the conversational prompt.
#[derive(Debug, Clone, Default)]
pub struct BufferMemory {
    turns: Vec<Message>,
}

impl BufferMemory {
    pub fn from_history(history: &[Message]) -> Self {
        Self {
            turns: history.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Render as `Human:` / `AI:` lines, one per turn.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for turn in &self.turns {
            let tag = match turn.role {
                Role::User => "Human",
                _ => "AI",
            };
            out.push_str(tag);
            out.push_str(": ");
            out.push_str(&turn.content);
            out.push('\n');
        }
        out
    }
}

/// Grounded path: answer from retrieved chunks only.
pub struct DocumentQaGenerator<'a> {
    model: &'a dyn GenerationModel,
    chunks: &'a [DocumentChunk],
}

impl<'a> DocumentQaGenerator<'a> {
    pub fn new(model: &'a dyn GenerationModel, chunks: &'a [DocumentChunk]) -> Self {
        Self { model, chunks }
    }
}

#[async_trait]
impl AnswerGenerator for DocumentQaGenerator<'_> {
    async fn answer(
        &self,
        question: &str,
        params: &SamplingParams,
        credential: &Credential,
    ) -> Result<Answer, PipelineError> {
        let context = self
            .chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let prompt = QA_TEMPLATE
            .replace("{context}", &context)
            .replace("{question}", question);

        let output = self.model.complete(&prompt, params, credential).await?;
        let text = output.into_single_value()?;

        Ok(Answer {
            text: text.trim().to_string(),
            sources: self.chunks.to_vec(),
        })
    }
}

/// Open path: answer from history and a system instruction.
pub struct ConversationalGenerator<'a> {
    model: &'a dyn GenerationModel,
    memory: BufferMemory,
    system_prompt: String,
}

impl<'a> ConversationalGenerator<'a> {
    pub fn new(
        model: &'a dyn GenerationModel,
        memory: BufferMemory,
        system_prompt: Option<String>,
    ) -> Self {
        Self {
            model,
            memory,
            system_prompt: system_prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
        }
    }
}

#[async_trait]
impl AnswerGenerator for ConversationalGenerator<'_> {
    async fn answer(
        &self,
        question: &str,
        params: &SamplingParams,
        credential: &Credential,
    ) -> Result<Answer, PipelineError> {
        let prompt = CONVERSATION_TEMPLATE
            .replace("{system}", &self.system_prompt)
            .replace("{history}", &self.memory.render())
            .replace("{question}", question);

        let output = self.model.complete(&prompt, params, credential).await?;
        let text = output.into_single_value()?;

        Ok(Answer {
            text: text.trim().to_string(),
            sources: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ModelOutput;
    use std::sync::Mutex;

    /// Records the prompt it was called with and echoes a canned reply.
    struct RecordingModel {
        reply: String,
        prompts: Mutex<Vec<String>>,
    }

    impl RecordingModel {
        fn new(reply: &str) -> Self {
            Self {
                reply: reply.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn last_prompt(&self) -> String {
            self.prompts.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl GenerationModel for RecordingModel {
        async fn complete(
            &self,
            prompt: &str,
            _params: &SamplingParams,
            _credential: &Credential,
        ) -> Result<ModelOutput, PipelineError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(ModelOutput::single("text", self.reply.clone()))
        }
    }

    fn params() -> SamplingParams {
        SamplingParams {
            temperature: 1.0,
            top_p: 1.0,
            max_tokens: 1000,
        }
    }

    fn chunk(text: &str, index: usize) -> DocumentChunk {
        DocumentChunk {
            source_filename: "doc.pdf".to_string(),
            text: text.to_string(),
            chunk_index: index,
        }
    }

    #[tokio::test]
    async fn document_qa_prompt_contains_chunks_not_history() {
        let model = RecordingModel::new("grounded answer");
        let chunks = vec![chunk("chunk alpha", 0), chunk("chunk beta", 1)];
        let generator = DocumentQaGenerator::new(&model, &chunks);

        let answer = generator
            .answer("What is alpha?", &params(), &Credential::none())
            .await
            .unwrap();

        assert_eq!(answer.text, "grounded answer");
        assert_eq!(answer.sources, chunks);
        let prompt = model.last_prompt();
        assert!(prompt.contains("chunk alpha"));
        assert!(prompt.contains("chunk beta"));
        assert!(prompt.contains("What is alpha?"));
    }

    #[tokio::test]
    async fn conversational_prompt_contains_history_and_system() {
        let model = RecordingModel::new("open answer");
        let history = vec![
            Message::new(Role::User, "earlier question"),
            Message::new(Role::Assistant, "earlier answer"),
        ];
        let generator = ConversationalGenerator::new(
            &model,
            BufferMemory::from_history(&history),
            Some("Answer like a pirate.".to_string()),
        );

        let answer = generator
            .answer("And now?", &params(), &Credential::none())
            .await
            .unwrap();

        assert_eq!(answer.text, "open answer");
        assert!(answer.sources.is_empty());
        let prompt = model.last_prompt();
        assert!(prompt.contains("Answer like a pirate."));
        assert!(prompt.contains("Human: earlier question"));
        assert!(prompt.contains("AI: earlier answer"));
    }

    #[tokio::test]
    async fn conversational_defaults_system_prompt() {
        let model = RecordingModel::new("ok");
        let generator = ConversationalGenerator::new(&model, BufferMemory::default(), None);
        generator
            .answer("hello", &params(), &Credential::none())
            .await
            .unwrap();
        assert!(model.last_prompt().contains(DEFAULT_SYSTEM_PROMPT));
    }

    #[test]
    fn buffer_memory_renders_role_tags() {
        let memory = BufferMemory::from_history(&[
            Message::new(Role::User, "hi"),
            Message::new(Role::Assistant, "hello"),
        ]);
        assert_eq!(memory.render(), "Human: hi\nAI: hello\n");
    }
}
