//! Follow-up condensation.
//!
//! A follow-up like "and what about the second one?" cannot be embedded
//! usefully on its own. When prior turns exist, the generation model
//! rewrites the utterance into a standalone question; with no history the
//! utterance passes through untouched without a model call.

use crate::answer::BufferMemory;
use crate::error::PipelineError;
use crate::llm::GenerationModel;
use crate::models::{Credential, Message, SamplingParams};

const CONDENSE_TEMPLATE: &str = "Given the following conversation and a \
follow up question, rephrase the follow up question to be a standalone \
question.\n\nChat History:\n{chat_history}\nFollow Up Input: {question}\n\
Standalone question:";

/// Normalize a raw utterance before condensation and retrieval: trim and
/// replace newlines with spaces (embedding models behave better without
/// them).
pub fn sanitize_question(question: &str) -> String {
    question.trim().replace('\n', " ")
}

/// Rewrite `question` into a standalone question using the windowed
/// history. Identity when the history is empty.
///
/// The model must return exactly one output field; anything else is a
/// fatal [`PipelineError::Configuration`].
pub async fn condense_question(
    model: &dyn GenerationModel,
    question: &str,
    history: &[Message],
    params: &SamplingParams,
    credential: &Credential,
) -> Result<String, PipelineError> {
    if history.is_empty() {
        return Ok(question.to_string());
    }

    let prompt = CONDENSE_TEMPLATE
        .replace("{chat_history}", &BufferMemory::from_history(history).render())
        .replace("{question}", question);

    let output = model.complete(&prompt, params, credential).await?;
    let standalone = output.into_single_value()?;
    Ok(standalone.trim().to_string())
}
