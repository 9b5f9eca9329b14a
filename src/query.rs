//! Per-turn query pipeline: window the history, condense the utterance
//! into a standalone question, route it, and generate the answer.

use crate::answer::{
    Answer, AnswerGenerator, BufferMemory, ConversationalGenerator, DocumentQaGenerator,
};
use crate::condense::{condense_question, sanitize_question};
use crate::error::PipelineError;
use crate::history::windowed_history;
use crate::index::VectorIndex;
use crate::llm::GenerationModel;
use crate::models::{Credential, DocumentChunk, Message, Settings};
use crate::route::{select_route, AnswerRoute};

pub struct QueryDeps<'a> {
    pub index: &'a dyn VectorIndex,
    pub model: &'a dyn GenerationModel,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub question: String,
    pub messages: Vec<Message>,
    pub system_prompt: Option<String>,
    pub namespace: String,
    pub settings: Settings,
    pub credential: Credential,
}

/// The answer plus, on the grounded path, the supporting chunks in
/// retrieval order.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    pub data: String,
    pub source: Vec<DocumentChunk>,
}

/// Answer one conversational turn.
///
/// Settings are expected to be range-validated by the caller before this
/// runs; the question precondition is checked here because it gates the
/// whole pipeline.
pub async fn answer_question(
    deps: &QueryDeps<'_>,
    request: &QueryRequest,
) -> Result<QueryResponse, PipelineError> {
    if request.question.trim().is_empty() {
        return Err(PipelineError::validation("No question in the request"));
    }

    let question = sanitize_question(&request.question);
    let params = request.settings.sampling();
    let history = windowed_history(&request.messages);

    let standalone = condense_question(
        deps.model,
        &question,
        &history,
        &params,
        &request.credential,
    )
    .await?;

    let route = select_route(deps.index, &standalone, &request.namespace, &request.credential)
        .await?;

    let answer: Answer = match route {
        AnswerRoute::Grounded { chunks } => {
            DocumentQaGenerator::new(deps.model, &chunks)
                .answer(&standalone, &params, &request.credential)
                .await?
        }
        AnswerRoute::Open => {
            ConversationalGenerator::new(
                deps.model,
                BufferMemory::from_history(&history),
                request.system_prompt.clone(),
            )
            .answer(&standalone, &params, &request.credential)
            .await?
        }
    };

    Ok(QueryResponse {
        data: answer.text,
        source: answer.sources,
    })
}
