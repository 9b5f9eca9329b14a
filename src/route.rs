//! Retrieval routing.
//!
//! Per turn, a top-1 similarity probe decides between the two answer
//! paths: scores strictly above [`GROUNDING_THRESHOLD`] go GROUNDED with
//! the top supporting chunks attached. Everything else goes OPEN,
//! including the boundary score itself and an empty namespace.

use crate::error::PipelineError;
use crate::index::VectorIndex;
use crate::models::{Credential, DocumentChunk};

/// Minimum top-1 similarity (exclusive) for the grounded path.
pub const GROUNDING_THRESHOLD: f32 = 0.8;

/// Supporting chunks fetched for a grounded answer.
pub const SUPPORT_K: usize = 4;

/// The selected answer path.
#[derive(Debug, Clone)]
pub enum AnswerRoute {
    /// Answer from retrieved document chunks, in retrieval order.
    Grounded { chunks: Vec<DocumentChunk> },
    /// Answer from conversation history and the system instruction only.
    Open,
}

/// Probe the namespace for the standalone question and pick a route.
pub async fn select_route(
    index: &dyn VectorIndex,
    question: &str,
    namespace: &str,
    credential: &Credential,
) -> Result<AnswerRoute, PipelineError> {
    let top = index
        .similarity_search(question, 1, namespace, credential)
        .await?;

    match top.first() {
        Some(best) if best.score > GROUNDING_THRESHOLD => {
            let matches = index
                .similarity_search(question, SUPPORT_K, namespace, credential)
                .await?;
            tracing::info!(
                score = best.score,
                chunks = matches.len(),
                "routing grounded"
            );
            Ok(AnswerRoute::Grounded {
                chunks: matches.into_iter().map(|m| m.chunk).collect(),
            })
        }
        best => {
            tracing::info!(score = best.map(|m| m.score), "routing open");
            Ok(AnswerRoute::Open)
        }
    }
}
