//! Chat session management.
//!
//! A [`ChatSession`] owns one conversation end to end: it appends the
//! user's turn, runs the query pipeline against the session's namespace,
//! then plays the computed answer back into the conversation, which is
//! where persistence and cancellation live. It is the only component that
//! mutates the turn list.

use crate::error::PipelineError;
use crate::index::VectorIndex;
use crate::llm::GenerationModel;
use crate::models::{Conversation, Credential, Role, Settings};
use crate::playback::{play, CancelFlag, ConversationSink, Playback, PlaybackState, TickSource};
use crate::query::{answer_question, QueryDeps, QueryRequest};

pub struct SessionDeps<'a> {
    pub index: &'a dyn VectorIndex,
    pub model: &'a dyn GenerationModel,
    pub sink: &'a dyn ConversationSink,
    pub settings: Settings,
    pub credential: Credential,
}

pub struct ChatSession {
    pub conversation: Conversation,
}

impl ChatSession {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            conversation: Conversation::new(namespace),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.conversation.system_prompt = Some(prompt.into());
        self
    }

    /// Remove the tail of the conversation before re-sending an edited or
    /// regenerated turn. When the tail is a source-attribution message the
    /// whole answered exchange (source, answer, question) goes.
    pub fn truncate_for_resend(&mut self, delete_count: usize) {
        let delete_count = match self.conversation.messages.last() {
            Some(last) if last.role == Role::Source => 3,
            _ => delete_count,
        };
        for _ in 0..delete_count {
            self.conversation.messages.pop();
        }
    }

    /// Answer one user turn and reveal it through playback, returning the
    /// terminal playback state.
    pub async fn send(
        &mut self,
        content: &str,
        deps: &SessionDeps<'_>,
        cancel: &CancelFlag,
        ticks: &mut dyn TickSource,
    ) -> Result<PlaybackState, PipelineError> {
        self.conversation.push(Role::User, content);

        let request = QueryRequest {
            question: content.to_string(),
            messages: self.conversation.messages.clone(),
            system_prompt: self.conversation.system_prompt.clone(),
            namespace: self.conversation.namespace.clone(),
            settings: deps.settings,
            credential: deps.credential.clone(),
        };

        let response = answer_question(
            &QueryDeps {
                index: deps.index,
                model: deps.model,
            },
            &request,
        )
        .await?;

        let playback = Playback::new(&response.data, response.source);
        play(playback, &mut self.conversation, cancel, ticks, deps.sink).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;

    fn session_with_tail(tail: &[(Role, &str)]) -> ChatSession {
        let mut session = ChatSession::new("ns");
        for (role, content) in tail {
            session.conversation.messages.push(Message::new(*role, *content));
        }
        session
    }

    #[test]
    fn resend_after_plain_answer_removes_requested_count() {
        let mut session = session_with_tail(&[
            (Role::User, "q1"),
            (Role::Assistant, "a1"),
            (Role::User, "q2"),
            (Role::Assistant, "a2"),
        ]);
        session.truncate_for_resend(2);
        assert_eq!(session.conversation.messages.len(), 2);
        assert_eq!(session.conversation.messages.last().unwrap().content, "a1");
    }

    #[test]
    fn resend_after_sourced_answer_removes_whole_exchange() {
        let mut session = session_with_tail(&[
            (Role::User, "q1"),
            (Role::User, "q2"),
            (Role::Assistant, "a2"),
            (Role::Source, "Source 1:\n\nchunk\n\n"),
        ]);
        session.truncate_for_resend(2);
        assert_eq!(session.conversation.messages.len(), 1);
        assert_eq!(session.conversation.messages[0].content, "q1");
    }
}
