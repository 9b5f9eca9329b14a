//! Conversation history windowing.
//!
//! Downstream components never see the raw turn list. They get a
//! read-only snapshot with source-attribution messages removed, the turn
//! currently being answered dropped (it is already echoed into the list),
//! and the remainder capped to the most recent [`HISTORY_WINDOW`] turns.

use crate::models::{Message, Role};

/// Maximum turns handed to the condenser and the conversational answer
/// path.
pub const HISTORY_WINDOW: usize = 11;

/// Build the windowed snapshot of a conversation's turn list.
pub fn windowed_history(messages: &[Message]) -> Vec<Message> {
    let mut turns: Vec<Message> = messages
        .iter()
        .filter(|m| m.role != Role::Source)
        .cloned()
        .collect();

    // The most recent turn is the one being answered right now.
    turns.pop();

    if turns.len() > HISTORY_WINDOW {
        turns.drain(..turns.len() - HISTORY_WINDOW);
    }
    turns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: Role, content: &str) -> Message {
        Message::new(role, content)
    }

    #[test]
    fn empty_input_empty_window() {
        assert!(windowed_history(&[]).is_empty());
    }

    #[test]
    fn single_turn_yields_empty_window() {
        let window = windowed_history(&[msg(Role::User, "first question")]);
        assert!(window.is_empty());
    }

    #[test]
    fn source_messages_are_excluded() {
        let messages = vec![
            msg(Role::User, "q1"),
            msg(Role::Assistant, "a1"),
            msg(Role::Source, "Source 1:\n\nchunk"),
            msg(Role::User, "q2"),
        ];
        let window = windowed_history(&messages);
        assert!(window.iter().all(|m| m.role != Role::Source));
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "q1");
        assert_eq!(window[1].content, "a1");
    }

    #[test]
    fn window_caps_at_eleven_most_recent() {
        let mut messages = Vec::new();
        for i in 0..20 {
            messages.push(msg(Role::User, &format!("q{}", i)));
            messages.push(msg(Role::Assistant, &format!("a{}", i)));
        }
        messages.push(msg(Role::User, "current"));

        let window = windowed_history(&messages);
        assert_eq!(window.len(), HISTORY_WINDOW);
        // Chronological order, ending with the newest retained turn.
        assert_eq!(window.last().unwrap().content, "a19");
        assert_eq!(window[0].content, "a14");
    }

    #[test]
    fn window_never_contains_current_turn() {
        let messages = vec![
            msg(Role::User, "q1"),
            msg(Role::Assistant, "a1"),
            msg(Role::User, "current question"),
        ];
        let window = windowed_history(&messages);
        assert!(window.iter().all(|m| m.content != "current question"));
    }
}
