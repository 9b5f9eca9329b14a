//! Streaming playback of a computed answer.
//!
//! The answer is already fully computed when playback starts; this module
//! reveals it one character per tick into the conversation's last message,
//! so the client sees a progressive stream without any partial model
//! output existing anywhere.
//!
//! The machine is an explicit `Idle → Playing → {Completed, Cancelled}`
//! automaton driven by two abstractions:
//! - a [`CancelFlag`], set from outside and sampled once per tick, so a
//!   stop request takes effect within one tick;
//! - a [`TickSource`], so the same machine runs under a real 5 ms timer
//!   ([`IntervalTick`]), or flat out in tests ([`NoDelayTick`]).
//!
//! The conversation is persisted through a [`ConversationSink`] exactly
//! once, at the terminal transition: completed runs persist the full
//! answer (plus a source-attribution message when chunks were supplied),
//! cancelled runs persist the partial reveal as-is.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::PipelineError;
use crate::models::{Conversation, DocumentChunk, Role};

/// Milliseconds between reveal ticks under the real timer.
pub const TICK_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Playing,
    Completed,
    Cancelled,
}

/// Externally settable stop signal, sampled once per tick.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Abstract tick source driving the reveal loop.
#[async_trait]
pub trait TickSource: Send {
    async fn tick(&mut self);
}

/// Real timer ticking every [`TICK_INTERVAL`].
pub struct IntervalTick {
    interval: tokio::time::Interval,
}

impl IntervalTick {
    pub fn new() -> Self {
        Self {
            interval: tokio::time::interval(TICK_INTERVAL),
        }
    }
}

impl Default for IntervalTick {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TickSource for IntervalTick {
    async fn tick(&mut self) {
        self.interval.tick().await;
    }
}

/// Tick source that never waits; used by tests and one-shot CLI runs.
pub struct NoDelayTick;

#[async_trait]
impl TickSource for NoDelayTick {
    async fn tick(&mut self) {}
}

/// Persists a conversation at a playback terminal transition.
#[async_trait]
pub trait ConversationSink: Send + Sync {
    async fn persist(&self, conversation: &Conversation) -> Result<(), PipelineError>;
}

/// Writes each conversation as `{dir}/{id}.json`.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ConversationSink for JsonFileSink {
    async fn persist(&self, conversation: &Conversation) -> Result<(), PipelineError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PipelineError::upstream("persistence", e))?;
        let path = self.dir.join(format!("{}.json", conversation.id));
        let json = serde_json::to_vec_pretty(conversation)
            .map_err(|e| PipelineError::upstream("persistence", e))?;
        tokio::fs::write(&path, json)
            .await
            .map_err(|e| PipelineError::upstream("persistence", e))?;
        Ok(())
    }
}

/// Outcome of one tick of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// One character appended; keep ticking.
    Revealed,
    /// All characters revealed, sources attached; terminal.
    Completed,
    /// Stop flag observed; terminal.
    Cancelled,
}

/// The playback state machine. Owns the answer characters and the pending
/// source chunks; mutates only the conversation it is given.
pub struct Playback {
    chars: Vec<char>,
    position: usize,
    sources: Vec<DocumentChunk>,
    state: PlaybackState,
}

impl Playback {
    pub fn new(answer: &str, sources: Vec<DocumentChunk>) -> Self {
        Self {
            chars: answer.chars().collect(),
            position: 0,
            sources,
            state: PlaybackState::Idle,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Append the empty assistant message the reveal writes into and start
    /// playing.
    pub fn begin(&mut self, conversation: &mut Conversation) {
        debug_assert_eq!(self.state, PlaybackState::Idle);
        conversation.push(Role::Assistant, "");
        self.state = PlaybackState::Playing;
    }

    /// Advance the machine by one tick.
    ///
    /// Sampling order: cancellation first (a stop request wins even on the
    /// tick that would have completed), then completion, then reveal of
    /// exactly one character into the last message.
    pub fn step(&mut self, conversation: &mut Conversation, cancel: &CancelFlag) -> StepOutcome {
        debug_assert_eq!(self.state, PlaybackState::Playing);

        if cancel.is_cancelled() {
            self.state = PlaybackState::Cancelled;
            return StepOutcome::Cancelled;
        }

        if self.position == self.chars.len() {
            if !self.sources.is_empty() {
                conversation.push(Role::Source, render_sources(&self.sources));
            }
            self.state = PlaybackState::Completed;
            return StepOutcome::Completed;
        }

        let ch = self.chars[self.position];
        self.position += 1;
        if let Some(last) = conversation.messages.last_mut() {
            last.content.push(ch);
        }
        StepOutcome::Revealed
    }
}

/// `"Source {n}:\n\n{chunk}\n\n"` for n = 1..count, concatenated in
/// retrieval order.
fn render_sources(sources: &[DocumentChunk]) -> String {
    let mut out = String::new();
    for (i, chunk) in sources.iter().enumerate() {
        out.push_str(&format!("Source {}:\n\n{}\n\n", i + 1, chunk.text));
    }
    out
}

/// Drive a playback to a terminal state, persisting the conversation
/// exactly once when it gets there.
pub async fn play(
    mut playback: Playback,
    conversation: &mut Conversation,
    cancel: &CancelFlag,
    ticks: &mut dyn TickSource,
    sink: &dyn ConversationSink,
) -> Result<PlaybackState, PipelineError> {
    playback.begin(conversation);

    loop {
        ticks.tick().await;
        match playback.step(conversation, cancel) {
            StepOutcome::Revealed => continue,
            StepOutcome::Completed | StepOutcome::Cancelled => {
                sink.persist(conversation).await?;
                return Ok(playback.state());
            }
        }
    }
}
