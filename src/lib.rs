//! # chatdocs
//!
//! A retrieval-augmented document chat service.
//!
//! chatdocs ingests uploaded documents into a namespaced vector index and
//! answers conversational questions against them, falling back to open
//! conversation when the documents are not relevant enough. Answers are
//! revealed through a cancellable playback state machine that attaches
//! source excerpts on completion.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────────────────┐   ┌──────────────┐
//! │  Object  │──▶│   Ingestion Pipeline       │──▶│ Vector Index │
//! │ Storage  │   │ extract → chunk → embed    │   │ (namespaced) │
//! └──────────┘   └───────────────────────────┘   └──────┬───────┘
//!                                                       │ top-1 probe
//!                ┌──────────────────────────────────────┤
//!                ▼                                      ▼
//!       ┌────────────────┐  score > 0.8   ┌──────────────────────┐
//!       │ History window │───────────────▶│ Grounded answer      │
//!       │ + condensation │  otherwise     │ Open conversation    │
//!       └────────────────┘───────────────▶└──────────┬───────────┘
//!                                                    ▼
//!                                          ┌──────────────────┐
//!                                          │ Playback reveal  │
//!                                          │ (cancellable)    │
//!                                          └──────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Per-page text extraction |
//! | [`chunk`] | Overlapping text chunking |
//! | [`storage`] | Object storage collaborator |
//! | [`embedding`] | Embedding collaborator |
//! | [`index`] | Vector index collaborator |
//! | [`llm`] | Generation-model collaborator |
//! | [`ingest`] | Ingestion pipeline |
//! | [`progress`] | Ingestion progress frames |
//! | [`history`] | Conversation history windowing |
//! | [`condense`] | Follow-up condensation |
//! | [`route`] | Grounded/open retrieval routing |
//! | [`answer`] | Answer generation |
//! | [`playback`] | Answer playback state machine |
//! | [`session`] | Chat session management |
//! | [`query`] | Per-turn query pipeline |
//! | [`server`] | HTTP API |

pub mod answer;
pub mod chunk;
pub mod condense;
pub mod config;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod history;
pub mod index;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod playback;
pub mod progress;
pub mod query;
pub mod route;
pub mod server;
pub mod session;
pub mod storage;
