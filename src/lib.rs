//! Writing assistant: document chat over a shared corpus, AI-assisted
//! drafting, and writing-improvement analysis.
//!
//! The crate's own logic is the deterministic glue: [`chunk`] slices uploads
//! into overlapping windows, [`prompt`] renders the instruction templates, and
//! [`session`] applies user actions to per-session state. Generation and
//! retrieval sit behind the [`llm::Generator`] and [`retrieval::Retriever`]
//! traits.

pub mod assistant;
pub mod chunk;
pub mod config;
pub mod document;
pub mod error;
pub mod instrumentation;
pub mod llm;
pub mod prompt;
pub mod retrieval;
pub mod server;
pub mod session;
pub mod suggestions;
