//! Chat with a PDF through a locally served language model.
//!
//! An uploaded PDF is split into chunks, embedded into an in-memory vector
//! index and wrapped in a [`query_engine::QueryEngine`]. Questions retrieve
//! the closest chunks and the model's answer is streamed back fragment by
//! fragment. Per-user state (the engine cache and the transcript) lives in a
//! [`session::Session`].

pub mod app;
pub mod chat;
pub mod config;
pub mod display;
pub mod embedding;
pub mod error;
pub mod ingestion;
pub mod llm;
pub mod preview;
pub mod prompt;
pub mod query_engine;
pub mod repl;
pub mod retriever;
pub mod session;
pub mod utils;
pub mod vector_db;

#[cfg(test)]
mod testing;
