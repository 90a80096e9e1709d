//! spam-shield adapters crate
//!
//! This crate contains infrastructure adapters implementing the domain ports:
//! - `llm`: Classification service adapters (Gemini, OpenAI) and an offline stub

pub mod llm;
