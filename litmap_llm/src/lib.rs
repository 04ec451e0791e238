//! OpenAI-compatible chat-completions client plus the prompt templates and
//! JSON-extraction logic for topic/cluster metadata, intent parsing, and
//! answer synthesis (spec C12, §4.12, §6).

mod client;
mod error;
pub mod prompts;

pub use client::{first_balanced_json, HttpLlmGateway, LlmClientConfig, LlmGateway};
pub use error::LlmError;
