//! Client for the external article service's id-search and XML-fetch
//! endpoints (spec C3, §4.3): paged id search with history tokens, batched
//! fetch, and a fixed 3-attempt/5-second-linear retry policy.

mod client;
mod error;

pub use client::{EntrezClient, EntrezConfig, HttpEntrezClient};
pub use error::EntrezError;
