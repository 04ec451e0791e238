//! A typed wrapper around the document/vector store's HTTP API: index
//! creation with mapping, mget/search/scroll, bulk upsert, get/update, and
//! delete-by-query (spec C1, §4.1).

mod client;
mod error;
pub mod mapping;

pub use client::{BulkResult, HttpStoreClient, SearchPage, StoreClient, StoreClientConfig};
pub use error::{BulkItemFailure, StoreError};

/// Re-exported so `mapping` builders don't need a direct dependency on
/// `litmap_types`.
pub const EMBEDDING_DIM: usize = 768;
