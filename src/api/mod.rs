//! REST backend bindings: the typed resource client, domain types and the
//! client error taxonomy.

pub mod client;
pub mod error;
pub mod types;

pub use client::ApiClient;
pub use error::ApiError;
