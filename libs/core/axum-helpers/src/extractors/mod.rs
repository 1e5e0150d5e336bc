//! Custom extractors for Axum handlers.
//!
//! Each extractor rejects with an [`AppError`](crate::errors::AppError) so
//! every failure uses the shared error envelope.

pub mod id_path;
pub mod validated_json;
pub mod validated_query;

pub use id_path::IdPath;
pub use validated_json::ValidatedJson;
pub use validated_query::ValidatedQuery;
