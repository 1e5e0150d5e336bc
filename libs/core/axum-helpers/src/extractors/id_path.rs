//! Positive integer id path parameter extractor.

use crate::errors::AppError;
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
    response::{IntoResponse, Response},
};

/// Extractor for a single numeric id path parameter.
///
/// Rejects anything that is not an integer greater than zero with
/// `400 INVALID_ID`.
///
/// # Example
/// ```ignore
/// use axum::{Router, routing::get};
/// use axum_helpers::extractors::IdPath;
///
/// async fn get_user(IdPath(id): IdPath) -> String {
///     format!("User ID: {}", id)
/// }
///
/// let app: Router = Router::new().route("/users/{id}", get(get_user));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdPath(pub i64);

impl IdPath {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        match raw.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(IdPath(id)),
            _ => Err(AppError::InvalidId(raw.to_string())),
        }
    }
}

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| e.into_response())?;

        IdPath::parse(&raw).map_err(IntoResponse::into_response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_positive_ids() {
        assert_eq!(IdPath::parse("1").unwrap(), IdPath(1));
        assert_eq!(IdPath::parse("9000000000").unwrap(), IdPath(9_000_000_000));
    }

    #[test]
    fn test_parse_rejects_zero_negative_and_garbage() {
        for raw in ["0", "-3", "abc", "1.5", ""] {
            assert!(
                matches!(IdPath::parse(raw), Err(AppError::InvalidId(ref r)) if r == raw),
                "expected rejection for {raw:?}"
            );
        }
    }
}
