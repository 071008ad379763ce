//! Extractors whose rejections are envelope errors

use axum::extract::{FromRequest, FromRequestParts};

use crate::response::ApiError;

/// `Json<T>` that rejects with a 400 envelope
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ValidJson<T>(pub T);

/// `Query<T>` that rejects with a 400 envelope
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ValidQuery<T>(pub T);

/// Parse a path id, answering `invalid <entity> ID` when it is not a positive integer.
pub fn parse_id(raw: &str, entity: &str) -> Result<i32, ApiError> {
    match raw.parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(ApiError::bad_request(format!("invalid {} ID", entity))),
    }
}
