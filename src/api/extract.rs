//! Request extractors shared by the function endpoints.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};

use crate::domain::Reason;
use crate::error::ApiError;

/// JSON body extractor that rejects with `400 BAD_REQUEST` in the service's
/// error envelope instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(%rejection, "rejected request body");
                Err(ApiError::BadRequest(Reason::BadRequest))
            }
        }
    }
}

/// Unwraps a required field or fails with `reason`.
pub(crate) fn required<T>(field: Option<T>, reason: Reason) -> Result<T, ApiError> {
    field.ok_or(ApiError::BadRequest(reason))
}
