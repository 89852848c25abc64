use async_trait::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use solvault_core::WalletError;

use crate::error::ApiError;

/// JSON body extractor that reports every rejection as a 400: the API
/// treats any unbindable request body as malformed input, regardless of
/// whether the JSON failed to parse or to match the target shape.
pub struct Bind<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Bind<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Bind(value)),
            Err(rejection) => Err(ApiError(WalletError::Input(match &rejection {
                JsonRejection::JsonDataError(e) => e.to_string(),
                JsonRejection::JsonSyntaxError(e) => e.to_string(),
                other => other.to_string(),
            }))),
        }
    }
}
