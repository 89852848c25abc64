use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use solvault_core::WalletError;

/// Wrapper mapping service errors onto the HTTP surface: malformed input is
/// 400, auth failures 401/403, everything else from the service layer 417.
/// The body is the error's short human-readable reason.
pub struct ApiError(pub WalletError);

pub fn status_for(err: &WalletError) -> StatusCode {
    match err {
        WalletError::Input(_) | WalletError::InvalidType => StatusCode::BAD_REQUEST,
        WalletError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        WalletError::AccessDenied => StatusCode::FORBIDDEN,
        _ => StatusCode::EXPECTATION_FAILED,
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (status_for(&self.0), self.0.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_417() {
        assert_eq!(
            status_for(&WalletError::TransactionNotFound),
            StatusCode::EXPECTATION_FAILED
        );
        assert_eq!(
            status_for(&WalletError::AccountNotFound),
            StatusCode::EXPECTATION_FAILED
        );
        assert_eq!(
            status_for(&WalletError::Storage("io".into())),
            StatusCode::EXPECTATION_FAILED
        );
    }

    #[test]
    fn input_and_auth_errors_keep_their_status() {
        assert_eq!(
            status_for(&WalletError::Input("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_for(&WalletError::InvalidType), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_for(&WalletError::Unauthorized("no token".into())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(status_for(&WalletError::AccessDenied), StatusCode::FORBIDDEN);
    }
}
