use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

use crate::auth::{auth_state, authorize};
use crate::handlers;
use crate::policy::Who;
use crate::state::AppState;

/// Build the service router, mounted under `/wallet/v1` with permissive
/// CORS. All `/accounts/:user/*` routes sit behind the bearer-JWT + policy
/// middleware; session routes are open.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let wallet = Router::new()
        .route("/accounts/:user", get(handlers::wallet))
        .route_layer(from_fn_with_state(
            auth_state(&state, "wallet.accounts.get", &[Who::Owner, Who::Admin]),
            authorize,
        ));

    let messages = Router::new()
        .route(
            "/accounts/:user/message-signatures",
            post(handlers::initialize_sign_message).put(handlers::finalize_sign_message),
        )
        .route_layer(from_fn_with_state(
            auth_state(&state, "wallet.messages.sign", &[Who::Owner, Who::Admin]),
            authorize,
        ));

    let transactions = Router::new()
        .route(
            "/accounts/:user/transaction-signatures",
            post(handlers::initialize_sign_transaction)
                .put(handlers::finalize_sign_transaction),
        )
        .route_layer(from_fn_with_state(
            auth_state(&state, "wallet.transactions.sign", &[Who::Owner, Who::Admin]),
            authorize,
        ));

    let sessions = Router::new()
        .route("/sessions", post(handlers::create_session))
        .route("/sessions/:session", get(handlers::session_data))
        .route("/sessions/:session/ack", post(handlers::ack_session));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(wallet)
        .merge(messages)
        .merge(transactions)
        .merge(sessions)
        .with_state(state);

    Router::new().nest("/wallet/v1", api).layer(cors)
}
