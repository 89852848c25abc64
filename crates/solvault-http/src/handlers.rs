use std::convert::Infallible;
use std::time::Duration;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::Stream;
use serde::{Deserialize, Serialize};

use solvault_core::b64;
use solvault_passkey::ParsedAssertion;
use solvault_wallet::{
    FinalizeSignMessageResponse, FinalizeSignTransactionResponse,
    InitializeSignMessageRequest, InitializeSignResponse, InitializeSignTransactionRequest,
};

use crate::error::ApiError;
use crate::extract::Bind;
use crate::state::AppState;

pub async fn health() -> &'static str {
    "ok"
}

// ── Wallet ───────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct WalletResponse {
    /// base58 wallet address.
    pub pubkey: String,
}

pub async fn wallet(
    State(state): State<AppState>,
    Path(user): Path<String>,
) -> Result<Json<WalletResponse>, ApiError> {
    let account = state.service.wallet(&user).await?;
    Ok(Json(WalletResponse {
        pubkey: account.wallet()?.to_string(),
    }))
}

// ── Message signatures ───────────────────────────────────────────────────────

pub async fn initialize_sign_message(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Bind(mut req): Bind<InitializeSignMessageRequest>,
) -> Result<Json<InitializeSignResponse>, ApiError> {
    req.subject = user;
    Ok(Json(state.service.initialize_sign_message(&req).await?))
}

pub async fn finalize_sign_message(
    State(state): State<AppState>,
    Bind(assertion): Bind<ParsedAssertion>,
) -> Result<Json<FinalizeSignMessageResponse>, ApiError> {
    Ok(Json(state.service.finalize_sign_message(&assertion).await?))
}

// ── Transaction signatures ───────────────────────────────────────────────────

pub async fn initialize_sign_transaction(
    State(state): State<AppState>,
    Path(user): Path<String>,
    Bind(mut req): Bind<InitializeSignTransactionRequest>,
) -> Result<Json<InitializeSignResponse>, ApiError> {
    req.subject = user;
    Ok(Json(state.service.initialize_sign_transaction(&req).await?))
}

pub async fn finalize_sign_transaction(
    State(state): State<AppState>,
    Bind(assertion): Bind<ParsedAssertion>,
) -> Result<Json<FinalizeSignTransactionResponse>, ApiError> {
    Ok(Json(
        state.service.finalize_sign_transaction(&assertion).await?,
    ))
}

// ── Sessions ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    #[serde(with = "b64")]
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDataResponse {
    #[serde(with = "b64")]
    pub data: Vec<u8>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AckSessionRequest {
    #[serde(with = "b64")]
    pub data: Vec<u8>,
}

/// Open a rendezvous session and stream its lifecycle as server-sent
/// events: first `session` with the id, then exactly one of `data` (the
/// acknowledged payload) or `fail` (`timeout`, or `session closed` when the
/// channel went away).
pub async fn create_session(
    State(state): State<AppState>,
    Bind(req): Bind<CreateSessionRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let (session, mut rx) = state.service.create_session(req.data)?;

    let stream = async_stream::stream! {
        yield Ok(Event::default().event("session").data(&session));

        match rx.recv().await {
            Some(Some(data)) => {
                yield Ok(Event::default().event("data").data(b64::encode(&data)));
            }
            Some(None) => {
                yield Ok(Event::default().event("fail").data("timeout"));
            }
            None => {
                yield Ok(Event::default().event("fail").data("session closed"));
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    ))
}

pub async fn session_data(
    State(state): State<AppState>,
    Path(session): Path<String>,
) -> Result<Json<SessionDataResponse>, ApiError> {
    let data = state.service.session_data(&session)?;
    Ok(Json(SessionDataResponse { data }))
}

pub async fn ack_session(
    State(state): State<AppState>,
    Path(session): Path<String>,
    Bind(req): Bind<AckSessionRequest>,
) -> Result<&'static str, ApiError> {
    state.service.ack_session(&session, req.data)?;
    Ok("ok")
}
