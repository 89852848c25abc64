//! solvault-server — the custodial wallet service binary.
//!
//! Startup sequence:
//!   1. Load the YAML config from `<path>/config.yaml`
//!   2. Build the account repository (cache / main / composite)
//!   3. Connect the key ring (Google KMS or the software driver)
//!   4. Fetch the JWKS and start the token-refresh loop
//!   5. Serve the HTTP API until SIGINT/SIGTERM

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use solvault_core::config::{Config, KeyDriver};
use solvault_http::{router, AppState, SubjectPolicy};
use solvault_keys::{GoogleKmsClient, KeyRing, KmsClient, SoftwareKms};
use solvault_passkey::{RestPasskeyClient, TokenVerifier};
use solvault_session::SessionRendezvous;
use solvault_store::build_repository;
use solvault_wallet::WalletService;

/// Resource name for the software key driver (no remote KMS involved).
const SOFTWARE_KEY_PATH: &str = "software/keyRings/wallet/cryptoKeys/root";

#[derive(Parser, Debug)]
#[command(
    name = "solvault-server",
    version,
    about = "SolVault — custodial Ed25519 wallet service"
)]
struct Args {
    /// Base directory holding config.yaml and the local stores.
    #[arg(long, env = "SOLVAULT_PATH")]
    path: Option<PathBuf>,

    /// HTTP listen port.
    #[arg(long, env = "SOLVAULT_SERVICE_PORT", default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,solvault=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    let base = match args.path {
        Some(path) => path,
        None => {
            let home = std::env::var("HOME").context("resolving home directory")?;
            PathBuf::from(home).join(".solvault")
        }
    };
    let cfg = Config::load(&base).context("loading configuration")?;

    // ── Account repository ────────────────────────────────────────────────────
    let repo = build_repository(&cfg.persistence)
        .await
        .context("building account repository")?;

    // ── Key ring ──────────────────────────────────────────────────────────────
    let (kms, parent): (Arc<dyn KmsClient>, String) = match cfg.keys.driver {
        KeyDriver::Google => {
            let google = cfg
                .keys
                .google
                .as_ref()
                .context("keys.google configuration missing")?;
            (Arc::new(GoogleKmsClient::new(google)), google.path())
        }
        KeyDriver::Software => {
            let software = cfg
                .keys
                .software
                .as_ref()
                .context("keys.software configuration missing")?;
            let seed: [u8; 32] = software
                .seed
                .as_slice()
                .try_into()
                .map_err(|_| anyhow::anyhow!("keys.software.seed must be 32 bytes"))?;
            (
                Arc::new(SoftwareKms::from_seed(SOFTWARE_KEY_PATH, seed)),
                SOFTWARE_KEY_PATH.to_string(),
            )
        }
    };
    let keyring = Arc::new(
        KeyRing::connect(kms, &parent)
            .await
            .context("enumerating key versions")?,
    );
    info!(versions = keyring.len(), "key ring ready");

    // ── Token verifier ────────────────────────────────────────────────────────
    let verifier = TokenVerifier::fetch(&cfg.jwt).await.context("fetching JWKS")?;
    let jwks_refresh = verifier.spawn_refresh();

    // ── Service ───────────────────────────────────────────────────────────────
    let passkeys = Arc::new(RestPasskeyClient::new(&cfg.passkeys));
    let sessions = SessionRendezvous::new(&cfg.session.key)?;
    let service = Arc::new(WalletService::new(
        repo,
        keyring,
        passkeys,
        Arc::clone(&verifier),
        sessions,
    ));

    let state = AppState {
        service: Arc::clone(&service),
        verifier,
        policy: Arc::new(SubjectPolicy),
    };
    let app = router(state);

    // ── HTTP server ───────────────────────────────────────────────────────────
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "wallet service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    jwks_refresh.abort();
    service.close().await?;
    info!("graceful shutdown");
    Ok(())
}

/// Resolve on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
