//! # agora-server
//!
//! Mock REST backend for developing and testing the Agora client.
//!
//! Tables are kept in memory and flushed to SQLite after every write when
//! `DB_PATH` is set; otherwise all state is dropped on exit.

use agora_server::{auth, serve, AppState, ServerConfig};
use agora_shared::{RegisterInput, Role};
use agora_store::MockDb;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // -----------------------------------------------------------------------
    // 1. Initialize tracing (respects RUST_LOG env var)
    // -----------------------------------------------------------------------
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,agora_server=debug")),
        )
        .init();

    info!("Starting Agora mock server v{}", env!("CARGO_PKG_VERSION"));

    // -----------------------------------------------------------------------
    // 2. Load configuration
    // -----------------------------------------------------------------------
    let config = ServerConfig::from_env();
    info!(?config, "Loaded configuration");

    // -----------------------------------------------------------------------
    // 3. Open the tables
    // -----------------------------------------------------------------------
    let mut db = match &config.db_path {
        Some(path) => MockDb::open_at(path)?,
        None => {
            info!("DB_PATH not set, state will not outlive the process");
            MockDb::in_memory()?
        }
    };

    if let Some(seed) = &config.seed_admin {
        if db.find_user_by_email(&seed.email).is_none() {
            let admin = auth::create_user(
                &mut db,
                RegisterInput {
                    email: seed.email.clone(),
                    first_name: "Admin".into(),
                    last_name: "User".into(),
                    password: seed.password.clone(),
                    role: Some(Role::Admin),
                },
            )
            .map_err(|e| anyhow::anyhow!("failed to seed admin: {e}"))?;
            info!(user = %admin.id, "Seeded admin account");
        }
    }

    let http_addr = config.http_addr;
    let state = AppState::new(db);

    // -----------------------------------------------------------------------
    // 4. Run the HTTP API server (blocks until shutdown)
    // -----------------------------------------------------------------------
    tokio::select! {
        result = serve(state, http_addr) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server failed");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
