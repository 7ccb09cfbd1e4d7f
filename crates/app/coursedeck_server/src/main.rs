//! Coursedeck auth service binary.
//!
//! Wires the Postgres user store, the in-process session-handle store,
//! and the HTTP router together, then serves until interrupted.

use std::sync::Arc;

use clap::Parser;
use coursedeck_api::config::ApiConfig;
use coursedeck_core::auth::credentials;
use coursedeck_core::auth::oauth::StateStore;
use coursedeck_core::store::memory::MemoryStore;
use coursedeck_core::store::postgres::PgUserStore;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// CLI arguments for the auth service.
#[derive(Parser, Debug)]
#[command(name = "coursedeck_server", about = "Coursedeck auth service")]
struct Args {
    /// Address to bind (overrides BIND_ADDR).
    #[arg(long)]
    bind_addr: Option<String>,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/coursedeck"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    /// Skip the idempotent demo-account seed.
    #[arg(long, default_value_t = false)]
    no_seed: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "info,coursedeck_api=debug,coursedeck_core=debug"
                    .parse()
                    .expect("default filter parses")
            }),
        )
        .init();

    let args = Args::parse();

    // Missing SESSION_SECRET aborts here, before anything binds.
    let mut config = ApiConfig::from_env()?;
    config.database_url = args.database_url.clone();
    if let Some(bind_addr) = args.bind_addr {
        config.bind_addr = bind_addr;
    }

    info!(database_url = %config.database_url, "starting coursedeck_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    coursedeck_api::migrate(&pool).await?;

    let users = Arc::new(PgUserStore::new(pool));
    let sessions = Arc::new(MemoryStore::new());

    if !args.no_seed {
        credentials::seed_demo_users(users.as_ref()).await?;
    }

    let state = coursedeck_api::AppState {
        users,
        sessions,
        oauth_states: Arc::new(StateStore::new()),
        config: config.clone(),
    };

    let app = coursedeck_api::router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "auth service listening");

    axum::serve(listener, app).await?;

    Ok(())
}
