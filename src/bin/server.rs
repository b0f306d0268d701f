use std::{net::SocketAddr, time::Duration};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use wallet_ledger::{AppState, LedgerConfig, build_router, graceful_shutdown, logging_middleware};

/// The REST API server for the wallet ledger.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "WALLET_DB_PATH")]
    db_path: String,

    /// The port to serve the API from.
    #[arg(short, long, env = "WALLET_PORT", default_value_t = 3000)]
    port: u16,

    /// The number of ledger entries returned when a request does not give a limit.
    #[arg(long, env = "WALLET_HISTORY_LIMIT", default_value_t = 20)]
    history_limit: u64,

    /// The most ledger entries a single request may return.
    #[arg(long, env = "WALLET_MAX_HISTORY_LIMIT", default_value_t = 100)]
    max_history_limit: u64,

    /// How long, in milliseconds, an operation waits for a busy wallet before giving up.
    #[arg(long, env = "WALLET_LOCK_TIMEOUT_MS", default_value_t = 5000)]
    lock_timeout_ms: u64,

    /// The three letter currency given to new wallets, e.g. "GHS".
    #[arg(long, env = "WALLET_DEFAULT_CURRENCY", default_value = wallet_ledger::DEFAULT_CURRENCY)]
    default_currency: String,
}

impl Args {
    fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            default_history_limit: self.history_limit,
            max_history_limit: self.max_history_limit,
            lock_timeout: Duration::from_millis(self.lock_timeout_ms),
            default_currency: self.default_currency.clone(),
            ..LedgerConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));

    let conn = Connection::open(&args.db_path).expect("Could not open the database.");
    conn.busy_timeout(Duration::from_millis(args.lock_timeout_ms))
        .expect("Could not set the database busy timeout.");
    let state =
        AppState::new(conn, args.ledger_config()).expect("Could not start the wallet ledger.");

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    tracing::info!("HTTP server listening on {}", addr);
    axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
        .expect("The server stopped unexpectedly.");
}

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().pretty())
        .init();
}

fn add_tracing_layer(router: Router) -> Router {
    let tracing_layer = TraceLayer::new_for_http()
        .make_span_with(|req: &Request| {
            let method = req.method();
            let uri = req.uri();

            let matched_path = req
                .extensions()
                .get::<MatchedPath>()
                .map(|matched_path| matched_path.as_str());

            tracing::debug_span!("request", %method, %uri, matched_path)
        })
        // Errors are already logged by `Error::into_response`.
        .on_failure(());

    router.layer(tracing_layer)
}
