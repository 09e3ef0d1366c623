use std::{fs::OpenOptions, net::SocketAddr, path::PathBuf, sync::Arc};

use axum::{
    Router,
    extract::{MatchedPath, Request},
    middleware,
};
use axum_server::Handle;
use clap::Parser;
use rusqlite::Connection;
use tower_http::trace::TraceLayer;

#[cfg(debug_assertions)]
use tower_livereload::LiveReloadLayer;

use tracing_subscriber::{EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt};

use statement_keeper::{
    AppState, PaginationConfig, StatementStorage, build_router, graceful_shutdown,
    logging_middleware, scan_storage,
};

/// The admin web server for Statement Keeper.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to the application SQLite database.
    #[arg(long, env = "DATABASE_PATH")]
    db_path: PathBuf,

    /// Directory where uploaded statement files are stored.
    #[arg(long, env = "STATEMENTS_STORAGE_PATH", default_value = "statements")]
    statements_dir: PathBuf,

    /// The address to serve the app from.
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: std::net::IpAddr,

    /// The port to serve the app from.
    #[arg(short, long, env = "PORT", default_value_t = 3000)]
    port: u16,

    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    #[arg(long, env = "TIMEZONE", default_value = "Etc/UTC")]
    timezone: String,

    /// The default number of rows on list pages that do not set their own page size.
    #[arg(
        long,
        env = "PAGE_SIZE",
        default_value_t = 20,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    page_size: u64,
}

#[tokio::main]
async fn main() {
    setup_logging();

    let args = Args::parse();

    let connection = match Connection::open(&args.db_path) {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not open the database at {:?}: {error}", args.db_path);
            std::process::exit(1);
        }
    };

    let statement_storage = StatementStorage::new(args.statements_dir.clone());
    if let Err(error) = statement_storage.ensure_dir() {
        tracing::error!(
            "Could not create the statements directory {:?}: {error}",
            args.statements_dir
        );
        std::process::exit(1);
    }

    let pagination_config = PaginationConfig {
        default_page_size: args.page_size,
        ..Default::default()
    };
    let state = match AppState::new(
        connection,
        &args.timezone,
        pagination_config,
        statement_storage,
    ) {
        Ok(state) => state,
        Err(error) => {
            tracing::error!("Could not start the server: {error}");
            std::process::exit(1);
        }
    };

    report_orphaned_files(&state);

    let handle = Handle::new();
    tokio::spawn(graceful_shutdown(handle.clone()));

    let router = add_tracing_layer(
        build_router(state).layer(middleware::from_fn(logging_middleware)),
    );

    #[cfg(debug_assertions)]
    let router = router.layer(LiveReloadLayer::new());

    let addr = SocketAddr::from((args.host, args.port));
    tracing::info!("HTTP server listening on {}", addr);
    if let Err(error) = axum_server::bind(addr)
        .handle(handle)
        .serve(router.into_make_service())
        .await
    {
        tracing::error!("Server error: {error}");
        std::process::exit(1);
    }
}

/// Log files in the statements directory that no statement refers to.
///
/// They are left in place so that nothing is lost by mistake.
fn report_orphaned_files(state: &AppState) {
    let report = match state.db_connection.lock() {
        Ok(connection) => scan_storage(&state.statement_storage, &connection),
        Err(error) => {
            tracing::error!("could not acquire database lock: {error}");
            return;
        }
    };

    match report {
        Ok(report) => {
            if report.removed_staging_files > 0 {
                tracing::info!(
                    "Removed {} unfinished upload(s) from the staging area",
                    report.removed_staging_files
                );
            }
            for filename in &report.orphaned_files {
                tracing::warn!(
                    "Statement file {filename} in {:?} has no statement",
                    state.statement_storage.dir()
                );
            }
        }
        Err(error) => tracing::error!("Could not scan the statements directory: {error}"),
    }
}

fn setup_logging() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let log_file = match OpenOptions::new()
        .create(true)
        .append(true)
        .open("debug.log")
    {
        Ok(file) => Some(file),
        Err(error) => {
            eprintln!("Could not open debug.log, logging to stdout only: {error}");
            None
        }
    };

    let debug_log = log_file.map(|file| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(false)
            .with_writer(Arc::new(file))
            .with_filter(filter::LevelFilter::DEBUG)
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(stdout_log)
        .with(debug_log)
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
        // By default, `TraceLayer` will log 5xx responses but we're doing our specific
        // logging of errors so disable that
        .on_failure(());

    router.layer(tracing_layer)
}
