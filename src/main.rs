//! Storefront server and operator CLI.

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use storefront::auth::{Accounts, AuthError};
use storefront::config::{Cli, Command, CreateAdminArgs, DatabaseArgs, ServeArgs};
use storefront::{database, http, telemetry, AppState, InMemoryUnitOfWork, PostgresUnitOfWork};
use tokio::net::TcpListener;
use tower_sessions::MemoryStore;
use tower_sessions_sqlx_store::PostgresStore;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("DATABASE_URL is required unless --in-memory is set")]
    MissingDatabaseUrl,

    #[error("failed to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("failed to prepare session store: {0}")]
    SessionStore(#[source] sqlx::Error),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("failed to create admin: {0}")]
    CreateAdmin(#[from] AuthError),
}

#[tokio::main]
async fn main() -> ExitCode {
    let _env = dotenvy::dotenv();
    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    let result = match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Migrate(args) => migrate(args).await,
        Command::CreateAdmin(args) => create_admin(args).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(error = %error, "storefront failed");
            ExitCode::FAILURE
        }
    }
}

async fn connect(args: &DatabaseArgs) -> Result<sqlx::PgPool, StartupError> {
    let pool = database::connect(&args.database_url, args.pool.settings())
        .await
        .map_err(StartupError::Connect)?;
    tracing::info!("Database pool created");
    Ok(pool)
}

async fn serve(args: ServeArgs) -> Result<(), StartupError> {
    let addr = args.socket_addr();
    let session = args.session();

    let app = if args.in_memory {
        tracing::warn!("serving from the in-memory store; data is lost on exit");
        let state = AppState::new(
            InMemoryUnitOfWork::new(),
            args.static_dir.clone(),
            args.admin_page.clone(),
        );
        http::app(state, MemoryStore::default(), session)
    } else {
        let database_url = args
            .database_url
            .clone()
            .ok_or(StartupError::MissingDatabaseUrl)?;
        let pool = connect(&DatabaseArgs {
            database_url,
            pool: args.pool.clone(),
        })
        .await?;
        database::migrate(&pool).await?;

        let sessions = PostgresStore::new(pool.clone());
        sessions.migrate().await.map_err(StartupError::SessionStore)?;

        let state = AppState::new(
            PostgresUnitOfWork::new(Arc::new(pool)),
            args.static_dir.clone(),
            args.admin_page.clone(),
        );
        http::app(state, sessions, session)
    };

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;
    tracing::info!(%addr, "storefront listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)
}

async fn migrate(args: DatabaseArgs) -> Result<(), StartupError> {
    let pool = connect(&args).await?;
    database::migrate(&pool).await?;
    tracing::info!("migrations applied");
    Ok(())
}

async fn create_admin(args: CreateAdminArgs) -> Result<(), StartupError> {
    let pool = connect(&args.database).await?;
    database::migrate(&pool).await?;

    let store = PostgresUnitOfWork::new(Arc::new(pool));
    let id = Accounts::new(&store)
        .create_admin(&args.username, &args.password)
        .await?;

    println!("admin_id: {id}");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %error, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!(error = %error, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
