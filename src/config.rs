//! Command line and environment configuration.
//!
//! Every option can be given as a flag or through its environment variable;
//! a `.env` file in the working directory is loaded first when present.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - `PostgreSQL` connection string (not needed with `--in-memory`)
//! - `SERVER_HOST` - Bind address (default: 0.0.0.0)
//! - `SERVER_PORT` - Listen port (default: 3000)
//! - `SESSION_TTL_SECS` - Session lifetime after the last request (default: 86400)
//! - `SESSION_SECURE` - Mark the session cookie `Secure` (default: false)
//! - `STATIC_DIR` - Public assets served as the fallback route (default: public)
//! - `ADMIN_PAGE` - Admin panel page served at `/admin` (default: private/admin.html)
//! - `DATABASE_MAX_CONNECTIONS` - Pool size (default: 10)
//! - `DATABASE_ACQUIRE_TIMEOUT_SECS` - Pool acquire timeout (default: 60)
//! - `LOG_FORMAT` - `compact` or `json` (default: compact)

use clap::{Args, Parser, Subcommand, ValueEnum};
use secrecy::SecretString;
use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::database::PoolSettings;

#[derive(Debug, Parser)]
#[command(name = "storefront", about = "Storefront server and operator tools", long_about = None)]
pub struct Cli {
    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Compact, global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeArgs),
    /// Apply pending database migrations
    Migrate(DatabaseArgs),
    /// Create an administrator account
    CreateAdmin(CreateAdminArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

fn parse_secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::from(value.to_string()))
}

#[derive(Debug, Clone, Args)]
pub struct PoolArgs {
    /// Maximum number of pooled connections
    #[arg(long, env = "DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_connections: u32,

    /// Seconds to wait for a pooled connection
    #[arg(long, env = "DATABASE_ACQUIRE_TIMEOUT_SECS", default_value_t = 60)]
    pub acquire_timeout_secs: u64,
}

impl PoolArgs {
    pub fn settings(&self) -> PoolSettings {
        PoolSettings {
            max_connections: self.max_connections,
            acquire_timeout: Duration::from_secs(self.acquire_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, value_parser = parse_secret)]
    pub database_url: SecretString,

    #[command(flatten)]
    pub pool: PoolArgs,
}

#[derive(Debug, Clone, Args)]
pub struct CreateAdminArgs {
    /// Login name of the new administrator
    #[arg(long)]
    pub username: String,

    /// Initial password, at least six characters
    #[arg(long)]
    pub password: String,

    #[command(flatten)]
    pub database: DatabaseArgs,
}

#[derive(Debug, Clone, Args)]
pub struct ServeArgs {
    /// Keep all data in process memory instead of PostgreSQL
    #[arg(long)]
    pub in_memory: bool,

    /// PostgreSQL connection string
    #[arg(long, env = "DATABASE_URL", hide_env_values = true, value_parser = parse_secret)]
    pub database_url: Option<SecretString>,

    /// IP address to bind the server to
    #[arg(long, env = "SERVER_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "SERVER_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Session lifetime in seconds, renewed on every request
    #[arg(long, env = "SESSION_TTL_SECS", default_value_t = 86_400)]
    pub session_ttl_secs: i64,

    /// Only send the session cookie over HTTPS
    #[arg(long, env = "SESSION_SECURE")]
    pub session_secure: bool,

    /// Directory of public assets
    #[arg(long, env = "STATIC_DIR", default_value = "public")]
    pub static_dir: PathBuf,

    /// Admin panel page, kept outside the public directory
    #[arg(long, env = "ADMIN_PAGE", default_value = "private/admin.html")]
    pub admin_page: PathBuf,

    #[command(flatten)]
    pub pool: PoolArgs,
}

impl ServeArgs {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn session(&self) -> SessionSettings {
        SessionSettings {
            ttl_secs: self.session_ttl_secs,
            secure: self.session_secure,
        }
    }
}

/// Cookie settings of the session layer.
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub ttl_secs: i64,
    pub secure: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            ttl_secs: 86_400,
            secure: false,
        }
    }
}
