//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::token::SigningKey;
use clap::Parser;
use tracing::{error, info};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "sessionguard",
    about = "Stateless signed-cookie sessions with password login"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "7291")]
    pub port: u16,

    /// Path to SQLite database file (":memory:" for a throwaway database)
    #[arg(short, long, env = "DATABASE", default_value = "sessionguard.db")]
    pub database: String,

    /// Set the Secure flag on session cookies (serve over HTTPS)
    #[arg(long, env = "SECURE_COOKIES")]
    pub secure_cookies: bool,

    /// How long browsers keep the session cookie, in days
    #[arg(long, default_value = "7", value_parser = clap::value_parser!(u64).range(1..=365))]
    pub cookie_max_age_days: u64,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Generate the process signing key.
/// Returns None and logs an error if the OS random source is unavailable.
pub fn generate_signing_key() -> Option<SigningKey> {
    match SigningKey::generate() {
        Ok(key) => {
            info!("Generated session signing key");
            Some(key)
        }
        Err(e) => {
            error!(error = %e, "Failed to generate session signing key");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
pub fn build_config(args: &Args, db: Database, signing_key: SigningKey) -> ServerConfig {
    ServerConfig {
        db,
        signing_key,
        secure_cookies: args.secure_cookies,
        cookie_max_age_secs: args.cookie_max_age_days * SECS_PER_DAY,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
