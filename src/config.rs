//! Configuration management for the file server.
//!
//! Settings come from command-line arguments (clap) or environment variables
//! with the `FILESERVER_` prefix, with defaults for everything.
//!
//! # Example
//!
//! ```ignore
//! use fileserver::config::Config;
//!
//! let config = Config::parse();
//! println!("Serving {} on {}", config.root.display(), config.bind_address());
//! ```
//!
//! # Environment Variables
//!
//! - `FILESERVER_HOST` - Server bind address (default: 0.0.0.0)
//! - `FILESERVER_PORT` - Server port (default: 8080)
//! - `FILESERVER_ROOT` - Directory to serve (default: ./content)
//! - `FILESERVER_READ_ONLY` - Refuse filesystem mutations (default: false)
//! - `FILESERVER_CORS_ORIGINS` - Allowed CORS origins, comma separated

use std::path::PathBuf;

use clap::Parser;

use crate::server::RouterConfig;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default directory to serve, created at startup when missing.
pub const DEFAULT_ROOT: &str = "./content";

// =============================================================================
// CLI Arguments
// =============================================================================

/// fileserver - Browse, search and download a directory tree over HTTP.
///
/// Serves directory listings, individual files (with range requests) and
/// whole folders as zip archives.
#[derive(Parser, Debug, Clone)]
#[command(name = "fileserver")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FILESERVER_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FILESERVER_PORT")]
    pub port: u16,

    // =========================================================================
    // Filesystem Configuration
    // =========================================================================
    /// Directory to serve. Created if it does not exist.
    #[arg(long, default_value = DEFAULT_ROOT, env = "FILESERVER_ROOT")]
    pub root: PathBuf,

    /// Serve without a writable root; every mutation fails.
    #[arg(long, default_value_t = false, env = "FILESERVER_READ_ONLY")]
    pub read_only: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "FILESERVER_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("Root directory is required. Set --root or FILESERVER_ROOT".to_string());
        }

        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Router settings derived from the CLI.
    pub fn router_config(&self) -> RouterConfig {
        let config = RouterConfig::new().with_tracing(!self.no_tracing);
        match &self.cors_origins {
            Some(origins) => config.with_cors_origins(origins.clone()),
            None => config.with_cors_any_origin(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
