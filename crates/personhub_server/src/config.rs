//! Server configuration from CLI flags and `PERSONHUB_*` env vars.

use clap::Parser;
use personhub_core::{default_log_level, LoggingConfig};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DB_PATH: &str = "./personhub.sqlite3";

#[derive(Debug, Parser)]
#[command(name = "personhub")]
#[command(about = "HTTP service for managing person records")]
pub struct Args {
    /// SQLite database file.
    #[arg(long, env = "PERSONHUB_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,
    /// Use a throwaway in-memory database instead of `--db`.
    #[arg(long, env = "PERSONHUB_IN_MEMORY")]
    pub in_memory: bool,
    #[arg(long, env = "PERSONHUB_HOST", default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,
    #[arg(long, env = "PERSONHUB_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
    /// trace|debug|info|warn|error; defaults by build mode.
    #[arg(long, env = "PERSONHUB_LOG_LEVEL")]
    pub log_level: Option<String>,
    /// Directory for rolling log files; stderr only when unset.
    #[arg(long, env = "PERSONHUB_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Resolved runtime settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// `None` selects an in-memory database.
    pub db_path: Option<PathBuf>,
    pub host: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db_path: Some(PathBuf::from(DEFAULT_DB_PATH)),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            db_path: (!args.in_memory).then_some(args.db),
            host: args.host,
            port: args.port,
            log_level: args
                .log_level
                .unwrap_or_else(|| default_log_level().to_string()),
            log_dir: args.log_dir,
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Logger settings; a relative `log_dir` is resolved against `cwd`.
    pub fn logging(&self, cwd: &std::path::Path) -> LoggingConfig {
        LoggingConfig {
            level: self.log_level.clone(),
            log_dir: self.log_dir.as_ref().map(|dir| cwd.join(dir)),
            duplicate_to_stderr: true,
        }
    }
}
