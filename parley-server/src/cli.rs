//! Command-line argument parsing for parley-server

use std::path::PathBuf;

use clap::Parser;

use parley_server::AppConfig;
use parley_utils::LOG_ENV_VAR;

/// parley-server - broadcast chat server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file (defaults to $XDG_CONFIG_HOME/parley/config.toml)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:7000
    #[arg(long, short = 'l', env = "PARLEY_LISTEN")]
    pub listen: Option<String>,

    /// Log filter directive, e.g. "debug" or "parley_server=trace"
    #[arg(long)]
    pub log: Option<String>,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(listen) = &self.listen {
            config.server.listen_addr = listen.clone();
        }
        if let Some(log) = &self.log {
            config.logging.filter = log.clone();
        }
    }

    /// Filter to initialise logging with: `--log`, then `PARLEY_LOG`, then config
    pub fn log_filter(&self, config: &AppConfig) -> String {
        self.log
            .clone()
            .or_else(|| std::env::var(LOG_ENV_VAR).ok())
            .unwrap_or_else(|| config.logging.filter.clone())
    }
}
