//! Command-line argument parsing for the parley client

use clap::Parser;

/// parley - chat with everyone connected to a parley server
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Server address (host:port or tcp://host:port)
    #[arg(long, short = 'a', env = "PARLEY_ADDR", default_value = "127.0.0.1:7000")]
    pub addr: String,

    /// Name shown next to your messages
    #[arg(long, short = 'u', env = "PARLEY_USER", default_value = "unknown")]
    pub username: String,
}

impl Args {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Username as sent to the server (lowercased)
    pub fn author(&self) -> String {
        self.username.trim().to_lowercase()
    }
}
