//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default listen address; port 7000 matches the stock client
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:7000";

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# parley server configuration

[server]
listen_addr = "0.0.0.0:7000"

[logging]
# Overridden by PARLEY_LOG or --log
filter = "info"
"##;
