//! Configuration management for parley server
//!
//! Settings come from a TOML file (see [`DEFAULT_CONFIG_TOML`]) and may be
//! overridden on the command line.

mod defaults;
mod loader;
mod schema;

pub use defaults::DEFAULT_CONFIG_TOML;
pub use loader::ConfigLoader;
pub use schema::*;
