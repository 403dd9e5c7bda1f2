//! Configuration for the Flint windowing shim.
//!
//! Settings persist to disk as RON files, can be overridden via clap CLI
//! flags, and deserialize forward/backward compatibly (unknown fields are
//! ignored, missing fields take defaults).

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{Config, DebugConfig, TimingConfig, WindowConfig};
pub use error::ConfigError;
