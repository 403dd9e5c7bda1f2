//! Errors for loading and persisting `config.ron`.

/// Failure while loading, saving, or hot-reloading the config file.
///
/// The source errors carry the underlying io/RON detail; the display strings
/// name the artifact so a bare log line still says what broke.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `config.ron` exists but could not be read.
    #[error("could not read config.ron: {0}")]
    Read(#[source] std::io::Error),

    /// The config file (or its directory) could not be written.
    #[error("could not write config.ron: {0}")]
    Write(#[source] std::io::Error),

    /// `config.ron` does not parse as the expected schema.
    #[error("config.ron is not valid: {0}")]
    Parse(#[source] ron::error::SpannedError),

    /// The in-memory settings could not be rendered as RON.
    #[error("could not serialize settings: {0}")]
    Serialize(#[source] ron::Error),
}
