// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{AccountSettings, BrokerSettings, Config, SymbolSettings};

/// Prefix for environment variable overrides, e.g. `PAPER_BROKER__ACCOUNT__INITIAL_BALANCE`.
pub const ENV_PREFIX: &str = "PAPER_BROKER";

/// Loads the application configuration from a TOML file.
///
/// The file is optional: missing sections fall back to their defaults, and any
/// value can be overridden through `PAPER_BROKER__<SECTION>__<KEY>` variables.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;
    tracing::debug!(path, symbols = config.symbols.len(), "configuration loaded");

    Ok(config)
}

/// Parses configuration from an in-memory TOML string.
pub fn load_config_from_str(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    config.validate()?;
    Ok(config)
}
