use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Invalid order: {0}")]
    InvalidOrder(#[from] core_types::CoreError),

    #[error("No instrument metadata for symbol: {0}")]
    UnknownSymbol(String),

    #[error("Amount out of range: {0}")]
    Overflow(String),

    #[error("Configuration error: {0}")]
    Config(#[from] configuration::ConfigError),
}
