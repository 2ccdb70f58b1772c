use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Dataset error: {0}")]
    Dataset(String),

    #[error("{0}")]
    Other(String),
}
