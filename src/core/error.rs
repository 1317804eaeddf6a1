use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Malformed gateway state: {0}")]
    MalformedState(String),

    #[error("Stale gateway state: {0}")]
    StaleState(String),

    #[error("Routing error: {0}")]
    RoutingError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

impl From<std::io::Error> for ClusterError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
