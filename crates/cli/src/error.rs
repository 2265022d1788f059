#[derive(Debug, thiserror::Error)]
pub(crate) enum Error {
    #[error("{0}")]
    Generic(String),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("VM error: {0}")]
    VmError(#[from] meridian_vm::Error),
    #[error("Config error: {0}")]
    ConfigError(#[from] meridian_config::error::Error),
}
