use std::path::PathBuf;

use thiserror::Error;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Mount operation failed: {0}")]
    Mount(String),

    #[error("Gadget operation failed: {0}")]
    Gadget(String),

    #[error("Descriptor file {} does not exist", .0.display())]
    DescriptorMissing(PathBuf),

    #[error("No valid images listed in {}", .0.display())]
    DescriptorEmpty(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;
