use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid camera section: {0}")]
    InvalidSection(String),

    #[error("Camera is already in use by another section ({0})")]
    Conflict(String),

    #[error("Camera device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Camera for {0} is off")]
    NotActive(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Speech failure: {0}")]
    SpeechFailure(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
