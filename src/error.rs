use std::sync::Arc;

use thiserror::Error;

/// Reasons a motion cannot even be started.
///
/// These are raised synchronously by the control factories, before any
/// task is spawned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PreconditionError {
    #[error("Agent must be standing on the ground")]
    NotGrounded,

    #[error("Agent must be airborne")]
    NotAirborne,

    #[error("Agent is already gliding")]
    AlreadyGliding,

    #[error("Required equipment is not worn: {0}")]
    MissingEquipment(String),

    #[error("Expected {required} boost units in total, got {available}")]
    InsufficientResource { required: u32, available: u32 },
}

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(String),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    #[error("Motion interfered by an external force: {0}")]
    Interfered(String),

    #[error("Motion path is possibly blocked: {0}")]
    PathBlocked(String),

    #[error("Task has been interrupted")]
    Cancelled,

    #[error("Invalid task transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Task is already waiting on dependents")]
    DependentWaitOpen,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Discriminant of [`Error`], for callers that branch on the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Argument,
    Precondition,
    Interfered,
    PathBlocked,
    Cancelled,
    Timeout,
    Config,
    Io,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Io(_) | Error::NoHomeDir => ErrorKind::Io,
            Error::TomlParse(_) | Error::TomlSerialize(_) | Error::InvalidConfig(_) => {
                ErrorKind::Config
            }
            Error::InvalidArgument(_) => ErrorKind::Argument,
            Error::Precondition(_) => ErrorKind::Precondition,
            Error::Interfered(_) => ErrorKind::Interfered,
            Error::PathBlocked(_) => ErrorKind::PathBlocked,
            Error::Cancelled => ErrorKind::Cancelled,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::InvalidTransition { .. } | Error::DependentWaitOpen => ErrorKind::Internal,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::TomlParse(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::TomlSerialize(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
