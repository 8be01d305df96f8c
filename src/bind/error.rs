use alloy::primitives::Bytes;
use alloy::transports::TransportError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Capability a binding may have been constructed without.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Caller,
    Transactor,
    Filterer,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Caller => write!(f, "caller"),
            Capability::Transactor => write!(f, "transactor"),
            Capability::Filterer => write!(f, "filterer"),
        }
    }
}

/// Errors raised by a blockchain client capability.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("execution reverted (data: {0})")]
    Reverted(Bytes),

    #[error("{0}")]
    Other(String),
}

impl BackendError {
    pub fn other(msg: impl Into<String>) -> Self {
        BackendError::Other(msg.into())
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid contract ABI: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("method '{0}' not found in contract ABI")]
    UnknownMethod(String),

    #[error("event '{0}' not found in contract ABI")]
    UnknownEvent(String),

    #[error("failed to encode arguments for '{name}': {reason}")]
    Encode { name: String, reason: String },

    #[error("call to '{method}' failed: {source}")]
    Call {
        method: String,
        #[source]
        source: BackendError,
    },

    #[error("no contract code at given address")]
    NoCode,

    #[error("failed to decode '{name}': {reason}")]
    Decode { name: String, reason: String },

    #[error("failed to submit transaction: {0}")]
    Submission(#[source] BackendError),

    #[error("log subscription failed: {0}")]
    Subscription(#[source] BackendError),

    #[error("no event signature")]
    NoEventSignature,

    #[error("event signature mismatch")]
    EventSignatureMismatch,

    #[error("binding was constructed without a {0}")]
    MissingCapability(Capability),

    #[error("invalid deployment bytecode: {0}")]
    Bytecode(#[from] hex::FromHexError),

    #[error("malformed contract artifact: {0}")]
    MalformedArtifact(#[source] serde_json::Error),

    #[error("failed to read artifact {path:?}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn encode(name: &str, reason: impl ToString) -> Self {
        Error::Encode {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn decode(name: &str, reason: impl ToString) -> Self {
        Error::Decode {
            name: name.to_string(),
            reason: reason.to_string(),
        }
    }
}
