use std::time::Duration;
use thiserror::Error;
use usersim_core::SimError;

#[derive(Debug, Error)]
pub enum TangleClientError {
    #[error("cannot connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: subxt::Error,
    },

    #[error("node at {url} not ready after {waited:?}")]
    NotReady { url: String, waited: Duration },

    #[error("invalid secret URI '{uri}': {reason}")]
    SecretUri { uri: String, reason: String },

    #[error("invalid account address '{0}'")]
    Address(String),

    #[error("unexpected value for {key}: {reason}")]
    Decode { key: String, reason: String },

    #[error(transparent)]
    Subxt(#[from] subxt::Error),
}

impl From<TangleClientError> for SimError {
    fn from(e: TangleClientError) -> Self {
        match e {
            TangleClientError::SecretUri { uri, reason } => SimError::InvalidDerivationPath {
                path: uri,
                reason,
            },
            TangleClientError::Decode { key, reason } => SimError::Query { key, reason },
            other => SimError::Chain(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, TangleClientError>;
