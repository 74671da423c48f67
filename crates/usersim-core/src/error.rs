use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("invalid derivation path '{path}': {reason}")]
    InvalidDerivationPath { path: String, reason: String },

    #[error("chain client error: {0}")]
    Chain(String),

    #[error("transaction rejected for {account}: {reason}")]
    Submission { account: String, reason: String },

    #[error("query failed for {key}: {reason}")]
    Query { key: String, reason: String },

    #[error("timed out after {waited:?} waiting for {what}")]
    ConfirmationTimeout { what: String, waited: Duration },

    #[error("cancelled")]
    Cancelled,

    #[error("need at least 2 actors to simulate transfers, have {have}")]
    NotEnoughActors { have: usize },

    #[error("{what} amount must be greater than zero")]
    ZeroAmount { what: &'static str },

    #[error("no base actor: create users first")]
    NoBaseActor,

    #[error("unrecognised roster line {line}: {content}")]
    RosterParse { line: usize, content: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
