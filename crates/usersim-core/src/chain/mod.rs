//! The chain-client collaborator, seen through exactly three capabilities:
//! derive an identity, submit a signed call, and query a storage map.
//!
//! ```text
//! Action ──► Call ──► ChainClient::submit_signed ──► TxHash
//!   │
//!   └──────► StorageKey ──► ChainClient::query ──► StorageValue
//! ```
//!
//! Submission is fire-and-forget: a returned hash means the node accepted
//! the extrinsic into its pool, not that it was included. Observing the
//! effect is the caller's job (see [`crate::confirm`]).

pub mod memory;

use crate::error::Result;
use crate::identity::Identity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex-encoded extrinsic hash as returned by the node.
pub type TxHash = String;

// ---------------------------------------------------------------------------
// Calls
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegationKind {
    Staked,
    Nominated,
}

impl DelegationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DelegationKind::Staked => "Staked",
            DelegationKind::Nominated => "Nominated",
        }
    }
}

impl fmt::Display for DelegationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every extrinsic the harness knows how to build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum Call {
    /// Native balance transfer.
    Transfer { dest: String, amount: u128 },
    /// Lock `amount` of `asset_id` in the delegation ledger.
    Bond {
        asset_id: u128,
        amount: u128,
        kind: DelegationKind,
    },
    /// Assign already-bonded funds to an operator.
    Delegate {
        asset_id: u128,
        operator: String,
        amount: u128,
        kind: DelegationKind,
    },
    ClaimRewards,
    /// Transfer of a non-native asset.
    AssetTransfer {
        asset_id: u128,
        dest: String,
        amount: u128,
    },
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Transfer { .. } => "transfer",
            Call::Bond { .. } => "bond",
            Call::Delegate { .. } => "delegate",
            Call::ClaimRewards => "claim_rewards",
            Call::AssetTransfer { .. } => "asset_transfer",
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Point lookups into on-chain maps.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// `System.Account(who)`; read as free balance.
    Account { who: String },
    /// Delegation ledger keyed by (asset, account).
    DelegationLedger { asset_id: u128, who: String },
    /// `Assets.Account(asset, who)`.
    AssetAccount { asset_id: u128, who: String },
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKey::Account { who } => write!(f, "account({who})"),
            StorageKey::DelegationLedger { asset_id, who } => {
                write!(f, "ledger({asset_id}, {who})")
            }
            StorageKey::AssetAccount { asset_id, who } => {
                write!(f, "asset_account({asset_id}, {who})")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StorageValue {
    Balance(u128),
    /// Any other decoded value, rendered for display.
    Decoded(String),
}

impl fmt::Display for StorageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageValue::Balance(b) => write!(f, "{b}"),
            StorageValue::Decoded(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------------
// ChainClient
// ---------------------------------------------------------------------------

/// Async collaborator interface to a remote node.
///
/// ## Contract
///
/// - `derive_identity` is pure and deterministic in `uri`.
/// - `submit_signed` returns once the node accepted the extrinsic; it does
///   not wait for inclusion and never retries.
/// - `query` reads the best-known state; `Ok(None)` means the entry is absent.
#[async_trait]
pub trait ChainClient: Send + Sync {
    fn derive_identity(&self, uri: &str) -> Result<Identity>;

    async fn submit_signed(&self, call: &Call, signer: &Identity) -> Result<TxHash>;

    async fn query(&self, key: &StorageKey) -> Result<Option<StorageValue>>;

    /// Free native balance; absent accounts read as zero.
    async fn free_balance(&self, address: &str) -> Result<u128> {
        let key = StorageKey::Account {
            who: address.to_string(),
        };
        match self.query(&key).await? {
            Some(StorageValue::Balance(b)) => Ok(b),
            Some(StorageValue::Decoded(raw)) => Err(crate::error::SimError::Query {
                key: key.to_string(),
                reason: format!("expected a balance, got {raw}"),
            }),
            None => Ok(0),
        }
    }
}
