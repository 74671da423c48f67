//! The action catalogue.
//!
//! Every on-chain behaviour the harness can drive is one variant of
//! [`Action`]. Adding an action means adding a variant, and the compiler then
//! points at every dispatch site that has to handle it.
//!
//! An invocation moves through `Built → Submitted → Confirmed | Failed`.
//! There is no retrying state: a failure is logged, returned, and leaves the
//! chain however the submitted calls left it.

mod claim;
mod delegate;
mod deposit;
mod generate_child_users;
mod transfer_assets;

use crate::actor::Actor;
use crate::chain::{ChainClient, StorageKey, StorageValue, TxHash};
use crate::confirm::Confirmer;
use crate::error::{Result, SimError};
use crate::identity::AccountDeriver;
use crate::roster::{ChildUserRecord, RosterFile};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Derive `count` child accounts and append them to the roster.
    GenerateChildUsers { count: usize },
    /// Bond `amount` of `asset_id` as a staked deposit.
    DepositTnt { asset_id: u128, amount: u128 },
    /// Bond, then delegate the bonded amount to `validator`.
    DelegateTnt {
        asset_id: u128,
        amount: u128,
        validator: String,
    },
    ClaimRewards,
    /// Send `amount` of `asset_id` from the `seed_phrase` account to every
    /// rostered child, one at a time.
    TransferAssets {
        asset_id: u128,
        seed_phrase: String,
        amount: u128,
    },
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::GenerateChildUsers { .. } => "generateChildUsers",
            Action::DepositTnt { .. } => "depositTnt",
            Action::DelegateTnt { .. } => "delegateTnt",
            Action::ClaimRewards => "claimRewards",
            Action::TransferAssets { .. } => "transferAssets",
        }
    }

    /// Reject amounts whose transfer or bond would leave nothing on chain to
    /// confirm against.
    fn check_amount(&self) -> Result<()> {
        let amount = match self {
            Action::DepositTnt { amount, .. }
            | Action::DelegateTnt { amount, .. }
            | Action::TransferAssets { amount, .. } => *amount,
            Action::GenerateChildUsers { .. } | Action::ClaimRewards => return Ok(()),
        };
        if amount == 0 {
            return Err(SimError::ZeroAmount { what: self.name() });
        }
        Ok(())
    }

    /// Run the action against `actor`.
    pub async fn execute(self, ctx: &ActionContext<'_>, actor: &mut Actor) -> Result<Effect> {
        let name = self.name();
        tracing::debug!(action = name, phase = %ActionPhase::Built, "starting");
        let result = match self.check_amount() {
            Ok(()) => self.run(ctx, actor).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(effect) => {
                tracing::info!(action = name, phase = %ActionPhase::Confirmed, "done");
                Ok(effect)
            }
            Err(e) => {
                tracing::error!(action = name, phase = %ActionPhase::Failed, error = %e, "action failed");
                Err(e)
            }
        }
    }

    async fn run(self, ctx: &ActionContext<'_>, actor: &mut Actor) -> Result<Effect> {
        match self {
            Action::GenerateChildUsers { count } => generate_child_users::run(ctx, count).await,
            Action::DepositTnt { asset_id, amount } => {
                deposit::run(ctx, actor, asset_id, amount).await
            }
            Action::DelegateTnt {
                asset_id,
                amount,
                validator,
            } => delegate::run(ctx, actor, asset_id, amount, &validator).await,
            Action::ClaimRewards => claim::run(ctx, actor).await,
            Action::TransferAssets {
                asset_id,
                seed_phrase,
                amount,
            } => transfer_assets::run(ctx, asset_id, &seed_phrase, amount).await,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionPhase {
    Built,
    Submitted,
    Confirmed,
    Failed,
}

impl fmt::Display for ActionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionPhase::Built => "built",
            ActionPhase::Submitted => "submitted",
            ActionPhase::Confirmed => "confirmed",
            ActionPhase::Failed => "failed",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Effect
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct AssetTransferOutcome {
    pub recipient: String,
    pub tx: TxHash,
    pub balance: Option<StorageValue>,
}

/// What an action did, as observed on chain afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    ChildUsers {
        records: Vec<ChildUserRecord>,
        #[serde(skip)]
        actors: Vec<Actor>,
    },
    Deposit {
        tx: TxHash,
        ledger: Option<StorageValue>,
    },
    Delegation {
        bond_tx: TxHash,
        delegate_tx: TxHash,
        ledger: Option<StorageValue>,
    },
    RewardsClaimed {
        tx: TxHash,
        #[serde(with = "balance_string")]
        balance: u128,
    },
    AssetTransfers {
        source: String,
        transfers: Vec<AssetTransferOutcome>,
    },
}

mod balance_string {
    use serde::Serializer;

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }
}

fn show(value: &Option<StorageValue>) -> String {
    value
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| "<none>".to_string())
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::ChildUsers { records, .. } => {
                writeln!(f, "Generated {} child user(s):", records.len())?;
                for r in records {
                    writeln!(f, "  {}", r.legacy_line())?;
                }
                Ok(())
            }
            Effect::Deposit { tx, ledger } => {
                writeln!(f, "Deposit submitted with hash: {tx}")?;
                writeln!(f, "Delegation info: {}", show(ledger))
            }
            Effect::Delegation {
                bond_tx,
                delegate_tx,
                ledger,
            } => {
                writeln!(f, "Bond submitted with hash: {bond_tx}")?;
                writeln!(f, "Delegation submitted with hash: {delegate_tx}")?;
                writeln!(f, "Delegation info: {}", show(ledger))
            }
            Effect::RewardsClaimed { tx, balance } => {
                writeln!(f, "Claim submitted with hash: {tx}")?;
                writeln!(f, "Balance after claim: {balance}")
            }
            Effect::AssetTransfers { source, transfers } => {
                writeln!(f, "Source account: {source}")?;
                writeln!(f, "Completed {} transfer(s)", transfers.len())?;
                for t in transfers {
                    writeln!(
                        f,
                        "  {} <- {} (balance: {})",
                        t.recipient,
                        t.tx,
                        show(&t.balance)
                    )?;
                }
                Ok(())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// ActionContext
// ---------------------------------------------------------------------------

/// Everything an action borrows from the orchestrator for one invocation.
pub struct ActionContext<'a> {
    pub client: &'a dyn ChainClient,
    pub deriver: &'a AccountDeriver,
    pub confirmer: &'a Confirmer,
    pub roster: &'a RosterFile,
    pub inter_transfer_delay: Duration,
}

impl ActionContext<'_> {
    /// Wait until the value under `key` differs from `before`.
    pub(crate) async fn await_change(
        &self,
        what: &str,
        key: &StorageKey,
        before: &Option<StorageValue>,
    ) -> Result<Option<StorageValue>> {
        self.confirmer
            .wait_until(what, || self.client.query(key), |now| now != before)
            .await
    }

    /// Wait until `address`'s free balance differs from `before`.
    pub(crate) async fn await_balance_change(
        &self,
        what: &str,
        address: &str,
        before: u128,
    ) -> Result<u128> {
        self.confirmer
            .wait_until(what, || self.client.free_balance(address), |now| {
                *now != before
            })
            .await
    }
}
