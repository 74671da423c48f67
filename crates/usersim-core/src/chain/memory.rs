//! In-memory chain used by tests and the CLI's `--dev` mode.
//!
//! Models just enough of a node for the harness: native balances, per-asset
//! balances, a delegation ledger and a rewards payout. Submitted calls sit in
//! a pending queue and are included after `inclusion_lag` subsequent
//! queries, so callers must observe effects rather than assume them.
//! Chain rules are enforced at inclusion; a failing call is recorded in
//! [`InMemoryChain::dispatch_errors`] and has no effect, exactly like an
//! extrinsic that is included but fails to dispatch.

use super::{Call, ChainClient, StorageKey, StorageValue, TxHash};
use crate::error::{Result, SimError};
use crate::identity::{Identity, SigningHandle, TxSigner};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

struct MemorySigner {
    secret: [u8; 32],
    public: [u8; 32],
}

impl MemorySigner {
    fn from_uri(uri: &str) -> Self {
        let secret: [u8; 32] = Sha256::new()
            .chain_update(b"usersim/secret/")
            .chain_update(uri.as_bytes())
            .finalize()
            .into();
        let public: [u8; 32] = Sha256::digest(secret).into();
        Self { secret, public }
    }
}

impl TxSigner for MemorySigner {
    fn public_key(&self) -> [u8; 32] {
        self.public
    }

    fn sign(&self, payload: &[u8]) -> [u8; 64] {
        let lo = Sha256::new()
            .chain_update(self.secret)
            .chain_update(payload)
            .finalize();
        let hi = Sha256::new()
            .chain_update(self.public)
            .chain_update(payload)
            .finalize();
        let mut sig = [0u8; 64];
        sig[..32].copy_from_slice(&lo);
        sig[32..].copy_from_slice(&hi);
        sig
    }
}

/// Address format of the in-memory chain: `0x` + first 20 bytes of the key.
pub fn address_of(public: &[u8; 32]) -> String {
    format!("0x{}", hex::encode(&public[..20]))
}

fn validate_uri(uri: &str) -> Result<()> {
    let reason = if uri.trim().is_empty() {
        "empty secret URI"
    } else if uri.ends_with('/') {
        "empty derivation junction"
    } else {
        return Ok(());
    };
    Err(SimError::InvalidDerivationPath {
        path: uri.to_string(),
        reason: reason.to_string(),
    })
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Delegation ledger entry for one (asset, account) pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerEntry {
    pub bonded: u128,
    pub delegations: BTreeMap<String, u128>,
}

impl LedgerEntry {
    pub fn delegated(&self) -> u128 {
        self.delegations.values().sum()
    }
}

impl fmt::Display for LedgerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{ bonded: {}, delegations: [", self.bonded)?;
        for (i, (operator, amount)) in self.delegations.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{operator}: {amount}")?;
        }
        f.write_str("] }")
    }
}

/// A submitted call, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub signer: String,
    pub call: Call,
    pub hash: TxHash,
}

struct Pending {
    ready_at: u64,
    signer: String,
    call: Call,
}

#[derive(Default)]
struct ChainState {
    balances: HashMap<String, u128>,
    assets: HashMap<(u128, String), u128>,
    ledger: HashMap<(u128, String), LedgerEntry>,
    pending: VecDeque<Pending>,
    tick: u64,
    calls: Vec<RecordedCall>,
    dispatch_errors: Vec<String>,
    rejections: VecDeque<(String, String)>,
    fail_queries: Option<String>,
}

// ---------------------------------------------------------------------------
// InMemoryChain
// ---------------------------------------------------------------------------

pub struct InMemoryChain {
    state: Mutex<ChainState>,
    endowment: Option<u128>,
    asset_endowment: Option<u128>,
    reward: u128,
    inclusion_lag: u64,
}

impl Default for InMemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryChain {
    /// Empty chain: unknown accounts hold nothing, calls apply on submission.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ChainState::default()),
            endowment: None,
            asset_endowment: None,
            reward: 0,
            inclusion_lag: 0,
        }
    }

    /// Chain for `--dev` runs: every account starts funded in the native
    /// token and every asset, claims pay a fixed reward, and inclusion takes
    /// one poll.
    pub fn dev(endowment: u128, reward: u128) -> Self {
        Self::new()
            .with_endowment(endowment)
            .with_asset_endowment(endowment)
            .with_reward(reward)
            .with_inclusion_lag(1)
    }

    pub fn with_endowment(mut self, amount: u128) -> Self {
        self.endowment = Some(amount);
        self
    }

    pub fn with_asset_endowment(mut self, amount: u128) -> Self {
        self.asset_endowment = Some(amount);
        self
    }

    pub fn with_reward(mut self, amount: u128) -> Self {
        self.reward = amount;
        self
    }

    /// Number of queries that must happen before a submitted call applies.
    pub fn with_inclusion_lag(mut self, queries: u64) -> Self {
        self.inclusion_lag = queries;
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, ChainState>> {
        self.state
            .lock()
            .map_err(|e| SimError::Chain(format!("chain state poisoned: {e}")))
    }

    // ── test and dev controls ────────────────────────────────────────────

    pub fn set_balance(&self, address: &str, amount: u128) -> Result<()> {
        self.lock()?.balances.insert(address.to_string(), amount);
        Ok(())
    }

    pub fn set_asset_balance(&self, asset_id: u128, address: &str, amount: u128) -> Result<()> {
        self.lock()?
            .assets
            .insert((asset_id, address.to_string()), amount);
        Ok(())
    }

    /// Reject the next submission of `call_name` with `reason`.
    pub fn reject_next(&self, call_name: &str, reason: &str) -> Result<()> {
        self.lock()?
            .rejections
            .push_back((call_name.to_string(), reason.to_string()));
        Ok(())
    }

    /// Make every subsequent query fail with `reason`.
    pub fn fail_queries(&self, reason: &str) -> Result<()> {
        self.lock()?.fail_queries = Some(reason.to_string());
        Ok(())
    }

    pub fn calls(&self) -> Result<Vec<RecordedCall>> {
        Ok(self.lock()?.calls.clone())
    }

    pub fn dispatch_errors(&self) -> Result<Vec<String>> {
        Ok(self.lock()?.dispatch_errors.clone())
    }

    pub fn ledger(&self, asset_id: u128, address: &str) -> Result<Option<LedgerEntry>> {
        Ok(self
            .lock()?
            .ledger
            .get(&(asset_id, address.to_string()))
            .cloned())
    }

    pub fn asset_balance(&self, asset_id: u128, address: &str) -> Result<u128> {
        let state = self.lock()?;
        Ok(self.asset_of(&state, asset_id, address))
    }

    // ── internals ────────────────────────────────────────────────────────

    fn balance_of(&self, state: &ChainState, address: &str) -> u128 {
        state
            .balances
            .get(address)
            .copied()
            .or(self.endowment)
            .unwrap_or(0)
    }

    fn asset_of(&self, state: &ChainState, asset_id: u128, address: &str) -> u128 {
        state
            .assets
            .get(&(asset_id, address.to_string()))
            .copied()
            .or(self.asset_endowment)
            .unwrap_or(0)
    }

    fn include_ready(&self, state: &mut ChainState) {
        while state
            .pending
            .front()
            .is_some_and(|p| p.ready_at <= state.tick)
        {
            let Some(pending) = state.pending.pop_front() else {
                break;
            };
            if let Err(reason) = self.dispatch(state, &pending.signer, &pending.call) {
                tracing::warn!(
                    signer = %pending.signer,
                    call = pending.call.name(),
                    %reason,
                    "dispatch failed"
                );
                state
                    .dispatch_errors
                    .push(format!("{}: {reason}", pending.call.name()));
            }
        }
    }

    fn dispatch(
        &self,
        state: &mut ChainState,
        signer: &str,
        call: &Call,
    ) -> std::result::Result<(), String> {
        match call {
            Call::Transfer { dest, amount } => {
                let from = self.balance_of(state, signer);
                let remaining = from
                    .checked_sub(*amount)
                    .ok_or_else(|| format!("insufficient balance: have {from}, need {amount}"))?;
                state.balances.insert(signer.to_string(), remaining);
                let to = self.balance_of(state, dest);
                state.balances.insert(dest.clone(), to.saturating_add(*amount));
            }
            Call::Bond {
                asset_id, amount, ..
            } => {
                let from = self.balance_of(state, signer);
                let remaining = from
                    .checked_sub(*amount)
                    .ok_or_else(|| format!("insufficient balance to bond: have {from}"))?;
                state.balances.insert(signer.to_string(), remaining);
                let entry = state
                    .ledger
                    .entry((*asset_id, signer.to_string()))
                    .or_default();
                entry.bonded = entry.bonded.saturating_add(*amount);
            }
            Call::Delegate {
                asset_id,
                operator,
                amount,
                ..
            } => {
                let entry = state
                    .ledger
                    .get_mut(&(*asset_id, signer.to_string()))
                    .ok_or_else(|| "nothing bonded for this asset".to_string())?;
                let free = entry.bonded.saturating_sub(entry.delegated());
                if free < *amount {
                    return Err(format!("insufficient bonded funds: {free} undelegated"));
                }
                let slot = entry.delegations.entry(operator.clone()).or_default();
                *slot = slot.saturating_add(*amount);
            }
            Call::ClaimRewards => {
                if self.reward == 0 {
                    return Err("no rewards to claim".to_string());
                }
                let balance = self.balance_of(state, signer);
                state
                    .balances
                    .insert(signer.to_string(), balance.saturating_add(self.reward));
            }
            Call::AssetTransfer {
                asset_id,
                dest,
                amount,
            } => {
                let from = self.asset_of(state, *asset_id, signer);
                let remaining = from.checked_sub(*amount).ok_or_else(|| {
                    format!("insufficient balance of asset {asset_id}: have {from}")
                })?;
                state
                    .assets
                    .insert((*asset_id, signer.to_string()), remaining);
                let to = self.asset_of(state, *asset_id, dest);
                state
                    .assets
                    .insert((*asset_id, dest.clone()), to.saturating_add(*amount));
            }
        }
        Ok(())
    }

    fn tx_hash(index: usize, signer: &str, call: &Call) -> TxHash {
        let digest = Sha256::new()
            .chain_update((index as u64).to_be_bytes())
            .chain_update(signer.as_bytes())
            .chain_update(format!("{call:?}").as_bytes())
            .finalize();
        format!("0x{}", hex::encode(digest))
    }
}

#[async_trait]
impl ChainClient for InMemoryChain {
    fn derive_identity(&self, uri: &str) -> Result<Identity> {
        validate_uri(uri)?;
        let signer = MemorySigner::from_uri(uri);
        let address = address_of(&signer.public);
        Ok(Identity::new(address, uri, SigningHandle::new(signer)))
    }

    async fn submit_signed(&self, call: &Call, signer: &Identity) -> Result<TxHash> {
        let mut state = self.lock()?;

        if let Some(pos) = state
            .rejections
            .iter()
            .position(|(name, _)| name == call.name())
        {
            let (_, reason) = state.rejections.remove(pos).unwrap_or_default();
            return Err(SimError::Submission {
                account: signer.address.clone(),
                reason,
            });
        }

        let hash = Self::tx_hash(state.calls.len(), &signer.address, call);
        state.calls.push(RecordedCall {
            signer: signer.address.clone(),
            call: call.clone(),
            hash: hash.clone(),
        });
        let ready_at = state.tick + self.inclusion_lag;
        state.pending.push_back(Pending {
            ready_at,
            signer: signer.address.clone(),
            call: call.clone(),
        });
        self.include_ready(&mut state);
        Ok(hash)
    }

    async fn query(&self, key: &StorageKey) -> Result<Option<StorageValue>> {
        let mut state = self.lock()?;
        if let Some(reason) = &state.fail_queries {
            return Err(SimError::Query {
                key: key.to_string(),
                reason: reason.clone(),
            });
        }

        state.tick += 1;
        self.include_ready(&mut state);

        let value = match key {
            StorageKey::Account { who } => {
                if state.balances.contains_key(who) || self.endowment.is_some() {
                    Some(StorageValue::Balance(self.balance_of(&state, who)))
                } else {
                    None
                }
            }
            StorageKey::DelegationLedger { asset_id, who } => state
                .ledger
                .get(&(*asset_id, who.clone()))
                .map(|entry| StorageValue::Decoded(entry.to_string())),
            StorageKey::AssetAccount { asset_id, who } => {
                if state.assets.contains_key(&(*asset_id, who.clone()))
                    || self.asset_endowment.is_some()
                {
                    Some(StorageValue::Balance(self.asset_of(&state, *asset_id, who)))
                } else {
                    None
                }
            }
        };
        Ok(value)
    }
}
