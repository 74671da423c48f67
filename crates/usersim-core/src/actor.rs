use crate::chain::{Call, ChainClient, DelegationKind, TxHash};
use crate::error::Result;
use crate::identity::Identity;
use serde::Serialize;

/// A derived identity plus its cached view of on-chain free balance.
///
/// `balance` is only ever written by [`Actor::refresh`]; it is never assumed
/// to be fresh after a submission.
#[derive(Debug, Clone)]
pub struct Actor {
    identity: Identity,
    balance: u128,
}

/// Serializable snapshot of an actor for reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorSummary {
    pub address: String,
    pub derivation_path: String,
    pub balance: String,
}

impl Actor {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            balance: 0,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn address(&self) -> &str {
        &self.identity.address
    }

    /// Last observed free balance.
    pub fn balance(&self) -> u128 {
        self.balance
    }

    pub fn summary(&self) -> ActorSummary {
        ActorSummary {
            address: self.identity.address.clone(),
            derivation_path: self.identity.derivation_path.clone(),
            balance: self.balance.to_string(),
        }
    }

    /// Overwrite the cached balance with the chain's current free balance.
    pub async fn refresh(&mut self, client: &dyn ChainClient) -> Result<u128> {
        self.balance = client.free_balance(&self.identity.address).await?;
        Ok(self.balance)
    }

    // ── capabilities ─────────────────────────────────────────────────────

    pub async fn send(
        &self,
        client: &dyn ChainClient,
        recipient: &str,
        amount: u128,
    ) -> Result<TxHash> {
        let call = Call::Transfer {
            dest: recipient.to_string(),
            amount,
        };
        self.submit(client, call).await
    }

    /// Bond `amount` of `asset_id` as a staked deposit.
    pub async fn deposit(
        &self,
        client: &dyn ChainClient,
        asset_id: u128,
        amount: u128,
    ) -> Result<TxHash> {
        let call = Call::Bond {
            asset_id,
            amount,
            kind: DelegationKind::Staked,
        };
        self.submit(client, call).await
    }

    /// Delegate already-bonded funds to `operator`.
    pub async fn delegate(
        &self,
        client: &dyn ChainClient,
        asset_id: u128,
        operator: &str,
        amount: u128,
    ) -> Result<TxHash> {
        let call = Call::Delegate {
            asset_id,
            operator: operator.to_string(),
            amount,
            kind: DelegationKind::Staked,
        };
        self.submit(client, call).await
    }

    pub async fn claim_rewards(&self, client: &dyn ChainClient) -> Result<TxHash> {
        self.submit(client, Call::ClaimRewards).await
    }

    pub async fn transfer_asset(
        &self,
        client: &dyn ChainClient,
        asset_id: u128,
        recipient: &str,
        amount: u128,
    ) -> Result<TxHash> {
        let call = Call::AssetTransfer {
            asset_id,
            dest: recipient.to_string(),
            amount,
        };
        self.submit(client, call).await
    }

    async fn submit(&self, client: &dyn ChainClient, call: Call) -> Result<TxHash> {
        match client.submit_signed(&call, &self.identity).await {
            Ok(hash) => {
                tracing::info!(account = %self.address(), call = call.name(), %hash, "submitted");
                Ok(hash)
            }
            Err(e) => {
                tracing::error!(account = %self.address(), call = call.name(), error = %e, "submission failed");
                Err(e)
            }
        }
    }
}
