//! Live chain client for the simulation harness.
//!
//! Wraps a single `subxt` session behind [`ChainClient`]. Calls and storage
//! reads go through subxt's dynamic API, so the node's own metadata is the
//! only binding needed.
//!
//! Storage reads target the best block rather than the last finalized one,
//! so a confirmation wait sees an extrinsic as soon as it is included.

mod calls;
pub mod error;
pub mod keys;

use async_trait::async_trait;
use std::time::Duration;
use subxt::backend::legacy::LegacyRpcMethods;
use subxt::backend::rpc::RpcClient;
use subxt::ext::scale_value::At;
use subxt::{OnlineClient, PolkadotConfig};
use usersim_core::chain::{Call, ChainClient, StorageKey, StorageValue, TxHash};
use usersim_core::identity::Identity;
use usersim_core::SimError;

pub use error::TangleClientError;

pub struct TangleClient {
    api: OnlineClient<PolkadotConfig>,
    rpc: LegacyRpcMethods<PolkadotConfig>,
    url: String,
}

impl TangleClient {
    /// Open one session to `url` and wait for the node to hand over its
    /// metadata. Gives up after `ready_timeout`; there is no retry.
    pub async fn connect(url: &str, ready_timeout: Duration) -> error::Result<Self> {
        tracing::info!(%url, "connecting");
        let connecting = async {
            let rpc = if url.starts_with("ws://") {
                RpcClient::from_insecure_url(url).await?
            } else {
                RpcClient::from_url(url).await?
            };
            let api = OnlineClient::<PolkadotConfig>::from_rpc_client(rpc.clone()).await?;
            Ok::<_, subxt::Error>((api, LegacyRpcMethods::new(rpc)))
        };
        let (api, rpc) = tokio::time::timeout(ready_timeout, connecting)
            .await
            .map_err(|_| TangleClientError::NotReady {
                url: url.to_string(),
                waited: ready_timeout,
            })?
            .map_err(|source| TangleClientError::Connect {
                url: url.to_string(),
                source,
            })?;
        tracing::info!(
            %url,
            spec_version = api.runtime_version().spec_version,
            "connected"
        );
        Ok(Self {
            api,
            rpc,
            url: url.to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self, key: &StorageKey) -> error::Result<Option<StorageValue>> {
        let address = calls::storage(key)?;
        let best = self
            .rpc
            .chain_get_block_hash(None)
            .await?
            .ok_or_else(|| TangleClientError::Decode {
                key: key.to_string(),
                reason: "node reported no best block".to_string(),
            })?;
        let Some(thunk) = self
            .api
            .storage()
            .at(best)
            .fetch(&address)
            .await?
        else {
            return Ok(None);
        };
        let value = thunk.to_value().map_err(subxt::Error::from)?;

        let field = match key {
            StorageKey::Account { .. } => value.at("data").and_then(|d| d.at("free")),
            StorageKey::AssetAccount { .. } => value.at("balance"),
            StorageKey::DelegationLedger { .. } => {
                return Ok(Some(StorageValue::Decoded(value.to_string())));
            }
        };
        let balance = field
            .and_then(|v| v.as_u128())
            .ok_or_else(|| TangleClientError::Decode {
                key: key.to_string(),
                reason: format!("no balance field in {value}"),
            })?;
        Ok(Some(StorageValue::Balance(balance)))
    }
}

#[async_trait]
impl ChainClient for TangleClient {
    fn derive_identity(&self, uri: &str) -> usersim_core::Result<Identity> {
        Ok(keys::derive(uri)?)
    }

    async fn submit_signed(&self, call: &Call, signer: &Identity) -> usersim_core::Result<TxHash> {
        let submission = async {
            let tx = calls::payload(call, &signer.address)?;
            let signer = keys::HandleSigner(signer.signer());
            let hash = self.api.tx().sign_and_submit_default(&tx, &signer).await?;
            Ok::<_, TangleClientError>(format!("{hash:?}"))
        };
        submission.await.map_err(|e| SimError::Submission {
            account: signer.address.clone(),
            reason: e.to_string(),
        })
    }

    async fn query(&self, key: &StorageKey) -> usersim_core::Result<Option<StorageValue>> {
        self.fetch(key).await.map_err(|e| match e {
            TangleClientError::Decode { .. } => e.into(),
            other => SimError::Query {
                key: key.to_string(),
                reason: other.to_string(),
            },
        })
    }
}
