//! Mapping from core calls and storage keys onto dynamic, metadata-checked
//! payloads. Names follow the runtime's pallets; a mismatch against the
//! connected node's metadata surfaces as a submission or query error.

use crate::error::Result;
use crate::keys::parse_account;
use subxt::dynamic::{self, Value};
use subxt::storage::DynamicAddress;
use subxt::tx::DynamicPayload;
use usersim_core::chain::{Call, DelegationKind, StorageKey};

fn account(address: &str) -> Result<Value> {
    Ok(Value::from_bytes(parse_account(address)?.0))
}

/// `MultiAddress::Id(account)`, as taken by `transfer` style calls.
fn lookup(address: &str) -> Result<Value> {
    Ok(Value::unnamed_variant("Id", [account(address)?]))
}

fn asset(asset_id: u128) -> Value {
    Value::named_composite([("id", Value::u128(asset_id))])
}

fn kind(kind: DelegationKind) -> Value {
    Value::unnamed_variant(kind.as_str(), Vec::<Value>::new())
}

pub(crate) fn payload(call: &Call, signer: &str) -> Result<DynamicPayload> {
    let tx = match call {
        Call::Transfer { dest, amount } => dynamic::tx(
            "Balances",
            "transfer_keep_alive",
            vec![lookup(dest)?, Value::u128(*amount)],
        ),
        Call::Bond {
            asset_id,
            amount,
            kind: k,
        } => dynamic::tx(
            "MultiAssetDelegation",
            "bond",
            vec![
                asset(*asset_id),
                account(signer)?,
                Value::u128(*amount),
                kind(*k),
            ],
        ),
        Call::Delegate {
            asset_id,
            operator,
            amount,
            kind: k,
        } => dynamic::tx(
            "MultiAssetDelegation",
            "delegate",
            vec![
                asset(*asset_id),
                account(operator)?,
                Value::u128(*amount),
                kind(*k),
            ],
        ),
        Call::ClaimRewards => dynamic::tx("Rewards", "claim", Vec::<Value>::new()),
        Call::AssetTransfer {
            asset_id,
            dest,
            amount,
        } => dynamic::tx(
            "Assets",
            "transfer",
            vec![Value::u128(*asset_id), lookup(dest)?, Value::u128(*amount)],
        ),
    };
    Ok(tx)
}

pub(crate) fn storage(key: &StorageKey) -> Result<DynamicAddress<Vec<Value>>> {
    let address = match key {
        StorageKey::Account { who } => dynamic::storage("System", "Account", vec![account(who)?]),
        StorageKey::DelegationLedger { asset_id, who } => dynamic::storage(
            "MultiAssetDelegation",
            "Ledger",
            vec![Value::u128(*asset_id), account(who)?],
        ),
        StorageKey::AssetAccount { asset_id, who } => dynamic::storage(
            "Assets",
            "Account",
            vec![Value::u128(*asset_id), account(who)?],
        ),
    };
    Ok(address)
}
