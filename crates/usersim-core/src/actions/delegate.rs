use super::deposit::{bond_and_confirm, ledger_key};
use super::{ActionContext, ActionPhase, Effect};
use crate::actor::Actor;
use crate::error::Result;

/// Bond, wait for the bond, then delegate and wait again. The two waits are
/// not optional: delegating funds that are not yet bonded fails on chain.
pub(super) async fn run(
    ctx: &ActionContext<'_>,
    actor: &Actor,
    asset_id: u128,
    amount: u128,
    validator: &str,
) -> Result<Effect> {
    let (bond_tx, bonded) = bond_and_confirm(ctx, actor, asset_id, amount).await?;

    tracing::info!(account = %actor.address(), %validator, %amount, "delegating");
    let delegate_tx = actor.delegate(ctx.client, asset_id, validator, amount).await?;
    tracing::info!(phase = %ActionPhase::Submitted, tx = %delegate_tx, "delegation submitted");

    let key = ledger_key(actor, asset_id);
    let ledger = ctx.await_change("delegation", &key, &bonded).await?;
    if let Some(entry) = &ledger {
        tracing::info!(%entry, "delegation info");
    }

    Ok(Effect::Delegation {
        bond_tx,
        delegate_tx,
        ledger,
    })
}
