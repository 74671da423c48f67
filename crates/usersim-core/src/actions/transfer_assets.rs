use super::{ActionContext, ActionPhase, AssetTransferOutcome, Effect};
use crate::actor::Actor;
use crate::chain::StorageKey;
use crate::error::Result;
use std::collections::HashSet;

/// Fan out `amount` of `asset_id` from the seed-phrase account to every
/// rostered child.
///
/// The source itself is skipped when it appears in the roster, since a
/// self-transfer leaves its asset account unchanged.
///
/// Transfers are strictly sequential. Each one is confirmed on the
/// recipient's asset account, then followed by `inter_transfer_delay` so the
/// source never signs two extrinsics against the same nonce.
pub(super) async fn run(
    ctx: &ActionContext<'_>,
    asset_id: u128,
    seed_phrase: &str,
    amount: u128,
) -> Result<Effect> {
    let source = Actor::new(ctx.deriver.derive(ctx.client, seed_phrase)?);
    let mut recipients = unique(ctx.roster.addresses()?);
    if let Some(pos) = recipients.iter().position(|a| a == source.address()) {
        recipients.remove(pos);
        tracing::info!(source = %source.address(), "source account is rostered; skipping it");
    }
    tracing::info!(
        source = %source.address(),
        count = recipients.len(),
        roster = %ctx.roster.path().display(),
        "loaded child users"
    );

    let mut transfers = Vec::with_capacity(recipients.len());
    for (i, recipient) in recipients.iter().enumerate() {
        if i > 0 {
            ctx.confirmer.pause(ctx.inter_transfer_delay).await?;
        }

        let key = StorageKey::AssetAccount {
            asset_id,
            who: recipient.clone(),
        };
        let outcome = async {
            let before = ctx.client.query(&key).await?;
            let tx = source
                .transfer_asset(ctx.client, asset_id, recipient, amount)
                .await?;
            tracing::info!(phase = %ActionPhase::Submitted, %recipient, %tx, "asset transfer submitted");
            let balance = ctx.await_change("asset transfer", &key, &before).await?;
            Ok::<_, crate::error::SimError>(AssetTransferOutcome {
                recipient: recipient.clone(),
                tx,
                balance,
            })
        }
        .await;

        match outcome {
            Ok(outcome) => {
                if let Some(balance) = &outcome.balance {
                    tracing::info!(%recipient, %balance, "new asset balance");
                }
                transfers.push(outcome);
            }
            Err(e) => {
                tracing::error!(%recipient, error = %e, "failed to transfer");
                return Err(e);
            }
        }
    }

    Ok(Effect::AssetTransfers {
        source: source.address().to_string(),
        transfers,
    })
}

/// Keep first occurrences only; a roster appended to by repeated runs lists
/// the same child more than once.
fn unique(addresses: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    addresses
        .into_iter()
        .filter(|a| seen.insert(a.clone()))
        .collect()
}
