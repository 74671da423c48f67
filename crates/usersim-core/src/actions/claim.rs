use super::{ActionContext, ActionPhase, Effect};
use crate::actor::Actor;
use crate::error::Result;

pub(super) async fn run(ctx: &ActionContext<'_>, actor: &mut Actor) -> Result<Effect> {
    let before = actor.refresh(ctx.client).await?;

    let tx = actor.claim_rewards(ctx.client).await?;
    tracing::info!(phase = %ActionPhase::Submitted, %tx, "claim submitted");

    ctx.await_balance_change("reward claim", actor.address(), before)
        .await?;
    let balance = actor.refresh(ctx.client).await?;
    tracing::info!(account = %actor.address(), %balance, "balance after claim");

    Ok(Effect::RewardsClaimed { tx, balance })
}
