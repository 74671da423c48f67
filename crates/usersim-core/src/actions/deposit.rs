use super::{ActionContext, ActionPhase, Effect};
use crate::actor::Actor;
use crate::chain::{StorageKey, StorageValue, TxHash};
use crate::error::Result;

pub(super) async fn run(
    ctx: &ActionContext<'_>,
    actor: &Actor,
    asset_id: u128,
    amount: u128,
) -> Result<Effect> {
    let (tx, ledger) = bond_and_confirm(ctx, actor, asset_id, amount).await?;
    Ok(Effect::Deposit { tx, ledger })
}

pub(super) fn ledger_key(actor: &Actor, asset_id: u128) -> StorageKey {
    StorageKey::DelegationLedger {
        asset_id,
        who: actor.address().to_string(),
    }
}

/// Submit a staked bond and wait until the actor's ledger entry changes.
pub(super) async fn bond_and_confirm(
    ctx: &ActionContext<'_>,
    actor: &Actor,
    asset_id: u128,
    amount: u128,
) -> Result<(TxHash, Option<StorageValue>)> {
    let key = ledger_key(actor, asset_id);
    let before = ctx.client.query(&key).await?;

    tracing::info!(account = %actor.address(), asset_id, %amount, "depositing");
    let tx = actor.deposit(ctx.client, asset_id, amount).await?;
    tracing::info!(phase = %ActionPhase::Submitted, %tx, "deposit submitted");

    let ledger = ctx.await_change("bond", &key, &before).await?;
    if let Some(entry) = &ledger {
        tracing::info!(%entry, "delegation info");
    }
    Ok((tx, ledger))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::{Action, Effect};
    use crate::chain::memory::InMemoryChain;
    use crate::chain::{Call, DelegationKind};
    use crate::error::SimError;

    #[tokio::test]
    async fn deposit_bonds_and_reports_ledger() {
        let h = Harness::new(InMemoryChain::new().with_endowment(1_000).with_inclusion_lag(2));
        let mut actor = h.actor("//TestUser1");
        let effect = Action::DepositTnt {
            asset_id: 0,
            amount: 400,
        }
        .execute(&h.ctx(), &mut actor)
        .await
        .unwrap();

        let Effect::Deposit { ledger, .. } = effect else {
            panic!("unexpected effect");
        };
        assert_eq!(
            ledger.unwrap().to_string(),
            "{ bonded: 400, delegations: [] }"
        );
        let calls = h.chain.calls().unwrap();
        assert_eq!(
            calls[0].call,
            Call::Bond {
                asset_id: 0,
                amount: 400,
                kind: DelegationKind::Staked
            }
        );
    }

    #[tokio::test]
    async fn rejected_bond_is_rethrown() {
        let h = Harness::new(InMemoryChain::new().with_endowment(1_000));
        h.chain.reject_next("bond", "bad origin").unwrap();
        let mut actor = h.actor("//TestUser1");
        let err = Action::DepositTnt {
            asset_id: 0,
            amount: 1,
        }
        .execute(&h.ctx(), &mut actor)
        .await
        .unwrap_err();
        assert!(matches!(err, SimError::Submission { .. }));
    }

    #[tokio::test]
    async fn bond_that_never_lands_times_out() {
        // Nothing endowed, so the bond fails to dispatch and the ledger
        // never changes.
        let h = Harness::new(InMemoryChain::new());
        let mut actor = h.actor("//TestUser1");
        let err = Action::DepositTnt {
            asset_id: 0,
            amount: 1,
        }
        .execute(&h.ctx(), &mut actor)
        .await
        .unwrap_err();
        assert!(matches!(err, SimError::ConfirmationTimeout { .. }));
        assert_eq!(h.chain.dispatch_errors().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeat_zero_deposit_is_rejected_without_waiting() {
        let h = Harness::new(InMemoryChain::new().with_endowment(1_000));
        let mut actor = h.actor("//TestUser1");
        let deposit = |amount| Action::DepositTnt {
            asset_id: 0,
            amount,
        };
        deposit(100).execute(&h.ctx(), &mut actor).await.unwrap();

        let err = deposit(0).execute(&h.ctx(), &mut actor).await.unwrap_err();
        assert!(matches!(err, SimError::ZeroAmount { what: "depositTnt" }));
        assert_eq!(h.chain.calls().unwrap().len(), 1);
    }
}
