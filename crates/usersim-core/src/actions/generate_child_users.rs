use super::{ActionContext, Effect};
use crate::actor::Actor;
use crate::error::Result;
use crate::roster::ChildUserRecord;

/// Derive `count` children, record each in the roster as soon as its
/// balance is known, and hand the new actors back.
pub(super) async fn run(ctx: &ActionContext<'_>, count: usize) -> Result<Effect> {
    let mut records = Vec::with_capacity(count);
    let mut actors = Vec::with_capacity(count);

    for index in 0..count {
        let identity = ctx.deriver.child(ctx.client, index)?;
        let mut actor = Actor::new(identity);
        let balance = actor.refresh(ctx.client).await?;

        let record = ChildUserRecord {
            index,
            address: actor.address().to_string(),
            seed: actor.identity().derivation_path.clone(),
            balance_at_creation: balance,
        };
        ctx.roster.append(&record)?;
        tracing::info!("{}", record.legacy_line());

        records.push(record);
        actors.push(actor);
    }

    Ok(Effect::ChildUsers { records, actors })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Harness;
    use super::super::{Action, Effect};
    use crate::chain::memory::InMemoryChain;
    use std::collections::HashSet;

    #[tokio::test]
    async fn every_generated_address_is_recoverable_from_the_roster() {
        for n in [0usize, 1, 7] {
            let h = Harness::new(InMemoryChain::new().with_endowment(5));
            let mut base = h.actor("//User0");
            let effect = Action::GenerateChildUsers { count: n }
                .execute(&h.ctx(), &mut base)
                .await
                .unwrap();

            let Effect::ChildUsers { records, actors } = effect else {
                panic!("unexpected effect");
            };
            assert_eq!(records.len(), n);
            assert_eq!(actors.len(), n);

            let generated: HashSet<String> =
                actors.iter().map(|a| a.address().to_string()).collect();
            let recovered: HashSet<String> = h.roster.addresses().unwrap().into_iter().collect();
            assert_eq!(generated, recovered, "roster mismatch for n = {n}");
        }
    }

    #[tokio::test]
    async fn records_carry_path_and_balance() {
        let h = Harness::new(InMemoryChain::new().with_endowment(42));
        let mut base = h.actor("//User0");
        Action::GenerateChildUsers { count: 2 }
            .execute(&h.ctx(), &mut base)
            .await
            .unwrap();

        let loaded = h.roster.load().unwrap();
        assert_eq!(loaded[1].index, 1);
        assert_eq!(loaded[1].seed, "//User/Child/1");
        assert_eq!(loaded[1].balance_at_creation, 42);
        assert!(h.chain.calls().unwrap().is_empty());
    }
}
