//! Simulation orchestrator: owns the session, the actor roster and the
//! dispatch of actions against it.

use crate::actions::{Action, ActionContext, Effect};
use crate::actor::{Actor, ActorSummary};
use crate::chain::{ChainClient, TxHash};
use crate::config::SimConfig;
use crate::confirm::{CancelToken, Confirmer};
use crate::error::{Result, SimError};
use crate::identity::AccountDeriver;
use crate::roster::RosterFile;
use rand::Rng;
use serde::Serialize;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One simulated transfer and how it ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    pub from: String,
    pub to: String,
    #[serde(serialize_with = "as_string")]
    pub amount: u128,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<TxHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TransferRecord {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SimulationReport {
    pub transfers: Vec<TransferRecord>,
    /// Every actor's cached balance after the run.
    pub actors: Vec<ActorSummary>,
}

impl SimulationReport {
    pub fn succeeded(&self) -> usize {
        self.transfers.iter().filter(|t| t.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.transfers.len() - self.succeeded()
    }
}

fn as_string<S: serde::Serializer>(value: &u128, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_str(&value.to_string())
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

pub struct Simulation {
    client: Arc<dyn ChainClient>,
    config: SimConfig,
    deriver: AccountDeriver,
    confirmer: Confirmer,
    roster: RosterFile,
    actors: Vec<Actor>,
    next_user: usize,
}

impl Simulation {
    pub fn new(client: Arc<dyn ChainClient>, config: SimConfig, cancel: CancelToken) -> Self {
        let confirmer = Confirmer::new(config.confirm_timeout(), config.poll_interval(), cancel);
        Self {
            client,
            deriver: AccountDeriver::new(config.base_seed.clone()),
            roster: RosterFile::new(config.roster_path.clone()),
            confirmer,
            config,
            actors: Vec::new(),
            next_user: 0,
        }
    }

    pub fn client(&self) -> &dyn ChainClient {
        self.client.as_ref()
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn roster(&self) -> &RosterFile {
        &self.roster
    }

    pub fn actors(&self) -> &[Actor] {
        &self.actors
    }

    /// Derive `count` more `//User{i}` actors, continuing from the last index
    /// this simulation handed out, and refresh each.
    pub async fn create_users(&mut self, count: usize) -> Result<&[Actor]> {
        let start = self.actors.len();
        for _ in 0..count {
            let identity = self.deriver.user(self.client.as_ref(), self.next_user)?;
            let mut actor = Actor::new(identity);
            actor.refresh(self.client.as_ref()).await?;
            tracing::info!(
                "Created user {} with address {} and balance {}",
                actor.identity().derivation_path,
                actor.address(),
                actor.balance()
            );
            self.actors.push(actor);
            self.next_user += 1;
        }
        Ok(&self.actors[start..])
    }

    /// Derive an actor outside the `//User{i}` family, e.g. `//TestUser1`.
    pub async fn actor_from_uri(&self, uri: &str) -> Result<Actor> {
        let mut actor = Actor::new(self.deriver.derive(self.client.as_ref(), uri)?);
        actor.refresh(self.client.as_ref()).await?;
        Ok(actor)
    }

    /// The first created actor, creating it if none exists yet.
    pub async fn base_actor(&mut self) -> Result<&Actor> {
        if self.actors.is_empty() {
            self.create_users(1).await?;
        }
        self.actors.first().ok_or(SimError::NoBaseActor)
    }

    /// Run one action against the base actor.
    pub async fn dispatch(&mut self, action: Action) -> Result<Effect> {
        let mut actor = self.base_actor().await?.clone();
        let effect = self.execute_as(&mut actor, action).await?;
        self.actors[0] = actor;
        Ok(effect)
    }

    /// Run one action against an arbitrary actor. Children produced by
    /// `GenerateChildUsers` join the in-memory roster.
    pub async fn execute_as(&mut self, actor: &mut Actor, action: Action) -> Result<Effect> {
        let ctx = ActionContext {
            client: self.client.as_ref(),
            deriver: &self.deriver,
            confirmer: &self.confirmer,
            roster: &self.roster,
            inter_transfer_delay: self.config.inter_transfer_delay(),
        };
        let effect = action.execute(&ctx, actor).await?;
        if let Effect::ChildUsers { actors, .. } = &effect {
            self.actors.extend(actors.iter().cloned());
        }
        Ok(effect)
    }

    /// Perform `n` transfers of `transfer_amount` between random distinct
    /// actors. A failed transfer is recorded and the run moves on;
    /// cancellation stops it.
    pub async fn simulate_transactions<R: Rng + ?Sized>(
        &mut self,
        n: usize,
        rng: &mut R,
    ) -> Result<SimulationReport> {
        let have = self.actors.len();
        if have < 2 {
            return Err(SimError::NotEnoughActors { have });
        }
        if self.config.transfer_amount == 0 {
            return Err(SimError::ZeroAmount { what: "transfer" });
        }

        let mut report = SimulationReport::default();
        for round in 1..=n {
            let from = rng.gen_range(0..have);
            let mut to = rng.gen_range(0..have);
            while to == from {
                to = rng.gen_range(0..have);
            }

            let mut record = TransferRecord {
                from: self.actors[from].address().to_string(),
                to: self.actors[to].address().to_string(),
                amount: self.config.transfer_amount,
                hash: None,
                error: None,
            };
            tracing::info!(
                "Transaction {round}: {} sending {} to {}",
                record.from,
                record.amount,
                record.to
            );

            match self.transfer(from, to, &mut record.hash).await {
                Ok(()) => {}
                Err(SimError::Cancelled) => return Err(SimError::Cancelled),
                Err(e) => {
                    tracing::warn!(round, from = %record.from, to = %record.to, error = %e, "transfer failed");
                    record.error = Some(e.to_string());
                }
            }
            report.transfers.push(record);
        }

        report.actors = self.actors.iter().map(Actor::summary).collect();
        Ok(report)
    }

    async fn transfer(&mut self, from: usize, to: usize, hash: &mut Option<TxHash>) -> Result<()> {
        let client = self.client.as_ref();
        let amount = self.config.transfer_amount;
        let recipient = self.actors[to].address().to_string();

        let before = client.free_balance(&recipient).await?;
        let tx = self.actors[from].send(client, &recipient, amount).await?;
        *hash = Some(tx);

        self.confirmer
            .wait_until(
                "transfer",
                || client.free_balance(&recipient),
                |now| *now != before,
            )
            .await?;

        let sent = self.actors[from].refresh(client).await?;
        let received = self.actors[to].refresh(client).await?;
        tracing::info!(
            sender_balance = %sent,
            recipient_balance = %received,
            "transfer confirmed"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::memory::InMemoryChain;
    use crate::config::UNIT;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> SimConfig {
        SimConfig {
            roster_path: dir.path().join("generated_users.jsonl"),
            confirm_timeout_secs: 1,
            poll_interval_ms: 1,
            inter_transfer_delay_ms: 0,
            ..SimConfig::default()
        }
    }

    fn simulation(chain: &Arc<InMemoryChain>, dir: &TempDir) -> Simulation {
        let client: Arc<dyn ChainClient> = chain.clone();
        Simulation::new(client, config(dir), CancelToken::new())
    }

    #[tokio::test]
    async fn two_actor_transfer_updates_both_cached_balances() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new().with_inclusion_lag(1));
        let u0 = chain.derive_identity("//User0").unwrap();
        let u1 = chain.derive_identity("//User1").unwrap();
        chain.set_balance(&u0.address, 100 * UNIT).unwrap();
        chain.set_balance(&u1.address, 50 * UNIT).unwrap();

        let mut sim = simulation(&chain, &dir);
        sim.create_users(2).await.unwrap();
        assert_eq!(sim.actors()[0].balance(), 100 * UNIT);
        assert_eq!(sim.actors()[1].balance(), 50 * UNIT);

        let mut rng = StdRng::seed_from_u64(7);
        let report = sim.simulate_transactions(1, &mut rng).await.unwrap();
        assert_eq!(report.transfers.len(), 1);
        let t = &report.transfers[0];
        assert!(t.succeeded());
        assert_ne!(t.from, t.to);

        let (sender_before, recipient_before) = if t.from == u0.address {
            (100 * UNIT, 50 * UNIT)
        } else {
            assert_eq!(t.from, u1.address);
            (50 * UNIT, 100 * UNIT)
        };
        let sender = sim.actors().iter().find(|a| a.address() == t.from).unwrap();
        let recipient = sim.actors().iter().find(|a| a.address() == t.to).unwrap();
        assert_eq!(sender.balance(), sender_before - UNIT);
        assert_eq!(recipient.balance(), recipient_before + UNIT);
    }

    #[tokio::test]
    async fn simulated_transfers_never_target_the_sender() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new().with_endowment(1_000 * UNIT));
        let mut sim = simulation(&chain, &dir);
        sim.create_users(3).await.unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let report = sim.simulate_transactions(25, &mut rng).await.unwrap();
        assert_eq!(report.transfers.len(), 25);
        assert!(report.transfers.iter().all(|t| t.from != t.to));
        assert_eq!(report.failed(), 0);

        for call in chain.calls().unwrap() {
            if let crate::chain::Call::Transfer { dest, .. } = call.call {
                assert_ne!(dest, call.signer);
            }
        }
    }

    #[tokio::test]
    async fn fewer_than_two_actors_is_rejected() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new().with_endowment(UNIT));
        let mut sim = simulation(&chain, &dir);
        let mut rng = StdRng::seed_from_u64(1);

        let err = sim.simulate_transactions(1, &mut rng).await.unwrap_err();
        assert!(matches!(err, SimError::NotEnoughActors { have: 0 }));

        sim.create_users(1).await.unwrap();
        let err = sim.simulate_transactions(1, &mut rng).await.unwrap_err();
        assert!(matches!(err, SimError::NotEnoughActors { have: 1 }));
    }

    #[tokio::test]
    async fn zero_transfer_amount_is_rejected_before_submitting() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new().with_endowment(UNIT));
        let client: Arc<dyn ChainClient> = chain.clone();
        let config = SimConfig {
            transfer_amount: 0,
            ..config(&dir)
        };
        let mut sim = Simulation::new(client, config, CancelToken::new());
        sim.create_users(2).await.unwrap();

        let mut rng = StdRng::seed_from_u64(5);
        let err = sim.simulate_transactions(3, &mut rng).await.unwrap_err();
        assert!(matches!(err, SimError::ZeroAmount { what: "transfer" }));
        assert!(chain.calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_transfer_is_recorded_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new().with_endowment(10 * UNIT));
        chain.reject_next("transfer", "priority too low").unwrap();
        let mut sim = simulation(&chain, &dir);
        sim.create_users(2).await.unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let report = sim.simulate_transactions(3, &mut rng).await.unwrap();
        assert_eq!(report.transfers.len(), 3);
        assert_eq!(report.failed(), 1);
        assert!(report.transfers[0]
            .error
            .as_deref()
            .unwrap()
            .contains("priority too low"));
        assert_eq!(chain.calls().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn repeated_create_users_extends_the_family() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new());
        let mut sim = simulation(&chain, &dir);
        sim.create_users(2).await.unwrap();
        let added: Vec<String> = sim
            .create_users(2)
            .await
            .unwrap()
            .iter()
            .map(|a| a.identity().derivation_path.clone())
            .collect();
        assert_eq!(added, ["//User2", "//User3"]);
        assert_eq!(sim.actors().len(), 4);
    }

    #[tokio::test]
    async fn dispatch_creates_base_actor_on_demand() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new().with_endowment(UNIT));
        let mut sim = simulation(&chain, &dir);

        sim.dispatch(Action::DepositTnt {
            asset_id: 0,
            amount: 10,
        })
        .await
        .unwrap();
        assert_eq!(sim.actors().len(), 1);
        let base = sim.actors()[0].address().to_string();
        assert_eq!(chain.calls().unwrap()[0].signer, base);
        assert_eq!(chain.ledger(0, &base).unwrap().unwrap().bonded, 10);
    }

    #[tokio::test]
    async fn generated_children_join_the_actor_list() {
        let dir = TempDir::new().unwrap();
        let chain = Arc::new(InMemoryChain::new());
        let mut sim = simulation(&chain, &dir);
        sim.dispatch(Action::GenerateChildUsers { count: 3 })
            .await
            .unwrap();
        assert_eq!(sim.actors().len(), 4);
        assert_eq!(sim.roster().load().unwrap().len(), 3);
    }
}
