//! Scripted end-to-end check: deposit, delegate and claim as one test user.

use crate::output::print_json;
use serde::Serialize;
use usersim_core::actions::{Action, Effect};
use usersim_core::config::UNIT;
use usersim_core::orchestrator::Simulation;

pub const TEST_USER: &str = "//TestUser1";
pub const DEFAULT_VALIDATOR: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
const ASSET_ID: u128 = 0;

#[derive(Serialize)]
struct TestRun {
    address: String,
    initial_balance: String,
    effects: Vec<Effect>,
    final_balance: String,
}

pub async fn run(sim: &mut Simulation, validator: &str, json: bool) -> anyhow::Result<()> {
    let mut actor = sim.actor_from_uri(TEST_USER).await?;
    let initial = actor.balance();
    if !json {
        println!("Test user: {} ({})", actor.address(), TEST_USER);
        println!("Initial balance: {initial}");
    }

    let script = [
        Action::DepositTnt {
            asset_id: ASSET_ID,
            amount: UNIT,
        },
        Action::DelegateTnt {
            asset_id: ASSET_ID,
            amount: UNIT,
            validator: validator.to_string(),
        },
        Action::ClaimRewards,
    ];

    let mut effects = Vec::with_capacity(script.len());
    for action in script {
        let name = action.name();
        let effect = sim.execute_as(&mut actor, action).await?;
        if !json {
            println!("\n== {name}");
            print!("{effect}");
        }
        effects.push(effect);
    }

    let final_balance = actor.refresh(sim.client()).await?;
    if json {
        print_json(&TestRun {
            address: actor.address().to_string(),
            initial_balance: initial.to_string(),
            effects,
            final_balance: final_balance.to_string(),
        })
    } else {
        println!("\nFinal balance: {final_balance}");
        Ok(())
    }
}
