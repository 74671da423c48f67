use crate::output::print_json;
use usersim_core::actions::Action;
use usersim_core::orchestrator::Simulation;

/// Run one catalogue action against the base actor and print its effect.
pub async fn run(sim: &mut Simulation, action: Action, json: bool) -> anyhow::Result<()> {
    let effect = sim.dispatch(action).await?;
    if json {
        print_json(&effect)?;
    } else {
        print!("{effect}");
    }
    Ok(())
}
