use crate::output::{print_json, print_table};
use anyhow::Context;
use usersim_core::orchestrator::Simulation;

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run(
    sim: &mut Simulation,
    users: usize,
    transactions: usize,
    json: bool,
) -> anyhow::Result<()> {
    sim.create_users(users)
        .await
        .with_context(|| format!("cannot create {users} users"))?;

    let mut rng = rand::thread_rng();
    let report = sim
        .simulate_transactions(transactions, &mut rng)
        .await
        .context("simulation aborted")?;

    if json {
        return print_json(&report);
    }

    for (i, t) in report.transfers.iter().enumerate() {
        match (&t.hash, &t.error) {
            (_, Some(err)) => println!("Transaction {}: {} -> {} failed: {err}", i + 1, t.from, t.to),
            (Some(hash), None) => println!(
                "Transaction {}: {} -> {} ({}) {hash}",
                i + 1,
                t.from,
                t.to,
                t.amount
            ),
            (None, None) => {}
        }
    }
    println!();
    print_table(
        &["ADDRESS", "PATH", "BALANCE"],
        report
            .actors
            .iter()
            .map(|a| {
                vec![
                    a.address.clone(),
                    a.derivation_path.clone(),
                    a.balance.clone(),
                ]
            })
            .collect(),
    );
    println!();
    println!("{} succeeded, {} failed", report.succeeded(), report.failed());
    Ok(())
}
