mod cmd;
mod output;
mod session;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use usersim_core::actions::Action;

#[derive(Parser)]
#[command(
    name = "usersim",
    about = "Drive simulated users against a Tangle node: derive accounts, bond, delegate, claim and transfer",
    version,
    propagate_version = true
)]
struct Cli {
    /// Node websocket endpoint
    #[arg(long, global = true, env = "NODE_URL")]
    node_url: Option<String>,

    /// Root URI for child account derivation (default: //User)
    #[arg(long, global = true, env = "BASE_SEED")]
    base_seed: Option<String>,

    /// Child user roster file (default: ./generated_users.jsonl)
    #[arg(long, global = true, env = "USERSIM_ROSTER")]
    roster: Option<PathBuf>,

    /// YAML config file (default: ./usersim.yaml if present)
    #[arg(long, global = true, env = "USERSIM_CONFIG")]
    config: Option<PathBuf>,

    /// Run against an in-process chain instead of a node
    #[arg(long, global = true)]
    dev: bool,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive child users and append them to the roster
    #[command(name = "generateChildUsers")]
    GenerateChildUsers {
        /// Number of child users to generate
        #[arg(long, short = 'c')]
        count: usize,
    },

    /// Bond an asset as a staked deposit
    #[command(name = "depositTnt")]
    DepositTnt {
        #[arg(long = "assetId")]
        asset_id: u128,
        #[arg(long)]
        amount: u128,
    },

    /// Bond an asset, then delegate it to a validator
    #[command(name = "delegateTnt")]
    DelegateTnt {
        #[arg(long = "assetId")]
        asset_id: u128,
        #[arg(long)]
        amount: u128,
        /// Operator address to delegate to
        #[arg(long)]
        validator: String,
    },

    /// Claim pending rewards
    #[command(name = "claimRewards")]
    ClaimRewards,

    /// Transfer an asset from a seed account to every rostered child
    ///
    /// Each distinct roster address receives one transfer, even if repeated
    /// generateChildUsers runs listed it more than once. The source account
    /// is skipped when it is itself rostered.
    #[command(name = "transferAssets")]
    TransferAssets {
        #[arg(long = "assetId")]
        asset_id: u128,
        /// Secret URI or mnemonic of the source account
        #[arg(long = "seedPhrase")]
        seed_phrase: String,
        #[arg(long)]
        amount: u128,
    },

    /// Create users and run random transfers between them
    Simulate {
        #[arg(long, default_value = "5")]
        users: usize,
        #[arg(long, default_value = "10")]
        transactions: usize,
    },

    /// Run deposit, delegate and claim end to end as //TestUser1
    #[command(name = "testActions")]
    TestActions {
        #[arg(long, env = "VALIDATOR_ADDRESS", default_value = cmd::test_actions::DEFAULT_VALIDATOR)]
        validator: String,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Simulate { .. } | Commands::TestActions { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = session::Overrides {
        config: cli.config,
        node_url: cli.node_url,
        base_seed: cli.base_seed,
        roster: cli.roster,
        dev: cli.dev,
    };
    let config = session::load_config(&overrides)?;
    let dev = overrides.dev;
    let json = cli.json;
    let command = cli.command;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async move {
        let mut sim = session::open(config, dev).await?;
        match command {
            Commands::GenerateChildUsers { count } => {
                cmd::action::run(&mut sim, Action::GenerateChildUsers { count }, json).await
            }
            Commands::DepositTnt { asset_id, amount } => {
                cmd::action::run(&mut sim, Action::DepositTnt { asset_id, amount }, json).await
            }
            Commands::DelegateTnt {
                asset_id,
                amount,
                validator,
            } => {
                let action = Action::DelegateTnt {
                    asset_id,
                    amount,
                    validator,
                };
                cmd::action::run(&mut sim, action, json).await
            }
            Commands::ClaimRewards => cmd::action::run(&mut sim, Action::ClaimRewards, json).await,
            Commands::TransferAssets {
                asset_id,
                seed_phrase,
                amount,
            } => {
                let action = Action::TransferAssets {
                    asset_id,
                    seed_phrase,
                    amount,
                };
                cmd::action::run(&mut sim, action, json).await
            }
            Commands::Simulate {
                users,
                transactions,
            } => cmd::simulate::run(&mut sim, users, transactions, json).await,
            Commands::TestActions { validator } => {
                cmd::test_actions::run(&mut sim, &validator, json).await
            }
        }
    })
}
