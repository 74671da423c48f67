//! Opens the one chain session a command runs against.

use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tangle_client::TangleClient;
use usersim_core::chain::memory::InMemoryChain;
use usersim_core::chain::ChainClient;
use usersim_core::config::{SimConfig, UNIT};
use usersim_core::confirm::CancelToken;
use usersim_core::orchestrator::Simulation;
use usersim_core::paths;

/// Starting native and asset balance of every account on the dev chain.
const DEV_ENDOWMENT: u128 = 1_000 * UNIT;
const DEV_REWARD: u128 = UNIT;

/// Global flags that take precedence over the config file.
pub struct Overrides {
    pub config: Option<PathBuf>,
    pub node_url: Option<String>,
    pub base_seed: Option<String>,
    pub roster: Option<PathBuf>,
    pub dev: bool,
}

pub fn load_config(overrides: &Overrides) -> anyhow::Result<SimConfig> {
    let path = match &overrides.config {
        Some(p) => p.clone(),
        None => paths::config_path(&std::env::current_dir()?),
    };
    let mut config = SimConfig::load(&path)
        .with_context(|| format!("cannot load config {}", path.display()))?;

    if overrides.dev {
        let dev = SimConfig::dev();
        config.confirm_timeout_secs = dev.confirm_timeout_secs;
        config.poll_interval_ms = dev.poll_interval_ms;
        config.inter_transfer_delay_ms = dev.inter_transfer_delay_ms;
        config.ready_timeout_secs = dev.ready_timeout_secs;
    }
    if let Some(url) = &overrides.node_url {
        config.node_url = url.clone();
    }
    if let Some(seed) = &overrides.base_seed {
        config.base_seed = seed.clone();
    }
    if let Some(roster) = &overrides.roster {
        config.roster_path = roster.clone();
    }
    Ok(config)
}

/// Connect (or build the dev chain) and wrap it in a [`Simulation`] whose
/// waits are cancelled by Ctrl-C.
pub async fn open(config: SimConfig, dev: bool) -> anyhow::Result<Simulation> {
    let client: Arc<dyn ChainClient> = if dev {
        tracing::info!("using in-memory dev chain");
        Arc::new(InMemoryChain::dev(DEV_ENDOWMENT, DEV_REWARD))
    } else {
        let client = TangleClient::connect(&config.node_url, config.ready_timeout())
            .await
            .context("Failed to initialize simulation")?;
        Arc::new(client)
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling pending waits");
            on_interrupt.cancel();
        }
    });

    Ok(Simulation::new(client, config, cancel))
}
