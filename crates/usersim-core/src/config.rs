use crate::error::Result;
use crate::paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One whole token in the chain's smallest unit.
pub const UNIT: u128 = 1_000_000_000;

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default = "default_node_url")]
    pub node_url: String,
    /// Root URI for child derivation (`{base_seed}/Child/{i}`).
    #[serde(default = "default_base_seed")]
    pub base_seed: String,
    #[serde(default = "default_roster_path")]
    pub roster_path: PathBuf,
    /// Fixed amount moved by each simulated transfer.
    #[serde(default = "default_transfer_amount")]
    pub transfer_amount: u128,
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Gap between consecutive transfers signed by the same source account.
    #[serde(default = "default_inter_transfer_delay_ms")]
    pub inter_transfer_delay_ms: u64,
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,
}

fn default_node_url() -> String {
    "wss://testnet-rpc.tangle.tools".to_string()
}

fn default_base_seed() -> String {
    "//User".to_string()
}

fn default_roster_path() -> PathBuf {
    PathBuf::from(paths::ROSTER_FILE)
}

fn default_transfer_amount() -> u128 {
    UNIT
}

fn default_confirm_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_inter_transfer_delay_ms() -> u64 {
    2_000
}

fn default_ready_timeout_secs() -> u64 {
    30
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            node_url: default_node_url(),
            base_seed: default_base_seed(),
            roster_path: default_roster_path(),
            transfer_amount: default_transfer_amount(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            inter_transfer_delay_ms: default_inter_transfer_delay_ms(),
            ready_timeout_secs: default_ready_timeout_secs(),
        }
    }
}

impl SimConfig {
    /// Timings suited to the in-memory chain, where inclusion takes a
    /// handful of queries rather than a block interval.
    pub fn dev() -> Self {
        Self {
            confirm_timeout_secs: 5,
            poll_interval_ms: 5,
            inter_transfer_delay_ms: 0,
            ready_timeout_secs: 1,
            ..Self::default()
        }
    }

    /// Load from a YAML file. A missing file yields the defaults; keys
    /// absent from the file keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        let config: SimConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn inter_transfer_delay(&self) -> Duration {
        Duration::from_millis(self.inter_transfer_delay_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }
}
