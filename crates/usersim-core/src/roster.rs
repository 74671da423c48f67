//! Append-only store of generated child identities.
//!
//! Records are written as JSON Lines. Files produced by older tooling used a
//! free-text line per child; those lines are still accepted on load so a
//! roster can be carried over unchanged.

use crate::error::{Result, SimError};
use crate::io;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// ChildUserRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildUserRecord {
    pub index: usize,
    pub address: String,
    pub seed: String,
    /// Free balance observed when the child was derived. Serialized as a
    /// string so values beyond `u64` survive JSON round-trips.
    #[serde(with = "u128_string")]
    pub balance_at_creation: u128,
}

impl ChildUserRecord {
    /// `Child User {i} - Address: {addr}, Seed: {seed}, Balance: {balance}`
    pub fn legacy_line(&self) -> String {
        format!(
            "Child User {} - Address: {}, Seed: {}, Balance: {}",
            self.index, self.address, self.seed, self.balance_at_creation
        )
    }

    fn parse_legacy(line: &str) -> Option<Self> {
        let caps = legacy_re().captures(line)?;
        Some(Self {
            index: caps[1].parse().ok()?,
            address: caps[2].to_string(),
            seed: caps[3].to_string(),
            balance_at_creation: caps[4].parse().ok()?,
        })
    }

    fn parse_line(line: &str) -> Option<Self> {
        if line.starts_with('{') {
            serde_json::from_str(line).ok()
        } else {
            Self::parse_legacy(line)
        }
    }
}

static LEGACY_RE: OnceLock<Regex> = OnceLock::new();

fn legacy_re() -> &'static Regex {
    LEGACY_RE.get_or_init(|| {
        Regex::new(r"^Child User (\d+) - Address: (\w+), Seed: (.*), Balance: (\d+)$").unwrap()
    })
}

mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// RosterFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct RosterFile {
    path: PathBuf,
}

impl RosterFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &ChildUserRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        io::append_text(&self.path, &line)
    }

    /// Every record in file order. A missing file is an empty roster.
    pub fn load(&self) -> Result<Vec<ChildUserRecord>> {
        let Some(content) = io::read_if_exists(&self.path)? else {
            return Ok(Vec::new());
        };
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                ChildUserRecord::parse_line(line.trim()).ok_or_else(|| SimError::RosterParse {
                    line: i + 1,
                    content: line.to_string(),
                })
            })
            .collect()
    }

    /// Addresses of every recorded child, in file order.
    pub fn addresses(&self) -> Result<Vec<String>> {
        Ok(self.load()?.into_iter().map(|r| r.address).collect())
    }
}
