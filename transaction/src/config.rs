//! Transaction pipeline settings.

use std::env;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, TxError};
use crate::fee::{DEFAULT_FEE_PER_KB, RING_SIZE};

pub const ENV_FEE_PER_KB: &str = "PRIVACY_FEE_PER_KB";
pub const ENV_RING_SIZE: &str = "PRIVACY_RING_SIZE";
pub const ENV_MAX_TX_SIZE_KB: &str = "PRIVACY_MAX_TX_SIZE_KB";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TxConfig {
    /// Price per started kB of estimated transaction size.
    pub fee_per_kb: u64,
    /// Rows in every MLSAG ring, the real one included.
    pub ring_size: usize,
    /// Bound on ledger samples drawn while filling decoy rows.
    pub max_decoy_attempts: u32,
    pub max_tx_size_kb: u64,
    pub max_info_size: usize,
    /// Times coin selection is topped up after re-estimating the fee.
    pub fee_refinement_rounds: u32,
}

impl Default for TxConfig {
    fn default() -> Self {
        Self {
            fee_per_kb: DEFAULT_FEE_PER_KB,
            ring_size: RING_SIZE,
            max_decoy_attempts: 50_000,
            max_tx_size_kb: 500,
            max_info_size: 512,
            fee_refinement_rounds: 3,
        }
    }
}

impl TxConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| TxError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&json)
    }

    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| env::var(key).ok())
    }

    /// Applies overrides from `lookup`, keyed by environment variable name.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup(ENV_FEE_PER_KB) {
            self.fee_per_kb = parse_var(ENV_FEE_PER_KB, &v)?;
        }
        if let Some(v) = lookup(ENV_RING_SIZE) {
            self.ring_size = parse_var(ENV_RING_SIZE, &v)?;
        }
        if let Some(v) = lookup(ENV_MAX_TX_SIZE_KB) {
            self.max_tx_size_kb = parse_var(ENV_MAX_TX_SIZE_KB, &v)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.ring_size == 0 {
            return Err(TxError::Config("ring_size must be at least 1".into()));
        }
        if self.ring_size > 255 {
            return Err(TxError::Config("ring_size must fit in one byte".into()));
        }
        if self.max_tx_size_kb == 0 {
            return Err(TxError::Config("max_tx_size_kb must be positive".into()));
        }
        if self.max_decoy_attempts == 0 {
            return Err(TxError::Config("max_decoy_attempts must be positive".into()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TxError::Config(format!("{} has invalid value {:?}", key, value)))
}
