//! Kernel tunables

use crate::constants::{DEFAULT_MAX_DECODE_SIZE, P2PKH_ADDRESS_VERSION};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a [`crate::LedgerKernel`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Byte ceiling applied to untrusted input before decoding
    pub max_decode_size: usize,
    /// Version byte prefixed to derived addresses
    pub address_version: u8,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_decode_size: DEFAULT_MAX_DECODE_SIZE,
            address_version: P2PKH_ADDRESS_VERSION,
        }
    }
}

impl KernelConfig {
    /// Parse from JSON; absent fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| LedgerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| LedgerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_decode_size == 0 {
            return Err(LedgerError::Config(
                "max_decode_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
