//! Engine config loader (strict parsing).

pub mod schema;

use std::fs;

use fundguard_core::error::{FundError, Result};

pub use schema::{EngineSection, FeeSection, FundguardConfig, GenesisFund, GenesisPolicy, ReleaseSection};

pub fn load_from_file(path: &str) -> Result<FundguardConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| FundError::Configuration(format!("read config {path} failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<FundguardConfig> {
    let cfg: FundguardConfig = serde_yaml::from_str(s)
        .map_err(|e| FundError::Configuration(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
