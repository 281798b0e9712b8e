use serde::Deserialize;
use serde_json::Value;

use fundguard_core::error::{FundError, Result};
use fundguard_core::Address;

use crate::fees::MAX_BPS;
use crate::lifecycle::{validate_timelock, CreateFundParams, Release};
use crate::policy::{encode_settings, PolicyConfig};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FundguardConfig {
    pub version: u32,

    pub engine: EngineSection,

    #[serde(default)]
    pub fees: FeeSection,

    #[serde(default)]
    pub funds: Vec<GenesisFund>,
}

impl FundguardConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FundError::UnsupportedVersion);
        }

        self.engine.validate()?;
        self.fees.validate()?;
        for (i, f) in self.funds.iter().enumerate() {
            f.validate().map_err(|e| match e {
                FundError::Configuration(msg) => FundError::Configuration(format!("funds[{i}]: {msg}")),
                other => other,
            })?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    pub dispatcher_owner: Address,

    #[serde(default = "default_policy_manager")]
    pub policy_manager: Address,

    #[serde(default = "default_migration_timelock_secs")]
    pub migration_timelock_secs: u64,

    pub release: ReleaseSection,
}

impl EngineSection {
    pub fn validate(&self) -> Result<()> {
        if self.dispatcher_owner.is_zero() {
            return Err(FundError::Configuration(
                "engine.dispatcher_owner must not be the zero address".into(),
            ));
        }
        if self.policy_manager.is_zero() {
            return Err(FundError::Configuration(
                "engine.policy_manager must not be the zero address".into(),
            ));
        }
        validate_timelock(self.migration_timelock_secs)
            .map_err(|e| FundError::Configuration(format!("engine.migration_timelock_secs: {e}")))?;
        self.release.validate()
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseSection {
    pub controller: Address,
    pub vault_lib: Address,
}

impl ReleaseSection {
    fn validate(&self) -> Result<()> {
        if self.controller.is_zero() || self.vault_lib.is_zero() {
            return Err(FundError::Configuration(
                "engine.release.controller and engine.release.vault_lib must be set".into(),
            ));
        }
        Ok(())
    }

    pub fn to_release(self) -> Release {
        Release {
            controller: self.controller,
            vault_lib: self.vault_lib,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeeSection {
    #[serde(default)]
    pub management_bps: u32,
}

impl FeeSection {
    fn validate(&self) -> Result<()> {
        if self.management_bps > MAX_BPS {
            return Err(FundError::Configuration(format!(
                "fees.management_bps must be at most {MAX_BPS}"
            )));
        }
        Ok(())
    }
}

/// Fund created when the engine boots.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisFund {
    pub owner: Address,
    pub name: String,
    pub denomination_asset: Address,
    #[serde(default)]
    pub policies: Vec<GenesisPolicy>,
}

impl GenesisFund {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(FundError::Configuration("name must not be empty".into()));
        }
        if self.owner.is_zero() || self.denomination_asset.is_zero() {
            return Err(FundError::Configuration(
                "owner and denomination_asset must be set".into(),
            ));
        }
        if let Some(p) = self.policies.iter().find(|p| p.id.trim().is_empty()) {
            return Err(FundError::Configuration(format!(
                "policy id must not be empty (settings: {})",
                p.settings
            )));
        }
        Ok(())
    }

    pub fn to_params(&self) -> Result<CreateFundParams> {
        let policies = self
            .policies
            .iter()
            .map(|p| Ok(PolicyConfig::new(p.id.clone(), encode_settings(&p.settings)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(CreateFundParams {
            owner: self.owner,
            name: self.name.clone(),
            denomination_asset: self.denomination_asset,
            policies,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenesisPolicy {
    pub id: String,
    /// Rule settings; encoded to the JSON blob the rule decodes.
    #[serde(default = "empty_settings")]
    pub settings: Value,
}

fn default_policy_manager() -> Address {
    Address::derived(0, 1)
}
fn default_migration_timelock_secs() -> u64 {
    86_400
}
fn empty_settings() -> Value {
    Value::Object(serde_json::Map::new())
}
