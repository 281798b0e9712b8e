//! Policy layer: the rule trait, built-in rule variants and the manager that
//! enables them per fund and evaluates them at hook points.
//!
//! Rules are an open set behind `Arc<dyn Policy>`, selected by identifier at
//! configuration time.

pub mod adapter_list;
pub mod address_list;
pub mod asset_blacklist;
pub mod asset_whitelist;
pub mod investor_whitelist;
pub mod manager;
pub mod min_max_investment;
pub mod rule;

pub use adapter_list::{AdapterList, AdapterListSettings, ADAPTER_BLACKLIST, ADAPTER_WHITELIST};
pub use asset_blacklist::{AssetBlacklist, ASSET_BLACKLIST};
pub use asset_whitelist::{AssetListSettings, AssetWhitelist, ASSET_WHITELIST};
pub use investor_whitelist::{InvestorListSettings, InvestorWhitelist, INVESTOR_WHITELIST};
pub use manager::{PolicyConfig, PolicyManager, RuleSet};
pub use min_max_investment::{InvestmentLimits, MinMaxInvestment, MIN_MAX_INVESTMENT};
pub use rule::{decode_settings, encode_settings, ensure_policy_manager, Policy, PolicyCtx};
