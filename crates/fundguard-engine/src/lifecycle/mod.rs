//! Fund lifecycle: creation, activation, validated fund actions and
//! migration between releases.

pub mod fund;
pub mod manager;
pub mod migration;

pub use fund::{CreateFundParams, FundRecord, FundStatus, MigrationRequest, Release};
pub use manager::{Collaborators, FundLifecycleManager};
pub use migration::{validate_timelock, MigrationCoordinator, MAX_MIGRATION_TIMELOCK_SECS};
