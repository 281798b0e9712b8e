//! Shared error type across fundguard crates.

use thiserror::Error;

use crate::address::Address;

/// Caller-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Caller lacks the required role.
    Authorization,
    /// Malformed or invariant-violating settings.
    Configuration,
    /// Existing fund state violates a newly attached rule.
    Activation,
    /// A validated action failed a business rule.
    RuleViolation,
    /// Fund accessor changed after a migration was signaled.
    StaleSignal,
    /// Migration executed before its timelock elapsed.
    TimelockNotElapsed,
    /// A migration is already pending.
    AlreadySignaled,
    /// No migration is pending.
    NoPendingMigration,
    /// Operation not supported by the target rule.
    UnsupportedOperation,
    /// Fund is not in a state that permits the operation.
    InvalidState,
    /// Unknown fund id.
    UnknownFund,
    /// Unknown policy identifier.
    UnknownPolicy,
    /// Adapter failed or reported malformed asset flows.
    Adapter,
    /// Fee settlement failed.
    Fee,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and audit output.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Authorization => "AUTHORIZATION",
            ErrorCode::Configuration => "CONFIGURATION",
            ErrorCode::Activation => "ACTIVATION",
            ErrorCode::RuleViolation => "RULE_VIOLATION",
            ErrorCode::StaleSignal => "STALE_SIGNAL",
            ErrorCode::TimelockNotElapsed => "TIMELOCK_NOT_ELAPSED",
            ErrorCode::AlreadySignaled => "ALREADY_SIGNALED",
            ErrorCode::NoPendingMigration => "NO_PENDING_MIGRATION",
            ErrorCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::UnknownFund => "UNKNOWN_FUND",
            ErrorCode::UnknownPolicy => "UNKNOWN_POLICY",
            ErrorCode::Adapter => "ADAPTER",
            ErrorCode::Fee => "FEE",
            ErrorCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, FundError>;

/// Unified error type used by core and engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FundError {
    #[error("unauthorized: {0}")]
    Authorization(String),
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("activation failed: {0}")]
    Activation(String),
    #[error("rule violation: {rule}")]
    RuleViolation { rule: String },
    #[error("stale migration signal for {fund}: signaled accessor {signaled}, current {current}")]
    StaleSignal {
        fund: Address,
        signaled: Address,
        current: Address,
    },
    #[error("migration timelock for {fund} not elapsed: executable at {executable_at}, now {now}")]
    TimelockNotElapsed {
        fund: Address,
        executable_at: u64,
        now: u64,
    },
    #[error("migration already signaled for {0}")]
    AlreadySignaled(Address),
    #[error("no pending migration for {0}")]
    NoPendingMigration(Address),
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("unknown fund: {0}")]
    UnknownFund(Address),
    #[error("unknown policy: {0}")]
    UnknownPolicy(String),
    #[error("adapter error: {0}")]
    Adapter(String),
    #[error("fee settlement failed: {0}")]
    Fee(String),
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl FundError {
    /// Map an error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            FundError::Authorization(_) => ErrorCode::Authorization,
            FundError::Configuration(_) => ErrorCode::Configuration,
            FundError::Activation(_) => ErrorCode::Activation,
            FundError::RuleViolation { .. } => ErrorCode::RuleViolation,
            FundError::StaleSignal { .. } => ErrorCode::StaleSignal,
            FundError::TimelockNotElapsed { .. } => ErrorCode::TimelockNotElapsed,
            FundError::AlreadySignaled(_) => ErrorCode::AlreadySignaled,
            FundError::NoPendingMigration(_) => ErrorCode::NoPendingMigration,
            FundError::UnsupportedOperation(_) => ErrorCode::UnsupportedOperation,
            FundError::InvalidState(_) => ErrorCode::InvalidState,
            FundError::UnknownFund(_) => ErrorCode::UnknownFund,
            FundError::UnknownPolicy(_) => ErrorCode::UnknownPolicy,
            FundError::Adapter(_) => ErrorCode::Adapter,
            FundError::Fee(_) => ErrorCode::Fee,
            FundError::UnsupportedVersion => ErrorCode::UnsupportedVersion,
            FundError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether the caller may reasonably retry later or with a different action.
    ///
    /// Rule violations and timing faults are expected-path rejections; everything
    /// else needs a corrected request or operator attention.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FundError::RuleViolation { .. } | FundError::TimelockNotElapsed { .. }
        )
    }
}
