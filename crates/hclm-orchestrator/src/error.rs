use std::fmt;

use hclm_ledger::LedgerError;
use hclm_schemas::{Address, Amount, ChainId, OpHandle};

/// Why a workflow had nothing to submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NothingToDo {
    NoDebt,
    NoInterest,
    NoPendingRewards,
    /// No Waterfalled contribution after the last checkpoint.
    NoNewContributions,
}

impl fmt::Display for NothingToDo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NothingToDo::NoDebt => "no debt recorded",
            NothingToDo::NoInterest => "no interest to repay",
            NothingToDo::NoPendingRewards => "no pending rewards",
            NothingToDo::NoNewContributions => "no contributions since the last checkpoint",
        };
        f.write_str(s)
    }
}

/// Workflow outcome taxonomy.
///
/// Pre-flight variants (`NotConnected`, `WrongNetwork`, `Unauthorized`,
/// `NothingToDo`, `InsufficientRemoteFunds`, `InvalidAmount`, `SalePaused`,
/// `SaleCapExceeded`, `ExceedsCapacity`) are returned before any write.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("no account connected")]
    NotConnected,

    #[error("wrong network: expected chain {expected}, wallet is on {actual}")]
    WrongNetwork { expected: ChainId, actual: ChainId },

    #[error("{account} is not the owner (owner is {owner})")]
    Unauthorized { account: Address, owner: Address },

    #[error("nothing to do: {0}")]
    NothingToDo(NothingToDo),

    #[error("insufficient remote funds: available {available}, required {required}")]
    InsufficientRemoteFunds { available: Amount, required: Amount },

    #[error("{message}")]
    Reverted { message: String },

    #[error("no confirmation for {handle} after {waited_ms}ms; it may still land")]
    Timeout { handle: OpHandle, waited_ms: u64 },

    #[error("amount must be greater than zero")]
    InvalidAmount,

    #[error("sale is not active")]
    SalePaused,

    #[error("purchase of {requested} exceeds remaining wallet room {room}")]
    SaleCapExceeded { requested: Amount, room: Amount },

    #[error("borrow of {requested} exceeds headroom {headroom}")]
    ExceedsCapacity { requested: Amount, headroom: Amount },

    #[error(transparent)]
    Ledger(LedgerError),
}

impl From<LedgerError> for WorkflowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Reverted { .. } => WorkflowError::Reverted {
                message: e.to_string(),
            },
            LedgerError::Timeout { handle, waited_ms } => {
                WorkflowError::Timeout { handle, waited_ms }
            }
            other => WorkflowError::Ledger(other),
        }
    }
}

impl WorkflowError {
    /// Stable short code for CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::NotConnected => "NOT_CONNECTED",
            WorkflowError::WrongNetwork { .. } => "WRONG_NETWORK",
            WorkflowError::Unauthorized { .. } => "UNAUTHORIZED",
            WorkflowError::NothingToDo(_) => "NOTHING_TO_DO",
            WorkflowError::InsufficientRemoteFunds { .. } => "INSUFFICIENT_REMOTE_FUNDS",
            WorkflowError::Reverted { .. } => "REVERTED",
            WorkflowError::Timeout { .. } => "TIMEOUT",
            WorkflowError::InvalidAmount => "INVALID_AMOUNT",
            WorkflowError::SalePaused => "SALE_PAUSED",
            WorkflowError::SaleCapExceeded { .. } => "SALE_CAP_EXCEEDED",
            WorkflowError::ExceedsCapacity { .. } => "EXCEEDS_CAPACITY",
            WorkflowError::Ledger(_) => "LEDGER",
        }
    }
}
