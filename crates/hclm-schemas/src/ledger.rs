//! Typed vocabulary for the ledger boundary: read calls, write calls,
//! receipts, and the two consumed event kinds.
//!
//! Every remote method the client touches is an enum variant carrying its
//! arguments, so an untyped `(method_name, args)` pair never travels past
//! the transport.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, BlockHeight, DebtTuple, OpHandle};

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// A view method plus its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ReadMethod {
    BalanceOf { account: Address },
    PendingRewards { account: Address },
    Debts { account: Address },
    CollateralEth { account: Address },
    RewardIndex,
    Allowance { owner: Address, spender: Address },
    Owner,
    Active,
    PerWalletCapEth,
    GlobalCapEth,
    InEthByUser { account: Address },
    TotalInEth,
}

/// Shape a read is expected to decode into.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Uint,
    Bool,
    Address,
    Debt,
}

impl ReadMethod {
    /// Solidity method name, as it appears in logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            ReadMethod::BalanceOf { .. } => "balanceOf",
            ReadMethod::PendingRewards { .. } => "pendingRewards",
            ReadMethod::Debts { .. } => "debts",
            ReadMethod::CollateralEth { .. } => "collateralETH",
            ReadMethod::RewardIndex => "rewardIndex",
            ReadMethod::Allowance { .. } => "allowance",
            ReadMethod::Owner => "owner",
            ReadMethod::Active => "active",
            ReadMethod::PerWalletCapEth => "perWalletCapETH",
            ReadMethod::GlobalCapEth => "globalCapETH",
            ReadMethod::InEthByUser { .. } => "inETHByUser",
            ReadMethod::TotalInEth => "totalInETH",
        }
    }

    pub fn value_kind(&self) -> ValueKind {
        match self {
            ReadMethod::Debts { .. } => ValueKind::Debt,
            ReadMethod::Owner => ValueKind::Address,
            ReadMethod::Active => ValueKind::Bool,
            _ => ValueKind::Uint,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadCall {
    pub target: Address,
    pub method: ReadMethod,
}

impl ReadCall {
    pub fn new(target: Address, method: ReadMethod) -> Self {
        Self { target, method }
    }
}

/// A decoded read result. The transport produces the variant matching
/// [`ReadMethod::value_kind`]; the client rejects any other shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ReadValue {
    Uint(Amount),
    Bool(bool),
    Address(Address),
    Debt(DebtTuple),
}

impl ReadValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            ReadValue::Uint(_) => ValueKind::Uint,
            ReadValue::Bool(_) => ValueKind::Bool,
            ReadValue::Address(_) => ValueKind::Address,
            ReadValue::Debt(_) => ValueKind::Debt,
        }
    }
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// A state-changing method plus its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum WriteMethod {
    Approve { spender: Address, amount: Amount },
    Claim,
    AddRewards { amount: Amount },
    /// Payable: the deposit travels in [`WriteCall::value`].
    DepositEth,
    WithdrawCollateral { eth_wei: Amount },
    BorrowHclm { amount: Amount },
    Repay { amount: Amount },
    /// Payable: the purchase travels in [`WriteCall::value`].
    Buy,
}

impl WriteMethod {
    pub fn name(&self) -> &'static str {
        match self {
            WriteMethod::Approve { .. } => "approve",
            WriteMethod::Claim => "claim",
            WriteMethod::AddRewards { .. } => "addRewards",
            WriteMethod::DepositEth => "depositETH",
            WriteMethod::WithdrawCollateral { .. } => "withdrawCollateral",
            WriteMethod::BorrowHclm { .. } => "borrowHCLM",
            WriteMethod::Repay { .. } => "repay",
            WriteMethod::Buy => "buy",
        }
    }

    pub fn is_payable(&self) -> bool {
        matches!(self, WriteMethod::DepositEth | WriteMethod::Buy)
    }
}

/// A write addressed to one contract. `value` is the native amount attached
/// to the call and is distinct from the method arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteCall {
    pub target: Address,
    pub method: WriteMethod,
    pub value: Amount,
}

impl WriteCall {
    pub fn new(target: Address, method: WriteMethod) -> Self {
        Self {
            target,
            method,
            value: Amount::ZERO,
        }
    }

    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }
}

impl fmt::Display for WriteCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.method.name(), self.target.short())?;
        if !self.value.is_zero() {
            write!(f, " value={}", self.value)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Confirmed,
    Reverted,
}

/// Durable outcome of a submitted write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub handle: OpHandle,
    pub block: BlockHeight,
    pub status: ReceiptStatus,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// `RewardsAdded(uint256 amount, uint256 indexDelta, uint256 newRewardIndex)`
    RewardsAdded,
    /// `Waterfalled(uint256 toRewards)`
    Waterfalled,
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::RewardsAdded => "RewardsAdded",
            EventKind::Waterfalled => "Waterfalled",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    RewardsAdded {
        amount: Amount,
        index_delta: Amount,
        new_reward_index: Amount,
    },
    Waterfalled {
        to_rewards: Amount,
    },
}

impl LedgerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            LedgerEvent::RewardsAdded { .. } => EventKind::RewardsAdded,
            LedgerEvent::Waterfalled { .. } => EventKind::Waterfalled,
        }
    }
}

/// One decoded log, positioned by `(block, log_index)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub block: BlockHeight,
    pub log_index: u64,
    pub emitter: Address,
    pub event: LedgerEvent,
}

/// Inclusive height range query for one event kind on one contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogFilter {
    pub emitter: Address,
    pub event: EventKind,
    pub from_block: BlockHeight,
    pub to_block: BlockHeight,
}
