//! hclm-schemas
//!
//! Shared vocabulary for the position orchestration client: addresses,
//! base-unit amounts, typed ledger calls/values/events, and the account
//! position model. No IO lives here.

mod address;
mod amount;
mod ledger;
mod position;

pub use address::{Address, AddressError, BlockHeight, ChainId, OpHandle};
pub use amount::{Amount, AmountError, TOKEN_DECIMALS};
pub use ledger::{
    EventKind, LedgerEvent, LogEntry, LogFilter, ReadCall, ReadMethod, ReadValue, Receipt,
    ReceiptStatus, ValueKind, WriteCall, WriteMethod,
};
pub use position::{AccountPosition, DebtTuple, PositionSnapshot, SaleStatus, SnapshotField};
