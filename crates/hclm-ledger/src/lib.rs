//! hclm-ledger
//!
//! The ledger client facade: a narrow async transport trait, a JSON-RPC
//! implementation of it, the contract ABI tables, and [`LedgerClient`],
//! which adds typed reads and the bounded confirmation wait on top.

pub mod abi;
mod client;
mod error;
mod rpc;
mod transport;

pub use client::{ConfirmationPolicy, LedgerClient};
pub use error::LedgerError;
pub use rpc::RpcTransport;
pub use transport::LedgerTransport;
