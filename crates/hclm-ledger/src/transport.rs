//! Raw ledger primitives.
//!
//! Implementations: [`crate::RpcTransport`] (JSON-RPC over HTTP) and the
//! in-memory simulator in `hclm-testkit`.

use async_trait::async_trait;

use hclm_schemas::{
    Address, BlockHeight, ChainId, LogEntry, LogFilter, OpHandle, ReadCall, ReadValue, Receipt,
    WriteCall,
};

use crate::LedgerError;

#[async_trait]
pub trait LedgerTransport: Send + Sync {
    fn name(&self) -> &'static str;

    /// Network the transport is currently attached to.
    async fn chain_id(&self) -> Result<ChainId, LedgerError>;

    /// Execute a view call. Must return the [`ReadValue`] variant matching
    /// the method's value kind.
    async fn call(&self, call: &ReadCall) -> Result<ReadValue, LedgerError>;

    /// Submit a write signed by `from`. Returns once the ledger has accepted
    /// it for inclusion, not once it is confirmed.
    async fn submit(&self, from: Address, call: &WriteCall) -> Result<OpHandle, LedgerError>;

    /// `None` while the operation is still pending.
    async fn receipt(&self, handle: &OpHandle) -> Result<Option<Receipt>, LedgerError>;

    async fn block_number(&self) -> Result<BlockHeight, LedgerError>;

    /// Logs matching `filter`, in ledger order.
    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError>;

    /// Why a reverted write failed, when the ledger can say. `None` when it
    /// cannot.
    async fn revert_reason(&self, _receipt: &Receipt) -> Result<Option<String>, LedgerError> {
        Ok(None)
    }

    /// Ask the signer to move to `chain`. Transports without a signer-side
    /// network notion accept silently.
    async fn request_network_switch(&self, _chain: ChainId) -> Result<(), LedgerError> {
        Ok(())
    }
}
