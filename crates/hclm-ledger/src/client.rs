//! Ledger client facade.
//!
//! Wraps a [`LedgerTransport`] with:
//! - typed reads that reject any value of the wrong shape;
//! - the confirmation wait (poll receipts, bounded by a timeout);
//! - submit logging.
//!
//! A timeout rolls nothing back: the operation may still land later and the
//! next snapshot refresh will show it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use hclm_schemas::{
    Address, Amount, BlockHeight, ChainId, DebtTuple, LogEntry, LogFilter, OpHandle, ReadCall,
    ReadMethod, ReadValue, Receipt, ReceiptStatus, ValueKind, WriteCall,
};

use crate::{LedgerError, LedgerTransport};

/// How long to wait for a receipt, and how often to ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            poll_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Clone)]
pub struct LedgerClient {
    transport: Arc<dyn LedgerTransport>,
    policy: ConfirmationPolicy,
}

impl std::fmt::Debug for LedgerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerClient")
            .field("transport", &self.transport.name())
            .field("policy", &self.policy)
            .finish()
    }
}

impl LedgerClient {
    pub fn new(transport: Arc<dyn LedgerTransport>, policy: ConfirmationPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    pub fn policy(&self) -> ConfirmationPolicy {
        self.policy
    }

    pub async fn chain_id(&self) -> Result<ChainId, LedgerError> {
        self.transport.chain_id().await
    }

    pub async fn request_network_switch(&self, chain: ChainId) -> Result<(), LedgerError> {
        info!(chain = %chain, "requesting network switch");
        self.transport.request_network_switch(chain).await
    }

    pub async fn block_number(&self) -> Result<BlockHeight, LedgerError> {
        self.transport.block_number().await
    }

    pub async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        debug!(
            event = filter.event.name(),
            emitter = %filter.emitter,
            from = filter.from_block,
            to = filter.to_block,
            "log query"
        );
        self.transport.logs(filter).await
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Execute a read and check the returned shape.
    pub async fn read(&self, target: Address, method: ReadMethod) -> Result<ReadValue, LedgerError> {
        let expected = method.value_kind();
        let call = ReadCall::new(target, method);
        let value = self.transport.call(&call).await?;
        if value.kind() != expected {
            return Err(LedgerError::wrong_kind(
                call.method.name(),
                expected,
                value.kind(),
            ));
        }
        Ok(value)
    }

    async fn read_uint(&self, target: Address, method: ReadMethod) -> Result<Amount, LedgerError> {
        let name = method.name();
        match self.read(target, method).await? {
            ReadValue::Uint(v) => Ok(v),
            other => Err(LedgerError::wrong_kind(name, ValueKind::Uint, other.kind())),
        }
    }

    pub async fn balance_of(&self, token: Address, account: Address) -> Result<Amount, LedgerError> {
        self.read_uint(token, ReadMethod::BalanceOf { account }).await
    }

    pub async fn pending_rewards(
        &self,
        token: Address,
        account: Address,
    ) -> Result<Amount, LedgerError> {
        self.read_uint(token, ReadMethod::PendingRewards { account })
            .await
    }

    pub async fn reward_index(&self, token: Address) -> Result<Amount, LedgerError> {
        self.read_uint(token, ReadMethod::RewardIndex).await
    }

    pub async fn allowance(
        &self,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<Amount, LedgerError> {
        self.read_uint(token, ReadMethod::Allowance { owner, spender })
            .await
    }

    pub async fn owner(&self, target: Address) -> Result<Address, LedgerError> {
        match self.read(target, ReadMethod::Owner).await? {
            ReadValue::Address(a) => Ok(a),
            other => Err(LedgerError::wrong_kind(
                "owner",
                ValueKind::Address,
                other.kind(),
            )),
        }
    }

    pub async fn debts(&self, pool: Address, account: Address) -> Result<DebtTuple, LedgerError> {
        match self.read(pool, ReadMethod::Debts { account }).await? {
            ReadValue::Debt(d) => Ok(d),
            other => Err(LedgerError::wrong_kind("debts", ValueKind::Debt, other.kind())),
        }
    }

    pub async fn collateral_eth(
        &self,
        pool: Address,
        account: Address,
    ) -> Result<Amount, LedgerError> {
        self.read_uint(pool, ReadMethod::CollateralEth { account })
            .await
    }

    pub async fn sale_active(&self, sale: Address) -> Result<bool, LedgerError> {
        match self.read(sale, ReadMethod::Active).await? {
            ReadValue::Bool(b) => Ok(b),
            other => Err(LedgerError::wrong_kind("active", ValueKind::Bool, other.kind())),
        }
    }

    pub async fn per_wallet_cap_eth(&self, sale: Address) -> Result<Amount, LedgerError> {
        self.read_uint(sale, ReadMethod::PerWalletCapEth).await
    }

    pub async fn global_cap_eth(&self, sale: Address) -> Result<Amount, LedgerError> {
        self.read_uint(sale, ReadMethod::GlobalCapEth).await
    }

    pub async fn in_eth_by_user(&self, sale: Address, account: Address) -> Result<Amount, LedgerError> {
        self.read_uint(sale, ReadMethod::InEthByUser { account })
            .await
    }

    pub async fn total_in_eth(&self, sale: Address) -> Result<Amount, LedgerError> {
        self.read_uint(sale, ReadMethod::TotalInEth).await
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Submit without waiting.
    pub async fn write(&self, from: Address, call: &WriteCall) -> Result<OpHandle, LedgerError> {
        let handle = self.transport.submit(from, call).await?;
        info!(op = %call, handle = %handle, "write submitted");
        Ok(handle)
    }

    /// Poll until `handle` is confirmed, reverted, or the policy timeout
    /// elapses. Transport hiccups while polling are retried.
    pub async fn await_confirmation(&self, handle: &OpHandle) -> Result<Receipt, LedgerError> {
        let poll = async {
            loop {
                match self.transport.receipt(handle).await {
                    Ok(Some(r)) => return Ok(r),
                    Ok(None) => {}
                    Err(LedgerError::Transport(msg)) => {
                        warn!(handle = %handle, error = %msg, "receipt poll failed, retrying");
                    }
                    Err(e) => return Err(e),
                }
                tokio::time::sleep(self.policy.poll_interval).await;
            }
        };

        let receipt = match tokio::time::timeout(self.policy.timeout, poll).await {
            Ok(res) => res?,
            Err(_) => {
                let waited_ms = u64::try_from(self.policy.timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(handle = %handle, waited_ms, "confirmation timed out");
                return Err(LedgerError::Timeout {
                    handle: handle.clone(),
                    waited_ms,
                });
            }
        };

        match receipt.status {
            ReceiptStatus::Confirmed => {
                info!(handle = %handle, block = receipt.block, "write confirmed");
                Ok(receipt)
            }
            ReceiptStatus::Reverted => {
                let mut message = format!("execution reverted in block {}", receipt.block);
                match self.transport.revert_reason(&receipt).await {
                    Ok(Some(reason)) => {
                        message.push_str(": ");
                        message.push_str(&reason);
                    }
                    Ok(None) => {}
                    Err(e) => debug!(handle = %handle, error = %e, "revert reason unavailable"),
                }
                Err(LedgerError::Reverted {
                    handle: Some(handle.clone()),
                    message,
                })
            }
        }
    }

    pub async fn submit_and_confirm(
        &self,
        from: Address,
        call: &WriteCall,
    ) -> Result<Receipt, LedgerError> {
        let handle = self.write(from, call).await?;
        self.await_confirmation(&handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;
    use hclm_schemas::WriteMethod;

    /// Scripted transport: fixed read answer, queued receipt answers.
    struct Scripted {
        read_answer: ReadValue,
        receipts: Mutex<Vec<Result<Option<Receipt>, LedgerError>>>,
        reason: Option<String>,
    }

    impl Scripted {
        fn new(read_answer: ReadValue) -> Self {
            Self {
                read_answer,
                receipts: Mutex::new(Vec::new()),
                reason: None,
            }
        }

        fn queue_receipt(&self, r: Result<Option<Receipt>, LedgerError>) {
            self.receipts.lock().unwrap().insert(0, r);
        }
    }

    #[async_trait]
    impl LedgerTransport for Scripted {
        fn name(&self) -> &'static str {
            "scripted"
        }
        async fn chain_id(&self) -> Result<ChainId, LedgerError> {
            Ok(ChainId::SEPOLIA)
        }
        async fn call(&self, _call: &ReadCall) -> Result<ReadValue, LedgerError> {
            Ok(self.read_answer.clone())
        }
        async fn submit(&self, _from: Address, _call: &WriteCall) -> Result<OpHandle, LedgerError> {
            Ok(OpHandle::new("0xabc"))
        }
        async fn receipt(&self, _handle: &OpHandle) -> Result<Option<Receipt>, LedgerError> {
            self.receipts.lock().unwrap().pop().unwrap_or(Ok(None))
        }
        async fn block_number(&self) -> Result<BlockHeight, LedgerError> {
            Ok(0)
        }
        async fn logs(&self, _filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
            Ok(Vec::new())
        }
        async fn revert_reason(&self, _receipt: &Receipt) -> Result<Option<String>, LedgerError> {
            Ok(self.reason.clone())
        }
    }

    fn client(t: Scripted) -> LedgerClient {
        LedgerClient::new(
            Arc::new(t),
            ConfirmationPolicy {
                timeout: Duration::from_secs(10),
                poll_interval: Duration::from_millis(100),
            },
        )
    }

    fn receipt(status: ReceiptStatus) -> Receipt {
        Receipt {
            handle: OpHandle::new("0xabc"),
            block: 7,
            status,
        }
    }

    fn claim() -> WriteCall {
        WriteCall::new(Address::ZERO, WriteMethod::Claim)
    }

    #[tokio::test]
    async fn wrong_shape_is_a_decode_error() {
        let c = client(Scripted::new(ReadValue::Bool(true)));
        let err = c.balance_of(Address::ZERO, Address::ZERO).await.unwrap_err();
        assert!(matches!(err, LedgerError::Decode { ref method, .. } if method == "balanceOf"));
    }

    #[tokio::test]
    async fn typed_read_passes_matching_shape() {
        let c = client(Scripted::new(ReadValue::Uint(Amount::new(42))));
        assert_eq!(
            c.total_in_eth(Address::ZERO).await.unwrap(),
            Amount::new(42)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn confirmation_arrives_after_pending_polls() {
        let t = Scripted::new(ReadValue::Bool(true));
        t.queue_receipt(Ok(None));
        t.queue_receipt(Err(LedgerError::Transport("connection reset".into())));
        t.queue_receipt(Ok(Some(receipt(ReceiptStatus::Confirmed))));
        let c = client(t);

        let r = c.submit_and_confirm(Address::ZERO, &claim()).await.unwrap();
        assert_eq!(r.block, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_surfaces_as_reverted() {
        let t = Scripted::new(ReadValue::Bool(true));
        t.queue_receipt(Ok(Some(receipt(ReceiptStatus::Reverted))));
        let c = client(t);

        let err = c.submit_and_confirm(Address::ZERO, &claim()).await.unwrap_err();
        assert!(err.is_revert(), "{err}");
    }

    #[tokio::test(start_paused = true)]
    async fn reverted_receipt_carries_the_reason() {
        let mut t = Scripted::new(ReadValue::Bool(true));
        t.reason = Some("nothing to claim".into());
        t.queue_receipt(Ok(Some(receipt(ReceiptStatus::Reverted))));
        let c = client(t);

        let err = c.submit_and_confirm(Address::ZERO, &claim()).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Reverted {
                handle: Some(OpHandle::new("0xabc")),
                message: "execution reverted in block 7: nothing to claim".into(),
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn missing_confirmation_times_out() {
        let c = client(Scripted::new(ReadValue::Bool(true)));
        let err = c
            .await_confirmation(&OpHandle::new("0xabc"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::Timeout {
                handle: OpHandle::new("0xabc"),
                waited_ms: 10_000,
            }
        );
    }
}
