//! Collateral deposit and borrowing.

use tracing::{info, instrument};

use hclm_schemas::{Amount, Receipt, WriteCall, WriteMethod};

use crate::capacity;
use crate::{BorrowCapacity, Orchestrator, Session, WorkflowError};

impl Orchestrator {
    #[instrument(skip_all, fields(workflow = "deposit_collateral", eth = %eth_amount))]
    pub async fn deposit_collateral(
        &self,
        session: &Session,
        eth_amount: Amount,
    ) -> Result<Receipt, WorkflowError> {
        if eth_amount.is_zero() {
            return Err(WorkflowError::InvalidAmount);
        }
        let account = self.authorize_write(session).await?;
        let call = WriteCall::new(self.config.contracts.pool, WriteMethod::DepositEth)
            .with_value(eth_amount);
        let receipt = self.ledger.submit_and_confirm(account, &call).await?;
        info!(eth = %eth_amount, "collateral deposited");
        self.refresh(session).await;
        Ok(receipt)
    }

    /// Borrow `amount` tokens against deposited collateral. Refused locally
    /// when it exceeds the derived headroom.
    #[instrument(skip_all, fields(workflow = "borrow", amount = %amount))]
    pub async fn borrow(&self, session: &Session, amount: Amount) -> Result<Receipt, WorkflowError> {
        if amount.is_zero() {
            return Err(WorkflowError::InvalidAmount);
        }
        let account = self.authorize_write(session).await?;
        let pool = self.config.contracts.pool;

        let (collateral, debt) = tokio::join!(
            self.ledger.collateral_eth(pool, account),
            self.ledger.debts(pool, account),
        );
        let cap = capacity::borrow_capacity(collateral?, debt?.principal, &self.config.lending);
        if amount > cap.headroom {
            return Err(WorkflowError::ExceedsCapacity {
                requested: amount,
                headroom: cap.headroom,
            });
        }

        let call = WriteCall::new(pool, WriteMethod::BorrowHclm { amount });
        let receipt = self.ledger.submit_and_confirm(account, &call).await?;
        info!(amount = %amount, "borrow confirmed");
        self.refresh(session).await;
        Ok(receipt)
    }

    /// Capacity from a freshly refreshed snapshot.
    pub async fn borrow_capacity(&self, session: &Session) -> Result<BorrowCapacity, WorkflowError> {
        session.require_account()?;
        let snap = self.refresh(session).await;
        Ok(capacity::borrow_capacity(
            snap.position.collateral_amount,
            snap.position.debt_principal,
            &self.config.lending,
        ))
    }
}
