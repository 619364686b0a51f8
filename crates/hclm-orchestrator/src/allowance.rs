//! Allowance guard.
//!
//! Debit-dependent writes (repayments) need the spender's allowance to cover
//! the amount first. The guard reads the current allowance and, only when it
//! is short, grants `max(top_up, min_amount)` and waits for the grant to
//! confirm. The oversized grant keeps later repayments to one write each.

use tracing::{debug, info};

use hclm_schemas::{Address, Amount, Receipt, WriteCall, WriteMethod};

use crate::{Orchestrator, WorkflowError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowanceOutcome {
    /// No write was submitted.
    AlreadySufficient { current: Amount },
    ToppedUp { granted: Amount, receipt: Receipt },
}

impl AllowanceOutcome {
    pub fn wrote(&self) -> bool {
        matches!(self, AllowanceOutcome::ToppedUp { .. })
    }
}

impl Orchestrator {
    pub async fn ensure_allowance(
        &self,
        owner: Address,
        token: Address,
        spender: Address,
        min_amount: Amount,
    ) -> Result<AllowanceOutcome, WorkflowError> {
        let current = self.ledger.allowance(token, owner, spender).await?;
        if current >= min_amount {
            debug!(current = %current, min = %min_amount, "allowance sufficient");
            return Ok(AllowanceOutcome::AlreadySufficient { current });
        }

        let granted = self.config.allowance.top_up.max(min_amount);
        info!(
            spender = %spender,
            current = %current,
            min = %min_amount,
            granted = %granted,
            "allowance short, topping up"
        );
        let call = WriteCall::new(
            token,
            WriteMethod::Approve {
                spender,
                amount: granted,
            },
        );
        let receipt = self.ledger.submit_and_confirm(owner, &call).await?;
        Ok(AllowanceOutcome::ToppedUp { granted, receipt })
    }

    /// Allowance of the token toward the vault, the spender for repayments.
    pub(crate) async fn ensure_repay_allowance(
        &self,
        owner: Address,
        min_amount: Amount,
    ) -> Result<AllowanceOutcome, WorkflowError> {
        let c = &self.config.contracts;
        self.ensure_allowance(owner, c.token, c.vault, min_amount)
            .await
    }
}
