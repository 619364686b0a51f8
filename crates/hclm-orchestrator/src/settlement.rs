//! Debt settlement.
//!
//! Interest on the pool only materialises when a position is touched, so a
//! plain `debts` read can be behind. Closing a position therefore:
//!
//! 1. reads the recorded debt (best effort) and, when there is some, grants
//!    one repayment allowance sized for the whole close, then wakes the
//!    position with a tiny repayment (a failure here is logged and ignored);
//! 2. reads the now-current debt and checks the remaining allowance still
//!    covers it plus both pads; if not, grants again and re-wakes, at most
//!    [`STAGING_ROUNDS`] times;
//! 3. repays debt plus a pad, which absorbs accrual between read and
//!    inclusion;
//! 4. re-reads, and if anything is left tries one finishing pad;
//! 5. withdraws all collateral.
//!
//! No authorization is submitted between the debt read and the repayment,
//! so the pad only has to absorb one confirmation of accrual. The pad is not
//! refunded. Residual debt is possible if confirmation takes longer than the
//! pad covers; the report carries it.

use tracing::{info, instrument, warn};

use hclm_schemas::{Address, Amount, DebtTuple, Receipt, WriteCall, WriteMethod};

use crate::{NothingToDo, Orchestrator, Session, WorkflowError};

/// Extra allowance grants a close may make after the first.
const STAGING_ROUNDS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WakeOutcome {
    /// No debt was recorded, nothing submitted.
    Skipped,
    Confirmed,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementReport {
    pub wake: WakeOutcome,
    /// Debt read after the wake step.
    pub debt_read: DebtTuple,
    /// Main repayment including the pad. Zero when no debt was read.
    pub repaid: Amount,
    pub finishing_repaid: Amount,
    pub residual_debt: Amount,
    pub withdrawn_collateral: Amount,
}

impl Orchestrator {
    #[instrument(skip_all, fields(workflow = "close_position"))]
    pub async fn close_position(&self, session: &Session) -> Result<SettlementReport, WorkflowError> {
        let account = self.authorize_write(session).await?;
        let pool = self.config.contracts.pool;
        let policy = self.config.settlement;

        let mut wake = match self.ledger.debts(pool, account).await {
            Ok(pre) if pre.is_clear() => WakeOutcome::Skipped,
            Ok(pre) => {
                self.ensure_repay_allowance(account, policy.allowance_cover(pre.total()))
                    .await?;
                self.wake(account).await
            }
            Err(e) => {
                warn!(error = %e, "pre-wake debt read failed, continuing");
                WakeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let mut rounds = 0;
        let debt_read = loop {
            let debt = self.ledger.debts(pool, account).await?;
            let total = debt.total();
            if total.is_zero() || rounds == STAGING_ROUNDS {
                break debt;
            }
            let needed = total
                .saturating_add(policy.pad_for(total))
                .saturating_add(policy.finishing_pad);
            let current = self
                .ledger
                .allowance(self.config.contracts.token, account, self.config.contracts.vault)
                .await?;
            if current >= needed {
                break debt;
            }
            rounds += 1;
            warn!(
                debt = %total,
                allowance = %current,
                needed = %needed,
                round = rounds,
                "allowance short of settlement, staging again"
            );
            self.ensure_repay_allowance(account, policy.allowance_cover(total))
                .await?;
            wake = self.wake(account).await;
        };

        let total = debt_read.total();
        let mut repaid = Amount::ZERO;
        if !total.is_zero() {
            let amount = total.saturating_add(policy.pad_for(total));
            info!(debt = %total, repay = %amount, "repaying debt with pad");
            self.repay_exact(account, amount).await?;
            repaid = amount;
        }

        let after = self.ledger.debts(pool, account).await?.total();
        let mut finishing_repaid = Amount::ZERO;
        let mut residual_debt = after;
        if !after.is_zero() {
            warn!(residual = %after, pad = %policy.finishing_pad, "debt left after repayment, trying finishing pad");
            match self.repay_exact(account, policy.finishing_pad).await {
                Ok(_) => finishing_repaid = policy.finishing_pad,
                Err(e) => warn!(error = %e, "finishing pad failed"),
            }
            residual_debt = match self.ledger.debts(pool, account).await {
                Ok(d) => d.total(),
                Err(e) => {
                    warn!(error = %e, "residual debt read failed");
                    after
                }
            };
        }

        let withdrawn_collateral = self.ledger.collateral_eth(pool, account).await?;
        if !withdrawn_collateral.is_zero() {
            let call = WriteCall::new(
                pool,
                WriteMethod::WithdrawCollateral {
                    eth_wei: withdrawn_collateral,
                },
            );
            self.ledger.submit_and_confirm(account, &call).await?;
        }

        self.refresh(session).await;

        let report = SettlementReport {
            wake,
            debt_read,
            repaid,
            finishing_repaid,
            residual_debt,
            withdrawn_collateral,
        };
        info!(
            repaid = %report.repaid,
            residual = %report.residual_debt,
            withdrawn = %report.withdrawn_collateral,
            "position closed"
        );
        Ok(report)
    }

    /// The wake step on its own. Refuses when no debt is recorded so repeated
    /// calls never spend on an empty position.
    #[instrument(skip_all, fields(workflow = "poke_accrue"))]
    pub async fn poke_accrue(&self, session: &Session) -> Result<Receipt, WorkflowError> {
        let account = self.authorize_write(session).await?;
        let debt = self.ledger.debts(self.config.contracts.pool, account).await?;
        if debt.is_clear() {
            return Err(WorkflowError::NothingToDo(NothingToDo::NoDebt));
        }
        let receipt = self
            .repay_exact(account, self.config.settlement.wake_amount)
            .await?;
        self.refresh(session).await;
        Ok(receipt)
    }

    /// Repay exactly the recorded interest component. Returns the amount.
    #[instrument(skip_all, fields(workflow = "repay_interest_only"))]
    pub async fn repay_interest_only(&self, session: &Session) -> Result<Amount, WorkflowError> {
        let account = self.authorize_write(session).await?;
        let debt = self.ledger.debts(self.config.contracts.pool, account).await?;
        if debt.interest.is_zero() {
            return Err(WorkflowError::NothingToDo(NothingToDo::NoInterest));
        }
        self.repay_exact(account, debt.interest).await?;
        self.refresh(session).await;
        Ok(debt.interest)
    }

    #[instrument(skip_all, fields(workflow = "repay_partial", amount = %amount))]
    pub async fn repay_partial(
        &self,
        session: &Session,
        amount: Amount,
    ) -> Result<Receipt, WorkflowError> {
        if amount.is_zero() {
            return Err(WorkflowError::InvalidAmount);
        }
        let account = self.authorize_write(session).await?;
        let debt = self.ledger.debts(self.config.contracts.pool, account).await?;
        if debt.is_clear() {
            return Err(WorkflowError::NothingToDo(NothingToDo::NoDebt));
        }
        let receipt = self.repay_exact(account, amount).await?;
        self.refresh(session).await;
        Ok(receipt)
    }

    async fn wake(&self, account: Address) -> WakeOutcome {
        match self
            .repay_exact(account, self.config.settlement.wake_amount)
            .await
        {
            Ok(_) => WakeOutcome::Confirmed,
            Err(e) => {
                warn!(error = %e, "wake repayment failed, continuing");
                WakeOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Allowance guard, then `repay(amount)` on the pool, confirmed.
    async fn repay_exact(&self, account: Address, amount: Amount) -> Result<Receipt, WorkflowError> {
        self.ensure_repay_allowance(account, amount).await?;
        let call = WriteCall::new(self.config.contracts.pool, WriteMethod::Repay { amount });
        Ok(self.ledger.submit_and_confirm(account, &call).await?)
    }
}
