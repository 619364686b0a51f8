//! Reward aggregation and claiming.
//!
//! The pool emits `Waterfalled(toRewards)` whenever it routes value toward
//! rewards; the token owner folds those contributions into the reward index
//! with `addRewards(sum)`, which emits `RewardsAdded`. The latest
//! `RewardsAdded` height is the checkpoint: everything at or before it is
//! folded, everything strictly after it is pending. Nothing is persisted;
//! the checkpoint is recomputed from the event log on every run.

use tracing::{debug, info, instrument};

use hclm_schemas::{
    Amount, BlockHeight, EventKind, LedgerEvent, LogEntry, LogFilter, Receipt, WriteCall,
    WriteMethod,
};

use crate::{NothingToDo, Orchestrator, Session, WorkflowError};

/// Read-only result of the checkpoint search and contribution scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationPlan {
    pub tip: BlockHeight,
    /// Height of the latest RewardsAdded, `None` if there has never been one.
    pub checkpoint: Option<BlockHeight>,
    pub scan_from: BlockHeight,
    pub contributions: usize,
    pub sum: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationReport {
    pub plan: AggregationPlan,
    pub receipt: Receipt,
}

impl Orchestrator {
    #[instrument(skip_all, fields(workflow = "aggregate_rewards"))]
    pub async fn aggregate_rewards(
        &self,
        session: &Session,
    ) -> Result<AggregationReport, WorkflowError> {
        let account = self.authorize_write(session).await?;
        let token = self.config.contracts.token;

        let owner = self.ledger.owner(token).await?;
        if owner != account {
            return Err(WorkflowError::Unauthorized { account, owner });
        }

        let plan = self.plan_aggregation().await?;
        if plan.sum.is_zero() {
            return Err(WorkflowError::NothingToDo(NothingToDo::NoNewContributions));
        }

        // The token contract pays rewards out of its own balance.
        let available = self.ledger.balance_of(token, token).await?;
        if available < plan.sum {
            return Err(WorkflowError::InsufficientRemoteFunds {
                available,
                required: plan.sum,
            });
        }

        let call = WriteCall::new(token, WriteMethod::AddRewards { amount: plan.sum });
        let receipt = self.ledger.submit_and_confirm(account, &call).await?;
        info!(
            sum = %plan.sum,
            contributions = plan.contributions,
            checkpoint = ?plan.checkpoint,
            "rewards aggregated"
        );

        self.refresh(session).await;
        Ok(AggregationReport { plan, receipt })
    }

    /// Find the checkpoint and sum the contributions after it. No writes.
    pub async fn plan_aggregation(&self) -> Result<AggregationPlan, WorkflowError> {
        let tip = self.ledger.block_number().await?;
        let checkpoint = self.find_checkpoint(tip).await?;
        let scan_from = checkpoint.map_or(0, |h| h.saturating_add(1));

        let logs = if scan_from > tip {
            Vec::new()
        } else {
            self.ledger
                .logs(&LogFilter {
                    emitter: self.config.contracts.pool,
                    event: EventKind::Waterfalled,
                    from_block: scan_from,
                    to_block: tip,
                })
                .await?
        };

        let mut sum = Amount::ZERO;
        let mut contributions = 0usize;
        for entry in &logs {
            if entry.block < scan_from {
                continue;
            }
            if let LedgerEvent::Waterfalled { to_rewards } = entry.event {
                sum = sum.saturating_add(to_rewards);
                contributions += 1;
            }
        }
        debug!(tip, scan_from, contributions, sum = %sum, "contributions scanned");

        Ok(AggregationPlan {
            tip,
            checkpoint,
            scan_from,
            contributions,
            sum,
        })
    }

    /// Latest RewardsAdded height: search the recent window first, then the
    /// whole history.
    async fn find_checkpoint(&self, tip: BlockHeight) -> Result<Option<BlockHeight>, WorkflowError> {
        let window = self.config.rewards.checkpoint_window;
        let window_from = tip.saturating_sub(window);

        let mut found = self.rewards_added_between(window_from, tip).await?;
        if found.is_empty() && window_from > 0 {
            debug!(window, "no RewardsAdded in window, scanning from genesis");
            found = self.rewards_added_between(0, tip).await?;
        }

        Ok(found
            .iter()
            .max_by_key(|e| (e.block, e.log_index))
            .map(|e| e.block))
    }

    async fn rewards_added_between(
        &self,
        from: BlockHeight,
        to: BlockHeight,
    ) -> Result<Vec<LogEntry>, WorkflowError> {
        Ok(self
            .ledger
            .logs(&LogFilter {
                emitter: self.config.contracts.token,
                event: EventKind::RewardsAdded,
                from_block: from,
                to_block: to,
            })
            .await?)
    }

    /// Claim pending rewards. Returns the amount that was pending.
    #[instrument(skip_all, fields(workflow = "claim_rewards"))]
    pub async fn claim_rewards(&self, session: &Session) -> Result<Amount, WorkflowError> {
        let account = self.authorize_write(session).await?;
        let token = self.config.contracts.token;

        let pending = self.ledger.pending_rewards(token, account).await?;
        if pending.is_zero() {
            return Err(WorkflowError::NothingToDo(NothingToDo::NoPendingRewards));
        }

        let call = WriteCall::new(token, WriteMethod::Claim);
        self.ledger.submit_and_confirm(account, &call).await?;
        info!(claimed = %pending, "rewards claimed");

        self.refresh(session).await;
        Ok(pending)
    }
}
