//! Position snapshot reader.
//!
//! One refresh issues the five position reads concurrently and replaces the
//! held snapshot wholesale. A failed read never fails the refresh: the entry
//! keeps its prior value and is listed in `stale_fields`.

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use hclm_config::ContractBook;
use hclm_ledger::{LedgerClient, LedgerError};
use hclm_schemas::{Address, AccountPosition, PositionSnapshot, SnapshotField};

#[derive(Debug)]
pub struct SnapshotReader {
    ledger: LedgerClient,
    contracts: ContractBook,
    held: RwLock<PositionSnapshot>,
}

impl SnapshotReader {
    pub fn new(ledger: LedgerClient, contracts: ContractBook) -> Self {
        Self {
            ledger,
            contracts,
            held: RwLock::new(PositionSnapshot::not_connected()),
        }
    }

    /// The last published snapshot.
    pub async fn current(&self) -> PositionSnapshot {
        self.held.read().await.clone()
    }

    /// Re-read the position of `account`, or reset to the zero state when no
    /// account is connected (no reads issued).
    pub async fn refresh(&self, account: Option<Address>) -> PositionSnapshot {
        let Some(account) = account else {
            let zero = PositionSnapshot::not_connected();
            *self.held.write().await = zero.clone();
            return zero;
        };

        // Prior values only carry over for the same account.
        let prior = {
            let held = self.held.read().await;
            if held.account == Some(account) {
                held.position
            } else {
                AccountPosition::default()
            }
        };

        let c = &self.contracts;
        let (balance, pending, debt, collateral, index) = tokio::join!(
            self.ledger.balance_of(c.token, account),
            self.ledger.pending_rewards(c.token, account),
            self.ledger.debts(c.pool, account),
            self.ledger.collateral_eth(c.pool, account),
            self.ledger.reward_index(c.token),
        );

        let mut position = prior;
        let mut stale = Vec::new();

        if let Some(v) = keep(SnapshotField::TokenBalance, balance, &mut stale) {
            position.token_balance = v;
        }
        if let Some(v) = keep(SnapshotField::PendingReward, pending, &mut stale) {
            position.pending_reward = v;
        }
        if let Some(d) = keep(SnapshotField::Debt, debt, &mut stale) {
            position.debt_principal = d.principal;
            position.debt_interest = d.interest;
        }
        if let Some(v) = keep(SnapshotField::Collateral, collateral, &mut stale) {
            position.collateral_amount = v;
        }
        if let Some(v) = keep(SnapshotField::RewardIndex, index, &mut stale) {
            position.reward_index = v;
        }

        let snapshot = PositionSnapshot {
            account: Some(account),
            position,
            stale_fields: stale,
            refreshed_at: Some(Utc::now()),
        };
        debug!(account = %account, stale = snapshot.stale_fields.len(), "snapshot refreshed");

        *self.held.write().await = snapshot.clone();
        snapshot
    }
}

fn keep<T>(
    field: SnapshotField,
    res: Result<T, LedgerError>,
    stale: &mut Vec<SnapshotField>,
) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(field = field.as_str(), error = %e, "snapshot read failed, keeping prior value");
            stale.push(field);
            None
        }
    }
}
