//! Account position types reconstructed from ledger reads.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount};

/// Decoded `debts(account) -> (principal, interest, lastTs)`.
///
/// `interest` is the accrued amount as of `last_update_ts`; the ledger only
/// materialises newer accrual when the position is touched by a write.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebtTuple {
    pub principal: Amount,
    pub interest: Amount,
    /// Unix seconds of the last accrual checkpoint.
    pub last_update_ts: u64,
}

impl DebtTuple {
    pub fn total(&self) -> Amount {
        self.principal.saturating_add(self.interest)
    }

    pub fn is_clear(&self) -> bool {
        self.principal.is_zero() && self.interest.is_zero()
    }

    pub fn last_update_utc(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.last_update_ts).ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }
}

/// One account's view of the ledger. Derived, never persisted.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    pub token_balance: Amount,
    pub pending_reward: Amount,
    pub debt_principal: Amount,
    pub debt_interest: Amount,
    pub collateral_amount: Amount,
    pub reward_index: Amount,
}

impl AccountPosition {
    pub fn total_debt(&self) -> Amount {
        self.debt_principal.saturating_add(self.debt_interest)
    }
}

/// The individually-read entries of an [`AccountPosition`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotField {
    TokenBalance,
    PendingReward,
    Debt,
    Collateral,
    RewardIndex,
}

impl SnapshotField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotField::TokenBalance => "token_balance",
            SnapshotField::PendingReward => "pending_reward",
            SnapshotField::Debt => "debt",
            SnapshotField::Collateral => "collateral",
            SnapshotField::RewardIndex => "reward_index",
        }
    }
}

/// The client-held snapshot. Replaced wholesale on every refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    /// `None` when no account is connected (not-applicable zero state).
    pub account: Option<Address>,
    pub position: AccountPosition,
    /// Entries whose latest read failed and still carry the prior value.
    pub stale_fields: Vec<SnapshotField>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl PositionSnapshot {
    pub fn not_connected() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }

    pub fn is_fresh(&self) -> bool {
        self.stale_fields.is_empty()
    }
}

/// Sale contract state as displayed next to the purchase form.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleStatus {
    pub active: bool,
    pub per_wallet_cap: Amount,
    pub global_cap: Amount,
    pub contributed_by_user: Amount,
    pub total_contributed: Amount,
}

impl SaleStatus {
    /// Remaining per-wallet room, or `None` when the sale has no wallet cap.
    pub fn wallet_room(&self) -> Option<Amount> {
        if self.per_wallet_cap.is_zero() {
            return None;
        }
        Some(self.per_wallet_cap.saturating_sub(self.contributed_by_user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debt_total_and_clear() {
        let d = DebtTuple {
            principal: Amount::new(12),
            interest: Amount::new(3),
            last_update_ts: 1_700_000_000,
        };
        assert_eq!(d.total(), Amount::new(15));
        assert!(!d.is_clear());
        assert!(DebtTuple::default().is_clear());
        assert_eq!(
            d.last_update_utc().unwrap().timestamp(),
            1_700_000_000
        );
    }

    #[test]
    fn wallet_room_is_none_without_cap() {
        let s = SaleStatus::default();
        assert_eq!(s.wallet_room(), None);

        let capped = SaleStatus {
            per_wallet_cap: Amount::new(10),
            contributed_by_user: Amount::new(4),
            ..SaleStatus::default()
        };
        assert_eq!(capped.wallet_room(), Some(Amount::new(6)));
    }
}
