//! Derived borrowing capacity.
//!
//! `max_borrow_total = collateral * sale_rate * ltv_bps / 10000`
//! `headroom = max(0, max_borrow_total - debt_principal)`
//!
//! Only principal counts against capacity; accrued interest does not.
//! Overflow saturates to [`Amount::MAX`].

use hclm_config::LendingConfig;
use hclm_schemas::Amount;

const BPS_DENOM: u128 = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowCapacity {
    pub max_borrow_total: Amount,
    pub headroom: Amount,
}

pub fn borrow_capacity(
    collateral: Amount,
    debt_principal: Amount,
    lending: &LendingConfig,
) -> BorrowCapacity {
    let factor = u128::from(lending.sale_rate).saturating_mul(u128::from(lending.ltv_bps));
    let max_borrow_total = collateral
        .checked_mul_div(factor, BPS_DENOM)
        .unwrap_or(Amount::MAX);
    BorrowCapacity {
        max_borrow_total,
        headroom: max_borrow_total.saturating_sub(debt_principal),
    }
}
