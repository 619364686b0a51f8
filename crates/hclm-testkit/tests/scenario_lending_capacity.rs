//! Collateral deposit and borrowing against it.
//!
//! GREEN when:
//! - zero amounts are refused before any ledger access;
//! - 1 ETH of collateral backs exactly 500 tokens of principal;
//! - a borrow beyond the headroom is refused locally with no write.

use hclm_orchestrator::WorkflowError;
use hclm_schemas::{Amount, WriteMethod};
use hclm_testkit::{Harness, USER};

const E18: u128 = 1_000_000_000_000_000_000;

#[tokio::test]
async fn zero_amounts_are_invalid() {
    let h = Harness::new();
    let s = h.user_session();

    assert_eq!(
        h.orchestrator.deposit_collateral(&s, Amount::ZERO).await.unwrap_err(),
        WorkflowError::InvalidAmount
    );
    assert_eq!(
        h.orchestrator.borrow(&s, Amount::ZERO).await.unwrap_err(),
        WorkflowError::InvalidAmount
    );
    assert_eq!(h.sim.read_count(), 0);
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn borrow_up_to_capacity_then_refuse() -> anyhow::Result<()> {
    let h = Harness::new();
    let s = h.user_session();

    h.orchestrator
        .deposit_collateral(&s, Amount::new(E18))
        .await?;
    let deposit = &h.sim.submitted()[0];
    assert_eq!(deposit.method, WriteMethod::DepositEth);
    assert_eq!(deposit.value, Amount::new(E18));

    let cap = h.orchestrator.borrow_capacity(&s).await?;
    assert_eq!(cap.max_borrow_total, Amount::new(500 * E18));
    assert_eq!(cap.headroom, Amount::new(500 * E18));

    h.orchestrator.borrow(&s, Amount::new(500 * E18)).await?;
    assert_eq!(h.sim.token_balance(USER), Amount::new(500 * E18));
    assert_eq!(h.sim.debt_of(USER).principal, Amount::new(500 * E18));

    let writes = h.sim.write_count();
    let err = h.orchestrator.borrow(&s, Amount::new(1)).await.unwrap_err();
    assert_eq!(
        err,
        WorkflowError::ExceedsCapacity {
            requested: Amount::new(1),
            headroom: Amount::ZERO,
        }
    );
    assert_eq!(h.sim.write_count(), writes);

    let cap = h.orchestrator.borrow_capacity(&s).await?;
    assert_eq!(cap.headroom, Amount::ZERO);
    Ok(())
}

#[tokio::test]
async fn capacity_needs_an_account() {
    let h = Harness::new();
    let err = h
        .orchestrator
        .borrow_capacity(&hclm_orchestrator::Session::disconnected())
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::NotConnected);
}
