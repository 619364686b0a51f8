//! Purchase workflow.
//!
//! GREEN when:
//! - buy(0) is InvalidAmount with no ledger read or write, connected or not;
//! - a paused sale is refused before the write;
//! - a purchase above the remaining wallet room is refused before the write;
//! - an unreadable `active` flag does not block the purchase;
//! - the purchase amount travels as attached value;
//! - sale status reads the user's share alongside the shared figures, and a
//!   failed share read surfaces.

use hclm_orchestrator::{Session, WorkflowError};
use hclm_schemas::{Amount, WriteMethod};
use hclm_testkit::{Harness, USER};

#[tokio::test]
async fn zero_amount_touches_nothing() {
    let h = Harness::new();

    for session in [h.user_session(), Session::disconnected()] {
        let err = h.orchestrator.buy(&session, Amount::ZERO).await.unwrap_err();
        assert_eq!(err, WorkflowError::InvalidAmount);
    }
    assert_eq!(h.sim.read_count(), 0);
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn paused_sale_is_refused() {
    let h = Harness::new();
    h.sim.set_sale(false, Amount::ZERO, Amount::ZERO);

    let err = h
        .orchestrator
        .buy(&h.user_session(), Amount::new(5))
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::SalePaused);
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn wallet_cap_is_checked_before_submitting() {
    let h = Harness::new();
    h.sim.set_sale(true, Amount::new(10), Amount::ZERO);
    h.sim.set_in_eth_by_user(USER, Amount::new(8));

    let err = h
        .orchestrator
        .buy(&h.user_session(), Amount::new(3))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::SaleCapExceeded {
            requested: Amount::new(3),
            room: Amount::new(2),
        }
    );
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn purchase_attaches_value_and_refreshes() -> anyhow::Result<()> {
    let h = Harness::new();
    let sale = h.config.contracts.sale;
    h.sim.set_token_balance(sale, Amount::new(1_000_000));

    h.orchestrator
        .buy(&h.user_session(), Amount::new(5))
        .await?;

    let writes = h.sim.submitted();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].method, WriteMethod::Buy);
    assert_eq!(writes[0].target, sale);
    assert_eq!(writes[0].value, Amount::new(5));

    assert_eq!(h.sim.token_balance(USER), Amount::new(5_000));
    let snap = h.orchestrator.snapshot().await;
    assert_eq!(snap.position.token_balance, Amount::new(5_000));
    Ok(())
}

#[tokio::test]
async fn unreadable_sale_state_does_not_block() -> anyhow::Result<()> {
    let h = Harness::new();
    h.sim
        .set_token_balance(h.config.contracts.sale, Amount::new(1_000_000));
    h.sim.fail_reads("active");
    h.sim.fail_reads("perWalletCapETH");

    h.orchestrator
        .buy(&h.user_session(), Amount::new(1))
        .await?;

    assert_eq!(h.sim.write_count(), 1);
    Ok(())
}

#[tokio::test]
async fn sale_status_reports_user_share() -> anyhow::Result<()> {
    let h = Harness::new();
    h.sim.set_sale(true, Amount::new(10), Amount::new(1_000));
    h.sim.set_in_eth_by_user(USER, Amount::new(4));

    let status = h.orchestrator.sale_status(&h.user_session()).await?;
    assert_eq!(h.sim.read_count(), 5);
    assert!(status.active);
    assert_eq!(status.contributed_by_user, Amount::new(4));
    assert_eq!(status.total_contributed, Amount::new(4));
    assert_eq!(status.wallet_room(), Some(Amount::new(6)));

    let anon = h.orchestrator.sale_status(&Session::disconnected()).await?;
    assert_eq!(h.sim.read_count(), 9);
    assert_eq!(anon.contributed_by_user, Amount::ZERO);
    Ok(())
}

#[tokio::test]
async fn sale_status_surfaces_a_failed_user_share_read() {
    let h = Harness::new();
    h.sim.fail_reads("inETHByUser");

    let err = h
        .orchestrator
        .sale_status(&h.user_session())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "LEDGER");
    // the shared figures were still read alongside
    assert_eq!(h.sim.read_count(), 5);
}
