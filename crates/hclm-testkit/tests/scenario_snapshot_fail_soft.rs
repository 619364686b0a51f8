//! Position snapshot reader.
//!
//! GREEN when:
//! - a refresh reads all five position fields;
//! - a failing read keeps the prior value and marks the field stale;
//! - a disconnected session resets to the zero state without reads;
//! - the auto-refresh task publishes a snapshot per connection change,
//!   including a network switch that keeps the same account.

use std::time::Duration;

use hclm_orchestrator::{spawn_auto_refresh, Session};
use hclm_schemas::{Amount, ChainId, SnapshotField};
use hclm_testkit::{Harness, USER};
use tokio::sync::watch;

fn seed(h: &Harness, balance: u128) {
    h.sim.set_token_balance(USER, Amount::new(balance));
    h.sim.set_pending_rewards(USER, Amount::new(2));
    h.sim
        .seed_debt(USER, Amount::new(3), Amount::new(1), Amount::ZERO);
    h.sim.set_collateral(USER, Amount::new(4));
    h.sim.emit_rewards_added(1, Amount::new(9));
}

#[tokio::test]
async fn refresh_reads_every_field() {
    let h = Harness::new();
    seed(&h, 10);

    let snap = h.orchestrator.refresh(&h.user_session()).await;

    assert_eq!(snap.account, Some(USER));
    assert!(snap.is_fresh());
    assert!(snap.refreshed_at.is_some());
    let p = snap.position;
    assert_eq!(p.token_balance, Amount::new(10));
    assert_eq!(p.pending_reward, Amount::new(2));
    assert_eq!(p.debt_principal, Amount::new(3));
    assert_eq!(p.debt_interest, Amount::new(1));
    assert_eq!(p.collateral_amount, Amount::new(4));
    assert_eq!(p.reward_index, Amount::new(9));
    assert_eq!(h.sim.read_count(), 5);
}

#[tokio::test]
async fn failed_read_keeps_prior_value() {
    let h = Harness::new();
    seed(&h, 10);
    h.orchestrator.refresh(&h.user_session()).await;

    h.sim.set_token_balance(USER, Amount::new(20));
    h.sim
        .seed_debt(USER, Amount::new(99), Amount::ZERO, Amount::ZERO);
    h.sim.fail_reads("debts");

    let snap = h.orchestrator.refresh(&h.user_session()).await;

    assert_eq!(snap.position.token_balance, Amount::new(20));
    assert_eq!(snap.position.debt_principal, Amount::new(3));
    assert_eq!(snap.stale_fields, vec![SnapshotField::Debt]);
    assert_eq!(h.orchestrator.snapshot().await, snap);
}

#[tokio::test]
async fn disconnected_resets_without_reads() {
    let h = Harness::new();
    seed(&h, 10);
    h.orchestrator.refresh(&h.user_session()).await;
    let reads = h.sim.read_count();

    let snap = h.orchestrator.refresh(&Session::disconnected()).await;

    assert!(!snap.is_connected());
    assert_eq!(snap.position.token_balance, Amount::ZERO);
    assert_eq!(h.sim.read_count(), reads);
}

#[tokio::test]
async fn auto_refresh_follows_session_changes() -> anyhow::Result<()> {
    let h = Harness::new();
    seed(&h, 10);

    let (session_tx, session_rx) = watch::channel(Session::disconnected());
    let (task, mut snaps) = spawn_auto_refresh(h.orchestrator.snapshot_reader(), session_rx);

    tokio::time::timeout(Duration::from_secs(5), snaps.changed()).await??;
    assert!(!snaps.borrow().is_connected());

    session_tx.send(h.user_session())?;
    tokio::time::timeout(Duration::from_secs(5), snaps.changed()).await??;
    assert_eq!(snaps.borrow().account, Some(USER));
    assert_eq!(snaps.borrow().position.token_balance, Amount::new(10));

    drop(session_tx);
    tokio::time::timeout(Duration::from_secs(5), task).await??;
    Ok(())
}

#[tokio::test]
async fn auto_refresh_fires_on_network_switch_alone() -> anyhow::Result<()> {
    let h = Harness::new();
    seed(&h, 10);

    let (session_tx, session_rx) = watch::channel(h.user_session());
    let (task, mut snaps) = spawn_auto_refresh(h.orchestrator.snapshot_reader(), session_rx);

    tokio::time::timeout(Duration::from_secs(5), snaps.changed()).await??;
    assert_eq!(snaps.borrow().position.token_balance, Amount::new(10));

    h.sim.set_token_balance(USER, Amount::new(25));
    session_tx.send(Session::connected(USER, ChainId(5)))?;
    tokio::time::timeout(Duration::from_secs(5), snaps.changed()).await??;
    assert_eq!(snaps.borrow().account, Some(USER));
    assert_eq!(snaps.borrow().position.token_balance, Amount::new(25));

    drop(session_tx);
    tokio::time::timeout(Duration::from_secs(5), task).await??;
    Ok(())
}
