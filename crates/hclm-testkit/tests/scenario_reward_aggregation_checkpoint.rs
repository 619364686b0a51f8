//! Reward aggregation.
//!
//! GREEN when:
//! - history [RewardsAdded@100, Waterfalled(5)@150, Waterfalled(3)@200] at
//!   height 250 aggregates 8 from checkpoint 100, and an immediate rerun is
//!   NothingToDo;
//! - a token balance of 7 against a sum of 8 aborts with
//!   InsufficientRemoteFunds and zero writes;
//! - a non-owner is refused before any write;
//! - a checkpoint older than the search window is still found;
//! - with no RewardsAdded ever, contributions are summed from genesis;
//! - claiming pays pending rewards once, then reports nothing to do.

use hclm_config::ClientConfig;
use hclm_orchestrator::{NothingToDo, WorkflowError};
use hclm_schemas::{Amount, WriteMethod};
use hclm_testkit::{Harness, OWNER, USER};

fn seeded_history(h: &Harness) {
    h.sim.emit_rewards_added(100, Amount::new(20));
    h.sim.emit_waterfalled(150, Amount::new(5));
    h.sim.emit_waterfalled(200, Amount::new(3));
    h.sim.advance_to_block(250);
}

#[tokio::test]
async fn sums_after_checkpoint_then_nothing_to_do() -> anyhow::Result<()> {
    let h = Harness::new();
    let token = h.config.contracts.token;
    seeded_history(&h);
    h.sim.set_token_balance(token, Amount::new(100));

    let report = h.orchestrator.aggregate_rewards(&h.owner_session()).await?;

    assert_eq!(report.plan.sum, Amount::new(8));
    assert_eq!(report.plan.checkpoint, Some(100));
    assert_eq!(report.plan.scan_from, 101);
    assert_eq!(report.plan.contributions, 2);
    assert_eq!(
        h.sim.submitted()[0].method,
        WriteMethod::AddRewards {
            amount: Amount::new(8)
        }
    );
    assert_eq!(h.sim.token_balance(token), Amount::new(92));

    let err = h
        .orchestrator
        .aggregate_rewards(&h.owner_session())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::NothingToDo(NothingToDo::NoNewContributions)
    );
    assert_eq!(h.sim.write_count(), 1);
    Ok(())
}

#[tokio::test]
async fn short_token_balance_aborts_without_writes() {
    let h = Harness::new();
    seeded_history(&h);
    h.sim
        .set_token_balance(h.config.contracts.token, Amount::new(7));

    let err = h
        .orchestrator
        .aggregate_rewards(&h.owner_session())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::InsufficientRemoteFunds {
            available: Amount::new(7),
            required: Amount::new(8),
        }
    );
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn non_owner_is_unauthorized() {
    let h = Harness::new();
    seeded_history(&h);
    h.sim
        .set_token_balance(h.config.contracts.token, Amount::new(100));

    let err = h
        .orchestrator
        .aggregate_rewards(&h.user_session())
        .await
        .unwrap_err();

    match err {
        WorkflowError::Unauthorized { owner, .. } => assert_eq!(owner, OWNER),
        other => panic!("expected Unauthorized, got {other}"),
    }
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn checkpoint_outside_window_falls_back_to_genesis() -> anyhow::Result<()> {
    let mut cfg = ClientConfig::default();
    cfg.rewards.checkpoint_window = 100;
    let h = Harness::with(cfg, |sim| sim);

    h.sim.emit_waterfalled(5, Amount::new(1_000));
    h.sim.emit_rewards_added(10, Amount::new(1_000));
    h.sim.emit_waterfalled(20, Amount::new(4));
    h.sim.emit_waterfalled(500, Amount::new(6));
    h.sim.advance_to_block(1_000);

    let plan = h.orchestrator.plan_aggregation().await?;

    assert_eq!(plan.checkpoint, Some(10));
    assert_eq!(plan.sum, Amount::new(10));
    assert_eq!(h.sim.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn no_checkpoint_scans_from_genesis() -> anyhow::Result<()> {
    let h = Harness::new();
    h.sim.emit_waterfalled(0, Amount::new(2));
    h.sim.emit_waterfalled(40, Amount::new(3));
    h.sim.advance_to_block(60);

    let plan = h.orchestrator.plan_aggregation().await?;

    assert_eq!(plan.checkpoint, None);
    assert_eq!(plan.scan_from, 0);
    assert_eq!(plan.sum, Amount::new(5));
    Ok(())
}

#[tokio::test]
async fn latest_of_several_checkpoints_wins() -> anyhow::Result<()> {
    let h = Harness::new();
    h.sim.emit_rewards_added(100, Amount::new(1));
    h.sim.emit_waterfalled(120, Amount::new(9));
    h.sim.emit_rewards_added(130, Amount::new(9));
    h.sim.emit_waterfalled(130, Amount::new(50));
    h.sim.emit_waterfalled(140, Amount::new(2));
    h.sim.advance_to_block(150);

    let plan = h.orchestrator.plan_aggregation().await?;

    // contributions at the checkpoint height count as folded
    assert_eq!(plan.checkpoint, Some(130));
    assert_eq!(plan.sum, Amount::new(2));
    Ok(())
}

#[tokio::test]
async fn claim_pays_pending_then_nothing_to_do() -> anyhow::Result<()> {
    let h = Harness::new();
    let s = h.user_session();
    h.sim
        .set_token_balance(h.config.contracts.token, Amount::new(50));
    h.sim.set_pending_rewards(USER, Amount::new(6));

    let claimed = h.orchestrator.claim_rewards(&s).await?;
    assert_eq!(claimed, Amount::new(6));
    assert_eq!(h.sim.token_balance(USER), Amount::new(6));
    assert_eq!(h.sim.pending_rewards_of(USER), Amount::ZERO);
    assert_eq!(h.orchestrator.snapshot().await.position.token_balance, Amount::new(6));

    assert_eq!(
        h.orchestrator.claim_rewards(&s).await.unwrap_err(),
        WorkflowError::NothingToDo(NothingToDo::NoPendingRewards)
    );
    assert_eq!(h.sim.write_count(), 1);
    Ok(())
}
