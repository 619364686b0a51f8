//! Session gate in front of every write workflow.
//!
//! GREEN when:
//! - no account means NotConnected before any ledger access;
//! - a foreign network aborts with WrongNetwork after asking for a switch;
//! - an unknown session network is resolved by asking the ledger.

use hclm_config::ClientConfig;
use hclm_orchestrator::{Session, WorkflowError};
use hclm_schemas::{Amount, ChainId};
use hclm_testkit::{Harness, USER};

#[tokio::test]
async fn disconnected_session_touches_nothing() {
    let h = Harness::new();
    h.sim
        .seed_debt(USER, Amount::new(5), Amount::ZERO, Amount::ZERO);

    let err = h
        .orchestrator
        .close_position(&Session::disconnected())
        .await
        .unwrap_err();

    assert_eq!(err, WorkflowError::NotConnected);
    assert_eq!(err.code(), "NOT_CONNECTED");
    assert_eq!(h.sim.read_count(), 0);
    assert_eq!(h.sim.write_count(), 0);
}

#[tokio::test]
async fn wrong_network_requests_switch_and_aborts() {
    let h = Harness::new();
    let session = h.session_on(USER, ChainId(1));

    let err = h
        .orchestrator
        .deposit_collateral(&session, Amount::new(1))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        WorkflowError::WrongNetwork {
            expected: ChainId::SEPOLIA,
            actual: ChainId(1),
        }
    );
    assert_eq!(h.sim.switch_requests(), vec![ChainId::SEPOLIA]);
    assert_eq!(h.sim.write_count(), 0);
    assert_eq!(h.sim.read_count(), 0);
}

#[tokio::test]
async fn unknown_session_network_asks_the_ledger() -> anyhow::Result<()> {
    let session = Session {
        account: Some(USER),
        chain_id: None,
    };

    let foreign = Harness::with(ClientConfig::default(), |sim| sim.with_chain_id(ChainId(5)));
    let err = foreign
        .orchestrator
        .deposit_collateral(&session, Amount::new(1))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::WrongNetwork {
            expected: ChainId::SEPOLIA,
            actual: ChainId(5),
        }
    );

    let home = Harness::new();
    home.orchestrator
        .deposit_collateral(&session, Amount::new(1))
        .await?;
    assert_eq!(home.sim.collateral_of(USER), Amount::new(1));
    assert!(home.sim.switch_requests().is_empty());
    Ok(())
}
