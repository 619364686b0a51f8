//! hclm-orchestrator
//!
//! Client-side position workflows over the ledger facade. Each workflow is a
//! sequence of individually-atomic ledger operations; correctness comes from
//! pre-reads before every write, waiting for each confirmation before the
//! next submission, and re-reading the ledger instead of trusting local
//! state.
//!
//! Control flow of every write workflow:
//! session gate -> pre-check reads -> allowance guard (if debiting) ->
//! write -> confirmation -> snapshot refresh.

mod allowance;
mod capacity;
mod error;
mod lending;
mod rewards;
mod sale;
mod session;
mod settlement;
mod snapshot;
mod watcher;

use std::sync::Arc;

use hclm_config::ClientConfig;
use hclm_ledger::{ConfirmationPolicy, LedgerClient, LedgerTransport};
use hclm_schemas::PositionSnapshot;

pub use allowance::AllowanceOutcome;
pub use capacity::{borrow_capacity, BorrowCapacity};
pub use error::{NothingToDo, WorkflowError};
pub use rewards::{AggregationPlan, AggregationReport};
pub use session::Session;
pub use settlement::{SettlementReport, WakeOutcome};
pub use snapshot::SnapshotReader;
pub use watcher::spawn_auto_refresh;

/// Entry point for every workflow. Cheap to share behind an `Arc`; the only
/// mutable state is the snapshot held by the reader.
#[derive(Debug)]
pub struct Orchestrator {
    ledger: LedgerClient,
    config: ClientConfig,
    reader: Arc<SnapshotReader>,
}

impl Orchestrator {
    pub fn new(ledger: LedgerClient, config: ClientConfig) -> Self {
        let reader = Arc::new(SnapshotReader::new(ledger.clone(), config.contracts));
        Self {
            ledger,
            config,
            reader,
        }
    }

    /// Build the ledger client with the configured confirmation policy.
    pub fn with_transport(transport: Arc<dyn LedgerTransport>, config: ClientConfig) -> Self {
        let policy = ConfirmationPolicy {
            timeout: config.confirmation.timeout(),
            poll_interval: config.confirmation.poll_interval(),
        };
        Self::new(LedgerClient::new(transport, policy), config)
    }

    pub fn ledger(&self) -> &LedgerClient {
        &self.ledger
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Shared handle for [`spawn_auto_refresh`].
    pub fn snapshot_reader(&self) -> Arc<SnapshotReader> {
        Arc::clone(&self.reader)
    }

    pub async fn snapshot(&self) -> PositionSnapshot {
        self.reader.current().await
    }

    pub async fn refresh(&self, session: &Session) -> PositionSnapshot {
        self.reader.refresh(session.account).await
    }
}
