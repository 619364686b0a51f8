//! Automatic snapshot refresh on connection changes.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use hclm_schemas::PositionSnapshot;

use crate::{Session, SnapshotReader};

/// Refresh once for the current session, then again whenever the active
/// account or network changes. Snapshots are published on the returned
/// receiver.
///
/// The task ends when the session sender is dropped or every snapshot
/// receiver is gone.
pub fn spawn_auto_refresh(
    reader: Arc<SnapshotReader>,
    mut sessions: watch::Receiver<Session>,
) -> (JoinHandle<()>, watch::Receiver<PositionSnapshot>) {
    let (tx, rx) = watch::channel(PositionSnapshot::not_connected());

    let handle = tokio::spawn(async move {
        let mut last = *sessions.borrow_and_update();
        let snap = reader.refresh(last.account).await;
        if tx.send(snap).is_err() {
            return;
        }

        while sessions.changed().await.is_ok() {
            let next = *sessions.borrow_and_update();
            if next == last {
                continue;
            }
            info!(
                account = ?next.account,
                chain = ?next.chain_id,
                "session changed, refreshing snapshot"
            );
            last = next;
            let snap = reader.refresh(next.account).await;
            if tx.send(snap).is_err() {
                break;
            }
        }
    });

    (handle, rx)
}
