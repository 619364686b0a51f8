//! Connection context passed explicitly into every workflow.

use tracing::warn;

use hclm_schemas::{Address, ChainId};

use crate::{Orchestrator, WorkflowError};

/// The wallet's active account and network, as the caller last saw them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    pub account: Option<Address>,
    /// `None` means "ask the ledger".
    pub chain_id: Option<ChainId>,
}

impl Session {
    pub fn disconnected() -> Self {
        Self::default()
    }

    pub fn connected(account: Address, chain_id: ChainId) -> Self {
        Self {
            account: Some(account),
            chain_id: Some(chain_id),
        }
    }

    pub fn require_account(&self) -> Result<Address, WorkflowError> {
        self.account.ok_or(WorkflowError::NotConnected)
    }
}

impl Orchestrator {
    /// Gate every write workflow passes before its first ledger access:
    /// an account must be connected and the wallet must be on the configured
    /// network. On a mismatch the signer is asked to switch and the workflow
    /// still aborts; the caller retries once the session reflects the switch.
    pub(crate) async fn authorize_write(&self, session: &Session) -> Result<Address, WorkflowError> {
        let account = session.require_account()?;
        let expected = self.config.network.chain_id;

        let actual = match session.chain_id {
            Some(c) => c,
            None => self.ledger.chain_id().await?,
        };

        if actual != expected {
            if let Err(e) = self.ledger.request_network_switch(expected).await {
                warn!(expected = %expected, actual = %actual, error = %e, "network switch request failed");
            }
            return Err(WorkflowError::WrongNetwork { expected, actual });
        }

        Ok(account)
    }
}
