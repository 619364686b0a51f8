//! hclm-testkit
//!
//! Deterministic simulated ledger plus a ready-wired harness for scenario
//! tests under `tests/`.

mod sim_ledger;

use std::sync::Arc;

use hclm_config::ClientConfig;
use hclm_orchestrator::{Orchestrator, Session};
use hclm_schemas::{Address, ChainId};

pub use sim_ledger::SimLedger;

/// The account workflows run as.
pub const USER: Address = Address::from_bytes([0xaa; 20]);
/// The token owner (allowed to aggregate rewards).
pub const OWNER: Address = Address::from_bytes([0x0e; 20]);

/// A simulator and an orchestrator talking to it.
pub struct Harness {
    pub sim: Arc<SimLedger>,
    pub orchestrator: Orchestrator,
    pub config: ClientConfig,
}

impl Harness {
    /// Default client config (Sepolia contracts and policies), fresh ledger.
    pub fn new() -> Self {
        Self::with(ClientConfig::default(), |sim| sim)
    }

    /// Custom config, and a hook to tune the simulator before it is shared.
    pub fn with(config: ClientConfig, tune: impl FnOnce(SimLedger) -> SimLedger) -> Self {
        let sim = Arc::new(tune(SimLedger::new(config.contracts, OWNER)));
        let orchestrator = Orchestrator::with_transport(sim.clone(), config.clone());
        Self {
            sim,
            orchestrator,
            config,
        }
    }

    pub fn user_session(&self) -> Session {
        Session::connected(USER, self.config.network.chain_id)
    }

    pub fn owner_session(&self) -> Session {
        Session::connected(OWNER, self.config.network.chain_id)
    }

    pub fn session_on(&self, account: Address, chain: ChainId) -> Session {
        Session::connected(account, chain)
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}
