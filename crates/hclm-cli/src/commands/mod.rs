//! Command handlers for the `hclm` binary.
//!
//! Shared plumbing (config loading, ledger connection, output helpers)
//! lives here; workflow commands live in the submodules.

pub mod market;
pub mod position;

use std::fmt::Display;
use std::sync::Arc;

use anyhow::{anyhow, Context as _, Result};

use hclm_config::ClientConfig;
use hclm_ledger::RpcTransport;
use hclm_orchestrator::{Orchestrator, Session, WorkflowError};
use hclm_schemas::{Address, Amount, Receipt};

/// Token and ETH amounts are both 18-decimal.
pub const DECIMALS: u32 = 18;

pub struct Context {
    pub orchestrator: Orchestrator,
    pub session: Session,
}

impl Context {
    /// Load config, resolve the RPC endpoint, and wire the orchestrator.
    /// The session network is left unknown so write workflows ask the ledger.
    pub fn connect(config_paths: &[String], account: Option<&str>) -> Result<Self> {
        let config = load_client_config(config_paths)?;
        let account = account
            .map(|a| {
                a.parse::<Address>()
                    .with_context(|| format!("invalid --account '{a}'"))
            })
            .transpose()?;

        let secrets = hclm_config::resolve_secrets(&config)?;
        let transport = Arc::new(RpcTransport::new(secrets.rpc_url));
        let orchestrator = Orchestrator::with_transport(transport, config);

        Ok(Self {
            orchestrator,
            session: Session {
                account,
                chain_id: None,
            },
        })
    }
}

pub fn load_client_config(paths: &[String]) -> Result<ClientConfig> {
    if paths.is_empty() {
        let cfg = ClientConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    Ok(hclm_config::load_layered_yaml(&refs)?.config)
}

pub fn config_hash(paths: &[String]) -> Result<()> {
    if paths.is_empty() {
        anyhow::bail!("config-hash needs at least one --config path");
    }
    let refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = hclm_config::load_layered_yaml(&refs)?;
    kv("config_hash", &loaded.config_hash);
    println!("{}", loaded.canonical_json);
    Ok(())
}

/// Parse a decimal CLI amount into base units.
pub fn parse_amount(flag: &str, text: &str) -> Result<Amount> {
    Amount::parse_units(text, DECIMALS).with_context(|| format!("invalid --{flag} '{text}'"))
}

/// Workflow errors exit non-zero with their stable code up front.
pub fn surfaced(e: WorkflowError) -> anyhow::Error {
    anyhow!("{}: {}", e.code(), e)
}

pub fn kv(key: &str, value: impl Display) {
    println!("{key}={value}");
}

pub fn kv_units(key: &str, amount: Amount) {
    kv(key, amount.format_units(DECIMALS));
}

pub fn print_receipt(receipt: &Receipt) {
    kv("handle", &receipt.handle);
    kv("block", receipt.block);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_without_config_paths() {
        let cfg = load_client_config(&[]).unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn amounts_parse_as_eighteen_decimals() {
        assert_eq!(
            parse_amount("eth", "0.5").unwrap(),
            Amount::new(500_000_000_000_000_000)
        );
        let err = parse_amount("eth", "abc").unwrap_err();
        assert!(err.to_string().contains("invalid --eth 'abc'"));
    }

    #[test]
    fn surfaced_errors_lead_with_the_code() {
        let e = surfaced(WorkflowError::InvalidAmount);
        assert!(e.to_string().starts_with("INVALID_AMOUNT: "));
    }
}
