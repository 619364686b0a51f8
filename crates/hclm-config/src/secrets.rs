//! Runtime secret resolution.
//!
//! # Contract
//! - Config YAML stores only env var NAMES (`network.rpc_url_env`).
//! - Callers resolve once at startup and pass [`ResolvedSecrets`] into
//!   constructors; `std::env::var` is not called anywhere else.
//! - `Debug` redacts values. Error messages name the env var, never its value.
//!
//! The RPC URL counts as a secret: hosted endpoints carry the API key in the
//! path.

use anyhow::{bail, Result};

use crate::ClientConfig;

/// Secrets needed to talk to the ledger. Values are redacted in `Debug`.
#[derive(Clone)]
pub struct ResolvedSecrets {
    pub rpc_url: String,
}

impl std::fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedSecrets")
            .field("rpc_url", &"<REDACTED>")
            .finish()
    }
}

/// Resolve secrets from the process environment.
pub fn resolve_secrets(cfg: &ClientConfig) -> Result<ResolvedSecrets> {
    resolve_secrets_with(cfg, |name| std::env::var(name).ok())
}

/// Resolve secrets through `lookup` (env var name -> value).
pub fn resolve_secrets_with<F>(cfg: &ClientConfig, lookup: F) -> Result<ResolvedSecrets>
where
    F: Fn(&str) -> Option<String>,
{
    let var = cfg.network.rpc_url_env.as_str();
    let rpc_url = match lookup(var).filter(|v| !v.trim().is_empty()) {
        Some(v) => v,
        None => bail!(
            "SECRETS_MISSING: required env var '{}' (ledger rpc url) is not set or empty",
            var
        ),
    };

    if !(rpc_url.starts_with("http://") || rpc_url.starts_with("https://")) {
        bail!(
            "SECRETS_INVALID: env var '{}' must hold an http(s) url",
            var
        );
    }

    Ok(ResolvedSecrets { rpc_url })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_never_prints_the_url() {
        let s = ResolvedSecrets {
            rpc_url: "https://node.example/v3/abcdef123456".to_string(),
        };
        let dbg = format!("{s:?}");
        assert!(dbg.contains("<REDACTED>"));
        assert!(!dbg.contains("abcdef123456"));
    }

    #[test]
    fn missing_url_names_the_var_only() {
        let cfg = ClientConfig::default();
        let err = resolve_secrets_with(&cfg, |_| None).unwrap_err().to_string();
        assert!(err.contains("SECRETS_MISSING"), "{err}");
        assert!(err.contains("HCLM_RPC_URL"), "{err}");
    }

    #[test]
    fn non_http_value_is_rejected_without_echo() {
        let cfg = ClientConfig::default();
        let err = resolve_secrets_with(&cfg, |_| Some("ws://secret-host".to_string()))
            .unwrap_err()
            .to_string();
        assert!(err.contains("SECRETS_INVALID"), "{err}");
        assert!(!err.contains("secret-host"), "{err}");
    }

    #[test]
    fn resolves_from_configured_name() {
        let mut cfg = ClientConfig::default();
        cfg.network.rpc_url_env = "MY_NODE".to_string();
        let s = resolve_secrets_with(&cfg, |name| {
            (name == "MY_NODE").then(|| "http://127.0.0.1:8545".to_string())
        })
        .unwrap();
        assert_eq!(s.rpc_url, "http://127.0.0.1:8545");
    }
}
