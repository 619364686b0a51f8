//! hclm-config
//!
//! Layered YAML configuration for the position client.
//!
//! Layers are overlaid onto one YAML tree in order (earlier = base, later =
//! override), screened for literal secrets, then decoded into
//! [`ClientConfig`] and validated. The hash covers the effective typed
//! config: a layer that only restates defaults hashes like no layer at all.
//! Env-var secret resolution lives in [`secrets`].

pub mod client;
pub mod secrets;

use std::fs;

use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value as Yaml};
use sha2::{Digest, Sha256};

pub use client::{
    AllowanceConfig, ClientConfig, ConfirmationConfig, ContractBook, LendingConfig,
    NetworkConfig, RewardsConfig, SettlementConfig, DEFAULT_RPC_URL_ENV,
};
pub use secrets::{resolve_secrets, resolve_secrets_with, ResolvedSecrets};

/// Known secret-like prefixes. A string leaf starting with one of these
/// aborts loading with CONFIG_SECRET_DETECTED.
const SECRET_PREFIXES: &[&str] = &[
    "-----BEGIN", // PEM private keys
    "xprv",       // BIP32 extended private key
    "tprv",
    "sk-",  // generic API key style
    "ghp_", // GitHub PAT
];

/// A validated config plus its identity.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: ClientConfig,
    /// The typed config serialised in field order.
    pub canonical_json: String,
    /// Hex SHA-256 of `canonical_json`.
    pub config_hash: String,
}

impl LoadedConfig {
    fn seal(config: ClientConfig) -> Result<Self> {
        let canonical_json =
            serde_json::to_string(&config).context("config serialize failed")?;
        let config_hash = hex::encode(Sha256::digest(canonical_json.as_bytes()));
        Ok(Self {
            config,
            canonical_json,
            config_hash,
        })
    }
}

pub fn load_layered_yaml(paths: &[&str]) -> Result<LoadedConfig> {
    let docs = paths
        .iter()
        .map(|p| fs::read_to_string(p).with_context(|| format!("failed to read yaml path: {p}")))
        .collect::<Result<Vec<String>>>()?;
    let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
    load_layered_yaml_from_strings(&doc_refs)
}

pub fn load_layered_yaml_from_strings(layers: &[&str]) -> Result<LoadedConfig> {
    let mut tree = Yaml::Mapping(Mapping::new());
    for (i, raw) in layers.iter().enumerate() {
        let layer: Yaml = serde_yaml::from_str(raw)
            .with_context(|| format!("CONFIG_INVALID: layer {i} is not valid yaml"))?;
        // an empty file is an empty layer
        if layer.is_null() {
            continue;
        }
        overlay(&mut tree, layer);
    }

    // before the typed decode, whose errors may quote values
    screen_secrets(&tree, &mut Vec::new())?;

    let config: ClientConfig =
        serde_yaml::from_value(tree).context("CONFIG_INVALID: typed decode failed")?;
    config.validate()?;
    LoadedConfig::seal(config)
}

/// Mappings merge key by key; anything else in `layer` replaces `base`.
fn overlay(base: &mut Yaml, layer: Yaml) {
    match (base, layer) {
        (Yaml::Mapping(base_map), Yaml::Mapping(layer_map)) => {
            for (key, value) in layer_map {
                match base_map.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, other) => *slot = other,
    }
}

fn screen_secrets(node: &Yaml, path: &mut Vec<String>) -> Result<()> {
    match node {
        Yaml::Mapping(map) => {
            for (key, value) in map {
                path.push(key.as_str().unwrap_or("<key>").to_string());
                screen_secrets(value, path)?;
                path.pop();
            }
        }
        Yaml::Sequence(items) => {
            for (i, value) in items.iter().enumerate() {
                path.push(i.to_string());
                screen_secrets(value, path)?;
                path.pop();
            }
        }
        Yaml::Tagged(tagged) => screen_secrets(&tagged.value, path)?,
        Yaml::String(s) if looks_like_secret(s) => {
            bail!("CONFIG_SECRET_DETECTED leaf={} value=REDACTED", path.join("."));
        }
        _ => {}
    }
    Ok(())
}

fn looks_like_secret(s: &str) -> bool {
    let t = s.trim();
    if looks_like_private_key(t) {
        return true;
    }
    if t.len() < 8 {
        return false;
    }
    SECRET_PREFIXES.iter().any(|p| t.starts_with(p))
}

/// 32 raw bytes in hex: the shape of a signing key. Addresses are 20 bytes
/// and never match.
fn looks_like_private_key(t: &str) -> bool {
    let body = t.strip_prefix("0x").unwrap_or(t);
    body.len() == 64 && body.bytes().all(|b| b.is_ascii_hexdigit())
}
