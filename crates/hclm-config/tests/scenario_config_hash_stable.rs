//! Config hash stability.
//!
//! GREEN when:
//! - the same inputs hash identically across calls;
//! - key order inside a document does not change the hash;
//! - a changed value changes the hash;
//! - restating defaults does not change the hash;
//! - the shipped deployment file loads and hashes.

use hclm_config::{load_layered_yaml, load_layered_yaml_from_strings};
use hclm_schemas::Amount;

const BASE_YAML: &str = r#"
network:
  chain_id: 11155111
  rpc_url_env: "HCLM_RPC_URL"
settlement:
  dust_pad: "1000000000"
  finishing_pad: "1000000"
"#;

const BASE_YAML_REORDERED: &str = r#"
settlement:
  finishing_pad: "1000000"
  dust_pad: "1000000000"
network:
  rpc_url_env: "HCLM_RPC_URL"
  chain_id: 11155111
"#;

const OVERLAY_YAML: &str = r#"
settlement:
  dust_pad: "5000000000"
"#;

#[test]
fn same_input_same_hash() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
    assert_eq!(a.canonical_json, b.canonical_json);
    assert_eq!(a.config_hash.len(), 64);
}

#[test]
fn key_order_does_not_matter() {
    let a = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let b = load_layered_yaml_from_strings(&[BASE_YAML_REORDERED]).unwrap();
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn overlay_changes_hash() {
    let base = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    let merged = load_layered_yaml_from_strings(&[BASE_YAML, OVERLAY_YAML]).unwrap();
    assert_ne!(base.config_hash, merged.config_hash);
    assert_eq!(merged.config.settlement.dust_pad, Amount::new(5_000_000_000));
    assert_eq!(merged.config.settlement.finishing_pad, Amount::new(1_000_000));
}

#[test]
fn restating_defaults_hashes_like_nothing() {
    let empty = load_layered_yaml_from_strings(&["{}"]).unwrap();
    let restated = load_layered_yaml_from_strings(&[BASE_YAML]).unwrap();
    assert_eq!(empty.config_hash, restated.config_hash);
}

#[test]
fn shipped_deployment_file_loads() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/sepolia.yaml");
    let loaded = load_layered_yaml(&[path]).unwrap();
    let again = load_layered_yaml(&[path]).unwrap();
    assert_eq!(loaded.config_hash, again.config_hash);
    assert!(loaded.canonical_json.contains("\"chain_id\":11155111"));
}
