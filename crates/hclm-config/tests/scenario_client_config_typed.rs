//! Typed client config.
//!
//! GREEN when:
//! - an empty tree yields the Sepolia deployment defaults;
//! - the shipped file decodes to exactly those defaults;
//! - an unknown key in any section is refused at load;
//! - an unusable value is refused at load;
//! - overrides from a later file layer reach the typed view.

use std::io::Write;

use hclm_config::{load_layered_yaml, load_layered_yaml_from_strings, ClientConfig};
use hclm_schemas::{Amount, ChainId};

const SEPOLIA_YAML: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/sepolia.yaml");

#[test]
fn empty_tree_yields_defaults() {
    let cfg = load_layered_yaml_from_strings(&["{}"]).unwrap().config;
    assert_eq!(cfg, ClientConfig::default());
    assert_eq!(cfg.network.chain_id, ChainId::SEPOLIA);
    assert_eq!(cfg.rewards.checkpoint_window, 100_000);
    assert_eq!(cfg.settlement.wake_amount, Amount::ONE);
    assert_eq!(cfg.settlement.dust_pad, Amount::new(1_000_000_000));
    assert_eq!(cfg.settlement.finishing_pad, Amount::new(1_000_000));
    assert_eq!(cfg.lending.sale_rate, 1_000);
    assert_eq!(cfg.lending.ltv_bps, 5_000);
}

#[test]
fn shipped_file_matches_defaults() {
    let cfg = load_layered_yaml(&[SEPOLIA_YAML]).unwrap().config;
    assert_eq!(cfg, ClientConfig::default());
}

#[test]
fn unknown_key_is_refused() {
    let yaml = "settlement:\n  dust_padd: \"1\"\n";
    let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err();
    assert!(format!("{err:#}").contains("CONFIG_INVALID"), "{err:#}");
}

#[test]
fn unusable_values_are_refused() {
    let cases = [
        ("contracts:\n  pool: \"0x0000000000000000000000000000000000000000\"\n", "contracts.pool"),
        ("confirmation:\n  timeout_secs: 0\n", "timeout_secs"),
        ("settlement:\n  dust_pad_bps: 10001\n", "dust_pad_bps"),
        ("allowance:\n  top_up: \"0\"\n", "top_up"),
    ];
    for (yaml, needle) in cases {
        let err = load_layered_yaml_from_strings(&[yaml]).unwrap_err().to_string();
        assert!(err.contains(needle), "{needle}: {err}");
    }
}

#[test]
fn file_overlay_reaches_typed_view() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = dir.path().join("operator.yaml");
    let mut f = std::fs::File::create(&overlay).unwrap();
    writeln!(f, "confirmation:\n  timeout_secs: 30\nsettlement:\n  dust_pad_bps: 25").unwrap();

    let overlay = overlay.to_str().unwrap();
    let cfg = load_layered_yaml(&[SEPOLIA_YAML, overlay]).unwrap().config;

    assert_eq!(cfg.confirmation.timeout_secs, 30);
    assert_eq!(cfg.confirmation.poll_interval_ms, 1_000);
    assert_eq!(cfg.settlement.dust_pad_bps, 25);
}
