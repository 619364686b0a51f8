//! Typed client config.
//!
//! Every section is optional and falls back to the Sepolia deployment the
//! client was first shipped against. Unknown keys are rejected so a typo in
//! an override layer fails loudly instead of silently keeping a default.

use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use hclm_schemas::{Address, Amount, ChainId};

/// Env var holding the JSON-RPC endpoint unless overridden.
pub const DEFAULT_RPC_URL_ENV: &str = "HCLM_RPC_URL";

const SEPOLIA_TOKEN: Address = Address::from_bytes([
    0x40, 0xf2, 0x00, 0xfb, 0x86, 0x7f, 0x67, 0x07, 0xde, 0xa6, 0xfe, 0x7a, 0x06, 0x00, 0x03,
    0x29, 0x10, 0xc2, 0xc4, 0xe6,
]);
const SEPOLIA_VAULT: Address = Address::from_bytes([
    0x1d, 0x28, 0xd6, 0xe9, 0x72, 0x24, 0x93, 0x10, 0x76, 0x8d, 0x42, 0x47, 0xad, 0x46, 0x72,
    0x3f, 0xe0, 0xb6, 0xaa, 0x82,
]);
const SEPOLIA_POOL: Address = Address::from_bytes([
    0x59, 0x25, 0x1e, 0x79, 0x98, 0x0f, 0x54, 0x43, 0xed, 0x3a, 0x77, 0xe2, 0xc7, 0x46, 0xf6,
    0x3e, 0x5a, 0xe9, 0xa7, 0x85,
]);
const SEPOLIA_SALE: Address = Address::from_bytes([
    0x32, 0x18, 0xe0, 0x08, 0xb5, 0x26, 0x10, 0x10, 0x33, 0x94, 0x63, 0x07, 0x2a, 0xf7, 0xb7,
    0x34, 0x45, 0x6c, 0x97, 0x22,
]);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub contracts: ContractBook,
    #[serde(default)]
    pub confirmation: ConfirmationConfig,
    #[serde(default)]
    pub allowance: AllowanceConfig,
    #[serde(default)]
    pub settlement: SettlementConfig,
    #[serde(default)]
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub lending: LendingConfig,
}

impl ClientConfig {
    /// Reject values no workflow can run with.
    pub fn validate(&self) -> Result<()> {
        if self.network.rpc_url_env.trim().is_empty() {
            bail!("CONFIG_INVALID: network.rpc_url_env must name an env var");
        }
        for (role, addr) in self.contracts.roles() {
            if addr.is_zero() {
                bail!("CONFIG_INVALID: contracts.{role} is the zero address");
            }
        }
        if self.confirmation.timeout_secs == 0 {
            bail!("CONFIG_INVALID: confirmation.timeout_secs must be > 0");
        }
        if self.confirmation.poll_interval_ms == 0 {
            bail!("CONFIG_INVALID: confirmation.poll_interval_ms must be > 0");
        }
        if self.allowance.top_up.is_zero() {
            bail!("CONFIG_INVALID: allowance.top_up must be > 0");
        }
        if self.settlement.wake_amount.is_zero() {
            bail!("CONFIG_INVALID: settlement.wake_amount must be > 0");
        }
        if self.settlement.dust_pad_bps > 10_000 {
            bail!(
                "CONFIG_INVALID: settlement.dust_pad_bps={} exceeds 10000",
                self.settlement.dust_pad_bps
            );
        }
        if self.lending.ltv_bps > 10_000 {
            bail!(
                "CONFIG_INVALID: lending.ltv_bps={} exceeds 10000",
                self.lending.ltv_bps
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    #[serde(default = "default_chain_id")]
    pub chain_id: ChainId,
    /// Name of the env var holding the RPC URL. Never the URL itself.
    #[serde(default = "default_rpc_url_env")]
    pub rpc_url_env: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            chain_id: default_chain_id(),
            rpc_url_env: default_rpc_url_env(),
        }
    }
}

/// Addresses of the four collaborating contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractBook {
    /// Reward-bearing token: balances, rewards, allowance, owner, RewardsAdded.
    #[serde(default = "default_token")]
    pub token: Address,
    /// Spender approved for repayments.
    #[serde(default = "default_vault")]
    pub vault: Address,
    /// Lending pool: debts, collateral, borrow, repay, Waterfalled.
    #[serde(default = "default_pool")]
    pub pool: Address,
    #[serde(default = "default_sale")]
    pub sale: Address,
}

impl ContractBook {
    pub fn roles(&self) -> [(&'static str, Address); 4] {
        [
            ("token", self.token),
            ("vault", self.vault),
            ("pool", self.pool),
            ("sale", self.sale),
        ]
    }
}

impl Default for ContractBook {
    fn default() -> Self {
        Self {
            token: SEPOLIA_TOKEN,
            vault: SEPOLIA_VAULT,
            pool: SEPOLIA_POOL,
            sale: SEPOLIA_SALE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfirmationConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl ConfirmationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllowanceConfig {
    /// Authorization granted when the current allowance is short.
    #[serde(default = "default_top_up")]
    pub top_up: Amount,
}

impl Default for AllowanceConfig {
    fn default() -> Self {
        Self {
            top_up: default_top_up(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SettlementConfig {
    /// Repayment used to force interest materialisation.
    #[serde(default = "default_wake_amount")]
    pub wake_amount: Amount,
    /// Absolute pad added to the read debt.
    #[serde(default = "default_dust_pad")]
    pub dust_pad: Amount,
    /// Extra pad relative to the read debt, in basis points.
    #[serde(default)]
    pub dust_pad_bps: u32,
    /// One-shot repayment when the verify read still shows debt.
    #[serde(default = "default_finishing_pad")]
    pub finishing_pad: Amount,
}

impl SettlementConfig {
    /// Total pad for a debt of `total_debt`: the absolute pad plus the
    /// relative margin, saturating.
    pub fn pad_for(&self, total_debt: Amount) -> Amount {
        let relative = total_debt
            .checked_mul_div(u128::from(self.dust_pad_bps), 10_000)
            .unwrap_or(Amount::MAX);
        self.dust_pad.saturating_add(relative)
    }

    /// Repayment allowance that lets a close starting from a recorded debt
    /// of `total_debt` finish without another authorization: the wake, up to
    /// one pad of accrual for each of the authorization and wake
    /// confirmations, the main pad, and the finishing pad.
    pub fn allowance_cover(&self, total_debt: Amount) -> Amount {
        let pad = self.pad_for(total_debt);
        total_debt
            .saturating_add(self.wake_amount)
            .saturating_add(pad)
            .saturating_add(pad)
            .saturating_add(pad)
            .saturating_add(self.finishing_pad)
    }
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            wake_amount: default_wake_amount(),
            dust_pad: default_dust_pad(),
            dust_pad_bps: 0,
            finishing_pad: default_finishing_pad(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewardsConfig {
    /// Heights searched back from the tip for the latest RewardsAdded
    /// before falling back to a genesis scan.
    #[serde(default = "default_checkpoint_window")]
    pub checkpoint_window: u64,
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            checkpoint_window: default_checkpoint_window(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LendingConfig {
    /// Tokens per unit of collateral.
    #[serde(default = "default_sale_rate")]
    pub sale_rate: u64,
    #[serde(default = "default_ltv_bps")]
    pub ltv_bps: u64,
}

impl Default for LendingConfig {
    fn default() -> Self {
        Self {
            sale_rate: default_sale_rate(),
            ltv_bps: default_ltv_bps(),
        }
    }
}

fn default_chain_id() -> ChainId {
    ChainId::SEPOLIA
}
fn default_rpc_url_env() -> String {
    DEFAULT_RPC_URL_ENV.to_string()
}
fn default_token() -> Address {
    SEPOLIA_TOKEN
}
fn default_vault() -> Address {
    SEPOLIA_VAULT
}
fn default_pool() -> Address {
    SEPOLIA_POOL
}
fn default_sale() -> Address {
    SEPOLIA_SALE
}
fn default_timeout_secs() -> u64 {
    120
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_top_up() -> Amount {
    // 1,000,000 tokens at 18 decimals
    Amount::new(1_000_000 * 10u128.pow(18))
}
fn default_wake_amount() -> Amount {
    Amount::ONE
}
fn default_dust_pad() -> Amount {
    Amount::new(1_000_000_000)
}
fn default_finishing_pad() -> Amount {
    Amount::new(1_000_000)
}
fn default_checkpoint_window() -> u64 {
    100_000
}
fn default_sale_rate() -> u64 {
    1_000
}
fn default_ltv_bps() -> u64 {
    5_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pad_adds_relative_margin() {
        let s = SettlementConfig {
            dust_pad: Amount::new(10),
            dust_pad_bps: 100,
            ..SettlementConfig::default()
        };
        // 1% of 5000 = 50
        assert_eq!(s.pad_for(Amount::new(5_000)), Amount::new(60));
        assert_eq!(SettlementConfig::default().pad_for(Amount::new(5_000)), Amount::new(1_000_000_000));
    }

    #[test]
    fn allowance_cover_spans_three_pads_and_the_extras() {
        let s = SettlementConfig {
            wake_amount: Amount::new(1),
            dust_pad: Amount::new(10),
            dust_pad_bps: 0,
            finishing_pad: Amount::new(5),
        };
        assert_eq!(s.allowance_cover(Amount::new(1_000)), Amount::new(1_036));
        assert_eq!(s.allowance_cover(Amount::MAX), Amount::MAX);
    }

    #[test]
    fn default_contracts_are_the_sepolia_deployment() {
        let book = ContractBook::default();
        assert_eq!(
            book.token.to_string(),
            "0x40f200fb867f6707dea6fe7a0600032910c2c4e6"
        );
        assert_eq!(
            book.vault.to_string(),
            "0x1d28d6e972249310768d4247ad46723fe0b6aa82"
        );
        assert_eq!(
            book.pool.to_string(),
            "0x59251e79980f5443ed3a77e2c746f63e5ae9a785"
        );
        assert_eq!(
            book.sale.to_string(),
            "0x3218e008b5261010339463072af7b734456c9722"
        );
    }

    #[test]
    fn ltv_above_one_hundred_percent_is_invalid() {
        let mut cfg = ClientConfig::default();
        cfg.lending.ltv_bps = 10_001;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("ltv_bps"), "{err}");
    }
}
