//! Contract ABI for the methods and events the client touches.
//!
//! Only the static shapes in use are covered: every argument and every
//! return value is a single 32-byte word (`address`, `uint256`, `bool`) or a
//! fixed tuple of them, so there is no dynamic-offset handling.
//!
//! Selectors are the first four bytes of `keccak256(signature)`; event topics
//! are the full hash. They are fixed, so they are tabled here instead of
//! hashed at runtime.

use hclm_schemas::{
    Address, Amount, DebtTuple, EventKind, LedgerEvent, ReadMethod, ReadValue, ValueKind,
    WriteMethod,
};

use crate::LedgerError;

pub const WORD: usize = 32;

pub type Selector = [u8; 4];

// view methods
pub const BALANCE_OF: Selector = [0x70, 0xa0, 0x82, 0x31];
pub const PENDING_REWARDS: Selector = [0x31, 0xd7, 0xa2, 0x62];
pub const DEBTS: Selector = [0x2e, 0xcd, 0x4e, 0x7d];
pub const COLLATERAL_ETH: Selector = [0x6a, 0xd3, 0xd8, 0x2b];
pub const REWARD_INDEX: Selector = [0xe9, 0xee, 0x2f, 0xa9];
pub const ALLOWANCE: Selector = [0xdd, 0x62, 0xed, 0x3e];
pub const OWNER: Selector = [0x8d, 0xa5, 0xcb, 0x5b];
pub const ACTIVE: Selector = [0x02, 0xfb, 0x0c, 0x5e];
pub const PER_WALLET_CAP_ETH: Selector = [0x9a, 0x2c, 0xd4, 0xee];
pub const GLOBAL_CAP_ETH: Selector = [0xda, 0x43, 0x8f, 0x59];
pub const IN_ETH_BY_USER: Selector = [0x9c, 0xc6, 0xf4, 0xd2];
pub const TOTAL_IN_ETH: Selector = [0xdd, 0x21, 0xfc, 0x00];

// state-changing methods
pub const APPROVE: Selector = [0x09, 0x5e, 0xa7, 0xb3];
pub const CLAIM: Selector = [0x4e, 0x71, 0xd9, 0x2d];
pub const ADD_REWARDS: Selector = [0xbe, 0xce, 0xed, 0x39];
pub const DEPOSIT_ETH: Selector = [0xf6, 0x32, 0x6f, 0xb3];
pub const WITHDRAW_COLLATERAL: Selector = [0x61, 0x12, 0xfe, 0x2e];
pub const BORROW_HCLM: Selector = [0x0b, 0xfa, 0xbe, 0xc5];
pub const REPAY: Selector = [0x37, 0x1f, 0xd8, 0xe6];
pub const BUY: Selector = [0xa6, 0xf2, 0xae, 0x3a];

/// `RewardsAdded(uint256,uint256,uint256)`
pub const REWARDS_ADDED_TOPIC: [u8; 32] = [
    0xbf, 0xf8, 0xd5, 0xce, 0xd9, 0x55, 0xe6, 0xf6, 0x9a, 0x19, 0xec, 0xc7, 0x1d, 0x31, 0x39,
    0x96, 0xf6, 0xdd, 0xfe, 0xd6, 0x52, 0xcd, 0xb4, 0x58, 0x85, 0x9a, 0xf8, 0x9e, 0x2f, 0x07,
    0x68, 0x35,
];

/// `Waterfalled(uint256)`
pub const WATERFALLED_TOPIC: [u8; 32] = [
    0x49, 0xa3, 0xcf, 0x54, 0xc8, 0xb7, 0xb4, 0xa5, 0xd9, 0xab, 0x9d, 0x39, 0xc5, 0xac, 0x64,
    0xe1, 0xe3, 0xcf, 0x4a, 0x09, 0x50, 0xa1, 0x90, 0x55, 0xea, 0x6c, 0x8b, 0x7f, 0x52, 0x85,
    0xf8, 0x35,
];

pub fn read_selector(method: &ReadMethod) -> Selector {
    match method {
        ReadMethod::BalanceOf { .. } => BALANCE_OF,
        ReadMethod::PendingRewards { .. } => PENDING_REWARDS,
        ReadMethod::Debts { .. } => DEBTS,
        ReadMethod::CollateralEth { .. } => COLLATERAL_ETH,
        ReadMethod::RewardIndex => REWARD_INDEX,
        ReadMethod::Allowance { .. } => ALLOWANCE,
        ReadMethod::Owner => OWNER,
        ReadMethod::Active => ACTIVE,
        ReadMethod::PerWalletCapEth => PER_WALLET_CAP_ETH,
        ReadMethod::GlobalCapEth => GLOBAL_CAP_ETH,
        ReadMethod::InEthByUser { .. } => IN_ETH_BY_USER,
        ReadMethod::TotalInEth => TOTAL_IN_ETH,
    }
}

pub fn write_selector(method: &WriteMethod) -> Selector {
    match method {
        WriteMethod::Approve { .. } => APPROVE,
        WriteMethod::Claim => CLAIM,
        WriteMethod::AddRewards { .. } => ADD_REWARDS,
        WriteMethod::DepositEth => DEPOSIT_ETH,
        WriteMethod::WithdrawCollateral { .. } => WITHDRAW_COLLATERAL,
        WriteMethod::BorrowHclm { .. } => BORROW_HCLM,
        WriteMethod::Repay { .. } => REPAY,
        WriteMethod::Buy => BUY,
    }
}

pub fn event_topic(kind: EventKind) -> [u8; 32] {
    match kind {
        EventKind::RewardsAdded => REWARDS_ADDED_TOPIC,
        EventKind::Waterfalled => WATERFALLED_TOPIC,
    }
}

pub fn event_kind_for_topic(topic: &[u8]) -> Option<EventKind> {
    if topic == REWARDS_ADDED_TOPIC {
        Some(EventKind::RewardsAdded)
    } else if topic == WATERFALLED_TOPIC {
        Some(EventKind::Waterfalled)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

pub fn address_word(a: &Address) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[12..].copy_from_slice(a.as_bytes());
    w
}

pub fn uint_word(v: Amount) -> [u8; WORD] {
    let mut w = [0u8; WORD];
    w[16..].copy_from_slice(&v.raw().to_be_bytes());
    w
}

fn calldata(selector: Selector, words: &[[u8; WORD]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + words.len() * WORD);
    out.extend_from_slice(&selector);
    for w in words {
        out.extend_from_slice(w);
    }
    out
}

pub fn encode_read(method: &ReadMethod) -> Vec<u8> {
    let sel = read_selector(method);
    match method {
        ReadMethod::BalanceOf { account }
        | ReadMethod::PendingRewards { account }
        | ReadMethod::Debts { account }
        | ReadMethod::CollateralEth { account }
        | ReadMethod::InEthByUser { account } => calldata(sel, &[address_word(account)]),
        ReadMethod::Allowance { owner, spender } => {
            calldata(sel, &[address_word(owner), address_word(spender)])
        }
        ReadMethod::RewardIndex
        | ReadMethod::Owner
        | ReadMethod::Active
        | ReadMethod::PerWalletCapEth
        | ReadMethod::GlobalCapEth
        | ReadMethod::TotalInEth => calldata(sel, &[]),
    }
}

pub fn encode_write(method: &WriteMethod) -> Vec<u8> {
    let sel = write_selector(method);
    match method {
        WriteMethod::Approve { spender, amount } => {
            calldata(sel, &[address_word(spender), uint_word(*amount)])
        }
        WriteMethod::AddRewards { amount }
        | WriteMethod::BorrowHclm { amount }
        | WriteMethod::Repay { amount } => calldata(sel, &[uint_word(*amount)]),
        WriteMethod::WithdrawCollateral { eth_wei } => calldata(sel, &[uint_word(*eth_wei)]),
        WriteMethod::Claim | WriteMethod::DepositEth | WriteMethod::Buy => calldata(sel, &[]),
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn word_at<'a>(method: &str, data: &'a [u8], idx: usize) -> Result<&'a [u8], LedgerError> {
    let start = idx * WORD;
    data.get(start..start + WORD).ok_or_else(|| {
        LedgerError::decode(
            method,
            format!("need word {} but return data is {} bytes", idx, data.len()),
        )
    })
}

fn require_zero_prefix(method: &str, word: &[u8], len: usize, what: &str) -> Result<(), LedgerError> {
    if word[..len].iter().any(|b| *b != 0) {
        return Err(LedgerError::decode(method, format!("{what} out of range")));
    }
    Ok(())
}

pub fn decode_uint(method: &str, word: &[u8]) -> Result<Amount, LedgerError> {
    require_zero_prefix(method, word, 16, "uint256")?;
    let mut b = [0u8; 16];
    b.copy_from_slice(&word[16..WORD]);
    Ok(Amount::new(u128::from_be_bytes(b)))
}

fn decode_u64(method: &str, word: &[u8]) -> Result<u64, LedgerError> {
    require_zero_prefix(method, word, 24, "timestamp")?;
    let mut b = [0u8; 8];
    b.copy_from_slice(&word[24..WORD]);
    Ok(u64::from_be_bytes(b))
}

fn decode_bool(method: &str, word: &[u8]) -> Result<bool, LedgerError> {
    require_zero_prefix(method, word, 31, "bool")?;
    match word[31] {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(LedgerError::decode(method, format!("bool byte {other}"))),
    }
}

fn decode_address(method: &str, word: &[u8]) -> Result<Address, LedgerError> {
    require_zero_prefix(method, word, 12, "address")?;
    let mut b = [0u8; 20];
    b.copy_from_slice(&word[12..WORD]);
    Ok(Address::from_bytes(b))
}

/// Decode the return data of `method` into the shape it promises.
pub fn decode_return(method: &ReadMethod, data: &[u8]) -> Result<ReadValue, LedgerError> {
    let name = method.name();
    match method.value_kind() {
        ValueKind::Uint => Ok(ReadValue::Uint(decode_uint(name, word_at(name, data, 0)?)?)),
        ValueKind::Bool => Ok(ReadValue::Bool(decode_bool(name, word_at(name, data, 0)?)?)),
        ValueKind::Address => Ok(ReadValue::Address(decode_address(
            name,
            word_at(name, data, 0)?,
        )?)),
        ValueKind::Debt => Ok(ReadValue::Debt(DebtTuple {
            principal: decode_uint(name, word_at(name, data, 0)?)?,
            interest: decode_uint(name, word_at(name, data, 1)?)?,
            last_update_ts: decode_u64(name, word_at(name, data, 2)?)?,
        })),
    }
}

/// Decode the non-indexed data of one log.
pub fn decode_event(kind: EventKind, data: &[u8]) -> Result<LedgerEvent, LedgerError> {
    let name = kind.name();
    match kind {
        EventKind::RewardsAdded => Ok(LedgerEvent::RewardsAdded {
            amount: decode_uint(name, word_at(name, data, 0)?)?,
            index_delta: decode_uint(name, word_at(name, data, 1)?)?,
            new_reward_index: decode_uint(name, word_at(name, data, 2)?)?,
        }),
        EventKind::Waterfalled => Ok(LedgerEvent::Waterfalled {
            to_rewards: decode_uint(name, word_at(name, data, 0)?)?,
        }),
    }
}

/// `0x`-prefixed lower-case hex.
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

pub fn from_hex(method: &str, s: &str) -> Result<Vec<u8>, LedgerError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(body).map_err(|e| LedgerError::decode(method, format!("bad hex: {e}")))
}
