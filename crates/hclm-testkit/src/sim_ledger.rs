//! Deterministic in-memory ledger.
//!
//! Models the four contracts just far enough to exercise the workflows:
//! token balances and allowances, pending rewards and the reward index, pool
//! debt with lazily materialised interest, collateral, and the sale.
//!
//! Time model: a write executes when its receipt is first polled. Each
//! execution advances the clock by the configured confirmation latency and
//! the tip by one height. Interest accrues at a fixed amount per second while
//! principal is outstanding, and is only folded into the recorded debt when a
//! write touches the position. Reads return the recorded (possibly behind)
//! values, as the real pool does.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use hclm_config::ContractBook;
use hclm_ledger::{LedgerError, LedgerTransport};
use hclm_schemas::{
    Address, Amount, BlockHeight, ChainId, DebtTuple, LedgerEvent, LogEntry, LogFilter, OpHandle,
    ReadCall, ReadMethod, ReadValue, Receipt, ReceiptStatus, WriteCall, WriteMethod,
};

const GENESIS_TS: u64 = 1_700_000_000;

#[derive(Debug, Clone, Copy, Default)]
struct SimDebt {
    principal: Amount,
    interest: Amount,
    last_ts: u64,
    /// Accrued but not yet recorded, on top of the rate-based accrual.
    unrecorded: Amount,
}

impl SimDebt {
    fn tuple(&self) -> DebtTuple {
        DebtTuple {
            principal: self.principal,
            interest: self.interest,
            last_update_ts: self.last_ts,
        }
    }
}

#[derive(Debug)]
struct PendingWrite {
    from: Address,
    call: WriteCall,
}

#[derive(Debug)]
struct SimState {
    chain_id: ChainId,
    owner: Address,
    block: BlockHeight,
    now: u64,

    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    pending_rewards: HashMap<Address, Amount>,
    reward_index: Amount,

    debts: HashMap<Address, SimDebt>,
    collateral: HashMap<Address, Amount>,

    sale_active: bool,
    per_wallet_cap: Amount,
    global_cap: Amount,
    in_eth_by_user: HashMap<Address, Amount>,
    total_in_eth: Amount,

    logs: Vec<LogEntry>,
    pending: HashMap<OpHandle, PendingWrite>,
    receipts: HashMap<OpHandle, Receipt>,
    revert_reasons: HashMap<OpHandle, String>,
    next_tx: u64,

    submitted: Vec<(Address, WriteCall)>,
    reads: usize,
    failing_reads: HashSet<&'static str>,
    failing_once: HashMap<&'static str, usize>,
    withhold: bool,
    switch_requests: Vec<ChainId>,
}

/// Simulated ledger implementing [`LedgerTransport`].
#[derive(Debug)]
pub struct SimLedger {
    contracts: ContractBook,
    interest_per_sec: u128,
    latency_secs: u64,
    sale_rate: u128,
    ltv_bps: u128,
    state: Mutex<SimState>,
}

impl SimLedger {
    pub fn new(contracts: ContractBook, owner: Address) -> Self {
        Self {
            contracts,
            interest_per_sec: 0,
            latency_secs: 12,
            sale_rate: 1_000,
            ltv_bps: 5_000,
            state: Mutex::new(SimState {
                chain_id: ChainId::SEPOLIA,
                owner,
                block: 1,
                now: GENESIS_TS,
                balances: HashMap::new(),
                allowances: HashMap::new(),
                pending_rewards: HashMap::new(),
                reward_index: Amount::ZERO,
                debts: HashMap::new(),
                collateral: HashMap::new(),
                sale_active: true,
                per_wallet_cap: Amount::ZERO,
                global_cap: Amount::ZERO,
                in_eth_by_user: HashMap::new(),
                total_in_eth: Amount::ZERO,
                logs: Vec::new(),
                pending: HashMap::new(),
                receipts: HashMap::new(),
                revert_reasons: HashMap::new(),
                next_tx: 1,
                submitted: Vec::new(),
                reads: 0,
                failing_reads: HashSet::new(),
                failing_once: HashMap::new(),
                withhold: false,
                switch_requests: Vec::new(),
            }),
        }
    }

    /// Interest added per second while principal is outstanding.
    pub fn with_interest_per_sec(mut self, rate: u128) -> Self {
        self.interest_per_sec = rate;
        self
    }

    /// Seconds the clock advances per confirmed write.
    pub fn with_confirmation_latency(mut self, secs: u64) -> Self {
        self.latency_secs = secs;
        self
    }

    pub fn with_chain_id(self, chain: ChainId) -> Self {
        self.lock().chain_id = chain;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        // A poisoned lock only happens after a test already panicked.
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    pub fn set_token_balance(&self, who: Address, amount: Amount) {
        self.lock().balances.insert(who, amount);
    }

    pub fn set_allowance(&self, owner: Address, spender: Address, amount: Amount) {
        self.lock().allowances.insert((owner, spender), amount);
    }

    pub fn set_pending_rewards(&self, who: Address, amount: Amount) {
        self.lock().pending_rewards.insert(who, amount);
    }

    pub fn set_collateral(&self, who: Address, amount: Amount) {
        self.lock().collateral.insert(who, amount);
    }

    /// Record a debt position. `unrecorded` is interest already owed but not
    /// yet visible through `debts` until the next touching write.
    pub fn seed_debt(&self, who: Address, principal: Amount, interest: Amount, unrecorded: Amount) {
        let mut s = self.lock();
        let now = s.now;
        s.debts.insert(
            who,
            SimDebt {
                principal,
                interest,
                last_ts: now,
                unrecorded,
            },
        );
    }

    pub fn set_sale(&self, active: bool, per_wallet_cap: Amount, global_cap: Amount) {
        let mut s = self.lock();
        s.sale_active = active;
        s.per_wallet_cap = per_wallet_cap;
        s.global_cap = global_cap;
    }

    pub fn set_in_eth_by_user(&self, who: Address, amount: Amount) {
        let mut s = self.lock();
        let prev = s.in_eth_by_user.insert(who, amount).unwrap_or(Amount::ZERO);
        s.total_in_eth = s.total_in_eth.saturating_sub(prev).saturating_add(amount);
    }

    /// Move the tip forward. Never moves it backwards.
    pub fn advance_to_block(&self, height: BlockHeight) {
        let mut s = self.lock();
        s.block = s.block.max(height);
    }

    pub fn emit_rewards_added(&self, block: BlockHeight, amount: Amount) {
        let mut s = self.lock();
        let new_reward_index = s.reward_index.saturating_add(amount);
        s.reward_index = new_reward_index;
        let emitter = self.contracts.token;
        push_log(
            &mut s,
            block,
            emitter,
            LedgerEvent::RewardsAdded {
                amount,
                index_delta: amount,
                new_reward_index,
            },
        );
    }

    pub fn emit_waterfalled(&self, block: BlockHeight, to_rewards: Amount) {
        let mut s = self.lock();
        let emitter = self.contracts.pool;
        push_log(&mut s, block, emitter, LedgerEvent::Waterfalled { to_rewards });
    }

    // -----------------------------------------------------------------------
    // Fault injection
    // -----------------------------------------------------------------------

    /// Make every read of `method` (solidity name) fail with a transport error.
    pub fn fail_reads(&self, method: &'static str) {
        self.lock().failing_reads.insert(method);
    }

    /// Fail only the next `count` reads of `method`.
    pub fn fail_next_reads(&self, method: &'static str, count: usize) {
        *self.lock().failing_once.entry(method).or_default() += count;
    }

    pub fn clear_read_failures(&self) {
        let mut s = self.lock();
        s.failing_reads.clear();
        s.failing_once.clear();
    }

    /// While on, submitted writes stay pending forever.
    pub fn withhold_confirmations(&self, on: bool) {
        self.lock().withhold = on;
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    pub fn token_balance(&self, who: Address) -> Amount {
        balance(&self.lock(), who)
    }

    pub fn allowance_of(&self, owner: Address, spender: Address) -> Amount {
        self.lock()
            .allowances
            .get(&(owner, spender))
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    /// Recorded debt (what `debts` would return).
    pub fn debt_of(&self, who: Address) -> DebtTuple {
        self.lock()
            .debts
            .get(&who)
            .map(SimDebt::tuple)
            .unwrap_or_default()
    }

    pub fn collateral_of(&self, who: Address) -> Amount {
        self.lock()
            .collateral
            .get(&who)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn pending_rewards_of(&self, who: Address) -> Amount {
        self.lock()
            .pending_rewards
            .get(&who)
            .copied()
            .unwrap_or(Amount::ZERO)
    }

    pub fn reward_index(&self) -> Amount {
        self.lock().reward_index
    }

    pub fn tip(&self) -> BlockHeight {
        self.lock().block
    }

    pub fn read_count(&self) -> usize {
        self.lock().reads
    }

    /// Every write ever submitted, in order, including ones that reverted.
    pub fn submitted(&self) -> Vec<WriteCall> {
        self.lock()
            .submitted
            .iter()
            .map(|(_, c)| c.clone())
            .collect()
    }

    pub fn write_count(&self) -> usize {
        self.lock().submitted.len()
    }

    pub fn switch_requests(&self) -> Vec<ChainId> {
        self.lock().switch_requests.clone()
    }

    // -----------------------------------------------------------------------
    // Execution
    // -----------------------------------------------------------------------

    fn materialise(&self, s: &mut SimState, who: Address) {
        let now = s.now;
        let rate = self.interest_per_sec;
        if let Some(d) = s.debts.get_mut(&who) {
            let elapsed = u128::from(now.saturating_sub(d.last_ts));
            let accrued = if d.principal.is_zero() {
                Amount::ZERO
            } else {
                Amount::new(rate.saturating_mul(elapsed))
            };
            d.interest = d
                .interest
                .saturating_add(accrued)
                .saturating_add(d.unrecorded);
            d.unrecorded = Amount::ZERO;
            d.last_ts = now;
        }
    }

    fn execute(&self, s: &mut SimState, from: Address, call: &WriteCall) -> Result<(), String> {
        let c = &self.contracts;
        let expected_target = match call.method {
            WriteMethod::Approve { .. } | WriteMethod::Claim | WriteMethod::AddRewards { .. } => {
                c.token
            }
            WriteMethod::DepositEth
            | WriteMethod::WithdrawCollateral { .. }
            | WriteMethod::BorrowHclm { .. }
            | WriteMethod::Repay { .. } => c.pool,
            WriteMethod::Buy => c.sale,
        };
        if call.target != expected_target {
            return Err(format!("{} not implemented by {}", call.method.name(), call.target));
        }
        if !call.value.is_zero() && !call.method.is_payable() {
            return Err(format!("{} is not payable", call.method.name()));
        }

        match call.method {
            WriteMethod::Approve { spender, amount } => {
                s.allowances.insert((from, spender), amount);
            }
            WriteMethod::Claim => {
                let owed = s.pending_rewards.get(&from).copied().unwrap_or(Amount::ZERO);
                if owed.is_zero() {
                    return Err("nothing to claim".into());
                }
                let token = c.token;
                debit(s, token, owed)?;
                credit(s, from, owed);
                s.pending_rewards.insert(from, Amount::ZERO);
            }
            WriteMethod::AddRewards { amount } => {
                if from != s.owner {
                    return Err("not owner".into());
                }
                let token = c.token;
                debit(s, token, amount)
                    .map_err(|_| "insufficient reward funds".to_string())?;
                let new_reward_index = s.reward_index.saturating_add(amount);
                s.reward_index = new_reward_index;
                let block = s.block;
                push_log(
                    s,
                    block,
                    token,
                    LedgerEvent::RewardsAdded {
                        amount,
                        index_delta: amount,
                        new_reward_index,
                    },
                );
            }
            WriteMethod::DepositEth => {
                if call.value.is_zero() {
                    return Err("zero deposit".into());
                }
                let cur = s.collateral.get(&from).copied().unwrap_or(Amount::ZERO);
                s.collateral.insert(from, cur.saturating_add(call.value));
            }
            WriteMethod::WithdrawCollateral { eth_wei } => {
                self.materialise(s, from);
                let debt = s.debts.get(&from).map(|d| d.tuple().total()).unwrap_or(Amount::ZERO);
                if !debt.is_zero() {
                    return Err("debt outstanding".into());
                }
                let cur = s.collateral.get(&from).copied().unwrap_or(Amount::ZERO);
                let rest = cur
                    .checked_sub(eth_wei)
                    .ok_or_else(|| "insufficient collateral".to_string())?;
                s.collateral.insert(from, rest);
            }
            WriteMethod::BorrowHclm { amount } => {
                self.materialise(s, from);
                let collateral = s.collateral.get(&from).copied().unwrap_or(Amount::ZERO);
                let max = collateral
                    .checked_mul_div(self.sale_rate * self.ltv_bps, 10_000)
                    .unwrap_or(Amount::MAX);
                let now = s.now;
                let d = s.debts.entry(from).or_insert(SimDebt {
                    last_ts: now,
                    ..SimDebt::default()
                });
                let principal = d.principal.saturating_add(amount);
                if principal > max {
                    return Err("exceeds ltv".into());
                }
                d.principal = principal;
                credit(s, from, amount);
            }
            WriteMethod::Repay { amount } => {
                self.materialise(s, from);
                let total = s.debts.get(&from).map(|d| d.tuple().total()).unwrap_or(Amount::ZERO);
                if total.is_zero() {
                    return Err("no debt".into());
                }
                let vault = c.vault;
                let allowed = s
                    .allowances
                    .get(&(from, vault))
                    .copied()
                    .unwrap_or(Amount::ZERO);
                if allowed < amount {
                    return Err("insufficient allowance".into());
                }
                debit(s, from, amount)?;
                credit(s, vault, amount);
                s.allowances.insert((from, vault), allowed.saturating_sub(amount));

                // interest first, then principal; any excess is kept
                if let Some(d) = s.debts.get_mut(&from) {
                    let to_interest = amount.min(d.interest);
                    d.interest = d.interest.saturating_sub(to_interest);
                    let rest = amount.saturating_sub(to_interest);
                    d.principal = d.principal.saturating_sub(rest);
                }
            }
            WriteMethod::Buy => {
                if !s.sale_active {
                    return Err("sale inactive".into());
                }
                if call.value.is_zero() {
                    return Err("zero purchase".into());
                }
                let spent = s.in_eth_by_user.get(&from).copied().unwrap_or(Amount::ZERO);
                let spent_after = spent.saturating_add(call.value);
                if !s.per_wallet_cap.is_zero() && spent_after > s.per_wallet_cap {
                    return Err("wallet cap".into());
                }
                let total_after = s.total_in_eth.saturating_add(call.value);
                if !s.global_cap.is_zero() && total_after > s.global_cap {
                    return Err("global cap".into());
                }
                let tokens = call
                    .value
                    .checked_mul_div(self.sale_rate, 1)
                    .unwrap_or(Amount::MAX);
                let sale = c.sale;
                debit(s, sale, tokens).map_err(|_| "sale sold out".to_string())?;
                credit(s, from, tokens);
                s.in_eth_by_user.insert(from, spent_after);
                s.total_in_eth = total_after;
            }
        }
        Ok(())
    }

    fn read(&self, s: &SimState, call: &ReadCall) -> Result<ReadValue, LedgerError> {
        let c = &self.contracts;
        let expected_target = match call.method {
            ReadMethod::BalanceOf { .. }
            | ReadMethod::PendingRewards { .. }
            | ReadMethod::RewardIndex
            | ReadMethod::Allowance { .. }
            | ReadMethod::Owner => c.token,
            ReadMethod::Debts { .. } | ReadMethod::CollateralEth { .. } => c.pool,
            ReadMethod::Active
            | ReadMethod::PerWalletCapEth
            | ReadMethod::GlobalCapEth
            | ReadMethod::InEthByUser { .. }
            | ReadMethod::TotalInEth => c.sale,
        };
        if call.target != expected_target {
            return Err(LedgerError::Reverted {
                handle: None,
                message: format!("{} not implemented by {}", call.method.name(), call.target),
            });
        }

        let get = |m: &HashMap<Address, Amount>, who: &Address| {
            m.get(who).copied().unwrap_or(Amount::ZERO)
        };
        Ok(match &call.method {
            ReadMethod::BalanceOf { account } => ReadValue::Uint(get(&s.balances, account)),
            ReadMethod::PendingRewards { account } => {
                ReadValue::Uint(get(&s.pending_rewards, account))
            }
            ReadMethod::Debts { account } => ReadValue::Debt(
                s.debts
                    .get(account)
                    .map(SimDebt::tuple)
                    .unwrap_or_default(),
            ),
            ReadMethod::CollateralEth { account } => ReadValue::Uint(get(&s.collateral, account)),
            ReadMethod::RewardIndex => ReadValue::Uint(s.reward_index),
            ReadMethod::Allowance { owner, spender } => ReadValue::Uint(
                s.allowances
                    .get(&(*owner, *spender))
                    .copied()
                    .unwrap_or(Amount::ZERO),
            ),
            ReadMethod::Owner => ReadValue::Address(s.owner),
            ReadMethod::Active => ReadValue::Bool(s.sale_active),
            ReadMethod::PerWalletCapEth => ReadValue::Uint(s.per_wallet_cap),
            ReadMethod::GlobalCapEth => ReadValue::Uint(s.global_cap),
            ReadMethod::InEthByUser { account } => ReadValue::Uint(get(&s.in_eth_by_user, account)),
            ReadMethod::TotalInEth => ReadValue::Uint(s.total_in_eth),
        })
    }
}

fn balance(s: &SimState, who: Address) -> Amount {
    s.balances.get(&who).copied().unwrap_or(Amount::ZERO)
}

fn credit(s: &mut SimState, who: Address, amount: Amount) {
    let cur = balance(s, who);
    s.balances.insert(who, cur.saturating_add(amount));
}

fn debit(s: &mut SimState, who: Address, amount: Amount) -> Result<(), String> {
    let cur = balance(s, who);
    let rest = cur
        .checked_sub(amount)
        .ok_or_else(|| "insufficient balance".to_string())?;
    s.balances.insert(who, rest);
    Ok(())
}

fn push_log(s: &mut SimState, block: BlockHeight, emitter: Address, event: LedgerEvent) {
    let log_index = s.logs.iter().filter(|l| l.block == block).count() as u64;
    s.logs.push(LogEntry {
        block,
        log_index,
        emitter,
        event,
    });
}

#[async_trait]
impl LedgerTransport for SimLedger {
    fn name(&self) -> &'static str {
        "sim"
    }

    async fn chain_id(&self) -> Result<ChainId, LedgerError> {
        Ok(self.lock().chain_id)
    }

    async fn call(&self, call: &ReadCall) -> Result<ReadValue, LedgerError> {
        let mut s = self.lock();
        s.reads += 1;
        let name = call.method.name();
        let once = match s.failing_once.get_mut(name) {
            Some(left) if *left > 0 => {
                *left -= 1;
                true
            }
            _ => false,
        };
        if once || s.failing_reads.contains(name) {
            return Err(LedgerError::Transport(format!(
                "injected failure for {}",
                call.method.name()
            )));
        }
        self.read(&s, call)
    }

    async fn submit(&self, from: Address, call: &WriteCall) -> Result<OpHandle, LedgerError> {
        let mut s = self.lock();
        s.submitted.push((from, call.clone()));
        let handle = OpHandle::new(format!("0x{:064x}", s.next_tx));
        s.next_tx += 1;
        s.pending.insert(
            handle.clone(),
            PendingWrite {
                from,
                call: call.clone(),
            },
        );
        Ok(handle)
    }

    async fn receipt(&self, handle: &OpHandle) -> Result<Option<Receipt>, LedgerError> {
        let mut s = self.lock();
        if let Some(r) = s.receipts.get(handle) {
            return Ok(Some(r.clone()));
        }
        if s.withhold {
            return Ok(None);
        }
        let Some(pending) = s.pending.remove(handle) else {
            return Ok(None);
        };

        s.now += self.latency_secs;
        s.block += 1;
        let status = match self.execute(&mut s, pending.from, &pending.call) {
            Ok(()) => ReceiptStatus::Confirmed,
            Err(reason) => {
                s.revert_reasons.insert(handle.clone(), reason);
                ReceiptStatus::Reverted
            }
        };
        let receipt = Receipt {
            handle: handle.clone(),
            block: s.block,
            status,
        };
        s.receipts.insert(handle.clone(), receipt.clone());
        Ok(Some(receipt))
    }

    async fn block_number(&self) -> Result<BlockHeight, LedgerError> {
        Ok(self.lock().block)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        let s = self.lock();
        let mut out: Vec<LogEntry> = s
            .logs
            .iter()
            .filter(|l| {
                l.emitter == filter.emitter
                    && l.event.kind() == filter.event
                    && l.block >= filter.from_block
                    && l.block <= filter.to_block
            })
            .cloned()
            .collect();
        out.sort_by_key(|l| (l.block, l.log_index));
        Ok(out)
    }

    async fn revert_reason(&self, receipt: &Receipt) -> Result<Option<String>, LedgerError> {
        Ok(self.lock().revert_reasons.get(&receipt.handle).cloned())
    }

    async fn request_network_switch(&self, chain: ChainId) -> Result<(), LedgerError> {
        self.lock().switch_requests.push(chain);
        Ok(())
    }
}
