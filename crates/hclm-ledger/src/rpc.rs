//! Ethereum JSON-RPC transport over HTTP.
//!
//! Signing is delegated to the node (`eth_sendTransaction`); this crate never
//! holds keys. The URL is resolved by the caller and must not be logged.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use hclm_schemas::{
    Address, BlockHeight, ChainId, LogEntry, LogFilter, OpHandle, ReadCall, ReadValue,
    Receipt, ReceiptStatus, WriteCall,
};

use crate::abi;
use crate::{LedgerError, LedgerTransport};

/// JSON-RPC error code nodes use for execution reverts.
const REVERT_CODE: i64 = 3;

#[derive(Debug)]
pub struct RpcTransport {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl RpcTransport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            next_id: AtomicU64::new(1),
        }
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Value,
    ) -> Result<T, LedgerError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(rpc = method, id, "rpc request");

        let resp = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(LedgerError::Transport(format!(
                "{method}: http status {}",
                status.as_u16()
            )));
        }

        let envelope: RpcEnvelope = resp
            .json()
            .await
            .map_err(|e| LedgerError::Transport(format!("{method}: bad json: {e}")))?;

        if let Some(err) = envelope.error {
            return Err(err.into_ledger_error());
        }

        serde_json::from_value(envelope.result.unwrap_or(Value::Null))
            .map_err(|e| LedgerError::decode(method, e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

impl RpcErrorBody {
    fn into_ledger_error(self) -> LedgerError {
        if self.code == REVERT_CODE || self.message.to_ascii_lowercase().contains("revert") {
            LedgerError::Reverted {
                handle: None,
                message: self.message,
            }
        } else {
            LedgerError::Rpc {
                code: self.code,
                message: self.message,
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    block_number: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RpcTransaction {
    from: String,
    #[serde(default)]
    to: Option<String>,
    input: String,
    #[serde(default)]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcLog {
    address: String,
    topics: Vec<String>,
    data: String,
    block_number: Option<String>,
    log_index: Option<String>,
    #[serde(default)]
    removed: bool,
}

fn quantity(v: u128) -> String {
    format!("0x{v:x}")
}

fn parse_quantity(method: &str, s: &str) -> Result<u64, LedgerError> {
    let body = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(body, 16)
        .map_err(|e| LedgerError::decode(method, format!("bad quantity '{s}': {e}")))
}

fn parse_address(method: &str, s: &str) -> Result<Address, LedgerError> {
    s.parse()
        .map_err(|e| LedgerError::decode(method, format!("bad address '{s}': {e}")))
}

#[async_trait]
impl LedgerTransport for RpcTransport {
    fn name(&self) -> &'static str {
        "json-rpc"
    }

    async fn chain_id(&self) -> Result<ChainId, LedgerError> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        Ok(ChainId(parse_quantity("eth_chainId", &raw)?))
    }

    async fn call(&self, call: &ReadCall) -> Result<ReadValue, LedgerError> {
        let data = abi::encode_read(&call.method);
        let raw: String = self
            .request(
                "eth_call",
                json!([{ "to": call.target.to_string(), "data": abi::to_hex(&data) }, "latest"]),
            )
            .await?;
        let bytes = abi::from_hex(call.method.name(), &raw)?;
        abi::decode_return(&call.method, &bytes)
    }

    async fn submit(&self, from: Address, call: &WriteCall) -> Result<OpHandle, LedgerError> {
        let data = abi::encode_write(&call.method);
        let mut tx = json!({
            "from": from.to_string(),
            "to": call.target.to_string(),
            "data": abi::to_hex(&data),
        });
        if !call.value.is_zero() {
            tx["value"] = Value::String(quantity(call.value.raw()));
        }
        let hash: String = self.request("eth_sendTransaction", json!([tx])).await?;
        Ok(OpHandle::new(hash))
    }

    async fn receipt(&self, handle: &OpHandle) -> Result<Option<Receipt>, LedgerError> {
        let raw: Option<RpcReceipt> = self
            .request("eth_getTransactionReceipt", json!([handle.as_str()]))
            .await?;
        let Some(r) = raw else {
            return Ok(None);
        };
        // Some nodes return a receipt shell before the block is assigned.
        let Some(block) = r.block_number else {
            return Ok(None);
        };
        let block = parse_quantity("eth_getTransactionReceipt", &block)?;
        let status = match r.status.as_deref() {
            Some("0x1") => ReceiptStatus::Confirmed,
            Some("0x0") => ReceiptStatus::Reverted,
            other => {
                return Err(LedgerError::decode(
                    "eth_getTransactionReceipt",
                    format!("unexpected status {other:?}"),
                ))
            }
        };
        Ok(Some(Receipt {
            handle: handle.clone(),
            block,
            status,
        }))
    }

    async fn block_number(&self) -> Result<BlockHeight, LedgerError> {
        let raw: String = self.request("eth_blockNumber", json!([])).await?;
        parse_quantity("eth_blockNumber", &raw)
    }

    async fn logs(&self, filter: &LogFilter) -> Result<Vec<LogEntry>, LedgerError> {
        let topic = abi::to_hex(&abi::event_topic(filter.event));
        let raw: Vec<RpcLog> = self
            .request(
                "eth_getLogs",
                json!([{
                    "address": filter.emitter.to_string(),
                    "topics": [topic],
                    "fromBlock": quantity(u128::from(filter.from_block)),
                    "toBlock": quantity(u128::from(filter.to_block)),
                }]),
            )
            .await?;

        let mut out = Vec::with_capacity(raw.len());
        for log in raw.into_iter().filter(|l| !l.removed) {
            let name = filter.event.name();
            let topic0 = log
                .topics
                .first()
                .ok_or_else(|| LedgerError::decode(name, "log without topics"))?;
            let kind = abi::event_kind_for_topic(&abi::from_hex(name, topic0)?);
            if kind != Some(filter.event) {
                continue;
            }
            let (Some(block), Some(index)) = (log.block_number, log.log_index) else {
                // pending log
                continue;
            };
            out.push(LogEntry {
                block: parse_quantity(name, &block)?,
                log_index: parse_quantity(name, &index)?,
                emitter: parse_address(name, &log.address)?,
                event: abi::decode_event(filter.event, &abi::from_hex(name, &log.data)?)?,
            });
        }
        Ok(out)
    }

    /// Replays the mined transaction as a call on its parent block's state
    /// and returns the node's revert message.
    async fn revert_reason(&self, receipt: &Receipt) -> Result<Option<String>, LedgerError> {
        let tx: Option<RpcTransaction> = self
            .request("eth_getTransactionByHash", json!([receipt.handle.as_str()]))
            .await?;
        let Some(tx) = tx else {
            return Ok(None);
        };
        let mut call = json!({ "from": tx.from, "data": tx.input });
        if let Some(to) = tx.to {
            call["to"] = Value::String(to);
        }
        if let Some(value) = tx.value {
            call["value"] = Value::String(value);
        }
        let parent = quantity(u128::from(receipt.block.saturating_sub(1)));
        match self.request::<Value>("eth_call", json!([call, parent])).await {
            Ok(_) => Ok(None),
            Err(LedgerError::Reverted { message, .. }) => Ok(Some(
                message
                    .strip_prefix("execution reverted: ")
                    .map(str::to_string)
                    .unwrap_or(message),
            )),
            Err(e) => Err(e),
        }
    }

    async fn request_network_switch(&self, chain: ChainId) -> Result<(), LedgerError> {
        let _: Value = self
            .request(
                "wallet_switchEthereumChain",
                json!([{ "chainId": quantity(u128::from(chain.0)) }]),
            )
            .await?;
        Ok(())
    }
}
