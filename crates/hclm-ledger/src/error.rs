use hclm_schemas::{OpHandle, ValueKind};

/// Failure at the ledger boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// The request never produced a ledger answer (connection, HTTP status,
    /// malformed envelope).
    #[error("transport: {0}")]
    Transport(String),

    /// The node answered with a JSON-RPC error that is not a revert.
    #[error("rpc error code={code}: {message}")]
    Rpc { code: i64, message: String },

    /// The answer did not have the expected shape.
    #[error("decode {method}: {detail}")]
    Decode { method: String, detail: String },

    /// The ledger rejected the operation. `handle` is `None` when the
    /// rejection happened before a handle was issued.
    #[error("reverted{}: {message}", handle_suffix(.handle))]
    Reverted {
        handle: Option<OpHandle>,
        message: String,
    },

    /// No confirmation within the bounded wait. The operation may still land.
    #[error("no confirmation for {handle} after {waited_ms}ms")]
    Timeout { handle: OpHandle, waited_ms: u64 },
}

fn handle_suffix(handle: &Option<OpHandle>) -> String {
    handle
        .as_ref()
        .map(|h| format!(" ({h})"))
        .unwrap_or_default()
}

impl LedgerError {
    pub(crate) fn decode(method: &str, detail: impl Into<String>) -> Self {
        LedgerError::Decode {
            method: method.to_string(),
            detail: detail.into(),
        }
    }

    pub(crate) fn wrong_kind(method: &str, expected: ValueKind, got: ValueKind) -> Self {
        Self::decode(method, format!("expected {expected:?}, got {got:?}"))
    }

    pub fn is_revert(&self) -> bool {
        matches!(self, LedgerError::Reverted { .. })
    }
}
