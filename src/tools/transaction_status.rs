//! `get_transaction_status` - confirmation state of a submitted transaction

use super::chain::{is_tx_hash, parse_quantity, Wallet};
use super::{Tool, ToolContext, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct TransactionStatusTool {
    wallet: Arc<Wallet>,
}

impl TransactionStatusTool {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }
}

#[derive(Debug, Deserialize)]
struct StatusInput {
    hash: String,
}

fn describe_receipt(hash: &str, receipt: &Value) -> String {
    let status = match receipt.get("status").and_then(Value::as_str) {
        Some("0x1") => "succeeded",
        Some("0x0") => "failed (reverted)",
        _ => "unknown",
    };
    let block = receipt
        .get("blockNumber")
        .and_then(Value::as_str)
        .and_then(parse_quantity)
        .map_or_else(|| "unknown".to_string(), |b| b.to_string());
    format!("Transaction {hash} {status} in block {block}")
}

#[async_trait]
impl Tool for TransactionStatusTool {
    fn name(&self) -> &'static str {
        "get_transaction_status"
    }

    fn description(&self) -> String {
        "Check whether a transaction has been mined and whether it succeeded.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["hash"],
            "properties": {
                "hash": {
                    "type": "string",
                    "description": "0x-prefixed transaction hash"
                }
            }
        })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        let input: StatusInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid input: {e}"))),
        };
        if !is_tx_hash(&input.hash) {
            return Ok(ToolOutput::error(format!(
                "Not a valid transaction hash: {}",
                input.hash
            )));
        }

        match self.wallet.client.transaction_receipt(&input.hash).await {
            Ok(Some(receipt)) => Ok(ToolOutput::success(describe_receipt(&input.hash, &receipt))),
            Ok(None) => Ok(ToolOutput::success(format!(
                "Transaction {} is pending or unknown",
                input.hash
            ))),
            Err(e) if e.is_rejection() => Ok(ToolOutput::error(e.to_string())),
            Err(e) => Err(ToolError::new(self.name(), e.to_string())),
        }
    }
}
