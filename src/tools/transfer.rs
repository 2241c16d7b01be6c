//! `native_transfer` - send native token from the agent wallet

use super::chain::{is_address, parse_ether, Wallet};
use super::{Tool, ToolContext, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct NativeTransferTool {
    wallet: Arc<Wallet>,
}

impl NativeTransferTool {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }
}

#[derive(Debug, Deserialize)]
struct TransferInput {
    to: String,
    /// Decimal ETH amount, e.g. "0.01"
    amount: String,
}

#[async_trait]
impl Tool for NativeTransferTool {
    fn name(&self) -> &'static str {
        "native_transfer"
    }

    fn description(&self) -> String {
        "Transfer native token (ETH) from the agent wallet to another address. Returns the transaction hash once submitted; use get_transaction_status to check confirmation.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["to", "amount"],
            "properties": {
                "to": {
                    "type": "string",
                    "description": "0x-prefixed destination address"
                },
                "amount": {
                    "type": "string",
                    "description": "Amount in ETH as a decimal string, e.g. \"0.01\""
                }
            }
        })
    }

    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        let input: TransferInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid input: {e}"))),
        };
        if !is_address(&input.to) {
            return Ok(ToolOutput::error(format!("Not a valid address: {}", input.to)));
        }
        let value = match parse_ether(&input.amount) {
            Ok(0) => return Ok(ToolOutput::error("Amount must be greater than zero")),
            Ok(v) => v,
            Err(e) => return Ok(ToolOutput::error(e)),
        };

        tracing::info!(
            session_id = %ctx.session_id,
            to = %input.to,
            amount = %input.amount,
            "Submitting native transfer"
        );

        match self
            .wallet
            .client
            .send_transaction(&self.wallet.address, &input.to, value)
            .await
        {
            Ok(hash) => Ok(ToolOutput::success(format!(
                "Transferred {} ETH to {}. Transaction hash: {hash}",
                input.amount, input.to
            ))),
            Err(e) if e.is_rejection() => Ok(ToolOutput::error(e.to_string())),
            Err(e) => Err(ToolError::new(self.name(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::chain::test_support::{mock_result, mock_rpc_error, wallet};
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TO: &str = "0x2222222222222222222222222222222222222222";

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: "test-session".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sends_value_in_wei_hex() {
        let server = MockServer::start().await;
        let hash = format!("0x{}", "ab".repeat(32));
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "eth_sendTransaction",
                "params": [{ "to": TO, "value": "0x2386f26fc10000" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0", "id": 1, "result": hash
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = NativeTransferTool::new(wallet(&server));
        let output = tool
            .run(json!({"to": TO, "amount": "0.01"}), ctx())
            .await
            .unwrap();

        assert!(output.success, "{}", output.output);
        assert!(output.output.contains(&hash));
    }

    #[tokio::test]
    async fn test_zero_amount_rejected_without_rpc() {
        let server = MockServer::start().await;
        mock_result(&server, "eth_sendTransaction", json!("0x00")).await;

        let tool = NativeTransferTool::new(wallet(&server));
        let output = tool
            .run(json!({"to": TO, "amount": "0"}), ctx())
            .await
            .unwrap();

        assert!(!output.success);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_chain_rejection_is_model_visible() {
        let server = MockServer::start().await;
        mock_rpc_error(&server, "eth_sendTransaction", "insufficient funds for transfer").await;

        let tool = NativeTransferTool::new(wallet(&server));
        let output = tool
            .run(json!({"to": TO, "amount": "5"}), ctx())
            .await
            .unwrap();

        assert!(!output.success);
        assert!(output.output.contains("insufficient funds"));
    }

    #[tokio::test]
    async fn test_missing_amount_is_invalid_input() {
        let server = MockServer::start().await;
        let tool = NativeTransferTool::new(wallet(&server));
        let output = tool.run(json!({"to": TO}), ctx()).await.unwrap();
        assert!(output.output.starts_with("Invalid input"));
    }
}
