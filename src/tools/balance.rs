//! `get_balance` - native balance of any address

use super::chain::{format_ether, is_address, Wallet};
use super::{Tool, ToolContext, ToolError, ToolOutput};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct GetBalanceTool {
    wallet: Arc<Wallet>,
}

impl GetBalanceTool {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }
}

#[derive(Debug, Deserialize)]
struct BalanceInput {
    #[serde(default)]
    address: Option<String>,
}

#[async_trait]
impl Tool for GetBalanceTool {
    fn name(&self) -> &'static str {
        "get_balance"
    }

    fn description(&self) -> String {
        "Get the native token balance (in ETH) of an address. Defaults to the agent's own wallet when no address is given.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "address": {
                    "type": "string",
                    "description": "0x-prefixed address to query; omit for the agent wallet"
                }
            }
        })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        let input: BalanceInput = match serde_json::from_value(input) {
            Ok(i) => i,
            Err(e) => return Ok(ToolOutput::error(format!("Invalid input: {e}"))),
        };
        let address = input.address.unwrap_or_else(|| self.wallet.address.clone());
        if !is_address(&address) {
            return Ok(ToolOutput::error(format!("Not a valid address: {address}")));
        }

        match self.wallet.client.balance(&address).await {
            Ok(wei) => Ok(ToolOutput::success(format!(
                "Balance of {address}: {} ETH",
                format_ether(wei)
            ))),
            Err(e) if e.is_rejection() => Ok(ToolOutput::error(e.to_string())),
            Err(e) => Err(ToolError::new(self.name(), e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::chain::test_support::{mock_result, wallet, WALLET};
    use wiremock::MockServer;

    fn ctx() -> ToolContext {
        ToolContext {
            session_id: "test-session".to_string(),
        }
    }

    #[tokio::test]
    async fn test_defaults_to_wallet_address() {
        let server = MockServer::start().await;
        mock_result(&server, "eth_getBalance", json!("0xde0b6b3a7640000")).await;

        let tool = GetBalanceTool::new(wallet(&server));
        let output = tool.run(json!({}), ctx()).await.unwrap();

        assert!(output.success);
        assert_eq!(output.output, format!("Balance of {WALLET}: 1 ETH"));
    }

    #[tokio::test]
    async fn test_invalid_address_is_model_visible() {
        let server = MockServer::start().await;
        let tool = GetBalanceTool::new(wallet(&server));
        let output = tool
            .run(json!({"address": "vitalik.eth"}), ctx())
            .await
            .unwrap();

        assert!(!output.success);
        assert!(output.output.contains("Not a valid address"));
    }
}
