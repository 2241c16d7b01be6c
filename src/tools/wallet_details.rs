//! `get_wallet_details` - address, network and balance of the agent's wallet

use super::chain::{format_ether, ChainError, Wallet};
use super::{Tool, ToolContext, ToolError, ToolOutput};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

pub struct WalletDetailsTool {
    wallet: Arc<Wallet>,
}

impl WalletDetailsTool {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }

    async fn details(&self) -> Result<String, ChainError> {
        let chain_id = self.wallet.client.chain_id().await?;
        let balance = self.wallet.client.balance(&self.wallet.address).await?;
        Ok(format!(
            "Wallet details:\n- Address: {}\n- Chain ID: {chain_id}\n- Native balance: {} ETH",
            self.wallet.address,
            format_ether(balance)
        ))
    }
}

#[async_trait]
impl Tool for WalletDetailsTool {
    fn name(&self) -> &'static str {
        "get_wallet_details"
    }

    fn description(&self) -> String {
        "Get the agent wallet's address, the chain ID it is connected to, and its native token balance. Takes no input.".to_string()
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn run(&self, _input: Value, _ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        match self.details().await {
            Ok(text) => Ok(ToolOutput::success(text)),
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
    async fn test_reports_address_chain_and_balance() {
        let server = MockServer::start().await;
        mock_result(&server, "eth_chainId", json!("0x14a34")).await;
        mock_result(&server, "eth_getBalance", json!("0x6f05b59d3b20000")).await;

        let tool = WalletDetailsTool::new(wallet(&server));
        let output = tool.run(json!({}), ctx()).await.unwrap();

        assert!(output.success);
        assert!(output.output.contains(WALLET));
        assert!(output.output.contains("Chain ID: 84532"));
        assert!(output.output.contains("0.5 ETH"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_aborts() {
        let client = crate::tools::ChainClient::new("http://127.0.0.1:1", "s").unwrap();
        let tool = WalletDetailsTool::new(Arc::new(Wallet::new(client, WALLET.to_string())));
        let err = tool.run(json!({}), ctx()).await.unwrap_err();
        assert_eq!(err.tool, "get_wallet_details");
    }
}
