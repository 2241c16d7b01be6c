//! Action tools the agent may invoke during a turn
//!
//! Tools are stateless singletons; per-call context arrives via `ToolContext`.

pub mod chain;
mod balance;
mod transaction_status;
mod transfer;
mod wallet_details;

pub use balance::GetBalanceTool;
pub use chain::{ChainClient, ChainError, Wallet};
pub use transaction_status::TransactionStatusTool;
pub use transfer::NativeTransferTool;
pub use wallet_details::WalletDetailsTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::llm::ToolDefinition;

/// Result from tool execution, visible to the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub success: bool,
    pub output: String,
}

impl ToolOutput {
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: message.into(),
        }
    }
}

/// Failure that aborts the turn instead of being shown to the model
#[derive(Debug, Error)]
#[error("tool {tool} failed: {message}")]
pub struct ToolError {
    pub tool: String,
    pub message: String,
}

impl ToolError {
    pub fn new(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            message: message.into(),
        }
    }
}

/// Context for a single tool invocation
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// Session the invocation belongs to
    pub session_id: String,
}

/// Trait for tools that can be executed by the agent
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name
    fn name(&self) -> &str;

    /// Tool description for LLM
    fn description(&self) -> String;

    /// JSON schema for tool input
    fn input_schema(&self) -> Value;

    /// Execute the tool.
    ///
    /// Bad input and errors the chain reports (insufficient funds, unknown
    /// hash) come back as `Ok(ToolOutput::error(..))` so the model can react.
    /// `Err` is reserved for failures reaching the chain at all.
    async fn run(&self, input: Value, ctx: ToolContext) -> Result<ToolOutput, ToolError>;
}

/// Fixed collection of tools bound to the agent
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { tools }
    }

    /// Wallet tool set backed by one chain endpoint
    pub fn wallet(wallet: Arc<Wallet>) -> Self {
        Self::new(vec![
            Arc::new(WalletDetailsTool::new(wallet.clone())),
            Arc::new(GetBalanceTool::new(wallet.clone())),
            Arc::new(NativeTransferTool::new(wallet.clone())),
            Arc::new(TransactionStatusTool::new(wallet)),
        ])
    }

    /// Get all tool definitions for LLM
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name().to_string(),
                description: t.description(),
                input_schema: t.input_schema(),
            })
            .collect()
    }

    /// Execute a tool by name; `None` if no such tool is registered
    pub async fn execute(
        &self,
        name: &str,
        input: Value,
        ctx: ToolContext,
    ) -> Option<Result<ToolOutput, ToolError>> {
        for tool in &self.tools {
            if tool.name() == name {
                return Some(tool.run(input, ctx).await);
            }
        }
        None
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
