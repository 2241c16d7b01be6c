//! Reasoning engine seam
//!
//! An engine is started once per turn with the transcript so far and yields
//! discrete steps until it converges on an answer. The turn driver awaits each
//! step in sequence; the engine itself never touches the shared transcript.

mod agent;
mod prompt;

#[cfg(test)]
pub mod testing;

pub use agent::ToolCallingAgent;
use prompt::build_system_prompt;

use crate::config::AppConfig;
use crate::llm::{LlmError, LlmService, LoggingService, OpenAIService};
use crate::session::SessionConfig;
use crate::tools::{ChainClient, ChainError, ToolError, ToolRegistry, Wallet};
use crate::transcript::Message;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// One atomic unit of engine output within a turn
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Natural-language message from the agent
    Agent(Message),
    /// A tool invocation together with its observation
    Tool(Message),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("model request failed: {0}")]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Tool(#[from] ToolError),
}

/// Cursor over the steps of one running turn
#[async_trait]
pub trait StepSource: Send {
    /// Next step, or `None` once the engine has produced its final answer
    async fn next_step(&mut self) -> Result<Option<Step>, EngineError>;
}

/// A reasoning engine bound to its tool set
pub trait ReasoningEngine: Send + Sync {
    /// Begin a turn over `context`, the full transcript including the new
    /// user message.
    fn start(&self, context: Vec<Message>, session: &SessionConfig) -> Box<dyn StepSource>;
}

#[derive(Debug, Error)]
pub enum BindError {
    #[error("failed to create model client: {0}")]
    Llm(#[from] LlmError),
    #[error("failed to connect wallet: {0}")]
    Chain(#[from] ChainError),
}

/// Produces the engine binding during session initialization
#[async_trait]
pub trait EngineBinder: Send + Sync {
    async fn bind(&self) -> Result<Arc<dyn ReasoningEngine>, BindError>;
}

/// Binds an `OpenAI` model to the wallet tool set
pub struct WalletAgentBinder {
    config: AppConfig,
}

impl WalletAgentBinder {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl EngineBinder for WalletAgentBinder {
    async fn bind(&self) -> Result<Arc<dyn ReasoningEngine>, BindError> {
        let openai = OpenAIService::new(
            self.config.openai_api_key.clone(),
            self.config.model.clone(),
            self.config.openai_base_url.as_deref(),
        )?;
        let llm: Arc<dyn LlmService> = Arc::new(LoggingService::new(Arc::new(openai)));

        let client = ChainClient::new(
            self.config.chain_rpc_url.clone(),
            &self.config.wallet_signing_secret,
        )?;
        let wallet = Arc::new(Wallet::connect(client).await?);
        let tools = ToolRegistry::wallet(wallet);

        tracing::info!(
            model = %self.config.model,
            tools = tools.len(),
            "Reasoning engine bound"
        );

        Ok(Arc::new(ToolCallingAgent::new(llm, tools)))
    }
}
