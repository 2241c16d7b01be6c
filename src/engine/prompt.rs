//! System prompt for the wallet agent

use crate::tools::ToolRegistry;
use std::fmt::Write;

/// Base system prompt establishing the agent's role
const BASE_PROMPT: &str = r"You are a helpful agent that can act on-chain with your own wallet using the tools provided.

Before your first action in a conversation, call get_wallet_details to learn your address and which network you are on. Amounts are in ETH unless the user says otherwise.

Never invent transaction hashes, balances or addresses; only report what a tool returned. If a tool reports an error, explain it to the user and suggest what they can do. If you are asked to do something none of your tools support, say so plainly.

Be concise.";

/// Assemble the system prompt, listing the tools bound to the agent
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    let mut prompt = BASE_PROMPT.to_string();
    if tools.is_empty() {
        return prompt;
    }

    prompt.push_str("\n\nAvailable tools:\n");
    for def in tools.definitions() {
        let _ = writeln!(prompt, "- {}: {}", def.name, def.description);
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RecordingTool;
    use std::sync::Arc;

    #[test]
    fn test_prompt_lists_tools() {
        let tools = ToolRegistry::new(vec![Arc::new(RecordingTool::new("get_balance", "1 ETH"))]);
        let prompt = build_system_prompt(&tools);
        assert!(prompt.starts_with(BASE_PROMPT));
        assert!(prompt.contains("- get_balance: "));
    }

    #[test]
    fn test_prompt_without_tools() {
        assert_eq!(build_system_prompt(&ToolRegistry::default()), BASE_PROMPT);
    }
}
