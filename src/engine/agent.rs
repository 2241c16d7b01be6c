//! Tool-calling agent: decide → act → observe over an LLM

use super::{build_system_prompt, EngineError, ReasoningEngine, Step, StepSource};
use crate::llm::{ContentBlock, LlmMessage, LlmRequest, LlmService, MessageRole, SystemContent};
use crate::session::SessionConfig;
use crate::tools::{ToolContext, ToolOutput, ToolRegistry};
use crate::transcript::{Message, Role, ToolInvocation};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

const MAX_TOKENS: u32 = 4096;

/// Reasoning engine that lets the model call tools until it answers in text
pub struct ToolCallingAgent {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
    system_prompt: Arc<str>,
}

impl ToolCallingAgent {
    pub fn new(llm: Arc<dyn LlmService>, tools: ToolRegistry) -> Self {
        let system_prompt = build_system_prompt(&tools).into();
        Self {
            llm,
            tools,
            system_prompt,
        }
    }
}

impl ReasoningEngine for ToolCallingAgent {
    fn start(&self, context: Vec<Message>, session: &SessionConfig) -> Box<dyn StepSource> {
        Box::new(AgentRun {
            llm: self.llm.clone(),
            tools: self.tools.clone(),
            system_prompt: self.system_prompt.clone(),
            session_id: session.thread_id.clone(),
            working: context,
            ready: None,
            pending: VecDeque::new(),
            finished: false,
        })
    }
}

struct PendingCall {
    id: String,
    name: String,
    input: Value,
}

/// State of one turn. `working` mirrors what the driver appends to the
/// transcript, so each model call sees every earlier step of the turn.
struct AgentRun {
    llm: Arc<dyn LlmService>,
    tools: ToolRegistry,
    system_prompt: Arc<str>,
    session_id: String,
    working: Vec<Message>,
    ready: Option<Message>,
    pending: VecDeque<PendingCall>,
    finished: bool,
}

impl AgentRun {
    /// Ask the model what to do next and queue the resulting steps
    async fn decide(&mut self) -> Result<(), EngineError> {
        let request = LlmRequest {
            system: vec![SystemContent::new(self.system_prompt.as_ref())],
            messages: to_llm_messages(&self.working),
            tools: self.tools.definitions(),
            max_tokens: Some(MAX_TOKENS),
            session_id: Some(self.session_id.clone()),
        };
        let response = self.llm.complete(&request).await?;

        let text = response.text();
        if !text.trim().is_empty() {
            let message = Message::agent(text);
            self.working.push(message.clone());
            self.ready = Some(message);
        }

        self.pending
            .extend(response.tool_uses().into_iter().map(|(id, name, input)| PendingCall {
                id: id.to_string(),
                name: name.to_string(),
                input: input.clone(),
            }));

        if self.pending.is_empty() {
            self.finished = true;
        }
        Ok(())
    }

    /// Run one queued tool call and turn its output into a tool message
    async fn act(&mut self, call: PendingCall) -> Result<Message, EngineError> {
        let ctx = ToolContext {
            session_id: self.session_id.clone(),
        };
        let start = std::time::Instant::now();

        let output = match self.tools.execute(&call.name, call.input.clone(), ctx).await {
            Some(result) => result?,
            None => ToolOutput::error(format!("Unknown tool: {}", call.name)),
        };

        tracing::info!(
            session_id = %self.session_id,
            tool = %call.name,
            success = output.success,
            duration_ms = %start.elapsed().as_millis(),
            "Tool call finished"
        );

        let invocation = ToolInvocation {
            call_id: call.id,
            name: call.name,
            input: call.input,
            is_error: !output.success,
        };
        let message = Message::tool(invocation, output.output);
        self.working.push(message.clone());
        Ok(message)
    }
}

#[async_trait]
impl StepSource for AgentRun {
    async fn next_step(&mut self) -> Result<Option<Step>, EngineError> {
        loop {
            if let Some(message) = self.ready.take() {
                return Ok(Some(Step::Agent(message)));
            }
            if let Some(call) = self.pending.pop_front() {
                return self.act(call).await.map(|m| Some(Step::Tool(m)));
            }
            if self.finished {
                return Ok(None);
            }
            self.decide().await?;
        }
    }
}

/// Rebuild the model conversation from transcript messages.
///
/// A tool message expands to the assistant's tool call followed by the
/// result, so call/result pairs stay intact across turns. Consecutive tool
/// messages regroup into one assistant message carrying every call, followed
/// by one message holding only their results. Adjacent assistant content is
/// merged; a tool result never shares a message with user text.
pub fn to_llm_messages(messages: &[Message]) -> Vec<LlmMessage> {
    fn push_assistant(out: &mut Vec<LlmMessage>, block: ContentBlock) {
        match out.last_mut() {
            Some(last) if last.role == MessageRole::Assistant => last.content.push(block),
            _ => out.push(LlmMessage {
                role: MessageRole::Assistant,
                content: vec![block],
            }),
        }
    }

    fn push_tool_pair(out: &mut Vec<LlmMessage>, call: ContentBlock, result: ContentBlock) {
        if let [.., assistant, results] = out.as_mut_slice() {
            let only_results = results
                .content
                .iter()
                .all(|b| matches!(b, ContentBlock::ToolResult { .. }));
            if assistant.role == MessageRole::Assistant
                && results.role == MessageRole::User
                && only_results
            {
                assistant.content.push(call);
                results.content.push(result);
                return;
            }
        }
        push_assistant(out, call);
        out.push(LlmMessage {
            role: MessageRole::User,
            content: vec![result],
        });
    }

    let mut out: Vec<LlmMessage> = Vec::new();

    for message in messages {
        match (message.role, &message.tool) {
            (Role::User, _) => out.push(LlmMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::text(&message.content)],
            }),
            (Role::Agent, _) => push_assistant(&mut out, ContentBlock::text(&message.content)),
            (Role::Tool, Some(tool)) => push_tool_pair(
                &mut out,
                ContentBlock::tool_use(&tool.call_id, &tool.name, tool.input.clone()),
                ContentBlock::tool_result(&tool.call_id, &message.content, tool.is_error),
            ),
            (Role::Tool, None) => out.push(LlmMessage {
                role: MessageRole::User,
                content: vec![ContentBlock::text(format!("[tool output] {}", message.content))],
            }),
        }
    }

    out
}
