//! Mock implementations for testing
//!
//! Scripted engines, a queued-response LLM and recording tools, so the turn
//! loop can be exercised without network I/O.

use super::{BindError, EngineBinder, EngineError, ReasoningEngine, Step, StepSource};
use crate::llm::{ContentBlock, LlmError, LlmRequest, LlmResponse, LlmService, Usage};
use crate::session::SessionConfig;
use crate::tools::{Tool, ToolContext, ToolError, ToolOutput};
use crate::transcript::{Message, ToolInvocation};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

// ============================================================================
// Mock LLM
// ============================================================================

/// LLM that returns queued responses in order
pub struct MockLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn queue_response(&self, response: LlmResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmService for MockLlm {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::network("No mock response queued")))
    }

    fn model_id(&self) -> &str {
        "mock-model"
    }
}

pub fn text_response(text: &str) -> LlmResponse {
    LlmResponse {
        content: vec![ContentBlock::text(text)],
        end_turn: true,
        usage: Usage::default(),
    }
}

pub fn tool_call_response(text: Option<&str>, id: &str, name: &str, input: Value) -> LlmResponse {
    let mut content: Vec<ContentBlock> = text.map(ContentBlock::text).into_iter().collect();
    content.push(ContentBlock::tool_use(id, name, input));
    LlmResponse {
        content,
        end_turn: false,
        usage: Usage::default(),
    }
}

// ============================================================================
// Recording tool
// ============================================================================

/// Tool with a fixed answer that records every call
pub struct RecordingTool {
    name: String,
    output: Result<String, String>,
    calls: Mutex<Vec<Value>>,
}

impl RecordingTool {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            output: Ok(output.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A tool whose every call fails hard
    pub fn failing(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            output: Err(message.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Value> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Tool for RecordingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        format!("Mock {}", self.name)
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, input: Value, _ctx: ToolContext) -> Result<ToolOutput, ToolError> {
        self.calls.lock().unwrap().push(input);
        match &self.output {
            Ok(output) => Ok(ToolOutput::success(output.clone())),
            Err(message) => Err(ToolError::new(&self.name, message.clone())),
        }
    }
}

// ============================================================================
// Scripted engine
// ============================================================================

/// One step of a scripted turn
#[derive(Debug, Clone)]
pub enum Scripted {
    Agent(&'static str),
    Tool(&'static str, &'static str),
    Fail(&'static str),
}

/// Engine that plays back one script per turn and records what it was given
#[derive(Default)]
pub struct ScriptedEngine {
    scripts: Mutex<VecDeque<Vec<Scripted>>>,
    contexts: Mutex<Vec<Vec<Message>>>,
    sessions: Mutex<Vec<String>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turn(self, script: Vec<Scripted>) -> Self {
        self.scripts.lock().unwrap().push_back(script);
        self
    }

    /// Transcript snapshot each turn started from
    pub fn contexts(&self) -> Vec<Vec<Message>> {
        self.contexts.lock().unwrap().clone()
    }

    /// Session identifier each turn was started with
    pub fn sessions(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }
}

impl ReasoningEngine for ScriptedEngine {
    fn start(&self, context: Vec<Message>, session: &SessionConfig) -> Box<dyn StepSource> {
        self.contexts.lock().unwrap().push(context);
        self.sessions.lock().unwrap().push(session.thread_id.clone());
        let script = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Box::new(ScriptRun {
            steps: script.into(),
            counter: 0,
        })
    }
}

struct ScriptRun {
    steps: VecDeque<Scripted>,
    counter: usize,
}

#[async_trait]
impl StepSource for ScriptRun {
    async fn next_step(&mut self) -> Result<Option<Step>, EngineError> {
        tokio::task::yield_now().await;
        let Some(step) = self.steps.pop_front() else {
            return Ok(None);
        };
        self.counter += 1;
        match step {
            Scripted::Agent(text) => Ok(Some(Step::Agent(Message::agent(text)))),
            Scripted::Tool(name, output) => {
                let invocation = ToolInvocation {
                    call_id: format!("call_{}", self.counter),
                    name: name.to_string(),
                    input: json!({}),
                    is_error: false,
                };
                Ok(Some(Step::Tool(Message::tool(invocation, output))))
            }
            Scripted::Fail(message) => Err(EngineError::Tool(ToolError::new("scripted", message))),
        }
    }
}

/// Engine whose turns block until released, for overlapping-turn tests
pub struct GatedEngine {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl GatedEngine {
    pub fn new() -> Self {
        Self {
            started: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

impl ReasoningEngine for GatedEngine {
    fn start(&self, _context: Vec<Message>, _session: &SessionConfig) -> Box<dyn StepSource> {
        Box::new(GatedRun {
            started: self.started.clone(),
            release: self.release.clone(),
            done: false,
        })
    }
}

struct GatedRun {
    started: Arc<Notify>,
    release: Arc<Notify>,
    done: bool,
}

#[async_trait]
impl StepSource for GatedRun {
    async fn next_step(&mut self) -> Result<Option<Step>, EngineError> {
        if self.done {
            return Ok(None);
        }
        self.started.notify_one();
        self.release.notified().await;
        self.done = true;
        Ok(Some(Step::Agent(Message::agent("released"))))
    }
}

// ============================================================================
// Binders
// ============================================================================

/// Binder that fails a set number of times before handing out `engine`
pub struct MockBinder {
    engine: Arc<dyn ReasoningEngine>,
    failures_left: AtomicUsize,
    pub attempts: AtomicUsize,
}

impl MockBinder {
    pub fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self::failing_first(engine, 0)
    }

    pub fn failing_first(engine: Arc<dyn ReasoningEngine>, failures: usize) -> Self {
        Self {
            engine,
            failures_left: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EngineBinder for MockBinder {
    async fn bind(&self) -> Result<Arc<dyn ReasoningEngine>, BindError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BindError::Llm(LlmError::auth("mock bind failure")));
        }
        Ok(self.engine.clone())
    }
}
