//! Turn driver
//!
//! Pulls steps from a started engine one at a time, appends each to the
//! transcript as it arrives and reports it to an optional live observer.
//! The turn's reply is the agent steps joined in emission order.

use crate::engine::{EngineError, ReasoningEngine, Step};
use crate::session::SessionConfig;
use crate::transcript::{Message, TranscriptStore};
use thiserror::Error;
use tokio::sync::mpsc;

/// Default upper bound on steps per turn
pub const DEFAULT_MAX_STEPS: usize = 25;

/// A step produced during a turn, as seen by observers
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    AgentStep(Message),
    ToolStep(Message),
}

impl Emission {
    pub fn message(&self) -> &Message {
        match self {
            Emission::AgentStep(m) | Emission::ToolStep(m) => m,
        }
    }

    /// SSE event name for this emission
    pub fn kind(&self) -> &'static str {
        match self {
            Emission::AgentStep(_) => "agent",
            Emission::ToolStep(_) => "tool",
        }
    }
}

impl From<Step> for Emission {
    fn from(step: Step) -> Self {
        match step {
            Step::Agent(m) => Emission::AgentStep(m),
            Step::Tool(m) => Emission::ToolStep(m),
        }
    }
}

/// Outcome of a completed turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnResult {
    /// Agent step contents concatenated with no separator
    pub text: String,
    pub agent_steps: usize,
    pub tool_steps: usize,
}

impl TurnResult {
    pub fn from_emissions(emissions: &[Emission]) -> Self {
        let mut text = String::new();
        let mut agent_steps = 0;
        let mut tool_steps = 0;
        for emission in emissions {
            match emission {
                Emission::AgentStep(m) => {
                    text.push_str(&m.content);
                    agent_steps += 1;
                }
                Emission::ToolStep(_) => tool_steps += 1,
            }
        }
        Self {
            text,
            agent_steps,
            tool_steps,
        }
    }
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("turn exceeded {limit} steps")]
    BudgetExceeded { limit: usize },
}

/// Runs a single turn against a bound engine
#[derive(Debug, Clone, Copy)]
pub struct TurnDriver {
    max_steps: usize,
}

impl Default for TurnDriver {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_STEPS)
    }
}

impl TurnDriver {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps: max_steps.max(1),
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Drive `engine` to completion over the current transcript.
    ///
    /// The engine sees the transcript as it stands, so the caller appends the
    /// user message first. Steps already appended stay in the transcript when
    /// the turn fails, including the step that overflows the budget.
    pub async fn run_turn(
        &self,
        engine: &dyn ReasoningEngine,
        transcript: &TranscriptStore,
        session: &SessionConfig,
        sink: Option<&mpsc::UnboundedSender<Emission>>,
    ) -> Result<Vec<Emission>, TurnError> {
        let mut source = engine.start(transcript.snapshot(), session);
        let mut emissions = Vec::new();

        while let Some(step) = source.next_step().await? {
            let emission = Emission::from(step);
            transcript.append(emission.message().clone());

            tracing::debug!(
                session_id = %session.thread_id,
                kind = emission.kind(),
                step = emissions.len() + 1,
                "Step emitted"
            );

            if let Some(sink) = sink {
                // Observer may have gone away; the turn still completes
                let _ = sink.send(emission.clone());
            }
            emissions.push(emission);

            if emissions.len() > self.max_steps {
                return Err(TurnError::BudgetExceeded {
                    limit: self.max_steps,
                });
            }
        }

        Ok(emissions)
    }
}
