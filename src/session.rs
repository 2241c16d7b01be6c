//! Session controller
//!
//! Owns the single process-wide conversation. The session (engine binding,
//! thread id, transcript) is created lazily on the first accepted turn; a
//! failed initialization leaves the controller empty so the next turn retries.

use crate::engine::{BindError, EngineBinder, ReasoningEngine};
use crate::transcript::{Message, TranscriptStore};
use crate::turn::{Emission, TurnDriver, TurnError, TurnResult};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, OnceCell};

/// Identity correlating every turn of the conversation with the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub thread_id: String,
}

impl SessionConfig {
    pub fn new() -> Self {
        Self {
            thread_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialized session state
struct Session {
    engine: Arc<dyn ReasoningEngine>,
    config: SessionConfig,
    transcript: TranscriptStore,
    /// Held for the whole append-user / run / append-steps sequence
    turn_gate: Mutex<()>,
}

impl Session {
    fn new(engine: Arc<dyn ReasoningEngine>) -> Self {
        Self {
            engine,
            config: SessionConfig::new(),
            transcript: TranscriptStore::new(),
            turn_gate: Mutex::new(()),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("message is required")]
    InvalidRequest,
    #[error("session initialization failed: {0}")]
    InitializationFailure(#[source] BindError),
    #[error("a turn is already in progress")]
    SessionBusy,
    #[error("turn exceeded {limit} steps")]
    TurnBudgetExceeded { limit: usize },
    #[error("turn failed: {0}")]
    TurnExecutionFailure(#[source] TurnError),
}

impl From<TurnError> for SessionError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::BudgetExceeded { limit } => SessionError::TurnBudgetExceeded { limit },
            other @ TurnError::Engine(_) => SessionError::TurnExecutionFailure(other),
        }
    }
}

/// Entry point for user turns
pub struct SessionController {
    binder: Arc<dyn EngineBinder>,
    driver: TurnDriver,
    session: OnceCell<Session>,
}

impl SessionController {
    pub fn new(binder: Arc<dyn EngineBinder>, driver: TurnDriver) -> Self {
        Self {
            binder,
            driver,
            session: OnceCell::new(),
        }
    }

    /// Run one turn and return the agent's reply
    pub async fn handle_turn(&self, user_text: &str) -> Result<TurnResult, SessionError> {
        self.run(user_text, None).await
    }

    /// Run one turn, forwarding each step to `sink` as it is produced
    pub async fn handle_turn_streaming(
        &self,
        user_text: &str,
        sink: mpsc::UnboundedSender<Emission>,
    ) -> Result<TurnResult, SessionError> {
        self.run(user_text, Some(&sink)).await
    }

    /// Current transcript; empty before the first turn initializes the session
    pub fn transcript(&self) -> Vec<Message> {
        self.session
            .get()
            .map(|s| s.transcript.snapshot())
            .unwrap_or_default()
    }

    pub fn session_id(&self) -> Option<String> {
        self.session.get().map(|s| s.config.thread_id.clone())
    }

    async fn run(
        &self,
        user_text: &str,
        sink: Option<&mpsc::UnboundedSender<Emission>>,
    ) -> Result<TurnResult, SessionError> {
        if user_text.trim().is_empty() {
            return Err(SessionError::InvalidRequest);
        }

        let session = self.session().await?;
        let Ok(_gate) = session.turn_gate.try_lock() else {
            tracing::warn!(session_id = %session.config.thread_id, "Turn rejected, session busy");
            return Err(SessionError::SessionBusy);
        };

        tracing::debug!(
            session_id = %session.config.thread_id,
            first_turn = session.transcript.is_empty(),
            "Turn accepted"
        );
        session.transcript.append(Message::user(user_text));
        let start = std::time::Instant::now();

        let emissions = self
            .driver
            .run_turn(
                session.engine.as_ref(),
                &session.transcript,
                &session.config,
                sink,
            )
            .await
            .map_err(|e| {
                tracing::error!(
                    session_id = %session.config.thread_id,
                    error = %e,
                    transcript_len = session.transcript.len(),
                    "Turn failed"
                );
                SessionError::from(e)
            })?;

        let result = TurnResult::from_emissions(&emissions);
        tracing::info!(
            session_id = %session.config.thread_id,
            agent_steps = result.agent_steps,
            tool_steps = result.tool_steps,
            duration_ms = %start.elapsed().as_millis(),
            "Turn completed"
        );
        Ok(result)
    }

    async fn session(&self) -> Result<&Session, SessionError> {
        self.session
            .get_or_try_init(|| async {
                let engine = self.binder.bind().await.map_err(|e| {
                    tracing::error!(error = %e, "Session initialization failed");
                    SessionError::InitializationFailure(e)
                })?;
                let session = Session::new(engine);
                tracing::info!(session_id = %session.config.thread_id, "Session initialized");
                Ok::<_, SessionError>(session)
            })
            .await
    }
}
