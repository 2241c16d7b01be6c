//! HTTP API for the chat agent

mod handlers;
mod sse;
mod types;

pub use handlers::create_router;

use crate::session::SessionController;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
}

impl AppState {
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller: Arc::new(controller),
        }
    }
}
