//! Remote execution of confirmed actions against game servers

mod client;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::Result;
use crate::models::ActionRequest;

pub use client::NitradoClient;

/// Result of running an action on one server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerOutcome {
    pub server_name: String,
    /// `None` on success
    pub error: Option<String>,
}

/// Runs a confirmed action. Only called after the requester has confirmed.
///
/// Returns per-server outcomes when at least one server succeeded, and
/// `BotError::ExecutionFailed` when none did.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    async fn execute(&self, request: &ActionRequest) -> Result<Vec<ServerOutcome>>;
}

pub type SharedActionExecutor = Arc<dyn ActionExecutor>;
