//! Command executor: the `fusion_command` / `get_model_info` handler.
//!
//! Host calls are synchronous and can take as long as the host likes, so
//! each one runs on tokio's blocking pool. A panicking host call comes
//! back as [`HostError::Aborted`] instead of taking the connection down.

use std::sync::Arc;

use mcp_core::{CommandResult, HostError, HostIntegration, ModelInfo, SimulatedHost};
use serde_json::Value;
use tracing::debug;

/// Adapter between the dispatcher and a [`HostIntegration`].
#[derive(Clone)]
pub struct CommandExecutor {
    host: Arc<dyn HostIntegration>,
}

impl CommandExecutor {
    pub fn new(host: Arc<dyn HostIntegration>) -> Self {
        Self { host }
    }

    /// Executor backed by the deterministic [`SimulatedHost`].
    pub fn simulated() -> Self {
        Self::new(Arc::new(SimulatedHost::new()))
    }

    pub async fn execute(
        &self,
        command: Option<String>,
        params: Value,
    ) -> Result<CommandResult, HostError> {
        debug!(command = ?command, params = %params, "executing host command");
        let host = Arc::clone(&self.host);
        run_blocking(move || host.execute(command.as_deref(), &params)).await
    }

    pub async fn model_info(&self) -> Result<ModelInfo, HostError> {
        let host = Arc::clone(&self.host);
        run_blocking(move || host.model_info()).await
    }
}

async fn run_blocking<T, F>(call: F) -> Result<T, HostError>
where
    F: FnOnce() -> Result<T, HostError> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(call).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(HostError::Aborted("host call panicked".to_string())),
        Err(e) => Err(HostError::Aborted(e.to_string())),
    }
}
