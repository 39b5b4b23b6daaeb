//! The host (CAD application) integration seam.
//!
//! The relay never talks to the host's object model directly; it goes
//! through [`HostIntegration`]. Calls are synchronous and may block for as
//! long as the host needs, so callers on an async runtime should move them
//! onto a blocking thread.

use serde_json::Value;

use crate::error::HostError;
use crate::messages::{CommandResult, Component, ModelInfo};

/// Operations the relay needs from the host application.
pub trait HostIntegration: Send + Sync {
    /// Execute `command` with `params` inside the host.
    fn execute(&self, command: Option<&str>, params: &Value) -> Result<CommandResult, HostError>;

    /// Describe the model currently open in the host.
    fn model_info(&self) -> Result<ModelInfo, HostError>;
}

/// Deterministic stand-in used when no real host is attached.
///
/// Every command is acknowledged as executed, and the model is a fixed
/// two-component example.
#[derive(Debug, Clone)]
pub struct SimulatedHost {
    model: ModelInfo,
}

impl SimulatedHost {
    pub fn new() -> Self {
        Self::with_model(ModelInfo {
            name: "Example Model".to_string(),
            version: "1.0".to_string(),
            components: vec![
                Component {
                    id: "comp1".to_string(),
                    name: "Component 1".to_string(),
                },
                Component {
                    id: "comp2".to_string(),
                    name: "Component 2".to_string(),
                },
            ],
        })
    }

    /// Simulate a host with a specific model open.
    pub fn with_model(model: ModelInfo) -> Self {
        Self { model }
    }
}

impl Default for SimulatedHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostIntegration for SimulatedHost {
    fn execute(&self, command: Option<&str>, _params: &Value) -> Result<CommandResult, HostError> {
        let name = command.unwrap_or_default();
        Ok(CommandResult {
            command: command.map(str::to_string),
            executed: true,
            message: format!("Command {} executed successfully", name),
        })
    }

    fn model_info(&self) -> Result<ModelInfo, HostError> {
        Ok(self.model.clone())
    }
}
