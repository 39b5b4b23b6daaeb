//! LLM gateway: the `llm_request` handler.
//!
//! The gateway never fails outward. Whatever goes wrong (no service
//! configured, missing credential, remote error) comes back as a
//! [`Completion::Error`] that the dispatcher turns into an `llm_result`
//! with `status: "error"`. A panicking service is reported the same way.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use mcp_core::{Completion, CompletionError, CompletionService};
use tracing::{error, warn};

use crate::config::LlmConfig;
use crate::openai::OpenAiClient;

const PANICKED: &str = "completion service failed unexpectedly";

/// Adapter between the dispatcher and an optional [`CompletionService`].
#[derive(Clone, Default)]
pub struct LlmGateway {
    service: Option<Arc<dyn CompletionService>>,
}

impl LlmGateway {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service: Some(service),
        }
    }

    /// A gateway with no backend; every request reports the service as
    /// unavailable.
    pub fn unavailable() -> Self {
        Self { service: None }
    }

    /// Gateway backed by the OpenAI-compatible HTTP client.
    ///
    /// If the HTTP client cannot be built the gateway is still returned,
    /// reporting the service as unavailable.
    pub fn from_config(config: &LlmConfig) -> Self {
        match OpenAiClient::new(config) {
            Ok(client) => Self::new(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "completion client unavailable");
                Self::unavailable()
            }
        }
    }

    pub fn is_available(&self) -> bool {
        self.service.is_some()
    }

    pub async fn complete(&self, prompt: &str, model: &str) -> Completion {
        let Some(service) = &self.service else {
            return Completion::error(CompletionError::Unavailable.to_string());
        };

        match AssertUnwindSafe(service.complete(prompt, model))
            .catch_unwind()
            .await
        {
            Ok(Ok(text)) => Completion::response(text),
            Ok(Err(e)) => {
                error!(model, error = %e, "LLM request failed");
                Completion::error(e.to_string())
            }
            Err(_panic) => {
                error!(model, "completion service panicked");
                Completion::error(PANICKED)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct Echo;

    #[async_trait]
    impl CompletionService for Echo {
        async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError> {
            Ok(format!("{model}: {prompt}"))
        }
    }

    struct Failing;

    #[async_trait]
    impl CompletionService for Failing {
        async fn complete(&self, _: &str, _: &str) -> Result<String, CompletionError> {
            Err(CompletionError::Api {
                status: 500,
                message: "upstream down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn forwards_to_service() {
        let gateway = LlmGateway::new(Arc::new(Echo));
        assert_eq!(
            gateway.complete("hello", "gpt-4o").await,
            Completion::response("gpt-4o: hello")
        );
    }

    #[tokio::test]
    async fn service_failure_becomes_error_payload() {
        let completion = LlmGateway::new(Arc::new(Failing)).complete("x", "m").await;
        assert_eq!(
            completion,
            Completion::error("completion service returned 500: upstream down")
        );
    }

    struct Exploding;

    #[async_trait]
    impl CompletionService for Exploding {
        async fn complete(&self, _: &str, _: &str) -> Result<String, CompletionError> {
            panic!("sdk bug");
        }
    }

    #[tokio::test]
    async fn service_panic_becomes_error_payload() {
        let completion = LlmGateway::new(Arc::new(Exploding)).complete("x", "m").await;
        assert_eq!(completion, Completion::error(PANICKED));
    }

    #[tokio::test]
    async fn missing_service_reports_unavailable() {
        let gateway = LlmGateway::unavailable();
        assert!(!gateway.is_available());
        assert_eq!(
            gateway.complete("x", "m").await,
            Completion::error("completion service not available")
        );
    }

    #[tokio::test]
    async fn missing_credential_reports_error() {
        let gateway = LlmGateway::from_config(&LlmConfig::default());
        assert!(gateway.is_available());
        assert_eq!(
            gateway.complete("x", "gpt-3.5-turbo").await,
            Completion::error("OPENAI_API_KEY not configured")
        );
    }
}
