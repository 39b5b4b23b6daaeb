//! Request dispatch.
//!
//! Routes one decoded envelope to the handler for its `type` and builds
//! the response envelope. `dispatch` is infallible: protocol problems and
//! handler failures both come back as error responses, so the connection
//! worker always has something to send.

use mcp_core::{Message, Request, Response, ResponseKind};
use mcp_protocol::parse_request;
use mcp_protocol::wire_types::DEFAULT_MODEL;
use tracing::{info, warn};

use crate::executor::CommandExecutor;
use crate::llm::LlmGateway;
use crate::types::ClientId;

pub const MISSING_TYPE: &str = "Missing message type";

pub struct Dispatcher {
    executor: CommandExecutor,
    llm: LlmGateway,
    default_model: String,
}

impl Dispatcher {
    pub fn new(executor: CommandExecutor, llm: LlmGateway) -> Self {
        Self {
            executor,
            llm,
            default_model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Model used for `llm_request`s that do not name one.
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub async fn dispatch(&self, client: ClientId, message: &Message) -> Response {
        let Some(request) = parse_request(message) else {
            warn!(client = %client, "message without type");
            return Response::error(MISSING_TYPE);
        };

        info!(client = %client, request = request_name(&request), "received message");

        match request {
            Request::FusionCommand { command, params } => {
                match self.executor.execute(command.clone(), params).await {
                    Ok(result) => Response::command_result(command, result),
                    Err(e) => {
                        warn!(client = %client, command = ?command, error = %e, "command failed");
                        Response::handler_error(ResponseKind::CommandResult, e.to_string())
                    }
                }
            }

            Request::GetModelInfo => match self.executor.model_info().await {
                Ok(info) => Response::model_info(info),
                Err(e) => {
                    warn!(client = %client, error = %e, "model info failed");
                    Response::handler_error(ResponseKind::ModelInfo, e.to_string())
                }
            },

            Request::LlmRequest { prompt, model } => {
                let model = model.unwrap_or_else(|| self.default_model.clone());
                Response::llm_result(self.llm.complete(&prompt, &model).await)
            }

            Request::Unknown(tag) => Response::error(format!("Unknown message type: {tag}")),
        }
    }
}

fn request_name(request: &Request) -> &str {
    match request {
        Request::FusionCommand { .. } => "fusion_command",
        Request::GetModelInfo => "get_model_info",
        Request::LlmRequest { .. } => "llm_request",
        Request::Unknown(tag) => tag,
    }
}
