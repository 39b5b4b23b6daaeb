// crates/mcp-client/src/main.rs

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing::debug;

use mcp_client::McpClient;

#[derive(Parser)]
#[clap(name = "mcp-client")]
#[clap(about = "Send one request to an MCP relay server and print the response")]
struct Cli {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Enable debug logging
    #[clap(short, long)]
    debug: bool,

    #[clap(subcommand)]
    request: RequestCmd,
}

#[derive(Subcommand)]
enum RequestCmd {
    /// Ask the host for its model description
    ModelInfo,

    /// Run a host command
    Command {
        name: String,

        /// Command parameters as a JSON object
        #[clap(long, default_value = "{}")]
        params: String,
    },

    /// Forward a prompt to the server's completion service
    Llm {
        prompt: String,

        #[clap(short, long)]
        model: Option<String>,
    },
}

fn parse_params(raw: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str(raw).context("--params is not valid JSON")? {
        Value::Object(map) => Ok(map),
        other => bail!("--params must be a JSON object, got {}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    }

    let mut client = McpClient::connect(cli.addr.as_str()).await?;

    match &cli.request {
        RequestCmd::ModelInfo => client.get_model_info().await?,
        RequestCmd::Command { name, params } => {
            client.execute_fusion_command(name, parse_params(params)?).await?
        }
        RequestCmd::Llm { prompt, model } => client.llm_request(prompt, model.as_deref()).await?,
    }

    let response = client
        .next_response()
        .await
        .context("server closed the connection before responding")?;
    debug!("Response: {}", response);
    client.disconnect().await;

    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.get("status").and_then(Value::as_str) == Some("error") {
        bail!("server returned an error");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn params_must_be_an_object() {
        assert_eq!(parse_params(r#"{"radius": 5}"#).unwrap()["radius"], 5);
        assert!(parse_params("[1]").is_err());
        assert!(parse_params("{oops").is_err());
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::parse_from(["mcp-client", "command", "extrude", "--params", "{\"d\":1}"]);
        assert!(matches!(cli.request, RequestCmd::Command { ref name, .. } if name == "extrude"));
        assert_eq!(cli.addr, "127.0.0.1:8080");

        let cli = Cli::parse_from(["mcp-client", "-a", "10.0.0.1:9000", "llm", "hi", "-m", "gpt-4"]);
        assert_eq!(cli.addr, "10.0.0.1:9000");
        assert!(matches!(cli.request, RequestCmd::Llm { model: Some(ref m), .. } if m == "gpt-4"));
    }
}
