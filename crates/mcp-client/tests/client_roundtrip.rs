// crates/mcp-client/tests/client_roundtrip.rs

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mcp_client::{ClientError, McpClient};
use mcp_server::{Config, Server};
use serde_json::{json, Map, Value};
use tokio::time::timeout;

const IO_TIMEOUT: Duration = Duration::from_secs(5);

async fn start_server() -> (Server, SocketAddr) {
    let config = Config {
        port: 0,
        ..Config::default()
    };
    let server = Server::from_config(&config);
    let addr = server.start("127.0.0.1", 0).await.unwrap();
    (server, addr)
}

async fn next(client: &mut McpClient) -> Value {
    timeout(IO_TIMEOUT, client.next_response())
        .await
        .expect("timed out waiting for response")
        .expect("connection closed")
}

#[tokio::test]
async fn responses_arrive_in_request_order() {
    let (server, addr) = start_server().await;
    let mut client = McpClient::connect(addr).await.unwrap();
    assert!(client.is_connected());

    let mut params = Map::new();
    params.insert("radius".into(), json!(10));
    client.execute_fusion_command("create_circle", params).await.unwrap();
    client.get_model_info().await.unwrap();
    client.llm_request("hello", None).await.unwrap();

    let first = next(&mut client).await;
    assert_eq!(first["type"], "command_result");
    assert_eq!(first["result"]["message"], "Command create_circle executed successfully");

    let second = next(&mut client).await;
    assert_eq!(second["type"], "model_info");
    assert_eq!(second["data"]["name"], "Example Model");

    // No API key configured in the test server.
    let third = next(&mut client).await;
    assert_eq!(third["type"], "llm_result");
    assert_eq!(third["status"], "error");

    client.disconnect().await;
    server.stop().await;
}

#[tokio::test]
async fn handler_claims_matching_responses_once() {
    let (server, addr) = start_server().await;
    let mut client = McpClient::connect(addr).await.unwrap();

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let calls = Arc::clone(&calls);
        let seen = Arc::clone(&seen);
        client.register_handler("command_result", move |resp: &Value| {
            calls.fetch_add(1, Ordering::SeqCst);
            seen.lock().unwrap().push(resp["command"].clone());
        });
    }

    client.execute_fusion_command("a", Map::new()).await.unwrap();
    client.execute_fusion_command("b", Map::new()).await.unwrap();
    client.get_model_info().await.unwrap();

    // The unclaimed model_info response is the only one queued, and it
    // follows both command results on the wire.
    let queued = next(&mut client).await;
    assert_eq!(queued["type"], "model_info");

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(*seen.lock().unwrap(), vec![json!("a"), json!("b")]);

    assert!(client.unregister_handler("command_result"));
    assert!(!client.unregister_handler("command_result"));

    client.execute_fusion_command("c", Map::new()).await.unwrap();
    assert_eq!(next(&mut client).await["command"], "c");
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    server.stop().await;
}

#[tokio::test]
async fn panicking_handler_does_not_kill_the_connection() {
    let (server, addr) = start_server().await;
    let mut client = McpClient::connect(addr).await.unwrap();

    client.register_handler("model_info", |_: &Value| panic!("handler bug"));
    client.get_model_info().await.unwrap();

    client.execute_fusion_command("still_alive", Map::new()).await.unwrap();
    assert_eq!(next(&mut client).await["command"], "still_alive");
    assert!(client.is_connected());

    server.stop().await;
}

#[tokio::test]
async fn request_returns_the_matching_response() {
    let (server, addr) = start_server().await;
    let mut client = McpClient::connect(addr).await.unwrap();

    let resp = client.request(&json!({"type": "nope"})).await.unwrap();
    assert_eq!(resp, json!({"status": "error", "message": "Unknown message type: nope"}));

    server.stop().await;
}

#[tokio::test]
async fn disconnect_is_idempotent_and_blocks_sends() {
    let (server, addr) = start_server().await;
    let mut client = McpClient::connect(addr).await.unwrap();

    client.disconnect().await;
    client.disconnect().await;
    assert!(!client.is_connected());

    let err = client.get_model_info().await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));

    server.stop().await;
}

#[tokio::test]
async fn server_stop_is_noticed_by_client() {
    let (server, addr) = start_server().await;
    let mut client = McpClient::connect(addr).await.unwrap();
    client.get_model_info().await.unwrap();
    next(&mut client).await;

    server.stop().await;

    let end = timeout(IO_TIMEOUT, client.next_response()).await.unwrap();
    assert!(end.is_none());
    assert!(!client.is_connected());
}

#[tokio::test]
async fn connect_to_closed_port_fails() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let err = McpClient::connect(format!("127.0.0.1:{port}"))
        .await
        .err()
        .unwrap();
    assert!(matches!(err, ClientError::Connect { .. }));
}
