//! End-to-end relay tests against a mock model service.
//!
//! Each test starts the gateway's realtime route on an ephemeral port and a
//! scripted WebSocket server standing in for the model service, then drives a
//! real client connection through the relay.

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_async, connect_async};

use glovebox_gateway::agents::{self, MachineState};
use glovebox_gateway::config::ServerConfig;
use glovebox_gateway::core::tools::ToolRegistry;
use glovebox_gateway::routes;
use glovebox_gateway::state::AppState;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

type ClientSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ServerSocket = WebSocketStream<TcpStream>;

fn test_config(upstream_url: String) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".into(),
        port: 8765,
        static_dir: PathBuf::from("static"),
        tls: None,
        realtime_endpoint: upstream_url,
        realtime_api_key: Some("test-key".into()),
        realtime_model: "gpt-4o-realtime-preview".into(),
        realtime_voice: "alloy".into(),
        realtime_temperature: None,
        search_endpoint: None,
        search_api_key: None,
        notepad_base_url: None,
        notepad_append_url: None,
        notepad_replace_url: None,
        notepad_lookup_url: None,
        todolist_create_task_url: None,
        speech_signing_secret: None,
        speech_region: None,
        cors_allowed_origins: None,
        rate_limit_requests_per_second: 60,
        rate_limit_burst_size: 10,
    }
}

/// Start the gateway's realtime route with the given registry, pointed at the
/// given upstream URL. Returns the bound address.
async fn spawn_gateway(upstream_url: String, registry: ToolRegistry) -> SocketAddr {
    let state = AppState::new(
        test_config(upstream_url),
        registry,
        agents::ASSISTANT_INSTRUCTIONS,
    );
    let app = Router::new()
        .merge(routes::realtime::create_realtime_router())
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(axum::serve(listener, app).into_future());
    addr
}

async fn connect_client(gateway: SocketAddr) -> ClientSocket {
    let (socket, _) = connect_async(format!("ws://{gateway}/realtime"))
        .await
        .expect("client should connect to the gateway");
    socket
}

async fn send_json(ws: &mut ServerSocket, value: &Value) {
    ws.send(Message::Text(value.to_string().into()))
        .await
        .expect("mock should be able to send");
}

async fn recv_json(ws: &mut ServerSocket) -> Value {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("mock timed out waiting for a message")
            .expect("mock connection ended unexpectedly")
            .expect("mock read error");
        match msg {
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(data) => {
                let _ = ws.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }
}

/// Next text frame seen by the client.
async fn client_recv_text(ws: &mut ClientSocket) -> String {
    loop {
        let msg = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("client timed out waiting for a message")
            .expect("client connection ended unexpectedly")
            .expect("client read error");
        match msg {
            Message::Text(text) => return text.to_string(),
            Message::Ping(data) => {
                let _ = ws.send(Message::Pong(data)).await;
            }
            _ => {}
        }
    }
}

fn calculator_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    agents::calculator::attach(&mut registry).unwrap();
    agents::machine::attach(&mut registry, Arc::new(RwLock::new(MachineState::simulated())))
        .unwrap();
    registry
}

#[tokio::test]
async fn tool_call_round_trip() {
    let upstream_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_url = format!("ws://{}/realtime", upstream_listener.local_addr().unwrap());

    // The unknown event must cross the relay byte-identical
    let unknown_event = r#"{"type":"lab.custom_event","data":{"x":1}}"#.to_string();
    let unknown_for_mock = unknown_event.clone();

    let mock = tokio::spawn(async move {
        let (stream, _) = upstream_listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        // 1. The rewritten session.update arrives first
        let config = recv_json(&mut ws).await;
        assert_eq!(config["type"], "session.update");
        let session = &config["session"];
        assert_eq!(session["voice"], "alloy");
        assert_eq!(session["tool_choice"], "auto");
        assert!(
            session["instructions"]
                .as_str()
                .unwrap()
                .contains("glovebox"),
            "fixed instructions must replace the client's"
        );
        let tools = session["tools"].as_array().unwrap();
        assert!(
            tools
                .iter()
                .any(|t| t["name"] == "calculator_add"),
            "registered schemas must be advertised"
        );
        assert!(tools.iter().any(|t| t["name"] == "machine_get_status"));

        // 2. Session opens; internal config must not leak to the client
        send_json(
            &mut ws,
            &json!({
                "type": "session.created",
                "session": {
                    "id": "sess_1",
                    "instructions": "internal",
                    "tools": [{"name": "calculator_add"}]
                }
            }),
        )
        .await;

        // 3. A function call: announcement, argument streaming, completion
        send_json(
            &mut ws,
            &json!({
                "type": "response.output_item.added",
                "response_id": "resp_1",
                "output_index": 0,
                "item": {"type": "function_call", "call_id": "call_1", "name": "calculator_add"}
            }),
        )
        .await;
        send_json(
            &mut ws,
            &json!({
                "type": "response.function_call_arguments.delta",
                "call_id": "call_1",
                "delta": "{\"A\": 2,"
            }),
        )
        .await;
        send_json(
            &mut ws,
            &json!({
                "type": "response.function_call_arguments.done",
                "call_id": "call_1",
                "arguments": "{\"A\": 2, \"B\": 3}"
            }),
        )
        .await;

        // 4. Latency-critical traffic keeps flowing while the tool runs
        ws.send(Message::Text(unknown_for_mock.clone().into()))
            .await
            .unwrap();
        send_json(
            &mut ws,
            &json!({
                "type": "response.audio.delta",
                "response_id": "resp_1",
                "delta": "UklGRg=="
            }),
        )
        .await;

        // 5. The tool result comes back: output item first, then the nudge
        let output = recv_json(&mut ws).await;
        assert_eq!(output["type"], "conversation.item.create");
        assert_eq!(output["item"]["type"], "function_call_output");
        assert_eq!(output["item"]["call_id"], "call_1");
        assert_eq!(output["item"]["output"], "5");

        let nudge = recv_json(&mut ws).await;
        assert_eq!(nudge["type"], "response.create");

        // 6. Response completes with a function_call item the client must not see
        send_json(
            &mut ws,
            &json!({
                "type": "response.done",
                "response": {
                    "id": "resp_1",
                    "output": [
                        {"type": "function_call", "call_id": "call_1", "name": "calculator_add"},
                        {"type": "message", "role": "assistant"}
                    ]
                }
            }),
        )
        .await;

        let _ = ws.send(Message::Close(None)).await;
    });

    let gateway = spawn_gateway(upstream_url, calculator_registry()).await;
    let mut client = connect_client(gateway).await;

    // Client opens the conversation with its own session config
    client
        .send(Message::Text(
            json!({
                "type": "session.update",
                "session": {"instructions": "client override", "voice": "verse"}
            })
            .to_string()
            .into(),
        ))
        .await
        .unwrap();

    // session.created arrives scrubbed
    let created: Value = serde_json::from_str(&client_recv_text(&mut client).await).unwrap();
    assert_eq!(created["type"], "session.created");
    assert_eq!(created["session"]["instructions"], "");
    assert_eq!(created["session"]["tools"].as_array().unwrap().len(), 0);

    // The unknown event crosses byte-identical; none of the function call
    // plumbing is forwarded
    let raw = client_recv_text(&mut client).await;
    assert_eq!(raw, unknown_event);

    let audio: Value = serde_json::from_str(&client_recv_text(&mut client).await).unwrap();
    assert_eq!(audio["type"], "response.audio.delta");

    // response.done arrives with the function_call stripped
    let done: Value = serde_json::from_str(&client_recv_text(&mut client).await).unwrap();
    assert_eq!(done["type"], "response.done");
    let output = done["response"]["output"].as_array().unwrap();
    assert_eq!(output.len(), 1);
    assert_eq!(output[0]["type"], "message");

    mock.await.unwrap();
}

#[tokio::test]
async fn to_client_outcome_is_redacted_and_surfaced() {
    use async_trait::async_trait;
    use glovebox_gateway::core::tools::{
        ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome,
    };

    struct Grounding;

    #[async_trait]
    impl ToolHandler for Grounding {
        async fn call(&self, _args: ToolArgs) -> Result<ToolOutcome, ToolError> {
            Ok(ToolOutcome::to_client(
                json!({
                    "sources": [
                        {"chunk_id": "exp42.pdf_page_3", "title": "Experiment 42", "excerpt": "80C for 12h"}
                    ]
                })
                .to_string(),
            ))
        }
    }

    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDescriptor::new(
            "report_grounding",
            json!({"type": "function", "name": "report_grounding", "parameters": {}}),
            Arc::new(Grounding),
        ))
        .unwrap();

    let upstream_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_url = format!("ws://{}/realtime", upstream_listener.local_addr().unwrap());

    let mock = tokio::spawn(async move {
        let (stream, _) = upstream_listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let config = recv_json(&mut ws).await;
        assert_eq!(config["type"], "session.update");

        send_json(
            &mut ws,
            &json!({
                "type": "conversation.item.created",
                "previous_item_id": null,
                "item": {"type": "function_call", "call_id": "call_g", "name": "report_grounding"}
            }),
        )
        .await;
        send_json(
            &mut ws,
            &json!({
                "type": "response.function_call_arguments.done",
                "call_id": "call_g",
                "arguments": "{\"sources\": [\"exp42.pdf_page_3\"]}"
            }),
        )
        .await;

        // TO_CLIENT results reach the model as an empty output
        let output = recv_json(&mut ws).await;
        assert_eq!(output["item"]["type"], "function_call_output");
        assert_eq!(output["item"]["output"], "");
        let nudge = recv_json(&mut ws).await;
        assert_eq!(nudge["type"], "response.create");

        let _ = ws.send(Message::Close(None)).await;
    });

    let gateway = spawn_gateway(upstream_url, registry).await;
    let mut client = connect_client(gateway).await;
    client
        .send(Message::Text(
            json!({"type": "session.update", "session": {}}).to_string().into(),
        ))
        .await
        .unwrap();

    // The tool result reaches the client with the raw keys redacted
    let surfaced: Value = serde_json::from_str(&client_recv_text(&mut client).await).unwrap();
    assert_eq!(surfaced["type"], "extension.middle_tier_tool_response");
    assert_eq!(surfaced["tool_name"], "report_grounding");
    let result = surfaced["tool_result"].as_str().unwrap();
    assert!(!result.contains("chunk_id"));
    assert!(!result.contains("exp42.pdf_page_3"));
    assert!(result.contains("Experiment 42"));

    mock.await.unwrap();
}

#[tokio::test]
async fn close_with_pending_call_writes_nothing_upstream() {
    use async_trait::async_trait;
    use glovebox_gateway::core::tools::{
        ToolArgs, ToolDescriptor, ToolError, ToolHandler, ToolOutcome,
    };

    struct Slow;

    #[async_trait]
    impl ToolHandler for Slow {
        async fn call(&self, _args: ToolArgs) -> Result<ToolOutcome, ToolError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ToolOutcome::to_server("too late"))
        }
    }

    let mut registry = ToolRegistry::new();
    registry
        .register(ToolDescriptor::new(
            "slow_tool",
            json!({"type": "function", "name": "slow_tool", "parameters": {}}),
            Arc::new(Slow),
        ))
        .unwrap();

    let upstream_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_url = format!("ws://{}/realtime", upstream_listener.local_addr().unwrap());

    let mock = tokio::spawn(async move {
        let (stream, _) = upstream_listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        let config = recv_json(&mut ws).await;
        assert_eq!(config["type"], "session.update");

        send_json(
            &mut ws,
            &json!({
                "type": "response.output_item.added",
                "item": {"type": "function_call", "call_id": "call_s", "name": "slow_tool"}
            }),
        )
        .await;
        send_json(
            &mut ws,
            &json!({
                "type": "response.function_call_arguments.done",
                "call_id": "call_s",
                "arguments": "{}"
            }),
        )
        .await;

        // Hang up with the call still in flight
        let _ = ws.send(Message::Close(None)).await;

        // Nothing may arrive after the close
        let trailing = tokio::time::timeout(Duration::from_secs(1), async {
            while let Some(Ok(msg)) = ws.next().await {
                if let Message::Text(text) = msg {
                    panic!("unexpected message after close: {text}");
                }
            }
        })
        .await;
        // Either the stream drained (Ok) or stayed silent until timeout (Err)
        let _ = trailing;
    });

    let gateway = spawn_gateway(upstream_url, registry).await;
    let mut client = connect_client(gateway).await;
    client
        .send(Message::Text(
            json!({"type": "session.update", "session": {}}).to_string().into(),
        ))
        .await
        .unwrap();

    // The relay tears the client side down too
    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match client.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok(), "client socket should close after upstream loss");

    mock.await.unwrap();
}

#[tokio::test]
async fn upstream_unavailable_surfaces_error_before_close() {
    // Nothing listens on this endpoint
    let gateway = spawn_gateway(
        "ws://127.0.0.1:1/realtime".to_string(),
        calculator_registry(),
    )
    .await;
    let mut client = connect_client(gateway).await;

    let error: Value = serde_json::from_str(&client_recv_text(&mut client).await).unwrap();
    assert_eq!(error["type"], "error");
    assert_eq!(error["code"], "upstream_unavailable");

    let closed = tokio::time::timeout(RECV_TIMEOUT, async {
        loop {
            match client.next().await {
                None | Some(Ok(Message::Close(_))) | Some(Err(_)) => break,
                Some(Ok(_)) => continue,
            }
        }
    })
    .await;
    assert!(closed.is_ok());
}

#[tokio::test]
async fn malformed_client_messages_are_dropped_not_fatal() {
    let upstream_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_url = format!("ws://{}/realtime", upstream_listener.local_addr().unwrap());

    let mock = tokio::spawn(async move {
        let (stream, _) = upstream_listener.accept().await.unwrap();
        let mut ws = accept_async(stream).await.unwrap();

        // Only the valid messages come through
        let config = recv_json(&mut ws).await;
        assert_eq!(config["type"], "session.update");
        let follow_up = recv_json(&mut ws).await;
        assert_eq!(follow_up["type"], "input_audio_buffer.commit");

        let _ = ws.send(Message::Close(None)).await;
    });

    let gateway = spawn_gateway(upstream_url, calculator_registry()).await;
    let mut client = connect_client(gateway).await;

    client
        .send(Message::Text("this is not json".to_string().into()))
        .await
        .unwrap();
    client
        .send(Message::Text(
            json!({"type": "session.update", "session": {}}).to_string().into(),
        ))
        .await
        .unwrap();
    client
        .send(Message::Text("{broken".to_string().into()))
        .await
        .unwrap();
    client
        .send(Message::Text(
            json!({"type": "input_audio_buffer.commit"}).to_string().into(),
        ))
        .await
        .unwrap();

    mock.await.unwrap();
}
