//! WebSocket subscription tests: filtered event delivery and the dump command.

#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use service_map::api;
use service_map::app_state::AppState;
use service_map::domain::kv::from_pairs;
use service_map::domain::{EventBus, KvMap, ManualClock, RegistryStore};
use service_map::service::RegistryService;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start() -> (String, Arc<RegistryService>) {
    let service = Arc::new(RegistryService::new(
        Arc::new(RegistryStore::new()),
        EventBus::new(256),
        Arc::new(ManualClock::new(0)),
    ));
    let app = api::build_app(AppState::new(Arc::clone(&service)), Duration::from_secs(10));
    let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
        panic!("bind ephemeral port");
    };
    let Ok(addr) = listener.local_addr() else {
        panic!("local addr");
    };
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("ws://{addr}/ws"), service)
}

async fn open(url: &str) -> Socket {
    let Ok((socket, _)) = connect_async(url).await else {
        panic!("ws handshake failed");
    };
    socket
}

async fn send_command(socket: &mut Socket, id: &str, payload: Value) {
    let text = json!({
        "id": id,
        "type": "command",
        "timestamp": chrono::Utc::now(),
        "payload": payload,
    })
    .to_string();
    let Ok(()) = socket.send(Message::text(text)).await else {
        panic!("ws send failed");
    };
}

async fn next_json(socket: &mut Socket) -> Value {
    loop {
        let Ok(Some(Ok(msg))) = tokio::time::timeout(Duration::from_secs(5), socket.next()).await
        else {
            panic!("no ws message within timeout");
        };
        if let Message::Text(text) = msg {
            let Ok(value) = serde_json::from_str::<Value>(&text) else {
                panic!("ws message is not JSON");
            };
            return value;
        }
    }
}

#[tokio::test]
async fn subscriber_only_sees_its_services() {
    let (url, service) = start().await;
    let mut socket = open(&url).await;

    send_command(&mut socket, "sub", json!({"command": "subscribe", "services": ["laundry"]})).await;
    let ack = next_json(&mut socket).await;
    assert_eq!(ack["type"], "response");
    assert_eq!(ack["id"], "sub");

    let other = service.connect().await;
    let Ok(_) = service.register(other, "scrubber", "s1", KvMap::new()).await else {
        panic!("register scrubber");
    };
    let session = service.connect().await;
    let Ok(_) = service
        .register(session, "laundry", "pidX", from_pairs([("host", "node-1")]))
        .await
    else {
        panic!("register laundry");
    };

    let event = next_json(&mut socket).await;
    assert_eq!(event["type"], "event");
    assert_eq!(event["payload"]["event_type"], "service_registered");
    assert_eq!(event["payload"]["service_name"], "laundry");
    assert_eq!(event["payload"]["instance_name"], "pidX");

    let Ok(()) = service.update_status(session, from_pairs([("testing", "1")])).await else {
        panic!("update status");
    };
    let event = next_json(&mut socket).await;
    assert_eq!(event["payload"]["event_type"], "status_updated");
    assert_eq!(event["payload"]["status"]["testing"], "1");

    let _ = service.close(session).await;
    let event = next_json(&mut socket).await;
    assert_eq!(event["payload"]["event_type"], "service_removed");
    assert_eq!(event["payload"]["reason"], "closed");
}

#[tokio::test]
async fn dump_command_returns_live_map() {
    let (url, service) = start().await;
    let session = service.connect().await;
    let Ok(_) = service.register(session, "laundry", "pid1", KvMap::new()).await else {
        panic!("register");
    };

    let mut socket = open(&url).await;
    send_command(&mut socket, "d", json!({"command": "dump"})).await;
    let resp = next_json(&mut socket).await;
    assert_eq!(resp["type"], "response");
    assert_eq!(resp["payload"]["entries"][0]["service_name"], "laundry");
    assert_eq!(resp["payload"]["entries"][0]["instance_name"], "pid1");
}

#[tokio::test]
async fn malformed_message_gets_error_reply() {
    let (url, _service) = start().await;
    let mut socket = open(&url).await;

    let Ok(()) = socket.send(Message::text("not json")).await else {
        panic!("ws send failed");
    };
    let resp = next_json(&mut socket).await;
    assert_eq!(resp["type"], "error");
    assert_eq!(resp["payload"]["code"], 400);
}
