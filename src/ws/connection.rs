//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::SubscriptionManager;
use crate::api::dto::ServiceDumpResponse;
use crate::domain::RegistryEvent;
use crate::service::RegistryService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and dispatches them.
/// - Forwards matching events from the [`broadcast::Receiver`] to the client.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<RegistryEvent>,
    registry_service: Arc<RegistryService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let response = handle_text_message(&text, &mut subs, &registry_service).await;
                        if let Some(resp_json) = response
                            && ws_tx.send(Message::text(resp_json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(registry_event) => {
                        if !subs.matches(registry_event.service_name()) {
                            continue;
                        }
                        let Ok(payload) = serde_json::to_value(&registry_event) else {
                            continue;
                        };
                        let msg = WsMessage::new(uuid::Uuid::new_v4().to_string(), WsMessageType::Event, payload);
                        let Ok(json) = serde_json::to_string(&msg) else {
                            continue;
                        };
                        if ws_tx.send(Message::text(json)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

/// Handles a text message from the client, returning an optional JSON response.
pub async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    registry_service: &RegistryService,
) -> Option<String> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return serde_json::to_string(&WsMessage::error("", 400, "malformed JSON")).ok();
    };

    if msg.msg_type != WsMessageType::Command {
        let err = WsMessage::error(msg.id, 400, "expected a command message");
        return serde_json::to_string(&err).ok();
    }

    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        let err = WsMessage::error(msg.id, 404, "unknown command");
        return serde_json::to_string(&err).ok();
    };

    let payload = match command {
        WsCommand::Subscribe { services } => {
            subs.subscribe(&services);
            tracing::debug!(?services, "ws subscribe");
            serde_json::json!({
                "subscribed": subs.services(),
                "count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Unsubscribe { services } => {
            subs.unsubscribe(&services);
            tracing::debug!(?services, "ws unsubscribe");
            serde_json::json!({
                "unsubscribed": services,
                "remaining_count": subs.count(),
                "wildcard": subs.is_subscribed_all(),
            })
        }
        WsCommand::Dump => {
            let dump = ServiceDumpResponse::from(registry_service.dump().await);
            serde_json::to_value(&dump).ok()?
        }
    };

    serde_json::to_string(&WsMessage::new(msg.id, WsMessageType::Response, payload)).ok()
}
