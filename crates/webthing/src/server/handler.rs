//! WebSocket Connection Handler
//!
//! One session per connection to `/things/:id`. The session subscribes to
//! the thing's notification hub; if the hub drops it for falling behind, the
//! connection is closed.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info};

use thing_runtime::{SubscriberId, ThingContext};

use super::protocol::{error_message, ClientMessage};
use super::state::AppState;

/// Replies to this client only (errors), not published through the hub
const REPLY_BUFFER: usize = 16;

/// Handle a WebSocket connection
pub async fn handle_websocket(socket: WebSocket, thing: ThingContext, state: AppState) {
    let _session = state.open_session();
    let (mut ws_sender, mut ws_receiver) = socket.split();

    let (notify_tx, mut notify_rx) = mpsc::channel::<Arc<str>>(state.subscriber_buffer());
    let (reply_tx, mut reply_rx) = mpsc::channel::<String>(REPLY_BUFFER);
    let subscriber = thing.subscribe(Arc::new(notify_tx));
    info!(thing_id = %thing.id(), subscriber = %subscriber, "WebSocket connected");

    // Forward hub notifications and direct replies to the socket
    let mut send_task = tokio::spawn(async move {
        loop {
            let text = tokio::select! {
                notification = notify_rx.recv() => match notification {
                    Some(message) => message.to_string(),
                    // The hub dropped this subscriber
                    None => break,
                },
                reply = reply_rx.recv() => match reply {
                    Some(message) => message,
                    None => break,
                },
            };
            if ws_sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    // Process incoming messages
    let recv_thing = thing.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_receiver.next().await {
            match msg {
                Message::Text(text) => {
                    handle_client_message(&recv_thing, subscriber, &reply_tx, &text).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    thing.unsubscribe(subscriber);
    info!(thing_id = %thing.id(), subscriber = %subscriber, "WebSocket disconnected");
}

/// Handle a client message
async fn handle_client_message(
    thing: &ThingContext,
    subscriber: SubscriberId,
    reply: &mpsc::Sender<String>,
    text: &str,
) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            debug!(thing_id = %thing.id(), error = %e, "Rejected client message");
            send_error(thing, reply, 400, e.to_string()).await;
            return;
        }
    };

    match message {
        ClientMessage::SetProperty(values) => {
            for (name, value) in values {
                if let Err(e) = thing.set_property(&name, &value) {
                    send_error(thing, reply, e.status_code(), e.to_string()).await;
                }
            }
        }
        ClientMessage::RequestAction(body) => match thing.create_action_from_envelope(&body) {
            Ok(info) => {
                thing.spawn_action(info);
            }
            Err(e) => send_error(thing, reply, e.status_code(), e.to_string()).await,
        },
        ClientMessage::AddEventSubscription(names) => {
            for name in names.keys() {
                if let Err(e) = thing.add_event_subscription(subscriber, name) {
                    send_error(thing, reply, e.status_code(), e.to_string()).await;
                }
            }
        }
    }
}

async fn send_error(thing: &ThingContext, reply: &mpsc::Sender<String>, code: u16, message: String) {
    let _ = reply.send(error_message(thing.id(), code, message)).await;
}
