use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, trace};

use crate::hub::Subscription;

/// Timing knobs for one subscriber connection.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionTiming {
    pub heartbeat_interval: Duration,
    pub send_timeout: Duration,
}

/// Pump hub notifications to the socket until either side goes away.
///
/// The writer owns `subscription`; when the connection ends the guard is
/// dropped and the hub forgets this subscriber.
pub async fn run_subscriber(socket: WebSocket, subscription: Subscription, timing: ConnectionTiming) {
    let session_id = subscription.session_id().clone();
    let subscriber_id = subscription.id().clone();
    info!(session_id = %session_id, subscriber_id = %subscriber_id, "subscriber connected");

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_sid = subscriber_id.clone();
    let mut writer = tokio::spawn(async move {
        let mut subscription = subscription;
        let mut ping_interval = tokio::time::interval(timing.heartbeat_interval);
        ping_interval.tick().await;

        loop {
            let frame = tokio::select! {
                msg = subscription.recv() => match msg {
                    Some(text) => WsMessage::Text(text.into()),
                    None => {
                        debug!(subscriber_id = %writer_sid, "pruned by hub");
                        break;
                    }
                },
                _ = ping_interval.tick() => {
                    trace!(subscriber_id = %writer_sid, "sent ping");
                    WsMessage::Ping(Vec::new().into())
                }
            };

            match tokio::time::timeout(timing.send_timeout, ws_tx.send(frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(subscriber_id = %writer_sid, error = %e, "write failed");
                    break;
                }
                Err(_) => {
                    debug!(subscriber_id = %writer_sid, "write timed out");
                    break;
                }
            }
        }
        // Unregister before the close handshake, which can stall on the same socket.
        drop(subscription);
        let _ = tokio::time::timeout(timing.send_timeout, ws_tx.close()).await;
    });

    // Inbound payloads carry no meaning; the reader only watches for close.
    let mut reader = tokio::spawn(async move {
        while let Some(Ok(msg)) = ws_rx.next().await {
            if let WsMessage::Close(_) = msg {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    info!(session_id = %session_id, subscriber_id = %subscriber_id, "subscriber disconnected");
}
