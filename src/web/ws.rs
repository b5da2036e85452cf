use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::select;

use crate::broadcast::{BroadcastHub, Subscription};
use crate::video::{FrameOutcome, VideoRelay, ViewerSubscription};

use super::state::AppState;

/// Dashboard channel: a snapshot, then one JSON message per state change.
pub async fn locations(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state.hub))
}

pub async fn video_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| view(socket, state.relay))
}

pub async fn video_upload(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| produce(socket, state.relay))
}

async fn observe(socket: WebSocket, hub: Arc<BroadcastHub>) {
    let (mut sender, mut receiver) = socket.split();
    let Subscription { id, mut messages } = hub.subscribe();

    loop {
        select! {
            outbound = messages.recv() => {
                match outbound {
                    Some(json) => {
                        if sender.send(Message::Text(json.as_ref().into())).await.is_err() {
                            log::debug!("Dashboard {} went away", id);
                            break;
                        }
                    }
                    // The hub dropped us.
                    None => break,
                }
            }

            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Text(text))) => {
                        log::debug!("Ignoring message from dashboard {}: {}", id, text.as_str());
                    }
                    Some(Err(e)) => {
                        log::debug!("Dashboard {} socket error: {}", id, e);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    hub.unsubscribe(id);
}

async fn view(socket: WebSocket, relay: Arc<VideoRelay>) {
    let (mut sender, mut receiver) = socket.split();
    let ViewerSubscription { id, mut frames } = relay.attach_viewer();

    loop {
        select! {
            frame = frames.recv() => {
                match frame {
                    Some(bytes) => {
                        if sender.send(Message::Binary(bytes)).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }

            inbound = receiver.next() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    relay.detach_viewer(id);
    log::info!("Video viewer detached ({} viewers)", relay.viewer_count());
}

async fn produce(mut socket: WebSocket, relay: Arc<VideoRelay>) {
    let producer = relay.attach_producer();

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Binary(frame)) => {
                if relay.frame_in(producer, frame) == FrameOutcome::Superseded {
                    log::info!("Closing superseded video producer");
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                log::debug!("Video producer socket error: {}", e);
                break;
            }
        }
    }

    relay.detach_producer(producer);
}

#[cfg(test)]
mod tests {
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::storage::MemoryRepository;
    use crate::web::{server::router, state::AppState, Config};
    use std::sync::Arc;

    #[tokio::test]
    async fn plain_get_is_not_upgraded() {
        let state = AppState::new(Config::default(), Arc::new(MemoryRepository::new()));
        let app = router(state.clone());

        for uri in ["/ws/locations", "/ws/video/feed", "/ws/video/upload"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert!(response.status().is_client_error(), "{} gave {}", uri, response.status());
            assert_ne!(response.status(), StatusCode::NOT_FOUND);
        }
        assert_eq!(state.hub.observer_count(), 0);
        assert!(!state.relay.has_producer());
    }
}
