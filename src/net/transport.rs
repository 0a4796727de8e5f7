// WebSocket transport
//
// Each connection registers a bounded outbox as a sink, forwards outbox
// payloads as text frames, and feeds inbound text frames to the
// simulation as commands.

use axum::extract::ws::{Message, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{Sink as FrameSink, SinkExt, Stream, StreamExt};
use log::debug;
use std::fmt;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};

use super::broadcast::{ChannelSink, DeliveryError, Sink};
use crate::engine::simulation::Simulation;

/// State handed to every connection
#[derive(Clone)]
pub struct AppState {
    pub sim: Arc<Simulation>,
    pub outbox_capacity: usize,
    pub shutdown: watch::Receiver<bool>,
}

/// Router exposing the `/ws` endpoint
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| {
        let (sender, receiver) = socket.split();
        serve_connection(sender, receiver, state)
    })
}

/// Outbox sink that signals its connection once the broadcaster drops it
struct ConnectionSink {
    outbox: ChannelSink,
    _released: oneshot::Sender<()>,
}

impl Sink for ConnectionSink {
    fn try_deliver(&self, payload: Arc<str>) -> Result<(), DeliveryError> {
        self.outbox.try_deliver(payload)
    }
}

/// Drive one connection until the client leaves, its sink is pruned, or
/// the server shuts down. The sink is always removed on return.
async fn serve_connection<W, R, E>(mut sender: W, mut receiver: R, state: AppState)
where
    W: FrameSink<Message> + Unpin + Send + 'static,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let (outbox, mut payloads) = ChannelSink::new(state.outbox_capacity);
    let (released_tx, mut released) = oneshot::channel();
    let sink_id = state.sim.broadcaster().connect(Box::new(ConnectionSink {
        outbox,
        _released: released_tx,
    }));

    // Ends when the outbox closes or the socket stops accepting frames
    let mut writer = tokio::spawn(async move {
        while let Some(payload) = payloads.recv().await {
            if sender.send(Message::Text(payload.to_string())).await.is_err() {
                break;
            }
        }
        let _ = sender.close().await;
    });

    let mut shutdown = state.shutdown.clone();
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.sim.handle_message(&text);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!("{} read error: {}", sink_id, err);
                    break;
                }
            },
            _ = &mut released => {
                debug!("{} dropped by the broadcaster", sink_id);
                break;
            }
            _ = &mut writer => break,
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    state.sim.broadcaster().disconnect(sink_id);
    writer.abort();
}
