//! Shared fixtures for the adapter integration tests

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;

use adapter_service::{ConnectionState, SessionListener};
use types::Item;

pub const WAIT: Duration = Duration::from_secs(5);

/// Install a test subscriber once; `RUST_LOG` selects the level
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One accepted WebSocket connection, seen from the venue side
pub struct VenueConnection {
    /// Request target of the upgrade, path plus query
    pub target: String,
    /// Text frames sent by the client
    pub incoming: mpsc::UnboundedReceiver<String>,
    /// Frames to push to the client; dropping it closes the connection
    pub outgoing: mpsc::UnboundedSender<Message>,
}

impl VenueConnection {
    pub async fn next_text(&mut self) -> String {
        tokio::time::timeout(WAIT, self.incoming.recv())
            .await
            .expect("no frame from client")
            .expect("client connection ended")
    }

    pub async fn next_json(&mut self) -> serde_json::Value {
        serde_json::from_str(&self.next_text().await).expect("client frame is not JSON")
    }

    pub fn push(&self, message: Message) {
        self.outgoing.send(message).expect("connection task ended");
    }
}

/// In-process WebSocket venue
pub struct MockVenue {
    pub url: String,
    connections: mpsc::UnboundedReceiver<VenueConnection>,
    accepting: Arc<AtomicBool>,
    stalling: Arc<AtomicBool>,
    acceptor: JoinHandle<()>,
}

impl MockVenue {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let url = format!("ws://{}/", listener.local_addr().expect("local addr"));
        let (connections_tx, connections) = mpsc::unbounded_channel();
        let accepting = Arc::new(AtomicBool::new(true));
        let stalling = Arc::new(AtomicBool::new(false));

        let gate = accepting.clone();
        let stall = stalling.clone();
        let acceptor = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                if !gate.load(Ordering::SeqCst) {
                    // Refused: the client sees the socket close during the handshake
                    drop(stream);
                    continue;
                }
                if stall.load(Ordering::SeqCst) {
                    // Held open without a handshake until the wait budget runs out
                    tokio::spawn(async move {
                        tokio::time::sleep(WAIT).await;
                        drop(stream);
                    });
                    continue;
                }
                let mut target = String::new();
                let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                    target = request.uri().to_string();
                    Ok(response)
                };
                let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
                    continue;
                };

                let (incoming_tx, incoming) = mpsc::unbounded_channel();
                let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();
                tokio::spawn(async move {
                    let (mut sink, mut source) = ws.split();
                    loop {
                        tokio::select! {
                            pushed = outgoing_rx.recv() => match pushed {
                                Some(message) => {
                                    if sink.send(message).await.is_err() {
                                        break;
                                    }
                                }
                                None => {
                                    let _ = sink.close().await;
                                    break;
                                }
                            },
                            received = source.next() => match received {
                                Some(Ok(Message::Text(text))) => {
                                    let _ = incoming_tx.send(text);
                                }
                                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                                Some(Ok(_)) => {}
                            },
                        }
                    }
                });

                let connection = VenueConnection {
                    target,
                    incoming,
                    outgoing,
                };
                if connections_tx.send(connection).is_err() {
                    break;
                }
            }
        });

        Self {
            url,
            connections,
            accepting,
            stalling,
            acceptor,
        }
    }

    pub async fn next_connection(&mut self) -> VenueConnection {
        tokio::time::timeout(WAIT, self.connections.recv())
            .await
            .expect("no client connected")
            .expect("acceptor stopped")
    }

    /// Refuse every later connection attempt
    pub fn refuse(&self) {
        self.accepting.store(false, Ordering::SeqCst);
    }

    /// Accept later TCP connections but never answer their upgrade request
    pub fn stall(&self) {
        self.stalling.store(true, Ordering::SeqCst);
    }
}

impl Drop for MockVenue {
    fn drop(&mut self) {
        self.acceptor.abort();
    }
}

/// Listener callback, in arrival order
#[derive(Debug, Clone)]
pub enum Callback {
    Connected,
    Disconnected,
    Item(Item),
    Batch(usize),
}

/// Listener forwarding every callback into a channel
pub struct Recorder {
    events: mpsc::UnboundedSender<Callback>,
}

impl Recorder {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Callback>) {
        let (events, received) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), received)
    }
}

impl SessionListener for Recorder {
    fn on_connect(&self) {
        let _ = self.events.send(Callback::Connected);
    }

    fn on_disconnect(&self) {
        let _ = self.events.send(Callback::Disconnected);
    }

    fn on_item(&self, item: &Item) {
        let _ = self.events.send(Callback::Item(item.clone()));
    }

    fn on_batch(&self, items: &[Item]) {
        let _ = self.events.send(Callback::Batch(items.len()));
    }
}

pub async fn next_callback(received: &mut mpsc::UnboundedReceiver<Callback>) -> Callback {
    tokio::time::timeout(WAIT, received.recv())
        .await
        .expect("no listener callback")
        .expect("listener dropped")
}

pub async fn wait_for_state(states: &mut watch::Receiver<ConnectionState>, wanted: ConnectionState) {
    tokio::time::timeout(WAIT, states.wait_for(|state| *state == wanted))
        .await
        .expect("state not reached in time")
        .expect("session dropped");
}
