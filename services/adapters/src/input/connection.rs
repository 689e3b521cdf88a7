//! One live WebSocket connection and the tasks attached to it

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};
use types::VenueId;

use super::schema::Heartbeat;
use super::session::Event;
use crate::{AdapterError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Open a WebSocket within `connect_timeout`
pub(crate) async fn open(venue: VenueId, url: &str, connect_timeout: Duration) -> Result<WsStream> {
    match timeout(connect_timeout, connect_async(url)).await {
        Ok(Ok((stream, response))) => {
            info!(venue = %venue, status = %response.status(), "WebSocket connected");
            Ok(stream)
        }
        Ok(Err(e)) => Err(AdapterError::ConnectionFailed {
            venue,
            reason: e.to_string(),
        }),
        Err(_) => Err(AdapterError::ConnectionTimeout {
            venue,
            timeout_ms: connect_timeout.as_millis() as u64,
        }),
    }
}

/// Write half of a connection plus its reader and heartbeat tasks
///
/// Both tasks report to the session queue tagged with the link's generation. Dropping the link
/// aborts them.
pub(crate) struct Link {
    sink: SplitSink<WsStream, Message>,
    reader: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
}

impl Link {
    pub(crate) fn start(
        generation: u64,
        stream: WsStream,
        events: UnboundedSender<Event>,
        heartbeat: Option<&Heartbeat>,
    ) -> Self {
        let (sink, mut source) = stream.split();

        let heartbeat = heartbeat.map(|heartbeat| {
            let events = events.clone();
            let period = heartbeat.interval;
            tokio::spawn(async move {
                let mut ticks = interval_at(Instant::now() + period, period);
                loop {
                    ticks.tick().await;
                    if events.send(Event::HeartbeatDue { generation }).is_err() {
                        break;
                    }
                }
            })
        });

        let reader = tokio::spawn(async move {
            let reason = loop {
                match source.next().await {
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map_or_else(
                            || "closed by venue".to_string(),
                            |frame| format!("closed by venue: {} {}", frame.code, frame.reason),
                        );
                    }
                    Some(Ok(message)) => {
                        if events.send(Event::Frame { generation, message }).is_err() {
                            return;
                        }
                    }
                    Some(Err(e)) => break e.to_string(),
                    None => break "stream ended".to_string(),
                }
            };
            let _ = events.send(Event::Closed { generation, reason });
        });

        Self {
            sink,
            reader,
            heartbeat,
        }
    }

    pub(crate) async fn send(&mut self, text: String) -> Result<()> {
        self.sink.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Best-effort close handshake
    pub(crate) async fn close(mut self) {
        if timeout(CLOSE_TIMEOUT, self.sink.close()).await.is_err() {
            debug!("Close handshake timed out");
        }
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
        if let Some(heartbeat) = &self.heartbeat {
            heartbeat.abort();
        }
    }
}
