//! WebSocket session
//!
//! [`WsSession`] is a cheap handle onto a driver task. The driver owns the subscription sets
//! and the live [`Link`], and processes every event in order from one queue: caller commands,
//! inbound frames, connection loss, heartbeat ticks and retry timers. Events tagged with an
//! older connection generation or retry token are stale and ignored.
//!
//! Reconnect policy: the first retry after a loss is immediate, later ones wait the configured
//! delay, and once the budget is spent the session goes [`ConnectionState::Closed`]. A caller
//! `connect` or `subscribe` starts over with a fresh budget.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use types::{Endpoint, ParamMap, VenueId};

use super::codec;
use super::connection::{self, Link};
use super::subscription::{command_frames, connect_url, SubscriptionKey, SubscriptionSets, Subscriptions};
use super::{ConnectionState, MetricsSnapshot, SessionListener, SessionMetrics};
use crate::config::SessionConfig;
use crate::engine::Converter;
use crate::venues::{self, WsProfile};
use crate::{AdapterError, Result};

type Reply<T> = oneshot::Sender<T>;

pub(crate) enum Event {
    Subscribe {
        endpoints: Option<Vec<Endpoint>>,
        symbols: Option<Vec<String>>,
        params: ParamMap,
        reply: Reply<Result<Vec<SubscriptionKey>>>,
    },
    Unsubscribe {
        endpoints: Option<Vec<Endpoint>>,
        symbols: Option<Vec<String>>,
        reply: Reply<Result<Vec<SubscriptionKey>>>,
    },
    Connect {
        reply: Reply<Result<()>>,
    },
    Close {
        reply: Reply<()>,
    },
    Snapshot {
        reply: Reply<SubscriptionSets>,
    },
    Frame {
        generation: u64,
        message: Message,
    },
    Closed {
        generation: u64,
        reason: String,
    },
    HeartbeatDue {
        generation: u64,
    },
    RetryDue {
        token: u64,
    },
}

/// Handle to a venue WebSocket session
///
/// Must be created inside a Tokio runtime. Dropping the handle stops the session.
pub struct WsSession {
    venue: VenueId,
    events: mpsc::UnboundedSender<Event>,
    state: watch::Receiver<ConnectionState>,
    metrics: Arc<SessionMetrics>,
    driver: JoinHandle<()>,
}

impl WsSession {
    /// Session with the built-in profile of `venue`
    pub fn for_venue(
        venue: VenueId,
        config: SessionConfig,
        listener: Arc<dyn SessionListener>,
    ) -> Result<Self> {
        let profile = venues::ws_profile(venue).ok_or(AdapterError::UnsupportedVenue {
            venue,
            transport: "WebSocket",
        })?;
        Self::new(profile, config, listener)
    }

    pub fn new(profile: WsProfile, config: SessionConfig, listener: Arc<dyn SessionListener>) -> Result<Self> {
        config.validate().map_err(AdapterError::Configuration)?;

        let WsProfile { venue, adapter, schema } = profile;
        let base_url = match &config.url {
            Some(url) => url.replace("{version}", &adapter.version),
            None => adapter.resolved_base_url(),
        };
        let converter = Converter::new(adapter, config.use_milliseconds);
        let schema = Arc::new(schema);

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let metrics = Arc::new(SessionMetrics::default());

        let driver = Driver {
            venue,
            subscriptions: Subscriptions::new(converter.clone(), schema.clone()),
            converter,
            schema,
            base_url,
            config,
            listener,
            metrics: metrics.clone(),
            state: state_tx,
            events: events_tx.clone(),
            link: None,
            generation: 0,
            retries: 0,
            retry_token: 0,
        };
        let driver = tokio::spawn(driver.run(events_rx));

        Ok(Self {
            venue,
            events: events_tx,
            state: state_rx,
            metrics,
            driver,
        })
    }

    pub fn venue(&self) -> VenueId {
        self.venue
    }

    /// Add channels and make them live; returns the newly added keys
    ///
    /// `None` endpoints means everything requested so far (or everything the venue supports),
    /// `None` symbols means the symbols requested so far.
    pub async fn subscribe(
        &self,
        endpoints: Option<Vec<Endpoint>>,
        symbols: Option<Vec<String>>,
        params: ParamMap,
    ) -> Result<Vec<SubscriptionKey>> {
        self.request(|reply| Event::Subscribe {
            endpoints,
            symbols,
            params,
            reply,
        })
        .await?
    }

    /// Drop channels; both `None` drops everything. Returns the removed keys
    pub async fn unsubscribe(
        &self,
        endpoints: Option<Vec<Endpoint>>,
        symbols: Option<Vec<String>>,
    ) -> Result<Vec<SubscriptionKey>> {
        self.request(|reply| Event::Unsubscribe {
            endpoints,
            symbols,
            reply,
        })
        .await?
    }

    /// Connect with the current subscriptions; refused when there are none
    pub async fn connect(&self) -> Result<()> {
        self.request(|reply| Event::Connect { reply }).await?
    }

    /// Close the connection and stop the session for good
    pub async fn close(&self) -> Result<()> {
        self.request(|reply| Event::Close { reply }).await
    }

    pub async fn subscriptions(&self) -> Result<SubscriptionSets> {
        self.request(|reply| Event::Snapshot { reply }).await
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Receiver observing every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    async fn request<T>(&self, event: impl FnOnce(Reply<T>) -> Event) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.events
            .send(event(reply))
            .map_err(|_| AdapterError::SessionClosed { venue: self.venue })?;
        response
            .await
            .map_err(|_| AdapterError::SessionClosed { venue: self.venue })
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

struct Driver {
    venue: VenueId,
    converter: Converter,
    schema: Arc<super::schema::WsSchema>,
    base_url: String,
    config: SessionConfig,
    subscriptions: Subscriptions,
    listener: Arc<dyn SessionListener>,
    metrics: Arc<SessionMetrics>,
    state: watch::Sender<ConnectionState>,
    events: mpsc::UnboundedSender<Event>,
    link: Option<Link>,
    /// Identifies the live link; bumped on every open and every drop
    generation: u64,
    /// Consecutive failed reconnects
    retries: u32,
    /// Bumped whenever a scheduled retry must be forgotten
    retry_token: u64,
}

impl Driver {
    async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            match event {
                Event::Subscribe {
                    endpoints,
                    symbols,
                    params,
                    reply,
                } => {
                    let result = self.subscribe(endpoints, symbols, &params).await;
                    let _ = reply.send(result);
                }
                Event::Unsubscribe {
                    endpoints,
                    symbols,
                    reply,
                } => {
                    let result = self.unsubscribe(endpoints, symbols).await;
                    let _ = reply.send(result);
                }
                Event::Connect { reply } => {
                    let result = self.connect().await;
                    let _ = reply.send(result);
                }
                Event::Close { reply } => {
                    self.shutdown().await;
                    let _ = reply.send(());
                    break;
                }
                Event::Snapshot { reply } => {
                    let _ = reply.send(self.subscriptions.sets().clone());
                }
                Event::Frame { generation, message } if generation == self.generation && self.link.is_some() => {
                    self.on_frame(message);
                }
                Event::Closed { generation, reason } if generation == self.generation && self.link.is_some() => {
                    self.on_closed(reason);
                }
                Event::HeartbeatDue { generation } if generation == self.generation => {
                    self.send_heartbeat().await;
                }
                Event::RetryDue { token } if token == self.retry_token => {
                    self.retry().await;
                }
                _ => {}
            }
        }
        debug!(venue = %self.venue, "Session driver stopped");
    }

    // Caller commands

    async fn subscribe(
        &mut self,
        endpoints: Option<Vec<Endpoint>>,
        symbols: Option<Vec<String>>,
        params: &ParamMap,
    ) -> Result<Vec<SubscriptionKey>> {
        let added = self
            .subscriptions
            .subscribe(endpoints.as_deref(), symbols.as_deref(), params)?;

        if self.link.is_some() {
            if added.is_empty() {
                return Ok(added);
            }
            if self.schema.is_command_capable() {
                self.send_commands(true, &added).await;
                return Ok(added);
            }
        }
        if !self.subscriptions.current().is_empty() {
            self.reopen().await?;
        }
        Ok(added)
    }

    async fn unsubscribe(
        &mut self,
        endpoints: Option<Vec<Endpoint>>,
        symbols: Option<Vec<String>>,
    ) -> Result<Vec<SubscriptionKey>> {
        let removed = self
            .subscriptions
            .unsubscribe(endpoints.as_deref(), symbols.as_deref());
        if removed.keys.is_empty() || self.link.is_none() {
            return Ok(removed.keys);
        }

        if self.schema.is_command_capable() {
            self.send_commands(false, &removed.active).await;
        } else if self.subscriptions.current().is_empty() {
            self.retry_token += 1;
            self.drop_link().await;
            self.set_state(ConnectionState::Disconnected);
        } else {
            self.reopen().await?;
        }
        Ok(removed.keys)
    }

    async fn connect(&mut self) -> Result<()> {
        if self.subscriptions.current().is_empty() {
            return Err(AdapterError::NothingToSubscribe { venue: self.venue });
        }
        if self.link.is_some() {
            return Ok(());
        }
        self.reopen().await
    }

    async fn shutdown(&mut self) {
        self.retry_token += 1;
        self.drop_link().await;
        self.set_state(ConnectionState::Closed);
        info!(venue = %self.venue, "Session closed");
    }

    /// Replace any link with a fresh one carrying the current set; no retry on failure
    async fn reopen(&mut self) -> Result<()> {
        self.retry_token += 1;
        self.retries = 0;
        self.drop_link().await;
        self.set_state(ConnectionState::Connecting);
        if let Err(e) = self.open().await {
            warn!(venue = %self.venue, error = %e, "Connect failed");
            self.set_state(ConnectionState::Disconnected);
            return Err(e);
        }
        Ok(())
    }

    // Connection lifecycle

    async fn open(&mut self) -> Result<()> {
        let url = connect_url(&self.base_url, self.schema.url.as_ref(), self.subscriptions.current())?;
        debug!(venue = %self.venue, %url, "Opening WebSocket");
        let stream = connection::open(self.venue, &url, self.config.connect_timeout()).await?;

        self.generation += 1;
        self.link = Some(Link::start(
            self.generation,
            stream,
            self.events.clone(),
            self.schema.heartbeat.as_ref(),
        ));
        self.retries = 0;
        self.metrics.record_connect();
        self.set_state(ConnectionState::Connected);
        self.listener.on_connect();

        if self.schema.subscribes_with_url() {
            self.subscriptions.mark_all_sent();
        } else if self.schema.is_command_capable() {
            let keys: Vec<SubscriptionKey> = self.subscriptions.current().iter().cloned().collect();
            self.send_commands(true, &keys).await;
        }
        Ok(())
    }

    /// Close the live link, if any, and report the disconnect
    async fn drop_link(&mut self) {
        if let Some(link) = self.link.take() {
            // Frames the old reader queues during the close handshake are stale
            self.generation += 1;
            link.close().await;
            self.subscriptions.reset_delivery();
            self.listener.on_disconnect();
        }
    }

    fn on_closed(&mut self, reason: String) {
        warn!(venue = %self.venue, %reason, "WebSocket connection lost");
        self.generation += 1;
        self.link = None;
        self.subscriptions.reset_delivery();
        self.listener.on_disconnect();
        self.schedule_retry();
    }

    fn schedule_retry(&mut self) {
        if self.subscriptions.current().is_empty() {
            self.set_state(ConnectionState::Disconnected);
            return;
        }
        if self.retries >= self.config.reconnect_budget {
            warn!(venue = %self.venue, retries = self.retries, "Reconnect budget exhausted");
            self.set_state(ConnectionState::Closed);
            return;
        }

        let delay = if self.retries == 0 {
            Duration::ZERO
        } else {
            self.config.reconnect_delay()
        };
        self.retries += 1;
        self.retry_token += 1;
        self.set_state(ConnectionState::Reconnecting);

        let token = self.retry_token;
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(Event::RetryDue { token });
        });
    }

    async fn retry(&mut self) {
        self.metrics.record_reconnect();
        info!(venue = %self.venue, attempt = self.retries, "Reconnecting");
        self.set_state(ConnectionState::Connecting);
        if let Err(e) = self.open().await {
            warn!(venue = %self.venue, error = %e, "Reconnect failed");
            self.schedule_retry();
        }
    }

    async fn send_heartbeat(&mut self) {
        let (Some(heartbeat), Some(link)) = (&self.schema.heartbeat, self.link.as_mut()) else {
            return;
        };
        if let Err(e) = link.send(heartbeat.frame.clone()).await {
            debug!(venue = %self.venue, error = %e, "Heartbeat not sent");
        }
    }

    async fn send_commands(&mut self, subscribe: bool, keys: &[SubscriptionKey]) {
        let (Some(format), Some(link)) = (&self.schema.command, self.link.as_mut()) else {
            return;
        };
        let mut delivered = true;
        for frame in command_frames(format, subscribe, keys) {
            if let Err(e) = link.send(frame).await {
                warn!(venue = %self.venue, error = %e, "Subscription command not sent");
                delivered = false;
                break;
            }
        }
        if subscribe {
            if delivered {
                self.subscriptions.mark_sent(keys);
            } else {
                self.subscriptions.mark_failed(keys);
            }
        }
    }

    // Inbound

    fn on_frame(&mut self, message: Message) {
        let value = match codec::decode(&message, self.schema.compression) {
            Ok(Some(value)) => value,
            Ok(None) => return,
            Err(e) => {
                warn!(venue = %self.venue, error = %e, "Dropping undecodable frame");
                self.metrics.record_frame(false);
                return;
            }
        };

        let inbound = match codec::route(&self.converter, &self.schema, &self.subscriptions, &value) {
            Ok(inbound) => inbound,
            Err(e) => {
                warn!(venue = %self.venue, error = %e, "Dropping unparseable frame");
                self.metrics.record_frame(false);
                return;
            }
        };
        self.metrics.record_frame(true);

        for error in &inbound.errors {
            warn!(venue = %self.venue, code = error.code.as_str(), message = %error.message, "Venue error frame");
        }
        if inbound.items.is_empty() {
            return;
        }
        for item in &inbound.items {
            self.listener.on_item(item);
        }
        self.listener.on_batch(&inbound.items);
        self.metrics.record_items(inbound.items.len());
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            info!(venue = %self.venue, from = ?previous, to = ?state, "Session state changed");
        }
    }
}
