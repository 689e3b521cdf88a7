//! WebSocket market data sessions
//!
//! A [`WsSession`] keeps one venue connection alive for a changing set of subscriptions and
//! hands parsed canonical items to a [`SessionListener`].

pub mod codec;
mod connection;
pub mod schema;
pub mod session;
pub mod subscription;

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use types::Item;

pub use schema::{CommandFormat, Compression, Heartbeat, UrlFormat, WsSchema};
pub use session::WsSession;
pub use subscription::{SubscriptionKey, SubscriptionSets};

/// Connection states of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConnectionState {
    /// No connection and none being attempted
    Disconnected,
    /// Caller-initiated connect in progress
    Connecting,
    /// Connected and receiving data
    Connected,
    /// Connection lost, retry scheduled
    Reconnecting,
    /// Closed by the caller or out of reconnect budget
    Closed,
}

/// Session callbacks, invoked from the session's driver task
///
/// Implementations must not block; hand work off to a channel if it is slow.
pub trait SessionListener: Send + Sync {
    fn on_connect(&self) {}

    fn on_disconnect(&self) {}

    /// One parsed item
    fn on_item(&self, _item: &Item) {}

    /// All items of one inbound frame, after their `on_item` calls
    fn on_batch(&self, _items: &[Item]) {}
}

/// Lock-free session counters for health checks
#[derive(Debug, Default)]
pub struct SessionMetrics {
    frames_received: AtomicU64,
    frames_dropped: AtomicU64,
    items_dispatched: AtomicU64,
    connects: AtomicU64,
    reconnects: AtomicU64,
}

impl SessionMetrics {
    pub(crate) fn record_frame(&self, parsed: bool) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
        if !parsed {
            self.frames_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_items(&self, count: usize) {
        self.items_dispatched.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_reconnect(&self) {
        self.reconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            frames_received: self.frames_received.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
            items_dispatched: self.items_dispatched.load(Ordering::Relaxed),
            connects: self.connects.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub items_dispatched: u64,
    /// Successful opens, including reconnects
    pub connects: u64,
    /// Reconnect attempts
    pub reconnects: u64,
}
