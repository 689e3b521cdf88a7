//! WebSocket wire conventions of one venue
//!
//! The converter knows how channel names and payload fields look; [`WsSchema`] adds how the
//! session carries subscriptions (URL or command frames), keeps the link alive, and finds the
//! endpoint of an inbound message.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use types::{Endpoint, ParamMap};

/// Subscriptions embedded in the connect URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlFormat {
    /// `<base>ws/<channel>` for one channel, `<base>stream?streams=<a>/<b>` for several
    StreamPath,
    /// `<base>?<name>=<a>,<b>`
    QueryParam { name: String },
}

/// Subscription command frames
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandFormat {
    /// One `{"op": "subscribe", "args": [..]}` frame for all channels
    OpArgs,
    /// One `{"event": "<verb>", "channel": ".."}` frame per channel
    EventPerChannel {
        subscribe: String,
        unsubscribe: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    None,
    /// Binary frames are raw deflate streams without zlib header
    RawDeflate,
}

/// Keep-alive frame sent on a fixed interval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heartbeat {
    pub interval: Duration,
    pub frame: String,
}

#[derive(Debug, Clone, Default)]
pub struct WsSchema {
    pub url: Option<UrlFormat>,
    pub command: Option<CommandFormat>,
    /// Endpoints a session may subscribe to; subscribing with no endpoints means all of them
    pub supported_endpoints: Vec<Endpoint>,
    /// Endpoints expanded once per symbol; the rest are generic and expand once
    pub symbol_endpoints: HashSet<Endpoint>,
    pub lowercase_symbols: bool,
    /// Template parameters used when the caller gives none (candle interval, book depth)
    pub default_params: ParamMap,
    pub compression: Compression,
    pub heartbeat: Option<Heartbeat>,
    /// Field naming the event type of an inbound object
    pub event_type_key: Option<String>,
    pub endpoint_by_event_type: HashMap<String, Endpoint>,
    /// Field of array elements naming their channel
    pub channel_key: Option<String>,
    /// Field whose presence marks an inbound error frame
    pub error_key: Option<String>,
}

impl WsSchema {
    pub fn is_command_capable(&self) -> bool {
        self.command.is_some()
    }

    pub fn subscribes_with_url(&self) -> bool {
        self.url.is_some()
    }

    pub fn is_symbol_endpoint(&self, endpoint: Endpoint) -> bool {
        self.symbol_endpoints.contains(&endpoint)
    }

    pub fn supports(&self, endpoint: Endpoint) -> bool {
        self.supported_endpoints.contains(&endpoint)
    }

    /// Symbol as it appears in channel names
    pub fn channel_symbol(&self, symbol: &str) -> String {
        if self.lowercase_symbols {
            symbol.to_lowercase()
        } else {
            symbol.to_string()
        }
    }
}
