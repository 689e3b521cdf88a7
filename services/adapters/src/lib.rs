//! # Exchange Adapters - Unified Venue Connectivity
//!
//! ## Purpose
//!
//! One call surface for several crypto exchanges. Callers speak the canonical vocabulary from
//! the `types` crate (endpoints, parameter names, items, error codes); per-venue adapter
//! configurations translate it to and from each venue's REST API and WebSocket streams.
//!
//! ## Integration Points
//!
//! - **Conversion Engine** ([`engine`]): pure translation of requests and payloads, driven by an
//!   [`AdapterConfig`] per venue API version
//! - **REST Pipeline** ([`rest`]): preprocess, convert, sign, send, parse, postprocess
//! - **WebSocket Session** ([`input`]): subscription sets, connection lifecycle, frame routing
//!   to a [`SessionListener`]
//! - **Venue Profiles** ([`venues`]): bundled configurations for Binance, Bitfinex, BitMEX
//!   and OKEx
//! - **Rate Limiting** ([`rate_limit`]): client-side quotas and venue-imposed cool-downs
//!
//! ## Error Model
//!
//! Venue failures come back as [`types::ApiError`] values inside [`Parsed::Error`], never as
//! `Err`. [`AdapterError`] is reserved for configuration defects and caller misuse.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adapter_service::{RestClient, RestClientConfig};
//! use types::VenueId;
//!
//! # async fn run() -> adapter_service::Result<()> {
//! let client = RestClient::for_venue(VenueId::Binance, RestClientConfig::from_env(), None)?;
//! let trades = client.fetch_trades("ETHBTC", Some(10)).await?;
//! for trade in trades.items() {
//!     println!("{:?}", trade);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ```rust,no_run
//! use adapter_service::{SessionConfig, SessionListener, WsSession};
//! use std::sync::Arc;
//! use types::{Endpoint, Item, ParamMap, VenueId};
//!
//! struct Printer;
//!
//! impl SessionListener for Printer {
//!     fn on_item(&self, item: &Item) {
//!         println!("{:?}", item);
//!     }
//! }
//!
//! # async fn run() -> adapter_service::Result<()> {
//! let session = WsSession::for_venue(VenueId::Bitmex, SessionConfig::default(), Arc::new(Printer))?;
//! session
//!     .subscribe(Some(vec![Endpoint::Trade]), Some(vec!["XBTUSD".to_string()]), ParamMap::new())
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod rate_limit;
pub mod rest;
pub mod venues;

pub use config::{Credentials, RestClientConfig, SessionConfig};
pub use engine::{AdapterConfig, Converter, Parsed};
pub use error::{AdapterError, Result};
pub use input::{ConnectionState, MetricsSnapshot, SessionListener, WsSession};
pub use rate_limit::{CooldownPolicy, RateLimitTracker, RateLimiter};
pub use rest::{RestClient, RestConverter};
pub use venues::{rest_profile, ws_profile, RestProfile, WsProfile};
