//! # Canonical Exchange Types
//!
//! Venue-independent vocabulary shared by every exchange adapter: the endpoints a client can
//! call, the parameter names and values it passes, the items it gets back, and the error codes
//! it can see.
//!
//! ## Design Philosophy
//!
//! - **One vocabulary**: adapters translate to and from these types, callers never see venue names
//! - **Exact values**: prices and amounts are `rust_decimal::Decimal`, never floats
//! - **Identity semantics**: items compare and hash by `(venue, item_id, timestamp, symbol)`
//! - **Closed taxonomies**: endpoints, intervals, directions and error codes are enums with a
//!   stable string token each
//!
//! ## Quick Start
//!
//! ```rust
//! use types::{Direction, Endpoint, ParamMap, ParamName, ParamValue};
//!
//! let mut params = ParamMap::new();
//! params.insert(ParamName::Symbol, ParamValue::from("ETHBTC"));
//! params.insert(ParamName::Direction, Direction::Sell.into());
//!
//! assert_eq!(Endpoint::TradeHistory.as_str(), "trade/history");
//! ```
//!
//! ## Representation conversions
//!
//! [`ItemFormat`] turns parsed items into flat rows or field-keyed records for storage and
//! response formatting layers; rows and records convert into each other losslessly.

pub mod endpoint;
pub mod error;
pub mod format;
pub mod items;
pub mod params;
pub mod venue;

pub use endpoint::Endpoint;
pub use error::{ApiError, ErrorCode, TypesError};
pub use format::{ItemFormat, Record, Row};
pub use items::{
    Account, Balance, Candle, Identity, Item, ItemKind, MyTrade, Order, OrderBook, OrderBookItem,
    Ticker, Trade,
};
pub use params::{
    Direction, Interval, OrderStatus, OrderType, ParamMap, ParamName, ParamValue, Sorting,
};
pub use venue::VenueId;

/// Re-exported so downstream crates build decimals without a direct dependency
pub use rust_decimal::Decimal;
