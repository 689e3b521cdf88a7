//! Canonical parameter names and values
//!
//! A [`ParamMap`] is what a caller hands to any REST operation or WebSocket subscription. Names
//! and enum values carry a stable token; adapter value maps are keyed by those tokens.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::items::Item;

/// Canonical parameters of one call, ordered by name for deterministic translation
pub type ParamMap = BTreeMap<ParamName, ParamValue>;

/// Declares a closed enum whose variants each carry a wire token.
///
/// Parsing tries an exact token match first and falls back to a case-insensitive match, so
/// venue spellings like `SELL` or `Buy` resolve while `1m`/`1M` stay distinct.
macro_rules! token_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $($(#[$vmeta:meta])* $variant:ident => $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $token)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let all = $name::ALL.iter().copied();
                all.clone()
                    .find(|v| v.as_str() == s)
                    .or_else(|| all.clone().find(|v| v.as_str().eq_ignore_ascii_case(s)))
                    .ok_or_else(|| TypesError::UnknownToken {
                        kind: $kind,
                        token: s.to_string(),
                    })
            }
        }
    };
}

token_enum! {
    /// Result ordering requested from paged endpoints
    Sorting, "sorting" {
        /// Oldest first
        Ascending => "asc",
        /// Newest first
        Descending => "desc",
    }
}

token_enum! {
    /// Candle interval
    Interval, "interval" {
        Min1 => "1m",
        Min3 => "3m",
        Min5 => "5m",
        Min15 => "15m",
        Min30 => "30m",
        Hrs1 => "1h",
        Hrs2 => "2h",
        Hrs4 => "4h",
        Hrs6 => "6h",
        Hrs8 => "8h",
        Hrs12 => "12h",
        Day1 => "1d",
        Day3 => "3d",
        Week1 => "1w",
        Month1 => "1M",
    }
}

token_enum! {
    /// Trade or order side
    Direction, "direction" {
        Sell => "sell",
        Buy => "buy",
    }
}

token_enum! {
    OrderType, "order type" {
        Limit => "limit",
        Market => "market",
    }
}

token_enum! {
    OrderStatus, "order status" {
        Open => "open",
        Closed => "closed",
        New => "new",
        PartiallyFilled => "partially_filled",
        Filled => "filled",
        Canceled => "canceled",
        Rejected => "rejected",
        Expired => "expired",
    }
}

/// Canonical field and parameter name
///
/// Item fields and request parameters share one namespace. Venue-only extras (for example an
/// order's time-in-force flag) travel as [`ParamName::Custom`] and keep their name on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ParamName {
    PlatformId,
    ItemId,
    OrderId,
    UserOrderId,
    Symbol,
    Limit,
    IsUseMaxLimit,
    Sorting,
    Interval,
    Direction,
    OrderType,
    OrderStatus,
    Level,
    TradesCount,
    Timestamp,
    FromItem,
    ToItem,
    FromTime,
    ToTime,
    PriceOpen,
    PriceClose,
    PriceHigh,
    PriceLow,
    Price,
    AmountOriginal,
    AmountExecuted,
    AmountAvailable,
    AmountReserved,
    Amount,
    Fee,
    Rebate,
    OrderCount,
    Balances,
    Asks,
    Bids,
    Custom(String),
}

impl ParamName {
    const KNOWN: [ParamName; 35] = [
        ParamName::PlatformId,
        ParamName::ItemId,
        ParamName::OrderId,
        ParamName::UserOrderId,
        ParamName::Symbol,
        ParamName::Limit,
        ParamName::IsUseMaxLimit,
        ParamName::Sorting,
        ParamName::Interval,
        ParamName::Direction,
        ParamName::OrderType,
        ParamName::OrderStatus,
        ParamName::Level,
        ParamName::TradesCount,
        ParamName::Timestamp,
        ParamName::FromItem,
        ParamName::ToItem,
        ParamName::FromTime,
        ParamName::ToTime,
        ParamName::PriceOpen,
        ParamName::PriceClose,
        ParamName::PriceHigh,
        ParamName::PriceLow,
        ParamName::Price,
        ParamName::AmountOriginal,
        ParamName::AmountExecuted,
        ParamName::AmountAvailable,
        ParamName::AmountReserved,
        ParamName::Amount,
        ParamName::Fee,
        ParamName::Rebate,
        ParamName::OrderCount,
        ParamName::Balances,
        ParamName::Asks,
        ParamName::Bids,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            ParamName::PlatformId => "platform_id",
            ParamName::ItemId => "item_id",
            ParamName::OrderId => "order_id",
            ParamName::UserOrderId => "user_order_id",
            ParamName::Symbol => "symbol",
            ParamName::Limit => "limit",
            ParamName::IsUseMaxLimit => "is_use_max_limit",
            ParamName::Sorting => "sorting",
            ParamName::Interval => "interval",
            ParamName::Direction => "direction",
            ParamName::OrderType => "order_type",
            ParamName::OrderStatus => "order_status",
            ParamName::Level => "level",
            ParamName::TradesCount => "trades_count",
            ParamName::Timestamp => "timestamp",
            ParamName::FromItem => "from_item",
            ParamName::ToItem => "to_item",
            ParamName::FromTime => "from_time",
            ParamName::ToTime => "to_time",
            ParamName::PriceOpen => "price_open",
            ParamName::PriceClose => "price_close",
            ParamName::PriceHigh => "price_high",
            ParamName::PriceLow => "price_low",
            ParamName::Price => "price",
            ParamName::AmountOriginal => "amount_original",
            ParamName::AmountExecuted => "amount_executed",
            ParamName::AmountAvailable => "amount_available",
            ParamName::AmountReserved => "amount_reserved",
            ParamName::Amount => "amount",
            ParamName::Fee => "fee",
            ParamName::Rebate => "rebate",
            ParamName::OrderCount => "order_count",
            ParamName::Balances => "balances",
            ParamName::Asks => "asks",
            ParamName::Bids => "bids",
            ParamName::Custom(name) => name,
        }
    }

    /// Resolve a token; anything unknown is a venue extra
    pub fn from_token(token: &str) -> Self {
        ParamName::KNOWN
            .iter()
            .find(|name| name.as_str() == token)
            .cloned()
            .unwrap_or_else(|| ParamName::Custom(token.to_string()))
    }

    /// Names holding a point in time
    pub fn is_timestamp(&self) -> bool {
        matches!(
            self,
            ParamName::Timestamp | ParamName::FromTime | ParamName::ToTime
        )
    }

    /// Paging boundary names, accepting either an item or a scalar
    pub fn is_paging_boundary(&self) -> bool {
        matches!(self, ParamName::FromItem | ParamName::ToItem)
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for ParamName {
    fn from(token: &str) -> Self {
        ParamName::from_token(token)
    }
}

impl From<String> for ParamName {
    fn from(token: String) -> Self {
        ParamName::from_token(&token)
    }
}

impl From<ParamName> for String {
    fn from(name: ParamName) -> Self {
        name.as_str().to_string()
    }
}

/// Canonical parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Decimal(Decimal),
    Flag(bool),
    Sorting(Sorting),
    Interval(Interval),
    Direction(Direction),
    OrderType(OrderType),
    OrderStatus(OrderStatus),
    /// Paging boundary or order reference given as a previously parsed item
    Item(Box<Item>),
}

impl ParamValue {
    /// Token used to look the value up in adapter value maps
    pub fn lookup_token(&self) -> Option<String> {
        match self {
            ParamValue::Text(text) => Some(text.clone()),
            ParamValue::Int(value) => Some(value.to_string()),
            ParamValue::Decimal(value) => Some(value.to_string()),
            ParamValue::Flag(value) => Some(value.to_string()),
            ParamValue::Sorting(value) => Some(value.as_str().to_string()),
            ParamValue::Interval(value) => Some(value.as_str().to_string()),
            ParamValue::Direction(value) => Some(value.as_str().to_string()),
            ParamValue::OrderType(value) => Some(value.as_str().to_string()),
            ParamValue::OrderStatus(value) => Some(value.as_str().to_string()),
            ParamValue::Item(_) => None,
        }
    }

    /// Raw JSON form used when no value map applies
    ///
    /// Decimals are rendered as strings so no precision is lost on the wire. Items fall back to
    /// their id, then their timestamp.
    pub fn to_json(&self) -> Value {
        match self {
            ParamValue::Text(text) => Value::String(text.clone()),
            ParamValue::Int(value) => Value::from(*value),
            ParamValue::Decimal(value) => Value::String(value.normalize().to_string()),
            ParamValue::Flag(value) => Value::Bool(*value),
            ParamValue::Item(item) => {
                let identity = item.identity();
                match (&identity.item_id, identity.timestamp) {
                    (Some(id), _) => Value::String(id.clone()),
                    (None, Some(ts)) => Value::from(ts),
                    (None, None) => Value::Null,
                }
            }
            other => other
                .lookup_token()
                .map(Value::String)
                .unwrap_or(Value::Null),
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            ParamValue::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Int(value) => Some(*value),
            ParamValue::Text(text) => text.parse().ok(),
            ParamValue::Decimal(value) => i64::try_from(value.trunc()).ok(),
            _ => None,
        }
    }

    pub fn as_sorting(&self) -> Option<Sorting> {
        match self {
            ParamValue::Sorting(sorting) => Some(*sorting),
            ParamValue::Text(text) => text.parse().ok(),
            _ => None,
        }
    }

    /// Position on the timeline used to order paging boundaries
    ///
    /// Items order by timestamp, falling back to a numeric item id; scalars by their value.
    pub fn chronology(&self) -> Option<Decimal> {
        match self {
            ParamValue::Int(value) => Some(Decimal::from(*value)),
            ParamValue::Decimal(value) => Some(*value),
            ParamValue::Text(text) => text.parse().ok(),
            ParamValue::Item(item) => {
                let identity = item.identity();
                identity.timestamp.map(Decimal::from).or_else(|| {
                    identity
                        .item_id
                        .as_deref()
                        .and_then(|id| id.parse().ok())
                })
            }
            _ => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<Decimal> for ParamValue {
    fn from(value: Decimal) -> Self {
        ParamValue::Decimal(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Flag(value)
    }
}

impl From<Item> for ParamValue {
    fn from(item: Item) -> Self {
        ParamValue::Item(Box::new(item))
    }
}

macro_rules! impl_from_token_enum {
    ($($ty:ident),+) => {
        $(impl From<$ty> for ParamValue {
            fn from(value: $ty) -> Self {
                ParamValue::$ty(value)
            }
        })+
    };
}

impl_from_token_enum!(Sorting, Interval, Direction, OrderType, OrderStatus);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Trade;
    use crate::venue::VenueId;

    #[test]
    fn test_interval_tokens_keep_case() {
        assert_eq!("1m".parse::<Interval>().unwrap(), Interval::Min1);
        assert_eq!("1M".parse::<Interval>().unwrap(), Interval::Month1);
        assert_eq!("1H".parse::<Interval>().unwrap(), Interval::Hrs1);
    }

    #[test]
    fn test_direction_accepts_venue_spelling() {
        assert_eq!("SELL".parse::<Direction>().unwrap(), Direction::Sell);
        assert_eq!("Buy".parse::<Direction>().unwrap(), Direction::Buy);
        assert!("hold".parse::<Direction>().is_err());
    }

    #[test]
    fn test_param_name_tokens() {
        assert_eq!(ParamName::from_token("from_item"), ParamName::FromItem);
        assert_eq!(
            ParamName::from_token("timeInForce"),
            ParamName::Custom("timeInForce".to_string())
        );
        assert_eq!(ParamName::Custom("x".into()).as_str(), "x");
        assert!(ParamName::ToTime.is_timestamp());
        assert!(!ParamName::ToItem.is_timestamp());
    }

    #[test]
    fn test_chronology_of_items_and_scalars() {
        let mut trade = Trade::default();
        trade.identity.venue = Some(VenueId::Binance);
        trade.identity.timestamp = Some(1_500_000);
        let item = ParamValue::from(Item::Trade(trade));
        assert_eq!(item.chronology(), Some(Decimal::from(1_500_000)));
        assert_eq!(ParamValue::Int(100).chronology(), Some(Decimal::from(100)));
        assert_eq!(ParamValue::Direction(Direction::Buy).chronology(), None);
    }

    #[test]
    fn test_to_json_renders_decimals_as_strings() {
        let value = ParamValue::Decimal("0.1000".parse().unwrap());
        assert_eq!(value.to_json(), Value::String("0.1".to_string()));
        assert_eq!(
            ParamValue::Direction(Direction::Sell).to_json(),
            Value::String("sell".to_string())
        );
    }
}
