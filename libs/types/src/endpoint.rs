//! Logical endpoints
//!
//! An endpoint names an operation independently of any venue URL or channel name.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;
use crate::items::ItemKind;

/// Canonical operation identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Endpoint {
    Ping,
    ServerTime,
    Symbols,
    Trade,
    TradeHistory,
    TradeMy,
    Candle,
    Ticker,
    TickerAll,
    OrderBook,
    OrderBookDiff,
    Account,
    Order,
    OrderTest,
    OrderCurrent,
    OrderMy,
}

impl Endpoint {
    pub const ALL: [Endpoint; 16] = [
        Endpoint::Ping,
        Endpoint::ServerTime,
        Endpoint::Symbols,
        Endpoint::Trade,
        Endpoint::TradeHistory,
        Endpoint::TradeMy,
        Endpoint::Candle,
        Endpoint::Ticker,
        Endpoint::TickerAll,
        Endpoint::OrderBook,
        Endpoint::OrderBookDiff,
        Endpoint::Account,
        Endpoint::Order,
        Endpoint::OrderTest,
        Endpoint::OrderCurrent,
        Endpoint::OrderMy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Ping => "ping",
            Endpoint::ServerTime => "time",
            Endpoint::Symbols => "symbols",
            Endpoint::Trade => "trade",
            Endpoint::TradeHistory => "trade/history",
            Endpoint::TradeMy => "trade/my",
            Endpoint::Candle => "candle",
            Endpoint::Ticker => "ticker",
            Endpoint::TickerAll => "ticker_all",
            Endpoint::OrderBook => "orderbook",
            Endpoint::OrderBookDiff => "orderbook/diff",
            Endpoint::Account => "account",
            Endpoint::Order => "order",
            Endpoint::OrderTest => "order/test",
            Endpoint::OrderCurrent => "order/current",
            Endpoint::OrderMy => "order/my",
        }
    }

    /// Item class the endpoint's payload parses into, if any
    pub fn item_kind(&self) -> Option<ItemKind> {
        match self {
            Endpoint::Trade | Endpoint::TradeHistory => Some(ItemKind::Trade),
            Endpoint::TradeMy => Some(ItemKind::MyTrade),
            Endpoint::Candle => Some(ItemKind::Candle),
            Endpoint::Ticker | Endpoint::TickerAll => Some(ItemKind::Ticker),
            Endpoint::OrderBook | Endpoint::OrderBookDiff => Some(ItemKind::OrderBook),
            Endpoint::Account => Some(ItemKind::Account),
            Endpoint::Order | Endpoint::OrderTest | Endpoint::OrderCurrent | Endpoint::OrderMy => {
                Some(ItemKind::Order)
            }
            Endpoint::Ping | Endpoint::ServerTime | Endpoint::Symbols => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Endpoint {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Endpoint::ALL
            .into_iter()
            .find(|endpoint| endpoint.as_str() == s)
            .ok_or_else(|| TypesError::UnknownToken {
                kind: "endpoint",
                token: s.to_string(),
            })
    }
}
