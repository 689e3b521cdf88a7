//! Binance spot API

use types::{
    Direction, Endpoint, ErrorCode, Interval, ItemKind, OrderStatus, OrderType, ParamName, ParamValue, VenueId,
};

use super::{RestProfile, WsProfile};
use crate::engine::{AdapterConfig, ErrorField, FieldMap, SymbolsFormat};
use crate::input::{UrlFormat, WsSchema};
use crate::rate_limit::CooldownPolicy;

const REST_URL: &str = "https://api.binance.com/api/v{version}/";
const WS_URL: &str = "wss://stream.binance.com:9443/";

pub fn rest() -> RestProfile {
    let mut profile = RestProfile::new(VenueId::Binance, "1", CooldownPolicy::escalating())
        .adapter(rest_adapter("1"))
        .adapter(rest_adapter("3"))
        .version_for(Endpoint::Account, "3")
        .version_for(Endpoint::Ticker, "3")
        .version_for(Endpoint::TickerAll, "3");
    profile.api_key_header = Some("X-MBX-APIKEY".to_string());
    profile.stamp_secured_requests = true;
    profile.limit_order_params = vec![(
        ParamName::Custom("timeInForce".to_string()),
        ParamValue::from("GTC"),
    )];
    profile
}

fn rest_adapter(version: &str) -> AdapterConfig {
    AdapterConfig::new(VenueId::Binance, version, REST_URL)
        .endpoint(Endpoint::Ping, "ping")
        .endpoint(Endpoint::ServerTime, "time")
        .endpoint(Endpoint::Symbols, "exchangeInfo")
        .endpoint(Endpoint::Trade, "trades")
        .endpoint(Endpoint::TradeHistory, "historicalTrades")
        .endpoint(Endpoint::TradeMy, "myTrades")
        .endpoint(Endpoint::Candle, "klines")
        .endpoint(Endpoint::Ticker, "ticker/price")
        .endpoint(Endpoint::TickerAll, "ticker/price")
        .endpoint(Endpoint::OrderBook, "depth")
        .endpoint(Endpoint::Account, "account")
        .endpoint(Endpoint::Order, "order")
        .endpoint(Endpoint::OrderTest, "order/test")
        .endpoint(Endpoint::OrderCurrent, "openOrders")
        .endpoint(Endpoint::OrderMy, "allOrders")
        .history(Endpoint::Trade, Endpoint::TradeHistory)
        .param_name(ParamName::Direction, "side")
        .param_name(ParamName::OrderType, "type")
        .param_name(ParamName::FromItem, "fromId")
        .param_name(ParamName::FromTime, "startTime")
        .param_name(ParamName::ToTime, "endTime")
        .param_name(ParamName::Amount, "quantity")
        .param_name(ParamName::ItemId, "orderId")
        .param_name(ParamName::OrderId, "orderId")
        .param_name(ParamName::UserOrderId, "origClientOrderId")
        .unsupported(ParamName::ToItem)
        .unsupported(ParamName::IsUseMaxLimit)
        .unsupported(ParamName::Sorting)
        .field_value(ParamName::Direction, Direction::Sell, "SELL")
        .field_value(ParamName::Direction, Direction::Buy, "BUY")
        .field_value(ParamName::OrderType, OrderType::Limit, "LIMIT")
        .field_value(ParamName::OrderType, OrderType::Market, "MARKET")
        .field_value(ParamName::OrderStatus, OrderStatus::New, "NEW")
        .field_value(ParamName::OrderStatus, OrderStatus::PartiallyFilled, "PARTIALLY_FILLED")
        .field_value(ParamName::OrderStatus, OrderStatus::Filled, "FILLED")
        .field_value(ParamName::OrderStatus, OrderStatus::Canceled, "CANCELED")
        .field_value(ParamName::OrderStatus, OrderStatus::Rejected, "REJECTED")
        .field_value(ParamName::OrderStatus, OrderStatus::Expired, "EXPIRED")
        .max_limit(Endpoint::Trade, 1000)
        .max_limit(Endpoint::TradeHistory, 1000)
        .max_limit(Endpoint::OrderBook, 1000)
        .max_limit(Endpoint::Candle, 1000)
        .server_time_key("serverTime")
        .symbols_format(SymbolsFormat::Objects {
            list_key: Some("symbols".to_string()),
            symbol_key: "symbol".to_string(),
        })
        .fields(
            ItemKind::Trade,
            FieldMap::keyed([
                ("time", ParamName::Timestamp),
                ("id", ParamName::ItemId),
                ("price", ParamName::Price),
                ("qty", ParamName::Amount),
            ]),
        )
        .fields(
            ItemKind::MyTrade,
            FieldMap::keyed([
                ("symbol", ParamName::Symbol),
                ("time", ParamName::Timestamp),
                ("id", ParamName::ItemId),
                ("price", ParamName::Price),
                ("qty", ParamName::Amount),
                ("orderId", ParamName::OrderId),
                ("commission", ParamName::Fee),
            ]),
        )
        .fields(
            ItemKind::Candle,
            FieldMap::positional([
                Some(ParamName::Timestamp),
                Some(ParamName::PriceOpen),
                Some(ParamName::PriceHigh),
                Some(ParamName::PriceLow),
                Some(ParamName::PriceClose),
                Some(ParamName::Amount),
                None,
                None,
                Some(ParamName::TradesCount),
            ]),
        )
        .fields(
            ItemKind::Ticker,
            FieldMap::keyed([("symbol", ParamName::Symbol), ("price", ParamName::Price)]),
        )
        .fields(
            ItemKind::Account,
            FieldMap::keyed([("updateTime", ParamName::Timestamp), ("balances", ParamName::Balances)]),
        )
        .fields(
            ItemKind::Balance,
            FieldMap::keyed([
                ("asset", ParamName::Symbol),
                ("free", ParamName::AmountAvailable),
                ("locked", ParamName::AmountReserved),
            ]),
        )
        .fields(
            ItemKind::Order,
            FieldMap::keyed([
                ("symbol", ParamName::Symbol),
                ("transactTime", ParamName::Timestamp),
                ("time", ParamName::Timestamp),
                ("updateTime", ParamName::Timestamp),
                ("orderId", ParamName::ItemId),
                ("clientOrderId", ParamName::UserOrderId),
                ("type", ParamName::OrderType),
                ("price", ParamName::Price),
                ("origQty", ParamName::AmountOriginal),
                ("executedQty", ParamName::AmountExecuted),
                ("side", ParamName::Direction),
                ("status", ParamName::OrderStatus),
            ]),
        )
        .fields(
            ItemKind::OrderBook,
            FieldMap::keyed([
                ("lastUpdateId", ParamName::ItemId),
                ("bids", ParamName::Bids),
                ("asks", ParamName::Asks),
            ]),
        )
        .fields(
            ItemKind::OrderBookItem,
            FieldMap::positional([Some(ParamName::Price), Some(ParamName::Amount)]),
        )
        .error_fields(FieldMap::keyed([
            ("code", ErrorField::Code),
            ("msg", ErrorField::Message),
        ]))
        .error_code(-2014, ErrorCode::Unauthorized)
        .error_code(-1121, ErrorCode::WrongSymbol)
        .error_code(-1100, ErrorCode::WrongParam)
        .http_error(429, ErrorCode::RateLimit)
        .http_error(418, ErrorCode::IpBan)
}

pub fn ws() -> WsProfile {
    let adapter = AdapterConfig::new(VenueId::Binance, "1", WS_URL)
        .endpoint(Endpoint::Trade, "{symbol}@trade")
        .endpoint(Endpoint::Candle, "{symbol}@kline_{interval}")
        .endpoint(Endpoint::Ticker, "{symbol}@miniTicker")
        .endpoint(Endpoint::TickerAll, "!miniTicker@arr")
        .endpoint(Endpoint::OrderBook, "{symbol}@depth{level}")
        .endpoint(Endpoint::OrderBookDiff, "{symbol}@depth")
        .envelope("data")
        .item_key(Endpoint::Candle, "k")
        .fields(
            ItemKind::Trade,
            FieldMap::keyed([
                ("s", ParamName::Symbol),
                ("T", ParamName::Timestamp),
                ("t", ParamName::ItemId),
                ("p", ParamName::Price),
                ("q", ParamName::Amount),
            ]),
        )
        .fields(
            ItemKind::Candle,
            FieldMap::keyed([
                ("s", ParamName::Symbol),
                ("t", ParamName::Timestamp),
                ("i", ParamName::Interval),
                ("o", ParamName::PriceOpen),
                ("c", ParamName::PriceClose),
                ("h", ParamName::PriceHigh),
                ("l", ParamName::PriceLow),
                ("v", ParamName::Amount),
                ("n", ParamName::TradesCount),
            ]),
        )
        .fields(
            ItemKind::Ticker,
            FieldMap::keyed([
                ("s", ParamName::Symbol),
                ("E", ParamName::Timestamp),
                ("c", ParamName::Price),
            ]),
        )
        .fields(
            ItemKind::OrderBook,
            FieldMap::keyed([
                ("lastUpdateId", ParamName::ItemId),
                ("asks", ParamName::Asks),
                ("bids", ParamName::Bids),
                ("s", ParamName::Symbol),
                ("E", ParamName::Timestamp),
                ("u", ParamName::ItemId),
                ("b", ParamName::Bids),
                ("a", ParamName::Asks),
            ]),
        )
        .fields(
            ItemKind::OrderBookItem,
            FieldMap::positional([Some(ParamName::Price), Some(ParamName::Amount)]),
        );

    let schema = WsSchema {
        url: Some(UrlFormat::StreamPath),
        supported_endpoints: vec![
            Endpoint::Trade,
            Endpoint::Candle,
            Endpoint::Ticker,
            Endpoint::TickerAll,
            Endpoint::OrderBook,
            Endpoint::OrderBookDiff,
        ],
        symbol_endpoints: [
            Endpoint::Trade,
            Endpoint::Candle,
            Endpoint::Ticker,
            Endpoint::OrderBook,
            Endpoint::OrderBookDiff,
        ]
        .into_iter()
        .collect(),
        lowercase_symbols: true,
        default_params: [
            (ParamName::Interval, ParamValue::from(Interval::Min1)),
            (ParamName::Level, ParamValue::Int(5)),
        ]
        .into_iter()
        .collect(),
        event_type_key: Some("e".to_string()),
        endpoint_by_event_type: [
            ("trade", Endpoint::Trade),
            ("kline", Endpoint::Candle),
            ("24hrMiniTicker", Endpoint::Ticker),
            ("24hrTicker", Endpoint::Ticker),
            ("depthUpdate", Endpoint::OrderBookDiff),
        ]
        .into_iter()
        .map(|(event, endpoint)| (event.to_string(), endpoint))
        .collect(),
        channel_key: Some("stream".to_string()),
        ..WsSchema::default()
    };

    WsProfile {
        venue: VenueId::Binance,
        adapter,
        schema,
    }
}
