//! OKEx spot API (v1)

use std::time::Duration;
use types::{Direction, Endpoint, ErrorCode, Interval, ItemKind, OrderType, ParamName, ParamValue, VenueId};

use super::{RestProfile, WsProfile};
use crate::engine::{AdapterConfig, ErrorField, FieldMap};
use crate::input::{CommandFormat, Compression, Heartbeat, WsSchema};
use crate::rate_limit::CooldownPolicy;

const REST_URL: &str = "https://www.okex.com/api/v{version}/";
const WS_URL: &str = "wss://real.okex.com:10440/ws/v{version}";

const INTERVALS: [(Interval, &str); 12] = [
    (Interval::Min1, "1min"),
    (Interval::Min3, "3min"),
    (Interval::Min5, "5min"),
    (Interval::Min15, "15min"),
    (Interval::Min30, "30min"),
    (Interval::Hrs1, "1hour"),
    (Interval::Hrs2, "2hour"),
    (Interval::Hrs4, "4hour"),
    (Interval::Hrs6, "6hour"),
    (Interval::Hrs12, "12hour"),
    (Interval::Day1, "1day"),
    (Interval::Week1, "1week"),
];

fn with_intervals(mut config: AdapterConfig) -> AdapterConfig {
    for (interval, platform) in INTERVALS {
        config = config.value(interval, platform);
    }
    config
}

fn candle_fields() -> FieldMap {
    FieldMap::positional([
        Some(ParamName::Timestamp),
        Some(ParamName::PriceOpen),
        Some(ParamName::PriceHigh),
        Some(ParamName::PriceLow),
        Some(ParamName::PriceClose),
        Some(ParamName::Amount),
    ])
}

pub fn rest() -> RestProfile {
    RestProfile::new(VenueId::Okex, "1", CooldownPolicy::escalating())
        .adapter(rest_adapter("1"))
        .adapter(rest_adapter("3"))
}

fn rest_adapter(version: &str) -> AdapterConfig {
    let config = AdapterConfig::new(VenueId::Okex, version, REST_URL)
        .endpoint(Endpoint::Trade, "trades.do")
        .endpoint(Endpoint::TradeHistory, "trades.do")
        .endpoint(Endpoint::Candle, "kline.do")
        .param_name(ParamName::Limit, "size")
        .param_name(ParamName::Interval, "type")
        .param_name(ParamName::Direction, "side")
        .param_name(ParamName::OrderType, "type")
        .param_name(ParamName::FromItem, "fromId")
        .param_name(ParamName::FromTime, "startTime")
        .param_name(ParamName::ToTime, "endTime")
        .param_name(ParamName::Amount, "quantity")
        .unsupported(ParamName::IsUseMaxLimit)
        .unsupported(ParamName::ToItem)
        .unsupported(ParamName::Sorting)
        .field_value(ParamName::Direction, Direction::Sell, "SELL")
        .field_value(ParamName::Direction, Direction::Buy, "BUY")
        .field_value(ParamName::OrderType, OrderType::Limit, "LIMIT")
        .field_value(ParamName::OrderType, OrderType::Market, "MARKET")
        .max_limit(Endpoint::Trade, 1000)
        .max_limit(Endpoint::TradeHistory, 1000)
        .max_limit(Endpoint::OrderBook, 1000)
        .max_limit(Endpoint::Candle, 1000)
        .fields(
            ItemKind::Trade,
            FieldMap::keyed([
                ("date_ms", ParamName::Timestamp),
                ("tid", ParamName::ItemId),
                ("price", ParamName::Price),
                ("amount", ParamName::Amount),
                ("type", ParamName::Direction),
            ]),
        )
        .fields(ItemKind::Candle, candle_fields())
        .error_fields(FieldMap::keyed([
            ("code", ErrorField::Code),
            ("msg", ErrorField::Message),
        ]))
        .error_code(-2014, ErrorCode::Unauthorized)
        .error_code(-1121, ErrorCode::WrongSymbol)
        .error_code(-1100, ErrorCode::WrongParam)
        .http_error(429, ErrorCode::RateLimit)
        .http_error(418, ErrorCode::IpBan);
    with_intervals(config)
}

pub fn ws() -> WsProfile {
    let adapter = AdapterConfig::new(VenueId::Okex, "1", WS_URL)
        .endpoint(Endpoint::Trade, "ok_sub_spot_{symbol}_deals")
        .endpoint(Endpoint::Candle, "ok_sub_spot_{symbol}_kline_{interval}")
        .envelope("data")
        .fields(
            ItemKind::Trade,
            FieldMap::positional([
                Some(ParamName::ItemId),
                Some(ParamName::Price),
                Some(ParamName::Amount),
                None,
                Some(ParamName::Direction),
            ]),
        )
        .fields(ItemKind::Candle, candle_fields())
        .field_value(ParamName::Direction, Direction::Sell, "ask")
        .field_value(ParamName::Direction, Direction::Buy, "bid")
        .error_fields(FieldMap::keyed([("errorcode", ErrorField::Code)]));

    let schema = WsSchema {
        command: Some(CommandFormat::EventPerChannel {
            subscribe: "addChannel".to_string(),
            unsubscribe: "removeChannel".to_string(),
        }),
        supported_endpoints: vec![Endpoint::Trade, Endpoint::Candle],
        symbol_endpoints: [Endpoint::Trade, Endpoint::Candle].into_iter().collect(),
        lowercase_symbols: true,
        default_params: [(ParamName::Interval, ParamValue::from(Interval::Min1))]
            .into_iter()
            .collect(),
        compression: Compression::RawDeflate,
        heartbeat: Some(Heartbeat {
            interval: Duration::from_secs(30),
            frame: r#"{"event":"ping"}"#.to_string(),
        }),
        channel_key: Some("channel".to_string()),
        error_key: Some("errorcode".to_string()),
        ..WsSchema::default()
    };

    WsProfile {
        venue: VenueId::Okex,
        adapter: with_intervals(adapter),
        schema,
    }
}
