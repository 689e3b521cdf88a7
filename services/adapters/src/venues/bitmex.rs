//! BitMEX API

use std::time::Duration;
use types::{Direction, Endpoint, ErrorCode, ItemKind, ParamName, Sorting, VenueId};

use super::{RestProfile, WsProfile};
use crate::engine::{
    AdapterConfig, ErrorField, FieldMap, PagingKey, PagingRules, SortingRules, TimestampEncoding,
};
use crate::input::{CommandFormat, UrlFormat, WsSchema};
use crate::rate_limit::CooldownPolicy;

const REST_URL: &str = "https://www.bitmex.com/api/v{version}";
const WS_URL: &str = "wss://www.bitmex.com/realtime";

/// Trade fields, shared by REST and the `trade` table
fn trade_fields(config: AdapterConfig) -> AdapterConfig {
    config
        .fields(
            ItemKind::Trade,
            FieldMap::keyed([
                ("trdMatchID", ParamName::ItemId),
                ("timestamp", ParamName::Timestamp),
                ("symbol", ParamName::Symbol),
                ("price", ParamName::Price),
                ("size", ParamName::Amount),
                ("side", ParamName::Direction),
            ]),
        )
        .field_value(ParamName::Direction, Direction::Buy, "Buy")
        .field_value(ParamName::Direction, Direction::Sell, "Sell")
        .timestamps(TimestampEncoding::Iso8601)
        // Index symbols like ".XBT" are not tradable
        .skip_symbol_prefix(".")
}

pub fn rest() -> RestProfile {
    let adapter = AdapterConfig::new(VenueId::Bitmex, "1", REST_URL)
        .endpoint(Endpoint::Trade, "trade")
        .endpoint(Endpoint::TradeHistory, "trade")
        .param_name(ParamName::Limit, "count")
        .param_name(ParamName::Sorting, "reverse")
        .param_name(ParamName::FromItem, "startTime")
        .param_name(ParamName::ToItem, "endTime")
        .param_name(ParamName::FromTime, "startTime")
        .param_name(ParamName::ToTime, "endTime")
        .value(Sorting::Ascending, false)
        .value(Sorting::Descending, true)
        .sorting(SortingRules {
            enabled: true,
            default: Sorting::Ascending,
            natural: Sorting::Ascending,
        })
        .paging(PagingRules {
            key: PagingKey::Timestamp,
            to_item_exclusive: true,
        })
        .max_limit(Endpoint::Trade, 500)
        .max_limit(Endpoint::TradeHistory, 500)
        .error_envelope("error")
        .error_fields(FieldMap::keyed([
            ("name", ErrorField::Code),
            ("message", ErrorField::Message),
        ]))
        .error_message("Maximum result count", ErrorCode::WrongLimit)
        .error_message("Unknown symbol", ErrorCode::WrongSymbol)
        .http_error(400, ErrorCode::WrongParam)
        .http_error(401, ErrorCode::Unauthorized)
        .http_error(429, ErrorCode::RateLimit);

    RestProfile::new(
        VenueId::Bitmex,
        "1",
        CooldownPolicy::RetryAfter {
            fallback: Duration::from_secs(60),
        },
    )
    .adapter(trade_fields(adapter))
}

pub fn ws() -> WsProfile {
    let adapter = AdapterConfig::new(VenueId::Bitmex, "1", WS_URL)
        .endpoint(Endpoint::Trade, "trade:{symbol}")
        .envelope("data")
        .error_fields(FieldMap::keyed([
            ("status", ErrorField::Code),
            ("error", ErrorField::Message),
        ]))
        .error_message("Unknown symbol", ErrorCode::WrongSymbol)
        .http_error(401, ErrorCode::Unauthorized)
        .http_error(429, ErrorCode::RateLimit);

    let schema = WsSchema {
        url: Some(UrlFormat::QueryParam {
            name: "subscribe".to_string(),
        }),
        command: Some(CommandFormat::OpArgs),
        supported_endpoints: vec![Endpoint::Trade],
        symbol_endpoints: [Endpoint::Trade].into_iter().collect(),
        event_type_key: Some("table".to_string()),
        endpoint_by_event_type: [("trade".to_string(), Endpoint::Trade)].into_iter().collect(),
        error_key: Some("error".to_string()),
        ..WsSchema::default()
    };

    WsProfile {
        venue: VenueId::Bitmex,
        adapter: trade_fields(adapter),
        schema,
    }
}
