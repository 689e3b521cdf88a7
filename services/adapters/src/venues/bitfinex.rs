//! Bitfinex API, v2 with v1 for the symbol list

use std::time::Duration;
use types::{Endpoint, ErrorCode, ItemKind, ParamName, Sorting, VenueId};

use super::RestProfile;
use crate::engine::{
    AdapterConfig, ErrorField, FieldMap, PagingKey, PagingRules, SignatureDigest, SortingRules,
    SymbolsFormat, TimestampEncoding,
};
use crate::rate_limit::CooldownPolicy;

const REST_URL: &str = "https://api.bitfinex.com/v{version}/";

pub fn rest() -> RestProfile {
    RestProfile::new(
        VenueId::Bitfinex,
        "2",
        CooldownPolicy::Fixed {
            rate_limit: Duration::from_secs(60),
        },
    )
    .adapter(v1())
    .adapter(v2())
    .version_for(Endpoint::Symbols, "1")
}

fn v1() -> AdapterConfig {
    AdapterConfig::new(VenueId::Bitfinex, "1", REST_URL)
        .endpoint(Endpoint::Symbols, "symbols")
        .endpoint(Endpoint::Trade, "trades/{symbol}")
        .unsupported(ParamName::Symbol)
        .unsupported(ParamName::Sorting)
        .unsupported(ParamName::ToItem)
        .unsupported(ParamName::ToTime)
        .param_name(ParamName::Limit, "limit_trades")
        .param_name(ParamName::FromItem, "timestamp")
        .param_name(ParamName::FromTime, "timestamp")
        .paging(PagingRules {
            key: PagingKey::Timestamp,
            to_item_exclusive: false,
        })
        .timestamps(TimestampEncoding::Seconds)
        .max_limit(Endpoint::Trade, 1000)
        .symbols_format(SymbolsFormat::LowercaseStrings)
        .fields(
            ItemKind::Trade,
            FieldMap::keyed([
                ("tid", ParamName::ItemId),
                ("timestamp", ParamName::Timestamp),
                ("price", ParamName::Price),
                ("amount", ParamName::Amount),
                ("type", ParamName::Direction),
            ]),
        )
        .error_fields(FieldMap::keyed([("message", ErrorField::Message)]))
        .error_message("Unknown symbol", ErrorCode::WrongSymbol)
        .http_error(429, ErrorCode::RateLimit)
        .digest(SignatureDigest::Sha384)
}

fn v2() -> AdapterConfig {
    AdapterConfig::new(VenueId::Bitfinex, "2", REST_URL)
        .endpoint(Endpoint::Trade, "trades/t{symbol}/hist")
        .endpoint(Endpoint::TradeHistory, "trades/t{symbol}/hist")
        // The symbol travels in the path only
        .unsupported(ParamName::Symbol)
        .unsupported(ParamName::IsUseMaxLimit)
        .param_name(ParamName::Sorting, "sort")
        .param_name(ParamName::FromItem, "start")
        .param_name(ParamName::ToItem, "end")
        .param_name(ParamName::FromTime, "start")
        .param_name(ParamName::ToTime, "end")
        .value(Sorting::Ascending, 1)
        .value(Sorting::Descending, 0)
        .sorting(SortingRules {
            enabled: true,
            default: Sorting::Descending,
            natural: Sorting::Descending,
        })
        .paging(PagingRules {
            key: PagingKey::Timestamp,
            to_item_exclusive: false,
        })
        .max_limit(Endpoint::Trade, 1000)
        .max_limit(Endpoint::TradeHistory, 1000)
        .fields(
            ItemKind::Trade,
            FieldMap::positional([
                Some(ParamName::ItemId),
                Some(ParamName::Timestamp),
                Some(ParamName::Amount),
                Some(ParamName::Price),
            ]),
        )
        .direction_from_amount_sign()
        .error_fields(FieldMap::positional([None, Some(ErrorField::Code), Some(ErrorField::Message)]))
        .error_code(10020, ErrorCode::WrongLimit)
        .error_code(11010, ErrorCode::RateLimit)
        .http_error(429, ErrorCode::RateLimit)
        .digest(SignatureDigest::Sha384)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RestClientConfig;
    use crate::engine::Parsed;
    use crate::rest::RestConverter;
    use serde_json::json;
    use types::{Decimal, Direction, ParamMap};

    fn converter(adapter: AdapterConfig) -> RestConverter {
        RestConverter::new(adapter, &RestClientConfig::default())
    }

    #[test]
    fn test_symbol_goes_into_path_only() {
        let converter = converter(v2());
        let mut params = ParamMap::new();
        params.insert(ParamName::Symbol, "BTCUSD".into());
        params.insert(ParamName::Limit, 10i64.into());
        let params = converter.preprocess(Endpoint::Trade, params);
        let request = converter.engine().to_platform_request(Endpoint::Trade, &params).unwrap();
        assert_eq!(request.path, "trades/tBTCUSD/hist");
        assert!(!request.params.contains_key("symbol"));
        assert_eq!(request.params["sort"], json!(0));
        assert_eq!(request.params["limit"], json!(10));
    }

    #[test]
    fn test_direction_from_amount_sign() {
        let raw = json!([[1, 1539711988104i64, -0.5, 6400.1], [2, 1539711988105i64, 0.25, 6400.2]]);
        let parsed = converter(v2()).engine().parse(Endpoint::Trade, &raw).unwrap();
        let sell = parsed.items()[0].as_trade().unwrap();
        assert_eq!(sell.direction, Some(Direction::Sell));
        assert_eq!(sell.amount, Some(Decimal::new(5, 1)));
        let buy = parsed.items()[1].as_trade().unwrap();
        assert_eq!(buy.direction, Some(Direction::Buy));
    }

    #[test]
    fn test_positional_error_body() {
        let body = json!(["error", 10020, "limit: invalid"]);
        let error = converter(v2()).engine().parse_error(Some(&body), Some(500)).unwrap();
        assert_eq!(error.code, ErrorCode::WrongLimit);
        assert!(error.message.contains("limit: invalid"));
    }

    #[test]
    fn test_v1_symbols_are_uppercased() {
        let parsed = converter(v1())
            .engine()
            .parse(Endpoint::Symbols, &json!(["btcusd", "ethusd"]))
            .unwrap();
        assert_eq!(
            parsed,
            Parsed::Symbols(vec!["BTCUSD".to_string(), "ETHUSD".to_string()])
        );
    }
}
