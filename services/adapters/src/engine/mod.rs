//! Conversion engine
//!
//! [`Converter`] translates between the canonical protocol and one venue API version, driven
//! entirely by an [`AdapterConfig`]. It has no I/O and no mutable state, so the REST pipeline
//! and the WebSocket session share it behind an `Arc`.
//!
//! Outbound, [`Converter::to_platform_request`] renames parameters, maps their values, encodes
//! timestamps and resolves the endpoint path. Inbound, [`Converter::parse`] turns a decoded JSON
//! payload into canonical items and [`Converter::parse_error`] turns an error body plus HTTP
//! status into an [`ApiError`].
//!
//! Venue-side problems are values ([`Parsed::Error`]); only configuration defects are `Err`.

pub mod schema;
pub mod timestamp;

use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::debug;
use types::{
    ApiError, Direction, Endpoint, ErrorCode, Interval, Item, ItemKind, OrderStatus, OrderType,
    ParamMap, ParamName, ParamValue, Sorting, VenueId,
};

pub use schema::{
    AdapterConfig, EndpointPath, ErrorField, ErrorFormat, FieldMap, PagingKey, PagingRules,
    PayloadShape, SignatureDigest, SortingRules, SymbolsFormat,
};
pub use timestamp::{TimeUnit, TimestampEncoding};

use crate::{AdapterError, Result};

/// Result of parsing one venue payload
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed {
    Item(Item),
    Items(Vec<Item>),
    /// Server time in the client's unit
    Timestamp(i64),
    Symbols(Vec<String>),
    /// Payload of an endpoint without an item class, returned untouched
    Raw(Value),
    Error(ApiError),
}

impl Parsed {
    /// Parsed items, empty for non-item results
    pub fn items(&self) -> &[Item] {
        match self {
            Parsed::Item(item) => std::slice::from_ref(item),
            Parsed::Items(items) => items,
            _ => &[],
        }
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            Parsed::Item(item) => vec![item],
            Parsed::Items(items) => items,
            _ => Vec::new(),
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            Parsed::Error(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Parsed::Error(_))
    }
}

/// Venue path and parameters of one call
#[derive(Debug, Clone, PartialEq)]
pub struct PlatformRequest {
    /// Path relative to the base URL, or the channel name for WebSocket templates
    pub path: String,
    /// Venue parameter names to wire values, sorted by name
    pub params: BTreeMap<String, Value>,
}

/// Canonical/venue translator for one venue API version
#[derive(Debug, Clone)]
pub struct Converter {
    config: Arc<AdapterConfig>,
    unit: TimeUnit,
}

impl Converter {
    pub fn new(config: AdapterConfig, use_milliseconds: bool) -> Self {
        Self {
            config: Arc::new(config),
            unit: TimeUnit::from_flag(use_milliseconds),
        }
    }

    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    pub fn venue(&self) -> VenueId {
        self.config.venue
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    // Outbound

    /// Translate a canonical call into the venue's path and parameters
    ///
    /// Deterministic: the same input always yields the same output.
    pub fn to_platform_request(&self, endpoint: Endpoint, params: &ParamMap) -> Result<PlatformRequest> {
        let path = self.resolve_path(endpoint, params)?;

        let mut platform_params = BTreeMap::new();
        for (name, value) in params {
            let Some(platform_name) = self.platform_name(name) else {
                continue;
            };
            let platform_value = self.platform_value(name, value);
            if platform_value.is_null() {
                continue;
            }
            platform_params.insert(platform_name, platform_value);
        }

        Ok(PlatformRequest {
            path,
            params: platform_params,
        })
    }

    /// Venue name of a canonical parameter, `None` when the venue does not support it
    pub fn platform_name(&self, name: &ParamName) -> Option<String> {
        match self.config.param_names.get(name) {
            Some(Some(platform)) if !platform.is_empty() => Some(platform.clone()),
            Some(_) => None,
            None => Some(name.as_str().to_string()),
        }
    }

    /// Venue wire value of a canonical parameter
    pub fn platform_value(&self, name: &ParamName, value: &ParamValue) -> Value {
        if name.is_paging_boundary() {
            return self.paging_value(name, value);
        }
        if name.is_timestamp() {
            if let Some(timestamp) = value.as_i64() {
                return self.timestamp_to_platform(timestamp);
            }
        }
        self.mapped_value(name, value)
    }

    fn paging_value(&self, name: &ParamName, value: &ParamValue) -> Value {
        let paging = self.config.paging;
        match (value.as_item(), paging.key) {
            (Some(item), PagingKey::ItemId) => item
                .item_id()
                .map(|id| Value::String(id.to_string()))
                .unwrap_or(Value::Null),
            (Some(item), PagingKey::Timestamp) => match item.timestamp() {
                Some(timestamp) => {
                    let inclusive = if paging.to_item_exclusive && *name == ParamName::ToItem {
                        timestamp.saturating_add(1)
                    } else {
                        timestamp
                    };
                    self.timestamp_to_platform(inclusive)
                }
                None => Value::Null,
            },
            (None, PagingKey::Timestamp) => match value.as_i64() {
                Some(timestamp) => self.timestamp_to_platform(timestamp),
                None => value.to_json(),
            },
            (None, PagingKey::ItemId) => value.to_json(),
        }
    }

    fn mapped_value(&self, name: &ParamName, value: &ParamValue) -> Value {
        if let Some(token) = value.lookup_token() {
            if let Some(mapped) = self
                .config
                .values_by_field
                .get(name)
                .and_then(|values| values.get(&token))
            {
                return mapped.clone();
            }
            if is_enum_value(value) {
                if let Some(mapped) = self.config.values.get(&token) {
                    return mapped.clone();
                }
            }
        }
        value.to_json()
    }

    /// Resolve an endpoint to its venue path for this call's parameters
    pub fn resolve_path(&self, endpoint: Endpoint, params: &ParamMap) -> Result<String> {
        let path = self
            .config
            .endpoints
            .get(&endpoint)
            .ok_or_else(|| AdapterError::UnsupportedEndpoint {
                venue: self.venue(),
                endpoint,
            })?;
        self.render_path(path, params)
    }

    pub fn supports(&self, endpoint: Endpoint) -> bool {
        self.config.endpoints.contains_key(&endpoint)
    }

    fn render_path(&self, path: &EndpointPath, params: &ParamMap) -> Result<String> {
        match path {
            EndpointPath::Literal(path) => Ok(path.clone()),
            EndpointPath::Template(template) => self.fill_template(template, params),
            EndpointPath::Dynamic(choose) => {
                let chosen = choose(params);
                if let EndpointPath::Dynamic(_) = chosen {
                    return Err(AdapterError::Configuration(format!(
                        "Dynamic path for venue {} returned another dynamic path",
                        self.venue()
                    )));
                }
                self.render_path(&chosen, params)
            }
        }
    }

    fn fill_template(&self, template: &str, params: &ParamMap) -> Result<String> {
        let mut rendered = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            rendered.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| {
                AdapterError::Configuration(format!("Unclosed placeholder in '{}'", template))
            })?;
            let placeholder = &after[..close];
            let name = ParamName::from_token(placeholder);
            let value = params
                .get(&name)
                .ok_or_else(|| AdapterError::MissingTemplateParam {
                    venue: self.venue(),
                    template: template.to_string(),
                    param: placeholder.to_string(),
                })?;
            rendered.push_str(&wire_text(&self.platform_value(&name, value)));
            rest = &after[close + 1..];
        }
        rendered.push_str(rest);
        Ok(rendered)
    }

    pub fn timestamp_to_platform(&self, timestamp: i64) -> Value {
        timestamp::to_platform(self.config.timestamp_encoding, self.unit, timestamp)
    }

    pub fn timestamp_from_platform(&self, raw: &Value) -> Option<i64> {
        timestamp::from_platform(self.config.timestamp_encoding, self.unit, raw)
    }

    // Inbound

    /// Parse a decoded venue payload for `endpoint`
    pub fn parse(&self, endpoint: Endpoint, raw: &Value) -> Result<Parsed> {
        match endpoint {
            Endpoint::ServerTime => {
                if let Some(timestamp) = self.parse_server_time(raw) {
                    return Ok(Parsed::Timestamp(timestamp));
                }
            }
            Endpoint::Symbols => {
                if let Some(symbols) = self.parse_symbols(raw) {
                    return Ok(Parsed::Symbols(symbols));
                }
            }
            _ => {}
        }

        let Some(kind) = endpoint.item_kind() else {
            return Ok(Parsed::Raw(raw.clone()));
        };

        let payload = self.unwrap_envelope(raw);
        match payload {
            Value::Array(elements) => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    if let Some(item) = self.parse_item(endpoint, kind, element)? {
                        items.push(item);
                    }
                }
                Ok(Parsed::Items(items))
            }
            single => Ok(match self.parse_item(endpoint, kind, single)? {
                Some(item) => Parsed::Item(item),
                None => Parsed::Items(Vec::new()),
            }),
        }
    }

    fn unwrap_envelope<'a>(&self, raw: &'a Value) -> &'a Value {
        match &self.config.payload.envelope_key {
            Some(key) => raw.get(key).unwrap_or(raw),
            None => raw,
        }
    }

    fn parse_item(&self, endpoint: Endpoint, kind: ItemKind, raw: &Value) -> Result<Option<Item>> {
        let raw = match self.config.payload.item_keys.get(&endpoint) {
            Some(key) => raw.get(key).unwrap_or(raw),
            None => raw,
        };
        if !raw.is_object() && !raw.is_array() {
            return Ok(None);
        }

        let mut item = self.build_item(kind, raw)?;

        if self.config.payload.direction_from_amount_sign {
            direction_from_amount_sign(&mut item);
        }
        if let (Some(prefix), Some(symbol)) = (&self.config.payload.skip_symbol_prefix, item.symbol()) {
            if symbol.starts_with(prefix.as_str()) {
                debug!(venue = %self.venue(), symbol, "Skipping administrative symbol");
                return Ok(None);
            }
        }
        Ok(Some(item))
    }

    /// Build one item of `kind` from raw venue fields
    ///
    /// Only fields present in `raw` are set. Values that do not fit their field are skipped.
    pub fn build_item(&self, kind: ItemKind, raw: &Value) -> Result<Item> {
        let map = self
            .config
            .field_maps
            .get(&kind)
            .ok_or_else(|| AdapterError::MissingFieldMap {
                venue: self.venue(),
                kind,
            })?;

        let mut item = kind.empty();
        item.identity_mut().venue = Some(self.venue());

        for (field, value) in map.extract(raw) {
            if let Some(nested_kind) = kind.nested_kind(field) {
                if let Value::Array(elements) = value {
                    let nested = elements
                        .iter()
                        .map(|element| self.build_item(nested_kind, element))
                        .collect::<Result<Vec<_>>>()?;
                    item.set_nested(field, nested);
                }
                continue;
            }

            let canonical = if field.is_timestamp() {
                match self.timestamp_from_platform(value) {
                    Some(timestamp) => Value::from(timestamp),
                    None => {
                        debug!(venue = %self.venue(), %field, %value, "Unreadable timestamp");
                        continue;
                    }
                }
            } else {
                self.canonical_value(field, value)
            };

            if let Err(error) = item.set_field(field, &canonical) {
                debug!(venue = %self.venue(), %kind, %error, "Skipping field");
            }
        }
        Ok(item)
    }

    /// Reverse value mapping for enum-typed fields
    fn canonical_value(&self, field: &ParamName, raw: &Value) -> Value {
        let reverse = |values: &HashMap<String, Value>| {
            values
                .iter()
                .filter(|(token, _)| field_accepts(field, token))
                .find(|(_, platform)| same_wire_value(platform, raw))
                .map(|(token, _)| Value::String(token.clone()))
        };
        let is_enum_field = matches!(
            field,
            ParamName::Direction
                | ParamName::OrderType
                | ParamName::OrderStatus
                | ParamName::Interval
                | ParamName::Sorting
        );
        if !is_enum_field {
            return raw.clone();
        }
        self.config
            .values_by_field
            .get(field)
            .and_then(reverse)
            .or_else(|| reverse(&self.config.values))
            .unwrap_or_else(|| raw.clone())
    }

    fn parse_server_time(&self, raw: &Value) -> Option<i64> {
        let value = match &self.config.payload.server_time_key {
            Some(key) => raw.get(key)?,
            None => raw,
        };
        self.timestamp_from_platform(value)
    }

    fn parse_symbols(&self, raw: &Value) -> Option<Vec<String>> {
        match &self.config.payload.symbols {
            SymbolsFormat::Strings => raw.as_array().map(|list| {
                list.iter()
                    .filter_map(|symbol| symbol.as_str().map(str::to_string))
                    .collect()
            }),
            SymbolsFormat::LowercaseStrings => raw.as_array().map(|list| {
                list.iter()
                    .filter_map(|symbol| symbol.as_str().map(str::to_uppercase))
                    .collect()
            }),
            SymbolsFormat::Objects {
                list_key,
                symbol_key,
            } => {
                let list = match list_key {
                    Some(key) => raw.get(key)?,
                    None => raw,
                };
                list.as_array().map(|entries| {
                    entries
                        .iter()
                        .filter_map(|entry| entry.get(symbol_key).and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
            }
        }
    }

    /// Canonical error from a venue error body and HTTP status
    ///
    /// `None` when the status is a success and the body carries no error fields. The venue code
    /// is mapped through the platform code table, then message overrides, then the HTTP status
    /// table; unmapped codes pass through as [`ErrorCode::Native`].
    pub fn parse_error(&self, raw: Option<&Value>, status: Option<u16>) -> Option<ApiError> {
        let errors = &self.config.errors;
        let body = raw.map(|raw| match &errors.envelope_key {
            Some(key) => match raw.get(key) {
                Some(inner) if inner.is_object() || inner.is_array() => inner,
                _ => raw,
            },
            None => raw,
        });

        let mut native_code = None;
        let mut message = None;
        if let Some(body) = body {
            for (field, value) in errors.fields.extract(body) {
                match field {
                    ErrorField::Code => native_code = scalar_text(value),
                    ErrorField::Message => message = scalar_text(value),
                }
            }
        }

        let success = status.is_some_and(|status| (200..300).contains(&status));
        if (success || status.is_none()) && native_code.is_none() && message.is_none() {
            return None;
        }

        let code = native_code
            .as_ref()
            .and_then(|native| errors.code_by_platform_code.get(native).cloned())
            .or_else(|| {
                let message = message.as_deref()?;
                errors
                    .message_overrides
                    .iter()
                    .find(|(pattern, _)| message.contains(pattern.as_str()))
                    .map(|(_, code)| code.clone())
            })
            .or_else(|| status.and_then(|status| errors.code_by_http_status.get(&status).cloned()))
            .or_else(|| native_code.clone().map(ErrorCode::Native))
            .or_else(|| status.map(|status| ErrorCode::Native(status.to_string())))
            .unwrap_or(ErrorCode::AppError);

        let mut details = Vec::new();
        if let Some(status) = status {
            details.push(format!("status: {}", status));
        }
        if let Some(native) = &native_code {
            details.push(format!("code: {}", native));
        }
        if let Some(message) = &message {
            details.push(format!("msg: {}", message));
        }
        Some(ApiError::with_details(code, format!(" ({})", details.join(" "))))
    }
}

fn is_enum_value(value: &ParamValue) -> bool {
    matches!(
        value,
        ParamValue::Sorting(_)
            | ParamValue::Interval(_)
            | ParamValue::Direction(_)
            | ParamValue::OrderType(_)
            | ParamValue::OrderStatus(_)
    )
}

fn field_accepts(field: &ParamName, token: &str) -> bool {
    match field {
        ParamName::Direction => token.parse::<Direction>().is_ok(),
        ParamName::OrderType => token.parse::<OrderType>().is_ok(),
        ParamName::OrderStatus => token.parse::<OrderStatus>().is_ok(),
        ParamName::Interval => token.parse::<Interval>().is_ok(),
        ParamName::Sorting => token.parse::<Sorting>().is_ok(),
        _ => false,
    }
}

fn same_wire_value(platform: &Value, raw: &Value) -> bool {
    platform == raw
        || matches!((scalar_text(platform), scalar_text(raw)), (Some(a), Some(b)) if a == b)
}

/// Text of a scalar JSON value without quotes
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Text form of a wire value for URLs, query strings and signatures
pub fn wire_text(value: &Value) -> String {
    scalar_text(value).unwrap_or_else(|| value.to_string())
}

fn direction_from_amount_sign(item: &mut Item) {
    let trade = match item {
        Item::Trade(trade) => trade,
        Item::MyTrade(my_trade) => &mut my_trade.trade,
        _ => return,
    };
    if let Some(amount) = trade.amount {
        trade.direction = Some(if amount.is_sign_negative() {
            Direction::Sell
        } else {
            Direction::Buy
        });
        trade.amount = Some(amount.abs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_config() -> AdapterConfig {
        AdapterConfig::new(VenueId::Bitfinex, "2", "https://api.example.com/v{version}/")
            .endpoint(Endpoint::Trade, "trades/t{symbol}/hist")
            .endpoint(Endpoint::ServerTime, "time")
            .endpoint(Endpoint::Ping, "ping")
            .param_name(ParamName::Symbol, "")
            .param_name(ParamName::Limit, "limit")
            .param_name(ParamName::Direction, "side")
            .param_name(ParamName::FromItem, "start")
            .param_name(ParamName::ToItem, "end")
            .field_value(ParamName::Direction, Direction::Sell, "S")
            .field_value(ParamName::Direction, Direction::Buy, "B")
            .value(Interval::Min1, "1min")
            .paging(PagingRules {
                key: PagingKey::Timestamp,
                to_item_exclusive: true,
            })
            .server_time_key("serverTime")
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
            .error_fields(FieldMap::positional([
                None,
                Some(ErrorField::Code),
                Some(ErrorField::Message),
            ]))
            .error_code(10020, ErrorCode::WrongLimit)
            .http_error(429, ErrorCode::RateLimit)
    }

    fn converter() -> Converter {
        Converter::new(sample_config(), true)
    }

    #[test]
    fn test_value_map_and_unsupported_names() {
        let mut params = ParamMap::new();
        params.insert(ParamName::Symbol, "BTCUSD".into());
        params.insert(ParamName::Direction, Direction::Sell.into());
        params.insert(ParamName::Limit, 10i64.into());

        let request = converter().to_platform_request(Endpoint::Trade, &params).unwrap();
        assert_eq!(request.path, "trades/tBTCUSD/hist");
        assert_eq!(request.params.get("side"), Some(&json!("S")));
        assert_eq!(request.params.get("limit"), Some(&json!(10)));
        assert!(!request.params.contains_key("symbol"));
    }

    #[test]
    fn test_missing_template_param_is_fatal() {
        let error = converter()
            .to_platform_request(Endpoint::Trade, &ParamMap::new())
            .unwrap_err();
        assert!(matches!(error, AdapterError::MissingTemplateParam { .. }));
        assert!(error.is_configuration());
    }

    #[test]
    fn test_unknown_endpoint_is_fatal() {
        let error = converter()
            .to_platform_request(Endpoint::Candle, &ParamMap::new())
            .unwrap_err();
        assert!(matches!(error, AdapterError::UnsupportedEndpoint { .. }));
    }

    #[test]
    fn test_paging_items_reduce_to_timestamps() {
        let converter = converter();
        let mut from = ItemKind::Trade.empty();
        from.identity_mut().timestamp = Some(1_000);
        let mut to = ItemKind::Trade.empty();
        to.identity_mut().timestamp = Some(2_000);

        let mut params = ParamMap::new();
        params.insert(ParamName::Symbol, "BTCUSD".into());
        params.insert(ParamName::FromItem, from.into());
        params.insert(ParamName::ToItem, to.into());

        let request = converter.to_platform_request(Endpoint::Trade, &params).unwrap();
        assert_eq!(request.params.get("start"), Some(&json!(1_000)));
        assert_eq!(request.params.get("end"), Some(&json!(2_001)));
    }

    #[test]
    fn test_exclusive_boundary_at_latest_timestamp() {
        let converter = converter();
        let mut to = ItemKind::Trade.empty();
        to.identity_mut().timestamp = Some(i64::MAX);

        let mut params = ParamMap::new();
        params.insert(ParamName::Symbol, "BTCUSD".into());
        params.insert(ParamName::ToItem, to.into());

        let request = converter.to_platform_request(Endpoint::Trade, &params).unwrap();
        assert_eq!(request.params.get("end"), Some(&json!(i64::MAX)));
    }

    #[test]
    fn test_dynamic_path() {
        let config = sample_config().endpoint(
            Endpoint::Candle,
            EndpointPath::dynamic(|params: &ParamMap| {
                if params.contains_key(&ParamName::FromTime) {
                    EndpointPath::from("candles/{interval}/hist")
                } else {
                    EndpointPath::from("candles/{interval}/last")
                }
            }),
        );
        let converter = Converter::new(config, true);
        let mut params = ParamMap::new();
        params.insert(ParamName::Interval, Interval::Min1.into());
        assert_eq!(
            converter.resolve_path(Endpoint::Candle, &params).unwrap(),
            "candles/1min/last"
        );
        params.insert(ParamName::FromTime, 5i64.into());
        assert_eq!(
            converter.resolve_path(Endpoint::Candle, &params).unwrap(),
            "candles/1min/hist"
        );
    }

    #[test]
    fn test_parse_positional_trades_with_amount_sign() {
        let raw = json!([
            [305430435, 1539712000123i64, -0.086154, 6760.7],
            [305430436, 1539712000456i64, 0.5, 6761],
            "heartbeat"
        ]);
        let parsed = converter().parse(Endpoint::Trade, &raw).unwrap();
        let items = parsed.items();
        assert_eq!(items.len(), 2);

        let sell = items[0].as_trade().unwrap();
        assert_eq!(sell.identity.venue, Some(VenueId::Bitfinex));
        assert_eq!(sell.identity.item_id.as_deref(), Some("305430435"));
        assert_eq!(sell.identity.timestamp, Some(1_539_712_000_123));
        assert_eq!(sell.direction, Some(Direction::Sell));
        assert_eq!(sell.amount, Some(dec!(0.086154)));
        assert_eq!(items[1].as_trade().unwrap().direction, Some(Direction::Buy));
    }

    #[test]
    fn test_parse_without_item_class_is_raw() {
        let parsed = converter().parse(Endpoint::Ping, &json!({})).unwrap();
        assert_eq!(parsed, Parsed::Raw(json!({})));

        let parsed = converter()
            .parse(Endpoint::ServerTime, &json!({"serverTime": 1499827319559i64}))
            .unwrap();
        assert_eq!(parsed, Parsed::Timestamp(1_499_827_319_559));
    }

    #[test]
    fn test_build_item_without_map_is_fatal() {
        let error = converter().build_item(ItemKind::Candle, &json!([])).unwrap_err();
        assert!(matches!(
            error,
            AdapterError::MissingFieldMap {
                kind: ItemKind::Candle,
                ..
            }
        ));
    }

    #[test]
    fn test_parse_error_classification() {
        let converter = converter();
        assert_eq!(converter.parse_error(None, Some(200)), None);

        let throttled = converter.parse_error(None, Some(429)).unwrap();
        assert_eq!(throttled.code, ErrorCode::RateLimit);

        let body = json!(["error", 10020, "limit: invalid"]);
        let mapped = converter.parse_error(Some(&body), Some(429)).unwrap();
        assert_eq!(mapped.code, ErrorCode::WrongLimit);
        assert!(mapped.message.starts_with("Wrong limit."));
        assert!(mapped.message.contains("limit: invalid"));

        let unknown = json!(["error", 20060, "maintenance"]);
        let native = converter.parse_error(Some(&unknown), Some(500)).unwrap();
        assert_eq!(native.code, ErrorCode::Native("20060".to_string()));
    }
}
