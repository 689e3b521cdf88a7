//! Adapter configuration schema
//!
//! An [`AdapterConfig`] is everything the [`Converter`](super::Converter) knows about one venue
//! API version. It is plain data, assembled once with the builder methods below and never
//! mutated afterwards.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use types::{Endpoint, ErrorCode, ItemKind, ParamMap, ParamName, Sorting, VenueId};

use super::timestamp::TimestampEncoding;

/// Where an endpoint lives on the venue
#[derive(Clone)]
pub enum EndpointPath {
    /// Fixed path or channel name
    Literal(String),
    /// Path with `{param}` placeholders filled from the call's parameters
    Template(String),
    /// Path chosen from the call's parameters
    Dynamic(Arc<dyn Fn(&ParamMap) -> EndpointPath + Send + Sync>),
}

impl EndpointPath {
    pub fn dynamic<F>(f: F) -> Self
    where
        F: Fn(&ParamMap) -> EndpointPath + Send + Sync + 'static,
    {
        EndpointPath::Dynamic(Arc::new(f))
    }
}

impl fmt::Debug for EndpointPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointPath::Literal(path) => f.debug_tuple("Literal").field(path).finish(),
            EndpointPath::Template(template) => f.debug_tuple("Template").field(template).finish(),
            EndpointPath::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

impl From<&str> for EndpointPath {
    fn from(path: &str) -> Self {
        if path.contains('{') {
            EndpointPath::Template(path.to_string())
        } else {
            EndpointPath::Literal(path.to_string())
        }
    }
}

/// Venue field locations for one item class
///
/// Keyed maps read JSON objects, positional maps read JSON arrays. Several keys may target the
/// same canonical field; the last one present wins.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldMap<T = ParamName> {
    Keyed(Vec<(String, T)>),
    Positional(Vec<Option<T>>),
}

impl<T> FieldMap<T> {
    pub fn keyed<K: Into<String>>(entries: impl IntoIterator<Item = (K, T)>) -> Self {
        FieldMap::Keyed(entries.into_iter().map(|(key, field)| (key.into(), field)).collect())
    }

    pub fn positional(entries: impl IntoIterator<Item = Option<T>>) -> Self {
        FieldMap::Positional(entries.into_iter().collect())
    }

    /// Raw values present in `raw` for each mapped field
    pub fn extract<'a>(&'a self, raw: &'a Value) -> Vec<(&'a T, &'a Value)> {
        match (self, raw) {
            (FieldMap::Keyed(entries), Value::Object(object)) => entries
                .iter()
                .filter_map(|(key, field)| object.get(key).map(|value| (field, value)))
                .collect(),
            (FieldMap::Positional(entries), Value::Array(values)) => entries
                .iter()
                .zip(values)
                .filter_map(|(field, value)| field.as_ref().map(|field| (field, value)))
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// Parts of a venue error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorField {
    Code,
    Message,
}

/// How venue error bodies look and how their codes map to [`ErrorCode`]
#[derive(Debug, Clone)]
pub struct ErrorFormat {
    pub fields: FieldMap<ErrorField>,
    /// Key the error object is nested under, if any
    pub envelope_key: Option<String>,
    /// Message substrings that decide the code on their own
    pub message_overrides: Vec<(String, ErrorCode)>,
    pub code_by_platform_code: HashMap<String, ErrorCode>,
    pub code_by_http_status: HashMap<u16, ErrorCode>,
}

impl Default for ErrorFormat {
    fn default() -> Self {
        Self {
            fields: FieldMap::keyed([("code", ErrorField::Code), ("message", ErrorField::Message)]),
            envelope_key: None,
            message_overrides: Vec::new(),
            code_by_platform_code: HashMap::new(),
            code_by_http_status: HashMap::new(),
        }
    }
}

/// Sorting support of paged endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortingRules {
    /// Whether the venue accepts a sorting parameter at all
    pub enabled: bool,
    /// Sorting requested when the caller gives none
    pub default: Sorting,
    /// Order the venue returns when no sorting is sent
    pub natural: Sorting,
}

impl Default for SortingRules {
    fn default() -> Self {
        Self {
            enabled: false,
            default: Sorting::Descending,
            natural: Sorting::Ascending,
        }
    }
}

/// Item attribute a venue pages by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PagingKey {
    #[default]
    ItemId,
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PagingRules {
    pub key: PagingKey,
    /// The venue treats `to_item` as exclusive; one timestamp unit is added to include it
    pub to_item_exclusive: bool,
}

/// Shape of the venue's symbol-list payload
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SymbolsFormat {
    /// `["BTCUSD", ...]`
    #[default]
    Strings,
    /// `["btcusd", ...]`, upper-cased on parse
    LowercaseStrings,
    /// `{"<list_key>": [{"<symbol_key>": "BTCUSD"}, ...]}`, or a bare list without `list_key`
    Objects {
        list_key: Option<String>,
        symbol_key: String,
    },
}

/// Payload unwrapping and item post-processing rules
#[derive(Debug, Clone, Default)]
pub struct PayloadShape {
    /// Wrapper key around the actual payload (`data`)
    pub envelope_key: Option<String>,
    /// Per-endpoint key holding the item inside each element
    pub item_keys: HashMap<Endpoint, String>,
    /// Items whose symbol starts with this prefix are dropped
    pub skip_symbol_prefix: Option<String>,
    /// Trade direction is the sign of the amount; amounts become absolute
    pub direction_from_amount_sign: bool,
    /// Field of the server-time payload holding the timestamp
    pub server_time_key: Option<String>,
    pub symbols: SymbolsFormat,
}

/// HMAC digest used to sign secured requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureDigest {
    #[default]
    Sha256,
    Sha384,
}

/// Complete description of one venue API version
#[derive(Debug, Clone)]
pub struct AdapterConfig {
    pub venue: VenueId,
    pub version: String,
    /// Root URL; `{version}` is replaced by [`AdapterConfig::version`]
    pub base_url: String,
    pub endpoints: HashMap<Endpoint, EndpointPath>,
    /// `None` marks a canonical name the venue does not support; absent names pass unchanged
    pub param_names: HashMap<ParamName, Option<String>>,
    /// Canonical token to venue value, for any field
    pub values: HashMap<String, Value>,
    /// Canonical token to venue value, per field; consulted before [`AdapterConfig::values`]
    pub values_by_field: HashMap<ParamName, HashMap<String, Value>>,
    pub field_maps: HashMap<ItemKind, FieldMap>,
    pub max_limit_by_endpoint: HashMap<Endpoint, i64>,
    pub secured_endpoints: HashSet<Endpoint>,
    pub digest: SignatureDigest,
    pub timestamp_encoding: TimestampEncoding,
    pub sorting: SortingRules,
    pub paging: PagingRules,
    /// Paged variant of an endpoint, where the venue has a separate one
    pub history_endpoints: HashMap<Endpoint, Endpoint>,
    pub payload: PayloadShape,
    pub errors: ErrorFormat,
}

impl AdapterConfig {
    pub fn new(venue: VenueId, version: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            venue,
            version: version.into(),
            base_url: base_url.into(),
            endpoints: HashMap::new(),
            param_names: HashMap::new(),
            values: HashMap::new(),
            values_by_field: HashMap::new(),
            field_maps: HashMap::new(),
            max_limit_by_endpoint: HashMap::new(),
            secured_endpoints: [
                Endpoint::Account,
                Endpoint::TradeMy,
                Endpoint::Order,
                Endpoint::OrderTest,
                Endpoint::OrderMy,
                Endpoint::OrderCurrent,
            ]
            .into_iter()
            .collect(),
            digest: SignatureDigest::default(),
            timestamp_encoding: TimestampEncoding::default(),
            sorting: SortingRules::default(),
            paging: PagingRules::default(),
            history_endpoints: HashMap::new(),
            payload: PayloadShape::default(),
            errors: ErrorFormat::default(),
        }
    }

    /// Base URL with the version filled in
    pub fn resolved_base_url(&self) -> String {
        self.base_url.replace("{version}", &self.version)
    }

    pub fn endpoint(mut self, endpoint: Endpoint, path: impl Into<EndpointPath>) -> Self {
        self.endpoints.insert(endpoint, path.into());
        self
    }

    /// Rename a canonical parameter; an empty name marks it unsupported
    pub fn param_name(mut self, name: ParamName, platform: &str) -> Self {
        let platform = (!platform.is_empty()).then(|| platform.to_string());
        self.param_names.insert(name, platform);
        self
    }

    pub fn unsupported(mut self, name: ParamName) -> Self {
        self.param_names.insert(name, None);
        self
    }

    pub fn value(mut self, token: impl fmt::Display, platform: impl Into<Value>) -> Self {
        self.values.insert(token.to_string(), platform.into());
        self
    }

    pub fn field_value(
        mut self,
        name: ParamName,
        token: impl fmt::Display,
        platform: impl Into<Value>,
    ) -> Self {
        self.values_by_field
            .entry(name)
            .or_default()
            .insert(token.to_string(), platform.into());
        self
    }

    pub fn fields(mut self, kind: ItemKind, map: FieldMap) -> Self {
        self.field_maps.insert(kind, map);
        self
    }

    pub fn max_limit(mut self, endpoint: Endpoint, limit: i64) -> Self {
        self.max_limit_by_endpoint.insert(endpoint, limit);
        self
    }

    pub fn timestamps(mut self, encoding: TimestampEncoding) -> Self {
        self.timestamp_encoding = encoding;
        self
    }

    pub fn sorting(mut self, rules: SortingRules) -> Self {
        self.sorting = rules;
        self
    }

    pub fn paging(mut self, rules: PagingRules) -> Self {
        self.paging = rules;
        self
    }

    pub fn history(mut self, endpoint: Endpoint, history: Endpoint) -> Self {
        self.history_endpoints.insert(endpoint, history);
        self
    }

    pub fn envelope(mut self, key: &str) -> Self {
        self.payload.envelope_key = Some(key.to_string());
        self
    }

    pub fn item_key(mut self, endpoint: Endpoint, key: &str) -> Self {
        self.payload.item_keys.insert(endpoint, key.to_string());
        self
    }

    pub fn skip_symbol_prefix(mut self, prefix: &str) -> Self {
        self.payload.skip_symbol_prefix = Some(prefix.to_string());
        self
    }

    pub fn direction_from_amount_sign(mut self) -> Self {
        self.payload.direction_from_amount_sign = true;
        self
    }

    pub fn server_time_key(mut self, key: &str) -> Self {
        self.payload.server_time_key = Some(key.to_string());
        self
    }

    pub fn symbols_format(mut self, format: SymbolsFormat) -> Self {
        self.payload.symbols = format;
        self
    }

    pub fn digest(mut self, digest: SignatureDigest) -> Self {
        self.digest = digest;
        self
    }

    pub fn error_fields(mut self, fields: FieldMap<ErrorField>) -> Self {
        self.errors.fields = fields;
        self
    }

    pub fn error_envelope(mut self, key: &str) -> Self {
        self.errors.envelope_key = Some(key.to_string());
        self
    }

    pub fn error_message(mut self, pattern: &str, code: ErrorCode) -> Self {
        self.errors.message_overrides.push((pattern.to_string(), code));
        self
    }

    pub fn error_code(mut self, platform_code: impl fmt::Display, code: ErrorCode) -> Self {
        self.errors
            .code_by_platform_code
            .insert(platform_code.to_string(), code);
        self
    }

    pub fn http_error(mut self, status: u16, code: ErrorCode) -> Self {
        self.errors.code_by_http_status.insert(status, code);
        self
    }

    pub fn is_secured(&self, endpoint: Endpoint) -> bool {
        self.secured_endpoints.contains(&endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_kind_from_text() {
        assert!(matches!(EndpointPath::from("trades"), EndpointPath::Literal(_)));
        assert!(matches!(
            EndpointPath::from("trades/t{symbol}/hist"),
            EndpointPath::Template(_)
        ));
    }

    #[test]
    fn test_field_map_extracts_present_fields_only() {
        let keyed = FieldMap::keyed([("p", ParamName::Price), ("q", ParamName::Amount)]);
        let raw = json!({"p": "1.5", "x": 1});
        let found = keyed.extract(&raw);
        assert_eq!(found, vec![(&ParamName::Price, &json!("1.5"))]);
        assert!(keyed.extract(&json!(["1.5"])).is_empty());

        let positional = FieldMap::positional([Some(ParamName::ItemId), None, Some(ParamName::Price)]);
        let value = json!([7, "skip"]);
        let found = positional.extract(&value);
        assert_eq!(found, vec![(&ParamName::ItemId, &json!(7))]);
    }

    #[test]
    fn test_builder_marks_unsupported_names() {
        let config = AdapterConfig::new(VenueId::Binance, "3", "https://api.binance.com/api/v{version}/")
            .param_name(ParamName::Limit, "count")
            .param_name(ParamName::ToItem, "")
            .unsupported(ParamName::Sorting);
        assert_eq!(config.param_names[&ParamName::Limit].as_deref(), Some("count"));
        assert_eq!(config.param_names[&ParamName::ToItem], None);
        assert_eq!(config.param_names[&ParamName::Sorting], None);
        assert_eq!(config.resolved_base_url(), "https://api.binance.com/api/v3/");
        assert!(config.is_secured(Endpoint::OrderTest));
        assert!(!config.is_secured(Endpoint::Trade));
    }
}
