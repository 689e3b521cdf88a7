//! Venue REST client
//!
//! One [`RestClient`] talks to one venue. Every operation is a single awaited HTTP round trip
//! through the pipeline in [`super::RestConverter`]; venue failures come back as
//! [`Parsed::Error`] values and feed the client's cool-down.

use parking_lot::Mutex;
use reqwest::header::{ACCEPT, RETRY_AFTER};
use reqwest::{Method, Response};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use types::{
    ApiError, Decimal, Direction, Endpoint, ErrorCode, Interval, Item, OrderType, ParamMap,
    ParamName, ParamValue, Sorting, VenueId,
};

use super::{RestConverter, Signed};
use crate::config::{Credentials, RestClientConfig};
use crate::engine::Parsed;
use crate::rate_limit::{Cooldown, RateLimitTracker, RateLimiter};
use crate::venues::{self, RestProfile};
use crate::{AdapterError, Result};

/// Paging window of a history request
#[derive(Debug, Clone, Default)]
pub struct HistoryQuery {
    pub symbol: String,
    pub limit: Option<i64>,
    /// Item or scalar; the first item of the page
    pub from_item: Option<ParamValue>,
    /// Item or scalar; the last item of the page
    pub to_item: Option<ParamValue>,
    pub from_time: Option<i64>,
    pub to_time: Option<i64>,
    pub sorting: Option<Sorting>,
    pub use_max_limit: Option<bool>,
}

impl HistoryQuery {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn from_item(mut self, boundary: impl Into<ParamValue>) -> Self {
        self.from_item = Some(boundary.into());
        self
    }

    pub fn to_item(mut self, boundary: impl Into<ParamValue>) -> Self {
        self.to_item = Some(boundary.into());
        self
    }

    pub fn between(mut self, from_time: i64, to_time: i64) -> Self {
        self.from_time = Some(from_time);
        self.to_time = Some(to_time);
        self
    }

    pub fn sorting(mut self, sorting: Sorting) -> Self {
        self.sorting = Some(sorting);
        self
    }

    pub fn use_max_limit(mut self, use_max_limit: bool) -> Self {
        self.use_max_limit = Some(use_max_limit);
        self
    }

    fn into_params(self) -> ParamMap {
        let mut params = ParamMap::new();
        params.insert(ParamName::Symbol, self.symbol.into());
        insert_opt(&mut params, ParamName::Limit, self.limit);
        insert_opt(&mut params, ParamName::FromItem, self.from_item);
        insert_opt(&mut params, ParamName::ToItem, self.to_item);
        insert_opt(&mut params, ParamName::FromTime, self.from_time);
        insert_opt(&mut params, ParamName::ToTime, self.to_time);
        insert_opt(&mut params, ParamName::Sorting, self.sorting);
        insert_opt(&mut params, ParamName::IsUseMaxLimit, self.use_max_limit);
        params
    }
}

/// Window of a candle request
#[derive(Debug, Clone, Default)]
pub struct CandleQuery {
    pub limit: Option<i64>,
    pub from_time: Option<i64>,
    pub to_time: Option<i64>,
    pub use_max_limit: Option<bool>,
}

/// New order
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub order_type: OrderType,
    pub direction: Direction,
    /// Sent for limit orders only
    pub price: Option<Decimal>,
    pub amount: Decimal,
    /// Validate on the venue without placing the order
    pub is_test: bool,
}

/// An existing order, by id or as a previously parsed item
#[derive(Debug, Clone)]
pub enum OrderRef {
    Id(String),
    Item(Box<Item>),
}

impl OrderRef {
    fn id(&self) -> Option<&str> {
        match self {
            OrderRef::Id(id) => Some(id),
            OrderRef::Item(item) => item.item_id(),
        }
    }

    fn symbol(&self) -> Option<&str> {
        match self {
            OrderRef::Id(_) => None,
            OrderRef::Item(item) => item.symbol(),
        }
    }
}

impl From<&str> for OrderRef {
    fn from(id: &str) -> Self {
        OrderRef::Id(id.to_string())
    }
}

impl From<String> for OrderRef {
    fn from(id: String) -> Self {
        OrderRef::Id(id)
    }
}

impl From<Item> for OrderRef {
    fn from(item: Item) -> Self {
        OrderRef::Item(Box::new(item))
    }
}

/// REST client for one venue
pub struct RestClient {
    venue: VenueId,
    http: reqwest::Client,
    converters: HashMap<String, RestConverter>,
    profile: RestProfile,
    credentials: Option<Credentials>,
    limiter: RateLimiter,
    cooldown: Cooldown,
    tracker: Arc<RateLimitTracker>,
    /// Server clock minus local clock, in milliseconds
    server_time_offset: Mutex<Option<i64>>,
}

impl RestClient {
    /// Client for a venue with its bundled adapter configuration
    pub fn for_venue(
        venue: VenueId,
        settings: RestClientConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        let profile = venues::rest_profile(venue).ok_or(AdapterError::UnsupportedVenue {
            venue,
            transport: "REST",
        })?;
        Self::new(profile, settings, credentials)
    }

    pub fn new(
        mut profile: RestProfile,
        settings: RestClientConfig,
        credentials: Option<Credentials>,
    ) -> Result<Self> {
        settings.validate().map_err(AdapterError::Configuration)?;

        let venue = profile.venue;
        let converters: HashMap<String, RestConverter> = profile
            .adapters
            .drain(..)
            .map(|config| (config.version.clone(), RestConverter::new(config, &settings)))
            .collect();
        if !converters.contains_key(&profile.default_version) {
            return Err(AdapterError::UnknownVersion {
                venue,
                version: profile.default_version.clone(),
            });
        }

        let http = reqwest::Client::builder()
            .user_agent(settings.user_agent.as_str())
            .build()?;

        let mut limiter = RateLimiter::new();
        if let Some(requests_per_minute) = settings.requests_per_minute {
            limiter.configure_venue(venue, requests_per_minute);
        }

        Ok(Self {
            venue,
            http,
            converters,
            cooldown: Cooldown::new(profile.cooldown.clone()),
            profile,
            credentials,
            limiter,
            tracker: Arc::new(RateLimitTracker::new()),
            server_time_offset: Mutex::new(None),
        })
    }

    /// Share a tracker between several clients
    pub fn with_tracker(mut self, tracker: Arc<RateLimitTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    pub fn venue(&self) -> VenueId {
        self.venue
    }

    pub fn tracker(&self) -> &Arc<RateLimitTracker> {
        &self.tracker
    }

    /// Time left in the venue-imposed quiet period
    pub fn cooldown_remaining(&self) -> Duration {
        self.cooldown.remaining()
    }

    /// Converter serving `endpoint`, by explicit version, per-endpoint version or default
    pub fn converter(&self, endpoint: Endpoint, version: Option<&str>) -> Result<&RestConverter> {
        let version = version
            .or_else(|| self.profile.version_by_endpoint.get(&endpoint).map(String::as_str))
            .unwrap_or(&self.profile.default_version);
        self.converters
            .get(version)
            .ok_or_else(|| AdapterError::UnknownVersion {
                venue: self.venue,
                version: version.to_string(),
            })
    }

    /// Run the full pipeline for one call
    pub async fn send(
        &self,
        method: Method,
        endpoint: Endpoint,
        mut params: ParamMap,
        version: Option<&str>,
    ) -> Result<Parsed> {
        let converter = self.converter(endpoint, version)?;

        if self.profile.stamp_secured_requests && converter.engine().config().is_secured(endpoint) {
            match self.server_timestamp(false).await? {
                Parsed::Timestamp(timestamp) => {
                    params.insert(ParamName::Timestamp, timestamp.into());
                }
                Parsed::Error(error) => return Ok(Parsed::Error(error)),
                _ => {
                    params.insert(ParamName::Timestamp, converter.engine().unit().now().into());
                }
            }
        }

        self.execute(converter, method, endpoint, params).await
    }

    async fn execute(
        &self,
        converter: &RestConverter,
        method: Method,
        endpoint: Endpoint,
        params: ParamMap,
    ) -> Result<Parsed> {
        let params = converter.preprocess(endpoint, params);
        let request = converter.engine().to_platform_request(endpoint, &params)?;
        let url = converter.url(&request.path);
        let pairs = match converter.sign(endpoint, request.params, self.credentials.as_ref())? {
            Signed::Pairs(pairs) => pairs,
            Signed::Refused(error) => return Ok(Parsed::Error(error)),
        };

        self.limiter.wait(self.venue).await;
        debug!(venue = %self.venue, %endpoint, %method, %url, "Sending request");

        let mut builder = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");
        if let (Some(header), Some(credentials)) = (&self.profile.api_key_header, &self.credentials) {
            builder = builder.header(header.as_str(), credentials.api_key.as_str());
        }
        builder = if method == Method::GET {
            builder.query(&pairs)
        } else {
            builder.form(&pairs)
        };

        let (parsed, retry_after) = match builder.send().await {
            Ok(response) => {
                let retry_after = retry_after(&response);
                (self.read_response(converter, endpoint, &params, response).await?, retry_after)
            }
            Err(error) => {
                warn!(venue = %self.venue, %endpoint, %error, "Request failed");
                let error = ApiError::with_details(ErrorCode::AppError, format!(" (transport: {})", error));
                (Parsed::Error(error), None)
            }
        };

        let code = parsed.error().map(|error| &error.code);
        let delay = self.cooldown.on_response(code, retry_after);
        if !delay.is_zero() {
            warn!(venue = %self.venue, ?delay, "Venue throttled us, cooling down");
        }
        self.tracker
            .record_request(self.venue, code.is_some_and(ErrorCode::is_throttling));

        Ok(parsed)
    }

    async fn read_response(
        &self,
        converter: &RestConverter,
        endpoint: Endpoint,
        params: &ParamMap,
        response: Response,
    ) -> Result<Parsed> {
        let status = response.status();
        let body: Option<Value> = match response.bytes().await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(error) => {
                warn!(venue = %self.venue, %endpoint, %error, "Failed to read response body");
                None
            }
        };
        debug!(venue = %self.venue, %endpoint, status = status.as_u16(), "Received response");

        let engine = converter.engine();
        if !status.is_success() {
            let error = engine
                .parse_error(body.as_ref(), Some(status.as_u16()))
                .unwrap_or_else(|| ApiError::with_details(ErrorCode::AppError, format!(" (status: {})", status)));
            return Ok(Parsed::Error(error));
        }

        let Some(body) = body else {
            return Ok(Parsed::Error(ApiError::with_details(
                ErrorCode::AppError,
                " (response body is not JSON)",
            )));
        };
        // Some venues report errors with a success status
        if body.is_object() {
            if let Some(error) = engine.parse_error(Some(&body), Some(status.as_u16())) {
                return Ok(Parsed::Error(error));
            }
        }
        let parsed = engine.parse(endpoint, &body)?;
        Ok(converter.postprocess(params, parsed))
    }

    // Operations

    pub async fn ping(&self) -> Result<Parsed> {
        self.send(Method::GET, Endpoint::Ping, ParamMap::new(), None).await
    }

    /// Venue clock in the client's unit
    ///
    /// The offset to the local clock is cached; `force` asks the venue again.
    pub async fn server_timestamp(&self, force: bool) -> Result<Parsed> {
        let converter = self.converter(Endpoint::ServerTime, None)?;
        let unit = converter.engine().unit();

        if !force {
            if let Some(offset) = *self.server_time_offset.lock() {
                let local = unit.to_millis(unit.now());
                return Ok(Parsed::Timestamp(unit.from_millis(local + offset)));
            }
        }

        let local = unit.to_millis(unit.now());
        let parsed = self
            .execute(converter, Method::GET, Endpoint::ServerTime, ParamMap::new())
            .await?;
        if let Parsed::Timestamp(server) = parsed {
            *self.server_time_offset.lock() = Some(unit.to_millis(server) - local);
        }
        Ok(parsed)
    }

    pub async fn symbols(&self) -> Result<Parsed> {
        self.send(Method::GET, Endpoint::Symbols, ParamMap::new(), None).await
    }

    /// Most recent trades
    pub async fn fetch_trades(&self, symbol: &str, limit: Option<i64>) -> Result<Parsed> {
        let mut params = symbol_params(symbol);
        insert_opt(&mut params, ParamName::Limit, limit);
        self.send(Method::GET, Endpoint::Trade, params, None).await
    }

    /// One page of a paged endpoint
    ///
    /// Passing the first or last item of the previous page as the boundary continues without
    /// gaps; at most the boundary item itself is repeated.
    pub async fn fetch_history(&self, endpoint: Endpoint, query: HistoryQuery) -> Result<Parsed> {
        let endpoint = self
            .converter(endpoint, None)?
            .engine()
            .config()
            .history_endpoints
            .get(&endpoint)
            .copied()
            .unwrap_or(endpoint);
        self.send(Method::GET, endpoint, query.into_params(), None).await
    }

    pub async fn fetch_trades_history(&self, query: HistoryQuery) -> Result<Parsed> {
        self.fetch_history(Endpoint::Trade, query).await
    }

    pub async fn fetch_candles(
        &self,
        symbol: &str,
        interval: Interval,
        query: CandleQuery,
    ) -> Result<Parsed> {
        let mut params = symbol_params(symbol);
        params.insert(ParamName::Interval, interval.into());
        insert_opt(&mut params, ParamName::Limit, query.limit);
        insert_opt(&mut params, ParamName::FromTime, query.from_time);
        insert_opt(&mut params, ParamName::ToTime, query.to_time);
        insert_opt(&mut params, ParamName::IsUseMaxLimit, query.use_max_limit);
        self.send(Method::GET, Endpoint::Candle, params, None).await
    }

    pub async fn fetch_ticker(&self, symbol: Option<&str>) -> Result<Parsed> {
        let params = symbol.map(symbol_params).unwrap_or_default();
        self.send(Method::GET, Endpoint::Ticker, params, None).await
    }

    /// All tickers, optionally only those of `symbols` (compared upper-cased)
    pub async fn fetch_tickers(&self, symbols: Option<&[&str]>) -> Result<Parsed> {
        let parsed = self
            .send(Method::GET, Endpoint::TickerAll, ParamMap::new(), None)
            .await?;
        let Some(symbols) = symbols else {
            return Ok(parsed);
        };
        let wanted: Vec<String> = symbols.iter().map(|s| s.to_uppercase()).collect();
        Ok(match parsed {
            Parsed::Items(items) => Parsed::Items(
                items
                    .into_iter()
                    .filter(|item| item.symbol().is_some_and(|s| wanted.contains(&s.to_uppercase())))
                    .collect(),
            ),
            other => other,
        })
    }

    pub async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<i64>,
        use_max_limit: Option<bool>,
    ) -> Result<Parsed> {
        let mut params = symbol_params(symbol);
        insert_opt(&mut params, ParamName::Limit, limit);
        insert_opt(&mut params, ParamName::IsUseMaxLimit, use_max_limit);
        self.send(Method::GET, Endpoint::OrderBook, params, None).await
    }

    pub async fn fetch_account_info(&self) -> Result<Parsed> {
        self.send(Method::GET, Endpoint::Account, ParamMap::new(), None).await
    }

    pub async fn fetch_my_trades(&self, symbol: &str, limit: Option<i64>) -> Result<Parsed> {
        let mut params = symbol_params(symbol);
        insert_opt(&mut params, ParamName::Limit, limit);
        self.send(Method::GET, Endpoint::TradeMy, params, None).await
    }

    pub async fn create_order(&self, order: &OrderRequest) -> Result<Parsed> {
        let mut params = symbol_params(&order.symbol);
        params.insert(ParamName::OrderType, order.order_type.into());
        params.insert(ParamName::Direction, order.direction.into());
        params.insert(ParamName::Amount, order.amount.into());
        if order.order_type == OrderType::Limit {
            insert_opt(&mut params, ParamName::Price, order.price);
            for (name, value) in &self.profile.limit_order_params {
                params.insert(name.clone(), value.clone());
            }
        }
        let endpoint = if order.is_test {
            Endpoint::OrderTest
        } else {
            Endpoint::Order
        };
        self.send(Method::POST, endpoint, params, None).await
    }

    pub async fn cancel_order(
        &self,
        order: impl Into<OrderRef>,
        symbol: Option<&str>,
    ) -> Result<Parsed> {
        let params = order_params(&order.into(), symbol);
        self.send(Method::DELETE, Endpoint::Order, params, None).await
    }

    pub async fn check_order(
        &self,
        order: impl Into<OrderRef>,
        symbol: Option<&str>,
    ) -> Result<Parsed> {
        let params = order_params(&order.into(), symbol);
        self.send(Method::GET, Endpoint::Order, params, None).await
    }

    /// Open orders when `is_open`, otherwise the order history
    pub async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        limit: Option<i64>,
        from_item: Option<ParamValue>,
        is_open: bool,
    ) -> Result<Parsed> {
        let mut params = symbol.map(symbol_params).unwrap_or_default();
        insert_opt(&mut params, ParamName::Limit, limit);
        insert_opt(&mut params, ParamName::FromItem, from_item);
        let endpoint = if is_open {
            Endpoint::OrderCurrent
        } else {
            Endpoint::OrderMy
        };
        self.send(Method::GET, endpoint, params, None).await
    }
}

fn symbol_params(symbol: &str) -> ParamMap {
    let mut params = ParamMap::new();
    params.insert(ParamName::Symbol, symbol.into());
    params
}

fn order_params(order: &OrderRef, symbol: Option<&str>) -> ParamMap {
    let mut params = order
        .symbol()
        .or(symbol)
        .map(symbol_params)
        .unwrap_or_default();
    if let Some(id) = order.id() {
        params.insert(ParamName::OrderId, id.into());
    }
    params
}

fn insert_opt<V: Into<ParamValue>>(params: &mut ParamMap, name: ParamName, value: Option<V>) {
    if let Some(value) = value {
        params.insert(name, value.into());
    }
}

fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
