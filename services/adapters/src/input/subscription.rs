//! Subscription algebra
//!
//! [`Subscriptions`] owns the six subscription sets of a session and turns
//! `(endpoints, symbols, params)` requests into [`SubscriptionKey`]s. It does no I/O; the
//! session driver decides whether changes travel as command frames or as a reconnect.

use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use types::{Endpoint, ParamMap, ParamName};
use url::Url;

use super::schema::{CommandFormat, UrlFormat, WsSchema};
use crate::engine::Converter;
use crate::{AdapterError, Result};

/// One venue channel: endpoint and symbol resolved to the venue's channel name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    pub endpoint: Endpoint,
    /// Canonical symbol, `None` for generic endpoints
    pub symbol: Option<String>,
    pub channel: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionSets {
    /// Endpoints the caller asked for
    pub endpoints: BTreeSet<Endpoint>,
    /// Symbols the caller asked for
    pub symbols: BTreeSet<String>,
    /// Channels that should be active
    pub current: BTreeSet<SubscriptionKey>,
    /// Current channels not yet delivered to the venue
    pub pending: BTreeSet<SubscriptionKey>,
    /// Current channels delivered on the live connection
    pub successful: BTreeSet<SubscriptionKey>,
    /// Current channels whose delivery failed
    pub failed: BTreeSet<SubscriptionKey>,
}

/// Keys dropped by an unsubscribe
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Removed {
    pub keys: Vec<SubscriptionKey>,
    /// The subset that was delivered on the live connection
    pub active: Vec<SubscriptionKey>,
}

pub struct Subscriptions {
    converter: Converter,
    schema: Arc<WsSchema>,
    sets: SubscriptionSets,
}

impl Subscriptions {
    pub fn new(converter: Converter, schema: Arc<WsSchema>) -> Self {
        Self {
            converter,
            schema,
            sets: SubscriptionSets::default(),
        }
    }

    pub fn sets(&self) -> &SubscriptionSets {
        &self.sets
    }

    pub fn current(&self) -> &BTreeSet<SubscriptionKey> {
        &self.sets.current
    }

    /// Add channels; returns the keys that were not current before
    ///
    /// `None` endpoints means everything requested so far, or everything supported when
    /// nothing was requested. `None` symbols means the requested symbols. Symbol endpoints
    /// without any symbol are skipped.
    pub fn subscribe(
        &mut self,
        endpoints: Option<&[Endpoint]>,
        symbols: Option<&[String]>,
        params: &ParamMap,
    ) -> Result<Vec<SubscriptionKey>> {
        let endpoint_list: Vec<Endpoint> = match endpoints {
            Some(given) => given
                .iter()
                .copied()
                .filter(|endpoint| self.schema.supports(*endpoint))
                .collect(),
            None if !self.sets.endpoints.is_empty() => self.sets.endpoints.iter().copied().collect(),
            None => self.schema.supported_endpoints.clone(),
        };
        let symbol_list: Vec<String> = match symbols {
            Some(given) => given.to_vec(),
            None => self.sets.symbols.iter().cloned().collect(),
        };

        let keys = self.generate(&endpoint_list, &symbol_list, params)?;

        if endpoints.is_some() {
            self.sets.endpoints.extend(endpoint_list.iter().copied());
        }
        if symbols.is_some() {
            self.sets.symbols.extend(symbol_list);
        }

        let added: Vec<SubscriptionKey> = keys
            .into_iter()
            .filter(|key| !self.sets.current.contains(key))
            .collect();
        for key in &added {
            self.sets.current.insert(key.clone());
            self.sets.pending.insert(key.clone());
            self.sets.failed.remove(key);
        }
        Ok(added)
    }

    /// Remove channels
    ///
    /// Both `None` clears every set. Otherwise a `None` dimension matches any requested value;
    /// generic channels are only removed when their endpoint is named.
    pub fn unsubscribe(&mut self, endpoints: Option<&[Endpoint]>, symbols: Option<&[String]>) -> Removed {
        if endpoints.is_none() && symbols.is_none() {
            let sets = std::mem::take(&mut self.sets);
            let active = sets.successful.iter().cloned().collect();
            return Removed {
                keys: sets.current.into_iter().collect(),
                active,
            };
        }

        if let Some(given) = endpoints {
            for endpoint in given {
                self.sets.endpoints.remove(endpoint);
            }
        }
        if let Some(given) = symbols {
            for symbol in given {
                self.sets.symbols.remove(symbol);
            }
        }

        let matches = |key: &SubscriptionKey| {
            let endpoint_ok = endpoints.map_or(true, |given| given.contains(&key.endpoint));
            let symbol_ok = match (&key.symbol, symbols) {
                (None, Some(_)) => endpoints.is_some(),
                (Some(symbol), Some(given)) => given.contains(symbol),
                (_, None) => true,
            };
            endpoint_ok && symbol_ok
        };

        let keys: Vec<SubscriptionKey> = self.sets.current.iter().filter(|key| matches(key)).cloned().collect();
        let mut active = Vec::new();
        for key in &keys {
            self.sets.current.remove(key);
            self.sets.pending.remove(key);
            self.sets.failed.remove(key);
            if self.sets.successful.remove(key) {
                active.push(key.clone());
            }
        }
        Removed { keys, active }
    }

    /// Expand endpoints × symbols into keys
    pub fn generate(
        &self,
        endpoints: &[Endpoint],
        symbols: &[String],
        params: &ParamMap,
    ) -> Result<BTreeSet<SubscriptionKey>> {
        let mut keys = BTreeSet::new();
        for &endpoint in endpoints {
            if self.schema.is_symbol_endpoint(endpoint) {
                for symbol in symbols {
                    keys.insert(self.key(endpoint, Some(symbol), params)?);
                }
            } else {
                keys.insert(self.key(endpoint, None, params)?);
            }
        }
        Ok(keys)
    }

    fn key(&self, endpoint: Endpoint, symbol: Option<&str>, params: &ParamMap) -> Result<SubscriptionKey> {
        let mut call = self.schema.default_params.clone();
        call.extend(params.iter().map(|(name, value)| (name.clone(), value.clone())));
        if let Some(symbol) = symbol {
            call.insert(ParamName::Symbol, self.schema.channel_symbol(symbol).into());
        }
        Ok(SubscriptionKey {
            endpoint,
            symbol: symbol.map(str::to_string),
            channel: self.converter.resolve_path(endpoint, &call)?,
        })
    }

    /// Current key carrying `channel`
    pub fn key_for_channel(&self, channel: &str) -> Option<&SubscriptionKey> {
        self.sets.current.iter().find(|key| key.channel == channel)
    }

    // Delivery bookkeeping

    pub fn mark_sent(&mut self, keys: &[SubscriptionKey]) {
        for key in keys {
            if self.sets.current.contains(key) {
                self.sets.pending.remove(key);
                self.sets.failed.remove(key);
                self.sets.successful.insert(key.clone());
            }
        }
    }

    pub fn mark_failed(&mut self, keys: &[SubscriptionKey]) {
        for key in keys {
            if self.sets.current.contains(key) {
                self.sets.pending.remove(key);
                self.sets.failed.insert(key.clone());
            }
        }
    }

    /// Every current channel went out with the connect URL
    pub fn mark_all_sent(&mut self) {
        self.sets.successful = self.sets.current.clone();
        self.sets.pending.clear();
        self.sets.failed.clear();
    }

    /// The connection is gone; every current channel awaits delivery again
    pub fn reset_delivery(&mut self) {
        self.sets.pending = self.sets.current.clone();
        self.sets.successful.clear();
        self.sets.failed.clear();
    }
}

/// Connect URL carrying `keys` in the venue's URL format
pub fn connect_url(
    base: &str,
    format: Option<&UrlFormat>,
    keys: &BTreeSet<SubscriptionKey>,
) -> Result<String> {
    let channels: Vec<&str> = keys.iter().map(|key| key.channel.as_str()).collect();
    let Some(format) = format else {
        return Ok(base.to_string());
    };
    if channels.is_empty() {
        return Ok(base.to_string());
    }
    match format {
        UrlFormat::StreamPath => {
            let base = base.trim_end_matches('/');
            Ok(match channels.as_slice() {
                [single] => format!("{}/ws/{}", base, single),
                many => format!("{}/stream?streams={}", base, many.join("/")),
            })
        }
        UrlFormat::QueryParam { name } => {
            let mut url = Url::parse(base)
                .map_err(|e| AdapterError::Configuration(format!("Invalid WebSocket URL '{}': {}", base, e)))?;
            url.query_pairs_mut().append_pair(name, &channels.join(","));
            Ok(url.into())
        }
    }
}

/// Command frames (un)subscribing `keys`
pub fn command_frames(format: &CommandFormat, subscribe: bool, keys: &[SubscriptionKey]) -> Vec<String> {
    if keys.is_empty() {
        return Vec::new();
    }
    match format {
        CommandFormat::OpArgs => {
            let op = if subscribe { "subscribe" } else { "unsubscribe" };
            let args: Vec<&str> = keys.iter().map(|key| key.channel.as_str()).collect();
            vec![json!({ "op": op, "args": args }).to_string()]
        }
        CommandFormat::EventPerChannel {
            subscribe: subscribe_verb,
            unsubscribe: unsubscribe_verb,
        } => {
            let verb = if subscribe { subscribe_verb } else { unsubscribe_verb };
            keys.iter()
                .map(|key| json!({ "event": verb, "channel": key.channel }).to_string())
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AdapterConfig;
    use serde_json::Value;
    use types::{Interval, VenueId};

    fn subscriptions() -> Subscriptions {
        let config = AdapterConfig::new(VenueId::Binance, "1", "wss://stream.example.com:9443/")
            .endpoint(Endpoint::Trade, "{symbol}@trade")
            .endpoint(Endpoint::Candle, "{symbol}@kline_{interval}")
            .endpoint(Endpoint::TickerAll, "!miniTicker@arr")
            .value(Interval::Min1, "1m");
        let schema = WsSchema {
            url: Some(UrlFormat::StreamPath),
            supported_endpoints: vec![Endpoint::Trade, Endpoint::Candle, Endpoint::TickerAll],
            symbol_endpoints: [Endpoint::Trade, Endpoint::Candle].into_iter().collect(),
            lowercase_symbols: true,
            ..WsSchema::default()
        };
        Subscriptions::new(Converter::new(config, true), Arc::new(schema))
    }

    fn symbols(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn channels(subs: &Subscriptions) -> Vec<String> {
        subs.current().iter().map(|key| key.channel.clone()).collect()
    }

    #[test]
    fn test_subscribe_unions_symbols() {
        let mut subs = subscriptions();
        let added = subs
            .subscribe(Some(&[Endpoint::Trade]), Some(&symbols(&["ETHBTC"])), &ParamMap::new())
            .unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].channel, "ethbtc@trade");
        assert_eq!(added[0].symbol.as_deref(), Some("ETHBTC"));

        subs.subscribe(Some(&[Endpoint::Trade]), Some(&symbols(&["XRPBTC"])), &ParamMap::new())
            .unwrap();
        assert_eq!(channels(&subs), vec!["ethbtc@trade", "xrpbtc@trade"]);
        assert_eq!(subs.sets().pending.len(), 2);
    }

    #[test]
    fn test_unsubscribe_endpoint_removes_all_symbols() {
        let mut subs = subscriptions();
        subs.subscribe(Some(&[Endpoint::Trade]), Some(&symbols(&["ETHBTC", "XRPBTC"])), &ParamMap::new())
            .unwrap();
        subs.mark_all_sent();

        let removed = subs.unsubscribe(Some(&[Endpoint::Trade]), None);
        assert_eq!(removed.keys.len(), 2);
        assert_eq!(removed.active.len(), 2);
        assert!(subs.current().is_empty());
        assert!(subs.sets().successful.is_empty());
    }

    #[test]
    fn test_unsubscribe_everything_clears_every_set() {
        let mut subs = subscriptions();
        subs.subscribe(Some(&[Endpoint::Trade]), Some(&symbols(&["ETHBTC"])), &ParamMap::new())
            .unwrap();
        subs.mark_failed(&subs.current().iter().cloned().collect::<Vec<_>>());

        let removed = subs.unsubscribe(None, None);
        assert_eq!(removed.keys.len(), 1);
        assert!(removed.active.is_empty());
        assert_eq!(subs.sets(), &SubscriptionSets::default());
    }

    #[test]
    fn test_default_subscribe_skips_symbol_endpoints_without_symbols() {
        let mut subs = subscriptions();
        let added = subs.subscribe(None, None, &ParamMap::new()).unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].channel, "!miniTicker@arr");
    }

    #[test]
    fn test_unsupported_endpoints_are_filtered() {
        let mut subs = subscriptions();
        let added = subs
            .subscribe(Some(&[Endpoint::OrderBook]), Some(&symbols(&["ETHBTC"])), &ParamMap::new())
            .unwrap();
        assert!(added.is_empty());
        assert!(subs.sets().endpoints.is_empty());
    }

    #[test]
    fn test_missing_template_param_leaves_sets_untouched() {
        let mut subs = subscriptions();
        let error = subs
            .subscribe(Some(&[Endpoint::Candle]), Some(&symbols(&["ETHBTC"])), &ParamMap::new())
            .unwrap_err();
        assert!(error.is_configuration());
        assert_eq!(subs.sets(), &SubscriptionSets::default());

        let mut params = ParamMap::new();
        params.insert(ParamName::Interval, Interval::Min1.into());
        let added = subs
            .subscribe(Some(&[Endpoint::Candle]), Some(&symbols(&["ETHBTC"])), &params)
            .unwrap();
        assert_eq!(added[0].channel, "ethbtc@kline_1m");
    }

    #[test]
    fn test_unsubscribe_symbol_keeps_generic_channels() {
        let mut subs = subscriptions();
        subs.subscribe(
            Some(&[Endpoint::Trade, Endpoint::TickerAll]),
            Some(&symbols(&["ETHBTC", "XRPBTC"])),
            &ParamMap::new(),
        )
        .unwrap();

        let removed = subs.unsubscribe(None, Some(&symbols(&["ETHBTC"])));
        assert_eq!(removed.keys.len(), 1);
        assert_eq!(channels(&subs), vec!["xrpbtc@trade", "!miniTicker@arr"]);
        assert_eq!(
            subs.key_for_channel("xrpbtc@trade").map(|key| key.endpoint),
            Some(Endpoint::Trade)
        );
    }

    #[test]
    fn test_stream_path_urls() {
        let mut subs = subscriptions();
        subs.subscribe(Some(&[Endpoint::Trade]), Some(&symbols(&["ETHBTC"])), &ParamMap::new())
            .unwrap();
        let base = "wss://stream.example.com:9443/";
        assert_eq!(
            connect_url(base, Some(&UrlFormat::StreamPath), subs.current()).unwrap(),
            "wss://stream.example.com:9443/ws/ethbtc@trade"
        );

        subs.subscribe(Some(&[Endpoint::Trade]), Some(&symbols(&["XRPBTC"])), &ParamMap::new())
            .unwrap();
        assert_eq!(
            connect_url(base, Some(&UrlFormat::StreamPath), subs.current()).unwrap(),
            "wss://stream.example.com:9443/stream?streams=ethbtc@trade/xrpbtc@trade"
        );
    }

    #[test]
    fn test_query_param_url() {
        let keys: BTreeSet<SubscriptionKey> = ["trade:XBTUSD", "trade:ETHUSD"]
            .into_iter()
            .map(|channel| SubscriptionKey {
                endpoint: Endpoint::Trade,
                symbol: None,
                channel: channel.to_string(),
            })
            .collect();
        let format = UrlFormat::QueryParam {
            name: "subscribe".to_string(),
        };
        let url = connect_url("wss://ws.example.com/realtime", Some(&format), &keys).unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: Vec<(String, String)> = parsed.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![("subscribe".to_string(), "trade:ETHUSD,trade:XBTUSD".to_string())]
        );
    }

    #[test]
    fn test_command_frames() {
        let keys = vec![
            SubscriptionKey {
                endpoint: Endpoint::Trade,
                symbol: Some("XBTUSD".to_string()),
                channel: "trade:XBTUSD".to_string(),
            },
            SubscriptionKey {
                endpoint: Endpoint::Trade,
                symbol: Some("ETHUSD".to_string()),
                channel: "trade:ETHUSD".to_string(),
            },
        ];

        let frames = command_frames(&CommandFormat::OpArgs, false, &keys);
        assert_eq!(frames.len(), 1);
        let frame: Value = serde_json::from_str(&frames[0]).unwrap();
        assert_eq!(frame["op"], "unsubscribe");
        assert_eq!(frame["args"], json!(["trade:XBTUSD", "trade:ETHUSD"]));

        let per_channel = CommandFormat::EventPerChannel {
            subscribe: "addChannel".to_string(),
            unsubscribe: "removeChannel".to_string(),
        };
        let frames = command_frames(&per_channel, true, &keys);
        assert_eq!(frames.len(), 2);
        let frame: Value = serde_json::from_str(&frames[1]).unwrap();
        assert_eq!(frame, json!({"event": "addChannel", "channel": "trade:ETHUSD"}));

        assert!(command_frames(&CommandFormat::OpArgs, true, &[]).is_empty());
    }
}
