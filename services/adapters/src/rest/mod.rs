//! REST request pipeline
//!
//! [`RestConverter`] holds the pure stages around one HTTP round trip:
//!
//! 1. [`RestConverter::preprocess`] reconciles limit, sorting and paging parameters
//! 2. the engine translates them into venue names and values
//! 3. [`RestConverter::sign`] signs secured endpoints
//! 4. after the call, [`RestConverter::postprocess`] fills request context into the items
//!
//! [`RestClient`] runs the stages against a venue with `reqwest`.

pub mod client;
pub mod signing;

use serde_json::Value;
use std::collections::BTreeMap;
use types::{ApiError, Endpoint, ErrorCode, Item, ParamMap, ParamName, ParamValue, Sorting};

pub use client::{CandleQuery, HistoryQuery, OrderRef, OrderRequest, RestClient};

use crate::config::{Credentials, RestClientConfig};
use crate::engine::{wire_text, AdapterConfig, Converter, Parsed};
use crate::Result;

/// Outcome of [`RestConverter::sign`]
#[derive(Debug, Clone, PartialEq)]
pub enum Signed {
    /// Wire pairs ready to send, signature last when secured
    Pairs(Vec<(String, String)>),
    /// The call cannot be signed; returned to the caller as an error value
    Refused(ApiError),
}

/// Pipeline stages for one venue API version
#[derive(Debug, Clone)]
pub struct RestConverter {
    engine: Converter,
    use_max_limit: bool,
    base_url: String,
}

impl RestConverter {
    pub fn new(config: AdapterConfig, settings: &RestClientConfig) -> Self {
        let base_url = match &settings.base_url {
            Some(url) => url.replace("{version}", &config.version),
            None => config.resolved_base_url(),
        };
        Self {
            engine: Converter::new(config, settings.use_milliseconds),
            use_max_limit: settings.use_max_limit,
            base_url,
        }
    }

    pub fn engine(&self) -> &Converter {
        &self.engine
    }

    /// Absolute URL of a venue path
    pub fn url(&self, path: &str) -> String {
        if path.is_empty() {
            return self.base_url.clone();
        }
        match (self.base_url.ends_with('/'), path.starts_with('/')) {
            (true, true) => format!("{}{}", self.base_url, &path[1..]),
            (false, false) => format!("{}/{}", self.base_url, path),
            _ => format!("{}{}", self.base_url, path),
        }
    }

    /// Reconcile limit, sorting and paging parameters, in that order
    pub fn preprocess(&self, endpoint: Endpoint, mut params: ParamMap) -> ParamMap {
        let config = self.engine.config();

        let use_max_limit = match params.remove(&ParamName::IsUseMaxLimit) {
            Some(ParamValue::Flag(flag)) => flag,
            Some(other) => other.as_i64().map_or(self.use_max_limit, |v| v != 0),
            None => self.use_max_limit,
        };
        if use_max_limit && !params.contains_key(&ParamName::Limit) {
            if let Some(max) = config.max_limit_by_endpoint.get(&endpoint) {
                params.insert(ParamName::Limit, ParamValue::Int(*max));
            }
        }

        let rules = config.sorting;
        if !rules.enabled {
            params.remove(&ParamName::Sorting);
        } else if !params.contains_key(&ParamName::Sorting) {
            params.insert(ParamName::Sorting, ParamValue::Sorting(rules.default));
        }

        let sorting = params
            .get(&ParamName::Sorting)
            .and_then(ParamValue::as_sorting)
            .unwrap_or(rules.natural);
        reconcile_paging(&mut params, sorting);

        params
    }

    /// Wire parameters for a call, signed when the endpoint is secured
    ///
    /// A secured endpoint without credentials yields an `Unauthorized` error value.
    pub fn sign(
        &self,
        endpoint: Endpoint,
        params: BTreeMap<String, Value>,
        credentials: Option<&Credentials>,
    ) -> Result<Signed> {
        let pairs: Vec<(String, String)> = params
            .into_iter()
            .map(|(name, value)| (name, wire_text(&value)))
            .collect();

        let config = self.engine.config();
        if !config.is_secured(endpoint) {
            return Ok(Signed::Pairs(pairs));
        }
        let Some(credentials) = credentials else {
            return Ok(Signed::Refused(ApiError::with_details(
                ErrorCode::Unauthorized,
                format!(" (no credentials to sign {})", endpoint),
            )));
        };
        signing::sign_params(config.digest, &credentials.api_secret, pairs).map(Signed::Pairs)
    }

    /// Copy symbol and interval from the request onto items that lack them
    pub fn postprocess(&self, params: &ParamMap, parsed: Parsed) -> Parsed {
        let fill = |item: &mut Item| {
            for name in [ParamName::Symbol, ParamName::Interval] {
                let Some(value) = params.get(&name) else {
                    continue;
                };
                if item.field(&name) == Some(Value::Null) {
                    let raw = Value::String(value.lookup_token().unwrap_or_default());
                    // The value was accepted as a parameter, so only a foreign token can fail
                    let _ = item.set_field(&name, &raw);
                }
            }
        };
        match parsed {
            Parsed::Item(mut item) => {
                fill(&mut item);
                Parsed::Item(item)
            }
            Parsed::Items(mut items) => {
                items.iter_mut().for_each(&fill);
                Parsed::Items(items)
            }
            other => other,
        }
    }
}

/// Order paging boundaries chronologically and move a lone lower bound under descending sort
fn reconcile_paging(params: &mut ParamMap, sorting: Sorting) {
    let Some(from) = params.remove(&ParamName::FromItem) else {
        return;
    };
    match params.remove(&ParamName::ToItem) {
        Some(to) => {
            let reversed = matches!(
                (from.chronology(), to.chronology()),
                (Some(from), Some(to)) if from > to
            );
            let (from, to) = if reversed { (to, from) } else { (from, to) };
            params.insert(ParamName::FromItem, from);
            params.insert(ParamName::ToItem, to);
        }
        None if sorting == Sorting::Descending => {
            params.insert(ParamName::ToItem, from);
        }
        None => {
            params.insert(ParamName::FromItem, from);
        }
    }
}
