//! Built-in venue profiles
//!
//! Each venue module describes its REST API versions and WebSocket stream as plain data. The
//! clients take any profile, so tests and callers can build their own.

pub mod binance;
pub mod bitfinex;
pub mod bitmex;
pub mod okex;

use std::collections::HashMap;
use types::{Endpoint, ParamName, ParamValue, VenueId};

use crate::engine::AdapterConfig;
use crate::input::WsSchema;
use crate::rate_limit::CooldownPolicy;

/// REST side of a venue
#[derive(Debug, Clone)]
pub struct RestProfile {
    pub venue: VenueId,
    pub default_version: String,
    /// One adapter per API version
    pub adapters: Vec<AdapterConfig>,
    /// Endpoints served by a version other than the default
    pub version_by_endpoint: HashMap<Endpoint, String>,
    /// Header carrying the API key on secured calls
    pub api_key_header: Option<String>,
    /// Secured calls carry the server timestamp
    pub stamp_secured_requests: bool,
    pub cooldown: CooldownPolicy,
    /// Extra parameters of limit orders
    pub limit_order_params: Vec<(ParamName, ParamValue)>,
}

impl RestProfile {
    pub fn new(venue: VenueId, default_version: impl Into<String>, cooldown: CooldownPolicy) -> Self {
        Self {
            venue,
            default_version: default_version.into(),
            adapters: Vec::new(),
            version_by_endpoint: HashMap::new(),
            api_key_header: None,
            stamp_secured_requests: false,
            cooldown,
            limit_order_params: Vec::new(),
        }
    }

    pub fn adapter(mut self, config: AdapterConfig) -> Self {
        self.adapters.push(config);
        self
    }

    pub fn version_for(mut self, endpoint: Endpoint, version: &str) -> Self {
        self.version_by_endpoint.insert(endpoint, version.to_string());
        self
    }
}

/// WebSocket side of a venue
#[derive(Debug, Clone)]
pub struct WsProfile {
    pub venue: VenueId,
    pub adapter: AdapterConfig,
    pub schema: WsSchema,
}

pub fn rest_profile(venue: VenueId) -> Option<RestProfile> {
    Some(match venue {
        VenueId::Binance => binance::rest(),
        VenueId::Bitfinex => bitfinex::rest(),
        VenueId::Bitmex => bitmex::rest(),
        VenueId::Okex => okex::rest(),
    })
}

/// `None` for venues without a streaming adapter
pub fn ws_profile(venue: VenueId) -> Option<WsProfile> {
    match venue {
        VenueId::Binance => Some(binance::ws()),
        VenueId::Bitmex => Some(bitmex::ws()),
        VenueId::Okex => Some(okex::ws()),
        VenueId::Bitfinex => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Converter;
    use types::ParamMap;

    #[test]
    fn test_every_venue_has_a_rest_profile() {
        for venue in [VenueId::Binance, VenueId::Bitfinex, VenueId::Bitmex, VenueId::Okex] {
            let profile = rest_profile(venue).unwrap();
            assert_eq!(profile.venue, venue);
            assert!(profile
                .adapters
                .iter()
                .any(|adapter| adapter.version == profile.default_version));
            for version in profile.version_by_endpoint.values() {
                assert!(profile.adapters.iter().any(|adapter| &adapter.version == version));
            }
        }
    }

    #[test]
    fn test_ws_channel_templates_resolve_with_defaults() {
        for venue in [VenueId::Binance, VenueId::Bitmex, VenueId::Okex] {
            let profile = ws_profile(venue).unwrap();
            let converter = Converter::new(profile.adapter.clone(), true);
            for endpoint in &profile.schema.supported_endpoints {
                let mut params: ParamMap = profile.schema.default_params.clone();
                params.insert(ParamName::Symbol, "ethbtc".into());
                assert!(
                    converter.resolve_path(*endpoint, &params).is_ok(),
                    "{} {} does not resolve",
                    venue,
                    endpoint
                );
            }
        }
        assert!(ws_profile(VenueId::Bitfinex).is_none());
    }
}
