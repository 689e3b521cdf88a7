//! Venue identifiers
//!
//! Numeric ids are stable and travel in flat item rows as `platform_id`.

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Trading venues with a shipped adapter configuration
#[repr(u16)]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum VenueId {
    Binance = 1,
    Bitfinex = 2,
    Bitmex = 3,
    Okex = 4,
}

impl VenueId {
    pub const ALL: [VenueId; 4] = [
        VenueId::Binance,
        VenueId::Bitfinex,
        VenueId::Bitmex,
        VenueId::Okex,
    ];

    /// Lowercase venue name used in logs and configuration files
    pub fn name(&self) -> &'static str {
        match self {
            VenueId::Binance => "binance",
            VenueId::Bitfinex => "bitfinex",
            VenueId::Bitmex => "bitmex",
            VenueId::Okex => "okex",
        }
    }

    /// Numeric id as carried in `platform_id` columns
    pub fn id(&self) -> u16 {
        *self as u16
    }
}

impl fmt::Display for VenueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VenueId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_ascii_lowercase();
        VenueId::ALL
            .into_iter()
            .find(|venue| venue.name() == lowered)
            .ok_or_else(|| TypesError::UnknownToken {
                kind: "venue",
                token: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_venue_names_round_trip() {
        for venue in VenueId::ALL {
            assert_eq!(venue.name().parse::<VenueId>().unwrap(), venue);
        }
        assert_eq!("BitMEX".parse::<VenueId>().unwrap(), VenueId::Bitmex);
        assert!("kraken".parse::<VenueId>().is_err());
    }

    #[test]
    fn test_venue_primitive_ids() {
        assert_eq!(VenueId::try_from(3u16).unwrap(), VenueId::Bitmex);
        assert!(VenueId::try_from(0u16).is_err());
        assert_eq!(VenueId::Okex.id(), 4);
    }
}
