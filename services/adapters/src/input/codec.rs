//! Inbound frame decoding and routing
//!
//! A frame is decoded to JSON (inflating raw-deflate binaries where the venue compresses),
//! then every object in it is routed to an endpoint by channel name or event type and parsed
//! by the converter.

use flate2::read::DeflateDecoder;
use serde_json::Value;
use std::io::Read;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;
use types::{ApiError, Endpoint, ErrorCode, Item};

use super::schema::{Compression, UrlFormat, WsSchema};
use super::subscription::Subscriptions;
use crate::engine::{Converter, Parsed};
use crate::Result;

/// Canonical content of one inbound frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inbound {
    pub items: Vec<Item>,
    /// Venue error frames
    pub errors: Vec<ApiError>,
}

impl Inbound {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.errors.is_empty()
    }

    fn merge(&mut self, other: Inbound) {
        self.items.extend(other.items);
        self.errors.extend(other.errors);
    }
}

/// JSON payload of a data frame, `None` for control frames
pub fn decode(message: &Message, compression: Compression) -> Result<Option<Value>> {
    match message {
        Message::Text(text) => Ok(Some(serde_json::from_str(text)?)),
        Message::Binary(bytes) => {
            let value = match compression {
                Compression::RawDeflate => serde_json::from_slice(&inflate(bytes)?)?,
                Compression::None => serde_json::from_slice(bytes)?,
            };
            Ok(Some(value))
        }
        _ => Ok(None),
    }
}

/// Inflate a raw deflate stream
pub fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut inflated = Vec::with_capacity(bytes.len() * 4);
    DeflateDecoder::new(bytes).read_to_end(&mut inflated)?;
    Ok(inflated)
}

/// Route a decoded frame to its endpoints and parse it
///
/// Objects nobody subscribed to (acks, pongs, unknown event types) yield nothing.
pub fn route(
    converter: &Converter,
    schema: &WsSchema,
    subscriptions: &Subscriptions,
    raw: &Value,
) -> Result<Inbound> {
    let mut inbound = Inbound::default();
    match raw {
        Value::Array(elements) if elements.iter().any(Value::is_object) => {
            for element in elements {
                inbound.merge(route(converter, schema, subscriptions, element)?);
            }
        }
        Value::Object(object) => {
            if let Some(key) = &schema.error_key {
                if object.contains_key(key) {
                    let error = converter.parse_error(Some(raw), None).unwrap_or_else(|| {
                        ApiError::with_details(ErrorCode::AppError, format!(" ({})", raw))
                    });
                    inbound.errors.push(error);
                    return Ok(inbound);
                }
            }

            let Some((endpoint, symbol)) = resolve(converter, schema, subscriptions, raw) else {
                debug!(venue = %converter.venue(), "Ignoring unroutable frame");
                return Ok(inbound);
            };
            match converter.parse(endpoint, raw)? {
                Parsed::Error(error) => inbound.errors.push(error),
                parsed => {
                    let mut items = parsed.into_items();
                    if let Some(symbol) = symbol {
                        for item in items.iter_mut().filter(|item| item.symbol().is_none()) {
                            item.identity_mut().symbol = Some(symbol.clone());
                        }
                    }
                    inbound.items = items;
                }
            }
        }
        _ => {}
    }
    Ok(inbound)
}

/// Endpoint of an inbound object, plus the symbol its channel was subscribed with
fn resolve(
    converter: &Converter,
    schema: &WsSchema,
    subscriptions: &Subscriptions,
    raw: &Value,
) -> Option<(Endpoint, Option<String>)> {
    if let Some(channel_key) = &schema.channel_key {
        if let Some(channel) = raw.get(channel_key).and_then(Value::as_str) {
            let key = subscriptions.key_for_channel(channel)?;
            return Some((key.endpoint, key.symbol.clone()));
        }
    }

    let by_event = schema.event_type_key.as_deref().and_then(|event_key| {
        let event = raw.get(event_key).or_else(|| {
            let envelope = converter.config().payload.envelope_key.as_deref()?;
            raw.get(envelope)?.get(event_key)
        })?;
        schema.endpoint_by_event_type.get(event.as_str()?).copied()
    });
    if let Some(endpoint) = by_event {
        return Some((endpoint, None));
    }

    // A single-stream connection names neither stream nor event for some payloads
    if schema.url == Some(UrlFormat::StreamPath) {
        if let [key] = subscriptions.current().iter().collect::<Vec<_>>().as_slice() {
            return Some((key.endpoint, key.symbol.clone()));
        }
    }
    None
}
