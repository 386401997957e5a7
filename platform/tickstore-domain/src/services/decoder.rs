use crate::value_objects::tick::Tick;
use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

const EVENT_TYPE_FIELD: &str = "e";
const EVENT_TIME_FIELD: &str = "E";
const SYMBOL_FIELD: &str = "s";
const CURRENT_PRICE_FIELD: &str = "c";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Tick(Tick),
    /// Not a ticker update (subscription ack, other stream types). Dropped silently.
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed message: {reason}")]
    Malformed { reason: String },
}

impl DecodeError {
    fn malformed(reason: impl Into<String>) -> Self {
        DecodeError::Malformed {
            reason: reason.into(),
        }
    }
}

/// Turns raw ticker payloads into [`Tick`]s.
///
/// Ticker events are recognised by an event type ending in `Ticker` (`24hrTicker`,
/// `24hrMiniTicker`, `1hTicker`, ...). Combined-stream envelopes
/// (`{"stream": "...", "data": {...}}`) are unwrapped first.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickDecoder;

impl TickDecoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, raw: &str) -> Result<Decoded, DecodeError> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|err| DecodeError::malformed(format!("invalid json: {err}")))?;
        self.decode_value(&value)
    }

    pub fn decode_value(&self, value: &Value) -> Result<Decoded, DecodeError> {
        let object = value
            .as_object()
            .ok_or_else(|| DecodeError::malformed("expected a JSON object"))?;
        let payload = unwrap_envelope(object);

        let is_ticker = payload
            .get(EVENT_TYPE_FIELD)
            .and_then(Value::as_str)
            .map(|kind| kind.ends_with("Ticker"))
            .unwrap_or(false);
        if !is_ticker {
            return Ok(Decoded::Ignored);
        }

        let price = parse_price(payload.get(CURRENT_PRICE_FIELD))?;
        let symbol = payload
            .get(SYMBOL_FIELD)
            .and_then(Value::as_str)
            .ok_or_else(|| DecodeError::malformed("missing symbol field `s`"))?;
        let event_ms = payload
            .get(EVENT_TIME_FIELD)
            .ok_or_else(|| DecodeError::malformed("missing event time field `E`"))?
            .as_i64()
            .ok_or_else(|| DecodeError::malformed("event time `E` is not an integer"))?;
        let event_time = Utc
            .timestamp_millis_opt(event_ms)
            .single()
            .ok_or_else(|| DecodeError::malformed(format!("event time out of range: {event_ms}")))?;

        Tick::new(symbol, price, event_time)
            .map(Decoded::Tick)
            .map_err(|err| DecodeError::malformed(err.to_string()))
    }
}

fn unwrap_envelope(object: &Map<String, Value>) -> &Map<String, Value> {
    match (object.get("stream"), object.get("data")) {
        (Some(Value::String(_)), Some(Value::Object(data))) => data,
        _ => object,
    }
}

fn parse_price(value: Option<&Value>) -> Result<Decimal, DecodeError> {
    // JSON numbers have already been through f64; only decimal strings are exact.
    let text = match value {
        Some(Value::String(text)) => text.trim(),
        Some(_) => {
            return Err(DecodeError::malformed(
                "current price `c` must be a decimal string",
            ))
        }
        None => return Err(DecodeError::malformed("missing current price field `c`")),
    };
    Decimal::from_str(text)
        .map_err(|err| DecodeError::malformed(format!("bad price {text:?}: {err}")))
}
