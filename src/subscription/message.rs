//! Push message decoding
//!
//! Inbound text is fixed up so wide integers survive generic JSON parsing,
//! then classified as an acknowledgment, a result notification, or noise.

use std::fmt;

use log::warn;
use serde::Deserialize;
use serde_json::Value;

use crate::error::RemoteError;
use crate::query::OperationOutcome;
use crate::query::rpc::RpcErrorObject;

/// Integer literals with at least this many digits are quoted before parsing.
/// Anything wider than 15 digits may exceed 2^53.
pub const LARGE_INTEGER_DIGITS: usize = 16;

/// Server-issued token identifying one active push subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(String);

impl SubscriptionHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read a handle from a JSON string or integer
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            Value::Number(n) if n.is_u64() || n.is_i64() => Some(Self(n.to_string())),
            _ => None,
        }
    }

    /// JSON form used in unsubscribe requests: numeric handles go back as numbers
    pub fn to_param(&self) -> Value {
        match self.0.parse::<u64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::from(self.0.as_str()),
        }
    }
}

impl fmt::Display for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An outcome pushed for a watched operation
#[derive(Debug, Clone, PartialEq)]
pub struct ResultNotification {
    pub subscription: SubscriptionHandle,
    pub outcome: OperationOutcome,
}

/// Classified inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Response to one of our requests, matched by id
    Ack {
        id: u64,
        result: Result<Value, RemoteError>,
    },
    /// Push notification, possibly without a handle or any content
    Notification {
        subscription: Option<SubscriptionHandle>,
        outcome: OperationOutcome,
    },
    Unrecognized,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
    #[serde(default)]
    params: Option<Params>,
}

#[derive(Deserialize)]
struct Params {
    #[serde(default)]
    subscription: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
}

/// Decode one inbound text frame
pub fn decode(text: &str) -> Result<InboundMessage, serde_json::Error> {
    let fixed = quote_large_integers(text);
    let envelope: Envelope = serde_json::from_str(&fixed)?;

    if let Some(id) = envelope.id.as_ref().and_then(Value::as_u64) {
        if let Some(error) = envelope.error {
            return Ok(InboundMessage::Ack {
                id,
                result: Err(error.into()),
            });
        }
        if let Some(result) = envelope.result {
            return Ok(InboundMessage::Ack {
                id,
                result: Ok(result),
            });
        }
    }

    let Some(params) = envelope.params else {
        return Ok(InboundMessage::Unrecognized);
    };

    let subscription = params
        .subscription
        .as_ref()
        .and_then(SubscriptionHandle::from_value);

    // Outcomes usually sit under result.value; accept a bare result as well
    let value = params.result.map(|result| match result {
        Value::Object(mut map) if map.contains_key("value") => {
            map.remove("value").unwrap_or(Value::Null)
        }
        other => other,
    });

    let outcome = match value {
        None | Some(Value::Null) => OperationOutcome::default(),
        Some(value) => match OperationOutcome::deserialize(&value) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Undecodable result in notification: {} ({})", e, value);
                OperationOutcome::default()
            }
        },
    };

    Ok(InboundMessage::Notification {
        subscription,
        outcome,
    })
}

/// Quote bare integer member values of 16 or more digits.
///
/// Only values directly after a `:` are rewritten; text inside string
/// literals and non-integer numbers are left alone.
pub fn quote_large_integers(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    let mut i = 0;
    let mut in_string = false;

    while i < bytes.len() {
        let b = bytes[i];
        if in_string {
            match b {
                b'\\' => i += 1,
                b'"' => in_string = false,
                _ => {}
            }
            i += 1;
            continue;
        }

        match b {
            b'"' => {
                in_string = true;
                i += 1;
            }
            b':' => {
                let mut start = i + 1;
                while start < bytes.len() && bytes[start].is_ascii_whitespace() {
                    start += 1;
                }
                let digits_start = if bytes.get(start) == Some(&b'-') {
                    start + 1
                } else {
                    start
                };
                let mut end = digits_start;
                while end < bytes.len() && bytes[end].is_ascii_digit() {
                    end += 1;
                }

                let is_integer = !matches!(bytes.get(end), Some(b'.' | b'e' | b'E'));
                if end - digits_start >= LARGE_INTEGER_DIGITS && is_integer {
                    out.push_str(&text[last..start]);
                    out.push('"');
                    out.push_str(&text[start..end]);
                    out.push('"');
                    last = end;
                }
                i = end.max(i + 1);
            }
            _ => i += 1,
        }
    }

    out.push_str(&text[last..]);
    out
}
