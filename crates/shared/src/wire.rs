//! Lenient field decoders for values the server emits in more than one shape.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Int(i64),
}

impl From<IdRepr> for String {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(s) => s,
            IdRepr::Int(n) => n.to_string(),
        }
    }
}

/// Character ids arrive either as strings or as plain integers.
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer).map(String::from)
}

pub fn opt_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<IdRepr>::deserialize(deserializer)?.map(String::from))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimestampRepr {
    Rfc3339(DateTime<Utc>),
    UnixSeconds(f64),
}

/// Timestamps are either RFC 3339 strings or Unix seconds (possibly fractional).
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(repr) = Option::<TimestampRepr>::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(match repr {
        TimestampRepr::Rfc3339(ts) => Some(ts),
        TimestampRepr::UnixSeconds(secs) => {
            let millis = (secs * 1000.0).round() as i64;
            Utc.timestamp_millis_opt(millis).single()
        }
    })
}
