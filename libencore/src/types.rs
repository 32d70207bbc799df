//! Wire types for the concert API
//!
//! Field names follow the server's camelCase JSON. All entities are
//! server-owned snapshots; the client only ever flips `Concert::is_favorite`
//! locally.

use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Timestamp deserializer tolerant of offset-less server times
///
/// Accepts RFC 3339 (`2025-05-20T19:00:00Z`, `...+03:00`) and ISO local
/// times with or without fractional seconds (`2025-05-20T19:00:00.1234567`),
/// the latter read as UTC.
pub mod timestamp {
    use super::*;

    pub fn parse(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(dt.with_timezone(&Utc));
        }

        if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(naive.and_utc());
        }

        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
    }

    pub mod option {
        use super::*;

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw {
                None => Ok(None),
                Some(s) if s.is_empty() => Ok(None),
                Some(s) => parse(&s)
                    .map(Some)
                    .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", s))),
            }
        }
    }
}

/// Decode a base64 image field into raw bytes
///
/// Tolerates a `data:image/...;base64,` prefix.
pub fn decode_image(encoded: &str) -> Option<Vec<u8>> {
    let payload = match encoded.split_once(";base64,") {
        Some((_, rest)) => rest,
        None => encoded,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// A concert as listed by `/Concert/paged`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Concert {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub started_at: DateTime<Utc>,
    pub ticket_price: f64,
    pub available_ticket_amount: i64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default, deserialize_with = "timestamp::option::deserialize")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Concert {
    pub fn is_sold_out(&self) -> bool {
        self.available_ticket_amount <= 0
    }

    /// Label of the buy button
    pub fn buy_label(&self) -> &'static str {
        if self.is_sold_out() {
            "Sold out"
        } else {
            "Buy ticket"
        }
    }

    pub fn image_bytes(&self) -> Option<Vec<u8>> {
        self.image.as_deref().and_then(decode_image)
    }
}

/// Concert data embedded in tickets and favorites
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConcertSnapshot {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub started_at: DateTime<Utc>,
    pub ticket_price: f64,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub image: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    pub user_id: String,
}

impl Post {
    /// Text to show: the body when present, else the title
    pub fn body(&self) -> &str {
        self.text
            .as_deref()
            .or(self.title.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: String,
    pub concert_id: String,
    pub concert: ConcertSnapshot,
}

impl Ticket {
    /// Short printed code, e.g. `#3F2A9C1B`
    pub fn short_code(&self) -> String {
        self.id.chars().take(8).collect::<String>().to_uppercase()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: String,
    #[serde(default)]
    pub concert_id: Option<String>,
    pub concert: ConcertSnapshot,
}

impl Favorite {
    /// Id of the favorited concert, from the explicit field or the snapshot
    pub fn concert_id(&self) -> &str {
        self.concert_id.as_deref().unwrap_or(&self.concert.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub user_name: String,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub profile_picture: Option<String>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub role: String,
}

impl UserProfile {
    pub fn member_since(&self) -> String {
        self.created_at.format("%Y-%m-%d").to_string()
    }
}

/// Body of `/Auth/login` and `/Auth/register`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthRequest {
    pub user_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
