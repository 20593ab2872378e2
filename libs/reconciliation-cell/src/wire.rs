// libs/reconciliation-cell/src/wire.rs
//! Backend JSON shapes, decoded leniently.
//!
//! The admin backend is not owned by this service and its payloads drift:
//! booleans arrive as strings, prices as strings, populated references as bare
//! ids. Every field here decodes to `None`/empty instead of failing, so one bad
//! record can never take down a list.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentRecord {
    #[serde(rename = "_id", deserialize_with = "lenient_string")]
    pub mongo_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub payment_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub stripe_payment_status: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub stripe_verified: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub stripe_subscription_status: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_stripe_active: Option<bool>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_balance: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub checkout_session_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub decline_comment: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub is_payout_rejected: Option<bool>,
    #[serde(deserialize_with = "lenient_string")]
    pub rejected_payout_note: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub payout_status: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_party")]
    pub therapist: Option<PartyRecord>,
    #[serde(deserialize_with = "lenient_party")]
    pub patient: Option<PartyRecord>,
    #[serde(deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub plan: Option<String>,
    #[serde(deserialize_with = "lenient_sessions")]
    pub sessions: Vec<SessionRecord>,
    #[serde(deserialize_with = "lenient_sessions")]
    pub recurring: Vec<SessionRecord>,
}

impl AppointmentRecord {
    /// Decodes any JSON value; non-objects yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            warn!("Skipping appointment record that is not a JSON object");
            return None;
        }
        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping undecodable appointment record: {}", e);
                None
            }
        }
    }

    /// `_id` wins over `id` when both are present.
    pub fn identifier(&self) -> Option<&str> {
        self.mongo_id.as_deref().or(self.id.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionRecord {
    #[serde(rename = "_id", deserialize_with = "lenient_string")]
    pub mongo_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub payment_status: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub checkout_session_id: Option<String>,
    #[serde(deserialize_with = "lenient_bool")]
    pub stripe_verified: Option<bool>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub payment_percentage: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub date: Option<String>,
}

/// A populated therapist or patient reference.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PartyRecord {
    #[serde(rename = "_id", deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(deserialize_with = "lenient_i64")]
    pub level: Option<i64>,
}

/// One page of the admin appointment listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppointmentPageRecord {
    #[serde(alias = "data", deserialize_with = "lenient_array")]
    pub appointments: Vec<Value>,
    #[serde(deserialize_with = "lenient_pagination")]
    pub pagination: PaginationRecord,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationRecord {
    #[serde(deserialize_with = "lenient_i64")]
    pub total: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub page: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub limit: Option<i64>,
    #[serde(deserialize_with = "lenient_i64")]
    pub total_pages: Option<i64>,
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }))
}

pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Bool(b) => Some(b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }))
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| match v {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|f| f.is_finite()))
}

pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }))
}

pub fn lenient_party<'de, D>(deserializer: D) -> Result<Option<PartyRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        // Unpopulated reference: just the id.
        Value::String(id) if !id.trim().is_empty() => Some(PartyRecord {
            id: Some(id.trim().to_string()),
            ..PartyRecord::default()
        }),
        obj @ Value::Object(_) => serde_json::from_value(obj).ok(),
        _ => None,
    }))
}

pub fn lenient_pagination<'de, D>(deserializer: D) -> Result<PaginationRecord, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .filter(Value::is_object)
        .and_then(|obj| serde_json::from_value(obj).ok())
        .unwrap_or_default())
}

pub fn lenient_sessions<'de, D>(deserializer: D) -> Result<Vec<SessionRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    let items = lenient_array(deserializer)?;
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

pub fn lenient_array<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    })
}
