//! The captured summary of one HTTP request/response cycle

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A request or response body as it was captured.
///
/// Serialized untagged: a structured body is stored as the JSON value itself,
/// a raw body as a JSON string. Reading back a stored string always yields
/// `Raw`, even when it was a top-level JSON string originally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CapturedBody {
    /// Body that was not valid JSON (or was cut short)
    Raw(String),
    /// Body that decoded as JSON
    Structured(serde_json::Value),
}

/// One completed HTTP exchange, ready to be persisted.
///
/// Built once by the capture layer and then only moved: channel, batch buffer,
/// storage. Nothing downstream rewrites a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// When the exchange completed
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    /// Raw query string, without the leading `?`
    pub query: String,
    pub ip: String,
    pub user_agent: String,
    pub status: u16,
    /// Wall time from request arrival to the end of the response body
    #[serde(with = "duration_ms")]
    pub latency: Duration,
    /// `"<METHOD> <route template>"`
    pub handler: String,
    pub request: Option<CapturedBody>,
    pub response: Option<CapturedBody>,
    /// Handler-reported error messages, newline separated
    pub errors: String,
    /// Request `Content-Length`, or -1 when the client did not send one
    pub content_length: i64,
    /// True when either body was cut at the capture limit
    pub truncated: bool,
    pub created_at: DateTime<Utc>,
}

impl LogRecord {
    pub fn latency_ms(&self) -> i64 {
        i64::try_from(self.latency.as_millis()).unwrap_or(i64::MAX)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        let millis = u64::try_from(value.as_millis()).unwrap_or(u64::MAX);
        serializer.serialize_u64(millis)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
pub(crate) fn sample_record(path: &str) -> LogRecord {
    let now = Utc::now();
    LogRecord {
        timestamp: now,
        method: "POST".to_string(),
        path: path.to_string(),
        query: String::new(),
        ip: "127.0.0.1".to_string(),
        user_agent: "test-agent".to_string(),
        status: 200,
        latency: Duration::from_millis(12),
        handler: format!("POST {}", path),
        request: None,
        response: None,
        errors: String::new(),
        content_length: -1,
        truncated: false,
        created_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_serializes_camel_case_with_latency_in_ms() {
        let mut record = sample_record("/api/users");
        record.latency = Duration::from_millis(1500);
        record.request = Some(CapturedBody::Structured(json!({"name": "alice"})));
        record.response = Some(CapturedBody::Raw("not json".to_string()));

        let value = serde_json::to_value(&record).unwrap();

        assert_eq!(value["latency"], 1500);
        assert_eq!(value["userAgent"], "test-agent");
        assert_eq!(value["contentLength"], -1);
        assert_eq!(value["request"]["name"], "alice");
        assert_eq!(value["response"], "not json");
    }

    #[test]
    fn test_stored_string_reads_back_as_raw() {
        let body: CapturedBody = serde_json::from_str("\"plain text\"").unwrap();
        assert_eq!(body, CapturedBody::Raw("plain text".to_string()));

        let body: CapturedBody = serde_json::from_str("[1,2,3]").unwrap();
        assert_eq!(body, CapturedBody::Structured(json!([1, 2, 3])));
    }
}
