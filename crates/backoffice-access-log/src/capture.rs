//! Size-bounded body capture

use crate::record::CapturedBody;

/// Appended to a body that was cut at the capture limit
pub const TRUNCATION_SUFFIX: &str = "...(truncated)";

/// Limit used when the configured one is zero
pub const FALLBACK_MAX_BODY_BYTES: usize = 1024;

/// Outcome of capturing one body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BodyCapture {
    pub body: Option<CapturedBody>,
    pub truncated: bool,
}

impl BodyCapture {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Capture up to `max` bytes of a body.
///
/// `exceeded` tells the capture that more bytes existed than were handed
/// over, which happens when the caller stopped reading a stream early.
/// A body over the limit is kept as raw text of at most `max` bytes plus
/// [`TRUNCATION_SUFFIX`]; anything else is decoded as JSON when possible.
pub fn capture_body(bytes: &[u8], max: usize, exceeded: bool) -> BodyCapture {
    let max = effective_limit(max);

    if exceeded || bytes.len() > max {
        let cut = &bytes[..bytes.len().min(max)];
        let mut text = String::from_utf8_lossy(cut).into_owned();
        truncate_to_char_boundary(&mut text, max);
        text.push_str(TRUNCATION_SUFFIX);
        return BodyCapture {
            body: Some(CapturedBody::Raw(text)),
            truncated: true,
        };
    }

    if bytes.is_empty() {
        return BodyCapture::empty();
    }

    let body = match serde_json::from_slice::<serde_json::Value>(bytes) {
        Ok(value) => CapturedBody::Structured(value),
        Err(_) => CapturedBody::Raw(String::from_utf8_lossy(bytes).into_owned()),
    };

    BodyCapture {
        body: Some(body),
        truncated: false,
    }
}

pub fn effective_limit(max: usize) -> usize {
    if max == 0 {
        FALLBACK_MAX_BODY_BYTES
    } else {
        max
    }
}

// Lossy decoding may widen invalid bytes into U+FFFD, so re-check the length.
fn truncate_to_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw_len(capture: &BodyCapture) -> usize {
        match &capture.body {
            Some(CapturedBody::Raw(text)) => text.trim_end_matches(TRUNCATION_SUFFIX).len(),
            other => panic!("expected raw body, got {:?}", other),
        }
    }

    #[test]
    fn test_small_json_body_is_structured() {
        let payload = json!({"username": "admin", "roles": [1, 2]});
        let bytes = serde_json::to_vec(&payload).unwrap();

        let capture = capture_body(&bytes, 1024, false);

        assert!(!capture.truncated);
        assert_eq!(capture.body, Some(CapturedBody::Structured(payload)));
    }

    #[test]
    fn test_non_json_body_falls_back_to_raw() {
        let capture = capture_body(b"name=alice&age=3", 1024, false);

        assert!(!capture.truncated);
        assert_eq!(
            capture.body,
            Some(CapturedBody::Raw("name=alice&age=3".to_string()))
        );
    }

    #[test]
    fn test_body_at_limit_is_kept_whole() {
        let bytes = vec![b'a'; 64];
        let capture = capture_body(&bytes, 64, false);

        assert!(!capture.truncated);
        assert_eq!(capture.body, Some(CapturedBody::Raw("a".repeat(64))));
    }

    #[test]
    fn test_oversized_body_is_truncated() {
        let payload = json!({"blob": "x".repeat(500)});
        let bytes = serde_json::to_vec(&payload).unwrap();

        let capture = capture_body(&bytes, 100, false);

        assert!(capture.truncated);
        assert!(raw_len(&capture) <= 100);
        match capture.body {
            Some(CapturedBody::Raw(text)) => assert!(text.ends_with(TRUNCATION_SUFFIX)),
            other => panic!("expected raw body, got {:?}", other),
        }
    }

    #[test]
    fn test_exceeded_flag_truncates_even_short_input() {
        let capture = capture_body(b"partial", 1024, true);
        assert!(capture.truncated);
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        // "é" is two bytes; a 5 byte limit lands in the middle of the third one
        let text = "ééééé";
        let capture = capture_body(text.as_bytes(), 5, false);

        assert!(capture.truncated);
        assert!(raw_len(&capture) <= 5);
    }

    #[test]
    fn test_zero_limit_uses_fallback() {
        let bytes = vec![b'z'; FALLBACK_MAX_BODY_BYTES + 10];
        let capture = capture_body(&bytes, 0, false);

        assert!(capture.truncated);
        assert_eq!(raw_len(&capture), FALLBACK_MAX_BODY_BYTES);
    }

    #[test]
    fn test_empty_body_captures_nothing() {
        assert_eq!(capture_body(b"", 1024, false), BodyCapture::empty());
    }
}
