use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

/// Maximum retry attempts after an initial request attempt.
pub const MAX_RETRIES: u32 = 2;
/// Base delay before the first retry.
pub const BASE_DELAY_MS: u64 = 500;

fn retryable_status_regex() -> &'static Regex {
    static CACHED: OnceLock<Regex> = OnceLock::new();
    CACHED.get_or_init(|| {
        Regex::new(r"(?i)rate.?limit|overloaded|service.?unavailable|timed?.?out|connection.?(reset|refused)")
            .expect("retry regex must compile")
    })
}

/// Error text retry policy for transient failures and retryable statuses.
pub fn is_retryable_http_error(status: u16, error_text: &str) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504) || retryable_status_regex().is_match(error_text)
}

/// Compute exponential backoff delay for a retry attempt.
pub fn retry_delay(attempt: u32) -> Duration {
    let exponent = attempt.min(30);
    Duration::from_millis(BASE_DELAY_MS * 2u64.saturating_pow(exponent))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{is_retryable_http_error, retry_delay};

    #[test]
    fn retryable_statuses_are_recognized() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable_http_error(status, ""));
        }
        assert!(!is_retryable_http_error(400, "bad request"));
        assert!(!is_retryable_http_error(401, "unauthorized"));
    }

    #[test]
    fn transient_error_text_is_retryable_regardless_of_status() {
        assert!(is_retryable_http_error(400, "model overloaded"));
        assert!(is_retryable_http_error(418, "connection reset by peer"));
        assert!(is_retryable_http_error(408, "request timed out"));
    }

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(retry_delay(0), Duration::from_millis(500));
        assert_eq!(retry_delay(1), Duration::from_millis(1000));
        assert_eq!(retry_delay(2), Duration::from_millis(2000));
    }
}
