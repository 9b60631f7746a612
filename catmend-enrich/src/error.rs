//! Error types for the fetch stage

use thiserror::Error;

/// Metadata source client errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Failure classification carried into outcomes and statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FetchErrorKind {
    Network,
    Timeout,
    RateLimited,
    Api,
    Parse,
}

impl FetchError {
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) => FetchErrorKind::Network,
            FetchError::Timeout(_) => FetchErrorKind::Timeout,
            FetchError::RateLimited => FetchErrorKind::RateLimited,
            FetchError::Api(_, _) => FetchErrorKind::Api,
            FetchError::Parse(_) => FetchErrorKind::Parse,
        }
    }

    /// Whether a retry can reasonably succeed.
    ///
    /// Network blips, timeouts, rate-limit responses and server-side errors
    /// are retried; client-side API errors and parse failures are not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) | FetchError::RateLimited => true,
            FetchError::Api(status, _) => *status >= 500,
            FetchError::Parse(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Network("reset".to_string()).is_transient());
        assert!(FetchError::Timeout("10s".to_string()).is_transient());
        assert!(FetchError::RateLimited.is_transient());
        assert!(FetchError::Api(503, String::new()).is_transient());
        assert!(!FetchError::Api(400, String::new()).is_transient());
        assert!(!FetchError::Parse("bad json".to_string()).is_transient());
    }
}
