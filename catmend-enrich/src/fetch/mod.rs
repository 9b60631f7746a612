//! Pass 2: rate-limited, retrying, cached metadata fetch

pub mod cache;
pub mod client;
pub mod rate_limiter;

pub use cache::MetadataCache;
pub use client::{FetchClient, FetchResolution, GoogleBooksClient, MetadataSource, RetryPolicy};
pub use rate_limiter::RateGate;
