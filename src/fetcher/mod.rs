pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub use client::MockFetcher;
pub use client::{Fetcher, FetcherConfig, HttpFetcher};
pub use errors::FetchError;
pub use types::{FetchMode, FetchResponse, FetchedBody};
