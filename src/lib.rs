pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod dispatcher;
pub mod extractor;
pub mod fetcher;
pub mod health;
