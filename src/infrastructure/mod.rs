pub mod config;
pub mod error;
pub mod event_mapper;
pub mod feed_client;
pub mod logging;
