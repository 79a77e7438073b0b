pub mod config;
pub mod consolidation;
pub mod db;
pub mod discovery;
pub mod error;
pub mod event_filter;
pub mod events;
pub mod frame;
pub mod grouping;
pub mod ingestion;
pub mod normalizer;
pub mod store;
pub mod types;

pub use senslog_parser::{LongRecord, ParameterKey};
