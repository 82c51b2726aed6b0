//! Buckettail - S3 access log ingestion and enrichment library.

pub mod agent;
pub mod config;
pub mod geo;
pub mod ingest;
pub mod object_store;
pub mod parser;
pub mod report;
pub mod store;
pub mod types;
