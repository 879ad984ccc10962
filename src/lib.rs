#![deny(missing_docs)]

//! Core library for the document summary service.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Text extraction from PDFs and images.
pub mod extraction;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Chunked summarization pipeline.
pub mod processing;
/// Persistence of documents and summaries.
pub mod store;
/// Remote summarization clients.
pub mod summarization;
