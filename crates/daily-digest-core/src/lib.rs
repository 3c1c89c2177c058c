//! # Daily Digest Core
//!
//! Shared, I/O-free logic for Daily Digest: report data models, the
//! identifier codec, the channel registry, and Markdown metadata
//! extraction.
//!
//! This crate contains no tokio, reqwest, filesystem I/O, or environment
//! lookups. Everything here is a pure function of its inputs.

pub mod channel;
pub mod extract;
pub mod models;
pub mod slug;

pub use channel::{Channel, ChannelConfig};
pub use extract::{DailyReportExtractor, Metadata, MetadataExtractor};
pub use models::{sort_reports, ReportDate, ReportDetail, ReportSummary};
pub use slug::SlugError;
