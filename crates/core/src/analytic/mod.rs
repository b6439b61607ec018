//! Analytic accounting projections of folders.

pub mod aggregator;
pub mod ports;

pub use aggregator::{AnalyticDistributionAggregator, AnalyticSummary, Balance, InvoiceCounts};
