//! Vendor sales summary ETL.
//!
//! One aggregation query reconciles purchase, sales and freight line items
//! down to the vendor/brand grain, a cleaning pass derives the
//! profitability metrics, and the result is bulk-written back as the
//! `vendor_sales_summary` table.

pub mod db;
pub mod enrich;
pub mod error;
pub mod summary;

pub use error::SummaryError;
