use thiserror::Error;

/// Fatal failures of the summary pipeline. There is no retry path: every
/// variant is logged where it occurs and propagated to `main`, which exits
/// non-zero.
#[derive(Debug, Error)]
pub enum SummaryError {
    /// The source database could not be queried: connection gone, source
    /// table missing, or the aggregation statement failed to prepare.
    /// Nothing has been written at this point.
    #[error("source query failed: {source}")]
    Source {
        #[source]
        source: duckdb::Error,
    },

    /// A value that must be numeric could not be coerced. The in-memory
    /// batch is discarded; no partial table is written.
    #[error("cannot coerce {column} value {value:?} to a number")]
    DataType { column: &'static str, value: String },

    /// The write side rejected the ingest. The surrounding transaction is
    /// rolled back, so any prior table contents are left untouched.
    #[error("ingest into `{table}` failed: {source}")]
    Write {
        table: String,
        #[source]
        source: duckdb::Error,
    },
}
