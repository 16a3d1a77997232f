//! DuckDB connection helpers and the bulk table-write used to persist the
//! enriched summary.

use crate::error::SummaryError;
use crate::summary::VendorRecord;
use anyhow::Result;
use duckdb::{Connection, ToSql};
use std::path::Path;
use tracing::info;

/// Open a database on disk at `path`, creating the file if it doesn't exist.
pub fn open_disk_db(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path.as_ref())?;
    Ok(conn)
}

/// Open an in-memory database.
pub fn open_mem_db() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    Ok(conn)
}

/// Whether [`ingest`] replaces the target table or appends to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    Replace,
    Append,
}

/// Persist `records` as `table`, returning the number of rows written.
///
/// The whole write (drop, create, append) runs inside one transaction: if
/// any step fails the transaction rolls back and whatever table existed
/// before is left untouched. Failures surface as [`SummaryError::Write`].
pub fn ingest(
    conn: &Connection,
    table: &str,
    records: &[VendorRecord],
    mode: IngestMode,
) -> Result<usize, SummaryError> {
    let write_err = |source| SummaryError::Write {
        table: table.to_string(),
        source,
    };

    conn.execute_batch("BEGIN TRANSACTION").map_err(write_err)?;
    match write_records(conn, table, records, mode) {
        Ok(written) => {
            conn.execute_batch("COMMIT").map_err(write_err)?;
            info!(table, rows = written, "ingested");
            Ok(written)
        }
        Err(err) => {
            // Best effort; the connection may already be unusable.
            let _ = conn.execute_batch("ROLLBACK");
            Err(err)
        }
    }
}

fn write_records(
    conn: &Connection,
    table: &str,
    records: &[VendorRecord],
    mode: IngestMode,
) -> Result<usize, SummaryError> {
    let write_err = |source| SummaryError::Write {
        table: table.to_string(),
        source,
    };

    if mode == IngestMode::Replace {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS {table}"))
            .map_err(write_err)?;
    }
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            VendorNumber VARCHAR,
            VendorName VARCHAR,
            Brand VARCHAR,
            Description VARCHAR,
            PurchasePrice DOUBLE,
            ActualPrice DOUBLE,
            Volume DOUBLE,
            TotalPurchaseQuantity DOUBLE,
            TotalPurchaseDollars DOUBLE,
            TotalSalesQuantity DOUBLE,
            TotalSalesDollars DOUBLE,
            TotalSalesPrice DOUBLE,
            TotalExciseTax DOUBLE,
            FreightCost DOUBLE,
            GrossProfit DOUBLE,
            ProfitMargin DOUBLE,
            StockTurnover DOUBLE,
            SalesToPurchaseRatio DOUBLE
        )"
    ))
    .map_err(write_err)?;

    let mut appender = conn.appender(table).map_err(write_err)?;
    appender
        .append_rows(records.iter().map(|r| {
            [
                &r.vendor_number as &dyn ToSql,
                &r.vendor_name as &dyn ToSql,
                &r.brand as &dyn ToSql,
                &r.description as &dyn ToSql,
                &r.purchase_price as &dyn ToSql,
                &r.actual_price as &dyn ToSql,
                &r.volume as &dyn ToSql,
                &r.total_purchase_quantity as &dyn ToSql,
                &r.total_purchase_dollars as &dyn ToSql,
                &r.total_sales_quantity as &dyn ToSql,
                &r.total_sales_dollars as &dyn ToSql,
                &r.total_sales_price as &dyn ToSql,
                &r.total_excise_tax as &dyn ToSql,
                &r.freight_cost as &dyn ToSql,
                &r.gross_profit as &dyn ToSql,
                &r.profit_margin as &dyn ToSql,
                &r.stock_turnover as &dyn ToSql,
                &r.sales_to_purchase_ratio as &dyn ToSql,
            ]
        }))
        .map_err(write_err)?;
    appender.flush().map_err(write_err)?;

    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    fn sample_record(vendor: &str, dollars: f64) -> VendorRecord {
        VendorRecord {
            vendor_number: vendor.to_string(),
            vendor_name: "Acme".to_string(),
            brand: "B1".to_string(),
            description: "Gin 1L".to_string(),
            purchase_price: 10.0,
            actual_price: 12.0,
            volume: 750.0,
            total_purchase_quantity: 5.0,
            total_purchase_dollars: dollars,
            total_sales_quantity: 4.0,
            total_sales_dollars: 80.0,
            total_sales_price: 20.0,
            total_excise_tax: 2.0,
            freight_cost: 10.0,
            gross_profit: 80.0 - dollars,
            profit_margin: (80.0 - dollars) / 80.0 * 100.0,
            stock_turnover: 0.8,
            sales_to_purchase_ratio: 80.0 / dollars,
        }
    }

    fn count(conn: &Connection, table: &str) -> Result<i64> {
        let n = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?;
        Ok(n)
    }

    #[test]
    fn replace_mode_overwrites_prior_contents() -> Result<()> {
        let conn = open_mem_db()?;
        let records = vec![sample_record("V1", 50.0), sample_record("V2", 40.0)];

        let written = ingest(&conn, "vendor_sales_summary", &records, IngestMode::Replace)?;
        assert_eq!(written, 2);
        assert_eq!(count(&conn, "vendor_sales_summary")?, 2);

        // A second replace run must not accumulate rows.
        ingest(&conn, "vendor_sales_summary", &records, IngestMode::Replace)?;
        assert_eq!(count(&conn, "vendor_sales_summary")?, 2);
        Ok(())
    }

    #[test]
    fn append_mode_accumulates_rows() -> Result<()> {
        let conn = open_mem_db()?;
        let records = vec![sample_record("V1", 50.0)];

        ingest(&conn, "vendor_sales_summary", &records, IngestMode::Replace)?;
        ingest(&conn, "vendor_sales_summary", &records, IngestMode::Append)?;
        assert_eq!(count(&conn, "vendor_sales_summary")?, 2);
        Ok(())
    }

    #[test]
    fn written_values_read_back_intact() -> Result<()> {
        let conn = open_mem_db()?;
        ingest(
            &conn,
            "vendor_sales_summary",
            &[sample_record("V1", 50.0)],
            IngestMode::Replace,
        )?;

        let (vendor, dollars, margin): (String, f64, f64) = conn.query_row(
            "SELECT VendorNumber, TotalPurchaseDollars, ProfitMargin
             FROM vendor_sales_summary",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )?;
        assert_eq!(vendor, "V1");
        assert_eq!(dollars, 50.0);
        assert_eq!(margin, 30.0 / 80.0 * 100.0);
        Ok(())
    }

    #[test]
    fn invalid_table_name_surfaces_as_write_error() {
        let conn = open_mem_db().unwrap();
        let err = ingest(&conn, "bad summary", &[], IngestMode::Replace).unwrap_err();
        assert!(matches!(err, SummaryError::Write { .. }));
    }

    #[test]
    fn disk_backed_database_round_trips() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("inventory.db");

        let conn = open_disk_db(&path)?;
        ingest(
            &conn,
            "vendor_sales_summary",
            &[sample_record("V1", 50.0)],
            IngestMode::Replace,
        )?;
        drop(conn);

        let reopened = open_disk_db(&path)?;
        assert_eq!(count(&reopened, "vendor_sales_summary")?, 1);
        Ok(())
    }
}
