//! Cleaning pass over the aggregated rows: type coercion, zero-fill of the
//! left-join gaps, whitespace trimming, and the derived profitability
//! metrics.

use crate::error::SummaryError;
use crate::summary::{SummaryRow, VendorRecord};
use duckdb::types::Value;
use tracing::debug;

/// Turn every [`SummaryRow`] into a finished [`VendorRecord`].
///
/// The only fallible step is the `volume` coercion; a single bad value
/// fails the whole batch so no partial report can reach the write phase.
/// Division by zero in the metrics follows IEEE-754 semantics: a record
/// with no sales gets an infinite or NaN margin rather than a fabricated
/// zero.
pub fn enrich(rows: Vec<SummaryRow>) -> Result<Vec<VendorRecord>, SummaryError> {
    let records = rows
        .into_iter()
        .map(finalize_row)
        .collect::<Result<Vec<_>, _>>()?;
    debug!(records = records.len(), "cleaning pass finished");
    Ok(records)
}

fn finalize_row(row: SummaryRow) -> Result<VendorRecord, SummaryError> {
    let volume = coerce_volume(&row.volume)?;

    // Absent joins become genuine zeroes from here on.
    let total_sales_quantity = row.total_sales_quantity.unwrap_or(0.0);
    let total_sales_dollars = row.total_sales_dollars.unwrap_or(0.0);
    let total_sales_price = row.total_sales_price.unwrap_or(0.0);
    let total_excise_tax = row.total_excise_tax.unwrap_or(0.0);
    let freight_cost = row.freight_cost.unwrap_or(0.0);

    let gross_profit = total_sales_dollars - row.total_purchase_dollars;

    Ok(VendorRecord {
        vendor_number: row.vendor_number,
        vendor_name: row.vendor_name.trim().to_string(),
        brand: row.brand,
        description: row.description.trim().to_string(),
        purchase_price: row.purchase_price,
        actual_price: row.actual_price,
        volume,
        total_purchase_quantity: row.total_purchase_quantity,
        total_purchase_dollars: row.total_purchase_dollars,
        total_sales_quantity,
        total_sales_dollars,
        total_sales_price,
        total_excise_tax,
        freight_cost,
        gross_profit,
        profit_margin: gross_profit / total_sales_dollars * 100.0,
        stock_turnover: total_sales_quantity / row.total_purchase_quantity,
        sales_to_purchase_ratio: total_sales_dollars / row.total_purchase_dollars,
    })
}

/// Coerce the raw `Volume` column to `f64`. Some source extracts store it
/// as text, so numeric strings are accepted; anything else is a
/// [`SummaryError::DataType`] and aborts the run.
fn coerce_volume(raw: &Value) -> Result<f64, SummaryError> {
    match raw {
        Value::Double(v) => Ok(*v),
        Value::Float(v) => Ok(f64::from(*v)),
        Value::TinyInt(v) => Ok(f64::from(*v)),
        Value::SmallInt(v) => Ok(f64::from(*v)),
        Value::Int(v) => Ok(f64::from(*v)),
        Value::BigInt(v) => Ok(*v as f64),
        Value::UTinyInt(v) => Ok(f64::from(*v)),
        Value::USmallInt(v) => Ok(f64::from(*v)),
        Value::UInt(v) => Ok(f64::from(*v)),
        Value::UBigInt(v) => Ok(*v as f64),
        // The inner join keeps NULL volumes out of the result; if the
        // driver hands one back anyway it falls under the blanket
        // fill-missing-with-zero rule.
        Value::Null => Ok(0.0),
        Value::Text(s) => s.trim().parse::<f64>().map_err(|_| SummaryError::DataType {
            column: "Volume",
            value: s.clone(),
        }),
        other => Err(SummaryError::DataType {
            column: "Volume",
            value: format!("{other:?}"),
        }),
    }
}
