//! Three-way rollup of purchases, sales and freight down to the
//! vendor/brand grain.
//!
//! Freight only exists per vendor, purchases and sales per vendor+brand, so
//! the query rolls each source up to its own grain first and then
//! left-joins sales and freight onto the purchase rollup. A vendor/brand
//! with purchases but no recorded sales must survive the join with absent
//! sales columns; those become zero later in [`crate::enrich`].

use crate::error::SummaryError;
use duckdb::types::Value;
use duckdb::Connection;
use tracing::debug;

/// One pre-enrichment row at the (vendor, brand, price point) grain.
///
/// The nullable columns produced by the left joins stay `Option` here so
/// that "no match" is distinguishable from a genuine zero until the
/// cleaning pass. `volume` is carried raw because the reference table
/// stores it as text in some source extracts.
#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub vendor_number: String,
    pub vendor_name: String,
    pub brand: String,
    pub description: String,
    pub purchase_price: f64,
    pub actual_price: f64,
    pub volume: Value,
    pub total_purchase_quantity: f64,
    pub total_purchase_dollars: f64,
    pub total_sales_quantity: Option<f64>,
    pub total_sales_dollars: Option<f64>,
    pub total_sales_price: Option<f64>,
    pub total_excise_tax: Option<f64>,
    pub freight_cost: Option<f64>,
}

/// One fully cleaned row of the `vendor_sales_summary` table, including the
/// four derived profitability metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct VendorRecord {
    pub vendor_number: String,
    pub vendor_name: String,
    pub brand: String,
    pub description: String,
    pub purchase_price: f64,
    pub actual_price: f64,
    pub volume: f64,
    pub total_purchase_quantity: f64,
    pub total_purchase_dollars: f64,
    pub total_sales_quantity: f64,
    pub total_sales_dollars: f64,
    pub total_sales_price: f64,
    pub total_excise_tax: f64,
    pub freight_cost: f64,
    pub gross_profit: f64,
    pub profit_margin: f64,
    pub stock_turnover: f64,
    pub sales_to_purchase_ratio: f64,
}

// Grouping PurchaseSummary on PurchasePrice (and the reference price and
// volume) is intentional: a brand bought at several historical prices under
// the same vendor yields one row per price point. The inner join to
// purchase_prices drops brands with no reference row; that narrowing is
// part of the report's contract. The trailing ORDER BY columns are a
// tiebreak so equal purchase totals come out in the same order every run.
const SUMMARY_QUERY: &str = "
WITH FreightSummary AS (
    SELECT VendorNumber, SUM(Freight) AS FreightCost
    FROM vendor_invoice
    GROUP BY VendorNumber
),
PurchaseSummary AS (
    SELECT
        p.VendorNumber,
        p.VendorName,
        p.Brand,
        p.Description,
        p.PurchasePrice,
        pp.Price AS ActualPrice,
        pp.Volume,
        SUM(p.Quantity) AS TotalPurchaseQuantity,
        SUM(p.Dollars) AS TotalPurchaseDollars
    FROM purchases p
    JOIN purchase_prices pp ON p.Brand = pp.Brand
    WHERE p.PurchasePrice > 0
    GROUP BY p.VendorNumber, p.VendorName, p.Brand, p.Description,
             p.PurchasePrice, pp.Price, pp.Volume
),
SalesSummary AS (
    SELECT
        VendorNo,
        Brand,
        SUM(SalesDollars) AS TotalSalesDollars,
        SUM(SalesPrice) AS TotalSalesPrice,
        SUM(SalesQuantity) AS TotalSalesQuantity,
        SUM(ExciseTax) AS TotalExciseTax
    FROM sales
    GROUP BY VendorNo, Brand
)
SELECT
    ps.VendorNumber,
    ps.VendorName,
    ps.Brand,
    ps.Description,
    ps.PurchasePrice,
    ps.ActualPrice,
    ps.Volume,
    ss.TotalSalesQuantity,
    ss.TotalSalesDollars,
    ss.TotalSalesPrice,
    ss.TotalExciseTax,
    ps.TotalPurchaseQuantity,
    ps.TotalPurchaseDollars,
    fs.FreightCost
FROM PurchaseSummary ps
LEFT JOIN SalesSummary ss
    ON ps.VendorNumber = ss.VendorNo AND ps.Brand = ss.Brand
LEFT JOIN FreightSummary fs
    ON ps.VendorNumber = fs.VendorNumber
ORDER BY ps.TotalPurchaseDollars DESC, ps.VendorNumber, ps.Brand
";

/// Run the summary query against `conn` and materialize every row.
///
/// Any connection, prepare or fetch failure maps to
/// [`SummaryError::Source`]; nothing has been written when that happens.
pub fn aggregate(conn: &Connection) -> Result<Vec<SummaryRow>, SummaryError> {
    let source_err = |source| SummaryError::Source { source };

    let mut stmt = conn.prepare(SUMMARY_QUERY).map_err(source_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(SummaryRow {
                vendor_number: row.get(0)?,
                vendor_name: row.get(1)?,
                brand: row.get(2)?,
                description: row.get(3)?,
                purchase_price: row.get(4)?,
                actual_price: row.get(5)?,
                volume: row.get(6)?,
                total_sales_quantity: row.get(7)?,
                total_sales_dollars: row.get(8)?,
                total_sales_price: row.get(9)?,
                total_excise_tax: row.get(10)?,
                total_purchase_quantity: row.get(11)?,
                total_purchase_dollars: row.get(12)?,
                freight_cost: row.get(13)?,
            })
        })
        .map_err(source_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(source_err)?;

    debug!(rows = rows.len(), "summary query materialized");
    Ok(rows)
}
