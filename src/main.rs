use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, EnvFilter};
use vendorsummary::{db, enrich, summary};

const DB_PATH: &str = "inventory.db";
const SUMMARY_TABLE: &str = "vendor_sales_summary";
const PREVIEW_ROWS: usize = 5;

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();
    info!("startup");

    // ─── 2) open source database ─────────────────────────────────────
    let conn =
        db::open_disk_db(DB_PATH).with_context(|| format!("opening database {DB_PATH}"))?;

    // ─── 3) aggregate purchases, sales and freight ───────────────────
    info!("creating vendor summary table");
    let start = Instant::now();
    let rows = summary::aggregate(&conn).inspect_err(|err| error!(%err, "aggregation failed"))?;
    info!(rows = rows.len(), elapsed = ?start.elapsed(), "aggregated");
    for row in rows.iter().take(PREVIEW_ROWS) {
        debug!(?row, "summary row");
    }

    // ─── 4) clean + derive metrics ───────────────────────────────────
    info!("cleaning data");
    let records = enrich::enrich(rows).inspect_err(|err| error!(%err, "cleaning failed"))?;
    for rec in records.iter().take(PREVIEW_ROWS) {
        debug!(?rec, "enriched row");
    }

    // ─── 5) ingest the replacement table ─────────────────────────────
    info!(table = SUMMARY_TABLE, "ingesting data");
    let written = db::ingest(&conn, SUMMARY_TABLE, &records, db::IngestMode::Replace)
        .inspect_err(|err| error!(%err, "ingest failed"))?;
    info!(rows = written, "completed");

    Ok(())
}
