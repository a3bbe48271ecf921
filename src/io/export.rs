//! CSV export of the current view: buckets, monthly report, service orders.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::orders::ServiceOrder;
use crate::sim::classify::Thresholds;
use crate::sim::kpi::{MonthReport, PerformanceMetric, PerformanceRatio};
use crate::sim::types::Bucket;

/// Column header for bucket export.
const BUCKET_HEADER: &str = "start,end,granularity,expected_kwh,actual_kwh,performance_pct,status";

/// Column header for the monthly report export.
const REPORT_HEADER: [&str; 5] = [
    "Date",
    "Performance (%)",
    "Expected (kWh)",
    "Actual (kWh)",
    "Irradiance (W/m²)",
];

const ORDER_HEADER: &str =
    "id,title,equipment,priority,status,created_at,scheduled_at,assignee,description";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Exports buckets to a CSV file at the given path.
///
/// # Arguments
///
/// * `buckets` - Buckets of one aggregation
/// * `thresholds` - Performance thresholds for the status column
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_buckets_csv(buckets: &[Bucket], thresholds: Thresholds, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_buckets_csv(buckets, thresholds, io::BufWriter::new(file))
}

/// Writes buckets as CSV to any writer.
///
/// N/A ratios leave the performance and status columns empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_buckets_csv(
    buckets: &[Bucket],
    thresholds: Thresholds,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(BUCKET_HEADER.split(','))?;

    for b in buckets {
        let metric = PerformanceMetric::from_bucket(b, thresholds);
        wtr.write_record(&[
            b.start.format(TIMESTAMP_FORMAT).to_string(),
            b.end.format(TIMESTAMP_FORMAT).to_string(),
            b.granularity.to_string(),
            format!("{:.4}", b.expected_kwh),
            format!("{:.4}", b.actual_kwh),
            metric
                .ratio
                .percent()
                .map(|p| format!("{p:.2}"))
                .unwrap_or_default(),
            metric.status.map(|s| s.to_string()).unwrap_or_default(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a monthly report to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_report_csv(report: &MonthReport, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_report_csv(report, io::BufWriter::new(file))
}

/// Writes a monthly report as CSV: header, one row per day, then a
/// `Total/Average (<Month>/<year>)` summary row.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_report_csv(report: &MonthReport, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(REPORT_HEADER)?;

    for r in &report.rows {
        wtr.write_record(&[
            r.date.format("%d/%m/%Y").to_string(),
            rounded_percent(r.performance),
            format!("{:.1}", r.expected_kwh),
            format!("{:.1}", r.actual_kwh),
            format!("{:.0}", r.irradiance_w_m2),
        ])?;
    }

    let s = &report.summary;
    wtr.write_record(&[
        format!("Total/Average ({})", report.label()),
        rounded_percent(s.performance),
        format!("{:.1}", s.total_expected_kwh),
        format!("{:.1}", s.total_actual_kwh),
        format!("{:.0}", s.mean_irradiance_w_m2),
    ])?;

    wtr.flush()?;
    Ok(())
}

/// Exports service orders to a CSV file at the given path.
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_orders_csv<'a>(
    orders: impl IntoIterator<Item = &'a ServiceOrder>,
    path: &Path,
) -> io::Result<()> {
    let file = File::create(path)?;
    write_orders_csv(orders, io::BufWriter::new(file))
}

/// Writes service orders as CSV; an unassigned order has an empty assignee.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_orders_csv<'a>(
    orders: impl IntoIterator<Item = &'a ServiceOrder>,
    writer: impl Write,
) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);
    wtr.write_record(ORDER_HEADER.split(','))?;

    for o in orders {
        let created = o.created_at.format(TIMESTAMP_FORMAT).to_string();
        let scheduled = o.scheduled_at.format(TIMESTAMP_FORMAT).to_string();
        wtr.write_record([
            o.id.as_str(),
            o.title.as_str(),
            o.equipment.as_str(),
            o.priority.as_str(),
            o.status.as_str(),
            created.as_str(),
            scheduled.as_str(),
            o.assignee.as_deref().unwrap_or(""),
            o.description.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

fn rounded_percent(ratio: PerformanceRatio) -> String {
    ratio
        .rounded()
        .map_or_else(|| "N/A".to_string(), |p| p.to_string())
}
