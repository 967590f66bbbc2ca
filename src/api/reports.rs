//! Revenue reports

use anyhow::{Context, Result};
use chrono::NaiveDate;

use super::client::AdminClient;
use super::query_string;
use crate::models::{format_price, RevenueReport};

const BAR_WIDTH: usize = 30;

pub async fn revenue_report(client: &AdminClient, from: NaiveDate, to: NaiveDate) -> Result<()> {
    anyhow::ensure!(from <= to, "Report range ends before it starts");

    let path = format!(
        "/reports/revenue{}",
        query_string(&[
            ("from", Some(from.to_string())),
            ("to", Some(to.to_string())),
        ])
    );
    let report: RevenueReport = client
        .get(&path)
        .await
        .context("Failed to fetch revenue report")?;

    println!("\nRevenue {} .. {}", from, to);
    println!("{:-<60}", "");
    println!("  Total revenue: {}", format_price(report.total_revenue));
    println!("  Tickets sold:  {}", report.tickets_sold);
    if report.trips > 0 {
        println!("  Trips:         {}", report.trips);
    }

    if !report.daily.is_empty() {
        println!();
        let peak = report
            .daily
            .iter()
            .map(|d| d.revenue)
            .fold(0.0_f64, f64::max);
        for day in &report.daily {
            println!(
                "  {} {:<width$} {}",
                day.date.format("%d/%m"),
                bar(day.revenue, peak),
                format_price(day.revenue),
                width = BAR_WIDTH
            );
        }
    }
    Ok(())
}

/// Proportional text bar; the peak day fills the whole width.
fn bar(value: f64, peak: f64) -> String {
    if peak <= 0.0 || value <= 0.0 {
        return String::new();
    }
    let len = ((value / peak) * BAR_WIDTH as f64).round() as usize;
    "#".repeat(len.clamp(1, BAR_WIDTH))
}
