//! report-runner: headless analytics runner for shopmetrics.
//!
//! Usage:
//!   report-runner --data orders.csv
//!   report-runner --data orders.csv --from 2017-01-01 --to 2017-12-31 --top 10
//!   report-runner --data orders.csv --json

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use shopmetrics_core::{
    compute_rfm, filter_date_range, load_orders_file,
    reports::{
        category_sales, customers_by_state, daily_orders, delivery_stats, status_breakdown,
        CategorySales, DailyOrders, DeliveryStats, StateCustomers, StatusBreakdown,
    },
    CustomerRfm, SegmentSummary,
};
use std::env;

#[derive(serde::Serialize)]
struct ReportBundle {
    window_from: NaiveDate,
    window_to: NaiveDate,
    customers: Vec<CustomerRfm>,
    segments: Vec<SegmentSummary>,
    daily_orders: Vec<DailyOrders>,
    category_sales: Vec<CategorySales>,
    customers_by_state: Vec<StateCustomers>,
    status_breakdown: Vec<StatusBreakdown>,
    delivery: DeliveryStats,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(data_path) = arg_value(&args, "--data") else {
        eprintln!(
            "Usage: report-runner --data <orders.csv> \
             [--from YYYY-MM-DD] [--to YYYY-MM-DD] [--top N] [--json]"
        );
        bail!("--data is required");
    };
    let top_n = parse_arg(&args, "--top", 5usize);
    let json_mode = args.iter().any(|a| a == "--json");

    let orders = load_orders_file(&data_path)
        .with_context(|| format!("loading '{data_path}'"))?;
    if orders.is_empty() {
        bail!("'{data_path}' contains no order lines");
    }

    // The window defaults to the dataset's own bounds, the way the original
    // dashboard seeded its date picker.
    let data_min = orders
        .iter()
        .map(|line| line.purchased_at.date())
        .min()
        .context("dataset has no purchase dates")?;
    let data_max = orders
        .iter()
        .map(|line| line.purchased_at.date())
        .max()
        .context("dataset has no purchase dates")?;

    let from = match arg_value(&args, "--from") {
        Some(raw) => parse_date(&raw)?,
        None => data_min,
    };
    let to = match arg_value(&args, "--to") {
        Some(raw) => parse_date(&raw)?,
        None => data_max,
    };
    if from > to {
        bail!("--from {from} is after --to {to}");
    }

    let filtered = filter_date_range(&orders, from, to);
    if filtered.is_empty() {
        bail!("no order lines purchased between {from} and {to}");
    }
    log::info!(
        "analyzing {} of {} order lines ({from} ..= {to})",
        filtered.len(),
        orders.len(),
    );

    let (customers, segments) = compute_rfm(&filtered)?;
    let bundle = ReportBundle {
        window_from: from,
        window_to: to,
        daily_orders: daily_orders(&filtered),
        category_sales: category_sales(&filtered, top_n),
        customers_by_state: customers_by_state(&filtered),
        status_breakdown: status_breakdown(&filtered),
        delivery: delivery_stats(&filtered),
        customers,
        segments,
    };

    if json_mode {
        println!("{}", serde_json::to_string(&bundle)?);
    } else {
        print_summary(&data_path, filtered.len(), &bundle, top_n);
    }

    Ok(())
}

fn print_summary(data_path: &str, line_count: usize, bundle: &ReportBundle, top_n: usize) {
    println!("=== DATASET ===");
    println!("  file:        {data_path}");
    println!("  order lines: {line_count}");
    println!("  window:      {} ..= {}", bundle.window_from, bundle.window_to);

    let total_orders: u64 = bundle.daily_orders.iter().map(|d| d.order_count).sum();
    let total_revenue: f64 = bundle.daily_orders.iter().map(|d| d.revenue).sum();
    println!();
    println!("=== DAILY ORDERS ===");
    println!("  days with orders: {}", bundle.daily_orders.len());
    println!("  total orders:     {total_orders}");
    println!("  total revenue:    ${total_revenue:.2}");
    if let Some(busiest) = bundle
        .daily_orders
        .iter()
        .max_by_key(|d| d.order_count)
    {
        println!(
            "  busiest day:      {} ({} orders, ${:.2})",
            busiest.date, busiest.order_count, busiest.revenue
        );
    }

    println!();
    println!("=== RFM SEGMENTS ===");
    for row in &bundle.segments {
        println!("  {:<22} {:>6}", row.segment.label(), row.customer_count);
    }

    println!();
    println!("=== TOP CUSTOMERS BY RFM SCORE ===");
    let mut ranked: Vec<&CustomerRfm> = bundle.customers.iter().collect();
    ranked.sort_by(|a, b| {
        b.rfm_score
            .partial_cmp(&a.rfm_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.customer_id.cmp(&b.customer_id))
    });
    for customer in ranked.iter().take(top_n) {
        println!(
            "  {} | score: {:.2} | R: {}d F: {} M: ${:.2} | {}",
            customer.customer_id,
            customer.rfm_score,
            customer.recency_days,
            customer.frequency,
            customer.monetary,
            customer.segment,
        );
    }

    if !bundle.category_sales.is_empty() {
        println!();
        println!("=== TOP-SELLING CATEGORIES ===");
        for row in &bundle.category_sales {
            println!("  {:<32} {:>6}", row.category, row.quantity_sold);
        }
    }

    if !bundle.customers_by_state.is_empty() {
        println!();
        println!("=== CUSTOMERS BY STATE ===");
        for row in &bundle.customers_by_state {
            println!("  {:<8} {:>6}", row.state, row.customer_count);
        }
    }

    if !bundle.status_breakdown.is_empty() {
        println!();
        println!("=== ORDER STATUS ===");
        for row in &bundle.status_breakdown {
            println!("  {:<16} {:>6}", row.status, row.line_count);
        }
    }

    if !bundle.delivery.durations_days.is_empty() {
        println!();
        println!("=== DELIVERY ===");
        println!("  delivered orders: {}", bundle.delivery.durations_days.len());
        println!("  mean days:        {:.1}", bundle.delivery.mean_days);
    }
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].clone())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .with_context(|| format!("invalid date '{raw}', expected YYYY-MM-DD"))
}
