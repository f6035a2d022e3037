//! Order-line dataset loading and filtering.
//!
//! This module:
//!   1. Parses the merged order-line CSV into typed `OrderLine` rows
//!   2. Rejects malformed timestamps/prices instead of coercing them
//!   3. Reports absent required columns before touching any row
//!   4. Applies the caller-chosen inclusive purchase-date window
//!
//! A malformed row aborts the whole load. Skipping rows silently would skew
//! every ranking computed downstream, so the loader never does it.

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    types::{CustomerId, OrderId},
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Columns every input file must carry. Checked against the header row
/// up front so the caller gets a column-level error, not a row-level one.
const REQUIRED_COLUMNS: [&str; 4] = [
    "customer_unique_id",
    "order_id",
    "order_purchase_timestamp",
    "price",
];

/// Timestamp formats accepted for the purchase and delivery columns.
/// A date-only value is taken as midnight.
const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

// ── Public types ─────────────────────────────────────────────────────────────

/// One order line: a single item row of the merged order history.
/// Multiple lines share an `order_id`; multiple orders share a `customer_id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLine {
    pub customer_id:      CustomerId,
    pub order_id:         OrderId,
    pub purchased_at:     NaiveDateTime,
    pub price:            f64,
    pub status:           Option<String>,
    pub delivered_at:     Option<NaiveDateTime>,
    pub product_category: Option<String>,
    pub customer_state:   Option<String>,
}

/// Raw CSV shape. Everything comes in as text; parsing and validation
/// happen in `to_order_line` so errors can name the row and column.
#[derive(Debug, Deserialize)]
struct RawOrderRecord {
    customer_unique_id: String,
    order_id: String,
    order_purchase_timestamp: String,
    price: String,
    #[serde(default)]
    order_status: Option<String>,
    #[serde(default)]
    order_delivered_customer_date: Option<String>,
    #[serde(default)]
    product_category_name: Option<String>,
    #[serde(default)]
    customer_state: Option<String>,
}

impl RawOrderRecord {
    fn to_order_line(&self, row: usize) -> AnalyticsResult<OrderLine> {
        let customer_id = self.customer_unique_id.trim();
        if customer_id.is_empty() {
            return Err(AnalyticsError::MalformedInput {
                row,
                column: "customer_unique_id",
                value: self.customer_unique_id.clone(),
            });
        }

        let order_id = self.order_id.trim();
        if order_id.is_empty() {
            return Err(AnalyticsError::MalformedInput {
                row,
                column: "order_id",
                value: self.order_id.clone(),
            });
        }

        let purchased_at =
            parse_timestamp(&self.order_purchase_timestamp).ok_or_else(|| {
                AnalyticsError::MalformedInput {
                    row,
                    column: "order_purchase_timestamp",
                    value: self.order_purchase_timestamp.clone(),
                }
            })?;

        let price: f64 = self.price.trim().parse().map_err(|_| {
            AnalyticsError::MalformedInput {
                row,
                column: "price",
                value: self.price.clone(),
            }
        })?;
        if !price.is_finite() || price < 0.0 {
            return Err(AnalyticsError::MalformedInput {
                row,
                column: "price",
                value: self.price.clone(),
            });
        }

        // The delivery timestamp is optional, but when present it must parse.
        let delivered_at = match self.order_delivered_customer_date.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| {
                AnalyticsError::MalformedInput {
                    row,
                    column: "order_delivered_customer_date",
                    value: raw.to_string(),
                }
            })?),
        };

        Ok(OrderLine {
            customer_id: customer_id.to_string(),
            order_id: order_id.to_string(),
            purchased_at,
            price,
            status: non_empty(self.order_status.as_deref()),
            delivered_at,
            product_category: non_empty(self.product_category_name.as_deref()),
            customer_state: non_empty(self.customer_state.as_deref()),
        })
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

/// Load order lines from any CSV reader.
///
/// An empty file (headers only) loads to an empty vec; deciding whether
/// that is an error is left to the computation being fed.
pub fn load_orders<R: Read>(reader: R) -> AnalyticsResult<Vec<OrderLine>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = csv_reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(AnalyticsError::MissingField {
                column: column.to_string(),
            });
        }
    }

    let mut orders = Vec::new();
    for (i, result) in csv_reader.deserialize().enumerate() {
        // Header is line 1, so the first record is line 2.
        let row = i + 2;
        let raw: RawOrderRecord = result?;
        orders.push(raw.to_order_line(row)?);
    }

    log::debug!("dataset: loaded {} order lines", orders.len());
    Ok(orders)
}

/// Load order lines from a CSV file on disk.
pub fn load_orders_file(path: &str) -> AnalyticsResult<Vec<OrderLine>> {
    let file = std::fs::File::open(path)?;
    load_orders(file)
}

// ── Filtering ────────────────────────────────────────────────────────────────

/// Restrict order lines to an inclusive purchase-date window.
///
/// Filtering is the caller's concern, never the RFM engine's: the engine's
/// reference timestamp must be the maximum of whatever subset it is handed.
pub fn filter_date_range(
    orders: &[OrderLine],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<OrderLine> {
    let filtered: Vec<OrderLine> = orders
        .iter()
        .filter(|line| {
            let date = line.purchased_at.date();
            date >= from && date <= to
        })
        .cloned()
        .collect();

    log::debug!(
        "dataset: date window {from}..={to} kept {} of {} lines",
        filtered.len(),
        orders.len(),
    );
    filtered
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    // Date-only values are valid and mean midnight.
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn non_empty(value: Option<&str>) -> Option<String> {
    match value {
        None => None,
        Some(s) if s.trim().is_empty() => None,
        Some(s) => Some(s.trim().to_string()),
    }
}
