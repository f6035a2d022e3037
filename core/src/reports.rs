//! Supplementary order-history reports.
//!
//! This module:
//!   1. Rolls order lines up into daily order counts and revenue
//!   2. Counts quantity sold per product category (top-N)
//!   3. Counts distinct customers per state
//!   4. Breaks order lines down by order status
//!   5. Measures purchase-to-delivery times
//!
//! Like the RFM pipeline, every builder is a pure function over the rows it
//! is handed; date-range filtering happens before the call. Rows missing an
//! optional column are skipped by the one report that needs that column and
//! by no other.

use crate::dataset::OrderLine;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

// ── Public types ─────────────────────────────────────────────────────────────

/// Distinct orders and revenue for one calendar day of purchases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyOrders {
    pub date: NaiveDate,
    pub order_count: u64,
    pub revenue: f64,
}

/// Order-line count for one product category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySales {
    pub category: String,
    pub quantity_sold: u64,
}

/// Distinct-customer count for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateCustomers {
    pub state: String,
    pub customer_count: u64,
}

/// Order-line count for one order status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusBreakdown {
    pub status: String,
    pub line_count: u64,
}

/// Purchase-to-delivery durations, one entry per delivered order, in whole
/// days (sub-day components truncated).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryStats {
    pub durations_days: Vec<i64>,
    pub mean_days: f64,
}

// ── Builders ─────────────────────────────────────────────────────────────────

/// Daily order counts and revenue, ascending by purchase date. Orders are
/// counted distinctly; revenue sums every line's price.
pub fn daily_orders(orders: &[OrderLine]) -> Vec<DailyOrders> {
    let mut by_date: BTreeMap<NaiveDate, (HashSet<&str>, f64)> = BTreeMap::new();
    for line in orders {
        let (order_ids, revenue) = by_date
            .entry(line.purchased_at.date())
            .or_insert_with(|| (HashSet::new(), 0.0));
        order_ids.insert(line.order_id.as_str());
        *revenue += line.price;
    }

    by_date
        .into_iter()
        .map(|(date, (order_ids, revenue))| DailyOrders {
            date,
            order_count: order_ids.len() as u64,
            revenue,
        })
        .collect()
}

/// Quantity sold per product category, descending, capped to `top_n`.
/// Ties break alphabetically so the cut is deterministic. Lines without a
/// category are skipped.
pub fn category_sales(orders: &[OrderLine], top_n: usize) -> Vec<CategorySales> {
    let mut by_category: HashMap<&str, u64> = HashMap::new();
    for line in orders {
        if let Some(category) = line.product_category.as_deref() {
            *by_category.entry(category).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<CategorySales> = by_category
        .into_iter()
        .map(|(category, quantity_sold)| CategorySales {
            category: category.to_string(),
            quantity_sold,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.quantity_sold
            .cmp(&a.quantity_sold)
            .then_with(|| a.category.cmp(&b.category))
    });
    rows.truncate(top_n);
    rows
}

/// Distinct customers per state, descending by count. Lines without a state
/// are skipped.
pub fn customers_by_state(orders: &[OrderLine]) -> Vec<StateCustomers> {
    let mut by_state: HashMap<&str, HashSet<&str>> = HashMap::new();
    for line in orders {
        if let Some(state) = line.customer_state.as_deref() {
            by_state
                .entry(state)
                .or_default()
                .insert(line.customer_id.as_str());
        }
    }

    let mut rows: Vec<StateCustomers> = by_state
        .into_iter()
        .map(|(state, customers)| StateCustomers {
            state: state.to_string(),
            customer_count: customers.len() as u64,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.customer_count
            .cmp(&a.customer_count)
            .then_with(|| a.state.cmp(&b.state))
    });
    rows
}

/// Order-line counts per order status, descending by count. Lines without a
/// status are skipped.
pub fn status_breakdown(orders: &[OrderLine]) -> Vec<StatusBreakdown> {
    let mut by_status: HashMap<&str, u64> = HashMap::new();
    for line in orders {
        if let Some(status) = line.status.as_deref() {
            *by_status.entry(status).or_insert(0) += 1;
        }
    }

    let mut rows: Vec<StatusBreakdown> = by_status
        .into_iter()
        .map(|(status, line_count)| StatusBreakdown {
            status: status.to_string(),
            line_count,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.line_count
            .cmp(&a.line_count)
            .then_with(|| a.status.cmp(&b.status))
    });
    rows
}

/// Purchase-to-delivery durations per delivered order. Undelivered orders
/// are excluded here and only here. The first line seen for an order
/// supplies its timestamps; lines of one order share them.
pub fn delivery_stats(orders: &[OrderLine]) -> DeliveryStats {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut durations_days = Vec::new();
    for line in orders {
        if !seen.insert(line.order_id.as_str()) {
            continue;
        }
        if let Some(delivered_at) = line.delivered_at {
            durations_days.push((delivered_at - line.purchased_at).num_days());
        }
    }

    let mean_days = if durations_days.is_empty() {
        0.0
    } else {
        durations_days.iter().sum::<i64>() as f64 / durations_days.len() as f64
    };

    DeliveryStats {
        durations_days,
        mean_days,
    }
}
