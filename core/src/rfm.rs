//! RFM scoring and customer segmentation — the core pipeline.
//!
//! This module:
//!   1. Aggregates order lines into per-customer Recency/Frequency/Monetary
//!   2. Ranks customers independently on each metric (dense ranking)
//!   3. Normalizes ranks to (0, 100] and blends them into a weighted score
//!   4. Assigns each customer one of five ordered segment tiers
//!   5. Summarizes distinct-customer counts per tier
//!
//! Ranking convention: DENSE. Tied values share a rank and the next distinct
//! value increments the rank by exactly 1, so the maximum rank equals the
//! number of distinct metric values. Competition and fractional-average
//! ranking would produce different scores on ties; the tie tests pin the
//! dense behavior down.
//!
//! The whole pipeline is a pure function of its input slice. Two phases, no
//! per-row mutable globals: build the per-customer aggregate map first, rank
//! across its values second.

use crate::{
    dataset::OrderLine,
    error::{AnalyticsError, AnalyticsResult},
    types::CustomerId,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// Metric weights for the composite score. Monetary dominates, frequency is
/// secondary, recency is least weighted.
const RECENCY_WEIGHT: f64 = 0.15;
const FREQUENCY_WEIGHT: f64 = 0.28;
const MONETARY_WEIGHT: f64 = 0.57;

/// Compresses the 0–100 weighted blend into the 0–5 band the segment
/// thresholds are written against.
const SCORE_SCALE: f64 = 0.05;

/// The segment ladder: `(lower_bound_exclusive, tier)`, evaluated top-down,
/// first match wins. Every bound is a strict `>`. Scores at or below the
/// last rung are lost customers.
const SEGMENT_LADDER: [(f64, Segment); 4] = [
    (4.5, Segment::Top),
    (4.0, Segment::HighValue),
    (3.0, Segment::MediumValue),
    (1.6, Segment::LowValue),
];

// ── Public types ─────────────────────────────────────────────────────────────

/// Customer-value tiers, ordered worst to best. The derived `Ord` is the
/// display and summary order; it is unrelated to the labels' alphabetical
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    #[serde(rename = "lost customers")]
    Lost,
    #[serde(rename = "Low value customers")]
    LowValue,
    #[serde(rename = "Medium value customer")]
    MediumValue,
    #[serde(rename = "High value customer")]
    HighValue,
    #[serde(rename = "Top customers")]
    Top,
}

impl Segment {
    /// All tiers, worst to best.
    pub const TIER_ORDER: [Segment; 5] = [
        Segment::Lost,
        Segment::LowValue,
        Segment::MediumValue,
        Segment::HighValue,
        Segment::Top,
    ];

    /// The display label. Casing and pluralization are part of the
    /// reporting contract and are intentionally uneven.
    pub fn label(self) -> &'static str {
        match self {
            Segment::Lost => "lost customers",
            Segment::LowValue => "Low value customers",
            Segment::MediumValue => "Medium value customer",
            Segment::HighValue => "High value customer",
            Segment::Top => "Top customers",
        }
    }

    /// Classify a (rounded) RFM score against the segment ladder.
    pub fn for_score(score: f64) -> Segment {
        SEGMENT_LADDER
            .iter()
            .find(|(bound, _)| score > *bound)
            .map(|(_, segment)| *segment)
            .unwrap_or(Segment::Lost)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One scored customer. `recency_days` counts whole days between the
/// dataset's reference timestamp (its maximum purchase timestamp) and this
/// customer's own latest purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerRfm {
    pub customer_id: CustomerId,
    pub recency_days: i64,
    pub frequency: u64,
    pub monetary: f64,
    pub r_rank_norm: f64,
    pub f_rank_norm: f64,
    pub m_rank_norm: f64,
    pub rfm_score: f64,
    pub segment: Segment,
}

/// Distinct-customer count for one tier. Summary rows come out in tier
/// order, worst to best.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SegmentSummary {
    pub segment: Segment,
    pub customer_count: u64,
}

// ── Pipeline ─────────────────────────────────────────────────────────────────

struct CustomerAggregate {
    last_purchase: chrono::NaiveDateTime,
    order_ids: HashSet<String>,
    monetary: f64,
}

/// Score and segment every customer in the supplied order lines.
///
/// Returns the per-customer table (sorted by customer id) and the
/// per-segment summary (sorted by tier). Fails with `EmptyInput` on an
/// empty slice: without rows there is no reference timestamp to measure
/// recency against.
pub fn compute_rfm(
    orders: &[OrderLine],
) -> AnalyticsResult<(Vec<CustomerRfm>, Vec<SegmentSummary>)> {
    let reference = orders
        .iter()
        .map(|line| line.purchased_at)
        .max()
        .ok_or(AnalyticsError::EmptyInput)?;

    // Phase 1: per-customer aggregates. BTreeMap keeps the output order
    // deterministic (sorted by customer id).
    let mut by_customer: BTreeMap<&str, CustomerAggregate> = BTreeMap::new();
    for line in orders {
        let aggregate = by_customer
            .entry(line.customer_id.as_str())
            .or_insert_with(|| CustomerAggregate {
                last_purchase: line.purchased_at,
                order_ids: HashSet::new(),
                monetary: 0.0,
            });
        if line.purchased_at > aggregate.last_purchase {
            aggregate.last_purchase = line.purchased_at;
        }
        aggregate.order_ids.insert(line.order_id.clone());
        aggregate.monetary += line.price;
    }

    let recency: Vec<i64> = by_customer
        .values()
        .map(|a| (reference - a.last_purchase).num_days())
        .collect();
    let frequency: Vec<u64> = by_customer
        .values()
        .map(|a| a.order_ids.len() as u64)
        .collect();
    let monetary: Vec<f64> = by_customer.values().map(|a| a.monetary).collect();

    // Phase 2: rank across the aggregate values. Recency is ranked
    // descending (largest gap gets rank 1) so that the most recent buyer
    // ends up with the largest normalized rank, like the other two metrics.
    let (r_ranks, r_max) = dense_ranks(&recency, RankOrder::Descending);
    let (f_ranks, f_max) = dense_ranks(&frequency, RankOrder::Ascending);
    let (m_ranks, m_max) = dense_ranks(&monetary, RankOrder::Ascending);

    let mut customers = Vec::with_capacity(by_customer.len());
    let mut tier_counts: BTreeMap<Segment, u64> = BTreeMap::new();

    for (i, (customer_id, _)) in by_customer.iter().enumerate() {
        let r_rank_norm = normalize_rank(r_ranks[i], r_max);
        let f_rank_norm = normalize_rank(f_ranks[i], f_max);
        let m_rank_norm = normalize_rank(m_ranks[i], m_max);

        let blended = RECENCY_WEIGHT * r_rank_norm
            + FREQUENCY_WEIGHT * f_rank_norm
            + MONETARY_WEIGHT * m_rank_norm;
        let rfm_score = round2(blended * SCORE_SCALE);
        let segment = Segment::for_score(rfm_score);

        *tier_counts.entry(segment).or_insert(0) += 1;

        customers.push(CustomerRfm {
            customer_id: customer_id.to_string(),
            recency_days: recency[i],
            frequency: frequency[i],
            monetary: monetary[i],
            r_rank_norm,
            f_rank_norm,
            m_rank_norm,
            rfm_score,
            segment,
        });
    }

    // BTreeMap iteration already follows the tier order.
    let summary: Vec<SegmentSummary> = tier_counts
        .into_iter()
        .map(|(segment, customer_count)| SegmentSummary {
            segment,
            customer_count,
        })
        .collect();

    log::debug!(
        "rfm: scored {} customers from {} order lines (reference={reference})",
        customers.len(),
        orders.len(),
    );

    Ok((customers, summary))
}

// ── Ranking ──────────────────────────────────────────────────────────────────

enum RankOrder {
    Ascending,
    Descending,
}

/// Dense-rank a value slice. Returns the per-value rank (1-based) and the
/// maximum rank, which equals the number of distinct values.
fn dense_ranks<T: PartialOrd + Copy>(values: &[T], order: RankOrder) -> (Vec<usize>, usize) {
    let mut distinct: Vec<T> = values.to_vec();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup_by(|a, b| a == b);
    let max_rank = distinct.len();

    let ranks = values
        .iter()
        .map(|value| {
            let position = distinct.partition_point(|d| d < value);
            match order {
                RankOrder::Ascending => position + 1,
                RankOrder::Descending => max_rank - position,
            }
        })
        .collect();

    (ranks, max_rank)
}

fn normalize_rank(rank: usize, max_rank: usize) -> f64 {
    (rank as f64 / max_rank as f64) * 100.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
