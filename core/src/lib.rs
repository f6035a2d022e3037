//! shopmetrics-core: order-line analytics library.
//!
//! Modules:
//!   - `types`   — shared primitive identifiers
//!   - `error`   — error and result types
//!   - `dataset` — order-line loading and date filtering
//!   - `rfm`     — RFM scoring and customer segmentation
//!   - `reports` — supplementary order-history reports

pub mod dataset;
pub mod error;
pub mod reports;
pub mod rfm;
pub mod types;

pub use dataset::{filter_date_range, load_orders, load_orders_file, OrderLine};
pub use error::{AnalyticsError, AnalyticsResult};
pub use rfm::{compute_rfm, CustomerRfm, Segment, SegmentSummary};
pub use types::{CustomerId, OrderId};
