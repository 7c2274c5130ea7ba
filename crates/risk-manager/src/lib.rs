//! Risk Manager
//!
//! Threshold-driven alerting over tracked traders with deduplication,
//! acknowledgement and listener fan-out.

pub mod alerts;
pub mod thresholds;

pub use alerts::{
    Alert, AlertEngine, AlertEngineConfig, AlertListener, AlertMetric, AlertStats, AlertSubject,
    AlertType, AlertTypeCounts, SubscriptionId,
};
pub use thresholds::{AlertThresholds, ThresholdConfig, ThresholdKind, ThresholdUpdate};
