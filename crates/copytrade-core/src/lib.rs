//! Copytrade Core Library
//!
//! Shared types, storage traits, and database adapters for the copy-trade
//! analytics engine.

pub mod config;
pub mod db;
pub mod error;
pub mod repository;
pub mod store;
pub mod telemetry;
pub mod types;

pub use error::{Error, Result};
pub use repository::{MemoryTradeRepository, TradeRepository};
pub use store::{
    ConfigStore, MemoryConfigStore, MemoryRecommendationStore, RecommendationFilter,
    RecommendationStore,
};
pub use types::{RecommendationKind, RecommendationRecord, Trade, TradeSide, TraderStats};
