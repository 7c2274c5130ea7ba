//! Core domain types for the analytics engine.

pub mod recommendation;
pub mod trade;
pub mod trader;

pub use recommendation::*;
pub use trade::*;
pub use trader::*;
