//! Mempool intelligence module
//!
//! Purpose:
//!     Query a node's transaction pool, classify what is in it, and keep
//!     working when the endpoint withholds the privileged txpool methods.
//!
//! Architecture:
//!     types.rs      — wire shapes (txpool/block JSON) + derived reports
//!     decoder.rs    — calldata → DecodedCall (fixed token selector table)
//!     query.rs      — validated txpool/fee/block reads, error classification
//!     comparison.rs — cross-network aggregation + trend detection (pure)
//!     service.rs    — orchestration: privileged path, fallback, snapshots

pub mod comparison;
pub mod decoder;
pub mod query;
pub mod service;
pub mod types;

pub use comparison::{build_comparison, detect_trend};
pub use query::PoolQuery;
pub use service::MempoolService;
pub use types::{
    ClassifiedTransaction, DecodedCall, MethodAvailability, NetworkComparison, NetworkSnapshot,
    PoolContent, PoolSection, PoolStatus, PoolTrend, RawTransaction, TokenActivityReport,
};
