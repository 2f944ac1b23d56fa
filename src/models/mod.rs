//! Data models for lorekeeper.
//!
//! This module contains the core data structures used throughout the system.

mod decision;
mod document;
mod search;

pub use decision::{RawRouterDecision, RouterDecision};
pub use document::{Document, Entity};
pub use search::{PerformanceMetrics, RetrievalReport, RetrievalRequest, SearchResult};
