//! Songplay Warehouse Library
//!
//! Loads song metadata and user activity logs into a SQLite star schema.

pub mod config;
pub mod dimensions;
pub mod pipeline;
pub mod records;
pub mod resolver;
pub mod sqlite_persistence;
pub mod warehouse;

// Re-export commonly used types for convenience
pub use pipeline::{
    LogLoadReport, Pipeline, PipelineConfig, PipelineError, PipelineReport, SongLoadReport,
};
pub use resolver::{ResolutionStats, SongLookup, SongMatch};
pub use warehouse::{SqliteWarehouse, WarehouseError};
