//! WOFLs - Water Observation Feature Layer production
//!
//! This library turns a continental archive of satellite reflectance tiles
//! into one byte-per-pixel water observation layer per space-time tile:
//!
//! - [`planner`] reconciles the catalog listings of every input product into
//!   the tiles that still need producing
//! - [`dispatch`] runs those tasks on a bounded worker pool and streams
//!   results back as they complete
//! - [`executor`] loads, classifies, flags, validates and writes each tile
//! - [`indexer`] records every produced tile in the catalog exactly once
//!
//! [`pipeline::WoflPipeline`] wires the four together for one pass.

pub mod catalog;
pub mod config;
pub mod coord;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod indexer;
pub mod logging;
pub mod observation;
pub mod pipeline;
pub mod planner;
pub mod product;
pub mod task;
pub mod telemetry;

pub use config::WoflConfig;
pub use error::WoflError;
pub use pipeline::{RunSummary, WoflPipeline};
