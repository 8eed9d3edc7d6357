//! Catalog of tile existence.
//!
//! The catalog is an external collaborator: it knows which datasets exist
//! for each product at each grid key, and accepts new records for produced
//! outputs. This module defines the interface the planner and the result
//! indexer consume, plus an in-memory implementation.
//!
//! # Access pattern
//!
//! ```text
//! TileJoiner ──list_tiles()──► Catalog ◄──add_record()── ResultIndexer
//!   (read)                                                (append)
//! ```
//!
//! Both sides run on the orchestrating task; in-flight tasks never touch
//! the catalog.

mod memory;
mod record;

pub use memory::MemoryCatalog;
pub use record::{DatasetId, DatasetRecord, TileReference};

use std::collections::BTreeMap;

use thiserror::Error;

use crate::coord::{BoundingBox, SpatioTemporalKey, TimeRange};

/// Listing of one product over one query, keyed by grid cell and time.
///
/// Ephemeral: rebuilt from catalog state on every planning pass.
pub type ProductTileSet = BTreeMap<SpatioTemporalKey, TileReference>;

/// Errors reported by a catalog backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    /// A different dataset is already cataloged for this product and key.
    #[error("conflicting dataset for {product} at {key}: existing {existing}, incoming {incoming}")]
    Conflict {
        product: String,
        key: SpatioTemporalKey,
        existing: DatasetId,
        incoming: DatasetId,
    },

    /// Backend-specific failure (connection, query, transaction).
    #[error("catalog backend error: {0}")]
    Backend(String),
}

/// Read/append interface to the dataset catalog.
///
/// # Idempotence
///
/// `add_record` must be idempotent: adding a record whose dataset id is
/// already cataloged returns that id without changing state. Callers rely
/// on this instead of tracking what they have indexed.
pub trait Catalog: Send + Sync {
    /// Lists the datasets of `product` overlapping `extent`.
    ///
    /// With `time_range` of `None` every acquisition time matches, which is
    /// how atemporal products are queried.
    fn list_tiles(
        &self,
        product: &str,
        time_range: Option<&TimeRange>,
        extent: &BoundingBox,
    ) -> Result<ProductTileSet, CatalogError>;

    /// Appends the record of a produced dataset and returns its id.
    fn add_record(&self, record: &DatasetRecord) -> Result<DatasetId, CatalogError>;
}
