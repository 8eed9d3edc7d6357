//! In-memory catalog.
//!
//! Keeps every product listing in ordered maps behind a `parking_lot`
//! read-write lock. Used by tests and by small runs that seed the catalog
//! from another source.

use std::collections::{BTreeMap, HashMap};

use parking_lot::RwLock;
use tracing::trace;

use super::{Catalog, CatalogError, DatasetId, DatasetRecord, ProductTileSet, TileReference};
use crate::coord::{BoundingBox, SpatioTemporalKey, TimeRange};

#[derive(Default)]
struct CatalogState {
    products: HashMap<String, BTreeMap<SpatioTemporalKey, TileReference>>,
}

/// Catalog held entirely in memory.
///
/// At most one dataset exists per (product, key). Inserting the same dataset
/// again is a no-op; inserting a different dataset at an occupied key is a
/// [`CatalogError::Conflict`].
#[derive(Default)]
pub struct MemoryCatalog {
    state: RwLock<CatalogState>,
}

impl MemoryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an existing dataset (e.g. an input tile) to the catalog.
    pub fn insert_tile(&self, tile: TileReference) -> Result<DatasetId, CatalogError> {
        let mut state = self.state.write();
        let listing = state.products.entry(tile.product.clone()).or_default();

        if let Some(existing) = listing.get(&tile.key) {
            if existing.id == tile.id {
                trace!(product = %tile.product, key = %tile.key, "Dataset already cataloged");
                return Ok(existing.id.clone());
            }
            return Err(CatalogError::Conflict {
                product: tile.product.clone(),
                key: tile.key,
                existing: existing.id.clone(),
                incoming: tile.id.clone(),
            });
        }

        let id = tile.id.clone();
        listing.insert(tile.key, tile);
        Ok(id)
    }

    /// Number of datasets cataloged for `product`.
    pub fn count(&self, product: &str) -> usize {
        self.state
            .read()
            .products
            .get(product)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    /// Looks up the dataset of `product` at `key`.
    pub fn get(&self, product: &str, key: &SpatioTemporalKey) -> Option<TileReference> {
        self.state
            .read()
            .products
            .get(product)
            .and_then(|listing| listing.get(key))
            .cloned()
    }
}

impl Catalog for MemoryCatalog {
    fn list_tiles(
        &self,
        product: &str,
        time_range: Option<&TimeRange>,
        extent: &BoundingBox,
    ) -> Result<ProductTileSet, CatalogError> {
        let state = self.state.read();
        let Some(listing) = state.products.get(product) else {
            return Ok(ProductTileSet::new());
        };

        Ok(listing
            .iter()
            .filter(|(key, _)| time_range.map_or(true, |range| range.contains(&key.time)))
            .filter(|(_, tile)| tile.extent.overlaps(extent))
            .map(|(key, tile)| (*key, tile.clone()))
            .collect())
    }

    fn add_record(&self, record: &DatasetRecord) -> Result<DatasetId, CatalogError> {
        self.insert_tile(record.to_tile_reference())
    }
}
