//! Grid coordinates for the continental tile archive.
//!
//! Every cataloged product shares one fixed square grid in the Albers equal
//! area projection (EPSG:3577). A tile is addressed by integer `(x, y)`
//! indices; the indices may be negative since the grid origin sits inside
//! the continent.

mod types;

pub use types::{
    BoundingBox, CoordError, SpatialKey, SpatioTemporalKey, TimeRange, DEFAULT_TILE_SIZE_METRES,
    GRID_EPSG,
};

/// Fixed square tiling of the grid CRS.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridSpec {
    tile_size: f64,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE_METRES,
        }
    }
}

impl GridSpec {
    /// Creates a grid with the given tile edge length in metres.
    pub fn new(tile_size: f64) -> Result<Self, CoordError> {
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(CoordError::InvalidTileSize(tile_size));
        }
        Ok(Self { tile_size })
    }

    pub fn tile_size(&self) -> f64 {
        self.tile_size
    }

    /// Returns the extent covered by a tile.
    #[inline]
    pub fn tile_extent(&self, key: SpatialKey) -> BoundingBox {
        let left = key.x as f64 * self.tile_size;
        let bottom = key.y as f64 * self.tile_size;
        BoundingBox {
            left,
            bottom,
            right: left + self.tile_size,
            top: bottom + self.tile_size,
        }
    }
}
