//! Grid key and extent types.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// EPSG code of the continental Albers grid all tiles are indexed on.
pub const GRID_EPSG: u32 = 3577;

/// Edge length of a grid tile in metres.
pub const DEFAULT_TILE_SIZE_METRES: f64 = 100_000.0;

/// Errors from key and extent construction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Time range ends before it starts.
    #[error("invalid time range: {end} is before {start}")]
    InvalidTimeRange {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Tile size must be finite and positive.
    #[error("invalid tile size: {0}")]
    InvalidTileSize(f64),

    /// Bounding box has left > right or bottom > top.
    #[error("invalid bounding box: [{left}, {bottom}, {right}, {top}]")]
    InvalidBoundingBox {
        left: f64,
        bottom: f64,
        right: f64,
        top: f64,
    },
}

/// Spatial-only key of a grid cell.
///
/// Atemporal products (the elevation mosaic) are keyed this way.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpatialKey {
    pub x: i32,
    pub y: i32,
}

impl SpatialKey {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for SpatialKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.x, self.y)
    }
}

/// Identifies one candidate unit of work: a grid cell at one acquisition time.
///
/// Ordering is lexicographic over (x, y, time), which keeps planning passes
/// deterministic for a fixed catalog state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpatioTemporalKey {
    pub x: i32,
    pub y: i32,
    pub time: DateTime<Utc>,
}

impl SpatioTemporalKey {
    pub fn new(x: i32, y: i32, time: DateTime<Utc>) -> Self {
        Self { x, y, time }
    }

    /// Drops the time component.
    pub fn spatial(&self) -> SpatialKey {
        SpatialKey::new(self.x, self.y)
    }
}

impl fmt::Display for SpatioTemporalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.x,
            self.y,
            self.time.to_rfc3339_opts(SecondsFormat::Micros, true)
        )
    }
}

/// Half-open time interval `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a time range, rejecting `end < start`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, CoordError> {
        if end < start {
            return Err(CoordError::InvalidTimeRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Returns true if `time` falls inside the range.
    pub fn contains(&self, time: &DateTime<Utc>) -> bool {
        self.start <= *time && *time < self.end
    }
}

/// Axis-aligned rectangle in grid CRS coordinates (metres).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
    pub top: f64,
}

impl BoundingBox {
    /// Creates a bounding box, rejecting inverted edges.
    pub fn new(left: f64, bottom: f64, right: f64, top: f64) -> Result<Self, CoordError> {
        if !(left <= right && bottom <= top) {
            return Err(CoordError::InvalidBoundingBox {
                left,
                bottom,
                right,
                top,
            });
        }
        Ok(Self {
            left,
            bottom,
            right,
            top,
        })
    }

    /// Returns true if the two boxes share any area or edge.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left <= other.right
            && other.left <= self.right
            && self.bottom <= other.top
            && other.bottom <= self.top
    }

    /// Returns true if the two boxes share a region of positive area.
    pub fn overlaps(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.bottom < other.top
            && other.bottom < self.top
    }

    /// Overlap of two boxes, or `None` if they are disjoint.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BoundingBox {
            left: self.left.max(other.left),
            bottom: self.bottom.max(other.bottom),
            right: self.right.min(other.right),
            top: self.top.min(other.top),
        })
    }
}
