//! Catalog entries: tile references, dataset ids and provenance records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::coord::{BoundingBox, SpatioTemporalKey};

/// Stable identity of a cataloged dataset.
///
/// Derived from the dataset URI, so indexing the same output twice yields
/// the same id.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DatasetId(String);

impl DatasetId {
    /// Hex-encoded SHA-256 of the URI.
    pub fn from_uri(uri: &str) -> Self {
        let digest = Sha256::digest(uri.as_bytes());
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short form is enough to tell datasets apart in logs
        let end = self.0.char_indices().nth(12).map_or(self.0.len(), |(i, _)| i);
        f.write_str(&self.0[..end])
    }
}

/// Handle to one cataloged dataset of one product at one key.
///
/// Owned by the catalog; everything downstream treats it as read-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileReference {
    pub id: DatasetId,
    pub product: String,
    pub key: SpatioTemporalKey,
    /// File locators of the dataset's measurements.
    pub uris: Vec<String>,
    /// Full array extent.
    pub extent: BoundingBox,
    /// Sub-extent that actually holds valid data.
    pub valid_data: BoundingBox,
    /// Upstream datasets this one was derived from.
    pub lineage: Vec<DatasetId>,
}

impl TileReference {
    /// Creates a reference whose id is derived from its first URI.
    pub fn new(
        product: impl Into<String>,
        key: SpatioTemporalKey,
        uri: impl Into<String>,
        extent: BoundingBox,
    ) -> Self {
        let uri = uri.into();
        Self {
            id: DatasetId::from_uri(&uri),
            product: product.into(),
            key,
            uris: vec![uri],
            extent,
            valid_data: extent,
            lineage: Vec::new(),
        }
    }

    pub fn with_valid_data(mut self, valid_data: BoundingBox) -> Self {
        self.valid_data = valid_data;
        self
    }
}

/// Provenance record of one produced output tile.
///
/// This is what the result indexer appends to the catalog, and what a
/// dataset writer may embed as metadata alongside the array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DatasetRecord {
    pub id: DatasetId,
    pub product: String,
    pub platform: String,
    pub key: SpatioTemporalKey,
    pub uri: String,
    pub extent: BoundingBox,
    pub valid_data: BoundingBox,
    /// Every upstream dataset consumed to produce this output.
    pub sources: Vec<DatasetId>,
    pub created_at: DateTime<Utc>,
}

impl DatasetRecord {
    /// Renders the record as a pretty-printed JSON metadata document.
    pub fn to_document(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Parses a metadata document produced by [`DatasetRecord::to_document`].
    pub fn from_document(document: &str) -> serde_json::Result<Self> {
        serde_json::from_str(document)
    }

    /// The catalog-side view of this record.
    pub fn to_tile_reference(&self) -> TileReference {
        TileReference {
            id: self.id.clone(),
            product: self.product.clone(),
            key: self.key,
            uris: vec![self.uri.clone()],
            extent: self.extent,
            valid_data: self.valid_data,
            lineage: self.sources.clone(),
        }
    }
}
