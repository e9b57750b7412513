//! Error types for loading datasets and running the enrichment pipeline.

use std::path::PathBuf;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Problems with a single polygon ring.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    /// The ring has no vertices, so no centroid exists.
    #[error("polygon ring has no vertices")]
    EmptyRing,

    #[error("feature has no geometry")]
    MissingGeometry,

    /// Only Polygon and MultiPolygon geometries carry a usable ring.
    #[error("unsupported geometry type: {0}")]
    UnsupportedType(String),

    #[error("position has fewer than two ordinates")]
    MalformedPosition,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid geometry for {feature}: {source}")]
    InvalidGeometry {
        feature: String,
        #[source]
        source: GeometryError,
    },

    /// A required property is absent (or not a string) on an input record.
    #[error("{dataset} record {index} is missing required attribute `{attribute}`")]
    MissingAttribute {
        dataset: &'static str,
        index: usize,
        attribute: &'static str,
    },

    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse JSON in {path:?}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse GeoJSON in {path:?}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("failed to read CSV {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("failed to read shapefile {path:?}: {source}")]
    Shapefile {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("unsupported format for {path:?}: {extension}")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("{0:?} is not a GeoJSON FeatureCollection")]
    NotFeatureCollection(PathBuf),

    /// Output serialization failed.
    #[error("failed to serialize output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn geometry(feature: impl Into<String>, source: GeometryError) -> Self {
        Error::InvalidGeometry {
            feature: feature.into(),
            source,
        }
    }
}
