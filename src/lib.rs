//! Joins townland boundaries, DED (district electoral division) boundaries
//! and census returns into a townland layer annotated with each townland's
//! district and its number of census records.
//!
//! The flow is load, resolve, aggregate, merge:
//!
//! 1. [`data`] reads the three datasets and validates required attributes.
//! 2. [`resolver`] assigns each townland the first district containing its
//!    centroid, computed by [`geometry`].
//! 3. [`processing`] counts census records per (townland, district) key and
//!    merges the counts into copies of the townland features.
//!
//! [`pipeline::CensusGeo`] holds the resolved base state so repeated requests
//! only redo the counting and merging.

pub mod config;
pub mod data;
pub mod error;
pub mod geometry;
pub mod pipeline;
pub mod processing;
pub mod resolver;
pub mod server;
pub mod types;

pub use error::{Error, GeometryError, Result};
pub use pipeline::CensusGeo;
