//! Spatial data structures
//!
//! This module contains:
//! - Patches and their rasterized source masks
//! - The dual source/target bucket grid
//! - The append-only patch tree

/// Source/target bucket grid index
pub mod grid;
/// Paired target/source patches
pub mod patch;
/// Append-only patch tree
pub mod tree;

pub use grid::{Space, SpatialGridIndex};
pub use patch::{ImageGeometry, Patch};
pub use tree::{NodeId, PatchTree};
