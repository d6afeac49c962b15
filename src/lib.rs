//! Patch layout engine for source-to-target mosaics
//!
//! A target image is partitioned into non-overlapping rectangular patches, each
//! paired with a rotated region of a source image that matches it in appearance.
//! Source regions never overlap either. Layouts are refined locally by greedy
//! single-patch mutation and by energy-guided splitting.

#![forbid(unsafe_code)]

/// Refinement algorithms: matching, mutation, splitting, seeding and regeneration
pub mod algorithm;
/// Feature and energy providers consumed by the layout engine
pub mod analysis;
/// Input/output operations, configuration and error handling
pub mod io;
/// Geometry, probability and correlation utilities
pub mod math;
/// Patches, the dual spatial grid index and the patch tree
pub mod spatial;

pub use io::error::{LayoutError, Result};
