//! Mathematical utilities for the layout engine

/// Straight-line template correlation over energy maps
pub mod correlation;
/// Points, rectangles, rotations and the separating-axis test
pub mod geometry;
/// Seeded random selection
pub mod probability;
