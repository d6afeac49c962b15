//! Feature extraction consumed by the layout engine

/// Feature and energy provider traits with an in-memory implementation
pub mod features;
