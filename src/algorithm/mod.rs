/// Appearance distance between source and target footprints
pub mod matcher;
/// Single-patch greedy mutation
pub mod mutation;
/// Optimizer facade over injected providers
pub mod optimizer;
/// Batch regeneration of a regular tiling with cancellation
pub mod regeneration;
/// Source placement strategies for fresh leaves
pub mod seeding;
/// Energy-guided recursive split
pub mod split;
