//! Layout constants and runtime configuration defaults

// Geometric tolerances
/// Slack (mm) below which touching footprints are not treated as overlapping
pub const PLACEMENT_TOLERANCE_MM: f64 = 1e-6;

// Spatial index resolution
/// Rows of the source and target bucket grids
pub const GRID_ROWS: usize = 32;
/// Columns of the source and target bucket grids
pub const GRID_COLS: usize = 32;

// Patch size limits and search steps
/// Smallest allowed patch side in millimetres
pub const MIN_PATCH_DIMENSION_MM: f64 = 10.0;
/// Largest edge or offset step a single mutation may take
pub const MUTATION_STEP_MM: f64 = 5.0;
/// Largest rotation-index step a single mutation may take
pub const ROTATION_STEP_LIMIT: usize = 1;

/// Mutation kinds sampled per mutation request
pub const DEFAULT_MUTATION_SAMPLES: usize = 3;
/// Leaves sampled per split request
pub const DEFAULT_SPLIT_SELECTION: usize = 4;
/// Exponent applied to leaf energy before weighted split sampling
pub const SPLIT_SAMPLING_EXPONENT: f64 = 1.0;

/// Discretized source rotations over a full turn
pub const DEFAULT_ROTATION_STEPS: usize = 4;

// Seeding
/// Proposals tried by the salience-greedy seed strategy
pub const SEED_CANDIDATES: usize = 16;
/// Attempts a random or jittered seed makes before giving up on a leaf
pub const SEED_ATTEMPTS: usize = 32;
/// Maximum jitter (mm) applied to jittered seed proposals
pub const SEED_JITTER_MM: f64 = 20.0;
/// Lattice positions per patch side when sweeping the source for a free slot
pub const SEED_LATTICE_DIVISIONS: f64 = 4.0;
/// Upper bound on lattice intervals per axis of the source sweep
pub const SEED_LATTICE_MAX_STEPS: usize = 64;

// Appearance channel weights
/// Weight of the intensity channel
pub const INTENSITY_WEIGHT: f64 = 1.0;
/// Weight of the edge-magnitude channel
pub const EDGE_WEIGHT: f64 = 0.5;

// Default values for command-line parameters
/// Fixed seed for reproducible layouts
pub const DEFAULT_SEED: u64 = 42;
/// Pixel density assumed for both images
pub const DEFAULT_PX_PER_MM: f64 = 1.0;
/// Side of the regular tiling cells in millimetres
pub const DEFAULT_CELL_SIZE_MM: f64 = 100.0;
/// Split requests issued after regeneration
pub const DEFAULT_SPLIT_ROUNDS: usize = 4;
/// Mutation sweeps over all leaves after splitting
pub const DEFAULT_MUTATION_ROUNDS: usize = 10;

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_mosaic";
/// Width of progress bars in characters
pub const PROGRESS_BAR_WIDTH: u16 = 50;
