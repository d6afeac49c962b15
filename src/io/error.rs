//! Error types for layout operations
//!
//! Placement conflicts (overlap, a candidate leaving the image) are part of normal
//! search and never surface here; these variants cover caller bugs and I/O.

use std::fmt;
use std::path::PathBuf;

use crate::math::geometry::PixelRect;
use crate::spatial::grid::Space;

/// Main error type for all layout operations
#[derive(Debug)]
pub enum LayoutError {
    /// Malformed polygon or patch input
    ///
    /// Raised for polygons with fewer than three points and patches
    /// with a non-positive dimension. Indicates a caller bug.
    InvalidGeometry {
        /// Description of what is malformed
        reason: String,
    },

    /// A placement or sampling region falls outside image extents
    OutOfBounds {
        /// Image space the region was requested in
        space: Space,
        /// Requested region in pixels
        region: PixelRect,
        /// Image extent in pixels (width, height)
        extent: (usize, usize),
    },

    /// The source image has no room left for a patch
    ///
    /// Raised by batch regeneration when neither the seed strategy nor a full
    /// lattice sweep finds a legal source placement.
    SourceExhausted {
        /// Node that could not be placed
        node: usize,
        /// Leaves placed before it
        placed: usize,
        /// Leaves in the layout
        leaves: usize,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// Failed to load an image from the filesystem
    ImageLoad {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image loading error
        source: image::ImageError,
    },

    /// Failed to save a composed image to disk
    ImageExport {
        /// Path where export was attempted
        path: PathBuf,
        /// Underlying image export error
        source: image::ImageError,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidGeometry { reason } => write!(f, "Invalid geometry: {reason}"),
            Self::OutOfBounds {
                space,
                region,
                extent,
            } => {
                write!(
                    f,
                    "Region ({}, {})-({}, {}) lies outside the {space} image ({}x{})",
                    region.x,
                    region.y,
                    region.right(),
                    region.bottom(),
                    extent.0,
                    extent.1
                )
            }
            Self::SourceExhausted {
                node,
                placed,
                leaves,
            } => {
                write!(
                    f,
                    "Source image has no free slot for patch {node} ({placed} of {leaves} placed)"
                )
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::ImageLoad { path, source } => {
                write!(f, "Failed to load image '{}': {source}", path.display())
            }
            Self::ImageExport { path, source } => {
                write!(
                    f,
                    "Failed to export image to '{}': {source}",
                    path.display()
                )
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for LayoutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageLoad { source, .. } | Self::ImageExport { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for layout results
pub type Result<T> = std::result::Result<T, LayoutError>;

impl From<image::ImageError> for LayoutError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageLoad {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for LayoutError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid geometry error
pub fn invalid_geometry(reason: &impl ToString) -> LayoutError {
    LayoutError::InvalidGeometry {
        reason: reason.to_string(),
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> LayoutError {
    LayoutError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Create an out-of-bounds error for a pixel region
pub const fn out_of_bounds(space: Space, region: PixelRect, extent: (usize, usize)) -> LayoutError {
    LayoutError::OutOfBounds {
        space,
        region,
        extent,
    }
}
