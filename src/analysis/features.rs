//! Appearance feature and energy providers
//!
//! The layout engine only consumes per-pixel feature maps through these traits.
//! [`ImageFeatures`] is a small in-memory provider (intensity and gradient
//! magnitude) used by the command-line tool and tests.

use ndarray::{Array2, ArrayView2, Axis, Slice};

use crate::io::error::{Result, invalid_parameter, out_of_bounds};
use crate::math::geometry::PixelRect;
use crate::spatial::grid::Space;

/// Supplies per-channel feature maps for sub-rectangles of either image
pub trait FeatureProvider {
    /// Number of channels returned by [`FeatureProvider::features`]
    fn channel_count(&self) -> usize;

    /// Feature maps for `rect`, one per channel, each normalized to `[0, 1]`
    ///
    /// # Errors
    ///
    /// Returns an error if `rect` leaves the image
    fn features(&self, space: Space, rect: PixelRect) -> Result<Vec<Array2<f32>>>;

    /// Pixel extent (width, height) of an image
    fn extent(&self, space: Space) -> (usize, usize);
}

/// Supplies a scalar importance map over the target image
pub trait EnergyProvider {
    /// Energy map for `rect` of the target
    ///
    /// # Errors
    ///
    /// Returns an error if `rect` leaves the target image
    fn energy(&self, rect: PixelRect) -> Result<Array2<f32>>;
}

/// Intensity and gradient-magnitude features held in memory
#[derive(Debug, Clone)]
pub struct ImageFeatures {
    source: Vec<Array2<f32>>,
    target: Vec<Array2<f32>>,
    energy: Array2<f32>,
}

impl ImageFeatures {
    /// Build features from two grey images with values in `[0, 1]`
    ///
    /// The energy map defaults to the target's gradient magnitude.
    ///
    /// # Errors
    ///
    /// Returns an error if either image is empty
    pub fn from_grey(source: &Array2<f32>, target: &Array2<f32>) -> Result<Self> {
        for (name, image) in [("source", source), ("target", target)] {
            if image.is_empty() {
                return Err(invalid_parameter(
                    "image",
                    &name,
                    &"feature images must not be empty",
                ));
            }
        }
        let target_edges = gradient_magnitude(target.view());
        Ok(Self {
            source: vec![source.clone(), gradient_magnitude(source.view())],
            energy: target_edges.clone(),
            target: vec![target.clone(), target_edges],
        })
    }

    /// Replace the energy map
    ///
    /// # Errors
    ///
    /// Returns an error if the map does not match the target's shape
    pub fn with_energy(mut self, energy: Array2<f32>) -> Result<Self> {
        let expected = self.target.first().map(|t| t.dim()).unwrap_or_default();
        if energy.dim() != expected {
            return Err(invalid_parameter(
                "energy",
                &format!("{:?}", energy.dim()),
                &format!("energy map must match the target shape {expected:?}"),
            ));
        }
        self.energy = energy;
        Ok(self)
    }

    fn channels(&self, space: Space) -> &[Array2<f32>] {
        match space {
            Space::Source => &self.source,
            Space::Target => &self.target,
        }
    }
}

impl FeatureProvider for ImageFeatures {
    fn channel_count(&self) -> usize {
        self.source.len()
    }

    fn features(&self, space: Space, rect: PixelRect) -> Result<Vec<Array2<f32>>> {
        self.channels(space)
            .iter()
            .map(|channel| crop(channel.view(), rect, space))
            .collect()
    }

    fn extent(&self, space: Space) -> (usize, usize) {
        self.channels(space)
            .first()
            .map_or((0, 0), |channel| (channel.ncols(), channel.nrows()))
    }
}

impl EnergyProvider for ImageFeatures {
    fn energy(&self, rect: PixelRect) -> Result<Array2<f32>> {
        crop(self.energy.view(), rect, Space::Target)
    }
}

/// Copy out a sub-rectangle of an image
///
/// # Errors
///
/// Returns an error if `rect` does not fit inside `image`
pub fn crop(image: ArrayView2<'_, f32>, rect: PixelRect, space: Space) -> Result<Array2<f32>> {
    let extent = (image.ncols(), image.nrows());
    if !rect.fits_within(extent) {
        return Err(out_of_bounds(space, rect, extent));
    }
    Ok(image
        .slice_axis(Axis(0), Slice::from(rect.y..rect.bottom()))
        .slice_axis(Axis(1), Slice::from(rect.x..rect.right()))
        .to_owned())
}

/// Central-difference gradient magnitude normalized to `[0, 1]`
///
/// Border pixels use one-sided differences. A flat image yields all zeros.
pub fn gradient_magnitude(image: ArrayView2<'_, f32>) -> Array2<f32> {
    let (rows, cols) = image.dim();
    let mut magnitude = Array2::<f32>::zeros((rows, cols));
    if rows == 0 || cols == 0 {
        return magnitude;
    }

    let at = |r: usize, c: usize| image.get((r, c)).copied().unwrap_or(0.0);
    let mut peak = 0.0_f32;
    for r in 0..rows {
        for c in 0..cols {
            let (left, right) = (c.saturating_sub(1), (c + 1).min(cols - 1));
            let (up, down) = (r.saturating_sub(1), (r + 1).min(rows - 1));
            let dx = (at(r, right) - at(r, left)) / (right - left).max(1) as f32;
            let dy = (at(down, c) - at(up, c)) / (down - up).max(1) as f32;
            let value = dx.hypot(dy);
            peak = peak.max(value);
            if let Some(cell) = magnitude.get_mut((r, c)) {
                *cell = value;
            }
        }
    }

    if peak > 0.0 {
        magnitude.mapv_inplace(|v| v / peak);
    }
    magnitude
}
