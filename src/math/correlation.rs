//! Straight-line template correlation over energy maps
//!
//! A cut through a patch is cheapest to hide where it runs along existing edges,
//! so each candidate cut line is scored by correlating an all-white line template
//! with the energy underneath it.

use ndarray::{ArrayView2, Axis as ArrayAxis};

/// Orientation of a cut through a patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Cut along a row: produces a top and a bottom child
    Horizontal,
    /// Cut along a column: produces a left and a right child
    Vertical,
}

/// Best-scoring cut position along one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Pixel offset of the cut from the top or left edge of the window
    pub offset: usize,
    /// Correlation value at the offset
    pub score: f64,
}

/// Correlate an all-white line template against every row or column of `energy`
///
/// For [`Axis::Vertical`] the profile has one entry per column, for
/// [`Axis::Horizontal`] one entry per row. A uniform template reduces the
/// normalized correlation to the mean energy along the line.
pub fn line_profile(energy: ArrayView2<'_, f32>, axis: Axis) -> Vec<f64> {
    let (lane_axis, length) = match axis {
        Axis::Vertical => (ArrayAxis(1), energy.nrows()),
        Axis::Horizontal => (ArrayAxis(0), energy.ncols()),
    };
    if length == 0 {
        return vec![0.0; energy.len_of(lane_axis)];
    }
    energy
        .axis_iter(lane_axis)
        .map(|line| line.iter().map(|&v| f64::from(v)).sum::<f64>() / length as f64)
        .collect()
}

/// Highest profile value with offset in `[margin, profile.len() - margin]`
///
/// Offsets name cut positions, so `profile.len()` itself is a valid (if degenerate)
/// offset; the margin keeps both sides of the cut at least `margin` wide. Ties go
/// to the lowest offset. A zero margin is treated as one so neither side is empty.
/// Returns `None` if no offset satisfies the margin.
pub fn best_peak(profile: &[f64], margin: usize) -> Option<Peak> {
    let margin = margin.max(1);
    let last = profile.len().checked_sub(margin)?;
    if margin > last {
        return None;
    }
    let mut best: Option<Peak> = None;
    for offset in margin..=last {
        let score = profile.get(offset).copied().unwrap_or(0.0);
        if best.is_none_or(|peak| score > peak.score) {
            best = Some(Peak { offset, score });
        }
    }
    best
}
