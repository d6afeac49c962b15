//! PNG loading and composite export

use std::path::Path;

use image::{ImageBuffer, RgbaImage};
use ndarray::Array2;

use crate::io::error::{LayoutError, Result};
use crate::math::geometry::{PixelRect, Point};
use crate::spatial::tree::PatchTree;

/// Load an image as RGBA
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded
pub fn load_rgba<P: AsRef<Path>>(path: P) -> Result<RgbaImage> {
    let path_buf = path.as_ref().to_path_buf();
    let img = image::open(&path_buf).map_err(|e| LayoutError::ImageLoad {
        path: path_buf,
        source: e,
    })?;
    Ok(img.to_rgba8())
}

/// Luma of an RGBA image as a `(height, width)` array in `[0, 1]`
pub fn grey_from_rgba(img: &RgbaImage) -> Array2<f32> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let mut grey = Array2::zeros((height, width));
    for (x, y, pixel) in img.enumerate_pixels() {
        let [r, g, b, _] = pixel.0;
        let luma = 0.114f32.mul_add(
            f32::from(b),
            0.299f32.mul_add(f32::from(r), 0.587 * f32::from(g)),
        ) / 255.0;
        if let Some(cell) = grey.get_mut((y as usize, x as usize)) {
            *cell = luma;
        }
    }
    grey
}

/// Load an image as grey values in `[0, 1]`
///
/// # Errors
///
/// Returns an error if the file cannot be opened or decoded
pub fn load_grey<P: AsRef<Path>>(path: P) -> Result<Array2<f32>> {
    load_rgba(path).map(|img| grey_from_rgba(&img))
}

/// Render the layout: every target pixel under a leaf takes the source pixel it maps to
///
/// Pixels not covered by any leaf, or mapping outside the source, stay transparent.
pub fn render_composite(tree: &PatchTree, source: &RgbaImage) -> RgbaImage {
    let geometry = tree.geometry();
    let (width, height) = geometry.target_extent;
    let mut img: RgbaImage = ImageBuffer::new(width as u32, height as u32);
    let ppm = geometry.px_per_mm;

    for patch in tree.leaf_patches() {
        let Ok(rotation) = geometry.rotations.get(patch.rotation_index) else {
            continue;
        };
        let Some(rect) = PixelRect::from_mm(&patch.target_bounds(), ppm) else {
            continue;
        };
        for y in rect.y..rect.bottom().min(height) {
            for x in rect.x..rect.right().min(width) {
                let centre = Point::new(x as f64 + 0.5, y as f64 + 0.5).scale(1.0 / ppm);
                let local = centre - patch.target_offset;
                let sample = patch.local_to_source(local, rotation).scale(ppm);
                if sample.x < 0.0 || sample.y < 0.0 {
                    continue;
                }
                let (sx, sy) = (sample.x.floor() as u32, sample.y.floor() as u32);
                if let Some(pixel) = source.get_pixel_checked(sx, sy) {
                    img.put_pixel(x as u32, y as u32, *pixel);
                }
            }
        }
    }
    img
}

/// Render the layout and save it as a PNG
///
/// # Errors
///
/// Returns an error if:
/// - The parent directory cannot be created
/// - The image cannot be saved to the specified path
pub fn export_composite<P: AsRef<Path>>(
    tree: &PatchTree,
    source: &RgbaImage,
    output_path: P,
) -> Result<()> {
    let output_path = output_path.as_ref();
    let img = render_composite(tree, source);

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LayoutError::FileSystem {
            path: parent.to_path_buf(),
            operation: "create directory",
            source: e,
        })?;
    }

    img.save(output_path).map_err(|e| LayoutError::ImageExport {
        path: output_path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}
