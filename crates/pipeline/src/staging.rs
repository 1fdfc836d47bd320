//! Staging source images into the backend's input folder.
//!
//! Images whose longest side exceeds the configured maximum are scaled
//! down (Lanczos3, aspect ratio preserved) before the backend sees them.
//! Anything that cannot be decoded or re-encoded is copied as-is. Each
//! item writes only `{input_dir}/{its own file name}`, so re-staging an
//! item never disturbs files staged for other items.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageResult};

use crate::error::PipelineError;

/// JPEG quality used when re-encoding scaled JPEG inputs.
pub const JPEG_QUALITY: u8 = 95;

/// Writes source images into the backend input directory.
#[derive(Debug, Clone)]
pub struct ImageStager {
    input_dir: PathBuf,
    max_dimension: u32,
}

impl ImageStager {
    pub fn new(input_dir: impl Into<PathBuf>, max_dimension: u32) -> Self {
        Self {
            input_dir: input_dir.into(),
            max_dimension,
        }
    }

    /// Stage `source`, returning the file name the backend should load.
    pub fn stage(&self, source: &Path) -> Result<String, PipelineError> {
        let name = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| PipelineError::InvalidSource(source.to_path_buf()))?
            .to_string();

        std::fs::create_dir_all(&self.input_dir)
            .map_err(|e| PipelineError::io(&self.input_dir, e))?;
        let dest = self.input_dir.join(&name);

        match self.write_scaled(source, &dest) {
            Ok(Some((width, height))) => {
                tracing::debug!(
                    source = %source.display(),
                    width,
                    height,
                    "Staged scaled image",
                );
            }
            Ok(None) => copy_original(source, &dest)?,
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    error = %e,
                    "Failed to load/scale image, copying original",
                );
                copy_original(source, &dest)?;
            }
        }

        Ok(name)
    }

    /// Write a scaled copy to `dest` when the image is too large.
    ///
    /// Returns the new dimensions, or `None` when no scaling is needed.
    fn write_scaled(&self, source: &Path, dest: &Path) -> ImageResult<Option<(u32, u32)>> {
        let img = image::open(source)?;
        let Some((width, height)) = scaled_dimensions(img.width(), img.height(), self.max_dimension)
        else {
            return Ok(None);
        };

        let img = match img {
            DynamicImage::ImageRgb8(_) | DynamicImage::ImageRgba8(_) => img,
            other => DynamicImage::ImageRgba8(other.to_rgba8()),
        };
        let resized = img.resize_exact(width, height, FilterType::Lanczos3);
        save_like_source(&resized, dest)?;
        Ok(Some((width, height)))
    }
}

/// Target size so the longest side equals `max_dimension`.
///
/// `None` when the image already fits (or is degenerate). Each side is
/// rounded and kept at least one pixel.
pub fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension || width == 0 || height == 0 {
        return None;
    }
    let scale = f64::from(max_dimension) / f64::from(longest);
    let scaled = |side: u32| ((f64::from(side) * scale).round() as u32).max(1);
    Some((scaled(width), scaled(height)))
}

/// Encode `img` in the format implied by `dest`'s extension.
fn save_like_source(img: &DynamicImage, dest: &Path) -> ImageResult<()> {
    let is_jpeg = dest
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"));

    if is_jpeg {
        let mut writer = BufWriter::new(File::create(dest)?);
        img.to_rgb8()
            .write_with_encoder(JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY))?;
        Ok(())
    } else {
        img.save(dest)
    }
}

fn copy_original(source: &Path, dest: &Path) -> Result<(), PipelineError> {
    std::fs::copy(source, dest).map_err(|e| PipelineError::Copy {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    })?;
    Ok(())
}
