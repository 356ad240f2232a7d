//! Height map sources for the CLI

use std::path::Path;

use anyhow::{Context, Result};
use geoclip_core::GeoclipError;
use geoclip_terrain::{HeightField, HeightSample};
use image::Rgb32FImage;

/// Load an image file as a height field.
/// Channels are normalized to [0..1] regardless of bit depth; the red
/// channel is the height.
pub fn load(path: &Path) -> Result<HeightField> {
    let img = image::open(path)
        .map_err(|e| GeoclipError::ImageError(e.to_string()))
        .with_context(|| format!("Failed to load height map '{}'", path.display()))?;

    let field = from_rgb(&img.into_rgb32f())?;
    log::info!(
        "loaded {}x{} height map from {}",
        field.width(),
        field.depth(),
        path.display()
    );
    Ok(field)
}

pub fn from_rgb(img: &Rgb32FImage) -> Result<HeightField> {
    let samples = img
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            HeightSample::new(r, [r, g, b])
        })
        .collect();
    Ok(HeightField::new(
        img.width() as usize,
        img.height() as usize,
        samples,
    )?)
}

/// Rolling hills in [0..1], for running without an image
pub fn synthetic(size: usize) -> Result<HeightField> {
    let size = size.max(1);
    let mut samples = Vec::with_capacity(size * size);
    for z in 0..size {
        for x in 0..size {
            let (fx, fz) = (x as f32, z as f32);
            let h = 0.5 + 0.25 * (fx * 0.031).sin() * (fz * 0.027).cos() + 0.1 * ((fx + fz) * 0.11).sin();
            let h = h.clamp(0.0, 1.0);
            samples.push(HeightSample::new(h, [h, 0.6 * h + 0.2, 0.3]));
        }
    }
    Ok(HeightField::new(size, size, samples)?)
}
