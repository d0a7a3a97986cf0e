//! Mask construction: normalized polygon vertices to a binary PNG raster.
//!
//! The mask is a single-channel 8-bit image with the exact dimensions of the
//! source photo. Pixel value 255 marks the editable region, 0 preserves the
//! original pixels. Construction is pure: identical inputs yield
//! byte-identical output.

use std::io::Cursor;

use image::{GrayImage, ImageFormat, Luma};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;

use crate::error::{Error, Result};
use crate::types::{EditRegion, NormalizedVertex};

const EDITABLE: Luma<u8> = Luma([255u8]);

/// Rasterize a normalized polygon onto a zeroed width×height canvas.
///
/// An empty vertex list is the "no localized region" convention and yields
/// an all-zero canvas. One or two vertices cannot form a polygon and are
/// rejected. Fill semantics are the conventional scan fill, boundary pixels
/// inclusive.
///
/// # Errors
/// Returns [`Error::MaskConstruction`] for zero dimensions or a degenerate
/// vertex list.
pub fn rasterize_polygon(
    width: u32,
    height: u32,
    vertices: &[NormalizedVertex],
) -> Result<GrayImage> {
    if width == 0 || height == 0 {
        return Err(Error::MaskConstruction {
            message: format!("mask dimensions must be positive, got {width}x{height}"),
        });
    }
    let mut canvas = GrayImage::new(width, height);
    if vertices.is_empty() {
        return Ok(canvas);
    }

    let mut points: Vec<Point<i32>> = vertices
        .iter()
        .map(|v| {
            Point::new(
                (v.x * width as f32).round() as i32,
                (v.y * height as f32).round() as i32,
            )
        })
        .collect();
    // The fill routine expects an open ring.
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    if points.len() < 3 {
        return Err(Error::MaskConstruction {
            message: format!(
                "a bounding polygon needs at least 3 vertices, got {}",
                points.len()
            ),
        });
    }

    draw_polygon_mut(&mut canvas, &points, EDITABLE);
    Ok(canvas)
}

/// Build the PNG mask for an edit region of the given source image.
///
/// The source is decoded only to take its pixel dimensions; the mask always
/// matches them exactly. [`EditRegion::WholeScene`] marks the full canvas
/// editable.
///
/// # Errors
/// Returns [`Error::MaskConstruction`] when the source image cannot be
/// decoded or the region polygon is degenerate.
pub fn build_mask(source_image: &[u8], region: &EditRegion) -> Result<Vec<u8>> {
    let source = image::load_from_memory(source_image).map_err(|e| Error::MaskConstruction {
        message: format!("source image could not be decoded: {e}"),
    })?;
    let (width, height) = (source.width(), source.height());

    let mask = match region {
        EditRegion::WholeScene => GrayImage::from_pixel(width, height, EDITABLE),
        EditRegion::Object(vertices) => rasterize_polygon(width, height, vertices)?,
    };

    encode_png(&mask)
}

fn encode_png(mask: &GrayImage) -> Result<Vec<u8>> {
    let mut buffer = Cursor::new(Vec::new());
    mask.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| Error::MaskConstruction {
            message: format!("mask could not be encoded as PNG: {e}"),
        })?;
    Ok(buffer.into_inner())
}
