//! Request-driven background media loader.
//!
//! Receives decode jobs off the render thread, applies EXIF orientation,
//! downscales oversized media, and returns RGBA8 frames. Every failure is
//! recovered locally with a generated placeholder so one broken file cannot
//! stall the frame loop or break the gallery.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use fast_image_resize as fir;
use image::RgbaImage;
use tracing::{debug, warn};

use crate::events::{LoadedMedia, LoaderRequest};

/// Spawn the loader thread. `placeholder_size` and `placeholder_rgb` shape
/// the fallback gradient; the thread exits on `LoaderRequest::Quit` or when
/// the request channel closes.
pub fn spawn(
    rx: Receiver<LoaderRequest>,
    tx: Sender<LoadedMedia>,
    placeholder_size: [u32; 2],
    placeholder_rgb: [u8; 3],
) {
    thread::spawn(move || {
        while let Ok(msg) = rx.recv() {
            match msg {
                LoaderRequest::Quit => break,
                LoaderRequest::Media {
                    slot,
                    source,
                    max_edge,
                } => {
                    let loaded = match source {
                        Some(path) => match decode_media(&path, max_edge) {
                            Ok(img) => (img, false),
                            Err(err) => {
                                warn!(
                                    path = %path.display(),
                                    error = %err,
                                    "media decode failed; substituting placeholder"
                                );
                                (placeholder_image(placeholder_size, placeholder_rgb), true)
                            }
                        },
                        None => (placeholder_image(placeholder_size, placeholder_rgb), true),
                    };
                    let (img, placeholder) = loaded;
                    let (width, height) = img.dimensions();
                    if tx
                        .send(LoadedMedia {
                            slot,
                            width,
                            height,
                            pixels: img.into_raw(),
                            placeholder,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
    });
}

fn decode_media(path: &Path, max_edge: u32) -> Result<RgbaImage> {
    let img = decode_rgba8_apply_exif(path)?;
    downscale_to_edge(img, max_edge)
}

/// Decodes to RGBA8 and applies EXIF orientation if available. Orientation
/// handling is best-effort; missing metadata leaves the pixels as decoded.
fn decode_rgba8_apply_exif(path: &Path) -> Result<RgbaImage> {
    let img = image::ImageReader::open(path)?
        .with_guessed_format()?
        .decode()?;
    let mut img = img.to_rgba8();

    let orientation = read_orientation(path).unwrap_or(1);
    match orientation {
        1 => {}
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }
    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let value = field.value.get_uint(0)?;
    debug!("exif orientation {} for {}", value, path.display());
    Some(value as u16)
}

/// Downscale so the longest edge fits `max_edge`, preserving aspect.
/// Smaller media passes through untouched.
fn downscale_to_edge(source: RgbaImage, max_edge: u32) -> Result<RgbaImage> {
    let (w, h) = source.dimensions();
    let longest = w.max(h);
    if longest <= max_edge || max_edge == 0 {
        return Ok(source);
    }
    let ratio = max_edge as f32 / longest as f32;
    let target_w = ((w as f32 * ratio).round() as u32).max(1);
    let target_h = ((h as f32 * ratio).round() as u32).max(1);

    let src_view = fir::images::ImageRef::new(w, h, source.as_raw(), fir::PixelType::U8x4)
        .context("failed to create source view for media downscale")?;
    let mut dst_image = fir::images::Image::new(target_w, target_h, fir::PixelType::U8x4);
    let options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Convolution(fir::FilterType::CatmullRom));
    let mut resizer = fir::Resizer::new();
    resizer
        .resize(&src_view, &mut dst_image, Some(&options))
        .context("media downscale failed")?;
    RgbaImage::from_raw(target_w, target_h, dst_image.into_vec())
        .context("failed to construct downscaled RGBA image")
}

/// Vertical two-tone gradient derived from the gallery's primary color.
pub fn placeholder_image(size: [u32; 2], rgb: [u8; 3]) -> RgbaImage {
    let (w, h) = (size[0].max(1), size[1].max(1));
    let mut img = RgbaImage::new(w, h);
    for (y, row) in img.rows_mut().enumerate() {
        // Darken toward the bottom; 0.35 keeps the base hue recognizable.
        let t = 1.0 - 0.65 * (y as f32 / (h.saturating_sub(1)).max(1) as f32);
        let shade = [
            (rgb[0] as f32 * t) as u8,
            (rgb[1] as f32 * t) as u8,
            (rgb[2] as f32 * t) as u8,
        ];
        for pixel in row {
            *pixel = image::Rgba([shade[0], shade[1], shade[2], 255]);
        }
    }
    img
}
