//! Rasterized tile captions.
//!
//! Glyphs are laid out at a supersampled pixel scale and scaled back down in
//! the draw transform so labels stay crisp, and each caption's transform
//! composes the surface projection with its tile's rotation about the
//! caption anchor so labels turn with their tiles.

use std::fs;
use std::path::Path;

use fontdb::{Database, Family, Query};
use tracing::warn;
use wgpu_glyph::ab_glyph::{FontArc, FontVec};
use wgpu_glyph::{
    GlyphBrush, GlyphBrushBuilder, HorizontalAlign, Layout, Section, Text, VerticalAlign,
    orthographic_projection,
};

const SUPERSAMPLE: f32 = 2.0;
const ASSET_FONT_DIR: &str = "assets/fonts";

pub struct CaptionRenderer {
    brush: Option<GlyphBrush<()>>,
    staging_belt: wgpu::util::StagingBelt,
    color: [f32; 4],
    caption_px: f32,
}

impl CaptionRenderer {
    /// Builds the glyph brush from the first font that resolves. When no
    /// usable font is found anywhere, captions are disabled with a warning
    /// and the gallery runs without labels.
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        font_name: Option<&str>,
        color: [f32; 4],
        caption_px: f32,
    ) -> Self {
        let brush = match resolve_font(font_name) {
            Some(font) => Some(GlyphBrushBuilder::using_font(font).build(device, format)),
            None => {
                warn!(requested = ?font_name, "no usable caption font; captions disabled");
                None
            }
        };
        Self {
            brush,
            staging_belt: wgpu::util::StagingBelt::new(1024),
            color,
            caption_px,
        }
    }

    pub fn enabled(&self) -> bool {
        self.brush.is_some()
    }

    /// Draw one caption centered at `anchor_px` (surface pixels, y-down),
    /// rotated by the tile's world rotation.
    #[allow(clippy::too_many_arguments)]
    pub fn draw(
        &mut self,
        device: &wgpu::Device,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        surface_size: (u32, u32),
        text: &str,
        anchor_px: (f32, f32),
        rotation: f32,
        scale_factor: f32,
    ) {
        let Some(brush) = self.brush.as_mut() else {
            return;
        };
        if text.is_empty() || surface_size.0 == 0 || surface_size.1 == 0 {
            return;
        }

        let px = self.caption_px * scale_factor.max(0.1) * SUPERSAMPLE;
        let section = Section {
            screen_position: (anchor_px.0 * SUPERSAMPLE, anchor_px.1 * SUPERSAMPLE),
            bounds: (f32::INFINITY, f32::INFINITY),
            text: vec![Text::new(text).with_scale(px).with_color(self.color)],
            layout: Layout::default_single_line()
                .h_align(HorizontalAlign::Center)
                .v_align(VerticalAlign::Top),
            ..Section::default()
        };
        brush.queue(section);

        let projection = orthographic_projection(surface_size.0, surface_size.1);
        let transform = mat4_mul(
            projection,
            anchored_descale(anchor_px, -rotation, SUPERSAMPLE),
        );
        if let Err(err) = brush.draw_queued_with_transform(
            device,
            &mut self.staging_belt,
            encoder,
            target,
            transform,
        ) {
            warn!("caption draw failed: {err}");
        }
    }

    /// Call once per frame after the last caption, before queue submit.
    pub fn finish_frame(&mut self) {
        self.staging_belt.finish();
    }

    /// Call after the frame's submission to reclaim staging memory.
    pub fn recall(&mut self) {
        self.staging_belt.recall();
    }
}

/// Pixel-space transform mapping supersampled glyph coordinates back to
/// surface pixels, rotating by `angle` about `anchor`. Column-major.
fn anchored_descale(anchor: (f32, f32), angle: f32, supersample: f32) -> [f32; 16] {
    let (sin, cos) = angle.sin_cos();
    let inv = 1.0 / supersample;
    // p -> R * (p - anchor * ss) / ss + anchor
    let tx = anchor.0 - (cos * anchor.0 - sin * anchor.1);
    let ty = anchor.1 - (sin * anchor.0 + cos * anchor.1);
    [
        cos * inv,
        sin * inv,
        0.0,
        0.0,
        -sin * inv,
        cos * inv,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
        0.0,
        tx,
        ty,
        0.0,
        1.0,
    ]
}

fn mat4_mul(a: [f32; 16], b: [f32; 16]) -> [f32; 16] {
    let mut out = [0.0f32; 16];
    for col in 0..4 {
        for row in 0..4 {
            let mut sum = 0.0;
            for k in 0..4 {
                sum += a[k * 4 + row] * b[col * 4 + k];
            }
            out[col * 4 + row] = sum;
        }
    }
    out
}

fn resolve_font(requested: Option<&str>) -> Option<FontArc> {
    match requested {
        Some(name) => load_font_from_assets(Some(name)).or_else(|| load_system_font(name)),
        None => load_font_from_assets(None).or_else(load_default_system_font),
    }
}

/// Scan `assets/fonts` for a matching (or, with no request, any) ttf/otf.
fn load_font_from_assets(requested: Option<&str>) -> Option<FontArc> {
    let entries = fs::read_dir(Path::new(ASSET_FONT_DIR)).ok()?;
    let requested_lower = requested.map(str::to_lowercase);
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let ext_ok = path
            .extension()
            .and_then(|s| s.to_str())
            .map(|ext| matches!(ext.to_lowercase().as_str(), "ttf" | "otf"))
            .unwrap_or(false);
        if !ext_ok {
            continue;
        }
        if let Some(wanted) = requested_lower.as_deref() {
            let stem_matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase() == wanted)
                .unwrap_or(false);
            let name_matches = path
                .file_name()
                .and_then(|s| s.to_str())
                .map(|s| s.to_lowercase() == wanted)
                .unwrap_or(false);
            if !stem_matches && !name_matches {
                continue;
            }
        }
        if let Ok(bytes) = fs::read(&path) {
            if let Ok(font) = FontArc::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }
    None
}

fn load_system_font(name: &str) -> Option<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();
    let requested_lower = name.to_lowercase();
    let face_id = db.faces().find_map(|face| {
        let mut matches = face
            .families
            .iter()
            .any(|(family, _)| family.to_lowercase() == requested_lower);
        if !matches {
            matches = face.post_script_name.to_lowercase() == requested_lower;
        }
        matches.then_some(face.id)
    })?;
    load_face(&db, face_id)
}

fn load_default_system_font() -> Option<FontArc> {
    let mut db = Database::new();
    db.load_system_fonts();
    let face_id = db.query(&Query {
        families: &[Family::SansSerif, Family::Serif],
        ..Query::default()
    })?;
    load_face(&db, face_id)
}

fn load_face(db: &Database, face_id: fontdb::ID) -> Option<FontArc> {
    db.with_face_data(face_id, |data, index| {
        FontVec::try_from_vec_and_index(data.to_vec(), index)
            .ok()
            .map(FontArc::new)
    })?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &[f32; 16], p: (f32, f32)) -> (f32, f32) {
        (
            m[0] * p.0 + m[4] * p.1 + m[12],
            m[1] * p.0 + m[5] * p.1 + m[13],
        )
    }

    #[test]
    fn anchored_descale_fixes_the_anchor() {
        let anchor = (320.0, 410.0);
        let m = anchored_descale(anchor, 0.35, SUPERSAMPLE);
        let mapped = apply(&m, (anchor.0 * SUPERSAMPLE, anchor.1 * SUPERSAMPLE));
        assert!((mapped.0 - anchor.0).abs() < 1e-3);
        assert!((mapped.1 - anchor.1).abs() < 1e-3);
    }

    #[test]
    fn zero_rotation_is_a_pure_descale_about_the_anchor() {
        let m = anchored_descale((100.0, 100.0), 0.0, SUPERSAMPLE);
        // A point 20 supersampled pixels right of the anchor lands 10 real
        // pixels right of it.
        let mapped = apply(&m, (220.0, 200.0));
        assert!((mapped.0 - 110.0).abs() < 1e-4);
        assert!((mapped.1 - 100.0).abs() < 1e-4);
    }

    #[test]
    fn mat4_mul_with_identity_is_a_noop() {
        let mut identity = [0.0f32; 16];
        identity[0] = 1.0;
        identity[5] = 1.0;
        identity[10] = 1.0;
        identity[15] = 1.0;
        let m = anchored_descale((7.0, 9.0), 1.0, SUPERSAMPLE);
        assert_eq!(mat4_mul(identity, m), m);
    }
}
