//! Viewport projection and responsive tile sizing.

use crate::config::BreakpointBucket;

/// World-space dimensions of the presentation surface at the carousel's
/// working depth, derived from a vertical field of view and camera distance.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub screen_w: u32,
    pub screen_h: u32,
    pub world_w: f32,
    pub world_h: f32,
}

impl Viewport {
    /// Returns `None` for a collapsed or hidden surface; the caller keeps the
    /// previous viewport in effect until a valid size is observed.
    pub fn compute(screen_w: u32, screen_h: u32, fov_deg: f32, camera_z: f32) -> Option<Self> {
        if screen_w == 0 || screen_h == 0 {
            return None;
        }
        let world_h = 2.0 * (fov_deg.to_radians() * 0.5).tan() * camera_z;
        let world_w = world_h * (screen_w as f32 / screen_h as f32);
        Some(Self {
            screen_w,
            screen_h,
            world_w,
            world_h,
        })
    }

    pub fn half_width(&self) -> f32 {
        self.world_w * 0.5
    }
}

/// Per-breakpoint tile sizing shared by every tile, recomputed on resize.
#[derive(Debug, Clone, Copy)]
pub struct TileMetrics {
    pub scale_w: f32,
    pub scale_h: f32,
    /// Tile visual width plus padding: the slot pitch of the strip.
    pub tile_width: f32,
    pub bend_factor: f32,
}

impl TileMetrics {
    pub fn compute(viewport: &Viewport, bucket: &BreakpointBucket, bend: f32) -> Self {
        let screen_w = viewport.screen_w as f32;
        let screen_h = viewport.screen_h as f32;
        let scale = screen_h / bucket.scale_divisor;
        let scale_h = viewport.world_h * (bucket.tile_px[1] * scale) / screen_h;
        let scale_w = viewport.world_w * (bucket.tile_px[0] * scale) / screen_w;
        Self {
            scale_w,
            scale_h,
            tile_width: scale_w + bucket.padding,
            bend_factor: bend / bucket.bend_damping.max(1.0),
        }
    }

    /// Total span of one full loop; the wraparound recycling increment.
    pub fn width_total(&self, tile_count: usize) -> f32 {
        self.tile_width * tile_count as f32
    }
}
