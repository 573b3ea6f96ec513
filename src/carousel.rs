//! The orchestrator: owns the scroll state, viewport, duplicated tile list,
//! and input controller, and composes them once per animation frame.

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::arc;
use crate::config::Configuration;
use crate::input::InputController;
use crate::layout::{TileMetrics, Viewport};
use crate::scroll::ScrollState;
use crate::tile::Tile;

/// One entry of the ordered item list the host supplies at construction.
/// `path: None` marks a built-in placeholder rendered by the media loader.
#[derive(Debug, Clone)]
pub struct GalleryItem {
    pub path: Option<PathBuf>,
    pub caption: String,
}

impl GalleryItem {
    pub fn from_path(path: PathBuf, caption: String) -> Self {
        Self {
            path: Some(path),
            caption,
        }
    }

    pub fn placeholder(caption: &str) -> Self {
        Self {
            path: None,
            caption: caption.to_string(),
        }
    }
}

/// Substituted when the host hands over an empty item list.
pub fn placeholder_items() -> Vec<GalleryItem> {
    ["Aurora", "Dunes", "Harbor", "Summit"]
        .iter()
        .map(|caption| GalleryItem::placeholder(caption))
        .collect()
}

/// Everything the presenter needs to draw one tile this frame.
#[derive(Debug, Clone, Copy)]
pub struct TilePose {
    /// Index into the source item list; selects the media texture.
    pub item: usize,
    pub x: f32,
    pub y: f32,
    /// Radians, counter-clockwise in world space.
    pub rotation: f32,
    pub scale_w: f32,
    pub scale_h: f32,
}

impl TilePose {
    /// Zeroed pose used until the first frame step fills the slot in.
    fn resting() -> Self {
        Self {
            item: 0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_w: 0.0,
            scale_h: 0.0,
        }
    }

    /// Whether any part of the tile overlaps the horizontal viewport band.
    pub fn is_visible(&self, half_viewport: f32) -> bool {
        self.x.abs() - self.scale_w * 0.5 <= half_viewport
    }
}

pub struct Carousel {
    items: Vec<GalleryItem>,
    tiles: Vec<Tile>,
    scroll: ScrollState,
    viewport: Viewport,
    input: InputController,
    metrics: TileMetrics,
    width_total: f32,
    poses: Vec<TilePose>,
    cfg: Configuration,
    destroyed: bool,
}

impl Carousel {
    /// Construct against the initial surface size. Zero dimensions are
    /// tolerated by substituting a 1x1 viewport; the first real resize
    /// replaces it.
    pub fn new(items: Vec<GalleryItem>, cfg: &Configuration, screen_w: u32, screen_h: u32) -> Self {
        let items = if items.is_empty() {
            debug!("empty item list; substituting built-in placeholders");
            placeholder_items()
        } else {
            items
        };

        let viewport = Viewport::compute(
            screen_w.max(1),
            screen_h.max(1),
            cfg.camera.fov_deg,
            cfg.camera.z,
        )
        .expect("non-zero surface dimensions");
        let metrics = TileMetrics::compute(
            &viewport,
            cfg.breakpoints.select(viewport.screen_w),
            cfg.gallery.bend,
        );

        // Duplicating the source list once is only seamless while every tile
        // is narrower than half the viewport; widen the loop until it spans
        // the viewport plus one tile of slack on each side.
        let copies = loop_copies(viewport.world_w, metrics.tile_width, items.len());
        let tile_count = items.len() * copies;
        let mut tiles: Vec<Tile> = (0..tile_count)
            .map(|index| Tile::new(index, index % items.len()))
            .collect();
        apply_metrics(&mut tiles, &metrics);

        let mut input = InputController::new(
            cfg.gallery.drag_sensitivity(),
            cfg.gallery.wheel_step(),
            cfg.input.wheel_settle,
        );
        input.set_layout(metrics.tile_width, tile_count);

        let width_total = metrics.width_total(tile_count);
        let poses = vec![TilePose::resting(); tile_count];

        debug!(
            items = items.len(),
            copies,
            tile_width = metrics.tile_width,
            width_total,
            "carousel constructed"
        );

        Self {
            items,
            tiles,
            scroll: ScrollState::new(cfg.gallery.scroll_ease),
            viewport,
            input,
            metrics,
            width_total,
            poses,
            cfg: cfg.clone(),
            destroyed: false,
        }
    }

    pub fn items(&self) -> &[GalleryItem] {
        &self.items
    }

    pub fn scroll(&self) -> &ScrollState {
        &self.scroll
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn metrics(&self) -> &TileMetrics {
        &self.metrics
    }

    pub fn poses(&self) -> &[TilePose] {
        &self.poses
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// One frame step, in load-bearing order: settle-poll input, advance the
    /// scroll physics, derive direction, then per tile compute the pose from
    /// the pre-wrap position and only afterwards run the wrap step. After
    /// `destroy` this returns the last presented poses unchanged.
    pub fn advance_frame(&mut self, now: Instant) -> &[TilePose] {
        if self.destroyed {
            return &self.poses;
        }
        self.input.poll(&mut self.scroll, now);
        self.scroll.advance();
        let direction = self.scroll.direction();
        let half_viewport = self.viewport.half_width();
        let current = self.scroll.current();

        for (tile, pose) in self.tiles.iter_mut().zip(self.poses.iter_mut()) {
            let world_x = tile.world_x(current);
            let (dy, rotation) = arc::project(world_x, tile.bend_factor, half_viewport);
            *pose = TilePose {
                item: tile.item,
                x: world_x,
                y: dy,
                rotation,
                scale_w: tile.scale_w,
                scale_h: tile.scale_h,
            };
            tile.wrap(world_x, direction, half_viewport, self.width_total);
        }
        &self.poses
    }

    /// Recompute the viewport and every derived tile dimension. Scroll state
    /// survives untouched, so position carries across a resize; accumulated
    /// wrap shifts are rebased onto the new loop width so the strip stays
    /// contiguous even when the breakpoint bucket changes. A collapsed
    /// surface skips the recompute entirely.
    pub fn resize(&mut self, screen_w: u32, screen_h: u32) {
        if self.destroyed {
            return;
        }
        let Some(viewport) = Viewport::compute(
            screen_w,
            screen_h,
            self.cfg.camera.fov_deg,
            self.cfg.camera.z,
        ) else {
            debug!(screen_w, screen_h, "skipping resize to collapsed surface");
            return;
        };
        self.viewport = viewport;
        self.metrics = TileMetrics::compute(
            &self.viewport,
            self.cfg.breakpoints.select(self.viewport.screen_w),
            self.cfg.gallery.bend,
        );

        // A wider surface may need more copies than construction provided;
        // grow the loop so it still spans the viewport with slack. Never
        // shrink: surplus tiles recycle harmlessly offscreen.
        let copies = loop_copies(
            self.viewport.world_w,
            self.metrics.tile_width,
            self.items.len(),
        );
        let needed = self.items.len() * copies;
        if needed > self.tiles.len() {
            debug!(
                from = self.tiles.len(),
                to = needed,
                "growing tile loop after resize"
            );
            for index in self.tiles.len()..needed {
                self.tiles.push(Tile::new(index, index % self.items.len()));
            }
            self.poses.resize(needed, TilePose::resting());
        }

        apply_metrics(&mut self.tiles, &self.metrics);
        self.width_total = self.metrics.width_total(self.tiles.len());
        for tile in self.tiles.iter_mut() {
            tile.rescale_extra(self.width_total);
        }
        self.input
            .set_layout(self.metrics.tile_width, self.tiles.len());
    }

    pub fn drag_start(&mut self, x: f32) {
        if !self.destroyed {
            self.input.begin_drag(x, &self.scroll);
        }
    }

    pub fn drag_move(&mut self, x: f32) {
        if !self.destroyed {
            self.input.drag_to(x, &mut self.scroll);
        }
    }

    pub fn drag_end(&mut self) {
        if !self.destroyed {
            self.input.end_drag(&mut self.scroll);
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.input.is_dragging()
    }

    pub fn wheel(&mut self, delta: f32, now: Instant) {
        if !self.destroyed {
            self.input.wheel(delta, &mut self.scroll, now);
        }
    }

    /// Atomic teardown: drops any gesture and pending settle deadline and
    /// freezes the engine. All further input and frame steps are no-ops.
    pub fn destroy(&mut self) {
        self.input.cancel();
        self.destroyed = true;
    }
}

fn apply_metrics(tiles: &mut [Tile], metrics: &TileMetrics) {
    for tile in tiles.iter_mut() {
        tile.scale_w = metrics.scale_w;
        tile.scale_h = metrics.scale_h;
        tile.bend_factor = metrics.bend_factor;
        tile.base_x = metrics.tile_width * tile.index as f32;
    }
}

/// Number of times to repeat the source list so one full loop covers the
/// viewport with a tile of slack on each side. Two copies is the floor.
fn loop_copies(world_w: f32, tile_width: f32, item_count: usize) -> usize {
    if tile_width <= 0.0 || item_count == 0 {
        return 2;
    }
    let needed = (world_w + 2.0 * tile_width) / (item_count as f32 * tile_width);
    (needed.ceil() as usize).max(2)
}
