//! One carousel slot and its wraparound bookkeeping.

use crate::scroll::Direction;

/// A slot in the duplicated tile list. `index` is fixed for the lifetime of
/// the carousel; `extra` accumulates whole-loop corrections as the tile is
/// recycled from one end of the strip to the other.
#[derive(Debug, Clone)]
pub struct Tile {
    pub index: usize,
    /// Index into the source item list (before duplication).
    pub item: usize,
    pub base_x: f32,
    /// Net whole-loop shifts applied so far; `extra` is always
    /// `wraps * width_total` for the current loop width.
    pub wraps: i32,
    pub extra: f32,
    pub scale_w: f32,
    pub scale_h: f32,
    pub bend_factor: f32,
}

impl Tile {
    pub fn new(index: usize, item: usize) -> Self {
        Self {
            index,
            item,
            base_x: 0.0,
            wraps: 0,
            extra: 0.0,
            scale_w: 0.0,
            scale_h: 0.0,
            bend_factor: 0.0,
        }
    }

    /// Position of this tile for the current frame.
    pub fn world_x(&self, scroll_current: f32) -> f32 {
        self.base_x - scroll_current - self.extra
    }

    /// Recycle the tile once it has fully exited the viewport in the
    /// direction of travel. Shifting `extra` by one full loop makes the
    /// tile's next `world_x` contiguous with its neighbors at the far end.
    /// The opposite-direction case is deliberately ignored: recycling against
    /// travel would visibly pop the tile.
    pub fn wrap(
        &mut self,
        world_x: f32,
        direction: Direction,
        half_viewport: f32,
        width_total: f32,
    ) {
        let half_tile = self.scale_w * 0.5;
        let is_before = world_x + half_tile < -half_viewport;
        let is_after = world_x - half_tile > half_viewport;
        match direction {
            Direction::Right if is_before => self.wraps -= 1,
            Direction::Left if is_after => self.wraps += 1,
            _ => return,
        }
        self.extra = self.wraps as f32 * width_total;
    }

    /// Re-express the accumulated shift against a new loop width. Keeping the
    /// count rather than the raw offset means a resize cannot leave `extra`
    /// as a stale multiple of the old width.
    pub fn rescale_extra(&mut self, width_total: f32) {
        self.extra = self.wraps as f32 * width_total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile_at(base_x: f32, scale_w: f32) -> Tile {
        let mut tile = Tile::new(0, 0);
        tile.base_x = base_x;
        tile.scale_w = scale_w;
        tile
    }

    #[test]
    fn world_x_subtracts_scroll_and_extra() {
        let mut tile = tile_at(300.0, 100.0);
        tile.extra = 50.0;
        assert!((tile.world_x(120.0) - 130.0).abs() < 1e-6);
    }

    #[test]
    fn rightward_exit_recycles_by_one_loop() {
        let mut tile = tile_at(0.0, 100.0);
        // Fully past the left edge of a 600-wide viewport.
        let world_x = -380.0;
        tile.wrap(world_x, Direction::Right, 300.0, 800.0);
        assert!((tile.extra + 800.0).abs() < 1e-6);
        // Next frame, same scroll: the tile reappears one loop to the right.
        let scroll = tile.base_x - world_x;
        assert!((tile.world_x(scroll) - (world_x + 800.0)).abs() < 1e-6);
    }

    #[test]
    fn leftward_exit_recycles_the_other_way() {
        let mut tile = tile_at(0.0, 100.0);
        tile.wrap(380.0, Direction::Left, 300.0, 800.0);
        assert!((tile.extra - 800.0).abs() < 1e-6);
    }

    #[test]
    fn never_recycles_against_travel() {
        let mut tile = tile_at(0.0, 100.0);
        tile.wrap(-380.0, Direction::Left, 300.0, 800.0);
        assert_eq!(tile.extra, 0.0);
        tile.wrap(380.0, Direction::Right, 300.0, 800.0);
        assert_eq!(tile.extra, 0.0);
    }

    #[test]
    fn rescale_rebases_accumulated_wraps_onto_a_new_loop_width() {
        let mut tile = tile_at(0.0, 100.0);
        tile.wrap(-380.0, Direction::Right, 300.0, 800.0);
        tile.wrap(-380.0, Direction::Right, 300.0, 800.0);
        assert_eq!(tile.wraps, -2);
        assert!((tile.extra + 1600.0).abs() < 1e-6);
        // A narrower loop after a breakpoint crossing.
        tile.rescale_extra(500.0);
        assert!((tile.extra + 1000.0).abs() < 1e-6);
    }

    #[test]
    fn partially_visible_tile_stays_put() {
        let mut tile = tile_at(0.0, 100.0);
        // Straddling the left edge: not fully out yet.
        tile.wrap(-320.0, Direction::Right, 300.0, 800.0);
        assert_eq!(tile.extra, 0.0);
    }
}
