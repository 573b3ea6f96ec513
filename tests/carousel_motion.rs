//! End-to-end motion tests driving the carousel the way the windowed host
//! does: input events plus one `advance_frame` per simulated frame.

use std::time::{Duration, Instant};

use ring_gallery::carousel::{Carousel, GalleryItem};
use ring_gallery::config::Configuration;

fn items(n: usize) -> Vec<GalleryItem> {
    (0..n)
        .map(|i| GalleryItem::placeholder(&format!("Item {i}")))
        .collect()
}

fn run_frames(carousel: &mut Carousel, start: Instant, frames: usize) -> Instant {
    let mut now = start;
    for _ in 0..frames {
        now += Duration::from_millis(16);
        carousel.advance_frame(now);
    }
    now
}

#[test]
fn scroll_eases_toward_a_dragged_target() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(5), &cfg, 1920, 1080);
    let t0 = Instant::now();

    carousel.drag_start(0.0);
    carousel.drag_move(-200.0);
    // 200 px at the default 0.05 sensitivity: 10 world units.
    assert!((carousel.scroll().target() - 10.0).abs() < 1e-4);

    carousel.advance_frame(t0);
    let after_one = carousel.scroll().current();
    assert!(after_one > 0.0 && after_one < 10.0);

    run_frames(&mut carousel, t0, 600);
    assert!((carousel.scroll().current() - carousel.scroll().target()).abs() < 1e-2);
}

#[test]
fn drag_release_snaps_to_a_tile_boundary() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(5), &cfg, 1920, 1080);
    let tile_width = carousel.metrics().tile_width;

    carousel.drag_start(1000.0);
    carousel.drag_move(1000.0 - 3.3 * tile_width / cfg.gallery.drag_sensitivity());
    carousel.drag_end();

    let target = carousel.scroll().target();
    let slots = target / tile_width;
    assert!(
        (slots - slots.round()).abs() < 1e-3,
        "target {target} is not on a slot boundary (pitch {tile_width})"
    );
    assert!((slots.round() - 3.0).abs() < f32::EPSILON);
}

#[test]
fn strip_stays_contiguous_through_many_wraps() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(4), &cfg, 1920, 1080);
    let tile_width = carousel.metrics().tile_width;
    let t0 = Instant::now();

    // Drag several full loops to the right, then let everything settle.
    carousel.drag_start(0.0);
    carousel.drag_move(-40_000.0);
    carousel.drag_end();
    run_frames(&mut carousel, t0, 1200);

    let mut xs: Vec<f32> = carousel.poses().iter().map(|p| p.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for pair in xs.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            (gap - tile_width).abs() < 1e-2,
            "strip tore: gap {gap}, expected pitch {tile_width}"
        );
    }
}

#[test]
fn wrap_preserves_item_assignment() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(4), &cfg, 1920, 1080);
    let copies = carousel.poses().len() / 4;
    let t0 = Instant::now();

    carousel.drag_start(0.0);
    carousel.drag_move(-25_000.0);
    carousel.drag_end();
    run_frames(&mut carousel, t0, 800);

    // Every source item is still represented by exactly `copies` tiles.
    let mut counts = [0usize; 4];
    for pose in carousel.poses() {
        counts[pose.item] += 1;
    }
    assert!(counts.iter().all(|&c| c == copies));
}

#[test]
fn flat_bend_produces_no_lift_or_rotation() {
    let yaml = "gallery: { bend: 0.0 }";
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let mut carousel = Carousel::new(items(6), &cfg, 1920, 1080);
    let t0 = Instant::now();

    carousel.drag_start(0.0);
    carousel.drag_move(-900.0);
    run_frames(&mut carousel, t0, 120);

    for pose in carousel.poses() {
        assert_eq!(pose.y, 0.0);
        assert_eq!(pose.rotation, 0.0);
    }
}

#[test]
fn bent_strip_lifts_offcenter_tiles_toward_the_arc() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(6), &cfg, 1920, 1080);
    carousel.advance_frame(Instant::now());

    let half = carousel.viewport().half_width();
    for pose in carousel.poses() {
        if pose.x.abs() < 1e-3 {
            assert!(pose.y.abs() < 1e-4);
            assert!(pose.rotation.abs() < 1e-4);
        } else if pose.x.abs() <= half {
            // Positive bend drops off-center tiles below the apex and tilts
            // them toward it, with opposite signs on opposite sides.
            assert!(pose.y < 0.0, "tile at {} was not lowered", pose.x);
            assert_eq!(pose.rotation < 0.0, pose.x > 0.0);
        }
    }
}

#[test]
fn resize_preserves_scroll_position_and_retunes_tiles() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(5), &cfg, 1920, 1080);
    let wide_w = carousel.metrics().scale_w;
    let t0 = Instant::now();

    carousel.drag_start(0.0);
    carousel.drag_move(-600.0);
    let now = run_frames(&mut carousel, t0, 30);
    let current = carousel.scroll().current();
    let target = carousel.scroll().target();

    carousel.resize(700, 1100);
    assert_eq!(carousel.scroll().current(), current);
    assert_eq!(carousel.scroll().target(), target);
    // Narrow breakpoint re-derives a different tile size.
    assert!((carousel.metrics().scale_w - wide_w).abs() > 1e-3);

    // A collapsed surface is ignored outright.
    let metrics_before = carousel.metrics().tile_width;
    carousel.resize(0, 1100);
    assert_eq!(carousel.metrics().tile_width, metrics_before);

    run_frames(&mut carousel, now, 60);
    assert!(carousel.scroll().current().abs() > 0.0);
}

#[test]
fn breakpoint_resize_keeps_wrapped_tiles_contiguous() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(4), &cfg, 1920, 1080);
    let t0 = Instant::now();

    // Accumulate several whole-loop wrap shifts at the wide breakpoint.
    carousel.drag_start(0.0);
    carousel.drag_move(-40_000.0);
    carousel.drag_end();
    let now = run_frames(&mut carousel, t0, 1200);

    // Crossing into the narrow bucket changes the loop width; the shifts
    // must follow it, or recycled tiles land a stale-width multiple away.
    carousel.resize(700, 1100);
    let tile_width = carousel.metrics().tile_width;
    carousel.advance_frame(now);

    let mut xs: Vec<f32> = carousel.poses().iter().map(|p| p.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for pair in xs.windows(2) {
        let gap = pair[1] - pair[0];
        assert!(
            (gap - tile_width).abs() < 1e-2,
            "strip tore after resize: gap {gap}, expected pitch {tile_width}"
        );
    }

    // Contiguity must also hold once motion resumes at the new pitch.
    run_frames(&mut carousel, now, 300);
    let mut xs: Vec<f32> = carousel.poses().iter().map(|p| p.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for pair in xs.windows(2) {
        let gap = pair[1] - pair[0];
        assert!((gap - tile_width).abs() < 1e-2, "strip tore: gap {gap}");
    }
}

#[test]
fn widening_the_window_grows_the_loop_to_cover_it() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(1), &cfg, 800, 800);
    let before = carousel.poses().len();
    assert!(carousel.metrics().tile_width * before as f32 >= carousel.viewport().world_w);

    // An ultrawide surface needs more copies than construction provided.
    carousel.resize(3440, 1440);
    let after = carousel.poses().len();
    assert!(after > before, "loop did not grow: {before} -> {after}");
    assert!(
        carousel.metrics().tile_width * after as f32 >= carousel.viewport().world_w,
        "loop narrower than the viewport after resize"
    );
    assert!(carousel.poses().iter().all(|p| p.item == 0));

    // The grown strip still tiles seamlessly.
    let t0 = Instant::now();
    carousel.drag_start(0.0);
    carousel.drag_move(-10_000.0);
    carousel.drag_end();
    run_frames(&mut carousel, t0, 600);
    let tile_width = carousel.metrics().tile_width;
    let mut xs: Vec<f32> = carousel.poses().iter().map(|p| p.x).collect();
    xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
    for pair in xs.windows(2) {
        let gap = pair[1] - pair[0];
        assert!((gap - tile_width).abs() < 1e-2, "strip tore: gap {gap}");
    }
}

#[test]
fn wheel_bursts_settle_and_snap_once_quiet() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(5), &cfg, 1920, 1080);
    let tile_width = carousel.metrics().tile_width;
    let t0 = Instant::now();

    let mut now = t0;
    for _ in 0..12 {
        now += Duration::from_millis(30);
        carousel.wheel(1.0, now);
        carousel.advance_frame(now);
    }
    // Mid-burst the target is raw step accumulation, not yet snapped.
    let raw = carousel.scroll().target();
    assert!((raw - 12.0 * cfg.gallery.wheel_step()).abs() < 1e-4);

    // Quiet for longer than the settle window: the next frame snaps.
    now += cfg.input.wheel_settle + Duration::from_millis(50);
    carousel.advance_frame(now);
    let snapped = carousel.scroll().target();
    let slots = snapped / tile_width;
    assert!((slots - slots.round()).abs() < 1e-3);

    // Snapping is a one-shot; further frames leave the target alone.
    run_frames(&mut carousel, now, 10);
    assert_eq!(carousel.scroll().target(), snapped);
}

#[test]
fn destroyed_carousel_ignores_all_input() {
    let cfg = Configuration::default();
    let mut carousel = Carousel::new(items(3), &cfg, 1920, 1080);
    let t0 = Instant::now();
    run_frames(&mut carousel, t0, 5);
    let frozen: Vec<f32> = carousel.poses().iter().map(|p| p.x).collect();

    carousel.destroy();
    assert!(carousel.is_destroyed());
    carousel.drag_start(0.0);
    carousel.drag_move(-5_000.0);
    carousel.drag_end();
    carousel.wheel(4.0, t0 + Duration::from_secs(1));
    carousel.resize(640, 480);
    run_frames(&mut carousel, t0 + Duration::from_secs(1), 20);

    let after: Vec<f32> = carousel.poses().iter().map(|p| p.x).collect();
    assert_eq!(frozen, after);
}
