use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use ring_gallery::config::Configuration;

#[test]
fn empty_config_yields_runnable_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert!((cfg.gallery.bend - 3.0).abs() < f32::EPSILON);
    assert!((cfg.gallery.scroll_ease - 0.05).abs() < f32::EPSILON);
    assert!((cfg.gallery.border_radius - 0.05).abs() < f32::EPSILON);
    assert!((cfg.camera.fov_deg - 45.0).abs() < f32::EPSILON);
    assert!((cfg.camera.z - 20.0).abs() < f32::EPSILON);
    assert_eq!(cfg.input.wheel_settle, Duration::from_millis(200));
    assert_eq!(cfg.loader.max_texture_edge, 2048);
    assert!(cfg.library.items.is_empty());
    assert!(cfg.library.watch);
    let cfg = cfg.validated().unwrap();
    assert_eq!(cfg.breakpoints.narrow_max, 768);
}

#[test]
fn parse_kebab_case_gallery_options() {
    let yaml = r##"
gallery:
  bend: -2.5
  border-radius: 0.1
  scroll-speed: 4.0
  scroll-ease: 0.08
  primary-color: "#123456"
  caption-font: "Inter"
  caption-px: 24
"##;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!((cfg.gallery.bend + 2.5).abs() < f32::EPSILON);
    assert!((cfg.gallery.border_radius - 0.1).abs() < f32::EPSILON);
    assert_eq!(cfg.gallery.primary_color, "#123456");
    assert_eq!(cfg.gallery.caption_font.as_deref(), Some("Inter"));
    // Derived input scalars follow scroll-speed.
    assert!((cfg.gallery.drag_sensitivity() - 0.1).abs() < 1e-6);
    assert!((cfg.gallery.wheel_step() - 0.8).abs() < 1e-6);
}

#[test]
fn parse_library_items_and_seed() {
    let yaml = r#"
library:
  items:
    - path: "/media/one.jpg"
      caption: "First Light"
    - path: "/media/two.png"
  items-dir: "/media/extra"
  watch: false
  shuffle-seed: 42
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.library.items.len(), 2);
    assert_eq!(cfg.library.items[0].path, PathBuf::from("/media/one.jpg"));
    assert_eq!(cfg.library.items[0].caption.as_deref(), Some("First Light"));
    assert!(cfg.library.items[1].caption.is_none());
    assert_eq!(cfg.library.items_dir, Some(PathBuf::from("/media/extra")));
    assert!(!cfg.library.watch);
    assert_eq!(cfg.library.shuffle_seed, Some(42));
}

#[test]
fn parse_humantime_wheel_settle() {
    let yaml = r#"
input:
  wheel-settle: 350ms
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.input.wheel_settle, Duration::from_millis(350));
}

#[test]
fn breakpoint_selection_uses_inclusive_bounds() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    let bps = &cfg.breakpoints;
    assert!((bps.select(768).scale_divisor - 1200.0).abs() < f32::EPSILON);
    assert!((bps.select(769).scale_divisor - 1350.0).abs() < f32::EPSILON);
    assert!((bps.select(1280).scale_divisor - 1350.0).abs() < f32::EPSILON);
    assert!((bps.select(1281).scale_divisor - 1500.0).abs() < f32::EPSILON);
}

#[test]
fn partial_breakpoint_override_keeps_other_buckets() {
    let yaml = r#"
breakpoints:
  narrow-max: 600
  narrow:
    tile-px: [400, 520]
    padding: 1.0
    scale-divisor: 1000
    bend-damping: 3.0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(cfg.breakpoints.narrow_max, 600);
    assert_eq!(cfg.breakpoints.narrow.tile_px, [400.0, 520.0]);
    // Untouched buckets keep their defaults.
    assert_eq!(cfg.breakpoints.wide.tile_px, [700.0, 900.0]);
    cfg.validated().unwrap();
}

#[test]
fn validation_rejects_out_of_range_values() {
    let bad_ease: Configuration = serde_yaml::from_str("gallery: { scroll-ease: 0.0 }").unwrap();
    assert!(bad_ease.validated().is_err());

    let bad_radius: Configuration =
        serde_yaml::from_str("gallery: { border-radius: 1.5 }").unwrap();
    assert!(bad_radius.validated().is_err());

    let bad_fov: Configuration = serde_yaml::from_str("camera: { fov-deg: 180.0 }").unwrap();
    assert!(bad_fov.validated().is_err());

    let bad_breaks: Configuration =
        serde_yaml::from_str("breakpoints: { narrow-max: 1300, medium-max: 1280 }").unwrap();
    assert!(bad_breaks.validated().is_err());

    let bad_damping: Configuration = serde_yaml::from_str(
        "breakpoints: { wide: { tile-px: [700, 900], padding: 2.0, scale-divisor: 1500, bend-damping: 0.5 } }",
    )
    .unwrap();
    assert!(bad_damping.validated().is_err());

    let bad_edge: Configuration =
        serde_yaml::from_str("loader: { max-texture-edge: 0 }").unwrap();
    assert!(bad_edge.validated().is_err());
}

#[test]
fn from_yaml_file_round_trips() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "gallery:\n  bend: 1.25\nlibrary:\n  shuffle-seed: 9"
    )
    .unwrap();
    let cfg = Configuration::from_yaml_file(file.path()).unwrap();
    assert!((cfg.gallery.bend - 1.25).abs() < f32::EPSILON);
    assert_eq!(cfg.library.shuffle_seed, Some(9));
}

#[test]
fn missing_config_file_is_an_error() {
    assert!(Configuration::from_yaml_file("/definitely/not/here.yaml").is_err());
}
