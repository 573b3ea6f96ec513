use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Top-level YAML configuration. Every section has a complete default so an
/// empty file (or a missing one) yields a runnable gallery.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Configuration {
    pub library: LibraryOptions,
    pub gallery: GalleryOptions,
    pub camera: CameraOptions,
    pub breakpoints: Breakpoints,
    pub input: InputOptions,
    pub loader: LoaderOptions,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde
    /// defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            self.gallery.scroll_ease > 0.0 && self.gallery.scroll_ease <= 1.0,
            "gallery.scroll-ease must be in (0, 1]"
        );
        ensure!(
            (0.0..=1.0).contains(&self.gallery.border_radius),
            "gallery.border-radius must be in [0, 1]"
        );
        ensure!(
            self.gallery.bend.is_finite(),
            "gallery.bend must be finite"
        );
        ensure!(
            self.gallery.scroll_speed > 0.0,
            "gallery.scroll-speed must be positive"
        );
        ensure!(
            self.gallery.caption_px > 0.0,
            "gallery.caption-px must be positive"
        );
        ensure!(
            self.camera.fov_deg > 0.0 && self.camera.fov_deg < 180.0,
            "camera.fov-deg must be in (0, 180)"
        );
        ensure!(self.camera.z > 0.0, "camera.z must be positive");
        self.breakpoints
            .validate()
            .context("invalid breakpoints configuration")?;
        ensure!(
            self.loader.max_texture_edge > 0,
            "loader.max-texture-edge must be greater than zero"
        );
        ensure!(
            self.loader.placeholder_size[0] > 0 && self.loader.placeholder_size[1] > 0,
            "loader.placeholder-size dimensions must be greater than zero"
        );
        Ok(self)
    }
}

/// Where the item list comes from: explicit entries, a scanned directory,
/// or (when both are empty) the built-in placeholder set.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LibraryOptions {
    pub items: Vec<ItemSpec>,
    pub items_dir: Option<PathBuf>,
    /// Watch `items-dir` for changes and rebuild the gallery when it settles.
    pub watch: bool,
    /// Optional deterministic seed for the discovery-order shuffle.
    pub shuffle_seed: Option<u64>,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            items_dir: None,
            watch: true,
            shuffle_seed: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ItemSpec {
    pub path: PathBuf,
    /// Falls back to a caption humanized from the file stem.
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct GalleryOptions {
    /// Curvature magnitude; 0 lays the strip out flat.
    pub bend: f32,
    /// Corner radius as a fraction of the smaller tile dimension.
    pub border_radius: f32,
    /// Wheel/drag sensitivity multiplier.
    pub scroll_speed: f32,
    /// Fraction of the remaining scroll distance closed per frame.
    pub scroll_ease: f32,
    pub primary_color: String,
    pub text_color: String,
    /// Font family (or postscript) name for captions; `None` takes whatever
    /// the caption renderer resolves first.
    pub caption_font: Option<String>,
    pub caption_px: f32,
}

impl GalleryOptions {
    const fn default_bend() -> f32 {
        3.0
    }

    /// Drag distances arrive in pixels; this converts them to world units.
    pub fn drag_sensitivity(&self) -> f32 {
        self.scroll_speed * 0.025
    }

    pub fn wheel_step(&self) -> f32 {
        self.scroll_speed * 0.2
    }
}

impl Default for GalleryOptions {
    fn default() -> Self {
        Self {
            bend: Self::default_bend(),
            border_radius: 0.05,
            scroll_speed: 2.0,
            scroll_ease: 0.05,
            primary_color: "#5a6c7d".to_string(),
            text_color: "#f4f3f0".to_string(),
            caption_font: None,
            caption_px: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CameraOptions {
    pub fov_deg: f32,
    pub z: f32,
}

impl Default for CameraOptions {
    fn default() -> Self {
        Self {
            fov_deg: 45.0,
            z: 20.0,
        }
    }
}

/// Responsive sizing table keyed by screen pixel width.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Breakpoints {
    pub narrow_max: u32,
    pub medium_max: u32,
    pub narrow: BreakpointBucket,
    pub medium: BreakpointBucket,
    pub wide: BreakpointBucket,
}

impl Breakpoints {
    pub fn select(&self, screen_w: u32) -> &BreakpointBucket {
        if screen_w <= self.narrow_max {
            &self.narrow
        } else if screen_w <= self.medium_max {
            &self.medium
        } else {
            &self.wide
        }
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.narrow_max < self.medium_max,
            "breakpoints.narrow-max must be below medium-max"
        );
        for (name, bucket) in [
            ("narrow", &self.narrow),
            ("medium", &self.medium),
            ("wide", &self.wide),
        ] {
            ensure!(
                bucket.tile_px[0] > 0.0 && bucket.tile_px[1] > 0.0,
                "breakpoints.{name}.tile-px dimensions must be positive"
            );
            ensure!(
                bucket.scale_divisor > 0.0,
                "breakpoints.{name}.scale-divisor must be positive"
            );
            ensure!(
                bucket.padding >= 0.0,
                "breakpoints.{name}.padding must not be negative"
            );
            ensure!(
                bucket.bend_damping >= 1.0,
                "breakpoints.{name}.bend-damping must be at least 1"
            );
        }
        Ok(())
    }
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            narrow_max: 768,
            medium_max: 1280,
            narrow: BreakpointBucket {
                tile_px: [480.0, 620.0],
                padding: 1.5,
                scale_divisor: 1200.0,
                bend_damping: 2.0,
            },
            medium: BreakpointBucket {
                tile_px: [640.0, 820.0],
                padding: 1.8,
                scale_divisor: 1350.0,
                bend_damping: 1.4,
            },
            wide: BreakpointBucket {
                tile_px: [700.0, 900.0],
                padding: 2.0,
                scale_divisor: 1500.0,
                bend_damping: 1.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BreakpointBucket {
    /// Target tile size in pixels, [width, height].
    pub tile_px: [f32; 2],
    /// World-space gap added to the tile width to form the slot pitch.
    pub padding: f32,
    /// Screen height divided by this gives the responsive scale factor.
    pub scale_divisor: f32,
    /// Configured bend is divided by this; full bend is too strong on small
    /// screens.
    pub bend_damping: f32,
}

impl Default for BreakpointBucket {
    fn default() -> Self {
        Breakpoints::default().wide
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InputOptions {
    /// Quiet period after the last wheel event before the target snaps.
    #[serde(with = "humantime_serde")]
    pub wheel_settle: Duration,
}

impl Default for InputOptions {
    fn default() -> Self {
        Self {
            wheel_settle: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LoaderOptions {
    /// Longest texture edge after decode; larger media is downscaled.
    pub max_texture_edge: u32,
    /// Fixed pixel size of the generated fallback image, [width, height].
    pub placeholder_size: [u32; 2],
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_texture_edge: 2048,
            placeholder_size: [700, 900],
        }
    }
}
