//! Windowed render host: owns the winit loop, the wgpu surface, and the
//! per-tile GPU resources, and feeds pointer/touch/wheel input into the
//! carousel engine. All gallery math lives in `crate::carousel`; this module
//! only presents poses.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use crossbeam_channel as xchan;
use lyon::path::Winding;
use lyon::path::builder::BorderRadii;
use lyon::path::math::{Box2D, point};
use lyon::tessellation::{
    BuffersBuilder, FillOptions, FillTessellator, FillVertex, VertexBuffers,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use wgpu::util::DeviceExt;
use wgpu::{self, SurfaceError};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::carousel::{Carousel, GalleryItem, TilePose};
use crate::config::Configuration;
use crate::events::{HostEvent, LibraryEvent, LoadedMedia, LoaderRequest};
use crate::render::caption::CaptionRenderer;
use crate::render::color::{parse_color_or, srgb_to_linear_rgba, to_rgb8};
use crate::render::loader;

const FALLBACK_PRIMARY: [f32; 4] = [0.353, 0.424, 0.49, 1.0];
const FALLBACK_TEXT: [f32; 4] = [0.957, 0.953, 0.941, 1.0];
const SHADOW_TINT: [f32; 4] = [0.0, 0.0, 0.0, 0.35];
const SHADOW_GROW: f32 = 1.05;
const SHADOW_DROP: f32 = 0.08;
const CAPTION_GAP: f32 = 0.06;

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Globals {
    world_to_clip: [f32; 4],
    _pad: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct TileParams {
    translate_rot: [f32; 4],
    size_grow: [f32; 4],
    uv_scale: [f32; 4],
    tint: [f32; 4],
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct MeshVertex {
    position: [f32; 2],
}

impl MeshVertex {
    fn layout<'a>() -> wgpu::VertexBufferLayout<'a> {
        const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<MeshVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &ATTRS,
        }
    }
}

struct TileMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Per tile-slot uniforms: the shadow and media passes draw in the same
/// frame, so each needs its own buffer.
struct TileSlot {
    shadow_buf: wgpu::Buffer,
    shadow_bind: wgpu::BindGroup,
    media_buf: wgpu::Buffer,
    media_bind: wgpu::BindGroup,
}

/// Per source-item texture state. Starts as a 1x1 stand-in until the loader
/// delivers pixels.
struct MediaSlot {
    bind_group: wgpu::BindGroup,
    natural: (u32, u32),
}

struct Gfx {
    shadow_pipeline: wgpu::RenderPipeline,
    media_pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    texture_layout: wgpu::BindGroupLayout,
    globals_buf: wgpu::Buffer,
    sampler: wgpu::Sampler,
    mesh: TileMesh,
    tile_slots: Vec<TileSlot>,
    media_slots: Vec<MediaSlot>,
    captions: CaptionRenderer,
}

struct HostApp {
    cfg: Configuration,
    cancel: CancellationToken,
    items: Vec<GalleryItem>,

    window: Option<Arc<Window>>,
    surface: Option<wgpu::Surface<'static>>,
    surface_config: Option<wgpu::SurfaceConfiguration>,
    device: Option<wgpu::Device>,
    queue: Option<wgpu::Queue>,
    gfx: Option<Gfx>,
    carousel: Option<Carousel>,

    loader_tx: xchan::Sender<LoaderRequest>,
    loader_rx: xchan::Receiver<LoadedMedia>,

    cursor_x: f32,
    mouse_down: bool,

    primary_srgb: [f32; 4],
    text_linear: [f32; 4],
    background: wgpu::Color,
}

impl HostApp {
    fn new(
        items: Vec<GalleryItem>,
        cfg: Configuration,
        cancel: CancellationToken,
        loader_tx: xchan::Sender<LoaderRequest>,
        loader_rx: xchan::Receiver<LoadedMedia>,
    ) -> Self {
        let primary = parse_color_or(&cfg.gallery.primary_color, FALLBACK_PRIMARY);
        let text = parse_color_or(&cfg.gallery.text_color, FALLBACK_TEXT);
        let primary_linear = srgb_to_linear_rgba(primary);
        let background = wgpu::Color {
            r: (primary_linear[0] * 0.12) as f64,
            g: (primary_linear[1] * 0.12) as f64,
            b: (primary_linear[2] * 0.12) as f64,
            a: 1.0,
        };
        Self {
            cfg,
            cancel,
            items,
            window: None,
            surface: None,
            surface_config: None,
            device: None,
            queue: None,
            gfx: None,
            carousel: None,
            loader_tx,
            loader_rx,
            cursor_x: 0.0,
            mouse_down: false,
            primary_srgb: primary,
            text_linear: srgb_to_linear_rgba(text),
            background,
        }
    }

    fn ensure_window(&mut self, event_loop: &ActiveEventLoop) -> Option<Arc<Window>> {
        if let Some(window) = self.window.as_ref() {
            return Some(window.clone());
        }
        let attrs = WindowAttributes::default().with_title("Ring Gallery");
        match event_loop.create_window(attrs) {
            Ok(window) => {
                let window = Arc::new(window);
                self.window = Some(window.clone());
                Some(window)
            }
            Err(err) => {
                error!(error = %err, "failed to create gallery window");
                None
            }
        }
    }

    fn init_gpu(&mut self, window: Arc<Window>) -> Result<()> {
        let instance = wgpu::Instance::default();
        let surface = instance
            .create_surface(window.clone())
            .context("failed to create surface")?;
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .context("failed to acquire GPU adapter")?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|fmt| fmt.is_srgb())
            .unwrap_or(caps.formats[0]);

        let limits = adapter.limits();
        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("gallery-device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::default(),
            trace: wgpu::Trace::default(),
        }))
        .context("failed to acquire GPU device")?;

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        info!(
            width = config.width,
            height = config.height,
            format = ?config.format,
            "gallery surface configured",
        );

        let carousel = Carousel::new(
            std::mem::take(&mut self.items),
            &self.cfg,
            config.width,
            config.height,
        );
        let gfx = self.build_gfx(&device, &queue, format, &carousel)?;
        self.request_all_media(&carousel);

        self.surface = Some(surface);
        self.surface_config = Some(config);
        self.device = Some(device);
        self.queue = Some(queue);
        self.gfx = Some(gfx);
        self.carousel = Some(carousel);
        Ok(())
    }

    fn build_gfx(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        format: wgpu::TextureFormat,
        carousel: &Carousel,
    ) -> Result<Gfx> {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("tile-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/tile.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tile-uniforms"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("tile-texture"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let shadow_pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("shadow-pipe-layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let media_pip_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("media-pipe-layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });

        let make_pipeline = |label: &str,
                             layout: &wgpu::PipelineLayout,
                             fs_entry: &str|
         -> wgpu::RenderPipeline {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(label),
                layout: Some(layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_main"),
                    buffers: &[MeshVertex::layout()],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    ..Default::default()
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some(fs_entry),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            })
        };
        let shadow_pipeline = make_pipeline("tile-shadow", &shadow_pip_layout, "fs_flat");
        let media_pipeline = make_pipeline("tile-media", &media_pip_layout, "fs_media");

        let globals_buf = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("media-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mesh = build_tile_mesh(
            device,
            carousel.metrics().scale_w,
            carousel.metrics().scale_h,
            self.cfg.gallery.border_radius,
        );

        let tile_slots = (0..carousel.poses().len())
            .map(|index| build_tile_slot(device, &uniform_layout, &globals_buf, index))
            .collect();

        let placeholder_rgb = to_rgb8(self.primary_srgb);
        let media_slots = carousel
            .items()
            .iter()
            .enumerate()
            .map(|(slot, _)| {
                // 1x1 stand-in until the loader delivers real pixels.
                let img = loader::placeholder_image([1, 1], placeholder_rgb);
                build_media_slot(device, queue, &texture_layout, &sampler, slot, &img)
            })
            .collect();

        let captions = CaptionRenderer::new(
            device,
            format,
            self.cfg.gallery.caption_font.as_deref(),
            self.text_linear,
            self.cfg.gallery.caption_px,
        );

        Ok(Gfx {
            shadow_pipeline,
            media_pipeline,
            uniform_layout,
            texture_layout,
            globals_buf,
            sampler,
            mesh,
            tile_slots,
            media_slots,
            captions,
        })
    }

    fn request_all_media(&self, carousel: &Carousel) {
        let max_edge = self.cfg.loader.max_texture_edge;
        for (slot, item) in carousel.items().iter().enumerate() {
            let _ = self.loader_tx.send(LoaderRequest::Media {
                slot,
                source: item.path.clone(),
                max_edge,
            });
        }
    }

    /// Non-blocking drain of decoded media; uploads each to its slot.
    fn drain_loaded_media(&mut self) {
        loop {
            let loaded = match self.loader_rx.try_recv() {
                Ok(loaded) => loaded,
                Err(_) => break,
            };
            let (Some(device), Some(queue), Some(gfx)) =
                (self.device.as_ref(), self.queue.as_ref(), self.gfx.as_mut())
            else {
                return;
            };
            if loaded.slot >= gfx.media_slots.len() {
                // Stale delivery from before a reconstruction.
                debug!(slot = loaded.slot, "dropping media for retired slot");
                continue;
            }
            upload_media(device, queue, gfx, loaded);
        }
    }

    fn handle_resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        let (Some(surface), Some(device), Some(config)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.surface_config.as_mut(),
        ) else {
            return;
        };
        config.width = new_size.width.max(1);
        config.height = new_size.height.max(1);
        surface.configure(device, config);
        debug!(
            width = config.width,
            height = config.height,
            "gallery surface resized",
        );

        if let Some(carousel) = self.carousel.as_mut() {
            carousel.resize(new_size.width, new_size.height);
            if let Some(gfx) = self.gfx.as_mut() {
                gfx.mesh = build_tile_mesh(
                    device,
                    carousel.metrics().scale_w,
                    carousel.metrics().scale_h,
                    self.cfg.gallery.border_radius,
                );
                // A wider surface can grow the tile loop; the per-tile
                // uniform slots must keep pace or draw indexes past the end.
                for index in gfx.tile_slots.len()..carousel.poses().len() {
                    gfx.tile_slots.push(build_tile_slot(
                        device,
                        &gfx.uniform_layout,
                        &gfx.globals_buf,
                        index,
                    ));
                }
            }
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    /// Item-set changes rebuild the engine wholesale: new scroll state, new
    /// tiles, new media slots. Patching in place would leave stale wrap
    /// corrections computed against the old loop width.
    fn rebuild_with_items(&mut self, items: Vec<GalleryItem>) {
        let (Some(device), Some(queue), Some(config)) = (
            self.device.as_ref(),
            self.queue.as_ref(),
            self.surface_config.as_ref(),
        ) else {
            self.items = items;
            return;
        };
        if let Some(old) = self.carousel.as_mut() {
            old.destroy();
        }
        let carousel = Carousel::new(items, &self.cfg, config.width, config.height);
        let Some(gfx) = self.gfx.as_mut() else {
            return;
        };

        gfx.mesh = build_tile_mesh(
            device,
            carousel.metrics().scale_w,
            carousel.metrics().scale_h,
            self.cfg.gallery.border_radius,
        );
        gfx.tile_slots = (0..carousel.poses().len())
            .map(|index| build_tile_slot(device, &gfx.uniform_layout, &gfx.globals_buf, index))
            .collect();
        let placeholder_rgb = to_rgb8(self.primary_srgb);
        gfx.media_slots = carousel
            .items()
            .iter()
            .enumerate()
            .map(|(slot, _)| {
                let img = loader::placeholder_image([1, 1], placeholder_rgb);
                build_media_slot(device, queue, &gfx.texture_layout, &gfx.sampler, slot, &img)
            })
            .collect();

        self.request_all_media(&carousel);
        self.carousel = Some(carousel);
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn draw(&mut self, event_loop: &ActiveEventLoop) {
        self.drain_loaded_media();

        let (Some(surface), Some(device), Some(queue), Some(config), Some(window)) = (
            self.surface.as_ref(),
            self.device.as_ref(),
            self.queue.as_ref(),
            self.surface_config.as_ref(),
            self.window.as_ref(),
        ) else {
            return;
        };
        let window = window.clone();
        let (Some(gfx), Some(carousel)) = (self.gfx.as_mut(), self.carousel.as_mut()) else {
            return;
        };

        let frame = match surface.get_current_texture() {
            Ok(frame) => frame,
            Err(SurfaceError::Outdated) | Err(SurfaceError::Lost) => {
                info!("gallery surface lost; reconfiguring");
                self.handle_resize(window.inner_size());
                return;
            }
            Err(SurfaceError::OutOfMemory) => {
                error!("gallery surface out of memory; exiting event loop");
                event_loop.exit();
                return;
            }
            Err(SurfaceError::Timeout) => {
                warn!("gallery surface acquisition timed out");
                return;
            }
            Err(SurfaceError::Other) => {
                warn!("gallery surface reported an unknown error; retrying");
                self.handle_resize(window.inner_size());
                return;
            }
        };

        let poses: Vec<TilePose> = carousel.advance_frame(Instant::now()).to_vec();
        let viewport = *carousel.viewport();
        let half_viewport = viewport.half_width();

        queue.write_buffer(
            &gfx.globals_buf,
            0,
            bytemuck::bytes_of(&Globals {
                world_to_clip: [2.0 / viewport.world_w, 2.0 / viewport.world_h, 0.0, 0.0],
                _pad: [0.0; 4],
            }),
        );

        let mut visible: Vec<(usize, TilePose)> = Vec::with_capacity(poses.len());
        for (index, pose) in poses.iter().enumerate() {
            if pose.is_visible(half_viewport) {
                visible.push((index, *pose));
            }
        }

        for (index, pose) in &visible {
            let slot = &gfx.tile_slots[*index];
            let natural = gfx.media_slots[pose.item].natural;
            let uv = cover_uv_scale(natural, pose.scale_w, pose.scale_h);
            queue.write_buffer(
                &slot.shadow_buf,
                0,
                bytemuck::bytes_of(&TileParams {
                    translate_rot: [
                        pose.x,
                        pose.y - SHADOW_DROP * pose.scale_h,
                        pose.rotation,
                        0.0,
                    ],
                    size_grow: [pose.scale_w, pose.scale_h, SHADOW_GROW, 0.0],
                    uv_scale: [1.0, 1.0, 0.0, 0.0],
                    tint: SHADOW_TINT,
                }),
            );
            queue.write_buffer(
                &slot.media_buf,
                0,
                bytemuck::bytes_of(&TileParams {
                    translate_rot: [pose.x, pose.y, pose.rotation, 0.0],
                    size_grow: [pose.scale_w, pose.scale_h, 1.0, 0.0],
                    uv_scale: [uv[0], uv[1], 0.0, 0.0],
                    tint: [1.0, 1.0, 1.0, 1.0],
                }),
            );
        }

        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("gallery-encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("gallery-tiles"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_vertex_buffer(0, gfx.mesh.vertex_buffer.slice(..));
            pass.set_index_buffer(gfx.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint16);

            // Shadows first so every tile's media draws above any shadow.
            pass.set_pipeline(&gfx.shadow_pipeline);
            for (index, _) in &visible {
                pass.set_bind_group(0, &gfx.tile_slots[*index].shadow_bind, &[]);
                pass.draw_indexed(0..gfx.mesh.index_count, 0, 0..1);
            }

            pass.set_pipeline(&gfx.media_pipeline);
            for (index, pose) in &visible {
                pass.set_bind_group(0, &gfx.tile_slots[*index].media_bind, &[]);
                pass.set_bind_group(1, &gfx.media_slots[pose.item].bind_group, &[]);
                pass.draw_indexed(0..gfx.mesh.index_count, 0, 0..1);
            }
        }

        // Captions last, above every tile and shadow.
        if gfx.captions.enabled() {
            let scale_factor = window.scale_factor() as f32;
            let items = carousel.items();
            for (_, pose) in &visible {
                let caption = &items[pose.item].caption;
                if caption.is_empty() {
                    continue;
                }
                let anchor = caption_anchor_px(pose, &viewport, (config.width, config.height));
                gfx.captions.draw(
                    device,
                    &mut encoder,
                    &view,
                    (config.width, config.height),
                    caption,
                    anchor,
                    pose.rotation,
                    scale_factor,
                );
            }
            gfx.captions.finish_frame();
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        gfx.captions.recall();

        // Continuous animation: the physics step runs every display refresh.
        window.request_redraw();
    }

    fn teardown(&mut self) {
        if let Some(carousel) = self.carousel.as_mut() {
            carousel.destroy();
        }
        let _ = self.loader_tx.send(LoaderRequest::Quit);
    }
}

impl ApplicationHandler<HostEvent> for HostApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.cancel.is_cancelled() {
            event_loop.exit();
            return;
        }
        let Some(window) = self.ensure_window(event_loop) else {
            event_loop.exit();
            return;
        };
        if self.device.is_none() {
            if let Err(err) = self.init_gpu(window) {
                error!(error = ?err, "failed to initialize GPU state");
                event_loop.exit();
                return;
            }
        }
        if let Some(window) = self.window.as_ref() {
            window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(window) = self.window.as_ref() else {
            return;
        };
        if window.id() != window_id {
            return;
        }

        match event {
            WindowEvent::CloseRequested => {
                info!("gallery window close requested");
                event_loop.exit();
            }
            WindowEvent::Resized(new_size) => self.handle_resize(new_size),
            WindowEvent::ScaleFactorChanged {
                mut inner_size_writer,
                ..
            } => {
                let size = window.inner_size();
                let _ = inner_size_writer.request_inner_size(size);
                self.handle_resize(size);
            }
            WindowEvent::RedrawRequested => self.draw(event_loop),
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor_x = position.x as f32;
                if self.mouse_down {
                    if let Some(carousel) = self.carousel.as_mut() {
                        carousel.drag_move(self.cursor_x);
                    }
                }
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let Some(carousel) = self.carousel.as_mut() else {
                    return;
                };
                match state {
                    ElementState::Pressed => {
                        self.mouse_down = true;
                        carousel.drag_start(self.cursor_x);
                    }
                    ElementState::Released => {
                        self.mouse_down = false;
                        carousel.drag_end();
                    }
                }
            }
            WindowEvent::Touch(touch) => {
                let Some(carousel) = self.carousel.as_mut() else {
                    return;
                };
                let x = touch.location.x as f32;
                match touch.phase {
                    TouchPhase::Started => carousel.drag_start(x),
                    TouchPhase::Moved => carousel.drag_move(x),
                    TouchPhase::Ended | TouchPhase::Cancelled => carousel.drag_end(),
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let Some(carousel) = self.carousel.as_mut() else {
                    return;
                };
                let delta = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y,
                    MouseScrollDelta::PixelDelta(pos) => -pos.y as f32,
                };
                carousel.wheel(delta, Instant::now());
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    if let PhysicalKey::Code(KeyCode::Escape | KeyCode::KeyQ) =
                        event.physical_key
                    {
                        info!("exit key pressed");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        self.drain_loaded_media();
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, event: HostEvent) {
        match event {
            HostEvent::Cancelled => {
                info!("gallery received cancellation event");
                event_loop.exit();
            }
            HostEvent::Library(LibraryEvent::ItemsChanged(items)) => {
                info!(items = items.len(), "item list changed; rebuilding gallery");
                self.rebuild_with_items(items);
            }
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.teardown();
    }
}

/// Run the windowed gallery on the calling thread until the window closes or
/// cancellation fires. Library updates arrive over `library_rx` and are
/// re-injected as user events.
pub fn run_windowed(
    items: Vec<GalleryItem>,
    cfg: Configuration,
    cancel: CancellationToken,
    mut library_rx: tokio::sync::mpsc::Receiver<LibraryEvent>,
) -> Result<()> {
    let event_loop = EventLoop::<HostEvent>::with_user_event()
        .build()
        .context("failed to build gallery event loop")?;

    let cancel_task = {
        let cancel = cancel.clone();
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            cancel.cancelled().await;
            let _ = proxy.send_event(HostEvent::Cancelled);
        })
    };
    let library_task = {
        let proxy = event_loop.create_proxy();
        tokio::spawn(async move {
            while let Some(event) = library_rx.recv().await {
                if proxy.send_event(HostEvent::Library(event)).is_err() {
                    break;
                }
            }
        })
    };

    let (loader_tx, loader_req_rx) = xchan::unbounded::<LoaderRequest>();
    let (loader_res_tx, loader_rx) = xchan::unbounded::<LoadedMedia>();
    let placeholder_rgb = to_rgb8(parse_color_or(
        &cfg.gallery.primary_color,
        FALLBACK_PRIMARY,
    ));
    loader::spawn(
        loader_req_rx,
        loader_res_tx,
        cfg.loader.placeholder_size,
        placeholder_rgb,
    );

    let mut app = HostApp::new(items, cfg, cancel, loader_tx, loader_rx);
    let run_result = event_loop.run_app(&mut app);
    cancel_task.abort();
    library_task.abort();

    run_result.context("gallery event loop failed")
}

/// Rounded-rectangle tile mesh in world units, centered at the origin.
/// Falls back to a plain quad if tessellation fails.
fn build_tile_mesh(device: &wgpu::Device, scale_w: f32, scale_h: f32, radius_frac: f32) -> TileMesh {
    let half_w = (scale_w * 0.5).max(1e-3);
    let half_h = (scale_h * 0.5).max(1e-3);
    let radius = (radius_frac.clamp(0.0, 1.0) * scale_w.min(scale_h)).min(half_w.min(half_h));

    let mut builder = lyon::path::Path::builder();
    builder.add_rounded_rectangle(
        &Box2D::new(point(-half_w, -half_h), point(half_w, half_h)),
        &BorderRadii::new(radius.max(0.0)),
        Winding::Positive,
    );
    let path = builder.build();

    let mut buffers: VertexBuffers<MeshVertex, u16> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let result = tessellator.tessellate_path(
        &path,
        &FillOptions::default(),
        &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| MeshVertex {
            position: vertex.position().to_array(),
        }),
    );
    if result.is_err() || buffers.vertices.is_empty() || buffers.indices.is_empty() {
        warn!("tile tessellation failed; falling back to a plain quad");
        buffers.vertices = vec![
            MeshVertex {
                position: [-half_w, -half_h],
            },
            MeshVertex {
                position: [half_w, -half_h],
            },
            MeshVertex {
                position: [half_w, half_h],
            },
            MeshVertex {
                position: [-half_w, half_h],
            },
        ];
        buffers.indices = vec![0, 1, 2, 0, 2, 3];
    }

    let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("tile-mesh"),
        contents: bytemuck::cast_slice(&buffers.vertices),
        usage: wgpu::BufferUsages::VERTEX,
    });
    let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("tile-mesh-indices"),
        contents: bytemuck::cast_slice(&buffers.indices),
        usage: wgpu::BufferUsages::INDEX,
    });
    TileMesh {
        vertex_buffer,
        index_buffer,
        index_count: buffers.indices.len() as u32,
    }
}

fn build_tile_slot(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    globals_buf: &wgpu::Buffer,
    index: usize,
) -> TileSlot {
    let make_buf = |label: String| {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&label),
            size: std::mem::size_of::<TileParams>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    };
    let shadow_buf = make_buf(format!("tile-{index}-shadow"));
    let media_buf = make_buf(format!("tile-{index}-media"));
    let make_bind = |buf: &wgpu::Buffer| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("tile-uniform-bind"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: buf.as_entire_binding(),
                },
            ],
        })
    };
    let shadow_bind = make_bind(&shadow_buf);
    let media_bind = make_bind(&media_buf);
    TileSlot {
        shadow_buf,
        shadow_bind,
        media_buf,
        media_bind,
    }
}

fn build_media_slot(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    slot: usize,
    img: &image::RgbaImage,
) -> MediaSlot {
    let (w, h) = img.dimensions();
    let texture = create_media_texture(device, queue, slot, w, h, img.as_raw());
    let bind_group = bind_media_texture(device, layout, sampler, &texture);
    MediaSlot {
        bind_group,
        natural: (w, h),
    }
}

fn create_media_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    slot: usize,
    width: u32,
    height: u32,
    pixels: &[u8],
) -> wgpu::Texture {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("media-{slot}")),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        texture.as_image_copy(),
        pixels,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
    texture
}

fn bind_media_texture(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    texture: &wgpu::Texture,
) -> wgpu::BindGroup {
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("media-bind"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
        ],
    })
}

fn upload_media(device: &wgpu::Device, queue: &wgpu::Queue, gfx: &mut Gfx, loaded: LoadedMedia) {
    if loaded.width == 0 || loaded.height == 0 {
        warn!(slot = loaded.slot, "ignoring zero-sized media");
        return;
    }
    debug!(
        slot = loaded.slot,
        width = loaded.width,
        height = loaded.height,
        placeholder = loaded.placeholder,
        "media uploaded",
    );
    let texture = create_media_texture(
        device,
        queue,
        loaded.slot,
        loaded.width,
        loaded.height,
        &loaded.pixels,
    );
    let bind_group = bind_media_texture(device, &gfx.texture_layout, &gfx.sampler, &texture);
    gfx.media_slots[loaded.slot] = MediaSlot {
        bind_group,
        natural: (loaded.width, loaded.height),
    };
}

/// Centered cover-crop UV factors: scale the sampled region so the media
/// fills the tile without distortion, cropping the longer axis.
fn cover_uv_scale(natural: (u32, u32), tile_w: f32, tile_h: f32) -> [f32; 2] {
    let (nw, nh) = natural;
    if nw == 0 || nh == 0 || tile_w <= 0.0 || tile_h <= 0.0 {
        return [1.0, 1.0];
    }
    let media_aspect = nw as f32 / nh as f32;
    let tile_aspect = tile_w / tile_h;
    if media_aspect > tile_aspect {
        [tile_aspect / media_aspect, 1.0]
    } else {
        [1.0, media_aspect / tile_aspect]
    }
}

/// Surface-pixel anchor for a tile's caption: just below the tile's bottom
/// edge in tile-local space, rotated with the tile.
fn caption_anchor_px(
    pose: &TilePose,
    viewport: &crate::layout::Viewport,
    surface: (u32, u32),
) -> (f32, f32) {
    let local_y = -(pose.scale_h * 0.5 + CAPTION_GAP * pose.scale_h);
    let (sin, cos) = pose.rotation.sin_cos();
    let world_x = pose.x - local_y * sin;
    let world_y = pose.y + local_y * cos;
    (
        (world_x / viewport.world_w + 0.5) * surface.0 as f32,
        (0.5 - world_y / viewport.world_h) * surface.1 as f32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_crop_trims_the_longer_axis() {
        // Wide media in a portrait tile crops horizontally.
        let uv = cover_uv_scale((2000, 1000), 1.0, 2.0);
        assert!(uv[0] < 1.0 && (uv[1] - 1.0).abs() < 1e-6);
        // Tall media in the same tile crops vertically.
        let uv = cover_uv_scale((1000, 4000), 1.0, 2.0);
        assert!((uv[0] - 1.0).abs() < 1e-6 && uv[1] < 1.0);
        // Matching aspect passes through.
        let uv = cover_uv_scale((500, 1000), 1.0, 2.0);
        assert!((uv[0] - 1.0).abs() < 1e-6 && (uv[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cover_crop_guards_zero_sizes() {
        assert_eq!(cover_uv_scale((0, 100), 1.0, 1.0), [1.0, 1.0]);
        assert_eq!(cover_uv_scale((100, 100), 0.0, 1.0), [1.0, 1.0]);
    }

    #[test]
    fn caption_anchor_sits_below_an_unrotated_tile() {
        let pose = TilePose {
            item: 0,
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            scale_w: 4.0,
            scale_h: 6.0,
        };
        let viewport = crate::layout::Viewport::compute(1000, 1000, 45.0, 20.0).unwrap();
        let (ax, ay) = caption_anchor_px(&pose, &viewport, (1000, 1000));
        assert!((ax - 500.0).abs() < 1e-3);
        // Below the surface center in y-down pixel space.
        assert!(ay > 500.0);
    }
}
