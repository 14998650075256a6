//! GPU device, queue, and presentation target management.
//!
//! The backend runs in one of two modes: presenting to a winit window surface,
//! or headless against an offscreen color target (used by tools and tests).
//! Both modes share the same device initialization path.

use anyhow::{Result as AnyResult, anyhow};
use pollster::block_on;
use std::sync::Arc;
use wgpu::*;
use winit::window::Window;

/// Where presented frames go.
pub enum SurfaceTarget {
    /// Present to a window surface.
    Window(Arc<Window>),
    /// Render into an offscreen texture of the given size; `present` is a no-op.
    Headless { width: u32, height: u32 },
}

/// Device, queue, and the default framebuffer.
pub struct GpuContext {
    /// Kept alive for the surface's lifetime.
    _instance: Instance,
    pub(crate) device: Arc<Device>,
    pub(crate) queue: Queue,
    pub(crate) surface: Option<Surface<'static>>,
    pub(crate) surface_format: TextureFormat,
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Offscreen default target in headless mode.
    pub(crate) headless_target: Option<Texture>,
    window: Option<Arc<Window>>,
}

impl GpuContext {
    /// Initialize the device and the presentation target.
    ///
    /// # Errors
    /// Fails when no suitable adapter exists or device creation fails.
    pub fn new(target: SurfaceTarget) -> AnyResult<Self> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::PRIMARY | Backends::GL,
            ..Default::default()
        });

        let (surface, window, width, height) = match target {
            SurfaceTarget::Window(window) => {
                let size = window.inner_size();
                let surface = instance
                    .create_surface(Arc::clone(&window))
                    .map_err(|err| anyhow!("failed to create window surface: {err}"))?;
                (Some(surface), Some(window), size.width, size.height)
            }
            SurfaceTarget::Headless { width, height } => (None, None, width, height),
        };

        let adapter = block_on(instance.request_adapter(&RequestAdapterOptions {
            power_preference: PowerPreference::HighPerformance,
            compatible_surface: surface.as_ref(),
            force_fallback_adapter: false,
        }))
        .map_err(|err| anyhow!("failed to find a suitable GPU adapter: {err}"))?;

        let (device, queue) = block_on(adapter.request_device(&DeviceDescriptor {
            label: Some("rhi-device"),
            required_features: Features::empty(),
            required_limits: Limits::default(),
            memory_hints: MemoryHints::default(),
            trace: Trace::default(),
        }))
        .map_err(|err| anyhow!("failed to create GPU device: {err}"))?;
        device.on_uncaptured_error(Box::new(|error| {
            log::error!(target: "wgpu_rhi", "uncaptured WGPU error: {error:?}");
        }));
        let device = Arc::new(device);

        let surface_format = surface.as_ref().map_or(TextureFormat::Rgba8Unorm, |s| {
            let caps = s.get_capabilities(&adapter);
            caps.formats
                .iter()
                .copied()
                .find(|format| !format.is_srgb())
                .unwrap_or(caps.formats[0])
        });

        let mut ctx = Self {
            _instance: instance,
            device,
            queue,
            surface,
            surface_format,
            width: width.max(1),
            height: height.max(1),
            headless_target: None,
            window,
        };
        ctx.configure(ctx.width, ctx.height);
        Ok(ctx)
    }

    /// (Re)configure the default framebuffer for a new drawable size.
    pub fn configure(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
        if let Some(surface) = &self.surface {
            surface.configure(
                &self.device,
                &SurfaceConfiguration {
                    usage: TextureUsages::RENDER_ATTACHMENT,
                    format: self.surface_format,
                    width: self.width,
                    height: self.height,
                    present_mode: PresentMode::AutoVsync,
                    desired_maximum_frame_latency: 2,
                    alpha_mode: CompositeAlphaMode::Opaque,
                    view_formats: vec![],
                },
            );
            self.headless_target = None;
        } else {
            self.headless_target = Some(self.device.create_texture(&TextureDescriptor {
                label: Some("headless-default-target"),
                size: Extent3d {
                    width: self.width,
                    height: self.height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: TextureDimension::D2,
                format: self.surface_format,
                usage: TextureUsages::RENDER_ATTACHMENT | TextureUsages::COPY_SRC,
                view_formats: &[],
            }));
        }
        log::debug!(
            target: "wgpu_rhi",
            "default framebuffer configured at {}x{}", self.width, self.height
        );
    }

    /// Current drawable size, tracking the window in windowed mode.
    pub fn drawable_size(&self) -> (u32, u32) {
        self.window.as_ref().map_or((self.width, self.height), |w| {
            let size = w.inner_size();
            (size.width.max(1), size.height.max(1))
        })
    }
}
