//! Demonstrates rendering text labels.
//!
//! This example exercises the `textel-wgpu` backend: a title with per-label
//! alignment, a batch of tick labels positioned in data space via a range,
//! and a kerning on/off comparison.
//!
//! Controls: K toggles kerning, ESC exits.

use std::sync::Arc;

use textel::CosmicRasterizer;
use textel_wgpu::{
    Align, Baseline, Color, CoordinateOrigin, DataRange, FontSpec, Label, LabelOptions,
    RendererConfig, TextRenderer,
};
use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

struct App {
    window: Option<Arc<Window>>,
    gpu_state: Option<GpuState>,
    kerning: bool,
}

struct GpuState {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    renderer: TextRenderer,
    title: Label,
    ticks: Label,
    kerning_demo: Label,
    kerning_ref: Label,
}

impl GpuState {
    async fn new(window: Arc<Window>) -> Self {
        let size = window.inner_size();

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .unwrap();

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: wgpu::MemoryHints::default(),
                experimental_features: wgpu::ExperimentalFeatures::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .unwrap();

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .copied()
            .unwrap_or(surface_caps.formats[0]);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width,
            height: size.height,
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let mut renderer = TextRenderer::with_config(
            &device,
            surface_format,
            Box::new(CosmicRasterizer::new()),
            RendererConfig {
                origin: CoordinateOrigin::TopLeft,
                ..RendererConfig::default()
            },
        );
        renderer.resize(size.width, size.height);

        let mut title = Label::new(&renderer, &device);
        title.update(
            &mut renderer,
            &device,
            &queue,
            LabelOptions::text("textel: instanced glyph labels")
                .with_font(FontSpec::family("sans-serif").with_size(32.0))
                .with_color(Color::rgb(0.9, 0.9, 0.95))
                .with_align(Align::Center)
                .with_baseline(Baseline::Top)
                .with_position([size.width as f32 * 0.5, 24.0]),
        );

        // Tick labels batched into one label, positioned in data space.
        let mut ticks = Label::new(&renderer, &device);
        let values: Vec<f32> = (0..=10).map(|i| i as f32 * 0.1).collect();
        ticks.update(
            &mut renderer,
            &device,
            &queue,
            LabelOptions::batch(values.iter().map(|v| format!("{v:.1}")))
                .with_positions(values.iter().map(|&v| [v, 0.82]).collect())
                .with_range(DataRange::new(-0.08, 0.0, 1.08, 1.0))
                .with_font(FontSpec::family("monospace").with_size(14.0))
                .with_color(Color::rgb(0.6, 0.65, 0.7))
                .with_align(Align::Center),
        );

        // Toggled with K; the reference line below it stays kerned.
        let mut kerning_demo = Label::new(&renderer, &device);
        kerning_demo.update(
            &mut renderer,
            &device,
            &queue,
            LabelOptions::text("AVATAR WAVE To.")
                .with_position([80.0, 180.0])
                .with_font(FontSpec::family("serif").with_size(42.0))
                .with_color(Color::rgb(0.85, 0.7, 0.4)),
        );

        let mut kerning_ref = Label::new(&renderer, &device);
        kerning_ref.update(
            &mut renderer,
            &device,
            &queue,
            LabelOptions::text("AVATAR WAVE To.")
                .with_position([80.0, 240.0])
                .with_font(FontSpec::family("serif").with_size(42.0))
                .with_color(Color::rgb(0.5, 0.45, 0.35)),
        );

        Self {
            surface,
            device,
            queue,
            config,
            renderer,
            title,
            ticks,
            kerning_demo,
            kerning_ref,
        }
    }

    fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(new_size.width, new_size.height);

            self.title.update(
                &mut self.renderer,
                &self.device,
                &self.queue,
                LabelOptions::default().with_position([new_size.width as f32 * 0.5, 24.0]),
            );
            self.ticks.update(
                &mut self.renderer,
                &self.device,
                &self.queue,
                LabelOptions::default(),
            );
            self.kerning_demo.update(
                &mut self.renderer,
                &self.device,
                &self.queue,
                LabelOptions::default(),
            );
            self.kerning_ref.update(
                &mut self.renderer,
                &self.device,
                &self.queue,
                LabelOptions::default(),
            );
        }
    }

    fn set_kerning(&mut self, kerning: bool) {
        self.kerning_demo.update(
            &mut self.renderer,
            &self.device,
            &self.queue,
            LabelOptions::default().with_kerning(kerning),
        );
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Labels Encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Labels Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: 0.07,
                            g: 0.07,
                            b: 0.09,
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            self.title.draw(&self.renderer, &mut render_pass);
            self.ticks.draw(&self.renderer, &mut render_pass);
            self.kerning_demo.draw(&self.renderer, &mut render_pass);
            self.kerning_ref.draw(&self.renderer, &mut render_pass);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let window_attributes = Window::default_attributes()
                .with_title("textel - labels")
                .with_inner_size(winit::dpi::LogicalSize::new(900, 600));

            let window = Arc::new(event_loop.create_window(window_attributes).unwrap());
            self.window = Some(window.clone());
            self.gpu_state = Some(pollster::block_on(GpuState::new(window)));
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: winit::keyboard::PhysicalKey::Code(key_code),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => match key_code {
                winit::keyboard::KeyCode::Escape => event_loop.exit(),
                winit::keyboard::KeyCode::KeyK => {
                    self.kerning = !self.kerning;
                    println!("Kerning: {}", self.kerning);
                    if let Some(gpu_state) = &mut self.gpu_state {
                        gpu_state.set_kerning(self.kerning);
                    }
                }
                _ => {}
            },

            WindowEvent::Resized(physical_size) => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    gpu_state.resize(physical_size);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(gpu_state) = &mut self.gpu_state {
                    match gpu_state.render() {
                        Ok(_) => {}
                        Err(wgpu::SurfaceError::Lost) => {
                            if let Some(window) = &self.window {
                                gpu_state.resize(window.inner_size())
                            }
                        }
                        Err(wgpu::SurfaceError::OutOfMemory) => event_loop.exit(),
                        Err(e) => eprintln!("Render error: {:?}", e),
                    }
                }
            }

            _ => {}
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() {
    env_logger::init();

    let event_loop = EventLoop::new().unwrap();
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App {
        window: None,
        gpu_state: None,
        kerning: true,
    };

    println!("Controls:\n  K - Toggle kerning on the first demo line\n  ESC - Exit");

    event_loop.run_app(&mut app).unwrap();
}
