use std::collections::HashSet;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::*,
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::error::RenderError;
use crate::renderer::{
    Camera, CameraMovement, FrameTargets, FrameViewports, GpuContext, GpuResources, PassExecutor,
    PostProcessTarget, ProgramSet, SceneAssets, SceneRenderer, ShadowMapTarget,
};
use crate::scene::FrameState;
use crate::settings::RenderSettings;
use crate::time::{FrameTimer, Instant};

#[cfg(feature = "egui")]
use crate::ui::{EguiContext, EguiRenderTarget, ParametersWindow};

const WINDOW_TITLE: &str = "OpenGL tech demo";
/// Pixels of trackpad scroll that count as one wheel notch.
const PIXELS_PER_SCROLL_LINE: f32 = 50.0;

const MOVEMENT_KEYS: [(KeyCode, CameraMovement); 4] = [
    (KeyCode::KeyW, CameraMovement::Forward),
    (KeyCode::KeyS, CameraMovement::Backward),
    (KeyCode::KeyA, CameraMovement::Left),
    (KeyCode::KeyD, CameraMovement::Right),
];

/// Everything that needs a live device. Built once the window exists.
struct Runtime {
    gpu: GpuContext,
    resources: GpuResources,
    post: PostProcessTarget,
    shadow: ShadowMapTarget,
    scene: SceneRenderer,
    executor: PassExecutor,
    last_draw_count: usize,
    #[cfg(feature = "egui")]
    egui: EguiContext,
    #[cfg(feature = "egui")]
    parameters: ParametersWindow,
}

impl Runtime {
    fn new(window: Arc<Window>, settings: &RenderSettings) -> Result<Self, RenderError> {
        let gpu = pollster::block_on(GpuContext::new(window.clone(), settings))?;
        let mut resources = GpuResources::new(&gpu.device, &gpu.queue);

        let programs = ProgramSet::load(settings.shader_dir.as_deref());
        let assets = SceneAssets::load(&mut resources, &settings.assets);

        let post = PostProcessTarget::new(
            &gpu.device,
            settings.resolution.width,
            settings.resolution.height,
        );
        let shadow = ShadowMapTarget::new(
            &gpu.device,
            settings.shadow_map_size,
            gpu.supports_border_clamp,
        );

        #[cfg(feature = "egui")]
        let egui = EguiContext::new(&gpu.device, gpu.config.format, &window);

        Ok(Self {
            executor: PassExecutor::new(&gpu.device),
            scene: SceneRenderer::new(programs, assets),
            gpu,
            resources,
            post,
            shadow,
            last_draw_count: 0,
            #[cfg(feature = "egui")]
            egui,
            #[cfg(feature = "egui")]
            parameters: ParametersWindow::new(),
        })
    }

    #[cfg_attr(not(feature = "egui"), allow(unused_variables))]
    fn render(
        &mut self,
        window: &Window,
        state: &mut FrameState,
        camera: &Camera,
        timer: &FrameTimer,
    ) -> Result<(), RenderError> {
        let frame = match self.gpu.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::debug!("Surface lost or outdated, reconfiguring");
                self.gpu.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for the next surface texture");
                return Ok(());
            }
            Err(err @ wgpu::SurfaceError::OutOfMemory) => return Err(err.into()),
            Err(err) => {
                log::warn!("Skipping frame: {err}");
                return Ok(());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let viewports = FrameViewports {
            screen: self.gpu.surface_size(),
            post: self.post.size(),
            shadow: self.shadow.size(),
        };
        let commands = self
            .scene
            .record_frame(state, camera, viewports, &mut self.resources);
        self.last_draw_count = commands.draw_count();

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Encoder"),
            });

        let targets = FrameTargets {
            screen_color: &view,
            screen_depth: &self.gpu.depth.view,
            screen_format: self.gpu.config.format,
            post: &self.post,
            shadow: &self.shadow,
        };
        self.executor.execute(
            &self.gpu.device,
            &self.gpu.queue,
            &mut encoder,
            &commands,
            self.scene.programs(),
            &self.resources,
            &targets,
        );

        #[cfg(feature = "egui")]
        {
            let draws = self.last_draw_count;
            let parameters = &mut self.parameters;
            let output = self
                .egui
                .run(window, |ctx| parameters.show(ctx, state, timer, draws));
            let (width, height) = self.gpu.surface_size();
            self.egui.render(
                &mut EguiRenderTarget {
                    device: &self.gpu.device,
                    queue: &self.gpu.queue,
                    encoder: &mut encoder,
                    window,
                    view: &view,
                    surface_size: [width, height],
                },
                output,
            );
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}

pub struct App {
    settings: RenderSettings,
    window: Option<Arc<Window>>,
    runtime: Option<Runtime>,
    state: FrameState,
    camera: Camera,
    timer: FrameTimer,
    held_keys: HashSet<KeyCode>,
}

impl App {
    pub fn new(settings: RenderSettings) -> Self {
        let state = FrameState::new(&settings);
        Self {
            settings,
            window: None,
            runtime: None,
            state,
            camera: Camera::new(glam::Vec3::new(0.0, 10.0, -20.0)),
            timer: FrameTimer::new(),
            held_keys: HashSet::new(),
        }
    }

    pub fn state(&self) -> &FrameState {
        &self.state
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: &KeyEvent) {
        let PhysicalKey::Code(code) = event.physical_key else {
            return;
        };
        match event.state {
            ElementState::Pressed => {
                match code {
                    KeyCode::Escape => event_loop.exit(),
                    KeyCode::ControlLeft if !event.repeat => self.state.toggle_camera_movement(),
                    _ => {}
                }
                self.held_keys.insert(code);
            }
            ElementState::Released => {
                self.held_keys.remove(&code);
            }
        }
    }

    fn apply_held_keys(&mut self) {
        let dt = self.state.delta_time;
        for (key, movement) in MOVEMENT_KEYS {
            if self.held_keys.contains(&key) {
                self.camera.process_keyboard(movement, dt);
            }
        }
    }

    fn handle_resize(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        if let Some(runtime) = self.runtime.as_mut() {
            runtime.gpu.resize(size);
        }
        self.state.viewport = (size.width, size.height);
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let dt = self.timer.tick(Instant::now());
        self.state.advance(dt);
        self.apply_held_keys();

        let (Some(window), Some(runtime)) = (self.window.as_ref(), self.runtime.as_mut()) else {
            return;
        };
        if let Err(err) = runtime.render(window, &mut self.state, &self.camera, &self.timer) {
            log::error!("Render failed: {err}");
            event_loop.exit();
            return;
        }
        window.request_redraw();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = Window::default_attributes()
            .with_title(WINDOW_TITLE)
            .with_inner_size(PhysicalSize::new(
                self.settings.resolution.width,
                self.settings.resolution.height,
            ));
        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                log::error!("Failed to create window: {err}");
                event_loop.exit();
                return;
            }
        };

        match Runtime::new(window.clone(), &self.settings) {
            Ok(runtime) => {
                let (width, height) = runtime.gpu.surface_size();
                self.state.viewport = (width, height);
                self.runtime = Some(runtime);
            }
            Err(err) => {
                log::error!("Failed to initialise the renderer: {err}");
                event_loop.exit();
                return;
            }
        }

        self.timer = FrameTimer::new();
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = self.window.clone() else {
            return;
        };
        if window.id() != id {
            return;
        }

        #[cfg(feature = "egui")]
        let ui_consumed = self
            .runtime
            .as_mut()
            .map(|runtime| runtime.egui.handle_event(&window, &event))
            .unwrap_or(false);
        #[cfg(not(feature = "egui"))]
        let ui_consumed = false;

        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                self.handle_resize(size);
            }
            WindowEvent::ScaleFactorChanged { .. } => {
                self.handle_resize(window.inner_size());
            }
            WindowEvent::RedrawRequested => {
                self.redraw(event_loop);
            }
            WindowEvent::KeyboardInput { event, .. } if !ui_consumed => {
                self.handle_key(event_loop, &event);
            }
            WindowEvent::CursorMoved { position, .. } if !ui_consumed => {
                if let Some(offset) = self.state.cursor_offset(position.x as f32, position.y as f32) {
                    self.camera.process_mouse_movement(offset.x, offset.y, true);
                }
            }
            WindowEvent::MouseWheel { delta, .. } if !ui_consumed => {
                let lines = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(position) => position.y as f32 / PIXELS_PER_SCROLL_LINE,
                };
                self.camera.process_mouse_scroll(lines);
            }
            WindowEvent::Focused(false) => {
                self.held_keys.clear();
            }
            _ => {}
        }
    }
}
