use egui_wgpu::ScreenDescriptor;
use winit::event::WindowEvent;
use winit::window::Window;

pub struct EguiContext {
    ctx: egui::Context,
    state: egui_winit::State,
    renderer: egui_wgpu::Renderer,
}

pub struct EguiRenderTarget<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub window: &'a Window,
    pub view: &'a wgpu::TextureView,
    pub surface_size: [u32; 2],
}

impl EguiContext {
    pub fn new(device: &wgpu::Device, output_format: wgpu::TextureFormat, window: &Window) -> Self {
        let ctx = egui::Context::default();
        let viewport_id = ctx.viewport_id();

        let state = egui_winit::State::new(
            ctx.clone(),
            viewport_id,
            window,
            Some(window.scale_factor() as f32),
            None,
            Some(2048),
        );

        // The overlay draws straight onto the swapchain image, no depth.
        let renderer = egui_wgpu::Renderer::new(
            device,
            output_format,
            egui_wgpu::RendererOptions {
                depth_stencil_format: None,
                msaa_samples: 1,
                dithering: true,
                predictable_texture_filtering: false,
            },
        );

        Self {
            ctx,
            state,
            renderer,
        }
    }

    /// True when egui used the event and the scene should ignore it.
    pub fn handle_event(&mut self, window: &Window, event: &WindowEvent) -> bool {
        self.state.on_window_event(window, event).consumed
    }

    pub fn wants_pointer(&self) -> bool {
        self.ctx.wants_pointer_input()
    }

    /// Runs one egui frame and returns its output for [`EguiContext::render`].
    pub fn run(&mut self, window: &Window, ui: impl FnOnce(&egui::Context)) -> egui::FullOutput {
        let raw_input = self.state.take_egui_input(window);
        self.ctx.begin_pass(raw_input);
        ui(&self.ctx);
        let output = self.ctx.end_pass();
        self.state
            .handle_platform_output(window, output.platform_output.clone());
        output
    }

    pub fn render(&mut self, target: &mut EguiRenderTarget<'_>, output: egui::FullOutput) {
        if target.surface_size[0] == 0 || target.surface_size[1] == 0 {
            return;
        }

        let screen_descriptor = ScreenDescriptor {
            size_in_pixels: target.surface_size,
            pixels_per_point: target.window.scale_factor() as f32,
        };

        for (id, delta) in &output.textures_delta.set {
            self.renderer
                .update_texture(target.device, target.queue, *id, delta);
        }

        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);

        self.renderer.update_buffers(
            target.device,
            target.queue,
            target.encoder,
            &primitives,
            &screen_descriptor,
        );

        let pass = target
            .encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("UIOverlay"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

        // egui-wgpu wants a 'static pass
        let mut pass = pass.forget_lifetime();
        self.renderer
            .render(&mut pass, &primitives, &screen_descriptor);
        drop(pass);

        for id in &output.textures_delta.free {
            self.renderer.free_texture(id);
        }
    }

    pub fn context(&self) -> &egui::Context {
        &self.ctx
    }
}
