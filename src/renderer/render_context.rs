use crate::renderer::commands::{PassRecord, PassTarget};
use crate::renderer::depth::Depth;
use crate::renderer::framebuffer::{
    PostProcessTarget, ShadowMapTarget, POST_COLOR_FORMAT, POST_DEPTH_FORMAT, SHADOW_FORMAT,
};
use crate::renderer::state::{ClearFlags, ClearOp};

/// The attachments a frame can render into.
pub struct FrameTargets<'a> {
    pub screen_color: &'a wgpu::TextureView,
    pub screen_depth: &'a wgpu::TextureView,
    pub screen_format: wgpu::TextureFormat,
    pub post: &'a PostProcessTarget,
    pub shadow: &'a ShadowMapTarget,
}

impl<'a> FrameTargets<'a> {
    pub fn color_format(&self, target: PassTarget) -> Option<wgpu::TextureFormat> {
        match target {
            PassTarget::Screen => Some(self.screen_format),
            PassTarget::PostProcess => Some(POST_COLOR_FORMAT),
            PassTarget::ShadowMap => None,
        }
    }

    pub fn depth_format(target: PassTarget) -> wgpu::TextureFormat {
        match target {
            PassTarget::Screen => Depth::FORMAT,
            PassTarget::PostProcess => POST_DEPTH_FORMAT,
            PassTarget::ShadowMap => SHADOW_FORMAT,
        }
    }

    fn views(&self, target: PassTarget) -> (Option<&'a wgpu::TextureView>, &'a wgpu::TextureView) {
        match target {
            PassTarget::Screen => (Some(self.screen_color), self.screen_depth),
            PassTarget::PostProcess => (Some(self.post.color_view()), self.post.depth_view()),
            PassTarget::ShadowMap => (None, self.shadow.view()),
        }
    }

    /// Opens a render pass for `record` with its clear operations applied and
    /// the viewport set.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        record: &PassRecord,
    ) -> wgpu::RenderPass<'e> {
        let (color_view, depth_view) = self.views(record.target);
        let clear = &record.clear;

        // Depth-only targets get no color slot at all, not an empty one.
        let color_attachments: Vec<Option<wgpu::RenderPassColorAttachment>> = color_view
            .map(|view| wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                depth_slice: None,
                ops: wgpu::Operations {
                    load: color_load(clear),
                    store: wgpu::StoreOp::Store,
                },
            })
            .into_iter()
            .map(Some)
            .collect();

        let stencil_ops = Self::depth_format(record.target)
            .has_stencil_aspect()
            .then(|| wgpu::Operations {
                load: if clear.flags.contains(ClearFlags::STENCIL) {
                    wgpu::LoadOp::Clear(0)
                } else {
                    wgpu::LoadOp::Load
                },
                store: wgpu::StoreOp::Store,
            });

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(pass_label(record)),
            color_attachments: &color_attachments,
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: if clear.flags.contains(ClearFlags::DEPTH) {
                        wgpu::LoadOp::Clear(clear.depth)
                    } else {
                        wgpu::LoadOp::Load
                    },
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        let (width, height) = record.viewport;
        pass.set_viewport(0.0, 0.0, width.max(1) as f32, height.max(1) as f32, 0.0, 1.0);
        pass
    }
}

fn color_load(clear: &ClearOp) -> wgpu::LoadOp<wgpu::Color> {
    if clear.flags.contains(ClearFlags::COLOR) {
        let [r, g, b, a] = clear.color;
        wgpu::LoadOp::Clear(wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: a as f64,
        })
    } else {
        wgpu::LoadOp::Load
    }
}

fn pass_label(record: &PassRecord) -> &'static str {
    use crate::renderer::commands::PassKind;
    match record.kind {
        PassKind::PostProcessScene => "PostProcessScene",
        PassKind::ShadowDepth => "ShadowDepth",
        PassKind::MainColor => "MainColor",
        PassKind::PostProcessComposite => "PostProcessComposite",
    }
}
