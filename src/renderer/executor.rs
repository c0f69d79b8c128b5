//! Replays recorded [`FrameCommands`] against wgpu.
//!
//! Shader modules, bind group layouts, pipelines and bind groups are created
//! on first use and cached for the rest of the run.

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::num::NonZeroU64;

use crate::renderer::commands::{DrawCommand, DrawRange, FrameCommands, PassTarget, TextureBinding};
use crate::renderer::drawable::MeshId;
use crate::renderer::gpu::GpuResources;
use crate::renderer::pipeline_builder::PipelineBuilder;
use crate::renderer::program::{ProgramId, ShaderProgram, TextureSlot, TextureSlotKind};
use crate::renderer::render_context::FrameTargets;
use crate::renderer::shaders::ProgramSet;
use crate::renderer::state::DrawState;
use crate::renderer::texture::{TextureId, TextureKind};
use crate::renderer::vertex::VertexLayout;

const INITIAL_UNIFORM_CAPACITY: u64 = 64 * 1024;
const SHADOW_DEPTH_BIAS: i32 = 2;
const SHADOW_SLOPE_BIAS: f32 = 2.0;

struct ProgramGpu {
    module: wgpu::ShaderModule,
    uniform_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    texture_layout: Option<wgpu::BindGroupLayout>,
    uniform_size: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    layout: VertexLayout,
    state: DrawState,
    target: PassTarget,
    color: Option<wgpu::TextureFormat>,
}

/// A texture unit after fallbacks have been applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum ResolvedTexture {
    Image(TextureId),
    ShadowMap,
    PostProcessColor,
}

type TextureGroupKey = (ProgramId, Vec<ResolvedTexture>);

struct PreparedDraw {
    pipeline: PipelineKey,
    uniform_offset: u32,
    textures: Option<TextureGroupKey>,
    mesh: MeshId,
    range: DrawRange,
}

pub struct PassExecutor {
    programs: HashMap<ProgramId, ProgramGpu>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    uniform_buffer: wgpu::Buffer,
    uniform_capacity: u64,
    uniform_groups: HashMap<ProgramId, wgpu::BindGroup>,
    texture_groups: HashMap<TextureGroupKey, wgpu::BindGroup>,
    warned_layouts: HashSet<(ProgramId, VertexLayout)>,
}

impl PassExecutor {
    pub fn new(device: &wgpu::Device) -> Self {
        Self {
            programs: HashMap::new(),
            pipelines: HashMap::new(),
            uniform_buffer: create_uniform_buffer(device, INITIAL_UNIFORM_CAPACITY),
            uniform_capacity: INITIAL_UNIFORM_CAPACITY,
            uniform_groups: HashMap::new(),
            texture_groups: HashMap::new(),
            warned_layouts: HashSet::new(),
        }
    }

    pub fn execute(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        frame: &FrameCommands,
        programs: &ProgramSet,
        resources: &GpuResources,
        targets: &FrameTargets<'_>,
    ) {
        self.upload_uniforms(device, queue, frame.uniform_data());

        let prepared: Vec<Vec<PreparedDraw>> = frame
            .passes()
            .iter()
            .map(|pass| {
                pass.draws
                    .iter()
                    .filter_map(|draw| {
                        let program = programs.get(draw.program)?;
                        self.prepare_draw(device, program, draw, pass.target, resources, targets)
                    })
                    .collect()
            })
            .collect();

        for (record, draws) in frame.passes().iter().zip(&prepared) {
            let mut pass = targets.begin_pass(encoder, record);
            for draw in draws {
                self.encode_draw(&mut pass, draw, resources);
            }
        }
    }

    fn upload_uniforms(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) {
        let required = data.len() as u64;
        if required > self.uniform_capacity {
            let capacity = required.next_power_of_two();
            log::debug!(
                "Growing uniform arena from {} to {} bytes",
                self.uniform_capacity,
                capacity
            );
            self.uniform_buffer = create_uniform_buffer(device, capacity);
            self.uniform_capacity = capacity;
            self.uniform_groups.clear();
        }
        if !data.is_empty() {
            queue.write_buffer(&self.uniform_buffer, 0, data);
        }
    }

    fn prepare_draw(
        &mut self,
        device: &wgpu::Device,
        program: &ShaderProgram,
        draw: &DrawCommand,
        target: PassTarget,
        resources: &GpuResources,
        targets: &FrameTargets<'_>,
    ) -> Option<PreparedDraw> {
        if !draw.mesh.layout.provides(program.vertex_locations()) {
            if self.warned_layouts.insert((program.id(), draw.mesh.layout)) {
                log::warn!(
                    "Program `{}` reads vertex locations {:?}, which {:?} does not provide; skipping",
                    program.label(),
                    program.vertex_locations(),
                    draw.mesh.layout
                );
            }
            return None;
        }

        self.ensure_program(device, program);

        let key = PipelineKey {
            program: program.id(),
            layout: draw.mesh.layout,
            state: draw.state,
            target,
            color: targets.color_format(target),
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.build_pipeline(device, program, key)?;
            self.pipelines.insert(key, pipeline);
        }

        if !self.uniform_groups.contains_key(&program.id()) {
            let gpu = self.programs.get(&program.id())?;
            let group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(program.label()),
                layout: &gpu.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &self.uniform_buffer,
                        offset: 0,
                        size: NonZeroU64::new(gpu.uniform_size),
                    }),
                }],
            });
            self.uniform_groups.insert(program.id(), group);
        }

        let textures = if program.texture_slots().is_empty() {
            None
        } else {
            let resolved: Vec<ResolvedTexture> = program
                .texture_slots()
                .iter()
                .zip(&draw.textures)
                .map(|(slot, binding)| resolve_texture(slot, *binding, resources))
                .collect();
            let group_key = (program.id(), resolved);
            if !self.texture_groups.contains_key(&group_key) {
                let group = self.create_texture_group(device, program, &group_key.1, resources, targets)?;
                self.texture_groups.insert(group_key.clone(), group);
            }
            Some(group_key)
        };

        Some(PreparedDraw {
            pipeline: key,
            uniform_offset: draw.uniform_offset,
            textures,
            mesh: draw.mesh.id,
            range: draw.range,
        })
    }

    fn encode_draw(&self, pass: &mut wgpu::RenderPass<'_>, draw: &PreparedDraw, resources: &GpuResources) {
        let (Some(pipeline), Some(uniforms), Some(mesh)) = (
            self.pipelines.get(&draw.pipeline),
            self.uniform_groups.get(&draw.pipeline.program),
            resources.mesh(draw.mesh),
        ) else {
            return;
        };

        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, uniforms, &[draw.uniform_offset]);
        if let Some(group) = draw.textures.as_ref().and_then(|key| self.texture_groups.get(key)) {
            pass.set_bind_group(1, group, &[]);
        }
        pass.set_vertex_buffer(0, mesh.vertices.slice(..));

        match (draw.range, mesh.indices.as_ref()) {
            (DrawRange::Indexed { count }, Some(indices)) => {
                pass.set_index_buffer(indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(0..count, 0, 0..1);
            }
            (DrawRange::Indexed { .. }, None) => {
                log::warn!("Indexed draw on mesh {:?} without an index buffer", draw.mesh);
            }
            (DrawRange::Arrays { first, count }, _) => {
                pass.draw(first..first + count, 0..1);
            }
        }
    }

    fn ensure_program(&mut self, device: &wgpu::Device, program: &ShaderProgram) {
        if self.programs.contains_key(&program.id()) {
            return;
        }

        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(program.label()),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(program.source())),
        });

        let uniform_size = u64::from(program.layout().size().max(16));
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(program.label()),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(uniform_size),
                },
                count: None,
            }],
        });

        let texture_layout = (!program.texture_slots().is_empty()).then(|| {
            let entries: Vec<_> = program
                .texture_slots()
                .iter()
                .flat_map(texture_layout_entries)
                .collect();
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(program.label()),
                entries: &entries,
            })
        });

        let mut group_layouts = vec![&uniform_layout];
        group_layouts.extend(texture_layout.as_ref());
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(program.label()),
            bind_group_layouts: &group_layouts,
            push_constant_ranges: &[],
        });

        log::debug!("Created GPU objects for program `{}`", program.label());
        self.programs.insert(
            program.id(),
            ProgramGpu {
                module,
                uniform_layout,
                pipeline_layout,
                texture_layout,
                uniform_size,
            },
        );
    }

    fn build_pipeline(
        &self,
        device: &wgpu::Device,
        program: &ShaderProgram,
        key: PipelineKey,
    ) -> Option<wgpu::RenderPipeline> {
        let gpu = self.programs.get(&program.id())?;
        let fragment = key.color.and(program.fragment_entry());

        let mut builder = PipelineBuilder::new(device, &gpu.pipeline_layout, &gpu.module)
            .with_label(program.label())
            .with_entry_points(program.vertex_entry(), fragment)
            .with_vertex_layout(key.layout);
        if let (Some(format), Some(_)) = (key.color, fragment) {
            builder = builder.with_color_target(format, None);
        }
        builder = builder.with_draw_state(key.state, FrameTargets::depth_format(key.target));
        if key.target == PassTarget::ShadowMap {
            builder = builder.with_depth_bias(SHADOW_DEPTH_BIAS, SHADOW_SLOPE_BIAS);
        }

        log::debug!(
            "Building pipeline for `{}`: {:?} {:?} {:?}",
            program.label(),
            key.layout,
            key.state,
            key.target
        );
        Some(builder.build())
    }

    fn create_texture_group(
        &self,
        device: &wgpu::Device,
        program: &ShaderProgram,
        resolved: &[ResolvedTexture],
        resources: &GpuResources,
        targets: &FrameTargets<'_>,
    ) -> Option<wgpu::BindGroup> {
        let layout = self.programs.get(&program.id())?.texture_layout.as_ref()?;

        let mut entries = Vec::with_capacity(resolved.len() * 2);
        for (slot, texture) in program.texture_slots().iter().zip(resolved) {
            let (view, sampler) = match *texture {
                ResolvedTexture::Image(id) => {
                    let texture = resources.texture(id)?;
                    (&texture.view, &texture.sampler)
                }
                ResolvedTexture::ShadowMap => (targets.shadow.view(), targets.shadow.sampler()),
                ResolvedTexture::PostProcessColor => {
                    (targets.post.color_view(), targets.post.sampler())
                }
            };
            entries.push(wgpu::BindGroupEntry {
                binding: slot.texture_binding(),
                resource: wgpu::BindingResource::TextureView(view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: slot.sampler_binding(),
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }

        Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(program.label()),
            layout,
            entries: &entries,
        }))
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("UniformArena"),
        size,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn texture_layout_entries(slot: &TextureSlot) -> [wgpu::BindGroupLayoutEntry; 2] {
    let (sample_type, view_dimension, sampler) = match slot.kind {
        TextureSlotKind::Color2d => (
            wgpu::TextureSampleType::Float { filterable: true },
            wgpu::TextureViewDimension::D2,
            wgpu::SamplerBindingType::Filtering,
        ),
        TextureSlotKind::Depth2d => (
            wgpu::TextureSampleType::Depth,
            wgpu::TextureViewDimension::D2,
            wgpu::SamplerBindingType::Comparison,
        ),
        TextureSlotKind::Cube => (
            wgpu::TextureSampleType::Float { filterable: true },
            wgpu::TextureViewDimension::Cube,
            wgpu::SamplerBindingType::Filtering,
        ),
    };
    [
        wgpu::BindGroupLayoutEntry {
            binding: slot.texture_binding(),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type,
                view_dimension,
                multisampled: false,
            },
            count: None,
        },
        wgpu::BindGroupLayoutEntry {
            binding: slot.sampler_binding(),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(sampler),
            count: None,
        },
    ]
}

/// Maps whatever was bound to a unit onto something the slot can sample.
/// Unbound units and kind mismatches fall back to the 1x1 placeholders; a
/// depth slot can only ever see the shadow map.
fn resolve_texture(
    slot: &TextureSlot,
    binding: Option<TextureBinding>,
    resources: &GpuResources,
) -> ResolvedTexture {
    let expected = match slot.kind {
        TextureSlotKind::Depth2d => return ResolvedTexture::ShadowMap,
        TextureSlotKind::Color2d => TextureKind::D2,
        TextureSlotKind::Cube => TextureKind::Cube,
    };

    match binding {
        Some(TextureBinding::PostProcessColor) if expected == TextureKind::D2 => {
            ResolvedTexture::PostProcessColor
        }
        Some(TextureBinding::Image(id))
            if resources.texture(id).map(|texture| texture.kind) == Some(expected) =>
        {
            ResolvedTexture::Image(id)
        }
        _ => ResolvedTexture::Image(resources.fallback_for(expected)),
    }
}
