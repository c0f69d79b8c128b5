//! Frame recording.
//!
//! Passes are recorded on the CPU first: each draw carries the program, mesh,
//! fixed-function state, bound texture units and a snapshot of the program's
//! uniform block. The executor replays the result against wgpu.

use std::collections::BTreeMap;

use crate::renderer::drawable::MeshHandle;
use crate::renderer::program::{ProgramId, ShaderProgram};
use crate::renderer::state::{ClearOp, CullMode, DepthCompare, DrawState};
use crate::renderer::texture::TextureId;
use crate::renderer::uniform_layout::round_up;

/// Dynamic uniform offsets have to be multiples of this.
pub const UNIFORM_ALIGNMENT: u32 = 256;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassKind {
    PostProcessScene,
    ShadowDepth,
    MainColor,
    PostProcessComposite,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassTarget {
    Screen,
    PostProcess,
    ShadowMap,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureBinding {
    Image(TextureId),
    ShadowMap,
    PostProcessColor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawRange {
    Arrays { first: u32, count: u32 },
    Indexed { count: u32 },
}

#[derive(Clone, Debug)]
pub struct DrawCommand {
    pub program: ProgramId,
    pub program_label: &'static str,
    pub mesh: MeshHandle,
    pub range: DrawRange,
    pub state: DrawState,
    /// Byte offset of this draw's uniform snapshot in the frame arena.
    pub uniform_offset: u32,
    /// One entry per texture slot of the program, in slot order.
    pub textures: Vec<Option<TextureBinding>>,
}

#[derive(Clone, Debug)]
pub struct PassRecord {
    pub kind: PassKind,
    pub target: PassTarget,
    pub viewport: (u32, u32),
    pub clear: ClearOp,
    pub draws: Vec<DrawCommand>,
}

#[derive(Default, Debug)]
pub struct FrameCommands {
    passes: Vec<PassRecord>,
    uniforms: Vec<u8>,
}

impl FrameCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn passes(&self) -> &[PassRecord] {
        &self.passes
    }

    pub fn pass_kinds(&self) -> Vec<PassKind> {
        self.passes.iter().map(|pass| pass.kind).collect()
    }

    pub fn pass(&self, kind: PassKind) -> Option<&PassRecord> {
        self.passes.iter().find(|pass| pass.kind == kind)
    }

    /// All uniform snapshots of the frame, back to back.
    pub fn uniform_data(&self) -> &[u8] {
        &self.uniforms
    }

    pub fn draw_count(&self) -> usize {
        self.passes.iter().map(|pass| pass.draws.len()).sum()
    }

    pub fn record_pass<R>(
        &mut self,
        kind: PassKind,
        target: PassTarget,
        viewport: (u32, u32),
        clear: ClearOp,
        record: impl FnOnce(&mut PassRecorder<'_>) -> R,
    ) -> R {
        let mut recorder = PassRecorder {
            record: PassRecord {
                kind,
                target,
                viewport,
                clear,
                draws: Vec::new(),
            },
            arena: &mut self.uniforms,
            state: DrawState::default(),
            units: BTreeMap::new(),
        };
        let result = record(&mut recorder);

        log::trace!(
            "Recorded {:?} pass with {} draws",
            kind,
            recorder.record.draws.len()
        );
        self.passes.push(recorder.record);
        result
    }
}

/// Current state while recording one pass, in the manner of a GL context:
/// state changes stick until changed again and apply to later draws.
pub struct PassRecorder<'a> {
    record: PassRecord,
    arena: &'a mut Vec<u8>,
    state: DrawState,
    units: BTreeMap<u32, TextureBinding>,
}

impl PassRecorder<'_> {
    pub fn kind(&self) -> PassKind {
        self.record.kind
    }

    pub fn target(&self) -> PassTarget {
        self.record.target
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn set_state(&mut self, state: DrawState) {
        self.state = state;
    }

    pub fn set_cull(&mut self, cull: CullMode) {
        self.state.cull = cull;
    }

    pub fn set_depth_compare(&mut self, compare: DepthCompare) {
        self.state.depth_compare = compare;
    }

    pub fn bind_texture(&mut self, unit: u32, binding: TextureBinding) {
        self.units.insert(unit, binding);
    }

    /// Draws the whole mesh, indexed if it has indices.
    pub fn draw(&mut self, program: &ShaderProgram, mesh: MeshHandle) {
        let range = match mesh.index_count {
            Some(count) => DrawRange::Indexed { count },
            None => DrawRange::Arrays {
                first: 0,
                count: mesh.vertex_count,
            },
        };
        self.push(program, mesh, range);
    }

    fn push(&mut self, program: &ShaderProgram, mesh: MeshHandle, range: DrawRange) {
        if !program.is_usable() {
            if program.take_unusable_warning() {
                log::warn!(
                    "Skipping draws with program `{}`: it failed to compile",
                    program.label()
                );
            }
            return;
        }

        let uniform_offset = self.arena.len() as u32;
        self.arena.extend_from_slice(program.uniform_bytes());
        let padded = round_up(self.arena.len() as u32, UNIFORM_ALIGNMENT) as usize;
        self.arena.resize(padded, 0);

        let textures = program
            .texture_slots()
            .iter()
            .map(|slot| self.units.get(&slot.unit).copied())
            .collect();

        self.record.draws.push(DrawCommand {
            program: program.id(),
            program_label: program.label(),
            mesh,
            range,
            state: self.state,
            uniform_offset,
            textures,
        });
    }
}
