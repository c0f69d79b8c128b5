use bitflags::bitflags;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    /// Cull back faces; front faces wind counter-clockwise.
    Back,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendMode {
    Opaque,
    /// `src * src_alpha + dst * (1 - src_alpha)`
    Alpha,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DepthCompare {
    Less,
    LessEqual,
    Always,
}

impl DepthCompare {
    pub fn to_wgpu(self) -> wgpu::CompareFunction {
        match self {
            Self::Less => wgpu::CompareFunction::Less,
            Self::LessEqual => wgpu::CompareFunction::LessEqual,
            Self::Always => wgpu::CompareFunction::Always,
        }
    }
}

/// Fixed-function state a draw is recorded with. Pipelines are keyed on it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DrawState {
    pub cull: CullMode,
    pub blend: BlendMode,
    pub depth_compare: DepthCompare,
    pub depth_write: bool,
}

impl DrawState {
    pub const fn opaque() -> Self {
        Self {
            cull: CullMode::Back,
            blend: BlendMode::Opaque,
            depth_compare: DepthCompare::Less,
            depth_write: true,
        }
    }

    /// Single-sided, semi-transparent quads.
    pub const fn transparent() -> Self {
        Self {
            cull: CullMode::None,
            blend: BlendMode::Alpha,
            depth_compare: DepthCompare::Less,
            depth_write: true,
        }
    }

    pub const fn full_screen() -> Self {
        Self {
            cull: CullMode::None,
            blend: BlendMode::Opaque,
            depth_compare: DepthCompare::Always,
            depth_write: false,
        }
    }

    pub fn cull_face(&self) -> Option<wgpu::Face> {
        match self.cull {
            CullMode::None => None,
            CullMode::Back => Some(wgpu::Face::Back),
        }
    }

    pub fn blend_state(&self) -> Option<wgpu::BlendState> {
        match self.blend {
            BlendMode::Opaque => None,
            BlendMode::Alpha => {
                let component = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState {
                    color: component,
                    alpha: component,
                })
            }
        }
    }
}

impl Default for DrawState {
    fn default() -> Self {
        Self::opaque()
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ClearFlags: u8 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearOp {
    pub flags: ClearFlags,
    pub color: [f32; 4],
    pub depth: f32,
}

impl ClearOp {
    pub fn color_and_depth(color: [f32; 4]) -> Self {
        Self {
            flags: ClearFlags::COLOR | ClearFlags::DEPTH | ClearFlags::STENCIL,
            color,
            depth: 1.0,
        }
    }

    pub fn depth_only() -> Self {
        Self {
            flags: ClearFlags::DEPTH,
            color: [0.0; 4],
            depth: 1.0,
        }
    }

    pub fn color_only(color: [f32; 4]) -> Self {
        Self {
            flags: ClearFlags::COLOR,
            color,
            depth: 1.0,
        }
    }
}
