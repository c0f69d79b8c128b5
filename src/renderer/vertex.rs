use bytemuck::{Pod, Zeroable};
use std::mem;

/// Interleaved vertex formats used by the demo geometry.
///
/// Attribute locations are shared across formats: position is always 0,
/// normal 1 and texture coordinates 2, so a shader that only reads position
/// accepts any of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexLayout {
    PositionNormalUv,
    PositionUv,
    Position,
    /// 2D clip-space position plus uv, for full-screen passes.
    ScreenQuad,
}

impl VertexLayout {
    pub const fn stride(self) -> u64 {
        match self {
            Self::PositionNormalUv => mem::size_of::<Vertex>() as u64,
            Self::PositionUv => mem::size_of::<TexturedVertex>() as u64,
            Self::Position => mem::size_of::<[f32; 3]>() as u64,
            Self::ScreenQuad => mem::size_of::<ScreenVertex>() as u64,
        }
    }

    pub fn attributes(self) -> &'static [wgpu::VertexAttribute] {
        match self {
            Self::PositionNormalUv => &Vertex::ATTRS,
            Self::PositionUv => &TexturedVertex::ATTRS,
            Self::Position => &POSITION_ATTRS,
            Self::ScreenQuad => &ScreenVertex::ATTRS,
        }
    }

    pub fn locations(self) -> impl Iterator<Item = u32> {
        self.attributes().iter().map(|attr| attr.shader_location)
    }

    /// Whether every location in `required` is fed by this layout.
    pub fn provides(self, required: &[u32]) -> bool {
        required
            .iter()
            .all(|location| self.locations().any(|provided| provided == *location))
    }

    pub fn buffer_layout(self) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: self.attributes(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct Vertex {
    pub pos: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2
    ];
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct TexturedVertex {
    pub pos: [f32; 3],
    pub uv: [f32; 2],
}

impl TexturedVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x3,
        2 => Float32x2
    ];
}

const POSITION_ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x3];

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable, Debug, PartialEq)]
pub struct ScreenVertex {
    pub pos: [f32; 2],
    pub uv: [f32; 2],
}

impl ScreenVertex {
    pub const ATTRS: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
        0 => Float32x2,
        2 => Float32x2
    ];
}

#[inline]
pub fn v(pos: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Vertex {
    Vertex { pos, normal, uv }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strides_match_struct_sizes() {
        assert_eq!(VertexLayout::PositionNormalUv.stride(), 32);
        assert_eq!(VertexLayout::PositionUv.stride(), 20);
        assert_eq!(VertexLayout::Position.stride(), 12);
        assert_eq!(VertexLayout::ScreenQuad.stride(), 16);
    }

    #[test]
    fn uv_offset_follows_position() {
        let attrs = VertexLayout::PositionUv.attributes();
        assert_eq!(attrs[1].shader_location, 2);
        assert_eq!(attrs[1].offset, 12);
    }

    #[test]
    fn position_only_shaders_accept_every_layout() {
        for layout in [
            VertexLayout::PositionNormalUv,
            VertexLayout::PositionUv,
            VertexLayout::Position,
        ] {
            assert!(layout.provides(&[0]));
        }
        assert!(!VertexLayout::Position.provides(&[0, 2]));
    }
}
