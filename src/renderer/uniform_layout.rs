//! Offsets of named uniforms inside a WGSL `var<uniform>` block.
//!
//! Programs address uniforms with GLSL-style paths (`pointLights[2].base.color`).
//! The layout computed here must agree with what naga derives for the WGSL
//! struct, so it follows the uniform address space rules: nested structs and
//! array elements start on a 16 byte boundary and array strides are rounded
//! up to 16.

use std::collections::HashMap;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UniformKind {
    /// Stored as a 32-bit integer, WGSL has no host-shareable bool.
    Bool,
    Int,
    Float,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
}

impl UniformKind {
    pub const fn size(self) -> u32 {
        match self {
            Self::Bool | Self::Int | Self::Float => 4,
            Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 | Self::Mat2 => 16,
            Self::Mat3 => 48,
            Self::Mat4 => 64,
        }
    }

    pub const fn align(self) -> u32 {
        match self {
            Self::Bool | Self::Int | Self::Float => 4,
            Self::Vec2 | Self::Mat2 => 8,
            Self::Vec3 | Self::Vec4 | Self::Mat3 | Self::Mat4 => 16,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UniformSlot {
    pub offset: u32,
    pub kind: UniformKind,
}

const UNIFORM_STRUCT_ALIGN: u32 = 16;

#[inline]
pub const fn round_up(value: u32, align: u32) -> u32 {
    value.div_ceil(align) * align
}

/// A flattened uniform struct: every leaf path with its byte offset.
#[derive(Clone, Debug, Default)]
pub struct UniformStruct {
    slots: HashMap<String, UniformSlot>,
    order: Vec<String>,
    size: u32,
    align: u32,
}

impl UniformStruct {
    pub fn builder() -> UniformStructBuilder {
        UniformStructBuilder::default()
    }

    pub fn get(&self, name: &str) -> Option<UniformSlot> {
        self.slots.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    /// Size in bytes, rounded to the struct alignment.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn align(&self) -> u32 {
        self.align
    }

    /// Leaf paths in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn member_align(&self) -> u32 {
        self.align.max(UNIFORM_STRUCT_ALIGN)
    }

    fn array_stride(&self) -> u32 {
        round_up(self.size, self.member_align())
    }
}

#[derive(Default)]
pub struct UniformStructBuilder {
    slots: HashMap<String, UniformSlot>,
    order: Vec<String>,
    cursor: u32,
    align: u32,
}

impl UniformStructBuilder {
    pub fn field(mut self, name: &str, kind: UniformKind) -> Self {
        let offset = round_up(self.cursor, kind.align());
        self.insert(name.to_string(), UniformSlot { offset, kind });
        self.cursor = offset + kind.size();
        self.align = self.align.max(kind.align());
        self
    }

    /// Embed `inner` as a struct-typed member; its leaves become `name.leaf`.
    pub fn nested(mut self, name: &str, inner: &UniformStruct) -> Self {
        let align = inner.member_align();
        let base = round_up(self.cursor, align);
        self.splice(name, inner, base);
        self.cursor = base + round_up(inner.size, UNIFORM_STRUCT_ALIGN);
        self.align = self.align.max(align);
        self
    }

    /// `array<inner, count>`; leaves become `name[i].leaf`.
    pub fn struct_array(mut self, name: &str, inner: &UniformStruct, count: usize) -> Self {
        let align = inner.member_align();
        let stride = inner.array_stride();
        let base = round_up(self.cursor, align);
        for index in 0..count {
            let prefix = format!("{name}[{index}]");
            self.splice(&prefix, inner, base + stride * index as u32);
        }
        self.cursor = base + stride * count as u32;
        self.align = self.align.max(align);
        self
    }

    /// Scalar array. Declared as `array<vec4<f32>, N>` on the WGSL side since
    /// a uniform array stride has to be a multiple of 16; only `.x` is used.
    pub fn float_array(mut self, name: &str, count: usize) -> Self {
        let base = round_up(self.cursor, UNIFORM_STRUCT_ALIGN);
        for index in 0..count {
            self.insert(
                format!("{name}[{index}]"),
                UniformSlot {
                    offset: base + UNIFORM_STRUCT_ALIGN * index as u32,
                    kind: UniformKind::Float,
                },
            );
        }
        self.cursor = base + UNIFORM_STRUCT_ALIGN * count as u32;
        self.align = self.align.max(UNIFORM_STRUCT_ALIGN);
        self
    }

    pub fn build(self) -> UniformStruct {
        let align = self.align.max(4);
        UniformStruct {
            slots: self.slots,
            order: self.order,
            size: round_up(self.cursor, align),
            align,
        }
    }

    fn splice(&mut self, prefix: &str, inner: &UniformStruct, base: u32) {
        for leaf in &inner.order {
            let slot = inner.slots[leaf];
            self.insert(
                format!("{prefix}.{leaf}"),
                UniformSlot {
                    offset: base + slot.offset,
                    kind: slot.kind,
                },
            );
        }
    }

    fn insert(&mut self, name: String, slot: UniformSlot) {
        if self.slots.insert(name.clone(), slot).is_some() {
            log::warn!("Uniform `{}` declared twice; keeping the later offset", name);
            return;
        }
        self.order.push(name);
    }
}
