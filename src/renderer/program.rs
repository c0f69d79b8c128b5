use std::cell::Cell;

use glam::{Mat2, Mat3, Mat4, Vec2, Vec3, Vec4};

use crate::error::RenderError;
use crate::renderer::uniform_layout::{UniformKind, UniformStruct};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureSlotKind {
    Color2d,
    /// Depth texture read through a comparison sampler.
    Depth2d,
    Cube,
}

/// A texture unit the program samples. Unit `n` lives at bindings `2n`
/// (texture) and `2n + 1` (sampler) of bind group 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureSlot {
    pub unit: u32,
    pub kind: TextureSlotKind,
}

impl TextureSlot {
    pub const fn new(unit: u32, kind: TextureSlotKind) -> Self {
        Self { unit, kind }
    }

    pub const fn texture_binding(&self) -> u32 {
        self.unit * 2
    }

    pub const fn sampler_binding(&self) -> u32 {
        self.unit * 2 + 1
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
    Mat2(Mat2),
    Mat3(Mat3),
    Mat4(Mat4),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            Self::Bool(_) => UniformKind::Bool,
            Self::Int(_) => UniformKind::Int,
            Self::Float(_) => UniformKind::Float,
            Self::Vec2(_) => UniformKind::Vec2,
            Self::Vec3(_) => UniformKind::Vec3,
            Self::Vec4(_) => UniformKind::Vec4,
            Self::Mat2(_) => UniformKind::Mat2,
            Self::Mat3(_) => UniformKind::Mat3,
            Self::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Writes the value in uniform-buffer layout. Matrices go column by column;
    /// each `mat3` column is padded out to 16 bytes.
    fn write(&self, dst: &mut [u8]) {
        match *self {
            Self::Bool(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(&u32::from(v))),
            Self::Int(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(&v)),
            Self::Float(v) => dst[..4].copy_from_slice(bytemuck::bytes_of(&v)),
            Self::Vec2(v) => dst[..8].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Vec3(v) => dst[..12].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Vec4(v) => dst[..16].copy_from_slice(bytemuck::cast_slice(&v.to_array())),
            Self::Mat2(m) => dst[..16].copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
            Self::Mat3(m) => {
                for (index, column) in [m.x_axis, m.y_axis, m.z_axis].iter().enumerate() {
                    let start = index * 16;
                    dst[start..start + 12]
                        .copy_from_slice(bytemuck::cast_slice(&column.to_array()));
                }
            }
            Self::Mat4(m) => dst[..64].copy_from_slice(bytemuck::cast_slice(&m.to_cols_array())),
        }
    }

    fn read(kind: UniformKind, src: &[u8]) -> Self {
        let float = |at: usize| bytemuck::pod_read_unaligned::<f32>(&src[at..at + 4]);
        let floats = |at: usize, n: usize| -> Vec<f32> { (0..n).map(|i| float(at + i * 4)).collect() };
        match kind {
            UniformKind::Bool => {
                Self::Bool(bytemuck::pod_read_unaligned::<u32>(&src[..4]) != 0)
            }
            UniformKind::Int => Self::Int(bytemuck::pod_read_unaligned::<i32>(&src[..4])),
            UniformKind::Float => Self::Float(float(0)),
            UniformKind::Vec2 => Self::Vec2(Vec2::from_slice(&floats(0, 2))),
            UniformKind::Vec3 => Self::Vec3(Vec3::from_slice(&floats(0, 3))),
            UniformKind::Vec4 => Self::Vec4(Vec4::from_slice(&floats(0, 4))),
            UniformKind::Mat2 => Self::Mat2(Mat2::from_cols_slice(&floats(0, 4))),
            UniformKind::Mat3 => Self::Mat3(Mat3::from_cols(
                Vec3::from_slice(&floats(0, 3)),
                Vec3::from_slice(&floats(16, 3)),
                Vec3::from_slice(&floats(32, 3)),
            )),
            UniformKind::Mat4 => Self::Mat4(Mat4::from_cols_slice(&floats(0, 16))),
        }
    }
}

/// Anything that accepts uniform writes by name.
///
/// Writes never fail at this level: a name the receiver does not know is
/// dropped. Use [`ShaderProgram::try_set_uniform`] to see the reason.
pub trait UniformSink {
    fn set_uniform(&mut self, name: &str, value: UniformValue);

    fn set_bool(&mut self, name: &str, value: bool) {
        self.set_uniform(name, UniformValue::Bool(value));
    }

    fn set_int(&mut self, name: &str, value: i32) {
        self.set_uniform(name, UniformValue::Int(value));
    }

    fn set_float(&mut self, name: &str, value: f32) {
        self.set_uniform(name, UniformValue::Float(value));
    }

    fn set_vec2(&mut self, name: &str, value: Vec2) {
        self.set_uniform(name, UniformValue::Vec2(value));
    }

    fn set_vec3(&mut self, name: &str, value: Vec3) {
        self.set_uniform(name, UniformValue::Vec3(value));
    }

    fn set_vec4(&mut self, name: &str, value: Vec4) {
        self.set_uniform(name, UniformValue::Vec4(value));
    }

    fn set_mat2(&mut self, name: &str, value: Mat2) {
        self.set_uniform(name, UniformValue::Mat2(value));
    }

    fn set_mat3(&mut self, name: &str, value: Mat3) {
        self.set_uniform(name, UniformValue::Mat3(value));
    }

    fn set_mat4(&mut self, name: &str, value: Mat4) {
        self.set_uniform(name, UniformValue::Mat4(value));
    }
}

pub struct ProgramDesc {
    pub label: &'static str,
    pub source: String,
    pub uniforms: UniformStruct,
    pub textures: Vec<TextureSlot>,
    pub vertex_entry: &'static str,
    /// `None` for depth-only programs.
    pub fragment_entry: Option<&'static str>,
}

/// A validated WGSL program plus the CPU copy of its uniform block.
///
/// Uniform writes land in `staging`; each draw snapshots the block, so values
/// set before a draw are the ones that draw sees.
pub struct ShaderProgram {
    id: ProgramId,
    label: &'static str,
    source: String,
    layout: UniformStruct,
    textures: Vec<TextureSlot>,
    vertex_entry: &'static str,
    fragment_entry: Option<&'static str>,
    vertex_locations: Vec<u32>,
    staging: Vec<u8>,
    usable: bool,
    missed: u32,
    warned_unusable: Cell<bool>,
}

impl ShaderProgram {
    /// Validates the source with naga. A program that fails to parse or
    /// validate is still returned, but reports `is_usable() == false` and
    /// draws that use it are skipped.
    pub fn new(id: ProgramId, desc: ProgramDesc) -> Self {
        let checked = validate_wgsl(desc.label, &desc.source).and_then(|module| {
            check_entry_points(desc.label, &module, desc.vertex_entry, desc.fragment_entry)?;
            Ok(vertex_input_locations(&module, desc.vertex_entry))
        });

        let (usable, vertex_locations) = match checked {
            Ok(locations) => (true, locations),
            Err(err) => {
                log::error!("{}", err);
                (false, Vec::new())
            }
        };

        log::debug!(
            "Program `{}` ({:?}): {} uniforms in {} bytes, {} texture units, usable: {}",
            desc.label,
            id,
            desc.uniforms.len(),
            desc.uniforms.size(),
            desc.textures.len(),
            usable
        );

        let staging = vec![0u8; desc.uniforms.size() as usize];
        Self {
            id,
            label: desc.label,
            source: desc.source,
            layout: desc.uniforms,
            textures: desc.textures,
            vertex_entry: desc.vertex_entry,
            fragment_entry: desc.fragment_entry,
            vertex_locations,
            staging,
            usable,
            missed: 0,
            warned_unusable: Cell::new(false),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn layout(&self) -> &UniformStruct {
        &self.layout
    }

    pub fn texture_slots(&self) -> &[TextureSlot] {
        &self.textures
    }

    pub fn vertex_entry(&self) -> &'static str {
        self.vertex_entry
    }

    pub fn fragment_entry(&self) -> Option<&'static str> {
        self.fragment_entry
    }

    /// `@location`s consumed by the vertex entry point.
    pub fn vertex_locations(&self) -> &[u32] {
        &self.vertex_locations
    }

    pub fn is_usable(&self) -> bool {
        self.usable
    }

    /// Uniform block bytes as currently set.
    pub fn uniform_bytes(&self) -> &[u8] {
        &self.staging
    }

    /// Number of writes dropped because of an unknown name or a type mismatch.
    pub fn missed_uniforms(&self) -> u32 {
        self.missed
    }

    /// Reads back the value last written to `name`.
    pub fn uniform(&self, name: &str) -> Option<UniformValue> {
        let slot = self.layout.get(name)?;
        let start = slot.offset as usize;
        let end = start + slot.kind.size() as usize;
        Some(UniformValue::read(slot.kind, &self.staging[start..end]))
    }

    pub fn try_set_uniform(&mut self, name: &str, value: UniformValue) -> Result<(), RenderError> {
        let slot = self
            .layout
            .get(name)
            .ok_or_else(|| RenderError::UnknownUniform {
                program: self.label.to_string(),
                name: name.to_string(),
            })?;

        if slot.kind != value.kind() {
            return Err(RenderError::UniformTypeMismatch {
                name: name.to_string(),
                expected: slot.kind,
                actual: value.kind(),
            });
        }

        let start = slot.offset as usize;
        let end = start + slot.kind.size() as usize;
        value.write(&mut self.staging[start..end]);
        Ok(())
    }

    /// Returns `true` the first time it is called on an unusable program.
    pub(crate) fn take_unusable_warning(&self) -> bool {
        !self.usable && !self.warned_unusable.replace(true)
    }
}

impl UniformSink for ShaderProgram {
    fn set_uniform(&mut self, name: &str, value: UniformValue) {
        if let Err(err) = self.try_set_uniform(name, value) {
            self.missed += 1;
            log::trace!("{}", err);
        }
    }
}

pub fn validate_wgsl(label: &str, source: &str) -> Result<naga::Module, RenderError> {
    let module =
        naga::front::wgsl::parse_str(source).map_err(|err| RenderError::ShaderParse {
            label: label.to_string(),
            message: err.emit_to_string(source),
        })?;

    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|err| RenderError::ShaderValidation {
        label: label.to_string(),
        message: err.emit_to_string(source),
    })?;

    Ok(module)
}

fn check_entry_points(
    label: &str,
    module: &naga::Module,
    vertex: &str,
    fragment: Option<&str>,
) -> Result<(), RenderError> {
    let has = |name: &str, stage: naga::ShaderStage| {
        module
            .entry_points
            .iter()
            .any(|ep| ep.name == name && ep.stage == stage)
    };

    let missing = if !has(vertex, naga::ShaderStage::Vertex) {
        Some(vertex)
    } else {
        fragment.filter(|name| !has(name, naga::ShaderStage::Fragment))
    };

    match missing {
        Some(name) => Err(RenderError::ShaderValidation {
            label: label.to_string(),
            message: format!("missing entry point `{name}`"),
        }),
        None => Ok(()),
    }
}

pub fn vertex_input_locations(module: &naga::Module, entry: &str) -> Vec<u32> {
    let Some(ep) = module
        .entry_points
        .iter()
        .find(|ep| ep.name == entry && ep.stage == naga::ShaderStage::Vertex)
    else {
        return Vec::new();
    };

    let mut locations = Vec::new();
    for arg in &ep.function.arguments {
        match &arg.binding {
            Some(naga::Binding::Location { location, .. }) => locations.push(*location),
            Some(naga::Binding::BuiltIn(_)) => {}
            None => {
                if let naga::TypeInner::Struct { members, .. } = &module.types[arg.ty].inner {
                    locations.extend(members.iter().filter_map(|m| match m.binding {
                        Some(naga::Binding::Location { location, .. }) => Some(location),
                        _ => None,
                    }));
                }
            }
        }
    }
    locations.sort_unstable();
    locations
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
struct Uniforms {
    model: mat4x4<f32>,
    tint: vec3<f32>,
    enabled: u32,
}

@group(0) @binding(0) var<uniform> u: Uniforms;

struct VsIn {
    @location(0) position: vec3<f32>,
    @location(2) uv: vec2<f32>,
}

@vertex
fn vs_main(input: VsIn) -> @builtin(position) vec4<f32> {
    return u.model * vec4<f32>(input.position + vec3<f32>(input.uv, 0.0), 1.0);
}

@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(u.tint, f32(u.enabled));
}
"#;

    fn desc(source: &str) -> ProgramDesc {
        ProgramDesc {
            label: "test",
            source: source.to_string(),
            uniforms: UniformStruct::builder()
                .field("model", UniformKind::Mat4)
                .field("tint", UniformKind::Vec3)
                .field("enabled", UniformKind::Bool)
                .build(),
            textures: Vec::new(),
            vertex_entry: "vs_main",
            fragment_entry: Some("fs_main"),
        }
    }

    #[test]
    fn valid_source_reports_vertex_locations() {
        let program = ShaderProgram::new(ProgramId(0), desc(SOURCE));
        assert!(program.is_usable());
        assert_eq!(program.vertex_locations(), &[0, 2]);
    }

    #[test]
    fn broken_source_yields_unusable_program() {
        let program = ShaderProgram::new(ProgramId(1), desc("fn vs_main( {"));
        assert!(!program.is_usable());
        assert!(program.take_unusable_warning());
        assert!(!program.take_unusable_warning());
    }

    #[test]
    fn empty_source_is_unusable() {
        let program = ShaderProgram::new(ProgramId(2), desc(""));
        assert!(!program.is_usable());
    }

    #[test]
    fn unknown_name_is_a_silent_noop() {
        let mut program = ShaderProgram::new(ProgramId(0), desc(SOURCE));
        let before = program.uniform_bytes().to_vec();
        program.set_vec3("tnit", Vec3::ONE);
        assert_eq!(program.uniform_bytes(), before.as_slice());
        assert_eq!(program.missed_uniforms(), 1);
    }

    #[test]
    fn try_set_reports_type_mismatch() {
        let mut program = ShaderProgram::new(ProgramId(0), desc(SOURCE));
        let err = program
            .try_set_uniform("tint", UniformValue::Float(1.0))
            .unwrap_err();
        assert!(matches!(err, RenderError::UniformTypeMismatch { .. }));
    }

    #[test]
    fn bool_round_trips_through_u32() {
        let mut program = ShaderProgram::new(ProgramId(0), desc(SOURCE));
        program.set_bool("enabled", true);
        assert_eq!(program.uniform("enabled"), Some(UniformValue::Bool(true)));
        assert_eq!(&program.uniform_bytes()[76..80], &1u32.to_ne_bytes());
    }

    #[test]
    fn mat4_is_stored_column_major() {
        let mut program = ShaderProgram::new(ProgramId(0), desc(SOURCE));
        for m in [Mat4::IDENTITY, Mat4::from_rotation_y(0.7)] {
            program.set_mat4("model", m);
            assert_eq!(program.uniform("model"), Some(UniformValue::Mat4(m)));
            let cols = m.to_cols_array();
            let expected: &[u8] = bytemuck::cast_slice(&cols);
            assert_eq!(&program.uniform_bytes()[0..64], expected);
        }

        // second column of a rotation about y is the untouched y axis
        let bytes = program.uniform_bytes();
        let column: Vec<f32> = bytes[16..32]
            .chunks_exact(4)
            .map(bytemuck::pod_read_unaligned::<f32>)
            .collect();
        assert_eq!(column, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn mat3_columns_are_padded() {
        let layout = UniformStruct::builder()
            .field("normalMatrix", UniformKind::Mat3)
            .build();
        let mut program = ShaderProgram::new(
            ProgramId(3),
            ProgramDesc {
                uniforms: layout,
                ..desc(SOURCE)
            },
        );
        let m = Mat3::from_cols_array(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        program.set_mat3("normalMatrix", m);
        let bytes = program.uniform_bytes();
        let y0 = bytemuck::pod_read_unaligned::<f32>(&bytes[16..20]);
        assert_eq!(y0, 4.0);
        assert_eq!(program.uniform("normalMatrix"), Some(UniformValue::Mat3(m)));
    }
}
