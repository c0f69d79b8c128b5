//! The demo's shader programs and the uniform layouts they declare.

use std::path::Path;

use crate::renderer::lights::{MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS};
use crate::renderer::material;
use crate::renderer::program::{
    ProgramDesc, ProgramId, ShaderProgram, TextureSlot, TextureSlotKind,
};
use crate::renderer::uniform_layout::{UniformKind, UniformStruct};

pub mod names {
    pub const MODEL: &str = "model";
    pub const VIEW: &str = "view";
    pub const PROJECTION: &str = "projection";
    pub const LIGHT_SPACE: &str = "lightSpaceMatrix";
    pub const NORMAL_MATRIX: &str = "normalMatrix";
    pub const VIEW_POS: &str = "viewPos";
    pub const SHADOWS_ENABLED: &str = "shadowsEnabled";
    pub const COLOR: &str = "color";
    pub const CAMERA_POS: &str = "cameraPos";
    pub const REFRACTIVE: &str = "refractive";
    pub const REFRACTION_RATIO: &str = "refractionRatio";
    pub const ALPHA_CUTOFF: &str = "alphaCutoff";
}

const LIT_WGSL: &str = include_str!("../shader/lit.wgsl");
const DEPTH_WGSL: &str = include_str!("../shader/depth.wgsl");
const LIGHT_CUBE_WGSL: &str = include_str!("../shader/light_cube.wgsl");
const ENVIRONMENT_WGSL: &str = include_str!("../shader/environment.wgsl");
const BLEND_WGSL: &str = include_str!("../shader/blend.wgsl");
const SKYBOX_WGSL: &str = include_str!("../shader/skybox.wgsl");
const SCREEN_WGSL: &str = include_str!("../shader/screen.wgsl");

/// Source for `file`: read from `override_dir` when one is configured,
/// otherwise the copy compiled into the binary.
///
/// A file that cannot be read is logged and yields an empty source, which
/// in turn produces an unusable program.
pub fn load_shader_source(file: &str, bundled: &'static str, override_dir: Option<&Path>) -> String {
    let Some(dir) = override_dir else {
        return bundled.to_string();
    };

    let path = dir.join(file);
    match std::fs::read_to_string(&path) {
        Ok(source) => {
            log::info!("Loaded shader {}", path.display());
            source
        }
        Err(err) => {
            log::error!("Failed to read shader {}: {}", path.display(), err);
            String::new()
        }
    }
}

fn light_base_layout() -> UniformStruct {
    UniformStruct::builder()
        .field("color", UniformKind::Vec3)
        .field("ambient", UniformKind::Vec3)
        .field("diffuse", UniformKind::Vec3)
        .field("specular", UniformKind::Vec3)
        .build()
}

fn point_light_layout() -> UniformStruct {
    UniformStruct::builder()
        .nested("base", &light_base_layout())
        .field("position", UniformKind::Vec3)
        .field("constant", UniformKind::Float)
        .field("linear", UniformKind::Float)
        .field("quadratic", UniformKind::Float)
        .build()
}

pub fn lit_layout() -> UniformStruct {
    let material = UniformStruct::builder()
        .field(material_leaf(material::SPECULAR_INTENSITY), UniformKind::Float)
        .field(material_leaf(material::SHININESS), UniformKind::Float)
        .build();
    let dir_light = UniformStruct::builder()
        .nested("base", &light_base_layout())
        .field("direction", UniformKind::Vec3)
        .build();
    let spot_light = UniformStruct::builder()
        .nested("base", &point_light_layout())
        .field("direction", UniformKind::Vec3)
        .field("cutOff", UniformKind::Float)
        .field("outerCutOff", UniformKind::Float)
        .build();

    UniformStruct::builder()
        .field(names::MODEL, UniformKind::Mat4)
        .field(names::VIEW, UniformKind::Mat4)
        .field(names::PROJECTION, UniformKind::Mat4)
        .field(names::LIGHT_SPACE, UniformKind::Mat4)
        .field(names::NORMAL_MATRIX, UniformKind::Mat3)
        .field(names::VIEW_POS, UniformKind::Vec3)
        .field(names::SHADOWS_ENABLED, UniformKind::Bool)
        .nested("material", &material)
        .nested("dirLight", &dir_light)
        .struct_array("pointLights", &point_light_layout(), MAX_POINT_LIGHTS)
        .struct_array("spotLights", &spot_light, MAX_SPOT_LIGHTS)
        .build()
}

fn material_leaf(path: &'static str) -> &'static str {
    path.strip_prefix("material.").unwrap_or(path)
}

pub fn depth_layout() -> UniformStruct {
    UniformStruct::builder()
        .field(names::MODEL, UniformKind::Mat4)
        .field(names::LIGHT_SPACE, UniformKind::Mat4)
        .build()
}

pub fn light_cube_layout() -> UniformStruct {
    UniformStruct::builder()
        .field(names::MODEL, UniformKind::Mat4)
        .field(names::VIEW, UniformKind::Mat4)
        .field(names::PROJECTION, UniformKind::Mat4)
        .field(names::COLOR, UniformKind::Vec3)
        .build()
}

pub fn environment_layout() -> UniformStruct {
    UniformStruct::builder()
        .field(names::MODEL, UniformKind::Mat4)
        .field(names::VIEW, UniformKind::Mat4)
        .field(names::PROJECTION, UniformKind::Mat4)
        .field(names::NORMAL_MATRIX, UniformKind::Mat3)
        .field(names::CAMERA_POS, UniformKind::Vec3)
        .field(names::REFRACTIVE, UniformKind::Bool)
        .field(names::REFRACTION_RATIO, UniformKind::Float)
        .build()
}

pub fn blend_layout() -> UniformStruct {
    UniformStruct::builder()
        .field(names::MODEL, UniformKind::Mat4)
        .field(names::VIEW, UniformKind::Mat4)
        .field(names::PROJECTION, UniformKind::Mat4)
        .field(names::ALPHA_CUTOFF, UniformKind::Float)
        .build()
}

pub fn skybox_layout() -> UniformStruct {
    UniformStruct::builder()
        .field(names::VIEW, UniformKind::Mat4)
        .field(names::PROJECTION, UniformKind::Mat4)
        .build()
}

pub fn screen_layout() -> UniformStruct {
    UniformStruct::builder()
        .field("kernelMode", UniformKind::Int)
        .field("texelOffset", UniformKind::Float)
        .float_array("kernel", 9)
        .build()
}

/// File name, compiled-in source and program description for each program.
struct ProgramRecipe {
    label: &'static str,
    file: &'static str,
    bundled: &'static str,
    uniforms: fn() -> UniformStruct,
    textures: &'static [TextureSlot],
    fragment: bool,
}

const LIT_TEXTURES: &[TextureSlot] = &[
    TextureSlot::new(0, TextureSlotKind::Color2d),
    TextureSlot::new(1, TextureSlotKind::Depth2d),
];
const COLOR_TEXTURE: &[TextureSlot] = &[TextureSlot::new(0, TextureSlotKind::Color2d)];
const CUBE_TEXTURE: &[TextureSlot] = &[TextureSlot::new(0, TextureSlotKind::Cube)];

impl ProgramRecipe {
    fn build(&self, id: ProgramId, override_dir: Option<&Path>) -> ShaderProgram {
        ShaderProgram::new(
            id,
            ProgramDesc {
                label: self.label,
                source: load_shader_source(self.file, self.bundled, override_dir),
                uniforms: (self.uniforms)(),
                textures: self.textures.to_vec(),
                vertex_entry: "vs_main",
                fragment_entry: self.fragment.then_some("fs_main"),
            },
        )
    }
}

const RECIPES: [ProgramRecipe; 8] = [
    ProgramRecipe {
        label: "floor",
        file: "lit.wgsl",
        bundled: LIT_WGSL,
        uniforms: lit_layout,
        textures: LIT_TEXTURES,
        fragment: true,
    },
    ProgramRecipe {
        label: "model",
        file: "lit.wgsl",
        bundled: LIT_WGSL,
        uniforms: lit_layout,
        textures: LIT_TEXTURES,
        fragment: true,
    },
    ProgramRecipe {
        label: "depth",
        file: "depth.wgsl",
        bundled: DEPTH_WGSL,
        uniforms: depth_layout,
        textures: &[],
        fragment: false,
    },
    ProgramRecipe {
        label: "light_cube",
        file: "light_cube.wgsl",
        bundled: LIGHT_CUBE_WGSL,
        uniforms: light_cube_layout,
        textures: &[],
        fragment: true,
    },
    ProgramRecipe {
        label: "environment",
        file: "environment.wgsl",
        bundled: ENVIRONMENT_WGSL,
        uniforms: environment_layout,
        textures: CUBE_TEXTURE,
        fragment: true,
    },
    ProgramRecipe {
        label: "blend",
        file: "blend.wgsl",
        bundled: BLEND_WGSL,
        uniforms: blend_layout,
        textures: COLOR_TEXTURE,
        fragment: true,
    },
    ProgramRecipe {
        label: "skybox",
        file: "skybox.wgsl",
        bundled: SKYBOX_WGSL,
        uniforms: skybox_layout,
        textures: CUBE_TEXTURE,
        fragment: true,
    },
    ProgramRecipe {
        label: "screen",
        file: "screen.wgsl",
        bundled: SCREEN_WGSL,
        uniforms: screen_layout,
        textures: COLOR_TEXTURE,
        fragment: true,
    },
];

/// Every program the demo draws with. The floor and the imported models
/// share a source but keep separate uniform state.
pub struct ProgramSet {
    pub floor: ShaderProgram,
    pub model: ShaderProgram,
    pub depth: ShaderProgram,
    pub light_cube: ShaderProgram,
    pub environment: ShaderProgram,
    pub blend: ShaderProgram,
    pub skybox: ShaderProgram,
    pub screen: ShaderProgram,
}

impl ProgramSet {
    pub fn load(override_dir: Option<&Path>) -> Self {
        let [floor, model, depth, light_cube, environment, blend, skybox, screen] =
            std::array::from_fn(|index| RECIPES[index].build(ProgramId(index as u32), override_dir));
        let set = Self {
            floor,
            model,
            depth,
            light_cube,
            environment,
            blend,
            skybox,
            screen,
        };

        let broken: Vec<_> = set
            .iter()
            .filter(|program| !program.is_usable())
            .map(ShaderProgram::label)
            .collect();
        if broken.is_empty() {
            log::info!("Compiled {} shader programs", RECIPES.len());
        } else {
            log::warn!("Unusable shader programs: {}", broken.join(", "));
        }
        set
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderProgram> {
        [
            &self.floor,
            &self.model,
            &self.depth,
            &self.light_cube,
            &self.environment,
            &self.blend,
            &self.skybox,
            &self.screen,
        ]
        .into_iter()
    }

    pub fn get(&self, id: ProgramId) -> Option<&ShaderProgram> {
        self.iter().find(|program| program.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Leaf offsets of a naga type in declaration order. Arrays of structs
    /// expand per element, arrays of vectors give one leaf per element.
    fn naga_leaf_offsets(module: &naga::Module, ty: naga::Handle<naga::Type>, base: u32, out: &mut Vec<u32>) {
        match &module.types[ty].inner {
            naga::TypeInner::Struct { members, .. } => {
                for member in members {
                    naga_leaf_offsets(module, member.ty, base + member.offset, out);
                }
            }
            naga::TypeInner::Array {
                base: element,
                size: naga::ArraySize::Constant(count),
                stride,
            } => {
                for index in 0..count.get() {
                    naga_leaf_offsets(module, *element, base + stride * index, out);
                }
            }
            _ => out.push(base),
        }
    }

    fn naga_uniform_block(source: &str) -> (Vec<u32>, u32) {
        let module = naga::front::wgsl::parse_str(source).expect("bundled shader parses");
        let (_, global) = module
            .global_variables
            .iter()
            .find(|(_, var)| var.space == naga::AddressSpace::Uniform)
            .expect("program declares a uniform block");
        let mut offsets = Vec::new();
        naga_leaf_offsets(&module, global.ty, 0, &mut offsets);
        let span = match &module.types[global.ty].inner {
            naga::TypeInner::Struct { span, .. } => *span,
            _ => 0,
        };
        (offsets, span)
    }

    #[test]
    fn program_layouts_match_naga() {
        let set = ProgramSet::load(None);
        for program in set.iter() {
            let (naga_offsets, naga_span) = naga_uniform_block(program.source());
            let layout = program.layout();
            let offsets: Vec<u32> = layout
                .names()
                .filter_map(|name| layout.get(name).map(|slot| slot.offset))
                .collect();
            assert_eq!(offsets, naga_offsets, "{} uniform offsets", program.label());
            assert_eq!(layout.size(), naga_span, "{} uniform block size", program.label());
        }
    }

    #[test]
    fn lit_layout_places_lights_after_material() {
        let layout = lit_layout();
        let offset = |name: &str| layout.get(name).unwrap().offset;
        assert_eq!(offset(material::SPECULAR_INTENSITY), 320);
        assert_eq!(offset("dirLight.base.color"), 336);
        assert_eq!(offset("pointLights[1].base.color"), 512);
        assert_eq!(offset("spotLights[0].cutOff"), 908);
    }

    #[test]
    fn environment_flag_sits_in_camera_padding() {
        let layout = environment_layout();
        assert_eq!(layout.get(names::CAMERA_POS).unwrap().offset, 240);
        assert_eq!(layout.get(names::REFRACTIVE).unwrap().offset, 252);
        assert_eq!(layout.get(names::REFRACTION_RATIO).unwrap().offset, 256);
        assert_eq!(layout.size(), 272);
    }

    #[test]
    fn bundled_programs_are_usable() {
        let set = ProgramSet::load(None);
        for program in set.iter() {
            assert!(program.is_usable(), "{} failed to compile", program.label());
        }
        assert_eq!(set.depth.fragment_entry(), None);
        assert_eq!(set.floor.vertex_locations(), &[0, 1, 2]);
        assert_eq!(set.blend.vertex_locations(), &[0, 2]);
    }

    #[test]
    fn missing_override_file_gives_unusable_program() {
        let dir = std::env::temp_dir().join("techdemo-no-such-shader-dir");
        let source = load_shader_source("lit.wgsl", LIT_WGSL, Some(&dir));
        assert!(source.is_empty());
    }

    #[test]
    fn ids_are_unique_and_resolvable() {
        let set = ProgramSet::load(None);
        for program in set.iter() {
            assert_eq!(set.get(program.id()).map(ShaderProgram::label), Some(program.label()));
        }
    }
}
