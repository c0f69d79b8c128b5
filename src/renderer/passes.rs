//! Per-frame pass orchestration.
//!
//! Frame order: PostProcessScene (kernel active only), ShadowDepth,
//! MainColor, PostProcessComposite (kernel active only). The UI overlay and
//! present happen after the recorded passes are executed.

use glam::{Mat3, Mat4, Vec3};

use crate::renderer::camera::Camera;
use crate::renderer::commands::{FrameCommands, PassKind, PassRecorder, PassTarget, TextureBinding};
use crate::renderer::drawable::{DrawableRegistry, GeometryUploader, Shape};
use crate::renderer::gpu::GpuResources;
use crate::renderer::lights::LightUniformNames;
use crate::renderer::material::Material;
use crate::renderer::model::{Model, SceneDrawable};
use crate::renderer::program::{ShaderProgram, UniformSink};
use crate::renderer::shaders::{names, ProgramSet};
use crate::renderer::state::{ClearOp, CullMode, DepthCompare, DrawState};
use crate::renderer::texture::TextureId;
use crate::scene::{normal_matrix, FrameState, SceneLights};
use crate::settings::AssetPaths;

pub const WINDOW_POSITIONS: [Vec3; 3] = [
    Vec3::new(3.5, 1.5, -4.0),
    Vec3::new(5.5, 1.5, -5.5),
    Vec3::new(7.5, 1.5, -3.0),
];

pub const REFLECT_CUBE_POSITION: Vec3 = Vec3::new(4.0, 1.6, 3.0);
pub const REFRACT_CUBE_POSITION: Vec3 = Vec3::new(6.0, 1.6, 3.0);
/// Air to glass.
pub const REFRACTION_RATIO: f32 = 1.0 / 1.52;
pub const LIGHT_CUBE_SCALE: f32 = 0.2;
const GRASS_ALPHA_CUTOFF: f32 = 0.1;
const COMPOSITE_CLEAR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Grass quad positions. Rebuilt on every draw; the quad geometry itself is
/// uploaded once.
fn grass_positions() -> Vec<Vec3> {
    vec![
        Vec3::new(3.0, 1.5, -0.48),
        Vec3::new(6.0, 1.5, 0.51),
        Vec3::new(4.5, 1.5, 0.7),
        Vec3::new(4.2, 1.5, -2.3),
        Vec3::new(5.0, 1.5, -0.6),
    ]
}

/// Positions ordered farthest first. Equal distances keep their input order.
pub fn sort_back_to_front(camera_position: Vec3, positions: &[Vec3]) -> Vec<Vec3> {
    let mut sorted = positions.to_vec();
    sorted.sort_by(|a, b| {
        let da = camera_position.distance(*a);
        let db = camera_position.distance(*b);
        db.total_cmp(&da)
    });
    sorted
}

/// Textures and models the scene draws, loaded once at startup.
#[derive(Clone, Debug)]
pub struct SceneAssets {
    pub floor: TextureId,
    pub grass: TextureId,
    pub window: TextureId,
    pub skybox: TextureId,
    pub house: Model,
    pub character: Model,
}

impl SceneAssets {
    pub fn load(resources: &mut GpuResources, paths: &AssetPaths) -> Self {
        let assets = Self {
            floor: resources.load_texture(&paths.floor_texture),
            grass: resources.load_texture(&paths.grass_texture),
            window: resources.load_texture(&paths.window_texture),
            skybox: resources.load_cube(&paths.skybox_paths()),
            house: resources.load_model(&paths.house_model),
            character: resources.load_model(&paths.character_model),
        };
        log::info!(
            "Scene assets ready: house {} meshes, character {} meshes",
            assets.house.meshes().len(),
            assets.character.meshes().len()
        );
        assets
    }

    /// Every texture points at id 0 and both models are empty.
    pub fn placeholder() -> Self {
        Self {
            floor: TextureId(0),
            grass: TextureId(0),
            window: TextureId(0),
            skybox: TextureId(0),
            house: Model::empty("house"),
            character: Model::empty("character"),
        }
    }
}

/// Pixel sizes of the three render targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameViewports {
    pub screen: (u32, u32),
    pub post: (u32, u32),
    pub shadow: u32,
}

/// Camera matrices shared by every lit draw of a frame.
#[derive(Clone, Copy, Debug)]
struct ViewParams {
    view: Mat4,
    projection: Mat4,
    position: Vec3,
}

impl ViewParams {
    fn new(camera: &Camera, aspect: f32) -> Self {
        Self {
            view: camera.view_matrix(),
            projection: camera.projection(aspect),
            position: camera.position,
        }
    }

    /// The view with its translation removed, so the skybox stays centered.
    fn rotation_only(&self) -> Mat4 {
        Mat4::from_mat3(Mat3::from_mat4(self.view))
    }
}

struct FrameInputs<'a> {
    state: &'a FrameState,
    view: ViewParams,
    light_space: Mat4,
    lights: SceneLights,
    light_names: &'a LightUniformNames,
    assets: &'a SceneAssets,
    drawables: &'a DrawableRegistry,
}

/// Records every pass of a frame into [`FrameCommands`].
pub struct SceneRenderer {
    programs: ProgramSet,
    drawables: DrawableRegistry,
    light_names: LightUniformNames,
    assets: SceneAssets,
}

impl SceneRenderer {
    pub fn new(programs: ProgramSet, assets: SceneAssets) -> Self {
        Self {
            programs,
            drawables: DrawableRegistry::new(),
            light_names: LightUniformNames::default(),
            assets,
        }
    }

    pub fn programs(&self) -> &ProgramSet {
        &self.programs
    }

    pub fn drawables(&self) -> &DrawableRegistry {
        &self.drawables
    }

    pub fn assets(&self) -> &SceneAssets {
        &self.assets
    }

    pub fn record_frame(
        &mut self,
        state: &FrameState,
        camera: &Camera,
        viewports: FrameViewports,
        uploader: &mut dyn GeometryUploader,
    ) -> FrameCommands {
        let Self {
            programs,
            drawables,
            light_names,
            assets,
        } = self;

        let inputs = FrameInputs {
            state,
            view: ViewParams::new(camera, state.aspect()),
            light_space: state.light_space_matrix(),
            lights: SceneLights::new(state, camera),
            light_names: &*light_names,
            assets: &*assets,
            drawables: &*drawables,
        };

        let mut frame = FrameCommands::new();
        let kernel = state.kernel;

        if kernel.is_active() {
            frame.record_pass(
                PassKind::PostProcessScene,
                PassTarget::PostProcess,
                viewports.post,
                ClearOp::color_and_depth(state.clear_color),
                |pass| record_lit_scene(pass, programs, &inputs, uploader),
            );
        }

        frame.record_pass(
            PassKind::ShadowDepth,
            PassTarget::ShadowMap,
            (viewports.shadow, viewports.shadow),
            ClearOp::depth_only(),
            |pass| record_shadow_casters(pass, &mut programs.depth, &inputs, uploader),
        );

        frame.record_pass(
            PassKind::MainColor,
            PassTarget::Screen,
            viewports.screen,
            ClearOp::color_and_depth(state.clear_color),
            |pass| record_lit_scene(pass, programs, &inputs, uploader),
        );

        if kernel.is_active() {
            frame.record_pass(
                PassKind::PostProcessComposite,
                PassTarget::Screen,
                viewports.screen,
                ClearOp::color_only(COMPOSITE_CLEAR),
                |pass| {
                    let screen = &mut programs.screen;
                    kernel.push_uniforms(screen);
                    pass.set_state(DrawState::full_screen());
                    pass.bind_texture(0, TextureBinding::PostProcessColor);
                    inputs
                        .drawables
                        .get(Shape::ScreenQuad)
                        .draw(uploader, pass, screen);
                },
            );
        }

        log::trace!(
            "Recorded frame: {:?}, {} draws",
            frame.pass_kinds(),
            frame.draw_count()
        );
        frame
    }
}

fn record_shadow_casters(
    pass: &mut PassRecorder<'_>,
    depth: &mut ShaderProgram,
    inputs: &FrameInputs<'_>,
    uploader: &mut dyn GeometryUploader,
) {
    let state = inputs.state;
    depth.set_mat4(names::LIGHT_SPACE, inputs.light_space);
    pass.set_state(DrawState::opaque());

    let cube = inputs.drawables.get(Shape::Cube);
    for position in [REFLECT_CUBE_POSITION, REFRACT_CUBE_POSITION] {
        depth.set_mat4(names::MODEL, Mat4::from_translation(position));
        cube.draw(uploader, pass, depth);
    }

    depth.set_mat4(names::MODEL, state.floor.matrix());
    inputs.drawables.get(Shape::Floor).draw(uploader, pass, depth);

    depth.set_mat4(names::MODEL, state.house.matrix());
    inputs.assets.house.draw(pass, depth);
    depth.set_mat4(names::MODEL, state.character.matrix());
    inputs.assets.character.draw(pass, depth);

    for position in state.point_light_positions {
        depth.set_mat4(names::MODEL, light_cube_model(position));
        cube.draw(uploader, pass, depth);
    }

    pass.set_cull(CullMode::None);
    let quad = inputs.drawables.get(Shape::Foliage);
    for position in grass_positions().into_iter().chain(WINDOW_POSITIONS) {
        depth.set_mat4(names::MODEL, Mat4::from_translation(position));
        quad.draw(uploader, pass, depth);
    }
}

fn record_lit_scene(
    pass: &mut PassRecorder<'_>,
    programs: &mut ProgramSet,
    inputs: &FrameInputs<'_>,
    uploader: &mut dyn GeometryUploader,
) {
    let state = inputs.state;
    let view = &inputs.view;
    let cube = inputs.drawables.get(Shape::Cube);

    // environment-mapped cubes
    pass.set_state(DrawState::opaque());
    pass.bind_texture(0, TextureBinding::Image(inputs.assets.skybox));
    let environment = &mut programs.environment;
    set_camera(environment, view);
    environment.set_vec3(names::CAMERA_POS, view.position);
    environment.set_float(names::REFRACTION_RATIO, REFRACTION_RATIO);
    for (position, refractive) in [(REFLECT_CUBE_POSITION, false), (REFRACT_CUBE_POSITION, true)] {
        let model = Mat4::from_translation(position);
        environment.set_mat4(names::MODEL, model);
        environment.set_mat3(names::NORMAL_MATRIX, normal_matrix(model));
        environment.set_bool(names::REFRACTIVE, refractive);
        cube.draw(uploader, pass, environment);
    }

    // lit floor
    pass.bind_texture(0, TextureBinding::Image(inputs.assets.floor));
    pass.bind_texture(1, TextureBinding::ShadowMap);
    let floor = &mut programs.floor;
    prepare_lit(floor, inputs);
    set_lit_model(floor, state.floor.matrix());
    inputs.drawables.get(Shape::Floor).draw(uploader, pass, floor);

    // lit models; each submesh binds its own unit 0
    let model_program = &mut programs.model;
    prepare_lit(model_program, inputs);
    set_lit_model(model_program, state.house.matrix());
    inputs.assets.house.draw(pass, model_program);
    set_lit_model(model_program, state.character.matrix());
    inputs.assets.character.draw(pass, model_program);

    // light markers
    let light_cube = &mut programs.light_cube;
    set_camera(light_cube, view);
    for (position, color) in state
        .point_light_positions
        .iter()
        .zip(state.point_light_colors.iter())
    {
        light_cube.set_mat4(names::MODEL, light_cube_model(*position));
        light_cube.set_vec3(names::COLOR, *color);
        cube.draw(uploader, pass, light_cube);
    }

    // blended quads
    pass.set_state(DrawState::transparent());
    let blend = &mut programs.blend;
    set_camera(blend, view);
    let quad = inputs.drawables.get(Shape::Foliage);

    pass.bind_texture(0, TextureBinding::Image(inputs.assets.grass));
    blend.set_float(names::ALPHA_CUTOFF, GRASS_ALPHA_CUTOFF);
    for position in grass_positions() {
        blend.set_mat4(names::MODEL, Mat4::from_translation(position));
        quad.draw(uploader, pass, blend);
    }

    pass.bind_texture(0, TextureBinding::Image(inputs.assets.window));
    blend.set_float(names::ALPHA_CUTOFF, 0.0);
    for position in sort_back_to_front(view.position, &WINDOW_POSITIONS) {
        blend.set_mat4(names::MODEL, Mat4::from_translation(position));
        quad.draw(uploader, pass, blend);
    }

    // skybox last, passing at the far plane
    pass.set_state(DrawState::opaque());
    pass.set_cull(CullMode::None);
    pass.set_depth_compare(DepthCompare::LessEqual);
    pass.bind_texture(0, TextureBinding::Image(inputs.assets.skybox));
    let skybox = &mut programs.skybox;
    skybox.set_mat4(names::VIEW, view.rotation_only());
    skybox.set_mat4(names::PROJECTION, view.projection);
    inputs.drawables.get(Shape::Skybox).draw(uploader, pass, skybox);
    pass.set_depth_compare(DepthCompare::Less);
}

fn light_cube_model(position: Vec3) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(Vec3::splat(LIGHT_CUBE_SCALE))
}

fn set_camera(program: &mut ShaderProgram, view: &ViewParams) {
    program.set_mat4(names::VIEW, view.view);
    program.set_mat4(names::PROJECTION, view.projection);
}

fn prepare_lit(program: &mut ShaderProgram, inputs: &FrameInputs<'_>) {
    set_camera(program, &inputs.view);
    program.set_mat4(names::LIGHT_SPACE, inputs.light_space);
    program.set_vec3(names::VIEW_POS, inputs.view.position);
    program.set_bool(names::SHADOWS_ENABLED, inputs.state.shadows_enabled);
    Material::shiny().use_material(program);
    if let Err(err) = inputs.lights.push_uniforms(program, inputs.light_names) {
        log::error!("Program `{}`: {}", program.label(), err);
    }
}

fn set_lit_model(program: &mut ShaderProgram, model: Mat4) {
    program.set_mat4(names::MODEL, model);
    program.set_mat3(names::NORMAL_MATRIX, normal_matrix(model));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_sort_farthest_first() {
        let camera = Vec3::ZERO;
        let positions = [
            Vec3::new(2.0, 0.0, 0.0),
            Vec3::new(0.0, 9.0, 0.0),
            Vec3::new(0.0, 0.0, -5.0),
        ];
        let sorted = sort_back_to_front(camera, &positions);
        assert_eq!(sorted, vec![positions[1], positions[2], positions[0]]);
    }

    #[test]
    fn equal_distances_keep_input_order() {
        let positions = [Vec3::X, Vec3::Y, Vec3::Z];
        assert_eq!(sort_back_to_front(Vec3::ZERO, &positions), positions.to_vec());
    }

    #[test]
    fn light_cube_is_scaled_around_its_center() {
        let model = light_cube_model(Vec3::new(1.0, 2.0, 3.0));
        let corner = model.transform_point3(Vec3::splat(0.5));
        assert!(corner.abs_diff_eq(Vec3::new(1.1, 2.1, 3.1), 1e-6));
    }
}
