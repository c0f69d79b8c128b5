use glam::{Mat4, Vec3};
use techdemo::renderer::commands::{DrawCommand, PassRecord};
use techdemo::renderer::drawable::MeshId;
use techdemo::renderer::passes::WINDOW_POSITIONS;
use techdemo::renderer::state::{BlendMode, CullMode, DepthCompare};
use techdemo::renderer::{
    Camera, FrameCommands, FrameViewports, GeometryUploader, MeshData, MeshHandle, PassKind,
    PassTarget, PostKernel, ProgramSet, SceneAssets, SceneRenderer, TextureBinding,
};
use techdemo::scene::FrameState;

#[derive(Default)]
struct CountingUploader {
    uploads: Vec<String>,
}

impl GeometryUploader for CountingUploader {
    fn upload(&mut self, mesh: &MeshData) -> MeshHandle {
        self.uploads.push(mesh.label.clone());
        MeshHandle {
            id: MeshId(self.uploads.len() as u32 - 1),
            layout: mesh.layout,
            vertex_count: mesh.vertex_count,
            index_count: mesh.indices.as_ref().map(|indices| indices.len() as u32),
        }
    }
}

const VIEWPORTS: FrameViewports = FrameViewports {
    screen: (1280, 720),
    post: (1280, 720),
    shadow: 1024,
};

fn renderer() -> SceneRenderer {
    SceneRenderer::new(ProgramSet::load(None), SceneAssets::placeholder())
}

fn camera() -> Camera {
    Camera::new(Vec3::new(0.0, 10.0, -20.0))
}

fn record(
    renderer: &mut SceneRenderer,
    state: &FrameState,
    uploader: &mut CountingUploader,
) -> FrameCommands {
    renderer.record_frame(state, &camera(), VIEWPORTS, uploader)
}

fn draws_with<'a>(pass: &'a PassRecord, label: &str) -> Vec<&'a DrawCommand> {
    pass.draws
        .iter()
        .filter(|draw| draw.program_label == label)
        .collect()
}

fn model_matrix(frame: &FrameCommands, draw: &DrawCommand) -> Mat4 {
    // `model` is the first member of every program that has one
    let start = draw.uniform_offset as usize;
    let bytes = &frame.uniform_data()[start..start + 64];
    let floats: Vec<f32> = bytes
        .chunks_exact(4)
        .map(bytemuck::pod_read_unaligned::<f32>)
        .collect();
    Mat4::from_cols_slice(&floats)
}

#[test]
fn disabled_kernel_records_shadow_then_main_color() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let frame = record(&mut renderer, &FrameState::default(), &mut uploader);

    assert_eq!(frame.pass_kinds(), vec![PassKind::ShadowDepth, PassKind::MainColor]);
    let main = frame.pass(PassKind::MainColor).unwrap();
    assert_eq!(main.target, PassTarget::Screen);
    assert_eq!(main.viewport, (1280, 720));
    let shadow = frame.pass(PassKind::ShadowDepth).unwrap();
    assert_eq!(shadow.target, PassTarget::ShadowMap);
    assert_eq!(shadow.viewport, (1024, 1024));
}

#[test]
fn active_kernel_wraps_the_frame_in_post_processing() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let state = FrameState {
        kernel: PostKernel::Blur,
        ..FrameState::default()
    };
    let frame = record(&mut renderer, &state, &mut uploader);

    assert_eq!(
        frame.pass_kinds(),
        vec![
            PassKind::PostProcessScene,
            PassKind::ShadowDepth,
            PassKind::MainColor,
            PassKind::PostProcessComposite,
        ]
    );
    assert_eq!(
        frame.pass(PassKind::PostProcessScene).unwrap().target,
        PassTarget::PostProcess
    );

    let composite = frame.pass(PassKind::PostProcessComposite).unwrap();
    assert_eq!(composite.draws.len(), 1);
    let quad = &composite.draws[0];
    assert_eq!(quad.program_label, "screen");
    assert_eq!(quad.textures, vec![Some(TextureBinding::PostProcessColor)]);
    assert_eq!(quad.state.depth_compare, DepthCompare::Always);
}

#[test]
fn scene_and_main_pass_draw_the_same_content() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let state = FrameState {
        kernel: PostKernel::Inversion,
        ..FrameState::default()
    };
    let frame = record(&mut renderer, &state, &mut uploader);

    let scene = frame.pass(PassKind::PostProcessScene).unwrap();
    let main = frame.pass(PassKind::MainColor).unwrap();
    let labels = |pass: &PassRecord| pass.draws.iter().map(|d| d.program_label).collect::<Vec<_>>();
    assert_eq!(labels(scene), labels(main));
    // 2 environment cubes, floor, 4 light cubes, 5 grass, 3 windows, skybox
    assert_eq!(main.draws.len(), 16);
}

#[test]
fn static_geometry_is_uploaded_once_across_frames() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let mut state = FrameState::default();

    for _ in 0..3 {
        state.advance(0.016);
        record(&mut renderer, &state, &mut uploader);
    }
    assert_eq!(uploader.uploads.len(), 4);
    assert!(!uploader.uploads.contains(&"screen_quad".to_string()));

    state.kernel = PostKernel::Sharpen;
    for _ in 0..3 {
        record(&mut renderer, &state, &mut uploader);
    }
    assert_eq!(uploader.uploads.len(), 5);
    assert_eq!(uploader.uploads.last().map(String::as_str), Some("screen_quad"));
}

#[test]
fn draw_state_follows_the_object_kind() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let frame = record(&mut renderer, &FrameState::default(), &mut uploader);
    let main = frame.pass(PassKind::MainColor).unwrap();

    for draw in draws_with(main, "floor") {
        assert_eq!(draw.state.cull, CullMode::Back);
        assert_eq!(draw.state.blend, BlendMode::Opaque);
        assert_eq!(
            draw.textures,
            vec![
                Some(TextureBinding::Image(renderer.assets().floor)),
                Some(TextureBinding::ShadowMap),
            ]
        );
    }

    let blended = draws_with(main, "blend");
    assert_eq!(blended.len(), 8);
    for draw in blended {
        assert_eq!(draw.state.cull, CullMode::None);
        assert_eq!(draw.state.blend, BlendMode::Alpha);
    }

    let skybox = draws_with(main, "skybox");
    assert_eq!(skybox.len(), 1);
    assert_eq!(skybox[0].state.depth_compare, DepthCompare::LessEqual);
    assert_eq!(skybox[0].state.cull, CullMode::None);
    assert_eq!(main.draws.last().map(|d| d.program_label), Some("skybox"));
}

#[test]
fn shadow_pass_only_uses_the_depth_program() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let frame = record(&mut renderer, &FrameState::default(), &mut uploader);
    let shadow = frame.pass(PassKind::ShadowDepth).unwrap();

    assert!(!shadow.draws.is_empty());
    assert!(shadow.draws.iter().all(|draw| draw.program_label == "depth"));
    // 2 environment cubes, floor, 4 light cubes, 8 quads
    assert_eq!(shadow.draws.len(), 15);
}

#[test]
fn windows_are_drawn_back_to_front() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let frame = record(&mut renderer, &FrameState::default(), &mut uploader);
    let main = frame.pass(PassKind::MainColor).unwrap();

    let eye = camera().position;
    let windows: Vec<Vec3> = draws_with(main, "blend")
        .into_iter()
        .map(|draw| model_matrix(&frame, draw).w_axis.truncate())
        .filter(|position| WINDOW_POSITIONS.contains(position))
        .collect();
    assert_eq!(windows.len(), WINDOW_POSITIONS.len());
    for pair in windows.windows(2) {
        assert!(eye.distance(pair[0]) >= eye.distance(pair[1]));
    }
}

#[test]
fn light_cubes_follow_the_frame_state() {
    let mut renderer = renderer();
    let mut uploader = CountingUploader::default();
    let mut state = FrameState::default();
    state.advance(1.25);
    let frame = record(&mut renderer, &state, &mut uploader);
    let main = frame.pass(PassKind::MainColor).unwrap();

    let cubes = draws_with(main, "light_cube");
    assert_eq!(cubes.len(), state.point_light_positions.len());
    for (draw, expected) in cubes.iter().zip(state.point_light_positions) {
        let position = model_matrix(&frame, draw).w_axis.truncate();
        assert!(position.abs_diff_eq(expected, 1e-5));
    }
}
