pub mod camera;
pub mod commands;
pub mod depth;
pub mod drawable;
pub mod executor;
pub mod framebuffer;
pub mod gpu;
pub mod lights;
pub mod material;
pub mod model;
pub mod passes;
pub mod pipeline_builder;
pub mod postprocess;
pub mod primitives;
pub mod program;
pub mod render_context;
pub mod shaders;
pub mod state;
pub mod texture;
pub mod uniform_layout;
pub mod vertex;

pub use camera::{Camera, CameraMovement};
pub use commands::{FrameCommands, PassKind, PassRecorder, PassTarget, TextureBinding};
pub use depth::Depth;
pub use drawable::{Drawable, DrawableRegistry, GeometryUploader, MeshData, MeshHandle, Shape};
pub use executor::PassExecutor;
pub use framebuffer::{PostProcessTarget, ShadowMapTarget};
pub use gpu::{GpuContext, GpuResources};
pub use lights::{Light, LightUniformNames};
pub use material::Material;
pub use passes::{FrameViewports, SceneAssets, SceneRenderer};
pub use postprocess::PostKernel;
pub use program::{ShaderProgram, UniformSink, UniformValue};
pub use render_context::FrameTargets;
pub use shaders::ProgramSet;
pub use uniform_layout::{UniformKind, UniformStruct};
pub use vertex::Vertex;
