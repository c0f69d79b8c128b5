//! Static demo geometry, uploaded lazily and at most once.

use std::cell::OnceCell;

use bytemuck::Pod;

use crate::renderer::commands::PassRecorder;
use crate::renderer::primitives;
use crate::renderer::program::ShaderProgram;
use crate::renderer::vertex::VertexLayout;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshId(pub u32);

/// What a draw needs to know about uploaded geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    pub id: MeshId,
    pub layout: VertexLayout,
    pub vertex_count: u32,
    pub index_count: Option<u32>,
}

/// CPU-side geometry ready for upload.
#[derive(Clone, Debug)]
pub struct MeshData {
    pub label: String,
    pub layout: VertexLayout,
    pub vertices: Vec<u8>,
    pub vertex_count: u32,
    pub indices: Option<Vec<u32>>,
}

impl MeshData {
    pub fn from_vertices<T: Pod>(label: impl Into<String>, layout: VertexLayout, vertices: &[T]) -> Self {
        Self {
            label: label.into(),
            layout,
            vertices: bytemuck::cast_slice(vertices).to_vec(),
            vertex_count: vertices.len() as u32,
            indices: None,
        }
    }

    pub fn with_indices(mut self, indices: Vec<u32>) -> Self {
        self.indices = Some(indices);
        self
    }
}

/// Turns [`MeshData`] into GPU buffers.
pub trait GeometryUploader {
    fn upload(&mut self, mesh: &MeshData) -> MeshHandle;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Shape {
    Cube,
    Floor,
    Foliage,
    Skybox,
    ScreenQuad,
}

impl Shape {
    pub const ALL: [Shape; 5] = [
        Shape::Cube,
        Shape::Floor,
        Shape::Foliage,
        Shape::Skybox,
        Shape::ScreenQuad,
    ];

    pub fn mesh_data(self) -> MeshData {
        match self {
            Self::Cube => MeshData::from_vertices(
                "cube",
                VertexLayout::PositionNormalUv,
                &primitives::cube_vertices(),
            ),
            Self::Floor => MeshData::from_vertices(
                "floor",
                VertexLayout::PositionNormalUv,
                &primitives::floor_vertices(),
            ),
            Self::Foliage => MeshData::from_vertices(
                "foliage",
                VertexLayout::PositionUv,
                &primitives::billboard_vertices(),
            ),
            Self::Skybox => MeshData::from_vertices(
                "skybox",
                VertexLayout::Position,
                &primitives::skybox_positions(),
            ),
            Self::ScreenQuad => MeshData::from_vertices(
                "screen_quad",
                VertexLayout::ScreenQuad,
                &primitives::screen_quad_vertices(),
            ),
        }
    }
}

pub struct Drawable {
    shape: Shape,
    mesh: OnceCell<MeshHandle>,
}

impl Drawable {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            mesh: OnceCell::new(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    /// `None` until the first [`Drawable::ensure_initialized`].
    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh.get().copied()
    }

    /// Uploads the geometry on first call; later calls return the same handle.
    pub fn ensure_initialized(&self, uploader: &mut dyn GeometryUploader) -> MeshHandle {
        *self.mesh.get_or_init(|| {
            let data = self.shape.mesh_data();
            log::debug!(
                "Uploading {:?} geometry: {} vertices",
                self.shape,
                data.vertex_count
            );
            uploader.upload(&data)
        })
    }

    pub fn draw(
        &self,
        uploader: &mut dyn GeometryUploader,
        pass: &mut PassRecorder<'_>,
        program: &ShaderProgram,
    ) {
        let mesh = self.ensure_initialized(uploader);
        pass.draw(program, mesh);
    }
}

pub struct DrawableRegistry {
    cube: Drawable,
    floor: Drawable,
    foliage: Drawable,
    skybox: Drawable,
    screen_quad: Drawable,
}

impl DrawableRegistry {
    pub fn new() -> Self {
        Self {
            cube: Drawable::new(Shape::Cube),
            floor: Drawable::new(Shape::Floor),
            foliage: Drawable::new(Shape::Foliage),
            skybox: Drawable::new(Shape::Skybox),
            screen_quad: Drawable::new(Shape::ScreenQuad),
        }
    }

    pub fn get(&self, shape: Shape) -> &Drawable {
        match shape {
            Shape::Cube => &self.cube,
            Shape::Floor => &self.floor,
            Shape::Foliage => &self.foliage,
            Shape::Skybox => &self.skybox,
            Shape::ScreenQuad => &self.screen_quad,
        }
    }
}

impl Default for DrawableRegistry {
    fn default() -> Self {
        Self::new()
    }
}
