//! glTF import for the two demo models.
//!
//! Node transforms are baked into the vertices, so a model is a flat list of
//! submeshes that all share the model matrix set by the caller.

use std::path::{Path, PathBuf};

use glam::{Mat3, Mat4, Vec3};

use crate::error::RenderError;
use crate::renderer::commands::{PassRecorder, TextureBinding};
use crate::renderer::drawable::{MeshData, MeshHandle};
use crate::renderer::program::ShaderProgram;
use crate::renderer::texture::{self, DecodedImage};
use crate::renderer::vertex::{Vertex, VertexLayout};

/// One primitive of the source file, ready for upload.
#[derive(Clone, Debug)]
pub struct SubMesh {
    pub data: MeshData,
    /// Index into [`ModelData::images`].
    pub diffuse: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct ModelData {
    pub path: PathBuf,
    pub meshes: Vec<SubMesh>,
    pub images: Vec<DecodedImage>,
}

impl ModelData {
    pub fn vertex_count(&self) -> u32 {
        self.meshes.iter().map(|mesh| mesh.data.vertex_count).sum()
    }
}

pub fn import(path: impl AsRef<Path>) -> Result<ModelData, RenderError> {
    let path = path.as_ref();
    let import_error = |message: String| RenderError::ModelImport {
        path: path.to_path_buf(),
        message,
    };

    let (document, buffers, images) =
        gltf::import(path).map_err(|err| import_error(err.to_string()))?;

    let images = images
        .iter()
        .enumerate()
        .map(|(index, data)| {
            convert_image(data).ok_or_else(|| {
                import_error(format!(
                    "image {index} has unsupported format {:?}",
                    data.format
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut meshes = Vec::new();
    match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => {
            for node in scene.nodes() {
                collect_node(&node, Mat4::IDENTITY, &buffers, &mut meshes)?;
            }
        }
        None => {
            for mesh in document.meshes() {
                collect_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut meshes)?;
            }
        }
    }

    if meshes.is_empty() {
        return Err(import_error("file contains no triangle meshes".to_string()));
    }

    let model = ModelData {
        path: path.to_path_buf(),
        meshes,
        images,
    };
    log::info!(
        "Imported {}: {} meshes, {} vertices, {} images",
        path.display(),
        model.meshes.len(),
        model.vertex_count(),
        model.images.len()
    );
    Ok(model)
}

fn collect_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<SubMesh>,
) -> Result<(), RenderError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        collect_mesh(&mesh, world, buffers, out)?;
    }
    for child in node.children() {
        collect_node(&child, world, buffers, out)?;
    }
    Ok(())
}

fn collect_mesh(
    mesh: &gltf::Mesh,
    transform: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<SubMesh>,
) -> Result<(), RenderError> {
    let name = mesh.name().unwrap_or("mesh");
    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            log::warn!("Skipping non-triangle primitive in `{}`", name);
            continue;
        }

        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|d| &d.0[..]));
        let Some(positions) = reader.read_positions() else {
            log::warn!("Skipping primitive without positions in `{}`", name);
            continue;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let normals = reader
            .read_normals()
            .map(|n| n.collect::<Vec<_>>())
            .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
        let uvs = reader
            .read_tex_coords(0)
            .map(|uv| uv.into_f32().collect::<Vec<_>>())
            .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);

        let vertices = bake_vertices(&positions, &normals, &uvs, transform);
        let label = format!("{}#{}", name, primitive.index());
        let mut data = MeshData::from_vertices(label, VertexLayout::PositionNormalUv, &vertices);
        if let Some(indices) = reader.read_indices() {
            data = data.with_indices(indices.into_u32().collect());
        }

        let diffuse = primitive
            .material()
            .pbr_metallic_roughness()
            .base_color_texture()
            .map(|info| info.texture().source().index());

        out.push(SubMesh { data, diffuse });
    }
    Ok(())
}

/// Interleaves attribute streams and applies `transform`. Missing normals or
/// uvs (shorter streams) fall back to +Y and the origin.
pub fn bake_vertices(
    positions: &[[f32; 3]],
    normals: &[[f32; 3]],
    uvs: &[[f32; 2]],
    transform: Mat4,
) -> Vec<Vertex> {
    let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
    positions
        .iter()
        .enumerate()
        .map(|(index, &pos)| {
            let normal = normals.get(index).copied().unwrap_or([0.0, 1.0, 0.0]);
            let uv = uvs.get(index).copied().unwrap_or([0.0, 0.0]);
            let pos = transform.transform_point3(Vec3::from(pos));
            let normal = (normal_matrix * Vec3::from(normal)).normalize_or_zero();
            Vertex {
                pos: pos.to_array(),
                normal: normal.to_array(),
                uv,
            }
        })
        .collect()
}

fn convert_image(data: &gltf::image::Data) -> Option<DecodedImage> {
    use gltf::image::Format;

    let (w, h, pixels) = (data.width, data.height, data.pixels.clone());
    let img = match data.format {
        Format::R8 => image::GrayImage::from_raw(w, h, pixels).map(image::DynamicImage::ImageLuma8),
        Format::R8G8 => {
            image::GrayAlphaImage::from_raw(w, h, pixels).map(image::DynamicImage::ImageLumaA8)
        }
        Format::R8G8B8 => image::RgbImage::from_raw(w, h, pixels).map(image::DynamicImage::ImageRgb8),
        Format::R8G8B8A8 => {
            image::RgbaImage::from_raw(w, h, pixels).map(image::DynamicImage::ImageRgba8)
        }
        _ => None,
    }?;

    // Models always sample color, so even grayscale images go to RGBA.
    let channels = img.color().channel_count();
    let rgba = img.into_rgba8();
    Some(DecodedImage {
        width: rgba.width(),
        height: rgba.height(),
        channels: channels.max(3),
        format: texture::format_for_channels(4)?,
        pixels: rgba.into_raw(),
    })
}

/// An uploaded submesh and the texture bound to unit 0 while drawing it.
#[derive(Clone, Copy, Debug)]
pub struct ModelMesh {
    pub mesh: MeshHandle,
    pub diffuse: TextureBinding,
}

#[derive(Clone, Debug, Default)]
pub struct Model {
    label: String,
    meshes: Vec<ModelMesh>,
}

impl Model {
    pub fn new(label: impl Into<String>, meshes: Vec<ModelMesh>) -> Self {
        Self {
            label: label.into(),
            meshes,
        }
    }

    /// Stands in for a model that failed to import; draws nothing.
    pub fn empty(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn meshes(&self) -> &[ModelMesh] {
        &self.meshes
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

/// Something that issues its own draws with a program the caller prepared.
pub trait SceneDrawable {
    fn draw(&self, pass: &mut PassRecorder<'_>, program: &ShaderProgram);
}

impl SceneDrawable for Model {
    fn draw(&self, pass: &mut PassRecorder<'_>, program: &ShaderProgram) {
        for mesh in &self.meshes {
            pass.bind_texture(0, mesh.diffuse);
            pass.draw(program, mesh.mesh);
        }
    }
}
