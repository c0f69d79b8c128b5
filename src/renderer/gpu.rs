//! Device, surface and the GPU copies of meshes and textures.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::error::RenderError;
use crate::renderer::commands::TextureBinding;
use crate::renderer::depth::Depth;
use crate::renderer::drawable::{GeometryUploader, MeshData, MeshHandle, MeshId};
use crate::renderer::model::{self, Model, ModelMesh};
use crate::renderer::texture::{self, Texture, TextureId, TextureKind};
use crate::settings::RenderSettings;

pub struct GpuContext {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub size: PhysicalSize<u32>,
    pub depth: Depth,
    /// `ADDRESS_MODE_CLAMP_TO_BORDER` was granted; the shadow sampler uses it.
    pub supports_border_clamp: bool,
}

impl GpuContext {
    pub async fn new(window: Arc<Window>, settings: &RenderSettings) -> Result<Self, RenderError> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;
        log::info!("Surface created successfully!");

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await?;

        log::info!("Using adapter: {:?}", adapter.get_info());
        let adapter_features = adapter.features();

        let mut required_features = wgpu::Features::empty();
        let supports_border_clamp =
            adapter_features.contains(wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER);
        if supports_border_clamp {
            required_features |= wgpu::Features::ADDRESS_MODE_CLAMP_TO_BORDER;
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features,
                required_limits: wgpu::Limits::default(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await?;

        device.on_uncaptured_error(log_uncaptured_errors());

        let surface_caps = surface.get_capabilities(&adapter);
        let format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8Unorm);
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let present_mode = settings.present_mode(&surface_caps.present_modes);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        log::info!(
            "Surface configured: {}x{} {:?} {:?}",
            config.width,
            config.height,
            format,
            present_mode
        );

        let depth = Depth::new(&device, size);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            depth,
            supports_border_clamp,
        })
    }

    pub fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.size = new_size;
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        self.depth = Depth::new(&self.device, new_size);
        log::debug!(
            "Resized surface to {}x{}; offscreen targets keep their size",
            new_size.width,
            new_size.height
        );
    }

    /// After `Lost` or `Outdated`.
    pub fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
    }

    pub fn surface_size(&self) -> (u32, u32) {
        (self.config.width, self.config.height)
    }
}

pub struct GpuMesh {
    pub vertices: wgpu::Buffer,
    pub indices: Option<wgpu::Buffer>,
}

/// Owns every uploaded mesh and texture. Handed out ids index into it.
pub struct GpuResources {
    device: wgpu::Device,
    queue: wgpu::Queue,
    meshes: Vec<GpuMesh>,
    textures: Vec<Texture>,
    white: TextureId,
    black_cube: TextureId,
}

impl GpuResources {
    pub fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let mut resources = Self {
            device: device.clone(),
            queue: queue.clone(),
            meshes: Vec::new(),
            textures: Vec::new(),
            white: TextureId(0),
            black_cube: TextureId(0),
        };
        resources.white = resources.push_texture(Texture::solid(
            device,
            queue,
            [255, 255, 255, 255],
            Some("FallbackWhite"),
        ));
        resources.black_cube = resources.push_texture(Texture::solid_cube(
            device,
            queue,
            [0, 0, 0, 255],
            Some("FallbackCube"),
        ));
        resources
    }

    /// Stand-in for missing 2D images.
    pub fn white(&self) -> TextureId {
        self.white
    }

    /// Stand-in for a missing skybox.
    pub fn black_cube(&self) -> TextureId {
        self.black_cube
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.get(id.0 as usize)
    }

    pub fn mesh(&self, id: MeshId) -> Option<&GpuMesh> {
        self.meshes.get(id.0 as usize)
    }

    pub fn fallback_for(&self, kind: TextureKind) -> TextureId {
        match kind {
            TextureKind::D2 => self.white,
            TextureKind::Cube => self.black_cube,
        }
    }

    pub fn load_texture(&mut self, path: impl AsRef<Path>) -> TextureId {
        let path = path.as_ref();
        match texture::decode_image(path) {
            Ok(image) => {
                log::info!(
                    "Loaded texture {} ({}x{}, {} channels)",
                    path.display(),
                    image.width,
                    image.height,
                    image.channels
                );
                let label = path.display().to_string();
                let texture = Texture::from_image(&self.device, &self.queue, &image, Some(&label));
                self.push_texture(texture)
            }
            Err(err) => {
                log::error!("{}", err);
                self.white
            }
        }
    }

    pub fn load_cube(&mut self, faces: &[PathBuf]) -> TextureId {
        match texture::decode_cube_faces(faces) {
            Ok(images) => {
                log::info!(
                    "Loaded cube map ({}x{} faces)",
                    images[0].width,
                    images[0].height
                );
                let texture =
                    Texture::cube_from_faces(&self.device, &self.queue, &images, Some("Skybox"));
                self.push_texture(texture)
            }
            Err(err) => {
                log::error!("{}", err);
                self.black_cube
            }
        }
    }

    pub fn load_model(&mut self, path: impl AsRef<Path>) -> Model {
        let path = path.as_ref();
        let label = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());

        let data = match model::import(path) {
            Ok(data) => data,
            Err(err) => {
                log::error!("{}", err);
                return Model::empty(label);
            }
        };

        let images: Vec<TextureId> = data
            .images
            .iter()
            .enumerate()
            .map(|(index, image)| {
                let name = format!("{label}#image{index}");
                let texture = Texture::from_image(&self.device, &self.queue, image, Some(&name));
                self.push_texture(texture)
            })
            .collect();

        let meshes = data
            .meshes
            .iter()
            .map(|submesh| {
                let diffuse = submesh
                    .diffuse
                    .and_then(|index| images.get(index).copied())
                    .unwrap_or(self.white);
                ModelMesh {
                    mesh: self.upload(&submesh.data),
                    diffuse: TextureBinding::Image(diffuse),
                }
            })
            .collect();

        Model::new(label, meshes)
    }

    fn push_texture(&mut self, texture: Texture) -> TextureId {
        self.textures.push(texture);
        TextureId(self.textures.len() as u32 - 1)
    }
}

impl GeometryUploader for GpuResources {
    fn upload(&mut self, mesh: &MeshData) -> MeshHandle {
        let vertices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&mesh.label),
                contents: &mesh.vertices,
                usage: wgpu::BufferUsages::VERTEX,
            });
        let indices = mesh.indices.as_ref().map(|indices| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&mesh.label),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX,
                })
        });

        self.meshes.push(GpuMesh { vertices, indices });
        MeshHandle {
            id: MeshId(self.meshes.len() as u32 - 1),
            layout: mesh.layout,
            vertex_count: mesh.vertex_count,
            index_count: mesh.indices.as_ref().map(|indices| indices.len() as u32),
        }
    }
}

fn log_uncaptured_errors() -> Arc<dyn wgpu::UncapturedErrorHandler> {
    Arc::new(|err: wgpu::Error| {
        log::error!("wgpu uncaptured error: {err}");
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncaptured_error_handler_is_shareable() {
        let handler = log_uncaptured_errors();
        let shared = Arc::clone(&handler);
        assert_eq!(Arc::strong_count(&handler), 2);
        drop(shared);
        assert_eq!(Arc::strong_count(&handler), 1);
    }
}
