use std::path::{Path, PathBuf};

use crate::error::RenderError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureKind {
    D2,
    Cube,
}

/// Decoded pixels, tightly packed in `format`.
#[derive(Clone, Debug)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// Channel count of the source file, before any expansion.
    pub channels: u8,
    pub format: wgpu::TextureFormat,
    pub pixels: Vec<u8>,
}

impl DecodedImage {
    pub fn bytes_per_pixel(&self) -> u32 {
        bytes_per_pixel(self.format)
    }
}

/// 1 channel stays single-channel; 3 is widened to RGBA since wgpu has no
/// 24-bit format; 4 is RGBA. Anything else is rejected.
pub fn format_for_channels(channels: u8) -> Option<wgpu::TextureFormat> {
    match channels {
        1 => Some(wgpu::TextureFormat::R8Unorm),
        3 | 4 => Some(wgpu::TextureFormat::Rgba8Unorm),
        _ => None,
    }
}

/// Textures with alpha are assumed to be sprites and are not tiled.
pub fn wrap_mode_for_channels(channels: u8) -> wgpu::AddressMode {
    if channels == 4 {
        wgpu::AddressMode::ClampToEdge
    } else {
        wgpu::AddressMode::Repeat
    }
}

fn bytes_per_pixel(format: wgpu::TextureFormat) -> u32 {
    match format {
        wgpu::TextureFormat::R8Unorm => 1,
        _ => 4,
    }
}

/// Number of mip levels for a full chain down to 1x1.
pub fn mip_level_count(width: u32, height: u32) -> u32 {
    let max_dimension = width.max(height).max(1);
    u32::BITS - max_dimension.leading_zeros()
}

pub fn decode_image(path: impl AsRef<Path>) -> Result<DecodedImage, RenderError> {
    let path = path.as_ref();
    let img = image::open(path).map_err(|err| RenderError::TextureLoad {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    from_dynamic(img, path)
}

pub(crate) fn from_dynamic(img: image::DynamicImage, path: &Path) -> Result<DecodedImage, RenderError> {
    let channels = img.color().channel_count();
    let format = format_for_channels(channels).ok_or_else(|| RenderError::TextureLoad {
        path: path.to_path_buf(),
        message: format!("unsupported channel count {channels}"),
    })?;

    let (width, height) = (img.width(), img.height());
    let pixels = match format {
        wgpu::TextureFormat::R8Unorm => img.into_luma8().into_raw(),
        _ => img.into_rgba8().into_raw(),
    };

    Ok(DecodedImage {
        width,
        height,
        channels,
        format,
        pixels,
    })
}

/// Loads six equally sized faces in +X, -X, +Y, -Y, +Z, -Z order.
pub fn decode_cube_faces(paths: &[PathBuf]) -> Result<Vec<DecodedImage>, RenderError> {
    if paths.len() != 6 {
        return Err(RenderError::TextureLoad {
            path: paths.first().cloned().unwrap_or_default(),
            message: format!("a cube map needs 6 faces, got {}", paths.len()),
        });
    }

    let mut faces = Vec::with_capacity(6);
    for path in paths {
        let img = image::open(path).map_err(|err| RenderError::TextureLoad {
            path: path.clone(),
            message: err.to_string(),
        })?;
        let rgba = img.into_rgba8();
        faces.push(DecodedImage {
            width: rgba.width(),
            height: rgba.height(),
            channels: 4,
            format: wgpu::TextureFormat::Rgba8Unorm,
            pixels: rgba.into_raw(),
        });
    }

    let (width, height) = (faces[0].width, faces[0].height);
    if let Some(index) = faces
        .iter()
        .position(|face| face.width != width || face.height != height)
    {
        return Err(RenderError::TextureLoad {
            path: paths[index].clone(),
            message: format!("cube face size differs from {width}x{height}"),
        });
    }

    Ok(faces)
}

#[derive(Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
    pub kind: TextureKind,
}

impl Texture {
    /// Uploads a decoded image and fills its mip chain on the GPU.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        image: &DecodedImage,
        label: Option<&str>,
    ) -> Self {
        let mip_level_count = mip_level_count(image.width, image.height);
        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: image.format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::RENDER_ATTACHMENT, // Needed for mipmap generation
            view_formats: &[],
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &image.pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(image.bytes_per_pixel() * image.width),
                rows_per_image: Some(image.height),
            },
            size,
        );

        Self::generate_mipmaps(device, queue, &texture, mip_level_count, image.format);

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let wrap = wrap_mode_for_channels(image.channels);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label,
            address_mode_u: wrap,
            address_mode_v: wrap,
            address_mode_w: wrap,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            kind: TextureKind::D2,
        }
    }

    pub fn cube_from_faces(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        faces: &[DecodedImage],
        label: Option<&str>,
    ) -> Self {
        let (width, height) = faces
            .first()
            .map(|face| (face.width, face.height))
            .unwrap_or((1, 1));
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 6,
        };

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });

        for (layer, face) in faces.iter().enumerate().take(6) {
            queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d {
                        x: 0,
                        y: 0,
                        z: layer as u32,
                    },
                    aspect: wgpu::TextureAspect::All,
                },
                &face.pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(4 * width),
                    rows_per_image: Some(height),
                },
                wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label,
            dimension: Some(wgpu::TextureViewDimension::Cube),
            array_layer_count: Some(6),
            ..Default::default()
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label,
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Self {
            texture,
            view,
            sampler,
            kind: TextureKind::Cube,
        }
    }

    /// 1x1 texture of a single color, stands in for images that failed to load.
    pub fn solid(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        label: Option<&str>,
    ) -> Self {
        let image = DecodedImage {
            width: 1,
            height: 1,
            channels: 3,
            format: wgpu::TextureFormat::Rgba8Unorm,
            pixels: color.to_vec(),
        };
        Self::from_image(device, queue, &image, label)
    }

    pub fn solid_cube(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color: [u8; 4],
        label: Option<&str>,
    ) -> Self {
        let face = DecodedImage {
            width: 1,
            height: 1,
            channels: 4,
            format: wgpu::TextureFormat::Rgba8Unorm,
            pixels: color.to_vec(),
        };
        let faces = vec![face; 6];
        Self::cube_from_faces(device, queue, &faces, label)
    }

    /// Downsample each level from the previous one with a linear blit.
    fn generate_mipmaps(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        texture: &wgpu::Texture,
        mip_level_count: u32,
        format: wgpu::TextureFormat,
    ) {
        if mip_level_count <= 1 {
            return;
        }

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Blit Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shader/blit.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Blit Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Blit Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Blit Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Mip Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Mipmap Generator"),
        });

        let level_view = |level: u32, usage: wgpu::TextureUsages| {
            texture.create_view(&wgpu::TextureViewDescriptor {
                label: Some("Mip Level"),
                format: Some(format),
                dimension: Some(wgpu::TextureViewDimension::D2),
                aspect: wgpu::TextureAspect::All,
                base_mip_level: level,
                mip_level_count: Some(1),
                base_array_layer: 0,
                array_layer_count: Some(1),
                usage: Some(usage),
            })
        };

        for target_mip in 1..mip_level_count {
            let src_view = level_view(target_mip - 1, wgpu::TextureUsages::TEXTURE_BINDING);
            let dst_view = level_view(target_mip, wgpu::TextureUsages::RENDER_ATTACHMENT);

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("Mip Bind Group"),
                layout: &bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: wgpu::BindingResource::TextureView(&src_view),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: wgpu::BindingResource::Sampler(&sampler),
                    },
                ],
            });

            let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mipmap Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &dst_view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            rpass.set_pipeline(&pipeline);
            rpass.set_bind_group(0, &bind_group, &[]);
            rpass.draw(0..3, 0..1);
        }

        queue.submit(Some(encoder.finish()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mip_level_calculation() {
        assert_eq!(mip_level_count(1, 1), 1);
        assert_eq!(mip_level_count(2, 2), 2);
        assert_eq!(mip_level_count(256, 256), 9);
        assert_eq!(mip_level_count(1024, 16), 11);
        assert_eq!(mip_level_count(0, 0), 1);
    }

    #[test]
    fn channel_counts_map_to_formats() {
        assert_eq!(format_for_channels(1), Some(wgpu::TextureFormat::R8Unorm));
        assert_eq!(format_for_channels(3), Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(format_for_channels(4), Some(wgpu::TextureFormat::Rgba8Unorm));
        assert_eq!(format_for_channels(2), None);
    }

    #[test]
    fn alpha_textures_clamp() {
        assert_eq!(wrap_mode_for_channels(4), wgpu::AddressMode::ClampToEdge);
        assert_eq!(wrap_mode_for_channels(3), wgpu::AddressMode::Repeat);
        assert_eq!(wrap_mode_for_channels(1), wgpu::AddressMode::Repeat);
    }

    #[test]
    fn rgb_images_expand_to_rgba() {
        let rgb = image::RgbImage::from_pixel(2, 2, image::Rgb([10, 20, 30]));
        let decoded = from_dynamic(image::DynamicImage::ImageRgb8(rgb), Path::new("rgb.png")).unwrap();
        assert_eq!(decoded.channels, 3);
        assert_eq!(decoded.pixels.len(), 16);
        assert_eq!(&decoded.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn gray_images_stay_single_channel() {
        let gray = image::GrayImage::from_pixel(3, 1, image::Luma([7]));
        let decoded = from_dynamic(image::DynamicImage::ImageLuma8(gray), Path::new("g.png")).unwrap();
        assert_eq!(decoded.format, wgpu::TextureFormat::R8Unorm);
        assert_eq!(decoded.pixels, vec![7, 7, 7]);
    }

    #[test]
    fn missing_file_is_a_texture_error() {
        let err = decode_image("does/not/exist.png").unwrap_err();
        assert!(matches!(err, RenderError::TextureLoad { .. }));
    }

    #[test]
    fn cube_needs_six_faces() {
        let err = decode_cube_faces(&[PathBuf::from("a.png")]).unwrap_err();
        assert!(matches!(err, RenderError::TextureLoad { .. }));
    }
}
