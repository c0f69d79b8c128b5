//! Offscreen render targets. Both are created once at startup at a fixed
//! size and are not resized with the window.

use crate::error::RenderError;

pub const POST_COLOR_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;
pub const POST_DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;
pub const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// The checks a GL framebuffer completeness query would catch for our
/// attachments: zero-sized or oversized images.
pub fn check_completeness(
    label: &'static str,
    width: u32,
    height: u32,
    max_dimension: u32,
) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::IncompleteFramebuffer {
            label,
            reason: format!("attachment size {width}x{height} has a zero dimension"),
        });
    }
    if width > max_dimension || height > max_dimension {
        return Err(RenderError::IncompleteFramebuffer {
            label,
            reason: format!(
                "attachment size {width}x{height} exceeds the device limit {max_dimension}"
            ),
        });
    }
    Ok(())
}

fn checked_extent(label: &'static str, width: u32, height: u32, max_dimension: u32) -> (u32, u32) {
    match check_completeness(label, width, height, max_dimension) {
        Ok(()) => (width, height),
        Err(err) => {
            log::error!("{}", err);
            (width.clamp(1, max_dimension), height.clamp(1, max_dimension))
        }
    }
}

/// Address mode for shadow map lookups. With border clamping, texels outside
/// the light frustum read as depth 1.0 and count as lit.
pub fn shadow_address_mode(
    supports_border: bool,
) -> (wgpu::AddressMode, Option<wgpu::SamplerBorderColor>) {
    if supports_border {
        (
            wgpu::AddressMode::ClampToBorder,
            Some(wgpu::SamplerBorderColor::OpaqueWhite),
        )
    } else {
        (wgpu::AddressMode::ClampToEdge, None)
    }
}

/// Color + depth/stencil target the scene is rendered into before a kernel
/// is applied.
pub struct PostProcessTarget {
    _color: wgpu::Texture,
    color_view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    depth_view: wgpu::TextureView,
    size: (u32, u32),
}

impl PostProcessTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let max = device.limits().max_texture_dimension_2d;
        let (width, height) = checked_extent("post_process", width, height, max);
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };

        let color = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("PostProcessColor"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: POST_COLOR_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

        let depth = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("PostProcessDepthStencil"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: POST_DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("PostProcessSampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        log::info!("Post-process target: {}x{}", width, height);

        Self {
            _color: color,
            color_view,
            sampler,
            depth_view,
            size: (width, height),
        }
    }

    pub fn color_view(&self) -> &wgpu::TextureView {
        &self.color_view
    }

    pub fn depth_view(&self) -> &wgpu::TextureView {
        &self.depth_view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }
}

/// Depth-only target rendered from the light.
pub struct ShadowMapTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    size: u32,
}

impl ShadowMapTarget {
    pub fn new(device: &wgpu::Device, size: u32, supports_border: bool) -> Self {
        let max = device.limits().max_texture_dimension_2d;
        let (size, _) = checked_extent("shadow_map", size, size, max);

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ShadowMap"),
            size: wgpu::Extent3d {
                width: size,
                height: size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let (address_mode, border_color) = shadow_address_mode(supports_border);
        if !supports_border {
            log::warn!(
                "Adapter lacks ADDRESS_MODE_CLAMP_TO_BORDER; shadow lookups outside the light frustum are clamped to the edge"
            );
        }

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("ShadowSampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            compare: Some(wgpu::CompareFunction::LessEqual),
            border_color,
            ..Default::default()
        });

        log::info!("Shadow map: {}x{} {:?}", size, size, SHADOW_FORMAT);

        Self {
            _texture: texture,
            view,
            sampler,
            size,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn size(&self) -> u32 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_target_is_incomplete() {
        let err = check_completeness("post_process", 0, 720, 8192).unwrap_err();
        assert!(matches!(err, RenderError::IncompleteFramebuffer { .. }));
    }

    #[test]
    fn oversized_target_is_incomplete_and_clamped() {
        assert!(check_completeness("shadow_map", 16384, 16384, 8192).is_err());
        assert_eq!(checked_extent("shadow_map", 16384, 0, 8192), (8192, 1));
    }

    #[test]
    fn border_clamp_reads_white() {
        let (mode, border) = shadow_address_mode(true);
        assert_eq!(mode, wgpu::AddressMode::ClampToBorder);
        assert_eq!(border, Some(wgpu::SamplerBorderColor::OpaqueWhite));
        assert_eq!(shadow_address_mode(false).1, None);
    }
}
