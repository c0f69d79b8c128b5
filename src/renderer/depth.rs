use winit::dpi::PhysicalSize;

/// Depth/stencil attachment of the window surface, recreated on resize.
pub struct Depth {
    pub view: wgpu::TextureView,
    size: (u32, u32),
}

impl Depth {
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24PlusStencil8;

    pub fn new(device: &wgpu::Device, size: PhysicalSize<u32>) -> Self {
        let (width, height) = Self::extent(size);
        let tex = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("ScreenDepthStencil"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = tex.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            size: (width, height),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    fn extent(size: PhysicalSize<u32>) -> (u32, u32) {
        (size.width.max(1), size.height.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimised_window_still_gets_a_texel() {
        assert_eq!(Depth::extent(PhysicalSize::new(0, 0)), (1, 1));
        assert_eq!(Depth::extent(PhysicalSize::new(1280, 720)), (1280, 720));
    }

    #[test]
    fn screen_depth_carries_stencil() {
        assert!(Depth::FORMAT.has_stencil_aspect());
        assert!(Depth::FORMAT.has_depth_aspect());
    }
}
