use serde::{Deserialize, Serialize};

use crate::renderer::program::UniformSink;

/// Sampling distance between kernel taps, in uv units.
pub const TEXEL_OFFSET: f32 = 1.0 / 300.0;

const KERNEL_NAMES: [&str; 9] = [
    "kernel[0]", "kernel[1]", "kernel[2]", "kernel[3]", "kernel[4]", "kernel[5]", "kernel[6]",
    "kernel[7]", "kernel[8]",
];

/// Full-screen filter applied to the offscreen color target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostKernel {
    #[default]
    Disabled,
    Inversion,
    Grayscale,
    Sharpen,
    Blur,
    EdgeDetection,
}

impl PostKernel {
    pub const ALL: [PostKernel; 6] = [
        PostKernel::Disabled,
        PostKernel::Inversion,
        PostKernel::Grayscale,
        PostKernel::Sharpen,
        PostKernel::Blur,
        PostKernel::EdgeDetection,
    ];

    pub fn is_active(self) -> bool {
        self != Self::Disabled
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Disabled => "None",
            Self::Inversion => "Inversion",
            Self::Grayscale => "Grayscale",
            Self::Sharpen => "Sharpen",
            Self::Blur => "Blur",
            Self::EdgeDetection => "Edge detection",
        }
    }

    /// Branch selector in `screen.wgsl`: 0 pass-through, 1 invert,
    /// 2 grayscale, 3 3x3 convolution.
    pub fn mode(self) -> i32 {
        match self {
            Self::Disabled => 0,
            Self::Inversion => 1,
            Self::Grayscale => 2,
            Self::Sharpen | Self::Blur | Self::EdgeDetection => 3,
        }
    }

    /// Row-major 3x3 weights, top-left tap first.
    pub fn weights(self) -> [f32; 9] {
        match self {
            Self::Sharpen => [-1.0, -1.0, -1.0, -1.0, 9.0, -1.0, -1.0, -1.0, -1.0],
            Self::Blur => [
                0.0625, 0.125, 0.0625, 0.125, 0.25, 0.125, 0.0625, 0.125, 0.0625,
            ],
            Self::EdgeDetection => [1.0, 1.0, 1.0, 1.0, -8.0, 1.0, 1.0, 1.0, 1.0],
            Self::Disabled | Self::Inversion | Self::Grayscale => {
                [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0]
            }
        }
    }

    pub fn push_uniforms<S: UniformSink + ?Sized>(self, sink: &mut S) {
        sink.set_int("kernelMode", self.mode());
        sink.set_float("texelOffset", TEXEL_OFFSET);
        for (name, weight) in KERNEL_NAMES.iter().zip(self.weights()) {
            sink.set_float(name, weight);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convolution_kernels_preserve_or_cancel_brightness() {
        let sum = |k: PostKernel| k.weights().iter().sum::<f32>();
        assert!((sum(PostKernel::Blur) - 1.0).abs() < 1e-6);
        assert!((sum(PostKernel::Sharpen) - 1.0).abs() < 1e-6);
        assert!(sum(PostKernel::EdgeDetection).abs() < 1e-6);
    }

    #[test]
    fn only_disabled_is_inactive() {
        let active: Vec<_> = PostKernel::ALL.iter().filter(|k| k.is_active()).collect();
        assert_eq!(active.len(), 5);
    }

    #[test]
    fn parses_snake_case_names() {
        let kernel: PostKernel = serde_json::from_str("\"edge_detection\"").unwrap();
        assert_eq!(kernel, PostKernel::EdgeDetection);
    }
}
