use std::path::PathBuf;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::renderer::postprocess::PostKernel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default = "RenderSettings::default_shadow_map_size")]
    pub shadow_map_size: u32,
    #[serde(default)]
    pub resolution: Resolution,
    #[serde(default)]
    pub present_mode: PresentModeSetting,
    /// Read shaders from this directory instead of the bundled copies.
    #[serde(default)]
    pub shader_dir: Option<PathBuf>,
    #[serde(default)]
    pub assets: AssetPaths,
    #[serde(default)]
    pub initial_kernel: PostKernel,
    #[serde(default = "RenderSettings::default_clear_color")]
    pub clear_color: [f32; 4],
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadow_map_size: Self::default_shadow_map_size(),
            resolution: Resolution::default(),
            present_mode: PresentModeSetting::default(),
            shader_dir: None,
            assets: AssetPaths::default(),
            initial_kernel: PostKernel::default(),
            clear_color: Self::default_clear_color(),
        }
    }
}

impl RenderSettings {
    pub fn load() -> Self {
        Self::load_from_path("settings.json")
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Self {
        use std::fs;

        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RenderSettings>(&contents) {
                Ok(settings) => {
                    info!("Loaded render settings from {:?}", path);
                    settings.validate()
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {:?} ({}). Falling back to default render settings.",
                        path, err
                    );
                    RenderSettings::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(
                    "Render settings file {:?} not found. Using default settings.",
                    path
                );
                RenderSettings::default()
            }
            Err(err) => {
                warn!(
                    "Failed to read {:?} ({}). Falling back to default render settings.",
                    path, err
                );
                RenderSettings::default()
            }
        }
    }

    fn validate(mut self) -> Self {
        if self.shadow_map_size == 0 {
            warn!("Shadow map size must be greater than zero. Using default value.");
            self.shadow_map_size = Self::default_shadow_map_size();
        }

        if self.resolution.width == 0 || self.resolution.height == 0 {
            warn!("Resolution must be greater than zero. Using default resolution.");
            self.resolution = Resolution::default();
        }

        if self.assets.skybox_faces.len() != 6 {
            warn!(
                "Skybox needs 6 faces, got {}. Using the default face names.",
                self.assets.skybox_faces.len()
            );
            self.assets.skybox_faces = AssetPaths::default().skybox_faces;
        }

        if self.clear_color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            warn!("Clear color components must be in [0, 1]. Clamping.");
            for c in &mut self.clear_color {
                *c = if c.is_finite() { c.clamp(0.0, 1.0) } else { 0.0 };
            }
        }

        self
    }

    pub fn present_mode(&self, available: &[wgpu::PresentMode]) -> wgpu::PresentMode {
        let desired = self.present_mode.to_wgpu();
        if available.contains(&desired) {
            return desired;
        }

        warn!(
            "Requested present mode {:?} is not supported. Falling back to FIFO.",
            desired
        );

        if available.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            available
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo)
        }
    }

    const fn default_shadow_map_size() -> u32 {
        1024
    }

    const fn default_clear_color() -> [f32; 4] {
        [0.45, 0.55, 0.60, 1.0]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Default for Resolution {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Where textures, the skybox and the two models are read from. Relative
/// paths resolve against the working directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    pub floor_texture: PathBuf,
    pub grass_texture: PathBuf,
    pub window_texture: PathBuf,
    pub skybox_dir: PathBuf,
    /// +X, -X, +Y, -Y, +Z, -Z
    pub skybox_faces: Vec<String>,
    pub house_model: PathBuf,
    pub character_model: PathBuf,
}

impl AssetPaths {
    pub fn skybox_paths(&self) -> Vec<PathBuf> {
        self.skybox_faces
            .iter()
            .map(|face| self.skybox_dir.join(face))
            .collect()
    }
}

impl Default for AssetPaths {
    fn default() -> Self {
        Self {
            floor_texture: PathBuf::from("assets/textures/metal.png"),
            grass_texture: PathBuf::from("assets/textures/grass.png"),
            window_texture: PathBuf::from("assets/textures/window.png"),
            skybox_dir: PathBuf::from("assets/skybox"),
            skybox_faces: ["right.jpg", "left.jpg", "top.jpg", "bottom.jpg", "front.jpg", "back.jpg"]
                .iter()
                .map(|face| face.to_string())
                .collect(),
            house_model: PathBuf::from("assets/models/house/scene.gltf"),
            character_model: PathBuf::from("assets/models/ori/scene.gltf"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentModeSetting {
    #[default]
    Fifo,
    FifoRelaxed,
    Immediate,
    Mailbox,
    AutoVsync,
    AutoNoVsync,
}

impl PresentModeSetting {
    fn to_wgpu(&self) -> wgpu::PresentMode {
        match self {
            PresentModeSetting::Fifo => wgpu::PresentMode::Fifo,
            PresentModeSetting::FifoRelaxed => wgpu::PresentMode::FifoRelaxed,
            PresentModeSetting::Immediate => wgpu::PresentMode::Immediate,
            PresentModeSetting::Mailbox => wgpu::PresentMode::Mailbox,
            PresentModeSetting::AutoVsync => wgpu::PresentMode::AutoVsync,
            PresentModeSetting::AutoNoVsync => wgpu::PresentMode::AutoNoVsync,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_settings() -> RenderSettings {
        RenderSettings {
            shadow_map_size: 0,
            resolution: Resolution {
                width: 0,
                height: 0,
            },
            assets: AssetPaths {
                skybox_faces: vec!["only_one.jpg".to_string()],
                ..AssetPaths::default()
            },
            clear_color: [2.0, -1.0, 0.5, 1.0],
            ..RenderSettings::default()
        }
    }

    #[test]
    fn validate_replaces_invalid_values_with_defaults() {
        let validated = invalid_settings().validate();

        assert_eq!(
            validated.shadow_map_size,
            RenderSettings::default().shadow_map_size
        );
        assert_eq!(validated.resolution.width, Resolution::default().width);
        assert_eq!(validated.resolution.height, Resolution::default().height);
        assert_eq!(validated.assets.skybox_faces.len(), 6);
        assert_eq!(validated.clear_color, [1.0, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn validate_preserves_valid_values() {
        let valid = RenderSettings {
            shadow_map_size: 2048,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            present_mode: PresentModeSetting::Mailbox,
            initial_kernel: PostKernel::Blur,
            ..RenderSettings::default()
        };

        let validated = valid.clone().validate();

        assert_eq!(validated.shadow_map_size, valid.shadow_map_size);
        assert_eq!(validated.resolution.width, valid.resolution.width);
        assert_eq!(validated.resolution.height, valid.resolution.height);
        assert_eq!(validated.initial_kernel, PostKernel::Blur);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let settings: RenderSettings = serde_json::from_str(
            r#"{ "initial_kernel": "edge_detection", "assets": { "skybox_dir": "sky" } }"#,
        )
        .unwrap();
        assert_eq!(settings.initial_kernel, PostKernel::EdgeDetection);
        assert_eq!(settings.shadow_map_size, 1024);
        assert_eq!(settings.assets.skybox_paths()[2], PathBuf::from("sky/top.jpg"));
        assert_eq!(settings.clear_color, [0.45, 0.55, 0.60, 1.0]);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let settings = RenderSettings::load_from_path("definitely/not/here/settings.json");
        assert_eq!(settings.resolution.width, 1280);
        assert!(settings.shader_dir.is_none());
    }

    #[test]
    fn present_mode_returns_desired_when_available() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [
            wgpu::PresentMode::Fifo,
            wgpu::PresentMode::Mailbox,
            wgpu::PresentMode::Immediate,
        ];

        assert_eq!(
            settings.present_mode(&available),
            wgpu::PresentMode::Mailbox
        );
    }

    #[test]
    fn present_mode_falls_back_to_fifo_when_desired_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [wgpu::PresentMode::Fifo, wgpu::PresentMode::Immediate];

        assert_eq!(settings.present_mode(&available), wgpu::PresentMode::Fifo);
    }

    #[test]
    fn present_mode_uses_first_available_when_fifo_missing() {
        let settings = RenderSettings {
            present_mode: PresentModeSetting::Mailbox,
            ..RenderSettings::default()
        };

        let available = [wgpu::PresentMode::Immediate];

        assert_eq!(
            settings.present_mode(&available),
            wgpu::PresentMode::Immediate
        );
    }
}
