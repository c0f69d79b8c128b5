use glam::Vec3;

use crate::error::RenderError;
use crate::renderer::camera::Camera;
use crate::renderer::lights::{
    Attenuation, DirectionalLight, Light, LightBase, LightUniformNames, PointLight, SpotCone,
    SpotLight, MAX_POINT_LIGHTS,
};
use crate::renderer::program::UniformSink;
use crate::scene::frame_state::FrameState;

const SCENE_ATTENUATION: Attenuation = Attenuation::new(1.0, 0.09, 0.032);

pub fn sun() -> DirectionalLight {
    DirectionalLight {
        base: LightBase {
            color: Vec3::ONE,
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.4),
            specular: Vec3::splat(0.5),
        },
        direction: Vec3::new(0.0, -1.0, 0.3),
    }
}

fn point_light(color: Vec3, position: Vec3) -> PointLight {
    PointLight {
        base: LightBase {
            color,
            ambient: Vec3::splat(0.05),
            diffuse: Vec3::splat(0.8),
            specular: Vec3::ONE,
        },
        position,
        attenuation: SCENE_ATTENUATION,
    }
}

fn flashlight(camera: &Camera) -> SpotLight {
    let point = PointLight {
        base: LightBase {
            color: Vec3::ONE,
            ambient: Vec3::ZERO,
            diffuse: Vec3::ONE,
            specular: Vec3::ONE,
        },
        position: camera.position,
        attenuation: SCENE_ATTENUATION,
    };
    SpotLight::new(point, camera.front(), SpotCone::from_degrees(12.5, 15.0))
}

/// The lights of one frame: a sun, the orbiting point lights and a
/// flashlight held by the camera.
#[derive(Clone, Debug)]
pub struct SceneLights {
    pub sun: DirectionalLight,
    pub points: [PointLight; MAX_POINT_LIGHTS],
    pub flashlight: SpotLight,
}

impl SceneLights {
    pub fn new(state: &FrameState, camera: &Camera) -> Self {
        let points = std::array::from_fn(|i| {
            point_light(state.point_light_colors[i], state.point_light_positions[i])
        });
        Self {
            sun: sun(),
            points,
            flashlight: flashlight(camera),
        }
    }

    /// Every light paired with its uniform array slot.
    pub fn slots(&self) -> impl Iterator<Item = (Light, usize)> + '_ {
        std::iter::once((Light::Directional(self.sun), 0))
            .chain(
                self.points
                    .iter()
                    .enumerate()
                    .map(|(slot, light)| (Light::Point(*light), slot)),
            )
            .chain(std::iter::once((Light::Spot(self.flashlight), 0)))
    }

    pub fn push_uniforms<S: UniformSink + ?Sized>(
        &self,
        sink: &mut S,
        names: &LightUniformNames,
    ) -> Result<(), RenderError> {
        for (light, slot) in self.slots() {
            light.push_uniforms(sink, names, slot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::program::UniformValue;

    #[derive(Default)]
    struct CountingSink(Vec<String>);

    impl UniformSink for CountingSink {
        fn set_uniform(&mut self, name: &str, _value: UniformValue) {
            self.0.push(name.to_string());
        }
    }

    #[test]
    fn flashlight_follows_the_camera() {
        let camera = Camera::new(Vec3::new(0.0, 10.0, -20.0));
        let lights = SceneLights::new(&FrameState::default(), &camera);
        assert_eq!(lights.flashlight.point.position, camera.position);
        assert!(lights.flashlight.direction().abs_diff_eq(camera.front(), 1e-6));
        assert_eq!(lights.flashlight.point.base.ambient, Vec3::ZERO);
    }

    #[test]
    fn points_take_state_colors_and_positions() {
        let state = FrameState::default();
        let lights = SceneLights::new(&state, &Camera::default());
        for (light, (color, position)) in lights
            .points
            .iter()
            .zip(state.point_light_colors.iter().zip(state.point_light_positions))
        {
            assert_eq!(light.base.color, *color);
            assert_eq!(light.position, position);
            assert_eq!(light.attenuation, SCENE_ATTENUATION);
        }
    }

    #[test]
    fn pushes_every_light_once() {
        let lights = SceneLights::new(&FrameState::default(), &Camera::default());
        let mut sink = CountingSink::default();
        lights
            .push_uniforms(&mut sink, &LightUniformNames::default())
            .unwrap();
        // 5 directional + 4 * 8 point + 11 spot
        assert_eq!(sink.0.len(), 5 + 32 + 11);
        assert!(sink.0.contains(&"pointLights[3].quadratic".to_string()));
    }
}
