use glam::Vec3;

use crate::error::RenderError;
use crate::renderer::program::UniformSink;

pub const MAX_POINT_LIGHTS: usize = 4;
pub const MAX_SPOT_LIGHTS: usize = 1;

/// Color and Phong terms every light carries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LightBase {
    pub color: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
}

impl Default for LightBase {
    fn default() -> Self {
        Self {
            color: Vec3::ONE,
            ambient: Vec3::ONE,
            diffuse: Vec3::ZERO,
            specular: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Attenuation {
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl Attenuation {
    pub const fn new(constant: f32, linear: f32, quadratic: f32) -> Self {
        Self {
            constant,
            linear,
            quadratic,
        }
    }

    /// `1 / (c + l*d + q*d^2)`
    pub fn factor(&self, distance: f32) -> f32 {
        1.0 / (self.constant + self.linear * distance + self.quadratic * distance * distance)
    }
}

impl Default for Attenuation {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }
}

/// Cone of a spot light as cosines of the half-angles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotCone {
    inner_cos: f32,
    outer_cos: f32,
}

impl SpotCone {
    /// The inner cosine has to be the larger one. Reversed values are swapped.
    pub fn new(inner_cos: f32, outer_cos: f32) -> Self {
        if inner_cos < outer_cos {
            log::warn!(
                "Spot cone inner cutoff {} is wider than outer cutoff {}; swapping",
                inner_cos,
                outer_cos
            );
            return Self {
                inner_cos: outer_cos,
                outer_cos: inner_cos,
            };
        }
        Self {
            inner_cos,
            outer_cos,
        }
    }

    pub fn from_degrees(inner: f32, outer: f32) -> Self {
        Self::new(inner.to_radians().cos(), outer.to_radians().cos())
    }

    pub fn inner_cos(&self) -> f32 {
        self.inner_cos
    }

    pub fn outer_cos(&self) -> f32 {
        self.outer_cos
    }

    /// Smooth falloff between the cones, 1 inside the inner cone and 0 past
    /// the outer one. `cos_theta` is the cosine between the spot axis and the
    /// direction to the lit point.
    pub fn intensity(&self, cos_theta: f32) -> f32 {
        let epsilon = self.inner_cos - self.outer_cos;
        if epsilon <= f32::EPSILON {
            return if cos_theta >= self.inner_cos { 1.0 } else { 0.0 };
        }
        ((cos_theta - self.outer_cos) / epsilon).clamp(0.0, 1.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DirectionalLight {
    pub base: LightBase,
    pub direction: Vec3,
}

impl Default for DirectionalLight {
    fn default() -> Self {
        Self {
            base: LightBase::default(),
            direction: Vec3::NEG_Y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PointLight {
    pub base: LightBase,
    pub position: Vec3,
    pub attenuation: Attenuation,
}

impl PointLight {
    pub fn attenuation_at(&self, point: Vec3) -> f32 {
        self.attenuation.factor(self.position.distance(point))
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpotLight {
    pub point: PointLight,
    direction: Vec3,
    pub cone: SpotCone,
}

impl SpotLight {
    pub fn new(point: PointLight, direction: Vec3, cone: SpotCone) -> Self {
        Self {
            point,
            direction: direction.normalize_or(Vec3::NEG_Y),
            cone,
        }
    }

    pub fn direction(&self) -> Vec3 {
        self.direction
    }

    /// Re-aims the light in place, e.g. to follow the viewer.
    pub fn set_flash(&mut self, position: Vec3, direction: Vec3) {
        self.point.position = position;
        self.direction = direction.normalize_or(self.direction);
    }

    /// Cone falloff times distance attenuation at `point`.
    pub fn contribution_at(&self, point: Vec3) -> f32 {
        let to_point = (point - self.point.position).normalize_or_zero();
        self.cone.intensity(to_point.dot(self.direction)) * self.point.attenuation_at(point)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Directional(DirectionalLight),
    Point(PointLight),
    Spot(SpotLight),
}

impl Light {
    pub fn base(&self) -> &LightBase {
        match self {
            Self::Directional(light) => &light.base,
            Self::Point(light) => &light.base,
            Self::Spot(light) => &light.point.base,
        }
    }

    /// Writes this light into `slot` of its uniform array. The directional
    /// light has a single slot, 0.
    ///
    /// Nothing is written when `slot` is out of range.
    pub fn push_uniforms<S>(
        &self,
        sink: &mut S,
        names: &LightUniformNames,
        slot: usize,
    ) -> Result<(), RenderError>
    where
        S: UniformSink + ?Sized,
    {
        match self {
            Self::Directional(light) => {
                let n = names.directional(slot)?;
                write_base(sink, &n.base, &light.base);
                sink.set_vec3(&n.direction, light.direction);
            }
            Self::Point(light) => {
                let n = names.point(slot)?;
                write_point(sink, n, light);
            }
            Self::Spot(light) => {
                let n = names.spot(slot)?;
                write_point(sink, &n.point, &light.point);
                sink.set_vec3(&n.direction, light.direction);
                sink.set_float(&n.cut_off, light.cone.inner_cos);
                sink.set_float(&n.outer_cut_off, light.cone.outer_cos);
            }
        }
        Ok(())
    }
}

fn write_base<S: UniformSink + ?Sized>(sink: &mut S, names: &BaseNames, base: &LightBase) {
    sink.set_vec3(&names.color, base.color);
    sink.set_vec3(&names.ambient, base.ambient);
    sink.set_vec3(&names.diffuse, base.diffuse);
    sink.set_vec3(&names.specular, base.specular);
}

fn write_point<S: UniformSink + ?Sized>(sink: &mut S, names: &PointNames, light: &PointLight) {
    write_base(sink, &names.base, &light.base);
    sink.set_vec3(&names.position, light.position);
    sink.set_float(&names.constant, light.attenuation.constant);
    sink.set_float(&names.linear, light.attenuation.linear);
    sink.set_float(&names.quadratic, light.attenuation.quadratic);
}

#[derive(Clone, Debug)]
struct BaseNames {
    color: String,
    ambient: String,
    diffuse: String,
    specular: String,
}

impl BaseNames {
    fn new(prefix: &str) -> Self {
        Self {
            color: format!("{prefix}.color"),
            ambient: format!("{prefix}.ambient"),
            diffuse: format!("{prefix}.diffuse"),
            specular: format!("{prefix}.specular"),
        }
    }
}

#[derive(Clone, Debug)]
struct DirectionalNames {
    base: BaseNames,
    direction: String,
}

#[derive(Clone, Debug)]
struct PointNames {
    base: BaseNames,
    position: String,
    constant: String,
    linear: String,
    quadratic: String,
}

impl PointNames {
    fn new(prefix: &str) -> Self {
        Self {
            base: BaseNames::new(&format!("{prefix}.base")),
            position: format!("{prefix}.position"),
            constant: format!("{prefix}.constant"),
            linear: format!("{prefix}.linear"),
            quadratic: format!("{prefix}.quadratic"),
        }
    }
}

#[derive(Clone, Debug)]
struct SpotNames {
    point: PointNames,
    direction: String,
    cut_off: String,
    outer_cut_off: String,
}

/// Uniform paths for every light slot, formatted once up front.
#[derive(Clone, Debug)]
pub struct LightUniformNames {
    directional: DirectionalNames,
    points: Vec<PointNames>,
    spots: Vec<SpotNames>,
}

impl LightUniformNames {
    pub fn new(point_capacity: usize, spot_capacity: usize) -> Self {
        let directional = DirectionalNames {
            base: BaseNames::new("dirLight.base"),
            direction: "dirLight.direction".to_string(),
        };
        let points = (0..point_capacity)
            .map(|slot| PointNames::new(&format!("pointLights[{slot}]")))
            .collect();
        let spots = (0..spot_capacity)
            .map(|slot| {
                let prefix = format!("spotLights[{slot}]");
                SpotNames {
                    point: PointNames::new(&format!("{prefix}.base")),
                    direction: format!("{prefix}.direction"),
                    cut_off: format!("{prefix}.cutOff"),
                    outer_cut_off: format!("{prefix}.outerCutOff"),
                }
            })
            .collect();

        Self {
            directional,
            points,
            spots,
        }
    }

    pub fn point_capacity(&self) -> usize {
        self.points.len()
    }

    pub fn spot_capacity(&self) -> usize {
        self.spots.len()
    }

    fn directional(&self, slot: usize) -> Result<&DirectionalNames, RenderError> {
        if slot == 0 {
            Ok(&self.directional)
        } else {
            Err(RenderError::LightSlotOutOfRange {
                array: "dirLight",
                slot,
                capacity: 1,
            })
        }
    }

    fn point(&self, slot: usize) -> Result<&PointNames, RenderError> {
        self.points
            .get(slot)
            .ok_or(RenderError::LightSlotOutOfRange {
                array: "pointLights",
                slot,
                capacity: self.points.len(),
            })
    }

    fn spot(&self, slot: usize) -> Result<&SpotNames, RenderError> {
        self.spots.get(slot).ok_or(RenderError::LightSlotOutOfRange {
            array: "spotLights",
            slot,
            capacity: self.spots.len(),
        })
    }
}

impl Default for LightUniformNames {
    fn default() -> Self {
        Self::new(MAX_POINT_LIGHTS, MAX_SPOT_LIGHTS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::program::UniformValue;

    #[derive(Default)]
    struct RecordingSink {
        writes: Vec<(String, UniformValue)>,
    }

    impl UniformSink for RecordingSink {
        fn set_uniform(&mut self, name: &str, value: UniformValue) {
            self.writes.push((name.to_string(), value));
        }
    }

    impl RecordingSink {
        fn names(&self) -> Vec<&str> {
            self.writes.iter().map(|(name, _)| name.as_str()).collect()
        }
    }

    fn point(position: Vec3) -> PointLight {
        PointLight {
            base: LightBase {
                color: Vec3::new(0.15, 0.43, 0.89),
                ambient: Vec3::splat(0.05),
                diffuse: Vec3::splat(0.8),
                specular: Vec3::ONE,
            },
            position,
            attenuation: Attenuation::new(1.0, 0.09, 0.032),
        }
    }

    #[test]
    fn point_light_writes_its_slot_only() {
        let names = LightUniformNames::default();
        let mut sink = RecordingSink::default();
        Light::Point(point(Vec3::X))
            .push_uniforms(&mut sink, &names, 2)
            .unwrap();

        assert_eq!(
            sink.names(),
            vec![
                "pointLights[2].base.color",
                "pointLights[2].base.ambient",
                "pointLights[2].base.diffuse",
                "pointLights[2].base.specular",
                "pointLights[2].position",
                "pointLights[2].constant",
                "pointLights[2].linear",
                "pointLights[2].quadratic",
            ]
        );
    }

    #[test]
    fn directional_light_writes_exactly_its_five_values() {
        let names = LightUniformNames::default();
        let mut sink = RecordingSink::default();
        let sun = DirectionalLight {
            base: LightBase {
                color: Vec3::ONE,
                ambient: Vec3::splat(0.05),
                diffuse: Vec3::splat(0.4),
                specular: Vec3::splat(0.5),
            },
            direction: Vec3::new(0.0, -1.0, 0.3),
        };
        Light::Directional(sun)
            .push_uniforms(&mut sink, &names, 0)
            .unwrap();

        assert_eq!(
            sink.writes,
            vec![
                ("dirLight.base.color".to_string(), UniformValue::Vec3(Vec3::ONE)),
                ("dirLight.base.ambient".to_string(), UniformValue::Vec3(Vec3::splat(0.05))),
                ("dirLight.base.diffuse".to_string(), UniformValue::Vec3(Vec3::splat(0.4))),
                ("dirLight.base.specular".to_string(), UniformValue::Vec3(Vec3::splat(0.5))),
                (
                    "dirLight.direction".to_string(),
                    UniformValue::Vec3(Vec3::new(0.0, -1.0, 0.3))
                ),
            ]
        );
    }

    #[test]
    fn neighbouring_point_slots_keep_their_own_values() {
        let names = LightUniformNames::default();
        let mut sink = RecordingSink::default();
        let first = point(Vec3::new(1.0, 2.0, 3.0));
        let mut second = point(Vec3::new(-7.0, -8.0, -9.0));
        second.base.color = Vec3::new(1.0, 0.15, 0.15);
        second.attenuation = Attenuation::new(2.0, 0.5, 0.25);

        Light::Point(first).push_uniforms(&mut sink, &names, 0).unwrap();
        Light::Point(second).push_uniforms(&mut sink, &names, 1).unwrap();

        let value = |name: &str| {
            sink.writes
                .iter()
                .find(|(written, _)| written == name)
                .map(|(_, value)| *value)
        };
        assert_eq!(value("pointLights[0].position"), Some(UniformValue::Vec3(first.position)));
        assert_eq!(value("pointLights[1].position"), Some(UniformValue::Vec3(second.position)));
        assert_eq!(value("pointLights[0].base.color"), Some(UniformValue::Vec3(first.base.color)));
        assert_eq!(value("pointLights[1].base.color"), Some(UniformValue::Vec3(second.base.color)));
        assert_eq!(value("pointLights[1].constant"), Some(UniformValue::Float(2.0)));
        assert_eq!(value("pointLights[1].quadratic"), Some(UniformValue::Float(0.25)));

        let slot_one: Vec<_> = sink
            .writes
            .iter()
            .filter(|(name, _)| name.starts_with("pointLights[1]."))
            .collect();
        assert_eq!(slot_one.len(), 8);
        for (name, value) in slot_one {
            assert_ne!(*value, UniformValue::Vec3(first.position), "{name}");
            assert_ne!(*value, UniformValue::Vec3(first.base.color), "{name}");
            assert_ne!(*value, UniformValue::Float(first.attenuation.linear), "{name}");
        }
    }

    #[test]
    fn spot_light_nests_point_fields() {
        let names = LightUniformNames::default();
        let mut sink = RecordingSink::default();
        let spot = SpotLight::new(point(Vec3::ZERO), Vec3::X, SpotCone::from_degrees(12.5, 15.0));
        Light::Spot(spot).push_uniforms(&mut sink, &names, 0).unwrap();

        let written = sink.names();
        assert_eq!(written.len(), 11);
        assert!(written.contains(&"spotLights[0].base.base.color"));
        assert!(written.contains(&"spotLights[0].base.position"));
        assert!(written.contains(&"spotLights[0].base.quadratic"));
        assert!(written.contains(&"spotLights[0].direction"));
        assert!(written.contains(&"spotLights[0].cutOff"));
        assert!(written.contains(&"spotLights[0].outerCutOff"));
    }

    #[test]
    fn out_of_range_slot_writes_nothing() {
        let names = LightUniformNames::default();
        let mut sink = RecordingSink::default();
        let err = Light::Point(point(Vec3::ZERO))
            .push_uniforms(&mut sink, &names, MAX_POINT_LIGHTS)
            .unwrap_err();
        assert!(matches!(
            err,
            RenderError::LightSlotOutOfRange {
                slot: MAX_POINT_LIGHTS,
                capacity: MAX_POINT_LIGHTS,
                ..
            }
        ));
        assert!(sink.writes.is_empty());

        let dir = Light::Directional(DirectionalLight::default());
        assert!(dir.push_uniforms(&mut sink, &names, 1).is_err());
        assert!(sink.writes.is_empty());
    }

    #[test]
    fn attenuation_starts_at_inverse_constant_and_decays() {
        let att = Attenuation::new(2.0, 0.09, 0.032);
        assert_eq!(att.factor(0.0), 0.5);

        let mut previous = att.factor(0.0);
        for step in 1..200 {
            let value = att.factor(step as f32 * 2.5);
            assert!(value <= previous);
            previous = value;
        }
        assert!(att.factor(1.0e6) < 1.0e-9);
    }

    #[test]
    fn spot_intensity_saturates_on_axis_and_vanishes_outside() {
        let cone = SpotCone::from_degrees(12.5, 15.0);
        assert_eq!(cone.intensity(1.0), 1.0);
        assert_eq!(cone.intensity(20f32.to_radians().cos()), 0.0);

        let between = cone.intensity(13.75f32.to_radians().cos());
        assert!(between > 0.0 && between < 1.0);
    }

    #[test]
    fn reversed_cone_is_swapped() {
        let cone = SpotCone::new(0.9, 0.95);
        assert_eq!(cone.inner_cos(), 0.95);
        assert_eq!(cone.outer_cos(), 0.9);
    }

    #[test]
    fn degenerate_cone_is_a_hard_edge() {
        let cone = SpotCone::new(0.9, 0.9);
        assert_eq!(cone.intensity(0.95), 1.0);
        assert_eq!(cone.intensity(0.85), 0.0);
    }

    #[test]
    fn set_flash_reaims_and_normalizes() {
        let mut spot = SpotLight::new(point(Vec3::ZERO), Vec3::NEG_Y, SpotCone::from_degrees(10.0, 20.0));
        spot.set_flash(Vec3::new(0.0, 10.0, -20.0), Vec3::new(4.0, 0.0, 0.0));
        assert_eq!(spot.point.position, Vec3::new(0.0, 10.0, -20.0));
        assert_eq!(spot.direction(), Vec3::X);
        assert!(spot.contribution_at(Vec3::new(5.0, 10.0, -20.0)) > 0.0);
        assert_eq!(spot.contribution_at(Vec3::new(-5.0, 10.0, -20.0)), 0.0);
    }
}
