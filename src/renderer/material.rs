use crate::renderer::program::UniformSink;

pub const SPECULAR_INTENSITY: &str = "material.specularIntensity";
pub const SHININESS: &str = "material.shininess";

/// Specular strength and Phong exponent, pushed alongside the lights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub specular_intensity: f32,
    pub shininess: f32,
}

impl Material {
    pub const fn new(specular_intensity: f32, shininess: f32) -> Self {
        Self {
            specular_intensity,
            shininess,
        }
    }

    /// Strong, tight highlights. Used by the floor and the imported models.
    pub const fn shiny() -> Self {
        Self::new(4.0, 256.0)
    }

    pub fn use_material<S: UniformSink + ?Sized>(&self, sink: &mut S) {
        sink.set_float(SPECULAR_INTENSITY, self.specular_intensity);
        sink.set_float(SHININESS, self.shininess);
    }
}

impl Default for Material {
    fn default() -> Self {
        Self::new(1.0, 32.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::program::UniformValue;

    #[test]
    fn writes_both_scalars_under_material_prefix() {
        struct Sink(Vec<(String, UniformValue)>);
        impl UniformSink for Sink {
            fn set_uniform(&mut self, name: &str, value: UniformValue) {
                self.0.push((name.to_string(), value));
            }
        }

        let mut sink = Sink(Vec::new());
        Material::shiny().use_material(&mut sink);
        assert_eq!(
            sink.0,
            vec![
                (SPECULAR_INTENSITY.to_string(), UniformValue::Float(4.0)),
                (SHININESS.to_string(), UniformValue::Float(256.0)),
            ]
        );
    }
}
