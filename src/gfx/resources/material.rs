//! Material system for Blinn-Phong shading
//!
//! Materials are plain values carried by scene objects. The renderer packs
//! them into [`MaterialUniform`] alongside the object transform.

/// GPU uniform data for materials
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct MaterialUniform {
    pub base_color: [f32; 4],
    /// Specular colour in xyz, shininess exponent in w
    pub specular: [f32; 4],
}

/// Surface appearance of a scene object
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub base_color: [f32; 4],
    pub specular: [f32; 3],
    pub shininess: f32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            base_color: [0.8, 0.8, 0.8, 1.0],
            specular: [0.2, 0.2, 0.2],
            shininess: 32.0,
        }
    }
}

impl Material {
    /// Creates a new material
    ///
    /// # Arguments
    /// * `name` - Name shown in logs and statistics
    /// * `base_color` - RGBA diffuse colour
    /// * `specular` - RGB specular colour
    /// * `shininess` - Specular exponent, clamped to at least 1
    pub fn new(name: &str, base_color: [f32; 4], specular: [f32; 3], shininess: f32) -> Self {
        Self {
            name: name.to_string(),
            base_color,
            specular,
            shininess: shininess.max(1.0),
        }
    }

    /// Creates an opaque material from `0xRRGGBB` colours
    pub fn from_hex(name: &str, color: u32, specular: u32, shininess: f32) -> Self {
        let [r, g, b] = hex_to_rgb(color);
        Self::new(name, [r, g, b, 1.0], hex_to_rgb(specular), shininess)
    }

    /// Bone-coloured surface used for the static anatomy
    pub fn bone() -> Self {
        Self::from_hex("Bone", 0xf6f1c4, 0x494949, 200.0)
    }

    /// Grey surface used for the placed implant proxy
    pub fn implant() -> Self {
        Self::from_hex("Implant", 0x6c6c6c, 0x494949, 100.0)
    }

    /// Flat colour for a manipulator handle
    pub fn handle(color: [f32; 3]) -> Self {
        Self::new("Handle", [color[0], color[1], color[2], 1.0], [0.0; 3], 1.0)
    }

    pub fn to_uniform(&self) -> MaterialUniform {
        MaterialUniform {
            base_color: self.base_color,
            specular: [self.specular[0], self.specular[1], self.specular[2], self.shininess],
        }
    }
}

/// Split `0xRRGGBB` into linear 0..1 channels
pub fn hex_to_rgb(hex: u32) -> [f32; 3] {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_conversion() {
        assert_eq!(hex_to_rgb(0xff0000), [1.0, 0.0, 0.0]);
        assert_eq!(hex_to_rgb(0x00ff00), [0.0, 1.0, 0.0]);
        assert_eq!(hex_to_rgb(0x000000), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_uniform_packs_shininess() {
        let material = Material::implant();
        let uniform = material.to_uniform();

        assert_eq!(uniform.specular[3], 100.0);
        assert_eq!(uniform.base_color[3], 1.0);
        assert!((uniform.base_color[0] - 0x6c as f32 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn test_shininess_is_clamped() {
        assert_eq!(Material::new("dull", [1.0; 4], [0.0; 3], 0.0).shininess, 1.0);
    }
}
