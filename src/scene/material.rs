//! Material slots on mesh nodes.

use std::sync::Arc;

use glam::Vec3;

use crate::capture::ScreenTexture;

/// Decoded static texture image (RGBA8)
#[derive(Debug, Clone)]
pub struct TextureImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One material slot of a mesh.
///
/// Cloned and rewritten non-destructively by the screen binding; every
/// field maps onto the rendering collaborator's material system.
#[derive(Debug, Clone)]
pub struct Material {
    /// Material name as authored in the model
    pub name: String,
    /// Base color factor (RGBA)
    pub base_color: [f32; 4],
    /// Decoded base color texture, if any
    pub base_color_map: Option<Arc<TextureImage>>,
    /// Emissive color factor
    pub emissive: Vec3,
    /// Live capture canvas bound to the emissive channel, if any
    pub emissive_map: Option<ScreenTexture>,
    /// Emissive intensity multiplier
    pub emissive_intensity: f32,
    /// Render both faces
    pub double_sided: bool,
}

impl Material {
    /// A neutral material with the given name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            base_color_map: None,
            emissive: Vec3::ZERO,
            emissive_map: None,
            emissive_intensity: 1.0,
            double_sided: false,
        }
    }

    /// Case-insensitive, whitespace-trimmed name match
    pub fn name_matches(&self, target: &str) -> bool {
        self.name.trim().eq_ignore_ascii_case(target.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_match_is_trimmed_and_case_insensitive() {
        let mat = Material::named("  Material.003 ");
        assert!(mat.name_matches("material.003"));
        assert!(mat.name_matches("MATERIAL.003  "));
        assert!(!mat.name_matches("material.004"));
    }
}
