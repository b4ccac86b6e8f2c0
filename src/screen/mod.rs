//! Screen texture binding.
//!
//! Scans the loaded scene for meshes carrying the configured screen
//! material, unwraps that material's triangle group, sizes the capture
//! pipeline to the unwrap aspect, and rebinds the matched sub-material to
//! emit the live capture canvas through its emissive channel.

pub mod uv;

use std::sync::Arc;

use glam::Vec3;

use crate::capture::{DocumentSource, ScreenTexture};
use crate::config::ScreenConfig;
use crate::scene::SceneNode;

/// Outcome of a successful screen binding
#[derive(Debug, Clone)]
pub struct ScreenBinding {
    /// Unwrap aspect of the matched screen surface
    pub aspect: f32,
    /// Capture dimensions derived from the aspect
    pub width: u32,
    pub height: u32,
    /// Mesh nodes whose material slot was rebound
    pub mesh_names: Vec<String>,
}

/// Bind the capture canvas onto every mesh whose material list contains the
/// target name (case-insensitive, trimmed). Returns `None` when nothing
/// matches; the capture pipeline then stays inert.
pub fn bind_screen_texture<S: DocumentSource>(
    scene: &mut SceneNode,
    source: &S,
    canvas: &ScreenTexture,
    config: &ScreenConfig,
) -> Option<ScreenBinding> {
    let mut mesh_names = Vec::new();
    let mut aspect = 1.0f32;
    let mut dims = (0u32, 0u32);

    scene.visit_meshes_mut(&mut |mesh| {
        let slot = mesh
            .materials
            .iter()
            .position(|m| m.name_matches(&config.target_material));
        let Some(slot) = slot else { return };

        // 1) Unwrap just this material's triangle group
        aspect = uv::project_group_uvs(&mut mesh.geometry, slot);

        // 2) Size the capture canvas and source viewport to the aspect
        dims = canvas
            .lock()
            .unwrap()
            .resize_to_aspect(aspect, config.reference_height);
        source.set_viewport(dims.0, dims.1);

        // 3) Clone and swap only the matched slot; content comes from the
        // emissive channel so it reads independent of scene lighting
        let mut replacement = mesh.materials[slot].clone();
        replacement.base_color = [0.0, 0.0, 0.0, 1.0];
        replacement.base_color_map = None;
        replacement.emissive = Vec3::ONE;
        replacement.emissive_map = Some(Arc::clone(canvas));
        replacement.emissive_intensity = config.emissive_intensity;
        // Screens are thin planes
        replacement.double_sided = true;
        mesh.materials[slot] = replacement;

        // 4) A screen should not self-shadow
        mesh.cast_shadow = false;
        mesh.receive_shadow = false;

        mesh_names.push(mesh.name.clone());
    });

    if mesh_names.is_empty() {
        return None;
    }

    Some(ScreenBinding {
        aspect,
        width: dims.0,
        height: dims.1,
        mesh_names,
    })
}
