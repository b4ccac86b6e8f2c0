//! GLB model loader using the `gltf` crate.
//!
//! Adapts a glTF binary into the typed scene graph: each glTF mesh becomes
//! one mesh node whose primitives are merged into a single indexed geometry
//! under per-material triangle groups. Node transforms are baked into the
//! vertex positions, the model is normalized to a target world size, and
//! progress flows through the loader-UI collaborator interface.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use glam::{Mat4, Vec2, Vec3};

use crate::error::SceneError;
use crate::scene::{
    CameraNode, Geometry, GroupNode, Material, MaterialGroup, MeshNode, SceneNode, TextureImage,
};

/// Loader progress/error sink: the interface of the excluded loader-UI
/// collaborator.
pub trait ProgressSink {
    fn progress(&mut self, fraction: f32);
    fn done(&mut self);
    fn error(&mut self, message: &str);
}

/// Sink that reports through the logging layer
#[derive(Debug, Default)]
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn progress(&mut self, fraction: f32) {
        tracing::debug!("model load {:.0}%", fraction * 100.0);
    }

    fn done(&mut self) {
        tracing::info!("model load complete");
    }

    fn error(&mut self, message: &str) {
        tracing::error!("model load failed: {}", message);
    }
}

/// A loaded model ready for screen binding and rig placement
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub root: SceneNode,
    /// Bounding-sphere radius after normalization, before any responsive
    /// scaling
    pub base_radius: f32,
    /// Uniform scale applied so the largest bounding-box side matches the
    /// configured target size
    pub normalize_scale: f32,
}

/// Load a GLB file into a scene graph.
///
/// Failure is reported to the sink and returned; it is fatal to the 3D
/// pipeline only, never to the caller's process.
pub fn load_model<P: AsRef<Path>>(
    path: P,
    target_size: f32,
    sink: &mut dyn ProgressSink,
) -> Result<LoadedModel, SceneError> {
    sink.progress(0.0);

    let (document, buffers, images) = gltf::import(path.as_ref()).map_err(|e| {
        let err = SceneError::ModelLoad(format!("{}: {}", path.as_ref().display(), e));
        sink.error(&err.to_string());
        err
    })?;
    sink.progress(0.3);

    let materials = decode_materials(&document, &images);
    let mut children = Vec::new();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| {
            let err = SceneError::ModelLoad("file contains no scene".to_string());
            sink.error(&err.to_string());
            err
        })?;

    for node in scene.nodes() {
        if let Some(converted) = convert_node(&node, Mat4::IDENTITY, &buffers, &materials)? {
            children.push(converted);
        }
    }
    sink.progress(0.8);

    let mut root = SceneNode::Group(GroupNode {
        name: "model".to_string(),
        children,
    });

    let (normalize_scale, base_radius) = normalize_scene(&mut root, target_size);
    sink.progress(1.0);
    sink.done();

    Ok(LoadedModel {
        root,
        base_radius,
        normalize_scale,
    })
}

/// Decode the document's material table
fn decode_materials(document: &gltf::Document, images: &[gltf::image::Data]) -> Vec<Material> {
    document
        .materials()
        .map(|m| {
            let pbr = m.pbr_metallic_roughness();
            let base_color_map = pbr.base_color_texture().and_then(|info| {
                let index = info.texture().source().index();
                images.get(index).map(|data| {
                    Arc::new(TextureImage {
                        pixels: convert_to_rgba8(data.format, &data.pixels, data.width, data.height),
                        width: data.width,
                        height: data.height,
                    })
                })
            });
            let emissive = m.emissive_factor();

            Material {
                name: m.name().unwrap_or("unnamed").to_string(),
                base_color: pbr.base_color_factor(),
                base_color_map,
                emissive: Vec3::from(emissive),
                emissive_map: None,
                emissive_intensity: 1.0,
                double_sided: m.double_sided(),
            }
        })
        .collect()
}

/// Convert one glTF node subtree, baking world transforms into positions
fn convert_node(
    node: &gltf::Node,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    materials: &[Material],
) -> Result<Option<SceneNode>, SceneError> {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(mesh) = node.mesh() {
        let name = node
            .name()
            .or_else(|| mesh.name())
            .unwrap_or("mesh")
            .to_string();
        return Ok(Some(SceneNode::Mesh(convert_mesh(
            &mesh, &name, world, buffers, materials,
        )?)));
    }

    if let Some(camera) = node.camera() {
        if let gltf::camera::Projection::Perspective(p) = camera.projection() {
            let position = world.transform_point3(Vec3::ZERO);
            return Ok(Some(SceneNode::Camera(CameraNode {
                name: camera.name().unwrap_or("camera").to_string(),
                position,
                fov_y: p.yfov(),
                aspect: p.aspect_ratio().unwrap_or(16.0 / 9.0),
            })));
        }
        return Ok(None);
    }

    let mut children = Vec::new();
    for child in node.children() {
        if let Some(converted) = convert_node(&child, world, buffers, materials)? {
            children.push(converted);
        }
    }
    if children.is_empty() {
        return Ok(None);
    }
    Ok(Some(SceneNode::Group(GroupNode {
        name: node.name().unwrap_or("group").to_string(),
        children,
    })))
}

/// Merge a mesh's primitives into one indexed geometry with per-material
/// groups and a mesh-local material list.
fn convert_mesh(
    mesh: &gltf::Mesh,
    name: &str,
    world: Mat4,
    buffers: &[gltf::buffer::Data],
    materials: &[Material],
) -> Result<MeshNode, SceneError> {
    let mut positions: Vec<Vec3> = Vec::new();
    let mut indices: Vec<u32> = Vec::new();
    let mut uvs: Vec<Vec2> = Vec::new();
    let mut any_uvs = false;
    let mut groups: Vec<MaterialGroup> = Vec::new();
    let mut local_materials: Vec<Material> = Vec::new();
    // Global material index → mesh-local slot
    let mut slot_map: HashMap<Option<usize>, usize> = HashMap::new();

    for prim in mesh.primitives() {
        let reader = prim.reader(|buffer| Some(&buffers[buffer.index()]));

        let prim_positions: Vec<Vec3> = reader
            .read_positions()
            .map(|iter| iter.map(|p| world.transform_point3(Vec3::from(p))).collect())
            .unwrap_or_default();
        if prim_positions.is_empty() {
            continue;
        }

        let base = positions.len() as u32;
        let prim_indices: Vec<u32> = reader
            .read_indices()
            .map(|iter| iter.into_u32().collect())
            .unwrap_or_else(|| (0..prim_positions.len() as u32).collect());

        let prim_uvs: Vec<Vec2> = match reader.read_tex_coords(0) {
            Some(coords) => {
                any_uvs = true;
                coords.into_f32().map(Vec2::from).collect()
            }
            None => vec![Vec2::ZERO; prim_positions.len()],
        };

        let global = prim.material().index();
        let slot = *slot_map.entry(global).or_insert_with(|| {
            let material = global
                .and_then(|i| materials.get(i).cloned())
                .unwrap_or_else(|| Material::named("default"));
            local_materials.push(material);
            local_materials.len() - 1
        });

        groups.push(MaterialGroup {
            start: indices.len(),
            count: prim_indices.len(),
            material_index: slot,
        });

        positions.extend(prim_positions);
        uvs.extend(prim_uvs);
        indices.extend(prim_indices.iter().map(|i| i + base));
    }

    let geometry = Geometry {
        positions,
        indices: Some(indices),
        uvs: if any_uvs { Some(uvs) } else { None },
        groups,
    };
    geometry.validate(name)?;

    Ok(MeshNode {
        name: name.to_string(),
        geometry,
        materials: local_materials,
        // Loaded meshes throw shadows; only the screen binding revokes it
        cast_shadow: true,
        receive_shadow: false,
    })
}

/// Rescale the model so its largest bounding-box side equals `target_size`
/// and recenter it on the bounding-box center. Returns the applied scale
/// and the normalized bounding-sphere radius.
pub(crate) fn normalize_scene(root: &mut SceneNode, target_size: f32) -> (f32, f32) {
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    root.visit_meshes(&mut |mesh| {
        if let Some((lo, hi)) = mesh.geometry.bounds() {
            min = min.min(lo);
            max = max.max(hi);
        }
    });
    if min.x > max.x {
        return (1.0, 0.0);
    }

    let size = max - min;
    let max_side = size.max_element().max(f32::EPSILON);
    let scale = target_size / max_side;
    let center = (min + max) * 0.5;

    root.visit_meshes_mut(&mut |mesh| {
        for p in &mut mesh.geometry.positions {
            *p = (*p - center) * scale;
        }
    });

    let radius = size.length() * 0.5 * scale;
    (scale, radius)
}

/// Convert a glTF image to RGBA8 pixel data
fn convert_to_rgba8(format: gltf::image::Format, pixels: &[u8], width: u32, height: u32) -> Vec<u8> {
    match format {
        gltf::image::Format::R8G8B8A8 => pixels.to_vec(),
        gltf::image::Format::R8G8B8 => pixels
            .chunks(3)
            .flat_map(|rgb| [rgb[0], rgb[1], rgb[2], 255])
            .collect(),
        gltf::image::Format::R8 => pixels.iter().flat_map(|&r| [r, r, r, 255]).collect(),
        gltf::image::Format::R8G8 => pixels
            .chunks(2)
            .flat_map(|rg| [rg[0], rg[1], 0, 255])
            .collect(),
        _ => {
            // Fallback: opaque white
            vec![255u8; (width * height * 4) as usize]
        }
    }
}
