//! Closed scene-node variants with capability accessors.

use glam::Vec3;

use super::geometry::Geometry;
use super::material::Material;

/// A mesh node: geometry plus one material per group slot
#[derive(Debug, Clone)]
pub struct MeshNode {
    pub name: String,
    pub geometry: Geometry,
    pub materials: Vec<Material>,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
}

/// An interior grouping node
#[derive(Debug, Clone, Default)]
pub struct GroupNode {
    pub name: String,
    pub children: Vec<SceneNode>,
}

/// A light node; the rig drives its position and shadow softness
#[derive(Debug, Clone)]
pub struct LightNode {
    pub name: String,
    pub position: Vec3,
    pub intensity: f32,
    pub shadow_radius: f32,
}

impl Default for LightNode {
    fn default() -> Self {
        Self {
            name: "key".to_string(),
            position: Vec3::new(-1.2, 6.0, 4.0),
            intensity: 0.6,
            shadow_radius: 4.0,
        }
    }
}

/// A perspective camera node
#[derive(Debug, Clone)]
pub struct CameraNode {
    pub name: String,
    pub position: Vec3,
    /// Vertical field of view in radians
    pub fov_y: f32,
    pub aspect: f32,
}

impl Default for CameraNode {
    fn default() -> Self {
        Self {
            name: "main".to_string(),
            position: Vec3::new(0.0, 1.2, 6.0),
            fov_y: 45f32.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }
}

/// Closed node enumeration of the consumed scene graph
#[derive(Debug, Clone)]
pub enum SceneNode {
    Mesh(MeshNode),
    Group(GroupNode),
    Light(LightNode),
    Camera(CameraNode),
}

impl SceneNode {
    pub fn name(&self) -> &str {
        match self {
            SceneNode::Mesh(m) => &m.name,
            SceneNode::Group(g) => &g.name,
            SceneNode::Light(l) => &l.name,
            SceneNode::Camera(c) => &c.name,
        }
    }

    pub fn as_mesh(&self) -> Option<&MeshNode> {
        match self {
            SceneNode::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut MeshNode> {
        match self {
            SceneNode::Mesh(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_light_mut(&mut self) -> Option<&mut LightNode> {
        match self {
            SceneNode::Light(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_camera(&self) -> Option<&CameraNode> {
        match self {
            SceneNode::Camera(c) => Some(c),
            _ => None,
        }
    }

    /// Visit every mesh node in the subtree, depth first.
    pub fn visit_meshes(&self, f: &mut impl FnMut(&MeshNode)) {
        match self {
            SceneNode::Mesh(m) => f(m),
            SceneNode::Group(g) => {
                for child in &g.children {
                    child.visit_meshes(f);
                }
            }
            SceneNode::Light(_) | SceneNode::Camera(_) => {}
        }
    }

    /// Visit every mesh node in the subtree mutably, depth first.
    pub fn visit_meshes_mut(&mut self, f: &mut impl FnMut(&mut MeshNode)) {
        match self {
            SceneNode::Mesh(m) => f(m),
            SceneNode::Group(g) => {
                for child in &mut g.children {
                    child.visit_meshes_mut(f);
                }
            }
            SceneNode::Light(_) | SceneNode::Camera(_) => {}
        }
    }

    /// First camera in the subtree, depth first.
    pub fn find_camera(&self) -> Option<&CameraNode> {
        match self {
            SceneNode::Camera(c) => Some(c),
            SceneNode::Group(g) => g.children.iter().find_map(|c| c.find_camera()),
            _ => None,
        }
    }

    /// First light in the subtree mutably, depth first.
    pub fn find_light_mut(&mut self) -> Option<&mut LightNode> {
        match self {
            SceneNode::Light(l) => Some(l),
            SceneNode::Group(g) => g.children.iter_mut().find_map(|c| c.find_light_mut()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_scene() -> SceneNode {
        SceneNode::Group(GroupNode {
            name: "root".to_string(),
            children: vec![
                SceneNode::Camera(CameraNode::default()),
                SceneNode::Light(LightNode::default()),
                SceneNode::Group(GroupNode {
                    name: "model".to_string(),
                    children: vec![
                        SceneNode::Mesh(MeshNode {
                            name: "body".to_string(),
                            geometry: Geometry::default(),
                            materials: vec![Material::named("shell")],
                            cast_shadow: true,
                            receive_shadow: false,
                        }),
                        SceneNode::Mesh(MeshNode {
                            name: "panel".to_string(),
                            geometry: Geometry::default(),
                            materials: vec![Material::named("glass")],
                            cast_shadow: true,
                            receive_shadow: false,
                        }),
                    ],
                }),
            ],
        })
    }

    #[test]
    fn test_visit_meshes_reaches_nested() {
        let scene = sample_scene();
        let mut names = Vec::new();
        scene.visit_meshes(&mut |m| names.push(m.name.clone()));
        assert_eq!(names, vec!["body", "panel"]);
    }

    #[test]
    fn test_find_camera_and_light() {
        let mut scene = sample_scene();
        assert!(scene.find_camera().is_some());
        assert!(scene.find_light_mut().is_some());
        assert!(scene.as_mesh().is_none());
    }
}
