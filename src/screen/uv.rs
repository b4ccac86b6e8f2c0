//! Planar UV unwrap for one material's triangle subset of a mesh.
//!
//! Projects the vertices referenced by the matched material group onto the
//! plane spanned by the two minor axes of the group's summed face normal
//! (bounding-box spans as fallback), writing the UV attribute in place and
//! returning the unwrap's aspect ratio.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use glam::{Vec2, Vec3};

use crate::scene::{Geometry, MaterialGroup};

/// Span denominator clamp
const SPAN_EPSILON: f32 = 1e-6;
/// Squared-length threshold below which the normal sum counts as degenerate
const NORMAL_EPSILON_SQ: f32 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn of(self, v: Vec3) -> f32 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
            Axis::Z => v.z,
        }
    }
}

/// Unwrap the triangle group rendered with `material_index` and return the
/// unwrap aspect (`u_span / v_span`, always positive).
///
/// The UV attribute is created zero-filled if absent; only vertices
/// referenced by the matched group are written. Geometry without positions
/// is a no-op returning aspect 1.
pub fn project_group_uvs(geometry: &mut Geometry, material_index: usize) -> f32 {
    if geometry.positions.is_empty() {
        return 1.0;
    }

    let draw_count = geometry.draw_count();
    let group = match_group(&geometry.groups, material_index, draw_count);

    // Walk the group's triangles: referenced vertex set, bounding box, and
    // area-weighted normal sum (unnormalized cross products).
    let mut used: BTreeSet<usize> = BTreeSet::new();
    let mut min = Vec3::splat(f32::INFINITY);
    let mut max = Vec3::splat(f32::NEG_INFINITY);
    let mut normal_sum = Vec3::ZERO;

    let end = group.start + group.count;
    let mut i = group.start;
    while i + 3 <= end {
        let ia = geometry.vertex_index(i);
        let ib = geometry.vertex_index(i + 1);
        let ic = geometry.vertex_index(i + 2);
        used.insert(ia);
        used.insert(ib);
        used.insert(ic);

        let a = geometry.positions[ia];
        let b = geometry.positions[ib];
        let c = geometry.positions[ic];

        min = min.min(a).min(b).min(c);
        max = max.max(a).max(b).max(c);
        normal_sum += (b - a).cross(c - a);

        i += 3;
    }

    if used.is_empty() {
        return 1.0;
    }

    let (u_axis, v_axis) = projection_plane(normal_sum, max - min);

    let u_min = u_axis.of(min);
    let v_min = v_axis.of(min);
    let u_span = (u_axis.of(max) - u_min).max(SPAN_EPSILON);
    let v_span = (v_axis.of(max) - v_min).max(SPAN_EPSILON);
    let aspect = u_span / v_span;

    let Geometry { positions, uvs, .. } = geometry;
    let uvs = uvs.get_or_insert_with(|| vec![Vec2::ZERO; positions.len()]);
    if uvs.len() < positions.len() {
        uvs.resize(positions.len(), Vec2::ZERO);
    }

    for &vi in &used {
        let p = positions[vi];
        let u = (u_axis.of(p) - u_min) / u_span;
        // Flipped so texture-space top maps to the spatial maximum
        let v = 1.0 - (v_axis.of(p) - v_min) / v_span;
        uvs[vi] = Vec2::new(u, v);
    }

    aspect
}

/// The group matching the material index, the first declared group when
/// none matches, or a sentinel full-range group when none are declared.
fn match_group(groups: &[MaterialGroup], material_index: usize, draw_count: usize) -> MaterialGroup {
    if groups.is_empty() {
        return MaterialGroup {
            start: 0,
            count: draw_count,
            material_index: 0,
        };
    }
    groups
        .iter()
        .copied()
        .find(|g| g.material_index == material_index)
        .unwrap_or(groups[0])
}

/// Pick the projection plane: the two minor axes of the dominant normal,
/// or the two largest bounding-box spans when the winding is degenerate.
fn projection_plane(normal_sum: Vec3, span: Vec3) -> (Axis, Axis) {
    if normal_sum.length_squared() > NORMAL_EPSILON_SQ {
        let n = normal_sum.normalize();
        let (ax, ay, az) = (n.x.abs(), n.y.abs(), n.z.abs());
        if ax >= ay && ax >= az {
            (Axis::Y, Axis::Z)
        } else if ay >= ax && ay >= az {
            (Axis::X, Axis::Z)
        } else {
            (Axis::X, Axis::Y)
        }
    } else {
        // Stable sort keeps declaration order on equal spans
        let mut axes = [(Axis::X, span.x), (Axis::Y, span.y), (Axis::Z, span.z)];
        axes.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        (axes[0].0, axes[1].0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-triangle quad facing +Z, `width` along X and `height` along Y
    fn facing_quad(width: f32, height: f32) -> Geometry {
        Geometry {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(width, 0.0, 0.0),
                Vec3::new(width, height, 0.0),
                Vec3::new(0.0, height, 0.0),
            ],
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
            uvs: None,
            groups: vec![],
        }
    }

    #[test]
    fn test_aspect_from_facing_quad() {
        let mut geom = facing_quad(2.0, 1.0);
        let aspect = project_group_uvs(&mut geom, 0);
        assert!((aspect - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_v_axis_is_flipped() {
        let mut geom = facing_quad(2.0, 1.0);
        project_group_uvs(&mut geom, 0);
        let uvs = geom.uvs.as_ref().unwrap();

        // Normal is +Z, so the plane is (X, Y): min-Y vertices map to V=1,
        // max-Y vertices to V=0
        assert!((uvs[0].y - 1.0).abs() < 1e-6);
        assert!((uvs[1].y - 1.0).abs() < 1e-6);
        assert!(uvs[2].y.abs() < 1e-6);
        assert!(uvs[3].y.abs() < 1e-6);
        // U runs min to max
        assert!(uvs[0].x.abs() < 1e-6);
        assert!((uvs[1].x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_x_dominant_normal_projects_onto_yz() {
        // Quad in the YZ plane facing +X: 3 wide along Y, 1 tall along Z
        let mut geom = Geometry {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(0.0, 3.0, 0.0),
                Vec3::new(0.0, 3.0, 1.0),
                Vec3::new(0.0, 0.0, 1.0),
            ],
            indices: Some(vec![0, 1, 2, 0, 2, 3]),
            uvs: None,
            groups: vec![],
        };
        let aspect = project_group_uvs(&mut geom, 0);
        assert!((aspect - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_winding_falls_back_to_bbox_spans() {
        // A triangle plus its reverse: face normals cancel exactly
        let mut geom = Geometry {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(4.0, 0.0, 0.0),
                Vec3::new(0.0, 2.0, 0.0),
            ],
            indices: Some(vec![0, 1, 2, 0, 2, 1]),
            uvs: None,
            groups: vec![],
        };
        let aspect = project_group_uvs(&mut geom, 0);
        // Largest span X (4), second Y (2)
        assert!((aspect - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_no_positions_is_inert() {
        let mut geom = Geometry::default();
        let aspect = project_group_uvs(&mut geom, 0);
        assert_eq!(aspect, 1.0);
        assert!(geom.uvs.is_none());
    }

    #[test]
    fn test_degenerate_span_keeps_aspect_positive() {
        // All vertices on one line: both spans collapse on one axis
        let mut geom = Geometry {
            positions: vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
            ],
            indices: None,
            uvs: None,
            groups: vec![],
        };
        let aspect = project_group_uvs(&mut geom, 0);
        assert!(aspect > 0.0);
        assert!(aspect.is_finite());
    }

    #[test]
    fn test_only_matched_group_vertices_written() {
        // Two quads sharing a buffer; group 1 covers vertices 4..8
        let mut positions = facing_quad(1.0, 1.0).positions;
        positions.extend(
            facing_quad(2.0, 1.0)
                .positions
                .iter()
                .map(|p| *p + Vec3::new(5.0, 0.0, 0.0)),
        );
        let mut geom = Geometry {
            positions,
            indices: Some(vec![0, 1, 2, 0, 2, 3, 4, 5, 6, 4, 6, 7]),
            uvs: None,
            groups: vec![
                MaterialGroup {
                    start: 0,
                    count: 6,
                    material_index: 0,
                },
                MaterialGroup {
                    start: 6,
                    count: 6,
                    material_index: 1,
                },
            ],
        };

        let aspect = project_group_uvs(&mut geom, 1);
        assert!((aspect - 2.0).abs() < 1e-5);

        let uvs = geom.uvs.as_ref().unwrap();
        // Unmatched group keeps the zero-filled attribute
        for uv in &uvs[0..4] {
            assert_eq!(*uv, Vec2::ZERO);
        }
        // Matched group got real coordinates
        assert!((uvs[5].x - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_material_uses_first_group() {
        let mut geom = facing_quad(2.0, 1.0);
        geom.groups = vec![MaterialGroup {
            start: 0,
            count: 6,
            material_index: 0,
        }];
        let aspect = project_group_uvs(&mut geom, 7);
        assert!((aspect - 2.0).abs() < 1e-5);
    }
}
