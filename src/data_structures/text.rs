//! Extruded 3D text.
//!
//! Planar [`Shape`]s (usually produced by
//! [`Font::generate_shapes`](crate::resources::font::Font::generate_shapes)) are
//! pushed along +z into solid geometry. With a bevel the outline first grows
//! outwards over `bevel_segments` rings on a quarter circle, runs straight for
//! `depth`, then shrinks back in. The front and back are closed with
//! triangulated lids.
//!
//! The result is unindexed in spirit: every triangle owns its three vertices so
//! flat normals can be assigned per face.

use std::f32::consts::FRAC_PI_2;

use cgmath::{Vector2, vec2};

use crate::{
    config::TextConfig,
    data_structures::{
        geometry::{Geometry, ModelVertex},
        triangulate,
    },
    resources::font::Font,
};

/// A closed outline with optional holes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Shape {
    pub contour: Vec<Vector2<f32>>,
    pub holes: Vec<Vec<Vector2<f32>>>,
}

impl Shape {
    pub fn new(contour: Vec<Vector2<f32>>) -> Self {
        Self {
            contour,
            holes: Vec::new(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtrudeOptions {
    pub depth: f32,
    pub steps: u32,
    pub bevel_enabled: bool,
    pub bevel_thickness: f32,
    pub bevel_size: f32,
    pub bevel_offset: f32,
    pub bevel_segments: u32,
}

impl Default for ExtrudeOptions {
    fn default() -> Self {
        Self {
            depth: 1.0,
            steps: 1,
            bevel_enabled: true,
            bevel_thickness: 0.2,
            bevel_size: 0.1,
            bevel_offset: 0.0,
            bevel_segments: 3,
        }
    }
}

impl From<&TextConfig> for ExtrudeOptions {
    fn from(config: &TextConfig) -> Self {
        Self {
            depth: config.depth,
            steps: 1,
            bevel_enabled: config.bevel_enabled,
            bevel_thickness: config.bevel_thickness,
            bevel_size: config.bevel_size,
            bevel_offset: config.bevel_offset,
            bevel_segments: config.bevel_segments,
        }
    }
}

/// Direction a vertex moves when the outline is offset by one unit.
///
/// Sharp corners would shoot far out, so the offset is capped at `sqrt(2)`.
fn bevel_vec(pt: Vector2<f32>, prev: Vector2<f32>, next: Vector2<f32>) -> Vector2<f32> {
    let v_prev = pt - prev;
    let v_next = next - pt;
    let v_prev_lensq = v_prev.x * v_prev.x + v_prev.y * v_prev.y;
    let collinear = v_prev.x * v_next.y - v_prev.y * v_next.x;

    let (trans, shrink_by) = if collinear.abs() > f32::EPSILON {
        let v_prev_len = v_prev_lensq.sqrt();
        let v_next_len = (v_next.x * v_next.x + v_next.y * v_next.y).sqrt();

        // shift both neighbours along their edge normals and intersect the shifted edges
        let prev_shift = vec2(prev.x - v_prev.y / v_prev_len, prev.y + v_prev.x / v_prev_len);
        let next_shift = vec2(next.x - v_next.y / v_next_len, next.y + v_next.x / v_next_len);
        let sf = ((next_shift.x - prev_shift.x) * v_next.y - (next_shift.y - prev_shift.y) * v_next.x)
            / collinear;

        let trans = prev_shift + v_prev * sf - pt;
        let trans_lensq = trans.x * trans.x + trans.y * trans.y;
        if trans_lensq <= 2.0 {
            return trans;
        }
        (trans, (trans_lensq / 2.0).sqrt())
    } else {
        let eps = f32::EPSILON;
        let same_direction = if v_prev.x > eps {
            v_next.x > eps
        } else if v_prev.x < -eps {
            v_next.x < -eps
        } else {
            v_prev.y.signum() == v_next.y.signum()
        };
        if same_direction {
            (vec2(-v_prev.y, v_prev.x), v_prev_lensq.sqrt())
        } else {
            (v_prev, (v_prev_lensq / 2.0).sqrt())
        }
    };
    trans / shrink_by
}

fn ring_movements(ring: &[Vector2<f32>]) -> Vec<Vector2<f32>> {
    let n = ring.len();
    (0..n)
        .map(|i| bevel_vec(ring[i], ring[(i + n - 1) % n], ring[(i + 1) % n]))
        .collect()
}

/// World-projected UVs for a side quad. The wall is unrolled along whichever
/// of x or y varies more across its first edge.
fn side_wall_uvs(a: [f32; 3], b: [f32; 3], c: [f32; 3], d: [f32; 3]) -> [[f32; 2]; 4] {
    let axis = if (a[1] - b[1]).abs() < (a[0] - b[0]).abs() { 0 } else { 1 };
    [a, b, c, d].map(|p| [p[axis], 1.0 - p[2]])
}

struct Builder {
    layers: Vec<[f32; 3]>,
    out: Vec<ModelVertex>,
}

impl Builder {
    fn vertex(&self, i: usize, uv: [f32; 2]) -> ModelVertex {
        ModelVertex {
            position: self.layers[i],
            tex_coords: uv,
            normal: [0.0, 0.0, 1.0],
        }
    }

    fn triangle(&mut self, a: usize, b: usize, c: usize) {
        for i in [a, b, c] {
            let p = self.layers[i];
            let v = self.vertex(i, [p[0], p[1]]);
            self.out.push(v);
        }
    }

    fn quad(&mut self, a: usize, b: usize, c: usize, d: usize) {
        let uvs = side_wall_uvs(self.layers[a], self.layers[b], self.layers[c], self.layers[d]);
        for (i, uv) in [(a, uvs[0]), (b, uvs[1]), (d, uvs[3]), (b, uvs[1]), (c, uvs[2]), (d, uvs[3])] {
            let v = self.vertex(i, uv);
            self.out.push(v);
        }
    }
}

fn extrude_shape(shape: &Shape, options: &ExtrudeOptions, out: &mut Vec<ModelVertex>) {
    let (bevel_thickness, bevel_size, bevel_offset, bevel_segments) = if options.bevel_enabled {
        (
            options.bevel_thickness,
            options.bevel_size,
            options.bevel_offset,
            options.bevel_segments as usize,
        )
    } else {
        (0.0, 0.0, 0.0, 0)
    };
    let steps = options.steps.max(1) as usize;
    let depth = options.depth;

    let mut contour = shape.contour.clone();
    let mut holes = shape.holes.clone();
    triangulate::remove_dup_end_points(&mut contour);
    holes.iter_mut().for_each(triangulate::remove_dup_end_points);
    holes.retain(|h| h.len() >= 3);
    if contour.len() < 3 {
        return;
    }

    // outer contours wind clockwise, holes counter-clockwise
    if !triangulate::is_clockwise(&contour) {
        contour.reverse();
        for hole in &mut holes {
            if triangulate::is_clockwise(hole) {
                hole.reverse();
            }
        }
    }

    let faces = triangulate::triangulate_shape(&contour, &holes);

    let rings: Vec<&[Vector2<f32>]> = std::iter::once(contour.as_slice())
        .chain(holes.iter().map(Vec::as_slice))
        .collect();
    let movements: Vec<Vec<Vector2<f32>>> = rings.iter().map(|r| ring_movements(r)).collect();
    let vlen: usize = rings.iter().map(|r| r.len()).sum();

    let mut layers: Vec<[f32; 3]> = Vec::with_capacity(vlen * (steps + 1 + 2 * bevel_segments));
    let push_layer = |bs: f32, z: f32, layers: &mut Vec<[f32; 3]>| {
        for (ring, moves) in rings.iter().zip(&movements) {
            for (pt, mv) in ring.iter().zip(moves) {
                let p = if bs == 0.0 { *pt } else { *pt + *mv * bs };
                layers.push([p.x, p.y, z]);
            }
        }
    };

    let bevel_at = |b: usize| {
        let t = b as f32 / bevel_segments as f32;
        let z = bevel_thickness * (t * FRAC_PI_2).cos();
        let bs = bevel_size * (t * FRAC_PI_2).sin() + bevel_offset;
        (z, bs)
    };

    for b in 0..bevel_segments {
        let (z, bs) = bevel_at(b);
        push_layer(bs, -z, &mut layers);
    }
    let bs = bevel_size + bevel_offset;
    push_layer(bs, 0.0, &mut layers);
    for s in 1..=steps {
        push_layer(bs, depth / steps as f32 * s as f32, &mut layers);
    }
    for b in (0..bevel_segments).rev() {
        let (z, bs) = bevel_at(b);
        push_layer(bs, depth + z, &mut layers);
    }

    let mut builder = Builder {
        layers,
        out: std::mem::take(out),
    };

    let top = vlen * (steps + bevel_segments * 2);
    for face in &faces {
        builder.triangle(face[2], face[1], face[0]);
    }
    for face in &faces {
        builder.triangle(face[0] + top, face[1] + top, face[2] + top);
    }

    let mut ring_offset = 0;
    for ring in &rings {
        let n = ring.len();
        for i in (0..n).rev() {
            let j = i;
            let k = if i == 0 { n - 1 } else { i - 1 };
            for s in 0..steps + bevel_segments * 2 {
                let slen1 = vlen * s;
                let slen2 = vlen * (s + 1);
                builder.quad(
                    ring_offset + j + slen1,
                    ring_offset + k + slen1,
                    ring_offset + k + slen2,
                    ring_offset + j + slen2,
                );
            }
        }
        ring_offset += n;
    }

    *out = builder.out;
}

pub struct TextGeometry;

impl TextGeometry {
    /// Extrudes every shape and merges the results into one geometry with flat
    /// normals.
    pub fn extrude(shapes: &[Shape], options: &ExtrudeOptions) -> Geometry {
        let mut vertices = Vec::new();
        for shape in shapes {
            extrude_shape(shape, options, &mut vertices);
        }
        let indices = (0..vertices.len() as u32).collect();
        let mut geometry = Geometry { vertices, indices };
        geometry.compute_flat_normals();
        geometry
    }

    /// Lays out `config.text` with `font`, extrudes it and centres the result on
    /// the origin.
    pub fn build(font: &Font, config: &TextConfig) -> Geometry {
        let shapes = font.generate_shapes(&config.text, config.size, config.curve_segments);
        let mut geometry = Self::extrude(&shapes, &ExtrudeOptions::from(config));
        geometry.center();
        geometry
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Vector3;

    use super::*;

    fn square(size: f32) -> Vec<Vector2<f32>> {
        // clockwise
        vec![
            vec2(0.0, 0.0),
            vec2(0.0, size),
            vec2(size, size),
            vec2(size, 0.0),
        ]
    }

    #[test]
    fn bevel_vec_at_right_angle_reaches_the_corner() {
        let v = bevel_vec(vec2(0.0, 0.0), vec2(1.0, 0.0), vec2(0.0, 1.0));
        assert!((v.x + 1.0).abs() < 1e-5, "{v:?}");
        assert!((v.y + 1.0).abs() < 1e-5, "{v:?}");
    }

    #[test]
    fn bevel_vec_on_straight_edge_is_unit_normal() {
        let v = bevel_vec(vec2(1.0, 0.0), vec2(0.0, 0.0), vec2(2.0, 0.0));
        assert!((v.x).abs() < 1e-5);
        assert!((v.y.abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn flat_extrusion_without_bevel() {
        let options = ExtrudeOptions {
            depth: 2.0,
            bevel_enabled: false,
            ..Default::default()
        };
        let geometry = TextGeometry::extrude(&[Shape::new(square(1.0))], &options);
        // two lids of two triangles plus four side quads
        assert_eq!(geometry.triangle_count(), 2 + 2 + 8);
        let bbox = geometry.bounding_box().unwrap();
        assert_eq!(bbox.min, Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(bbox.max, Vector3::new(1.0, 1.0, 2.0));
    }

    #[test]
    fn bevel_grows_outline_and_depth() {
        let options = ExtrudeOptions {
            depth: 0.2,
            bevel_thickness: 0.03,
            bevel_size: 0.02,
            bevel_segments: 5,
            ..Default::default()
        };
        let geometry = TextGeometry::extrude(&[Shape::new(square(1.0))], &options);
        let bbox = geometry.bounding_box().unwrap();
        assert!((bbox.min.z + 0.03).abs() < 1e-5);
        assert!((bbox.max.z - 0.23).abs() < 1e-5);
        assert!((bbox.min.x + 0.02).abs() < 1e-5);
        assert!((bbox.max.y - 1.02).abs() < 1e-5);
        // lids plus 4 edges * (1 step + 10 bevel rings) quads
        assert_eq!(geometry.triangle_count(), 4 + 4 * 11 * 2);
    }

    #[test]
    fn holes_are_cut_out_of_the_lids() {
        let mut hole = square(1.0);
        hole.iter_mut().for_each(|p| *p += vec2(1.0, 1.0));
        hole.reverse();
        let shape = Shape {
            contour: square(3.0),
            holes: vec![hole],
        };
        let options = ExtrudeOptions {
            bevel_enabled: false,
            ..Default::default()
        };
        let geometry = TextGeometry::extrude(&[shape], &options);
        // 8 triangles per lid, 8 side quads
        assert_eq!(geometry.triangle_count(), 16 + 16);
    }
}
