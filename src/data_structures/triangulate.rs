//! Polygon triangulation by ear clipping.
//!
//! Holes are first bridged into the outer ring, which turns the polygon into a
//! single weakly simple ring. Ears are then clipped from that ring; when no ear
//! can be found the ring is cleaned up, local self-intersections are cut off,
//! and as a last resort the ring is split along a valid diagonal.
//!
//! Vertex indices in the output refer to the outer contour followed by every
//! hole, in the order they were passed.

use cgmath::Vector2;

#[derive(Clone, Debug)]
struct Node {
    /// Index of the vertex in the flattened input.
    i: usize,
    x: f64,
    y: f64,
    prev: usize,
    next: usize,
    steiner: bool,
}

struct Ring {
    nodes: Vec<Node>,
}

impl Ring {
    fn insert(&mut self, i: usize, x: f64, y: f64, last: Option<usize>) -> usize {
        let id = self.nodes.len();
        let mut node = Node {
            i,
            x,
            y,
            prev: id,
            next: id,
            steiner: false,
        };
        if let Some(last) = last {
            let last_next = self.nodes[last].next;
            node.next = last_next;
            node.prev = last;
            self.nodes.push(node);
            self.nodes[last_next].prev = id;
            self.nodes[last].next = id;
        } else {
            self.nodes.push(node);
        }
        id
    }

    fn remove(&mut self, p: usize) {
        let (prev, next) = (self.nodes[p].prev, self.nodes[p].next);
        self.nodes[next].prev = prev;
        self.nodes[prev].next = next;
    }

    fn prev(&self, p: usize) -> usize {
        self.nodes[p].prev
    }

    fn next(&self, p: usize) -> usize {
        self.nodes[p].next
    }

    fn equals(&self, a: usize, b: usize) -> bool {
        self.nodes[a].x == self.nodes[b].x && self.nodes[a].y == self.nodes[b].y
    }

    /// Twice the signed area of triangle pqr; negative for a convex (ear) corner.
    fn area(&self, p: usize, q: usize, r: usize) -> f64 {
        let (p, q, r) = (&self.nodes[p], &self.nodes[q], &self.nodes[r]);
        (q.y - p.y) * (r.x - q.x) - (q.x - p.x) * (r.y - q.y)
    }

    /// Builds a ring from `points`, oriented clockwise when `clockwise` is set.
    fn link(&mut self, points: &[(usize, Vector2<f64>)], clockwise: bool) -> Option<usize> {
        let mut last = None;
        if clockwise == (signed_area(points) > 0.0) {
            for &(i, p) in points {
                last = Some(self.insert(i, p.x, p.y, last));
            }
        } else {
            for &(i, p) in points.iter().rev() {
                last = Some(self.insert(i, p.x, p.y, last));
            }
        }
        if let Some(l) = last {
            let next = self.next(l);
            if self.equals(l, next) {
                self.remove(l);
                return Some(next);
            }
        }
        last
    }

    /// Removes duplicate and collinear points between `start` and `end`.
    fn filter_points(&mut self, start: usize, end: Option<usize>) -> usize {
        let mut end = end.unwrap_or(start);
        let mut p = start;
        loop {
            let mut again = false;
            let next = self.next(p);
            if !self.nodes[p].steiner
                && (self.equals(p, next) || self.area(self.prev(p), p, next) == 0.0)
            {
                self.remove(p);
                p = self.prev(p);
                end = p;
                if p == self.next(p) {
                    break;
                }
                again = true;
            } else {
                p = next;
            }
            if !again && p == end {
                break;
            }
        }
        end
    }

    fn is_ear(&self, ear: usize) -> bool {
        let a = self.prev(ear);
        let c = self.next(ear);
        if self.area(a, ear, c) >= 0.0 {
            return false;
        }
        let (na, nb, nc) = (&self.nodes[a], &self.nodes[ear], &self.nodes[c]);
        let x0 = na.x.min(nb.x).min(nc.x);
        let y0 = na.y.min(nb.y).min(nc.y);
        let x1 = na.x.max(nb.x).max(nc.x);
        let y1 = na.y.max(nb.y).max(nc.y);

        let mut p = self.next(c);
        while p != a {
            let np = &self.nodes[p];
            if np.x >= x0
                && np.x <= x1
                && np.y >= y0
                && np.y <= y1
                && point_in_triangle(na.x, na.y, nb.x, nb.y, nc.x, nc.y, np.x, np.y)
                && self.area(self.prev(p), p, self.next(p)) >= 0.0
            {
                return false;
            }
            p = self.next(p);
        }
        true
    }

    fn earcut(&mut self, ear: Option<usize>, triangles: &mut Vec<[usize; 3]>, pass: u8) {
        let Some(mut ear) = ear else {
            return;
        };
        let mut stop = ear;
        while self.prev(ear) != self.next(ear) {
            let prev = self.prev(ear);
            let next = self.next(ear);

            if self.is_ear(ear) {
                triangles.push([self.nodes[prev].i, self.nodes[ear].i, self.nodes[next].i]);
                self.remove(ear);
                ear = self.next(next);
                stop = ear;
                continue;
            }

            ear = next;
            if ear == stop {
                match pass {
                    0 => {
                        let filtered = self.filter_points(ear, None);
                        self.earcut(Some(filtered), triangles, 1);
                    }
                    1 => {
                        let filtered = self.filter_points(ear, None);
                        let cured = self.cure_local_intersections(filtered, triangles);
                        self.earcut(Some(cured), triangles, 2);
                    }
                    _ => self.split_earcut(ear, triangles),
                }
                break;
            }
        }
    }

    fn cure_local_intersections(&mut self, start: usize, triangles: &mut Vec<[usize; 3]>) -> usize {
        let mut start = start;
        let mut p = start;
        loop {
            let a = self.prev(p);
            let b = self.next(self.next(p));
            if !self.equals(a, b)
                && self.intersects(a, p, self.next(p), b)
                && self.locally_inside(a, b)
                && self.locally_inside(b, a)
            {
                triangles.push([self.nodes[a].i, self.nodes[p].i, self.nodes[b].i]);
                let pn = self.next(p);
                self.remove(p);
                self.remove(pn);
                p = b;
                start = b;
            }
            p = self.next(p);
            if p == start {
                break;
            }
        }
        self.filter_points(p, None)
    }

    fn split_earcut(&mut self, start: usize, triangles: &mut Vec<[usize; 3]>) {
        let mut a = start;
        loop {
            let mut b = self.next(self.next(a));
            while b != self.prev(a) {
                if self.nodes[a].i != self.nodes[b].i && self.is_valid_diagonal(a, b) {
                    let c = self.split(a, b);
                    let a = self.filter_points(a, Some(self.next(a)));
                    let c = self.filter_points(c, Some(self.next(c)));
                    self.earcut(Some(a), triangles, 0);
                    self.earcut(Some(c), triangles, 0);
                    return;
                }
                b = self.next(b);
            }
            a = self.next(a);
            if a == start {
                break;
            }
        }
    }

    /// Links `a` and `b` with a bridge, splitting the ring in two. Returns the
    /// copy of `b` that heads the second ring.
    fn split(&mut self, a: usize, b: usize) -> usize {
        let (ai, ax, ay) = (self.nodes[a].i, self.nodes[a].x, self.nodes[a].y);
        let (bi, bx, by) = (self.nodes[b].i, self.nodes[b].x, self.nodes[b].y);
        let an = self.next(a);
        let bp = self.prev(b);

        let a2 = self.nodes.len();
        self.nodes.push(Node {
            i: ai,
            x: ax,
            y: ay,
            prev: a2,
            next: a2,
            steiner: false,
        });
        let b2 = self.nodes.len();
        self.nodes.push(Node {
            i: bi,
            x: bx,
            y: by,
            prev: b2,
            next: b2,
            steiner: false,
        });

        self.nodes[a].next = b;
        self.nodes[b].prev = a;

        self.nodes[a2].next = an;
        self.nodes[an].prev = a2;

        self.nodes[b2].next = a2;
        self.nodes[a2].prev = b2;

        self.nodes[bp].next = b2;
        self.nodes[b2].prev = bp;

        b2
    }

    fn leftmost(&self, start: usize) -> usize {
        let mut p = start;
        let mut leftmost = start;
        loop {
            let (np, nl) = (&self.nodes[p], &self.nodes[leftmost]);
            if np.x < nl.x || (np.x == nl.x && np.y < nl.y) {
                leftmost = p;
            }
            p = self.next(p);
            if p == start {
                break;
            }
        }
        leftmost
    }

    fn eliminate_hole(&mut self, hole: usize, outer: usize) -> usize {
        let Some(bridge) = self.find_hole_bridge(hole, outer) else {
            return outer;
        };
        let bridge_reverse = self.split(bridge, hole);
        self.filter_points(bridge_reverse, Some(self.next(bridge_reverse)));
        self.filter_points(bridge, Some(self.next(bridge)))
    }

    /// Finds a vertex of the outer ring that `hole` can be connected to without
    /// crossing any edge.
    fn find_hole_bridge(&self, hole: usize, outer: usize) -> Option<usize> {
        let (hx, hy) = (self.nodes[hole].x, self.nodes[hole].y);
        let mut qx = f64::NEG_INFINITY;
        let mut m = None;

        // segment to the left of the hole point closest to it
        let mut p = outer;
        loop {
            let (np, nn) = (&self.nodes[p], &self.nodes[self.next(p)]);
            if hy <= np.y && hy >= nn.y && nn.y != np.y {
                let x = np.x + (hy - np.y) * (nn.x - np.x) / (nn.y - np.y);
                if x <= hx && x > qx {
                    qx = x;
                    m = Some(if np.x < nn.x { p } else { self.next(p) });
                    if x == hx {
                        return m;
                    }
                }
            }
            p = self.next(p);
            if p == outer {
                break;
            }
        }

        let mut m = m?;
        let stop = m;
        let (mx, my) = (self.nodes[m].x, self.nodes[m].y);
        let mut tan_min = f64::INFINITY;

        // look for points inside the triangle (hole point, segment hit, m) that
        // make a better bridge
        p = m;
        loop {
            let (px, py) = (self.nodes[p].x, self.nodes[p].y);
            if hx >= px
                && px >= mx
                && hx != px
                && point_in_triangle(
                    if hy < my { hx } else { qx },
                    hy,
                    mx,
                    my,
                    if hy < my { qx } else { hx },
                    hy,
                    px,
                    py,
                )
            {
                let tan = (hy - py).abs() / (hx - px);
                if self.locally_inside(p, hole)
                    && (tan < tan_min
                        || (tan == tan_min
                            && (px > self.nodes[m].x
                                || (px == self.nodes[m].x && self.sector_contains_sector(m, p)))))
                {
                    m = p;
                    tan_min = tan;
                }
            }
            p = self.next(p);
            if p == stop {
                break;
            }
        }
        Some(m)
    }

    fn sector_contains_sector(&self, m: usize, p: usize) -> bool {
        self.area(self.prev(m), m, self.prev(p)) < 0.0
            && self.area(self.next(p), m, self.next(m)) < 0.0
    }

    fn is_valid_diagonal(&self, a: usize, b: usize) -> bool {
        let (na, nb) = (&self.nodes[a], &self.nodes[b]);
        self.nodes[self.next(a)].i != nb.i
            && self.nodes[self.prev(a)].i != nb.i
            && !self.intersects_polygon(a, b)
            && ((self.locally_inside(a, b)
                && self.locally_inside(b, a)
                && self.middle_inside(a, b)
                && (self.area(self.prev(a), a, self.prev(b)) != 0.0
                    || self.area(a, self.prev(b), b) != 0.0))
                || (na.x == nb.x
                    && na.y == nb.y
                    && self.area(self.prev(a), a, self.next(a)) > 0.0
                    && self.area(self.prev(b), b, self.next(b)) > 0.0))
    }

    fn on_segment(&self, p: usize, q: usize, r: usize) -> bool {
        let (p, q, r) = (&self.nodes[p], &self.nodes[q], &self.nodes[r]);
        q.x <= p.x.max(r.x) && q.x >= p.x.min(r.x) && q.y <= p.y.max(r.y) && q.y >= p.y.min(r.y)
    }

    fn intersects(&self, p1: usize, q1: usize, p2: usize, q2: usize) -> bool {
        let o1 = sign(self.area(p1, q1, p2));
        let o2 = sign(self.area(p1, q1, q2));
        let o3 = sign(self.area(p2, q2, p1));
        let o4 = sign(self.area(p2, q2, q1));

        if o1 != o2 && o3 != o4 {
            return true;
        }
        (o1 == 0 && self.on_segment(p1, p2, q1))
            || (o2 == 0 && self.on_segment(p1, q2, q1))
            || (o3 == 0 && self.on_segment(p2, p1, q2))
            || (o4 == 0 && self.on_segment(p2, q1, q2))
    }

    fn intersects_polygon(&self, a: usize, b: usize) -> bool {
        let (ai, bi) = (self.nodes[a].i, self.nodes[b].i);
        let mut p = a;
        loop {
            let next = self.next(p);
            let (pi, ni) = (self.nodes[p].i, self.nodes[next].i);
            if pi != ai && ni != ai && pi != bi && ni != bi && self.intersects(p, next, a, b) {
                return true;
            }
            p = next;
            if p == a {
                return false;
            }
        }
    }

    fn locally_inside(&self, a: usize, b: usize) -> bool {
        if self.area(self.prev(a), a, self.next(a)) < 0.0 {
            self.area(a, b, self.next(a)) >= 0.0 && self.area(a, self.prev(a), b) >= 0.0
        } else {
            self.area(a, b, self.prev(a)) < 0.0 || self.area(a, self.next(a), b) < 0.0
        }
    }

    fn middle_inside(&self, a: usize, b: usize) -> bool {
        let px = (self.nodes[a].x + self.nodes[b].x) / 2.0;
        let py = (self.nodes[a].y + self.nodes[b].y) / 2.0;
        let mut inside = false;
        let mut p = a;
        loop {
            let (np, nn) = (&self.nodes[p], &self.nodes[self.next(p)]);
            if ((np.y > py) != (nn.y > py))
                && nn.y != np.y
                && (px < (nn.x - np.x) * (py - np.y) / (nn.y - np.y) + np.x)
            {
                inside = !inside;
            }
            p = self.next(p);
            if p == a {
                break;
            }
        }
        inside
    }
}

fn sign(v: f64) -> i8 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

#[allow(clippy::too_many_arguments)]
fn point_in_triangle(ax: f64, ay: f64, bx: f64, by: f64, cx: f64, cy: f64, px: f64, py: f64) -> bool {
    (cx - px) * (ay - py) >= (ax - px) * (cy - py)
        && (ax - px) * (by - py) >= (bx - px) * (ay - py)
        && (bx - px) * (cy - py) >= (cx - px) * (by - py)
}

fn signed_area(points: &[(usize, Vector2<f64>)]) -> f64 {
    let mut sum = 0.0;
    let mut j = points.len().wrapping_sub(1);
    for (i, (_, p)) in points.iter().enumerate() {
        let q = points[j].1;
        sum += (q.x - p.x) * (p.y + q.y);
        j = i;
    }
    sum
}

/// Signed area of a closed outline. Negative means clockwise with the
/// y axis pointing up.
pub fn area(contour: &[Vector2<f32>]) -> f32 {
    let n = contour.len();
    let mut a = 0.0;
    let mut p = n.wrapping_sub(1);
    for q in 0..n {
        a += contour[p].x * contour[q].y - contour[q].x * contour[p].y;
        p = q;
    }
    a * 0.5
}

pub fn is_clockwise(contour: &[Vector2<f32>]) -> bool {
    area(contour) < 0.0
}

/// Drops a closing point that repeats the first one.
pub fn remove_dup_end_points(points: &mut Vec<Vector2<f32>>) {
    while points.len() > 2 && points.first() == points.last() {
        points.pop();
    }
}

/// Triangulates an outer contour with holes.
///
/// Returned indices address the outer contour followed by all holes. Closing
/// points that repeat the first point are ignored, so callers should strip them
/// with [`remove_dup_end_points`] before relying on index positions.
pub fn triangulate_shape(contour: &[Vector2<f32>], holes: &[Vec<Vector2<f32>>]) -> Vec<[usize; 3]> {
    let mut contour = contour.to_vec();
    remove_dup_end_points(&mut contour);
    let mut holes = holes.to_vec();
    holes.iter_mut().for_each(remove_dup_end_points);

    let mut offset = 0;
    let mut flatten = |points: &[Vector2<f32>]| {
        let flat: Vec<(usize, Vector2<f64>)> = points
            .iter()
            .enumerate()
            .map(|(k, p)| (offset + k, Vector2::new(p.x as f64, p.y as f64)))
            .collect();
        offset += points.len();
        flat
    };
    let outer_points = flatten(&contour);
    let hole_points: Vec<_> = holes.iter().map(|h| flatten(h)).collect();

    let mut ring = Ring { nodes: Vec::new() };
    let mut triangles = Vec::new();
    let Some(mut outer) = ring.link(&outer_points, true) else {
        return triangles;
    };
    if ring.next(outer) == ring.prev(outer) {
        return triangles;
    }

    if !hole_points.is_empty() {
        let mut queue = Vec::with_capacity(hole_points.len());
        for points in &hole_points {
            if let Some(list) = ring.link(points, false) {
                if list == ring.next(list) {
                    ring.nodes[list].steiner = true;
                }
                queue.push(ring.leftmost(list));
            }
        }
        queue.sort_by(|&a, &b| ring.nodes[a].x.total_cmp(&ring.nodes[b].x));
        for hole in queue {
            outer = ring.eliminate_hole(hole, outer);
        }
    }

    ring.earcut(Some(outer), &mut triangles, 0);
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f32, y: f32) -> Vector2<f32> {
        Vector2::new(x, y)
    }

    fn triangle_area(points: &[Vector2<f32>], tri: &[usize; 3]) -> f32 {
        let (a, b, c) = (points[tri[0]], points[tri[1]], points[tri[2]]);
        ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y)).abs() / 2.0
    }

    #[test]
    fn square_becomes_two_triangles() {
        let square = vec![v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0), v(0.0, 1.0)];
        let tris = triangulate_shape(&square, &[]);
        assert_eq!(tris.len(), 2);
        let covered: f32 = tris.iter().map(|t| triangle_area(&square, t)).sum();
        assert!((covered - 1.0).abs() < 1e-6);
    }

    #[test]
    fn square_with_hole_covers_the_ring_only() {
        let outer = vec![v(0.0, 0.0), v(4.0, 0.0), v(4.0, 4.0), v(0.0, 4.0)];
        let hole = vec![v(1.0, 1.0), v(1.0, 3.0), v(3.0, 3.0), v(3.0, 1.0)];
        let tris = triangulate_shape(&outer, &[hole.clone()]);
        let all: Vec<_> = outer.iter().chain(hole.iter()).copied().collect();
        let covered: f32 = tris.iter().map(|t| triangle_area(&all, t)).sum();
        assert!((covered - 12.0).abs() < 1e-5, "covered {covered}");
        assert_eq!(tris.len(), 8);
    }

    #[test]
    fn concave_outline_is_fully_covered() {
        // an L shape
        let l = vec![
            v(0.0, 0.0),
            v(2.0, 0.0),
            v(2.0, 1.0),
            v(1.0, 1.0),
            v(1.0, 2.0),
            v(0.0, 2.0),
        ];
        let tris = triangulate_shape(&l, &[]);
        assert_eq!(tris.len(), 4);
        let covered: f32 = tris.iter().map(|t| triangle_area(&l, t)).sum();
        assert!((covered - 3.0).abs() < 1e-6);
    }

    #[test]
    fn closing_duplicate_is_ignored() {
        let closed = vec![v(0.0, 0.0), v(1.0, 0.0), v(0.0, 1.0), v(0.0, 0.0)];
        let tris = triangulate_shape(&closed, &[]);
        assert_eq!(tris.len(), 1);
        assert!(tris[0].iter().all(|&i| i < 3));
    }

    #[test]
    fn winding_follows_signed_area() {
        let ccw = vec![v(0.0, 0.0), v(1.0, 0.0), v(1.0, 1.0)];
        let cw: Vec<_> = ccw.iter().rev().copied().collect();
        assert!(!is_clockwise(&ccw));
        assert!(is_clockwise(&cw));
        assert!((area(&ccw) - 0.5).abs() < 1e-6);
    }
}
