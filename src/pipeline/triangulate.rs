//! Delaunay tessellation of face-mesh points, used to draw the mesh wireframe.
//!
//! Bowyer-Watson over a super triangle. Face meshes are a few hundred points,
//! so the quadratic cavity search stays well under a millisecond.

use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug)]
struct Triangle {
    v: [usize; 3],
    center: (f64, f64),
    radius_sq: f64,
}

impl Triangle {
    fn new(points: &[(f64, f64)], v: [usize; 3]) -> Option<Self> {
        let (ax, ay) = points[v[0]];
        let (bx, by) = points[v[1]];
        let (cx, cy) = points[v[2]];
        let d = 2.0 * (ax * (by - cy) + bx * (cy - ay) + cx * (ay - by));
        if d.abs() < 1e-12 {
            return None;
        }
        let a2 = ax * ax + ay * ay;
        let b2 = bx * bx + by * by;
        let c2 = cx * cx + cy * cy;
        let ux = (a2 * (by - cy) + b2 * (cy - ay) + c2 * (ay - by)) / d;
        let uy = (a2 * (cx - bx) + b2 * (ax - cx) + c2 * (bx - ax)) / d;
        let radius_sq = (ax - ux).powi(2) + (ay - uy).powi(2);
        Some(Self {
            v,
            center: (ux, uy),
            radius_sq,
        })
    }

    fn circumcircle_contains(&self, p: (f64, f64)) -> bool {
        let dist = (p.0 - self.center.0).powi(2) + (p.1 - self.center.1).powi(2);
        dist < self.radius_sq * (1.0 + 1e-9)
    }

    fn edges(&self) -> [(usize, usize); 3] {
        [
            ordered(self.v[0], self.v[1]),
            ordered(self.v[1], self.v[2]),
            ordered(self.v[2], self.v[0]),
        ]
    }
}

fn ordered(a: usize, b: usize) -> (usize, usize) {
    if a < b { (a, b) } else { (b, a) }
}

/// Returns the unique edges of the Delaunay triangulation of `points`, as
/// index pairs `(low, high)` into the input slice. Duplicate points are kept
/// out of the triangulation; fewer than three distinct points yield no edges.
pub fn delaunay_edges(points: &[(f32, f32)]) -> Vec<(usize, usize)> {
    if points.len() < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f64::MAX, f64::MAX);
    let (mut max_x, mut max_y) = (f64::MIN, f64::MIN);
    for &(x, y) in points {
        min_x = min_x.min(x as f64);
        min_y = min_y.min(y as f64);
        max_x = max_x.max(x as f64);
        max_y = max_y.max(y as f64);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1e-6);
    let mid = ((min_x + max_x) * 0.5, (min_y + max_y) * 0.5);

    let n = points.len();
    let mut coords: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (x as f64, y as f64)).collect();
    coords.push((mid.0 - 20.0 * span, mid.1 - span));
    coords.push((mid.0, mid.1 + 20.0 * span));
    coords.push((mid.0 + 20.0 * span, mid.1 - span));

    let Some(super_triangle) = Triangle::new(&coords, [n, n + 1, n + 2]) else {
        return Vec::new();
    };
    let mut triangles = vec![super_triangle];
    let mut seen = BTreeSet::new();

    for idx in 0..n {
        let p = coords[idx];
        let key = (p.0.to_bits(), p.1.to_bits());
        if !seen.insert(key) {
            continue;
        }

        let (bad, good): (Vec<Triangle>, Vec<Triangle>) = triangles
            .into_iter()
            .partition(|tri| tri.circumcircle_contains(p));
        triangles = good;

        // Cavity boundary: edges owned by exactly one removed triangle.
        let mut boundary: Vec<(usize, usize)> = Vec::new();
        for tri in &bad {
            for edge in tri.edges() {
                if let Some(pos) = boundary.iter().position(|e| *e == edge) {
                    boundary.swap_remove(pos);
                } else {
                    boundary.push(edge);
                }
            }
        }

        for (a, b) in boundary {
            if let Some(tri) = Triangle::new(&coords, [a, b, idx]) {
                triangles.push(tri);
            }
        }
    }

    let mut edges = BTreeSet::new();
    for tri in &triangles {
        if tri.v.iter().any(|&v| v >= n) {
            continue;
        }
        for edge in tri.edges() {
            edges.insert(edge);
        }
    }
    edges.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_triangle() {
        let edges = delaunay_edges(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        assert_eq!(edges, vec![(0, 1), (0, 2), (1, 2)]);
    }

    #[test]
    fn square_gets_one_diagonal() {
        let edges = delaunay_edges(&[(0.0, 0.0), (2.0, 0.1), (2.1, 2.0), (0.0, 2.0)]);
        assert_eq!(edges.len(), 5);
        let has_02 = edges.contains(&(0, 2));
        let has_13 = edges.contains(&(1, 3));
        assert!(has_02 ^ has_13, "expected exactly one diagonal, got {edges:?}");
    }

    #[test]
    fn interior_point_connects_to_all_corners() {
        let edges = delaunay_edges(&[(0.0, 0.0), (4.0, 0.0), (2.0, 4.0), (2.0, 1.5)]);
        for corner in 0..3 {
            assert!(edges.contains(&(corner, 3)), "missing edge to {corner}: {edges:?}");
        }
        assert_eq!(edges.len(), 6);
    }

    #[test]
    fn degenerate_inputs_have_no_edges() {
        assert!(delaunay_edges(&[]).is_empty());
        assert!(delaunay_edges(&[(1.0, 1.0), (2.0, 2.0)]).is_empty());
        assert!(delaunay_edges(&[(1.0, 1.0), (1.0, 1.0), (1.0, 1.0)]).is_empty());
    }

    #[test]
    fn grid_edges_reference_valid_points() {
        let points: Vec<(f32, f32)> = (0..100)
            .map(|i| ((i % 10) as f32 * 3.0 + (i / 10) as f32 * 0.01, (i / 10) as f32 * 3.0))
            .collect();
        let edges = delaunay_edges(&points);
        // A triangulated n-point set with h hull points has 3n - 3 - h edges.
        assert!(edges.len() >= 3 * 100 - 3 - 36 - 10);
        assert!(edges.iter().all(|&(a, b)| a < b && b < points.len()));
    }
}
