//! 2D polygon primitives: convex polygons, containment and clipping.
//!
//! Foothold cropping intersects the nominal foot polygon with terrain region
//! polygons projected vertically, so convex-convex intersection and area are
//! the operations that matter here.

use crate::common::Point2D;

/// Convex polygon with counter-clockwise vertex ordering
#[derive(Debug, Clone, PartialEq)]
pub struct ConvexPolygon2D {
    vertices: Vec<Point2D>,
}

impl ConvexPolygon2D {
    /// Builds the convex hull of the given points (Andrew's monotone chain).
    pub fn from_points(points: &[Point2D]) -> Self {
        if points.len() < 3 {
            return Self { vertices: points.to_vec() };
        }

        let mut sorted: Vec<Point2D> = points.to_vec();
        sorted.sort_by(|a, b| {
            a.x.partial_cmp(&b.x)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.y.partial_cmp(&b.y).unwrap_or(std::cmp::Ordering::Equal))
        });
        sorted.dedup_by(|a, b| a.distance(b) < 1e-12);

        if sorted.len() < 3 {
            return Self { vertices: sorted };
        }

        let mut lower: Vec<Point2D> = Vec::new();
        for &p in &sorted {
            while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], &p) <= 0.0 {
                lower.pop();
            }
            lower.push(p);
        }

        let mut upper: Vec<Point2D> = Vec::new();
        for &p in sorted.iter().rev() {
            while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], &p) <= 0.0 {
                upper.pop();
            }
            upper.push(p);
        }

        lower.pop();
        upper.pop();
        lower.extend(upper);
        Self { vertices: lower }
    }

    /// Axis-aligned rectangle centered on the origin
    pub fn rectangle(length: f64, width: f64) -> Self {
        let half_l = 0.5 * length;
        let half_w = 0.5 * width;
        Self {
            vertices: vec![
                Point2D::new(half_l, half_w),
                Point2D::new(-half_l, half_w),
                Point2D::new(-half_l, -half_w),
                Point2D::new(half_l, -half_w),
            ],
        }
    }

    pub fn empty() -> Self {
        Self { vertices: Vec::new() }
    }

    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.len() < 3
    }

    /// Shoelace area; zero for degenerate polygons
    pub fn area(&self) -> f64 {
        if self.vertices.len() < 3 {
            return 0.0;
        }
        let mut sum = 0.0;
        for i in 0..self.vertices.len() {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % self.vertices.len()];
            sum += a.x * b.y - b.x * a.y;
        }
        0.5 * sum.abs()
    }

    pub fn centroid(&self) -> Point2D {
        let n = self.vertices.len();
        if n == 0 {
            return Point2D::origin();
        }
        let mut cx = 0.0;
        let mut cy = 0.0;
        for v in &self.vertices {
            cx += v.x;
            cy += v.y;
        }
        Point2D::new(cx / n as f64, cy / n as f64)
    }

    /// Half-plane containment test with tolerance (positive epsilon grows
    /// the polygon)
    pub fn contains(&self, point: &Point2D, epsilon: f64) -> bool {
        if self.vertices.len() < 3 {
            return false;
        }
        for i in 0..self.vertices.len() {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % self.vertices.len()];
            let edge_length = a.distance(b).max(1e-12);
            if cross(a, b, point) < -epsilon * edge_length {
                return false;
            }
        }
        true
    }

    /// Convex-convex intersection via Sutherland-Hodgman clipping.
    /// Returns an empty polygon when there is no overlap.
    pub fn intersection(&self, clip: &ConvexPolygon2D) -> ConvexPolygon2D {
        if self.is_empty() || clip.is_empty() {
            return ConvexPolygon2D::empty();
        }

        let mut output = self.vertices.clone();
        for i in 0..clip.vertices.len() {
            if output.is_empty() {
                break;
            }
            let a = clip.vertices[i];
            let b = clip.vertices[(i + 1) % clip.vertices.len()];

            let input = std::mem::take(&mut output);
            for j in 0..input.len() {
                let current = input[j];
                let previous = input[(j + input.len() - 1) % input.len()];

                let current_inside = cross(&a, &b, &current) >= 0.0;
                let previous_inside = cross(&a, &b, &previous) >= 0.0;

                if current_inside {
                    if !previous_inside {
                        if let Some(p) = line_intersection(&previous, &current, &a, &b) {
                            output.push(p);
                        }
                    }
                    output.push(current);
                } else if previous_inside {
                    if let Some(p) = line_intersection(&previous, &current, &a, &b) {
                        output.push(p);
                    }
                }
            }
        }

        if output.len() < 3 {
            ConvexPolygon2D::empty()
        } else {
            ConvexPolygon2D::from_points(&output)
        }
    }

    /// Polygon rotated by `yaw` about the origin, then translated
    pub fn rotated_translated(&self, yaw: f64, tx: f64, ty: f64) -> ConvexPolygon2D {
        let (sin, cos) = yaw.sin_cos();
        let vertices = self
            .vertices
            .iter()
            .map(|v| Point2D::new(cos * v.x - sin * v.y + tx, sin * v.x + cos * v.y + ty))
            .collect();
        ConvexPolygon2D { vertices }
    }

    pub fn distance_to_point(&self, point: &Point2D) -> f64 {
        if self.contains(point, 0.0) {
            return 0.0;
        }
        let mut min = f64::INFINITY;
        for i in 0..self.vertices.len() {
            let a = &self.vertices[i];
            let b = &self.vertices[(i + 1) % self.vertices.len()];
            min = min.min(point_to_segment_distance(point, a, b));
        }
        min
    }
}

/// Cross product of (b - a) x (p - a)
pub fn cross(a: &Point2D, b: &Point2D, p: &Point2D) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Intersection of the infinite lines through (p1, p2) and (p3, p4)
fn line_intersection(p1: &Point2D, p2: &Point2D, p3: &Point2D, p4: &Point2D) -> Option<Point2D> {
    let denominator = (p1.x - p2.x) * (p3.y - p4.y) - (p1.y - p2.y) * (p3.x - p4.x);
    if denominator.abs() < 1e-12 {
        return None;
    }
    let t = ((p1.x - p3.x) * (p3.y - p4.y) - (p1.y - p3.y) * (p3.x - p4.x)) / denominator;
    Some(Point2D::new(p1.x + t * (p2.x - p1.x), p1.y + t * (p2.y - p1.y)))
}

/// Proper segment-segment intersection test. Shared endpoints do not count
/// as intersections, so adjacent boundary edges stay mutually visible.
pub fn segments_intersect(p1: &Point2D, p2: &Point2D, q1: &Point2D, q2: &Point2D) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    false
}

pub fn point_to_segment_distance(p: &Point2D, a: &Point2D, b: &Point2D) -> f64 {
    let length_squared = a.distance_squared(b);
    if length_squared < 1e-12 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * (b.x - a.x) + (p.y - a.y) * (b.y - a.y)) / length_squared).clamp(0.0, 1.0);
    let projection = Point2D::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y));
    p.distance(&projection)
}

/// Even-odd containment test for a simple (possibly concave) polygon ring
pub fn point_in_polygon(point: &Point2D, ring: &[Point2D]) -> bool {
    let n = ring.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[j];
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = a.x + (point.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if point.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_of_square_with_interior_point() {
        let points = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 1.0),
            Point2D::new(0.5, 0.5),
        ];
        let polygon = ConvexPolygon2D::from_points(&points);
        assert_eq!(polygon.num_vertices(), 4);
        assert!((polygon.area() - 1.0).abs() < 1e-10);
    }

    #[test]
    fn test_rectangle_area_and_containment() {
        let foot = ConvexPolygon2D::rectangle(0.22, 0.11);
        assert!((foot.area() - 0.22 * 0.11).abs() < 1e-10);
        assert!(foot.contains(&Point2D::new(0.1, 0.05), 1e-7));
        assert!(!foot.contains(&Point2D::new(0.2, 0.0), 1e-7));
    }

    #[test]
    fn test_intersection_of_offset_squares() {
        let a = ConvexPolygon2D::rectangle(2.0, 2.0);
        let b = a.rotated_translated(0.0, 1.0, 1.0);
        let overlap = a.intersection(&b);
        assert!((overlap.area() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_intersection_disjoint_is_empty() {
        let a = ConvexPolygon2D::rectangle(1.0, 1.0);
        let b = a.rotated_translated(0.0, 5.0, 0.0);
        assert!(a.intersection(&b).is_empty());
    }

    #[test]
    fn test_segments_intersect() {
        let p1 = Point2D::new(0.0, 0.0);
        let p2 = Point2D::new(1.0, 1.0);
        let q1 = Point2D::new(0.0, 1.0);
        let q2 = Point2D::new(1.0, 0.0);
        assert!(segments_intersect(&p1, &p2, &q1, &q2));
        assert!(!segments_intersect(&p1, &p2, &Point2D::new(2.0, 0.0), &Point2D::new(3.0, 0.0)));
    }

    #[test]
    fn test_point_in_concave_ring() {
        // L-shaped ring
        let ring = vec![
            Point2D::new(0.0, 0.0),
            Point2D::new(2.0, 0.0),
            Point2D::new(2.0, 1.0),
            Point2D::new(1.0, 1.0),
            Point2D::new(1.0, 2.0),
            Point2D::new(0.0, 2.0),
        ];
        assert!(point_in_polygon(&Point2D::new(0.5, 0.5), &ring));
        assert!(!point_in_polygon(&Point2D::new(1.5, 1.5), &ring));
    }
}
