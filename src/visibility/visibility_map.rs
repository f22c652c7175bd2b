//! Visibility map graph structures.

use std::collections::HashSet;

use crate::common::Point3D;
use crate::visibility::connection::{Connection, ConnectionPoint3D};

/// A set of line-of-sight connections; the vertex set is derived lazily
/// from the connections
#[derive(Debug, Clone, Default)]
pub struct VisibilityMap {
    connections: Vec<Connection>,
    vertices: Option<HashSet<ConnectionPoint3D>>,
}

impl VisibilityMap {
    pub fn new(connections: Vec<Connection>) -> Self {
        Self { connections, vertices: None }
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
        self.vertices = None;
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Computes and caches the vertex set
    pub fn compute_vertices(&mut self) -> &HashSet<ConnectionPoint3D> {
        let connections = &self.connections;
        self.vertices.get_or_insert_with(|| {
            let mut vertices = HashSet::new();
            for connection in connections {
                vertices.insert(connection.source);
                vertices.insert(connection.target);
            }
            vertices
        })
    }

    /// Vertex set without caching, for read-only access
    pub fn vertices(&self) -> HashSet<ConnectionPoint3D> {
        match &self.vertices {
            Some(v) => v.clone(),
            None => {
                let mut vertices = HashSet::new();
                for connection in &self.connections {
                    vertices.insert(connection.source);
                    vertices.insert(connection.target);
                }
                vertices
            }
        }
    }

    /// Connection whose segment is nearest to the given point
    pub fn closest_connection(&self, point: &Point3D) -> Option<(Connection, f64)> {
        self.connections
            .iter()
            .map(|c| (*c, c.distance_squared_to_point(point)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Joins the local maps of all navigable regions with cross-region
/// connections that passed the inter-region connection filter
#[derive(Debug, Clone, Default)]
pub struct InterRegionVisibilityMap {
    map: VisibilityMap,
}

impl InterRegionVisibilityMap {
    pub fn add_connection(&mut self, source: ConnectionPoint3D, target: ConnectionPoint3D) {
        self.map.add_connection(Connection::new(source, target));
    }

    pub fn visibility_map(&self) -> &VisibilityMap {
        &self.map
    }
}

/// Visibility map connecting one arbitrary point (start or goal) into the
/// rest of the graph
#[derive(Debug, Clone)]
pub struct SingleSourceVisibilityMap {
    pub source: ConnectionPoint3D,
    pub connections: Vec<Connection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertices_derived_from_connections() {
        let a = ConnectionPoint3D::new(Point3D::new(0.0, 0.0, 0.0), 1);
        let b = ConnectionPoint3D::new(Point3D::new(1.0, 0.0, 0.0), 1);
        let c = ConnectionPoint3D::new(Point3D::new(1.0, 1.0, 0.0), 1);
        let mut map = VisibilityMap::new(vec![Connection::new(a, b), Connection::new(b, c)]);
        assert_eq!(map.compute_vertices().len(), 3);
    }

    #[test]
    fn test_closest_connection() {
        let a = ConnectionPoint3D::new(Point3D::new(0.0, 0.0, 0.0), 1);
        let b = ConnectionPoint3D::new(Point3D::new(2.0, 0.0, 0.0), 1);
        let c = ConnectionPoint3D::new(Point3D::new(0.0, 5.0, 0.0), 1);
        let d = ConnectionPoint3D::new(Point3D::new(2.0, 5.0, 0.0), 1);
        let map = VisibilityMap::new(vec![Connection::new(a, b), Connection::new(c, d)]);
        let (closest, distance_squared) = map.closest_connection(&Point3D::new(1.0, 1.0, 0.0)).unwrap();
        assert!(closest.epsilon_equals(&Connection::new(a, b), 1e-9));
        assert!((distance_squared - 1.0).abs() < 1e-9);
    }
}
