//! Common value types used throughout the footstep planner.

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector2, Vector3};

/// 2D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn distance(&self, other: &Point2D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn distance_squared(&self, other: &Point2D) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2)
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Linear interpolation towards `other`, alpha in [0, 1]
    pub fn interpolate(&self, other: &Point2D, alpha: f64) -> Point2D {
        Point2D::new(
            self.x + alpha * (other.x - self.x),
            self.y + alpha * (other.y - self.y),
        )
    }
}

impl From<(f64, f64)> for Point2D {
    fn from(tuple: (f64, f64)) -> Self {
        Self { x: tuple.0, y: tuple.1 }
    }
}

impl From<Vector2<f64>> for Point2D {
    fn from(v: Vector2<f64>) -> Self {
        Self { x: v[0], y: v[1] }
    }
}

/// 3D point representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point3D {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3D {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    pub fn distance(&self, other: &Point3D) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: &Point3D) -> f64 {
        (self.x - other.x).powi(2) + (self.y - other.y).powi(2) + (self.z - other.z).powi(2)
    }

    pub fn distance_xy(&self, other: &Point3D) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn to_point_2d(&self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    pub fn interpolate(&self, other: &Point3D, alpha: f64) -> Point3D {
        Point3D::new(
            self.x + alpha * (other.x - self.x),
            self.y + alpha * (other.y - self.y),
            self.z + alpha * (other.z - self.z),
        )
    }
}

impl From<Vector3<f64>> for Point3D {
    fn from(v: Vector3<f64>) -> Self {
        Self { x: v[0], y: v[1], z: v[2] }
    }
}

/// 3D pose (position + orientation)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose3D {
    pub position: Point3D,
    pub orientation: UnitQuaternion<f64>,
}

impl Pose3D {
    pub fn new(position: Point3D, orientation: UnitQuaternion<f64>) -> Self {
        Self { position, orientation }
    }

    pub fn identity() -> Self {
        Self {
            position: Point3D::origin(),
            orientation: UnitQuaternion::identity(),
        }
    }

    /// Pose in the ground plane: position (x, y, z) plus a yaw rotation
    pub fn from_xyz_yaw(x: f64, y: f64, z: f64, yaw: f64) -> Self {
        Self {
            position: Point3D::new(x, y, z),
            orientation: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw),
        }
    }

    pub fn yaw(&self) -> f64 {
        self.orientation.euler_angles().2
    }

    pub fn distance_xy(&self, other: &Pose3D) -> f64 {
        self.position.distance_xy(&other.position)
    }

    /// Interpolates position linearly and orientation by slerp, alpha in [0, 1].
    /// Used to compute mid-foot poses from left/right foot poses.
    pub fn interpolate(&self, other: &Pose3D, alpha: f64) -> Pose3D {
        let orientation = self
            .orientation
            .slerp(&other.orientation, alpha);
        Pose3D {
            position: self.position.interpolate(&other.position, alpha),
            orientation,
        }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(self.position.x, self.position.y, self.position.z),
            self.orientation,
        )
    }

    pub fn from_isometry(isometry: &Isometry3<f64>) -> Self {
        Self {
            position: Point3D::new(
                isometry.translation.x,
                isometry.translation.y,
                isometry.translation.z,
            ),
            orientation: isometry.rotation,
        }
    }
}

/// Which foot a footstep belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RobotSide {
    Left,
    Right,
}

impl RobotSide {
    pub const BOTH: [RobotSide; 2] = [RobotSide::Left, RobotSide::Right];

    pub fn opposite(&self) -> RobotSide {
        match self {
            RobotSide::Left => RobotSide::Right,
            RobotSide::Right => RobotSide::Left,
        }
    }

    /// +1 for left, -1 for right. Used to mirror lateral offsets.
    pub fn sign(&self) -> f64 {
        match self {
            RobotSide::Left => 1.0,
            RobotSide::Right => -1.0,
        }
    }
}

/// Pair container holding one value per robot side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SideDependent<T> {
    pub left: T,
    pub right: T,
}

impl<T> SideDependent<T> {
    pub fn new(left: T, right: T) -> Self {
        Self { left, right }
    }

    pub fn get(&self, side: RobotSide) -> &T {
        match side {
            RobotSide::Left => &self.left,
            RobotSide::Right => &self.right,
        }
    }

    pub fn get_mut(&mut self, side: RobotSide) -> &mut T {
        match side {
            RobotSide::Left => &mut self.left,
            RobotSide::Right => &mut self.right,
        }
    }
}

impl<T: Clone> SideDependent<T> {
    pub fn both(value: T) -> Self {
        Self { left: value.clone(), right: value }
    }
}

/// Normalize an angle to [-pi, pi]
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle % (2.0 * std::f64::consts::PI);
    if a > std::f64::consts::PI {
        a -= 2.0 * std::f64::consts::PI;
    } else if a < -std::f64::consts::PI {
        a += 2.0 * std::f64::consts::PI;
    }
    a
}

/// Shortest signed angular difference `a - b`, in [-pi, pi]
pub fn angle_difference(a: f64, b: f64) -> f64 {
    normalize_angle(a - b)
}
