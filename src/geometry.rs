//! Minimal vector math and the four cardinal movement axes.
//!
//! World convention: `y` is altitude, north is `-z`, yaw 0 faces north and
//! increases counter-clockwise seen from above (yaw π/2 faces west).

use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Names one component of a [`Vec3`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coord {
    X,
    Y,
    Z,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, coord: Coord) -> f64 {
        match coord {
            Coord::X => self.x,
            Coord::Y => self.y,
            Coord::Z => self.z,
        }
    }

    pub fn set(&mut self, coord: Coord, value: f64) {
        match coord {
            Coord::X => self.x = value,
            Coord::Y => self.y = value,
            Coord::Z => self.z = value,
        }
    }

    pub fn dot(&self, other: Vec3) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn dot_xz(&self, other: Vec3) -> f64 {
        self.x * other.x + self.z * other.z
    }

    pub fn distance_squared(&self, other: Vec3) -> f64 {
        let d = *self - other;
        d.dot(d)
    }

    pub fn distance(&self, other: Vec3) -> f64 {
        self.distance_squared(other).sqrt()
    }

    pub fn xz_norm_squared(&self) -> f64 {
        self.x * self.x + self.z * self.z
    }

    pub fn xz_norm(&self) -> f64 {
        self.xz_norm_squared().sqrt()
    }

    /// Horizontal distance, ignoring altitude.
    pub fn xz_distance(&self, other: Vec3) -> f64 {
        (*self - other).xz_norm()
    }

    pub fn with_y(self, y: f64) -> Self {
        Self { y, ..self }
    }

    /// Copy x and z from `other`, keeping own altitude.
    pub fn with_xz_of(self, other: Vec3) -> Self {
        Self {
            x: other.x,
            z: other.z,
            ..self
        }
    }

    /// Move x and z to the centre of the containing block.
    pub fn centralize_xz(self) -> Self {
        Self {
            x: self.x.floor() + 0.5,
            z: self.z.floor() + 0.5,
            ..self
        }
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Vec3;

    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f64> for Vec3 {
    type Output = Vec3;

    fn mul(self, k: f64) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.z)
    }
}

/// Yaw that faces along the horizontal direction `(dx, dz)`.
pub fn yaw_towards(dx: f64, dz: f64) -> f64 {
    (-dx).atan2(-dz)
}

/// Horizontal unit direction for a yaw angle.
pub fn heading(yaw: f64) -> Vec3 {
    Vec3::new(-yaw.sin(), 0.0, -yaw.cos())
}

/// One of the four horizontal cardinal directions.
///
/// The discriminant is the axis index; yaw is `index * π/2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    North = 0,
    West = 1,
    South = 2,
    East = 3,
}

const AXIS_UNIT: [Vec3; 4] = [
    Vec3::new(0.0, 0.0, -1.0),
    Vec3::new(-1.0, 0.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
    Vec3::new(1.0, 0.0, 0.0),
];

impl Axis {
    pub const ALL: [Axis; 4] = [Axis::North, Axis::West, Axis::South, Axis::East];

    pub fn from_index(index: u8) -> Result<Self> {
        Self::ALL
            .get(index as usize)
            .copied()
            .ok_or_else(|| Error::argument(format!("axis index out of range: {}", index)))
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn unit(self) -> Vec3 {
        AXIS_UNIT[self.index()]
    }

    pub fn yaw(self) -> f64 {
        self.index() as f64 * FRAC_PI_2
    }

    /// Coordinate that must not change while travelling along this axis.
    pub fn stable_coord(self) -> Coord {
        match self {
            Axis::North | Axis::South => Coord::X,
            Axis::West | Axis::East => Coord::Z,
        }
    }

    pub fn opposite(self) -> Self {
        Self::ALL[(self.index() + 2) % 4]
    }
}

impl FromStr for Axis {
    type Err = Error;

    /// Accepts `-Z`/`NORTH`/`0`, `-X`/`WEST`/`1`, `+Z`/`SOUTH`/`2`,
    /// `+X`/`EAST`/`3` (case-insensitive).
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "-Z" | "NORTH" | "0" => Ok(Axis::North),
            "-X" | "WEST" | "1" => Ok(Axis::West),
            "+Z" | "SOUTH" | "2" => Ok(Axis::South),
            "+X" | "EAST" | "3" => Ok(Axis::East),
            other => Err(Error::argument(format!("unknown axis: {}", other))),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::North => "north",
            Axis::West => "west",
            Axis::South => "south",
            Axis::East => "east",
        };
        write!(f, "{}", name)
    }
}

/// Normalize an angle to `(-π, π]`.
pub fn wrap_angle(a: f64) -> f64 {
    let mut a = a % (2.0 * PI);
    if a <= -PI {
        a += 2.0 * PI;
    } else if a > PI {
        a -= 2.0 * PI;
    }
    a
}
