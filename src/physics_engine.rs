// Physics Engine - Planar N-Body Gravity
// Implements 2D vector/point algebra, pairwise gravity, semi-implicit Euler and wall bounces

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// SIMULATION CONSTANTS
// =============================================================================

/// Gravitational constant tuned so that small masses react on a seconds
/// timescale at pixel range. Not physically accurate.
pub const G: f64 = 6.67834e2;

/// Fraction of velocity retained after bouncing off an arena wall
pub const DEFAULT_DAMPING: f64 = 0.7;

/// Simulated seconds advanced per tick
pub const DEFAULT_DT: f64 = 0.01;

/// Default arena size in world units (centered at the origin)
pub const DEFAULT_WIDTH: f64 = 640.0;
pub const DEFAULT_HEIGHT: f64 = 640.0;

/// Pairs closer than this exert no force on each other
pub const MIN_DISTANCE: f64 = 1e-10;

/// Vectors shorter than this normalize to zero
const MIN_LENGTH: f64 = 1e-15;

// =============================================================================
// 2D VECTOR MATHEMATICS
// =============================================================================

/// A relative quantity: displacement, velocity or acceleration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vector2 {
    pub x: f64,
    pub y: f64,
}

impl Vector2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn add(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn sub(&self, other: &Vector2) -> Vector2 {
        Vector2 {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }

    pub fn scale(&self, s: f64) -> Self {
        Self {
            x: self.x * s,
            y: self.y * s,
        }
    }

    pub fn dot(&self, other: &Vector2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Unit vector in the same direction, or the zero vector when the
    /// length is too small to divide by.
    pub fn normalize(&self) -> Self {
        let len = self.length();
        if len > MIN_LENGTH {
            self.scale(1.0 / len)
        } else {
            Self::zero()
        }
    }

    /// Counterclockwise rotation by `radians`
    pub fn rotate(&self, radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            x: self.x * cos - self.y * sin,
            y: self.x * sin + self.y * cos,
        }
    }

    pub fn invert_x(&self) -> Self {
        Self {
            x: negate(self.x),
            y: self.y,
        }
    }

    pub fn invert_y(&self) -> Self {
        Self {
            x: self.x,
            y: negate(self.y),
        }
    }

    pub fn invert(&self) -> Self {
        Self {
            x: negate(self.x),
            y: negate(self.y),
        }
    }
}

/// Negation that never yields IEEE 754 negative zero
fn negate(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        -value
    }
}

impl fmt::Display for Vector2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector2 {{ x: {}, y: {} }}", self.x, self.y)
    }
}

// =============================================================================
// 2D POINT (absolute position)
// =============================================================================

/// An absolute position. Only a `Vector2` can move it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

impl Point2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn origin() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    pub fn add(&self, v: &Vector2) -> Point2 {
        Point2 {
            x: self.x + v.x,
            y: self.y + v.y,
        }
    }

    pub fn sub(&self, v: &Vector2) -> Point2 {
        Point2 {
            x: self.x - v.x,
            y: self.y - v.y,
        }
    }

    /// Vector pointing from `self` to `other`
    pub fn displacement_vector(&self, other: &Point2) -> Vector2 {
        Vector2 {
            x: other.x - self.x,
            y: other.y - self.y,
        }
    }

    pub fn distance(&self, other: &Point2) -> f64 {
        self.displacement_vector(other).length()
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Point2 {{ x: {}, y: {} }}", self.x, self.y)
    }
}

// =============================================================================
// ENTITY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub mass: f64,
    pub position: Point2,
    pub velocity: Vector2,
    pub acceleration: Vector2,
}

impl Entity {
    pub fn new(mass: f64, position: Point2, velocity: Vector2, acceleration: Vector2) -> Self {
        Self {
            mass,
            position,
            velocity,
            acceleration,
        }
    }

    /// Build from the flat `(mass, px, py, vx, vy, ax, ay)` record layout
    pub fn from_fields(fields: [f64; 7]) -> Self {
        let [mass, px, py, vx, vy, ax, ay] = fields;
        Self::new(
            mass,
            Point2::new(px, py),
            Vector2::new(vx, vy),
            Vector2::new(ax, ay),
        )
    }

    pub fn distance(&self, other: &Entity) -> f64 {
        self.position.distance(&other.position)
    }

    /// Magnitude of the attraction between two entities: F = g * m1 * m2 / r².
    /// Returns 0 for pairs closer than `MIN_DISTANCE`.
    pub fn gravitational_force(&self, other: &Entity, g: f64) -> f64 {
        let r = self.distance(other);
        if r < MIN_DISTANCE {
            return 0.0;
        }
        g * (self.mass * other.mass) / (r * r)
    }

    /// Sum of the accelerations every other entity in `snapshot` exerts on
    /// this one. `self_index` is this entity's slot in the snapshot; it is
    /// skipped by index, never by comparing values.
    ///
    /// Each term is `g * m_other / r²`, so this entity's own mass never enters
    /// the product. A term that would leave the running sum non-finite is
    /// skipped, the same as a pair closer than `MIN_DISTANCE`.
    pub fn gravitational_acceleration(&self, self_index: usize, snapshot: &[Entity], g: f64) -> Vector2 {
        let mut total_accel = Vector2::zero();

        // a = F / m, undefined for non-positive mass
        if !(self.mass > 0.0) {
            return total_accel;
        }

        for (j, other) in snapshot.iter().enumerate() {
            if j == self_index {
                continue;
            }

            let r = self.distance(other);
            if r < MIN_DISTANCE {
                continue;
            }

            let accel_mag = g * other.mass / (r * r);
            if accel_mag == 0.0 || !accel_mag.is_finite() {
                continue;
            }

            let direction = self.position.displacement_vector(&other.position).normalize();
            let next = total_accel.add(&direction.scale(accel_mag));
            if next.is_finite() {
                total_accel = next;
            }
        }

        total_accel
    }

    /// Replace the current acceleration with the one exerted by `snapshot`
    pub fn update_gravitational_acceleration(&mut self, self_index: usize, snapshot: &[Entity], g: f64) {
        self.acceleration = self.gravitational_acceleration(self_index, snapshot, g);
    }

    /// Semi-implicit Euler step: position moves with the pre-step velocity,
    /// then velocity picks up the current acceleration.
    pub fn update(&mut self, dt: f64) {
        self.position = self.position.add(&self.velocity.scale(dt));
        self.velocity = self.velocity.add(&self.acceleration.scale(dt));
    }

    pub fn kinetic_energy(&self) -> f64 {
        let v = self.velocity.length();
        0.5 * self.mass * v * v
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Entity {{ mass: {}, position: {}, velocity: {}, acceleration: {} }}",
            self.mass, self.position, self.velocity, self.acceleration
        )
    }
}

// =============================================================================
// ARENA BOUNDS (wall reflection)
// =============================================================================

/// Axis-aligned arena centered at the origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub half_width: f64,
    pub half_height: f64,
}

impl Bounds {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            half_width: width / 2.0,
            half_height: height / 2.0,
        }
    }

    /// Bounce `entity` off any wall it has crossed while still moving
    /// outward. Each axis flips its own component and damps the whole
    /// velocity, so a corner strike damps twice.
    pub fn reflect(&self, entity: &mut Entity, damping: f64) {
        let p = entity.position;

        if (p.x < -self.half_width && entity.velocity.x < 0.0)
            || (p.x > self.half_width && entity.velocity.x > 0.0)
        {
            entity.velocity = entity.velocity.invert_x().scale(damping);
        }

        if (p.y < -self.half_height && entity.velocity.y < 0.0)
            || (p.y > self.half_height && entity.velocity.y > 0.0)
        {
            entity.velocity = entity.velocity.invert_y().scale(damping);
        }
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT)
    }
}

// =============================================================================
// STEP DRIVER
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepParams {
    /// Simulated seconds per tick
    pub dt: f64,
    pub bounds: Bounds,
    pub damping: f64,
    /// Gravitational constant
    pub g: f64,
}

impl Default for StepParams {
    fn default() -> Self {
        Self {
            dt: DEFAULT_DT,
            bounds: Bounds::default(),
            damping: DEFAULT_DAMPING,
            g: G,
        }
    }
}

/// Advance every entity by one tick.
///
/// All accelerations are computed from a copy of the pre-tick state, so the
/// result does not depend on iteration order. Then each entity is bounced off
/// the walls and integrated.
pub fn step(entities: &mut [Entity], params: &StepParams) {
    let snapshot = entities.to_vec();

    for (i, entity) in entities.iter_mut().enumerate() {
        entity.update_gravitational_acceleration(i, &snapshot, params.g);
    }

    for entity in entities.iter_mut() {
        params.bounds.reflect(entity, params.damping);
        entity.update(params.dt);
    }
}

// =============================================================================
// DIAGNOSTICS (for drift monitoring)
// =============================================================================

/// Kinetic plus pairwise potential energy. Coincident pairs are left out.
pub fn total_energy(entities: &[Entity], g: f64) -> f64 {
    let kinetic: f64 = entities.iter().map(Entity::kinetic_energy).sum();

    let mut potential = 0.0;
    for i in 0..entities.len() {
        for j in (i + 1)..entities.len() {
            let r = entities[i].distance(&entities[j]);
            if r >= MIN_DISTANCE {
                potential -= g * entities[i].mass * entities[j].mass / r;
            }
        }
    }

    kinetic + potential
}

/// Mass-weighted mean position, or `None` when the total mass is not positive
pub fn center_of_mass(entities: &[Entity]) -> Option<Point2> {
    let total_mass: f64 = entities.iter().map(|e| e.mass).sum();
    if !(total_mass > 0.0) {
        return None;
    }

    let (sx, sy) = entities.iter().fold((0.0, 0.0), |(sx, sy), e| {
        (sx + e.mass * e.position.x, sy + e.mass * e.position.y)
    });

    Some(Point2::new(sx / total_mass, sy / total_mass))
}

// =============================================================================
// TESTS
// =============================================================================
