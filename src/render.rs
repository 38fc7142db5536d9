// Render - draws entities onto a caller-supplied canvas
// The canvas is passed in explicitly; nothing here holds window or drawing state

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::physics_engine::{Entity, Point2, Vector2};

/// Pen colours: black body, red velocity, blue acceleration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pen {
    /// Entity body
    Black,
    /// Velocity line
    Red,
    /// Acceleration line
    Blue,
}

/// Minimal drawing surface in pixel coordinates, origin at the top-left
pub trait Canvas {
    /// Filled circle inscribed in the `diameter` square whose top-left corner is `(x, y)`
    fn fill_circle(&mut self, x: i32, y: i32, diameter: i32, pen: Pen);

    fn line(&mut self, from: (i32, i32), to: (i32, i32), pen: Pen);
}

/// Round half up to the nearest pixel
fn round_px(v: f64) -> i32 {
    (v + 0.5).floor() as i32
}

/// World-to-screen transform: the world origin sits at the canvas center
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub center_x: f64,
    pub center_y: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            center_x: (width / 2.0).floor(),
            center_y: (height / 2.0).floor(),
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        Self::new(config.width, config.height)
    }

    pub fn to_screen(&self, p: &Point2) -> (i32, i32) {
        (round_px(self.center_x + p.x), round_px(self.center_y + p.y))
    }
}

/// Body, then velocity line, then acceleration line for every entity
pub fn draw_entities<C: Canvas + ?Sized>(canvas: &mut C, entities: &[Entity], viewport: &Viewport) {
    for entity in entities {
        draw_position(canvas, entity, viewport);
        draw_vector(canvas, &entity.position, &entity.velocity, viewport, Pen::Red);
        draw_vector(canvas, &entity.position, &entity.acceleration, viewport, Pen::Blue);
    }
}

fn draw_position<C: Canvas + ?Sized>(canvas: &mut C, entity: &Entity, viewport: &Viewport) {
    // Offset from the true size; only the drawn diameter is held at one pixel
    let size = entity.mass.max(0.0).sqrt();
    let x = round_px(viewport.center_x + entity.position.x - size / 2.0);
    let y = round_px(viewport.center_y + entity.position.y - size / 2.0);
    canvas.fill_circle(x, y, round_px(size.max(1.0)), Pen::Black);
}

fn draw_vector<C: Canvas + ?Sized>(
    canvas: &mut C,
    origin: &Point2,
    v: &Vector2,
    viewport: &Viewport,
    pen: Pen,
) {
    let from = viewport.to_screen(origin);
    let to = viewport.to_screen(&origin.add(v));
    canvas.line(from, to, pen);
}

// =============================================================================
// TESTS
// =============================================================================
