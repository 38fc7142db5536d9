// Gravsim - 2D Newtonian gravity sandbox
// Library entry point shared by the headless runner and any UI shell

pub mod config;
pub mod physics_engine;
pub mod records;
pub mod render;
pub mod state_manager;

pub use config::{ConfigError, SimulationConfig};
pub use physics_engine::{step, Bounds, Entity, Point2, StepParams, Vector2};
pub use records::{parse_records, split_rows, ParsedRecords, RecordError};
pub use render::{draw_entities, Canvas, Pen, Viewport};
pub use state_manager::{AppState, AutoTicker, FrontendEntity, FrontendState, SimulationState};
