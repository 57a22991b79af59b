pub mod calculations;
pub mod engine;
pub mod models;
pub mod schedule;

pub use engine::{CalculationError, ConfigError, EngineConfig, TaxEngine};
pub use models::*;
pub use schedule::{InMemorySchedules, ScheduleError, TaxScheduleRepository};
