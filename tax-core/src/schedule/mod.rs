//! Tax tables, behind a read-only repository trait.

mod memory;
mod repository;

pub use memory::InMemorySchedules;
pub use repository::{
    MunicipalMultiplier, ScheduleError, TaxScheduleRepository, resolve_municipal_multiplier,
};

#[cfg(test)]
pub(crate) mod fixtures;
