//! Swiss tax schedules for tax year 2025 and the CSV loader that reads
//! them.

mod builtin;
mod loader;

pub use builtin::{BUILTIN_TAX_YEAR, builtin};
pub use loader::{
    BracketRecord, CANTONS_FILE, CantonRecord, FEDERAL_FILE, FEDERAL_META_FILE,
    FederalMetaRecord, INCOME_BRACKETS_FILE, IncomeBracketRecord, MUNICIPALITIES_FILE,
    MunicipalityRecord, ScheduleLoader, ScheduleLoaderError, ScheduleSources,
    WEALTH_BRACKETS_FILE, WealthBracketRecord,
};
