use std::sync::OnceLock;

use tax_core::InMemorySchedules;

use crate::loader::{ScheduleLoader, ScheduleLoaderError, ScheduleSources};

pub const BUILTIN_TAX_YEAR: i32 = 2025;

static BUILTIN: OnceLock<Result<InMemorySchedules, ScheduleLoaderError>> = OnceLock::new();

/// The 2025 schedules compiled into the binary, parsed and validated on
/// first use and shared for the rest of the process.
pub fn builtin() -> Result<&'static InMemorySchedules, &'static ScheduleLoaderError> {
    BUILTIN
        .get_or_init(|| {
            ScheduleLoader::from_sources(ScheduleSources {
                federal: include_str!("../data/2025/federal.csv").as_bytes(),
                federal_meta: include_str!("../data/2025/federal_meta.csv").as_bytes(),
                cantons: include_str!("../data/2025/cantons.csv").as_bytes(),
                income_brackets: include_str!("../data/2025/income_brackets.csv").as_bytes(),
                wealth_brackets: include_str!("../data/2025/wealth_brackets.csv").as_bytes(),
                municipalities: include_str!("../data/2025/municipalities.csv").as_bytes(),
            })
        })
        .as_ref()
}
