use rust_decimal::Decimal;
use thiserror::Error;
use tracing::warn;

use crate::calculations::BracketError;
use crate::models::{CantonTaxData, FederalTaxData};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unknown canton '{0}'")]
    UnknownCanton(String),

    #[error("canton '{0}' appears more than once")]
    DuplicateCanton(String),

    #[error("canton '{0}' has no municipalities")]
    NoMunicipalities(String),

    #[error("invalid {table} table: {source}")]
    InvalidTable {
        table: String,
        #[source]
        source: BracketError,
    },
}

/// Read-only access to the tax tables of one tax year.
pub trait TaxScheduleRepository: Send + Sync {
    fn tax_year(&self) -> i32;

    fn federal(&self) -> &FederalTaxData;

    /// Looks up a canton by its two-letter code, ignoring case.
    fn canton(&self, code: &str) -> Result<&CantonTaxData, ScheduleError>;

    /// Every known canton code, sorted.
    fn canton_codes(&self) -> Vec<&str>;
}

/// Communal multiplier chosen for a calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MunicipalMultiplier {
    pub multiplier: Decimal,
    pub fallback_used: bool,
}

/// Finds the municipality's multiplier, or falls back to `fallback` with a
/// warning when the canton has no municipality of that name.
pub fn resolve_municipal_multiplier(
    canton: &CantonTaxData,
    municipality: &str,
    fallback: Decimal,
) -> MunicipalMultiplier {
    match canton.municipality(municipality) {
        Some(m) => MunicipalMultiplier {
            multiplier: m.multiplier,
            fallback_used: false,
        },
        None => {
            warn!(
                canton = %canton.code,
                municipality = %municipality.trim(),
                fallback_multiplier = %fallback,
                "municipality not found, using fallback multiplier"
            );
            MunicipalMultiplier {
                multiplier: fallback,
                fallback_used: true,
            }
        }
    }
}
