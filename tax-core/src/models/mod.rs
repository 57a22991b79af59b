mod canton;
mod civil_status;
mod optimization;
mod tax_bracket;
mod tax_input;
mod tax_result;

pub use canton::{CantonTaxData, DeductionLimits, FederalTaxData, IncomeTariffs, Municipality};
pub use civil_status::{CivilStatus, Confession, EmploymentStatus};
pub use optimization::{OptimizationSuggestion, Priority, SuggestionKind};
pub use tax_bracket::{ProgressiveBracket, TaxBracket, WealthTaxBracket};
pub use tax_input::{ClaimedDeductions, InputUpdate, InputUpdateError, TaxCalculationInput};
pub use tax_result::{
    BracketTrace, CalculationDetails, CalculationWarning, CantonComparison, DeductionBreakdown,
    DeductionCategory, DeductionLine, SocialContributions, TaxBreakdown, TaxCalculationResult,
    TaxRates,
};
