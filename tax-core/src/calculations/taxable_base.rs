use rust_decimal::Decimal;

use crate::calculations::common::floor_zero;
use crate::models::{DeductionLimits, SocialContributions, TaxCalculationInput};

/// Income and wealth that the bracket tables are applied to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxableBase {
    pub gross_income: Decimal,
    pub net_income: Decimal,
    pub taxable_income: Decimal,
    pub taxable_wealth: Decimal,
}

/// Reduces gross income and wealth to their taxable amounts. Both are
/// floored at zero.
pub fn taxable_base(
    input: &TaxCalculationInput,
    social: &SocialContributions,
    total_deductions: Decimal,
    limits: &DeductionLimits,
) -> TaxableBase {
    let gross_income = input.gross_income();
    let net_income = gross_income - social.total;

    let franchise = limits.wealth_franchise(input.civil_status);
    let taxable_wealth = floor_zero(input.gross_wealth - input.debts - franchise);

    TaxableBase {
        gross_income,
        net_income,
        taxable_income: floor_zero(net_income - total_deductions),
        taxable_wealth,
    }
}
