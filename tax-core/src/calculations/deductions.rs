//! Caps claimed deductions against a canton's limits.
//!
//! Categories are evaluated in a fixed order because the last two depend on
//! what came before:
//!
//! 1. Flat and status-dependent caps: pillar 3a, insurance premiums,
//!    professional expenses, childcare, training, mortgage interest. The
//!    mortgage cap is asset income plus a flat allowance.
//! 2. Uncapped: alimony, other.
//! 3. Medical expenses, deductible above a franchise that is a percentage
//!    of net income after step 1 and 2.
//! 4. Donations, capped at a percentage of that income after medical.
//! 5. Personal and child allowances.
//!
//! Clamping never fails; the amount cut from each claim is reported as
//! `disallowed` on its line.

use rust_decimal::Decimal;

use crate::calculations::common::{floor_zero, percent_of, round_half_up};
use crate::models::{
    DeductionBreakdown, DeductionCategory, DeductionLimits, DeductionLine, EmploymentStatus,
    SocialContributions, TaxCalculationInput,
};

#[derive(Debug, Clone, Copy)]
pub struct DeductionAggregator<'a> {
    limits: &'a DeductionLimits,
}

impl<'a> DeductionAggregator<'a> {
    pub fn new(limits: &'a DeductionLimits) -> Self {
        Self { limits }
    }

    /// Builds the per-category breakdown for `input`, whose social
    /// contributions have already been computed.
    pub fn aggregate(
        &self,
        input: &TaxCalculationInput,
        social: &SocialContributions,
    ) -> DeductionBreakdown {
        let claimed = &input.deductions;
        let net_income = floor_zero(input.gross_income() - social.total);
        let net_salary = floor_zero(input.gross_salary - social.total);

        let mut lines = vec![
            line(
                DeductionCategory::Pillar3a,
                claimed.pillar_3a,
                self.limits.pillar_3a_cap(input.employment, net_income),
            ),
            line(
                DeductionCategory::InsurancePremiums,
                claimed.insurance_premiums,
                self.limits.insurance_cap(input.civil_status),
            ),
            self.professional_expenses(input, claimed.professional_expenses, net_salary),
            line(
                DeductionCategory::Childcare,
                claimed.childcare,
                self.limits.childcare_per_child * Decimal::from(input.children),
            ),
            line(
                DeductionCategory::Training,
                claimed.training,
                self.limits.training_max,
            ),
            line(
                DeductionCategory::MortgageInterest,
                claimed.mortgage_interest,
                floor_zero(input.asset_income) + self.limits.mortgage_interest_allowance,
            ),
            uncapped(DeductionCategory::Alimony, claimed.alimony),
            uncapped(DeductionCategory::Other, claimed.other),
        ];

        let before_medical: Decimal = lines.iter().map(|l| l.applied).sum();
        let remaining = floor_zero(net_income - before_medical);

        let medical = self.medical_expenses(claimed.medical_expenses, remaining);
        let donations_cap = round_half_up(percent_of(
            floor_zero(remaining - medical.applied),
            self.limits.donations_percent,
        ));
        let donations = line(DeductionCategory::Donations, claimed.donations, donations_cap);
        lines.push(medical);
        lines.push(donations);

        lines.push(uncapped(
            DeductionCategory::PersonalAllowance,
            self.limits.personal,
        ));
        lines.push(uncapped(
            DeductionCategory::ChildAllowance,
            self.limits.per_child * Decimal::from(input.children),
        ));

        let total = lines.iter().map(|l| l.applied).sum();
        DeductionBreakdown { lines, total }
    }

    /// Employees receive at least the flat allowance, a percentage of net
    /// salary clamped to `[min, max]`. Claims above the flat allowance are
    /// accepted up to `max`.
    fn professional_expenses(
        &self,
        input: &TaxCalculationInput,
        claimed: Decimal,
        net_salary: Decimal,
    ) -> DeductionLine {
        let max = self.limits.professional_expenses_max;

        if input.employment == EmploymentStatus::SelfEmployed || input.gross_salary.is_zero() {
            return line(DeductionCategory::ProfessionalExpenses, claimed, max);
        }

        let flat = round_half_up(percent_of(
            net_salary,
            self.limits.professional_expenses_percent,
        ))
        .max(self.limits.professional_expenses_min)
        .min(max);
        let applied = floor_zero(claimed).max(flat).min(max);

        DeductionLine {
            category: DeductionCategory::ProfessionalExpenses,
            claimed,
            applied,
            disallowed: floor_zero(claimed - applied),
        }
    }

    /// Only the part above the franchise is deductible.
    fn medical_expenses(
        &self,
        claimed: Decimal,
        income: Decimal,
    ) -> DeductionLine {
        let franchise = round_half_up(percent_of(income, self.limits.medical_franchise_percent));
        let applied = floor_zero(claimed - franchise);

        DeductionLine {
            category: DeductionCategory::MedicalExpenses,
            claimed,
            applied,
            disallowed: floor_zero(claimed - applied),
        }
    }
}

fn line(
    category: DeductionCategory,
    claimed: Decimal,
    cap: Decimal,
) -> DeductionLine {
    let applied = floor_zero(claimed).min(floor_zero(cap));
    DeductionLine {
        category,
        claimed,
        applied,
        disallowed: floor_zero(claimed - applied),
    }
}

fn uncapped(
    category: DeductionCategory,
    amount: Decimal,
) -> DeductionLine {
    let applied = floor_zero(amount);
    DeductionLine {
        category,
        claimed: amount,
        applied,
        disallowed: Decimal::ZERO,
    }
}
