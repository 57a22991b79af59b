use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::CivilStatus;

/// Mandatory employee-side social insurance contributions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialContributions {
    /// AHV/AI/APG.
    pub old_age_insurance: Decimal,
    /// ALV, capped at the insured wage ceiling.
    pub unemployment_insurance: Decimal,
    /// BVG employee share on the coordinated salary.
    pub occupational_pension: Decimal,
    /// Non-occupational accident insurance.
    pub accident_insurance: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeductionCategory {
    Pillar3a,
    InsurancePremiums,
    ProfessionalExpenses,
    Childcare,
    Training,
    MortgageInterest,
    Alimony,
    Other,
    MedicalExpenses,
    Donations,
    PersonalAllowance,
    ChildAllowance,
}

impl DeductionCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pillar3a => "Pillar 3a",
            Self::InsurancePremiums => "Insurance premiums",
            Self::ProfessionalExpenses => "Professional expenses",
            Self::Childcare => "Childcare",
            Self::Training => "Training",
            Self::MortgageInterest => "Mortgage interest",
            Self::Alimony => "Alimony",
            Self::Other => "Other deductions",
            Self::MedicalExpenses => "Medical expenses",
            Self::Donations => "Donations",
            Self::PersonalAllowance => "Personal allowance",
            Self::ChildAllowance => "Child allowance",
        }
    }
}

/// Claimed versus allowed amount for one deduction category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionLine {
    pub category: DeductionCategory,
    pub claimed: Decimal,
    pub applied: Decimal,
    /// `claimed - applied` when positive.
    pub disallowed: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionBreakdown {
    pub lines: Vec<DeductionLine>,
    pub total: Decimal,
}

impl DeductionBreakdown {
    pub fn line(
        &self,
        category: DeductionCategory,
    ) -> Option<&DeductionLine> {
        self.lines.iter().find(|l| l.category == category)
    }

    pub fn applied(
        &self,
        category: DeductionCategory,
    ) -> Decimal {
        self.line(category).map_or(Decimal::ZERO, |l| l.applied)
    }

    pub fn total_disallowed(&self) -> Decimal {
        self.lines.iter().map(|l| l.disallowed).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub federal: Decimal,
    pub cantonal: Decimal,
    pub communal: Decimal,
    /// Zero unless a recognised confession was declared.
    pub confessional: Decimal,
    pub wealth: Decimal,
    pub total: Decimal,
}

impl TaxBreakdown {
    /// Total minus wealth tax.
    pub fn income_taxes(&self) -> Decimal {
        self.total - self.wealth
    }
}

/// Rates in percent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRates {
    pub effective_rate: Decimal,
    pub marginal_rate: Decimal,
}

/// The tranche the bracket engine applied to `amount`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketTrace {
    pub amount: Decimal,
    pub from: Decimal,
    pub to: Option<Decimal>,
    pub base: Decimal,
    pub rate: Decimal,
}

/// Non-fatal conditions met while calculating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CalculationWarning {
    MunicipalityNotFound {
        canton: String,
        municipality: String,
        fallback_multiplier: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationDetails {
    /// `None` when the amount fell below the first bracket.
    pub federal_bracket: Option<BracketTrace>,
    pub cantonal_bracket: Option<BracketTrace>,
    pub wealth_bracket: Option<BracketTrace>,
    pub splitting_applied: bool,
    pub split_divisor: Decimal,
    pub federal_child_credit: Decimal,
    /// Cantonal simple tax before multipliers.
    pub cantonal_simple_tax: Decimal,
    pub cantonal_multiplier: Decimal,
    pub municipal_multiplier: Decimal,
    pub municipality_fallback: bool,
    pub warnings: Vec<CalculationWarning>,
}

/// Outcome of one tax calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationResult {
    pub tax_year: i32,
    pub canton: String,
    pub municipality: String,
    pub civil_status: CivilStatus,
    pub gross_income: Decimal,
    pub social_contributions: SocialContributions,
    /// Gross income less social contributions.
    pub net_income: Decimal,
    pub deductions: DeductionBreakdown,
    pub total_deductions: Decimal,
    pub taxable_income: Decimal,
    pub taxable_wealth: Decimal,
    pub taxes: TaxBreakdown,
    pub rates: TaxRates,
    pub details: CalculationDetails,
}

/// One row of a canton comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CantonComparison {
    pub canton: String,
    pub canton_name: String,
    pub municipality: String,
    pub total_tax: Decimal,
    pub effective_rate: Decimal,
}
