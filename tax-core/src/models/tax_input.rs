use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{CivilStatus, Confession, EmploymentStatus};

/// Deduction amounts as claimed by the taxpayer, before any cap.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimedDeductions {
    pub pillar_3a: Decimal,
    pub insurance_premiums: Decimal,
    pub professional_expenses: Decimal,
    pub childcare: Decimal,
    pub training: Decimal,
    pub donations: Decimal,
    pub mortgage_interest: Decimal,
    pub alimony: Decimal,
    pub medical_expenses: Decimal,
    pub other: Decimal,
}

impl ClaimedDeductions {
    /// `(field name, amount)` for every claimed category.
    pub fn entries(&self) -> [(&'static str, Decimal); 10] {
        [
            ("pillar_3a", self.pillar_3a),
            ("insurance_premiums", self.insurance_premiums),
            ("professional_expenses", self.professional_expenses),
            ("childcare", self.childcare),
            ("training", self.training),
            ("donations", self.donations),
            ("mortgage_interest", self.mortgage_interest),
            ("alimony", self.alimony),
            ("medical_expenses", self.medical_expenses),
            ("other", self.other),
        ]
    }
}

/// Values supplied by one taxpayer for one calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxCalculationInput {
    pub gross_salary: Decimal,
    pub other_income: Decimal,
    /// Interest, dividends and rent. Also raises the mortgage interest cap.
    #[serde(default)]
    pub asset_income: Decimal,
    pub employment: EmploymentStatus,
    /// Drives the occupational pension age band; `None` skips it.
    pub age: Option<u8>,
    /// Two-letter canton code.
    pub canton: String,
    pub municipality: String,
    pub civil_status: CivilStatus,
    pub children: u8,
    pub confession: Option<Confession>,
    pub gross_wealth: Decimal,
    pub debts: Decimal,
    pub deductions: ClaimedDeductions,
}

impl TaxCalculationInput {
    /// A single, employed taxpayer with no income yet.
    pub fn new(
        canton: impl Into<String>,
        municipality: impl Into<String>,
    ) -> Self {
        Self {
            gross_salary: Decimal::ZERO,
            other_income: Decimal::ZERO,
            asset_income: Decimal::ZERO,
            employment: EmploymentStatus::Employed,
            age: None,
            canton: canton.into(),
            municipality: municipality.into(),
            civil_status: CivilStatus::Single,
            children: 0,
            confession: None,
            gross_wealth: Decimal::ZERO,
            debts: Decimal::ZERO,
            deductions: ClaimedDeductions::default(),
        }
    }

    /// Salary, other income and asset income.
    pub fn gross_income(&self) -> Decimal {
        self.gross_salary + self.other_income + self.asset_income
    }

    pub fn apply(
        &mut self,
        update: InputUpdate,
    ) {
        match update {
            InputUpdate::GrossSalary(v) => self.gross_salary = v,
            InputUpdate::OtherIncome(v) => self.other_income = v,
            InputUpdate::AssetIncome(v) => self.asset_income = v,
            InputUpdate::Employment(v) => self.employment = v,
            InputUpdate::Age(v) => self.age = v,
            InputUpdate::Canton(v) => self.canton = v,
            InputUpdate::Municipality(v) => self.municipality = v,
            InputUpdate::CivilStatus(v) => self.civil_status = v,
            InputUpdate::Children(v) => self.children = v,
            InputUpdate::Confession(v) => self.confession = v,
            InputUpdate::GrossWealth(v) => self.gross_wealth = v,
            InputUpdate::Debts(v) => self.debts = v,
            InputUpdate::Pillar3a(v) => self.deductions.pillar_3a = v,
            InputUpdate::InsurancePremiums(v) => self.deductions.insurance_premiums = v,
            InputUpdate::ProfessionalExpenses(v) => self.deductions.professional_expenses = v,
            InputUpdate::Childcare(v) => self.deductions.childcare = v,
            InputUpdate::Training(v) => self.deductions.training = v,
            InputUpdate::Donations(v) => self.deductions.donations = v,
            InputUpdate::MortgageInterest(v) => self.deductions.mortgage_interest = v,
            InputUpdate::Alimony(v) => self.deductions.alimony = v,
            InputUpdate::MedicalExpenses(v) => self.deductions.medical_expenses = v,
            InputUpdate::OtherDeductions(v) => self.deductions.other = v,
        }
    }

    /// Returns a copy with `update` applied.
    pub fn with(
        &self,
        update: InputUpdate,
    ) -> Self {
        let mut next = self.clone();
        next.apply(update);
        next
    }
}

/// A change to exactly one modifiable input field.
///
/// Parsed from `field=value`, e.g. `pillar_3a=7056` or `civil_status=married`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputUpdate {
    GrossSalary(Decimal),
    OtherIncome(Decimal),
    AssetIncome(Decimal),
    Employment(EmploymentStatus),
    Age(Option<u8>),
    Canton(String),
    Municipality(String),
    CivilStatus(CivilStatus),
    Children(u8),
    Confession(Option<Confession>),
    GrossWealth(Decimal),
    Debts(Decimal),
    Pillar3a(Decimal),
    InsurancePremiums(Decimal),
    ProfessionalExpenses(Decimal),
    Childcare(Decimal),
    Training(Decimal),
    Donations(Decimal),
    MortgageInterest(Decimal),
    Alimony(Decimal),
    MedicalExpenses(Decimal),
    OtherDeductions(Decimal),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputUpdateError {
    #[error("expected 'field=value', got '{0}'")]
    MissingSeparator(String),

    #[error("unknown input field '{0}'")]
    UnknownField(String),

    #[error("invalid value '{value}' for field '{field}'")]
    InvalidValue { field: String, value: String },
}

impl FromStr for InputUpdate {
    type Err = InputUpdateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (field, value) = s
            .split_once('=')
            .ok_or_else(|| InputUpdateError::MissingSeparator(s.to_string()))?;
        let field = field.trim();
        let value = value.trim();

        let invalid = || InputUpdateError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        };
        let amount = || value.parse::<Decimal>().map_err(|_| invalid());

        let update = match field {
            "gross_salary" => Self::GrossSalary(amount()?),
            "other_income" => Self::OtherIncome(amount()?),
            "asset_income" => Self::AssetIncome(amount()?),
            "employment" => Self::Employment(EmploymentStatus::parse(value).ok_or_else(invalid)?),
            "age" => match value {
                "" | "none" => Self::Age(None),
                v => Self::Age(Some(v.parse().map_err(|_| invalid())?)),
            },
            "canton" => Self::Canton(value.to_ascii_uppercase()),
            "municipality" => Self::Municipality(value.to_string()),
            "civil_status" => Self::CivilStatus(CivilStatus::parse(value).ok_or_else(invalid)?),
            "children" => Self::Children(value.parse().map_err(|_| invalid())?),
            "confession" => match value {
                "" | "none" => Self::Confession(None),
                v => Self::Confession(Some(Confession::parse(v).ok_or_else(invalid)?)),
            },
            "gross_wealth" => Self::GrossWealth(amount()?),
            "debts" => Self::Debts(amount()?),
            "pillar_3a" => Self::Pillar3a(amount()?),
            "insurance_premiums" => Self::InsurancePremiums(amount()?),
            "professional_expenses" => Self::ProfessionalExpenses(amount()?),
            "childcare" => Self::Childcare(amount()?),
            "training" => Self::Training(amount()?),
            "donations" => Self::Donations(amount()?),
            "mortgage_interest" => Self::MortgageInterest(amount()?),
            "alimony" => Self::Alimony(amount()?),
            "medical_expenses" => Self::MedicalExpenses(amount()?),
            "other_deductions" => Self::OtherDeductions(amount()?),
            other => return Err(InputUpdateError::UnknownField(other.to_string())),
        };

        Ok(update)
    }
}
