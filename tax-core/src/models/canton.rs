use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use super::{CivilStatus, EmploymentStatus, TaxBracket, WealthTaxBracket};
use crate::calculations::common::{floor_zero, percent_of, round_half_up};

/// Share of self-employed net income that may go into pillar 3a.
const SELF_EMPLOYED_PILLAR3A_PERCENT: Decimal = dec!(20);

/// Canton-independent direct federal tax data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederalTaxData {
    /// Single tariff; joint filers are split onto it.
    pub brackets: Vec<TaxBracket>,
    /// Subtracted from federal tax per dependent child.
    pub child_credit: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Municipality {
    pub name: String,
    /// Percent of the cantonal simple tax levied as communal tax.
    pub multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomeTariffs {
    pub single: Vec<TaxBracket>,
    pub married: Vec<TaxBracket>,
}

impl IncomeTariffs {
    pub fn for_status(&self, status: CivilStatus) -> &[TaxBracket] {
        if status.is_joint() {
            &self.married
        } else {
            &self.single
        }
    }
}

/// Deduction ceilings and allowances of one canton. Percent fields are
/// percentages, everything else CHF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeductionLimits {
    pub personal: Decimal,
    pub per_child: Decimal,
    pub pillar3a_employed: Decimal,
    pub pillar3a_self_employed: Decimal,
    pub insurance_single: Decimal,
    pub insurance_married: Decimal,
    pub professional_expenses_min: Decimal,
    pub professional_expenses_max: Decimal,
    pub professional_expenses_percent: Decimal,
    pub childcare_per_child: Decimal,
    pub training_max: Decimal,
    pub mortgage_interest_allowance: Decimal,
    pub donations_percent: Decimal,
    pub medical_franchise_percent: Decimal,
    pub wealth_franchise_single: Decimal,
    pub wealth_franchise_married: Decimal,
}

impl DeductionLimits {
    pub fn insurance_cap(&self, status: CivilStatus) -> Decimal {
        if status.is_joint() {
            self.insurance_married
        } else {
            self.insurance_single
        }
    }

    /// Pillar 3a limit. Employees get the flat amount; the self-employed
    /// get a share of net income, at most their own flat amount.
    pub fn pillar_3a_cap(
        &self,
        employment: EmploymentStatus,
        net_income: Decimal,
    ) -> Decimal {
        match employment {
            EmploymentStatus::Employed => self.pillar3a_employed,
            EmploymentStatus::SelfEmployed => self.pillar3a_self_employed.min(round_half_up(
                percent_of(floor_zero(net_income), SELF_EMPLOYED_PILLAR3A_PERCENT),
            )),
        }
    }

    pub fn wealth_franchise(&self, status: CivilStatus) -> Decimal {
        if status.is_joint() {
            self.wealth_franchise_married
        } else {
            self.wealth_franchise_single
        }
    }
}

/// Everything needed to tax a resident of one canton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CantonTaxData {
    /// Two-letter code, upper case (`"ZH"`).
    pub code: String,
    pub name: String,
    /// Percent of the simple tax levied by the canton.
    pub cantonal_multiplier: Decimal,
    /// Church tax as a percent of cantonal plus communal tax; zero if none.
    pub confessional_rate: Decimal,
    pub income_brackets: IncomeTariffs,
    pub wealth_brackets: Vec<WealthTaxBracket>,
    pub deduction_limits: DeductionLimits,
    pub municipalities: Vec<Municipality>,
}

impl CantonTaxData {
    /// Case-insensitive lookup ignoring surrounding whitespace.
    pub fn municipality(&self, name: &str) -> Option<&Municipality> {
        let wanted = name.trim().to_lowercase();
        self.municipalities
            .iter()
            .find(|m| m.name.to_lowercase() == wanted)
    }

    /// The municipality used when none is chosen, typically the capital.
    pub fn default_municipality(&self) -> Option<&Municipality> {
        self.municipalities.first()
    }
}
