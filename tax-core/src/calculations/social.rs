//! Mandatory social insurance contributions deducted from salary.
//!
//! | Line | Insurance | Base |
//! |------|-----------|------|
//! | AHV  | Old-age, survivors and disability (AHV/AI/APG) | full salary |
//! | ALV  | Unemployment | salary up to the insured ceiling |
//! | NBU  | Non-occupational accident | salary up to the insured ceiling |
//! | BVG  | Occupational pension, employee share | coordinated salary |
//!
//! The coordinated salary is the salary (capped at the maximum insured
//! salary) less the coordination deduction, but never below the minimum
//! coordinated salary. Salaries under the entry threshold are not insured.
//!
//! Self-employed taxpayers pay AHV at the self-employed rate and nothing
//! else. Without an age the BVG line is zero.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::EmploymentStatus;
//! use tax_core::calculations::{SocialContributionCalculator, SocialContributionConfig};
//!
//! let calculator = SocialContributionCalculator::new(SocialContributionConfig::default());
//! let contributions = calculator
//!     .calculate(dec!(100000), Some(40), EmploymentStatus::Employed)
//!     .unwrap();
//!
//! assert_eq!(contributions.old_age_insurance, dec!(5300.00));
//! assert_eq!(contributions.occupational_pension, dec!(3213.00));
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::common::{floor_zero, percent_of, round_half_up};
use crate::models::{EmploymentStatus, SocialContributions};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SocialContributionError {
    #[error("{name} must be a percentage between 0 and 100, got {value}")]
    InvalidRate { name: &'static str, value: Decimal },

    #[error("{name} must be positive, got {value}")]
    InvalidCeiling { name: &'static str, value: Decimal },

    #[error("pension age band {min_age}-{max_age} is empty or overlaps the previous band")]
    InvalidAgeBand { min_age: u8, max_age: u8 },

    #[error("gross salary must not be negative, got {0}")]
    NegativeSalary(Decimal),
}

/// Employee share of the occupational pension for an inclusive age range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PensionAgeBand {
    pub min_age: u8,
    pub max_age: u8,
    /// Percent of the coordinated salary.
    pub rate: Decimal,
}

/// Contribution rates (percent) and ceilings (CHF).
///
/// `Default` yields the 2025 values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialContributionConfig {
    pub ahv_employee_rate: Decimal,
    pub ahv_self_employed_rate: Decimal,

    pub alv_rate: Decimal,
    /// Salary above this is not subject to ALV.
    pub alv_ceiling: Decimal,

    pub nbu_rate: Decimal,
    pub nbu_ceiling: Decimal,

    /// Salaries below this are not insured under BVG.
    pub bvg_entry_threshold: Decimal,
    pub bvg_coordination_deduction: Decimal,
    pub bvg_max_insured_salary: Decimal,
    pub bvg_min_coordinated_salary: Decimal,
    /// Ascending and non-overlapping. Ages outside every band pay nothing.
    pub bvg_age_bands: Vec<PensionAgeBand>,
}

impl Default for SocialContributionConfig {
    fn default() -> Self {
        let band = |min_age, max_age, rate| PensionAgeBand {
            min_age,
            max_age,
            rate,
        };

        Self {
            ahv_employee_rate: dec!(5.3),
            ahv_self_employed_rate: dec!(10.0),
            alv_rate: dec!(1.1),
            alv_ceiling: dec!(148200),
            nbu_rate: dec!(1.2),
            nbu_ceiling: dec!(148200),
            bvg_entry_threshold: dec!(22680),
            bvg_coordination_deduction: dec!(26460),
            bvg_max_insured_salary: dec!(90720),
            bvg_min_coordinated_salary: dec!(3780),
            bvg_age_bands: vec![
                band(25, 34, dec!(3.5)),
                band(35, 44, dec!(5.0)),
                band(45, 54, dec!(7.5)),
                band(55, 65, dec!(9.0)),
            ],
        }
    }
}

impl SocialContributionConfig {
    /// Rejects rates outside 0–100, non-positive ceilings and malformed
    /// age bands.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use tax_core::calculations::{SocialContributionConfig, SocialContributionError};
    ///
    /// let config = SocialContributionConfig {
    ///     alv_rate: dec!(110),
    ///     ..SocialContributionConfig::default()
    /// };
    ///
    /// assert_eq!(
    ///     config.validate(),
    ///     Err(SocialContributionError::InvalidRate { name: "alv_rate", value: dec!(110) })
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), SocialContributionError> {
        let rates = [
            ("ahv_employee_rate", self.ahv_employee_rate),
            ("ahv_self_employed_rate", self.ahv_self_employed_rate),
            ("alv_rate", self.alv_rate),
            ("nbu_rate", self.nbu_rate),
        ];
        for (name, value) in rates {
            check_rate(name, value)?;
        }

        let ceilings = [
            ("alv_ceiling", self.alv_ceiling),
            ("nbu_ceiling", self.nbu_ceiling),
            ("bvg_entry_threshold", self.bvg_entry_threshold),
            ("bvg_coordination_deduction", self.bvg_coordination_deduction),
            ("bvg_max_insured_salary", self.bvg_max_insured_salary),
            ("bvg_min_coordinated_salary", self.bvg_min_coordinated_salary),
        ];
        for (name, value) in ceilings {
            if value <= Decimal::ZERO {
                return Err(SocialContributionError::InvalidCeiling { name, value });
            }
        }

        let mut previous_max: Option<u8> = None;
        for band in &self.bvg_age_bands {
            check_rate("bvg_age_bands.rate", band.rate)?;
            let overlaps = previous_max.is_some_and(|max| band.min_age <= max);
            if band.min_age > band.max_age || overlaps {
                return Err(SocialContributionError::InvalidAgeBand {
                    min_age: band.min_age,
                    max_age: band.max_age,
                });
            }
            previous_max = Some(band.max_age);
        }

        Ok(())
    }

    fn pension_rate(
        &self,
        age: u8,
    ) -> Decimal {
        self.bvg_age_bands
            .iter()
            .find(|b| (b.min_age..=b.max_age).contains(&age))
            .map_or(Decimal::ZERO, |b| b.rate)
    }
}

fn check_rate(
    name: &'static str,
    value: Decimal,
) -> Result<(), SocialContributionError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(SocialContributionError::InvalidRate { name, value });
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct SocialContributionCalculator {
    config: SocialContributionConfig,
}

impl SocialContributionCalculator {
    pub fn new(config: SocialContributionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SocialContributionConfig {
        &self.config
    }

    /// Itemized contributions on `gross_salary`, each line rounded to
    /// centimes before summing.
    ///
    /// # Errors
    ///
    /// Returns [`SocialContributionError`] if the configuration is invalid
    /// or the salary is negative.
    pub fn calculate(
        &self,
        gross_salary: Decimal,
        age: Option<u8>,
        employment: EmploymentStatus,
    ) -> Result<SocialContributions, SocialContributionError> {
        self.config.validate()?;

        if gross_salary < Decimal::ZERO {
            return Err(SocialContributionError::NegativeSalary(gross_salary));
        }

        let contributions = match employment {
            EmploymentStatus::SelfEmployed => {
                let old_age_insurance =
                    round_half_up(percent_of(gross_salary, self.config.ahv_self_employed_rate));
                SocialContributions {
                    old_age_insurance,
                    total: old_age_insurance,
                    ..SocialContributions::default()
                }
            }
            EmploymentStatus::Employed => {
                let old_age_insurance =
                    round_half_up(percent_of(gross_salary, self.config.ahv_employee_rate));
                let unemployment_insurance = self.unemployment(gross_salary);
                let accident_insurance = self.accident(gross_salary);
                let occupational_pension = self.occupational_pension(gross_salary, age);

                SocialContributions {
                    old_age_insurance,
                    unemployment_insurance,
                    occupational_pension,
                    accident_insurance,
                    total: old_age_insurance
                        + unemployment_insurance
                        + occupational_pension
                        + accident_insurance,
                }
            }
        };

        Ok(contributions)
    }

    /// ALV on the salary up to the ceiling.
    fn unemployment(
        &self,
        gross_salary: Decimal,
    ) -> Decimal {
        let insured = gross_salary.min(self.config.alv_ceiling);
        round_half_up(percent_of(insured, self.config.alv_rate))
    }

    /// NBU on the salary up to the insured-salary ceiling.
    fn accident(
        &self,
        gross_salary: Decimal,
    ) -> Decimal {
        let insured = gross_salary.min(self.config.nbu_ceiling);
        round_half_up(percent_of(insured, self.config.nbu_rate))
    }

    /// Employee share of BVG on the coordinated salary.
    fn occupational_pension(
        &self,
        gross_salary: Decimal,
        age: Option<u8>,
    ) -> Decimal {
        let Some(age) = age else {
            debug!("no age given, skipping occupational pension");
            return Decimal::ZERO;
        };

        if gross_salary < self.config.bvg_entry_threshold {
            return Decimal::ZERO;
        }

        let rate = self.config.pension_rate(age);
        if rate.is_zero() {
            return Decimal::ZERO;
        }

        round_half_up(percent_of(self.coordinated_salary(gross_salary), rate))
    }

    fn coordinated_salary(
        &self,
        gross_salary: Decimal,
    ) -> Decimal {
        let insured = gross_salary.min(self.config.bvg_max_insured_salary);
        let coordinated = floor_zero(insured - self.config.bvg_coordination_deduction);
        coordinated.max(self.config.bvg_min_coordinated_salary)
    }
}
