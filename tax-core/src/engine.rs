//! The tax engine: runs the calculation pipeline against a schedule
//! repository.
//!
//! ```text
//! input ─► social contributions ─► deductions ─► taxable base
//!       ─► brackets (federal, cantonal, wealth) ─► jurisdiction composer
//!       ─► totals, effective rate ─► marginal rate (pipeline rerun)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use rust_decimal_macros::dec;
//! use tax_core::{InMemorySchedules, InputUpdate, TaxCalculationInput, TaxEngine};
//!
//! fn run(schedules: &InMemorySchedules) {
//!     let engine = TaxEngine::new(schedules);
//!     let input = TaxCalculationInput::new("ZH", "Zürich")
//!         .with(InputUpdate::GrossSalary(dec!(100000)));
//!
//!     let result = engine.calculate(&input).unwrap();
//!     println!("total tax: {}", result.taxes.total);
//! }
//! ```

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::calculations::{
    BracketError, DeductionAggregator, JurisdictionComposer, JurisdictionInput,
    MarginalRateEstimator, OptimizationHeuristics, RuleContext, SocialContributionCalculator,
    SocialContributionConfig, SocialContributionError, effective_rate, suggest, taxable_base,
};
use crate::models::{
    CalculationDetails, CalculationWarning, CantonComparison, CantonTaxData, InputUpdate,
    OptimizationSuggestion, TaxCalculationInput, TaxCalculationResult, TaxRates,
};
use crate::schedule::{
    MunicipalMultiplier, ScheduleError, TaxScheduleRepository, resolve_municipal_multiplier,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("marginal delta must be positive, got {0}")]
    InvalidMarginalDelta(Decimal),

    #[error("fallback municipal multiplier must be positive, got {0}")]
    InvalidFallbackMultiplier(Decimal),

    #[error("heuristic {name} must not be negative, got {value}")]
    InvalidHeuristic { name: &'static str, value: Decimal },

    #[error(transparent)]
    Social(#[from] SocialContributionError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalculationError {
    #[error("unknown canton '{0}'")]
    UnknownCanton(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("corrupt tax schedule: {0}")]
    Schedule(#[from] BracketError),

    #[error("invalid engine configuration: {0}")]
    Config(#[from] ConfigError),
}

impl From<ScheduleError> for CalculationError {
    fn from(err: ScheduleError) -> Self {
        match err {
            ScheduleError::UnknownCanton(code) => Self::UnknownCanton(code),
            ScheduleError::InvalidTable { source, .. } => Self::Schedule(source),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<SocialContributionError> for CalculationError {
    fn from(err: SocialContributionError) -> Self {
        match err {
            SocialContributionError::NegativeSalary(_) => Self::InvalidInput(err.to_string()),
            other => Self::Config(ConfigError::Social(other)),
        }
    }
}

/// Tunable engine parameters. Every field has a default, so a partial TOML
/// file is enough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Step in CHF for the marginal rate finite difference.
    pub marginal_delta: Decimal,
    /// Communal multiplier (percent) used when a municipality is unknown.
    pub fallback_municipal_multiplier: Decimal,
    pub social: SocialContributionConfig,
    pub heuristics: OptimizationHeuristics,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            marginal_delta: dec!(1000),
            fallback_municipal_multiplier: dec!(70),
            social: SocialContributionConfig::default(),
            heuristics: OptimizationHeuristics::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.marginal_delta <= Decimal::ZERO {
            return Err(ConfigError::InvalidMarginalDelta(self.marginal_delta));
        }
        if self.fallback_municipal_multiplier <= Decimal::ZERO {
            return Err(ConfigError::InvalidFallbackMultiplier(
                self.fallback_municipal_multiplier,
            ));
        }
        for (name, value) in self.heuristics.amounts() {
            if value < Decimal::ZERO {
                return Err(ConfigError::InvalidHeuristic { name, value });
            }
        }
        self.social.validate()?;
        Ok(())
    }
}

/// Calculates taxes against borrowed, read-only schedules.
#[derive(Debug)]
pub struct TaxEngine<'a, R: ?Sized> {
    schedules: &'a R,
    config: EngineConfig,
    social: SocialContributionCalculator,
}

impl<'a, R> TaxEngine<'a, R>
where
    R: TaxScheduleRepository + ?Sized,
{
    /// An engine with the default configuration.
    pub fn new(schedules: &'a R) -> Self {
        let config = EngineConfig::default();
        Self {
            schedules,
            social: SocialContributionCalculator::new(config.social.clone()),
            config,
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError`] if `config` fails validation.
    pub fn with_config(
        schedules: &'a R,
        config: EngineConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            schedules,
            social: SocialContributionCalculator::new(config.social.clone()),
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn schedules(&self) -> &'a R {
        self.schedules
    }

    /// Full assessment of `input`, including the marginal rate.
    ///
    /// # Errors
    ///
    /// * [`CalculationError::UnknownCanton`] if the canton has no schedule.
    /// * [`CalculationError::InvalidInput`] for negative amounts.
    /// * [`CalculationError::Schedule`] if a bracket table is empty.
    pub fn calculate(
        &self,
        input: &TaxCalculationInput,
    ) -> Result<TaxCalculationResult, CalculationError> {
        validate_input(input)?;

        let canton = self.schedules.canton(&input.canton)?;
        let municipal = resolve_municipal_multiplier(
            canton,
            &input.municipality,
            self.config.fallback_municipal_multiplier,
        );
        debug!(canton = %canton.code, fallback = municipal.fallback_used, "calculating taxes");

        let mut result = self.assess(input, canton, municipal)?;

        let estimator = MarginalRateEstimator::new(self.config.marginal_delta);
        result.rates.marginal_rate = estimator.estimate(input, result.taxes.total, |perturbed| {
            self.assess(perturbed, canton, municipal)
                .map(|r| r.taxes.total)
        })?;

        Ok(result)
    }

    /// Calculates `input` in every canton's default municipality and sorts
    /// by total tax, cheapest first.
    pub fn compare_cantons(
        &self,
        input: &TaxCalculationInput,
    ) -> Result<Vec<CantonComparison>, CalculationError> {
        let mut rows = Vec::new();

        for code in self.schedules.canton_codes() {
            let canton = self.schedules.canton(code)?;
            let Some(municipality) = canton.default_municipality() else {
                continue;
            };

            let moved = input
                .with(InputUpdate::Canton(canton.code.clone()))
                .with(InputUpdate::Municipality(municipality.name.clone()));
            let result = self.calculate(&moved)?;

            rows.push(CantonComparison {
                canton: canton.code.clone(),
                canton_name: canton.name.clone(),
                municipality: municipality.name.clone(),
                total_tax: result.taxes.total,
                effective_rate: result.rates.effective_rate,
            });
        }

        rows.sort_by(|a, b| {
            a.total_tax
                .cmp(&b.total_tax)
                .then_with(|| a.canton.cmp(&b.canton))
        });
        debug!(cantons = rows.len(), "canton comparison complete");
        Ok(rows)
    }

    /// Ranked suggestions for a finished calculation. Taxes are not
    /// recomputed.
    pub fn suggest_optimizations(
        &self,
        input: &TaxCalculationInput,
        result: &TaxCalculationResult,
    ) -> Result<Vec<OptimizationSuggestion>, CalculationError> {
        let canton = self.schedules.canton(&result.canton)?;

        let suggestions = suggest(&RuleContext {
            input,
            result,
            limits: &canton.deduction_limits,
            heuristics: &self.config.heuristics,
        });
        debug!(count = suggestions.len(), "optimization suggestions ranked");
        Ok(suggestions)
    }

    /// One pass of the pipeline, without the marginal rate.
    fn assess(
        &self,
        input: &TaxCalculationInput,
        canton: &CantonTaxData,
        municipal: MunicipalMultiplier,
    ) -> Result<TaxCalculationResult, CalculationError> {
        let social = self
            .social
            .calculate(input.gross_salary, input.age, input.employment)?;

        let deductions = DeductionAggregator::new(&canton.deduction_limits).aggregate(input, &social);
        let base = taxable_base(input, &social, deductions.total, &canton.deduction_limits);

        let composed = JurisdictionComposer::new(self.schedules.federal(), canton).compose(
            &JurisdictionInput {
                taxable_income: base.taxable_income,
                taxable_wealth: base.taxable_wealth,
                civil_status: input.civil_status,
                children: input.children,
                confession: input.confession,
                municipal_multiplier: municipal.multiplier,
            },
        )?;

        let municipality = input.municipality.trim().to_string();
        let warnings = if municipal.fallback_used {
            vec![CalculationWarning::MunicipalityNotFound {
                canton: canton.code.clone(),
                municipality: municipality.clone(),
                fallback_multiplier: municipal.multiplier,
            }]
        } else {
            Vec::new()
        };

        Ok(TaxCalculationResult {
            tax_year: self.schedules.tax_year(),
            canton: canton.code.clone(),
            municipality,
            civil_status: input.civil_status,
            gross_income: base.gross_income,
            net_income: base.net_income,
            total_deductions: deductions.total,
            social_contributions: social,
            deductions,
            taxable_income: base.taxable_income,
            taxable_wealth: base.taxable_wealth,
            rates: TaxRates {
                effective_rate: effective_rate(&composed.taxes, base.gross_income),
                marginal_rate: Decimal::ZERO,
            },
            taxes: composed.taxes,
            details: CalculationDetails {
                federal_bracket: composed.federal_bracket,
                cantonal_bracket: composed.cantonal_bracket,
                wealth_bracket: composed.wealth_bracket,
                splitting_applied: composed.splitting_applied,
                split_divisor: composed.split_divisor,
                federal_child_credit: composed.federal_child_credit,
                cantonal_simple_tax: composed.cantonal_simple_tax,
                cantonal_multiplier: canton.cantonal_multiplier,
                municipal_multiplier: municipal.multiplier,
                municipality_fallback: municipal.fallback_used,
                warnings,
            },
        })
    }
}

fn validate_input(input: &TaxCalculationInput) -> Result<(), CalculationError> {
    let amounts = [
        ("gross_salary", input.gross_salary),
        ("other_income", input.other_income),
        ("asset_income", input.asset_income),
        ("gross_wealth", input.gross_wealth),
        ("debts", input.debts),
    ];

    for (field, value) in amounts.into_iter().chain(input.deductions.entries()) {
        if value < Decimal::ZERO {
            return Err(CalculationError::InvalidInput(format!(
                "{field} must not be negative"
            )));
        }
    }
    Ok(())
}
