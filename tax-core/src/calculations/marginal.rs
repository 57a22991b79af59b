//! Marginal rate by forward finite difference.
//!
//! The whole assessment is rerun with `other_income` raised by `delta`, so
//! every interaction between stages is reflected in the result. Other
//! income feeds no deduction cap of its own. Asset income would also lift
//! the mortgage interest cap and hide the rate of a taxpayer whose mortgage
//! claim exceeds it. At a bracket boundary the forward difference reports the
//! upper bracket's rate.

use rust_decimal::Decimal;

use crate::calculations::common::{floor_zero, round_half_up};
use crate::models::{InputUpdate, TaxCalculationInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarginalRateEstimator {
    delta: Decimal,
}

impl MarginalRateEstimator {
    /// `delta` must be positive; the engine config validates it.
    pub fn new(delta: Decimal) -> Self {
        Self { delta }
    }

    /// `input` with `delta` more other income.
    pub fn perturbed(
        &self,
        input: &TaxCalculationInput,
    ) -> TaxCalculationInput {
        input.with(InputUpdate::OtherIncome(input.other_income + self.delta))
    }

    /// Runs `assess` on the perturbed input and compares its total to
    /// `base_total`.
    ///
    /// ```
    /// use rust_decimal_macros::dec;
    /// use tax_core::TaxCalculationInput;
    /// use tax_core::calculations::MarginalRateEstimator;
    ///
    /// let input = TaxCalculationInput::new("ZH", "Zürich");
    /// let estimator = MarginalRateEstimator::new(dec!(1000));
    ///
    /// let rate = estimator
    ///     .estimate(&input, dec!(5000), |perturbed| {
    ///         Ok::<_, ()>(dec!(5000) + perturbed.other_income * dec!(0.25))
    ///     })
    ///     .unwrap();
    ///
    /// assert_eq!(rate, dec!(25.00));
    /// ```
    pub fn estimate<F, E>(
        &self,
        input: &TaxCalculationInput,
        base_total: Decimal,
        assess: F,
    ) -> Result<Decimal, E>
    where
        F: FnOnce(&TaxCalculationInput) -> Result<Decimal, E>,
    {
        let perturbed_total = assess(&self.perturbed(input))?;
        Ok(self.rate(base_total, perturbed_total))
    }

    /// `(perturbed - base) / delta × 100`, clamped at zero, two decimals.
    pub fn rate(
        &self,
        base_total: Decimal,
        perturbed_total: Decimal,
    ) -> Decimal {
        if self.delta <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        let rate = (perturbed_total - base_total) / self.delta * Decimal::ONE_HUNDRED;
        round_half_up(floor_zero(rate))
    }
}
