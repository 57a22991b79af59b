//! Progressive bracket engine.
//!
//! One algorithm serves the federal income tariff, the cantonal income
//! tariffs and the wealth tariffs. Each bracket stores the cumulative tax
//! owed at its lower bound (`base`), so evaluating an amount is a bracket
//! search plus one multiplication:
//!
//! ```text
//! tax = base + (amount - from) × rate / RATE_SCALE
//! ```
//!
//! Bounds are half-open: `from` is inclusive and `to` exclusive, so an
//! amount sitting exactly on a boundary is taxed by the upper bracket. The
//! last bracket is unbounded and its rate applies to any amount above it.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use tax_core::calculations::ProgressiveSchedule;
//! use tax_core::TaxBracket;
//!
//! let brackets = vec![
//!     TaxBracket { from: dec!(0), to: Some(dec!(10000)), base: dec!(0), rate: dec!(0) },
//!     TaxBracket { from: dec!(10000), to: Some(dec!(50000)), base: dec!(0), rate: dec!(5) },
//!     TaxBracket { from: dec!(50000), to: None, base: dec!(2000), rate: dec!(10) },
//! ];
//!
//! let schedule = ProgressiveSchedule::new(&brackets);
//! let outcome = schedule.tax(dec!(60000)).unwrap();
//!
//! assert_eq!(outcome.tax, dec!(3000.00));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::round_half_up;
use crate::models::{BracketTrace, ProgressiveBracket};

/// Largest gap tolerated between a bracket's `base` and the tax its
/// predecessor accumulates up to the same point.
const CONTINUITY_TOLERANCE: Decimal = Decimal::ONE;

/// Structural problems in a bracket table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BracketError {
    #[error("bracket schedule is empty")]
    EmptySchedule,

    #[error("bracket {index} is not sorted ascending by its lower bound")]
    NotSorted { index: usize },

    #[error("bracket {index} starts at {from} but the previous bracket ends at {previous_to:?}")]
    NotContiguous {
        index: usize,
        from: Decimal,
        previous_to: Option<Decimal>,
    },

    #[error("last bracket must be unbounded")]
    BoundedTop,

    #[error("bracket {index} has negative rate {rate}")]
    NegativeRate { index: usize, rate: Decimal },

    #[error("bracket {index} base {base} does not continue the previous bracket (expected {expected})")]
    Discontinuous {
        index: usize,
        base: Decimal,
        expected: Decimal,
    },
}

/// Tax owed on one amount and the tranche that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BracketOutcome {
    pub tax: Decimal,
    /// `None` when the amount is zero or below the first bracket.
    pub trace: Option<BracketTrace>,
}

impl BracketOutcome {
    fn zero() -> Self {
        Self {
            tax: Decimal::ZERO,
            trace: None,
        }
    }

    /// Marginal rate of the applied tranche, in the table's own unit.
    pub fn rate(&self) -> Decimal {
        self.trace.as_ref().map_or(Decimal::ZERO, |t| t.rate)
    }
}

/// Evaluates amounts against a sorted bracket table.
#[derive(Debug, Clone, Copy)]
pub struct ProgressiveSchedule<'a, B> {
    brackets: &'a [B],
}

impl<'a, B: ProgressiveBracket> ProgressiveSchedule<'a, B> {
    /// Wraps a table sorted by `from`. Use [`validate_schedule`] on data
    /// from untrusted sources first.
    pub fn new(brackets: &'a [B]) -> Self {
        Self { brackets }
    }

    /// Finds the bracket with `from <= amount < to`.
    ///
    /// Returns `None` for amounts below the first bracket.
    pub fn bracket_for(
        &self,
        amount: Decimal,
    ) -> Option<&'a B> {
        let index = self.brackets.partition_point(|b| b.from() <= amount);
        index.checked_sub(1).map(|i| &self.brackets[i])
    }

    /// Tax owed on `amount`, rounded to centimes.
    ///
    /// # Errors
    ///
    /// Returns [`BracketError::EmptySchedule`] if the table has no brackets.
    pub fn tax(
        &self,
        amount: Decimal,
    ) -> Result<BracketOutcome, BracketError> {
        if self.brackets.is_empty() {
            return Err(BracketError::EmptySchedule);
        }

        if amount <= Decimal::ZERO {
            return Ok(BracketOutcome::zero());
        }

        let Some(bracket) = self.bracket_for(amount) else {
            return Ok(BracketOutcome::zero());
        };

        let tax = bracket.base() + (amount - bracket.from()) * bracket.rate() / B::RATE_SCALE;

        Ok(BracketOutcome {
            tax: round_half_up(tax),
            trace: Some(BracketTrace {
                amount,
                from: bracket.from(),
                to: bracket.to(),
                base: bracket.base(),
                rate: bracket.rate(),
            }),
        })
    }

    /// Tax on `amount` under full splitting: the tariff is applied to
    /// `amount / divisor` and the result multiplied back by `divisor`.
    pub fn split_tax(
        &self,
        amount: Decimal,
        divisor: Decimal,
    ) -> Result<BracketOutcome, BracketError> {
        if divisor <= Decimal::ONE {
            return self.tax(amount);
        }

        let share = self.tax(amount / divisor)?;
        Ok(BracketOutcome {
            tax: round_half_up(share.tax * divisor),
            trace: share.trace,
        })
    }
}

/// Checks the invariants the engine relies on: sorted, contiguous, a single
/// unbounded top bracket, non-negative rates and continuous bases.
pub fn validate_schedule<B: ProgressiveBracket>(brackets: &[B]) -> Result<(), BracketError> {
    let Some(last) = brackets.last() else {
        return Err(BracketError::EmptySchedule);
    };

    if last.to().is_some() {
        return Err(BracketError::BoundedTop);
    }

    for (index, bracket) in brackets.iter().enumerate() {
        if bracket.rate() < Decimal::ZERO {
            return Err(BracketError::NegativeRate {
                index,
                rate: bracket.rate(),
            });
        }

        let Some(previous) = index.checked_sub(1).map(|i| &brackets[i]) else {
            continue;
        };

        if bracket.from() <= previous.from() {
            return Err(BracketError::NotSorted { index });
        }

        if previous.to() != Some(bracket.from()) {
            return Err(BracketError::NotContiguous {
                index,
                from: bracket.from(),
                previous_to: previous.to(),
            });
        }

        let expected = previous.base()
            + (bracket.from() - previous.from()) * previous.rate() / B::RATE_SCALE;
        if (bracket.base() - expected).abs() > CONTINUITY_TOLERANCE {
            return Err(BracketError::Discontinuous {
                index,
                base: bracket.base(),
                expected: round_half_up(expected),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{TaxBracket, WealthTaxBracket};

    fn bracket(
        from: Decimal,
        to: Option<Decimal>,
        base: Decimal,
        rate: Decimal,
    ) -> TaxBracket {
        TaxBracket {
            from,
            to,
            base,
            rate,
        }
    }

    /// Federal single tariff, 2025.
    fn federal_brackets() -> Vec<TaxBracket> {
        vec![
            bracket(dec!(0), Some(dec!(15200)), dec!(0), dec!(0)),
            bracket(dec!(15200), Some(dec!(33200)), dec!(0), dec!(0.77)),
            bracket(dec!(33200), Some(dec!(43500)), dec!(138.60), dec!(0.88)),
            bracket(dec!(43500), Some(dec!(58000)), dec!(229.24), dec!(2.64)),
            bracket(dec!(58000), Some(dec!(76100)), dec!(612.04), dec!(2.97)),
            bracket(dec!(76100), Some(dec!(82000)), dec!(1149.61), dec!(5.94)),
            bracket(dec!(82000), Some(dec!(108800)), dec!(1500.07), dec!(6.6)),
            bracket(dec!(108800), Some(dec!(141500)), dec!(3268.87), dec!(8.8)),
            bracket(dec!(141500), Some(dec!(184900)), dec!(6146.47), dec!(11)),
            bracket(dec!(184900), Some(dec!(793400)), dec!(10920.47), dec!(13.2)),
            bracket(dec!(793400), None, dec!(91242.47), dec!(11.5)),
        ]
    }

    fn wealth_brackets() -> Vec<WealthTaxBracket> {
        vec![
            WealthTaxBracket {
                from: dec!(0),
                to: Some(dec!(80000)),
                base: dec!(0),
                rate: dec!(0.5),
            },
            WealthTaxBracket {
                from: dec!(80000),
                to: None,
                base: dec!(40),
                rate: dec!(1),
            },
        ]
    }

    // =========================================================================
    // tax tests
    // =========================================================================

    #[test]
    fn tax_is_zero_for_zero_amount() {
        let brackets = federal_brackets();
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(0)).unwrap();

        assert_eq!(outcome.tax, dec!(0));
        assert_eq!(outcome.trace, None);
    }

    #[test]
    fn tax_is_zero_for_negative_amount() {
        let brackets = federal_brackets();
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(-500)).unwrap();

        assert_eq!(outcome.tax, dec!(0));
    }

    #[test]
    fn tax_is_zero_below_first_bracket() {
        let brackets = vec![bracket(dec!(1000), None, dec!(0), dec!(10))];
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(999.99)).unwrap();

        assert_eq!(outcome.tax, dec!(0));
        assert_eq!(outcome.trace, None);
    }

    #[test]
    fn tax_applies_rate_within_bracket() {
        let brackets = federal_brackets();
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(79672)).unwrap();

        // 1149.61 + 3572 × 5.94 %
        assert_eq!(outcome.tax, dec!(1361.79));
        assert_eq!(outcome.rate(), dec!(5.94));
    }

    #[test]
    fn tax_at_boundary_uses_upper_bracket() {
        let brackets = federal_brackets();
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(76100)).unwrap();

        assert_eq!(outcome.tax, dec!(1149.61));
        assert_eq!(outcome.rate(), dec!(5.94));
        assert_eq!(outcome.trace.unwrap().from, dec!(76100));
    }

    #[test]
    fn tax_just_below_boundary_uses_lower_bracket() {
        let brackets = federal_brackets();
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(76099.99)).unwrap();

        assert_eq!(outcome.rate(), dec!(2.97));
    }

    #[test]
    fn tax_is_continuous_across_boundaries() {
        let brackets = federal_brackets();
        let schedule = ProgressiveSchedule::new(&brackets);
        let epsilon = dec!(0.01);

        for b in brackets.iter().skip(1) {
            let below = schedule.tax(b.from - epsilon).unwrap();
            let at = schedule.tax(b.from).unwrap();
            let allowed = epsilon * below.rate() / dec!(100) + dec!(0.01);

            assert!(
                (at.tax - below.tax).abs() <= allowed,
                "jump at {}: {} -> {}",
                b.from,
                below.tax,
                at.tax
            );
        }
    }

    #[test]
    fn tax_uses_top_rate_for_very_large_amounts() {
        let brackets = federal_brackets();
        let outcome = ProgressiveSchedule::new(&brackets)
            .tax(dec!(10000000))
            .unwrap();

        assert_eq!(outcome.rate(), dec!(11.5));
        assert_eq!(outcome.tax, dec!(1119633.47));
    }

    #[test]
    fn tax_is_monotonic() {
        let brackets = federal_brackets();
        let schedule = ProgressiveSchedule::new(&brackets);
        let mut previous = Decimal::ZERO;

        for step in 0..=250 {
            let amount = Decimal::from(step * 4000);
            let tax = schedule.tax(amount).unwrap().tax;
            assert!(tax >= previous, "tax decreased at {amount}");
            previous = tax;
        }
    }

    #[test]
    fn tax_fails_on_empty_schedule() {
        let brackets: Vec<TaxBracket> = Vec::new();
        let result = ProgressiveSchedule::new(&brackets).tax(dec!(1000));

        assert_eq!(result, Err(BracketError::EmptySchedule));
    }

    #[test]
    fn wealth_tax_uses_per_mille() {
        let brackets = wealth_brackets();
        let outcome = ProgressiveSchedule::new(&brackets).tax(dec!(180000)).unwrap();

        // 40 + 100000 × 1 ‰
        assert_eq!(outcome.tax, dec!(140.00));
    }

    // =========================================================================
    // split_tax tests
    // =========================================================================

    #[test]
    fn split_tax_doubles_tax_on_half() {
        let brackets = federal_brackets();
        let schedule = ProgressiveSchedule::new(&brackets);

        let split = schedule.split_tax(dec!(200000), dec!(2)).unwrap();
        let half = schedule.tax(dec!(100000)).unwrap();

        assert_eq!(split.tax, half.tax * dec!(2));
        assert_eq!(split.trace.unwrap().amount, dec!(100000));
    }

    #[test]
    fn split_tax_with_unit_divisor_is_plain_tax() {
        let brackets = federal_brackets();
        let schedule = ProgressiveSchedule::new(&brackets);

        assert_eq!(
            schedule.split_tax(dec!(90000), dec!(1)).unwrap(),
            schedule.tax(dec!(90000)).unwrap()
        );
    }

    // =========================================================================
    // validate_schedule tests
    // =========================================================================

    #[test]
    fn validate_accepts_federal_tariff() {
        assert_eq!(validate_schedule(&federal_brackets()), Ok(()));
    }

    #[test]
    fn validate_rejects_empty_schedule() {
        let brackets: Vec<TaxBracket> = Vec::new();

        assert_eq!(validate_schedule(&brackets), Err(BracketError::EmptySchedule));
    }

    #[test]
    fn validate_rejects_bounded_top() {
        let brackets = vec![bracket(dec!(0), Some(dec!(1000)), dec!(0), dec!(1))];

        assert_eq!(validate_schedule(&brackets), Err(BracketError::BoundedTop));
    }

    #[test]
    fn validate_rejects_gap() {
        let brackets = vec![
            bracket(dec!(0), Some(dec!(1000)), dec!(0), dec!(1)),
            bracket(dec!(1500), None, dec!(10), dec!(2)),
        ];

        assert_eq!(
            validate_schedule(&brackets),
            Err(BracketError::NotContiguous {
                index: 1,
                from: dec!(1500),
                previous_to: Some(dec!(1000)),
            })
        );
    }

    #[test]
    fn validate_rejects_unsorted() {
        let brackets = vec![
            bracket(dec!(1000), Some(dec!(1000)), dec!(0), dec!(1)),
            bracket(dec!(1000), None, dec!(0), dec!(2)),
        ];

        assert_eq!(
            validate_schedule(&brackets),
            Err(BracketError::NotSorted { index: 1 })
        );
    }

    #[test]
    fn validate_rejects_negative_rate() {
        let brackets = vec![bracket(dec!(0), None, dec!(0), dec!(-1))];

        assert_eq!(
            validate_schedule(&brackets),
            Err(BracketError::NegativeRate {
                index: 0,
                rate: dec!(-1),
            })
        );
    }

    #[test]
    fn validate_rejects_base_jump() {
        let brackets = vec![
            bracket(dec!(0), Some(dec!(10000)), dec!(0), dec!(1)),
            bracket(dec!(10000), None, dec!(250), dec!(2)),
        ];

        assert_eq!(
            validate_schedule(&brackets),
            Err(BracketError::Discontinuous {
                index: 1,
                base: dec!(250),
                expected: dec!(100.00),
            })
        );
    }
}
