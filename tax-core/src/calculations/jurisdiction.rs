//! Turns taxable amounts into federal, cantonal, communal, confessional and
//! wealth tax.
//!
//! | Tax          | Computation |
//! |--------------|-------------|
//! | Federal      | federal tariff, full splitting for joint filers, minus child credit |
//! | Simple tax   | cantonal tariff for the filing status |
//! | Cantonal     | simple tax × cantonal multiplier / 100 |
//! | Communal     | simple tax × municipal multiplier / 100, whole francs |
//! | Confessional | (cantonal + communal) × confessional rate / 100 |
//! | Wealth       | wealth simple tax × (cantonal + municipal multiplier) / 100 |
//!
//! Cantons apply their own married tariff to joint filers; no cantonal
//! splitting divisor is applied on top.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::calculations::brackets::{BracketError, ProgressiveSchedule};
use crate::calculations::common::{floor_zero, percent_of, round_half_up, round_to_franc};
use crate::models::{
    BracketTrace, CantonTaxData, CivilStatus, Confession, FederalTaxData, TaxBreakdown,
};

/// Divisor for federal full splitting of joint income.
pub const JOINT_SPLIT_DIVISOR: Decimal = dec!(2);

/// Everything about the taxpayer the composer needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JurisdictionInput {
    pub taxable_income: Decimal,
    pub taxable_wealth: Decimal,
    pub civil_status: CivilStatus,
    pub children: u8,
    pub confession: Option<Confession>,
    pub municipal_multiplier: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedTaxes {
    pub taxes: TaxBreakdown,
    pub federal_bracket: Option<BracketTrace>,
    pub cantonal_bracket: Option<BracketTrace>,
    pub wealth_bracket: Option<BracketTrace>,
    pub splitting_applied: bool,
    pub split_divisor: Decimal,
    /// Credit actually subtracted, never more than the federal tax.
    pub federal_child_credit: Decimal,
    pub cantonal_simple_tax: Decimal,
}

#[derive(Debug, Clone, Copy)]
pub struct JurisdictionComposer<'a> {
    federal: &'a FederalTaxData,
    canton: &'a CantonTaxData,
}

impl<'a> JurisdictionComposer<'a> {
    pub fn new(
        federal: &'a FederalTaxData,
        canton: &'a CantonTaxData,
    ) -> Self {
        Self { federal, canton }
    }

    /// # Errors
    ///
    /// Returns [`BracketError::EmptySchedule`] if one of the tariffs has no
    /// brackets.
    pub fn compose(
        &self,
        input: &JurisdictionInput,
    ) -> Result<ComposedTaxes, BracketError> {
        let joint = input.civil_status.is_joint();
        let split_divisor = if joint {
            JOINT_SPLIT_DIVISOR
        } else {
            Decimal::ONE
        };

        let federal_outcome = ProgressiveSchedule::new(&self.federal.brackets)
            .split_tax(input.taxable_income, split_divisor)?;
        let credit =
            (self.federal.child_credit * Decimal::from(input.children)).min(federal_outcome.tax);
        let federal = floor_zero(federal_outcome.tax - credit);

        let cantonal_outcome =
            ProgressiveSchedule::new(self.canton.income_brackets.for_status(input.civil_status))
                .tax(input.taxable_income)?;
        let simple_tax = cantonal_outcome.tax;

        let cantonal = round_half_up(percent_of(simple_tax, self.canton.cantonal_multiplier));
        let communal = round_to_franc(percent_of(simple_tax, input.municipal_multiplier));
        let confessional = self.confessional(input.confession, cantonal + communal);

        let wealth_outcome =
            ProgressiveSchedule::new(&self.canton.wealth_brackets).tax(input.taxable_wealth)?;
        let wealth = round_half_up(percent_of(
            wealth_outcome.tax,
            self.canton.cantonal_multiplier + input.municipal_multiplier,
        ));

        Ok(ComposedTaxes {
            taxes: TaxBreakdown {
                federal,
                cantonal,
                communal,
                confessional,
                wealth,
                total: federal + cantonal + communal + confessional + wealth,
            },
            federal_bracket: federal_outcome.trace,
            cantonal_bracket: cantonal_outcome.trace,
            wealth_bracket: wealth_outcome.trace,
            splitting_applied: joint,
            split_divisor,
            federal_child_credit: credit,
            cantonal_simple_tax: simple_tax,
        })
    }

    /// Church tax, levied only on members of a recognised confession in
    /// cantons that collect it.
    fn confessional(
        &self,
        confession: Option<Confession>,
        cantonal_and_communal: Decimal,
    ) -> Decimal {
        match confession {
            Some(_) if self.canton.confessional_rate > Decimal::ZERO => round_half_up(
                percent_of(cantonal_and_communal, self.canton.confessional_rate),
            ),
            _ => Decimal::ZERO,
        }
    }
}

/// `(total - wealth) / gross_income × 100`, two decimals; zero without
/// income.
pub fn effective_rate(
    taxes: &TaxBreakdown,
    gross_income: Decimal,
) -> Decimal {
    if gross_income <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    round_half_up(taxes.income_taxes() / gross_income * Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::{
        DeductionLimits, IncomeTariffs, Municipality, TaxBracket, WealthTaxBracket,
    };

    fn federal() -> FederalTaxData {
        FederalTaxData {
            brackets: vec![
                TaxBracket {
                    from: dec!(0),
                    to: Some(dec!(20000)),
                    base: dec!(0),
                    rate: dec!(0),
                },
                TaxBracket {
                    from: dec!(20000),
                    to: None,
                    base: dec!(0),
                    rate: dec!(5),
                },
            ],
            child_credit: dec!(263),
        }
    }

    fn flat(rate: Decimal) -> Vec<TaxBracket> {
        vec![TaxBracket {
            from: dec!(0),
            to: None,
            base: dec!(0),
            rate,
        }]
    }

    fn canton() -> CantonTaxData {
        CantonTaxData {
            code: "ZH".to_string(),
            name: "Zürich".to_string(),
            cantonal_multiplier: dec!(98),
            confessional_rate: dec!(5),
            income_brackets: IncomeTariffs {
                single: flat(dec!(6)),
                married: flat(dec!(4)),
            },
            wealth_brackets: vec![WealthTaxBracket {
                from: dec!(0),
                to: None,
                base: dec!(0),
                rate: dec!(1),
            }],
            deduction_limits: DeductionLimits {
                personal: dec!(0),
                per_child: dec!(9300),
                pillar3a_employed: dec!(7056),
                pillar3a_self_employed: dec!(35280),
                insurance_single: dec!(2900),
                insurance_married: dec!(5800),
                professional_expenses_min: dec!(2000),
                professional_expenses_max: dec!(4000),
                professional_expenses_percent: dec!(3),
                childcare_per_child: dec!(25000),
                training_max: dec!(12400),
                mortgage_interest_allowance: dec!(50000),
                donations_percent: dec!(20),
                medical_franchise_percent: dec!(5),
                wealth_franchise_single: dec!(80000),
                wealth_franchise_married: dec!(159000),
            },
            municipalities: vec![Municipality {
                name: "Zürich".to_string(),
                multiplier: dec!(119),
            }],
        }
    }

    fn single(taxable_income: Decimal) -> JurisdictionInput {
        JurisdictionInput {
            taxable_income,
            taxable_wealth: dec!(0),
            civil_status: CivilStatus::Single,
            children: 0,
            confession: None,
            municipal_multiplier: dec!(119),
        }
    }

    // =========================================================================
    // compose tests
    // =========================================================================

    #[test]
    fn single_filer_taxes() {
        let (federal, canton) = (federal(), canton());
        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&single(dec!(50000)))
            .unwrap();

        assert_eq!(
            composed.taxes,
            TaxBreakdown {
                federal: dec!(1500.00),
                cantonal: dec!(2940.00),
                communal: dec!(3570),
                confessional: dec!(0),
                wealth: dec!(0),
                total: dec!(8010.00),
            }
        );
        assert_eq!(composed.cantonal_simple_tax, dec!(3000.00));
        assert!(!composed.splitting_applied);
    }

    #[test]
    fn joint_filers_use_splitting_and_married_tariff() {
        let (federal, canton) = (federal(), canton());
        let input = JurisdictionInput {
            civil_status: CivilStatus::Married,
            ..single(dec!(100000))
        };

        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&input)
            .unwrap();

        // 2 × (50000 - 20000) × 5 %
        assert_eq!(composed.taxes.federal, dec!(3000.00));
        assert_eq!(composed.cantonal_simple_tax, dec!(4000.00));
        assert_eq!(composed.split_divisor, dec!(2));
        assert_eq!(composed.federal_bracket.unwrap().amount, dec!(50000));
    }

    #[test]
    fn registered_partners_are_joint_filers() {
        let (federal, canton) = (federal(), canton());
        let input = JurisdictionInput {
            civil_status: CivilStatus::RegisteredPartnership,
            ..single(dec!(100000))
        };

        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&input)
            .unwrap();

        assert!(composed.splitting_applied);
    }

    #[test]
    fn child_credit_reduces_federal_tax_with_floor() {
        let (federal, canton) = (federal(), canton());
        let composer = JurisdictionComposer::new(&federal, &canton);

        let two_children = composer
            .compose(&JurisdictionInput {
                children: 2,
                ..single(dec!(50000))
            })
            .unwrap();
        let many_children = composer
            .compose(&JurisdictionInput {
                children: 10,
                ..single(dec!(50000))
            })
            .unwrap();

        assert_eq!(two_children.taxes.federal, dec!(974.00));
        assert_eq!(two_children.federal_child_credit, dec!(526));
        assert_eq!(many_children.taxes.federal, dec!(0));
        assert_eq!(many_children.federal_child_credit, dec!(1500.00));
    }

    #[test]
    fn communal_tax_is_rounded_to_franc() {
        let (federal, canton) = (federal(), canton());
        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&single(dec!(12345)))
            .unwrap();

        // simple 740.70 × 119 % = 881.433
        assert_eq!(composed.taxes.communal, dec!(881));
        assert_eq!(composed.taxes.cantonal, dec!(725.89));
    }

    #[test]
    fn confessional_tax_requires_confession() {
        let (federal, canton) = (federal(), canton());
        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&JurisdictionInput {
                confession: Some(Confession::Protestant),
                ..single(dec!(50000))
            })
            .unwrap();

        // (2940 + 3570) × 5 %
        assert_eq!(composed.taxes.confessional, dec!(325.50));
    }

    #[test]
    fn confessional_tax_is_zero_where_canton_levies_none() {
        let federal = federal();
        let canton = CantonTaxData {
            confessional_rate: dec!(0),
            ..canton()
        };

        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&JurisdictionInput {
                confession: Some(Confession::RomanCatholic),
                ..single(dec!(50000))
            })
            .unwrap();

        assert_eq!(composed.taxes.confessional, dec!(0));
    }

    #[test]
    fn wealth_tax_uses_both_multipliers() {
        let (federal, canton) = (federal(), canton());
        let composed = JurisdictionComposer::new(&federal, &canton)
            .compose(&JurisdictionInput {
                taxable_wealth: dec!(200000),
                ..single(dec!(0))
            })
            .unwrap();

        // 200 × (98 + 119) %
        assert_eq!(composed.taxes.wealth, dec!(434.00));
        assert_eq!(composed.taxes.total, dec!(434.00));
    }

    #[test]
    fn empty_tariff_is_an_error() {
        let federal = FederalTaxData {
            brackets: Vec::new(),
            child_credit: dec!(0),
        };
        let canton = canton();

        let result = JurisdictionComposer::new(&federal, &canton).compose(&single(dec!(1)));

        assert_eq!(result, Err(BracketError::EmptySchedule));
    }

    // =========================================================================
    // effective_rate tests
    // =========================================================================

    #[test]
    fn effective_rate_excludes_wealth_tax() {
        let taxes = TaxBreakdown {
            federal: dec!(1000),
            cantonal: dec!(2000),
            communal: dec!(2000),
            confessional: dec!(0),
            wealth: dec!(500),
            total: dec!(5500),
        };

        assert_eq!(effective_rate(&taxes, dec!(60000)), dec!(8.33));
    }

    #[test]
    fn effective_rate_is_zero_without_income() {
        assert_eq!(effective_rate(&TaxBreakdown::default(), dec!(0)), dec!(0));
    }
}
