//! Rule-based tax optimization suggestions.
//!
//! Each [`OptimizationRule`] inspects a finished calculation and either
//! produces a candidate suggestion or is not applicable. Candidates are
//! ranked by priority, then by descending estimated savings.
//!
//! Savings are estimated as `headroom × marginal rate × factor`. The factor
//! of each rule is a calibration constant in [`OptimizationHeuristics`]:
//!
//! | Rule | Factor | Assumption |
//! |------|--------|------------|
//! | Pillar 3a headroom | 1.0 | the full contribution is deductible at the marginal rate |
//! | Professional expenses | 0.5 | about half the headroom can be documented |
//! | Pension buyback | 1.0 | the reference buyback is fully deductible |
//! | Income smoothing | 1.0 | shifted income is taxed at the effective instead of the marginal rate |
//!
//! Rules lacking an input they need (an age, a salary) are skipped.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::calculations::common::{floor_zero, percent_of, round_to_franc};
use crate::models::{
    DeductionCategory, DeductionLimits, EmploymentStatus, OptimizationSuggestion, Priority,
    SuggestionKind, TaxCalculationInput, TaxCalculationResult,
};

/// Calibration constants of the suggestion rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizationHeuristics {
    pub pillar3a_factor: Decimal,
    pub professional_expenses_factor: Decimal,
    pub buyback_factor: Decimal,
    pub smoothing_factor: Decimal,

    pub buyback_min_age: u8,
    pub buyback_min_taxable_income: Decimal,
    /// Buyback used for the estimate, unless the percentage below is lower.
    pub buyback_reference_amount: Decimal,
    pub buyback_reference_percent: Decimal,

    pub smoothing_threshold: Decimal,
    pub smoothing_max_shift: Decimal,
}

impl Default for OptimizationHeuristics {
    fn default() -> Self {
        Self {
            pillar3a_factor: dec!(1.0),
            professional_expenses_factor: dec!(0.5),
            buyback_factor: dec!(1.0),
            smoothing_factor: dec!(1.0),
            buyback_min_age: 30,
            buyback_min_taxable_income: dec!(80000),
            buyback_reference_amount: dec!(10000),
            buyback_reference_percent: dec!(10),
            smoothing_threshold: dec!(150000),
            smoothing_max_shift: dec!(20000),
        }
    }
}

impl OptimizationHeuristics {
    /// `(field name, value)` for every amount that must not be negative.
    pub fn amounts(&self) -> [(&'static str, Decimal); 9] {
        [
            ("pillar3a_factor", self.pillar3a_factor),
            ("professional_expenses_factor", self.professional_expenses_factor),
            ("buyback_factor", self.buyback_factor),
            ("smoothing_factor", self.smoothing_factor),
            ("buyback_min_taxable_income", self.buyback_min_taxable_income),
            ("buyback_reference_amount", self.buyback_reference_amount),
            ("buyback_reference_percent", self.buyback_reference_percent),
            ("smoothing_threshold", self.smoothing_threshold),
            ("smoothing_max_shift", self.smoothing_max_shift),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationRule {
    Pillar3aHeadroom,
    ProfessionalExpenses,
    PensionBuyback,
    IncomeSmoothing,
}

impl OptimizationRule {
    pub const ALL: [Self; 4] = [
        Self::Pillar3aHeadroom,
        Self::ProfessionalExpenses,
        Self::PensionBuyback,
        Self::IncomeSmoothing,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    NotApplicable,
    Candidate(OptimizationSuggestion),
}

/// What a rule gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub input: &'a TaxCalculationInput,
    pub result: &'a TaxCalculationResult,
    pub limits: &'a DeductionLimits,
    pub heuristics: &'a OptimizationHeuristics,
}

impl RuleContext<'_> {
    fn marginal_rate(&self) -> Decimal {
        self.result.rates.marginal_rate
    }

    fn year_end(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.result.tax_year, 12, 31)
    }
}

impl OptimizationRule {
    pub fn evaluate(
        &self,
        ctx: &RuleContext<'_>,
    ) -> RuleOutcome {
        match self {
            Self::Pillar3aHeadroom => pillar_3a_headroom(ctx),
            Self::ProfessionalExpenses => professional_expenses(ctx),
            Self::PensionBuyback => pension_buyback(ctx),
            Self::IncomeSmoothing => income_smoothing(ctx),
        }
    }
}

/// Evaluates every rule and ranks the candidates.
pub fn suggest(ctx: &RuleContext<'_>) -> Vec<OptimizationSuggestion> {
    let mut suggestions: Vec<_> = OptimizationRule::ALL
        .iter()
        .filter_map(|rule| match rule.evaluate(ctx) {
            RuleOutcome::Candidate(s) => Some(s),
            RuleOutcome::NotApplicable => None,
        })
        .collect();

    rank(&mut suggestions);
    suggestions
}

/// Priority first, then larger savings, then kind.
pub fn rank(suggestions: &mut [OptimizationSuggestion]) {
    suggestions.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| b.estimated_annual_savings.cmp(&a.estimated_annual_savings))
            .then_with(|| a.kind.cmp(&b.kind))
    });
}

fn savings(
    headroom: Decimal,
    rate: Decimal,
    factor: Decimal,
) -> Decimal {
    round_to_franc(percent_of(headroom, rate) * factor)
}

fn pillar_3a_headroom(ctx: &RuleContext<'_>) -> RuleOutcome {
    if ctx.input.gross_salary <= Decimal::ZERO {
        return RuleOutcome::NotApplicable;
    }

    let cap = ctx
        .limits
        .pillar_3a_cap(ctx.input.employment, ctx.result.net_income);
    let headroom = floor_zero(cap - ctx.result.deductions.applied(DeductionCategory::Pillar3a));
    let estimated = savings(headroom, ctx.marginal_rate(), ctx.heuristics.pillar3a_factor);
    if estimated <= Decimal::ZERO {
        return RuleOutcome::NotApplicable;
    }

    let priority = if headroom * dec!(2) >= cap {
        Priority::High
    } else {
        Priority::Medium
    };

    RuleOutcome::Candidate(OptimizationSuggestion {
        kind: SuggestionKind::Pillar3a,
        title: "Contribute to pillar 3a".to_string(),
        description: format!(
            "You can pay up to CHF {} more into a pillar 3a account this year; \
             contributions are fully deductible.",
            headroom.round_dp(2)
        ),
        estimated_annual_savings: estimated,
        priority,
        action_required: format!("Pay CHF {} into a pillar 3a account", headroom.round_dp(2)),
        deadline: ctx.year_end(),
    })
}

fn professional_expenses(ctx: &RuleContext<'_>) -> RuleOutcome {
    if ctx.input.gross_salary <= Decimal::ZERO {
        return RuleOutcome::NotApplicable;
    }

    let applied = ctx
        .result
        .deductions
        .applied(DeductionCategory::ProfessionalExpenses);
    let headroom = floor_zero(ctx.limits.professional_expenses_max - applied);
    let estimated = savings(
        headroom,
        ctx.marginal_rate(),
        ctx.heuristics.professional_expenses_factor,
    );
    if estimated <= Decimal::ZERO {
        return RuleOutcome::NotApplicable;
    }

    RuleOutcome::Candidate(OptimizationSuggestion {
        kind: SuggestionKind::ProfessionalExpenses,
        title: "Claim actual professional expenses".to_string(),
        description: format!(
            "Your professional expenses deduction is CHF {} below the cantonal maximum. \
             Commuting, meals away from home and work equipment may exceed the flat allowance.",
            headroom.round_dp(2)
        ),
        estimated_annual_savings: estimated,
        priority: Priority::Low,
        action_required: "Collect receipts for commuting, meals and equipment".to_string(),
        deadline: None,
    })
}

fn pension_buyback(ctx: &RuleContext<'_>) -> RuleOutcome {
    let h = ctx.heuristics;
    let Some(age) = ctx.input.age else {
        return RuleOutcome::NotApplicable;
    };
    if ctx.input.employment != EmploymentStatus::Employed
        || age < h.buyback_min_age
        || ctx.result.taxable_income < h.buyback_min_taxable_income
    {
        return RuleOutcome::NotApplicable;
    }

    let reference = h.buyback_reference_amount.min(percent_of(
        ctx.result.taxable_income,
        h.buyback_reference_percent,
    ));
    let estimated = savings(reference, ctx.marginal_rate(), h.buyback_factor);
    if estimated <= Decimal::ZERO {
        return RuleOutcome::NotApplicable;
    }

    RuleOutcome::Candidate(OptimizationSuggestion {
        kind: SuggestionKind::PensionBuyback,
        title: "Consider a pension fund buyback".to_string(),
        description: format!(
            "Voluntary purchases into your pension fund are deductible. \
             A buyback of CHF {} would lower this year's tax.",
            reference.round_dp(2)
        ),
        estimated_annual_savings: estimated,
        priority: Priority::Medium,
        action_required: "Request your buyback potential from your pension fund".to_string(),
        deadline: ctx.year_end(),
    })
}

fn income_smoothing(ctx: &RuleContext<'_>) -> RuleOutcome {
    let h = ctx.heuristics;
    let taxable = ctx.result.taxable_income;
    if taxable < h.smoothing_threshold {
        return RuleOutcome::NotApplicable;
    }

    let shifted = (taxable - h.smoothing_threshold).min(h.smoothing_max_shift);
    let spread = ctx.marginal_rate() - ctx.result.rates.effective_rate;
    let estimated = savings(shifted, spread, h.smoothing_factor);
    if estimated <= Decimal::ZERO {
        return RuleOutcome::NotApplicable;
    }

    RuleOutcome::Candidate(OptimizationSuggestion {
        kind: SuggestionKind::IncomeSmoothing,
        title: "Spread income over several years".to_string(),
        description: format!(
            "Your marginal rate is {} % against an effective rate of {} %. \
             Deferring bonuses or spreading pillar withdrawals keeps income out of the top brackets.",
            ctx.marginal_rate(),
            ctx.result.rates.effective_rate
        ),
        estimated_annual_savings: estimated,
        priority: Priority::Low,
        action_required: format!(
            "Discuss deferring up to CHF {} of income with your employer",
            shifted.round_dp(2)
        ),
        deadline: None,
    })
}
