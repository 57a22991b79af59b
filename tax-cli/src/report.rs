//! Text and JSON rendering of engine output.

use std::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use tax_core::{
    CalculationWarning, CantonComparison, OptimizationSuggestion, TaxCalculationResult,
};

use crate::utils::{format_chf, format_percent};

const LABEL_WIDTH: usize = 30;
const AMOUNT_WIDTH: usize = 14;

fn amount_line(
    f: &mut fmt::Formatter<'_>,
    indent: usize,
    label: &str,
    amount: Decimal,
) -> fmt::Result {
    let width = LABEL_WIDTH - indent;
    writeln!(
        f,
        "{:indent$}{label:<width$}{:>AMOUNT_WIDTH$}",
        "",
        format_chf(amount)
    )
}

/// Full breakdown of one calculation.
pub struct ResultReport<'a> {
    pub profile: &'a str,
    pub result: &'a TaxCalculationResult,
}

impl fmt::Display for ResultReport<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = self.result;
        writeln!(
            f,
            "{}: {} / {}, {}, tax year {}",
            self.profile,
            r.canton,
            r.municipality,
            r.civil_status.as_str(),
            r.tax_year
        )?;

        amount_line(f, 2, "Gross income", r.gross_income)?;
        amount_line(f, 2, "Social contributions", r.social_contributions.total)?;
        let social = &r.social_contributions;
        for (label, value) in [
            ("Old-age insurance", social.old_age_insurance),
            ("Unemployment insurance", social.unemployment_insurance),
            ("Occupational pension", social.occupational_pension),
            ("Accident insurance", social.accident_insurance),
        ] {
            if !value.is_zero() {
                amount_line(f, 4, label, value)?;
            }
        }
        amount_line(f, 2, "Net income", r.net_income)?;

        amount_line(f, 2, "Deductions", r.total_deductions)?;
        for line in &r.deductions.lines {
            if line.applied.is_zero() && line.claimed.is_zero() {
                continue;
            }
            amount_line(f, 4, line.category.label(), line.applied)?;
            if line.disallowed > Decimal::ZERO {
                writeln!(
                    f,
                    "{:6}claimed {}, {} above the limit",
                    "",
                    format_chf(line.claimed),
                    format_chf(line.disallowed)
                )?;
            }
        }

        amount_line(f, 2, "Taxable income", r.taxable_income)?;
        amount_line(f, 2, "Taxable wealth", r.taxable_wealth)?;
        writeln!(f)?;

        amount_line(f, 2, "Federal tax", r.taxes.federal)?;
        amount_line(f, 2, "Cantonal tax", r.taxes.cantonal)?;
        amount_line(f, 2, "Communal tax", r.taxes.communal)?;
        amount_line(f, 2, "Church tax", r.taxes.confessional)?;
        amount_line(f, 2, "Wealth tax", r.taxes.wealth)?;
        amount_line(f, 2, "Total tax", r.taxes.total)?;
        writeln!(
            f,
            "  {:<w$}{:>AMOUNT_WIDTH$}",
            "Effective rate",
            format_percent(r.rates.effective_rate),
            w = LABEL_WIDTH - 2
        )?;
        writeln!(
            f,
            "  {:<w$}{:>AMOUNT_WIDTH$}",
            "Marginal rate",
            format_percent(r.rates.marginal_rate),
            w = LABEL_WIDTH - 2
        )?;

        for warning in &r.details.warnings {
            match warning {
                CalculationWarning::MunicipalityNotFound {
                    canton,
                    municipality,
                    fallback_multiplier,
                } => writeln!(
                    f,
                    "  warning: municipality '{municipality}' not found in {canton}, \
                     communal multiplier {fallback_multiplier} % assumed"
                )?,
            }
        }
        Ok(())
    }
}

/// Canton comparison, one line per canton.
pub struct ComparisonTable<'a>(pub &'a [CantonComparison]);

impl fmt::Display for ComparisonTable<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        writeln!(
            f,
            "{:>3}  {:<4} {:<24} {:<20} {:>14} {:>9}",
            "#", "Code", "Canton", "Municipality", "Total tax", "Rate"
        )?;
        for (rank, row) in self.0.iter().enumerate() {
            writeln!(
                f,
                "{:>3}  {:<4} {:<24} {:<20} {:>14} {:>9}",
                rank + 1,
                row.canton,
                row.canton_name,
                row.municipality,
                format_chf(row.total_tax),
                format_percent(row.effective_rate)
            )?;
        }
        Ok(())
    }
}

/// Ranked optimization suggestions.
pub struct SuggestionList<'a>(pub &'a [OptimizationSuggestion]);

impl fmt::Display for SuggestionList<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "No optimization suggestions.");
        }
        for (rank, s) in self.0.iter().enumerate() {
            writeln!(
                f,
                "{}. [{}] {}, saves about CHF {} per year",
                rank + 1,
                s.priority.as_str(),
                s.title,
                format_chf(s.estimated_annual_savings)
            )?;
            writeln!(f, "   {}", s.description)?;
            match s.deadline {
                Some(deadline) => writeln!(
                    f,
                    "   Action: {} (by {})",
                    s.action_required,
                    deadline.format("%d.%m.%Y")
                )?,
                None => writeln!(f, "   Action: {}", s.action_required)?,
            }
        }
        Ok(())
    }
}

/// JSON shape of one profile's output. Absent parts are omitted.
#[derive(Debug, Serialize)]
pub struct ProfileReport<'a> {
    pub profile: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<&'a TaxCalculationResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<&'a [CantonComparison]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<&'a [OptimizationSuggestion]>,
}

impl<'a> ProfileReport<'a> {
    pub fn new(profile: &'a str) -> Self {
        Self {
            profile,
            result: None,
            comparison: None,
            suggestions: None,
        }
    }
}

/// Pretty-printed JSON.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
