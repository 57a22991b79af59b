//! The calculation pipeline, one module per stage.

pub mod brackets;
pub mod common;
pub mod deductions;
pub mod jurisdiction;
pub mod marginal;
pub mod optimization;
pub mod social;
pub mod taxable_base;

pub use brackets::{BracketError, BracketOutcome, ProgressiveSchedule, validate_schedule};
pub use deductions::DeductionAggregator;
pub use jurisdiction::{
    ComposedTaxes, JOINT_SPLIT_DIVISOR, JurisdictionComposer, JurisdictionInput, effective_rate,
};
pub use marginal::MarginalRateEstimator;
pub use optimization::{
    OptimizationHeuristics, OptimizationRule, RuleContext, RuleOutcome, rank, suggest,
};
pub use social::{
    PensionAgeBand, SocialContributionCalculator, SocialContributionConfig,
    SocialContributionError,
};
pub use taxable_base::{TaxableBase, taxable_base};
