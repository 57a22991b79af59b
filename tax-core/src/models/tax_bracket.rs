use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One rung of a progressive schedule.
///
/// Implemented by income and wealth brackets so the bracket engine can be
/// shared. `rate()` is divided by [`ProgressiveBracket::RATE_SCALE`] when
/// applied.
pub trait ProgressiveBracket {
    /// 100 for percentages, 1000 for per-mille.
    const RATE_SCALE: Decimal;

    fn from(&self) -> Decimal;
    fn to(&self) -> Option<Decimal>;
    fn base(&self) -> Decimal;
    fn rate(&self) -> Decimal;
}

/// Income tax bracket. `rate` is a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBracket {
    pub from: Decimal,
    /// `None` marks the unbounded top bracket.
    pub to: Option<Decimal>,
    /// Cumulative tax owed at `from`.
    pub base: Decimal,
    pub rate: Decimal,
}

/// Wealth tax bracket. `rate` is per-mille.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WealthTaxBracket {
    pub from: Decimal,
    pub to: Option<Decimal>,
    pub base: Decimal,
    pub rate: Decimal,
}

impl ProgressiveBracket for TaxBracket {
    const RATE_SCALE: Decimal = Decimal::ONE_HUNDRED;

    fn from(&self) -> Decimal {
        self.from
    }

    fn to(&self) -> Option<Decimal> {
        self.to
    }

    fn base(&self) -> Decimal {
        self.base
    }

    fn rate(&self) -> Decimal {
        self.rate
    }
}

impl ProgressiveBracket for WealthTaxBracket {
    const RATE_SCALE: Decimal = Decimal::ONE_THOUSAND;

    fn from(&self) -> Decimal {
        self.from
    }

    fn to(&self) -> Option<Decimal> {
        self.to
    }

    fn base(&self) -> Decimal {
        self.base
    }

    fn rate(&self) -> Decimal {
        self.rate
    }
}
