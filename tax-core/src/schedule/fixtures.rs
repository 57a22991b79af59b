//! Test tables shaped like the 2025 Zürich and federal tariffs.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing_subscriber::fmt::format::FmtSpan;

use super::InMemorySchedules;
use crate::models::{
    CantonTaxData, DeductionLimits, FederalTaxData, IncomeTariffs, Municipality,
    ProgressiveBracket, TaxBracket, WealthTaxBracket,
};

/// Initializes tracing subscriber for tests that verify log output.
pub(crate) fn init_test_tracing() -> tracing::subscriber::DefaultGuard {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_span_events(FmtSpan::NONE)
        .with_test_writer()
        .finish();
    tracing::subscriber::set_default(subscriber)
}

/// Builds a contiguous table from `(from, rate)` pairs, accumulating bases.
pub(crate) fn table<B>(
    steps: &[(i64, Decimal)],
    make: impl Fn(Decimal, Option<Decimal>, Decimal, Decimal) -> B,
) -> Vec<B>
where
    B: ProgressiveBracket,
{
    let mut base = Decimal::ZERO;
    let mut brackets = Vec::with_capacity(steps.len());

    for (i, &(from, rate)) in steps.iter().enumerate() {
        let from = Decimal::from(from);
        let to = steps.get(i + 1).map(|&(next, _)| Decimal::from(next));
        brackets.push(make(from, to, base, rate));
        if let Some(to) = to {
            base += (to - from) * rate / B::RATE_SCALE;
        }
    }
    brackets
}

pub(crate) fn income_table(steps: &[(i64, Decimal)]) -> Vec<TaxBracket> {
    table(steps, |from, to, base, rate| TaxBracket {
        from,
        to,
        base,
        rate,
    })
}

pub(crate) fn federal() -> FederalTaxData {
    FederalTaxData {
        brackets: vec![
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
        ],
        child_credit: dec!(263),
    }
}

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

pub(crate) fn zurich_limits() -> DeductionLimits {
    DeductionLimits {
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
    }
}

const RATES: [Decimal; 13] = [
    dec!(0),
    dec!(2),
    dec!(3),
    dec!(4),
    dec!(5),
    dec!(6),
    dec!(7),
    dec!(8),
    dec!(9),
    dec!(10),
    dec!(11),
    dec!(12),
    dec!(13),
];

fn steps(thresholds: [i64; 13]) -> Vec<(i64, Decimal)> {
    thresholds.into_iter().zip(RATES).collect()
}

/// A canton with the Zürich tariffs under the given code.
pub(crate) fn canton(code: &str) -> CantonTaxData {
    let single = steps([
        0, 6900, 11800, 16600, 24500, 34100, 45100, 58000, 75400, 109000, 142600, 195300, 263700,
    ]);
    let married = steps([
        0, 13900, 20200, 28200, 37900, 48900, 62900, 79700, 111300, 144900, 184200, 232800,
        331200,
    ]);
    let wealth = table(
        &[
            (0, dec!(0.5)),
            (80000, dec!(1)),
            (240000, dec!(1.5)),
            (480000, dec!(2)),
            (800000, dec!(2.5)),
            (1200000, dec!(3)),
        ],
        |from, to, base, rate| WealthTaxBracket {
            from,
            to,
            base,
            rate,
        },
    );

    CantonTaxData {
        code: code.to_string(),
        name: format!("Canton {code}"),
        cantonal_multiplier: dec!(98),
        confessional_rate: dec!(5),
        income_brackets: IncomeTariffs {
            single: income_table(&single),
            married: income_table(&married),
        },
        wealth_brackets: wealth,
        deduction_limits: zurich_limits(),
        municipalities: vec![
            Municipality {
                name: "Zürich".to_string(),
                multiplier: dec!(119),
            },
            Municipality {
                name: "Winterthur".to_string(),
                multiplier: dec!(125),
            },
        ],
    }
}

pub(crate) fn schedules() -> InMemorySchedules {
    let cheap = CantonTaxData {
        cantonal_multiplier: dec!(60),
        municipalities: vec![Municipality {
            name: "Zug".to_string(),
            multiplier: dec!(55),
        }],
        ..canton("ZG")
    };

    match InMemorySchedules::new(2025, federal(), [canton("ZH"), canton("BE"), cheap]) {
        Ok(schedules) => schedules,
        Err(e) => panic!("fixture schedules are invalid: {e}"),
    }
}
