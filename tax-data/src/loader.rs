//! Loads one tax year of schedules from CSV tables.
//!
//! | File | Columns |
//! |------|---------|
//! | `federal.csv` | `from,to,base,rate` |
//! | `federal_meta.csv` | `tax_year,child_credit` (one row) |
//! | `cantons.csv` | `code,name,cantonal_multiplier,confessional_rate` and one column per deduction limit |
//! | `income_brackets.csv` | `canton,tariff,from,to,base,rate` with `tariff` = `single` or `married` |
//! | `wealth_brackets.csv` | `canton,from,to,base,rate` (rate in per-mille) |
//! | `municipalities.csv` | `canton,name,multiplier` |
//!
//! An empty `to` cell marks the unbounded top bracket. Brackets may appear
//! in any order; they are sorted by `from` before validation. The first
//! municipality listed for a canton is its default.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tax_core::{
    CantonTaxData, DeductionLimits, FederalTaxData, InMemorySchedules, IncomeTariffs,
    Municipality, ScheduleError, TaxBracket, WealthTaxBracket,
};
use thiserror::Error;
use tracing::{debug, info};

pub const FEDERAL_FILE: &str = "federal.csv";
pub const FEDERAL_META_FILE: &str = "federal_meta.csv";
pub const CANTONS_FILE: &str = "cantons.csv";
pub const INCOME_BRACKETS_FILE: &str = "income_brackets.csv";
pub const WEALTH_BRACKETS_FILE: &str = "wealth_brackets.csv";
pub const MUNICIPALITIES_FILE: &str = "municipalities.csv";

#[derive(Debug, Error)]
pub enum ScheduleLoaderError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV parse error in {file}: {message}")]
    CsvParse { file: &'static str, message: String },

    #[error("{file} row {row}: unknown canton '{canton}'")]
    UnknownCanton {
        file: &'static str,
        canton: String,
        row: usize,
    },

    #[error("{file} row {row}: unknown tariff '{tariff}', expected 'single' or 'married'")]
    UnknownTariff {
        file: &'static str,
        tariff: String,
        row: usize,
    },

    #[error("canton {canton} has no {table} table")]
    MissingTable { canton: String, table: &'static str },

    #[error("federal_meta.csv must contain exactly one row, found {0}")]
    FederalMeta(usize),

    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

fn deserialize_optional_decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    match s {
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse::<Decimal>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BracketRecord {
    pub from: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub to: Option<Decimal>,
    pub base: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct FederalMetaRecord {
    pub tax_year: i32,
    pub child_credit: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CantonRecord {
    pub code: String,
    pub name: String,
    pub cantonal_multiplier: Decimal,
    pub confessional_rate: Decimal,
    pub personal: Decimal,
    pub per_child: Decimal,
    pub pillar3a_employed: Decimal,
    pub pillar3a_self_employed: Decimal,
    pub insurance_single: Decimal,
    pub insurance_married: Decimal,
    pub professional_expenses_min: Decimal,
    pub professional_expenses_max: Decimal,
    pub professional_expenses_percent: Decimal,
    pub childcare_per_child: Decimal,
    pub training_max: Decimal,
    pub mortgage_interest_allowance: Decimal,
    pub donations_percent: Decimal,
    pub medical_franchise_percent: Decimal,
    pub wealth_franchise_single: Decimal,
    pub wealth_franchise_married: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct IncomeBracketRecord {
    pub canton: String,
    pub tariff: String,
    pub from: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub to: Option<Decimal>,
    pub base: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WealthBracketRecord {
    pub canton: String,
    pub from: Decimal,
    #[serde(deserialize_with = "deserialize_optional_decimal")]
    pub to: Option<Decimal>,
    pub base: Decimal,
    pub rate: Decimal,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MunicipalityRecord {
    pub canton: String,
    pub name: String,
    pub multiplier: Decimal,
}

/// One reader per table.
pub struct ScheduleSources<R> {
    pub federal: R,
    pub federal_meta: R,
    pub cantons: R,
    pub income_brackets: R,
    pub wealth_brackets: R,
    pub municipalities: R,
}

/// Income and wealth tables collected for one canton.
#[derive(Default)]
struct CantonTables {
    single: Vec<TaxBracket>,
    married: Vec<TaxBracket>,
    wealth: Vec<WealthTaxBracket>,
    municipalities: Vec<Municipality>,
}

pub struct ScheduleLoader;

impl ScheduleLoader {
    /// Parses records of any table from a CSV reader, tolerating whitespace
    /// around values.
    pub fn parse<T, R>(
        file: &'static str,
        reader: R,
    ) -> Result<Vec<T>, ScheduleLoaderError>
    where
        T: DeserializeOwned,
        R: Read,
    {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        csv_reader
            .deserialize()
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| ScheduleLoaderError::CsvParse {
                file,
                message: e.to_string(),
            })
    }

    /// Parses, groups and validates all six tables.
    ///
    /// # Errors
    ///
    /// * [`ScheduleLoaderError::CsvParse`] for malformed rows.
    /// * [`ScheduleLoaderError::UnknownCanton`] if a table references a
    ///   canton missing from `cantons.csv`.
    /// * [`ScheduleLoaderError::MissingTable`] if a canton lacks a tariff,
    ///   its wealth table or municipalities.
    /// * [`ScheduleLoaderError::Schedule`] if a bracket table is not sorted,
    ///   contiguous and continuous.
    pub fn from_sources<R: Read>(
        sources: ScheduleSources<R>
    ) -> Result<InMemorySchedules, ScheduleLoaderError> {
        let federal: Vec<BracketRecord> = Self::parse(FEDERAL_FILE, sources.federal)?;
        let meta: Vec<FederalMetaRecord> = Self::parse(FEDERAL_META_FILE, sources.federal_meta)?;
        let cantons: Vec<CantonRecord> = Self::parse(CANTONS_FILE, sources.cantons)?;
        let income: Vec<IncomeBracketRecord> =
            Self::parse(INCOME_BRACKETS_FILE, sources.income_brackets)?;
        let wealth: Vec<WealthBracketRecord> =
            Self::parse(WEALTH_BRACKETS_FILE, sources.wealth_brackets)?;
        let municipalities: Vec<MunicipalityRecord> =
            Self::parse(MUNICIPALITIES_FILE, sources.municipalities)?;

        let [meta] = meta.as_slice() else {
            return Err(ScheduleLoaderError::FederalMeta(meta.len()));
        };

        let mut tables: BTreeMap<String, CantonTables> = cantons
            .iter()
            .map(|c| (canton_key(&c.code), CantonTables::default()))
            .collect();

        for (idx, record) in income.into_iter().enumerate() {
            let entry = table_for(&mut tables, INCOME_BRACKETS_FILE, &record.canton, idx + 1)?;
            let bracket = TaxBracket {
                from: record.from,
                to: record.to,
                base: record.base,
                rate: record.rate,
            };
            match record.tariff.trim().to_ascii_lowercase().as_str() {
                "single" => entry.single.push(bracket),
                "married" => entry.married.push(bracket),
                _ => {
                    return Err(ScheduleLoaderError::UnknownTariff {
                        file: INCOME_BRACKETS_FILE,
                        tariff: record.tariff,
                        row: idx + 1,
                    });
                }
            }
        }

        for (idx, record) in wealth.into_iter().enumerate() {
            table_for(&mut tables, WEALTH_BRACKETS_FILE, &record.canton, idx + 1)?
                .wealth
                .push(WealthTaxBracket {
                    from: record.from,
                    to: record.to,
                    base: record.base,
                    rate: record.rate,
                });
        }

        for (idx, record) in municipalities.into_iter().enumerate() {
            table_for(&mut tables, MUNICIPALITIES_FILE, &record.canton, idx + 1)?
                .municipalities
                .push(Municipality {
                    name: record.name,
                    multiplier: record.multiplier,
                });
        }

        let mut canton_data = Vec::with_capacity(cantons.len());
        for record in cantons {
            let key = canton_key(&record.code);
            let tables = tables.remove(&key).unwrap_or_default();
            canton_data.push(convert_canton(record, tables)?);
        }

        let mut federal_brackets: Vec<TaxBracket> = federal
            .into_iter()
            .map(|r| TaxBracket {
                from: r.from,
                to: r.to,
                base: r.base,
                rate: r.rate,
            })
            .collect();
        federal_brackets.sort_by(|a, b| a.from.cmp(&b.from));

        let schedules = InMemorySchedules::new(
            meta.tax_year,
            FederalTaxData {
                brackets: federal_brackets,
                child_credit: meta.child_credit,
            },
            canton_data,
        )?;

        info!(
            tax_year = meta.tax_year,
            cantons = schedules.len(),
            "tax schedules loaded"
        );
        Ok(schedules)
    }

    /// Reads the six tables from `dir`.
    pub fn from_dir(dir: &Path) -> Result<InMemorySchedules, ScheduleLoaderError> {
        debug!(dir = %dir.display(), "loading tax schedules");

        let read = |name: &str| {
            let path = dir.join(name);
            std::fs::read(&path).map_err(|source| ScheduleLoaderError::Io {
                path: path.display().to_string(),
                source,
            })
        };

        let federal = read(FEDERAL_FILE)?;
        let federal_meta = read(FEDERAL_META_FILE)?;
        let cantons = read(CANTONS_FILE)?;
        let income_brackets = read(INCOME_BRACKETS_FILE)?;
        let wealth_brackets = read(WEALTH_BRACKETS_FILE)?;
        let municipalities = read(MUNICIPALITIES_FILE)?;

        Self::from_sources(ScheduleSources {
            federal: federal.as_slice(),
            federal_meta: federal_meta.as_slice(),
            cantons: cantons.as_slice(),
            income_brackets: income_brackets.as_slice(),
            wealth_brackets: wealth_brackets.as_slice(),
            municipalities: municipalities.as_slice(),
        })
    }
}

fn canton_key(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

fn table_for<'t>(
    tables: &'t mut BTreeMap<String, CantonTables>,
    file: &'static str,
    canton: &str,
    row: usize,
) -> Result<&'t mut CantonTables, ScheduleLoaderError> {
    tables
        .get_mut(&canton_key(canton))
        .ok_or_else(|| ScheduleLoaderError::UnknownCanton {
            file,
            canton: canton.to_string(),
            row,
        })
}

fn convert_canton(
    record: CantonRecord,
    mut tables: CantonTables,
) -> Result<CantonTaxData, ScheduleLoaderError> {
    let code = canton_key(&record.code);
    let missing = |table| ScheduleLoaderError::MissingTable {
        canton: code.clone(),
        table,
    };

    if tables.single.is_empty() {
        return Err(missing("single tariff"));
    }
    if tables.married.is_empty() {
        return Err(missing("married tariff"));
    }
    if tables.wealth.is_empty() {
        return Err(missing("wealth"));
    }
    if tables.municipalities.is_empty() {
        return Err(missing("municipality"));
    }

    tables.single.sort_by(|a, b| a.from.cmp(&b.from));
    tables.married.sort_by(|a, b| a.from.cmp(&b.from));
    tables.wealth.sort_by(|a, b| a.from.cmp(&b.from));

    Ok(CantonTaxData {
        code,
        name: record.name,
        cantonal_multiplier: record.cantonal_multiplier,
        confessional_rate: record.confessional_rate,
        income_brackets: IncomeTariffs {
            single: tables.single,
            married: tables.married,
        },
        wealth_brackets: tables.wealth,
        deduction_limits: DeductionLimits {
            personal: record.personal,
            per_child: record.per_child,
            pillar3a_employed: record.pillar3a_employed,
            pillar3a_self_employed: record.pillar3a_self_employed,
            insurance_single: record.insurance_single,
            insurance_married: record.insurance_married,
            professional_expenses_min: record.professional_expenses_min,
            professional_expenses_max: record.professional_expenses_max,
            professional_expenses_percent: record.professional_expenses_percent,
            childcare_per_child: record.childcare_per_child,
            training_max: record.training_max,
            mortgage_interest_allowance: record.mortgage_interest_allowance,
            donations_percent: record.donations_percent,
            medical_franchise_percent: record.medical_franchise_percent,
            wealth_franchise_single: record.wealth_franchise_single,
            wealth_franchise_married: record.wealth_franchise_married,
        },
        municipalities: tables.municipalities,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;
    use tax_core::TaxScheduleRepository;
    use tax_core::calculations::BracketError;

    use super::*;

    const FEDERAL: &str = "\
from,to,base,rate
0,20000,0,0
20000,,0,5
";

    const META: &str = "tax_year,child_credit\n2025,263\n";

    const CANTONS: &str = "\
code,name,cantonal_multiplier,confessional_rate,personal,per_child,pillar3a_employed,pillar3a_self_employed,insurance_single,insurance_married,professional_expenses_min,professional_expenses_max,professional_expenses_percent,childcare_per_child,training_max,mortgage_interest_allowance,donations_percent,medical_franchise_percent,wealth_franchise_single,wealth_franchise_married
zh,Zürich,98,5,0,9300,7056,35280,2900,5800,2000,4000,3,25000,12400,50000,20,5,80000,159000
";

    const INCOME: &str = "\
canton,tariff,from,to,base,rate
ZH,single,10000,,100,2
ZH,single,0,10000,0,1
ZH,married,0,,0,1
";

    const WEALTH: &str = "canton,from,to,base,rate\nZH,0,,0,1\n";

    const MUNICIPALITIES: &str = "\
canton,name,multiplier
ZH,Zürich,119
ZH,Winterthur,125
";

    fn sources<'a>(
        cantons: &'a str,
        income: &'a str,
        municipalities: &'a str,
    ) -> ScheduleSources<&'a [u8]> {
        ScheduleSources {
            federal: FEDERAL.as_bytes(),
            federal_meta: META.as_bytes(),
            cantons: cantons.as_bytes(),
            income_brackets: income.as_bytes(),
            wealth_brackets: WEALTH.as_bytes(),
            municipalities: municipalities.as_bytes(),
        }
    }

    // =========================================================================
    // parse tests
    // =========================================================================

    #[test]
    fn parse_unbounded_bracket() {
        let records: Vec<BracketRecord> =
            ScheduleLoader::parse(FEDERAL_FILE, FEDERAL.as_bytes()).unwrap();

        assert_eq!(
            records[1],
            BracketRecord {
                from: dec!(20000),
                to: None,
                base: dec!(0),
                rate: dec!(5),
            }
        );
    }

    #[test]
    fn parse_tolerates_whitespace() {
        let csv = "canton,name,multiplier\n ZH , Uster , 104 \n";

        let records: Vec<MunicipalityRecord> =
            ScheduleLoader::parse(MUNICIPALITIES_FILE, csv.as_bytes()).unwrap();

        assert_eq!(records[0].name, "Uster");
        assert_eq!(records[0].multiplier, dec!(104));
    }

    #[test]
    fn parse_reports_file_on_error() {
        let csv = "from,to,base,rate\nzero,1,0,0\n";

        let result: Result<Vec<BracketRecord>, _> =
            ScheduleLoader::parse(FEDERAL_FILE, csv.as_bytes());

        assert!(matches!(
            result,
            Err(ScheduleLoaderError::CsvParse { file: FEDERAL_FILE, .. })
        ));
    }

    // =========================================================================
    // from_sources tests
    // =========================================================================

    #[test]
    fn from_sources_builds_sorted_tables() {
        let schedules =
            ScheduleLoader::from_sources(sources(CANTONS, INCOME, MUNICIPALITIES)).unwrap();
        let zh = schedules.canton("ZH").unwrap();

        assert_eq!(schedules.tax_year(), 2025);
        assert_eq!(schedules.federal().child_credit, dec!(263));
        assert_eq!(zh.code, "ZH");
        assert_eq!(zh.income_brackets.single[0].from, dec!(0));
        assert_eq!(zh.income_brackets.single[1].from, dec!(10000));
        assert_eq!(zh.default_municipality().unwrap().name, "Zürich");
        assert_eq!(zh.deduction_limits.pillar3a_employed, dec!(7056));
    }

    #[test]
    fn from_sources_rejects_unknown_canton() {
        let municipalities = "canton,name,multiplier\nZH,Zürich,119\nXX,Nowhere,100\n";

        let result = ScheduleLoader::from_sources(sources(CANTONS, INCOME, municipalities));

        assert!(matches!(
            result,
            Err(ScheduleLoaderError::UnknownCanton { row: 2, .. })
        ));
    }

    #[test]
    fn from_sources_rejects_unknown_tariff() {
        let income = "canton,tariff,from,to,base,rate\nZH,widowed,0,,0,1\n";

        let result = ScheduleLoader::from_sources(sources(CANTONS, income, MUNICIPALITIES));

        assert!(matches!(
            result,
            Err(ScheduleLoaderError::UnknownTariff { row: 1, .. })
        ));
    }

    #[test]
    fn from_sources_requires_married_tariff() {
        let income = "canton,tariff,from,to,base,rate\nZH,single,0,,0,1\n";

        let result = ScheduleLoader::from_sources(sources(CANTONS, income, MUNICIPALITIES));

        assert!(matches!(
            result,
            Err(ScheduleLoaderError::MissingTable {
                table: "married tariff",
                ..
            })
        ));
    }

    #[test]
    fn from_sources_validates_continuity() {
        let income = "\
canton,tariff,from,to,base,rate
ZH,single,0,10000,0,1
ZH,single,10000,,500,2
ZH,married,0,,0,1
";

        let result = ScheduleLoader::from_sources(sources(CANTONS, income, MUNICIPALITIES));

        match result {
            Err(ScheduleLoaderError::Schedule(ScheduleError::InvalidTable { table, source })) => {
                assert_eq!(table, "ZH single");
                assert!(matches!(source, BracketError::Discontinuous { index: 1, .. }));
            }
            other => panic!("expected an invalid table, got {other:?}"),
        }
    }

    #[test]
    fn from_sources_requires_single_meta_row() {
        let mut src = sources(CANTONS, INCOME, MUNICIPALITIES);
        src.federal_meta = "tax_year,child_credit\n".as_bytes();

        let result = ScheduleLoader::from_sources(src);

        assert!(matches!(result, Err(ScheduleLoaderError::FederalMeta(0))));
    }

    #[test]
    fn from_dir_reports_missing_file() {
        let result = ScheduleLoader::from_dir(Path::new("/nonexistent/schedules"));

        assert!(matches!(result, Err(ScheduleLoaderError::Io { .. })));
    }
}
