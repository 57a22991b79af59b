//! CSV loader for batches of taxpayer profiles.
//!
//! ## CSV Format
//!
//! Headers are matched by name, so column order does not matter. Only
//! `canton` is required; every other column may be left out entirely or
//! left empty in a row.
//!
//! | Column                  | Type    | Notes                                              |
//! |-------------------------|---------|----------------------------------------------------|
//! | `name`                  | string  | Label in reports, defaults to `row N`              |
//! | `canton`                | string  | Two-letter code, case-insensitive                  |
//! | `municipality`          | string  | Empty: the canton's default municipality           |
//! | `civil_status`          | string  | `single`, `married`, `divorced`, `widowed`, `registered_partnership` |
//! | `children`              | integer |                                                    |
//! | `age`                   | integer | Empty: no occupational pension contribution        |
//! | `employment`            | string  | `employed` or `self_employed`                      |
//! | `confession`            | string  | `protestant`, `roman_catholic`, `christ_catholic`  |
//! | `gross_salary`          | amount  | Swiss format accepted, e.g. `100'000`              |
//! | `other_income`          | amount  |                                                    |
//! | `asset_income`          | amount  | Interest, dividends, rent; lifts the mortgage cap  |
//! | `gross_wealth`          | amount  |                                                    |
//! | `debts`                 | amount  |                                                    |
//! | `pillar_3a`, `insurance_premiums`, `professional_expenses`, `childcare`, `training`, `donations`, `mortgage_interest`, `alimony`, `medical_expenses`, `other_deductions` | amount | Claimed deductions |
//!
//! ### Example
//!
//! ```csv
//! name,canton,municipality,civil_status,children,age,gross_salary,pillar_3a
//! Anna,ZH,Zürich,single,0,34,100'000,7'056
//! Family Meier,BE,,married,2,41,145'000,
//! ```

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::Deserialize;
use tax_core::{
    CivilStatus, Confession, EmploymentStatus, InputUpdate, TaxCalculationInput,
};

use crate::utils::parse_chf;

// ---------------------------------------------------------------------------
// Serde-compatible row that mirrors the CSV layout
// ---------------------------------------------------------------------------

/// Amounts stay strings here so that Swiss formatting can be parsed with
/// row context in the error.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    name: String,
    canton: String,
    municipality: String,
    civil_status: String,
    children: String,
    age: String,
    employment: String,
    confession: String,
    gross_salary: String,
    other_income: String,
    asset_income: String,
    gross_wealth: String,
    debts: String,
    pillar_3a: String,
    insurance_premiums: String,
    professional_expenses: String,
    childcare: String,
    training: String,
    donations: String,
    mortgage_interest: String,
    alimony: String,
    medical_expenses: String,
    other_deductions: String,
}

/// One taxpayer read from a profile file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub label: String,
    pub input: TaxCalculationInput,
}

// ---------------------------------------------------------------------------
// Public error type
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or converting profile rows.
#[derive(Debug, thiserror::Error)]
pub enum ProfileLoadError {
    /// The profile file could not be read.
    #[error("cannot read profile file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV structure is invalid (unbalanced quotes, wrong column
    /// count and so on).
    #[error("CSV parse error: {0}")]
    Parse(#[from] csv::Error),

    /// The `canton` cell is empty. `row` is 1-based, the header is row 0.
    #[error("missing canton on row {row}")]
    MissingCanton { row: usize },

    /// A cell could not be converted to its column's type.
    #[error("invalid {column} '{value}' on row {row}")]
    InvalidValue {
        column: &'static str,
        value: String,
        row: usize,
    },
}

// ---------------------------------------------------------------------------
// Core loader
// ---------------------------------------------------------------------------

fn invalid(
    column: &'static str,
    value: &str,
    row: usize,
) -> ProfileLoadError {
    ProfileLoadError::InvalidValue {
        column,
        value: value.to_string(),
        row,
    }
}

fn amount(
    column: &'static str,
    value: &str,
    row: usize,
) -> Result<Decimal, ProfileLoadError> {
    parse_chf(value).map_err(|_| invalid(column, value, row))
}

/// Convert a single CSV row into a [`Profile`].
///
/// `row_number` is 1-based (for error messages).
fn convert_row(
    row: CsvRow,
    row_number: usize,
) -> Result<Profile, ProfileLoadError> {
    if row.canton.is_empty() {
        return Err(ProfileLoadError::MissingCanton { row: row_number });
    }

    let mut input = TaxCalculationInput::new(row.canton.to_ascii_uppercase(), row.municipality);

    if !row.civil_status.is_empty() {
        let status = CivilStatus::parse(&row.civil_status)
            .ok_or_else(|| invalid("civil_status", row.civil_status.as_str(), row_number))?;
        input.apply(InputUpdate::CivilStatus(status));
    }
    if !row.children.is_empty() {
        let children = row
            .children
            .parse()
            .map_err(|_| invalid("children", row.children.as_str(), row_number))?;
        input.apply(InputUpdate::Children(children));
    }
    if !row.age.is_empty() {
        let age = row
            .age
            .parse()
            .map_err(|_| invalid("age", row.age.as_str(), row_number))?;
        input.apply(InputUpdate::Age(Some(age)));
    }
    if !row.employment.is_empty() {
        let employment = EmploymentStatus::parse(&row.employment)
            .ok_or_else(|| invalid("employment", row.employment.as_str(), row_number))?;
        input.apply(InputUpdate::Employment(employment));
    }
    if !row.confession.is_empty() {
        let confession = Confession::parse(&row.confession)
            .ok_or_else(|| invalid("confession", row.confession.as_str(), row_number))?;
        input.apply(InputUpdate::Confession(Some(confession)));
    }

    let amounts: [(&'static str, &str, fn(Decimal) -> InputUpdate); 15] = [
        ("gross_salary", row.gross_salary.as_str(), InputUpdate::GrossSalary),
        ("other_income", row.other_income.as_str(), InputUpdate::OtherIncome),
        ("asset_income", row.asset_income.as_str(), InputUpdate::AssetIncome),
        ("gross_wealth", row.gross_wealth.as_str(), InputUpdate::GrossWealth),
        ("debts", row.debts.as_str(), InputUpdate::Debts),
        ("pillar_3a", row.pillar_3a.as_str(), InputUpdate::Pillar3a),
        ("insurance_premiums", row.insurance_premiums.as_str(), InputUpdate::InsurancePremiums),
        ("professional_expenses", row.professional_expenses.as_str(), InputUpdate::ProfessionalExpenses),
        ("childcare", row.childcare.as_str(), InputUpdate::Childcare),
        ("training", row.training.as_str(), InputUpdate::Training),
        ("donations", row.donations.as_str(), InputUpdate::Donations),
        ("mortgage_interest", row.mortgage_interest.as_str(), InputUpdate::MortgageInterest),
        ("alimony", row.alimony.as_str(), InputUpdate::Alimony),
        ("medical_expenses", row.medical_expenses.as_str(), InputUpdate::MedicalExpenses),
        ("other_deductions", row.other_deductions.as_str(), InputUpdate::OtherDeductions),
    ];
    for (column, value, update) in amounts {
        input.apply(update(amount(column, value, row_number)?));
    }

    let label = if row.name.is_empty() {
        format!("row {row_number}")
    } else {
        row.name
    };

    Ok(Profile { label, input })
}

/// Parse CSV text and return the profiles in file order.
///
/// # Errors
///
/// * [`ProfileLoadError::Parse`] if the CSV is structurally invalid.
/// * [`ProfileLoadError::MissingCanton`] or
///   [`ProfileLoadError::InvalidValue`] for the first bad row.
pub fn load_from_str(input: &str) -> Result<Vec<Profile>, ProfileLoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(input.as_bytes());

    reader
        .deserialize::<CsvRow>()
        .enumerate()
        .map(|(idx, result)| {
            let row = result?;
            convert_row(row, idx + 1)
        })
        .collect()
}

/// Read a file from disk and delegate to [`load_from_str`].
pub fn load_from_file(path: &Path) -> Result<Vec<Profile>, ProfileLoadError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ProfileLoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let profiles = load_from_str(&contents)?;
    tracing::debug!(count = profiles.len(), path = %path.display(), "profiles loaded");
    Ok(profiles)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    const MINIMAL_CSV: &str = "\
canton,gross_salary
zh,85000
";

    const FULL_CSV: &str = "\
name,canton,municipality,civil_status,children,age,employment,confession,gross_salary,other_income,asset_income,gross_wealth,debts,pillar_3a,insurance_premiums,professional_expenses,childcare,training,donations,mortgage_interest,alimony,medical_expenses,other_deductions
Meier,BE,Bern,married,2,41,self_employed,roman_catholic,145'000,2'500,1'200,600'000,150'000,7'056,5'000,3'000,8'000,1'000,500,9'000,0,4'000,250
";

    // -----------------------------------------------------------------------
    // 1. Minimal CSV
    // -----------------------------------------------------------------------
    #[test]
    fn test_minimal_csv_uses_input_defaults() {
        let profiles = load_from_str(MINIMAL_CSV).expect("should parse minimal CSV");

        assert_eq!(profiles.len(), 1);
        let expected = TaxCalculationInput::new("ZH", "")
            .with(InputUpdate::GrossSalary(dec!(85000)));
        assert_eq!(profiles[0].label, "row 1");
        assert_eq!(profiles[0].input, expected);
    }

    // -----------------------------------------------------------------------
    // 2. Full CSV
    // -----------------------------------------------------------------------
    #[test]
    fn test_full_csv_all_fields_populated() {
        let profiles = load_from_str(FULL_CSV).expect("should parse full CSV");
        let p = &profiles[0];
        let input = &p.input;

        assert_eq!(p.label, "Meier");
        assert_eq!(input.canton, "BE");
        assert_eq!(input.municipality, "Bern");
        assert_eq!(input.civil_status, CivilStatus::Married);
        assert_eq!(input.children, 2);
        assert_eq!(input.age, Some(41));
        assert_eq!(input.employment, EmploymentStatus::SelfEmployed);
        assert_eq!(input.confession, Some(Confession::RomanCatholic));
        assert_eq!(input.gross_salary, dec!(145000));
        assert_eq!(input.other_income, dec!(2500));
        assert_eq!(input.asset_income, dec!(1200));
        assert_eq!(input.gross_wealth, dec!(600000));
        assert_eq!(input.debts, dec!(150000));
        assert_eq!(input.deductions.pillar_3a, dec!(7056));
        assert_eq!(input.deductions.insurance_premiums, dec!(5000));
        assert_eq!(input.deductions.professional_expenses, dec!(3000));
        assert_eq!(input.deductions.childcare, dec!(8000));
        assert_eq!(input.deductions.training, dec!(1000));
        assert_eq!(input.deductions.donations, dec!(500));
        assert_eq!(input.deductions.mortgage_interest, dec!(9000));
        assert_eq!(input.deductions.alimony, dec!(0));
        assert_eq!(input.deductions.medical_expenses, dec!(4000));
        assert_eq!(input.deductions.other, dec!(250));
    }

    // -----------------------------------------------------------------------
    // 3. Empty cells
    // -----------------------------------------------------------------------
    #[test]
    fn test_empty_cells_keep_defaults() {
        let csv = "canton,municipality,age,confession,gross_salary\nGE,,,,\n";

        let profiles = load_from_str(csv).expect("should parse");
        let input = &profiles[0].input;

        assert_eq!(input.municipality, "");
        assert_eq!(input.age, None);
        assert_eq!(input.confession, None);
        assert_eq!(input.gross_salary, dec!(0));
    }

    // -----------------------------------------------------------------------
    // 4. Errors carry the row number
    // -----------------------------------------------------------------------
    #[test]
    fn test_missing_canton_is_reported() {
        let csv = "canton,gross_salary\nZH,1\n,2\n";

        let error = load_from_str(csv).unwrap_err();

        assert!(matches!(error, ProfileLoadError::MissingCanton { row: 2 }));
    }

    #[test]
    fn test_invalid_values_are_reported_per_column() {
        let cases = [
            ("civil_status", "engaged"),
            ("children", "two"),
            ("age", "-3"),
            ("employment", "retired"),
            ("confession", "jedi"),
            ("gross_salary", "12'34"),
        ];

        for (column, value) in cases {
            let csv = format!("canton,{column}\nZH,{value}\n");
            let error = load_from_str(&csv).unwrap_err();

            match error {
                ProfileLoadError::InvalidValue {
                    column: c,
                    value: v,
                    row,
                } => {
                    assert_eq!((c, v.as_str(), row), (column, value, 1));
                }
                other => panic!("unexpected error for {column}: {other}"),
            }
        }
    }

    #[test]
    fn test_ragged_rows_are_rejected() {
        let csv = "canton,gross_salary\nZH,1,2\n";

        assert!(matches!(
            load_from_str(csv),
            Err(ProfileLoadError::Parse(_))
        ));
    }
}
