use std::collections::BTreeMap;

use super::repository::{ScheduleError, TaxScheduleRepository};
use crate::calculations::validate_schedule;
use crate::models::{CantonTaxData, FederalTaxData};

/// Validated tax tables held in memory, keyed by upper-case canton code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemorySchedules {
    tax_year: i32,
    federal: FederalTaxData,
    cantons: BTreeMap<String, CantonTaxData>,
}

impl InMemorySchedules {
    /// Checks every bracket table and municipality list before accepting
    /// the data.
    ///
    /// # Errors
    ///
    /// Returns [`ScheduleError`] naming the first offending table or canton.
    pub fn new(
        tax_year: i32,
        federal: FederalTaxData,
        cantons: impl IntoIterator<Item = CantonTaxData>,
    ) -> Result<Self, ScheduleError> {
        validate_schedule(&federal.brackets).map_err(|source| ScheduleError::InvalidTable {
            table: "federal".to_string(),
            source,
        })?;

        let mut by_code = BTreeMap::new();
        for mut canton in cantons {
            canton.code = canton.code.trim().to_ascii_uppercase();
            validate_canton(&canton)?;

            if by_code.contains_key(&canton.code) {
                return Err(ScheduleError::DuplicateCanton(canton.code));
            }
            by_code.insert(canton.code.clone(), canton);
        }

        Ok(Self {
            tax_year,
            federal,
            cantons: by_code,
        })
    }

    pub fn len(&self) -> usize {
        self.cantons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cantons.is_empty()
    }

    pub fn cantons(&self) -> impl Iterator<Item = &CantonTaxData> {
        self.cantons.values()
    }
}

fn validate_canton(canton: &CantonTaxData) -> Result<(), ScheduleError> {
    let invalid = |tariff: &str| {
        let table = format!("{} {tariff}", canton.code);
        move |source| ScheduleError::InvalidTable { table, source }
    };

    validate_schedule(&canton.income_brackets.single).map_err(invalid("single"))?;
    validate_schedule(&canton.income_brackets.married).map_err(invalid("married"))?;
    validate_schedule(&canton.wealth_brackets).map_err(invalid("wealth"))?;

    if canton.municipalities.is_empty() {
        return Err(ScheduleError::NoMunicipalities(canton.code.clone()));
    }
    Ok(())
}

impl TaxScheduleRepository for InMemorySchedules {
    fn tax_year(&self) -> i32 {
        self.tax_year
    }

    fn federal(&self) -> &FederalTaxData {
        &self.federal
    }

    fn canton(&self, code: &str) -> Result<&CantonTaxData, ScheduleError> {
        self.cantons
            .get(&code.trim().to_ascii_uppercase())
            .ok_or_else(|| ScheduleError::UnknownCanton(code.to_string()))
    }

    fn canton_codes(&self) -> Vec<&str> {
        self.cantons.keys().map(String::as_str).collect()
    }
}
