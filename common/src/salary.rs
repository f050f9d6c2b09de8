//! Salary normalization
//!
//! Listings often leave the structured salary fields empty and only quote pay
//! in the description. [`infer_salary`] recovers a range from those figures
//! when they fall in a recognizable hourly or yearly band. Everything is then
//! expressed per hour and the remaining gaps are filled.

use crate::config::Columns;
use crate::dataset::{Dataset, cell_f64};
use crate::error::{CleanError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use tracing::{debug, info, warn};

/// Working hours assumed per year: 42 weeks at 50 hours.
pub const HOURS_PER_YEAR: f64 = 42.0 * 50.0;

/// Figures below this are never a salary.
const MIN_CREDIBLE: f64 = 15.0;
/// Hourly figures sit below this.
const HOURLY_CEILING: f64 = 100.0;
/// Yearly figures start here. Between the ceiling and this floor is ambiguous.
const YEARLY_FLOOR: f64 = 50_000.0;
/// A leading hourly figure above this cannot pair with a small second figure.
const HOURLY_PAIR_LIMIT: f64 = 60.0;
const MISREAD_LOW: f64 = 1_000.0;
const MISREAD_HIGH: f64 = 10_000.0;
/// Ranges whose maximum reaches this are labelled yearly.
const YEARLY_THRESHOLD: f64 = 10_000.0;

static RE_DOLLAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$(\d[\d,]*(?:\.\d+)?)(?:[^A-Za-z]|$)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SalaryType {
    Yearly,
    Hourly,
    Unknown,
}

impl SalaryType {
    /// Reads a crawler label such as `"yearly"` or `"HOURLY"`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "yearly" | "year" | "annual" | "annually" => SalaryType::Yearly,
            "hourly" | "hour" => SalaryType::Hourly,
            _ => SalaryType::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SalaryType::Yearly => "yearly",
            SalaryType::Hourly => "hourly",
            SalaryType::Unknown => "unknown",
        }
    }

    pub fn from_cell(value: &Value) -> Option<Self> {
        value.as_str().map(Self::parse)
    }
}

impl fmt::Display for SalaryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferredSalary {
    pub min: f64,
    pub max: f64,
    pub salary_type: SalaryType,
}

/// Fallback for salaries still missing after inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryFill {
    /// Each column's mean over its non-null values, rounded to cents.
    #[default]
    Mean,
    /// One value for every salary column.
    Value(f64),
    /// One value per salary column, in column order.
    PerColumn(Vec<f64>),
}

/// Rounds to cents, half to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Every dollar figure quoted in `text`, in order of appearance.
pub fn dollar_amounts(text: &str) -> Vec<f64> {
    RE_DOLLAR
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .filter_map(|m| m.as_str().replace(',', "").parse::<f64>().ok())
        .filter(|v| v.is_finite())
        .collect()
}

/// Infers a salary range from the dollar figures in a description.
///
/// Returns `None` when there is no figure or the figures fail the plausibility
/// checks, so the row can be left for manual review.
pub fn infer_salary(description: &str) -> Option<InferredSalary> {
    let amounts = dollar_amounts(description);

    let (first, second) = match amounts.as_slice() {
        [] => return None,
        [only] => (*only, *only),
        [a, b] => (*a, *b),
        many => (
            many.iter().copied().fold(f64::INFINITY, f64::min),
            many.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        ),
    };

    let (first, second) = check_pair(first, second)?;
    let (min, max) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };

    let salary_type = if max >= YEARLY_THRESHOLD {
        SalaryType::Yearly
    } else {
        SalaryType::Hourly
    };

    Some(InferredSalary {
        min,
        max,
        salary_type,
    })
}

fn check_pair(first: f64, second: f64) -> Option<(f64, f64)> {
    let ambiguous = |v: f64| v > HOURLY_CEILING && v < YEARLY_FLOOR;

    if first < MIN_CREDIBLE || second < MIN_CREDIBLE {
        return None;
    }
    if ambiguous(first) || ambiguous(second) {
        return None;
    }
    // An hourly rate quoted next to a yearly-looking figure: keep the rate.
    if first < HOURLY_CEILING
        && ((MISREAD_LOW..=MISREAD_HIGH).contains(&second) || second >= YEARLY_FLOOR)
    {
        return Some((first, first));
    }
    if first > HOURLY_PAIR_LIMIT && second <= MISREAD_HIGH {
        return None;
    }
    Some((first, second))
}

/// Fills empty salary rows from their description text.
///
/// Only rows whose minimum salary is null are touched. When a type column is
/// configured it receives the inferred yearly/hourly label.
pub fn infer_salaries(dataset: &Dataset, columns: &Columns) -> Result<Dataset> {
    let (min_col, max_col) = columns.salary_pair()?;
    let min_idx = dataset.column_index(min_col)?;
    let max_idx = dataset.column_index(max_col)?;
    let desc_idx = dataset.column_index(&columns.description)?;
    let type_idx = match &columns.salary_type {
        Some(name) => Some(dataset.column_index(name)?),
        None => None,
    };

    let mut out = dataset.clone();
    let mut inferred = 0usize;
    let mut skipped = 0usize;

    for (i, row) in out.rows_mut().iter_mut().enumerate() {
        if !row[min_idx].is_null() {
            continue;
        }
        let Some(description) = row[desc_idx].as_str() else {
            continue;
        };
        match infer_salary(description) {
            Some(salary) => {
                debug!(row = i, min = salary.min, max = salary.max, salary_type = %salary.salary_type, "inferred salary");
                row[min_idx] = Value::from(salary.min);
                row[max_idx] = Value::from(salary.max);
                if let Some(idx) = type_idx {
                    row[idx] = Value::from(salary.salary_type.as_str());
                }
                inferred += 1;
            }
            None => {
                if !dollar_amounts(description).is_empty() {
                    debug!(row = i, "salary figures left for review");
                    skipped += 1;
                }
            }
        }
    }

    info!(inferred, skipped, rows = out.len(), "salary inference");
    Ok(out)
}

/// Converts yearly salaries to hourly and labels every row hourly.
///
/// Rows with a missing or unrecognized type are taken to be hourly already.
pub fn convert_yearly_to_hourly(dataset: &Dataset, columns: &Columns) -> Result<Dataset> {
    let Some(type_col) = &columns.salary_type else {
        return Ok(dataset.clone());
    };
    let type_idx = dataset.column_index(type_col)?;
    let salary_idx = columns
        .salary
        .iter()
        .map(|col| dataset.column_index(col))
        .collect::<Result<Vec<usize>>>()?;

    let mut out = dataset.clone();
    let mut converted = 0usize;

    for (i, row) in out.rows_mut().iter_mut().enumerate() {
        match SalaryType::from_cell(&row[type_idx]) {
            Some(SalaryType::Yearly) => {
                for &idx in &salary_idx {
                    if let Some(yearly) = cell_f64(&row[idx]) {
                        row[idx] = Value::from(round2(yearly / HOURS_PER_YEAR));
                    }
                }
                converted += 1;
            }
            Some(SalaryType::Hourly) => {}
            Some(SalaryType::Unknown) => {
                warn!(row = i, label = ?row[type_idx], "unrecognized salary type, assuming hourly");
            }
            None => {}
        }
        row[type_idx] = Value::from(SalaryType::Hourly.as_str());
    }

    info!(converted, rows = out.len(), "yearly salaries converted to hourly");
    Ok(out)
}

/// Replaces any null salary cell according to `fill`.
///
/// With a (min, max) column pair a filled bound never crosses the row's other
/// bound: it is capped to it, and two filled bounds are put in order.
pub fn fill_null_salary(dataset: &Dataset, salary_cols: &[String], fill: &SalaryFill) -> Result<Dataset> {
    let values: Vec<Option<f64>> = match fill {
        SalaryFill::PerColumn(values) => {
            if values.len() != salary_cols.len() {
                return Err(CleanError::FillLength {
                    values: values.len(),
                    columns: salary_cols.len(),
                });
            }
            values.iter().copied().map(Some).collect()
        }
        SalaryFill::Value(value) => vec![Some(*value); salary_cols.len()],
        SalaryFill::Mean => salary_cols
            .iter()
            .map(|col| column_mean(dataset, col))
            .collect::<Result<_>>()?,
    };

    let idx = salary_cols
        .iter()
        .map(|col| dataset.column_index(col))
        .collect::<Result<Vec<usize>>>()?;
    for (col, value) in salary_cols.iter().zip(&values) {
        if value.is_none() {
            warn!(column = %col, "no salary values to average, leaving nulls");
        }
    }

    let mut out = dataset.clone();
    let mut filled = vec![0usize; idx.len()];
    for row in out.rows_mut().iter_mut() {
        let mut touched = vec![false; idx.len()];
        for (k, &i) in idx.iter().enumerate() {
            if let (true, Some(value)) = (row[i].is_null(), values[k]) {
                row[i] = Value::from(value);
                touched[k] = true;
                filled[k] += 1;
            }
        }
        if let ([lo, hi], [lo_filled, hi_filled]) = (idx.as_slice(), touched.as_slice()) {
            keep_bounds_ordered(row, (*lo, *lo_filled), (*hi, *hi_filled));
        }
    }

    for (col, filled) in salary_cols.iter().zip(filled) {
        debug!(column = %col, filled, "filled null salaries");
    }
    Ok(out)
}

/// Moves a filled bound onto the row's other bound when it would cross it.
/// Scraped values that are already out of order are left alone.
fn keep_bounds_ordered(row: &mut [Value], (lo, lo_filled): (usize, bool), (hi, hi_filled): (usize, bool)) {
    let (Some(min), Some(max)) = (cell_f64(&row[lo]), cell_f64(&row[hi])) else {
        return;
    };
    if min <= max {
        return;
    }
    match (lo_filled, hi_filled) {
        (true, true) => row.swap(lo, hi),
        (true, false) => row[lo] = row[hi].clone(),
        (false, true) => row[hi] = row[lo].clone(),
        (false, false) => {}
    }
}

fn column_mean(dataset: &Dataset, col: &str) -> Result<Option<f64>> {
    let values: Vec<f64> = dataset
        .column(col)?
        .into_iter()
        .filter_map(cell_f64)
        .collect();
    if values.is_empty() {
        return Ok(None);
    }
    Ok(Some(round2(values.iter().sum::<f64>() / values.len() as f64)))
}
