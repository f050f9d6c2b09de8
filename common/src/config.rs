//! Cleaning configuration
//!
//! Defaults match the field names the job crawler emits. [`CleanConfig::load`]
//! layers an optional TOML/JSON file and `JOBCLEAN_*` environment variables on
//! top of them (nested keys use `__`, e.g. `JOBCLEAN_COLUMNS__AGE=age`).

use crate::error::{CleanError, Result};
use crate::salary::SalaryFill;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which dataset columns hold which job fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Columns {
    /// Salary value columns, minimum first then maximum.
    pub salary: Vec<String>,
    /// Yearly/hourly label column. When `None` inference never writes a type.
    pub salary_type: Option<String>,
    pub age: String,
    pub description: String,
    pub key: String,
    pub title: String,
    pub company: String,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            salary: vec!["salarymin".to_string(), "salarymax".to_string()],
            salary_type: Some("salarytype".to_string()),
            age: "post_age".to_string(),
            description: "jobDescription".to_string(),
            key: "jobkey".to_string(),
            title: "jobTitle".to_string(),
            company: "company".to_string(),
        }
    }
}

impl Columns {
    /// The (min, max) salary column pair inference writes to.
    pub fn salary_pair(&self) -> Result<(&str, &str)> {
        match self.salary.as_slice() {
            [min, max] => Ok((min, max)),
            other => Err(CleanError::SalaryColumns { found: other.len() }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanConfig {
    pub columns: Columns,
    /// Drop the first `n_meta` columns before cleaning.
    pub drop_meta: bool,
    pub n_meta: usize,
    /// Drop the description column once salaries have been inferred.
    pub drop_desc: bool,
    pub fill: SalaryFill,
}

impl Default for CleanConfig {
    fn default() -> Self {
        Self {
            columns: Columns::default(),
            drop_meta: false,
            n_meta: 4,
            drop_desc: false,
            fill: SalaryFill::Mean,
        }
    }
}

impl CleanConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        let settings = builder
            .add_source(
                Environment::with_prefix("JOBCLEAN")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
