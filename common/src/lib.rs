//! Job listing cleaning
//!
//! Turns scraped job records into a uniform table: salaries inferred from
//! descriptions where missing, expressed per hour, gaps filled, and posting
//! ages in whole days.

pub mod age;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod review;
pub mod salary;
pub mod text;

pub use age::{AgeGroup, PostAge};
pub use config::{CleanConfig, Columns};
pub use dataset::{Dataset, combine, combine_all};
pub use error::{CleanError, Result};
pub use pipeline::clean;
pub use review::{JsonViewedStore, MemoryViewedStore, ViewedStore};
pub use salary::{SalaryFill, SalaryType};

use dataset::cell_f64;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One job listing, read out of a dataset by column name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct JobRecord {
    pub job_key: String,
    pub title: Option<String>,
    pub company: Option<String>,
    pub description: String,
    pub salary_min: Option<f64>,
    pub salary_max: Option<f64>,
    pub salary_type: Option<SalaryType>,
    pub post_age: PostAge,
}

impl JobRecord {
    /// Projects every row of `dataset` into a record. The key column is
    /// required; title, company, type and description may be absent.
    pub fn from_dataset(dataset: &Dataset, columns: &Columns) -> Result<Vec<JobRecord>> {
        let key_idx = dataset.column_index(&columns.key)?;
        let (min_col, max_col) = columns.salary_pair()?;
        let min_idx = dataset.column_index(min_col)?;
        let max_idx = dataset.column_index(max_col)?;
        let age_idx = dataset.column_index(&columns.age)?;
        let optional = |name: &str| dataset.column_index(name).ok();
        let title_idx = optional(&columns.title);
        let company_idx = optional(&columns.company);
        let desc_idx = optional(&columns.description);
        let type_idx = columns.salary_type.as_deref().and_then(optional);

        let text = |row: &[Value], idx: Option<usize>| {
            idx.and_then(|i| row[i].as_str()).map(str::to_string)
        };

        let records = dataset
            .rows()
            .iter()
            .filter_map(|row| {
                let row = row.as_slice();
                let job_key = review::key_text(&row[key_idx])?;
                let post_age = match &row[age_idx] {
                    Value::Number(n) => match n.as_u64().and_then(|d| u32::try_from(d).ok()) {
                        Some(days) => PostAge::Days(days),
                        None => PostAge::Text(n.to_string()),
                    },
                    other => PostAge::Text(other.as_str().unwrap_or_default().to_string()),
                };
                Some(JobRecord {
                    job_key,
                    title: text(row, title_idx),
                    company: text(row, company_idx),
                    description: text(row, desc_idx).unwrap_or_default(),
                    salary_min: cell_f64(&row[min_idx]),
                    salary_max: cell_f64(&row[max_idx]),
                    salary_type: type_idx.and_then(|i| SalaryType::from_cell(&row[i])),
                    post_age,
                })
            })
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_records_from_cleaned_dataset() {
        let ds: Dataset = serde_json::from_value(json!([
            {"company": "Acme", "jobkey": "a1", "jobTitle": "Data Analyst",
             "salarymin": 21.43, "salarymax": 26.19, "salarytype": "hourly",
             "post_age": 3},
            {"company": "Acme", "jobkey": null, "jobTitle": "Skipped",
             "salarymin": 20.0, "salarymax": 20.0, "salarytype": "hourly",
             "post_age": 1}
        ]))
        .unwrap();

        let records = JobRecord::from_dataset(&ds, &Columns::default()).unwrap();
        assert_eq!(records.len(), 1);
        let job = &records[0];
        assert_eq!(job.job_key, "a1");
        assert_eq!(job.title.as_deref(), Some("Data Analyst"));
        assert_eq!(job.description, "");
        assert_eq!(job.salary_max, Some(26.19));
        assert_eq!(job.salary_type, Some(SalaryType::Hourly));
        assert_eq!(job.post_age, PostAge::Days(3));
    }

    #[test]
    fn test_records_require_key_column() {
        let ds: Dataset = serde_json::from_value(json!([{"jobTitle": "x"}])).unwrap();
        assert!(matches!(
            JobRecord::from_dataset(&ds, &Columns::default()),
            Err(CleanError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_records_keep_unusable_ages_as_text() {
        let ds: Dataset = serde_json::from_value(json!([
            {"jobkey": "a1", "salarymin": 20.0, "salarymax": 25.0, "post_age": -3},
            {"jobkey": "b2", "salarymin": 20.0, "salarymax": 25.0, "post_age": 2.5},
            {"jobkey": "c3", "salarymin": 20.0, "salarymax": 25.0, "post_age": 5000000000u64}
        ]))
        .unwrap();

        let records = JobRecord::from_dataset(&ds, &Columns::default()).unwrap();
        let ages: Vec<Option<u32>> = records.iter().map(|job| job.post_age.days()).collect();
        assert_eq!(ages, vec![None, None, None]);
        assert_eq!(records[0].post_age, PostAge::Text("-3".to_string()));
    }
}
