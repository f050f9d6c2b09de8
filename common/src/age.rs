//! Posting age
//!
//! The crawler reports age as display text ("Today", "Just posted",
//! "3 days ago", "30+ days ago"). Listings older than 30 days all read
//! "30+ days ago", so 30 doubles as the "old" bucket.

use crate::dataset::{Dataset, cell_f64};
use crate::error::{CleanError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use tracing::info;

pub const NEW_MAX_DAYS: u32 = 7;
pub const OLD_MIN_DAYS: u32 = 30;

/// Age as scraped, or as whole days once cleaned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PostAge {
    Days(u32),
    Text(String),
}

impl PostAge {
    pub fn days(&self) -> Option<u32> {
        match self {
            PostAge::Days(days) => Some(*days),
            PostAge::Text(text) => parse_post_age(text).ok(),
        }
    }
}

/// Parses age text into days.
///
/// Accepts "Today", "Just posted", "N day(s) ago" and "N+ days ago". A bare
/// number is not age text. Errors carry row 0; [`clean_post_age`] reports the
/// row the cell came from.
pub fn parse_post_age(text: &str) -> Result<u32> {
    let trimmed = text.trim();
    if trimmed.eq_ignore_ascii_case("today") || trimmed.eq_ignore_ascii_case("just posted") {
        return Ok(0);
    }

    trimmed
        .strip_suffix(" days ago")
        .or_else(|| trimmed.strip_suffix(" day ago"))
        .map(|n| n.trim_end_matches('+').trim())
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(|| CleanError::PostAge {
            row: 0,
            value: text.to_string(),
        })
}

fn age_cell(row: usize, value: &Value) -> Result<u32> {
    let err = || CleanError::PostAge {
        row,
        value: value.to_string(),
    };
    match value {
        Value::String(text) => parse_post_age(text).map_err(|_| err()),
        Value::Number(n) => n.as_u64().and_then(|d| u32::try_from(d).ok()).ok_or_else(err),
        _ => Err(err()),
    }
}

/// Rewrites the age column as integer days. Fails on the first cell that is
/// not a recognized age.
pub fn clean_post_age(dataset: &Dataset, age_col: &str) -> Result<Dataset> {
    let out = dataset.map_column(age_col, |row, value| Ok(Value::from(age_cell(row, value)?)))?;
    info!(rows = out.len(), "post ages normalized");
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgeGroup {
    New,
    Middle,
    Old,
}

impl AgeGroup {
    pub fn of(days: u32) -> Self {
        if days <= NEW_MAX_DAYS {
            AgeGroup::New
        } else if days < OLD_MIN_DAYS {
            AgeGroup::Middle
        } else {
            AgeGroup::Old
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgeSplit {
    pub new: Dataset,
    pub middle: Dataset,
    pub old: Dataset,
}

/// Splits a cleaned dataset into new, middle and old listings for review.
pub fn split_by_age(dataset: &Dataset, age_col: &str) -> Result<AgeSplit> {
    let idx = dataset.column_index(age_col)?;
    let groups = dataset
        .rows()
        .iter()
        .enumerate()
        .map(|(i, row)| age_cell(i, &row[idx]).map(AgeGroup::of))
        .collect::<Result<Vec<AgeGroup>>>()?;

    let pick = |group: AgeGroup| {
        let mut it = groups.iter();
        dataset.filter_rows(|_| it.next() == Some(&group))
    };

    Ok(AgeSplit {
        new: pick(AgeGroup::New),
        middle: pick(AgeGroup::Middle),
        old: pick(AgeGroup::Old),
    })
}

/// Stacks reviewed batches back together, youngest listings first.
pub fn recombine(batches: &[Dataset], age_col: &str) -> Result<Dataset> {
    let mut out = crate::dataset::combine_all(batches)?;
    if out.is_empty() {
        return Ok(out);
    }
    let idx = out.column_index(age_col)?;
    out.rows_mut().sort_by(|a, b| {
        cell_f64(&a[idx])
            .partial_cmp(&cell_f64(&b[idx]))
            .unwrap_or(Ordering::Equal)
    });
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dataset(value: Value) -> Dataset {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_parse_post_age() {
        assert_eq!(parse_post_age("Today").unwrap(), 0);
        assert_eq!(parse_post_age("Just posted").unwrap(), 0);
        assert_eq!(parse_post_age("15 days ago").unwrap(), 15);
        assert_eq!(parse_post_age("30+ days ago").unwrap(), 30);
        assert_eq!(parse_post_age("1 day ago").unwrap(), 1);
    }

    #[test]
    fn test_parse_post_age_rejects_other_text() {
        assert!(parse_post_age("Yesterday").is_err());
        assert!(parse_post_age("a few days ago").is_err());
        assert!(parse_post_age("").is_err());
    }

    #[test]
    fn test_parse_post_age_requires_suffix() {
        match parse_post_age("15") {
            Err(CleanError::PostAge { value, .. }) => assert_eq!(value, "15"),
            other => panic!("expected post age error, got {:?}", other),
        }
        assert!(parse_post_age("30+").is_err());
    }

    #[test]
    fn test_clean_post_age_rejects_bare_number_text() {
        let ds = dataset(json!([{"post_age": "Today"}, {"post_age": "15"}]));
        match clean_post_age(&ds, "post_age") {
            Err(CleanError::PostAge { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected post age error, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_post_age_column() {
        let ds = dataset(json!([
            {"post_age": "Today"},
            {"post_age": "30+ days ago"},
            {"post_age": 4}
        ]));
        let out = clean_post_age(&ds, "post_age").unwrap();
        let ages: Vec<&Value> = out.column("post_age").unwrap();
        assert_eq!(ages, vec![&json!(0), &json!(30), &json!(4)]);
    }

    #[test]
    fn test_clean_post_age_fails_on_unknown_text() {
        let ds = dataset(json!([{"post_age": "Today"}, {"post_age": "EmployerActive 2 days ago"}]));
        match clean_post_age(&ds, "post_age") {
            Err(CleanError::PostAge { row, .. }) => assert_eq!(row, 1),
            other => panic!("expected post age error, got {:?}", other),
        }
    }

    #[test]
    fn test_clean_post_age_fails_on_null() {
        let ds = dataset(json!([{"post_age": null}]));
        assert!(clean_post_age(&ds, "post_age").is_err());
    }

    #[test]
    fn test_age_groups() {
        assert_eq!(AgeGroup::of(0), AgeGroup::New);
        assert_eq!(AgeGroup::of(7), AgeGroup::New);
        assert_eq!(AgeGroup::of(8), AgeGroup::Middle);
        assert_eq!(AgeGroup::of(29), AgeGroup::Middle);
        assert_eq!(AgeGroup::of(30), AgeGroup::Old);
    }

    #[test]
    fn test_split_and_recombine() {
        let ds = dataset(json!([
            {"jobkey": "a", "post_age": 30},
            {"jobkey": "b", "post_age": 2},
            {"jobkey": "c", "post_age": 12},
            {"jobkey": "d", "post_age": 0}
        ]));
        let split = split_by_age(&ds, "post_age").unwrap();
        assert_eq!(split.new.len(), 2);
        assert_eq!(split.middle.len(), 1);
        assert_eq!(split.old.len(), 1);

        let out = recombine(&[split.old, split.middle, split.new], "post_age").unwrap();
        let keys: Vec<&Value> = out.column("jobkey").unwrap();
        assert_eq!(keys, vec![&json!("d"), &json!("b"), &json!("c"), &json!("a")]);
    }

    #[test]
    fn test_post_age_days() {
        assert_eq!(PostAge::Text("3 days ago".to_string()).days(), Some(3));
        assert_eq!(PostAge::Days(5).days(), Some(5));
        assert_eq!(PostAge::Text("soon".to_string()).days(), None);
        assert_eq!(PostAge::Text("15".to_string()).days(), None);
    }
}
