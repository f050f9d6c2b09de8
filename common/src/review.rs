//! Helpers for reviewing cleaned listings by hand
//!
//! Flags which languages a description mentions, keeps track of listings that
//! were already opened, and builds the links to open the rest.

use crate::dataset::Dataset;
use crate::error::Result;
use crate::text::plain_text;
use regex::Regex;
use serde_json::Value;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const VIEW_URL_BASE: &str = "https://www.indeed.com/viewjob?jk=";

pub fn view_url(key: &str) -> String {
    format!("{}{}", VIEW_URL_BASE, key)
}

/// Adds one boolean column per language, true when the description mentions
/// it. `languages` are matched as lowercase substrings, `patterns` as regexes
/// against the lowercased text. Each column is named after its language or
/// pattern.
pub fn flag_languages(
    dataset: &Dataset,
    desc_col: &str,
    languages: &[String],
    patterns: &[String],
) -> Result<Dataset> {
    let descriptions: Vec<String> = dataset
        .column(desc_col)?
        .into_iter()
        .map(|v| v.as_str().map(plain_text).unwrap_or_default().to_lowercase())
        .collect();

    let mut out = dataset.clone();
    for lang in languages {
        let needle = lang.to_lowercase();
        let flags = descriptions
            .iter()
            .map(|d| Value::Bool(d.contains(&needle)))
            .collect();
        out = out.with_column(lang, flags);
    }
    for pattern in patterns {
        let re = Regex::new(pattern)?;
        let flags = descriptions
            .iter()
            .map(|d| Value::Bool(re.is_match(d)))
            .collect();
        out = out.with_column(pattern, flags);
    }
    Ok(out)
}

/// Keys of listings that were already opened for review.
pub trait ViewedStore {
    fn contains(&self, key: &str) -> bool;
    /// Records `keys` as viewed and returns how many were new.
    fn mark(&mut self, keys: &[String]) -> usize;
    fn keys(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryViewedStore {
    keys: BTreeSet<String>,
}

impl MemoryViewedStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<String> for MemoryViewedStore {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}

impl ViewedStore for MemoryViewedStore {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn mark(&mut self, keys: &[String]) -> usize {
        keys.iter().filter(|k| self.keys.insert(k.to_string())).count()
    }

    fn keys(&self) -> Vec<String> {
        self.keys.iter().cloned().collect()
    }
}

/// A viewed-key set persisted as a JSON array. Changes are only written by
/// [`JsonViewedStore::save`].
#[derive(Debug, Clone)]
pub struct JsonViewedStore {
    path: PathBuf,
    inner: MemoryViewedStore,
}

impl JsonViewedStore {
    /// Loads the store at `path`. A missing file is an empty store.
    pub fn open(path: &Path) -> Result<Self> {
        let inner = if path.exists() {
            let content = fs::read_to_string(path)?;
            let keys: Vec<String> = serde_json::from_str(&content)?;
            keys.into_iter().collect()
        } else {
            MemoryViewedStore::new()
        };
        debug!(path = ?path, keys = inner.keys.len(), "opened viewed store");
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.inner.keys())?)?;
        Ok(())
    }
}

impl ViewedStore for JsonViewedStore {
    fn contains(&self, key: &str) -> bool {
        self.inner.contains(key)
    }

    fn mark(&mut self, keys: &[String]) -> usize {
        self.inner.mark(keys)
    }

    fn keys(&self) -> Vec<String> {
        self.inner.keys()
    }
}

/// Keys still worth opening: every distinct key in row order that `viewed`
/// has not seen.
pub fn candidate_keys(dataset: &Dataset, key_col: &str, viewed: &dyn ViewedStore) -> Result<Vec<String>> {
    let mut seen = HashSet::new();
    let keys: Vec<String> = dataset
        .column(key_col)?
        .into_iter()
        .filter_map(key_text)
        .filter(|k| !viewed.contains(k) && seen.insert(k.clone()))
        .collect();
    info!(candidates = keys.len(), rows = dataset.len(), "candidate keys");
    Ok(keys)
}

pub(crate) fn key_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
