//! Job Review Server
//!
//! Serves a cleaned job file for manual review: full-text search over
//! titles and descriptions with Tantivy, age/salary/viewed filters, and a
//! "mark as viewed" endpoint, all exposed as a REST API using Axum.

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use clap::Parser;
use common::review::view_url;
use common::text::plain_text;
use common::{CleanConfig, Dataset, JobRecord, JsonViewedStore, ViewedStore};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tantivy::{
    Document, Index, IndexReader, ReloadPolicy,
    collector::TopDocs,
    query::QueryParser,
    schema::{Field, STORED, STRING, Schema, TEXT},
};
use tracing::{info, warn};

const DEFAULT_LIMIT: usize = 10;

#[derive(Parser)]
#[command(name = "server", about = "Search and review cleaned job listings")]
struct Args {
    /// Cleaned jobs file written by `jobclean clean`
    #[arg(long, default_value = "data/jobs.json")]
    jobs: PathBuf,
    #[arg(long, default_value = "search_index")]
    index_dir: PathBuf,
    #[arg(long, default_value = "viewed_jobs.json")]
    viewed: PathBuf,
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: String,
    /// Cleaning config naming the dataset columns
    #[arg(short, long)]
    config: Option<PathBuf>,
}

/// Search result returned by the API
#[derive(Debug, Serialize)]
struct SearchResult {
    job_key: String,
    title: Option<String>,
    company: Option<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    post_age: Option<u32>,
    url: String,
    score: f32,
}

/// API response wrapper
#[derive(Debug, Serialize)]
struct SearchResponse {
    query: String,
    total_results: usize,
    results: Vec<SearchResult>,
}

/// Query parameters for search endpoint
#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    q: Option<String>,
    /// Only listings posted at most this many days ago
    max_age: Option<u32>,
    /// Only listings whose hourly maximum reaches this
    min_salary: Option<f64>,
    /// Hide listings already marked viewed
    #[serde(default)]
    unviewed: bool,
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct JobDetail {
    #[serde(flatten)]
    job: JobRecord,
    url: String,
    viewed: bool,
}

#[derive(Debug, Deserialize)]
struct MarkViewed {
    keys: Vec<String>,
}

#[derive(Debug, Serialize)]
struct MarkViewedResponse {
    added: usize,
    total: usize,
}

#[derive(Debug, Clone, Copy)]
struct JobFields {
    key: Field,
    title: Field,
    company: Field,
    description: Field,
}

/// Shared application state
struct AppState {
    index_reader: IndexReader,
    query_parser: QueryParser,
    fields: JobFields,
    jobs: HashMap<String, JobRecord>,
    /// Keys in file order, for listing without a query
    order: Vec<String>,
    viewed: Mutex<JsonViewedStore>,
}

/// Builds the Tantivy schema for job indexing
fn build_schema() -> (Schema, JobFields) {
    let mut schema_builder = Schema::builder();

    // Key: exact match only, stored to map hits back to records
    let key = schema_builder.add_text_field("job_key", STRING | STORED);

    let title = schema_builder.add_text_field("title", TEXT);
    let company = schema_builder.add_text_field("company", TEXT);

    // Description: searchable as plain text, not stored
    let description = schema_builder.add_text_field("description", TEXT);

    let fields = JobFields {
        key,
        title,
        company,
        description,
    };
    (schema_builder.build(), fields)
}

/// Indexes all jobs into a fresh index, on disk when `index_path` is given
fn create_index(jobs: &[JobRecord], index_path: Option<&Path>) -> Result<(Index, JobFields)> {
    let (schema, fields) = build_schema();

    let index = match index_path {
        Some(path) => {
            // The index is rebuilt from the jobs file on every start
            if path.exists() {
                fs::remove_dir_all(path)?;
            }
            fs::create_dir_all(path)?;
            Index::create_in_dir(path, schema)?
        }
        None => Index::create_in_ram(schema),
    };

    let mut index_writer = index.writer(50_000_000)?;

    info!(jobs = jobs.len(), "indexing jobs");
    for job in jobs {
        let mut doc = Document::new();
        doc.add_text(fields.key, &job.job_key);
        if let Some(title) = &job.title {
            doc.add_text(fields.title, title);
        }
        if let Some(company) = &job.company {
            doc.add_text(fields.company, company);
        }
        doc.add_text(fields.description, plain_text(&job.description));
        index_writer.add_document(doc)?;
    }

    index_writer.commit()?;
    info!("indexing complete");

    Ok((index, fields))
}

fn build_state(jobs: Vec<JobRecord>, index_path: Option<&Path>, viewed: JsonViewedStore) -> Result<AppState> {
    // Combined batches may repeat a listing; the first copy wins
    let mut seen = HashSet::new();
    let total = jobs.len();
    let jobs: Vec<JobRecord> = jobs
        .into_iter()
        .filter(|j| seen.insert(j.job_key.clone()))
        .collect();
    if jobs.len() < total {
        warn!(duplicates = total - jobs.len(), "skipped repeated job keys");
    }

    let (index, fields) = create_index(&jobs, index_path).context("failed to build search index")?;

    let index_reader = index
        .reader_builder()
        .reload_policy(ReloadPolicy::OnCommit)
        .try_into()
        .context("failed to create index reader")?;

    let query_parser = QueryParser::for_index(
        &index,
        vec![fields.title, fields.company, fields.description],
    );

    let order = jobs.iter().map(|j| j.job_key.clone()).collect();
    let jobs = jobs.into_iter().map(|j| (j.job_key.clone(), j)).collect();

    Ok(AppState {
        index_reader,
        query_parser,
        fields,
        jobs,
        order,
        viewed: Mutex::new(viewed),
    })
}

fn internal_error<E: std::fmt::Display>(err: E) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

fn matches_filters(job: &JobRecord, params: &SearchParams, viewed: &dyn ViewedStore) -> bool {
    if let Some(max_age) = params.max_age {
        if job.post_age.days().is_none_or(|days| days > max_age) {
            return false;
        }
    }
    if let Some(min_salary) = params.min_salary {
        if job.salary_max.is_none_or(|salary| salary < min_salary) {
            return false;
        }
    }
    !(params.unviewed && viewed.contains(&job.job_key))
}

/// Handler for GET /search?q=<keywords>&max_age=&min_salary=&unviewed=&limit=
async fn search_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, (StatusCode, String)> {
    let query_str = params.q.clone().unwrap_or_default();

    // Without keywords every job matches, in file order
    let hits: Vec<(f32, String)> = if query_str.trim().is_empty() {
        state.order.iter().map(|key| (0.0, key.clone())).collect()
    } else {
        let query = state
            .query_parser
            .parse_query(&query_str)
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

        let searcher = state.index_reader.searcher();
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(state.jobs.len().max(1)))
            .map_err(internal_error)?;

        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, doc_address) in top_docs {
            let retrieved_doc = searcher.doc(doc_address).map_err(internal_error)?;
            if let Some(key) = retrieved_doc
                .get_first(state.fields.key)
                .and_then(|v| v.as_text())
            {
                hits.push((score, key.to_string()));
            }
        }
        hits
    };

    let viewed = state.viewed.lock().map_err(internal_error)?;
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    let results: Vec<SearchResult> = hits
        .into_iter()
        .filter_map(|(score, key)| state.jobs.get(&key).map(|job| (score, job)))
        .filter(|(_, job)| matches_filters(job, &params, &*viewed))
        .take(limit)
        .map(|(score, job)| SearchResult {
            job_key: job.job_key.clone(),
            title: job.title.clone(),
            company: job.company.clone(),
            salary_min: job.salary_min,
            salary_max: job.salary_max,
            post_age: job.post_age.days(),
            url: view_url(&job.job_key),
            score,
        })
        .collect();

    Ok(Json(SearchResponse {
        query: query_str,
        total_results: results.len(),
        results,
    }))
}

/// Handler for GET /jobs/{key}
async fn job_handler(
    State(state): State<Arc<AppState>>,
    UrlPath(key): UrlPath<String>,
) -> Result<Json<JobDetail>, (StatusCode, String)> {
    let job = state
        .jobs
        .get(&key)
        .cloned()
        .ok_or_else(|| (StatusCode::NOT_FOUND, format!("no job with key {}", key)))?;
    let viewed = state.viewed.lock().map_err(internal_error)?.contains(&key);

    Ok(Json(JobDetail {
        url: view_url(&key),
        viewed,
        job,
    }))
}

/// Handler for POST /viewed
async fn viewed_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<MarkViewed>,
) -> Result<Json<MarkViewedResponse>, (StatusCode, String)> {
    let mut store = state.viewed.lock().map_err(internal_error)?;
    let added = store.mark(&body.keys);
    store.save().map_err(internal_error)?;
    info!(added, "marked jobs viewed");

    Ok(Json(MarkViewedResponse {
        added,
        total: store.keys().len(),
    }))
}

/// Handler for GET / (root)
async fn root_handler() -> &'static str {
    "🔍 Job Review API\n\nEndpoints:\n  GET  /search?q=<keywords>&max_age=<days>&min_salary=<hourly>&unviewed=true\n  GET  /jobs/<key>\n  POST /viewed {\"keys\": [...]}\n\nExample:\n  curl 'http://127.0.0.1:3000/search?q=python&max_age=7'"
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/search", get(search_handler))
        .route("/jobs/{key}", get(job_handler))
        .route("/viewed", post(viewed_handler))
        .with_state(state)
}

fn load_jobs(path: &Path, config: &CleanConfig) -> Result<Vec<JobRecord>> {
    if !path.exists() {
        warn!(path = ?path, "no jobs file found, run `jobclean clean` first");
        return Ok(vec![]);
    }
    let dataset = Dataset::load(path).with_context(|| format!("failed to read {}", path.display()))?;
    if dataset.is_empty() {
        return Ok(vec![]);
    }
    Ok(JobRecord::from_dataset(&dataset, &config.columns)?)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = CleanConfig::load(args.config.as_deref())?;

    let jobs = load_jobs(&args.jobs, &config)?;
    info!(jobs = jobs.len(), path = ?args.jobs, "loaded jobs");

    let viewed = JsonViewedStore::open(&args.viewed)?;
    let state = Arc::new(build_state(jobs, Some(&args.index_dir), viewed)?);

    let listener = tokio::net::TcpListener::bind(args.addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;
    info!("server running at http://{}", args.addr);

    axum::serve(listener, router(state)).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::PostAge;

    fn job(key: &str, title: &str, description: &str, salary_max: f64, age: u32) -> JobRecord {
        JobRecord {
            job_key: key.to_string(),
            title: Some(title.to_string()),
            company: Some("Acme".to_string()),
            description: description.to_string(),
            salary_min: Some(salary_max - 5.0),
            salary_max: Some(salary_max),
            salary_type: Some(common::SalaryType::Hourly),
            post_age: PostAge::Days(age),
        }
    }

    fn state(dir: &Path) -> Arc<AppState> {
        let jobs = vec![
            job("a1", "Data Analyst", "<p>Python and <b>SQL</b></p>", 26.19, 0),
            job("b2", "BI Developer", "Tableau dashboards", 30.0, 15),
            job("c3", "Junior Data Analyst", "Excel and SQL", 18.0, 30),
        ];
        let viewed = JsonViewedStore::open(&dir.join("viewed.json")).unwrap();
        Arc::new(build_state(jobs, None, viewed).unwrap())
    }

    async fn search(state: &Arc<AppState>, params: SearchParams) -> Vec<String> {
        let Json(response) = search_handler(State(state.clone()), Query(params)).await.unwrap();
        response.results.into_iter().map(|r| r.job_key).collect()
    }

    #[tokio::test]
    async fn test_search_by_keyword() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let mut keys = search(
            &state,
            SearchParams {
                q: Some("sql".to_string()),
                ..Default::default()
            },
        )
        .await;
        keys.sort();
        assert_eq!(keys, vec!["a1", "c3"]);
    }

    #[tokio::test]
    async fn test_empty_query_lists_all_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        assert_eq!(search(&state, SearchParams::default()).await, vec!["a1", "b2", "c3"]);
    }

    #[tokio::test]
    async fn test_repeated_keys_are_listed_once() {
        let dir = tempfile::tempdir().unwrap();
        let jobs = vec![
            job("a1", "Data Analyst", "SQL reporting", 26.19, 0),
            job("b2", "BI Developer", "Tableau dashboards", 30.0, 15),
            job("a1", "Data Analyst (repost)", "SQL reporting", 40.0, 3),
        ];
        let viewed = JsonViewedStore::open(&dir.path().join("viewed.json")).unwrap();
        let state = Arc::new(build_state(jobs, None, viewed).unwrap());

        assert_eq!(search(&state, SearchParams::default()).await, vec!["a1", "b2"]);
        let keyword = search(
            &state,
            SearchParams {
                q: Some("sql".to_string()),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(keyword, vec!["a1"]);
        assert_eq!(state.jobs["a1"].salary_max, Some(26.19));
    }

    #[tokio::test]
    async fn test_age_and_salary_filters() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let keys = search(
            &state,
            SearchParams {
                max_age: Some(20),
                min_salary: Some(27.0),
                ..Default::default()
            },
        )
        .await;
        assert_eq!(keys, vec!["b2"]);
    }

    #[tokio::test]
    async fn test_mark_viewed_hides_from_unviewed_search() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let Json(marked) = viewed_handler(
            State(state.clone()),
            Json(MarkViewed {
                keys: vec!["a1".to_string()],
            }),
        )
        .await
        .unwrap();
        assert_eq!(marked.added, 1);
        assert!(dir.path().join("viewed.json").exists());

        let keys = search(
            &state,
            SearchParams {
                unviewed: true,
                ..Default::default()
            },
        )
        .await;
        assert_eq!(keys, vec!["b2", "c3"]);
    }

    #[tokio::test]
    async fn test_job_detail_and_missing_job() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());

        let Json(detail) = job_handler(State(state.clone()), UrlPath("b2".to_string()))
            .await
            .unwrap();
        assert_eq!(detail.url, "https://www.indeed.com/viewjob?jk=b2");
        assert!(!detail.viewed);

        let err = job_handler(State(state), UrlPath("zz".to_string())).await.unwrap_err();
        assert_eq!(err.0, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state(dir.path());
        let result = search_handler(
            State(state),
            Query(SearchParams {
                q: Some("salary_band:senior".to_string()),
                ..Default::default()
            }),
        )
        .await;
        assert_eq!(result.unwrap_err().0, StatusCode::BAD_REQUEST);
    }
}
