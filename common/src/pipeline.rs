use crate::age::clean_post_age;
use crate::config::CleanConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::salary::{convert_yearly_to_hourly, fill_null_salary, infer_salaries};
use tracing::{info, info_span};

/// Runs every cleaning stage over one scraped batch.
///
/// Meta columns are dropped first; the description is only dropped after
/// salaries have been read from it.
pub fn clean(dataset: &Dataset, config: &CleanConfig) -> Result<Dataset> {
    let _span = info_span!("clean", rows = dataset.len()).entered();
    let columns = &config.columns;

    let mut out = if config.drop_meta {
        let n = config.n_meta.min(dataset.columns().len());
        info!(dropped = ?&dataset.columns()[..n], "dropped meta columns");
        dataset.drop_leading(n)
    } else {
        dataset.clone()
    };

    out = infer_salaries(&out, columns)?;
    out = convert_yearly_to_hourly(&out, columns)?;
    out = fill_null_salary(&out, &columns.salary, &config.fill)?;
    out = clean_post_age(&out, &columns.age)?;

    if config.drop_desc {
        out = out.drop_column(&columns.description)?;
    }

    info!(rows = out.len(), columns = out.columns().len(), "batch cleaned");
    Ok(out)
}
