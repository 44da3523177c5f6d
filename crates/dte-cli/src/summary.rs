//! `dte summary`: a business's accumulated totals for one year.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use dte_core::BusinessId;
use dte_store::{AccumulatorStore, JsonDirStore};
use dte_tax::MonthlySummary;

use crate::{print_json, runtime};

#[derive(Args, Debug)]
pub struct SummaryArgs {
    /// Business identifier (NIT) the books are kept under.
    #[arg(long)]
    pub business: String,

    #[arg(long)]
    pub year: i32,

    /// Directory of the JSON record store.
    #[arg(long, default_value = "dte-data")]
    pub data_dir: PathBuf,
}

pub fn summarize(args: &SummaryArgs) -> Result<MonthlySummary> {
    let business = BusinessId::new(args.business.as_str())?;
    runtime()?.block_on(async {
        let store = JsonDirStore::open(args.data_dir.clone()).await?;
        let months = store.list(&business, args.year).await?;
        Ok(MonthlySummary::from_accumulators(&months))
    })
}

pub fn run_summary(args: &SummaryArgs) -> Result<u8> {
    let summary = summarize(args)?;
    if summary.periods.is_empty() {
        tracing::warn!(business = %args.business, year = args.year, "no accumulators found");
    }
    print_json(&summary)?;
    Ok(0)
}
