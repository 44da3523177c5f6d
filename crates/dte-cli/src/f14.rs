//! `dte f14`: advance payment due for a period.

use anyhow::{Context, Result};
use clap::Args;

use dte_core::{Amount, PeriodKey};
use dte_tax::{compute_f14, F14Computation};

use crate::print_json;

#[derive(Args, Debug)]
pub struct F14Args {
    /// Total VAT for the period, e.g. `1250.00`.
    #[arg(long)]
    pub iva: String,

    /// Period as `YYYY-MM`.
    #[arg(long)]
    pub period: PeriodKey,
}

pub fn f14(args: &F14Args) -> Result<F14Computation> {
    let vat = Amount::parse(&args.iva)
        .with_context(|| format!("--iva must be an amount, got {:?}", args.iva))?;
    Ok(compute_f14(args.period, vat))
}

pub fn run_f14(args: &F14Args) -> Result<u8> {
    print_json(&f14(args)?)?;
    Ok(0)
}
