//! `dte validate`: check a document file without signing or sending it.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use dte_schema::DocumentValidator;

use crate::{print_json, read_json};

#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the document JSON.
    pub path: PathBuf,

    /// Print the normalized document when valid.
    #[arg(long)]
    pub print: bool,
}

pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let value = read_json(&args.path)?;
    let validator = DocumentValidator::new()?;
    let report = validator.validate_value(&value);

    match report.document {
        Some(document) if report.violations.is_empty() => {
            println!(
                "OK  {} ({})",
                args.path.display(),
                document.generation_code()
            );
            if args.print {
                print_json(&document)?;
            }
            Ok(0)
        }
        _ => {
            println!("FAIL  {}", args.path.display());
            for violation in &report.violations {
                println!("  - {violation}");
            }
            Ok(1)
        }
    }
}
