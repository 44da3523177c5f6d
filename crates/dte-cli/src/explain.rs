//! `dte explain`: describe an authority message code or an internal code.

use anyhow::Result;
use clap::Args;

use dte_response::catalog::{find_by_internal_code, lookup};
use dte_response::ErrorDescriptor;
use dte_state::ErrorCode;

use crate::print_json;

#[derive(Args, Debug)]
pub struct ExplainArgs {
    /// Authority code (`004`), catalog code (`MH_DATA_ALREADY_EXISTS`) or
    /// pipeline code (`SIGN_ERROR_SERVICE`).
    pub code: String,
}

/// What a code resolved to.
#[derive(Debug, PartialEq)]
pub enum Explanation {
    Authority {
        authority_code: String,
        descriptor: ErrorDescriptor,
    },
    Pipeline(ErrorCode),
}

pub fn explain(code: &str) -> Option<Explanation> {
    if let Some(descriptor) = lookup(code) {
        return Some(Explanation::Authority {
            authority_code: code.trim().to_string(),
            descriptor,
        });
    }
    if let Some((authority_code, descriptor)) = find_by_internal_code(code) {
        return Some(Explanation::Authority {
            authority_code: authority_code.to_string(),
            descriptor,
        });
    }
    ErrorCode::parse(&code.trim().to_ascii_uppercase()).map(Explanation::Pipeline)
}

pub fn run_explain(args: &ExplainArgs) -> Result<u8> {
    match explain(&args.code) {
        Some(Explanation::Authority {
            authority_code,
            descriptor,
        }) => {
            println!("authority code: {authority_code}");
            print_json(&descriptor)?;
            Ok(0)
        }
        Some(Explanation::Pipeline(code)) => {
            print_json(&serde_json::json!({
                "code": code.as_str(),
                "class": code.class().as_str(),
                "retryable": code.retryable(),
            }))?;
            Ok(0)
        }
        None => {
            println!("unknown code: {}", args.code);
            Ok(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authority_code_resolves() {
        match explain("004") {
            Some(Explanation::Authority { descriptor, .. }) => {
                assert_eq!(descriptor.code, "MH_DATA_ALREADY_EXISTS")
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn internal_code_resolves_case_insensitively() {
        match explain("mh_data_already_exists") {
            Some(Explanation::Authority { authority_code, .. }) => assert_eq!(authority_code, "004"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn pipeline_code_resolves() {
        assert_eq!(
            explain("sign_error_service"),
            Some(Explanation::Pipeline(ErrorCode::SignService))
        );
    }

    #[test]
    fn unknown_code_exits_one() {
        let args = ExplainArgs {
            code: "ZZZ".into(),
        };
        assert_eq!(run_explain(&args).unwrap(), 1);
    }
}
