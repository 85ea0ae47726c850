use serde_json::{json, Value};

use crate::cli::HotArgs;
use crate::error::CliError;
use crate::output::symbols_json;

use super::Context;

pub async fn run(args: &HotArgs, context: &Context) -> Result<Value, CliError> {
    if args.limit == 0 {
        return Err(CliError::Command(String::from(
            "--limit must be greater than zero",
        )));
    }

    let symbols = context.backend.hot_stocks(args.limit).await?;
    Ok(json!({
        "limit": args.limit,
        "symbols": symbols_json(&symbols),
    }))
}
