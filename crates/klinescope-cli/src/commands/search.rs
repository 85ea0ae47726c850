use serde_json::{json, Value};

use klinescope_core::SearchFetcher;

use crate::cli::SearchArgs;
use crate::error::CliError;
use crate::output::symbols_json;

use super::Context;

pub async fn run(args: &SearchArgs, context: &Context) -> Result<Value, CliError> {
    let fetcher = SearchFetcher::new(
        context.backend.clone(),
        context.config.search_limit,
        context.config.search_cache,
    );

    let query = args.query.trim();
    let results = fetcher.lookup(query).await;
    Ok(json!({
        "query": query,
        "limit": fetcher.limit(),
        "results": symbols_json(&results),
    }))
}
