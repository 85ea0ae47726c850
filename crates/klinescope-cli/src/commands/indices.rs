use serde_json::{json, Value};

use crate::error::CliError;

use super::Context;

pub async fn run(context: &Context) -> Result<Value, CliError> {
    let indices = context.backend.indices().await?;
    Ok(json!({
        "indices": indices.iter().map(|index| index.as_str()).collect::<Vec<_>>(),
        "default": indices
            .iter()
            .find(|index| **index == context.config.default_index)
            .map(|index| index.as_str()),
    }))
}
