mod chart;
mod hot;
mod indices;
mod search;
mod session;

use std::sync::Arc;
use std::time::Duration;

use klinescope_core::{
    AppConfig, CacheMode, ChartBackend, HttpChartBackend, HttpClient, ReqwestHttpClient,
};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::mock;

/// Shared wiring for every command.
pub struct Context {
    pub config: AppConfig,
    pub backend: Arc<dyn ChartBackend>,
    pub pretty: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let config = AppConfig::builder()
            .base_url(cli.base_url.clone())
            .chart_timeout(Duration::from_millis(cli.timeout_ms))
            .search_limit(cli.search_limit)
            .search_cache(if cli.no_cache {
                CacheMode::Bypass
            } else {
                CacheMode::Use
            })
            .build()?;

        let http: Arc<dyn HttpClient> = if cli.mock {
            debug!("using built-in mock backend");
            Arc::new(mock::demo_client())
        } else {
            Arc::new(ReqwestHttpClient::new())
        };
        let backend = Arc::new(HttpChartBackend::new(http, config.base_url.clone()));

        Ok(Self {
            config,
            backend,
            pretty: cli.pretty,
        })
    }
}

/// Run the selected command. `None` means the command wrote its own output.
pub async fn run(cli: &Cli) -> Result<Option<Value>, CliError> {
    let context = Context::from_cli(cli)?;

    let data = match &cli.command {
        Command::Search(args) => search::run(args, &context).await?,
        Command::Indices => indices::run(&context).await?,
        Command::Hot(args) => hot::run(args, &context).await?,
        Command::Chart(args) => chart::run(args, &context).await?,
        Command::Session(args) => {
            session::run(args, &context).await?;
            return Ok(None);
        }
    };
    Ok(Some(data))
}
