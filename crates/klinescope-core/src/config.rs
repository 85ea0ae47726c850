//! Session configuration.
//!
//! | Setting | Default |
//! |---------|---------|
//! | `base_url` | `http://127.0.0.1:5002` |
//! | `search_debounce` | 300 ms |
//! | `search_limit` | 50 |
//! | `search_cache` | [`CacheMode::Use`] |
//! | `hot_limit` | 20 |
//! | `chart_timeout` | 30 s |
//! | `notification_dismiss` | 3 s |
//! | `flagship_symbol` | `sh600519` |
//! | `default_index` | `上证指数` |
//! | `container` | `plotlyChart` |

use std::time::Duration;

use crate::cache::CacheMode;
use crate::{IndexName, SymbolId, ValidationError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5002";
pub const FLAGSHIP_SYMBOL: &str = "sh600519";
pub const DEFAULT_INDEX: &str = "上证指数";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub base_url: String,
    pub search_debounce: Duration,
    pub search_limit: usize,
    pub search_cache: CacheMode,
    pub hot_limit: usize,
    pub chart_timeout: Duration,
    pub notification_dismiss: Duration,
    pub flagship_symbol: SymbolId,
    pub default_index: IndexName,
    /// Rendering sink target.
    pub container: String,
}

impl AppConfig {
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: String::from(DEFAULT_BASE_URL),
            search_debounce: Duration::from_millis(300),
            search_limit: 50,
            search_cache: CacheMode::Use,
            hot_limit: 20,
            chart_timeout: Duration::from_secs(30),
            notification_dismiss: Duration::from_secs(3),
            flagship_symbol: SymbolId::parse(FLAGSHIP_SYMBOL)
                .expect("flagship constant is a valid symbol"),
            default_index: IndexName::new(DEFAULT_INDEX)
                .expect("default index constant is non-empty"),
            container: String::from("plotlyChart"),
        }
    }
}

/// Builder for [`AppConfig`].
///
/// ```rust
/// use std::time::Duration;
/// use klinescope_core::AppConfig;
///
/// let config = AppConfig::builder()
///     .base_url("http://10.0.0.5:5002")
///     .chart_timeout(Duration::from_secs(10))
///     .build()
///     .unwrap();
/// assert_eq!(config.search_limit, 50);
/// ```
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    base_url: Option<String>,
    search_debounce: Option<Duration>,
    search_limit: Option<usize>,
    search_cache: Option<CacheMode>,
    hot_limit: Option<usize>,
    chart_timeout: Option<Duration>,
    notification_dismiss: Option<Duration>,
    flagship_symbol: Option<String>,
    default_index: Option<String>,
    container: Option<String>,
}

impl AppConfigBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn search_debounce(mut self, debounce: Duration) -> Self {
        self.search_debounce = Some(debounce);
        self
    }

    pub fn search_limit(mut self, limit: usize) -> Self {
        self.search_limit = Some(limit);
        self
    }

    pub fn search_cache(mut self, mode: CacheMode) -> Self {
        self.search_cache = Some(mode);
        self
    }

    pub fn hot_limit(mut self, limit: usize) -> Self {
        self.hot_limit = Some(limit);
        self
    }

    pub fn chart_timeout(mut self, timeout: Duration) -> Self {
        self.chart_timeout = Some(timeout);
        self
    }

    pub fn notification_dismiss(mut self, delay: Duration) -> Self {
        self.notification_dismiss = Some(delay);
        self
    }

    pub fn flagship_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.flagship_symbol = Some(symbol.into());
        self
    }

    pub fn default_index(mut self, index: impl Into<String>) -> Self {
        self.default_index = Some(index.into());
        self
    }

    pub fn container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }

    pub fn build(self) -> Result<AppConfig, ValidationError> {
        let defaults = AppConfig::default();
        Ok(AppConfig {
            base_url: self.base_url.unwrap_or(defaults.base_url),
            search_debounce: self.search_debounce.unwrap_or(defaults.search_debounce),
            search_limit: self.search_limit.unwrap_or(defaults.search_limit).max(1),
            search_cache: self.search_cache.unwrap_or(defaults.search_cache),
            hot_limit: self.hot_limit.unwrap_or(defaults.hot_limit).max(1),
            chart_timeout: self.chart_timeout.unwrap_or(defaults.chart_timeout),
            notification_dismiss: self
                .notification_dismiss
                .unwrap_or(defaults.notification_dismiss),
            flagship_symbol: match self.flagship_symbol {
                Some(symbol) => SymbolId::parse(&symbol)?,
                None => defaults.flagship_symbol,
            },
            default_index: match self.default_index {
                Some(index) => IndexName::new(index)?,
                None => defaults.default_index,
            },
            container: self.container.unwrap_or(defaults.container),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.search_debounce, Duration::from_millis(300));
        assert_eq!(config.chart_timeout, Duration::from_secs(30));
        assert_eq!(config.notification_dismiss, Duration::from_secs(3));
        assert_eq!(config.flagship_symbol.as_str(), "sh600519");
        assert_eq!(config.default_index.as_str(), "上证指数");
        assert_eq!(config.hot_limit, 20);
    }

    #[test]
    fn builder_validates_overrides() {
        let config = AppConfig::builder()
            .flagship_symbol("000001.SZ")
            .search_limit(0)
            .build()
            .expect("valid overrides");
        assert_eq!(config.flagship_symbol.as_str(), "sz000001");
        assert_eq!(config.search_limit, 1);

        let err = AppConfig::builder().default_index(" ").build().expect_err("blank index");
        assert_eq!(err, ValidationError::EmptyIndex);
    }
}
