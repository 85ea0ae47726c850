//! Session bootstrap: the hot symbol pool and the index list, loaded together.

use tracing::{info, warn};

use crate::api::ChartBackend;
use crate::{ApiError, BootstrapError, IndexName, Symbol, SymbolId};

/// Where the one-time bootstrap stands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BootstrapPhase {
    #[default]
    NotStarted,
    Pending,
    Ready,
    Failed,
}

impl BootstrapPhase {
    pub const fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// Raw results of the two concurrent bootstrap fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapFetch {
    pub hot: Result<Vec<Symbol>, ApiError>,
    pub indices: Result<Vec<IndexName>, ApiError>,
}

impl BootstrapFetch {
    /// Issue both fetches concurrently and wait for both.
    pub async fn run(backend: &dyn ChartBackend, hot_limit: usize) -> Self {
        let (hot, indices) = tokio::join!(backend.hot_stocks(hot_limit), backend.indices());
        Self { hot, indices }
    }
}

/// Selection seeded from the loaded pools.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Defaults {
    pub symbol: Option<SymbolId>,
    pub index: Option<IndexName>,
}

/// Result of folding a [`BootstrapFetch`] into the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapReport {
    pub defaults: Defaults,
    /// Empty when both fetches succeeded.
    pub errors: Vec<ApiError>,
}

impl BootstrapReport {
    pub fn is_ready(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Owns the symbol and index pools for the session.
#[derive(Debug, Clone)]
pub struct BootstrapLoader {
    phase: BootstrapPhase,
    symbols: Vec<Symbol>,
    indices: Vec<IndexName>,
    flagship: SymbolId,
    default_index: IndexName,
}

impl BootstrapLoader {
    pub fn new(flagship: SymbolId, default_index: IndexName) -> Self {
        Self {
            phase: BootstrapPhase::NotStarted,
            symbols: Vec::new(),
            indices: Vec::new(),
            flagship,
            default_index,
        }
    }

    /// Mark the bootstrap as started. Runs once per session.
    pub fn begin(&mut self) -> Result<(), BootstrapError> {
        if self.phase != BootstrapPhase::NotStarted {
            return Err(BootstrapError::AlreadyStarted);
        }
        self.phase = BootstrapPhase::Pending;
        info!("bootstrap started");
        Ok(())
    }

    /// Populate whatever loaded and compute defaults.
    ///
    /// Partially loaded pools are kept; the phase is `Ready` only when both
    /// fetches succeeded.
    pub fn complete(&mut self, fetch: BootstrapFetch) -> BootstrapReport {
        let mut errors = Vec::new();
        let mut defaults = Defaults::default();

        match fetch.hot {
            Ok(symbols) => {
                for symbol in symbols {
                    self.remember(symbol);
                }
                defaults.symbol = self
                    .symbols
                    .iter()
                    .find(|symbol| symbol.id == self.flagship)
                    .or_else(|| self.symbols.first())
                    .map(|symbol| symbol.id.clone());
            }
            Err(error) => {
                warn!(code = error.code(), %error, "hot stock fetch failed");
                errors.push(error);
            }
        }

        match fetch.indices {
            Ok(indices) => {
                self.indices = indices;
                defaults.index = self
                    .indices
                    .iter()
                    .find(|index| **index == self.default_index)
                    .cloned();
            }
            Err(error) => {
                warn!(code = error.code(), %error, "index list fetch failed");
                errors.push(error);
            }
        }

        self.phase = if errors.is_empty() {
            BootstrapPhase::Ready
        } else {
            BootstrapPhase::Failed
        };
        info!(
            phase = ?self.phase,
            symbols = self.symbols.len(),
            indices = self.indices.len(),
            "bootstrap finished"
        );
        BootstrapReport { defaults, errors }
    }

    /// One-shot bootstrap outside a session.
    pub async fn load(
        &mut self,
        backend: &dyn ChartBackend,
        hot_limit: usize,
    ) -> Result<Defaults, BootstrapError> {
        self.begin()?;
        let report = self.complete(BootstrapFetch::run(backend, hot_limit).await);
        if report.is_ready() {
            Ok(report.defaults)
        } else {
            Err(BootstrapError::Failed(report.errors))
        }
    }

    /// Add a symbol (e.g. picked from search) to the pool if it is new.
    pub fn remember(&mut self, symbol: Symbol) {
        if !self.symbols.iter().any(|known| known.id == symbol.id) {
            self.symbols.push(symbol);
        }
    }

    pub fn lookup(&self, id: &SymbolId) -> Option<&Symbol> {
        self.symbols.iter().find(|symbol| symbol.id == *id)
    }

    pub const fn phase(&self) -> BootstrapPhase {
        self.phase
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn indices(&self) -> &[IndexName] {
        &self.indices
    }
}
