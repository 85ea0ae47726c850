//! Form state: the user's [`Selection`], its validity, and the submit gate.

use tracing::debug;

use crate::bootstrap::Defaults;
use crate::pipeline::RequestState;
use crate::{DateRange, IndexName, Selection, SymbolId, ValidationError};

/// Check that a selection could be submitted.
pub fn validate(selection: &Selection) -> Result<(), ValidationError> {
    if selection.symbols.is_empty() {
        return Err(ValidationError::NoSymbols);
    }
    if selection.index.is_none() {
        return Err(ValidationError::NoIndex);
    }
    Ok(())
}

/// At least one symbol and an index.
pub fn is_valid(selection: &Selection) -> bool {
    validate(selection).is_ok()
}

/// Submit gate. Derived on demand, never stored.
pub fn can_submit(selection: &Selection, state: RequestState, busy: bool) -> bool {
    is_valid(selection) && state == RequestState::Idle && !busy
}

/// Single owner of the session's [`Selection`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormStateMachine {
    selection: Selection,
    defaults: Selection,
}

impl FormStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn is_valid(&self) -> bool {
        is_valid(&self.selection)
    }

    pub fn can_submit(&self, state: RequestState, busy: bool) -> bool {
        can_submit(&self.selection, state, busy)
    }

    /// Replace the symbol list, keeping first occurrences in order.
    pub fn select_symbols(&mut self, symbols: impl IntoIterator<Item = SymbolId>) {
        let mut selected: Vec<SymbolId> = Vec::new();
        for symbol in symbols {
            if !selected.contains(&symbol) {
                selected.push(symbol);
            }
        }
        self.selection.symbols = selected;
        self.log_validity("select_symbols");
    }

    /// Append a symbol. Returns `false` if it was already selected.
    pub fn add_symbol(&mut self, symbol: SymbolId) -> bool {
        if self.selection.contains(&symbol) {
            return false;
        }
        self.selection.symbols.push(symbol);
        self.log_validity("add_symbol");
        true
    }

    /// Returns `false` if the symbol was not selected.
    pub fn remove_symbol(&mut self, symbol: &SymbolId) -> bool {
        let before = self.selection.symbols.len();
        self.selection.symbols.retain(|selected| selected != symbol);
        let removed = self.selection.symbols.len() != before;
        if removed {
            self.log_validity("remove_symbol");
        }
        removed
    }

    pub fn set_index(&mut self, index: Option<IndexName>) {
        self.selection.index = index;
        self.log_validity("set_index");
    }

    pub fn set_normalize(&mut self, normalize: bool) {
        self.selection.normalize = normalize;
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.selection.date_range = range;
    }

    /// Record bootstrap defaults and apply them.
    pub fn apply_defaults(&mut self, defaults: &Defaults) {
        self.defaults = Selection {
            symbols: defaults.symbol.iter().cloned().collect(),
            index: defaults.index.clone(),
            ..Selection::default()
        };
        self.reset();
    }

    /// Restore the bootstrap defaults. Idempotent.
    pub fn reset(&mut self) {
        self.selection = self.defaults.clone();
        self.log_validity("reset");
    }

    fn log_validity(&self, cause: &'static str) {
        debug!(
            cause,
            symbols = self.selection.symbols.len(),
            has_index = self.selection.index.is_some(),
            valid = self.is_valid(),
            "selection changed"
        );
    }
}
