//! # Domain Models
//!
//! Canonical types shared by every klinescope component.
//!
//! ## Models
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SymbolId`] | Normalized A-share ticker (`sh600519`) |
//! | [`Symbol`] | Ticker plus display label |
//! | [`IndexName`] | Market index drawn from the server list |
//! | [`DateRange`] | Optional start/end bounds for the chart |
//! | [`Selection`] | What the user wants charted |
//! | [`ChartRequest`] | Wire copy of a selection for `POST /api/chart` |
//!
//! ## Validation
//!
//! Construction validates input, so a [`ChartRequest`] can only be built from a
//! submittable [`Selection`]:
//!
//! ```rust
//! use klinescope_core::{ChartRequest, IndexName, Selection, SymbolId, ValidationError};
//!
//! let mut selection = Selection::default();
//! assert_eq!(ChartRequest::from_selection(&selection), Err(ValidationError::NoSymbols));
//!
//! selection.symbols.push(SymbolId::parse("600519").unwrap());
//! selection.index = Some(IndexName::new("上证指数").unwrap());
//! let request = ChartRequest::from_selection(&selection).unwrap();
//! assert_eq!(request.stocks, vec![String::from("sh600519")]);
//! ```

mod selection;
mod symbol;

pub use selection::{ChartRequest, DateRange, IndexName, Selection};
pub use symbol::{Symbol, SymbolId};
