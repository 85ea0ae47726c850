use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::{SymbolId, ValidationError};

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Market index name, drawn from the server-provided list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(String);

impl IndexName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyIndex);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for IndexName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for IndexName {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IndexName> for String {
    fn from(value: IndexName) -> Self {
        value.0
    }
}

/// Optional chart bounds. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    start: Option<Date>,
    end: Option<Date>,
}

impl DateRange {
    pub fn new(start: Option<Date>, end: Option<Date>) -> Result<Self, ValidationError> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ValidationError::InvertedDateRange {
                    start: format_date(start),
                    end: format_date(end),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Parse `YYYY-MM-DD` bounds; empty strings mean an open side.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, ValidationError> {
        Self::new(parse_optional_date(start)?, parse_optional_date(end)?)
    }

    pub const fn start(&self) -> Option<Date> {
        self.start
    }

    pub const fn end(&self) -> Option<Date> {
        self.end
    }

    pub const fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

fn parse_optional_date(value: Option<&str>) -> Result<Option<Date>, ValidationError> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => Date::parse(value, DATE_FORMAT)
            .map(Some)
            .map_err(|_| ValidationError::InvalidDate {
                value: value.to_owned(),
            }),
    }
}

fn format_date(date: Date) -> String {
    // The format only uses calendar components, which every Date has.
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

/// What the user wants charted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Ordered, duplicate-free.
    pub symbols: Vec<SymbolId>,
    pub index: Option<IndexName>,
    pub normalize: bool,
    pub date_range: DateRange,
}

impl Selection {
    pub fn contains(&self, symbol: &SymbolId) -> bool {
        self.symbols.contains(symbol)
    }
}

/// Wire body of `POST /api/chart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartRequest {
    pub stocks: Vec<String>,
    pub index: String,
    pub normalize: bool,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ChartRequest {
    /// Copy a selection into an owned request so later edits cannot reach it.
    pub fn from_selection(selection: &Selection) -> Result<Self, ValidationError> {
        if selection.symbols.is_empty() {
            return Err(ValidationError::NoSymbols);
        }
        let index = selection.index.as_ref().ok_or(ValidationError::NoIndex)?;

        Ok(Self {
            stocks: selection
                .symbols
                .iter()
                .map(|symbol| symbol.as_str().to_owned())
                .collect(),
            index: index.as_str().to_owned(),
            normalize: selection.normalize,
            start_date: selection.date_range.start().map(format_date),
            end_date: selection.date_range.end().map(format_date),
        })
    }
}
