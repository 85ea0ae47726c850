use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const EXCHANGE_PREFIXES: [&str; 3] = ["sh", "sz", "bj"];
const SZ_LEADS: [&str; 5] = ["000", "001", "002", "003", "300"];
const SH_LEADS: [&str; 5] = ["600", "601", "603", "605", "688"];
const BJ_LEADS: [&str; 5] = ["430", "831", "833", "836", "838"];

/// Normalized A-share ticker in backend form (`sh600519`, `sz000001`, `bj430047`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SymbolId(String);

impl SymbolId {
    /// Parse and normalize user or server input.
    ///
    /// Accepts the backend form (`sh600519`), the dotted exchange form
    /// (`600519.SH`) and bare six-digit codes, whose exchange is inferred from
    /// the leading digits. Anything else is lowercased unchanged.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        for (index, ch) in trimmed.chars().enumerate() {
            if !(ch.is_ascii_alphanumeric() || ch == '.') {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.len() == 8 && EXCHANGE_PREFIXES.iter().any(|p| lower.starts_with(p)) {
            return Ok(Self(lower));
        }

        if let Some((code, exchange)) = trimmed.split_once('.') {
            match exchange.to_ascii_uppercase().as_str() {
                "SH" => return Ok(Self(format!("sh{code}"))),
                "SZ" => return Ok(Self(format!("sz{code}"))),
                _ => {}
            }
        }

        if trimmed.len() == 6 && trimmed.chars().all(|ch| ch.is_ascii_digit()) {
            let lead = &trimmed[..3];
            if SZ_LEADS.contains(&lead) {
                return Ok(Self(format!("sz{trimmed}")));
            }
            if SH_LEADS.contains(&lead) {
                return Ok(Self(format!("sh{trimmed}")));
            }
            if BJ_LEADS.contains(&lead) {
                return Ok(Self(format!("bj{trimmed}")));
            }
        }

        Ok(Self(lower))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SymbolId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SymbolId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for SymbolId {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<SymbolId> for String {
    fn from(value: SymbolId) -> Self {
        value.0
    }
}

/// A pickable stock: ticker plus the company name shown in the picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub id: SymbolId,
    pub label: String,
}

impl Symbol {
    pub fn new(id: SymbolId, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    /// Picker text, e.g. `贵州茅台 (sh600519)`.
    pub fn display_text(&self) -> String {
        format!("{} ({})", self.label, self.id)
    }
}
