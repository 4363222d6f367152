use crate::utils::is_numeric;
use serde::{Deserialize, Serialize};

/// Cell value written for a row whose translation failed.
pub const ERROR_MARKER: &str = "Error";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowClass {
    Blank,
    Numeric,
    Translatable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOutcome {
    Empty,
    Passthrough(String),
    Translated(String),
    ErrorMarker,
}

/// Blank first, then numeric, otherwise the value goes to the translator.
pub fn classify(value: &str) -> RowClass {
    if value.trim().is_empty() {
        RowClass::Blank
    } else if is_numeric(value) {
        RowClass::Numeric
    } else {
        RowClass::Translatable
    }
}

impl RowOutcome {
    pub fn into_cell(self) -> String {
        match self {
            RowOutcome::Empty => String::new(),
            RowOutcome::Passthrough(value) | RowOutcome::Translated(value) => value,
            RowOutcome::ErrorMarker => ERROR_MARKER.to_string(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RowOutcome::ErrorMarker)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_order() {
        assert_eq!(classify(""), RowClass::Blank);
        assert_eq!(classify("   "), RowClass::Blank);
        assert_eq!(classify("42"), RowClass::Numeric);
        assert_eq!(classify("-0.75"), RowClass::Numeric);
        assert_eq!(classify("Hello"), RowClass::Translatable);
        assert_eq!(classify("42 apples"), RowClass::Translatable);
    }

    #[test]
    fn outcomes_map_to_cells() {
        assert_eq!(RowOutcome::Empty.into_cell(), "");
        assert_eq!(RowOutcome::Passthrough("42".into()).into_cell(), "42");
        assert_eq!(RowOutcome::Translated("Hallo".into()).into_cell(), "Hallo");
        assert_eq!(RowOutcome::ErrorMarker.into_cell(), "Error");
    }
}
