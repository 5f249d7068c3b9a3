/// Per-table options threaded through construction.
///
/// Derived tables (clones, group sub-tables, aggregation results) inherit the
/// options of the table they were built from.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Date format used when no other format is configured.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Emit diagnostic messages through the `log` facade.
    pub trace: bool,
    /// chrono format string used to parse and format Date values.
    pub date_format: String,
}

impl Default for TableOptions {
    fn default() -> Self {
        TableOptions {
            trace: false,
            date_format: DEFAULT_DATE_FORMAT.to_string(),
        }
    }
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trace(mut self, trace: bool) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_date_format(mut self, date_format: impl Into<String>) -> Self {
        self.date_format = date_format.into();
        self
    }

    /// Load options from a JSON document. Missing keys fall back to defaults.
    ///
    /// ```
    /// use tablekit::TableOptions;
    ///
    /// let options = TableOptions::from_json(r#"{"trace": true}"#).unwrap();
    /// assert!(options.trace);
    /// assert_eq!(options.date_format, "%Y-%m-%d");
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = TableOptions::default();
        assert!(!options.trace);
        assert_eq!(options.date_format, DEFAULT_DATE_FORMAT);
    }

    #[test]
    fn test_from_json() {
        let options = TableOptions::from_json(r#"{"date_format": "%d.%m.%Y"}"#).unwrap();
        assert!(!options.trace);
        assert_eq!(options.date_format, "%d.%m.%Y");

        assert!(TableOptions::from_json("{not json").is_err());
    }

    #[test]
    fn test_builder() {
        let options = TableOptions::new().with_trace(true).with_date_format("%Y/%m/%d");
        assert!(options.trace);
        assert_eq!(options.date_format, "%Y/%m/%d");
    }
}
