use google_sheets4::api::ValueRange;
use serde_json::Value;

/// Cell values of one fetched range, row by row. The first row is the header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSheet {
    rows: Vec<Vec<String>>,
}

impl RawSheet {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The API omits `values` entirely for an empty range.
impl From<ValueRange> for RawSheet {
    fn from(value_range: ValueRange) -> Self {
        let rows = value_range
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();
        Self { rows }
    }
}
