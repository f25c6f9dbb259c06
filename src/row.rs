use std::collections::HashMap;
use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::types::RowValues;

/// Column layout shared by every row of one result set.
///
/// The name index is built once per result set rather than once per row.
#[derive(Debug, Clone)]
pub struct RowShape {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
}

impl RowShape {
    #[must_use]
    pub fn new(columns: Vec<String>) -> Self {
        // later duplicates overwrite earlier ones, so name lookups see the last column
        let index = columns
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect::<HashMap<_, _>>();
        Self {
            columns: Arc::new(columns),
            index: Arc::new(index),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Attach values (in column order) to this shape.
    #[must_use]
    pub fn row(&self, values: Vec<RowValues>) -> Row {
        Row {
            columns: Arc::clone(&self.columns),
            index: Arc::clone(&self.index),
            values,
        }
    }
}

/// One result row: a mapping from column name to value.
///
/// SQL `NULL` is kept as an explicit [`RowValues::Null`] so every selected
/// column is present.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<Vec<String>>,
    index: Arc<HashMap<String, usize>>,
    values: Vec<RowValues>,
}

impl Row {
    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.index
            .get(column_name)
            .and_then(|&idx| self.values.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.values.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn values(&self) -> &[RowValues] {
        &self.values
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate `(column, value)` pairs in driver order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Convert into a JSON object, the shape most hosts expect for a row.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    fn is_visible(&self, position: usize) -> bool {
        self.index.get(&self.columns[position]) == Some(&position)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.index.len()))?;
        for (position, (column, value)) in self.iter().enumerate() {
            if self.is_visible(position) {
                map.serialize_entry(column, value)?;
            }
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_by_name_and_index() {
        let shape = RowShape::new(vec!["id".into(), "name".into()]);
        let row = shape.row(vec![RowValues::Int(1), RowValues::Null]);
        assert_eq!(row.get("id"), Some(&RowValues::Int(1)));
        assert_eq!(row.get("name"), Some(&RowValues::Null));
        assert_eq!(row.get("missing"), None);
        assert_eq!(row.get_by_index(1), Some(&RowValues::Null));
    }

    #[test]
    fn duplicate_columns_keep_last_value() {
        let shape = RowShape::new(vec!["a".into(), "a".into()]);
        let row = shape.row(vec![RowValues::Int(1), RowValues::Int(2)]);
        assert_eq!(row.get("a"), Some(&RowValues::Int(2)));
        assert_eq!(row.to_json(), json!({"a": 2}));
    }

    #[test]
    fn json_keeps_nulls() {
        let shape = RowShape::new(vec!["id".into(), "note".into()]);
        let row = shape.row(vec![RowValues::Int(5), RowValues::Null]);
        assert_eq!(row.to_json(), json!({"id": 5, "note": null}));
    }
}
