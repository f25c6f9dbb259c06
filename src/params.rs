use std::collections::BTreeMap;

use crate::types::RowValues;

/// Named query parameters.
///
/// Names are stored without their placeholder prefix, so `"id"`, `"@id"`,
/// `":id"` and `"$id"` all address the same entry. Inserting a name twice
/// keeps the last value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamSet {
    values: BTreeMap<String, RowValues>,
}

/// Strip a single leading placeholder sigil from a parameter name.
#[must_use]
pub fn normalize_name(name: &str) -> &str {
    name.strip_prefix(['@', ':', '$']).unwrap_or(name)
}

impl ParamSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<RowValues>) -> Self {
        self.insert(name, value);
        self
    }

    /// Bind `value` under `name`, returning the value it replaced.
    pub fn insert(&mut self, name: &str, value: impl Into<RowValues>) -> Option<RowValues> {
        self.values
            .insert(normalize_name(name).to_owned(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RowValues> {
        self.values.get(normalize_name(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RowValues)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: AsRef<str>, V: Into<RowValues>> FromIterator<(K, V)> for ParamSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = ParamSet::new();
        for (name, value) in iter {
            set.insert(name.as_ref(), value);
        }
        set
    }
}

impl<K: AsRef<str>, V: Into<RowValues>> Extend<(K, V)> for ParamSet {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name.as_ref(), value);
        }
    }
}
