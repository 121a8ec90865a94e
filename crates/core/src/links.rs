//! Cross-dataset link specifiers
//!
//! A link is written `datasetId-fieldName`: the dataset to join against and the
//! field in that dataset whose value is matched against the requesting item's id.
//! Only the first `-` separates the two parts, so field names may contain dashes.

use std::fmt;

/// Parsed `datasetId-fieldName` link
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LinkSpec {
    raw: String,
    dataset_id: String,
    field: String,
}

impl LinkSpec {
    /// Parse a specifier; `None` if either part is missing or blank
    pub fn parse(raw: &str) -> Option<LinkSpec> {
        let (dataset_id, field) = raw.split_once('-')?;
        if dataset_id.trim().is_empty() || field.trim().is_empty() {
            return None;
        }
        Some(LinkSpec {
            raw: raw.to_string(),
            dataset_id: dataset_id.to_string(),
            field: field.to_string(),
        })
    }

    /// The specifier as written
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Dataset to join against; also the key linked items are attached under
    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    /// Field in the linked dataset
    pub fn field(&self) -> &str {
        &self.field
    }
}

impl fmt::Display for LinkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
