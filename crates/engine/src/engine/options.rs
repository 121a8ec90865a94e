//! Field projection and link options for read operations

use listserv_core::{Item, ItemData};
use std::collections::HashSet;

/// Filters applied to items returned by dataset and item reads
///
/// With no fields requested, returned items carry no data beyond what link
/// enrichment attaches. `get_dataset_by_id` with default options is the one
/// exception: it returns the stored dataset unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Data fields to keep
    pub include_fields: Vec<String>,
    /// Link specifiers, `datasetId-fieldName`
    pub links: Vec<String>,
}

impl ReadOptions {
    /// No projection, no links
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only these data fields
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Enrich with these links
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    /// Whether neither fields nor links were requested
    pub fn is_plain(&self) -> bool {
        self.include_fields.is_empty() && self.links.is_empty()
    }

    pub(crate) fn field_set(&self) -> HashSet<&str> {
        self.include_fields.iter().map(String::as_str).collect()
    }
}

/// Copy of `item` whose data holds only `fields`
pub(crate) fn project(item: &Item, fields: &HashSet<&str>) -> Item {
    let data: ItemData = item
        .data
        .iter()
        .filter(|(key, _)| fields.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();
    Item {
        id: item.id.clone(),
        name: item.name.clone(),
        data,
        is_archived: item.is_archived,
    }
}
