//! Data model: datasets, items, field descriptors
//!
//! Item values are untyped JSON (`serde_json::Value`). The `fields` schema on a
//! dataset is advisory only and is never enforced at write time.
//!
//! Serialized names are camelCase so stored documents stay readable by other
//! tooling that consumes the same files.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::hash::{Hash, Hasher};

/// Field name → untyped value
pub type ItemData = BTreeMap<String, Value>;

// ============================================================================
// DatasetField
// ============================================================================

/// Advisory schema descriptor for one item-data key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetField {
    /// Key in item data
    pub name: String,
    /// Declared type ("string", "number", ...); not enforced
    #[serde(default)]
    pub data_type: String,
    /// This field carries the item id
    #[serde(default)]
    pub is_id: bool,
    /// This field carries the display name
    #[serde(default)]
    pub is_name: bool,
    /// Declared as required; not enforced
    #[serde(default)]
    pub is_required: bool,
    /// Included in default projections
    #[serde(default = "default_true")]
    pub is_included: bool,
    /// Example values for documentation
    #[serde(default)]
    pub sample_values: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl DatasetField {
    /// Create a descriptor with the given name and declared type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        DatasetField {
            name: name.into(),
            data_type: data_type.into(),
            is_id: false,
            is_name: false,
            is_required: false,
            is_included: true,
            sample_values: Vec::new(),
        }
    }

    /// Mark as the id field
    pub fn id(mut self) -> Self {
        self.is_id = true;
        self.is_required = true;
        self
    }

    /// Mark as the display-name field
    pub fn name_field(mut self) -> Self {
        self.is_name = true;
        self
    }

    /// Mark as required
    pub fn required(mut self) -> Self {
        self.is_required = true;
        self
    }
}

// ============================================================================
// Item
// ============================================================================

/// One record within a dataset
///
/// Identity and equality are by `id` alone: two items with the same id are the
/// same item regardless of their data.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique within the owning dataset
    pub id: String,
    /// Display label
    #[serde(default)]
    pub name: String,
    /// Source of truth for every field value, including id/name fields
    #[serde(default)]
    pub data: ItemData,
    /// Soft-delete flag
    #[serde(default)]
    pub is_archived: bool,
}

impl Item {
    /// Create an item with empty data
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Item {
            id: id.into(),
            name: name.into(),
            data: ItemData::new(),
            is_archived: false,
        }
    }

    /// Set a data field (builder style)
    pub fn with_field(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(field.into(), value.into());
        self
    }

    /// Text form of a data field, if it has one
    ///
    /// See [`value_text`].
    pub fn text_value(&self, field: &str) -> Option<String> {
        self.data.get(field).and_then(value_text)
    }

    /// Text to index for this item, or `None` if it must stay out of the index
    ///
    /// Archived items are never indexed.
    pub fn index_text(&self, name_field: &str) -> Option<String> {
        if self.is_archived {
            return None;
        }
        self.text_value(name_field)
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Text rendering of a scalar value
///
/// Strings render as themselves, numbers and booleans as their JSON text.
/// Null, arrays, objects and blank strings have no text.
pub fn value_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// Named, schema-described collection of items
///
/// `id`, `id_field` and `name_field` never change after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    /// Stable unique id
    pub id: String,
    /// Friendly name
    #[serde(default)]
    pub name: String,
    /// Free text
    #[serde(default)]
    pub description: String,
    /// Item-data key used as identity
    #[serde(default)]
    pub id_field: String,
    /// Item-data key used as display name (and indexed for search)
    #[serde(default)]
    pub name_field: String,
    /// Ordered advisory schema
    #[serde(default)]
    pub fields: Vec<DatasetField>,
    /// Item id → item; archived items stay here
    #[serde(default)]
    pub items: HashMap<String, Item>,
}

impl Dataset {
    /// Create an empty dataset
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        id_field: impl Into<String>,
        name_field: impl Into<String>,
    ) -> Self {
        Dataset {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            id_field: id_field.into(),
            name_field: name_field.into(),
            fields: Vec::new(),
            items: HashMap::new(),
        }
    }

    /// Set the description (builder style)
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the schema (builder style)
    pub fn with_fields(mut self, fields: Vec<DatasetField>) -> Self {
        self.fields = fields;
        self
    }

    /// Add items keyed by their own id (builder style)
    pub fn with_items(mut self, items: impl IntoIterator<Item = Item>) -> Self {
        for item in items {
            self.items.insert(item.id.clone(), item);
        }
        self
    }

    /// Read-only projection without items
    pub fn meta(&self) -> DatasetMeta {
        DatasetMeta::from(self)
    }

    /// Non-archived items, in map order
    pub fn active_items(&self) -> impl Iterator<Item = &Item> {
        self.items.values().filter(|item| !item.is_archived)
    }

    /// Non-archived item by id
    pub fn active_item(&self, item_id: &str) -> Option<&Item> {
        self.items.get(item_id).filter(|item| !item.is_archived)
    }
}

// ============================================================================
// DatasetMeta
// ============================================================================

/// Dataset without its items
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMeta {
    /// Dataset id
    pub id: String,
    /// Friendly name
    #[serde(default)]
    pub name: String,
    /// Free text
    #[serde(default)]
    pub description: String,
    /// Item-data key used as identity
    #[serde(default)]
    pub id_field: String,
    /// Item-data key used as display name
    #[serde(default)]
    pub name_field: String,
    /// Ordered advisory schema
    #[serde(default)]
    pub fields: Vec<DatasetField>,
}

impl From<&Dataset> for DatasetMeta {
    fn from(dataset: &Dataset) -> Self {
        DatasetMeta {
            id: dataset.id.clone(),
            name: dataset.name.clone(),
            description: dataset.description.clone(),
            id_field: dataset.id_field.clone(),
            name_field: dataset.name_field.clone(),
            fields: dataset.fields.clone(),
        }
    }
}

// ============================================================================
// EngineState
// ============================================================================

/// Snapshot of every currently cached dataset, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Dataset id → dataset
    pub datasets: HashMap<String, Dataset>,
}
