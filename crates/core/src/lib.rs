//! Core types for the ListServ data engine
//!
//! This crate defines the foundational types shared by every other crate:
//! - Dataset, Item, DatasetField, DatasetMeta: the data model
//! - EngineState: snapshot of cached datasets
//! - LinkSpec: parsed `datasetId-fieldName` join specifier
//! - ListServError: error taxonomy with outcome categories
//! - Limits: pagination bounds and argument validation

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod limits;
pub mod links;
pub mod types;

pub use error::{ErrorCategory, ListServError, ListServResult, MAX_REPORTED_DUPLICATES};
pub use limits::{
    require_non_blank, validate_page, DEFAULT_MAX_LINKED_DATASETS, DEFAULT_MAX_SEARCH_RESULTS,
};
pub use links::LinkSpec;
pub use types::{value_text, Dataset, DatasetField, DatasetMeta, EngineState, Item, ItemData};
