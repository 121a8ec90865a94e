//! Dataset mutations and the commit pipeline
//!
//! Every write goes through [`DataEngine::commit`]:
//!
//! ```text
//! commit lock
//!   CacheThenPersist:  write lock { check; apply to cache; snapshot }  → save snapshot
//!   PersistThenCache:  read lock  { check; apply to copy }             → save copy
//!                      write lock { apply to cache }
//! ```
//!
//! Argument validation happens before `commit` is called; `check` only
//! covers conflicts that depend on the current dataset contents.
//!
//! Applying a mutation twice has the same effect as applying it once, so the
//! second apply of persist-then-cache is safe even if the dataset was evicted
//! and reloaded from the saved copy in between.

use super::config::WriteOrder;
use super::DataEngine;
use listserv_core::{Dataset, DatasetField, Item, ListServError, ListServResult};
use listserv_search::ItemIndex;
use std::collections::HashSet;
use tracing::error;

/// A change to one dataset
#[derive(Debug, Clone)]
pub(crate) enum Mutation {
    /// Insert new items; all-or-nothing
    AddItems(Vec<Item>),
    /// Replace an existing item
    UpdateItem(Item),
    /// Soft-delete an item
    ArchiveItem(String),
    /// Replace name, description and schema
    UpdateMeta {
        name: String,
        description: String,
        fields: Vec<DatasetField>,
    },
}

impl Mutation {
    /// Conflicts against the current contents of `dataset`
    pub(crate) fn check(&self, dataset: &Dataset) -> ListServResult<()> {
        match self {
            Mutation::AddItems(items) => {
                let mut seen = HashSet::with_capacity(items.len());
                let duplicates: Vec<String> = items
                    .iter()
                    .filter(|item| {
                        dataset.items.contains_key(&item.id) || !seen.insert(item.id.as_str())
                    })
                    .map(|item| item.id.clone())
                    .collect();
                if duplicates.is_empty() {
                    Ok(())
                } else {
                    Err(ListServError::item_already_exists(&dataset.id, duplicates))
                }
            }
            Mutation::UpdateItem(item) => require_item(dataset, &item.id),
            Mutation::ArchiveItem(item_id) => require_item(dataset, item_id),
            Mutation::UpdateMeta { .. } => Ok(()),
        }
    }

    /// Apply to `dataset`, keeping `index` in step when given
    pub(crate) fn apply(&self, dataset: &mut Dataset, index: Option<&mut ItemIndex>) {
        let mut index = index;
        let name_field = dataset.name_field.clone();
        match self {
            Mutation::AddItems(items) => {
                for item in items {
                    if let (Some(index), Some(text)) =
                        (index.as_deref_mut(), item.index_text(&name_field))
                    {
                        index.add(&text, &item.id);
                    }
                    dataset.items.insert(item.id.clone(), item.clone());
                }
            }
            Mutation::UpdateItem(item) => {
                let previous = dataset.items.insert(item.id.clone(), item.clone());
                if let Some(index) = index.as_deref_mut() {
                    if let Some(text) = previous.and_then(|p| p.index_text(&name_field)) {
                        index.remove(&text, &item.id);
                    }
                    if let Some(text) = item.index_text(&name_field) {
                        index.add(&text, &item.id);
                    }
                }
            }
            Mutation::ArchiveItem(item_id) => {
                if let Some(item) = dataset.items.get_mut(item_id) {
                    if let (Some(index), Some(text)) =
                        (index.as_deref_mut(), item.index_text(&name_field))
                    {
                        index.remove(&text, item_id);
                    }
                    item.is_archived = true;
                }
            }
            Mutation::UpdateMeta {
                name,
                description,
                fields,
            } => {
                dataset.name = name.clone();
                dataset.description = description.clone();
                dataset.fields = fields.clone();
            }
        }
    }
}

fn require_item(dataset: &Dataset, item_id: &str) -> ListServResult<()> {
    if dataset.items.contains_key(item_id) {
        Ok(())
    } else {
        Err(ListServError::item_not_found(&dataset.id, item_id))
    }
}

impl DataEngine {
    /// Apply `mutation` to `dataset_id` in memory and in the store
    pub(crate) fn commit(&self, dataset_id: &str, mutation: &Mutation) -> ListServResult<()> {
        let _commit = self.commit_lock.lock();
        match self.config.write_order {
            WriteOrder::CacheThenPersist => {
                // Held until the save lands so a reload cannot replace the applied copy
                let _pin = self.cache.pin(dataset_id);
                let snapshot = self.cache.write(dataset_id, |cached| {
                    mutation.check(&cached.dataset)?;
                    mutation.apply(&mut cached.dataset, Some(&mut cached.index));
                    Ok::<_, ListServError>(cached.dataset.clone())
                })??;
                self.persist(&snapshot)
            }
            WriteOrder::PersistThenCache => {
                let draft = self.cache.read(dataset_id, |cached| {
                    mutation.check(&cached.dataset)?;
                    let mut draft = cached.dataset.clone();
                    mutation.apply(&mut draft, None);
                    Ok::<_, ListServError>(draft)
                })??;
                self.persist(&draft)?;
                self.cache.write(dataset_id, |cached| {
                    mutation.apply(&mut cached.dataset, Some(&mut cached.index))
                })
            }
        }
    }

    pub(crate) fn persist(&self, dataset: &Dataset) -> ListServResult<()> {
        self.store.save_dataset(dataset).map_err(|e| {
            error!(target: "listserv::engine", dataset_id = %dataset.id, error = %e, "Failed to persist dataset");
            e
        })
    }
}
