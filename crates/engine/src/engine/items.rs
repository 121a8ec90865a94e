//! Item operations
//!
//! Reads snapshot the matching items under the shared lock, then project and
//! enrich them with the lock released. Writes validate their arguments first
//! and go through the commit pipeline.

use super::mutation::Mutation;
use super::options::ReadOptions;
use super::DataEngine;
use listserv_core::{require_non_blank, validate_page, Item, ListServError, ListServResult};
use std::collections::HashSet;
use tracing::info;

impl DataEngine {
    /// Page of active items ordered by id
    pub fn list_items(
        &self,
        dataset_id: &str,
        skip: usize,
        take: usize,
        options: &ReadOptions,
    ) -> ListServResult<Vec<Item>> {
        require_non_blank(dataset_id, "dataset id")?;
        validate_page(take, self.config.max_search_results)?;
        self.initialize()?;

        let snapshot = self.cache.read(dataset_id, |cached| {
            let mut items: Vec<&Item> = cached.dataset.active_items().collect();
            items.sort_by(|a, b| a.id.cmp(&b.id));
            items.into_iter().skip(skip).take(take).cloned().collect::<Vec<_>>()
        })?;

        let required = ids_of(&snapshot);
        Ok(self.finish_items(snapshot, options, Some(&required)))
    }

    /// Page of active items whose name contains `term`, case-insensitively, ordered by id
    pub fn search_items(
        &self,
        dataset_id: &str,
        term: &str,
        skip: usize,
        take: usize,
        options: &ReadOptions,
    ) -> ListServResult<Vec<Item>> {
        require_non_blank(dataset_id, "dataset id")?;
        require_non_blank(term, "search term")?;
        validate_page(take, self.config.max_search_results)?;
        self.initialize()?;

        let snapshot = self.cache.read(dataset_id, |cached| {
            cached
                .index
                .find(term)
                .iter()
                .filter_map(|item_id| cached.dataset.active_item(item_id))
                .skip(skip)
                .take(take)
                .cloned()
                .collect::<Vec<_>>()
        })?;

        let required = ids_of(&snapshot);
        Ok(self.finish_items(snapshot, options, Some(&required)))
    }

    /// Active items among `item_ids`, in input order; unknown and archived ids are skipped
    pub fn search_items_by_ids(
        &self,
        dataset_id: &str,
        item_ids: &[String],
        options: &ReadOptions,
    ) -> ListServResult<Vec<Item>> {
        require_non_blank(dataset_id, "dataset id")?;
        self.initialize()?;
        if item_ids.is_empty() {
            return Ok(Vec::new());
        }

        let snapshot = self.cache.read(dataset_id, |cached| {
            item_ids
                .iter()
                .filter_map(|item_id| cached.dataset.active_item(item_id))
                .cloned()
                .collect::<Vec<_>>()
        })?;

        let required: HashSet<String> = item_ids.iter().cloned().collect();
        Ok(self.finish_items(snapshot, options, Some(&required)))
    }

    /// Active item by id; archived items are not found
    pub fn get_item_by_id(&self, dataset_id: &str, item_id: &str) -> ListServResult<Item> {
        require_non_blank(dataset_id, "dataset id")?;
        require_non_blank(item_id, "item id")?;
        self.initialize()?;

        self.cache
            .read(dataset_id, |cached| cached.dataset.active_item(item_id).cloned())?
            .ok_or_else(|| ListServError::item_not_found(dataset_id, item_id))
    }

    /// Add one item; fails with `ItemAlreadyExists` if the id is taken
    pub fn add_item(&self, dataset_id: &str, item: Item) -> ListServResult<()> {
        self.add_items(dataset_id, vec![item])
    }

    /// Add a batch of items, all or nothing
    ///
    /// Any id already in the dataset, or repeated within the batch, fails the
    /// whole batch with `ItemAlreadyExists` before anything is changed.
    pub fn add_items(&self, dataset_id: &str, items: Vec<Item>) -> ListServResult<()> {
        require_non_blank(dataset_id, "dataset id")?;
        if items.iter().any(|item| item.id.trim().is_empty()) {
            return Err(ListServError::validation(
                "Item with null or empty id found in the collection",
            ));
        }
        self.initialize()?;
        if items.is_empty() {
            return Ok(());
        }

        let count = items.len();
        self.commit(dataset_id, &Mutation::AddItems(items))?;
        info!(target: "listserv::engine", dataset_id, count, "Items added");
        Ok(())
    }

    /// Replace an existing item; fails with `ItemNotFound` if the id is absent
    pub fn update_item(&self, dataset_id: &str, item: Item) -> ListServResult<()> {
        require_non_blank(dataset_id, "dataset id")?;
        require_non_blank(&item.id, "item id")?;
        self.initialize()?;

        let item_id = item.id.clone();
        self.commit(dataset_id, &Mutation::UpdateItem(item))?;
        info!(target: "listserv::engine", dataset_id, item_id = %item_id, "Item updated");
        Ok(())
    }

    /// Soft-delete an item: it stays stored but disappears from every read
    pub fn archive_item(&self, dataset_id: &str, item_id: &str) -> ListServResult<()> {
        require_non_blank(dataset_id, "dataset id")?;
        require_non_blank(item_id, "item id")?;
        self.initialize()?;

        self.commit(dataset_id, &Mutation::ArchiveItem(item_id.to_string()))?;
        info!(target: "listserv::engine", dataset_id, item_id, "Item archived");
        Ok(())
    }
}

fn ids_of(items: &[Item]) -> HashSet<String> {
    items.iter().map(|item| item.id.clone()).collect()
}
