//! Cross-dataset link enrichment
//!
//! A request may name links of the form `datasetId-fieldName`. For each link
//! the enricher builds a lookup over the linked dataset: the text value of
//! `fieldName` → every active linked item carrying that value. Each result
//! item then gets `data[datasetId]` set to the linked items whose value equals
//! the result item's id (an empty list when none match).
//!
//! Preparation loads linked datasets through the cache, one rayon task per
//! link. A link whose dataset fails to load is dropped with a warning; the
//! primary read still succeeds.
//!
//! Enrichment never runs under the concurrency guard: [`LinkEnricher::prepare`]
//! takes the shared lock once per linked dataset and returns owned data.

use crate::cache::DatasetCache;
use listserv_core::{Item, LinkSpec};
use rayon::prelude::*;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// Linked value → data of every linked item holding it
pub type LinkLookup = HashMap<String, Vec<Value>>;

/// Lookups built by [`LinkEnricher::prepare`], keyed by the link as written
#[derive(Debug, Clone, Default)]
pub struct PreparedLinks {
    lookups: HashMap<String, (LinkSpec, LinkLookup)>,
}

impl PreparedLinks {
    /// Lookup for `raw_link`, if it was prepared
    pub fn get(&self, raw_link: &str) -> Option<&LinkLookup> {
        self.lookups.get(raw_link).map(|(_, lookup)| lookup)
    }

    /// Number of prepared links
    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    /// Whether nothing was prepared
    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

/// Resolves link specifiers against cached datasets
pub struct LinkEnricher {
    cache: Arc<DatasetCache>,
    max_linked_datasets: usize,
}

impl LinkEnricher {
    /// Create an enricher processing at most `max_linked_datasets` links per request
    pub fn new(cache: Arc<DatasetCache>, max_linked_datasets: usize) -> Self {
        LinkEnricher {
            cache,
            max_linked_datasets,
        }
    }

    /// Build lookups for `links`
    ///
    /// Only the first `max_linked_datasets` links are considered. Malformed
    /// specifiers and unknown datasets are skipped. With `required` set, only
    /// values in that set are kept.
    pub fn prepare(&self, links: &[String], required: Option<&HashSet<String>>) -> PreparedLinks {
        let specs: Vec<LinkSpec> = links
            .iter()
            .take(self.max_linked_datasets)
            .filter_map(|raw| {
                let spec = LinkSpec::parse(raw);
                if spec.is_none() {
                    debug!(target: "listserv::links", link = %raw, "Ignoring malformed link");
                }
                spec
            })
            .filter(|spec| self.cache.is_known(spec.dataset_id()))
            .collect();

        if specs.is_empty() {
            return PreparedLinks::default();
        }

        let lookups = specs
            .into_par_iter()
            .filter_map(|spec| {
                let field = spec.field().to_string();
                match self
                    .cache
                    .read(spec.dataset_id(), |cached| build_lookup(&cached.dataset.items, &field, required))
                {
                    Ok(lookup) => Some((spec.raw().to_string(), (spec, lookup))),
                    Err(e) => {
                        warn!(
                            target: "listserv::links",
                            dataset_id = %spec.dataset_id(),
                            link = %spec,
                            error = %e,
                            "Failed to load linked dataset"
                        );
                        None
                    }
                }
            })
            .collect();

        PreparedLinks { lookups }
    }

    /// Attach linked items to `item.data`, one key per prepared link
    ///
    /// Links that were not prepared are skipped.
    pub fn enrich(&self, item: &mut Item, links: &[String], prepared: &PreparedLinks) {
        for raw in links.iter().take(self.max_linked_datasets) {
            let Some((spec, lookup)) = prepared.lookups.get(raw) else {
                continue;
            };
            let linked = lookup.get(&item.id).cloned().unwrap_or_default();
            item.data
                .insert(spec.dataset_id().to_string(), Value::Array(linked));
        }
    }
}

fn build_lookup(
    items: &HashMap<String, Item>,
    field: &str,
    required: Option<&HashSet<String>>,
) -> LinkLookup {
    let mut lookup = LinkLookup::new();
    for item in items.values().filter(|item| !item.is_archived) {
        let Some(key) = item.text_value(field) else {
            continue;
        };
        if required.is_some_and(|required| !required.contains(&key)) {
            continue;
        }
        let data: Map<String, Value> = item
            .data
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        lookup.entry(key).or_default().push(Value::Object(data));
    }
    lookup
}
