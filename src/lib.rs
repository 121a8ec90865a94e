//! ListServ - in-process data engine for reference datasets
//!
//! ListServ serves named datasets of key-value items with paginated listing,
//! case-insensitive substring search, soft-delete (archive) and cross-dataset
//! joins ("links").
//!
//! # Quick Start
//!
//! ```ignore
//! use listserv::{DataEngine, Dataset, Item, ReadOptions};
//!
//! let engine = DataEngine::open("./data")?;
//! engine.create_dataset(
//!     Dataset::new("countries", "Countries", "code", "name")
//!         .with_items(vec![Item::new("fr", "France").with_field("name", "France")]),
//! )?;
//!
//! let hits = engine.search_items("countries", "fran", 0, 10, &ReadOptions::new())?;
//! ```
//!
//! # Architecture
//!
//! - `listserv-core`: data model, link specifiers, error taxonomy
//! - `listserv-search`: compressed suffix tree index
//! - `listserv-concurrency`: read/write guard, single-flight, init gate
//! - `listserv-durability`: dataset stores (JSON files, in-memory)
//! - `listserv-engine`: dataset cache, link enricher, [`DataEngine`]

pub use listserv_core::{
    value_text, Dataset, DatasetField, DatasetMeta, EngineState, ErrorCategory, Item, ItemData,
    LinkSpec, ListServError, ListServResult,
};
pub use listserv_durability::{DatasetStore, FileStore, InMemoryStore, RetryConfig, StoreConfig};
pub use listserv_engine::{
    CacheConfig, CacheLookup, DataEngine, DatasetCache, EngineConfig, ListServConfig, ReadOptions,
    WriteOrder, CONFIG_FILE_NAME,
};
pub use listserv_search::{CompressedSuffixTree, ItemIndex, SuffixTreeIndex};
