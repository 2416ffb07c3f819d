//! SQLite-backed file record store with FTS5 full-text search.

mod fts5;
mod library_index;
mod query;

pub use fts5::{FtsConfig, FtsManager};
pub use library_index::{
    seed_category, Collection, FileRecord, FileUpdate, LibraryIndex, LibraryStats, NewCollection,
    NewFileRecord, SearchResults, Tag, TagCategory, TagSeed, DEFAULT_TAG_SEEDS,
};
pub use query::{
    build_fts5_query, escape_fts5_term, SearchFilters, SearchQuery, SortDirection, SortField,
    SortSpec,
};

pub(crate) use library_index::now_ms;
