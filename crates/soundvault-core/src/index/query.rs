//! Search query types and SQL assembly.
//!
//! A [`SearchQuery`] is translated into one WHERE-clause assembly shared by
//! the page query and the total-count query, so both always agree. The sort
//! field is dispatched through a closed enum; caller input is never
//! interpolated into SQL.

use crate::classify::FileKind;
use crate::config::SearchConfig;
use crate::error::{LibraryError, Result};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use regex::Regex;

/// Characters that require quoting in FTS5 queries (anything outside
/// plain lowercase alphanumerics).
static FTS5_SPECIAL_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]").expect("valid fts escape regex"));

/// Escape a term for FTS5 queries.
///
/// Terms containing special characters are wrapped in quotes, with any
/// embedded quotes doubled.
pub fn escape_fts5_term(term: &str) -> String {
    if FTS5_SPECIAL_CHARS.is_match(term) {
        let escaped = term.replace('"', "\"\"");
        format!("\"{}\"", escaped)
    } else {
        term.to_string()
    }
}

/// Build an FTS5 query string from free text.
///
/// The query uses OR matching with prefix support:
/// - "kick punch" → `kick* OR punch*`
/// - "gated-reverb" → `"gated-reverb"*`
pub fn build_fts5_query(search_term: &str) -> String {
    let search_term = search_term.to_lowercase().trim().to_string();

    if search_term.is_empty() {
        return String::new();
    }

    let mut query_parts = Vec::new();
    for term in search_term.split_whitespace() {
        let escaped = escape_fts5_term(term);
        if !escaped.is_empty() {
            query_parts.push(format!("{}*", escaped));
        }
    }

    query_parts.join(" OR ")
}

/// Sortable file record fields.
///
/// This enum is the only route from caller input to an ORDER BY column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    Filename,
    Bpm,
    ModifiedAt,
    IndexedAt,
    UseCount,
    Rating,
    Duration,
    EnergyLevel,
}

impl SortField {
    /// The column reference embedded in the ORDER BY clause.
    fn column(&self) -> &'static str {
        match self {
            SortField::Filename => "f.filename",
            SortField::Bpm => "f.bpm",
            SortField::ModifiedAt => "f.modified_at",
            SortField::IndexedAt => "f.indexed_at",
            SortField::UseCount => "f.use_count",
            SortField::Rating => "f.rating",
            SortField::Duration => "f.duration",
            SortField::EnergyLevel => "f.energy_level",
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Sort specification; defaults to most-recently-modified first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::ModifiedAt,
            direction: SortDirection::Desc,
        }
    }
}

/// Facet filters; all specified filters combine with AND semantics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilters {
    /// File must carry at least one of these tags (OR across the list).
    pub tags: Vec<i64>,
    /// Inclusive BPM range.
    pub bpm_range: Option<(f64, f64)>,
    /// Detected key must be one of these pitch classes.
    pub keys: Vec<String>,
    /// File kind must be one of these.
    pub file_kinds: Vec<FileKind>,
    /// Exact favorite-flag match.
    pub is_favorite: Option<bool>,
    /// Minimum rating (inclusive).
    pub min_rating: Option<u8>,
    /// Minimum energy level (inclusive).
    pub min_energy: Option<u8>,
    /// Maximum energy level (inclusive).
    pub max_energy: Option<u8>,
}

/// A faceted search request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    /// Free text matched against filename and notes.
    pub text: Option<String>,
    pub filters: SearchFilters,
    pub sort: Option<SortSpec>,
    /// Page size; defaults to [`SearchConfig::DEFAULT_LIMIT`].
    pub limit: Option<usize>,
    /// Page offset; defaults to 0.
    pub offset: Option<usize>,
}

/// A planned search: page SQL, count SQL and the shared parameter list.
///
/// Limit and offset are validated integers formatted inline, so the same
/// parameters drive both statements.
pub(crate) struct SearchPlan {
    pub select_sql: String,
    pub count_sql: String,
    pub params: Vec<Box<dyn ToSql>>,
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(",")
}

fn validate(query: &SearchQuery) -> Result<()> {
    if query.limit == Some(0) {
        return Err(LibraryError::validation("limit", "page size must be at least 1"));
    }
    if let Some((lo, hi)) = query.filters.bpm_range {
        if !lo.is_finite() || !hi.is_finite() || lo > hi {
            return Err(LibraryError::validation(
                "bpmRange",
                format!("invalid range [{lo}, {hi}]"),
            ));
        }
    }
    if let Some(rating) = query.filters.min_rating {
        if rating > 5 {
            return Err(LibraryError::validation("minRating", "rating is 0-5"));
        }
    }
    for (field, value) in [
        ("minEnergy", query.filters.min_energy),
        ("maxEnergy", query.filters.max_energy),
    ] {
        if let Some(energy) = value {
            if !(1..=10).contains(&energy) {
                return Err(LibraryError::validation(field, "energy level is 1-10"));
            }
        }
    }
    if let (Some(lo), Some(hi)) = (query.filters.min_energy, query.filters.max_energy) {
        if lo > hi {
            return Err(LibraryError::validation(
                "minEnergy",
                "floor exceeds ceiling",
            ));
        }
    }
    Ok(())
}

/// Translate a query into consistent page and count statements.
pub(crate) fn plan_search(query: &SearchQuery, file_columns: &str) -> Result<SearchPlan> {
    validate(query)?;

    let mut joins = String::new();
    let mut where_parts: Vec<String> = Vec::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    let filters = &query.filters;

    if !filters.tags.is_empty() {
        joins.push_str(" INNER JOIN file_tags ft ON ft.file_id = f.id");
        where_parts.push(format!("ft.tag_id IN ({})", placeholders(filters.tags.len())));
        for tag_id in &filters.tags {
            params.push(Box::new(*tag_id));
        }
    }

    let text = query.text.as_deref().map(str::trim).unwrap_or("");
    if !text.is_empty() {
        joins.push_str(" INNER JOIN file_search ON file_search.file_id = f.id");
        where_parts.push("file_search MATCH ?".to_string());
        params.push(Box::new(build_fts5_query(text)));
    }

    if let Some((lo, hi)) = filters.bpm_range {
        where_parts.push("f.bpm BETWEEN ? AND ?".to_string());
        params.push(Box::new(lo));
        params.push(Box::new(hi));
    }

    if !filters.keys.is_empty() {
        where_parts.push(format!(
            "f.detected_key IN ({})",
            placeholders(filters.keys.len())
        ));
        for key in &filters.keys {
            params.push(Box::new(key.clone()));
        }
    }

    if !filters.file_kinds.is_empty() {
        where_parts.push(format!(
            "f.file_kind IN ({})",
            placeholders(filters.file_kinds.len())
        ));
        for kind in &filters.file_kinds {
            params.push(Box::new(kind.as_str()));
        }
    }

    if let Some(favorite) = filters.is_favorite {
        where_parts.push("f.is_favorite = ?".to_string());
        params.push(Box::new(favorite));
    }

    if let Some(rating) = filters.min_rating {
        where_parts.push("f.rating >= ?".to_string());
        params.push(Box::new(rating));
    }

    if let Some(energy) = filters.min_energy {
        where_parts.push("f.energy_level >= ?".to_string());
        params.push(Box::new(energy));
    }

    if let Some(energy) = filters.max_energy {
        where_parts.push("f.energy_level <= ?".to_string());
        params.push(Box::new(energy));
    }

    let where_clause = if where_parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_parts.join(" AND "))
    };

    let sort = query.sort.unwrap_or_default();
    let limit = query.limit.unwrap_or(SearchConfig::DEFAULT_LIMIT);
    let offset = query.offset.unwrap_or(0);

    let select_sql = format!(
        "SELECT DISTINCT {} FROM files f{}{} ORDER BY {} {} LIMIT {} OFFSET {}",
        file_columns,
        joins,
        where_clause,
        sort.field.column(),
        sort.direction.keyword(),
        limit,
        offset
    );

    let count_sql = format!(
        "SELECT COUNT(DISTINCT f.id) FROM files f{}{}",
        joins, where_clause
    );

    Ok(SearchPlan {
        select_sql,
        count_sql,
        params,
    })
}
