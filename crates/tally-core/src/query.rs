use std::cmp::Ordering;

use chrono::NaiveDate;
use tracing::trace;

use crate::task::TaskItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    DueDate,
    Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// The ephemeral view parameters. Owned by the calling collaborator,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QueryParams {
    pub search: String,
    pub status: StatusFilter,
    pub category: CategoryFilter,
    pub sort_key: SortKey,
    pub order: SortOrder,
}

impl std::str::FromStr for StatusFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "completed" => Ok(StatusFilter::Completed),
            "pending" => Ok(StatusFilter::Pending),
            other => Err(anyhow::anyhow!(
                "invalid status filter: {other} (expected all, pending, or completed)"
            )),
        }
    }
}

impl std::str::FromStr for SortKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "due" | "duedate" => Ok(SortKey::DueDate),
            "title" => Ok(SortKey::Title),
            other => Err(anyhow::anyhow!(
                "invalid sort key: {other} (expected due or title)"
            )),
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Asc),
            "desc" | "descending" => Ok(SortOrder::Desc),
            other => Err(anyhow::anyhow!(
                "invalid sort order: {other} (expected asc or desc)"
            )),
        }
    }
}

/// Derives the display view: filter, then stable sort. Pure; the result
/// never aliases the input collection.
#[tracing::instrument(skip(items, params), fields(total = items.len()))]
pub fn derive_view(items: &[TaskItem], params: &QueryParams) -> Vec<TaskItem> {
    let needle = params.search.to_lowercase();

    let mut view: Vec<TaskItem> = items
        .iter()
        .filter(|item| matches(item, params, &needle))
        .cloned()
        .collect();

    // sort_by is stable, so equal keys keep their insertion order in
    // both directions.
    view.sort_by(|a, b| {
        let ord = compare(a, b, params.sort_key);
        match params.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    trace!(kept = view.len(), "derived view");
    view
}

/// Unique category values across all items, in first-seen order. Feeds
/// the category filter choices; not part of the filter/sort pipeline.
pub fn distinct_categories(items: &[TaskItem]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !item.category.is_empty() && !out.contains(&item.category) {
            out.push(item.category.clone());
        }
    }
    out
}

fn matches(item: &TaskItem, params: &QueryParams, needle: &str) -> bool {
    if !needle.is_empty() && !item.title.to_lowercase().contains(needle) {
        trace!(id = %item.id, "excluded by search text");
        return false;
    }

    let status_ok = match params.status {
        StatusFilter::All => true,
        StatusFilter::Completed => item.completed,
        StatusFilter::Pending => !item.completed,
    };
    if !status_ok {
        trace!(id = %item.id, "excluded by status filter");
        return false;
    }

    if let CategoryFilter::Only(category) = &params.category
        && item.category != *category
    {
        trace!(id = %item.id, "excluded by category filter");
        return false;
    }

    true
}

fn compare(a: &TaskItem, b: &TaskItem, key: SortKey) -> Ordering {
    match key {
        SortKey::DueDate => compare_due(a.due_date, b.due_date),
        SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
    }
}

// Dateless items order after dated ones when ascending; ties compare
// equal so the stable sort preserves their relative order.
fn compare_due(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
