use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processed meeting recording, as reported by the meeting API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub record_id: String,
    pub meeting_id: String,
    pub name: String,
    pub length_minutes: u32,
    pub participants: u32,
    pub visibility: RecordingVisibility,
    pub formats: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingVisibility {
    Public,
    Unlisted,
}

/// Search and ordering parameters, echoed back to the caller alongside
/// the page so the frontend can keep its controls in sync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordingFilter {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
}

/// One page of results plus pagination bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T> {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub items: Vec<T>,
}

/// Filter, then order, a recording set. With `public_only` set, unlisted
/// recordings are dropped before the search is applied.
pub fn search_recordings(
    mut recordings: Vec<Recording>,
    filter: &RecordingFilter,
    public_only: bool,
) -> Vec<Recording> {
    if public_only {
        recordings.retain(|r| r.visibility == RecordingVisibility::Public);
    }

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let needle = search.to_lowercase();
        recordings.retain(|r| {
            r.name.to_lowercase().contains(&needle)
                || r.formats.iter().any(|f| f.to_lowercase().contains(&needle))
        });
    }

    if let Some(column) = filter.column.as_deref() {
        match column {
            "name" => recordings.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase())),
            "length" => recordings.sort_by_key(|r| r.length_minutes),
            "users" => recordings.sort_by_key(|r| r.participants),
            "visibility" => recordings.sort_by_key(|r| r.visibility == RecordingVisibility::Public),
            "formats" => recordings.sort_by(|a, b| a.formats.cmp(&b.formats)),
            // Unknown columns keep the natural order: newest first.
            _ => recordings.sort_by_key(|r| std::cmp::Reverse(r.recorded_at)),
        }
        if filter.direction.as_deref() == Some("desc") {
            recordings.reverse();
        }
    } else {
        recordings.sort_by_key(|r| std::cmp::Reverse(r.recorded_at));
    }

    recordings
}

/// Slice one page out of an already-ordered list. Pages are 1-based; a
/// page past the end comes back empty rather than erroring.
pub fn paginate<T>(items: Vec<T>, page: usize, per_page: usize) -> Paginated<T> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total = items.len();
    let total_pages = total.div_ceil(per_page).max(1);

    let items: Vec<T> = items
        .into_iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .collect();

    Paginated {
        page,
        per_page,
        total,
        total_pages,
        items,
    }
}
