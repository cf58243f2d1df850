use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Announcement, Audience, DISPLAY_ID_PREFIX};

/// Date format accepted by the free-text query, day first.
pub const QUERY_DATE_FORMAT: &str = "%d/%m/%Y";

/// One row of the admin listing: the record plus the computed display
/// fields the listing sorts and searches on.
#[derive(Debug, Clone, Serialize)]
pub struct ListedAnnouncement {
    #[serde(flatten)]
    pub announcement: Announcement,
    pub programme_name: Option<String>,
    pub recipient: String,
    pub display_id: String,
}

impl ListedAnnouncement {
    pub fn new(announcement: Announcement, programme_name: Option<String>) -> Self {
        let recipient = recipient_label(announcement.audience, programme_name.as_deref());
        let display_id = announcement.display_id();
        Self {
            announcement,
            programme_name,
            recipient,
            display_id,
        }
    }
}

/// "Programme <name>" when a programme is attached, otherwise the
/// audience label. Computed for sort/display, never stored.
pub fn recipient_label(audience: Audience, programme_name: Option<&str>) -> String {
    match programme_name {
        Some(name) => format!("Programme {}", name),
        None => audience.label().to_string(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListParams {
    pub column: String,
    pub order: String,
    pub q: String,
    pub offset: Option<usize>,
    pub count: Option<usize>,
}

/// Filters, sorts and paginates the listing. Returns the page plus the
/// total count of the filtered set before pagination.
pub fn run_query(
    mut rows: Vec<ListedAnnouncement>,
    params: &ListParams,
) -> (Vec<ListedAnnouncement>, usize) {
    let tokens: Vec<&str> = params.q.split_whitespace().collect();
    rows.retain(|row| tokens.iter().all(|token| token_matches(row, token)));

    sort_rows(&mut rows, &params.column, params.order == "desc");

    let total = rows.len();
    let start = params.offset.unwrap_or(0).min(total);
    let end = match params.count {
        Some(count) => start.saturating_add(count).min(total),
        None => total,
    };

    (rows[start..end].to_vec(), total)
}

// Each token ORs three interpretations; the substring branch always
// applies, so a token that also parses as a date or id prefix simply
// matches more rows.
fn token_matches(row: &ListedAnnouncement, token: &str) -> bool {
    date_matches(row, token) || id_matches(row, token) || text_matches(row, token)
}

fn date_matches(row: &ListedAnnouncement, token: &str) -> bool {
    match NaiveDate::parse_from_str(token, QUERY_DATE_FORMAT) {
        Ok(date) => row.announcement.visible_from.date_naive() == date,
        Err(_) => false,
    }
}

fn id_matches(row: &ListedAnnouncement, token: &str) -> bool {
    let token = token.to_lowercase();
    match token.strip_prefix(&DISPLAY_ID_PREFIX.to_lowercase()) {
        Some(suffix) => row.announcement.id.to_string().starts_with(suffix),
        None => false,
    }
}

fn text_matches(row: &ListedAnnouncement, token: &str) -> bool {
    let needle = token.to_lowercase();
    row.announcement.subject.to_lowercase().contains(&needle)
        || row.announcement.body.to_lowercase().contains(&needle)
}

// Unknown columns fall back to the id sort. Non-id columns tie-break by
// id ascending regardless of direction, so the order is always total.
fn sort_rows(rows: &mut [ListedAnnouncement], column: &str, descending: bool) {
    let directed = |ord: std::cmp::Ordering| if descending { ord.reverse() } else { ord };

    match column {
        "recipient" => rows.sort_by(|a, b| {
            directed(a.recipient.cmp(&b.recipient)).then(a.announcement.id.cmp(&b.announcement.id))
        }),
        "visible_from" => rows.sort_by(|a, b| {
            directed(a.announcement.visible_from.cmp(&b.announcement.visible_from))
                .then(a.announcement.id.cmp(&b.announcement.id))
        }),
        _ => rows.sort_by(|a, b| directed(a.announcement.id.cmp(&b.announcement.id))),
    }
}
