use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::domain::{Announcement, FeedBody, FeedItem};

/// Length of the plain-text body preview on feed items.
pub const BODY_PREVIEW_CHARS: usize = 80;

pub fn to_feed_item(announcement: &Announcement, marked_read: Option<DateTime<Utc>>) -> FeedItem {
    FeedItem {
        id: announcement.id,
        subject: announcement.subject.clone(),
        body: FeedBody {
            body: announcement.body.clone(),
            truncated: truncate_chars(&announcement.body, BODY_PREVIEW_CHARS),
        },
        visible_from: announcement.visible_from,
        is_urgent: announcement.is_urgent,
        modified: announcement.edited_at(),
        marked_read,
    }
}

fn always_include(item: &FeedItem) -> bool {
    item.is_urgent || item.marked_read.is_none()
}

/// Annotates the visible announcements with read state and applies the
/// soft cap: urgent or unread items are always kept, while read,
/// non-urgent items consume a remaining budget of
/// `limit - count(always included)` in input order. The result is a
/// filter over the input order, never a re-sort.
pub fn assemble_feed(
    visible: &[Announcement],
    read_marks: &HashMap<i64, DateTime<Utc>>,
    limit: usize,
) -> Vec<FeedItem> {
    let items: Vec<FeedItem> = visible
        .iter()
        .map(|a| to_feed_item(a, read_marks.get(&a.id).copied()))
        .collect();

    let always_included = items.iter().filter(|item| always_include(item)).count();
    let extra_budget = limit.saturating_sub(always_included);

    let mut extra_used = 0usize;
    items
        .into_iter()
        .filter(|item| {
            if always_include(item) {
                true
            } else {
                extra_used += 1;
                extra_used <= extra_budget
            }
        })
        .collect()
}

pub fn unread_count(items: &[FeedItem]) -> usize {
    items.iter().filter(|item| item.marked_read.is_none()).count()
}

/// Char-boundary-safe prefix; appends an ellipsis when shortened so the
/// result never exceeds `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(max_chars.saturating_sub(1)).collect();
        truncated.push('…');
        truncated
    }
}
