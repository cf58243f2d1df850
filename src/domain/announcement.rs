use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Role;

/// Prefix for the human-facing announcement identifier ("AN-17").
pub const DISPLAY_ID_PREFIX: &str = "AN-";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Announcement {
    pub id: i64,
    pub subject: String,
    pub body: String,
    pub visible_from: DateTime<Utc>,
    pub visible_to: DateTime<Utc>,
    pub is_urgent: bool,
    pub audience: Audience,
    pub programme_id: Option<i64>,
    pub scheduled_course_id: Option<i64>,
    pub scheduled_course_group_id: Option<i64>,
    pub author_id: Option<i64>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl Announcement {
    pub fn display_id(&self) -> String {
        format!("{}{}", DISPLAY_ID_PREFIX, self.id)
    }

    /// The edit timestamp, or None for a never-edited record. `modified`
    /// equals `created` until the first update.
    pub fn edited_at(&self) -> Option<DateTime<Utc>> {
        (self.modified > self.created).then_some(self.modified)
    }
}

/// Coarse recipient category. A combined audience addresses users holding
/// any one of its roles, not only users holding all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Audience {
    All,
    Students,
    Tutors,
    StudentsAndTutors,
}

impl Audience {
    pub const ALL_AUDIENCES: [Audience; 4] = [
        Audience::All,
        Audience::Students,
        Audience::Tutors,
        Audience::StudentsAndTutors,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            Audience::All => "all",
            Audience::Students => "students",
            Audience::Tutors => "tutors",
            Audience::StudentsAndTutors => "students_and_tutors",
        }
    }

    pub fn from_code(code: &str) -> Option<Audience> {
        match code {
            "all" => Some(Audience::All),
            "students" => Some(Audience::Students),
            "tutors" => Some(Audience::Tutors),
            "students_and_tutors" => Some(Audience::StudentsAndTutors),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Audience::All => "All",
            Audience::Students => "All students",
            Audience::Tutors => "All tutors",
            Audience::StudentsAndTutors => "All students and tutors",
        }
    }

    /// Roles addressed by a narrowed audience. Empty for `All`, which
    /// passes everyone without a role check.
    pub fn roles(&self) -> &'static [Role] {
        match self {
            Audience::All => &[],
            Audience::Students => &[Role::Students],
            Audience::Tutors => &[Role::Tutors],
            Audience::StudentsAndTutors => &[Role::Students, Role::Tutors],
        }
    }

    pub fn matches(&self, user_roles: &[Role]) -> bool {
        matches!(self, Audience::All) || self.roles().iter().any(|role| user_roles.contains(role))
    }
}

/// Full-record payload for create and update; there is no partial patch.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnouncementInput {
    pub subject: String,
    pub body: String,
    pub visible_from: DateTime<Utc>,
    pub visible_to: DateTime<Utc>,
    #[serde(default)]
    pub is_urgent: bool,
    pub audience: Audience,
    pub programme_id: Option<i64>,
    pub scheduled_course_id: Option<i64>,
    pub scheduled_course_group_id: Option<i64>,
}

/// Per-user read-mark. Row presence is the read state.
#[derive(Debug, Clone, Serialize)]
pub struct ReadMark {
    pub user_id: i64,
    pub announcement_id: i64,
    pub created: DateTime<Utc>,
}

/// One entry of the inbox-style feed returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct FeedItem {
    pub id: i64,
    pub subject: String,
    pub body: FeedBody,
    pub visible_from: DateTime<Utc>,
    pub is_urgent: bool,
    pub modified: Option<DateTime<Utc>>,
    pub marked_read: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedBody {
    pub body: String,
    pub truncated: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audience_codes_round_trip() {
        for audience in Audience::ALL_AUDIENCES {
            assert_eq!(Audience::from_code(audience.code()), Some(audience));
        }
        assert_eq!(Audience::from_code("staff"), None);
    }

    #[test]
    fn test_combined_audience_matches_either_role() {
        let audience = Audience::StudentsAndTutors;
        assert!(audience.matches(&[Role::Students]));
        assert!(audience.matches(&[Role::Tutors]));
        assert!(audience.matches(&[Role::Students, Role::Tutors]));
        assert!(!audience.matches(&[]));
    }

    #[test]
    fn test_all_audience_needs_no_role() {
        assert!(Audience::All.matches(&[]));
    }
}
