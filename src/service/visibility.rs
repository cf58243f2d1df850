use std::collections::HashSet;

use crate::domain::{Announcement, Role};
use crate::membership::CourseMembership;

// The four visibility filters are conjunctive: window (applied by the
// repository query), audience, programme, course/group. Failing any one
// excludes the announcement.

pub fn audience_passes(announcement: &Announcement, roles: &[Role]) -> bool {
    announcement.audience.matches(roles)
}

pub fn programme_passes(announcement: &Announcement, user_programmes: &HashSet<i64>) -> bool {
    match announcement.programme_id {
        None => true,
        Some(programme_id) => user_programmes.contains(&programme_id),
    }
}

/// Course/group check against the membership snapshot. `membership` is
/// the snapshot entry for the announcement's course, if any; `vle_group_id`
/// is the announcement's group, already resolved to its VLE identifier.
/// Any missing piece of the structure denies (fail closed).
pub fn course_and_group_pass(
    membership: Option<&CourseMembership>,
    vle_group_id: Option<&str>,
    username: &str,
) -> bool {
    let Some(membership) = membership else {
        return false;
    };

    if !membership.has_member(username) {
        return false;
    }

    match vle_group_id {
        None => true,
        Some(group) => membership.group_has_member(group, username),
    }
}
