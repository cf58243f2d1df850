use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use serde::Deserialize;

pub mod sync;

/// One VLE course's enrolment snapshot: the flat member list plus the
/// member list per course group, all keyed by username.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CourseMembership {
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub groups: HashMap<String, Vec<String>>,
}

impl CourseMembership {
    pub fn has_member(&self, username: &str) -> bool {
        self.members.iter().any(|member| member == username)
    }

    pub fn group_has_member(&self, vle_group_id: &str, username: &str) -> bool {
        self.groups
            .get(vle_group_id)
            .map(|members| members.iter().any(|member| member == username))
            .unwrap_or(false)
    }
}

/// Read side of the membership snapshot. An absent course means "no
/// membership"; callers deny visibility rather than raising an error.
#[async_trait]
pub trait MembershipDirectory: Send + Sync {
    async fn course(&self, vle_course_id: &str) -> Option<Arc<CourseMembership>>;
}

pub struct MokaMembershipDirectory {
    cache: Cache<String, Arc<CourseMembership>>,
}

impl MokaMembershipDirectory {
    pub fn new() -> Self {
        Self {
            cache: Cache::builder().build(),
        }
    }

    /// Replaces the snapshot wholesale. Only the refresher task (and
    /// tests) write; request handling reads only.
    pub async fn replace(&self, snapshot: HashMap<String, CourseMembership>) {
        self.cache.invalidate_all();
        for (vle_course_id, membership) in snapshot {
            self.cache.insert(vle_course_id, Arc::new(membership)).await;
        }
    }

    pub async fn insert(&self, vle_course_id: &str, membership: CourseMembership) {
        self.cache
            .insert(vle_course_id.to_string(), Arc::new(membership))
            .await;
    }
}

impl Default for MokaMembershipDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MembershipDirectory for MokaMembershipDirectory {
    async fn course(&self, vle_course_id: &str) -> Option<Arc<CourseMembership>> {
        self.cache.get(vle_course_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn membership() -> CourseMembership {
        CourseMembership {
            members: vec!["student.a".to_string(), "student.b".to_string()],
            groups: HashMap::from([(
                "A001/A".to_string(),
                vec!["student.a".to_string()],
            )]),
        }
    }

    #[test]
    fn test_course_member_lookup() {
        let m = membership();
        assert!(m.has_member("student.a"));
        assert!(!m.has_member("tutor.a"));
    }

    #[test]
    fn test_group_member_lookup_fails_closed_on_missing_group() {
        let m = membership();
        assert!(m.group_has_member("A001/A", "student.a"));
        assert!(!m.group_has_member("A001/A", "student.b"));
        assert!(!m.group_has_member("A001/Z", "student.a"));
    }

    #[tokio::test]
    async fn test_directory_miss_on_unknown_course() {
        let directory = MokaMembershipDirectory::new();
        directory.insert("A001", membership()).await;

        assert!(directory.course("A001").await.is_some());
        assert!(directory.course("B001").await.is_none());
    }
}
