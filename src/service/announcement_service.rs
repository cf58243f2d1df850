use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{
    domain::{Announcement, AnnouncementInput, FeedItem, ScheduledCourse, ScheduledCourseGroup, User},
    error::{AppError, Result},
    mailer::Mailer,
    membership::MembershipDirectory,
    repository::{AnnouncementRepository, CatalogRepository, ReadMarkRepository, UserRepository},
    service::{
        dispatch, feed,
        query::{self, ListParams, ListedAnnouncement},
        visibility,
    },
};

pub const SUBJECT_MAX_CHARS: usize = 100;

pub struct AnnouncementService {
    announcements: Arc<dyn AnnouncementRepository>,
    read_marks: Arc<dyn ReadMarkRepository>,
    users: Arc<dyn UserRepository>,
    catalog: Arc<dyn CatalogRepository>,
    memberships: Arc<dyn MembershipDirectory>,
    mailer: Option<Arc<dyn Mailer>>,
    base_url: String,
    feed_limit: usize,
}

impl AnnouncementService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        announcements: Arc<dyn AnnouncementRepository>,
        read_marks: Arc<dyn ReadMarkRepository>,
        users: Arc<dyn UserRepository>,
        catalog: Arc<dyn CatalogRepository>,
        memberships: Arc<dyn MembershipDirectory>,
        mailer: Option<Arc<dyn Mailer>>,
        base_url: String,
        feed_limit: usize,
    ) -> Self {
        Self {
            announcements,
            read_marks,
            users,
            catalog,
            memberships,
            mailer,
            base_url,
            feed_limit,
        }
    }

    fn validate_input(input: &AnnouncementInput, now: DateTime<Utc>) -> Result<()> {
        if input.subject.trim().is_empty() {
            return Err(AppError::Validation("'subject' must not be empty".to_string()));
        }
        if input.subject.chars().count() > SUBJECT_MAX_CHARS {
            return Err(AppError::Validation(format!(
                "'subject' must be at most {} characters",
                SUBJECT_MAX_CHARS
            )));
        }
        if input.visible_from >= input.visible_to {
            return Err(AppError::Validation(
                "'visible from' must be before 'visible to'".to_string(),
            ));
        }
        if input.visible_to < now {
            return Err(AppError::Validation(
                "'visible to' cannot be in the past".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn create(&self, input: AnnouncementInput, author: &User) -> Result<Announcement> {
        Self::validate_input(&input, Utc::now())?;

        let announcement = self.announcements.create(&input, Some(author.id)).await?;

        // Creation only, never update. The announcement is already
        // persisted; a dispatch problem must not fail the request.
        if announcement.is_urgent {
            if let Err(e) = self.notify_urgent(&announcement).await {
                tracing::error!(
                    "Urgent announcement {} email dispatch failed: {}",
                    announcement.id,
                    e
                );
            }
        }

        Ok(announcement)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Announcement>> {
        self.announcements.find_by_id(id).await
    }

    pub async fn update(&self, id: i64, input: AnnouncementInput) -> Result<Announcement> {
        if self.announcements.find_by_id(id).await?.is_none() {
            return Err(Self::not_found(id));
        }

        Self::validate_input(&input, Utc::now())?;
        self.announcements.update(id, &input).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        if self.announcements.find_by_id(id).await?.is_none() {
            return Err(Self::not_found(id));
        }

        self.announcements.delete(id).await
    }

    fn not_found(id: i64) -> AppError {
        AppError::NotFound(format!("Announcement with id {} does not exist", id))
    }

    /// Announcements visible to `user` at `at`: inside the visibility
    /// window and passing the audience, programme and course/group
    /// filters, urgent first then newest visible_from.
    pub async fn visible_announcements(
        &self,
        user: &User,
        at: DateTime<Utc>,
        urgent_only: bool,
    ) -> Result<Vec<Announcement>> {
        let mut announcements = self.announcements.list_visible_at(at).await?;
        if urgent_only {
            announcements.retain(|a| a.is_urgent);
        }

        let user_programmes = self.users.programme_ids_for(user.id).await?;
        announcements.retain(|a| {
            visibility::audience_passes(a, &user.roles)
                && visibility::programme_passes(a, &user_programmes)
        });

        let (courses, groups) = self.referenced_courses(&announcements).await?;

        let mut result = Vec::with_capacity(announcements.len());
        for announcement in announcements {
            if self
                .course_filters_pass(&announcement, &user.username, &courses, &groups)
                .await
            {
                result.push(announcement);
            }
        }
        Ok(result)
    }

    pub async fn feed(
        &self,
        user: &User,
        at: DateTime<Utc>,
        urgent_only: bool,
    ) -> Result<Vec<FeedItem>> {
        let visible = self.visible_announcements(user, at, urgent_only).await?;
        let ids: Vec<i64> = visible.iter().map(|a| a.id).collect();
        let read_marks = self.read_marks.read_marks_for(user.id, &ids).await?;
        Ok(feed::assemble_feed(&visible, &read_marks, self.feed_limit))
    }

    pub async fn unread_count(&self, user: &User, at: DateTime<Utc>) -> Result<usize> {
        let items = self.feed(user, at, false).await?;
        Ok(feed::unread_count(&items))
    }

    pub async fn mark_read(&self, user: &User, announcement_id: i64) -> Result<FeedItem> {
        let announcement = self
            .announcements
            .find_by_id(announcement_id)
            .await?
            .ok_or_else(|| Self::not_found(announcement_id))?;

        let mark = self.read_marks.mark_read(user.id, announcement_id).await?;
        Ok(feed::to_feed_item(&announcement, Some(mark.created)))
    }

    pub async fn mark_unread(&self, user: &User, announcement_id: i64) -> Result<()> {
        self.read_marks.mark_unread(user.id, announcement_id).await
    }

    /// Admin listing: every announcement with computed recipient label
    /// and display id, filtered by the free-text query, sorted and
    /// paginated.
    pub async fn list(&self, params: &ListParams) -> Result<(Vec<ListedAnnouncement>, usize)> {
        let announcements = self.announcements.list_all().await?;
        let programme_names: HashMap<i64, String> = self
            .catalog
            .programmes()
            .await?
            .into_iter()
            .map(|p| (p.id, p.display_name))
            .collect();

        let rows = announcements
            .into_iter()
            .map(|a| {
                let name = a.programme_id.and_then(|id| programme_names.get(&id).cloned());
                ListedAnnouncement::new(a, name)
            })
            .collect();

        Ok(query::run_query(rows, params))
    }

    /// Active accounts addressed by the audience and programme; the
    /// selection used for urgent-announcement emails.
    pub async fn recipients(&self, announcement: &Announcement) -> Result<Vec<User>> {
        let mut users = self.users.list_active().await?;
        users.retain(|u| announcement.audience.matches(&u.roles));

        if let Some(programme_id) = announcement.programme_id {
            let members = self.users.programme_member_ids(programme_id).await?;
            users.retain(|u| members.contains(&u.id));
        }

        Ok(users)
    }

    /// Course/group-aware variant backing the compose-form audience
    /// preview, with the same fail-closed snapshot checks as the
    /// visibility filter.
    pub async fn recipients_on_course(&self, announcement: &Announcement) -> Result<Vec<User>> {
        let users = self.recipients(announcement).await?;
        let (courses, groups) = self
            .referenced_courses(std::slice::from_ref(announcement))
            .await?;

        let mut result = Vec::with_capacity(users.len());
        for user in users {
            if self
                .course_filters_pass(announcement, &user.username, &courses, &groups)
                .await
            {
                result.push(user);
            }
        }
        Ok(result)
    }

    async fn notify_urgent(&self, announcement: &Announcement) -> Result<()> {
        let Some(mailer) = &self.mailer else {
            tracing::debug!("Mailer not configured; skipping urgent announcement emails");
            return Ok(());
        };

        let recipients = self.recipients(announcement).await?;
        dispatch::send_urgent_notifications(
            mailer.as_ref(),
            announcement,
            &recipients,
            &self.base_url,
        )
        .await;
        Ok(())
    }

    async fn referenced_courses(
        &self,
        announcements: &[Announcement],
    ) -> Result<(
        HashMap<i64, ScheduledCourse>,
        HashMap<i64, ScheduledCourseGroup>,
    )> {
        let course_ids: Vec<i64> = announcements
            .iter()
            .filter_map(|a| a.scheduled_course_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let group_ids: Vec<i64> = announcements
            .iter()
            .filter_map(|a| a.scheduled_course_group_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let courses = self
            .catalog
            .scheduled_courses(&course_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();
        let groups = self
            .catalog
            .scheduled_course_groups(&group_ids)
            .await?
            .into_iter()
            .map(|g| (g.id, g))
            .collect();

        Ok((courses, groups))
    }

    async fn course_filters_pass(
        &self,
        announcement: &Announcement,
        username: &str,
        courses: &HashMap<i64, ScheduledCourse>,
        groups: &HashMap<i64, ScheduledCourseGroup>,
    ) -> bool {
        let Some(course_id) = announcement.scheduled_course_id else {
            return true;
        };

        // A dangling catalog reference denies, the same as a cache miss.
        let Some(course) = courses.get(&course_id) else {
            return false;
        };

        let vle_group_id = match announcement.scheduled_course_group_id {
            None => None,
            Some(group_id) => match groups.get(&group_id) {
                Some(group) => Some(group.vle_group_id.as_str()),
                None => return false,
            },
        };

        let membership = self.memberships.course(&course.vle_course_id).await;
        visibility::course_and_group_pass(membership.as_deref(), vle_group_id, username)
    }
}
