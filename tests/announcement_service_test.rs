use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use noticeboard::{
    domain::{Announcement, AnnouncementInput, Audience, User},
    membership::{CourseMembership, MokaMembershipDirectory},
    repository::{
        AnnouncementRepository, SqliteAnnouncementRepository, SqliteCatalogRepository,
        SqliteReadMarkRepository, SqliteUserRepository, UserRepository,
    },
    service::query::ListParams,
    service::AnnouncementService,
};

async fn setup_pool() -> anyhow::Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect(":memory:")
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    Ok(pool)
}

fn service(pool: &SqlitePool, memberships: Arc<MokaMembershipDirectory>) -> AnnouncementService {
    AnnouncementService::new(
        Arc::new(SqliteAnnouncementRepository::new(pool.clone())),
        Arc::new(SqliteReadMarkRepository::new(pool.clone())),
        Arc::new(SqliteUserRepository::new(pool.clone())),
        Arc::new(SqliteCatalogRepository::new(pool.clone())),
        memberships,
        None,
        "http://localhost:8080".to_string(),
        30,
    )
}

async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    roles: &[&str],
    programme_ids: &[i64],
    is_active: bool,
) -> anyhow::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO users (username, email, is_active) VALUES (?, ?, ?)",
    )
    .bind(username)
    .bind(format!("{}@example.com", username))
    .bind(if is_active { 1 } else { 0 })
    .execute(pool)
    .await?;
    let user_id = result.last_insert_rowid();

    for role in roles {
        sqlx::query("INSERT INTO user_roles (user_id, role) VALUES (?, ?)")
            .bind(user_id)
            .bind(role)
            .execute(pool)
            .await?;
    }
    for programme_id in programme_ids {
        sqlx::query("INSERT INTO user_programmes (user_id, programme_id) VALUES (?, ?)")
            .bind(user_id)
            .bind(programme_id)
            .execute(pool)
            .await?;
    }

    Ok(user_id)
}

async fn seed_catalog(pool: &SqlitePool) -> anyhow::Result<()> {
    for name in ["Programme 1", "Programme 2", "Programme 3"] {
        sqlx::query("INSERT INTO programmes (display_name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await?;
    }

    sqlx::query("INSERT INTO master_courses (display_name, vle_course_id) VALUES ('Master A', 'A')")
        .execute(pool)
        .await?;
    sqlx::query(
        "INSERT INTO scheduled_courses (master_course_id, display_name, vle_course_id) \
         VALUES (1, 'A001', 'A001')",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "INSERT INTO scheduled_course_groups (scheduled_course_id, display_name, vle_group_id) \
         VALUES (1, 'A001/A', 'A001/A')",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_users(pool: &SqlitePool) -> anyhow::Result<()> {
    insert_user(pool, "tyrion.lannister", &[], &[], true).await?;
    insert_user(pool, "student.a", &["students"], &[], true).await?;
    insert_user(pool, "student.b", &["students"], &[1, 3], true).await?;
    insert_user(pool, "tutor.a", &["tutors"], &[], true).await?;
    insert_user(pool, "tutor.b", &["tutors"], &[2, 3], true).await?;
    insert_user(pool, "inactive", &["students"], &[], false).await?;
    Ok(())
}

fn input(
    subject: &str,
    audience: Audience,
    programme_id: Option<i64>,
    seconds_ago: i64,
    now: DateTime<Utc>,
) -> AnnouncementInput {
    AnnouncementInput {
        subject: subject.to_string(),
        body: format!("body {}", &subject[8..10]),
        visible_from: now - Duration::seconds(seconds_ago),
        visible_to: now + Duration::days(1),
        is_urgent: false,
        audience,
        programme_id,
        scheduled_course_id: None,
        scheduled_course_group_id: None,
    }
}

async fn seed_announcements(
    repo: &SqliteAnnouncementRepository,
    now: DateTime<Utc>,
) -> anyhow::Result<Vec<Announcement>> {
    let mut created = Vec::new();

    created.push(repo.create(&input("subject 01 (to all)", Audience::All, None, 1, now), None).await?);

    let mut urgent = input("subject 02 (Urgent! - to all)", Audience::All, None, 3, now);
    urgent.is_urgent = true;
    created.push(repo.create(&urgent, None).await?);

    created.push(repo.create(&input("subject 03 (to students)", Audience::Students, None, 2, now), None).await?);
    created.push(
        repo.create(
            &input("subject 04 (to students and tutors)", Audience::StudentsAndTutors, None, 5, now),
            None,
        )
        .await?,
    );
    created.push(repo.create(&input("subject 05 (to tutors)", Audience::Tutors, None, 4, now), None).await?);
    created.push(
        repo.create(
            &input("subject 06 (to students on programme 1)", Audience::Students, Some(1), 7, now),
            None,
        )
        .await?,
    );
    created.push(
        repo.create(
            &input("subject 07 (to tutors on programme 2)", Audience::Tutors, Some(2), 6, now),
            None,
        )
        .await?,
    );
    created.push(
        repo.create(
            &input(
                "subject 08 (to students and tutors on programme 3)",
                Audience::StudentsAndTutors,
                Some(3),
                9,
                now,
            ),
            None,
        )
        .await?,
    );

    Ok(created)
}

struct Fixture {
    pool: SqlitePool,
    service: AnnouncementService,
    memberships: Arc<MokaMembershipDirectory>,
    announcements: Vec<Announcement>,
    now: DateTime<Utc>,
}

async fn fixture() -> anyhow::Result<Fixture> {
    let pool = setup_pool().await?;
    seed_catalog(&pool).await?;
    seed_users(&pool).await?;

    let now = Utc::now();
    let repo = SqliteAnnouncementRepository::new(pool.clone());
    let announcements = seed_announcements(&repo, now).await?;

    let memberships = Arc::new(MokaMembershipDirectory::new());
    let service = service(&pool, memberships.clone());

    Ok(Fixture {
        pool,
        service,
        memberships,
        announcements,
        now,
    })
}

async fn user(pool: &SqlitePool, username: &str) -> anyhow::Result<User> {
    let repo = SqliteUserRepository::new(pool.clone());
    Ok(repo
        .find_by_username(username)
        .await?
        .expect("seeded user exists"))
}

fn subjects(announcements: &[Announcement]) -> Vec<String> {
    let mut subjects: Vec<String> = announcements.iter().map(|a| a.subject.clone()).collect();
    subjects.sort();
    subjects
}

#[tokio::test]
async fn test_visible_for_user_without_roles() -> anyhow::Result<()> {
    let f = fixture().await?;
    let tyrion = user(&f.pool, "tyrion.lannister").await?;

    let visible = f.service.visible_announcements(&tyrion, f.now, false).await?;
    assert_eq!(
        subjects(&visible),
        vec!["subject 01 (to all)", "subject 02 (Urgent! - to all)"]
    );
    // Urgent sorts first even though it is older
    assert_eq!(visible[0].subject, "subject 02 (Urgent! - to all)");

    Ok(())
}

#[tokio::test]
async fn test_visible_for_student_on_programmes() -> anyhow::Result<()> {
    let f = fixture().await?;
    let student_b = user(&f.pool, "student.b").await?;

    let visible = f.service.visible_announcements(&student_b, f.now, false).await?;
    assert_eq!(
        subjects(&visible),
        vec![
            "subject 01 (to all)",
            "subject 02 (Urgent! - to all)",
            "subject 03 (to students)",
            "subject 04 (to students and tutors)",
            "subject 06 (to students on programme 1)",
            "subject 08 (to students and tutors on programme 3)",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_visible_for_tutor_on_programmes() -> anyhow::Result<()> {
    let f = fixture().await?;
    let tutor_b = user(&f.pool, "tutor.b").await?;

    let visible = f.service.visible_announcements(&tutor_b, f.now, false).await?;
    assert_eq!(
        subjects(&visible),
        vec![
            "subject 01 (to all)",
            "subject 02 (Urgent! - to all)",
            "subject 04 (to students and tutors)",
            "subject 05 (to tutors)",
            "subject 07 (to tutors on programme 2)",
            "subject 08 (to students and tutors on programme 3)",
        ]
    );

    Ok(())
}

#[tokio::test]
async fn test_visible_respects_window_bounds() -> anyhow::Result<()> {
    let f = fixture().await?;
    let student_a = user(&f.pool, "student.a").await?;

    let before = f
        .service
        .visible_announcements(&student_a, f.now - Duration::hours(1), false)
        .await?;
    assert!(before.is_empty());

    let after_expiry = f
        .service
        .visible_announcements(&student_a, f.now + Duration::days(1) + Duration::minutes(1), false)
        .await?;
    assert!(after_expiry.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_urgent_only_restricts_before_membership() -> anyhow::Result<()> {
    let f = fixture().await?;
    let student_a = user(&f.pool, "student.a").await?;

    let urgent = f.service.visible_announcements(&student_a, f.now, true).await?;
    assert_eq!(subjects(&urgent), vec!["subject 02 (Urgent! - to all)"]);

    Ok(())
}

#[tokio::test]
async fn test_course_scoped_announcement_fails_closed() -> anyhow::Result<()> {
    let f = fixture().await?;
    let student_a = user(&f.pool, "student.a").await?;

    let mut scoped = input("subject 09 (on course A001)", Audience::Students, None, 1, f.now);
    scoped.scheduled_course_id = Some(1);
    let repo = SqliteAnnouncementRepository::new(f.pool.clone());
    repo.create(&scoped, None).await?;

    // Snapshot empty: excluded
    let visible = f.service.visible_announcements(&student_a, f.now, false).await?;
    assert!(!subjects(&visible).iter().any(|s| s.contains("subject 09")));

    // Course membership present: included
    f.memberships
        .insert(
            "A001",
            CourseMembership {
                members: vec!["student.a".to_string()],
                groups: HashMap::new(),
            },
        )
        .await;
    let visible = f.service.visible_announcements(&student_a, f.now, false).await?;
    assert!(subjects(&visible).iter().any(|s| s.contains("subject 09")));

    Ok(())
}

#[tokio::test]
async fn test_group_scoped_announcement_requires_group_membership() -> anyhow::Result<()> {
    let f = fixture().await?;
    let student_a = user(&f.pool, "student.a").await?;

    let mut scoped = input("subject 09 (on group A001/A)", Audience::Students, None, 1, f.now);
    scoped.scheduled_course_id = Some(1);
    scoped.scheduled_course_group_id = Some(1);
    let repo = SqliteAnnouncementRepository::new(f.pool.clone());
    repo.create(&scoped, None).await?;

    // In the course but the group list is absent: excluded
    f.memberships
        .insert(
            "A001",
            CourseMembership {
                members: vec!["student.a".to_string()],
                groups: HashMap::new(),
            },
        )
        .await;
    let visible = f.service.visible_announcements(&student_a, f.now, false).await?;
    assert!(!subjects(&visible).iter().any(|s| s.contains("subject 09")));

    // In the course and the group: included
    f.memberships
        .insert(
            "A001",
            CourseMembership {
                members: vec!["student.a".to_string()],
                groups: HashMap::from([("A001/A".to_string(), vec!["student.a".to_string()])]),
            },
        )
        .await;
    let visible = f.service.visible_announcements(&student_a, f.now, false).await?;
    assert!(subjects(&visible).iter().any(|s| s.contains("subject 09")));

    Ok(())
}

#[tokio::test]
async fn test_feed_read_unread_cycle() -> anyhow::Result<()> {
    let f = fixture().await?;
    let tyrion = user(&f.pool, "tyrion.lannister").await?;
    let a1 = &f.announcements[0];

    // Everything unread at first
    assert_eq!(f.service.unread_count(&tyrion, f.now).await?, 2);

    let item = f.service.mark_read(&tyrion, a1.id).await?;
    assert!(item.marked_read.is_some());
    assert_eq!(f.service.unread_count(&tyrion, f.now).await?, 1);

    let feed = f.service.feed(&tyrion, f.now, false).await?;
    let read_item = feed.iter().find(|i| i.id == a1.id).expect("a1 in feed");
    assert!(read_item.marked_read.is_some());

    // Mark unread: the feed shows it unread again
    f.service.mark_unread(&tyrion, a1.id).await?;
    assert_eq!(f.service.unread_count(&tyrion, f.now).await?, 2);
    let feed = f.service.feed(&tyrion, f.now, false).await?;
    let unread_item = feed.iter().find(|i| i.id == a1.id).expect("a1 in feed");
    assert!(unread_item.marked_read.is_none());

    Ok(())
}

#[tokio::test]
async fn test_mark_read_unknown_announcement_is_not_found() -> anyhow::Result<()> {
    let f = fixture().await?;
    let tyrion = user(&f.pool, "tyrion.lannister").await?;

    assert!(f.service.mark_read(&tyrion, 99999).await.is_err());

    Ok(())
}

#[tokio::test]
async fn test_list_with_substring_and_id_queries() -> anyhow::Result<()> {
    let f = fixture().await?;

    // "07" matches subject 07 by substring, no AN- prefix needed
    let (page, total) = f
        .service
        .list(&ListParams {
            q: "07".to_string(),
            ..Default::default()
        })
        .await?;
    assert_eq!(total, 1);
    assert_eq!(page[0].announcement.subject, "subject 07 (to tutors on programme 2)");

    // "AN-<id>" matches by display-id prefix
    let a8 = &f.announcements[7];
    let (page, total) = f
        .service
        .list(&ListParams {
            q: format!("AN-{}", a8.id),
            ..Default::default()
        })
        .await?;
    assert_eq!(total, 1);
    assert_eq!(page[0].announcement.id, a8.id);
    assert_eq!(page[0].display_id, format!("AN-{}", a8.id));

    Ok(())
}

#[tokio::test]
async fn test_list_recipient_labels_and_sort() -> anyhow::Result<()> {
    let f = fixture().await?;

    let (page, total) = f
        .service
        .list(&ListParams {
            column: "recipient".to_string(),
            ..Default::default()
        })
        .await?;
    assert_eq!(total, 8);

    // Audience labels sort before "Programme ..." labels
    assert_eq!(page[0].recipient, "All");
    assert_eq!(page[7].recipient, "Programme Programme 3");

    let labels: Vec<&str> = page.iter().map(|r| r.recipient.as_str()).collect();
    let mut sorted = labels.clone();
    sorted.sort();
    assert_eq!(labels, sorted);

    Ok(())
}

#[tokio::test]
async fn test_list_pagination_reports_full_total() -> anyhow::Result<()> {
    let f = fixture().await?;

    let (page, total) = f
        .service
        .list(&ListParams {
            offset: Some(3),
            count: Some(4),
            ..Default::default()
        })
        .await?;
    assert_eq!(total, 8);
    assert_eq!(page.len(), 4);
    let ids: Vec<i64> = page.iter().map(|r| r.announcement.id).collect();
    let expected: Vec<i64> = f.announcements[3..7].iter().map(|a| a.id).collect();
    assert_eq!(ids, expected);

    Ok(())
}

#[tokio::test]
async fn test_recipients_by_audience_and_programme() -> anyhow::Result<()> {
    let f = fixture().await?;

    let usernames = |users: &[User]| {
        let mut names: Vec<String> = users.iter().map(|u| u.username.clone()).collect();
        names.sort();
        names
    };

    // audience all: every active user, the inactive account excluded
    let recipients = f.service.recipients(&f.announcements[0]).await?;
    assert_eq!(
        usernames(&recipients),
        vec!["student.a", "student.b", "tutor.a", "tutor.b", "tyrion.lannister"]
    );

    // students only
    let recipients = f.service.recipients(&f.announcements[2]).await?;
    assert_eq!(usernames(&recipients), vec!["student.a", "student.b"]);

    // students and tutors: either role qualifies
    let recipients = f.service.recipients(&f.announcements[3]).await?;
    assert_eq!(
        usernames(&recipients),
        vec!["student.a", "student.b", "tutor.a", "tutor.b"]
    );

    // students on programme 1
    let recipients = f.service.recipients(&f.announcements[5]).await?;
    assert_eq!(usernames(&recipients), vec!["student.b"]);

    Ok(())
}

#[tokio::test]
async fn test_recipients_on_course_apply_snapshot_filter() -> anyhow::Result<()> {
    let f = fixture().await?;

    let mut scoped = input("subject 09 (on course A001)", Audience::Students, None, 1, f.now);
    scoped.scheduled_course_id = Some(1);
    let repo = SqliteAnnouncementRepository::new(f.pool.clone());
    let scoped = repo.create(&scoped, None).await?;

    // Fail closed with no snapshot
    let recipients = f.service.recipients_on_course(&scoped).await?;
    assert!(recipients.is_empty());

    f.memberships
        .insert(
            "A001",
            CourseMembership {
                members: vec!["student.b".to_string()],
                groups: HashMap::new(),
            },
        )
        .await;
    let recipients = f.service.recipients_on_course(&scoped).await?;
    let names: Vec<&str> = recipients.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["student.b"]);

    Ok(())
}

#[tokio::test]
async fn test_validation_rejects_bad_windows() -> anyhow::Result<()> {
    let f = fixture().await?;
    let staff = user(&f.pool, "tyrion.lannister").await?;

    let mut inverted = input("subject 10 (bad window)", Audience::All, None, 0, f.now);
    inverted.visible_from = f.now + Duration::days(1);
    inverted.visible_to = f.now;
    assert!(f.service.create(inverted, &staff).await.is_err());

    let mut in_past = input("subject 11 (already over)", Audience::All, None, 0, f.now);
    in_past.visible_from = f.now - Duration::days(7);
    in_past.visible_to = f.now - Duration::days(6);
    assert!(f.service.create(in_past, &staff).await.is_err());

    // Nothing was persisted
    let (_, total) = f.service.list(&ListParams::default()).await?;
    assert_eq!(total, 8);

    Ok(())
}

#[tokio::test]
async fn test_update_and_delete_missing_announcement() -> anyhow::Result<()> {
    let f = fixture().await?;

    let payload = input("subject 12 (update target)", Audience::All, None, 1, f.now);
    assert!(f.service.update(99999, payload).await.is_err());
    assert!(f.service.delete(99999).await.is_err());

    Ok(())
}
