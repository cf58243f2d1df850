use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::{
    domain::Audience,
    error::Result,
    repository::CatalogRepository,
};

/// Read-only lookups against the course catalog, shaped for the
/// compose form's cascading selects.
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MasterCourseEntry {
    pub display_name: String,
    pub scheduled_course_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduledCourseEntry {
    pub display_name: String,
    pub scheduled_course_group_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProgrammeEntry {
    pub display_name: String,
    pub master_course_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AudiencesAndProgrammes {
    pub audiences: BTreeMap<String, String>,
    pub programmes: BTreeMap<i64, ProgrammeEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposeOptions {
    pub master_courses: BTreeMap<i64, MasterCourseEntry>,
    pub scheduled_courses: BTreeMap<i64, ScheduledCourseEntry>,
    pub scheduled_course_groups: BTreeMap<i64, String>,
}

impl CatalogService {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Master courses among `ids` that actually run (have at least one
    /// scheduled course), with their scheduled course ids.
    pub async fn master_courses(&self, ids: &[i64]) -> Result<BTreeMap<i64, MasterCourseEntry>> {
        let masters = self.catalog.master_courses_with_schedules(ids).await?;
        let master_ids: Vec<i64> = masters.iter().map(|m| m.id).collect();
        let scheduled = self.catalog.scheduled_courses_for_masters(&master_ids).await?;

        let mut entries: BTreeMap<i64, MasterCourseEntry> = masters
            .into_iter()
            .map(|m| {
                (
                    m.id,
                    MasterCourseEntry {
                        display_name: m.display_name,
                        scheduled_course_ids: Vec::new(),
                    },
                )
            })
            .collect();

        for course in scheduled {
            if let Some(entry) = entries.get_mut(&course.master_course_id) {
                entry.scheduled_course_ids.push(course.id);
            }
        }

        Ok(entries)
    }

    pub async fn scheduled_courses(&self, ids: &[i64]) -> Result<BTreeMap<i64, ScheduledCourseEntry>> {
        let courses = self.catalog.scheduled_courses(ids).await?;
        let course_ids: Vec<i64> = courses.iter().map(|c| c.id).collect();
        let groups = self.catalog.groups_for_scheduled_courses(&course_ids).await?;

        let mut entries: BTreeMap<i64, ScheduledCourseEntry> = courses
            .into_iter()
            .map(|c| {
                (
                    c.id,
                    ScheduledCourseEntry {
                        display_name: c.display_name,
                        scheduled_course_group_ids: Vec::new(),
                    },
                )
            })
            .collect();

        for group in groups {
            if let Some(entry) = entries.get_mut(&group.scheduled_course_id) {
                entry.scheduled_course_group_ids.push(group.id);
            }
        }

        Ok(entries)
    }

    pub async fn scheduled_course_groups(&self, ids: &[i64]) -> Result<BTreeMap<i64, String>> {
        let groups = self.catalog.scheduled_course_groups(ids).await?;
        Ok(groups.into_iter().map(|g| (g.id, g.display_name)).collect())
    }

    pub async fn programme_name(&self, programme_id: i64) -> Result<Option<String>> {
        Ok(self
            .catalog
            .programmes()
            .await?
            .into_iter()
            .find(|p| p.id == programme_id)
            .map(|p| p.display_name))
    }

    /// The audience catalog plus every programme with its available
    /// master courses, for the compose form.
    pub async fn audiences_and_programmes(&self) -> Result<AudiencesAndProgrammes> {
        let audiences = Audience::ALL_AUDIENCES
            .iter()
            .map(|a| (a.code().to_string(), a.label().to_string()))
            .collect();

        let programmes = self.catalog.programmes().await?;
        let pairs = self.catalog.available_master_courses_by_programme().await?;

        let mut entries: BTreeMap<i64, ProgrammeEntry> = programmes
            .into_iter()
            .map(|p| {
                (
                    p.id,
                    ProgrammeEntry {
                        display_name: p.display_name,
                        master_course_ids: Vec::new(),
                    },
                )
            })
            .collect();

        for (programme_id, master_course_id) in pairs {
            if let Some(entry) = entries.get_mut(&programme_id) {
                entry.master_course_ids.push(master_course_id);
            }
        }

        Ok(AudiencesAndProgrammes {
            audiences,
            programmes: entries,
        })
    }

    /// Options for an announcement's edit view: the master courses of
    /// its programme. The scheduled course and group selects start
    /// empty and are populated by the cascading lookups.
    pub async fn announcement_options(&self, programme_id: Option<i64>) -> Result<ComposeOptions> {
        let master_courses = match programme_id {
            Some(programme_id) => {
                let ids = self.catalog.master_course_ids_for_programme(programme_id).await?;
                self.master_courses(&ids).await?
            }
            None => BTreeMap::new(),
        };

        Ok(ComposeOptions {
            master_courses,
            scheduled_courses: BTreeMap::new(),
            scheduled_course_groups: BTreeMap::new(),
        })
    }
}
