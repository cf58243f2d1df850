pub mod announcement_service;
pub mod catalog_service;
pub mod dispatch;
pub mod feed;
pub mod query;
pub mod visibility;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::Settings;
use crate::mailer::Mailer;
use crate::membership::MembershipDirectory;
use crate::repository::{
    AnnouncementRepository, CatalogRepository, ReadMarkRepository, SqliteAnnouncementRepository,
    SqliteCatalogRepository, SqliteReadMarkRepository, SqliteUserRepository, UserRepository,
};

pub use announcement_service::AnnouncementService;
pub use catalog_service::CatalogService;

pub struct ServiceContext {
    pub announcement_service: Arc<AnnouncementService>,
    pub catalog_service: Arc<CatalogService>,
    pub user_repo: Arc<dyn UserRepository>,
    pub db_pool: SqlitePool,
}

impl ServiceContext {
    pub fn new(
        db_pool: SqlitePool,
        memberships: Arc<dyn MembershipDirectory>,
        mailer: Option<Arc<dyn Mailer>>,
        settings: &Settings,
    ) -> Self {
        let announcement_repo: Arc<dyn AnnouncementRepository> =
            Arc::new(SqliteAnnouncementRepository::new(db_pool.clone()));
        let read_mark_repo: Arc<dyn ReadMarkRepository> =
            Arc::new(SqliteReadMarkRepository::new(db_pool.clone()));
        let user_repo: Arc<dyn UserRepository> =
            Arc::new(SqliteUserRepository::new(db_pool.clone()));
        let catalog_repo: Arc<dyn CatalogRepository> =
            Arc::new(SqliteCatalogRepository::new(db_pool.clone()));

        let announcement_service = Arc::new(AnnouncementService::new(
            announcement_repo,
            read_mark_repo,
            user_repo.clone(),
            catalog_repo.clone(),
            memberships,
            mailer,
            settings.server.base_url.clone(),
            settings.feed.limit,
        ));
        let catalog_service = Arc::new(CatalogService::new(catalog_repo));

        Self {
            announcement_service,
            catalog_service,
            user_repo,
            db_pool,
        }
    }
}
