use std::sync::Arc;

use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use noticeboard::{
    api,
    config::Settings,
    mailer::{Mailer, SmtpMailer},
    membership::{sync, MokaMembershipDirectory},
    service::ServiceContext,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "noticeboard=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let settings = Settings::new().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config: {}. Using defaults.", e);
        Settings::default()
    });

    tracing::info!(
        "Starting Noticeboard server on {}:{}",
        settings.server.host,
        settings.server.port
    );

    // Initialize database
    let db_pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections)
        .connect(&settings.database.url)
        .await?;

    // Run migrations
    sqlx::migrate!("./migrations").run(&db_pool).await?;

    // Membership snapshot cache, refreshed by a background task
    let membership_directory = Arc::new(MokaMembershipDirectory::new());
    sync::spawn_refresher(membership_directory.clone(), settings.membership.clone());

    // SMTP mailer for urgent-announcement emails, if configured
    let mailer: Option<Arc<dyn Mailer>> = match SmtpMailer::new(&settings.smtp)? {
        Some(smtp) => {
            tracing::info!("SMTP delivery enabled");
            Some(Arc::new(smtp))
        }
        None => {
            tracing::info!("SMTP delivery disabled");
            None
        }
    };

    // Create service context
    let service_context = Arc::new(ServiceContext::new(
        db_pool,
        membership_directory,
        mailer,
        &settings,
    ));

    let app = api::create_app(service_context, Arc::new(settings.clone()));

    let listener = tokio::net::TcpListener::bind(format!(
        "{}:{}",
        settings.server.host, settings.server.port
    ))
    .await?;

    tracing::info!(
        "Server listening on http://{}:{}",
        settings.server.host,
        settings.server.port
    );

    axum::serve(listener, app).await?;

    Ok(())
}
