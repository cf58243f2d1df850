use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MembershipConfig;
use crate::membership::{CourseMembership, MokaMembershipDirectory};

/// Periodically pulls the enrolment snapshot from the VLE export
/// endpoint and swaps it into the cache. A failed fetch keeps whatever
/// snapshot is already loaded; staleness is tolerated, absence denies.
pub fn spawn_refresher(directory: Arc<MokaMembershipDirectory>, config: MembershipConfig) {
    let Some(url) = config.snapshot_url else {
        tracing::info!("No membership snapshot URL configured; course filters will deny all");
        return;
    };

    let interval = Duration::from_secs(config.refresh_interval_secs.max(1));

    tokio::spawn(async move {
        let client = reqwest::Client::new();
        let mut ticker = tokio::time::interval(interval);

        loop {
            ticker.tick().await;

            match fetch_snapshot(&client, &url).await {
                Ok(snapshot) => {
                    let courses = snapshot.len();
                    directory.replace(snapshot).await;
                    tracing::debug!("Refreshed membership snapshot: {} courses", courses);
                }
                Err(e) => {
                    tracing::warn!("Membership snapshot refresh failed: {}", e);
                }
            }
        }
    });
}

async fn fetch_snapshot(
    client: &reqwest::Client,
    url: &str,
) -> Result<HashMap<String, CourseMembership>, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}
