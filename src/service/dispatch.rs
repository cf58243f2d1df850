use crate::domain::{Announcement, User};
use crate::mailer::{Mailer, OutgoingEmail};

const EMAIL_SUBJECT: &str = "Urgent announcement";

pub fn hub_url(base_url: &str) -> String {
    format!("{}/hub", base_url.trim_end_matches('/'))
}

fn render_email(recipient: &User, hub_url: &str) -> OutgoingEmail {
    OutgoingEmail {
        to: recipient.email.clone(),
        subject: EMAIL_SUBJECT.to_string(),
        body: format!(
            "Dear {},\n\nAn urgent announcement has been posted.\n\nRead it on your hub: {}\n",
            recipient.display_name(),
            hub_url,
        ),
    }
}

/// Emails every recipient with an address, one send per recipient. A
/// failed send is logged and skipped; it never aborts the remaining
/// sends or the announcement creation that triggered them.
pub async fn send_urgent_notifications(
    mailer: &dyn Mailer,
    announcement: &Announcement,
    recipients: &[User],
    base_url: &str,
) {
    let hub = hub_url(base_url);

    for recipient in recipients.iter().filter(|r| !r.email.is_empty()) {
        if let Err(e) = mailer.send(render_email(recipient, &hub)).await {
            tracing::error!(
                "Failed to email urgent announcement {} to {}: {}",
                announcement.id,
                recipient.username,
                e
            );
        }
    }
}
