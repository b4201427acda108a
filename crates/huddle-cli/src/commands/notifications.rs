use chrono::Utc;
use huddle_core::models::{Notification, NotificationId};

use crate::cli::NotificationCommands;
use crate::commands::common::{
    format_relative_time, normalize_identifier, open_session, preview, print_json,
};
use crate::error::CliError;

pub async fn run_notifications(
    command: Option<NotificationCommands>,
    unread_only: bool,
    global_profile: Option<&str>,
    as_json: bool,
) -> Result<(), CliError> {
    let session = open_session(global_profile, true).await?;
    let notifications = &session.services.notifications;

    match command {
        None => {
            let items = notifications.list(unread_only).await?;
            if as_json {
                return print_json(&items);
            }
            if items.is_empty() {
                println!(
                    "{}",
                    if unread_only {
                        "No unread notifications."
                    } else {
                        "No notifications."
                    }
                );
            }
            for line in format_notification_lines(&items) {
                println!("{line}");
            }
        }
        Some(NotificationCommands::Read { id }) => {
            let id = NotificationId::new(normalize_identifier(&id, "Notification ID")?);
            if notifications.mark_read(&id).await? {
                println!("Marked {id} as read");
            } else {
                return Err(CliError::NotFound(format!("notification {id}")));
            }
        }
        Some(NotificationCommands::ReadAll) => {
            let updated = notifications.mark_all_read().await?;
            println!("Marked {updated} notification(s) as read");
        }
    }
    Ok(())
}

pub fn format_notification_lines(notifications: &[Notification]) -> Vec<String> {
    let now = Utc::now();
    notifications
        .iter()
        .map(|notification| {
            let marker = if notification.read { " " } else { "*" };
            let excerpt = notification
                .post
                .as_ref()
                .map(|post| format!("  \"{}\"", preview(&post.body, 32)))
                .unwrap_or_default();
            format!(
                "{} {}  {:<8}  {}{}",
                marker,
                notification.id,
                format_relative_time(notification.created_at, now),
                notification.summary(),
                excerpt
            )
        })
        .collect()
}
