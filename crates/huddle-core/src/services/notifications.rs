//! Notification inbox

use serde::de::IgnoredAny;

use super::ServiceContext;
use crate::backend::TableQuery;
use crate::error::Result;
use crate::models::{Notification, NotificationId, NOTIFICATION_SELECT};

#[derive(Debug, Clone)]
pub struct NotificationService {
    context: ServiceContext,
}

impl NotificationService {
    pub const fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    /// Inbox of the signed-in user, newest first.
    pub async fn list(&self, unread_only: bool) -> Result<Vec<Notification>> {
        let viewer = self.context.require_viewer()?;
        let mut query = TableQuery::new("notifications")
            .select(NOTIFICATION_SELECT)
            .eq("user_id", viewer);
        if unread_only {
            query = query.eq("read", false);
        }
        self.context
            .rest()
            .fetch(&query.order("created_at", false))
            .await
    }

    pub async fn unread_count(&self) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("notifications")
            .select("id")
            .eq("user_id", viewer)
            .eq("read", false);
        self.context.rest().count_exact(&query).await
    }

    /// Returns `false` when no such notification exists.
    pub async fn mark_read(&self, id: &NotificationId) -> Result<bool> {
        let query = TableQuery::new("notifications").select("id").eq("id", id);
        let updated: Vec<IgnoredAny> = self
            .context
            .rest()
            .update(&query, &serde_json::json!({ "read": true }))
            .await?;
        Ok(!updated.is_empty())
    }

    pub async fn mark_all_read(&self) -> Result<usize> {
        let viewer = self.context.require_viewer()?;
        let query = TableQuery::new("notifications")
            .select("id")
            .eq("user_id", viewer)
            .eq("read", false);
        let updated: Vec<IgnoredAny> = self
            .context
            .rest()
            .update(&query, &serde_json::json!({ "read": true }))
            .await?;
        Ok(updated.len())
    }
}
