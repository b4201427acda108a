//! Profile lookup, search and editing

use super::ServiceContext;
use crate::backend::TableQuery;
use crate::error::{Error, Result};
use crate::models::{Profile, ProfileSummary, ProfileUpdate, UserId};

const SEARCH_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct ProfileService {
    context: ServiceContext,
}

impl ProfileService {
    pub const fn new(context: ServiceContext) -> Self {
        Self { context }
    }

    pub async fn profile(&self, user_id: &UserId) -> Result<Option<Profile>> {
        let query = TableQuery::new("profiles").select("*").eq("id", user_id);
        self.context.rest().fetch_one(&query).await
    }

    /// Username and avatar only, as joined onto feed rows.
    pub async fn summary(&self, user_id: &UserId) -> Result<Option<ProfileSummary>> {
        let query = TableQuery::new("profiles")
            .select("username,image")
            .eq("id", user_id);
        self.context.rest().fetch_one(&query).await
    }

    pub async fn profiles_by_ids(&self, ids: &[UserId]) -> Result<Vec<Profile>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = TableQuery::new("profiles").select("*").is_in("id", ids);
        self.context.rest().fetch(&query).await
    }

    /// Case-insensitive username search, excluding the signed-in user.
    pub async fn search(&self, term: &str) -> Result<Vec<Profile>> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let mut query = TableQuery::new("profiles")
            .select("*")
            .ilike("username", format!("%{term}%"))
            .limit(SEARCH_LIMIT);
        if let Some(viewer) = self.context.viewer() {
            query = query.neq("id", viewer);
        }
        self.context.rest().fetch(&query).await
    }

    /// Apply a partial update to the signed-in user's profile.
    pub async fn update(&self, update: &ProfileUpdate) -> Result<Profile> {
        let viewer = self.context.require_viewer()?;
        if update.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }
        update.validate()?;

        let query = TableQuery::new("profiles").select("*").eq("id", viewer);
        let updated: Vec<Profile> = self.context.rest().update(&query, update).await?;
        let profile = updated
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("profile {viewer}")))?;
        tracing::info!(user_id = %viewer, "Profile updated");
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_context;

    #[tokio::test]
    async fn blank_search_short_circuits() {
        let profiles = ProfileService::new(test_context(Some("u-1")));
        assert!(profiles.search("   ").await.unwrap().is_empty());
        assert!(profiles.profiles_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_is_validated_before_sending() {
        let profiles = ProfileService::new(test_context(Some("u-1")));
        assert!(matches!(
            profiles.update(&ProfileUpdate::default()).await,
            Err(Error::InvalidInput(_))
        ));

        let bad = ProfileUpdate {
            username: Some("x".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            profiles.update(&bad).await,
            Err(Error::InvalidInput(_))
        ));
    }
}
