//! Profile model and profile-update validation

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use super::UserId;
use crate::error::{Error, Result};
use crate::util::is_http_url;

/// Author details joined onto posts, comments, messages and notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub username: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl ProfileSummary {
    /// Placeholder shown when the join came back empty.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            username: "Unknown".to_string(),
            image: None,
        }
    }
}

/// Full profile row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Profile {
    #[must_use]
    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            username: self.username.clone(),
            image: self.image.clone(),
        }
    }
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl ProfileUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.full_name.is_none()
            && self.bio.is_none()
            && self.image.is_none()
    }

    /// Validate field lengths and formats before sending.
    pub fn validate(&self) -> Result<()> {
        if let Some(username) = &self.username {
            let length = username.chars().count();
            if length < 3 {
                return Err(Error::InvalidInput(
                    "Username must be at least 3 characters".to_string(),
                ));
            }
            if length > 20 {
                return Err(Error::InvalidInput(
                    "Username must be at most 20 characters".to_string(),
                ));
            }
            let re = Regex::new(r"^[a-zA-Z0-9_]+$").expect("Invalid regex");
            if !re.is_match(username) {
                return Err(Error::InvalidInput(
                    "Username can only contain letters, numbers, and underscores".to_string(),
                ));
            }
        }
        if self
            .full_name
            .as_ref()
            .is_some_and(|name| name.chars().count() > 50)
        {
            return Err(Error::InvalidInput(
                "Full name must be at most 50 characters".to_string(),
            ));
        }
        if self.bio.as_ref().is_some_and(|bio| bio.chars().count() > 160) {
            return Err(Error::InvalidInput(
                "Bio must be at most 160 characters".to_string(),
            ));
        }
        if self.image.as_ref().is_some_and(|image| !is_http_url(image)) {
            return Err(Error::InvalidInput("Invalid image URL".to_string()));
        }
        Ok(())
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

/// Deserialize a joined relation that PostgREST may return either as an
/// object or as a one-element array.
pub(crate) fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let value = Option::<OneOrMany<T>>::deserialize(deserializer)?;
    Ok(match value {
        None => None,
        Some(OneOrMany::One(item)) => Some(item),
        Some(OneOrMany::Many(items)) => items.into_iter().next(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "one_or_many")]
        profile: Option<ProfileSummary>,
    }

    #[test]
    fn joined_profile_accepts_object_array_and_null() {
        let object: Row = serde_json::from_str(r#"{"profile":{"username":"ana"}}"#).unwrap();
        let array: Row =
            serde_json::from_str(r#"{"profile":[{"username":"ben","image":"x"}]}"#).unwrap();
        let null: Row = serde_json::from_str(r#"{"profile":null}"#).unwrap();
        let missing: Row = serde_json::from_str("{}").unwrap();

        assert_eq!(object.profile.unwrap().username, "ana");
        assert_eq!(array.profile.unwrap().image.as_deref(), Some("x"));
        assert!(null.profile.is_none());
        assert!(missing.profile.is_none());
    }

    #[test]
    fn validate_rejects_bad_usernames() {
        let too_short = ProfileUpdate {
            username: Some("ab".to_string()),
            ..Default::default()
        };
        let bad_chars = ProfileUpdate {
            username: Some("not ok!".to_string()),
            ..Default::default()
        };
        assert!(too_short.validate().is_err());
        assert!(bad_chars.validate().is_err());
    }

    #[test]
    fn validate_checks_lengths_and_image_url() {
        let long_bio = ProfileUpdate {
            bio: Some("x".repeat(161)),
            ..Default::default()
        };
        let bad_image = ProfileUpdate {
            image: Some("ftp://host/me.png".to_string()),
            ..Default::default()
        };
        let ok = ProfileUpdate {
            username: Some("good_name_1".to_string()),
            full_name: Some("Good Name".to_string()),
            bio: Some("hi".to_string()),
            image: Some("https://cdn.example.com/me.png".to_string()),
        };
        assert!(long_bio.validate().is_err());
        assert!(bad_image.validate().is_err());
        assert!(ok.validate().is_ok());
    }
}
